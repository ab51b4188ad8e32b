//! Seam between the guest and the remote preference store

use async_trait::async_trait;
use dams_store_client::{
    PreferenceQuery, PreferenceRecord, PreferenceWrite, SessionCredentials, StoreClient,
    StoreConfig,
};
use std::sync::Arc;

/// Operations the guest needs from the preference store
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn verify_session(&self, credentials: &SessionCredentials) -> dams_store_client::Result<()>;

    async fn list_preferences(
        &self,
        query: &PreferenceQuery,
    ) -> dams_store_client::Result<Vec<PreferenceRecord>>;

    async fn create_preference(&self, input: &PreferenceWrite) -> dams_store_client::Result<PreferenceRecord>;

    async fn update_preference(
        &self,
        id: i64,
        input: &PreferenceWrite,
    ) -> dams_store_client::Result<PreferenceRecord>;
}

#[async_trait]
impl PreferenceStore for StoreClient {
    async fn verify_session(&self, credentials: &SessionCredentials) -> dams_store_client::Result<()> {
        StoreClient::verify_session(self, credentials).await
    }

    async fn list_preferences(
        &self,
        query: &PreferenceQuery,
    ) -> dams_store_client::Result<Vec<PreferenceRecord>> {
        StoreClient::list_preferences(self, query).await
    }

    async fn create_preference(&self, input: &PreferenceWrite) -> dams_store_client::Result<PreferenceRecord> {
        StoreClient::create_preference(self, input).await
    }

    async fn update_preference(
        &self,
        id: i64,
        input: &PreferenceWrite,
    ) -> dams_store_client::Result<PreferenceRecord> {
        StoreClient::update_preference(self, id, input).await
    }
}

/// Builds a store connection once the CSRF token is known.
///
/// Called at setContext time; the returned store carries the token on every
/// request for the rest of the guest's lifetime.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, csrf_token: &str) -> dams_store_client::Result<Arc<dyn PreferenceStore>>;
}

impl StoreConnector for StoreConfig {
    fn connect(&self, csrf_token: &str) -> dams_store_client::Result<Arc<dyn PreferenceStore>> {
        let client = StoreClient::with_csrf_token(self.clone(), csrf_token)?;
        Ok(Arc::new(client))
    }
}
