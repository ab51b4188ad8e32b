//! HTTP client for the preference store API

use crate::error::{Result, StoreError};
use crate::types::*;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

/// HTTP client for the preference store
///
/// The CSRF token is installed as a default header when the client is
/// built, so every request for the lifetime of the client carries it.
///
/// # Example
///
/// ```rust,no_run
/// use dams_store_client::{SessionCredentials, StoreClient, StoreConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = StoreClient::with_csrf_token(StoreConfig::default(), "csrf-token")?;
///
/// client
///     .verify_session(&SessionCredentials {
///         session_id: "abc".into(),
///         user: 12,
///         group: None,
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StoreClient {
    config: StoreConfig,
    client: Client,
}

impl StoreClient {
    /// Create a client without a CSRF token
    pub fn new(config: StoreConfig) -> Result<Self> {
        Self::build(config, header::HeaderMap::new())
    }

    /// Create a client that sends `csrf_token` on every request
    pub fn with_csrf_token(config: StoreConfig, csrf_token: &str) -> Result<Self> {
        let name = header::HeaderName::from_bytes(config.csrf_header.as_bytes())
            .map_err(|e| StoreError::InvalidHeader(format!("{}: {}", config.csrf_header, e)))?;
        let value = header::HeaderValue::from_str(csrf_token)
            .map_err(|e| StoreError::InvalidHeader(format!("csrf token: {}", e)))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(name, value);
        Self::build(config, headers)
    }

    fn build(config: StoreConfig, headers: header::HeaderMap) -> Result<Self> {
        let mut builder = Client::builder().default_headers(headers);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        Ok(Self { config, client })
    }

    /// Get the client configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ==================== Session API ====================

    /// Verify a session against the store.
    ///
    /// Any 2xx answer means the session is trusted. Never mutates server state.
    pub async fn verify_session(&self, credentials: &SessionCredentials) -> Result<()> {
        let url = self.url(&self.config.verify_path);

        let response = self
            .client
            .post(&url)
            .form(&credentials.form_fields())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Server {
                status,
                message: body,
            });
        }
        Ok(())
    }

    // ==================== Preference API ====================

    /// List preference records matching a filter. An empty list is a valid answer.
    pub async fn list_preferences(&self, query: &PreferenceQuery) -> Result<Vec<PreferenceRecord>> {
        let mut url = self.url(&self.config.preference_path);
        let params = query.to_query_string();
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params);
        }

        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    /// Create a new preference record
    pub async fn create_preference(&self, input: &PreferenceWrite) -> Result<PreferenceRecord> {
        let url = self.url(&self.config.preference_path);

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(input)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Patch an existing preference record (scores are replaced wholesale)
    pub async fn update_preference(&self, id: i64, input: &PreferenceWrite) -> Result<PreferenceRecord> {
        let url = self.preference_url(id);

        let response = self
            .client
            .patch(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(input)
            .send()
            .await?;

        self.handle_response(response).await
    }

    // ==================== Helper Methods ====================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn preference_url(&self, id: i64) -> String {
        let collection = self.url(&self.config.preference_path);
        format!(
            "{}/{}/",
            collection.trim_end_matches('/'),
            urlencoding::encode(&id.to_string())
        )
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(response.url().path().to_string()));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status, body = %body, "store returned error status");
            return Err(StoreError::Server {
                status,
                message: body,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
