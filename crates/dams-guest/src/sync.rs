//! Preference save/load against the remote store
//!
//! `save` is get-or-create-or-update: look the key up, patch the first hit,
//! otherwise create. The lookup always completes before the write is chosen.
//! Nothing here locks the key, so two guests saving the same key for the
//! first time at once can both create a record; later saves then patch
//! whichever record the store lists first.

use crate::aggregate::{aggregate, NameBindings, ScoreUpdate};
use crate::context::GuestContext;
use crate::error::{GuestError, Result};
use crate::session::require_trusted;
use crate::store::PreferenceStore;
use dams_store_client::{PreferenceWrite, Scores};
use tracing::{debug, info, warn};

/// What a successful save did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created { id: i64 },
    Updated { id: i64 },
}

/// What a load produced
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing saved yet for this key
    Empty,
    /// The store could not be reached; treated as nothing to load
    Unavailable,
    Loaded(Vec<ScoreUpdate>),
}

pub struct PreferenceSync<'a> {
    store: &'a dyn PreferenceStore,
    require_trusted_session: bool,
}

impl<'a> PreferenceSync<'a> {
    pub fn new(store: &'a dyn PreferenceStore) -> Self {
        Self {
            store,
            require_trusted_session: true,
        }
    }

    /// Allow save/load before the session has been verified
    pub fn without_trust_gate(mut self) -> Self {
        self.require_trusted_session = false;
        self
    }

    fn check_trust(&self, ctx: &GuestContext) -> Result<()> {
        if self.require_trusted_session {
            require_trusted(ctx)
        } else {
            ctx.identity().map(|_| ())
        }
    }

    /// Parse the raw score JSON handed over by the UI
    pub fn parse_scores(raw: &str) -> Result<Scores> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Save scores under the current key, updating the existing record if any.
    ///
    /// A failed lookup counts as "no existing record". Write failures are
    /// returned, not retried.
    pub async fn save(&self, ctx: &GuestContext, scores: Scores) -> Result<SaveOutcome> {
        self.check_trust(ctx)?;
        let key = ctx.save_key()?;
        let identity = ctx.identity()?;

        let existing = match self.store.list_preferences(&key.query()).await {
            Ok(records) => {
                if records.len() > 1 {
                    warn!(
                        user = key.user,
                        group = ?key.group,
                        count = records.len(),
                        "duplicate preference records for key, updating the first"
                    );
                }
                records.into_iter().next()
            }
            Err(e) => {
                warn!(error = %e, "preference lookup failed, creating a new record");
                None
            }
        };

        let body = PreferenceWrite {
            session_id: identity.session_token.clone(),
            user: key.user,
            group: key.group,
            scores,
        };

        match existing {
            Some(record) => {
                debug!(id = record.id, "updating preference record");
                self.store.update_preference(record.id, &body).await?;
                info!(id = record.id, "preferences updated");
                Ok(SaveOutcome::Updated { id: record.id })
            }
            None => {
                let created = self.store.create_preference(&body).await?;
                info!(id = created.id, "preferences created");
                Ok(SaveOutcome::Created { id: created.id })
            }
        }
    }

    /// Load and aggregate the records for the current key.
    ///
    /// An empty result and an unreachable store are both normal outcomes.
    pub async fn load(&self, ctx: &GuestContext, bindings: &NameBindings) -> Result<LoadOutcome> {
        self.check_trust(ctx)?;
        let query = ctx.load_query()?;
        let mode = ctx.mode().ok_or(GuestError::ModeUnset)?;

        let records = match self.store.list_preferences(&query).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "preference load failed, nothing to load");
                return Ok(LoadOutcome::Unavailable);
            }
        };

        if records.is_empty() {
            info!(%mode, "no saved preferences, nothing to load");
            return Ok(LoadOutcome::Empty);
        }

        debug!(%mode, count = records.len(), "aggregating preference records");
        Ok(LoadOutcome::Loaded(aggregate(&records, mode, bindings)))
    }
}
