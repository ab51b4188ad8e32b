//! Session verification
//!
//! Posts the cached session to the store and records the answer as the
//! context's trust. Only local trust changes; the store is never mutated,
//! so validating again is always safe.

use crate::context::{GuestContext, SessionTrust};
use crate::error::{GuestError, Result};
use crate::store::PreferenceStore;
use tracing::{info, warn};

/// Result of one validation round-trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub trust: SessionTrust,
    /// The session just moved into the rejected state; the user should be told once
    pub newly_rejected: bool,
}

pub struct SessionValidator<'a> {
    store: &'a dyn PreferenceStore,
}

impl<'a> SessionValidator<'a> {
    pub fn new(store: &'a dyn PreferenceStore) -> Self {
        Self { store }
    }

    /// Verify the cached session and update `ctx` trust.
    ///
    /// Fails only with `HandshakeIncomplete`; store failures become
    /// `SessionTrust::Rejected`.
    pub async fn validate(&self, ctx: &mut GuestContext) -> Result<Validation> {
        let credentials = ctx.identity()?.credentials();

        let trust = match self.store.verify_session(&credentials).await {
            Ok(()) => {
                info!(user = credentials.user, "session verified");
                SessionTrust::Trusted
            }
            Err(e) => {
                warn!(user = credentials.user, error = %e, "session verification failed");
                SessionTrust::Rejected
            }
        };

        let previous = ctx.set_trust(trust);
        Ok(Validation {
            trust,
            newly_rejected: trust == SessionTrust::Rejected && previous != SessionTrust::Rejected,
        })
    }
}

/// Gate for operations that need a verified session
pub(crate) fn require_trusted(ctx: &GuestContext) -> Result<()> {
    ctx.identity()?;
    if ctx.is_trusted() {
        Ok(())
    } else {
        Err(GuestError::SessionInvalid)
    }
}
