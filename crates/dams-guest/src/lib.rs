//! Dams MCDA guest runtime
//!
//! Guest side of the embedded scoring app. The guest receives the signed-in
//! user's identity from the host page through a one-shot handshake, verifies
//! the session against the preference store, and saves or loads per-dam
//! criterion scores. Persistence is best-effort: without a trusted context
//! the guest keeps working locally and only reports what it could not do.
//!
//! # Example
//!
//! ```rust,no_run
//! use dams_guest::{Guest, GuestConfig, Host, StaticIdentity, IdentityBundle};
//! use tokio::sync::mpsc;
//!
//! # async fn example(identity: IdentityBundle) {
//! let config = GuestConfig::default();
//! let (event_tx, mut event_rx) = mpsc::channel(64);
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//!
//! let guest = Guest::from_config(&config, event_tx);
//! let host = Host::new(StaticIdentity(identity), cmd_tx);
//!
//! // Runs until the host's sender is dropped
//! guest.run(cmd_rx, host).await;
//!
//! while let Some(event) = event_rx.recv().await {
//!     println!("{}", event.to_wire());
//! }
//! # }
//! ```

// Identity, mode and session trust
pub mod context;

// Readiness handshake between host and guest
pub mod handshake;

// Session verification
pub mod session;

// Save/load against the preference store
pub mod sync;

// Record → UI field aggregation
pub mod aggregate;

// Store seam
pub mod store;

// Commands and events on the host channel
pub mod events;

// Command loop
pub mod guest;

// Store round-trips off the command loop
mod worker;

pub mod config;
pub mod error;

#[cfg(test)]
mod test_support;

pub use aggregate::{aggregate, NameBindings, ScoreUpdate};
pub use config::{GuestConfig, GuestSettings};
pub use context::{AppMode, GroupStatus, GuestContext, IdentityBundle, SaveKey, SessionTrust};
pub use error::{GuestError, Result};
pub use events::{GuestCommand, GuestEvent, Notice, Severity};
pub use guest::Guest;
pub use handshake::{EventHost, Host, HostBridge, IdentitySource, StaticIdentity};
pub use session::{SessionValidator, Validation};
pub use store::{PreferenceStore, StoreConnector};
pub use sync::{LoadOutcome, PreferenceSync, SaveOutcome};

// Re-export from the store client
pub use dams_store_client::{PreferenceRecord, Scores, StoreClient, StoreConfig};
