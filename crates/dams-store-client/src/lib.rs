//! Rust client for the Dams MCDA preference store API
//!
//! The store exposes three resources: a session-verify endpoint, and a
//! preference collection that can be listed (filtered by user and/or group),
//! created, and patched per record id.
//!
//! # Example
//!
//! ```rust,no_run
//! use dams_store_client::{PreferenceQuery, StoreClient, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = StoreClient::with_csrf_token(
//!     StoreConfig {
//!         base_url: "http://localhost:8000".into(),
//!         ..Default::default()
//!     },
//!     "csrf-token",
//! )?;
//!
//! // Individual (group-less) record for user 12
//! let records = client.list_preferences(&PreferenceQuery::individual(12)).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod types;

// Re-export main types
pub use client::StoreClient;
pub use error::{Result, StoreError};
pub use types::*;
