//! Host/guest readiness handshake
//!
//! 1. The guest opens its command channel (its `setContext` entry point).
//! 2. The guest calls [`HostBridge::set_up_frame`].
//! 3. The host resolves the identity and sends exactly one `SetContext`.
//!
//! Because the channel exists before step 2, the transfer can never arrive
//! at a guest that is not listening. Step 3 never waits for the guest: a
//! full channel gets the transfer queued behind the commands already in it.
//! If step 2 never reaches a host, no transfer happens and the guest stays
//! local-only.

use crate::context::IdentityBundle;
use crate::error::{GuestError, Result};
use crate::events::{GuestCommand, GuestEvent};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Reads the signed-in user from the host page
pub trait IdentitySource: Send + Sync {
    fn resolve(&self) -> IdentityBundle;
}

/// A fixed identity, resolved the same way every time
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub IdentityBundle);

impl IdentitySource for StaticIdentity {
    fn resolve(&self) -> IdentityBundle {
        self.0.clone()
    }
}

/// Host-side entry point the guest calls once it is ready
#[async_trait]
pub trait HostBridge: Send + Sync {
    async fn set_up_frame(&self) -> Result<()>;
}

/// In-process host: answers readiness by pushing `SetContext` into the guest's channel
pub struct Host<S> {
    source: S,
    guest: mpsc::Sender<GuestCommand>,
}

impl<S: IdentitySource> Host<S> {
    pub fn new(source: S, guest: mpsc::Sender<GuestCommand>) -> Self {
        Self { source, guest }
    }
}

#[async_trait]
impl<S: IdentitySource> HostBridge for Host<S> {
    async fn set_up_frame(&self) -> Result<()> {
        let identity = self.source.resolve();
        info!(
            user = identity.user_id,
            group = ?identity.group_id,
            "host: transferring context to guest"
        );
        match self.guest.try_send(GuestCommand::SetContext(identity)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(command)) => {
                debug!("guest command channel full, queueing context transfer");
                let guest = self.guest.clone();
                tokio::spawn(async move {
                    if guest.send(command).await.is_err() {
                        warn!("guest stopped before the context transfer was delivered");
                    }
                });
                Ok(())
            }
            Err(TrySendError::Closed(_)) => {
                Err(GuestError::ChannelClosed("guest command channel closed".into()))
            }
        }
    }
}

/// Out-of-process host: readiness goes out as an event on the guest's event channel
pub struct EventHost {
    events: mpsc::Sender<GuestEvent>,
}

impl EventHost {
    pub fn new(events: mpsc::Sender<GuestEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl HostBridge for EventHost {
    async fn set_up_frame(&self) -> Result<()> {
        debug!("signalling readiness to host");
        self.events
            .send(GuestEvent::Ready)
            .await
            .map_err(|e| GuestError::ChannelClosed(e.to_string()))
    }
}
