//! Guest coordinator
//!
//! Owns the context, the store connection and the name bindings. Local
//! commands are handled as they arrive; store work is handed to the
//! [`StoreWorker`] with a snapshot of the context, and the worker's
//! verification results flow back into the context. Store failures become
//! log lines and, where the user needs to know, notices.

use crate::aggregate::NameBindings;
use crate::config::{GuestConfig, GuestSettings};
use crate::context::{GuestContext, IdentityBundle};
use crate::error::{GuestError, Result};
use crate::events::{GuestCommand, GuestEvent, Notice};
use crate::handshake::HostBridge;
use crate::store::{PreferenceStore, StoreConnector};
use crate::sync::PreferenceSync;
use crate::worker::{StoreJob, StoreWork, StoreWorker, TrustUpdate, SAVE_FAILED};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub struct Guest {
    settings: GuestSettings,
    connector: Arc<dyn StoreConnector>,
    context: GuestContext,
    /// Bumped on every setContext so stale verification results are ignored
    generation: u64,
    /// Built at setContext time with the CSRF token as a default header
    store: Option<Arc<dyn PreferenceStore>>,
    bindings: NameBindings,
    events: mpsc::Sender<GuestEvent>,
}

impl Guest {
    pub fn new(
        settings: GuestSettings,
        connector: Arc<dyn StoreConnector>,
        events: mpsc::Sender<GuestEvent>,
    ) -> Self {
        Self {
            settings,
            connector,
            context: GuestContext::new(),
            generation: 0,
            store: None,
            bindings: NameBindings::default(),
            events,
        }
    }

    /// Guest talking HTTP to the store described in `config`
    pub fn from_config(config: &GuestConfig, events: mpsc::Sender<GuestEvent>) -> Self {
        Self::new(config.guest.clone(), Arc::new(config.store.clone()), events)
    }

    pub fn context(&self) -> &GuestContext {
        &self.context
    }

    pub fn bindings(&self) -> &NameBindings {
        &self.bindings
    }

    /// Signal readiness, then handle commands until the channel closes.
    ///
    /// The command receiver already exists when the host is called, so the
    /// host's `SetContext` is queued rather than lost. Returns the guest once
    /// every sender is gone and the store work already queued has finished.
    pub async fn run<H: HostBridge>(mut self, mut commands: mpsc::Receiver<GuestCommand>, host: H) -> Self {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (trust_tx, mut trust_rx) = mpsc::unbounded_channel();
        let worker = StoreWorker::new(self.settings.require_trusted_session, self.events.clone(), trust_tx);
        let worker = tokio::spawn(worker.run(job_rx));

        info!("guest ready, requesting context from host");
        if let Err(e) = host.set_up_frame().await {
            error!(error = %e, "host did not answer readiness, continuing without context");
        }
        drop(host);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command, &job_tx).await,
                    None => break,
                },
                Some(update) = trust_rx.recv() => self.apply_trust(update),
            }
        }

        info!("command channel closed, waiting for store work");
        drop(job_tx);
        if let Err(e) = worker.await {
            error!(error = %e, "store worker did not finish cleanly");
        }
        while let Ok(update) = trust_rx.try_recv() {
            self.apply_trust(update);
        }

        info!("guest stopped");
        self
    }

    async fn handle(&mut self, command: GuestCommand, jobs: &mpsc::UnboundedSender<StoreJob>) {
        debug!(op = command.name(), "handling command");

        match command {
            GuestCommand::SetContext(identity) => self.set_context(identity),
            GuestCommand::SetAppMode(mode) => {
                info!(%mode, "app mode set");
                self.context.set_mode(mode);
            }
            GuestCommand::ValidateSession => {
                if let Err(e) = self.dispatch(StoreWork::Validate, jobs) {
                    warn!(error = %e, "session validation skipped");
                }
            }
            GuestCommand::SaveScores(raw) => {
                let queued = PreferenceSync::parse_scores(&raw)
                    .and_then(|scores| self.dispatch(StoreWork::Save(scores), jobs));
                if let Err(e) = queued {
                    warn!(error = %e, "save skipped");
                    self.emit(GuestEvent::Notice(Notice::warning(SAVE_FAILED))).await;
                }
            }
            GuestCommand::LoadScores => {
                if let Err(e) = self.dispatch(StoreWork::Load(self.bindings.clone()), jobs) {
                    warn!(error = %e, "load skipped");
                }
            }
            GuestCommand::BindDamNames(names) => {
                debug!(count = names.len(), "dam names bound");
                self.bindings.set_dam_names(names);
            }
            GuestCommand::BindCritNames(names) => {
                debug!(count = names.len(), "criterion names bound");
                self.bindings.set_criterion_names(names);
            }
            GuestCommand::NotifyNoFileSelected => {
                self.user_input_error(GuestError::UserInput("No file selected".into()))
                    .await;
            }
            GuestCommand::NotifyInvalidFile(reason) => {
                self.user_input_error(GuestError::UserInput(format!("Invalid file: {}", reason)))
                    .await;
            }
            GuestCommand::CheckUserHasGroup => {
                let status = self.context.group_status();
                self.emit(GuestEvent::GroupCheck(status)).await;
            }
        }
    }

    fn set_context(&mut self, identity: IdentityBundle) {
        self.store = match self.connector.connect(&identity.csrf_token) {
            Ok(store) => Some(store),
            Err(e) => {
                error!(error = %e, "could not build store client, persistence disabled");
                None
            }
        };

        info!(
            user = identity.user_id,
            username = %identity.username,
            group = ?identity.group_id,
            "context received from host"
        );
        self.generation += 1;
        self.context.set_identity(identity);
    }

    fn store(&self) -> Result<Arc<dyn PreferenceStore>> {
        self.context.identity()?;
        self.store
            .clone()
            .ok_or_else(|| GuestError::StoreUnavailable("no store client for this context".into()))
    }

    /// Queue store work against a snapshot of the current context
    fn dispatch(&self, work: StoreWork, jobs: &mpsc::UnboundedSender<StoreJob>) -> Result<()> {
        let job = StoreJob {
            generation: self.generation,
            context: self.context.clone(),
            store: self.store()?,
            work,
        };
        jobs.send(job)
            .map_err(|_| GuestError::ChannelClosed("store worker stopped".into()))
    }

    fn apply_trust(&mut self, update: TrustUpdate) {
        if update.generation != self.generation {
            debug!(generation = update.generation, "ignoring verification for a replaced context");
            return;
        }
        self.context.set_trust(update.trust);
    }

    async fn user_input_error(&self, e: GuestError) {
        warn!(error = %e, "user input rejected");
        self.emit(GuestEvent::Notice(Notice::blocking(e.to_string()))).await;
    }

    async fn emit(&self, event: GuestEvent) {
        if self.events.send(event).await.is_err() {
            debug!("host event channel closed, dropping event");
        }
    }
}
