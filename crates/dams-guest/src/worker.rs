//! Store worker
//!
//! Every store round-trip runs here, off the coordinator, so local commands
//! are answered while a request is in flight. Jobs run in the order they were
//! queued: a validation queued before a save settles before that save checks
//! trust, and within a save the lookup still completes before the write.

use crate::aggregate::NameBindings;
use crate::context::{GuestContext, SessionTrust};
use crate::events::{GuestEvent, Notice};
use crate::session::SessionValidator;
use crate::store::PreferenceStore;
use crate::sync::{LoadOutcome, PreferenceSync};
use dams_store_client::Scores;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub(crate) const INVALID_SESSION: &str =
    "Invalid session: saving and loading scores are unavailable. Please try reloading.";
pub(crate) const SAVE_FAILED: &str = "Unable to save scores";

pub(crate) enum StoreWork {
    Validate,
    Save(Scores),
    /// Bindings as they were when the load was requested
    Load(NameBindings),
}

/// One store operation with the context it was requested in
pub(crate) struct StoreJob {
    /// Context generation the snapshot belongs to; bumped on every setContext
    pub generation: u64,
    pub context: GuestContext,
    pub store: Arc<dyn PreferenceStore>,
    pub work: StoreWork,
}

/// Verification result handed back to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrustUpdate {
    pub generation: u64,
    pub trust: SessionTrust,
}

pub(crate) struct StoreWorker {
    require_trusted_session: bool,
    events: mpsc::Sender<GuestEvent>,
    trust_updates: mpsc::UnboundedSender<TrustUpdate>,
    /// Latest verification this worker completed
    settled: Option<TrustUpdate>,
}

impl StoreWorker {
    pub fn new(
        require_trusted_session: bool,
        events: mpsc::Sender<GuestEvent>,
        trust_updates: mpsc::UnboundedSender<TrustUpdate>,
    ) -> Self {
        Self {
            require_trusted_session,
            events,
            trust_updates,
            settled: None,
        }
    }

    /// Execute jobs until the coordinator drops its sender
    pub async fn run(mut self, mut jobs: mpsc::UnboundedReceiver<StoreJob>) {
        while let Some(job) = jobs.recv().await {
            self.execute(job).await;
        }
        debug!("store worker stopped");
    }

    async fn execute(&mut self, job: StoreJob) {
        let StoreJob {
            generation,
            mut context,
            store,
            work,
        } = job;

        // The snapshot predates any verification still queued ahead of it
        if let Some(settled) = self.settled.filter(|s| s.generation == generation) {
            context.set_trust(settled.trust);
        }

        match work {
            StoreWork::Validate => self.validate(generation, &mut context, store.as_ref()).await,
            StoreWork::Save(scores) => self.save(&context, store.as_ref(), scores).await,
            StoreWork::Load(bindings) => self.load(&context, store.as_ref(), &bindings).await,
        }
    }

    fn sync<'a>(&self, store: &'a dyn PreferenceStore) -> PreferenceSync<'a> {
        let sync = PreferenceSync::new(store);
        if self.require_trusted_session {
            sync
        } else {
            sync.without_trust_gate()
        }
    }

    async fn validate(&mut self, generation: u64, context: &mut GuestContext, store: &dyn PreferenceStore) {
        let validation = match SessionValidator::new(store).validate(context).await {
            Ok(validation) => validation,
            Err(e) => {
                warn!(error = %e, "session validation skipped");
                return;
            }
        };

        let update = TrustUpdate {
            generation,
            trust: validation.trust,
        };
        self.settled = Some(update);
        if self.trust_updates.send(update).is_err() {
            debug!("coordinator gone, trust update dropped");
        }

        if validation.newly_rejected {
            self.emit(GuestEvent::Notice(Notice::warning(INVALID_SESSION))).await;
        }
    }

    async fn save(&self, context: &GuestContext, store: &dyn PreferenceStore, scores: Scores) {
        match self.sync(store).save(context, scores).await {
            Ok(outcome) => {
                debug!(?outcome, "save complete");
                self.emit(GuestEvent::Notice(Notice::info("Scores saved"))).await;
            }
            Err(e) if e.is_degraded_context() => {
                warn!(error = %e, "save skipped");
                self.emit(GuestEvent::Notice(Notice::warning(SAVE_FAILED))).await;
            }
            Err(e) => {
                error!(error = %e, "save failed");
                self.emit(GuestEvent::Notice(Notice::warning(SAVE_FAILED))).await;
            }
        }
    }

    async fn load(&self, context: &GuestContext, store: &dyn PreferenceStore, bindings: &NameBindings) {
        match self.sync(store).load(context, bindings).await {
            Ok(LoadOutcome::Loaded(updates)) => {
                info!(count = updates.len(), "scores loaded");
                for update in updates {
                    self.emit(GuestEvent::ScoreUpdate(update)).await;
                }
                self.emit(GuestEvent::ScoresLoaded).await;
            }
            Ok(LoadOutcome::Empty) | Ok(LoadOutcome::Unavailable) => {}
            Err(e) => warn!(error = %e, "load skipped"),
        }
    }

    async fn emit(&self, event: GuestEvent) {
        if self.events.send(event).await.is_err() {
            debug!("host event channel closed, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppMode;
    use crate::test_support::{identity, FakeStore};

    struct Harness {
        store: Arc<FakeStore>,
        events: mpsc::Receiver<GuestEvent>,
        trust: mpsc::UnboundedReceiver<TrustUpdate>,
        jobs: mpsc::UnboundedSender<StoreJob>,
        worker: tokio::task::JoinHandle<()>,
    }

    fn harness(store: FakeStore) -> Harness {
        let (event_tx, events) = mpsc::channel(32);
        let (trust_tx, trust) = mpsc::unbounded_channel();
        let (jobs, job_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(StoreWorker::new(true, event_tx, trust_tx).run(job_rx));
        Harness {
            store: Arc::new(store),
            events,
            trust,
            jobs,
            worker,
        }
    }

    fn unverified(group: Option<i64>, mode: AppMode) -> GuestContext {
        let mut ctx = GuestContext::new();
        ctx.set_identity(identity(group));
        ctx.set_mode(mode);
        ctx
    }

    impl Harness {
        fn queue(&self, generation: u64, context: &GuestContext, work: StoreWork) {
            let job = StoreJob {
                generation,
                context: context.clone(),
                store: self.store.clone(),
                work,
            };
            assert!(self.jobs.send(job).is_ok());
        }

        async fn finish(self) -> (Arc<FakeStore>, Vec<GuestEvent>, Vec<TrustUpdate>) {
            let Harness {
                store,
                mut events,
                mut trust,
                jobs,
                worker,
            } = self;
            drop(jobs);
            worker.await.unwrap();

            let mut emitted = Vec::new();
            while let Ok(event) = events.try_recv() {
                emitted.push(event);
            }
            let mut updates = Vec::new();
            while let Ok(update) = trust.try_recv() {
                updates.push(update);
            }
            (store, emitted, updates)
        }
    }

    #[tokio::test]
    async fn test_save_sees_validation_queued_before_it() {
        let h = harness(FakeStore::default());
        let ctx = unverified(None, AppMode::Individual);

        h.queue(1, &ctx, StoreWork::Validate);
        h.queue(1, &ctx, StoreWork::Save(Scores::new()));
        let (store, events, updates) = h.finish().await;

        assert_eq!(store.calls().created.len(), 1);
        assert_eq!(events, vec![GuestEvent::Notice(Notice::info("Scores saved"))]);
        assert_eq!(
            updates,
            vec![TrustUpdate {
                generation: 1,
                trust: SessionTrust::Trusted
            }]
        );
    }

    #[tokio::test]
    async fn test_trust_does_not_carry_into_new_context() {
        let h = harness(FakeStore::default());
        let ctx = unverified(None, AppMode::Individual);

        h.queue(1, &ctx, StoreWork::Validate);
        h.queue(2, &ctx, StoreWork::Save(Scores::new()));
        let (store, events, _) = h.finish().await;

        assert_eq!(store.calls().list.len(), 0);
        assert_eq!(events, vec![GuestEvent::Notice(Notice::warning(SAVE_FAILED))]);
    }

    #[tokio::test]
    async fn test_repeated_rejection_notifies_once() {
        let h = harness(FakeStore::rejecting_sessions());
        let ctx = unverified(None, AppMode::Individual);

        h.queue(1, &ctx, StoreWork::Validate);
        h.queue(1, &ctx, StoreWork::Validate);
        let (store, events, updates) = h.finish().await;

        assert_eq!(store.calls().verify, 2);
        assert_eq!(events, vec![GuestEvent::Notice(Notice::warning(INVALID_SESSION))]);
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.trust == SessionTrust::Rejected));
    }
}
