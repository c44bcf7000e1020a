use crate::application::confirmation::{
    run_confirmation, ConfirmationPoller, PollConfig, PollPhase, PollSnapshot, StatusSource,
};
use crate::domain::TransactionStatus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long finished watches stay readable
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

struct Watch {
    cancel: CancellationToken,
    state: watch::Receiver<PollSnapshot>,
}

impl Watch {
    fn snapshot(&self) -> PollSnapshot {
        self.state.borrow().clone()
    }
}

/// Background confirmation pollers, one per reference
pub struct ConfirmationRegistry<S> {
    source: Arc<S>,
    config: PollConfig,
    retention: Duration,
    watches: Mutex<HashMap<String, Watch>>,
}

impl<S: StatusSource + 'static> ConfirmationRegistry<S> {
    pub fn new(source: Arc<S>, config: PollConfig) -> Self {
        Self {
            source,
            config,
            retention: DEFAULT_RETENTION,
            watches: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Starts polling `reference` unless a watch is already running or has
    /// settled the payment. Timed-out and cancelled watches are restarted.
    pub fn watch(&self, reference: &str) -> PollSnapshot {
        let now = Instant::now();
        let mut watches = self.lock();
        self.prune(&mut watches, now);

        if let Some(existing) = watches.get(reference) {
            let snapshot = existing.snapshot();
            if !matches!(snapshot.phase, PollPhase::TimedOut | PollPhase::Cancelled) {
                debug!("Reusing confirmation watch for {}", reference);
                return snapshot;
            }
        }

        let mut poller = ConfirmationPoller::new(reference, self.config, now);
        let initial = poller.snapshot(now);
        let (sender, receiver) = watch::channel(initial.clone());
        let cancel = CancellationToken::new();

        let source = self.source.clone();
        let token = cancel.clone();
        let config = self.config;
        let reference = reference.to_string();

        info!(
            "Watching payment {} every {}s for up to {}s",
            reference,
            config.interval.as_secs(),
            config.budget.as_secs()
        );

        watches.insert(
            reference.clone(),
            Watch {
                cancel,
                state: receiver,
            },
        );

        tokio::spawn(async move {
            let outcome = run_confirmation(source.as_ref(), &mut poller, &token, |p| {
                let _ = sender.send(p.snapshot(Instant::now()));
            })
            .await;

            match outcome.into_result(&reference, &config) {
                Ok(()) => info!("Confirmation watch for {} finished: payment confirmed", reference),
                Err(e) => warn!("Confirmation watch for {} finished: {}", reference, e),
            }
        });

        initial
    }

    pub fn snapshot(&self, reference: &str) -> Option<PollSnapshot> {
        self.lock().get(reference).map(Watch::snapshot)
    }

    /// Status known from a running or settled watch, so callers need not
    /// query the provider alongside it
    pub fn watched_status(&self, reference: &str) -> Option<TransactionStatus> {
        let watches = self.lock();
        let existing = watches.get(reference)?;
        if existing.cancel.is_cancelled() {
            return None;
        }
        existing.snapshot().phase.transaction_status()
    }

    /// Cancels a running watch. Returns false when none is running.
    pub fn cancel(&self, reference: &str) -> bool {
        let watches = self.lock();
        match watches.get(reference) {
            Some(existing)
                if !existing.cancel.is_cancelled() && !existing.snapshot().phase.is_terminal() =>
            {
                existing.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancels every running watch, used on shutdown
    pub fn cancel_all(&self) -> usize {
        let watches = self.lock();
        let mut cancelled = 0;
        for existing in watches.values() {
            if !existing.cancel.is_cancelled() && !existing.snapshot().phase.is_terminal() {
                existing.cancel.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    fn prune(&self, watches: &mut HashMap<String, Watch>, now: Instant) {
        let retention = self.retention;
        watches.retain(|_, existing| match existing.snapshot().finished_at {
            Some(finished_at) => now.saturating_duration_since(finished_at) < retention,
            None => true,
        });
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Watch>> {
        self.watches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
