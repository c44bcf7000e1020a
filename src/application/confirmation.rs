use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::TransactionStatus;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Poll timing
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Pause between two status queries
    pub interval: Duration,
    /// Hard wall-clock deadline measured from the start of polling
    pub budget: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            budget: Duration::from_secs(180),
        }
    }
}

/// Local confirmation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollPhase {
    Pending,
    Successful,
    Failed,
    /// Budget exhausted; the provider may still settle the payment later
    TimedOut,
    Cancelled,
}

impl PollPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollPhase::Pending)
    }

    /// Ledger status this phase reflects. Timed-out and cancelled watches
    /// no longer track the provider.
    pub fn transaction_status(&self) -> Option<TransactionStatus> {
        match self {
            PollPhase::Pending => Some(TransactionStatus::Pending),
            PollPhase::Successful => Some(TransactionStatus::Successful),
            PollPhase::Failed => Some(TransactionStatus::Failed),
            PollPhase::TimedOut | PollPhase::Cancelled => None,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            PollPhase::Pending => "Waiting for you to confirm the payment on your phone.",
            PollPhase::Successful => ConfirmationOutcome::Successful.user_message(),
            PollPhase::Failed => ConfirmationOutcome::Failed.user_message(),
            PollPhase::TimedOut => ConfirmationOutcome::TimedOut.user_message(),
            PollPhase::Cancelled => ConfirmationOutcome::Cancelled.user_message(),
        }
    }
}

/// What the driver should do on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    Query,
    Stop(PollPhase),
}

/// Terminal result handed back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Successful,
    Failed,
    TimedOut,
    Cancelled,
}

impl ConfirmationOutcome {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfirmationOutcome::Successful => "Payment confirmed. Your download is unlocked.",
            ConfirmationOutcome::Failed => "Payment failed. Please try again.",
            ConfirmationOutcome::TimedOut => {
                "We did not receive a confirmation in time. Check your phone for a pending payment prompt, then try again."
            }
            ConfirmationOutcome::Cancelled => "Payment confirmation cancelled.",
        }
    }

    pub fn into_result(self, reference: &str, config: &PollConfig) -> DomainResult<()> {
        match self {
            ConfirmationOutcome::Successful => Ok(()),
            ConfirmationOutcome::Failed => Err(DomainError::PaymentDeclined(reference.to_string())),
            ConfirmationOutcome::TimedOut => Err(DomainError::Timeout(config.budget.as_secs())),
            ConfirmationOutcome::Cancelled => Err(DomainError::Cancelled(reference.to_string())),
        }
    }
}

/// Point-in-time view of a poller
#[derive(Debug, Clone, Serialize)]
pub struct PollSnapshot {
    pub reference: String,
    pub phase: PollPhase,
    /// Status queries issued so far
    pub queries: u32,
    pub consecutive_errors: u32,
    pub elapsed_ms: u64,
    /// Gated download may be released
    pub unlocked: bool,
    #[serde(skip)]
    pub finished_at: Option<Instant>,
}

/// Confirmation state machine for one reference.
///
/// Holds no timers: the caller decides when a tick happens and feeds query
/// results back, so the whole machine runs on whatever clock it is given.
#[derive(Debug, Clone)]
pub struct ConfirmationPoller {
    reference: String,
    config: PollConfig,
    started_at: Instant,
    phase: PollPhase,
    queries: u32,
    consecutive_errors: u32,
    finished_at: Option<Instant>,
}

impl ConfirmationPoller {
    pub fn new(reference: impl Into<String>, config: PollConfig, started_at: Instant) -> Self {
        Self {
            reference: reference.into(),
            config,
            started_at,
            phase: PollPhase::Pending,
            queries: 0,
            consecutive_errors: 0,
            finished_at: None,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn deadline(&self) -> Instant {
        self.started_at + self.config.budget
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn queries(&self) -> u32 {
        self.queries
    }

    /// Decides whether a query is due. Past the deadline the poller times
    /// out instead, however many ticks happened.
    pub fn begin_tick(&mut self, now: Instant) -> TickAction {
        if self.phase.is_terminal() {
            return TickAction::Stop(self.phase);
        }

        if now >= self.deadline() {
            info!(
                "Payment {} not confirmed within {}s after {} queries",
                self.reference,
                self.config.budget.as_secs(),
                self.queries
            );
            self.finish(PollPhase::TimedOut, now);
            return TickAction::Stop(self.phase);
        }

        self.queries += 1;
        TickAction::Query
    }

    /// Feeds back the result of the query issued by the last tick.
    ///
    /// Query errors are transient: they are logged and polling goes on.
    pub fn record(
        &mut self,
        result: DomainResult<Option<TransactionStatus>>,
        now: Instant,
    ) -> PollPhase {
        if self.phase.is_terminal() {
            debug!(
                "Ignoring late status for {} in phase {:?}",
                self.reference, self.phase
            );
            return self.phase;
        }

        match result {
            Ok(Some(TransactionStatus::Successful)) => {
                self.consecutive_errors = 0;
                info!("Payment {} confirmed", self.reference);
                self.finish(PollPhase::Successful, now);
            }
            Ok(Some(TransactionStatus::Failed)) => {
                self.consecutive_errors = 0;
                info!("Payment {} failed", self.reference);
                self.finish(PollPhase::Failed, now);
            }
            Ok(status) => {
                self.consecutive_errors = 0;
                debug!(
                    "Payment {} still pending (provider status: {:?})",
                    self.reference, status
                );
            }
            Err(e) => {
                self.consecutive_errors += 1;
                warn!(
                    "Status query for {} failed ({} in a row): {}",
                    self.reference, self.consecutive_errors, e
                );
            }
        }

        self.phase
    }

    /// Stops a running poller. Returns false if it had already finished.
    pub fn cancel(&mut self, now: Instant) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        info!("Confirmation of {} cancelled", self.reference);
        self.finish(PollPhase::Cancelled, now);
        true
    }

    pub fn outcome(&self) -> Option<ConfirmationOutcome> {
        match self.phase {
            PollPhase::Pending => None,
            PollPhase::Successful => Some(ConfirmationOutcome::Successful),
            PollPhase::Failed => Some(ConfirmationOutcome::Failed),
            PollPhase::TimedOut => Some(ConfirmationOutcome::TimedOut),
            PollPhase::Cancelled => Some(ConfirmationOutcome::Cancelled),
        }
    }

    pub fn snapshot(&self, now: Instant) -> PollSnapshot {
        let until = self.finished_at.unwrap_or(now);
        PollSnapshot {
            reference: self.reference.clone(),
            phase: self.phase,
            queries: self.queries,
            consecutive_errors: self.consecutive_errors,
            elapsed_ms: until.saturating_duration_since(self.started_at).as_millis() as u64,
            unlocked: self.phase == PollPhase::Successful,
            finished_at: self.finished_at,
        }
    }

    fn finish(&mut self, phase: PollPhase, now: Instant) {
        self.phase = phase;
        self.finished_at = Some(now);
    }
}

/// Where the poller reads transaction status from
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// `Ok(None)` means the provider answered with a status the ledger does
    /// not know; polling continues.
    async fn query_status(&self, reference: &str) -> DomainResult<Option<TransactionStatus>>;
}

/// Drives `poller` on the tokio clock until it reaches a terminal phase.
///
/// The first query happens one interval after `started_at`, and each later
/// one an interval after the previous tick completed. At most one query is in
/// flight. Cancelling `cancel` or reaching the deadline drops it and no
/// further query is issued. `observe` sees the poller after every tick.
pub async fn run_confirmation<S, F>(
    source: &S,
    poller: &mut ConfirmationPoller,
    cancel: &CancellationToken,
    mut observe: F,
) -> ConfirmationOutcome
where
    S: StatusSource + ?Sized,
    F: FnMut(&ConfirmationPoller),
{
    let reference = poller.reference().to_string();
    let interval = poller.config().interval;
    let deadline = poller.deadline();
    let mut next_tick = poller.started_at() + interval;

    loop {
        if let Some(outcome) = poller.outcome() {
            return outcome;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                poller.cancel(Instant::now());
            }
            _ = tokio::time::sleep_until(next_tick) => {
                if poller.begin_tick(Instant::now()) == TickAction::Query {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            poller.cancel(Instant::now());
                        }
                        _ = tokio::time::sleep_until(deadline) => {
                            warn!("Status query for {} still running at the deadline, dropped", reference);
                            poller.begin_tick(Instant::now());
                        }
                        result = source.query_status(&reference) => {
                            poller.record(result, Instant::now());
                        }
                    }
                }
            }
        }

        observe(poller);
        next_tick = Instant::now() + interval;
    }
}
