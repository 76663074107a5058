//! The analysis event consumer.
//!
//! A cooperative polling loop over one subscription channel:
//!
//! ```text
//! Idle ──start──▶ WaitingForEvent ──notification──▶ Processing
//!  ▲                  │                              │      │
//!  └──nothing in time─┘◀───────success / dropped─────┘      │
//!                     ▲                                     ▼
//!                     └──────────retry same event─────── Backoff
//! ```
//!
//! Processing decrypts the delivered service, classifies its observation,
//! re-reads the containing contact, rewrites the service's tags, and
//! writes the contact back. Every write round-trips through a fresh read,
//! so a conflicting writer costs a retry, never a lost update.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use vigil_core::{Classification, CodeStub, Thresholds};

use crate::error::{EventError, Result, RuntimeError};
use crate::event::{EntityRef, SubscriptionEvent};
use crate::retry::RetryPolicy;
use crate::runtime::{EncryptedRuntime, EventChannel};

/// Where the consumer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Not polling.
    Idle,
    /// Polling the channel.
    WaitingForEvent,
    /// Handling a notification.
    Processing,
    /// Sleeping before retrying a failed notification.
    Backoff,
}

/// Consumer settings.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// How long one poll waits for an event.
    pub poll_interval: Duration,
    /// Retry bound and backoff curve.
    pub retry: RetryPolicy,
    /// Classification interval.
    pub thresholds: Thresholds,
    /// Content locale holding the observation.
    pub locale: String,
    /// Workflow tag marking services awaiting analysis.
    pub sentinel: CodeStub,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            retry: RetryPolicy::default(),
            thresholds: Thresholds::default(),
            locale: "en".to_string(),
            sentinel: CodeStub::pending_analysis(),
        }
    }
}

impl ConsumerConfig {
    /// Check every setting is usable.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(EventError::InvalidConfig("poll interval must be positive".into()));
        }
        if self.locale.is_empty() {
            return Err(EventError::InvalidConfig("locale must not be empty".into()));
        }
        self.retry.validate()?;
        self.thresholds.validate()?;
        Ok(())
    }
}

/// Result of handling one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Tags rewritten and the contact updated.
    Classified(Classification),
    /// Tags already reflected the outcome; nothing written.
    Unchanged(Classification),
    /// No observation for the configured locale; nothing written.
    ContentAbsent,
}

/// Counters for one consumer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Services classified and written.
    pub classified: usize,
    /// Notifications whose tags were already up to date.
    pub unchanged: usize,
    /// Notifications skipped (no entity, no matching content).
    pub skipped: usize,
    /// Notifications given up on.
    pub dropped: usize,
    /// Retries performed.
    pub retries: usize,
    /// Heartbeats seen.
    pub heartbeats: usize,
    /// Error events and failed polls.
    pub stream_errors: usize,
}

/// Create a stop signal pair. Send `true` to stop the consumer.
pub fn stop_signal() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Drains a subscription and classifies what it delivers.
pub struct EventConsumer<R: EncryptedRuntime> {
    runtime: Arc<R>,
    config: ConsumerConfig,
    state: LoopState,
    report: ConsumerReport,
}

impl<R: EncryptedRuntime> EventConsumer<R> {
    /// Create a consumer. Fails if the configuration is unusable.
    pub fn new(runtime: Arc<R>, config: ConsumerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            runtime,
            config,
            state: LoopState::Idle,
            report: ConsumerReport::default(),
        })
    }

    /// Current loop state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Counters so far.
    pub fn report(&self) -> &ConsumerReport {
        &self.report
    }

    /// Poll until stopped or the channel closes.
    ///
    /// The stop signal is checked before each poll; a notification being
    /// processed always finishes first. Dropping the sender counts as a stop.
    pub async fn run<C>(&mut self, channel: &C, stop: watch::Receiver<bool>) -> ConsumerReport
    where
        C: EventChannel + ?Sized,
    {
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "event consumer started"
        );

        loop {
            if *stop.borrow() {
                tracing::info!("stop requested");
                break;
            }
            if stop.has_changed().is_err() {
                tracing::info!("stop handle dropped");
                break;
            }
            if !self.poll_once(channel).await {
                break;
            }
        }

        self.state = LoopState::Idle;
        tracing::info!(report = ?self.report, "event consumer stopped");
        self.report.clone()
    }

    /// One WaitingForEvent iteration. Returns `false` once the channel is closed.
    pub async fn poll_once<C>(&mut self, channel: &C) -> bool
    where
        C: EventChannel + ?Sized,
    {
        self.state = LoopState::WaitingForEvent;
        match channel.poll(self.config.poll_interval).await {
            Ok(Some(event)) => {
                self.handle_event(event).await;
                true
            }
            Ok(None) => {
                self.state = LoopState::Idle;
                tracing::trace!("no event within poll interval");
                true
            }
            Err(RuntimeError::ChannelClosed) => {
                tracing::warn!("subscription closed");
                false
            }
            Err(e) => {
                self.report.stream_errors += 1;
                tracing::warn!(error = %e, "subscription poll failed");
                self.state = LoopState::Idle;
                tokio::time::sleep(self.config.poll_interval).await;
                true
            }
        }
    }

    /// Dispatch one event.
    pub async fn handle_event(&mut self, event: SubscriptionEvent) {
        match event {
            SubscriptionEvent::Heartbeat => {
                self.report.heartbeats += 1;
                tracing::debug!("heartbeat");
            }
            SubscriptionEvent::Error { message } => {
                self.report.stream_errors += 1;
                tracing::warn!(%message, "runtime reported subscription error");
            }
            SubscriptionEvent::Notification {
                event_id,
                entity: None,
                ..
            } => {
                self.report.skipped += 1;
                tracing::debug!(%event_id, "notification without entity");
            }
            SubscriptionEvent::Notification {
                event_id,
                entity: Some(entity),
                ..
            } => {
                self.process_with_retry(&event_id, &entity).await;
            }
        }
        self.state = LoopState::WaitingForEvent;
    }

    async fn process_with_retry(&mut self, event_id: &str, entity: &EntityRef) {
        let max_attempts = self.config.retry.max_attempts;
        let mut attempt = 1;

        loop {
            self.state = LoopState::Processing;
            match self.process(entity).await {
                Ok(outcome) => {
                    self.record(event_id, entity, outcome);
                    return;
                }
                Err(e) if e.is_recoverable() && attempt < max_attempts => {
                    let delay = self.config.retry.delay_for_attempt(attempt);
                    self.state = LoopState::Backoff;
                    self.report.retries += 1;
                    tracing::warn!(
                        %event_id,
                        service = %entity.entity_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "recoverable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    self.report.dropped += 1;
                    tracing::error!(
                        %event_id,
                        service = %entity.entity_id,
                        attempts = attempt,
                        error = %e,
                        "unprocessable event"
                    );
                    return;
                }
            }
        }
    }

    fn record(&mut self, event_id: &str, entity: &EntityRef, outcome: ProcessOutcome) {
        match outcome {
            ProcessOutcome::Classified(classification) => {
                self.report.classified += 1;
                tracing::info!(
                    %event_id,
                    service = %entity.entity_id,
                    ?classification,
                    "service classified"
                );
            }
            ProcessOutcome::Unchanged(classification) => {
                self.report.unchanged += 1;
                tracing::debug!(
                    %event_id,
                    service = %entity.entity_id,
                    ?classification,
                    "tags already up to date"
                );
            }
            ProcessOutcome::ContentAbsent => {
                self.report.skipped += 1;
                tracing::debug!(
                    %event_id,
                    service = %entity.entity_id,
                    locale = %self.config.locale,
                    "no observation for locale"
                );
            }
        }
    }

    /// Classify one delivered service and write the result back.
    pub async fn process(
        &self,
        entity: &EntityRef,
    ) -> std::result::Result<ProcessOutcome, RuntimeError> {
        let service = self.runtime.decrypt(entity).await?;
        let Some(observation) = service.observation(&self.config.locale) else {
            return Ok(ProcessOutcome::ContentAbsent);
        };
        let classification = self.config.thresholds.classify(observation.value);

        let mut contact = self.runtime.fetch_latest(&entity.container_id).await?;
        let target = contact.service_mut(&service.id).ok_or_else(|| {
            RuntimeError::NotFound(format!("service {} in {}", service.id, entity.container_id))
        })?;

        if !target.retag(&self.config.sentinel, classification) {
            return Ok(ProcessOutcome::Unchanged(classification));
        }

        self.runtime.update(contact).await?;
        Ok(ProcessOutcome::Classified(classification))
    }
}
