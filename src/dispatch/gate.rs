//! Dispatch gate.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{Instrument, debug, error, instrument, warn};

use super::{registry::WorkerRegistry, worker::ManagedWorker};
use crate::{
    backend::{BackendError, BackendSession},
    bus::domain::AgentId,
    config::{DispatchConfig, QueueMode},
    output::{ChannelStatus, StatusIndicator},
    telemetry,
};

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Why a prompt was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The worker already used every allowed turn.
    TurnBudgetExhausted,
    /// The engine queue for the worker is full.
    QueueFull,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TurnBudgetExhausted => "turn budget exhausted",
            Self::QueueFull => "queue full",
        })
    }
}

/// What happened to a dispatched prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The prompt ran, followed by `turns - 1` prompts drained from the
    /// engine queue.
    Completed {
        /// Backend turns executed by this call.
        turns: u32,
    },
    /// The worker was busy; the prompt waits behind the running turn.
    Enqueued,
    /// The prompt was discarded without reaching the backend.
    Dropped(DropReason),
}

/// Dispatch failures.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The worker is not registered.
    #[error("unknown worker: {0}")]
    UnknownWorker(AgentId),

    /// The backend rejected the turn.
    #[error("backend call for worker {worker} failed: {source}")]
    Backend {
        /// Worker whose turn failed.
        worker: AgentId,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
}

impl DispatchError {
    /// Returns `true` for authentication failures the caller should treat
    /// as fatal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Backend { source, .. } if source.is_authentication())
    }
}

/// Seam through which prompts reach workers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Offers `prompt` to `worker`.
    async fn dispatch(&self, worker: &AgentId, prompt: String) -> DispatchResult<DispatchOutcome>;
}

enum Admission {
    Drop(DropReason),
    Queued,
    Forward {
        session: Arc<dyn BackendSession>,
        prompt: String,
    },
    Run {
        session: Arc<dyn BackendSession>,
        prompt: String,
        turn: u32,
    },
}

/// Busy-flag and turn-budget admission controller.
///
/// Admission decisions happen under the registry lock, so two
/// near-simultaneous dispatches for one worker can never both start a
/// backend turn.
pub struct DispatchGate {
    workers: Arc<WorkerRegistry>,
    status: Arc<dyn StatusIndicator>,
    settings: DispatchConfig,
}

impl DispatchGate {
    /// Creates a gate over `workers`.
    #[must_use]
    pub fn new(
        workers: Arc<WorkerRegistry>,
        status: Arc<dyn StatusIndicator>,
        settings: DispatchConfig,
    ) -> Self {
        Self {
            workers,
            status,
            settings,
        }
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn settings(&self) -> &DispatchConfig {
        &self.settings
    }

    /// Sends, queues, or drops `prompt` for `worker`.
    ///
    /// A prompt handed to the backend queue is charged one turn when it is
    /// admitted, so the backend never runs more than `max_turns` prompts
    /// for a worker. Returns once the backend turn settles, or immediately when the
    /// prompt is queued or dropped. In engine queue mode the call keeps
    /// draining the worker's queue before it returns.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownWorker`] for unregistered workers
    /// and [`DispatchError::Backend`] when the backend rejects a turn or an
    /// enqueue.
    #[instrument(skip_all, fields(worker = %worker))]
    pub async fn dispatch(
        &self,
        worker: &AgentId,
        prompt: String,
    ) -> DispatchResult<DispatchOutcome> {
        let admission = self
            .workers
            .with_worker(worker, |managed| self.admit(managed, prompt))
            .ok_or_else(|| DispatchError::UnknownWorker(worker.clone()))?;

        match admission {
            Admission::Drop(reason) => {
                warn!(
                    worker = %worker,
                    reason = %reason,
                    max_turns = self.settings.max_turns,
                    "prompt dropped"
                );
                Ok(DispatchOutcome::Dropped(reason))
            }
            Admission::Queued => {
                debug!(worker = %worker, "prompt queued in engine");
                Ok(DispatchOutcome::Enqueued)
            }
            Admission::Forward { session, prompt } => {
                session
                    .enqueue(&prompt)
                    .await
                    .map_err(|source| self.record_failure(worker, source))?;
                debug!(worker = %worker, "prompt queued in backend session");
                Ok(DispatchOutcome::Enqueued)
            }
            Admission::Run {
                session,
                prompt,
                turn,
            } => self.run(worker, session.as_ref(), prompt, turn).await,
        }
    }

    fn admit(&self, worker: &mut ManagedWorker, prompt: String) -> Admission {
        if worker.turn_count() >= self.settings.max_turns {
            return Admission::Drop(DropReason::TurnBudgetExhausted);
        }
        if worker.is_busy() {
            return match self.settings.queue_mode {
                QueueMode::Backend => {
                    worker.reserve_turn();
                    Admission::Forward {
                        session: worker.session(),
                        prompt,
                    }
                }
                QueueMode::Engine => {
                    if worker.push_queued(prompt, self.settings.max_queued) {
                        Admission::Queued
                    } else {
                        Admission::Drop(DropReason::QueueFull)
                    }
                }
            };
        }
        let turn = worker.begin_turn();
        Admission::Run {
            session: worker.session(),
            prompt,
            turn,
        }
    }

    async fn run(
        &self,
        worker: &AgentId,
        session: &dyn BackendSession,
        prompt: String,
        turn: u32,
    ) -> DispatchResult<DispatchOutcome> {
        let mut next = Some((prompt, turn));
        let mut executed = 0_u32;
        while let Some((current, turn_number)) = next.take() {
            self.status.set_status(worker, ChannelStatus::Working);
            let result = session
                .send_and_wait(&current)
                .instrument(telemetry::dispatch_span(worker, turn_number))
                .await;
            executed += 1;
            if let Err(source) = result {
                return Err(self.settle_failed(worker, turn_number, source));
            }
            next = self
                .workers
                .with_worker(worker, |managed| self.next_queued(managed))
                .flatten();
        }
        if self.workers.contains(worker) {
            self.status.set_status(worker, ChannelStatus::Idle);
        }
        Ok(DispatchOutcome::Completed { turns: executed })
    }

    fn next_queued(&self, worker: &mut ManagedWorker) -> Option<(String, u32)> {
        while let Some(prompt) = worker.pop_queued() {
            if worker.turn_count() >= self.settings.max_turns {
                warn!(
                    worker = %worker.id(),
                    reason = %DropReason::TurnBudgetExhausted,
                    "queued prompt dropped"
                );
                continue;
            }
            let turn = worker.begin_turn();
            return Some((prompt, turn));
        }
        worker.settle();
        None
    }

    fn settle_failed(&self, worker: &AgentId, turn: u32, source: BackendError) -> DispatchError {
        let discarded = self
            .workers
            .with_worker(worker, |managed| {
                managed.settle();
                managed.clear_queue()
            })
            .unwrap_or_default();
        if discarded > 0 {
            warn!(worker = %worker, discarded, "queued prompts discarded after backend failure");
        }
        debug!(worker = %worker, turn, "turn settled with failure");
        let err = self.record_failure(worker, source);
        if self.workers.contains(worker) {
            self.status.set_status(worker, ChannelStatus::Idle);
            self.status.annotate(worker, &format!("[error] {err}"));
        }
        err
    }

    fn record_failure(&self, worker: &AgentId, source: BackendError) -> DispatchError {
        let fatal = source.is_authentication();
        if fatal {
            error!(worker = %worker, fatal = true, error = %source, "backend rejected credentials");
        } else {
            error!(worker = %worker, error = %source, "backend call failed");
        }
        self.workers
            .with_worker(worker, |managed| managed.record_error(source.to_string()));
        DispatchError::Backend {
            worker: worker.clone(),
            source,
        }
    }
}

#[async_trait]
impl Dispatcher for DispatchGate {
    async fn dispatch(&self, worker: &AgentId, prompt: String) -> DispatchResult<DispatchOutcome> {
        Self::dispatch(self, worker, prompt).await
    }
}

impl fmt::Debug for DispatchGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchGate")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
