//! Public lifecycle of the engine.
//!
//! The coordinator owns the worker set and wires the bus, dispatch gate,
//! poller, and output router together.

mod error;

pub use error::{CoordinatorError, CoordinatorResult};

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    backend::{BackendConfig, BackendFactory, SessionRequest},
    bus::{MessageBus, domain::AgentId},
    config::EngineConfig,
    dispatch::{
        DispatchGate, DispatchOutcome, Dispatcher, LEAD_ID, ManagedWorker, WorkerProfile,
        WorkerRegistry, WorkerSnapshot,
    },
    output::{ChannelStatus, OutputRouter, StatusIndicator},
    poller::MessagePoller,
    tools::WorkerTools,
};

/// Result of [`Coordinator::wait_for_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// No worker is busy or has queued prompts, no mail is unread, and no
    /// task is in progress.
    Settled,
    /// The timeout elapsed first.
    TimedOut,
}

/// Engine entry point.
pub struct Coordinator {
    config: EngineConfig,
    factory: Arc<dyn BackendFactory>,
    bus: Arc<MessageBus>,
    workers: Arc<WorkerRegistry>,
    router: Arc<OutputRouter>,
    gate: Arc<DispatchGate>,
    poller: Mutex<Option<Arc<MessagePoller>>>,
    launching: Arc<AtomicUsize>,
}

impl Coordinator {
    /// Creates a coordinator whose output router is selected from
    /// `config.output`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Config`] when `config` is out of range
    /// and [`CoordinatorError::Channel`] when the channel directory cannot
    /// be opened.
    pub fn new(config: EngineConfig, factory: Arc<dyn BackendFactory>) -> CoordinatorResult<Self> {
        config.validate()?;
        let router = OutputRouter::from_config(&config.output)?;
        Self::with_router(config, factory, router)
    }

    /// Creates a coordinator around an explicit router.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Config`] when `config` is out of range.
    pub fn with_router(
        config: EngineConfig,
        factory: Arc<dyn BackendFactory>,
        router: OutputRouter,
    ) -> CoordinatorResult<Self> {
        config.validate()?;
        let bus = Arc::new(MessageBus::new());
        let workers = Arc::new(WorkerRegistry::new());
        let router = Arc::new(router);
        let status: Arc<dyn StatusIndicator> = Arc::clone(&router) as Arc<dyn StatusIndicator>;
        let gate = Arc::new(DispatchGate::new(
            Arc::clone(&workers),
            status,
            config.dispatch.clone(),
        ));
        Ok(Self {
            config,
            factory,
            bus,
            workers,
            router,
            gate,
            poller: Mutex::new(None),
            launching: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the shared message bus.
    #[must_use]
    pub const fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Returns `true` between [`Self::start`] and [`Self::stop`].
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.poller_slot().is_some()
    }

    /// Starts the engine.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::AlreadyStarted`] when running.
    pub fn start(&self) -> CoordinatorResult<()> {
        let mut slot = self.poller_slot();
        if slot.is_some() {
            return Err(CoordinatorError::AlreadyStarted);
        }
        let dispatcher: Arc<dyn Dispatcher> = Arc::clone(&self.gate) as Arc<dyn Dispatcher>;
        *slot = Some(Arc::new(MessagePoller::new(
            Arc::clone(&self.bus),
            dispatcher,
            self.config.poller.interval(),
        )));
        info!(
            max_turns = self.config.dispatch.max_turns,
            interval_ms = self.config.poller.interval_ms,
            "coordinator started"
        );
        Ok(())
    }

    /// Stops timers, destroys sessions, clears state, and closes channels.
    ///
    /// Teardown is best effort: every step runs even when an earlier one
    /// failed. Stopping an engine that is not running does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Teardown`] with every collected failure.
    pub async fn stop(&self) -> CoordinatorResult<()> {
        let Some(poller) = self.poller_slot().take() else {
            return Ok(());
        };
        poller.stop_all();

        let ids = self.workers.ids();
        let mut failures = Vec::new();
        for id in &ids {
            if let Some(session) = self.workers.session(id)
                && let Err(err) = session.destroy().await
            {
                warn!(worker = %id, error = %err, "session teardown failed");
                failures.push(format!("{id}: {err}"));
            }
        }

        self.workers.drain();
        self.bus.reset();

        for err in self.router.close_all(&ids) {
            warn!(error = %err, "channel close failed");
            failures.push(err.to_string());
        }

        info!(workers = ids.len(), failures = failures.len(), "coordinator stopped");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CoordinatorError::Teardown(failures))
        }
    }

    /// Creates the lead worker.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::LeadExists`] for a second lead and
    /// [`CoordinatorError::Backend`] when the session cannot be created;
    /// check [`CoordinatorError::is_fatal`] to abort on credential errors.
    pub async fn create_lead(
        &self,
        backend: Option<BackendConfig>,
    ) -> CoordinatorResult<WorkerSnapshot> {
        let id = AgentId::new(LEAD_ID)?;
        if self.workers.contains(&id) {
            return Err(CoordinatorError::LeadExists);
        }
        let profile = WorkerProfile::lead(id, self.backend_or_default(backend));
        self.spawn_worker(profile).await
    }

    /// Spawns a teammate and sends it `initial_prompt` in the background.
    ///
    /// The worker id is `name` lowercased with whitespace runs replaced by
    /// `-`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidName`] when `name` yields no
    /// usable id, [`CoordinatorError::DuplicateWorker`] when the id is
    /// taken, and [`CoordinatorError::Backend`] when the session cannot be
    /// created.
    pub async fn spawn_teammate(
        &self,
        name: &str,
        specialty: &str,
        initial_prompt: &str,
        backend: Option<BackendConfig>,
    ) -> CoordinatorResult<WorkerSnapshot> {
        let id = teammate_id(name)?;
        let specialty = Some(specialty.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_owned);
        let profile = WorkerProfile::teammate(
            id.clone(),
            name.trim(),
            specialty,
            self.backend_or_default(backend),
        );
        let snapshot = self.spawn_worker(profile).await?;
        if !initial_prompt.trim().is_empty() {
            self.dispatch_in_background(id, initial_prompt.to_owned());
        }
        Ok(snapshot)
    }

    /// Sends `prompt` to the lead and waits for its turn to settle.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::LeadMissing`] without a lead and
    /// [`CoordinatorError::Dispatch`] when the turn fails.
    pub async fn submit_task(&self, prompt: &str) -> CoordinatorResult<DispatchOutcome> {
        self.require_started()?;
        let lead = AgentId::new(LEAD_ID)?;
        if !self.workers.contains(&lead) {
            return Err(CoordinatorError::LeadMissing);
        }
        info!(worker = %lead, "task submitted");
        let outcome = self.gate.dispatch(&lead, prompt.to_owned()).await?;
        Ok(outcome)
    }

    /// Waits until the team is idle or `timeout` elapses.
    pub async fn wait_for_completion(&self, timeout: Duration) -> Completion {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_quiescent() {
                return Completion::Settled;
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(timeout_ms = timeout.as_millis(), "completion wait timed out");
                return Completion::TimedOut;
            }
            let pause = self
                .config
                .completion
                .settle_interval()
                .min(deadline - now);
            tokio::time::sleep(pause).await;
        }
    }

    /// Returns a snapshot of one worker.
    #[must_use]
    pub fn get_worker(&self, id: &AgentId) -> Option<WorkerSnapshot> {
        self.workers.snapshot(id)
    }

    /// Returns snapshots of every worker in spawn order.
    #[must_use]
    pub fn get_all_workers(&self) -> Vec<WorkerSnapshot> {
        self.workers.snapshots()
    }

    /// Stops one worker: its timer, session, mailbox, and channel.
    ///
    /// A turn still in flight settles against removed state and is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::UnknownWorker`] for unknown ids, or the
    /// first teardown failure.
    pub async fn shutdown_worker(&self, id: &AgentId) -> CoordinatorResult<()> {
        let poller = self.poller_slot().clone();
        if let Some(running) = poller {
            running.stop(id);
        }
        let worker = self
            .workers
            .remove(id)
            .ok_or_else(|| CoordinatorError::UnknownWorker(id.clone()))?;
        let destroyed = worker.session().destroy().await;
        let lost = self.bus.unregister_agent(id);
        let closed = self.router.close(id);
        info!(worker = %id, lost_messages = lost, "worker shut down");
        destroyed?;
        closed?;
        Ok(())
    }

    async fn spawn_worker(&self, profile: WorkerProfile) -> CoordinatorResult<WorkerSnapshot> {
        let poller = self.require_started()?;
        let id = profile.id.clone();
        if self.workers.contains(&id) {
            return Err(CoordinatorError::DuplicateWorker(id));
        }

        self.router.open(&profile)?;
        self.bus.register_agent(&id);
        let tools = WorkerTools::new(id.clone(), Arc::clone(&self.bus), Arc::clone(&self.workers));
        let request = SessionRequest {
            profile: profile.clone(),
            tools,
        };
        let session = match self.factory.create(request).await {
            Ok(session) => session,
            Err(err) => {
                self.bus.unregister_agent(&id);
                if let Err(close_err) = self.router.close(&id) {
                    debug!(worker = %id, error = %close_err, "channel close after failed spawn");
                }
                return Err(err.into());
            }
        };

        self.router.attach(&id, session.subscribe());
        let worker = ManagedWorker::new(profile, Arc::clone(&session));
        let snapshot = worker.snapshot();
        if !self.workers.insert(worker) {
            if let Err(err) = session.destroy().await {
                debug!(worker = %id, error = %err, "destroying duplicate session");
            }
            return Err(CoordinatorError::DuplicateWorker(id));
        }
        self.router.set_status(&id, ChannelStatus::Idle);
        poller.start(&id);
        info!(
            worker = %id,
            role = %snapshot.role,
            backend = %snapshot.backend,
            "worker spawned"
        );
        Ok(snapshot)
    }

    fn dispatch_in_background(&self, worker: AgentId, prompt: String) {
        let gate = Arc::clone(&self.gate);
        let launching = Arc::clone(&self.launching);
        launching.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            if let Err(err) = gate.dispatch(&worker, prompt).await {
                warn!(worker = %worker, fatal = err.is_fatal(), error = %err, "initial prompt failed");
            }
            launching.fetch_sub(1, Ordering::SeqCst);
        });
    }

    fn is_quiescent(&self) -> bool {
        let forwarding = self
            .poller_slot()
            .as_ref()
            .map_or(0, |poller| poller.in_flight());
        self.launching.load(Ordering::SeqCst) == 0
            && forwarding == 0
            && self.workers.is_quiescent()
            && !self.bus.any_unread()
            && !self.bus.has_in_progress_tasks()
    }

    fn backend_or_default(&self, backend: Option<BackendConfig>) -> BackendConfig {
        backend.unwrap_or_else(|| self.config.backend.clone())
    }

    fn require_started(&self) -> CoordinatorResult<Arc<MessagePoller>> {
        self.poller_slot()
            .clone()
            .ok_or(CoordinatorError::NotStarted)
    }

    fn poller_slot(&self) -> MutexGuard<'_, Option<Arc<MessagePoller>>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("workers", &self.workers.len())
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

fn teammate_id(name: &str) -> CoordinatorResult<AgentId> {
    let normalized = name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if normalized == LEAD_ID {
        return Err(CoordinatorError::InvalidName(name.to_owned()));
    }
    AgentId::new(normalized).map_err(|_| CoordinatorError::InvalidName(name.to_owned()))
}

#[cfg(test)]
mod tests;
