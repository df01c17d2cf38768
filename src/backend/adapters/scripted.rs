//! Deterministic in-memory backend.
//!
//! Turns are scripted per worker ahead of time. A turn may stream text,
//! call worker tools, sleep, or fail, which is enough to drive the whole
//! engine in tests and headless runs without a model provider.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::{
    backend::{
        domain::{SessionEvent, SessionRequest},
        ports::{BackendError, BackendFactory, BackendResult, BackendSession},
    },
    bus::domain::AgentId,
    dispatch::WorkerProfile,
    tools::{ToolCall, ToolOutcome, WorkerTools},
};

const EVENT_CAPACITY: usize = 256;

/// One scripted backend turn.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTurn {
    deltas: Vec<String>,
    tool_calls: Vec<ToolCall>,
    delay: Option<Duration>,
    failure: Option<BackendError>,
}

impl ScriptedTurn {
    /// A turn that streams nothing and completes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A turn that streams `text` as a single delta.
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self::new().with_delta(text)
    }

    /// A turn that fails with `err` after its delay.
    #[must_use]
    pub fn failing(err: BackendError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    /// Appends a streamed text fragment.
    #[must_use]
    pub fn with_delta(mut self, text: impl Into<String>) -> Self {
        self.deltas.push(text.into());
        self
    }

    /// Appends a tool call executed before any text is streamed.
    #[must_use]
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// Holds the turn open for `delay` before it settles.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Default)]
struct ScriptBook {
    waiting: HashMap<AgentId, VecDeque<ScriptedTurn>>,
    fallback: Option<ScriptedTurn>,
    creation_failure: Option<BackendError>,
    sessions: HashMap<AgentId, ScriptedSession>,
    created: Vec<AgentId>,
}

/// Factory for [`ScriptedSession`]s.
///
/// Turns scripted before a worker's session exists are handed to the
/// session when it is created.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    book: Arc<Mutex<ScriptBook>>,
}

impl ScriptedBackend {
    /// Creates a backend with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that plays `turn` whenever a worker's script is
    /// exhausted.
    #[must_use]
    pub fn with_fallback(turn: ScriptedTurn) -> Self {
        let backend = Self::new();
        backend.lock().fallback = Some(turn);
        backend
    }

    /// Queues `turn` for `worker`.
    pub fn script(&self, worker: &AgentId, turn: ScriptedTurn) {
        let mut book = self.lock();
        if let Some(session) = book.sessions.get(worker) {
            session.script(turn);
        } else {
            book.waiting.entry(worker.clone()).or_default().push_back(turn);
        }
    }

    /// Makes the next [`BackendFactory::create`] call fail with `err`.
    pub fn fail_next_create(&self, err: BackendError) {
        self.lock().creation_failure = Some(err);
    }

    /// Returns the session created for `worker`.
    #[must_use]
    pub fn session(&self, worker: &AgentId) -> Option<ScriptedSession> {
        self.lock().sessions.get(worker).cloned()
    }

    /// Returns the workers sessions were created for, in creation order.
    #[must_use]
    pub fn created(&self) -> Vec<AgentId> {
        self.lock().created.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptBook> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BackendFactory for ScriptedBackend {
    async fn create(&self, request: SessionRequest) -> BackendResult<Arc<dyn BackendSession>> {
        let mut book = self.lock();
        if let Some(err) = book.creation_failure.take() {
            return Err(err);
        }
        let worker = request.profile.id.clone();
        let turns = book.waiting.remove(&worker).unwrap_or_default();
        let session = ScriptedSession::new(request.profile, request.tools, turns, book.fallback.clone());
        book.sessions.insert(worker.clone(), session.clone());
        book.created.push(worker.clone());
        debug!(worker = %worker, "scripted session created");
        Ok(Arc::new(session))
    }
}

#[derive(Debug, Default)]
struct SessionLog {
    prompts: Vec<String>,
    enqueued: Vec<String>,
    outcomes: Vec<ToolOutcome>,
}

#[derive(Debug)]
struct SessionInner {
    profile: WorkerProfile,
    tools: WorkerTools,
    script: Mutex<VecDeque<ScriptedTurn>>,
    fallback: Option<ScriptedTurn>,
    log: Mutex<SessionLog>,
    events: broadcast::Sender<SessionEvent>,
    turn_lock: tokio::sync::Mutex<()>,
    pending: AtomicUsize,
    waiting_callers: AtomicUsize,
    peak_callers: AtomicUsize,
    closed: AtomicBool,
}

/// Scripted session handle. Clones share the same session.
#[derive(Debug, Clone)]
pub struct ScriptedSession {
    inner: Arc<SessionInner>,
}

impl ScriptedSession {
    fn new(
        profile: WorkerProfile,
        tools: WorkerTools,
        turns: VecDeque<ScriptedTurn>,
        fallback: Option<ScriptedTurn>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                profile,
                tools,
                script: Mutex::new(turns),
                fallback,
                log: Mutex::new(SessionLog::default()),
                events,
                turn_lock: tokio::sync::Mutex::new(()),
                pending: AtomicUsize::new(0),
                waiting_callers: AtomicUsize::new(0),
                peak_callers: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Queues another turn for this session.
    pub fn script(&self, turn: ScriptedTurn) {
        lock(&self.inner.script).push_back(turn);
    }

    /// Prompts executed so far, in execution order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.inner.log).prompts.clone()
    }

    /// Prompts received through [`BackendSession::enqueue`].
    #[must_use]
    pub fn enqueued(&self) -> Vec<String> {
        lock(&self.inner.log).enqueued.clone()
    }

    /// Results of every tool call the script made.
    #[must_use]
    pub fn tool_outcomes(&self) -> Vec<ToolOutcome> {
        lock(&self.inner.log).outcomes.clone()
    }

    /// Highest number of overlapping [`BackendSession::send_and_wait`]
    /// calls observed.
    #[must_use]
    pub fn peak_overlap(&self) -> usize {
        self.inner.peak_callers.load(Ordering::SeqCst)
    }

    /// Returns `true` once the session was destroyed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> BackendResult<()> {
        if self.is_closed() {
            return Err(BackendError::SessionClosed);
        }
        Ok(())
    }

    fn next_turn(&self) -> ScriptedTurn {
        lock(&self.inner.script)
            .pop_front()
            .or_else(|| self.inner.fallback.clone())
            .unwrap_or_default()
    }

    async fn run_turn(&self, prompt: &str) -> BackendResult<()> {
        let _turn = self.inner.turn_lock.lock().await;
        self.ensure_open()?;
        lock(&self.inner.log).prompts.push(prompt.to_owned());
        let turn = self.next_turn();
        trace!(worker = %self.inner.profile.id, "scripted turn started");
        if let Some(delay) = turn.delay {
            tokio::time::sleep(delay).await;
        }
        self.ensure_open()?;
        if let Some(err) = turn.failure {
            return Err(err);
        }
        for call in &turn.tool_calls {
            let outcome = self.inner.tools.invoke(call);
            lock(&self.inner.log).outcomes.push(outcome);
        }
        for delta in turn.deltas {
            self.emit(SessionEvent::Delta(delta));
        }
        self.emit(SessionEvent::TurnComplete);
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        if self.inner.events.send(event).is_err() {
            trace!(worker = %self.inner.profile.id, "no stream subscribers");
        }
    }
}

#[async_trait]
impl BackendSession for ScriptedSession {
    async fn send_and_wait(&self, prompt: &str) -> BackendResult<()> {
        let overlapping = self.inner.waiting_callers.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_callers.fetch_max(overlapping, Ordering::SeqCst);
        let result = self.run_turn(prompt).await;
        self.inner.waiting_callers.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn enqueue(&self, prompt: &str) -> BackendResult<()> {
        self.ensure_open()?;
        lock(&self.inner.log).enqueued.push(prompt.to_owned());
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let session = self.clone();
        let queued = prompt.to_owned();
        tokio::spawn(async move {
            let result = session.run_turn(&queued).await;
            session.inner.pending.fetch_sub(1, Ordering::SeqCst);
            if let Err(err) = result {
                warn!(worker = %session.inner.profile.id, error = %err, "queued scripted turn failed");
            }
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    async fn destroy(&self) -> BackendResult<()> {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!(worker = %self.inner.profile.id, "scripted session destroyed");
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
