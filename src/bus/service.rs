//! The message bus service composing mailboxes, the task board, and events.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use mockable::{Clock, DefaultClock};
use tracing::{debug, info, warn};

use crate::bus::{
    board::TaskBoard,
    domain::{
        AgentId, AgentMessage, BusError, BusEvent, BusResult, MessageId, Recipient, SubscriptionId, Task,
        TaskFilter, TaskId, TaskOptions,
    },
    events::EventHub,
    mailbox::MailboxRegistry,
};

#[derive(Debug, Default)]
struct BusStore {
    mailboxes: MailboxRegistry,
    board: TaskBoard,
    last_message: u64,
}

impl BusStore {
    fn next_message_id(&mut self) -> MessageId {
        self.last_message += 1;
        MessageId::from_sequence(self.last_message)
    }
}

/// In-process message bus shared by every collaborator of one engine.
///
/// The bus owns its store outright; collaborators hold an `Arc` to the
/// same instance, so independent engines never share state. Every
/// operation holds the store lock only for the mutation itself and
/// publishes events after releasing it.
///
/// # Examples
///
/// ```
/// use ensemble::bus::{MessageBus, domain::{AgentId, Recipient}};
///
/// let bus = MessageBus::new();
/// let lead = AgentId::new("lead").expect("valid id");
/// let alice = AgentId::new("alice").expect("valid id");
/// bus.register_agent(&lead);
/// bus.register_agent(&alice);
///
/// bus.send_message(&lead, &Recipient::Agent(alice.clone()), "hi")
///     .expect("alice is registered");
/// assert!(bus.has_unread_messages(&alice));
/// ```
pub struct MessageBus {
    state: RwLock<BusStore>,
    events: EventHub,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl MessageBus {
    /// Creates an empty bus using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }

    /// Creates an empty bus stamping records with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            state: RwLock::new(BusStore::default()),
            events: EventHub::new(),
            clock,
        }
    }

    // ── Registration ────────────────────────────────────────────────

    /// Creates an empty mailbox for `id`; a no-op when one exists.
    pub fn register_agent(&self, id: &AgentId) {
        if self.write().mailboxes.register(id) {
            debug!(agent = %id, "mailbox registered");
        }
    }

    /// Deletes the mailbox for `id`.
    ///
    /// Unread messages are discarded; workers are expected to drain their
    /// mailbox before shutting down. Returns the number of unread messages
    /// that were lost.
    pub fn unregister_agent(&self, id: &AgentId) -> usize {
        let removed = self.write().mailboxes.unregister(id);
        let lost = removed.map_or(0, |messages| {
            messages.iter().filter(|message| !message.is_read()).count()
        });
        if lost > 0 {
            warn!(agent = %id, lost, "mailbox unregistered with unread messages");
        } else {
            debug!(agent = %id, "mailbox unregistered");
        }
        lost
    }

    /// Returns `true` when `id` has a mailbox.
    #[must_use]
    pub fn is_registered(&self, id: &AgentId) -> bool {
        self.read().mailboxes.contains(id)
    }

    /// Returns registered worker ids in registration order.
    #[must_use]
    pub fn registered_agents(&self) -> Vec<AgentId> {
        self.read().mailboxes.ids().to_vec()
    }

    // ── Messaging ───────────────────────────────────────────────────

    /// Sends `content` from `from` to `to`.
    ///
    /// A broadcast appends one copy to every registered mailbox except the
    /// sender's. One [`BusEvent::Message`] is published per send.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::UnknownRecipient`] when a
    /// direct recipient has no mailbox.
    pub fn send_message(
        &self,
        from: &AgentId,
        to: &Recipient,
        content: &str,
    ) -> BusResult<Vec<AgentMessage>> {
        let messages = {
            let mut state = self.write();
            match to {
                Recipient::Agent(recipient) => {
                    if !state.mailboxes.contains(recipient) {
                        return Err(BusError::UnknownRecipient(recipient.clone()));
                    }
                    let id = state.next_message_id();
                    let message =
                        AgentMessage::new(id, from.clone(), recipient.clone(), content, &*self.clock);
                    state.mailboxes.deliver(message.clone())?;
                    vec![message]
                }
                Recipient::Broadcast => {
                    let recipients: Vec<AgentId> = state
                        .mailboxes
                        .ids()
                        .iter()
                        .filter(|id| *id != from)
                        .cloned()
                        .collect();
                    let mut delivered = Vec::with_capacity(recipients.len());
                    for recipient in recipients {
                        let id = state.next_message_id();
                        let message =
                            AgentMessage::new(id, from.clone(), recipient, content, &*self.clock)
                                .as_broadcast();
                        state.mailboxes.deliver(message.clone())?;
                        delivered.push(message);
                    }
                    delivered
                }
            }
        };

        debug!(from = %from, to = %to, copies = messages.len(), "message sent");
        self.events.publish(&BusEvent::Message {
            messages: messages.clone(),
        });
        Ok(messages)
    }

    /// Returns unread messages for `id` in arrival order.
    ///
    /// With `mark_read` the returned messages are flagged read. Unknown ids
    /// yield an empty vector.
    pub fn read_messages(&self, id: &AgentId, mark_read: bool) -> Vec<AgentMessage> {
        let messages = self.write().mailboxes.take_unread(id, mark_read);
        if !messages.is_empty() {
            debug!(agent = %id, count = messages.len(), mark_read, "messages read");
        }
        messages
    }

    /// Returns `true` when `id` holds unread mail.
    #[must_use]
    pub fn has_unread_messages(&self, id: &AgentId) -> bool {
        self.read().mailboxes.has_unread(id)
    }

    /// Returns the number of unread messages for `id`.
    #[must_use]
    pub fn unread_count(&self, id: &AgentId) -> usize {
        self.read().mailboxes.unread_count(id)
    }

    /// Returns `true` when any mailbox holds unread mail.
    #[must_use]
    pub fn any_unread(&self) -> bool {
        let state = self.read();
        state
            .mailboxes
            .ids()
            .iter()
            .any(|id| state.mailboxes.has_unread(id))
    }

    /// Returns every message delivered to `id`, read or not.
    #[must_use]
    pub fn message_history(&self, id: &AgentId) -> Vec<AgentMessage> {
        self.read().mailboxes.history(id)
    }

    // ── Task board ──────────────────────────────────────────────────

    /// Adds a pending task and publishes [`BusEvent::TaskCreated`].
    ///
    /// # Errors
    ///
    /// Returns [`BusError::UnknownDependency`] when a
    /// dependency does not exist.
    pub fn create_task(
        &self,
        description: &str,
        created_by: &AgentId,
        options: TaskOptions,
    ) -> BusResult<Task> {
        let task = self
            .write()
            .board
            .create(description, created_by.clone(), options, &*self.clock)?;
        info!(task = %task.id(), created_by = %created_by, "task created");
        self.events
            .publish(&BusEvent::TaskCreated { task: task.clone() });
        Ok(task)
    }

    /// Claims a pending task whose dependencies have all completed.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound`, `NotClaimable`, or `DependencyBlocked`.
    pub fn claim_task(&self, id: &TaskId, agent: &AgentId) -> BusResult<Task> {
        let task = self.write().board.claim(id, agent, &*self.clock)?;
        info!(task = %id, agent = %agent, "task claimed");
        self.events
            .publish(&BusEvent::TaskUpdated { task: task.clone() });
        Ok(task)
    }

    /// Completes a task on behalf of its assignee.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound`, `NotAssignedToCaller`, or
    /// `InvalidTransition` when the task is not in progress.
    pub fn complete_task(&self, id: &TaskId, agent: &AgentId, result: &str) -> BusResult<Task> {
        let task = self
            .write()
            .board
            .complete(id, agent, result, &*self.clock)?;
        info!(task = %id, agent = %agent, "task completed");
        self.events
            .publish(&BusEvent::TaskCompleted { task: task.clone() });
        Ok(task)
    }

    /// Fails a task with a reason.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound`, `InvalidTransition` for finished tasks, or
    /// `NotAssignedToCaller` when another worker holds the task.
    pub fn fail_task(&self, id: &TaskId, agent: &AgentId, reason: &str) -> BusResult<Task> {
        let task = self.write().board.fail(id, agent, reason, &*self.clock)?;
        warn!(task = %id, agent = %agent, reason, "task failed");
        self.events
            .publish(&BusEvent::TaskUpdated { task: task.clone() });
        Ok(task)
    }

    /// Returns a copy of the task with `id`.
    #[must_use]
    pub fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.read().board.get(id)
    }

    /// Returns a filtered snapshot of the board in creation order.
    #[must_use]
    pub fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        self.read().board.list(filter)
    }

    /// Returns `true` when any task is in progress.
    #[must_use]
    pub fn has_in_progress_tasks(&self) -> bool {
        self.read().board.has_in_progress()
    }

    // ── Events ──────────────────────────────────────────────────────

    /// Registers an event handler.
    pub fn subscribe(
        &self,
        handler: impl Fn(&BusEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    /// Removes an event handler. Returns `false` for unknown handles.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Clears mailboxes, tasks, id counters, and event handlers.
    pub fn reset(&self) {
        {
            let mut state = self.write();
            state.mailboxes.clear();
            state.board.clear();
            state.last_message = 0;
        }
        self.events.clear();
        info!("message bus reset");
    }

    fn read(&self) -> RwLockReadGuard<'_, BusStore> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BusStore> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("state", &self.state)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
