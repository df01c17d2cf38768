//! Per-worker ordered message stores.

use std::collections::HashMap;

use crate::bus::domain::{AgentId, AgentMessage, BusError, BusResult};

/// Mailboxes keyed by worker, in registration order.
///
/// Insertion order is arrival order. Reading never removes or reorders a
/// message; it only flips the `read` flag.
#[derive(Debug, Default)]
pub struct MailboxRegistry {
    mailboxes: HashMap<AgentId, Vec<AgentMessage>>,
    order: Vec<AgentId>,
}

impl MailboxRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty mailbox for `id` unless one already exists.
    ///
    /// Returns `true` when a mailbox was created.
    pub fn register(&mut self, id: &AgentId) -> bool {
        if self.mailboxes.contains_key(id) {
            return false;
        }
        self.mailboxes.insert(id.clone(), Vec::new());
        self.order.push(id.clone());
        true
    }

    /// Deletes the mailbox for `id`, returning its messages.
    pub fn unregister(&mut self, id: &AgentId) -> Option<Vec<AgentMessage>> {
        self.order.retain(|registered| registered != id);
        self.mailboxes.remove(id)
    }

    /// Returns `true` when `id` has a mailbox.
    #[must_use]
    pub fn contains(&self, id: &AgentId) -> bool {
        self.mailboxes.contains_key(id)
    }

    /// Returns registered worker ids in registration order.
    #[must_use]
    pub fn ids(&self) -> &[AgentId] {
        &self.order
    }

    /// Appends `message` to its recipient's mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::UnknownRecipient`] when the recipient has no
    /// mailbox.
    pub fn deliver(&mut self, message: AgentMessage) -> BusResult<()> {
        let mailbox = self
            .mailboxes
            .get_mut(message.recipient())
            .ok_or_else(|| BusError::UnknownRecipient(message.recipient().clone()))?;
        mailbox.push(message);
        Ok(())
    }

    /// Returns unread messages for `id` in arrival order.
    ///
    /// When `mark_read` is set the returned messages are flagged read in
    /// place. Unknown ids yield an empty vector.
    pub fn take_unread(&mut self, id: &AgentId, mark_read: bool) -> Vec<AgentMessage> {
        let Some(mailbox) = self.mailboxes.get_mut(id) else {
            return Vec::new();
        };
        mailbox
            .iter_mut()
            .filter(|message| !message.is_read())
            .map(|message| {
                let unread = message.clone();
                if mark_read {
                    message.mark_read();
                }
                unread
            })
            .collect()
    }

    /// Returns `true` when `id` holds at least one unread message.
    #[must_use]
    pub fn has_unread(&self, id: &AgentId) -> bool {
        self.mailboxes
            .get(id)
            .is_some_and(|mailbox| mailbox.iter().any(|message| !message.is_read()))
    }

    /// Returns the number of unread messages for `id`.
    #[must_use]
    pub fn unread_count(&self, id: &AgentId) -> usize {
        self.mailboxes.get(id).map_or(0, |mailbox| {
            mailbox.iter().filter(|message| !message.is_read()).count()
        })
    }

    /// Returns every message ever delivered to `id`, read or not.
    #[must_use]
    pub fn history(&self, id: &AgentId) -> Vec<AgentMessage> {
        self.mailboxes.get(id).cloned().unwrap_or_default()
    }

    /// Removes every mailbox.
    pub fn clear(&mut self) {
        self.mailboxes.clear();
        self.order.clear();
    }
}
