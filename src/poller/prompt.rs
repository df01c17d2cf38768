//! Aggregated inbox prompt.

use minijinja::{Environment, context};

use crate::bus::domain::AgentMessage;

/// Template for the prompt delivering a batch of unread messages.
pub const INBOX_TEMPLATE: &str = concat!(
    "You have {{ messages | length }} new message{{ 's' if messages | length != 1 }}:\n",
    "{% for message in messages %}",
    "[{{ message.from }}{{ ' to all' if message.broadcast }}] {{ message.content }}\n",
    "{% endfor %}",
);

/// Renders `messages` into one prompt, keeping sender and arrival order.
///
/// # Errors
///
/// Returns the template engine error when rendering fails.
pub fn render_inbox(messages: &[AgentMessage]) -> Result<String, minijinja::Error> {
    let environment = Environment::new();
    environment.render_str(INBOX_TEMPLATE, context! { messages => messages })
}
