//! Unit tests for mailbox polling and inbox rendering.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use rstest::{fixture, rstest};

use super::{MessagePoller, render_inbox};
use crate::{
    backend::BackendError,
    bus::{
        MessageBus,
        domain::{AgentId, Recipient},
    },
    dispatch::{DispatchError, DispatchOutcome, DispatchResult, Dispatcher, MockDispatcher},
};

fn agent(id: &str) -> AgentId {
    AgentId::new(id).expect("valid agent id")
}

#[fixture]
fn bus() -> Arc<MessageBus> {
    let bus = Arc::new(MessageBus::new());
    for id in ["lead", "alice", "bob"] {
        bus.register_agent(&agent(id));
    }
    bus
}

fn poller(bus: &Arc<MessageBus>, dispatcher: Arc<dyn Dispatcher>) -> Arc<MessagePoller> {
    Arc::new(MessagePoller::new(
        Arc::clone(bus),
        dispatcher,
        Duration::from_millis(100),
    ))
}

/// Dispatcher that records every forwarded prompt.
#[derive(Debug, Default)]
struct RecordingDispatcher {
    prompts: Mutex<Vec<(AgentId, String)>>,
}

impl RecordingDispatcher {
    fn prompts(&self) -> Vec<(AgentId, String)> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, worker: &AgentId, prompt: String) -> DispatchResult<DispatchOutcome> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((worker.clone(), prompt));
        Ok(DispatchOutcome::Completed { turns: 1 })
    }
}

#[rstest]
#[tokio::test]
async fn empty_mailbox_never_dispatches(bus: Arc<MessageBus>) {
    let mut dispatcher = MockDispatcher::new();
    dispatcher.expect_dispatch().times(0);
    let poller = poller(&bus, Arc::new(dispatcher));

    assert!(!poller.tick(&agent("alice")).await);
}

#[rstest]
#[tokio::test]
async fn tick_aggregates_unread_mail_into_one_prompt(bus: Arc<MessageBus>) {
    bus.send_message(&agent("lead"), &Recipient::Agent(agent("alice")), "start on the parser")
        .expect("direct send");
    bus.send_message(&agent("bob"), &Recipient::Broadcast, "lexer is done")
        .expect("broadcast");
    let mut dispatcher = MockDispatcher::new();
    dispatcher
        .expect_dispatch()
        .withf(|worker, prompt| {
            worker.as_str() == "alice"
                && prompt
                    == "You have 2 new messages:\n[lead] start on the parser\n[bob to all] lexer is done\n"
        })
        .times(1)
        .returning(|_, _| Ok(DispatchOutcome::Completed { turns: 1 }));
    let poller = poller(&bus, Arc::new(dispatcher));

    assert!(poller.tick(&agent("alice")).await);
    assert!(!bus.has_unread_messages(&agent("alice")));
    assert!(!poller.tick(&agent("alice")).await);
}

#[rstest]
#[tokio::test]
async fn failed_delivery_does_not_requeue_messages(bus: Arc<MessageBus>) {
    bus.send_message(&agent("lead"), &Recipient::Agent(agent("bob")), "review task-1")
        .expect("direct send");
    let mut dispatcher = MockDispatcher::new();
    dispatcher.expect_dispatch().times(1).returning(|worker, _| {
        Err(DispatchError::Backend {
            worker: worker.clone(),
            source: BackendError::Transport("connection reset".to_owned()),
        })
    });
    let poller = poller(&bus, Arc::new(dispatcher));

    assert!(poller.tick(&agent("bob")).await);
    assert_eq!(bus.unread_count(&agent("bob")), 0);
    assert_eq!(bus.message_history(&agent("bob")).len(), 1);
}

#[rstest]
#[tokio::test]
async fn stopped_poller_leaves_mail_unread(bus: Arc<MessageBus>) {
    bus.send_message(&agent("lead"), &Recipient::Agent(agent("alice")), "hello")
        .expect("direct send");
    let mut dispatcher = MockDispatcher::new();
    dispatcher.expect_dispatch().times(0);
    let poller = poller(&bus, Arc::new(dispatcher));
    poller.start(&agent("alice"));

    poller.stop_all();
    poller.stop_all();

    assert!(poller.is_stopped());
    assert!(!poller.is_polling(&agent("alice")));
    assert!(poller.collect(&agent("alice")).is_none());
    assert!(bus.has_unread_messages(&agent("alice")));
    poller.start(&agent("alice"));
    assert!(!poller.is_polling(&agent("alice")));
}

#[rstest]
#[tokio::test]
async fn stop_reports_whether_a_timer_ran(bus: Arc<MessageBus>) {
    let poller = poller(&bus, Arc::new(RecordingDispatcher::default()));
    poller.start(&agent("alice"));

    assert!(poller.stop(&agent("alice")));
    assert!(!poller.stop(&agent("alice")));
    assert!(!poller.stop(&agent("bob")));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn timer_forwards_mail_on_each_interval(bus: Arc<MessageBus>) {
    let recorder = Arc::new(RecordingDispatcher::default());
    let poller = poller(&bus, Arc::clone(&recorder) as Arc<dyn Dispatcher>);
    poller.start(&agent("alice"));
    bus.send_message(&agent("lead"), &Recipient::Agent(agent("alice")), "first")
        .expect("direct send");

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        recorder.prompts(),
        [(agent("alice"), "You have 1 new message:\n[lead] first\n".to_owned())]
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(recorder.prompts().len(), 1);

    bus.send_message(&agent("bob"), &Recipient::Agent(agent("alice")), "second")
        .expect("direct send");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(recorder.prompts().len(), 2);
    assert_eq!(poller.in_flight(), 0);

    poller.stop_all();
}

#[rstest]
fn render_uses_singular_for_one_message(bus: Arc<MessageBus>) {
    let sent = bus
        .send_message(&agent("alice"), &Recipient::Agent(agent("lead")), "done")
        .expect("direct send");

    let prompt = render_inbox(&sent).expect("rendered");

    assert_eq!(prompt, "You have 1 new message:\n[alice] done\n");
}
