//! Notification fan-out. Triage events are routed per recipient
//! preference to an immediate delivery channel or a queued digest; the
//! actual transport stays behind [`DeliveryChannel`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::FeedbackStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationMode {
    Live,
    Digest,
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeedbackEventKind {
    Created,
    ReplyAdded,
    StatusChanged {
        old: FeedbackStatus,
        new: FeedbackStatus,
    },
}

/// One triage event worth notifying about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    #[serde(flatten)]
    pub kind: FeedbackEventKind,
    pub feedback_id: String,
    pub page_path: String,
    pub actor_name: String,
    pub excerpt: String,
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: FeedbackEvent) -> Result<()>;
}

/// Opaque transport for one recipient. Email, webhook, whatever the
/// host wires in.
pub trait DeliveryChannel: Send + Sync {
    fn deliver(&self, recipient: &str, event: &FeedbackEvent) -> Result<()>;
    fn deliver_digest(&self, recipient: &str, events: &[FeedbackEvent]) -> Result<()>;
}

/// Dispatcher that ignores everything. Handy default for hosts that do
/// their own notification plumbing server-side.
#[derive(Debug, Default)]
pub struct NullDispatcher;

#[async_trait]
impl NotificationDispatcher for NullDispatcher {
    async fn dispatch(&self, _event: FeedbackEvent) -> Result<()> {
        Ok(())
    }
}

/// Reference fan-out: every registered recipient gets the event through
/// their preferred mode. New recipients default to live delivery.
pub struct FanoutDispatcher {
    channel: Arc<dyn DeliveryChannel>,
    preferences: Mutex<HashMap<String, NotificationMode>>,
    digests: Mutex<HashMap<String, Vec<FeedbackEvent>>>,
}

impl FanoutDispatcher {
    pub fn new(channel: Arc<dyn DeliveryChannel>) -> Self {
        Self {
            channel,
            preferences: Mutex::new(HashMap::new()),
            digests: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_recipient(&self, recipient: &str) {
        self.preferences
            .lock()
            .unwrap()
            .entry(recipient.to_string())
            .or_insert(NotificationMode::Live);
    }

    pub fn set_preference(&self, recipient: &str, mode: NotificationMode) {
        self.preferences
            .lock()
            .unwrap()
            .insert(recipient.to_string(), mode);
    }

    pub fn queued_digest_len(&self, recipient: &str) -> usize {
        self.digests
            .lock()
            .unwrap()
            .get(recipient)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Deliver and empty every non-empty digest queue. Scheduling (e.g.
    /// a daily cron) is the host's concern.
    pub fn drain_digests(&self) -> Result<()> {
        let drained: Vec<(String, Vec<FeedbackEvent>)> = {
            let mut digests = self.digests.lock().unwrap();
            digests.drain().filter(|(_, events)| !events.is_empty()).collect()
        };
        for (recipient, events) in drained {
            self.channel.deliver_digest(&recipient, &events)?;
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for FanoutDispatcher {
    async fn dispatch(&self, event: FeedbackEvent) -> Result<()> {
        let routes: Vec<(String, NotificationMode)> = {
            let preferences = self.preferences.lock().unwrap();
            preferences
                .iter()
                .map(|(recipient, mode)| (recipient.clone(), *mode))
                .collect()
        };

        for (recipient, mode) in routes {
            match mode {
                NotificationMode::Live => self.channel.deliver(&recipient, &event)?,
                NotificationMode::Digest => {
                    self.digests
                        .lock()
                        .unwrap()
                        .entry(recipient)
                        .or_default()
                        .push(event.clone());
                }
                NotificationMode::Off => {
                    debug!("notification muted for {recipient}");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingChannel {
        live: Mutex<Vec<(String, FeedbackEvent)>>,
        digests: Mutex<Vec<(String, usize)>>,
    }

    impl DeliveryChannel for RecordingChannel {
        fn deliver(&self, recipient: &str, event: &FeedbackEvent) -> Result<()> {
            self.live
                .lock()
                .unwrap()
                .push((recipient.to_string(), event.clone()));
            Ok(())
        }

        fn deliver_digest(&self, recipient: &str, events: &[FeedbackEvent]) -> Result<()> {
            self.digests
                .lock()
                .unwrap()
                .push((recipient.to_string(), events.len()));
            Ok(())
        }
    }

    fn event() -> FeedbackEvent {
        FeedbackEvent {
            kind: FeedbackEventKind::Created,
            feedback_id: "f1".into(),
            page_path: "/pricing".into(),
            actor_name: "Dana".into(),
            excerpt: "logo is blurry".into(),
        }
    }

    #[tokio::test]
    async fn routes_by_recipient_preference() {
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = FanoutDispatcher::new(channel.clone());
        dispatcher.add_recipient("live@example.test");
        dispatcher.set_preference("digest@example.test", NotificationMode::Digest);
        dispatcher.set_preference("off@example.test", NotificationMode::Off);

        dispatcher.dispatch(event()).await.unwrap();

        let live = channel.live.lock().unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].0, "live@example.test");
        assert_eq!(dispatcher.queued_digest_len("digest@example.test"), 1);
        assert_eq!(dispatcher.queued_digest_len("off@example.test"), 0);
    }

    #[tokio::test]
    async fn drain_delivers_and_empties_queues() {
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = FanoutDispatcher::new(channel.clone());
        dispatcher.set_preference("digest@example.test", NotificationMode::Digest);

        dispatcher.dispatch(event()).await.unwrap();
        dispatcher.dispatch(event()).await.unwrap();
        assert_eq!(dispatcher.queued_digest_len("digest@example.test"), 2);

        dispatcher.drain_digests().unwrap();
        assert_eq!(dispatcher.queued_digest_len("digest@example.test"), 0);

        let digests = channel.digests.lock().unwrap();
        assert_eq!(digests.as_slice(), &[("digest@example.test".to_string(), 2)]);
    }

    #[tokio::test]
    async fn new_recipients_default_to_live() {
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = FanoutDispatcher::new(channel.clone());
        dispatcher.add_recipient("someone@example.test");
        // Re-adding never downgrades an explicit preference.
        dispatcher.set_preference("someone@example.test", NotificationMode::Off);
        dispatcher.add_recipient("someone@example.test");

        dispatcher.dispatch(event()).await.unwrap();
        assert!(channel.live.lock().unwrap().is_empty());
    }
}
