//! Shared fixtures for the crate's test suite.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::ui::{FrameScheduler, FrameToken, Notice, UiBridge, UiEvent};

/// UI bridge that records every emitted event.
#[derive(Default)]
pub struct RecordingBridge {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::NoticeShown { notice } => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&UiEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }
}

impl UiBridge for RecordingBridge {
    fn emit(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Frame scheduler driven by hand from tests.
#[derive(Default)]
pub struct ManualScheduler {
    next: AtomicU64,
    scheduled: Mutex<Vec<FrameToken>>,
    cancelled: Mutex<Vec<FrameToken>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<FrameToken> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<FrameToken> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn last_token(&self) -> FrameToken {
        *self
            .scheduled
            .lock()
            .unwrap()
            .last()
            .expect("no frame was scheduled")
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule(&self) -> FrameToken {
        let token = FrameToken(self.next.fetch_add(1, Ordering::SeqCst));
        self.scheduled.lock().unwrap().push(token);
        token
    }

    fn cancel(&self, token: FrameToken) {
        self.cancelled.lock().unwrap().push(token);
    }
}
