//! In-process reference store. Backs the test suite and demo embeddings;
//! mirrors the server contract (id/timestamp/author resolution, initial
//! status, notification fan-out) without any persistence engine.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use log::warn;
use uuid::Uuid;

use crate::models::{
    AuthorKind, FeedbackStatus, FeedbackSummary, NewFeedback, Reply, StatusCounts,
};
use crate::notify::{FeedbackEvent, FeedbackEventKind, NotificationDispatcher, NullDispatcher};

use super::{FeedbackStore, StoreError};

const EXCERPT_MAX_CHARS: usize = 140;

#[derive(Debug, Clone)]
struct StoredFeedback {
    summary: FeedbackSummary,
    page_path: String,
    replies: Vec<Reply>,
}

pub struct MemoryStore {
    records: Mutex<Vec<StoredFeedback>>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    /// Display name of the signed-in visitor, if any. Guests resolve
    /// through the payload's guest name.
    signed_in_user: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_dispatcher(Arc::new(NullDispatcher))
    }

    pub fn with_dispatcher(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            dispatcher,
            signed_in_user: None,
        }
    }

    pub fn signed_in_as(mut self, display_name: &str) -> Self {
        self.signed_in_user = Some(display_name.to_string());
        self
    }

    fn resolve_author(&self, guest_name: Option<&str>) -> (AuthorKind, String) {
        match &self.signed_in_user {
            Some(name) => (AuthorKind::User, name.clone()),
            None => (
                AuthorKind::Guest,
                guest_name
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .unwrap_or("Guest")
                    .to_string(),
            ),
        }
    }

    async fn notify(&self, event: FeedbackEvent) {
        if let Err(err) = self.dispatcher.dispatch(event).await {
            // Notification failure never fails the originating call.
            warn!("notification dispatch failed: {err:#}");
        }
    }

    fn excerpt(comment: &str) -> String {
        comment.chars().take(EXCERPT_MAX_CHARS).collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn submit_feedback(&self, new: NewFeedback) -> Result<FeedbackSummary, StoreError> {
        if new.comment.trim().is_empty() {
            return Err(StoreError::Rejected("comment is required".into()));
        }
        if new.page_path.is_empty() {
            return Err(StoreError::Rejected("page path is required".into()));
        }

        let (author_kind, author_name) = self.resolve_author(new.guest_name.as_deref());
        let summary = FeedbackSummary {
            id: Uuid::new_v4().to_string(),
            selector: new.element.selector.clone(),
            status: FeedbackStatus::Unresolved,
            comment: new.comment.clone(),
            author_kind,
            author_name: author_name.clone(),
            created_at: Utc::now(),
            reply_count: 0,
        };

        self.records.lock().unwrap().push(StoredFeedback {
            summary: summary.clone(),
            page_path: new.page_path.clone(),
            replies: Vec::new(),
        });

        self.notify(FeedbackEvent {
            kind: FeedbackEventKind::Created,
            feedback_id: summary.id.clone(),
            page_path: new.page_path,
            actor_name: author_name,
            excerpt: Self::excerpt(&new.comment),
        })
        .await;

        Ok(summary)
    }

    async fn list_feedback_for_page(
        &self,
        page_path: &str,
    ) -> Result<Vec<FeedbackSummary>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|record| record.page_path == page_path)
            .map(|record| {
                let mut summary = record.summary.clone();
                summary.reply_count = record.replies.len() as u32;
                summary
            })
            .collect())
    }

    async fn update_status(
        &self,
        feedback_id: &str,
        status: FeedbackStatus,
    ) -> Result<StatusCounts, StoreError> {
        let (event, counts) = {
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|record| record.summary.id == feedback_id)
                .ok_or_else(|| StoreError::NotFound(feedback_id.to_string()))?;

            let old = record.summary.status;
            record.summary.status = status;
            let (_, actor_name) = self.resolve_author(None);
            let event = (old != status).then(|| FeedbackEvent {
                kind: FeedbackEventKind::StatusChanged { old, new: status },
                feedback_id: feedback_id.to_string(),
                page_path: record.page_path.clone(),
                actor_name,
                excerpt: Self::excerpt(&record.summary.comment),
            });
            let counts = StatusCounts::tally(records.iter().map(|record| &record.summary));
            (event, counts)
        };

        if let Some(event) = event {
            self.notify(event).await;
        }
        Ok(counts)
    }

    async fn add_reply(
        &self,
        feedback_id: &str,
        content: &str,
        guest_name: Option<&str>,
    ) -> Result<Vec<Reply>, StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::Rejected("reply content is required".into()));
        }

        let (author_kind, author_name) = self.resolve_author(guest_name);
        let (event, replies) = {
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|record| record.summary.id == feedback_id)
                .ok_or_else(|| StoreError::NotFound(feedback_id.to_string()))?;

            record.replies.push(Reply {
                id: Uuid::new_v4().to_string(),
                feedback_id: feedback_id.to_string(),
                content: content.to_string(),
                author_kind,
                author_name: author_name.clone(),
                created_at: Utc::now(),
            });

            let event = FeedbackEvent {
                kind: FeedbackEventKind::ReplyAdded,
                feedback_id: feedback_id.to_string(),
                page_path: record.page_path.clone(),
                actor_name: author_name,
                excerpt: Self::excerpt(content),
            };
            (event, record.replies.clone())
        };

        self.notify(event).await;
        Ok(replies)
    }

    async fn get_replies(&self, feedback_id: &str) -> Result<Vec<Reply>, StoreError> {
        let records = self.records.lock().unwrap();
        records
            .iter()
            .find(|record| record.summary.id == feedback_id)
            .map(|record| record.replies.clone())
            .ok_or_else(|| StoreError::NotFound(feedback_id.to_string()))
    }
}
