use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FeedbackStatus, FeedbackSummary, NewFeedback, Reply, StatusCounts};

pub mod memory;

/// Failure taxonomy for store calls. `AccessDenied` sends the session
/// back to idle with a generic notice; everything else is surfaced as a
/// recoverable error on the UI state that issued the call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("access denied")]
    AccessDenied,
    #[error("feedback {0} not found")]
    NotFound(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("feedback store unreachable: {0}")]
    Unavailable(String),
}

/// The external record store. The engine only ever talks to this trait;
/// transport, persistence and author resolution live behind it.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Create one record. The store is the source of truth for id,
    /// timestamp, author resolution and the initial `Unresolved` status.
    async fn submit_feedback(&self, new: NewFeedback) -> Result<FeedbackSummary, StoreError>;

    /// Full unfiltered set for a page path; the engine groups by status
    /// client-side.
    async fn list_feedback_for_page(
        &self,
        page_path: &str,
    ) -> Result<Vec<FeedbackSummary>, StoreError>;

    async fn update_status(
        &self,
        feedback_id: &str,
        status: FeedbackStatus,
    ) -> Result<StatusCounts, StoreError>;

    /// Append a reply and return the full updated reply list.
    async fn add_reply(
        &self,
        feedback_id: &str,
        content: &str,
        guest_name: Option<&str>,
    ) -> Result<Vec<Reply>, StoreError>;

    async fn get_replies(&self, feedback_id: &str) -> Result<Vec<Reply>, StoreError>;
}
