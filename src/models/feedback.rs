use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ClickContext, ElementRef};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackStatus {
    Unresolved,
    Pending,
    Resolved,
}

impl FeedbackStatus {
    pub const ALL: [FeedbackStatus; 3] = [
        FeedbackStatus::Unresolved,
        FeedbackStatus::Pending,
        FeedbackStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Unresolved => "unresolved",
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AuthorKind {
    User,
    Guest,
}

/// Read-only projection of one stored feedback record. The store owns
/// these; the drawer holds a page-scoped cached list that is replaced
/// wholesale on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub id: String,
    pub selector: String,
    pub status: FeedbackStatus,
    pub comment: String,
    pub author_kind: AuthorKind,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub reply_count: u32,
}

/// Submission payload for one new feedback record. The server resolves
/// id, timestamp, author and initial status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    pub page_url: String,
    pub page_path: String,
    pub page_title: String,
    pub element: ElementRef,
    pub context: ClickContext,
    pub comment: String,
    pub guest_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub feedback_id: String,
    pub content: String,
    pub author_kind: AuthorKind,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub unresolved: usize,
    pub pending: usize,
    pub resolved: usize,
    pub total: usize,
}

impl StatusCounts {
    pub fn tally<'a>(items: impl IntoIterator<Item = &'a FeedbackSummary>) -> Self {
        let mut counts = StatusCounts::default();
        for item in items {
            match item.status {
                FeedbackStatus::Unresolved => counts.unresolved += 1,
                FeedbackStatus::Pending => counts.pending += 1,
                FeedbackStatus::Resolved => counts.resolved += 1,
            }
            counts.total += 1;
        }
        counts
    }

    pub fn for_status(&self, status: FeedbackStatus) -> usize {
        match status {
            FeedbackStatus::Unresolved => self.unresolved,
            FeedbackStatus::Pending => self.pending,
            FeedbackStatus::Resolved => self.resolved,
        }
    }
}
