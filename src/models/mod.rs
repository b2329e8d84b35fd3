mod element;
mod feedback;

pub use element::{ClickContext, ElementRef, PageContext, PageRect, Viewport, ViewportRect};
pub use feedback::{
    AuthorKind, FeedbackStatus, FeedbackSummary, NewFeedback, Reply, StatusCounts,
};
