use serde::{Deserialize, Serialize};

use crate::drawer::DrawerView;
use crate::models::{PageRect, Reply};

/// Distinguishes the live selection outline from the transient locate
/// flash. Both drive the same reusable overlay node on the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HighlightStyle {
    Live,
    Locate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
}

/// Short transient message. The host renders it as a toast and dismisses
/// it after `ToolSettings::notice_timeout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            message: message.into(),
        }
    }
}

/// What the annotation form shows about the picked element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPreview {
    pub tag_name: String,
    pub text_snippet: String,
}

/// Everything the engine tells the host to render. Fire-and-forget: the
/// engine never reads UI state back, it owns the state itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiEvent {
    HighlightShown { style: HighlightStyle, rect: PageRect },
    HighlightCleared,
    /// Crosshair cursor plus the cancel banner, on or off together.
    SelectionChromeChanged { active: bool },
    AnnotationFormOpened { preview: ElementPreview },
    AnnotationFormClosed,
    /// Submit control disabled while a submission is in flight.
    AnnotationSubmitPending { pending: bool },
    DrawerRendered { view: DrawerView },
    DrawerClosed,
    TriggerBadgeChanged { unresolved: usize },
    RepliesLoaded { feedback_id: String, replies: Vec<Reply> },
    NoticeShown { notice: Notice },
}

/// Sink for [`UiEvent`]s, implemented by the host page binding.
pub trait UiBridge: Send + Sync {
    fn emit(&self, event: UiEvent);
}

/// Handle for one scheduled animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameToken(pub u64);

/// Host hook onto the page's animation-frame clock. `schedule` arms one
/// callback; the host later invokes the tool's `frame_tick` with the
/// same token. `cancel` revokes a not-yet-fired callback.
pub trait FrameScheduler: Send + Sync {
    fn schedule(&self) -> FrameToken;
    fn cancel(&self, token: FrameToken);
}
