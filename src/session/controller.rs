use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;

use crate::dom::{NodeId, PageDom};
use crate::models::{ClickContext, ElementRef, FeedbackSummary, NewFeedback, PageContext};
use crate::overlay::HighlightOverlay;
use crate::selector;
use crate::settings::ToolSettings;
use crate::store::{FeedbackStore, StoreError};
use crate::ui::{ElementPreview, FrameToken, HighlightStyle, Notice, UiBridge, UiEvent};

use super::state::SelectionState;

const MSG_SUBMITTED: &str = "Feedback submitted";
const MSG_SUBMIT_FAILED: &str = "Could not submit feedback, please try again";
const MSG_ACCESS_DENIED: &str = "You no longer have access to the feedback tool";

#[derive(Debug, PartialEq)]
pub enum SubmitOutcome {
    Submitted(FeedbackSummary),
    Failed,
    AccessDenied,
    /// Empty comment: no state change, no network call.
    EmptyComment,
    NotAnnotating,
    /// The session moved on while the call was in flight; the result
    /// was dropped.
    Superseded,
}

/// Drives the selection lifecycle: arming, hover tracking through the
/// overlay, atomic capture on the confirming click, and submission.
pub struct SelectionController {
    state: Mutex<SelectionState>,
    overlay: Arc<Mutex<HighlightOverlay>>,
    dom: Arc<dyn PageDom>,
    ui: Arc<dyn UiBridge>,
    store: Arc<dyn FeedbackStore>,
    settings: Arc<ToolSettings>,
    page: PageContext,
    guest_name: Option<String>,
    attempts: AtomicU64,
}

impl SelectionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dom: Arc<dyn PageDom>,
        ui: Arc<dyn UiBridge>,
        store: Arc<dyn FeedbackStore>,
        overlay: Arc<Mutex<HighlightOverlay>>,
        settings: Arc<ToolSettings>,
        page: PageContext,
        guest_name: Option<String>,
    ) -> Self {
        Self {
            state: Mutex::new(SelectionState::new()),
            overlay,
            dom,
            ui,
            store,
            settings,
            page,
            guest_name,
            attempts: AtomicU64::new(0),
        }
    }

    pub async fn state(&self) -> SelectionState {
        self.state.lock().await.clone()
    }

    pub async fn is_selecting(&self) -> bool {
        self.state.lock().await.is_selecting()
    }

    pub async fn is_annotating(&self) -> bool {
        self.state.lock().await.is_annotating()
    }

    /// Arm selection mode. Idempotent while already armed.
    pub async fn start_selection(&self) {
        let mut state = self.state.lock().await;
        if state.arm() {
            info!("selection mode armed on {}", self.page.path);
            self.ui.emit(UiEvent::SelectionChromeChanged { active: true });
        }
    }

    /// Pointer moved while armed: remember the newest position and make
    /// sure one frame recompute is scheduled.
    pub async fn pointer_moved(&self, x: i32, y: i32) {
        let state = self.state.lock().await;
        if !state.is_selecting() {
            return;
        }
        self.overlay.lock().await.track_pointer(x, y);
    }

    /// A scheduled animation frame fired: resolve the hover candidate
    /// under the latest pointer position and sync the highlight.
    pub async fn frame_tick(&self, token: FrameToken) {
        let mut state = self.state.lock().await;
        let mut overlay = self.overlay.lock().await;
        let Some((x, y)) = overlay.take_frame(token) else {
            return;
        };
        if !state.is_selecting() {
            return;
        }

        let target = self
            .dom
            .element_from_point(x, y)
            .filter(|&node| self.valid_candidate(node));
        match target {
            Some(node) => {
                state.update_hover(Some(node));
                overlay.show(self.dom.as_ref(), node, HighlightStyle::Live);
            }
            None => {
                // Tool chrome and page root containers clear the hover
                // highlight instead of becoming candidates.
                state.update_hover(None);
                overlay.hide();
            }
        }
    }

    pub async fn scrolled(&self) {
        self.resync_hover().await;
    }

    /// Resize resyncs the highlight; no state transition.
    pub async fn resized(&self) {
        self.resync_hover().await;
    }

    /// Capturing click while armed. Returns `true` when the click was
    /// intercepted (the page element's own handlers must not fire).
    pub async fn page_clicked(&self, x: i32, y: i32) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_selecting() {
            return false;
        }

        let hit = self.dom.element_from_point(x, y);
        if let Some(node) = hit {
            // Clicks on the tool's own chrome pass through untouched.
            if self.dom.is_tool_chrome(node) {
                return false;
            }
        }

        let target = state.hover().or(hit);
        let Some(node) = target.filter(|&node| self.valid_candidate(node)) else {
            // Swallowed, but nothing valid to pick; stay armed.
            return true;
        };

        // ElementRef and ClickContext come from the same event, so the
        // pair can never be torn.
        let chosen = self.capture(node);
        let viewport = self.dom.viewport();
        let context = ClickContext {
            x,
            y,
            viewport_width: viewport.width,
            viewport_height: viewport.height,
        };

        info!("element chosen for annotation: {}", chosen.selector);
        let preview = ElementPreview {
            tag_name: chosen.tag_name.clone(),
            text_snippet: chosen.text_snippet.clone(),
        };
        state.choose(chosen, context);

        self.overlay.lock().await.hide();
        self.ui.emit(UiEvent::SelectionChromeChanged { active: false });
        self.ui.emit(UiEvent::AnnotationFormOpened { preview });
        true
    }

    /// `Selecting -> Idle`: disarm, clear highlight and chrome.
    pub async fn cancel_selection(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_selecting() {
            return false;
        }
        state.reset();
        self.overlay.lock().await.hide();
        self.ui.emit(UiEvent::SelectionChromeChanged { active: false });
        true
    }

    /// `Annotating -> Idle`: close the form, discarding entered text.
    pub async fn cancel_annotation(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_annotating() {
            return false;
        }
        state.reset();
        self.ui.emit(UiEvent::AnnotationFormClosed);
        true
    }

    pub async fn submit(&self, comment: &str) -> SubmitOutcome {
        let trimmed = comment.trim();
        if trimmed.is_empty() {
            return SubmitOutcome::EmptyComment;
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let payload = {
            let mut state = self.state.lock().await;
            let Some((element, context)) = state.begin_submit(trimmed.to_string(), attempt)
            else {
                return SubmitOutcome::NotAnnotating;
            };
            NewFeedback {
                page_url: self.page.url.clone(),
                page_path: self.page.path.clone(),
                page_title: self.page.title.clone(),
                element,
                context,
                comment: trimmed.to_string(),
                guest_name: self.guest_name.clone(),
            }
        };
        self.ui.emit(UiEvent::AnnotationSubmitPending { pending: true });

        let result = self.store.submit_feedback(payload).await;

        let mut state = self.state.lock().await;
        if !state.owns_submit(attempt) {
            return SubmitOutcome::Superseded;
        }
        self.ui.emit(UiEvent::AnnotationSubmitPending { pending: false });

        match result {
            Ok(summary) => {
                state.reset();
                self.ui.emit(UiEvent::AnnotationFormClosed);
                self.notice(Notice::success(MSG_SUBMITTED));
                info!("feedback {} submitted for {}", summary.id, self.page.path);
                SubmitOutcome::Submitted(summary)
            }
            Err(StoreError::AccessDenied) => {
                state.reset();
                self.ui.emit(UiEvent::AnnotationFormClosed);
                self.notice(Notice::error(MSG_ACCESS_DENIED));
                SubmitOutcome::AccessDenied
            }
            Err(err) => {
                warn!("feedback submission failed: {err}");
                state.submit_failed(attempt);
                self.notice(Notice::error(MSG_SUBMIT_FAILED));
                SubmitOutcome::Failed
            }
        }
    }

    fn valid_candidate(&self, node: NodeId) -> bool {
        !self.dom.is_tool_chrome(node) && !self.dom.is_root_container(node)
    }

    fn capture(&self, node: NodeId) -> ElementRef {
        ElementRef {
            selector: selector::generate(self.dom.as_ref(), node, &self.settings.selector),
            tag_name: self.dom.tag_name(node).to_lowercase(),
            text_snippet: ElementRef::snippet_from(
                &self.dom.text_content(node),
                self.settings.snippet_max_chars,
            ),
        }
    }

    fn notice(&self, notice: Notice) {
        self.ui.emit(UiEvent::NoticeShown { notice });
    }

    async fn resync_hover(&self) {
        let state = self.state.lock().await;
        if state.is_selecting() && state.hover().is_some() {
            self.overlay.lock().await.resync(self.dom.as_ref());
        }
    }
}
