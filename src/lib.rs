//! pagemark: element-anchored visual feedback engine for live web pages.
//!
//! The host page forwards raw input (pointer, clicks, keys, frames) and
//! renders the [`ui::UiEvent`]s the engine emits. All stateful parts of
//! the tool live in here, against injected DOM, store and notification
//! collaborators, so the whole thing runs against a fabricated DOM in
//! tests.

pub mod access;
pub mod dom;
pub mod drawer;
pub mod locate;
pub mod models;
pub mod notify;
pub mod overlay;
pub mod selector;
pub mod session;
pub mod settings;
pub mod store;
pub mod ui;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use log::{debug, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use access::AnnotateAccess;
use dom::PageDom;
use drawer::DrawerController;
use locate::{LocateOutcome, LocateResolver};
use models::{FeedbackStatus, PageContext, StatusCounts};
use overlay::HighlightOverlay;
use session::{SelectionController, SelectionState, SubmitOutcome};
use settings::ToolSettings;
use store::FeedbackStore;
use ui::{FrameScheduler, FrameToken, UiBridge};

/// One tool instance per page load: the explicit session object that
/// owns every controller and all their state. Constructed by
/// [`FeedbackTool::mount`], torn down by [`FeedbackTool::unmount`].
pub struct FeedbackTool {
    session: SelectionController,
    drawer: Arc<DrawerController>,
    locate: LocateResolver,
    shutdown: CancellationToken,
    init_task: Mutex<Option<JoinHandle<()>>>,
}

impl FeedbackTool {
    /// Mount the tool for the current visitor. The capability gate is
    /// an opaque precondition: when it says no, nothing mounts and
    /// `None` is returned.
    ///
    /// Initialization past construction (the first feedback load) is
    /// deferred to a spawned low-priority task so it never competes
    /// with the host page's own rendering.
    #[allow(clippy::too_many_arguments)]
    pub fn mount(
        dom: Arc<dyn PageDom>,
        ui: Arc<dyn UiBridge>,
        scheduler: Arc<dyn FrameScheduler>,
        store: Arc<dyn FeedbackStore>,
        access: &dyn AnnotateAccess,
        settings: ToolSettings,
        page: PageContext,
        guest_name: Option<String>,
    ) -> Option<Self> {
        if !access.can_annotate() {
            info!("visitor may not annotate; feedback tool not mounted");
            return None;
        }

        let settings = Arc::new(settings);
        let overlay = Arc::new(Mutex::new(HighlightOverlay::new(ui.clone(), scheduler)));
        let session = SelectionController::new(
            dom.clone(),
            ui.clone(),
            store.clone(),
            overlay.clone(),
            settings.clone(),
            page.clone(),
            guest_name.clone(),
        );
        let drawer = Arc::new(DrawerController::new(
            store,
            ui.clone(),
            page.path.clone(),
            guest_name,
        ));
        let locate = LocateResolver::new(dom, ui, overlay, settings);

        let shutdown = CancellationToken::new();
        let init_task = {
            let drawer = drawer.clone();
            let token = shutdown.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = async {
                        // Best-effort idle hint, not a correctness
                        // requirement: give the host loop a turn first.
                        tokio::task::yield_now().await;
                        drawer.refresh().await;
                    } => {}
                }
            })
        };

        info!("feedback tool mounted on {}", page.path);
        Some(Self {
            session,
            drawer,
            locate,
            shutdown,
            init_task: Mutex::new(Some(init_task)),
        })
    }

    /// Tear down: cancel deferred work, exit any selection, clear the
    /// overlay and close the drawer. Safe to call more than once.
    pub async fn unmount(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.init_task.lock().await.take() {
            handle.abort();
        }
        self.locate.cancel_flash().await;
        self.session.cancel_selection().await;
        self.session.cancel_annotation().await;
        self.drawer.close().await;
        info!("feedback tool unmounted");
    }

    // ---- floating trigger & drawer ------------------------------------

    pub async fn trigger_clicked(&self) {
        self.drawer.toggle().await;
    }

    pub async fn open_drawer(&self) {
        self.drawer.open().await;
    }

    pub async fn close_drawer(&self) {
        self.drawer.close().await;
    }

    pub async fn select_tab(&self, tab: FeedbackStatus) {
        self.drawer.select_tab(tab).await;
    }

    pub async fn refresh_feedback(&self) {
        self.drawer.refresh().await;
    }

    pub async fn set_feedback_status(&self, feedback_id: &str, status: FeedbackStatus) -> bool {
        self.drawer.set_status(feedback_id, status).await
    }

    pub async fn load_replies(&self, feedback_id: &str) {
        self.drawer.load_replies(feedback_id).await;
    }

    pub async fn add_reply(&self, feedback_id: &str, content: &str) {
        self.drawer.add_reply(feedback_id, content).await;
    }

    /// Drawer "locate" action: close the panel and re-find the item's
    /// element on the page. An in-progress selection keeps ownership of
    /// the overlay; locate then scrolls without flashing.
    pub async fn locate_feedback(&self, feedback_id: &str) -> LocateOutcome {
        let Some(item) = self.drawer.cached_item(feedback_id).await else {
            debug!("locate requested for unknown feedback {feedback_id}");
            return LocateOutcome::NotFound;
        };
        self.drawer.close().await;
        let suppress_flash = self.session.is_selecting().await;
        self.locate.locate(&item.selector, suppress_flash).await
    }

    // ---- selection session --------------------------------------------

    /// "Add feedback": close the drawer and arm element picking.
    pub async fn start_selection(&self) {
        self.drawer.close().await;
        self.session.start_selection().await;
    }

    pub async fn pointer_moved(&self, x: i32, y: i32) {
        self.session.pointer_moved(x, y).await;
    }

    pub async fn frame_tick(&self, token: FrameToken) {
        self.session.frame_tick(token).await;
    }

    pub async fn scrolled(&self) {
        self.session.scrolled().await;
    }

    pub async fn resized(&self) {
        self.session.resized().await;
    }

    /// Capturing click hook. Returns `true` when the engine consumed
    /// the click and the host must suppress the default action and
    /// stop propagation.
    pub async fn page_clicked(&self, x: i32, y: i32) -> bool {
        self.session.page_clicked(x, y).await
    }

    /// Escape routing: selection first, then the annotation form, then
    /// the drawer.
    pub async fn escape_pressed(&self) {
        if self.session.cancel_selection().await {
            return;
        }
        if self.session.cancel_annotation().await {
            return;
        }
        self.drawer.close().await;
    }

    pub async fn annotation_submitted(&self, comment: &str) -> SubmitOutcome {
        let outcome = self.session.submit(comment).await;
        if matches!(outcome, SubmitOutcome::Submitted(_)) {
            // The stored list changed; the cache follows wholesale.
            self.drawer.refresh().await;
        }
        outcome
    }

    pub async fn annotation_cancelled(&self) {
        self.session.cancel_annotation().await;
    }

    /// Click on the form's backdrop dismisses it like cancel does.
    pub async fn backdrop_clicked(&self) {
        self.session.cancel_annotation().await;
    }

    // ---- introspection -------------------------------------------------

    pub async fn session_state(&self) -> SelectionState {
        self.session.state().await
    }

    pub async fn drawer_counts(&self) -> StatusCounts {
        self.drawer.counts().await
    }

    pub async fn drawer_open(&self) -> bool {
        self.drawer.is_open().await
    }
}
