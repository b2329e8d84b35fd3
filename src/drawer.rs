//! Feedback panel: a tabbed, page-scoped list of stored feedback with
//! status triage and reply passthroughs. The cache is replaced
//! wholesale by `refresh`; tab switches never touch the network.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::{FeedbackStatus, FeedbackSummary, StatusCounts};
use crate::store::FeedbackStore;
use crate::ui::{Notice, UiBridge, UiEvent};

const MSG_LOAD_FAILED: &str = "Could not load feedback for this page";
const MSG_STATUS_UPDATED: &str = "Status updated";
const MSG_STATUS_FAILED: &str = "Could not update status";
const MSG_REPLY_FAILED: &str = "Could not add reply";
const MSG_REPLIES_FAILED: &str = "Could not load replies";

/// What the host renders when the drawer is open: the active tab's
/// cached subset plus counts for all three tabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawerView {
    pub active_tab: FeedbackStatus,
    pub items: Vec<FeedbackSummary>,
    pub counts: StatusCounts,
    /// True when the active subset is empty and the host should render
    /// the placeholder instead of an empty container.
    pub placeholder: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied(usize),
    /// A newer refresh was issued while this one was in flight.
    Superseded,
    /// The drawer was closed after this refresh was issued.
    DroppedClosed,
    Failed,
}

#[derive(Debug)]
struct DrawerState {
    open: bool,
    tab: FeedbackStatus,
    cache: Vec<FeedbackSummary>,
    /// Bumped on every close; refresh completions compare it to decide
    /// whether they still apply.
    close_epoch: u64,
}

pub struct DrawerController {
    state: Mutex<DrawerState>,
    store: Arc<dyn FeedbackStore>,
    ui: Arc<dyn UiBridge>,
    page_path: String,
    guest_name: Option<String>,
    refresh_seq: AtomicU64,
}

impl DrawerController {
    pub fn new(
        store: Arc<dyn FeedbackStore>,
        ui: Arc<dyn UiBridge>,
        page_path: String,
        guest_name: Option<String>,
    ) -> Self {
        Self {
            state: Mutex::new(DrawerState {
                open: false,
                tab: FeedbackStatus::Unresolved,
                cache: Vec::new(),
                close_epoch: 0,
            }),
            store,
            ui,
            page_path,
            guest_name,
            refresh_seq: AtomicU64::new(0),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.state.lock().await.open
    }

    pub async fn counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.state.lock().await.cache)
    }

    pub async fn cached(&self) -> Vec<FeedbackSummary> {
        self.state.lock().await.cache.clone()
    }

    pub async fn cached_item(&self, feedback_id: &str) -> Option<FeedbackSummary> {
        self.state
            .lock()
            .await
            .cache
            .iter()
            .find(|item| item.id == feedback_id)
            .cloned()
    }

    /// Open and render from the cache as-is; refreshing is a separate,
    /// explicitly triggered operation.
    pub async fn open(&self) {
        let mut state = self.state.lock().await;
        if state.open {
            return;
        }
        state.open = true;
        self.render(&state);
    }

    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if !state.open {
            return;
        }
        state.open = false;
        state.close_epoch += 1;
        self.ui.emit(UiEvent::DrawerClosed);
    }

    pub async fn toggle(&self) {
        let open = self.is_open().await;
        if open {
            self.close().await;
        } else {
            self.open().await;
        }
    }

    /// Switch the rendered subset. Cache only, no network call.
    pub async fn select_tab(&self, tab: FeedbackStatus) {
        let mut state = self.state.lock().await;
        state.tab = tab;
        if state.open {
            self.render(&state);
        }
    }

    /// Replace the cache wholesale from the store. Completions that no
    /// longer apply (superseded, or the drawer closed in the meantime)
    /// are dropped rather than force-applied.
    pub async fn refresh(&self) -> RefreshOutcome {
        let seq = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let close_epoch_at_issue = self.state.lock().await.close_epoch;

        let result = self.store.list_feedback_for_page(&self.page_path).await;

        let mut state = self.state.lock().await;
        if seq != self.refresh_seq.load(Ordering::SeqCst) {
            return RefreshOutcome::Superseded;
        }
        if state.close_epoch != close_epoch_at_issue {
            info!("dropping drawer refresh; drawer closed while in flight");
            return RefreshOutcome::DroppedClosed;
        }

        match result {
            Ok(items) => {
                let count = items.len();
                state.cache = items;
                self.emit_badge(&state);
                if state.open {
                    self.render(&state);
                }
                RefreshOutcome::Applied(count)
            }
            Err(err) => {
                warn!("feedback list refresh failed: {err}");
                self.notice(Notice::warning(MSG_LOAD_FAILED));
                RefreshOutcome::Failed
            }
        }
    }

    /// Flip one item's status through the store, then update the cached
    /// copy in place and recount. No full refresh; the next refresh is
    /// authoritative either way.
    pub async fn set_status(&self, feedback_id: &str, status: FeedbackStatus) -> bool {
        match self.store.update_status(feedback_id, status).await {
            Ok(_) => {
                let mut state = self.state.lock().await;
                if let Some(item) = state.cache.iter_mut().find(|item| item.id == feedback_id) {
                    item.status = status;
                }
                self.emit_badge(&state);
                if state.open {
                    self.render(&state);
                }
                self.notice(Notice::success(MSG_STATUS_UPDATED));
                true
            }
            Err(err) => {
                warn!("status update for {feedback_id} failed: {err}");
                self.notice(Notice::warning(MSG_STATUS_FAILED));
                false
            }
        }
    }

    pub async fn load_replies(&self, feedback_id: &str) {
        match self.store.get_replies(feedback_id).await {
            Ok(replies) => self.ui.emit(UiEvent::RepliesLoaded {
                feedback_id: feedback_id.to_string(),
                replies,
            }),
            Err(err) => {
                warn!("loading replies for {feedback_id} failed: {err}");
                self.notice(Notice::warning(MSG_REPLIES_FAILED));
            }
        }
    }

    pub async fn add_reply(&self, feedback_id: &str, content: &str) {
        let result = self
            .store
            .add_reply(feedback_id, content, self.guest_name.as_deref())
            .await;
        match result {
            Ok(replies) => {
                let mut state = self.state.lock().await;
                if let Some(item) = state.cache.iter_mut().find(|item| item.id == feedback_id) {
                    item.reply_count = replies.len() as u32;
                }
                if state.open {
                    self.render(&state);
                }
                self.ui.emit(UiEvent::RepliesLoaded {
                    feedback_id: feedback_id.to_string(),
                    replies,
                });
            }
            Err(err) => {
                warn!("adding reply to {feedback_id} failed: {err}");
                self.notice(Notice::warning(MSG_REPLY_FAILED));
            }
        }
    }

    fn render(&self, state: &DrawerState) {
        let items: Vec<FeedbackSummary> = state
            .cache
            .iter()
            .filter(|item| item.status == state.tab)
            .cloned()
            .collect();
        let placeholder = items.is_empty();
        self.ui.emit(UiEvent::DrawerRendered {
            view: DrawerView {
                active_tab: state.tab,
                counts: StatusCounts::tally(&state.cache),
                items,
                placeholder,
            },
        });
    }

    fn emit_badge(&self, state: &DrawerState) {
        let unresolved = StatusCounts::tally(&state.cache).unresolved;
        self.ui.emit(UiEvent::TriggerBadgeChanged { unresolved });
    }

    fn notice(&self, notice: Notice) {
        self.ui.emit(UiEvent::NoticeShown { notice });
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::models::{AuthorKind, ClickContext, ElementRef, NewFeedback, Reply};
    use crate::store::memory::MemoryStore;
    use crate::store::StoreError;
    use crate::testutil::RecordingBridge;
    use crate::ui::NoticeKind;

    fn payload(comment: &str) -> NewFeedback {
        NewFeedback {
            page_url: "https://example.test/pricing".into(),
            page_path: "/pricing".into(),
            page_title: "Pricing".into(),
            element: ElementRef {
                selector: "#hero".into(),
                tag_name: "div".into(),
                text_snippet: "Hero".into(),
            },
            context: ClickContext {
                x: 1,
                y: 2,
                viewport_width: 1280,
                viewport_height: 800,
            },
            comment: comment.into(),
            guest_name: None,
        }
    }

    /// Store that counts list calls and can hold a response until the
    /// test releases it.
    struct GatedStore {
        inner: MemoryStore,
        gate: Notify,
        gated: std::sync::atomic::AtomicBool,
        list_calls: AtomicU64,
    }

    impl GatedStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                gate: Notify::new(),
                gated: std::sync::atomic::AtomicBool::new(false),
                list_calls: AtomicU64::new(0),
            }
        }

        fn hold_next_list(&self) {
            self.gated.store(true, Ordering::SeqCst);
        }

        fn release(&self) {
            self.gate.notify_one();
        }

        fn list_calls(&self) -> u64 {
            self.list_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedbackStore for GatedStore {
        async fn submit_feedback(
            &self,
            new: NewFeedback,
        ) -> Result<FeedbackSummary, StoreError> {
            self.inner.submit_feedback(new).await
        }

        async fn list_feedback_for_page(
            &self,
            page_path: &str,
        ) -> Result<Vec<FeedbackSummary>, StoreError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.gated.swap(false, Ordering::SeqCst) {
                self.gate.notified().await;
            }
            self.inner.list_feedback_for_page(page_path).await
        }

        async fn update_status(
            &self,
            feedback_id: &str,
            status: FeedbackStatus,
        ) -> Result<StatusCounts, StoreError> {
            self.inner.update_status(feedback_id, status).await
        }

        async fn add_reply(
            &self,
            feedback_id: &str,
            content: &str,
            guest_name: Option<&str>,
        ) -> Result<Vec<Reply>, StoreError> {
            self.inner.add_reply(feedback_id, content, guest_name).await
        }

        async fn get_replies(&self, feedback_id: &str) -> Result<Vec<Reply>, StoreError> {
            self.inner.get_replies(feedback_id).await
        }
    }

    async fn fixture_with_items(
        comments: &[&str],
    ) -> (Arc<GatedStore>, Arc<RecordingBridge>, Arc<DrawerController>) {
        let store = Arc::new(GatedStore::new());
        for comment in comments {
            store.inner.submit_feedback(payload(comment)).await.unwrap();
        }
        let ui = Arc::new(RecordingBridge::new());
        let drawer = Arc::new(DrawerController::new(
            store.clone(),
            ui.clone(),
            "/pricing".into(),
            None,
        ));
        (store, ui, drawer)
    }

    fn last_view(ui: &RecordingBridge) -> DrawerView {
        ui.events()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                UiEvent::DrawerRendered { view } => Some(view),
                _ => None,
            })
            .expect("drawer was never rendered")
    }

    #[tokio::test]
    async fn tab_counts_always_match_the_cache() {
        let (store, ui, drawer) = fixture_with_items(&["a", "b", "c"]).await;
        drawer.refresh().await;
        let id = drawer.cached().await[0].id.clone();
        drawer.set_status(&id, FeedbackStatus::Resolved).await;
        let _ = store;

        drawer.open().await;
        let view = last_view(&ui);
        let cache = drawer.cached().await;
        for status in FeedbackStatus::ALL {
            assert_eq!(
                view.counts.for_status(status),
                cache.iter().filter(|item| item.status == status).count()
            );
        }
        assert_eq!(view.counts.total, cache.len());
    }

    #[tokio::test]
    async fn select_tab_renders_from_cache_without_network() {
        let (store, ui, drawer) = fixture_with_items(&["a", "b"]).await;
        drawer.refresh().await;
        drawer.open().await;
        let calls_before = store.list_calls();

        drawer.select_tab(FeedbackStatus::Resolved).await;
        drawer.select_tab(FeedbackStatus::Pending).await;
        drawer.select_tab(FeedbackStatus::Unresolved).await;

        assert_eq!(store.list_calls(), calls_before);
        let view = last_view(&ui);
        assert_eq!(view.active_tab, FeedbackStatus::Unresolved);
        assert_eq!(view.items.len(), 2);
    }

    #[tokio::test]
    async fn empty_subset_renders_the_placeholder() {
        let (_store, ui, drawer) = fixture_with_items(&["a"]).await;
        drawer.refresh().await;
        drawer.open().await;
        drawer.select_tab(FeedbackStatus::Resolved).await;

        let view = last_view(&ui);
        assert!(view.items.is_empty());
        assert!(view.placeholder);
    }

    #[tokio::test]
    async fn status_flip_updates_cache_in_place_and_recounts() {
        let (store, ui, drawer) = fixture_with_items(&["a", "b"]).await;
        drawer.refresh().await;
        drawer.open().await;
        let id = drawer.cached().await[0].id.clone();
        let calls_before = store.list_calls();

        assert!(drawer.set_status(&id, FeedbackStatus::Resolved).await);

        // In-place flip, not a full refresh.
        assert_eq!(store.list_calls(), calls_before);
        let view = last_view(&ui);
        assert_eq!(view.counts.resolved, 1);
        assert_eq!(view.counts.unresolved, 1);
        assert_eq!(ui.notices().last().unwrap().kind, NoticeKind::Success);

        // Badge follows the unresolved count.
        assert!(ui
            .events()
            .iter()
            .any(|e| matches!(e, UiEvent::TriggerBadgeChanged { unresolved: 1 })));
    }

    #[tokio::test]
    async fn later_refresh_is_authoritative_over_the_flip() {
        let (store, _ui, drawer) = fixture_with_items(&["a"]).await;
        drawer.refresh().await;
        let id = drawer.cached().await[0].id.clone();
        drawer.set_status(&id, FeedbackStatus::Pending).await;

        // The store is the source of truth on the next wholesale load.
        store
            .inner
            .update_status(&id, FeedbackStatus::Resolved)
            .await
            .unwrap();
        drawer.refresh().await;
        assert_eq!(
            drawer.cached().await[0].status,
            FeedbackStatus::Resolved
        );
    }

    #[tokio::test]
    async fn status_failure_leaves_cache_untouched_with_a_warning() {
        let (_store, ui, drawer) = fixture_with_items(&["a"]).await;
        drawer.refresh().await;

        assert!(!drawer.set_status("missing", FeedbackStatus::Resolved).await);
        assert_eq!(drawer.cached().await[0].status, FeedbackStatus::Unresolved);
        assert_eq!(ui.notices().last().unwrap().kind, NoticeKind::Warning);
    }

    #[tokio::test]
    async fn refresh_completing_after_close_is_dropped() {
        let (store, _ui, drawer) = fixture_with_items(&["a"]).await;
        drawer.open().await;

        store.hold_next_list();
        let in_flight = tokio::spawn({
            let drawer = drawer.clone();
            async move { drawer.refresh().await }
        });
        // Let the refresh reach the store before closing.
        tokio::task::yield_now().await;

        drawer.close().await;
        store.release();

        assert_eq!(in_flight.await.unwrap(), RefreshOutcome::DroppedClosed);
        assert!(drawer.cached().await.is_empty());
    }

    #[tokio::test]
    async fn refresh_issued_while_closed_still_feeds_the_badge() {
        // The initial page load happens with the drawer shut; its
        // completion applies because no close happened in between.
        let (_store, ui, drawer) = fixture_with_items(&["a", "b"]).await;
        assert_eq!(drawer.refresh().await, RefreshOutcome::Applied(2));
        assert!(ui
            .events()
            .iter()
            .any(|e| matches!(e, UiEvent::TriggerBadgeChanged { unresolved: 2 })));
        // Closed drawer: nothing rendered.
        assert_eq!(ui.count(|e| matches!(e, UiEvent::DrawerRendered { .. })), 0);
    }

    #[tokio::test]
    async fn reply_roundtrip_updates_reply_counts() {
        let (_store, ui, drawer) = fixture_with_items(&["a"]).await;
        drawer.refresh().await;
        drawer.open().await;
        let id = drawer.cached().await[0].id.clone();

        drawer.add_reply(&id, "on it").await;
        assert_eq!(drawer.cached_item(&id).await.unwrap().reply_count, 1);
        assert!(ui
            .events()
            .iter()
            .any(|e| matches!(e, UiEvent::RepliesLoaded { replies, .. } if replies.len() == 1)));

        drawer.load_replies(&id).await;
        let loaded = ui
            .events()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                UiEvent::RepliesLoaded { replies, .. } => Some(replies),
                _ => None,
            })
            .unwrap();
        assert_eq!(loaded[0].author_kind, AuthorKind::Guest);
        assert_eq!(loaded[0].content, "on it");
    }

    #[tokio::test]
    async fn reply_failure_surfaces_a_warning() {
        let (_store, ui, drawer) = fixture_with_items(&[]).await;
        drawer.add_reply("missing", "hello").await;
        assert_eq!(ui.notices().last().unwrap().kind, NoticeKind::Warning);
    }
}
