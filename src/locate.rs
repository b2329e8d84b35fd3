//! Re-finds a previously annotated element from its stored selector.
//! Best-effort by design: the page may have drifted since capture, and
//! an exact miss is an accepted, user-visible outcome.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::dom::PageDom;
use crate::overlay::HighlightOverlay;
use crate::settings::ToolSettings;
use crate::ui::{HighlightStyle, Notice, UiBridge, UiEvent};

const MSG_NOT_FOUND: &str = "Element not found on this page";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateOutcome {
    Found,
    NotFound,
}

pub struct LocateResolver {
    dom: Arc<dyn PageDom>,
    ui: Arc<dyn UiBridge>,
    overlay: Arc<Mutex<HighlightOverlay>>,
    settings: Arc<ToolSettings>,
    flash_task: Mutex<Option<JoinHandle<()>>>,
}

impl LocateResolver {
    pub fn new(
        dom: Arc<dyn PageDom>,
        ui: Arc<dyn UiBridge>,
        overlay: Arc<Mutex<HighlightOverlay>>,
        settings: Arc<ToolSettings>,
    ) -> Self {
        Self {
            dom,
            ui,
            overlay,
            settings,
            flash_task: Mutex::new(None),
        }
    }

    /// Run `selector` against the current document. A selector that no
    /// longer parses is the same miss as one that matches nothing; both
    /// surface a single non-blocking warning and leave the overlay
    /// alone. `suppress_flash` keeps the overlay untouched while a
    /// selection session owns it.
    pub async fn locate(&self, selector: &str, suppress_flash: bool) -> LocateOutcome {
        let found = match self.dom.query_selector(selector) {
            Ok(found) => found,
            Err(err) => {
                warn!("stored selector '{selector}' no longer evaluates: {err:#}");
                None
            }
        };

        let Some(node) = found else {
            self.ui.emit(UiEvent::NoticeShown {
                notice: Notice::warning(MSG_NOT_FOUND),
            });
            return LocateOutcome::NotFound;
        };

        info!("located '{selector}'");
        self.dom.scroll_into_view_center(node);
        if suppress_flash {
            return LocateOutcome::Found;
        }

        let generation = {
            let mut overlay = self.overlay.lock().await;
            overlay.show(self.dom.as_ref(), node, HighlightStyle::Locate);
            overlay.generation()
        };

        // Transient read-only flash: auto-clear after the configured
        // duration, unless something else has taken the overlay since.
        let overlay = self.overlay.clone();
        let flash = self.settings.locate_flash;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(flash).await;
            let mut overlay = overlay.lock().await;
            if overlay.generation() == generation {
                overlay.hide();
            }
        });
        if let Some(previous) = self.flash_task.lock().await.replace(handle) {
            previous.abort();
        }

        LocateOutcome::Found
    }

    /// Drop any armed auto-clear, e.g. on unmount.
    pub async fn cancel_flash(&self) {
        if let Some(handle) = self.flash_task.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dom::fake::{ElementSpec, FakeDom};
    use crate::testutil::{ManualScheduler, RecordingBridge};
    use crate::ui::NoticeKind;

    struct Fixture {
        dom: Arc<FakeDom>,
        ui: Arc<RecordingBridge>,
        resolver: LocateResolver,
    }

    fn fixture() -> Fixture {
        let mut dom = FakeDom::new();
        let body = dom.body();
        dom.append(
            body,
            ElementSpec::new("button")
                .id("save-btn")
                .rect(100.0, 900.0, 80.0, 30.0),
        );
        let dom = Arc::new(dom);
        let ui = Arc::new(RecordingBridge::new());
        let overlay = Arc::new(Mutex::new(HighlightOverlay::new(
            ui.clone(),
            Arc::new(ManualScheduler::new()),
        )));
        let resolver = LocateResolver::new(
            dom.clone(),
            ui.clone(),
            overlay,
            Arc::new(ToolSettings::default()),
        );
        Fixture { dom, ui, resolver }
    }

    #[tokio::test(start_paused = true)]
    async fn found_element_scrolls_flashes_and_auto_clears() {
        let fx = fixture();
        assert_eq!(
            fx.resolver.locate("#save-btn", false).await,
            LocateOutcome::Found
        );
        assert_eq!(fx.dom.scroll_log().len(), 1);
        assert_eq!(
            fx.ui.count(|e| matches!(
                e,
                UiEvent::HighlightShown {
                    style: HighlightStyle::Locate,
                    ..
                }
            )),
            1
        );
        assert_eq!(fx.ui.count(|e| matches!(e, UiEvent::HighlightCleared)), 0);

        // Past the flash window the highlight clears itself.
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fx.ui.count(|e| matches!(e, UiEvent::HighlightCleared)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn miss_warns_exactly_once_and_leaves_the_overlay_alone() {
        let fx = fixture();
        assert_eq!(
            fx.resolver.locate("#long-gone", false).await,
            LocateOutcome::NotFound
        );
        let notices = fx.ui.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Warning);
        assert_eq!(
            fx.ui.count(|e| matches!(e, UiEvent::HighlightShown { .. })),
            0
        );
        assert!(fx.dom.scroll_log().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_selector_is_caught_as_a_miss() {
        let fx = fixture();
        assert_eq!(
            fx.resolver.locate("button[aria-label=Save]", false).await,
            LocateOutcome::NotFound
        );
        assert_eq!(fx.ui.notices().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn suppressed_flash_still_scrolls_but_never_touches_the_overlay() {
        let fx = fixture();
        assert_eq!(
            fx.resolver.locate("#save-btn", true).await,
            LocateOutcome::Found
        );
        assert_eq!(fx.dom.scroll_log().len(), 1);
        assert_eq!(
            fx.ui.count(|e| matches!(e, UiEvent::HighlightShown { .. })),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn a_second_locate_supersedes_the_first_flash() {
        let mut dom = FakeDom::new();
        let body = dom.body();
        dom.append(body, ElementSpec::new("button").id("one").rect(0.0, 0.0, 10.0, 10.0));
        dom.append(body, ElementSpec::new("button").id("two").rect(0.0, 20.0, 10.0, 10.0));
        let dom = Arc::new(dom);
        let ui = Arc::new(RecordingBridge::new());
        let overlay = Arc::new(Mutex::new(HighlightOverlay::new(
            ui.clone(),
            Arc::new(ManualScheduler::new()),
        )));
        let resolver = LocateResolver::new(
            dom.clone(),
            ui.clone(),
            overlay,
            Arc::new(ToolSettings::default()),
        );

        resolver.locate("#one", false).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        resolver.locate("#two", false).await;

        // The first flash's timer must not clear the second flash early.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(ui.count(|e| matches!(e, UiEvent::HighlightCleared)), 0);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(ui.count(|e| matches!(e, UiEvent::HighlightCleared)), 1);
    }
}
