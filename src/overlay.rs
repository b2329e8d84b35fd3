//! Reusable highlight overlay, positioned in page-absolute coordinates
//! and resynced at animation-frame cadence while the pointer moves.

use std::sync::Arc;

use log::debug;

use crate::dom::{NodeId, PageDom};
use crate::ui::{FrameScheduler, FrameToken, HighlightStyle, UiBridge, UiEvent};

pub struct HighlightOverlay {
    ui: Arc<dyn UiBridge>,
    scheduler: Arc<dyn FrameScheduler>,
    /// At most one recompute may be scheduled; pointer moves arriving
    /// while this is set are dropped, not queued.
    pending: Option<FrameToken>,
    last_pointer: Option<(i32, i32)>,
    target: Option<NodeId>,
    style: HighlightStyle,
    visible: bool,
    /// Bumped on every show/hide so delayed clears (the locate flash
    /// timer) can tell whether they still apply.
    generation: u64,
}

impl HighlightOverlay {
    pub fn new(ui: Arc<dyn UiBridge>, scheduler: Arc<dyn FrameScheduler>) -> Self {
        Self {
            ui,
            scheduler,
            pending: None,
            last_pointer: None,
            target: None,
            style: HighlightStyle::Live,
            visible: false,
            generation: 0,
        }
    }

    /// Record the latest pointer position and make sure one frame
    /// callback is armed. Coalesces dense mousemove streams: only the
    /// newest position within a frame matters.
    pub fn track_pointer(&mut self, x: i32, y: i32) {
        self.last_pointer = Some((x, y));
        if self.pending.is_none() {
            self.pending = Some(self.scheduler.schedule());
        }
    }

    /// Consume a fired frame callback. Returns the pointer position to
    /// recompute against, or `None` when the token is stale (the frame
    /// was cancelled or superseded).
    pub fn take_frame(&mut self, token: FrameToken) -> Option<(i32, i32)> {
        if self.pending != Some(token) {
            debug!("dropping stale frame callback {token:?}");
            return None;
        }
        self.pending = None;
        self.last_pointer
    }

    /// Outline `node` with the given style, repositioning immediately.
    pub fn show(&mut self, dom: &dyn PageDom, node: NodeId, style: HighlightStyle) {
        self.target = Some(node);
        self.style = style;
        self.generation += 1;
        self.reposition(dom);
    }

    /// Clear the outline and drop any scheduled recompute.
    pub fn hide(&mut self) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel(token);
        }
        self.last_pointer = None;
        self.target = None;
        self.generation += 1;
        if self.visible {
            self.visible = false;
            self.ui.emit(UiEvent::HighlightCleared);
        }
    }

    /// Immediate reposition on scroll/resize. Scroll events do not
    /// arrive at pointer-move frequency, so no coalescing here.
    pub fn resync(&mut self, dom: &dyn PageDom) {
        if self.target.is_some() {
            self.reposition(dom);
        }
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn style(&self) -> HighlightStyle {
        self.style
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    fn reposition(&mut self, dom: &dyn PageDom) {
        let Some(target) = self.target else {
            return;
        };
        let (scroll_x, scroll_y) = dom.scroll_offset();
        let rect = dom.bounding_rect(target).to_page(scroll_x, scroll_y);
        self.visible = true;
        self.ui.emit(UiEvent::HighlightShown {
            style: self.style,
            rect,
        });
    }
}
