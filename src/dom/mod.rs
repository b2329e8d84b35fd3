use anyhow::Result;

use crate::models::{Viewport, ViewportRect};

pub mod fake;

/// Opaque handle to one element in the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Read-only access to the live DOM. The engine never walks the real
/// document itself; a browser host adapts this onto its DOM, and tests
/// use [`fake::FakeDom`].
///
/// All methods are hit on the UI thread in response to input or scheduled
/// callbacks, so implementations should be cheap and must not block.
pub trait PageDom: Send + Sync {
    /// Topmost element under a viewport point, tool chrome included.
    fn element_from_point(&self, x: i32, y: i32) -> Option<NodeId>;

    /// First element matching `selector` in document order, `None` when
    /// nothing matches, `Err` when the selector no longer parses. Callers
    /// treat both non-`Ok(Some(_))` outcomes as a locate miss.
    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>>;

    fn tag_name(&self, node: NodeId) -> String;
    fn element_id(&self, node: NodeId) -> Option<String>;
    fn classes(&self, node: NodeId) -> Vec<String>;
    fn text_content(&self, node: NodeId) -> String;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Bounding box in viewport-relative coordinates.
    fn bounding_rect(&self, node: NodeId) -> ViewportRect;
    fn viewport(&self) -> Viewport;
    /// Current `(scroll_x, scroll_y)` page offsets.
    fn scroll_offset(&self) -> (f64, f64);
    /// Smooth-scroll the element to the viewport center.
    fn scroll_into_view_center(&self, node: NodeId);

    /// Whether the node is one of the page's root containers
    /// (`html`/`body`), which are never valid pick targets.
    fn is_root_container(&self, node: NodeId) -> bool;
    /// Whether the node sits inside the tool's own UI subtree.
    fn is_tool_chrome(&self, node: NodeId) -> bool;

    /// Position among same-tag siblings, 1-based in document order.
    /// Returns `(position, same_tag_sibling_count)`.
    fn same_tag_position(&self, node: NodeId) -> (usize, usize) {
        let tag = self.tag_name(node);
        let Some(parent) = self.parent(node) else {
            return (1, 1);
        };
        let mut position = 0;
        let mut count = 0;
        for sibling in self.children(parent) {
            if self.tag_name(sibling) == tag {
                count += 1;
                if sibling == node {
                    position = count;
                }
            }
        }
        (position.max(1), count.max(1))
    }
}
