//! In-memory DOM used by the test suite and by embedders that want to
//! exercise the engine without a browser host.

use std::sync::Mutex;

use anyhow::Result;

use crate::models::{Viewport, ViewportRect};
use crate::selector::{matches, parse};

use super::{NodeId, PageDom};

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
    rect: ViewportRect,
    parent: Option<usize>,
    children: Vec<usize>,
    tool_chrome: bool,
    root_container: bool,
    detached: bool,
}

#[derive(Debug)]
struct Inner {
    nodes: Vec<Node>,
    viewport: Viewport,
    scroll: (f64, f64),
    scroll_log: Vec<NodeId>,
}

/// Builder for one fabricated element.
#[derive(Debug, Clone)]
pub struct ElementSpec {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
    rect: ViewportRect,
    tool_chrome: bool,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            text: String::new(),
            rect: ViewportRect {
                left: 0.0,
                top: 0.0,
                width: 0.0,
                height: 0.0,
            },
            tool_chrome: false,
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn rect(mut self, left: f64, top: f64, width: f64, height: f64) -> Self {
        self.rect = ViewportRect {
            left,
            top,
            width,
            height,
        };
        self
    }

    /// Mark the element as part of the tool's own UI subtree.
    pub fn tool_chrome(mut self) -> Self {
        self.tool_chrome = true;
        self
    }
}

/// Fabricated page: an `html > body` skeleton plus whatever the test
/// builds under it. Interior mutability keeps the read-only [`PageDom`]
/// surface usable through a shared reference.
pub struct FakeDom {
    inner: Mutex<Inner>,
}

impl FakeDom {
    pub fn new() -> Self {
        Self::with_viewport(1280, 800)
    }

    pub fn with_viewport(width: i32, height: i32) -> Self {
        let viewport = Viewport { width, height };
        let page_rect = ViewportRect {
            left: 0.0,
            top: 0.0,
            width: width as f64,
            height: height as f64,
        };
        let html = Node {
            tag: "html".into(),
            id: None,
            classes: Vec::new(),
            text: String::new(),
            rect: page_rect,
            parent: None,
            children: vec![1],
            tool_chrome: false,
            root_container: true,
            detached: false,
        };
        let body = Node {
            tag: "body".into(),
            id: None,
            classes: Vec::new(),
            text: String::new(),
            rect: page_rect,
            parent: Some(0),
            children: Vec::new(),
            tool_chrome: false,
            root_container: true,
            detached: false,
        };
        Self {
            inner: Mutex::new(Inner {
                nodes: vec![html, body],
                viewport,
                scroll: (0.0, 0.0),
                scroll_log: Vec::new(),
            }),
        }
    }

    pub fn body(&self) -> NodeId {
        NodeId(1)
    }

    pub fn append(&mut self, parent: NodeId, spec: ElementSpec) -> NodeId {
        let mut inner = self.inner.lock().unwrap();
        let index = inner.nodes.len();
        inner.nodes.push(Node {
            tag: spec.tag,
            id: spec.id,
            classes: spec.classes,
            text: spec.text,
            rect: spec.rect,
            parent: Some(parent.0),
            children: Vec::new(),
            tool_chrome: spec.tool_chrome,
            root_container: false,
            detached: false,
        });
        inner.nodes[parent.0].children.push(index);
        NodeId(index)
    }

    /// Detach an element and its subtree, simulating DOM drift.
    pub fn remove(&self, node: NodeId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(parent) = inner.nodes[node.0].parent {
            inner.nodes[parent].children.retain(|&child| child != node.0);
        }
        let mut stack = vec![node.0];
        while let Some(index) = stack.pop() {
            inner.nodes[index].detached = true;
            stack.extend(inner.nodes[index].children.iter().copied());
        }
    }

    pub fn set_rect(&self, node: NodeId, left: f64, top: f64, width: f64, height: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.nodes[node.0].rect = ViewportRect {
            left,
            top,
            width,
            height,
        };
    }

    pub fn set_scroll(&self, x: f64, y: f64) {
        self.inner.lock().unwrap().scroll = (x, y);
    }

    pub fn set_viewport(&self, width: i32, height: i32) {
        self.inner.lock().unwrap().viewport = Viewport { width, height };
    }

    /// Elements passed to [`PageDom::scroll_into_view_center`], oldest first.
    pub fn scroll_log(&self) -> Vec<NodeId> {
        self.inner.lock().unwrap().scroll_log.clone()
    }

    /// Every attached element matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let parsed = parse(selector)?;
        Ok(self
            .document_order()
            .into_iter()
            .filter(|&node| matches(self, node, &parsed))
            .collect())
    }

    fn document_order(&self) -> Vec<NodeId> {
        let inner = self.inner.lock().unwrap();
        let mut order = Vec::with_capacity(inner.nodes.len());
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &inner.nodes[index];
            if node.detached {
                continue;
            }
            order.push(NodeId(index));
            // Reverse so the leftmost child is visited first.
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    fn collect_text(&self, inner: &Inner, index: usize, out: &mut String) {
        let node = &inner.nodes[index];
        out.push_str(&node.text);
        for &child in &node.children {
            if !inner.nodes[child].detached {
                self.collect_text(inner, child, out);
            }
        }
    }
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl PageDom for FakeDom {
    fn element_from_point(&self, x: i32, y: i32) -> Option<NodeId> {
        let order = self.document_order();
        let inner = self.inner.lock().unwrap();
        let (px, py) = (x as f64, y as f64);
        let mut hit = None;
        for node in order {
            let rect = inner.nodes[node.0].rect;
            if px >= rect.left
                && px < rect.left + rect.width
                && py >= rect.top
                && py < rect.top + rect.height
            {
                // Later in document order and deeper wins, like a
                // browser hit test over untransformed content.
                hit = Some(node);
            }
        }
        hit
    }

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let parsed = parse(selector)?;
        Ok(self
            .document_order()
            .into_iter()
            .find(|&node| matches(self, node, &parsed)))
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.inner.lock().unwrap().nodes[node.0].tag.clone()
    }

    fn element_id(&self, node: NodeId) -> Option<String> {
        self.inner.lock().unwrap().nodes[node.0].id.clone()
    }

    fn classes(&self, node: NodeId) -> Vec<String> {
        self.inner.lock().unwrap().nodes[node.0].classes.clone()
    }

    fn text_content(&self, node: NodeId) -> String {
        let inner = self.inner.lock().unwrap();
        let mut out = String::new();
        self.collect_text(&inner, node.0, &mut out);
        out
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.lock().unwrap().nodes[node.0].parent.map(NodeId)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let inner = self.inner.lock().unwrap();
        inner.nodes[node.0]
            .children
            .iter()
            .filter(|&&child| !inner.nodes[child].detached)
            .map(|&child| NodeId(child))
            .collect()
    }

    fn bounding_rect(&self, node: NodeId) -> ViewportRect {
        self.inner.lock().unwrap().nodes[node.0].rect
    }

    fn viewport(&self) -> Viewport {
        self.inner.lock().unwrap().viewport
    }

    fn scroll_offset(&self) -> (f64, f64) {
        self.inner.lock().unwrap().scroll
    }

    fn scroll_into_view_center(&self, node: NodeId) {
        self.inner.lock().unwrap().scroll_log.push(node);
    }

    fn is_root_container(&self, node: NodeId) -> bool {
        self.inner.lock().unwrap().nodes[node.0].root_container
    }

    fn is_tool_chrome(&self, node: NodeId) -> bool {
        let inner = self.inner.lock().unwrap();
        let mut current = Some(node.0);
        while let Some(index) = current {
            if inner.nodes[index].tool_chrome {
                return true;
            }
            current = inner.nodes[index].parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_returns_first_match_in_document_order() {
        let mut dom = FakeDom::new();
        let body = dom.body();
        let first = dom.append(body, ElementSpec::new("div").classes(["card"]));
        let _second = dom.append(body, ElementSpec::new("div").classes(["card"]));
        assert_eq!(dom.query_selector("div.card").unwrap(), Some(first));
    }

    #[test]
    fn query_misses_after_removal() {
        let mut dom = FakeDom::new();
        let body = dom.body();
        let card = dom.append(body, ElementSpec::new("div").id("gone"));
        assert_eq!(dom.query_selector("#gone").unwrap(), Some(card));
        dom.remove(card);
        assert_eq!(dom.query_selector("#gone").unwrap(), None);
    }

    #[test]
    fn query_rejects_invalid_selector() {
        let dom = FakeDom::new();
        assert!(dom.query_selector("li::chaos(").is_err());
    }

    #[test]
    fn hit_test_prefers_the_deepest_later_element() {
        let mut dom = FakeDom::new();
        let body = dom.body();
        let outer = dom.append(body, ElementSpec::new("div").rect(0.0, 0.0, 400.0, 400.0));
        let inner = dom.append(outer, ElementSpec::new("button").rect(10.0, 10.0, 50.0, 20.0));
        assert_eq!(dom.element_from_point(15, 15), Some(inner));
        assert_eq!(dom.element_from_point(200, 200), Some(outer));
        assert_eq!(dom.element_from_point(2000, 2000), None);
    }

    #[test]
    fn tool_chrome_is_inherited_by_descendants() {
        let mut dom = FakeDom::new();
        let body = dom.body();
        let container = dom.append(body, ElementSpec::new("div").tool_chrome());
        let child = dom.append(container, ElementSpec::new("button"));
        let outside = dom.append(body, ElementSpec::new("button"));
        assert!(dom.is_tool_chrome(child));
        assert!(!dom.is_tool_chrome(outside));
    }

    #[test]
    fn text_content_concatenates_the_subtree() {
        let mut dom = FakeDom::new();
        let body = dom.body();
        let p = dom.append(body, ElementSpec::new("p").text("Hello "));
        let _em = dom.append(p, ElementSpec::new("em").text("world"));
        assert_eq!(dom.text_content(p), "Hello world");
    }
}
