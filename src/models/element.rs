use serde::{Deserialize, Serialize};

/// Captured identity and preview of a picked page element.
///
/// Immutable once captured: the selector is replayed later by the locate
/// resolver, the tag/snippet pair is what admins see in list views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRef {
    pub selector: String,
    pub tag_name: String,
    pub text_snippet: String,
}

impl ElementRef {
    /// Truncate element text to the snippet limit, then trim surrounding
    /// whitespace. Truncation happens on character boundaries.
    pub fn snippet_from(text: &str, max_chars: usize) -> String {
        text.chars().take(max_chars).collect::<String>().trim().to_string()
    }
}

/// Viewport-relative click coordinates and window size, captured at the
/// instant of the confirming click. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickContext {
    pub x: i32,
    pub y: i32,
    pub viewport_width: i32,
    pub viewport_height: i32,
}

/// Current window dimensions as reported by the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

/// Element bounding box in viewport-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Overlay box in page-absolute coordinates (viewport rect plus scroll
/// offsets), which is what the host positions the highlighter with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportRect {
    pub fn to_page(self, scroll_x: f64, scroll_y: f64) -> PageRect {
        PageRect {
            left: self.left + scroll_x,
            top: self.top + scroll_y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Identity of the page this tool instance is mounted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub url: String,
    pub path: String,
    pub title: String,
}
