//! Paginated page description handed from the paginator to the PDF renderer.
//!
//! Everything here is final: page-absolute positions in points, wrapped
//! lines, resolved colours. It serialises to JSON for inspection.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fonts::FontFamily;

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// PDF `/Title`, taken from the first heading.
    #[serde(default = "LayoutConfig::default_title")]
    pub title: String,
    /// Page box in points.
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    /// Fill for the whole page, from the body background.
    #[serde(default)]
    pub page_background: Option<[f32; 4]>,
    pub pages: Vec<PageLayout>,
}

/// Boxes placed on one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A rectangle on a page, optionally filled, framed or carrying content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutBox {
    /// Top-left corner, measured from the page's top-left.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub border: Option<BorderStyle>,
    /// A rule down the left edge (blockquotes).
    #[serde(default)]
    pub border_left: Option<BorderStyle>,

    /// At most one of these is set.
    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,

    pub children: Vec<LayoutBox>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorderStyle {
    pub width: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub lines: Vec<TextLine>,
    pub font_family: FontFamily,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [f32; 4],
    pub line_height: f32,
    /// Baseline offset from the top of each line.
    pub ascender: f32,
    pub text_align: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// Alignment shift from the box's left edge.
    pub x_offset: f32,
    /// Top of the line relative to the box.
    pub y_offset: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutConfig {
    pub fn new(page_width_pt: f32, page_height_pt: f32) -> Self {
        Self {
            title: Self::default_title(),
            page_width_pt,
            page_height_pt,
            page_background: None,
            pages: Vec::new(),
        }
    }

    fn default_title() -> String {
        "Document".to_string()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// All text lines on `page`, in box order. Handy for inspecting where
    /// content landed.
    pub fn page_text(&self, page: usize) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(p) = self.pages.get(page) {
            for lbox in &p.boxes {
                lbox.collect_text(&mut out);
            }
        }
        out
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            border_left: None,
            text: None,
            image: None,
            children: Vec::new(),
        }
    }

    fn collect_text(&self, out: &mut Vec<String>) {
        if let Some(text) = &self.text {
            out.extend(text.lines.iter().map(|l| l.text.clone()));
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_keeps_pages() {
        let mut config = LayoutConfig::new(612.0, 792.0);
        let mut lbox = LayoutBox::new(72.0, 72.0, 100.0, 20.0);
        lbox.text = Some(TextContent {
            lines: vec![TextLine {
                text: "Hello".to_string(),
                x_offset: 0.0,
                y_offset: 0.0,
            }],
            font_family: FontFamily::Times,
            font_size: 12.0,
            bold: false,
            italic: true,
            color: [0.0, 0.0, 0.0, 1.0],
            line_height: 16.8,
            ascender: 9.0,
            text_align: "left".to_string(),
        });
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![lbox],
        });

        let json = config.to_json().unwrap();
        let back = LayoutConfig::from_json(&json).unwrap();
        assert_eq!(back.pages.len(), 1);
        assert_eq!(back.page_text(0), vec!["Hello"]);
        assert_eq!(back.page_width_pt, 612.0);
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{"page_width_pt": 595.28, "page_height_pt": 841.89, "pages": []}"#;
        let config = LayoutConfig::from_json(json).unwrap();
        assert_eq!(config.title, "Document");
        assert!(config.page_background.is_none());
        assert!(config.page_text(0).is_empty());
    }
}
