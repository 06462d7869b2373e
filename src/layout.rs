//! Layout engine – uses Taffy to compute block layout from a styled DOM tree,
//! then converts the result into positioned boxes in document coordinates.
//!
//! Block flow is a flex column, table rows are flex rows with equal-width
//! cells, and consecutive inline children are merged into one anonymous text
//! box that is word-wrapped at build time.

use std::collections::HashMap;

use taffy::prelude::*;

use crate::dom::Tag;
use crate::error::{Error, Result};
use crate::fonts::{wrap_preformatted, wrap_text, FontManager, TextMetrics};
use crate::page::PageLayoutConfig;
use crate::render::parse_data_uri;
use crate::style::{self, ComputedStyle, StyledNode, StyledTree, LINE_BREAK, PX_TO_PT};

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

impl PositionedBox {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn display(&self) -> style::Display {
        self.style.display
    }

    /// Top of the first text line inside this box, if any.
    pub fn first_text_top(&self) -> Option<f32> {
        if let BoxContent::Text { .. } = self.content {
            return Some(self.y);
        }
        self.children.iter().find_map(PositionedBox::first_text_top)
    }
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text {
        lines: Vec<String>,
    },
    Image {
        src: String,
    },
    /// List item marker, drawn in the left gutter level with the first line.
    ListItem {
        marker: String,
        /// Offset of the first text line from the top of the item.
        marker_y: f32,
    },
}

/// Which kind of list a container is, for numbering its items.
#[derive(Debug, Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered { start: u32 },
}

fn layout_error(e: taffy::TaffyError) -> Error {
    Error::Writer(format!("Layout failed: {e}"))
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager) -> Self {
        let mut taffy = TaffyTree::new();
        // Points, not device pixels: keep fractional positions.
        taffy.disable_rounding();
        Self {
            taffy,
            fonts,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
        }
    }

    /// Whether a node flows inside a line rather than starting a block.
    fn is_inline(node: &StyledNode) -> bool {
        match node {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                tag,
                style,
                children,
                ..
            } => {
                *tag != Tag::Img
                    && style.display == style::Display::Inline
                    && children.iter().all(Self::is_inline)
            }
        }
    }

    /// Concatenate the text of an inline run, recording the style of every
    /// non-blank piece.
    fn collect_inline_text<'n>(
        node: &'n StyledNode,
        text: &mut String,
        styles: &mut Vec<&'n ComputedStyle>,
    ) {
        match node {
            StyledNode::Text { text: t, style } => {
                text.push_str(t);
                if !t.trim().is_empty() {
                    styles.push(style);
                }
            }
            StyledNode::Element { children, .. } => {
                for child in children {
                    Self::collect_inline_text(child, text, styles);
                }
            }
        }
    }

    /// A run in a single font (a paragraph that is all bold, a code block)
    /// keeps that font; mixed runs use the container's text style.
    fn run_style(container: &ComputedStyle, styles: &[&ComputedStyle]) -> ComputedStyle {
        let same_font = |a: &ComputedStyle, b: &ComputedStyle| {
            a.font_family == b.font_family
                && a.font_weight == b.font_weight
                && a.font_style == b.font_style
                && a.font_size == b.font_size
        };
        match styles.split_first() {
            Some((first, rest)) if rest.iter().all(|s| same_font(first, s)) => {
                let mut style = ComputedStyle::for_text(first);
                style.text_align = container.text_align;
                style
            }
            _ => ComputedStyle::for_text(container),
        }
    }

    fn normalize_run(raw: &str, preformatted: bool) -> String {
        if preformatted {
            return raw.replace(LINE_BREAK, "\n");
        }
        raw.split(LINE_BREAK)
            .map(|segment| segment.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Turn pending inline nodes into one anonymous text box.
    fn flush_run(
        &mut self,
        run: &mut Vec<&StyledNode>,
        container: &ComputedStyle,
        width: f32,
        out: &mut Vec<NodeId>,
    ) -> Result<()> {
        if run.is_empty() {
            return Ok(());
        }
        let mut raw = String::new();
        let mut styles = Vec::new();
        for node in run.drain(..) {
            Self::collect_inline_text(node, &mut raw, &mut styles);
        }
        let style = Self::run_style(container, &styles);
        let text = Self::normalize_run(&raw, style.preserves_whitespace());
        if text.trim().is_empty() {
            return Ok(());
        }
        out.push(self.build_text_node(&text, &style, width)?);
        Ok(())
    }

    fn build_text_node(&mut self, text: &str, style: &ComputedStyle, width: f32) -> Result<NodeId> {
        let metrics = TextMetrics {
            fonts: self.fonts,
            font_size: style.font_size,
            bold: style.is_bold(),
            italic: style.is_italic(),
            family: style.font_family,
        };
        let lines = if style.preserves_whitespace() {
            wrap_preformatted(text, width, metrics)
        } else {
            wrap_text(text.trim(), width, metrics)
        };
        let text_height = lines.len() as f32 * style.line_height_pt();

        let taffy_style = Style {
            display: taffy::Display::Block,
            flex_shrink: 0.0,
            size: Size {
                width: taffy::Dimension::Auto,
                height: taffy::Dimension::Length(text_height),
            },
            ..Default::default()
        };
        let node = self.taffy.new_leaf(taffy_style).map_err(layout_error)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(node, BoxContent::Text { lines });
        Ok(node)
    }

    /// Build the children of a container whose content box is `width` wide.
    fn build_children(
        &mut self,
        children: &[StyledNode],
        container: &ComputedStyle,
        width: f32,
        list: Option<ListKind>,
    ) -> Result<Vec<NodeId>> {
        let is_row = container.display == style::Display::TableRow;
        let cells = children
            .iter()
            .filter(|c| matches!(c, StyledNode::Element { .. }))
            .count()
            .max(1);
        let child_width = if is_row {
            (width / cells as f32).max(1.0)
        } else {
            width
        };

        let mut nodes = Vec::new();
        let mut run: Vec<&StyledNode> = Vec::new();
        let mut item_number = match list {
            Some(ListKind::Ordered { start }) => start,
            _ => 1,
        };
        let mut prev_margin_bottom = 0.0f32;

        for child in children {
            if Self::is_inline(child) {
                run.push(child);
                continue;
            }
            if !run.is_empty() {
                let before = nodes.len();
                self.flush_run(&mut run, container, child_width, &mut nodes)?;
                if nodes.len() > before {
                    prev_margin_bottom = 0.0;
                }
            }

            // Adjacent vertical margins collapse to the larger of the two.
            let collapse = if is_row { 0.0 } else { prev_margin_bottom };
            let Some(id) = self.build_node(child, child_width, collapse)? else {
                continue;
            };

            if let (Some(kind), StyledNode::Element { tag: Tag::Li, .. }) = (list, child) {
                let marker = match kind {
                    ListKind::Bullet => "\u{2022}".to_string(),
                    ListKind::Ordered { .. } => format!("{item_number}."),
                };
                item_number += 1;
                self.node_content.insert(
                    id,
                    BoxContent::ListItem {
                        marker,
                        marker_y: 0.0,
                    },
                );
            }

            prev_margin_bottom = child.style().margin_bottom;
            nodes.push(id);
        }
        self.flush_run(&mut run, container, child_width, &mut nodes)?;
        Ok(nodes)
    }

    fn build_node(
        &mut self,
        styled: &StyledNode,
        parent_width: f32,
        collapse_top: f32,
    ) -> Result<Option<NodeId>> {
        match styled {
            StyledNode::Text { text, style } => {
                if text.trim().is_empty() {
                    return Ok(None);
                }
                let text = Self::normalize_run(text, style.preserves_whitespace());
                self.build_text_node(&text, style, parent_width).map(Some)
            }
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => {
                if *tag == Tag::Img {
                    let src = attrs.get("src").map(String::as_str).unwrap_or_default();
                    return self.build_image_node(src, style, parent_width, collapse_top);
                }
                let list = match tag {
                    Tag::Ul => Some(ListKind::Bullet),
                    Tag::Ol => Some(ListKind::Ordered {
                        start: attrs
                            .get("start")
                            .and_then(|s| s.trim().parse().ok())
                            .unwrap_or(1),
                    }),
                    _ => None,
                };
                self.build_element_node(style, children, list, parent_width, collapse_top)
                    .map(Some)
            }
        }
    }

    fn build_element_node(
        &mut self,
        style: &ComputedStyle,
        children: &[StyledNode],
        list: Option<ListKind>,
        parent_width: f32,
        collapse_top: f32,
    ) -> Result<NodeId> {
        let border_left = left_border_width(style);
        let mut box_width = style
            .width
            .resolve(parent_width)
            .unwrap_or(parent_width - style.margin_left - style.margin_right);
        if let Some(max) = style.max_width.resolve(parent_width) {
            box_width = box_width.min(max);
        }
        let inner_width = (box_width
            - style.padding_left
            - style.padding_right
            - border_left
            - style.border_width)
            .max(1.0);

        let child_nodes = self.build_children(children, style, inner_width, list)?;
        let taffy_style = computed_to_taffy(style, collapse_top);
        let node = self
            .taffy
            .new_with_children(taffy_style, &child_nodes)
            .map_err(layout_error)?;
        self.node_styles.insert(node, style.clone());
        Ok(node)
    }

    fn build_image_node(
        &mut self,
        src: &str,
        style: &ComputedStyle,
        parent_width: f32,
        collapse_top: f32,
    ) -> Result<Option<NodeId>> {
        let Some((width, height)) = image_size(src, style, parent_width) else {
            log::warn!("Skipping image that is not a decodable data URI");
            return Ok(None);
        };
        let mut taffy_style = computed_to_taffy(style, collapse_top);
        taffy_style.size = Size {
            width: taffy::Dimension::Length(width),
            height: taffy::Dimension::Length(height),
        };
        taffy_style.max_size = Size::auto();
        let node = self.taffy.new_leaf(taffy_style).map_err(layout_error)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(
            node,
            BoxContent::Image {
                src: src.to_string(),
            },
        );
        Ok(Some(node))
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox> {
        let layout = self.taffy.layout(node).map_err(layout_error)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let mut content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)
            .map_err(layout_error)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<Result<Vec<_>>>()?;

        if let BoxContent::ListItem { marker_y, .. } = &mut content {
            *marker_y = children
                .iter()
                .find_map(PositionedBox::first_text_top)
                .map_or(style.padding_top, |top| top - y);
        }

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            style,
            content,
            children,
        })
    }
}

/// Taffy border for the left edge: a `border-left` rule wins over `border`.
fn left_border_width(s: &ComputedStyle) -> f32 {
    if s.border_left_width > 0.0 {
        s.border_left_width
    } else {
        s.border_width
    }
}

fn dim_to_taffy(d: style::Dimension) -> taffy::Dimension {
    match d {
        style::Dimension::Auto => taffy::Dimension::Auto,
        style::Dimension::Pt(v) => taffy::Dimension::Length(v),
        style::Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
    }
}

fn computed_to_taffy(s: &ComputedStyle, collapse_top: f32) -> Style {
    let mut ts = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        flex_shrink: 0.0,
        size: Size {
            width: dim_to_taffy(s.width),
            height: dim_to_taffy(s.height),
        },
        max_size: Size {
            width: dim_to_taffy(s.max_width),
            height: taffy::Dimension::Auto,
        },
        margin: Rect {
            top: LengthPercentageAuto::Length((s.margin_top - collapse_top).max(0.0)),
            right: LengthPercentageAuto::Length(s.margin_right),
            bottom: LengthPercentageAuto::Length(s.margin_bottom),
            left: LengthPercentageAuto::Length(s.margin_left),
        },
        padding: Rect {
            top: LengthPercentage::Length(s.padding_top),
            right: LengthPercentage::Length(s.padding_right),
            bottom: LengthPercentage::Length(s.padding_bottom),
            left: LengthPercentage::Length(s.padding_left),
        },
        border: Rect {
            top: LengthPercentage::Length(s.border_width),
            right: LengthPercentage::Length(s.border_width),
            bottom: LengthPercentage::Length(s.border_width),
            left: LengthPercentage::Length(left_border_width(s)),
        },
        ..Default::default()
    };

    // HTML table model: rows lay cells out side by side, cells share the row
    // width equally.
    match s.display {
        style::Display::TableRow => {
            ts.flex_direction = taffy::FlexDirection::Row;
            ts.align_items = Some(taffy::AlignItems::Stretch);
            ts.min_size.width = taffy::Dimension::Length(0.0);
        }
        style::Display::TableCell => {
            ts.flex_grow = 1.0;
            ts.flex_shrink = 1.0;
            ts.flex_basis = taffy::Dimension::Length(0.0);
            ts.min_size.width = taffy::Dimension::Length(0.0);
            ts.size.width = taffy::Dimension::Auto;
        }
        _ => {}
    }
    ts
}

// ---------------------------------------------------------------------------
// Image intrinsic-size helper
// ---------------------------------------------------------------------------

/// Size in points of a base64 data-URI image: explicit CSS sizes win, a
/// single explicit side keeps the aspect ratio, and otherwise one image pixel
/// is one CSS pixel. The result never exceeds the container width.
///
/// Returns `None` when the src is not a parseable data URI or the image
/// cannot be decoded.
fn image_size(src: &str, style: &ComputedStyle, container: f32) -> Option<(f32, f32)> {
    let bytes = parse_data_uri(src).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    let (px_w, px_h) = (img.width() as f32, img.height() as f32);
    if px_w == 0.0 || px_h == 0.0 {
        return None;
    }
    let aspect = px_w / px_h;

    let (mut w, mut h) = match (style.width.resolve(container), style.height.resolve(container)) {
        (Some(w), Some(h)) => (w, h),
        // Width known → derive height from aspect ratio.
        (Some(w), None) => (w, w / aspect),
        // Height known → derive width from aspect ratio.
        (None, Some(h)) => (h * aspect, h),
        (None, None) => (px_w * PX_TO_PT, px_h * PX_TO_PT),
    };
    let max = style
        .max_width
        .resolve(container)
        .unwrap_or(container)
        .min(container);
    if w > max {
        h *= max / w;
        w = max;
    }
    Some((w.max(1.0), h.max(1.0)))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled document, returning the top-level positioned
/// boxes in document coordinates. x includes the left page margin; y starts
/// at zero at the top of the content area.
pub fn compute_layout(
    document: &StyledTree,
    page: &PageLayoutConfig,
    fonts: &FontManager,
) -> Result<Vec<PositionedBox>> {
    let content_width = page.content_width();
    let mut builder = LayoutBuilder::new(fonts);

    let child_ids = builder.build_children(&document.children, &document.body, content_width, None)?;

    // Wrap all nodes in a root flex-column container
    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: taffy::Dimension::Length(content_width),
            height: taffy::Dimension::Auto,
        },
        ..Default::default()
    };
    let root = builder
        .taffy
        .new_with_children(root_style, &child_ids)
        .map_err(layout_error)?;

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(content_width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(layout_error)?;

    let root_box = builder.extract(root, page.margin_left(), 0.0)?;
    Ok(root_box.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::style::{style_document, Stylesheet};

    fn layout(html: &str, css: &str) -> Vec<PositionedBox> {
        let doc = style_document(&parse_html(html), &Stylesheet::parse(css));
        compute_layout(&doc, &PageLayoutConfig::default(), &FontManager::default()).unwrap()
    }

    fn text_lines(pbox: &PositionedBox) -> Vec<String> {
        let mut out = Vec::new();
        if let BoxContent::Text { lines } = &pbox.content {
            out.extend(lines.iter().cloned());
        }
        for child in &pbox.children {
            out.extend(text_lines(child));
        }
        out
    }

    #[test]
    fn layout_simple_paragraph() {
        let boxes = layout("<p>Hello world</p>", "");
        assert_eq!(boxes.len(), 1);
        let first = &boxes[0];
        assert!(first.width > 0.0, "Box should have width");
        assert!(first.height > 0.0, "Box should have height");
        assert_eq!(first.x, 72.0);
        assert_eq!(text_lines(first), vec!["Hello world"]);
    }

    #[test]
    fn inline_runs_merge_and_keep_spaces() {
        let boxes = layout("<p>Some <strong>bold</strong> <em>and</em> plain.</p>", "");
        assert_eq!(text_lines(&boxes[0]), vec!["Some bold and plain."]);
    }

    #[test]
    fn padding_insets_text() {
        let boxes = layout(
            "<pre><code>let x = 1;\n    indented\n</code></pre>",
            "pre { padding: 8pt; margin: 0; background: #f5f5f5; }",
        );
        let pre = &boxes[0];
        let text = &pre.children[0];
        assert_eq!(text.x - pre.x, 8.0);
        assert_eq!(text.y - pre.y, 8.0);
        assert_eq!(text_lines(pre), vec!["let x = 1;", "    indented"]);
        assert_eq!(text.style.font_family, crate::fonts::FontFamily::Courier);
    }

    #[test]
    fn list_items_keep_markers_and_text() {
        let boxes = layout("<ol start=\"3\"><li>three</li><li>four</li></ol><ul><li>dot</li></ul>", "");
        let markers: Vec<String> = boxes
            .iter()
            .flat_map(|list| list.children.iter())
            .filter_map(|li| match &li.content {
                BoxContent::ListItem { marker, .. } => Some(marker.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec!["3.", "4.", "\u{2022}"]);
        assert_eq!(text_lines(&boxes[0]), vec!["three", "four"]);
    }

    #[test]
    fn nested_list_after_text() {
        let boxes = layout("<ul><li>outer\n<ul><li>inner</li></ul></li></ul>", "");
        assert_eq!(text_lines(&boxes[0]), vec!["outer", "inner"]);
    }

    #[test]
    fn table_cells_share_row_width() {
        let boxes = layout(
            "<table><thead><tr><th>A</th><th>B</th></tr></thead><tbody><tr><td>1</td><td>2</td></tr></tbody></table>",
            "table { width: 100%; margin: 0; }",
        );
        let table = &boxes[0];
        assert_eq!(table.children.len(), 2);
        let row = &table.children[1].children[0];
        assert_eq!(row.children.len(), 2);
        let (a, b) = (&row.children[0], &row.children[1]);
        assert!((a.width - b.width).abs() < 0.01);
        assert!(b.x > a.x);
    }

    #[test]
    fn sibling_margins_collapse() {
        let boxes = layout("<p>a</p><p>b</p>", "p { margin: 10pt 0; }");
        let gap = boxes[1].y - boxes[0].bottom();
        assert!((gap - 10.0).abs() < 0.01, "gap was {gap}");
    }

    #[test]
    fn undecodable_images_are_skipped() {
        let boxes = layout("<p><img src=\"https://example.com/x.png\" alt=\"x\"></p><p>after</p>", "");
        assert_eq!(text_lines(&boxes[1]), vec!["after"]);
    }
}
