//! Pipeline – ties together parsing, styling, layout, pagination, and
//! rendering into a single function call. This is the static PDF writer:
//! it lays the document out itself, without a live rendering surface.

use crate::dom::{body_children, collect_styles, first_heading_text, parse_html, DomNode};
use crate::error::Result;
use crate::fonts::FontManager;
use crate::layout::compute_layout;
use crate::layout_config::LayoutConfig;
use crate::page::PageLayoutConfig;
use crate::pagination::paginate;
use crate::render::render_pdf;
use crate::style::{style_document, Stylesheet};

/// Title used when the document has no heading.
const DEFAULT_TITLE: &str = "Document";

/// Markup body + style block → PDF bytes.
///
/// The body is laid out inside a `section.section` wrapper, matching the
/// envelope of a compiled document.
pub fn generate(markup_body: &str, style_block: &str, page: &PageLayoutConfig) -> Result<Vec<u8>> {
    let layout = layout_markup(markup_body, style_block, page)?;
    render_pdf(&layout)
}

/// Full HTML document (with `<style>` blocks in its head) → PDF bytes.
pub fn generate_from_html(html: &str, page: &PageLayoutConfig) -> Result<Vec<u8>> {
    let layout = compute_layout_config(html, page)?;
    render_pdf(&layout)
}

/// Generate only the layout config (no PDF rendering) – useful for testing.
pub fn compute_layout_config(html: &str, page: &PageLayoutConfig) -> Result<LayoutConfig> {
    let dom = parse_html(html);
    let sheet = Stylesheet::parse(&collect_styles(&dom));
    layout_nodes(&body_children(&dom), &sheet, page)
}

fn layout_markup(markup_body: &str, style_block: &str, page: &PageLayoutConfig) -> Result<LayoutConfig> {
    let wrapped = format!("<section class='section'>{markup_body}</section>");
    let sheet = Stylesheet::parse(style_block);
    layout_nodes(&parse_html(&wrapped), &sheet, page)
}

fn layout_nodes(nodes: &[DomNode], sheet: &Stylesheet, page: &PageLayoutConfig) -> Result<LayoutConfig> {
    log::debug!("Static writer: {} style rule(s)", sheet.len());

    // 1. Cascade styles
    let tree = style_document(nodes, sheet);

    // 2. Compute layout
    let fonts = FontManager::default();
    let boxes = compute_layout(&tree, page, &fonts)?;

    // 3. Paginate
    let mut layout = paginate(&boxes, page, &fonts);
    layout.title = first_heading_text(nodes).unwrap_or_else(|| DEFAULT_TITLE.to_string());
    if !tree.body.background_color.is_transparent() {
        layout.page_background = Some(tree.body.background_color.to_array());
    }
    Ok(layout)
}
