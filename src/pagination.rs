//! Pagination – splits the positioned box tree into pages.
//!
//! Handles:
//! - Page boundaries from the page size and margins
//! - `page-break-before` / `page-break-after` hints
//! - Keep-with-next for `page-break-after: avoid` (headings)
//! - Table splitting between rows, repeating header rows on each page
//! - `page-break-inside: avoid` boxes moving whole to the next page
//! - Text blocks splitting between lines

use crate::fonts::FontManager;
use crate::layout::{BoxContent, PositionedBox};
use crate::layout_config::*;
use crate::page::PageLayoutConfig;
use crate::style::{self, Display};

/// Gap between a list marker and the item text, in points.
const MARKER_GAP_PT: f32 = 6.0;

/// Recursively expand any pure-container box whose height exceeds a single
/// page so its children can be split across pages individually. Tables are
/// kept whole; they split by rows instead.
fn flatten_for_pagination(boxes: &[PositionedBox], content_height: f32) -> Vec<&PositionedBox> {
    let mut result = Vec::new();
    for pbox in boxes {
        if pbox.height > content_height
            && matches!(pbox.content, BoxContent::None)
            && pbox.display() != Display::Table
            && !pbox.children.is_empty()
        {
            result.extend(flatten_for_pagination(&pbox.children, content_height));
        } else {
            result.push(pbox);
        }
    }
    result
}

/// Height from the top of `pbox` to the bottom of its first line of text.
/// Used to keep a heading together with the start of what follows it.
fn leading_height(pbox: &PositionedBox) -> f32 {
    let lead = match &pbox.content {
        BoxContent::Text { .. } => pbox.style.line_height_pt(),
        _ => match pbox.children.first() {
            Some(child) => (child.y - pbox.y) + leading_height(child),
            None => pbox.height,
        },
    };
    lead.min(pbox.height)
}

struct Paginator<'a> {
    config: LayoutConfig,
    current: PageLayout,
    /// Document-space y at which the current page begins. All
    /// `PositionedBox.y` values are document coordinates, so
    /// `pbox.y - page_start` is the y-on-page of any box.
    page_start: f32,
    content_height: f32,
    margin_top: f32,
    fonts: &'a FontManager,
}

impl<'a> Paginator<'a> {
    fn new(page: &PageLayoutConfig, fonts: &'a FontManager) -> Self {
        Self {
            config: LayoutConfig::new(page.width_pt, page.height_pt),
            current: PageLayout {
                page_index: 0,
                boxes: Vec::new(),
            },
            page_start: 0.0,
            content_height: page.content_height(),
            margin_top: page.margin_top(),
            fonts,
        }
    }

    fn y_on_page(&self, doc_y: f32) -> f32 {
        (doc_y - self.page_start).max(0.0)
    }

    fn fits(&self, doc_y: f32, height: f32) -> bool {
        self.y_on_page(doc_y) + height <= self.content_height + 0.01
    }

    /// Close the current page; the next one begins at `doc_y`.
    fn new_page(&mut self, doc_y: f32) {
        let next = PageLayout {
            page_index: self.config.pages.len() + 1,
            boxes: Vec::new(),
        };
        self.config.pages.push(std::mem::replace(&mut self.current, next));
        self.page_start = doc_y;
    }

    /// Place `pbox` on the current page at its natural position.
    fn place(&mut self, pbox: &PositionedBox) {
        let y = self.margin_top + self.y_on_page(pbox.y);
        let layout_box = build_layout_box(pbox, pbox.x, y, self.fonts);
        self.current.boxes.push(layout_box);
    }

    fn add(&mut self, pbox: &PositionedBox, next: Option<&PositionedBox>) {
        if pbox.style.page_break_before && !self.current.boxes.is_empty() {
            self.new_page(pbox.y);
        }

        let overflows = !self.fits(pbox.y, pbox.height);
        if overflows && !pbox.style.page_break_inside_avoid {
            if is_table_like(pbox) {
                self.split_table(pbox);
                self.finish(pbox);
                return;
            }
            if let BoxContent::Text { lines } = &pbox.content {
                self.split_text(pbox, lines);
                self.finish(pbox);
                return;
            }
            // A plain wrapper has nothing of its own to draw, so its children
            // can continue on the next page.
            if is_plain_container(pbox) {
                for (i, child) in pbox.children.iter().enumerate() {
                    self.add(child, pbox.children.get(i + 1).or(next));
                }
                self.finish(pbox);
                return;
            }
        }

        let mut needed = pbox.height;
        if pbox.style.page_break_after_avoid {
            if let Some(next) = next {
                needed = (next.y - pbox.y) + leading_height(next);
            }
        }
        if !self.fits(pbox.y, needed) && !self.current.boxes.is_empty() {
            self.new_page(pbox.y);
        }
        self.place(pbox);
        self.finish(pbox);
    }

    fn finish(&mut self, pbox: &PositionedBox) {
        if pbox.style.page_break_after {
            self.new_page(pbox.bottom());
        }
    }

    /// Place a text block line by line, continuing on new pages as needed.
    fn split_text(&mut self, pbox: &PositionedBox, lines: &[String]) {
        let line_height = pbox.style.line_height_pt().max(0.1);
        let mut first = 0;
        while first < lines.len() {
            let chunk_y = pbox.y + first as f32 * line_height;
            let room = self.content_height - self.y_on_page(chunk_y);
            let mut count = (room / line_height + 0.01).floor().max(0.0) as usize;
            if count == 0 {
                if self.current.boxes.is_empty() {
                    // Line taller than the page: place it anyway.
                    count = 1;
                } else {
                    self.new_page(chunk_y);
                    continue;
                }
            }
            let count = count.min(lines.len() - first);
            let chunk = PositionedBox {
                y: chunk_y,
                height: count as f32 * line_height,
                content: BoxContent::Text {
                    lines: lines[first..first + count].to_vec(),
                },
                children: Vec::new(),
                ..pbox.clone()
            };
            self.place(&chunk);
            first += count;
            if first < lines.len() {
                self.new_page(pbox.y + first as f32 * line_height);
            }
        }
    }

    /// Place a table row by row, repeating its header rows at the top of
    /// every continuation page.
    fn split_table(&mut self, table: &PositionedBox) {
        let mut header: Vec<&PositionedBox> = Vec::new();
        let mut body: Vec<&PositionedBox> = Vec::new();
        for group in &table.children {
            match group.display() {
                Display::TableHeaderGroup => header.extend(group.children.iter()),
                Display::TableRowGroup => body.extend(group.children.iter()),
                _ => body.push(group),
            }
        }
        let header_top = header.first().map_or(0.0, |h| h.y);
        let header_height = header.last().map_or(0.0, |h| h.bottom() - header_top);

        // The header must not be stranded without at least one body row.
        let first_rows = header_height + body.first().map_or(0.0, |r| r.height);
        let start = header.first().or(body.first()).map_or(table.y, |r| r.y);
        if !self.fits(start, first_rows) && !self.current.boxes.is_empty() {
            self.new_page(start);
        }
        for row in &header {
            self.place(row);
        }

        for row in body {
            if !self.fits(row.y, row.height) && !self.current.boxes.is_empty() {
                self.new_page(row.y - header_height);
                for h in &header {
                    let y = self.margin_top + (h.y - header_top);
                    let repeated = build_layout_box(h, h.x, y, self.fonts);
                    self.current.boxes.push(repeated);
                }
            }
            self.place(row);
        }
    }

    fn into_config(mut self) -> LayoutConfig {
        if !self.current.boxes.is_empty() || self.config.pages.is_empty() {
            self.config.pages.push(self.current);
        }
        self.config
    }
}

fn is_table_like(pbox: &PositionedBox) -> bool {
    pbox.display() == Display::Table && !pbox.children.is_empty()
}

fn is_plain_container(pbox: &PositionedBox) -> bool {
    let s = &pbox.style;
    matches!(pbox.content, BoxContent::None)
        && !pbox.children.is_empty()
        && pbox.display() != Display::Table
        && s.background_color.is_transparent()
        && s.border_width == 0.0
        && s.border_left_width == 0.0
}

/// Convert positioned boxes into a paginated LayoutConfig.
pub fn paginate(
    boxes: &[PositionedBox],
    page: &PageLayoutConfig,
    fonts: &FontManager,
) -> LayoutConfig {
    let mut paginator = Paginator::new(page, fonts);

    // Expand oversized wrappers so their children can paginate individually.
    let flat = flatten_for_pagination(boxes, page.content_height());
    for (i, pbox) in flat.iter().enumerate() {
        paginator.add(pbox, flat.get(i + 1).copied());
    }
    let config = paginator.into_config();
    log::debug!("Paginated into {} page(s)", config.pages.len());
    config
}

/// Recursively build a LayoutBox tree where every box carries *page-absolute*
/// x/y coordinates (origin = top-left of the physical page).
///
/// For each child, `child_abs_y = parent_abs_y + (child.y − parent.y)`
/// because PositionedBox.y values are document-space absolutes.
fn build_layout_box(pbox: &PositionedBox, abs_x: f32, abs_y: f32, fonts: &FontManager) -> LayoutBox {
    let s = &pbox.style;
    let mut lb = LayoutBox::new(abs_x, abs_y, pbox.width, pbox.height);

    if !s.background_color.is_transparent() {
        lb.background_color = Some(s.background_color.to_array());
    }
    if s.border_width > 0.0 && !s.border_color.is_transparent() {
        lb.border = Some(BorderStyle {
            width: s.border_width,
            color: s.border_color.to_array(),
        });
    }
    if s.border_left_width > 0.0 && !s.border_left_color.is_transparent() {
        lb.border_left = Some(BorderStyle {
            width: s.border_left_width,
            color: s.border_left_color.to_array(),
        });
    }

    match &pbox.content {
        BoxContent::Text { lines } => {
            let text_lines = lines
                .iter()
                .enumerate()
                .map(|(i, line)| TextLine {
                    text: line.clone(),
                    x_offset: align_offset(line, pbox, fonts),
                    y_offset: i as f32 * s.line_height_pt(),
                })
                .collect();
            lb.text = Some(text_content(s, text_lines, fonts));
        }
        BoxContent::Image { src } => {
            lb.image = Some(ImageContent {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
        }
        BoxContent::ListItem { marker, marker_y } => {
            // The marker hangs in the gutter left of the item box; the item's
            // own text comes from its children.
            let width =
                fonts.measure_text_width(marker, s.font_size, s.is_bold(), s.is_italic(), s.font_family);
            let line = TextLine {
                text: marker.clone(),
                x_offset: -(width + MARKER_GAP_PT),
                y_offset: *marker_y,
            };
            lb.text = Some(text_content(s, vec![line], fonts));
        }
        BoxContent::None => {}
    }

    for child in &pbox.children {
        let child_abs_y = abs_y + (child.y - pbox.y);
        lb.children.push(build_layout_box(child, child.x, child_abs_y, fonts));
    }
    lb
}

fn text_content(s: &style::ComputedStyle, lines: Vec<TextLine>, fonts: &FontManager) -> TextContent {
    TextContent {
        lines,
        font_family: s.font_family,
        font_size: s.font_size,
        bold: s.is_bold(),
        italic: s.is_italic(),
        color: s.color.to_array(),
        line_height: s.line_height_pt(),
        ascender: fonts.ascender_pt(s.font_size, s.is_bold(), s.is_italic(), s.font_family),
        text_align: s.text_align.as_str().to_string(),
    }
}

fn align_offset(line: &str, pbox: &PositionedBox, fonts: &FontManager) -> f32 {
    let s = &pbox.style;
    let slack = || {
        let width = fonts.measure_text_width(line, s.font_size, s.is_bold(), s.is_italic(), s.font_family);
        (pbox.width - width).max(0.0)
    };
    match s.text_align {
        style::TextAlign::Left => 0.0,
        style::TextAlign::Center => slack() / 2.0,
        style::TextAlign::Right => slack(),
    }
}
