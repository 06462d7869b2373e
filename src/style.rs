//! Style resolver – cascades CSS onto the DOM and produces a flat
//! [`ComputedStyle`] per element for the layout engine.
//!
//! Cascade order: user-agent defaults, then rules from the document's style
//! block ordered by (specificity, source order), then the inline `style`
//! attribute. Every length is resolved to PDF points.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::Rgb;
use crate::dom::{DomNode, ElementNode, Tag};
use crate::fonts::FontFamily;
use crate::units::cm_to_points_f32;

/// Default font size in points (CSS `medium`).
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// One CSS pixel in points.
pub const PX_TO_PT: f32 = 0.75;

/// Carries `<br>` through inline text merging.
pub const LINE_BREAK: char = '\u{2028}';

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    pub display: Display,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub max_width: Dimension,

    // Spacing (pt)
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    // Border
    pub border_width: f32,
    pub border_color: Color,
    pub border_left_width: f32,
    pub border_left_color: Color,

    // Typography (inherited)
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_family: FontFamily,
    pub font_style: FontStyle,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,
    pub white_space: WhiteSpace,

    // Background
    pub background_color: Color,

    // Page break
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_after_avoid: bool,
    pub page_break_inside_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            width: Dimension::Auto,
            height: Dimension::Auto,
            max_width: Dimension::Auto,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_width: 0.0,
            border_color: Color::BLACK,
            border_left_width: 0.0,
            border_left_color: Color::BLACK,
            font_size: DEFAULT_FONT_SIZE,
            font_weight: FontWeight::Normal,
            font_family: FontFamily::Helvetica,
            font_style: FontStyle::Normal,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
            white_space: WhiteSpace::Normal,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
            page_break_after_avoid: false,
            page_break_inside_avoid: false,
        }
    }
}

impl ComputedStyle {
    /// Copy the inherited (text) properties from `parent`.
    fn inherit_from(&mut self, parent: &ComputedStyle) {
        self.font_size = parent.font_size;
        self.font_weight = parent.font_weight;
        self.font_family = parent.font_family;
        self.font_style = parent.font_style;
        self.color = parent.color;
        self.text_align = parent.text_align;
        self.line_height = parent.line_height;
        self.white_space = parent.white_space;
    }

    /// Style for a text run: inherited properties only, no box model.
    pub fn for_text(parent: &ComputedStyle) -> Self {
        let mut style = Self {
            display: Display::Inline,
            ..Self::default()
        };
        style.inherit_from(parent);
        style
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }

    pub fn preserves_whitespace(&self) -> bool {
        self.white_space == WhiteSpace::Pre
    }

    /// Line box height in points.
    pub fn line_height_pt(&self) -> f32 {
        self.font_size * self.line_height
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Inline,
    ListItem,
    Table,
    TableHeaderGroup,
    TableRowGroup,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    Normal,
    /// `pre`, `pre-wrap` and `pre-line`: keep line breaks and indentation,
    /// still wrapping overlong lines.
    Pre,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Pt(f32),
    Percent(f32),
}

impl Dimension {
    /// Resolve against a containing width.
    pub fn resolve(self, container: f32) -> Option<f32> {
        match self {
            Dimension::Auto => None,
            Dimension::Pt(v) => Some(v),
            Dimension::Percent(p) => Some(container * p / 100.0),
        }
    }
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Parse a CSS colour: `#rgb`, `#rrggbb`, `rgb()`, `rgba()` or a
    /// common keyword.
    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        if v.starts_with('#') {
            return Rgb::from_hex(&v).map(Color::from);
        }
        if let Some(args) = v
            .strip_prefix("rgba(")
            .or_else(|| v.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::parse_rgb_args(args);
        }
        named_color(&v)
    }

    fn parse_rgb_args(args: &str) -> Option<Self> {
        let parts: Vec<&str> = args
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() < 3 {
            return None;
        }
        let channel = |p: &str| -> Option<f32> {
            let v = match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                None => p.parse::<f32>().ok()? / 255.0,
            };
            Some(v.clamp(0.0, 1.0))
        };
        let alpha = match parts.get(3) {
            Some(p) => match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                None => p.parse::<f32>().ok()?,
            },
            None => 1.0,
        };
        Some(Self {
            r: channel(parts[0])?,
            g: channel(parts[1])?,
            b: channel(parts[2])?,
            a: alpha.clamp(0.0, 1.0),
        })
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Self::rgb8(rgb.r, rgb.g, rgb.b)
    }
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "transparent" | "none" => Color::TRANSPARENT,
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "red" => Color::rgb8(0xff, 0, 0),
        "green" => Color::rgb8(0, 0x80, 0),
        "blue" => Color::rgb8(0, 0, 0xff),
        "gray" | "grey" => Color::rgb8(0x80, 0x80, 0x80),
        "silver" => Color::rgb8(0xc0, 0xc0, 0xc0),
        "lightgray" | "lightgrey" => Color::rgb8(0xd3, 0xd3, 0xd3),
        "darkgray" | "darkgrey" => Color::rgb8(0xa9, 0xa9, 0xa9),
        "maroon" => Color::rgb8(0x80, 0, 0),
        "navy" => Color::rgb8(0, 0, 0x80),
        "teal" => Color::rgb8(0, 0x80, 0x80),
        "purple" => Color::rgb8(0x80, 0, 0x80),
        "orange" => Color::rgb8(0xff, 0xa5, 0),
        "yellow" => Color::rgb8(0xff, 0xff, 0),
        _ => return None,
    };
    Some(color)
}

// ---------------------------------------------------------------------------
// Stylesheet parsing
// ---------------------------------------------------------------------------

/// A single `property: value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

/// One compound selector: an optional tag name plus classes (`pre`,
/// `.section`, `td.num`, `*`).
#[derive(Debug, Clone, PartialEq)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let tag = parts.next()?.to_ascii_lowercase();
        if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '*') {
            return None;
        }
        let classes: Vec<String> = parts.map(str::to_string).collect();
        if classes.iter().any(|c| c.is_empty()) || (tag.is_empty() && classes.is_empty()) {
            return None;
        }
        let tag = (!tag.is_empty() && tag != "*").then_some(tag);
        Some(Self { tag, classes })
    }

    fn matches(&self, element: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag.name() != tag {
                return false;
            }
        }
        let classes = element.classes();
        self.classes.iter().all(|c| classes.contains(&c.as_str()))
    }
}

/// A descendant chain of compounds, outermost first.
#[derive(Debug, Clone, PartialEq)]
struct Selector {
    compounds: Vec<Compound>,
}

impl Selector {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || text.contains(['>', '+', '~', ':', '[', '#']) {
            return None;
        }
        let compounds = text
            .split_whitespace()
            .map(Compound::parse)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { compounds })
    }

    /// (class count, tag count)
    fn specificity(&self) -> (u32, u32) {
        self.compounds.iter().fold((0, 0), |(classes, tags), c| {
            (
                classes + c.classes.len() as u32,
                tags + u32::from(c.tag.is_some()),
            )
        })
    }

    /// `ancestors` is ordered outermost first.
    fn matches(&self, element: &ElementNode, ancestors: &[&ElementNode]) -> bool {
        let Some((last, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(element) {
            return false;
        }
        let mut remaining = ancestors;
        for compound in rest.iter().rev() {
            match remaining.iter().rposition(|a| compound.matches(a)) {
                Some(i) => remaining = &remaining[..i],
                None => return false,
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
struct Rule {
    selector: Selector,
    specificity: (u32, u32),
    order: usize,
    declarations: Vec<Declaration>,
}

/// Parsed style rules. At-rules are skipped and so are selectors using
/// combinators other than descendant.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut rules = Vec::new();
        let mut rest = css.as_str();
        let mut order = 0usize;

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with('@') {
                rest = skip_at_rule(rest);
                continue;
            }
            let Some(open) = rest.find('{') else {
                break;
            };
            let selectors = &rest[..open];
            let after = &rest[open + 1..];
            let close = after.find('}').unwrap_or(after.len());
            let declarations = parse_declarations(&after[..close]);
            rest = after.get(close + 1..).unwrap_or("");

            for text in selectors.split(',') {
                match Selector::parse(text) {
                    Some(selector) => rules.push(Rule {
                        specificity: selector.specificity(),
                        selector,
                        order,
                        declarations: declarations.clone(),
                    }),
                    None => log::debug!("Skipping unsupported selector {:?}", text.trim()),
                }
            }
            order += 1;
        }

        rules.sort_by_key(|r| (r.specificity, r.order));
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Push the declarations of every rule matching `element`, lowest
    /// priority first.
    fn collect_matching<'s>(
        &'s self,
        element: &ElementNode,
        ancestors: &[&ElementNode],
        out: &mut Vec<&'s Declaration>,
    ) {
        for rule in &self.rules {
            if rule.selector.matches(element, ancestors) {
                out.extend(rule.declarations.iter());
            }
        }
    }
}

/// Built-in defaults, applied before any document rule. The body margin is
/// zero because page margins come from the page layout.
const USER_AGENT_CSS: &str = "
body { margin: 0; font-size: 12pt; line-height: 1.4; color: #000000; font-family: Helvetica, sans-serif; }
h1 { font-size: 2em; margin: 0.67em 0; }
h2 { font-size: 1.5em; margin: 0.83em 0; }
h3 { font-size: 1.17em; margin: 1em 0; }
h4 { margin: 1.33em 0; }
h5 { font-size: 0.83em; margin: 1.67em 0; }
h6 { font-size: 0.67em; margin: 2.33em 0; }
h1, h2, h3, h4, h5, h6, strong, th { font-weight: bold; }
em { font-style: italic; }
p, ul, ol, blockquote, pre, table { margin: 1em 0; }
li ul, li ol { margin: 0; }
ul, ol { padding-left: 30pt; }
blockquote { margin: 1em 30pt; }
pre, code { font-family: monospace; }
pre { white-space: pre; }
sup { font-size: 0.83em; }
td, th { padding: 1pt; }
hr { border: 1px solid #808080; margin: 0.5em 0; }
";

fn user_agent() -> &'static Stylesheet {
    static UA: OnceLock<Stylesheet> = OnceLock::new();
    UA.get_or_init(|| Stylesheet::parse(USER_AGENT_CSS))
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Skip a statement at-rule (`@import ...;`) or a block at-rule
/// (`@page { ... }`, `@media print { ... { ... } }`).
fn skip_at_rule(css: &str) -> &str {
    let mut depth = 0usize;
    for (i, c) in css.char_indices() {
        match c {
            ';' if depth == 0 => return &css[i + 1..],
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &css[i + 1..];
                }
            }
            _ => {}
        }
    }
    ""
}

/// Parse a declaration block body (`color: red; margin: 0`).
pub fn parse_declarations(body: &str) -> Vec<Declaration> {
    body.split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            let value = value
                .strip_suffix("!important")
                .map(str::trim_end)
                .unwrap_or(value);
            (!property.is_empty() && !value.is_empty()).then(|| Declaration {
                property,
                value: value.to_string(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element. `ancestors` runs from the root down to
/// the element's parent.
pub fn resolve_style(
    element: &ElementNode,
    ancestors: &[&ElementNode],
    parent: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> ComputedStyle {
    let mut style = base_style_for_tag(&element.tag);
    if let Some(p) = parent {
        style.inherit_from(p);
    }

    let inline = element
        .inline_style()
        .map(parse_declarations)
        .unwrap_or_default();
    let mut declarations: Vec<&Declaration> = Vec::new();
    user_agent().collect_matching(element, ancestors, &mut declarations);
    sheet.collect_matching(element, ancestors, &mut declarations);
    declarations.extend(inline.iter());

    // font-size first, so em lengths elsewhere resolve against the final size.
    let parent_size = parent.map_or(DEFAULT_FONT_SIZE, |p| p.font_size);
    for d in declarations.iter().filter(|d| d.property == "font-size") {
        if let Some(size) = parse_font_size(&d.value, parent_size) {
            style.font_size = size;
        }
    }
    for d in declarations.iter().filter(|d| d.property != "font-size") {
        apply_css_property(&mut style, &d.property, &d.value);
    }
    style
}

/// Display defaults based on tag semantics.
fn base_style_for_tag(tag: &Tag) -> ComputedStyle {
    let display = match tag {
        Tag::A
        | Tag::Strong
        | Tag::Em
        | Tag::Del
        | Tag::Code
        | Tag::Sup
        | Tag::Span
        | Tag::Br
        | Tag::Img
        | Tag::Input => Display::Inline,
        Tag::Li => Display::ListItem,
        Tag::Table => Display::Table,
        Tag::Thead => Display::TableHeaderGroup,
        Tag::Tbody => Display::TableRowGroup,
        Tag::Tr => Display::TableRow,
        Tag::Td | Tag::Th => Display::TableCell,
        Tag::Head | Tag::Style => Display::None,
        Tag::Unknown(name) if matches!(name.as_str(), "meta" | "link" | "title" | "script") => {
            Display::None
        }
        _ => Display::Block,
    };
    ComputedStyle {
        display,
        ..ComputedStyle::default()
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    let em = s.font_size;
    let lower = val.to_ascii_lowercase();
    let val = lower.as_str();
    match prop {
        "display" => {
            s.display = match val {
                "none" => Display::None,
                "block" | "flex" | "grid" => Display::Block,
                "inline" | "inline-block" => Display::Inline,
                "list-item" => Display::ListItem,
                "table" => Display::Table,
                "table-header-group" => Display::TableHeaderGroup,
                "table-row-group" | "table-footer-group" => Display::TableRowGroup,
                "table-row" => Display::TableRow,
                "table-cell" => Display::TableCell,
                _ => s.display,
            }
        }
        "color" => {
            if let Some(c) = Color::parse(val) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            if let Some(c) = find_color(val) {
                s.background_color = c;
            }
        }
        "font-family" => {
            if let Some(family) = FontFamily::from_stack(val) {
                s.font_family = family;
            }
        }
        "font-weight" => {
            s.font_weight = match val {
                "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                _ => FontWeight::Normal,
            }
        }
        "font-style" => {
            s.font_style = match val {
                "italic" | "oblique" => FontStyle::Italic,
                _ => FontStyle::Normal,
            }
        }
        "line-height" => {
            if val == "normal" {
                s.line_height = 1.2;
            } else if let Ok(factor) = val.parse::<f32>() {
                s.line_height = factor;
            } else if let Some(pct) = val.strip_suffix('%').and_then(|p| p.parse::<f32>().ok()) {
                s.line_height = pct / 100.0;
            } else if let Some(pt) = parse_length(val, em) {
                if em > 0.0 {
                    s.line_height = pt / em;
                }
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "white-space" => {
            s.white_space = match val {
                "pre" | "pre-wrap" | "pre-line" | "break-spaces" => WhiteSpace::Pre,
                _ => WhiteSpace::Normal,
            }
        }
        "width" => s.width = parse_dimension(val, em),
        "height" => s.height = parse_dimension(val, em),
        "max-width" => s.max_width = parse_dimension(val, em),
        "margin" => {
            if let Some([t, r, b, l]) = parse_box_shorthand(val, em) {
                s.margin_top = t;
                s.margin_right = r;
                s.margin_bottom = b;
                s.margin_left = l;
            }
        }
        "margin-top" => set_length(&mut s.margin_top, val, em),
        "margin-right" => set_length(&mut s.margin_right, val, em),
        "margin-bottom" => set_length(&mut s.margin_bottom, val, em),
        "margin-left" => set_length(&mut s.margin_left, val, em),
        "padding" => {
            if let Some([t, r, b, l]) = parse_box_shorthand(val, em) {
                s.padding_top = t;
                s.padding_right = r;
                s.padding_bottom = b;
                s.padding_left = l;
            }
        }
        "padding-top" => set_length(&mut s.padding_top, val, em),
        "padding-right" => set_length(&mut s.padding_right, val, em),
        "padding-bottom" => set_length(&mut s.padding_bottom, val, em),
        "padding-left" => set_length(&mut s.padding_left, val, em),
        "border" => {
            let (width, color) = parse_border(val, em);
            if let Some(w) = width {
                s.border_width = w;
            }
            if let Some(c) = color {
                s.border_color = c;
            }
        }
        "border-width" => set_length(&mut s.border_width, val, em),
        "border-color" => {
            if let Some(c) = Color::parse(val) {
                s.border_color = c;
            }
        }
        "border-style" if val == "none" || val == "hidden" => s.border_width = 0.0,
        "border-left" => {
            let (width, color) = parse_border(val, em);
            if let Some(w) = width {
                s.border_left_width = w;
            }
            if let Some(c) = color {
                s.border_left_color = c;
            }
        }
        "border-left-width" => set_length(&mut s.border_left_width, val, em),
        "border-left-color" => {
            if let Some(c) = Color::parse(val) {
                s.border_left_color = c;
            }
        }
        "page-break-before" | "break-before" => {
            s.page_break_before = matches!(val, "always" | "page" | "left" | "right");
        }
        "page-break-after" | "break-after" => {
            s.page_break_after = matches!(val, "always" | "page" | "left" | "right");
            s.page_break_after_avoid = matches!(val, "avoid" | "avoid-page");
        }
        "page-break-inside" | "break-inside" => {
            s.page_break_inside_avoid = matches!(val, "avoid" | "avoid-page");
        }
        _ => {}
    }
}

fn set_length(target: &mut f32, val: &str, em: f32) {
    if val == "auto" {
        *target = 0.0;
    } else if let Some(pt) = parse_length(val, em) {
        *target = pt;
    }
}

/// Parse a CSS length into points. `em` is the font size `em` resolves to.
/// Unitless numbers are read as pixels.
pub fn parse_length(value: &str, em: f32) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    let split = v
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(v.len());
    let (number, unit) = v.split_at(split);
    let n: f32 = number.parse().ok()?;
    let pt = match unit {
        "pt" => n,
        "px" | "" => n * PX_TO_PT,
        "cm" => cm_to_points_f32(n),
        "mm" => cm_to_points_f32(n / 10.0),
        "in" => n * 72.0,
        "pc" => n * 12.0,
        "em" => n * em,
        "rem" => n * DEFAULT_FONT_SIZE,
        _ => return None,
    };
    pt.is_finite().then_some(pt)
}

fn parse_font_size(value: &str, parent: f32) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    let size = match v.as_str() {
        "xx-small" => 7.0,
        "x-small" => 7.5,
        "small" => 10.0,
        "medium" => DEFAULT_FONT_SIZE,
        "large" => 13.5,
        "x-large" => 18.0,
        "xx-large" => 24.0,
        "smaller" => parent * 0.83,
        "larger" => parent * 1.2,
        _ => match v.strip_suffix('%') {
            Some(pct) => parent * pct.parse::<f32>().ok()? / 100.0,
            None => parse_length(&v, parent)?,
        },
    };
    (size > 0.0).then_some(size)
}

fn parse_dimension(value: &str, em: f32) -> Dimension {
    let v = value.trim();
    if v == "auto" || v == "none" {
        return Dimension::Auto;
    }
    if let Some(pct) = v.strip_suffix('%') {
        return pct
            .trim()
            .parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto);
    }
    parse_length(v, em).map_or(Dimension::Auto, Dimension::Pt)
}

/// 1–4 value `margin`/`padding` shorthand. `auto` counts as zero.
fn parse_box_shorthand(value: &str, em: f32) -> Option<[f32; 4]> {
    let parts = value
        .split_whitespace()
        .map(|p| if p == "auto" { Some(0.0) } else { parse_length(p, em) })
        .collect::<Option<Vec<f32>>>()?;
    match parts.as_slice() {
        [all] => Some([*all; 4]),
        [v, h] => Some([*v, *h, *v, *h]),
        [t, h, b] => Some([*t, *h, *b, *h]),
        [t, r, b, l] => Some([*t, *r, *b, *l]),
        _ => None,
    }
}

/// `border` / `border-left` shorthand: `<width> <style> <color>` in any order.
fn parse_border(value: &str, em: f32) -> (Option<f32>, Option<Color>) {
    if matches!(value.trim(), "0" | "none" | "hidden") {
        return (Some(0.0), None);
    }
    let mut width = None;
    let mut color = None;
    let mut styled = false;
    for token in value.split_whitespace() {
        match token {
            "thin" => width = Some(0.75),
            "medium" => width = Some(2.25),
            "thick" => width = Some(3.75),
            "none" | "hidden" => width = Some(0.0),
            "solid" | "dashed" | "dotted" | "double" | "groove" | "ridge" | "inset" | "outset" => {
                styled = true
            }
            t => {
                if let Some(w) = parse_length(t, em) {
                    width = Some(w);
                } else if let Some(c) = Color::parse(t) {
                    color = Some(c);
                }
            }
        }
    }
    if width.is_none() && styled {
        width = Some(2.25);
    }
    (width, color)
}

/// First colour in a `background` shorthand.
fn find_color(value: &str) -> Option<Color> {
    Color::parse(value).or_else(|| value.split_whitespace().find_map(Color::parse))
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (image src, list start, ...)
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }
}

/// The styled body of a document.
#[derive(Debug, Clone)]
pub struct StyledTree {
    /// Computed style of `<body>`; supplies the page background.
    pub body: ComputedStyle,
    pub children: Vec<StyledNode>,
}

/// Cascade `sheet` over `nodes` (the children of `<body>`).
pub fn style_document(nodes: &[DomNode], sheet: &Stylesheet) -> StyledTree {
    let html = ElementNode::new(Tag::Html);
    let body = ElementNode::new(Tag::Body);
    let html_style = resolve_style(&html, &[], None, sheet);
    let body_style = resolve_style(&body, &[&html], Some(&html_style), sheet);
    let mut ancestors = vec![&html, &body];
    let children = build_styled_tree(nodes, &body_style, &mut ancestors, sheet);
    StyledTree {
        body: body_style,
        children,
    }
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
pub fn build_styled_tree<'a>(
    nodes: &'a [DomNode],
    parent_style: &ComputedStyle,
    ancestors: &mut Vec<&'a ElementNode>,
    sheet: &Stylesheet,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => match e.tag {
                Tag::Br => result.push(StyledNode::Text {
                    text: LINE_BREAK.to_string(),
                    style: ComputedStyle::for_text(parent_style),
                }),
                Tag::Input => {
                    if e.attributes.get("type").map(String::as_str) == Some("checkbox") {
                        let mark = if e.has_attribute("checked") { "[x] " } else { "[ ] " };
                        result.push(StyledNode::Text {
                            text: mark.to_string(),
                            style: ComputedStyle::for_text(parent_style),
                        });
                    }
                }
                _ => {
                    let style = resolve_style(e, ancestors, Some(parent_style), sheet);
                    if style.display == Display::None {
                        continue;
                    }
                    ancestors.push(e);
                    let children = build_styled_tree(&e.children, &style, ancestors, sheet);
                    ancestors.pop();
                    result.push(StyledNode::Element {
                        tag: e.tag.clone(),
                        style,
                        children,
                        attrs: e.attributes.clone(),
                    });
                }
            },
            DomNode::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                result.push(StyledNode::Text {
                    text: text.clone(),
                    style: ComputedStyle::for_text(parent_style),
                });
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FontFamilyClass;
    use crate::dom::parse_html;

    fn styled(html: &str, css: &str) -> StyledTree {
        style_document(&parse_html(html), &Stylesheet::parse(css))
    }

    fn element_style(node: &StyledNode) -> &ComputedStyle {
        match node {
            StyledNode::Element { style, .. } => style,
            StyledNode::Text { text, .. } => panic!("Expected element, got text {text:?}"),
        }
    }

    fn children(node: &StyledNode) -> &[StyledNode] {
        match node {
            StyledNode::Element { children, .. } => children,
            StyledNode::Text { .. } => &[],
        }
    }

    #[test]
    fn at_rules_and_comments_are_skipped() {
        let sheet = Stylesheet::parse(
            "/* header */ @page { size: A4; margin: 1cm; }\n@media print { p { color: red; } }\n@import url(x.css);\np { color: blue; } /* tail",
        );
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn unsupported_selectors_are_dropped_individually() {
        let sheet = Stylesheet::parse("a:hover, p > span, h1 { color: red; }");
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn lengths_resolve_to_points() {
        assert_eq!(parse_length("12pt", 10.0), Some(12.0));
        assert_eq!(parse_length("16px", 10.0), Some(12.0));
        assert_eq!(parse_length("1in", 10.0), Some(72.0));
        assert!((parse_length("2.54cm", 10.0).unwrap() - 72.0).abs() < 0.001);
        assert!((parse_length("25.4mm", 10.0).unwrap() - 72.0).abs() < 0.001);
        assert_eq!(parse_length("1.5em", 10.0), Some(15.0));
        assert_eq!(parse_length("0", 10.0), Some(0.0));
        assert_eq!(parse_length("auto", 10.0), None);
        assert_eq!(parse_length("50%", 10.0), None);
    }

    #[test]
    fn colours() {
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("#222222"), Some(Color::rgb8(0x22, 0x22, 0x22)));
        assert_eq!(Color::parse("rgb(255, 0, 0)"), Some(Color::rgb8(0xff, 0, 0)));
        assert_eq!(Color::parse("rgba(0,0,0,0)").map(|c| c.is_transparent()), Some(true));
        assert_eq!(Color::parse("Black"), Some(Color::BLACK));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(find_color("#f5f5f5 url(x.png) no-repeat"), Some(Color::rgb8(0xf5, 0xf5, 0xf5)));
    }

    #[test]
    fn heading_sizes_are_relative_to_body() {
        let doc = styled("<h1>A</h1><h2>B</h2>", "body { font-size: 10pt; }");
        assert_eq!(doc.body.font_size, 10.0);
        assert_eq!(element_style(&doc.children[0]).font_size, 20.0);
        assert_eq!(element_style(&doc.children[1]).font_size, 15.0);
        assert!(element_style(&doc.children[0]).is_bold());
    }

    #[test]
    fn author_rules_override_user_agent() {
        let doc = styled("<h1>A</h1>", "h1 { font-size: 24pt; margin: 12pt 0 8pt 0; }");
        let h1 = element_style(&doc.children[0]);
        assert_eq!(h1.font_size, 24.0);
        assert_eq!(h1.margin_top, 12.0);
        assert_eq!(h1.margin_bottom, 8.0);
    }

    #[test]
    fn specificity_then_source_order() {
        let css = ".note p { color: #00ff00; } p { color: #ff0000; } p { color: #0000ff; }";
        let doc = styled("<div class=\"note\"><p>x</p></div><p>y</p>", css);
        let inside = element_style(&children(&doc.children[0])[0]);
        assert_eq!(inside.color, Color::rgb8(0, 0xff, 0));
        assert_eq!(element_style(&doc.children[1]).color, Color::rgb8(0, 0, 0xff));
    }

    #[test]
    fn descendant_selector_needs_ancestor() {
        let css = "code { font-family: monospace; padding: 2pt 4pt; } pre code { padding: 0; }";
        let doc = styled("<pre><code>a</code></pre><p><code>b</code></p>", css);
        let in_pre = element_style(&children(&doc.children[0])[0]);
        let in_p = element_style(&children(&doc.children[1])[0]);
        assert_eq!(in_pre.padding_left, 0.0);
        assert_eq!(in_p.padding_left, 4.0);
        assert_eq!(in_p.font_family, FontFamily::Courier);
    }

    #[test]
    fn inline_style_wins() {
        let doc = styled(
            "<table><tr><th style=\"text-align: center\">A</th></tr></table>",
            "th, td { text-align: left; }",
        );
        let tr = &children(&doc.children[0])[0];
        assert_eq!(element_style(&children(tr)[0]).text_align, TextAlign::Center);
    }

    #[test]
    fn text_inherits_color_and_family() {
        let doc = styled("<p>x</p>", "body { color: #222222; font-family: \"Times New Roman\", Times, serif; }");
        let text = &children(&doc.children[0])[0];
        assert_eq!(text.style().color, Color::rgb8(0x22, 0x22, 0x22));
        assert_eq!(text.style().font_family, FontFamily::Times);
        assert_eq!(text.style().margin_top, 0.0);
    }

    #[test]
    fn config_font_stacks_map_to_builtin_families() {
        assert_eq!(
            FontFamily::from_stack(FontFamilyClass::SansSerif.font_stack()),
            Some(FontFamily::Helvetica)
        );
        assert_eq!(
            FontFamily::from_stack(FontFamilyClass::Serif.font_stack()),
            Some(FontFamily::Times)
        );
        assert_eq!(
            FontFamily::from_stack(FontFamilyClass::Monospace.font_stack()),
            Some(FontFamily::Courier)
        );
    }

    #[test]
    fn shorthands() {
        let doc = styled(
            "<div>x</div><blockquote>q</blockquote>",
            "div { margin: 0 auto 24px auto; padding: 2pt 12pt; border: 1px solid #e0e0e0; }\nblockquote { border-left: 4px solid #e0e0e0; }",
        );
        let div = element_style(&doc.children[0]);
        assert_eq!(
            [div.margin_top, div.margin_right, div.margin_bottom, div.margin_left],
            [0.0, 0.0, 18.0, 0.0]
        );
        assert_eq!([div.padding_top, div.padding_right], [2.0, 12.0]);
        assert_eq!(div.border_width, 0.75);
        let quote = element_style(&doc.children[1]);
        assert_eq!(quote.border_left_width, 3.0);
        assert_eq!(quote.border_width, 0.0);
        assert_eq!(quote.border_left_color, Color::rgb8(0xe0, 0xe0, 0xe0));
    }

    #[test]
    fn page_break_hints() {
        let doc = styled(
            "<h2>x</h2><table><thead><tr><th>a</th></tr></thead></table>",
            "h2 { page-break-after: avoid; } thead { display: table-header-group; } tr, td, th { page-break-inside: avoid; }",
        );
        assert!(element_style(&doc.children[0]).page_break_after_avoid);
        let thead = &children(&doc.children[1])[0];
        assert_eq!(element_style(thead).display, Display::TableHeaderGroup);
        assert!(element_style(&children(thead)[0]).page_break_inside_avoid);
    }

    #[test]
    fn checkboxes_and_breaks_become_text() {
        let doc = styled(
            "<ul><li><input type=\"checkbox\" checked=\"\" disabled=\"\"/>\ndone</li><li><input type=\"checkbox\" disabled=\"\"/>\ntodo<br />more</li></ul>",
            "",
        );
        let items = children(&doc.children[0]);
        match &children(&items[0])[0] {
            StyledNode::Text { text, .. } => assert_eq!(text, "[x] "),
            other => panic!("unexpected {other:?}"),
        }
        match &children(&items[1])[0] {
            StyledNode::Text { text, .. } => assert_eq!(text, "[ ] "),
            other => panic!("unexpected {other:?}"),
        }
        assert!(children(&items[1])
            .iter()
            .any(|n| matches!(n, StyledNode::Text { text, .. } if text.contains(LINE_BREAK))));
    }

    #[test]
    fn display_none_is_dropped() {
        let doc = styled("<p>a</p><div class=\"hidden\">b</div>", ".hidden { display: none; }");
        assert_eq!(doc.children.len(), 1);
    }
}
