//! HTML parser – converts the markup emitted by the markdown renderer into a
//! simple DOM tree.
//!
//! We support the subset pulldown-cmark produces:
//! - Blocks: p, h1-h6, ul, ol, li, blockquote, pre, hr, table, thead, tbody,
//!   tr, th, td, div (footnote definitions), section
//! - Inline: a, strong/b, em/i, del/s, code, sup, span, br, img, input
//! - `<style>` blocks when a whole document is parsed
//! - Styling via `class` and `style` attributes

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Style,
    Body,
    Section,
    Div,
    P,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Ul,
    Ol,
    Li,
    Blockquote,
    Pre,
    Hr,
    Table,
    Thead,
    Tbody,
    Tr,
    Td,
    Th,
    A,
    Strong,
    Em,
    Del,
    Code,
    Sup,
    Span,
    Br,
    Img,
    Input,
    /// Catch-all for unknown tags – kept so their text still renders.
    Unknown(String),
}

impl Tag {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "style" => Tag::Style,
            "body" => Tag::Body,
            "section" => Tag::Section,
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "h5" => Tag::H5,
            "h6" => Tag::H6,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "blockquote" => Tag::Blockquote,
            "pre" => Tag::Pre,
            "hr" => Tag::Hr,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "a" => Tag::A,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "del" | "s" | "strike" => Tag::Del,
            "code" => Tag::Code,
            "sup" => Tag::Sup,
            "span" => Tag::Span,
            "br" => Tag::Br,
            "img" => Tag::Img,
            "input" => Tag::Input,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Lower-case name used for selector matching.
    pub fn name(&self) -> &str {
        match self {
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Style => "style",
            Tag::Body => "body",
            Tag::Section => "section",
            Tag::Div => "div",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::H5 => "h5",
            Tag::H6 => "h6",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Blockquote => "blockquote",
            Tag::Pre => "pre",
            Tag::Hr => "hr",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::A => "a",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::Del => "del",
            Tag::Code => "code",
            Tag::Sup => "sup",
            Tag::Span => "span",
            Tag::Br => "br",
            Tag::Img => "img",
            Tag::Input => "input",
            Tag::Unknown(name) => name,
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4 | Tag::H5 | Tag::H6
        )
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Tag::A
                | Tag::Strong
                | Tag::Em
                | Tag::Del
                | Tag::Code
                | Tag::Sup
                | Tag::Span
                | Tag::Br
                | Tag::Img
                | Tag::Input
        )
    }

    /// Elements that never have children or a closing tag.
    pub fn is_void(&self) -> bool {
        match self {
            Tag::Br | Tag::Hr | Tag::Img | Tag::Input => true,
            Tag::Unknown(name) => matches!(name.as_str(), "meta" | "link" | "wbr"),
            _ => false,
        }
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser – simple recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
///
/// A hand-written parser is enough for the well-formed subset the markdown
/// renderer emits; stray closing tags and unclosed elements are tolerated.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes(false)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Elements currently open, innermost last.
    open: Vec<Tag>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            open: Vec::new(),
        }
    }

    fn parse_nodes(&mut self, preformatted: bool) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            if !preformatted {
                self.skip_formatting_whitespace();
            }
            if self.eof() {
                break;
            }
            if self.starts_with("</") {
                // Closing tags for an open element end this run of children;
                // anything else is stray and dropped.
                if self.open.contains(&Tag::parse(&self.peek_closing_name())) {
                    break;
                }
                self.skip_past('>');
                continue;
            }
            if let Some(node) = self.parse_node(preformatted) {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self, preformatted: bool) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Skip doctype / processing instructions
            self.skip_past('>');
            return None;
        }
        if self.starts_with("<") && self.peek_is_tag_start() {
            Some(self.parse_element(preformatted))
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A lone '<' that does not open a tag is literal text.
        if self.starts_with("<") {
            self.advance(1);
        }
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        let text = &self.input[start..self.pos];
        DomNode::Text(decode_entities(text))
    }

    fn parse_element(&mut self, preformatted: bool) -> DomNode {
        // Consume '<'
        self.advance(1);
        let tag_name = self.parse_tag_name();
        let tag = Tag::parse(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        // Parse attributes
        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute();
            if key.is_empty() {
                // Garbage inside the tag; skip a character to make progress.
                self.advance(1);
                continue;
            }
            elem.attributes.insert(key.to_ascii_lowercase(), value);
        }

        if self.starts_with("/>") {
            self.advance(2);
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if tag.is_void() {
            return DomNode::Element(elem);
        }

        if tag == Tag::Style {
            let end = self.input[self.pos..]
                .find("</style")
                .map(|i| self.pos + i)
                .unwrap_or(self.input.len());
            elem.children = vec![DomNode::Text(self.input[self.pos..end].to_string())];
            self.pos = end;
        } else {
            self.open.push(tag.clone());
            elem.children = self.parse_nodes(preformatted || tag == Tag::Pre);
            self.open.pop();
        }

        // Consume the closing tag only when it is ours; otherwise leave it
        // for the ancestor it belongs to.
        if self.starts_with("</") && Tag::parse(&self.peek_closing_name()) == tag {
            self.skip_past('>');
        }

        DomNode::Element(elem)
    }

    /// Name of the closing tag at the cursor, without consuming it.
    fn peek_closing_name(&self) -> String {
        self.input[self.pos..]
            .trim_start_matches("</")
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect()
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_tag_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1); // skip '='
        self.skip_whitespace();
        let value = self.parse_attr_value();
        (key, value)
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance(1);
                }
                let val = self.input[start..self.pos].to_string();
                if !self.eof() {
                    self.advance(1);
                }
                return decode_entities(&val);
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' || c == '/' {
                break;
            }
            self.advance(1);
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn peek_is_tag_start(&self) -> bool {
        let mut chars = self.input[self.pos..].chars().skip(1);
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?')
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    /// Skip whitespace-only runs that sit next to block boundaries (source
    /// formatting). Whitespace between two inline elements is content, so it
    /// is kept.
    fn skip_formatting_whitespace(&mut self) {
        let saved = self.pos;
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
        if self.pos == saved {
            return;
        }
        let boundary = self.eof()
            || self.starts_with("</")
            || self.starts_with("<!")
            || (self.starts_with("<") && !self.peek_open_tag().is_inline());
        if !boundary {
            self.pos = saved;
        }
    }

    fn peek_open_tag(&self) -> Tag {
        let name: String = self.input[self.pos..]
            .trim_start_matches('<')
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        Tag::parse(&name)
    }

    fn skip_comment(&mut self) {
        self.advance(4); // skip <!--
        while !self.eof() && !self.starts_with("-->") {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(3);
        }
    }

    fn skip_past(&mut self, c: char) {
        while !self.eof() && self.current_char() != c {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(1);
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{00A0}")
        .replace("&amp;", "&")
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            // Recurse into <html>
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes
        .iter()
        .filter(|n| !matches!(n, DomNode::Element(e) if e.tag == Tag::Head || e.tag == Tag::Style))
        .cloned()
        .collect()
}

/// Concatenate the contents of every `<style>` element, in document order.
pub fn collect_styles(nodes: &[DomNode]) -> String {
    let mut css = String::new();
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Style {
                css.push_str(&e.text_content());
                css.push('\n');
            } else {
                css.push_str(&collect_styles(&e.children));
            }
        }
    }
    css
}

/// Text of the first heading, used as the document title.
pub fn first_heading_text(nodes: &[DomNode]) -> Option<String> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag.is_heading() {
                let text = e.text_content().split_whitespace().collect::<Vec<_>>().join(" ");
                if !text.is_empty() {
                    return Some(text);
                }
            }
            if let Some(found) = first_heading_text(&e.children) {
                return Some(found);
            }
        }
    }
    None
}
