//! Document compiler – markdown text + style configuration → a
//! self-contained [`StyledDocument`] for one render target.

use serde::Serialize;

use crate::config::StyleConfig;
use crate::markup;
use crate::stylesheet::build_style;
pub use crate::stylesheet::RenderTarget;

/// Compiled markup body plus its style block, tagged with the target it was
/// built for. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StyledDocument {
    markup_body: String,
    style_block: String,
    target: RenderTarget,
}

impl StyledDocument {
    pub fn markup_body(&self) -> &str {
        &self.markup_body
    }

    pub fn style_block(&self) -> &str {
        &self.style_block
    }

    pub fn target(&self) -> RenderTarget {
        self.target
    }

    pub fn is_empty(&self) -> bool {
        self.markup_body.trim().is_empty()
    }

    /// The full HTML document. The style block always precedes the body so a
    /// renderer can apply it in a single pass.
    pub fn to_html(&self) -> String {
        let mut html = String::with_capacity(self.markup_body.len() + self.style_block.len() + 160);
        html.push_str("<!DOCTYPE html><html><head><meta charset='utf-8' /><style>");
        html.push_str(&self.style_block);
        html.push_str("</style></head><body><section class='section'>");
        html.push_str(&self.markup_body);
        html.push_str("</section></body></html>");
        html
    }
}

/// Compile `raw_text` for `target`. Empty text yields an empty body, never an
/// error.
pub fn compile(raw_text: &str, config: &StyleConfig, target: RenderTarget) -> StyledDocument {
    let events = markup::parse(raw_text);
    let markup_body = markup::serialize(events);
    let style_block = build_style(config, target);
    log::debug!(
        "Compiled {:?} document: {} bytes of markup, {} bytes of style",
        target,
        markup_body.len(),
        style_block.len()
    );
    StyledDocument {
        markup_body,
        style_block,
        target,
    }
}
