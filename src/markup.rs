//! Markup parser adapter – runs pulldown-cmark with the fixed extension set
//! and serialises the event stream to HTML.
//!
//! The extension set is not configurable: tables, footnotes, task lists,
//! strikethrough, smart punctuation, and bare-URL auto-links. Malformed
//! markup never errors; it degrades to literal text per CommonMark rules.

use std::sync::OnceLock;

use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream};
use regex_lite::Regex;

/// The extension set used for every document.
pub fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options
}

/// Parse markdown text into an event stream (the node tree in document
/// order), with bare URLs already turned into links.
///
/// Adjacent text events are merged first: smart punctuation splits text at
/// every quote, which would otherwise cut URLs short.
pub fn parse(text: &str) -> Vec<Event<'_>> {
    autolink(TextMergeStream::new(Parser::new_ext(text, markdown_options())))
}

/// Serialise an event stream to an HTML fragment.
pub fn serialize<'a>(events: impl IntoIterator<Item = Event<'a>>) -> String {
    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

/// Parse then serialise.
pub fn render_html(text: &str) -> String {
    serialize(parse(text))
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:https?://|www\.)[^\s<>()\[\]]+").expect("static URL pattern is valid")
    })
}

/// Wrap bare URLs in text events with link events. Text inside existing
/// links, images and code blocks is left alone.
fn autolink<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut opaque_depth = 0usize;

    for event in events {
        match &event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                opaque_depth += 1;
            }
            Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                opaque_depth = opaque_depth.saturating_sub(1);
            }
            Event::Text(text) if opaque_depth == 0 => {
                if let Some(linked) = link_urls(text) {
                    out.extend(linked);
                    continue;
                }
            }
            _ => {}
        }
        out.push(event);
    }
    out
}

/// Split `text` around bare URLs. Returns `None` when there is nothing to link.
fn link_urls<'b>(text: &str) -> Option<Vec<Event<'b>>> {
    let mut events = Vec::new();
    let mut last = 0;

    for m in url_regex().find_iter(text) {
        // Sentence punctuation directly after a URL is not part of it.
        let url = m
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"', '\u{2019}', '\u{201D}']);
        if url.is_empty() || url.ends_with("://") {
            continue;
        }
        let start = m.start();
        let end = start + url.len();

        if start > last {
            events.push(Event::Text(CowStr::from(text[last..start].to_string())));
        }
        let dest = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(dest),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        events.push(Event::Text(CowStr::from(url.to_string())));
        events.push(Event::End(TagEnd::Link));
        last = end;
    }

    if events.is_empty() {
        return None;
    }
    if last < text.len() {
        events.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
    Some(events)
}
