//! Style sheet builder – turns a [`StyleConfig`] into the CSS block that
//! accompanies a compiled document.
//!
//! Both targets share typography (font stack, base size, heading ratios);
//! they differ in chrome. The preview follows the theme and pads the page on
//! screen; the export forces a white page with dark-gray text and declares
//! the physical page box plus print pagination hints.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::config::{Rgb, StyleConfig, Theme};

/// Where a document is going to be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderTarget {
    /// Interactive, theme-aware preview.
    Preview,
    /// Printed / exported page.
    Export,
}

/// Heading sizes relative to the base font size.
pub const H1_SCALE: f32 = 2.0;
pub const H2_SCALE: f32 = 1.6;
pub const H3_SCALE: f32 = 1.3;

/// Monospace stack for code regardless of the body font.
const CODE_FONT_STACK: &str = "\"Courier New\", Courier, monospace";

/// Maximum content width of the on-screen preview column.
const PREVIEW_MAX_WIDTH_PX: u32 = 900;

/// Theme-dependent colours.
#[derive(Debug, Clone, Copy)]
struct Palette {
    background: &'static str,
    code_background: &'static str,
    border: &'static str,
    quote_text: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                background: "#111111",
                code_background: "#1e1e1e",
                border: "#333333",
                quote_text: "#cccccc",
            },
            Theme::Light => Self::paper(),
        }
    }

    /// A printed page has no theme.
    fn paper() -> Self {
        Self {
            background: "#FFFFFF",
            code_background: "#f5f5f5",
            border: "#e0e0e0",
            quote_text: "#555555",
        }
    }
}

/// Build the style block for `config` rendered to `target`.
pub fn build_style(config: &StyleConfig, target: RenderTarget) -> String {
    match target {
        RenderTarget::Preview => preview_css(config),
        RenderTarget::Export => export_css(config),
    }
}

/// Format a CSS number with at most two decimals and no trailing zeros.
pub(crate) fn css_num(value: f32) -> String {
    let rounded = (f64::from(value) * 100.0).round() / 100.0;
    let s = format!("{rounded:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn margins_cm(config: &StyleConfig) -> String {
    let m = &config.margins_cm;
    format!(
        "{}cm {}cm {}cm {}cm",
        css_num(m.top),
        css_num(m.right),
        css_num(m.bottom),
        css_num(m.left)
    )
}

/// Rules identical for both targets. Given the same config the two targets
/// therefore resolve the same font stack, base size and heading ratios.
fn typography(out: &mut String, config: &StyleConfig, heading_color: &str) {
    let base = config.font_size_pt;
    let _ = write!(
        out,
        "h1,h2,h3,h4,h5,h6 {{ color: {heading_color}; line-height: 1.25; font-weight: bold; }}\n\
         h1 {{ font-size: {}pt; }}\n\
         h2 {{ font-size: {}pt; }}\n\
         h3 {{ font-size: {}pt; }}\n",
        css_num(base * H1_SCALE),
        css_num(base * H2_SCALE),
        css_num(base * H3_SCALE),
    );
}

fn body_rule(out: &mut String, config: &StyleConfig, background: &str, color: &str) {
    let _ = write!(
        out,
        "body {{\n  background: {background};\n  color: {color};\n  font-family: {};\n  font-size: {}pt;\n  line-height: 1.6;\n",
        config.font_family.font_stack(),
        css_num(config.font_size_pt),
    );
}

fn preview_css(config: &StyleConfig) -> String {
    let palette = Palette::for_theme(config.theme);
    let text = config.text_color.to_hex();
    let mut css = String::with_capacity(2048);

    body_rule(&mut css, config, palette.background, &text);
    let _ = write!(
        css,
        "  padding: 16px;\n  margin: {};\n}}\n\
         .section {{ max-width: {PREVIEW_MAX_WIDTH_PX}px; margin: 0 auto 24px auto; }}\n",
        margins_cm(config)
    );
    typography(&mut css, config, &text);
    let _ = write!(
        css,
        "h1,h2,h3,h4,h5,h6 {{ margin: 1.2em 0 0.6em 0; }}\n\
         p, li {{ margin: 0.5em 0; }}\n\
         ul, ol {{ padding-left: 1.2em; }}\n\
         hr {{ border: 0; height: 1px; background: {border}; margin: 24px 0; }}\n\
         blockquote {{ border-left: 4px solid {border}; margin: 1em 0; padding: 0.2em 1em; color: {quote}; }}\n\
         code {{ background: {code_bg}; padding: 0.2em 0.4em; font-family: {CODE_FONT_STACK}; }}\n\
         pre {{ background: {code_bg}; white-space: pre-wrap; }}\n\
         pre code {{ display: block; padding: 12px; }}\n\
         table {{ border-collapse: collapse; width: 100%; margin: 12px 0; }}\n\
         th, td {{ border: 1px solid {border}; padding: 8px; text-align: left; }}\n\
         img, svg {{ max-width: 100%; height: auto; }}\n\
         .footnote-definition {{ font-size: 0.85em; }}\n",
        border = palette.border,
        quote = palette.quote_text,
        code_bg = palette.code_background,
    );
    css
}

fn export_css(config: &StyleConfig) -> String {
    let palette = Palette::paper();
    let text = Rgb::DARK_GRAY.to_hex();
    let mut css = String::with_capacity(2048);

    let _ = writeln!(
        css,
        "@page {{ size: {}; margin: {}; }}",
        config.page_size.css_name(),
        margins_cm(config)
    );
    body_rule(&mut css, config, palette.background, &text);
    css.push_str("  margin: 0;\n  padding: 0;\n}\n.section { width: 100%; margin: 0; padding: 0; }\n");
    typography(&mut css, config, &text);
    let _ = write!(
        css,
        "h1,h2,h3,h4,h5,h6 {{ margin: 12pt 0 8pt 0; page-break-after: avoid; }}\n\
         p, li {{ margin: 6pt 0; orphans: 2; widows: 2; }}\n\
         ul, ol {{ padding-left: 18pt; margin: 6pt 0; }}\n\
         hr {{ border: 0; height: 1px; background: {border}; margin: 12pt 0; }}\n\
         blockquote {{ border-left: 4px solid {border}; margin: 8pt 0; padding: 2pt 12pt; color: {quote}; }}\n\
         code {{ background: {code_bg}; padding: 2pt 4pt; font-family: {CODE_FONT_STACK}; white-space: pre-wrap; }}\n\
         pre {{ background: {code_bg}; padding: 8pt; white-space: pre-wrap; }}\n\
         pre code {{ padding: 0; }}\n\
         table {{ border-collapse: collapse; width: 100%; margin: 8pt 0; page-break-inside: auto; }}\n\
         thead {{ display: table-header-group; }}\n\
         tr, td, th {{ page-break-inside: avoid; }}\n\
         th, td {{ border: 1px solid {border}; padding: 6pt; text-align: left; vertical-align: top; }}\n\
         img, svg {{ max-width: 100%; height: auto; page-break-inside: avoid; }}\n\
         .footnote-definition {{ font-size: 0.85em; }}\n",
        border = palette.border,
        quote = palette.quote_text,
        code_bg = palette.code_background,
    );
    css
}
