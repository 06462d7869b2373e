//! Font families and text measurement.
//!
//! The writer renders with the PDF base-14 faces, so widths come from their
//! published AFM advance tables.

use serde::{Deserialize, Serialize};

/// Builtin PDF font families a CSS font stack maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FontFamily {
    #[default]
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Map a CSS `font-family` stack to the first family we can render.
    pub fn from_stack(stack: &str) -> Option<Self> {
        stack.split(',').find_map(|entry| {
            let name = entry
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_ascii_lowercase();
            match name.as_str() {
                "monospace" | "courier" | "courier new" | "consolas" | "menlo" | "monaco"
                | "sfmono-regular" | "liberation mono" | "dejavu sans mono" => {
                    Some(FontFamily::Courier)
                }
                "serif" | "times" | "times new roman" | "georgia" | "cambria" | "garamond"
                | "liberation serif" => Some(FontFamily::Times),
                "sans-serif" | "helvetica" | "arial" | "-apple-system" | "blinkmacsystemfont"
                | "segoe ui" | "roboto" | "noto sans" | "liberation sans" | "system-ui" => {
                    Some(FontFamily::Helvetica)
                }
                _ => None,
            }
        })
    }

    fn metrics(self, bold: bool, italic: bool) -> &'static StandardMetrics {
        match (self, bold, italic) {
            (FontFamily::Helvetica, false, _) => &HELVETICA,
            (FontFamily::Helvetica, true, _) => &HELVETICA_BOLD,
            (FontFamily::Times, false, false) => &TIMES_ROMAN,
            (FontFamily::Times, true, false) => &TIMES_BOLD,
            (FontFamily::Times, false, true) => &TIMES_ITALIC,
            (FontFamily::Times, true, true) => &TIMES_BOLD_ITALIC,
            (FontFamily::Courier, _, _) => &COURIER,
        }
    }
}

/// Encode a character the way the builtin fonts' WinAnsiEncoding sees it.
/// Characters outside the code page become `?`.
pub fn winansi_byte(c: char) -> u8 {
    match c {
        '\u{20AC}' => 0x80, // euro
        '\u{201A}' => 0x82, // single low-9 quote
        '\u{201E}' => 0x84, // double low-9 quote
        '\u{2026}' => 0x85, // ellipsis
        '\u{2018}' => 0x91, // left single quote
        '\u{2019}' => 0x92, // right single quote
        '\u{201C}' => 0x93, // left double quote
        '\u{201D}' => 0x94, // right double quote
        '\u{2022}' => 0x95, // bullet
        '\u{2013}' => 0x96, // en dash
        '\u{2014}' => 0x97, // em dash
        '\u{2122}' => 0x99, // trademark
        '\u{00A0}' => 0x20, // non-breaking space
        c if (c as u32) < 256 => c as u8,
        _ => b'?',
    }
}

/// AFM advance widths of one Standard-14 face, in 1/1000 em.
struct StandardMetrics {
    /// Printable ASCII, `' '` through `'~'`.
    ascii: [u16; 95],
    ascender: u16,
    /// Set for monospaced faces.
    fixed_pitch: Option<u16>,
}

/// Latin-1 letters 0xC0..=0xFF folded to an ASCII letter of the same width.
/// `0` marks glyphs with no such twin. Accented dotless `i` matches `t`.
const LATIN1_FOLD: &[u8; 64] =
    b"AAAAAA\0CEEEEIIIIDNOOOOO+OUUUUYP\0aaaaaa\0ceeeettttonooooo+\0uuuuypy";

/// Upper bound for glyphs with no table entry. No Standard-14 Latin glyph
/// is wider than an em except Helvetica's `@`, which is in the table.
const FULL_EM: u16 = 1000;

impl StandardMetrics {
    /// Advance of one WinAnsi byte in 1/1000 em. Typographic punctuation
    /// uses the widest value across the Times and Helvetica faces.
    fn advance(&self, byte: u8) -> u16 {
        if let Some(width) = self.fixed_pitch {
            return width;
        }
        match byte {
            0x20..=0x7E => self.ascii[usize::from(byte - 0x20)],
            0x91 | 0x92 | 0x82 => 333,
            0x93 | 0x94 | 0x84 | 0x80 | 0x96 => self.ascii[usize::from(b'0' - 0x20)].max(556),
            0x95 => 350,
            0xC0..=0xFF => match LATIN1_FOLD[usize::from(byte - 0xC0)] {
                0 => FULL_EM,
                base => self.ascii[usize::from(base - 0x20)],
            },
            0x00..=0x1F => self.ascii[0],
            _ => FULL_EM,
        }
    }
}

#[rustfmt::skip]
static HELVETICA: StandardMetrics = StandardMetrics {
    ascii: [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
        1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
        667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
        333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
        556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
    ],
    ascender: 718,
    fixed_pitch: None,
};

#[rustfmt::skip]
static HELVETICA_BOLD: StandardMetrics = StandardMetrics {
    ascii: [
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
        975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
        667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
        333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
        611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
    ],
    ascender: 718,
    fixed_pitch: None,
};

#[rustfmt::skip]
static TIMES_ROMAN: StandardMetrics = StandardMetrics {
    ascii: [
        250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
        921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
        556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
        333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
        500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
    ],
    ascender: 683,
    fixed_pitch: None,
};

#[rustfmt::skip]
static TIMES_BOLD: StandardMetrics = StandardMetrics {
    ascii: [
        250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
        930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
        611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
        333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
        556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
    ],
    ascender: 683,
    fixed_pitch: None,
};

#[rustfmt::skip]
static TIMES_ITALIC: StandardMetrics = StandardMetrics {
    ascii: [
        250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500,
        920, 611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
        611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389, 278, 389, 422, 500,
        333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500,
        500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541,
    ],
    ascender: 683,
    fixed_pitch: None,
};

#[rustfmt::skip]
static TIMES_BOLD_ITALIC: StandardMetrics = StandardMetrics {
    ascii: [
        250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278,
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
        832, 667, 667, 667, 722, 667, 667, 722, 778, 389, 500, 667, 611, 889, 722, 722,
        611, 722, 667, 556, 611, 722, 667, 889, 667, 611, 611, 333, 278, 333, 570, 500,
        333, 500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500, 278, 778, 556, 500,
        500, 500, 389, 389, 278, 556, 444, 667, 500, 444, 389, 348, 220, 348, 570,
    ],
    ascender: 683,
    fixed_pitch: None,
};

/// Every Courier glyph is 600 units wide.
static COURIER: StandardMetrics = StandardMetrics {
    ascii: [600; 95],
    ascender: 629,
    fixed_pitch: Some(600),
};

/// Measures text set in the builtin PDF faces the renderer draws with.
#[derive(Debug, Default, Clone, Copy)]
pub struct FontManager;

impl FontManager {
    pub fn new() -> Self {
        Self
    }

    /// Width of `text` in points, glyph by glyph, as the renderer will
    /// encode it.
    pub fn measure_text_width(
        &self,
        text: &str,
        font_size: f32,
        bold: bool,
        italic: bool,
        family: FontFamily,
    ) -> f32 {
        let metrics = family.metrics(bold, italic);
        let units: u32 = text
            .chars()
            .map(|c| u32::from(metrics.advance(winansi_byte(c))))
            .sum();
        units as f32 * font_size / 1000.0
    }

    /// Distance from the top of a line box to the baseline, in points.
    pub fn ascender_pt(&self, font_size: f32, bold: bool, italic: bool, family: FontFamily) -> f32 {
        f32::from(family.metrics(bold, italic).ascender) * font_size / 1000.0
    }
}

/// Text measurement parameters shared by the wrapping helpers.
#[derive(Clone, Copy)]
pub struct TextMetrics<'a> {
    pub fonts: &'a FontManager,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub family: FontFamily,
}

impl TextMetrics<'_> {
    pub fn width(&self, text: &str) -> f32 {
        self.fonts
            .measure_text_width(text, self.font_size, self.bold, self.italic, self.family)
    }
}

/// Word-wrap `text` to `max_width` points. Runs of whitespace collapse to one
/// space; `\n` forces a break. Words wider than a line are split.
pub fn wrap_text(text: &str, max_width: f32, metrics: TextMetrics<'_>) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            if metrics.width(&candidate) <= max_width || max_width <= 0.0 {
                current_line = candidate;
                continue;
            }
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            if metrics.width(word) > max_width {
                let mut pieces = break_word(word, max_width, metrics);
                current_line = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            } else {
                current_line = word.to_string();
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Wrap preformatted text: every source line is kept, with its indentation,
/// and overlong lines break at the last space that fits (or mid-word).
pub fn wrap_preformatted(text: &str, max_width: f32, metrics: TextMetrics<'_>) -> Vec<String> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let mut lines = Vec::new();
    for source in text.split('\n') {
        let mut rest = source.trim_end_matches('\r').replace('\t', "    ");
        while metrics.width(&rest) > max_width && max_width > 0.0 {
            let fit = fitting_prefix(&rest, max_width, metrics);
            let cut = rest[..fit]
                .rfind(' ')
                .filter(|&i| i > 0)
                .map(|i| i + 1)
                .unwrap_or(fit);
            lines.push(rest[..cut].trim_end().to_string());
            rest = rest[cut..].to_string();
        }
        lines.push(rest);
    }
    lines
}

/// Split a single word into chunks no wider than `max_width`.
fn break_word(word: &str, max_width: f32, metrics: TextMetrics<'_>) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = word;
    while !rest.is_empty() {
        let fit = fitting_prefix(rest, max_width, metrics);
        pieces.push(rest[..fit].to_string());
        rest = &rest[fit..];
    }
    pieces
}

/// Byte length of the longest prefix of `text` that fits, at least one char.
fn fitting_prefix(text: &str, max_width: f32, metrics: TextMetrics<'_>) -> usize {
    let mut end = 0;
    for (i, ch) in text.char_indices() {
        let next = i + ch.len_utf8();
        if end > 0 && metrics.width(&text[..next]) > max_width {
            break;
        }
        end = next;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(fonts: &FontManager, family: FontFamily) -> TextMetrics<'_> {
        TextMetrics {
            fonts,
            font_size: 10.0,
            bold: false,
            italic: false,
            family,
        }
    }

    #[test]
    fn per_glyph_text_width() {
        let mgr = FontManager::default();
        let w = mgr.measure_text_width("Hello", 16.0, false, false, FontFamily::Helvetica);
        // H 722 + e 556 + l 222 + l 222 + o 556 = 2278 units
        assert!((w - 36.448).abs() < 0.01, "got {w}");
        let wide = mgr.measure_text_width("WM", 10.0, false, false, FontFamily::Helvetica);
        assert!((wide - 17.77).abs() < 0.01, "got {wide}");
        let mono = mgr.measure_text_width("Hello", 10.0, true, false, FontFamily::Courier);
        assert!((mono - 30.0).abs() < 0.01);
    }

    #[test]
    fn bold_and_italic_faces_differ() {
        let mgr = FontManager::new();
        let roman = mgr.measure_text_width("Mm", 10.0, false, false, FontFamily::Times);
        let bold = mgr.measure_text_width("Mm", 10.0, true, false, FontFamily::Times);
        let italic = mgr.measure_text_width("Mm", 10.0, false, true, FontFamily::Times);
        assert!((roman - 16.67).abs() < 0.01);
        assert!((bold - 17.77).abs() < 0.01);
        assert!((italic - 15.55).abs() < 0.01);
    }

    #[test]
    fn accents_and_punctuation_are_measured() {
        let mgr = FontManager::new();
        let plain = mgr.measure_text_width("Eclair", 10.0, false, false, FontFamily::Helvetica);
        let accented = mgr.measure_text_width("\u{c9}clair", 10.0, false, false, FontFamily::Helvetica);
        assert_eq!(plain, accented);
        // Outside WinAnsi: drawn as '?'.
        let cjk = mgr.measure_text_width("\u{4e2d}", 10.0, false, false, FontFamily::Helvetica);
        assert!((cjk - 5.56).abs() < 0.01);
        let dash = mgr.measure_text_width("\u{2014}", 10.0, false, false, FontFamily::Helvetica);
        assert_eq!(dash, 10.0);
    }

    #[test]
    fn winansi_mapping() {
        assert_eq!(winansi_byte('A'), b'A');
        assert_eq!(winansi_byte('\u{e9}'), 0xE9);
        assert_eq!(winansi_byte('\u{2019}'), 0x92);
        assert_eq!(winansi_byte('\u{00A0}'), b' ');
        assert_eq!(winansi_byte('\u{1F600}'), b'?');
    }

    #[test]
    fn ascender_follows_face() {
        let mgr = FontManager::new();
        assert!((mgr.ascender_pt(10.0, false, false, FontFamily::Helvetica) - 7.18).abs() < 0.001);
        assert!((mgr.ascender_pt(10.0, false, false, FontFamily::Courier) - 6.29).abs() < 0.001);
    }

    #[test]
    fn word_wrap_basic() {
        let mgr = FontManager::default();
        let lines = wrap_text("Hello world foo bar", 60.0, metrics(&mgr, FontFamily::Helvetica));
        assert!(lines.len() >= 2, "Expected wrapping, got {:?}", lines);
        assert!(lines.iter().all(|l| !l.starts_with(' ')));
    }

    #[test]
    fn wide_glyphs_wrap_within_width() {
        let mgr = FontManager::default();
        let m = metrics(&mgr, FontFamily::Helvetica);
        let lines = wrap_text(&"WWWWW MMMMM ".repeat(10), 100.0, m);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(m.width(line) <= 100.0, "{line:?} is {} pt", m.width(line));
        }
    }

    #[test]
    fn long_words_are_split() {
        let mgr = FontManager::default();
        // Courier at 10 pt: 6 pt per char, 3 chars per 20 pt line
        let lines = wrap_text("abcdefghij", 20.0, metrics(&mgr, FontFamily::Courier));
        assert_eq!(lines, vec!["abc", "def", "ghi", "j"]);
    }

    #[test]
    fn preformatted_keeps_indentation_and_blank_lines() {
        let mgr = FontManager::default();
        let lines = wrap_preformatted(
            "fn main() {\n\n    let x = 1;\n}\n",
            1000.0,
            metrics(&mgr, FontFamily::Courier),
        );
        assert_eq!(lines, vec!["fn main() {", "", "    let x = 1;", "}"]);
    }

    #[test]
    fn preformatted_wraps_overlong_lines() {
        let mgr = FontManager::default();
        // Courier at 10 pt: 6 pt per char, 5 chars per line
        let lines = wrap_preformatted("aa bb cc", 31.0, metrics(&mgr, FontFamily::Courier));
        assert_eq!(lines, vec!["aa", "bb cc"]);
    }
}
