//! Style configuration – the explicit value every compile and export call
//! receives. Nothing here is looked up from ambient application state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Generic font family class chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamilyClass {
    #[default]
    SansSerif,
    Serif,
    Monospace,
}

impl FontFamilyClass {
    /// The concrete CSS font stack for this class.
    pub fn font_stack(self) -> &'static str {
        match self {
            FontFamilyClass::SansSerif => {
                "-apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, Helvetica, Arial, \"Noto Sans\", \"Liberation Sans\", sans-serif"
            }
            FontFamilyClass::Serif => "\"Times New Roman\", Times, serif",
            FontFamilyClass::Monospace => "\"Courier New\", Courier, monospace",
        }
    }
}

impl FromStr for FontFamilyClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sans" | "sans-serif" | "sansserif" => Ok(Self::SansSerif),
            "serif" => Ok(Self::Serif),
            "mono" | "monospace" => Ok(Self::Monospace),
            other => Err(Error::InvalidConfig(format!("unknown font family: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(Error::InvalidConfig(format!("unknown theme: {other}"))),
        }
    }
}

/// Physical page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Width × height in PDF points (1 pt = 1/72 inch).
    pub fn dimensions_pt(self) -> (f32, f32) {
        match self {
            // 210mm × 297mm
            PageSize::A4 => (595.28, 841.89),
            // 8.5in × 11in
            PageSize::Letter => (612.0, 792.0),
        }
    }

    /// Name used in the CSS `@page { size: … }` directive.
    pub fn css_name(self) -> &'static str {
        match self {
            PageSize::A4 => "A4",
            PageSize::Letter => "Letter",
        }
    }
}

impl FromStr for PageSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a4" => Ok(Self::A4),
            "letter" => Ok(Self::Letter),
            other => Err(Error::InvalidConfig(format!("unknown page size: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// 8-bit RGB triple. Serialised as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// The dark gray used for body text by default and on every printed page.
    pub const DARK_GRAY: Self = Self {
        r: 0x22,
        g: 0x22,
        b: 0x22,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            3 => Some(Self {
                r: channel(&hex[0..1].repeat(2))?,
                g: channel(&hex[1..2].repeat(2))?,
                b: channel(&hex[2..3].repeat(2))?,
            }),
            _ => None,
        }
    }

    /// Like [`Rgb::from_hex`] but falls back to [`Rgb::DARK_GRAY`], the
    /// behaviour of the colour picker when given garbage.
    pub fn from_hex_or_default(hex: &str) -> Self {
        Self::from_hex(hex).unwrap_or(Self::DARK_GRAY)
    }

    /// Upper-case `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::DARK_GRAY
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Rgb {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
            .ok_or_else(|| Error::InvalidConfig(format!("invalid hex colour: {value:?}")))
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

// ---------------------------------------------------------------------------
// StyleConfig
// ---------------------------------------------------------------------------

/// Page margins in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    /// Word's default margin: one inch.
    pub const DEFAULT_CM: f32 = 2.54;
    /// Largest accepted margin, well beyond any physical page.
    pub const MAX_CM: f32 = 100.0;

    pub const fn uniform(cm: f32) -> Self {
        Self {
            top: cm,
            right: cm,
            bottom: cm,
            left: cm,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT_CM)
    }
}

/// Everything that influences how a document looks.
///
/// Invariants (checked by [`StyleConfig::validate`]): `font_size_pt > 0`,
/// every margin in `0..=Margins::MAX_CM`, all values finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub font_family: FontFamilyClass,
    pub font_size_pt: f32,
    pub text_color: Rgb,
    pub theme: Theme,
    pub margins_cm: Margins,
    pub page_size: PageSize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_family: FontFamilyClass::SansSerif,
            font_size_pt: 12.0,
            text_color: Rgb::DARK_GRAY,
            theme: Theme::Light,
            margins_cm: Margins::default(),
            page_size: PageSize::A4,
        }
    }
}

impl StyleConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.font_size_pt.is_finite() || self.font_size_pt <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "font size must be a positive number, got {}",
                self.font_size_pt
            )));
        }
        let m = &self.margins_cm;
        for (side, value) in [
            ("top", m.top),
            ("right", m.right),
            ("bottom", m.bottom),
            ("left", m.left),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{side} margin must be a non-negative number, got {value}"
                )));
            }
            if value > Margins::MAX_CM {
                return Err(Error::InvalidConfig(format!(
                    "{side} margin must be at most {} cm, got {value}",
                    Margins::MAX_CM
                )));
            }
        }
        Ok(())
    }

    /// Merge a partial update. The merged result is validated before it is
    /// committed; on error `self` is left unchanged.
    ///
    /// Returns whether anything actually changed.
    pub fn apply(&mut self, update: &StyleConfigUpdate) -> Result<bool> {
        let mut next = self.clone();
        if let Some(v) = update.font_family {
            next.font_family = v;
        }
        if let Some(v) = update.font_size_pt {
            next.font_size_pt = v;
        }
        if let Some(v) = update.text_color {
            next.text_color = v;
        }
        if let Some(v) = update.theme {
            next.theme = v;
        }
        if let Some(v) = update.margin_top_cm {
            next.margins_cm.top = v;
        }
        if let Some(v) = update.margin_right_cm {
            next.margins_cm.right = v;
        }
        if let Some(v) = update.margin_bottom_cm {
            next.margins_cm.bottom = v;
        }
        if let Some(v) = update.margin_left_cm {
            next.margins_cm.left = v;
        }
        if let Some(v) = update.page_size {
            next.page_size = v;
        }
        next.validate()?;
        let changed = next != *self;
        *self = next;
        Ok(changed)
    }

    /// Deserialise and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// A partial update to [`StyleConfig`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfigUpdate {
    pub font_family: Option<FontFamilyClass>,
    pub font_size_pt: Option<f32>,
    pub text_color: Option<Rgb>,
    pub theme: Option<Theme>,
    pub margin_top_cm: Option<f32>,
    pub margin_right_cm: Option<f32>,
    pub margin_bottom_cm: Option<f32>,
    pub margin_left_cm: Option<f32>,
    pub page_size: Option<PageSize>,
}

impl StyleConfigUpdate {
    /// Set all four margins at once.
    pub fn margins(mut self, cm: f32) -> Self {
        self.margin_top_cm = Some(cm);
        self.margin_right_cm = Some(cm);
        self.margin_bottom_cm = Some(cm);
        self.margin_left_cm = Some(cm);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
