//! Document state – raw text, style config, and the edit/preview mode.
//!
//! The preview document is rebuilt whenever the controller enters preview
//! mode and after every change made while previewing, so a shown preview is
//! never stale. Changes made while editing are picked up on the next switch
//! into preview.

use crate::config::{StyleConfig, StyleConfigUpdate};
use crate::document::{compile, RenderTarget, StyledDocument};
use crate::error::Result;
use crate::export::{self, ExportOptions};
use crate::samples::SAMPLE_DOCUMENT;
use crate::surface::RenderSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Editing,
    Previewing,
}

#[derive(Debug, Clone)]
pub struct DocumentController {
    raw_text: String,
    config: StyleConfig,
    mode: Mode,
    preview: StyledDocument,
}

impl Default for DocumentController {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentController {
    /// Editing mode, seeded with the sample document and default style.
    pub fn new() -> Self {
        Self::with_text(SAMPLE_DOCUMENT, StyleConfig::default())
    }

    pub fn with_text(raw_text: &str, config: StyleConfig) -> Self {
        let preview = compile(raw_text, &config, RenderTarget::Preview);
        Self {
            raw_text: raw_text.to_string(),
            config,
            mode: Mode::Editing,
            preview,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn style_config(&self) -> &StyleConfig {
        &self.config
    }

    /// The preview document. Current whenever the mode is `Previewing`.
    pub fn preview_document(&self) -> &StyledDocument {
        &self.preview
    }

    /// The export document for the current text and style.
    pub fn export_document(&self) -> StyledDocument {
        compile(&self.raw_text, &self.config, RenderTarget::Export)
    }

    pub fn set_raw_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.raw_text {
            return;
        }
        self.raw_text = text;
        self.refresh_if_previewing();
    }

    /// Apply a partial style update. An invalid update changes nothing.
    pub fn update_style(&mut self, update: &StyleConfigUpdate) -> Result<()> {
        if self.config.apply(update)? {
            self.refresh_if_previewing();
        }
        Ok(())
    }

    /// Replace the whole style config.
    pub fn set_style_config(&mut self, config: StyleConfig) -> Result<()> {
        config.validate()?;
        if config != self.config {
            self.config = config;
            self.refresh_if_previewing();
        }
        Ok(())
    }

    pub fn enter_preview(&mut self) -> &StyledDocument {
        self.rebuild_preview();
        self.mode = Mode::Previewing;
        &self.preview
    }

    pub fn enter_editing(&mut self) {
        self.mode = Mode::Editing;
    }

    pub fn toggle_mode(&mut self) -> Mode {
        match self.mode {
            Mode::Editing => {
                self.enter_preview();
            }
            Mode::Previewing => self.enter_editing(),
        }
        self.mode
    }

    /// Number of lines in the raw text; empty text counts as one line.
    pub fn line_count(&self) -> usize {
        self.raw_text.split('\n').count()
    }

    /// Line-number gutter text: `"1\n2\n…"`.
    pub fn line_numbers(&self) -> String {
        (1..=self.line_count())
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Export the current text and style to PDF. See
    /// [`export::export_to_pdf`].
    pub async fn export_to_pdf(
        &self,
        surface: Option<&mut dyn RenderSurface>,
        options: &ExportOptions,
    ) -> Result<Vec<u8>> {
        export::export_to_pdf(&self.raw_text, &self.config, surface, options).await
    }

    fn refresh_if_previewing(&mut self) {
        if self.mode == Mode::Previewing {
            self.rebuild_preview();
        }
    }

    fn rebuild_preview(&mut self) {
        self.preview = compile(&self.raw_text, &self.config, RenderTarget::Preview);
    }
}
