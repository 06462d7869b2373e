//! Export orchestrator – markdown text + style → PDF bytes.
//!
//! Two engines are tried in order. The live engine prints what a
//! [`RenderSurface`] shows, for exact parity with the preview. The static
//! engine runs the in-crate writer ([`crate::pipeline`]) and is always
//! available. Only a static-engine failure reaches the caller.

use std::fmt;

use tokio::task;

use crate::config::StyleConfig;
use crate::document::{compile, RenderTarget, StyledDocument};
use crate::error::{Error, Result};
use crate::page::PageLayoutConfig;
use crate::pipeline;
use crate::surface::{CancelToken, PrintOptions, ReadinessPolicy, RenderSurface};

/// Signature of a static PDF writer: markup body, style block, page.
pub type WriterFn = fn(&str, &str, &PageLayoutConfig) -> Result<Vec<u8>>;

/// The writer the static engine runs. Defaults to [`pipeline::generate`].
#[derive(Clone, Copy)]
pub struct StaticWriter(pub WriterFn);

impl Default for StaticWriter {
    fn default() -> Self {
        Self(pipeline::generate)
    }
}

impl fmt::Debug for StaticWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticWriter")
    }
}

/// Knobs for a single export.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub readiness: ReadinessPolicy,
    pub cancel: CancelToken,
    pub writer: StaticWriter,
}

/// The engine an export runs on, chosen by probing the surface.
pub enum ExportEngine<'s> {
    Live {
        surface: &'s mut dyn RenderSurface,
        readiness: ReadinessPolicy,
    },
    Static {
        writer: StaticWriter,
    },
}

impl<'s> ExportEngine<'s> {
    /// The live engine when a surface exists and can print, else static.
    pub fn select(surface: Option<&'s mut dyn RenderSurface>, options: &ExportOptions) -> Self {
        match surface {
            Some(surface) if surface.can_print() => ExportEngine::Live {
                surface,
                readiness: options.readiness,
            },
            Some(_) => {
                log::info!("Live surface cannot print; using the static writer");
                ExportEngine::Static {
                    writer: options.writer,
                }
            }
            None => ExportEngine::Static {
                writer: options.writer,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportEngine::Live { .. } => "live surface",
            ExportEngine::Static { .. } => "static writer",
        }
    }

    /// Produce PDF bytes for `document`. The live engine shows `preview`
    /// again before returning, whatever the outcome.
    pub async fn export(
        &mut self,
        document: &StyledDocument,
        preview: &StyledDocument,
        page: &PageLayoutConfig,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let name = self.name();
        let bytes = match self {
            ExportEngine::Live { surface, readiness } => {
                let mut restore = PreviewRestore::new(&mut **surface, preview);
                print_live(restore.surface(), document, page, *readiness, cancel).await?
            }
            ExportEngine::Static { writer } => run_static(*writer, document, page).await?,
        };
        if bytes.is_empty() {
            return Err(Error::EmptyOutput(name));
        }
        Ok(bytes)
    }
}

/// Shows the preview document on a surface again when dropped, so an export
/// never leaves the surface in its export styling.
struct PreviewRestore<'a> {
    surface: &'a mut dyn RenderSurface,
    preview: &'a StyledDocument,
}

impl<'a> PreviewRestore<'a> {
    fn new(surface: &'a mut dyn RenderSurface, preview: &'a StyledDocument) -> Self {
        Self { surface, preview }
    }

    fn surface(&mut self) -> &mut dyn RenderSurface {
        &mut *self.surface
    }
}

impl Drop for PreviewRestore<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.surface.load(self.preview) {
            log::warn!("Failed to restore the preview after export: {e}");
        }
    }
}

async fn print_live(
    surface: &mut dyn RenderSurface,
    document: &StyledDocument,
    page: &PageLayoutConfig,
    readiness: ReadinessPolicy,
    cancel: &CancelToken,
) -> Result<Vec<u8>> {
    surface.load(document)?;
    if !wait_until_ready(&*surface, readiness, cancel).await? {
        log::warn!(
            "Surface not ready after {:?}; printing anyway",
            readiness.budget()
        );
    }
    surface.print_to_pdf(page, &PrintOptions::default())
}

/// Poll `surface` until it reports ready. Returns `Ok(false)` when the
/// attempts run out and `Err(Cancelled)` when `cancel` fires first.
async fn wait_until_ready(
    surface: &dyn RenderSurface,
    policy: ReadinessPolicy,
    cancel: &CancelToken,
) -> Result<bool> {
    for attempt in 0..policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if surface.is_ready() {
            log::debug!("Surface ready after {attempt} poll(s)");
            return Ok(true);
        }
        tokio::time::sleep(policy.interval).await;
    }
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(surface.is_ready())
}

/// Run the static writer on a blocking worker with owned copies of the
/// document parts.
async fn run_static(
    writer: StaticWriter,
    document: &StyledDocument,
    page: &PageLayoutConfig,
) -> Result<Vec<u8>> {
    let body = document.markup_body().to_string();
    let style = document.style_block().to_string();
    let page = *page;
    task::spawn_blocking(move || (writer.0)(&body, &style, &page)).await?
}

/// Export `raw_text` styled by `config` to PDF.
///
/// With a printing-capable `surface` the live engine runs first; any failure
/// there (other than cancellation) falls back to the static writer. The
/// surface shows the preview document again when this returns.
pub async fn export_to_pdf(
    raw_text: &str,
    config: &StyleConfig,
    surface: Option<&mut dyn RenderSurface>,
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    config.validate()?;
    let page = PageLayoutConfig::from_style(config);
    let document = compile(raw_text, config, RenderTarget::Export);

    let mut engine = ExportEngine::select(surface, options);
    if let ExportEngine::Live { .. } = engine {
        let preview = compile(raw_text, config, RenderTarget::Preview);
        match engine.export(&document, &preview, &page, &options.cancel).await {
            Ok(bytes) => {
                log::info!("Exported {} bytes with the live surface", bytes.len());
                return Ok(bytes);
            }
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => log::warn!("Live export failed, falling back to the static writer: {e}"),
        }
    }

    let mut fallback = ExportEngine::Static {
        writer: options.writer,
    };
    let bytes = fallback
        .export(&document, &document, &page, &options.cancel)
        .await?;
    log::info!("Exported {} bytes with the static writer", bytes.len());
    Ok(bytes)
}
