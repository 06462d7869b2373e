//! # markdown-press – markdown → styled preview and paginated PDF
//!
//! Markdown text plus a [`StyleConfig`] compiles into a [`StyledDocument`]
//! for one of two targets: an on-screen preview that follows the theme, or
//! a print document with paper colours and a page box. Export prints the
//! document through a live [`RenderSurface`] when one is available and
//! falls back to the in-crate static PDF writer otherwise.
//!
//! The static writer is a staged pipeline:
//!
//! 1. **Parse** – HTML string → DOM tree ([`dom`])
//! 2. **Style** – cascade the style block over the DOM ([`style`])
//! 3. **Layout** – compute block/table layout with Taffy ([`layout`])
//! 4. **Paginate** – split into pages ([`pagination`])
//! 5. **Render** – emit PDF bytes via printpdf ([`render`])
//!
//! [`controller::DocumentController`] holds the editable text and style
//! and keeps the preview current.

pub mod config;
pub mod controller;
pub mod document;
pub mod dom;
pub mod error;
pub mod export;
pub mod fonts;
pub mod layout;
pub mod layout_config;
pub mod markup;
pub mod page;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod samples;
pub mod style;
pub mod stylesheet;
pub mod surface;
pub mod units;

// Re-exports for convenience
pub use config::{StyleConfig, StyleConfigUpdate};
pub use controller::{DocumentController, Mode};
pub use document::{compile, RenderTarget, StyledDocument};
pub use error::{Error, Result};
pub use export::{export_to_pdf, ExportEngine, ExportOptions, StaticWriter};
pub use page::PageLayoutConfig;
pub use surface::{CancelToken, PrintOptions, ReadinessPolicy, RenderSurface};
pub use units::cm_to_points;
