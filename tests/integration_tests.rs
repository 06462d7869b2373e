//! Integration tests for the markdown-press pipeline.
//!
//! These tests validate:
//! - Compiled documents are stable and both targets share typography
//! - Export falls back to the static writer and always restores the preview
//! - Cancellation is honoured while waiting for the surface
//! - Static writer output: valid PDF, pagination, layout config round-trip

use std::cell::Cell;
use std::time::Duration;

use sha2::{Digest, Sha256};

use markdown_press::config::{FontFamilyClass, Margins, PageSize, Rgb, Theme};
use markdown_press::layout_config::{LayoutBox, LayoutConfig};
use markdown_press::page::PointMargins;
use markdown_press::pipeline::{compute_layout_config, generate};
use markdown_press::render::render_pdf;
use markdown_press::samples::SAMPLE_DOCUMENT;
use markdown_press::{
    cm_to_points, compile, export_to_pdf, CancelToken, DocumentController, Error, ExportOptions,
    Mode, PageLayoutConfig, PrintOptions, ReadinessPolicy, RenderSurface, RenderTarget,
    StaticWriter, StyleConfig, StyleConfigUpdate, StyledDocument,
};

// =====================================================================
// Helpers
// =====================================================================

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn digest(doc: &StyledDocument) -> Vec<u8> {
    Sha256::digest(doc.to_html().as_bytes()).to_vec()
}

fn quick_options() -> ExportOptions {
    ExportOptions {
        readiness: ReadinessPolicy::new(Duration::from_millis(1), 10),
        ..Default::default()
    }
}

fn visit_box(lbox: &LayoutBox, f: &mut dyn FnMut(&LayoutBox)) {
    f(lbox);
    for child in &lbox.children {
        visit_box(child, f);
    }
}

/// A live surface whose behaviour each test scripts.
struct ScriptedSurface {
    printable: bool,
    fail_load: Option<RenderTarget>,
    fail_print: bool,
    print_empty: bool,
    polls_until_ready: Cell<u32>,
    cancel_on_poll: Option<CancelToken>,
    displayed: Option<StyledDocument>,
    loads: Vec<RenderTarget>,
    printed_with: Vec<PageLayoutConfig>,
}

impl ScriptedSurface {
    fn working() -> Self {
        Self {
            printable: true,
            fail_load: None,
            fail_print: false,
            print_empty: false,
            polls_until_ready: Cell::new(2),
            cancel_on_poll: None,
            displayed: None,
            loads: Vec::new(),
            printed_with: Vec::new(),
        }
    }

    fn displayed_target(&self) -> Option<RenderTarget> {
        self.displayed.as_ref().map(StyledDocument::target)
    }
}

impl RenderSurface for ScriptedSurface {
    fn can_print(&self) -> bool {
        self.printable
    }

    fn load(&mut self, document: &StyledDocument) -> markdown_press::Result<()> {
        self.loads.push(document.target());
        if self.fail_load == Some(document.target()) {
            return Err(Error::Surface("load failed".to_string()));
        }
        self.displayed = Some(document.clone());
        Ok(())
    }

    fn is_ready(&self) -> bool {
        if let Some(token) = &self.cancel_on_poll {
            token.cancel();
        }
        let left = self.polls_until_ready.get();
        self.polls_until_ready.set(left.saturating_sub(1));
        left == 0
    }

    fn print_to_pdf(
        &mut self,
        page: &PageLayoutConfig,
        options: &PrintOptions,
    ) -> markdown_press::Result<Vec<u8>> {
        assert!(options.print_backgrounds, "backgrounds must be printed");
        assert_eq!(self.displayed_target(), Some(RenderTarget::Export));
        self.printed_with.push(*page);
        if self.fail_print {
            return Err(Error::Surface("print engine not initialised".to_string()));
        }
        if self.print_empty {
            return Ok(Vec::new());
        }
        Ok(b"%PDF-1.7 live surface output".to_vec())
    }
}

const TEXT: &str = "# Report\n\nSome **text** with a [link](https://example.com).\n";

// =====================================================================
// Unit conversion and page geometry
// =====================================================================

#[test]
fn centimetres_to_points() {
    assert_eq!(cm_to_points(2.54), 72);
    assert_eq!(cm_to_points(0.0), 0);
    assert_eq!(cm_to_points(1.0), 28);
    for cm in [0.1f32, 0.5, 1.27, 3.3, 10.0] {
        assert!(cm_to_points(cm) >= 0);
    }
}

#[test]
fn default_margins_on_a4_are_one_inch() {
    let config = StyleConfig {
        margins_cm: Margins::uniform(2.54),
        page_size: PageSize::A4,
        ..Default::default()
    };
    let page = PageLayoutConfig::from_style(&config);
    assert_eq!(page.page_size, PageSize::A4);
    assert_eq!(
        page.margins_pt,
        PointMargins {
            top: 72,
            right: 72,
            bottom: 72,
            left: 72
        }
    );
}

// =====================================================================
// Document compilation
// =====================================================================

#[test]
fn compilation_is_idempotent() {
    let config = StyleConfig {
        font_family: FontFamilyClass::Serif,
        theme: Theme::Dark,
        ..Default::default()
    };
    for target in [RenderTarget::Preview, RenderTarget::Export] {
        let a = compile(SAMPLE_DOCUMENT, &config, target);
        let b = compile(SAMPLE_DOCUMENT, &config, target);
        assert_eq!(a, b);
        assert_eq!(digest(&a), digest(&b));
    }
}

#[test]
fn both_targets_share_typography() {
    for family in [
        FontFamilyClass::SansSerif,
        FontFamilyClass::Serif,
        FontFamilyClass::Monospace,
    ] {
        let config = StyleConfig {
            font_family: family,
            font_size_pt: 13.5,
            ..Default::default()
        };
        let preview = compile("x", &config, RenderTarget::Preview);
        let export = compile("x", &config, RenderTarget::Export);
        for css in [preview.style_block(), export.style_block()] {
            assert!(css.contains(&format!("font-family: {};", family.font_stack())));
            assert!(css.contains("font-size: 13.5pt;"));
            assert!(css.contains("h1 { font-size: 27pt; }"));
        }
        assert_ne!(preview.style_block(), export.style_block());
    }
}

#[test]
fn empty_text_compiles_to_empty_body() {
    let doc = compile("", &StyleConfig::default(), RenderTarget::Preview);
    assert!(doc.markup_body().is_empty());
    assert!(doc.to_html().contains("<style>"));
}

// =====================================================================
// Document state controller
// =====================================================================

#[test]
fn preview_reflects_latest_edits_after_toggle() {
    let mut controller = DocumentController::new();
    controller.set_raw_text("# Title");
    controller
        .update_style(&StyleConfigUpdate {
            font_size_pt: Some(16.0),
            text_color: Some(Rgb::from_hex_or_default("#336699")),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(controller.toggle_mode(), Mode::Previewing);

    let preview = controller.preview_document();
    assert!(preview.markup_body().contains("<h1>Title</h1>"));
    assert!(preview.style_block().contains("font-size: 16pt;"));
    assert!(preview.style_block().contains("#336699"));
    assert_eq!(
        *preview,
        compile("# Title", controller.style_config(), RenderTarget::Preview)
    );
}

#[tokio::test]
async fn controller_exports_current_document() {
    let mut controller = DocumentController::with_text("", StyleConfig::default());
    controller.set_raw_text("Hello from the controller");
    let bytes = controller
        .export_to_pdf(None, &ExportOptions::default())
        .await
        .unwrap();
    assert_valid_pdf(&bytes);
}

// =====================================================================
// Export orchestration
// =====================================================================

#[tokio::test]
async fn live_surface_output_is_returned_and_preview_restored() {
    let config = StyleConfig::default();
    let mut surface = ScriptedSurface::working();
    let bytes = export_to_pdf(TEXT, &config, Some(&mut surface), &quick_options())
        .await
        .unwrap();

    assert_eq!(bytes, b"%PDF-1.7 live surface output");
    assert_eq!(surface.loads, vec![RenderTarget::Export, RenderTarget::Preview]);
    assert_eq!(surface.printed_with, vec![PageLayoutConfig::from_style(&config)]);
    assert_eq!(
        surface.displayed,
        Some(compile(TEXT, &config, RenderTarget::Preview))
    );
}

#[tokio::test]
async fn print_failure_falls_back_to_static_writer() {
    let config = StyleConfig::default();
    let mut surface = ScriptedSurface {
        fail_print: true,
        ..ScriptedSurface::working()
    };
    let bytes = export_to_pdf(TEXT, &config, Some(&mut surface), &quick_options())
        .await
        .unwrap();

    assert_valid_pdf(&bytes);
    assert_eq!(surface.printed_with.len(), 1);
    assert_eq!(
        surface.displayed,
        Some(compile(TEXT, &config, RenderTarget::Preview))
    );
}

#[tokio::test]
async fn load_failure_falls_back_and_still_restores() {
    let mut surface = ScriptedSurface {
        fail_load: Some(RenderTarget::Export),
        ..ScriptedSurface::working()
    };
    let bytes = export_to_pdf(TEXT, &StyleConfig::default(), Some(&mut surface), &quick_options())
        .await
        .unwrap();

    assert_valid_pdf(&bytes);
    assert!(surface.printed_with.is_empty());
    assert_eq!(surface.loads, vec![RenderTarget::Export, RenderTarget::Preview]);
    assert_eq!(surface.displayed_target(), Some(RenderTarget::Preview));
}

#[tokio::test]
async fn empty_live_output_is_not_success() {
    let mut surface = ScriptedSurface {
        print_empty: true,
        ..ScriptedSurface::working()
    };
    let bytes = export_to_pdf(TEXT, &StyleConfig::default(), Some(&mut surface), &quick_options())
        .await
        .unwrap();

    assert_valid_pdf(&bytes);
    assert_eq!(surface.displayed_target(), Some(RenderTarget::Preview));
}

#[tokio::test]
async fn surface_without_print_support_is_skipped() {
    let mut surface = ScriptedSurface {
        printable: false,
        ..ScriptedSurface::working()
    };
    let bytes = export_to_pdf(TEXT, &StyleConfig::default(), Some(&mut surface), &quick_options())
        .await
        .unwrap();

    assert_valid_pdf(&bytes);
    assert!(surface.loads.is_empty());
    assert!(surface.displayed.is_none());
}

#[tokio::test]
async fn slow_surface_is_printed_after_timeout() {
    let mut surface = ScriptedSurface {
        polls_until_ready: Cell::new(1_000),
        ..ScriptedSurface::working()
    };
    let bytes = export_to_pdf(TEXT, &StyleConfig::default(), Some(&mut surface), &quick_options())
        .await
        .unwrap();

    assert_eq!(bytes, b"%PDF-1.7 live surface output");
    assert_eq!(surface.displayed_target(), Some(RenderTarget::Preview));
}

#[tokio::test]
async fn cancellation_during_readiness_wait_restores_preview() {
    let options = quick_options();
    let mut surface = ScriptedSurface {
        polls_until_ready: Cell::new(1_000),
        cancel_on_poll: Some(options.cancel.clone()),
        ..ScriptedSurface::working()
    };
    let err = export_to_pdf(TEXT, &StyleConfig::default(), Some(&mut surface), &options)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(surface.printed_with.is_empty());
    assert_eq!(surface.displayed_target(), Some(RenderTarget::Preview));
}

#[tokio::test]
async fn cancelled_export_never_starts() {
    let options = ExportOptions::default();
    options.cancel.cancel();

    let err = export_to_pdf(TEXT, &StyleConfig::default(), None, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    let mut surface = ScriptedSurface::working();
    let err = export_to_pdf(TEXT, &StyleConfig::default(), Some(&mut surface), &options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(surface.loads.is_empty());
}

fn broken_writer(_: &str, _: &str, _: &PageLayoutConfig) -> markdown_press::Result<Vec<u8>> {
    Err(Error::Writer("font table unavailable".to_string()))
}

#[tokio::test]
async fn both_engines_failing_surfaces_the_writer_error() {
    let config = StyleConfig::default();
    let mut surface = ScriptedSurface {
        fail_print: true,
        ..ScriptedSurface::working()
    };
    let options = ExportOptions {
        writer: StaticWriter(broken_writer),
        ..quick_options()
    };
    let err = export_to_pdf(TEXT, &config, Some(&mut surface), &options)
        .await
        .unwrap_err();

    assert!(matches!(&err, Error::Writer(msg) if msg == "font table unavailable"));
    assert!(err.to_string().contains("font table unavailable"));
    assert_eq!(surface.printed_with.len(), 1);
    assert_eq!(
        surface.displayed,
        Some(compile(TEXT, &config, RenderTarget::Preview))
    );
}

#[tokio::test]
async fn static_writer_failure_without_surface_is_fatal() {
    let options = ExportOptions {
        writer: StaticWriter(broken_writer),
        ..Default::default()
    };
    let err = export_to_pdf(TEXT, &StyleConfig::default(), None, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Writer(_)));
}

#[tokio::test]
async fn absurd_margins_are_rejected_before_export() {
    let config = StyleConfig {
        margins_cm: Margins::uniform(5.0e7),
        ..Default::default()
    };
    let err = export_to_pdf("hello", &config, None, &ExportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[tokio::test]
async fn empty_text_exports_a_valid_pdf() {
    let bytes = export_to_pdf("", &StyleConfig::default(), None, &ExportOptions::default())
        .await
        .unwrap();
    assert_valid_pdf(&bytes);
}

// =====================================================================
// Static writer
// =====================================================================

#[test]
fn sample_document_renders_every_construct() {
    let config = StyleConfig::default();
    let doc = compile(SAMPLE_DOCUMENT, &config, RenderTarget::Export);
    let layout = compute_layout_config(&doc.to_html(), &PageLayoutConfig::from_style(&config)).unwrap();
    assert_eq!(layout.title, "Heading One");
    assert_eq!(layout.page_background, Some([1.0, 1.0, 1.0, 1.0]));

    let text: Vec<String> = (0..layout.pages.len())
        .flat_map(|p| layout.page_text(p))
        .collect();
    for expected in [
        "Heading One",
        "A sample blockquote.",
        "List item 1",
        "Nested item",
        "[x] Done task",
        "[ ] Open task",
        "    println!(\"Hello, world!\");",
        "Column A",
        "B2",
        "\u{2022}",
        "1.",
    ] {
        assert!(
            text.iter().any(|line| line == expected),
            "missing {expected:?} in {text:?}"
        );
    }

    let mut found_rule = false;
    let mut found_code_background = false;
    for page in &layout.pages {
        for lbox in &page.boxes {
            visit_box(lbox, &mut |b| {
                found_rule |= b.border_left.is_some();
                found_code_background |= b.background_color.is_some_and(|c| c[0] < 1.0);
            });
        }
    }
    assert!(found_rule, "blockquote should have a left rule");
    assert!(found_code_background, "code block should have a background");

    let bytes = generate(doc.markup_body(), doc.style_block(), &PageLayoutConfig::from_style(&config)).unwrap();
    assert_valid_pdf(&bytes);
}

#[test]
fn wide_glyph_lines_fit_the_content_width() {
    let config = StyleConfig::default();
    let page = PageLayoutConfig::from_style(&config);
    let doc = compile(&"WWWWW MMMMM ".repeat(40), &config, RenderTarget::Export);
    let layout = compute_layout_config(&doc.to_html(), &page).unwrap();

    // Helvetica AFM advances: W 944, M 833, space 278.
    let afm_width = |line: &str, size: f32| {
        let units: u32 = line
            .chars()
            .map(|c| match c {
                'W' => 944,
                'M' => 833,
                ' ' => 278,
                other => panic!("unexpected glyph {other:?}"),
            })
            .sum();
        units as f32 * size / 1000.0
    };
    let right = page.width_pt - page.margins_pt.right as f32;
    let mut lines = 0;
    for p in &layout.pages {
        for lbox in &p.boxes {
            visit_box(lbox, &mut |b| {
                let Some(text) = &b.text else { return };
                for line in &text.lines {
                    let end = b.x + line.x_offset + afm_width(&line.text, text.font_size);
                    assert!(end <= right + 0.01, "{:?} ends at {end}, margin at {right}", line.text);
                    lines += 1;
                }
            });
        }
    }
    assert!(lines > 1, "text should wrap");
}

#[test]
fn boxes_stay_inside_the_margins() {
    let config = StyleConfig {
        margins_cm: Margins::uniform(2.0),
        page_size: PageSize::Letter,
        ..Default::default()
    };
    let page = PageLayoutConfig::from_style(&config);
    let mut text = String::new();
    for i in 0..40 {
        text.push_str(&format!(
            "Paragraph {i} with enough words to wrap across more than a single line of the page.\n\n"
        ));
    }
    let doc = compile(&text, &config, RenderTarget::Export);
    let layout = compute_layout_config(&doc.to_html(), &page).unwrap();

    assert!(layout.pages.len() > 1);
    let left = page.margin_left();
    let right = page.width_pt - page.margins_pt.right as f32;
    let bottom = page.height_pt - page.margins_pt.bottom as f32;
    for p in &layout.pages {
        for lbox in &p.boxes {
            visit_box(lbox, &mut |b| {
                assert!(b.x >= left - 0.01, "box x {} left of margin", b.x);
                assert!(b.x + b.width <= right + 0.01, "box overflows right margin");
            });
            assert!(lbox.y >= page.margin_top() - 0.01);
            assert!(lbox.y + lbox.height <= bottom + 0.1);
        }
    }
}

#[test]
fn long_markdown_table_repeats_header() {
    let mut text = String::from("| Item | Qty |\n|---|---|\n");
    for i in 0..120 {
        text.push_str(&format!("| item {i} | {i} |\n"));
    }
    let config = StyleConfig::default();
    let doc = compile(&text, &config, RenderTarget::Export);
    let layout = compute_layout_config(&doc.to_html(), &PageLayoutConfig::from_style(&config)).unwrap();

    assert!(layout.pages.len() >= 2);
    for page in 0..layout.pages.len() {
        let lines = layout.page_text(page);
        assert_eq!(&lines[..2], ["Item", "Qty"], "page {page} lacks the header");
    }
}

#[test]
fn layout_config_json_roundtrip() {
    let config = StyleConfig::default();
    let doc = compile(SAMPLE_DOCUMENT, &config, RenderTarget::Export);
    let layout = compute_layout_config(&doc.to_html(), &PageLayoutConfig::from_style(&config)).unwrap();
    let json = layout.to_json().unwrap();
    let parsed = LayoutConfig::from_json(&json).unwrap();
    assert_eq!(layout.pages.len(), parsed.pages.len());
    assert!((layout.page_width_pt - parsed.page_width_pt).abs() < 0.01);
    assert_eq!(layout.page_text(0), parsed.page_text(0));
    assert_valid_pdf(&render_pdf(&parsed).unwrap());
}

#[test]
fn layout_is_deterministic() {
    let config = StyleConfig::default();
    let doc = compile(SAMPLE_DOCUMENT, &config, RenderTarget::Export);
    let page = PageLayoutConfig::from_style(&config);
    let a = compute_layout_config(&doc.to_html(), &page).unwrap().to_json().unwrap();
    let b = compute_layout_config(&doc.to_html(), &page).unwrap().to_json().unwrap();
    assert_eq!(Sha256::digest(a.as_bytes()), Sha256::digest(b.as_bytes()));
}
