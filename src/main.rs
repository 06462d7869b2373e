//! mdpress – command-line markdown → PDF converter.
//!
//! Usage:
//!   mdpress <input.md> [output.pdf] [--font sans|serif|mono] [--size PT]
//!           [--color #RRGGBB] [--theme light|dark] [--margin CM]
//!           [--page a4|letter] [--config style.json] [--preview-html out.html]
//!           [--sample]
//!
//! If `output.pdf` is omitted the PDF is written next to the input file with
//! the same stem (e.g. `notes.md` → `notes.pdf`).

use std::{env, fs, path::Path, path::PathBuf, process, str::FromStr};

use markdown_press::config::{Rgb, StyleConfig, StyleConfigUpdate};
use markdown_press::controller::DocumentController;
use markdown_press::export::ExportOptions;
use markdown_press::samples::SAMPLE_DOCUMENT;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let prog = args.first().map_or("mdpress", String::as_str);

    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut preview_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut use_sample = false;
    let mut update = StyleConfigUpdate::default();
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--font" | "-f" => update.font_family = Some(parse_value(arg, iter.next())),
            "--size" | "-s" => update.font_size_pt = Some(parse_value(arg, iter.next())),
            "--color" | "-c" => {
                update.text_color = Some(Rgb::from_hex_or_default(&value(arg, iter.next())))
            }
            "--theme" => update.theme = Some(parse_value(arg, iter.next())),
            "--margin" | "-m" => {
                let cm: f32 = parse_value(arg, iter.next());
                update = update.margins(cm);
            }
            "--page" | "-p" => update.page_size = Some(parse_value(arg, iter.next())),
            "--config" => config_path = Some(PathBuf::from(value(arg, iter.next()))),
            "--preview-html" => preview_path = Some(PathBuf::from(value(arg, iter.next()))),
            "--sample" => use_sample = true,
            "--help" | "-h" => {
                print_usage(prog);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(prog);
                process::exit(1);
            }
            path => {
                if positional == 0 {
                    input_path = Some(PathBuf::from(path));
                } else if positional == 1 {
                    output_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(prog);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    // With --sample the only positional argument is the output path.
    if use_sample && output_path.is_none() {
        output_path = input_path.take();
    }

    let (text, default_output) = match (&input_path, use_sample) {
        (_, true) => (SAMPLE_DOCUMENT.to_string(), PathBuf::from("sample.pdf")),
        (Some(input), false) => {
            let text = fs::read_to_string(input)
                .unwrap_or_else(|e| fail(&format!("Error reading '{}': {e}", input.display())));
            (text, input.with_extension("pdf"))
        }
        (None, false) => {
            eprintln!("Error: no input file specified.");
            print_usage(prog);
            process::exit(1);
        }
    };
    let output = output_path.unwrap_or(default_output);

    let mut config = match &config_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(&format!("Error reading '{}': {e}", path.display())));
            StyleConfig::from_json(&json)
                .unwrap_or_else(|e| fail(&format!("Error in '{}': {e}", path.display())))
        }
        None => StyleConfig::default(),
    };
    if let Err(e) = config.apply(&update) {
        fail(&format!("Error: {e}"));
    }

    let mut controller = DocumentController::with_text(&text, config);

    if let Some(path) = &preview_path {
        let html = controller.enter_preview().to_html();
        write_file(path, html.as_bytes());
        eprintln!("Wrote preview '{}'", path.display());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap_or_else(|e| fail(&format!("Error starting runtime: {e}")));

    // A terminal has no live rendering surface, so the static writer runs.
    match runtime.block_on(controller.export_to_pdf(None, &ExportOptions::default())) {
        Ok(bytes) => {
            write_file(&output, &bytes);
            eprintln!("Wrote '{}' ({} bytes)", output.display(), bytes.len());
        }
        Err(e) => fail(&format!("Error generating PDF: {e}")),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn value(flag: &str, next: Option<&String>) -> String {
    match next {
        Some(v) => v.clone(),
        None => fail(&format!("Missing value for {flag}")),
    }
}

fn parse_value<T: FromStr>(flag: &str, next: Option<&String>) -> T
where
    T::Err: std::fmt::Display,
{
    let raw = value(flag, next);
    raw.parse()
        .unwrap_or_else(|e| fail(&format!("Invalid value '{raw}' for {flag}: {e}")))
}

fn write_file(path: &Path, bytes: &[u8]) {
    // Create output directory if necessary.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                fail(&format!("Error creating output directory: {e}"));
            }
        }
    }
    if let Err(e) = fs::write(path, bytes) {
        fail(&format!("Error writing '{}': {e}", path.display()));
    }
}

fn print_usage(prog: &str) {
    eprintln!("mdpress – markdown to PDF converter (markdown-press)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <input.md> [output.pdf] [flags]");
    eprintln!("  {prog} --sample [output.pdf] [flags]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <input.md>     Markdown file to convert");
    eprintln!("  [output.pdf]   Output path  (default: same stem as input with .pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --font, -f     Font family: sans, serif or mono (default: sans)");
    eprintln!("  --size, -s     Base font size in points (default: 12)");
    eprintln!("  --color, -c    Text colour as #RRGGBB (default: #222222)");
    eprintln!("  --theme        Preview theme: light or dark (default: light)");
    eprintln!("  --margin, -m   All four page margins in cm (default: 2.54)");
    eprintln!("  --page, -p     Page size: a4 or letter (default: a4)");
    eprintln!("  --config       Load the style from a JSON file; flags override it");
    eprintln!("  --preview-html Also write the preview document as HTML");
    eprintln!("  --sample       Convert the built-in sample document");
    eprintln!("  --help         Print this message");
}
