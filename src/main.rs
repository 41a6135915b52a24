//! Folio - A paginated book renderer for the terminal.
//!
//! # Usage
//!
//! ```bash
//! folio book.json
//! folio --watch --edit book.json5
//! folio --collect out.json book.json
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use folio::app::App;
use folio::book::{Book, write_snapshot};
use folio::config::{
    ConfigFlags, DeviceSize, RenderOptions, clear_config_flags, global_config_path,
    load_config_flags, local_override_path, parse_flag_tokens, save_config_flags,
};
use folio::document::{DocView, DocViewProps};
use folio::metrics::DeviceDimensions;
use folio::surface::MemorySurface;
use folio::viewport::{GeometryObserver, ObserverOptions};

/// Device size used by `--collect` when none is given.
const HEADLESS_DEVICE: (f32, f32) = (1280.0, 800.0);

/// A paginated book renderer for the terminal
#[derive(Parser, Debug)]
#[command(name = "folio", version, about, long_about = None)]
struct Cli {
    /// Book file to view (.json or .json5)
    #[arg(value_name = "BOOK")]
    book: PathBuf,

    /// Watch the book file for changes and auto-reload
    #[arg(short, long)]
    watch: bool,

    /// Start in edit mode
    #[arg(short, long)]
    edit: bool,

    /// Do not pad sparse pages to a full sheet
    #[arg(long)]
    no_autofix: bool,

    /// Content height in pixels below which a page is sparse
    #[arg(long, value_name = "PX")]
    sparse_threshold: Option<f32>,

    /// Fixed height in pixels for padded pages
    #[arg(long, value_name = "PX")]
    page_height: Option<f32>,

    /// Body font size in pixels
    #[arg(long, value_name = "PX")]
    font_size: Option<f32>,

    /// Device size as WIDTHxHEIGHT pixels (default: derived from the terminal)
    #[arg(long, value_name = "WxH")]
    device: Option<DeviceSize>,

    /// Force image rendering to use half-cell fallback mode
    #[arg(long)]
    force_half_cell: bool,

    /// Collect pages without a terminal and write them to OUT
    #[arg(long, value_name = "OUT")]
    collect: Option<PathBuf>,

    /// Write debug events to a file
    #[arg(long, value_name = "PATH")]
    debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn init_logging(debug_log: Option<&Path>, headless: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=debug"));
    if let Some(path) = debug_log {
        let file = File::create(path)
            .with_context(|| format!("Failed to create debug log {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if headless {
        // No UI owns the terminal, so warnings can go to stderr.
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn collect_headless(
    book_path: &Path,
    out: &Path,
    options: &RenderOptions,
    editable: bool,
) -> Result<()> {
    let book = Book::load(book_path)
        .with_context(|| format!("Failed to open {}", book_path.display()))?;
    let props = DocViewProps {
        pages: book.pages,
        theme: book.theme,
        meta: book.meta,
        device: options
            .device
            .unwrap_or_else(|| DeviceDimensions::new(HEADLESS_DEVICE.0, HEADLESS_DEVICE.1)),
        editable,
        selected_page: None,
        cover_image: book.cover_image,
        font_size: options.font_size,
        auto_fix_sparse_pages: options.auto_fix_sparse_pages,
        sparse_threshold_px: options.sparse_threshold_px,
        fixed_page_height_px: options.fixed_page_height_px,
    };
    let mut view = DocView::new(
        props,
        GeometryObserver::new(ObserverOptions::default()),
        MemorySurface::new,
    );
    let pages = view.collect();
    write_snapshot(out, &pages)
        .with_context(|| format!("Failed to write snapshot {}", out.display()))?;
    info!(out = %out.display(), pages = pages.len(), "collected");
    println!("Wrote {} pages to {}", pages.len(), out.display());
    Ok(())
}

fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);
    let options = RenderOptions::from_flags(&effective);

    init_logging(effective.debug_log.as_deref(), cli.collect.is_some())?;

    if !cli.book.exists() {
        anyhow::bail!("File not found: {}", cli.book.display());
    }

    if let Some(out) = &cli.collect {
        return collect_headless(&cli.book, out, &options, effective.edit);
    }

    let mut app = App::new(cli.book)
        .with_options(options)
        .with_watch(effective.watch)
        .with_editing(effective.edit)
        .with_force_half_cell(effective.force_half_cell)
        .with_config_paths(
            Some(global_path.clone()),
            if local_path.exists() {
                Some(local_path.clone())
            } else {
                None
            },
        );

    app.run().context("Application error")
}
