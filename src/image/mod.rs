//! Image loading and terminal rendering for the magnifier.
//!
//! Terminal graphics (Kitty, Sixel, iTerm2 or half-blocks) are chosen by
//! ratatui-image's picker.

mod canvas;
mod loader;
mod palette;

pub use canvas::{FitRect, MagnifierCanvas};
pub use loader::{ImageCache, ImageLoader};
pub use palette::{ColorDepth, ansi256_index, ansi256_rgb, reduce_to_ansi256};

use ratatui_image::picker::Picker;
use tracing::debug;

/// Create a picker for terminal image rendering.
///
/// Falls back to half-blocks when the terminal does not answer the
/// capability query.
pub fn create_picker(force_half_cell: bool) -> Picker {
    if force_half_cell {
        debug!("forced half-cell images");
        return Picker::halfblocks();
    }
    query_picker()
}

#[cfg(unix)]
fn query_picker() -> Picker {
    use ratatui_image::picker::cap_parser::QueryStdioOptions;
    use std::time::Duration;

    let mut options = QueryStdioOptions::default();
    options.timeout = Duration::from_millis(250);
    match Picker::from_query_stdio_with_options(options) {
        Ok(picker) => {
            debug!(
                term = std::env::var("TERM").as_deref().unwrap_or("<unset>"),
                protocol = ?picker.protocol_type(),
                "created image picker"
            );
            picker
        }
        Err(err) => {
            debug!(%err, "graphics query failed, using half-blocks");
            Picker::halfblocks()
        }
    }
}

// The stdio query leaves a reader thread behind on Windows consoles.
#[cfg(not(unix))]
fn query_picker() -> Picker {
    Picker::halfblocks()
}
