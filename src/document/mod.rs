//! Paged document rendering.
//!
//! This module handles:
//! - Theme and book metadata types
//! - Header/footer template substitution
//! - Turning page markup into display lines
//! - The [`DocView`] that lays out sheets and routes edits

mod markup;
mod renderer;
mod template;
mod types;

pub use markup::{
    Block, BlockKind, DisplayLine, LineKind, image_sources, layout_lines, layout_source,
    looks_like_html, parse_blocks,
};
pub use renderer::{
    ClickTarget, DEFAULT_FONT_SIZE_PX, DocEvent, DocView, DocViewProps, Sheet, SheetContent,
};
pub use template::{Chrome, Placeholders, footer_chrome, header_chrome, render_template};
pub use types::{BgScope, DocumentMeta, PageState, Theme};

/// Image file extensions the viewer can open.
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "tiff", "tif", "ico", "avif",
];

/// Returns true if the path or URL ends in a recognized image extension.
pub fn is_image_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_is_image_file_case_insensitive() {
        assert!(is_image_file(Path::new("photo.PNG")));
        assert!(is_image_file(Path::new("img/cell.jpeg")));
    }

    #[test]
    fn test_is_image_file_rejects_other_extensions() {
        assert!(!is_image_file(Path::new("book.json")));
        assert!(!is_image_file(Path::new("noext")));
    }
}
