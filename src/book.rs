//! Book files on disk.
//!
//! A book is a JSON (or JSON5) document holding metadata, an optional theme
//! and the page sources. Markdown pages are converted to HTML here so the
//! renderer only ever sees HTML or plain text.

use std::fs;
use std::path::{Path, PathBuf};

use comrak::{Options, markdown_to_html};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::document::{DocumentMeta, Theme};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid JSON5 in {path}")]
    Json5 {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },
}

/// How page sources are written in the book file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    Html,
    Markdown,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub cover_image: Option<String>,
    pub format: PageFormat,
    pub theme: Option<Theme>,
    pub pages: Vec<String>,
}

impl Book {
    /// Load a book, converting markdown pages to HTML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: &Path) -> Result<Self, BookError> {
        let content = fs::read_to_string(path).map_err(|source| BookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let book = Self::parse(path, &content)?;
        debug!(
            path = %path.display(),
            pages = book.pages.len(),
            format = ?book.format,
            "loaded book"
        );
        Ok(book)
    }

    /// Parse book text. `path` picks the syntax (`.json5` or JSON) and labels
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse.
    pub fn parse(path: &Path, content: &str) -> Result<Self, BookError> {
        let is_json5 = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json5"));
        let mut book: Self = if is_json5 {
            json5::from_str(content).map_err(|source| BookError::Json5 {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_json::from_str(content).map_err(|source| BookError::Json {
                path: path.to_path_buf(),
                source,
            })?
        };
        if book.format == PageFormat::Markdown {
            let options = markdown_options();
            for page in &mut book.pages {
                *page = markdown_to_html(page, &options);
            }
            book.format = PageFormat::Html;
        }
        Ok(book)
    }
}

fn markdown_options() -> Options {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.superscript = true;
    options.extension.subscript = true;
    options
}

#[derive(Serialize)]
struct Snapshot<'a> {
    pages: &'a [String],
}

/// Write collected pages as `{"pages": [...]}`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_snapshot(path: &Path, pages: &[String]) -> Result<(), BookError> {
    let json = serde_json::to_string_pretty(&Snapshot { pages }).map_err(|source| {
        BookError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| BookError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, format!("{json}\n")).map_err(|source| BookError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), pages = pages.len(), "wrote snapshot");
    Ok(())
}
