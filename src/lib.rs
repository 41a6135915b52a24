// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. edit::EditSession)
    clippy::module_name_repetitions
)]

//! # Folio
//!
//! A paginated document renderer for the terminal.
//!
//! Folio shows a book of HTML pages as fixed-width sheets with:
//! - Theme headers, footers, accent bars and page backgrounds
//! - Sparse-page detection that pads short pages to a full sheet
//! - In-place page editing with per-page dirty tracking
//! - Snapshot collection of the edited book
//! - An image magnifier with zoom, pan and pinch gestures
//!
//! ## Architecture
//!
//! The terminal host uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! The renderer core ([`document::DocView`]) knows nothing about terminals;
//! pages are drawn through [`surface::PageSurface`] and visibility arrives
//! through [`viewport::ViewportObserver`].
//!
//! ## Modules
//!
//! - [`metrics`]: Page geometry and sparse-page classification
//! - [`surface`]: Editable page surfaces
//! - [`edit`]: Edit session and hydration state
//! - [`snapshot`]: Collecting page content
//! - [`viewport`]: Page-in-view tracking
//! - [`document`]: Themes, templates and the document view
//! - [`magnifier`]: Zoom and pan state for the image overlay
//! - [`book`]: Book files and snapshots on disk
//! - [`app`]: Terminal application loop and state
//! - [`ui`]: Terminal UI components
//! - [`image`]: Image loading and terminal image output
//! - [`watcher`]: File watching
//! - [`config`]: Persistent flags and rendering options

pub mod app;
pub mod book;
pub mod config;
pub mod document;
pub mod edit;
pub mod image;
pub mod magnifier;
pub mod metrics;
pub mod snapshot;
pub mod surface;
pub mod ui;
pub mod viewport;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::book::Book;
    pub use crate::document::{DocEvent, DocView, DocViewProps, Sheet, Theme};
    pub use crate::edit::EditSession;
    pub use crate::magnifier::Magnifier;
    pub use crate::surface::{MemorySurface, PageSurface};
    pub use crate::viewport::ViewportObserver;
}
