//! Terminal UI components.
//!
//! This module contains all UI-related code including:
//! - [`layout`]: Sheets flattened into terminal rows
//! - [`style`]: Theme colours and line styles

pub mod layout;
pub mod style;

mod overlays;
mod render;
mod status;

pub use overlays::{magnifier_controls, magnifier_popup_rect, magnifier_viewer_rect};
pub use render::render;
pub use status::status_text;
