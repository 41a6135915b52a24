//! Application state and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::run`]: Main event loop with rendering

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{
    MAGNIFIER_CELL_PX, MagnifierFrame, Model, ToastLevel, snapshot_path_for, viewer_size_px,
};
pub use update::{Message, update};

use std::path::PathBuf;

use crate::config::RenderOptions;

/// Main application struct that owns the terminal and runs the event loop.
pub struct App {
    book_path: PathBuf,
    options: RenderOptions,
    watch_enabled: bool,
    start_editing: bool,
    force_half_cell: bool,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    /// Create a new application for the given book.
    pub fn new(book_path: PathBuf) -> Self {
        Self {
            book_path,
            options: RenderOptions::default(),
            watch_enabled: false,
            start_editing: false,
            force_half_cell: false,
            config_global_path: None,
            config_local_path: None,
        }
    }

    /// Set rendering options.
    #[must_use]
    pub const fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable or disable file watching.
    #[must_use]
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    /// Start in edit mode.
    #[must_use]
    pub const fn with_editing(mut self, enabled: bool) -> Self {
        self.start_editing = enabled;
        self
    }

    /// Force half-cell image rendering in the magnifier.
    #[must_use]
    pub const fn with_force_half_cell(mut self, enabled: bool) -> Self {
        self.force_half_cell = enabled;
        self
    }

    /// Set config paths to show in help.
    #[must_use]
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }
}

#[cfg(test)]
mod tests;
