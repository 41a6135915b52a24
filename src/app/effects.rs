use std::time::Duration;

use tracing::{info, warn};

use crate::app::{App, Message, Model, ToastLevel};
use crate::book::write_snapshot;
use crate::watcher::BookWatcher;

/// Quiet period before a burst of file events triggers a reload.
pub(super) const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

impl App {
    pub(super) fn make_book_watcher(model: &Model) -> notify::Result<BookWatcher> {
        BookWatcher::new(&model.book_path, WATCH_DEBOUNCE)
    }

    pub(super) fn handle_message_side_effects(
        model: &mut Model,
        book_watcher: &mut Option<BookWatcher>,
        msg: &Message,
    ) {
        match msg {
            Message::ToggleWatch => {
                if model.watch_enabled {
                    match Self::make_book_watcher(model) {
                        Ok(watcher) => {
                            *book_watcher = Some(watcher);
                            model.show_toast(ToastLevel::Info, "Watching book changes");
                        }
                        Err(err) => {
                            model.watch_enabled = false;
                            *book_watcher = None;
                            model.show_toast(
                                ToastLevel::Warning,
                                format!("Watch unavailable: {err}"),
                            );
                            warn!(path = %model.book_path.display(), %err, "watcher failed");
                        }
                    }
                } else {
                    *book_watcher = None;
                    model.show_toast(ToastLevel::Info, "Watch disabled");
                }
            }
            Message::ForceReload | Message::BookChanged => {
                if let Err(err) = model.reload_from_disk() {
                    model.show_toast(ToastLevel::Error, format!("Reload failed: {err:#}"));
                    warn!(path = %model.book_path.display(), err = %format!("{err:#}"), "reload failed");
                } else {
                    if matches!(msg, Message::ForceReload) {
                        model.show_toast(ToastLevel::Info, "Reloaded");
                    }
                    model.refresh();
                }
            }
            Message::WriteSnapshot => {
                let pages = model.view.collect();
                match write_snapshot(&model.snapshot_path, &pages) {
                    Ok(()) => {
                        info!(path = %model.snapshot_path.display(), pages = pages.len(), "snapshot written");
                        let message = format!("Wrote {}", model.snapshot_path.display());
                        model.show_toast(ToastLevel::Info, message);
                    }
                    Err(err) => {
                        warn!(%err, "snapshot failed");
                        model.show_toast(ToastLevel::Error, format!("Snapshot failed: {err}"));
                    }
                }
            }
            _ => {}
        }
    }
}
