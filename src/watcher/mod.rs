//! Reloading the book file when it changes on disk.
//!
//! notify delivers events on its backend thread; they are drained from the
//! event loop and settle for a quiet period before a reload is reported.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

/// Waits for a burst of changes to go quiet.
#[derive(Debug, Clone, Copy)]
struct Settle {
    quiet: Duration,
    last_change: Option<Instant>,
}

impl Settle {
    const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_change: None,
        }
    }

    const fn touch(&mut self, now: Instant) {
        self.last_change = Some(now);
    }

    /// `true` once, when the last change is at least `quiet` old.
    fn fire(&mut self, now: Instant) -> bool {
        match self.last_change {
            Some(at) if now.saturating_duration_since(at) >= self.quiet => {
                self.last_change = None;
                true
            }
            _ => false,
        }
    }
}

/// Decides which file system events concern the book.
#[derive(Debug, Clone)]
struct BookFilter {
    dir: PathBuf,
    file: PathBuf,
    name: Option<OsString>,
}

impl BookFilter {
    fn new(file: PathBuf) -> Self {
        // Editors often save by rename, so the directory is watched too.
        let dir = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let name = file.file_name().map(std::ffi::OsStr::to_os_string);
        Self { dir, file, name }
    }

    fn matches(&self, event: &Event) -> bool {
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        event.paths.iter().any(|path| {
            *path == self.file
                || *path == self.dir
                || self
                    .name
                    .as_deref()
                    .is_some_and(|name| path.file_name() == Some(name))
        })
    }
}

/// Watches the book file and reports settled changes.
pub struct BookWatcher {
    _backend: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    filter: BookFilter,
    settle: Settle,
}

impl BookWatcher {
    /// Watch the book at `path`; changes are reported after `quiet` without
    /// further events.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be created or the directory
    /// cannot be watched.
    pub fn new(path: impl AsRef<Path>, quiet: Duration) -> notify::Result<Self> {
        let path = path.as_ref();
        // Event paths from the OS are canonical.
        let file = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let filter = BookFilter::new(file);

        let (tx, events) = channel();
        let mut backend = notify::recommended_watcher(move |res| {
            // The receiver is gone once the watcher is dropped.
            tx.send(res).ok();
        })?;
        backend.watch(&filter.dir, RecursiveMode::NonRecursive)?;
        debug!(book = %filter.file.display(), dir = %filter.dir.display(), "watching book");

        Ok(Self {
            _backend: backend,
            events,
            filter,
            settle: Settle::new(quiet),
        })
    }

    /// Drain pending events. Returns `true` once a change has settled.
    pub fn take_change_ready(&mut self) -> bool {
        let now = Instant::now();
        let mut seen = 0usize;
        for result in self.events.try_iter() {
            match result {
                Ok(event) if self.filter.matches(&event) => {
                    seen += 1;
                    self.settle.touch(now);
                }
                Ok(event) => trace!(kind = ?event.kind, paths = ?event.paths, "ignoring fs event"),
                Err(err) => warn!(%err, "watch error"),
            }
        }
        if seen > 0 {
            debug!(events = seen, "book changed on disk");
        }
        self.settle.fire(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, ModifyKind};
    use tempfile::tempdir;

    fn event(kind: EventKind, path: PathBuf) -> Event {
        Event::new(kind).add_path(path)
    }

    fn filter() -> BookFilter {
        BookFilter::new(PathBuf::from("/books/cells.json"))
    }

    #[test]
    fn test_book_and_directory_events_match() {
        let filter = filter();
        let modify = EventKind::Modify(ModifyKind::Any);
        assert!(filter.matches(&event(modify, PathBuf::from("/books/cells.json"))));
        assert!(filter.matches(&event(modify, PathBuf::from("/books"))));
        // Renamed into place from a temp directory.
        assert!(filter.matches(&event(modify, PathBuf::from("/tmp/x/cells.json"))));
    }

    #[test]
    fn test_siblings_and_reads_are_ignored() {
        let filter = filter();
        assert!(!filter.matches(&event(
            EventKind::Modify(ModifyKind::Any),
            PathBuf::from("/books/notes.txt")
        )));
        assert!(!filter.matches(&event(
            EventKind::Access(AccessKind::Any),
            PathBuf::from("/books/cells.json")
        )));
    }

    #[test]
    fn test_bare_file_name_watches_current_dir() {
        assert_eq!(BookFilter::new(PathBuf::from("book.json")).dir, PathBuf::from("."));
    }

    #[test]
    fn test_settle_waits_for_quiet_period() {
        let start = Instant::now();
        let mut settle = Settle::new(Duration::from_millis(200));
        assert!(!settle.fire(start));

        settle.touch(start);
        assert!(!settle.fire(start + Duration::from_millis(100)));
        settle.touch(start + Duration::from_millis(150));
        assert!(!settle.fire(start + Duration::from_millis(300)));
        assert!(settle.fire(start + Duration::from_millis(350)));
        assert!(!settle.fire(start + Duration::from_millis(900)));
    }

    #[test]
    fn test_book_rewrite_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().canonicalize().unwrap().join("book.json");
        std::fs::write(&path, r#"{"pages": ["A"]}"#).unwrap();

        let mut watcher = BookWatcher::new(&path, Duration::from_millis(200)).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        std::fs::write(&path, r#"{"pages": ["A2"]}"#).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut detected = false;
        while Instant::now() < deadline && !detected {
            std::thread::sleep(Duration::from_millis(100));
            detected = watcher.take_change_ready();
        }
        assert!(detected, "book rewrite should be reported within 5 seconds");
    }
}
