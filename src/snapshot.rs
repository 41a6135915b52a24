//! Pull-based collection of the authoritative page content.

use tracing::warn;

use crate::edit::EditSession;
use crate::surface::PageSurface;

/// Collects the current content of every page on demand.
///
/// In edit mode each page is read from its live surface, so in-progress
/// edits are included. Outside edit mode the source list is returned as is.
/// The first collection of an edit session is kept as the initial snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCollector {
    initial: Option<Vec<String>>,
}

impl SnapshotCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the initial snapshot; the next collection records a new one.
    pub fn begin_session(&mut self) {
        self.initial = None;
    }

    /// Collect content, recording the initial snapshot if none exists yet.
    pub fn collect<S: PageSurface>(
        &mut self,
        session: &EditSession<S>,
        sources: &[String],
    ) -> Vec<String> {
        let snapshot = Self::read(session, sources);
        if self.initial.is_none() {
            self.initial = Some(snapshot.clone());
        }
        snapshot
    }

    /// Read content without touching the initial snapshot.
    pub fn read<S: PageSurface>(session: &EditSession<S>, sources: &[String]) -> Vec<String> {
        if !session.is_editable() {
            return sources.to_vec();
        }
        sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let Some(handle) = session.handle(index) else {
                    return source.clone();
                };
                handle.read_current().unwrap_or_else(|err| {
                    warn!(page = index, %err, "falling back to source content");
                    source.clone()
                })
            })
            .collect()
    }

    /// The snapshot taken at the start of the session.
    pub fn initial(&self) -> Option<&[String]> {
        self.initial.as_deref()
    }

    /// Whether `current` differs from the initial snapshot.
    pub fn has_changes(&self, current: &[String]) -> bool {
        self.initial
            .as_deref()
            .is_some_and(|initial| initial != current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::Interaction;
    use crate::surface::MemorySurface;

    fn pages(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_read_only_collect_returns_sources() {
        let session: EditSession<MemorySurface> = EditSession::new();
        let sources = pages(&["A", "B", "C"]);
        let mut collector = SnapshotCollector::new();
        assert_eq!(collector.collect(&session, &sources), sources);
    }

    #[test]
    fn test_editable_collect_without_edits_matches_hydration() {
        let mut session = EditSession::new();
        let sources = pages(&["<p>A</p>", "B"]);
        session.set_editable(true, &sources, &mut MemorySurface::new);
        let mut collector = SnapshotCollector::new();
        assert_eq!(collector.collect(&session, &sources), sources);
        assert!(!collector.has_changes(&sources));
    }

    #[test]
    fn test_collect_reads_live_edits() {
        let mut session = EditSession::new();
        let sources = pages(&["A", "B"]);
        session.set_editable(true, &sources, &mut MemorySurface::new);
        let mut collector = SnapshotCollector::new();
        collector.collect(&session, &sources);

        session.surface_mut(0).unwrap().type_text("!");
        session.interact(0, Interaction::Input);
        let current = collector.collect(&session, &sources);
        assert_eq!(current, pages(&["A!", "B"]));
        assert_eq!(collector.initial(), Some(sources.as_slice()));
        assert!(collector.has_changes(&current));
    }

    #[test]
    fn test_detached_surface_falls_back_to_source() {
        let mut session = EditSession::new();
        let sources = pages(&["A", "B"]);
        session.set_editable(true, &sources, &mut MemorySurface::new);
        session.surface_mut(1).unwrap().type_text("?");
        session.surface_mut(0).unwrap().type_text("!");
        session.surface_mut(1).unwrap().detach();
        let collected = SnapshotCollector::read(&session, &sources);
        assert_eq!(collected, pages(&["A!", "B"]));
    }

    #[test]
    fn test_begin_session_resets_initial() {
        let session: EditSession<MemorySurface> = EditSession::new();
        let mut collector = SnapshotCollector::new();
        collector.collect(&session, &pages(&["A"]));
        collector.begin_session();
        assert!(collector.initial().is_none());
        collector.collect(&session, &pages(&["Z"]));
        assert_eq!(collector.initial(), Some(pages(&["Z"]).as_slice()));
    }
}
