//! Tracking which page sheet is in view.
//!
//! The host supplies a [`ViewportObserver`], anything that can report how
//! much of each observed sheet intersects the scroll container. The
//! [`ViewportTracker`] turns those reports into a single "current page".

mod scroll;

pub use scroll::{GeometryObserver, ScrollViewport, SheetExtent};

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

/// One intersection report for a sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    /// Zero-based page index.
    pub page: usize,
    /// Visible fraction of the sheet, `0.0..=1.0`.
    pub ratio: f32,
    pub is_intersecting: bool,
}

/// Margins applied to the scroll container before computing intersections,
/// as fractions of its height. Negative values shrink the root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: f32,
    pub bottom: f32,
}

/// Observer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    pub root_margin: RootMargin,
    pub thresholds: Vec<f32>,
}

impl Default for ObserverOptions {
    /// Ignore the bottom 40% of the container so a page becomes current
    /// slightly before it is centred.
    fn default() -> Self {
        Self {
            root_margin: RootMargin {
                top: 0.0,
                bottom: -0.4,
            },
            thresholds: vec![0.33, 0.66, 1.0],
        }
    }
}

/// Host capability reporting sheet visibility.
pub trait ViewportObserver {
    fn observe(&mut self, page: usize);
    fn unobserve(&mut self, page: usize);
    /// Drain the reports produced since the last call.
    fn take_entries(&mut self) -> Vec<IntersectionEntry>;
}

/// Picks the most visible sheet.
#[derive(Debug, Clone, Default)]
pub struct ViewportTracker {
    observed: BTreeSet<usize>,
    ratios: BTreeMap<usize, f32>,
    reported: Option<usize>,
    suspended: bool,
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe `page_count` sheets, dropping every earlier observation.
    pub fn attach(&mut self, observer: &mut dyn ViewportObserver, page_count: usize) {
        self.detach(observer);
        for page in 0..page_count {
            observer.observe(page);
            self.observed.insert(page);
        }
    }

    /// Stop observing everything.
    pub fn detach(&mut self, observer: &mut dyn ViewportObserver) {
        for page in std::mem::take(&mut self.observed) {
            observer.unobserve(page);
        }
        self.ratios.clear();
    }

    /// Suspend or resume tracking. Resuming forgets the last report so the
    /// next batch is reported even if the page did not change.
    pub fn set_suspended(&mut self, suspended: bool) {
        if self.suspended == suspended {
            return;
        }
        self.suspended = suspended;
        self.ratios.clear();
        self.reported = None;
    }

    pub const fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Fold a batch of entries in.
    ///
    /// Returns the 1-based page number to report when the current page
    /// changed. Entries for pages that are no longer observed are ignored.
    pub fn handle(&mut self, entries: &[IntersectionEntry]) -> Option<usize> {
        if self.suspended {
            return None;
        }
        for entry in entries {
            if !self.observed.contains(&entry.page) {
                continue;
            }
            if entry.is_intersecting {
                self.ratios.insert(entry.page, entry.ratio);
            } else {
                self.ratios.remove(&entry.page);
            }
        }

        let best = self.best()?;
        if self.reported == Some(best) {
            return None;
        }
        self.reported = Some(best);
        debug!(page = best + 1, "page in view");
        Some(best + 1)
    }

    /// Highest ratio wins; ties go to the lowest index.
    fn best(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (&page, &ratio) in &self.ratios {
            if best.is_none_or(|(_, top)| ratio > top) {
                best = Some((page, ratio));
            }
        }
        best.map(|(page, _)| page)
    }

    /// Last reported page, 1-based.
    pub fn current_page(&self) -> Option<usize> {
        self.reported.map(|page| page + 1)
    }
}
