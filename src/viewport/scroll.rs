use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use super::{IntersectionEntry, ObserverOptions, ViewportObserver};

/// The scroll container holding the stacked sheets, measured in rows.
///
/// ```
/// use folio::viewport::ScrollViewport;
///
/// let mut sheets = ScrollViewport::new(80, 20, 50);
/// sheets.page_down();
/// assert_eq!(sheets.visible_range(), 20..40);
/// sheets.go_to_bottom();
/// assert_eq!(sheets.offset(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrollViewport {
    width: u16,
    height: u16,
    offset: usize,
    total_rows: usize,
}

impl ScrollViewport {
    pub const fn new(width: u16, height: u16, total_rows: usize) -> Self {
        Self {
            width,
            height,
            offset: 0,
            total_rows,
        }
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub const fn width(&self) -> u16 {
        self.width
    }

    pub const fn height(&self) -> u16 {
        self.height
    }

    pub const fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Rows currently on screen, clamped to the content.
    pub fn visible_range(&self) -> Range<usize> {
        self.offset..self.total_rows.min(self.offset + self.rows_on_screen())
    }

    /// How far down the content the view is, 0 to 100. Content that fits
    /// on screen counts as fully read.
    pub fn scroll_percent(&self) -> u8 {
        let limit = self.limit();
        if limit == 0 {
            return 100;
        }
        let percent = self.offset.saturating_mul(100).saturating_add(limit / 2) / limit;
        u8::try_from(percent.min(100)).unwrap_or(100)
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.go_to_row(self.offset.saturating_sub(n));
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.go_to_row(self.offset.saturating_add(n));
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.rows_on_screen());
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.rows_on_screen());
    }

    pub fn go_to_top(&mut self) {
        self.go_to_row(0);
    }

    pub fn go_to_bottom(&mut self) {
        self.go_to_row(usize::MAX);
    }

    /// Put `row` at the top of the viewport, as far as the content allows.
    pub fn go_to_row(&mut self, row: usize) {
        self.offset = row.min(self.limit());
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.go_to_row(self.offset);
    }

    /// Update the content height after a relayout.
    pub fn set_total_rows(&mut self, total: usize) {
        self.total_rows = total;
        self.go_to_row(self.offset);
    }

    const fn rows_on_screen(&self) -> usize {
        self.height as usize
    }

    /// Largest offset that still fills the screen.
    const fn limit(&self) -> usize {
        self.total_rows.saturating_sub(self.rows_on_screen())
    }
}

/// Vertical placement of one sheet in the scroll container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetExtent {
    pub top: usize,
    pub height: usize,
}

/// Computes intersections from sheet extents and the scroll position.
///
/// Like a browser intersection observer, an entry is queued only when a sheet
/// crosses one of the thresholds or starts/stops intersecting, plus once for
/// every newly observed sheet.
#[derive(Debug, Clone, Default)]
pub struct GeometryObserver {
    options: ObserverOptions,
    observed: BTreeSet<usize>,
    last: BTreeMap<usize, (usize, bool)>,
    queued: Vec<IntersectionEntry>,
}

impl GeometryObserver {
    pub fn new(options: ObserverOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Recompute intersections for the current layout and scroll position.
    pub fn update(&mut self, extents: &[SheetExtent], viewport: &ScrollViewport) {
        let height = f32::from(viewport.height());
        let offset = viewport.offset() as f32;
        let root_top = offset - self.options.root_margin.top * height;
        let root_bottom = offset + height + self.options.root_margin.bottom * height;

        for &page in &self.observed {
            let Some(extent) = extents.get(page) else {
                continue;
            };
            let ratio = intersection_ratio(*extent, root_top, root_bottom);
            let is_intersecting = ratio > 0.0;
            let bucket = self
                .options
                .thresholds
                .iter()
                .filter(|threshold| ratio >= **threshold)
                .count();
            let state = (bucket, is_intersecting);
            if self.last.get(&page) != Some(&state) {
                self.last.insert(page, state);
                self.queued.push(IntersectionEntry {
                    page,
                    ratio,
                    is_intersecting,
                });
            }
        }
    }

    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }
}

fn intersection_ratio(extent: SheetExtent, root_top: f32, root_bottom: f32) -> f32 {
    if extent.height == 0 {
        return 0.0;
    }
    let top = extent.top as f32;
    let bottom = (extent.top + extent.height) as f32;
    let overlap = (bottom.min(root_bottom) - top.max(root_top)).max(0.0);
    (overlap / extent.height as f32).clamp(0.0, 1.0)
}

impl ViewportObserver for GeometryObserver {
    fn observe(&mut self, page: usize) {
        self.observed.insert(page);
    }

    fn unobserve(&mut self, page: usize) {
        self.observed.remove(&page);
        self.last.remove(&page);
        self.queued.retain(|entry| entry.page != page);
    }

    fn take_entries(&mut self) -> Vec<IntersectionEntry> {
        std::mem::take(&mut self.queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::RootMargin;

    fn stack(heights: &[usize]) -> Vec<SheetExtent> {
        let mut top = 0;
        heights
            .iter()
            .map(|height| {
                let extent = SheetExtent {
                    top,
                    height: *height,
                };
                top += height;
                extent
            })
            .collect()
    }

    fn plain_options() -> ObserverOptions {
        ObserverOptions {
            root_margin: RootMargin {
                top: 0.0,
                bottom: 0.0,
            },
            thresholds: vec![0.33, 0.66, 1.0],
        }
    }

    #[test]
    fn test_scroll_down_clamps_to_max() {
        let mut vp = ScrollViewport::new(80, 24, 100);
        vp.scroll_down(1000);
        assert_eq!(vp.offset(), 76);
    }

    #[test]
    fn test_scroll_up_clamps_to_zero() {
        let mut vp = ScrollViewport::new(80, 24, 100);
        vp.scroll_down(10);
        vp.scroll_up(100);
        assert_eq!(vp.offset(), 0);
    }

    #[test]
    fn test_page_down_and_up() {
        let mut vp = ScrollViewport::new(80, 24, 100);
        vp.page_down();
        assert_eq!(vp.offset(), 24);
        vp.page_up();
        assert_eq!(vp.offset(), 0);
    }

    #[test]
    fn test_go_to_row_clamps() {
        let mut vp = ScrollViewport::new(80, 24, 100);
        vp.go_to_row(90);
        assert_eq!(vp.offset(), 76);
    }

    #[test]
    fn test_scroll_percent_short_content() {
        let vp = ScrollViewport::new(80, 24, 10);
        assert_eq!(vp.scroll_percent(), 100);
    }

    #[test]
    fn test_set_total_rows_adjusts_offset() {
        let mut vp = ScrollViewport::new(80, 24, 100);
        vp.scroll_down(80);
        vp.set_total_rows(50);
        assert_eq!(vp.offset(), 26);
    }

    #[test]
    fn test_first_update_reports_every_observed_sheet() {
        let mut observer = GeometryObserver::new(plain_options());
        for page in 0..3 {
            observer.observe(page);
        }
        let vp = ScrollViewport::new(80, 20, 60);
        observer.update(&stack(&[20, 20, 20]), &vp);
        let entries = observer.take_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].ratio, 1.0);
        assert!(!entries[1].is_intersecting);
    }

    #[test]
    fn test_small_scroll_without_crossing_is_silent() {
        let mut observer = GeometryObserver::new(plain_options());
        observer.observe(0);
        observer.observe(1);
        let mut vp = ScrollViewport::new(80, 20, 200);
        let extents = stack(&[100, 100]);
        observer.update(&extents, &vp);
        observer.take_entries();
        vp.scroll_down(1);
        observer.update(&extents, &vp);
        assert!(observer.take_entries().is_empty());
    }

    #[test]
    fn test_crossing_into_next_sheet_reports_it() {
        let mut observer = GeometryObserver::new(plain_options());
        observer.observe(0);
        observer.observe(1);
        let mut vp = ScrollViewport::new(80, 20, 40);
        let extents = stack(&[20, 20]);
        observer.update(&extents, &vp);
        observer.take_entries();
        vp.scroll_down(15);
        observer.update(&extents, &vp);
        let entries = observer.take_entries();
        let second = entries.iter().find(|e| e.page == 1).unwrap();
        assert!(second.is_intersecting);
        assert!(second.ratio >= 0.66);
    }

    #[test]
    fn test_bottom_margin_shrinks_root() {
        let mut observer = GeometryObserver::new(ObserverOptions::default());
        observer.observe(0);
        observer.observe(1);
        let vp = ScrollViewport::new(80, 20, 40);
        // Sheet 1 starts at row 14, below the top 60% of the viewport.
        observer.update(&stack(&[14, 26]), &vp);
        let entries = observer.take_entries();
        let second = entries.iter().find(|e| e.page == 1).unwrap();
        assert!(!second.is_intersecting);
    }

    #[test]
    fn test_unobserve_drops_queued_entries() {
        let mut observer = GeometryObserver::new(plain_options());
        observer.observe(0);
        let vp = ScrollViewport::new(80, 20, 20);
        observer.update(&stack(&[20]), &vp);
        observer.unobserve(0);
        assert!(observer.take_entries().is_empty());
        assert_eq!(observer.observed_count(), 0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn scroll_never_exceeds_bounds(
                total in 1..10000usize,
                height in 1..100u16,
                amount in 0..10000usize,
            ) {
                let mut vp = ScrollViewport::new(80, height, total);
                vp.scroll_down(amount);
                prop_assert!(vp.offset() <= total.saturating_sub(height as usize));
            }

            #[test]
            fn ratios_stay_in_unit_interval(
                top in 0..500usize,
                height in 0..500usize,
                offset in 0..1000usize,
            ) {
                let ratio = intersection_ratio(
                    SheetExtent { top, height },
                    offset as f32,
                    offset as f32 + 40.0,
                );
                prop_assert!((0.0..=1.0).contains(&ratio));
            }
        }
    }
}
