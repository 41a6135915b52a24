//! Sheet geometry and sparse-page classification.
//!
//! A sheet is sized from the device dimensions the host asks for: the width
//! is capped at [`MAX_PAGE_WIDTH_PX`] and the fixed height follows the A4
//! aspect ratio. After the host lays sheets out at their natural height it
//! reports measurements back through a [`LayoutReader`], and pages shorter than
//! the sparse threshold can be rendered at the fixed height instead.

use std::collections::BTreeSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use tracing::debug;

/// Widest sheet the renderer will lay out.
pub const MAX_PAGE_WIDTH_PX: f32 = 860.0;
/// Shortest minimum sheet height.
pub const MIN_PAGE_HEIGHT_PX: f32 = 980.0;
/// Pages whose natural height is below this are sparse.
pub const DEFAULT_SPARSE_THRESHOLD_PX: f32 = 820.0;

const A4_RATIO: f32 = 297.0 / 210.0;

/// Viewport size requested by the host, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceDimensions {
    pub width: f32,
    pub height: f32,
}

impl DeviceDimensions {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for DeviceDimensions {
    fn default() -> Self {
        Self::new(MAX_PAGE_WIDTH_PX, MIN_PAGE_HEIGHT_PX)
    }
}

/// Derived sheet dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_min_height: f32,
    pub a4_height: f32,
}

impl PageGeometry {
    /// Compute sheet geometry for a device.
    ///
    /// ```
    /// use folio::metrics::{DeviceDimensions, PageGeometry};
    ///
    /// let geometry = PageGeometry::from_device(DeviceDimensions::new(1200.0, 700.0));
    /// assert_eq!(geometry.page_width, 860.0);
    /// assert_eq!(geometry.page_min_height, 980.0);
    /// assert_eq!(geometry.a4_height, 1216.0);
    /// ```
    pub fn from_device(device: DeviceDimensions) -> Self {
        let page_width = device.width.min(MAX_PAGE_WIDTH_PX);
        Self {
            page_width,
            page_min_height: device.height.max(MIN_PAGE_HEIGHT_PX),
            a4_height: (page_width * A4_RATIO).round(),
        }
    }

    /// Height used for sparse pages when auto-fix is on.
    pub fn target_fixed_height(&self, override_px: Option<f32>) -> f32 {
        override_px
            .filter(|px| px.is_finite() && *px > 0.0)
            .unwrap_or(self.a4_height)
    }
}

/// How tall a sheet is rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetHeight {
    /// Natural content height.
    Auto,
    /// Fixed height in pixels.
    Fixed(f32),
}

/// Raw sizes read from a laid-out sheet.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    pub scroll_height: f32,
    pub bounding_height: f32,
}

impl Measurement {
    /// The height used for classification: scroll height, or the bounding
    /// height when the scroll height reads zero. `None` when both are zero.
    pub fn effective_height(self) -> Option<f32> {
        let height = if self.scroll_height > 0.0 {
            self.scroll_height
        } else {
            self.bounding_height
        };
        (height.is_finite() && height > 0.0).then_some(height)
    }
}

/// Reads natural sheet heights after layout.
///
/// Implementations return `None` for sheets that are not mounted or not yet
/// laid out.
pub trait LayoutReader {
    fn measure(&self, index: usize) -> Option<Measurement>;
}

impl<F> LayoutReader for F
where
    F: Fn(usize) -> Option<Measurement>,
{
    fn measure(&self, index: usize) -> Option<Measurement> {
        self(index)
    }
}

/// Everything that invalidates sparse classification when it changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureInputs<'a> {
    pub pages: &'a [String],
    pub font_size: f32,
    pub page_width: f32,
    pub threshold: f32,
    pub header_template: Option<&'a str>,
    pub footer_template: Option<&'a str>,
    pub background_image: Option<&'a str>,
    pub editable: bool,
}

impl MeasureInputs<'_> {
    /// Fingerprint of the inputs.
    pub fn key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.pages.hash(&mut hasher);
        self.font_size.to_bits().hash(&mut hasher);
        self.page_width.to_bits().hash(&mut hasher);
        self.threshold.to_bits().hash(&mut hasher);
        self.header_template.hash(&mut hasher);
        self.footer_template.hash(&mut hasher);
        self.background_image.hash(&mut hasher);
        self.editable.hash(&mut hasher);
        hasher.finish()
    }
}

/// Handle for one post-layout measurement pass.
///
/// A ticket is only honoured while its generation is current, so a pass
/// scheduled for an old page set is dropped when it finally runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureTicket {
    generation: u64,
}

/// Tracks which pages are sparse.
#[derive(Debug, Clone, Default)]
pub struct SparseClassifier {
    key: Option<u64>,
    generation: u64,
    pending: bool,
    sparse: BTreeSet<usize>,
    /// Pages currently drawn at the fixed height; their measurements would
    /// reflect the fix rather than the content.
    fixed: BTreeSet<usize>,
}

impl SparseClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset classification if the inputs changed since the last call.
    ///
    /// Returns `true` when a new measurement pass is required.
    pub fn invalidate(&mut self, inputs: &MeasureInputs<'_>) -> bool {
        let key = inputs.key();
        if self.key == Some(key) {
            return false;
        }
        self.key = Some(key);
        self.generation = self.generation.wrapping_add(1);
        self.sparse.clear();
        self.fixed.clear();
        self.pending = true;
        debug!(generation = self.generation, "sparse classification invalidated");
        true
    }

    /// Cancel outstanding tickets without changing the fingerprint.
    pub fn cancel_pending(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Whether a measurement pass is still owed.
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Ticket for the next post-layout pass.
    pub const fn schedule(&self) -> MeasureTicket {
        MeasureTicket {
            generation: self.generation,
        }
    }

    /// Run a measurement pass.
    ///
    /// Returns `true` if the sparse set changed. Stale tickets and passes
    /// that are not pending are ignored, so repeated calls are stable.
    pub fn measure(
        &mut self,
        ticket: MeasureTicket,
        page_count: usize,
        reader: &impl LayoutReader,
        threshold: f32,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "dropping stale measurement"
            );
            return false;
        }
        if !self.pending {
            return false;
        }

        let before = self.sparse.clone();
        let mut incomplete = false;
        self.sparse.retain(|index| *index < page_count);
        self.fixed.retain(|index| *index < page_count);
        for index in 0..page_count {
            if self.fixed.contains(&index) {
                continue;
            }
            let Some(height) = reader.measure(index).and_then(Measurement::effective_height)
            else {
                incomplete = true;
                continue;
            };
            if height < threshold {
                self.sparse.insert(index);
            } else {
                self.sparse.remove(&index);
            }
        }

        self.pending = incomplete;
        debug!(
            pages = page_count,
            sparse = self.sparse.len(),
            incomplete,
            "measurement pass"
        );
        before != self.sparse
    }

    /// Whether a page was classified sparse.
    pub fn is_sparse(&self, index: usize) -> bool {
        self.sparse.contains(&index)
    }

    /// All sparse page indices.
    pub const fn sparse_pages(&self) -> &BTreeSet<usize> {
        &self.sparse
    }

    /// Height mode for a page, recording pages that end up fixed.
    pub fn sheet_height(&mut self, index: usize, autofix: bool, target: f32) -> SheetHeight {
        if autofix && self.sparse.contains(&index) {
            self.fixed.insert(index);
            SheetHeight::Fixed(target)
        } else {
            self.fixed.remove(&index);
            SheetHeight::Auto
        }
    }
}
