//! The document view: page sheets with theme chrome, edit session,
//! viewport tracking and sparse-page handling wired together.

use tracing::debug;

use crate::edit::{EditSession, HydrationState, Interaction};
use crate::metrics::{
    DEFAULT_SPARSE_THRESHOLD_PX, DeviceDimensions, LayoutReader, MeasureInputs, MeasureTicket,
    PageGeometry, SheetHeight, SparseClassifier,
};
use crate::snapshot::SnapshotCollector;
use crate::surface::PageSurface;
use crate::viewport::{ViewportObserver, ViewportTracker};

use super::template::{Chrome, Placeholders, footer_chrome, header_chrome};
use super::types::{DocumentMeta, PageState, Theme};

/// Default body font size in pixels.
pub const DEFAULT_FONT_SIZE_PX: f32 = 16.0;

/// Everything the host passes into a [`DocView`].
#[derive(Debug, Clone, PartialEq)]
pub struct DocViewProps {
    pub pages: Vec<String>,
    pub theme: Option<Theme>,
    pub meta: DocumentMeta,
    pub device: DeviceDimensions,
    pub editable: bool,
    /// 1-based selected page.
    pub selected_page: Option<usize>,
    pub cover_image: Option<String>,
    pub font_size: f32,
    pub auto_fix_sparse_pages: bool,
    pub sparse_threshold_px: f32,
    pub fixed_page_height_px: Option<f32>,
}

impl Default for DocViewProps {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            theme: None,
            meta: DocumentMeta::default(),
            device: DeviceDimensions::default(),
            editable: false,
            selected_page: None,
            cover_image: None,
            font_size: DEFAULT_FONT_SIZE_PX,
            auto_fix_sparse_pages: true,
            sparse_threshold_px: DEFAULT_SPARSE_THRESHOLD_PX,
            fixed_page_height_px: None,
        }
    }
}

/// Notifications for the host, drained after each update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocEvent {
    /// A page was selected for editing (1-based).
    SelectPage(usize),
    /// The most visible page changed (1-based).
    PageInView(usize),
    /// An image was clicked; open it in the magnifier.
    ImageClick(String),
}

/// What the user clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    /// Anywhere on a sheet except an image (0-based index).
    Page(usize),
    /// An embedded image on a sheet.
    Image { page: usize, url: String },
    /// The cover image above the sheets.
    Cover,
}

/// Content shown on a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetContent {
    /// Formatted, read-only source.
    ReadOnly(String),
    /// Live markup of the editable surface.
    Editable(String),
}

impl SheetContent {
    pub fn markup(&self) -> &str {
        match self {
            Self::ReadOnly(text) | Self::Editable(text) => text,
        }
    }
}

/// A laid-out page sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub index: usize,
    /// 1-based page number.
    pub number: usize,
    pub total: usize,
    pub width: f32,
    pub height: SheetHeight,
    pub top_bars: Vec<String>,
    pub header: Chrome,
    pub content: SheetContent,
    pub footer: Chrome,
    pub bottom_bars: Vec<String>,
    pub background: Option<String>,
    pub selected: bool,
    pub sparse: bool,
    pub dirty: bool,
}

fn measure_inputs<'a>(props: &'a DocViewProps, geometry: &PageGeometry) -> MeasureInputs<'a> {
    let theme = props.theme.as_ref();
    MeasureInputs {
        pages: &props.pages,
        font_size: props.font_size,
        page_width: geometry.page_width,
        threshold: props.sparse_threshold_px,
        header_template: theme.and_then(Theme::header),
        footer_template: theme.and_then(Theme::footer),
        background_image: theme.and_then(|t| t.page_bg_image.as_deref()),
        editable: props.editable,
    }
}

/// Renders a book's pages as sheets.
///
/// `S` is the host's editable surface and `O` its viewport observer.
pub struct DocView<S, O> {
    props: DocViewProps,
    geometry: PageGeometry,
    classifier: SparseClassifier,
    session: EditSession<S>,
    tracker: ViewportTracker,
    observer: O,
    collector: SnapshotCollector,
    mount: Box<dyn FnMut(usize) -> S>,
    events: Vec<DocEvent>,
}

impl<S, O> std::fmt::Debug for DocView<S, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocView")
            .field("pages", &self.props.pages.len())
            .field("editable", &self.props.editable)
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}

impl<S: PageSurface, O: ViewportObserver> DocView<S, O> {
    /// Create a view. `mount` builds a fresh surface for a page index.
    pub fn new(
        props: DocViewProps,
        observer: O,
        mount: impl FnMut(usize) -> S + 'static,
    ) -> Self {
        let geometry = PageGeometry::from_device(props.device);
        let mut view = Self {
            props,
            geometry,
            classifier: SparseClassifier::new(),
            session: EditSession::new(),
            tracker: ViewportTracker::new(),
            observer,
            collector: SnapshotCollector::new(),
            mount: Box::new(mount),
            events: Vec::new(),
        };
        view.tracker
            .attach(&mut view.observer, view.props.pages.len());
        let editable = view.props.editable;
        view.props.editable = false;
        view.set_editable(editable);
        view.invalidate();
        view
    }

    pub const fn props(&self) -> &DocViewProps {
        &self.props
    }

    pub const fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn page_count(&self) -> usize {
        self.props.pages.len()
    }

    pub fn cover(&self) -> Option<&str> {
        self.props.cover_image.as_deref()
    }

    pub const fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub const fn session(&self) -> &EditSession<S> {
        &self.session
    }

    fn invalidate(&mut self) {
        self.classifier
            .invalidate(&measure_inputs(&self.props, &self.geometry));
    }

    /// Replace the page list. Dirty pages keep their content.
    pub fn set_pages(&mut self, pages: Vec<String>) {
        let count_changed = pages.len() != self.props.pages.len();
        self.props.pages = pages;
        self.session.sync(&self.props.pages, &mut *self.mount);
        if count_changed {
            self.tracker
                .attach(&mut self.observer, self.props.pages.len());
            if self
                .props
                .selected_page
                .is_some_and(|page| page > self.props.pages.len())
            {
                self.props.selected_page = None;
            }
        }
        self.classifier.cancel_pending();
        self.invalidate();
    }

    pub fn set_theme(&mut self, theme: Option<Theme>) {
        self.props.theme = theme;
        self.invalidate();
    }

    pub fn set_meta(&mut self, meta: DocumentMeta) {
        self.props.meta = meta;
    }

    pub fn set_cover(&mut self, cover: Option<String>) {
        self.props.cover_image = cover;
    }

    pub fn set_device(&mut self, device: DeviceDimensions) {
        self.props.device = device;
        self.geometry = PageGeometry::from_device(device);
        self.invalidate();
    }

    pub fn set_font_size(&mut self, font_size: f32) {
        self.props.font_size = font_size;
        self.invalidate();
    }

    pub fn set_autofix(&mut self, enabled: bool) {
        self.props.auto_fix_sparse_pages = enabled;
    }

    pub fn set_sparse_threshold(&mut self, threshold_px: f32) {
        self.props.sparse_threshold_px = threshold_px;
        self.invalidate();
    }

    pub const fn set_fixed_page_height(&mut self, height_px: Option<f32>) {
        self.props.fixed_page_height_px = height_px;
    }

    /// Set the 1-based selected page.
    pub fn set_selected_page(&mut self, page: Option<usize>) {
        let page = page.filter(|p| (1..=self.props.pages.len()).contains(p));
        self.props.selected_page = page;
        self.session.select(page.map(|p| p - 1));
    }

    /// Enter or leave edit mode.
    ///
    /// Entering hydrates every page fresh and records the initial snapshot;
    /// viewport tracking is suspended for as long as editing lasts.
    pub fn set_editable(&mut self, editable: bool) {
        if editable == self.props.editable {
            return;
        }
        self.props.editable = editable;
        self.session
            .set_editable(editable, &self.props.pages, &mut *self.mount);
        self.tracker.set_suspended(editable);
        if editable {
            self.collector.begin_session();
            self.collector.collect(&self.session, &self.props.pages);
        } else {
            self.props.selected_page = None;
            // Observers only report changes; start over so every sheet is
            // reported again.
            self.tracker
                .attach(&mut self.observer, self.props.pages.len());
        }
        self.classifier.cancel_pending();
        self.invalidate();
    }

    /// Ticket for a post-layout measurement, if one is owed.
    pub fn schedule_measurement(&self) -> Option<MeasureTicket> {
        self.classifier
            .is_pending()
            .then(|| self.classifier.schedule())
    }

    /// Apply a post-layout measurement. Returns `true` if any page changed
    /// classification.
    pub fn apply_measurement(&mut self, ticket: MeasureTicket, reader: &impl LayoutReader) -> bool {
        let changed = self.classifier.measure(
            ticket,
            self.props.pages.len(),
            reader,
            self.props.sparse_threshold_px,
        );
        if changed {
            debug!(sparse = ?self.classifier.sparse_pages(), "sparse pages changed");
        }
        changed
    }

    pub fn is_sparse(&self, index: usize) -> bool {
        self.classifier.is_sparse(index)
    }

    /// Lay out every sheet.
    pub fn sheets(&mut self) -> Vec<Sheet> {
        let total = self.props.pages.len();
        let target = self
            .geometry
            .target_fixed_height(self.props.fixed_page_height_px);
        let autofix = self.props.auto_fix_sparse_pages;
        let theme = self.props.theme.as_ref();
        let bars = theme.map(Theme::accent_bars).unwrap_or_default();

        let mut sheets = Vec::with_capacity(total);
        for (index, source) in self.props.pages.iter().enumerate() {
            let number = index + 1;
            let values = Placeholders {
                page: number,
                total,
                meta: &self.props.meta,
            };
            let content = if self.props.editable {
                self.session.handle(index).map_or_else(
                    || SheetContent::ReadOnly(source.clone()),
                    |handle| {
                        SheetContent::Editable(
                            handle.read_current().unwrap_or_else(|_| source.clone()),
                        )
                    },
                )
            } else {
                SheetContent::ReadOnly(source.clone())
            };
            sheets.push(Sheet {
                index,
                number,
                total,
                width: self.geometry.page_width,
                height: self.classifier.sheet_height(index, autofix, target),
                top_bars: bars.clone(),
                header: header_chrome(theme, &values),
                content,
                footer: footer_chrome(theme, &values),
                bottom_bars: bars.iter().rev().cloned().collect(),
                background: theme.and_then(|t| t.background_for(index).map(str::to_string)),
                selected: self.props.editable && self.props.selected_page == Some(number),
                sparse: self.classifier.is_sparse(index),
                dirty: self.session.is_dirty(index),
            });
        }
        sheets
    }

    /// Route a click.
    pub fn click(&mut self, target: ClickTarget) {
        match target {
            ClickTarget::Cover => {
                if let Some(cover) = self.props.cover_image.clone() {
                    self.events.push(DocEvent::ImageClick(cover));
                }
            }
            ClickTarget::Image { url, .. } if !self.props.editable => {
                self.events.push(DocEvent::ImageClick(url));
            }
            ClickTarget::Image { page, .. } | ClickTarget::Page(page) => {
                if !self.props.editable || page >= self.props.pages.len() {
                    return;
                }
                self.props.selected_page = Some(page + 1);
                self.session.select(Some(page));
                self.events.push(DocEvent::SelectPage(page + 1));
            }
        }
    }

    /// Process pending observer reports.
    pub fn poll_viewport(&mut self) {
        let entries = self.observer.take_entries();
        if entries.is_empty() {
            return;
        }
        if let Some(page) = self.tracker.handle(&entries) {
            self.events.push(DocEvent::PageInView(page));
        }
    }

    /// Last page reported in view (1-based).
    pub fn current_page(&self) -> Option<usize> {
        self.tracker.current_page()
    }

    /// Forward a user interaction to a page surface.
    pub fn interact(&mut self, index: usize, interaction: Interaction) -> bool {
        self.session.interact(index, interaction)
    }

    pub fn surface_mut(&mut self, index: usize) -> Option<&mut S> {
        self.session.surface_mut(index)
    }

    pub fn hydration_state(&self, index: usize) -> HydrationState {
        self.session.state(index)
    }

    /// Give a dirty page back to its source.
    pub fn reset_page(&mut self, index: usize) {
        if let Some(source) = self.props.pages.get(index) {
            self.session.reset_page(index, source);
        }
    }

    /// Authoritative content of every page.
    pub fn collect(&mut self) -> Vec<String> {
        self.collector.collect(&self.session, &self.props.pages)
    }

    /// Snapshot recorded when the current edit session began.
    pub fn initial_snapshot(&self) -> Option<&[String]> {
        self.collector.initial()
    }

    /// Whether the document differs from the initial snapshot.
    pub fn has_changes(&self) -> bool {
        let current = SnapshotCollector::read(&self.session, &self.props.pages);
        self.collector.has_changes(&current)
    }

    pub fn page_states(&self) -> Vec<PageState> {
        self.props
            .pages
            .iter()
            .enumerate()
            .map(|(index, source)| PageState {
                index,
                source: source.clone(),
                is_sparse: self.classifier.is_sparse(index),
                is_dirty: self.session.is_dirty(index),
                is_selected: self.props.selected_page == Some(index + 1),
            })
            .collect()
    }

    pub fn drain_events(&mut self) -> Vec<DocEvent> {
        std::mem::take(&mut self.events)
    }
}
