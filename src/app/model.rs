use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use ratatui::layout::Rect;
use ratatui_image::picker::Picker;
use ratatui_image::protocol::StatefulProtocol;
use tracing::debug;

use crate::book::Book;
use crate::config::RenderOptions;
use crate::document::{DocEvent, DocView, DocViewProps};
use crate::edit::Interaction;
use crate::image::ImageLoader;
use crate::magnifier::{Magnifier, MagnifierOutcome, Point, ScrollLock, Transform, ZoomLimits};
use crate::surface::{BufferSurface, Cursor, EditorBuffer};
use crate::ui::layout::{RowKind, SheetLayout, device_for_terminal, row_px};
use crate::viewport::{GeometryObserver, ObserverOptions, ScrollViewport};

/// Virtual pixels per terminal cell inside the magnifier.
pub const MAGNIFIER_CELL_PX: (f32, f32) = (8.0, 16.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// Rendered magnifier image, reused until the view changes.
pub struct MagnifierFrame {
    pub src: String,
    pub transform: Transform,
    pub area: Rect,
    pub protocol: StatefulProtocol,
}

/// Host state. `update` consumes and returns it whole.
pub struct Model {
    /// Path to the book file
    pub book_path: PathBuf,
    /// Directory the book lives in; image paths resolve against it
    pub base_dir: PathBuf,
    /// The document view over the book's pages
    pub view: DocView<BufferSurface, GeometryObserver>,
    /// Scroll position over the laid-out sheets
    pub viewport: ScrollViewport,
    /// Row layout of the current sheets
    pub layout: SheetLayout,
    layout_dirty: bool,
    /// Effective rendering options
    pub options: RenderOptions,
    /// Reload when the book changes on disk
    pub watch_enabled: bool,
    /// Saved defaults, listed in the help overlay
    pub config_global_path: Option<PathBuf>,
    pub config_local_path: Option<PathBuf>,
    pub help_visible: bool,
    /// First help line shown; clamped when drawn
    pub help_scroll: usize,
    toast: Option<Toast>,
    pub should_quit: bool,
    /// Page most recently reported in view (1-based)
    pub current_page: Option<usize>,
    /// Open image magnifier
    pub magnifier: Option<Magnifier>,
    /// Blocks document scrolling while the magnifier is open
    pub scroll_lock: ScrollLock,
    /// Where `s` writes collected pages
    pub snapshot_path: PathBuf,
    /// Terminal graphics protocol for the magnifier
    pub picker: Option<Picker>,
    /// Decoded images keyed by resolved path
    pub images: ImageLoader,
    /// Cached magnifier rendering
    pub magnifier_frame: Option<MagnifierFrame>,
    /// Size of the magnifier viewer in cells
    pub magnifier_viewer: Rect,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("book_path", &self.book_path)
            .field("view", &self.view)
            .field("watch_enabled", &self.watch_enabled)
            .field("magnifier", &self.magnifier.as_ref().map(Magnifier::src))
            .finish_non_exhaustive()
    }
}

fn new_view(props: DocViewProps) -> DocView<BufferSurface, GeometryObserver> {
    DocView::new(
        props,
        GeometryObserver::new(ObserverOptions::default()),
        BufferSurface::new,
    )
}

/// Default snapshot location next to the book.
pub fn snapshot_path_for(book_path: &Path) -> PathBuf {
    let stem = book_path
        .file_stem()
        .map_or_else(|| "book".into(), |s| s.to_string_lossy().into_owned());
    book_path.with_file_name(format!("{stem}.snapshot.json"))
}

impl Model {
    /// Create a model for a loaded book.
    pub fn new(
        book_path: PathBuf,
        book: Book,
        terminal_size: (u16, u16),
        options: RenderOptions,
    ) -> Self {
        let base_dir = book_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let (width, height) = terminal_size;
        let doc_rows = height.saturating_sub(1);
        let props = DocViewProps {
            pages: book.pages,
            theme: book.theme,
            meta: book.meta,
            device: options
                .device
                .unwrap_or_else(|| device_for_terminal(width, doc_rows, options.font_size)),
            editable: false,
            selected_page: None,
            cover_image: book.cover_image,
            font_size: options.font_size,
            auto_fix_sparse_pages: options.auto_fix_sparse_pages,
            sparse_threshold_px: options.sparse_threshold_px,
            fixed_page_height_px: options.fixed_page_height_px,
        };

        let mut model = Self {
            snapshot_path: snapshot_path_for(&book_path),
            book_path,
            images: ImageLoader::new(base_dir.clone()),
            base_dir,
            view: new_view(props),
            viewport: ScrollViewport::new(width, doc_rows, 0),
            layout: SheetLayout::default(),
            layout_dirty: true,
            options,
            watch_enabled: false,
            config_global_path: None,
            config_local_path: None,
            help_visible: false,
            help_scroll: 0,
            toast: None,
            should_quit: false,
            current_page: None,
            magnifier: None,
            scroll_lock: ScrollLock::new(),
            picker: None,
            magnifier_frame: None,
            magnifier_viewer: Rect::default(),
        };
        model.refresh();
        model
    }

    /// Set the image picker.
    #[must_use]
    pub fn with_picker(mut self, picker: Option<Picker>) -> Self {
        self.picker = picker;
        self
    }

    pub const fn mark_layout_dirty(&mut self) {
        self.layout_dirty = true;
    }

    pub const fn is_editing(&self) -> bool {
        self.view.props().editable
    }

    /// 0-based index of the page being edited.
    pub const fn editing_page(&self) -> Option<usize> {
        if self.is_editing() {
            self.view.session().selected()
        } else {
            None
        }
    }

    fn editing_cursor(&self) -> Option<(usize, Cursor)> {
        let page = self.editing_page()?;
        let handle = self.view.session().handle(page)?;
        Some((page, handle.surface().buffer().cursor()))
    }

    /// Rebuild the row layout from the current sheets.
    pub fn relayout(&mut self) {
        let sheets = self.view.sheets();
        self.layout = SheetLayout::build(
            &sheets,
            self.view.cover(),
            self.viewport.width(),
            row_px(self.view.props().font_size),
            self.editing_cursor(),
        );
        self.viewport.set_total_rows(self.layout.total_rows());
        self.layout_dirty = false;
    }

    /// Bring layout, viewport observation and view events up to date.
    pub fn refresh(&mut self) {
        if self.layout_dirty {
            self.relayout();
        }
        self.view
            .observer_mut()
            .update(self.layout.extents(), &self.viewport);
        self.view.poll_viewport();
        for event in self.view.drain_events() {
            debug!(?event, "doc event");
            match event {
                DocEvent::PageInView(page) => self.current_page = Some(page),
                DocEvent::SelectPage(page) => {
                    self.current_page = Some(page);
                    self.relayout();
                }
                DocEvent::ImageClick(src) => self.open_magnifier(src),
            }
        }
    }

    /// Post-draw measurement pass. Returns `true` when sheets changed height.
    pub fn measure_after_draw(&mut self) -> bool {
        let Some(ticket) = self.view.schedule_measurement() else {
            return false;
        };
        let layout = &self.layout;
        let changed = self
            .view
            .apply_measurement(ticket, &|index: usize| layout.measure(index));
        if changed {
            self.relayout();
            self.refresh();
        }
        changed
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        let doc_rows = height.saturating_sub(1);
        self.viewport.resize(width, doc_rows);
        if self.options.device.is_none() {
            self.view.set_device(device_for_terminal(
                width,
                doc_rows,
                self.view.props().font_size,
            ));
        }
        self.layout_dirty = true;
        if let Some(magnifier) = self.magnifier.as_mut() {
            let viewer = crate::ui::magnifier_viewer_rect(Rect::new(0, 0, width, height));
            magnifier.set_viewer_size(viewer_size_px(viewer));
            self.magnifier_viewer = viewer;
        }
        self.magnifier_frame = None;
    }

    /// Index of the sheet at the top of the viewport.
    pub fn sheet_in_view(&self) -> Option<usize> {
        self.layout.sheet_at_row(self.viewport.offset())
    }

    pub fn scroll_to_sheet(&mut self, index: usize) {
        if let Some(top) = self.layout.sheet_top(index) {
            self.viewport.go_to_row(top);
        }
    }

    /// Apply an edit to the selected page's buffer.
    ///
    /// The page is marked dirty when `edit` reports a change.
    pub fn edit_selected(
        &mut self,
        interaction: Interaction,
        edit: impl FnOnce(&mut EditorBuffer) -> bool,
    ) {
        let Some(page) = self.editing_page() else {
            return;
        };
        let Some(surface) = self.view.surface_mut(page) else {
            return;
        };
        if edit(surface.buffer_mut()) {
            self.view.interact(page, interaction);
        }
        self.relayout();
        self.ensure_cursor_visible();
    }

    fn ensure_cursor_visible(&mut self) {
        let Some((page, cursor)) = self.layout.cursor() else {
            return;
        };
        let row = self.layout.rows().iter().position(|row| {
            row.sheet == Some(page)
                && matches!(row.kind, RowKind::Source { line, .. } if line == cursor.line)
        });
        let Some(row) = row else {
            return;
        };
        let range = self.viewport.visible_range();
        if row < range.start {
            self.viewport.go_to_row(row);
        } else if row >= range.end {
            let height = usize::from(self.viewport.height()).max(1);
            self.viewport.go_to_row(row + 1 - height);
        }
    }

    /// Enter or leave edit mode. Leaving adopts the collected pages.
    pub fn toggle_edit(&mut self) {
        if self.is_editing() {
            let changed = self.view.has_changes();
            let pages = self.view.collect();
            self.view.set_editable(false);
            if changed {
                self.view.set_pages(pages);
                self.show_toast(ToastLevel::Info, "Edit mode off (changes kept)");
            } else {
                self.show_toast(ToastLevel::Info, "Edit mode off");
            }
        } else {
            self.view.set_editable(true);
            self.show_toast(ToastLevel::Info, "Edit mode: click a sheet or press Enter");
        }
        self.layout_dirty = true;
    }

    /// Deselect the page being edited.
    pub fn blur(&mut self) {
        if let Some(page) = self.editing_page() {
            self.view.interact(page, Interaction::Blur);
        }
        self.view.set_selected_page(None);
        self.layout_dirty = true;
    }

    pub fn open_magnifier(&mut self, src: String) {
        let area = Rect::new(
            0,
            0,
            self.viewport.width(),
            self.viewport.height().saturating_add(1),
        );
        let viewer = crate::ui::magnifier_viewer_rect(area);
        self.magnifier_viewer = viewer;
        if self.images.load(&src).is_none() {
            self.show_toast(ToastLevel::Warning, format!("Image unavailable: {src}"));
        }
        self.magnifier_frame = None;
        match self.magnifier.as_mut() {
            Some(magnifier) => magnifier.set_source(src),
            None => {
                self.magnifier = Some(Magnifier::open(
                    src,
                    ZoomLimits::default(),
                    viewer_size_px(viewer),
                    &self.scroll_lock,
                ));
            }
        }
    }

    pub fn close_magnifier(&mut self) {
        if let Some(magnifier) = self.magnifier.take() {
            magnifier.close();
        }
        self.magnifier_frame = None;
    }

    pub fn apply_magnifier_outcome(&mut self, outcome: MagnifierOutcome) {
        if outcome == MagnifierOutcome::Close {
            self.close_magnifier();
        }
    }

    /// Size in pixels of the open image, when it decoded.
    pub fn magnifier_image_size(&self) -> Option<(u32, u32)> {
        let magnifier = self.magnifier.as_ref()?;
        let path = self.images.resolve_path(magnifier.src())?;
        self.images
            .cache()
            .get(&path)?
            .as_ref()
            .map(|img| (img.width(), img.height()))
    }

    pub(super) fn reload_from_disk(&mut self) -> Result<()> {
        let book = Book::load(&self.book_path)?;
        self.view.set_meta(book.meta);
        self.view.set_theme(book.theme);
        self.view.set_cover(book.cover_image);
        self.view.set_pages(book.pages);
        self.images.clear_cache();
        self.magnifier_frame = None;
        if let Some(src) = self.magnifier.as_ref().map(|m| m.src().to_string()) {
            self.images.load(&src);
        }
        self.layout_dirty = true;
        Ok(())
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }
}

/// Viewer size in magnifier pixels for a cell rect.
pub fn viewer_size_px(viewer: Rect) -> Point {
    Point::new(
        f32::from(viewer.width) * MAGNIFIER_CELL_PX.0,
        f32::from(viewer.height) * MAGNIFIER_CELL_PX.1,
    )
}

// Placeholder left behind by `std::mem::take` during `update`.
impl Default for Model {
    fn default() -> Self {
        Self {
            book_path: PathBuf::new(),
            base_dir: PathBuf::from("."),
            view: new_view(DocViewProps::default()),
            viewport: ScrollViewport::new(80, 24, 0),
            layout: SheetLayout::default(),
            layout_dirty: true,
            options: RenderOptions::default(),
            watch_enabled: false,
            config_global_path: None,
            config_local_path: None,
            help_visible: false,
            help_scroll: 0,
            toast: None,
            should_quit: false,
            current_page: None,
            magnifier: None,
            scroll_lock: ScrollLock::new(),
            snapshot_path: PathBuf::from("book.snapshot.json"),
            picker: None,
            images: ImageLoader::new(PathBuf::from(".")),
            magnifier_frame: None,
            magnifier_viewer: Rect::default(),
        }
    }
}
