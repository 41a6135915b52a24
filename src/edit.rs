//! Per-page hydration and dirty tracking for editable documents.
//!
//! Every page index moves through [`HydrationState`]:
//!
//! - `Unhydrated` → `Clean`: the first sync in editable mode mounts a surface
//!   and renders the page source into it.
//! - `Clean` → `Clean`: a later sync with different source re-renders it.
//! - `Clean` → `Dirty`: the first user interaction on the surface.
//! - `Dirty` is sticky. Syncs never touch the surface again until the page is
//!   removed, reset, or edit mode is toggled off and back on.

use std::collections::BTreeMap;

use tracing::debug;

use crate::surface::{ListenerGuard, ListenerRegistry, PageSurface, SurfaceError};

/// Hydration state of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HydrationState {
    #[default]
    Unhydrated,
    Clean,
    Dirty,
}

/// User interactions that take ownership of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Input,
    Blur,
    Paste,
    KeyDown,
}

/// A mounted page surface plus its bookkeeping.
#[derive(Debug)]
pub struct PageHandle<S> {
    surface: S,
    state: HydrationState,
    /// Source last rendered into the surface while clean.
    rendered_source: String,
    _listener: ListenerGuard,
}

impl<S: PageSurface> PageHandle<S> {
    fn hydrate(mut surface: S, source: &str, listener: ListenerGuard) -> Self {
        surface.render(source);
        Self {
            surface,
            state: HydrationState::Clean,
            rendered_source: source.to_string(),
            _listener: listener,
        }
    }

    /// Re-render from `source` unless the page is user-owned.
    ///
    /// Returns `true` if the surface was rewritten.
    fn sync(&mut self, source: &str) -> bool {
        if self.is_dirty() || self.rendered_source == source {
            return false;
        }
        self.surface.render(source);
        source.clone_into(&mut self.rendered_source);
        true
    }

    /// Current surface markup.
    ///
    /// # Errors
    ///
    /// Propagates the surface's read error.
    pub fn read_current(&self) -> Result<String, SurfaceError> {
        self.surface.read_current()
    }

    pub const fn mark_dirty(&mut self) {
        self.state = HydrationState::Dirty;
    }

    pub fn is_dirty(&self) -> bool {
        self.state == HydrationState::Dirty
    }

    pub const fn state(&self) -> HydrationState {
        self.state
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }
}

/// Owns the editable surfaces of one document.
#[derive(Debug)]
pub struct EditSession<S> {
    editable: bool,
    handles: BTreeMap<usize, PageHandle<S>>,
    listeners: ListenerRegistry,
    selected: Option<usize>,
}

impl<S> Default for EditSession<S> {
    fn default() -> Self {
        Self {
            editable: false,
            handles: BTreeMap::new(),
            listeners: ListenerRegistry::new(),
            selected: None,
        }
    }
}

impl<S: PageSurface> EditSession<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn is_editable(&self) -> bool {
        self.editable
    }

    /// Switch edit mode.
    ///
    /// Turning it on hydrates every page fresh; turning it off unmounts every
    /// surface and releases their listeners.
    pub fn set_editable(
        &mut self,
        editable: bool,
        pages: &[String],
        mount: &mut dyn FnMut(usize) -> S,
    ) {
        if editable == self.editable {
            return;
        }
        self.editable = editable;
        self.handles.clear();
        if editable {
            self.sync(pages, mount);
        } else {
            self.selected = None;
        }
        debug!(editable, pages = pages.len(), "edit mode changed");
    }

    /// Bring surfaces in line with the current page sources.
    pub fn sync(&mut self, pages: &[String], mount: &mut dyn FnMut(usize) -> S) {
        if !self.editable {
            return;
        }
        self.handles.retain(|index, _| *index < pages.len());
        if self.selected.is_some_and(|index| index >= pages.len()) {
            self.selected = None;
        }
        for (index, source) in pages.iter().enumerate() {
            match self.handles.get_mut(&index) {
                Some(handle) => {
                    if handle.sync(source) {
                        debug!(page = index, "resynced clean page");
                    }
                }
                None => {
                    let listener = self.listeners.attach(index);
                    let handle = PageHandle::hydrate(mount(index), source, listener);
                    self.handles.insert(index, handle);
                }
            }
        }
    }

    /// Deliver a user interaction to a page.
    ///
    /// Returns `true` if the page just became dirty. Interactions on pages
    /// without a live listener are ignored.
    pub fn interact(&mut self, index: usize, interaction: Interaction) -> bool {
        if !self.listeners.is_attached(index) {
            return false;
        }
        let Some(handle) = self.handles.get_mut(&index) else {
            return false;
        };
        if handle.is_dirty() {
            return false;
        }
        handle.mark_dirty();
        debug!(page = index, ?interaction, "page marked dirty");
        true
    }

    /// Hand a dirty page back to its source.
    pub fn reset_page(&mut self, index: usize, source: &str) {
        if let Some(handle) = self.handles.get_mut(&index) {
            handle.state = HydrationState::Clean;
            handle.surface.render(source);
            source.clone_into(&mut handle.rendered_source);
        }
    }

    pub fn state(&self, index: usize) -> HydrationState {
        self.handles
            .get(&index)
            .map_or(HydrationState::Unhydrated, PageHandle::state)
    }

    pub fn is_dirty(&self, index: usize) -> bool {
        self.handles.get(&index).is_some_and(PageHandle::is_dirty)
    }

    pub fn dirty_pages(&self) -> Vec<usize> {
        self.handles
            .iter()
            .filter(|(_, handle)| handle.is_dirty())
            .map(|(index, _)| *index)
            .collect()
    }

    pub fn handle(&self, index: usize) -> Option<&PageHandle<S>> {
        self.handles.get(&index)
    }

    /// Mutable access to a page's surface for host-driven edits.
    pub fn surface_mut(&mut self, index: usize) -> Option<&mut S> {
        self.handles.get_mut(&index).map(|handle| &mut handle.surface)
    }

    pub const fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub const fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub const fn select(&mut self, index: Option<usize>) {
        self.selected = index;
    }

    pub fn mounted_count(&self) -> usize {
        self.handles.len()
    }
}
