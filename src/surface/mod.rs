//! Owned page surfaces.
//!
//! A surface is the live, editable rendering of one page. The edit session
//! seeds it from the page source, the host mutates it in response to user
//! input, and the snapshot collector reads it back.
//!
//! Interaction listeners are tracked in a [`ListenerRegistry`] keyed by page
//! index. Registering returns a [`ListenerGuard`]; dropping the guard
//! deregisters the listener, so a surface that is replaced or unmounted can
//! never leave a listener behind.

mod buffer;

pub use buffer::{BufferSurface, Cursor, Direction, EditorBuffer};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use thiserror::Error;

/// Errors reading or writing a page surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The surface is no longer attached to the document.
    #[error("surface for page {0} is detached")]
    Detached(usize),
    /// The surface could not produce its markup.
    #[error("surface for page {index} is unreadable: {reason}")]
    Unreadable { index: usize, reason: String },
}

/// The editable rendering of a single page.
pub trait PageSurface {
    /// Replace the displayed content.
    fn render(&mut self, content: &str);

    /// Read the current markup.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is detached or cannot be read.
    fn read_current(&self) -> Result<String, SurfaceError>;
}

/// A plain string surface, used by headless hosts and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySurface {
    index: usize,
    content: String,
    detached: bool,
}

impl MemorySurface {
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            content: String::new(),
            detached: false,
        }
    }

    /// Simulate user typing at the end of the content.
    pub fn type_text(&mut self, text: &str) {
        self.content.push_str(text);
    }

    /// Simulate the surface being removed from the host.
    pub const fn detach(&mut self) {
        self.detached = true;
    }
}

impl PageSurface for MemorySurface {
    fn render(&mut self, content: &str) {
        content.clone_into(&mut self.content);
    }

    fn read_current(&self) -> Result<String, SurfaceError> {
        if self.detached {
            return Err(SurfaceError::Detached(self.index));
        }
        Ok(self.content.clone())
    }
}

type ListenerTable = Rc<RefCell<BTreeMap<usize, u64>>>;

/// Registry of live interaction listeners, keyed by page index.
#[derive(Debug, Default, Clone)]
pub struct ListenerRegistry {
    table: ListenerTable,
    next_id: Rc<RefCell<u64>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener for `index`, replacing any existing one.
    pub fn attach(&self, index: usize) -> ListenerGuard {
        let id = {
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            *next
        };
        self.table.borrow_mut().insert(index, id);
        ListenerGuard {
            table: Rc::downgrade(&self.table),
            index,
            id,
        }
    }

    /// Whether `index` currently has a live listener.
    pub fn is_attached(&self, index: usize) -> bool {
        self.table.borrow().contains_key(&index)
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }
}

/// Deregisters its listener when dropped.
#[derive(Debug)]
pub struct ListenerGuard {
    table: Weak<RefCell<BTreeMap<usize, u64>>>,
    index: usize,
    id: u64,
}

impl ListenerGuard {
    pub const fn index(&self) -> usize {
        self.index
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let mut table = table.borrow_mut();
        // A newer registration for the same index owns the slot now.
        if table.get(&self.index) == Some(&self.id) {
            table.remove(&self.index);
        }
    }
}
