//! Full-screen pan/zoom viewer for one image.
//!
//! The magnifier is pure state: the host translates its own pointer, touch
//! and key events into [`PointerInput`] / [`KeyInput`] in viewer pixels and
//! acts on the returned [`MagnifierOutcome`].

mod transform;

pub use transform::{Point, Transform, ZoomLimits};

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

/// Wheel and keyboard zoom step.
pub const ZOOM_STEP: f32 = 1.1;

/// Pointer travel (px) after which a press counts as a drag.
const DRAG_SLOP_PX: f32 = 3.0;

/// Counts open overlays; page scrolling is disabled while any are open.
#[derive(Debug, Clone, Default)]
pub struct ScrollLock {
    holders: Rc<Cell<u32>>,
}

impl ScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> ScrollLockGuard {
        self.holders.set(self.holders.get() + 1);
        ScrollLockGuard {
            holders: Rc::clone(&self.holders),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.holders.get() > 0
    }
}

/// Releases its hold on the [`ScrollLock`] when dropped.
#[derive(Debug)]
pub struct ScrollLockGuard {
    holders: Rc<Cell<u32>>,
}

impl Drop for ScrollLockGuard {
    fn drop(&mut self) {
        self.holders.set(self.holders.get().saturating_sub(1));
    }
}

/// What a pointer press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Backdrop,
    Image,
    Control,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    Wheel { at: Point, delta_y: f32 },
    Down { at: Point, target: HitTarget },
    Move { at: Point },
    Up { at: Point },
    DoubleClick { at: Point },
    TouchStart { touches: Vec<Point> },
    TouchMove { touches: Vec<Point> },
    TouchEnd { touches: Vec<Point> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnifierKey {
    Escape,
    ZoomIn,
    ZoomOut,
    Reset,
    Other,
}

/// A key press. `command` is Ctrl, or Cmd on macOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: MagnifierKey,
    pub command: bool,
}

impl KeyInput {
    /// Map a typed character with its modifier state.
    pub const fn from_char(ch: char, command: bool) -> Self {
        let key = match ch {
            '+' | '=' => MagnifierKey::ZoomIn,
            '-' => MagnifierKey::ZoomOut,
            '0' => MagnifierKey::Reset,
            _ => MagnifierKey::Other,
        };
        Self { key, command }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnifierOutcome {
    Ignored,
    Updated,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PanState {
    origin: Point,
    start_tx: f32,
    start_ty: f32,
    on_backdrop: bool,
    moved: bool,
}

/// An active two-finger gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchState {
    pub start_dist: f32,
    pub start_scale: f32,
    pub center: Point,
}

/// Everything that is reset when a new image opens.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MagnifierState {
    pub transform: Transform,
    pan: Option<PanState>,
    pinch: Option<PinchState>,
}

impl MagnifierState {
    fn fresh(limits: &ZoomLimits) -> Self {
        Self {
            transform: Transform::at_scale(limits.initial_scale),
            pan: None,
            pinch: None,
        }
    }

    pub const fn pinch(&self) -> Option<&PinchState> {
        self.pinch.as_ref()
    }

    pub const fn is_panning(&self) -> bool {
        self.pan.is_some()
    }
}

/// An open magnifier. Dropping it releases the scroll lock.
#[derive(Debug)]
pub struct Magnifier {
    src: String,
    limits: ZoomLimits,
    viewer: Point,
    state: MagnifierState,
    _lock: ScrollLockGuard,
}

impl Magnifier {
    /// Open on `src`. `viewer` is the overlay size in pixels.
    pub fn open(src: impl Into<String>, limits: ZoomLimits, viewer: Point, lock: &ScrollLock) -> Self {
        let src = src.into();
        debug!(%src, "magnifier opened");
        Self {
            src,
            limits,
            viewer,
            state: MagnifierState::fresh(&limits),
            _lock: lock.acquire(),
        }
    }

    /// Close the overlay, dropping gesture state and the scroll lock.
    pub fn close(self) {
        debug!(src = %self.src, "magnifier closed");
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub const fn limits(&self) -> &ZoomLimits {
        &self.limits
    }

    pub const fn state(&self) -> &MagnifierState {
        &self.state
    }

    pub const fn transform(&self) -> Transform {
        self.state.transform
    }

    /// Show a different image. A new source resets everything.
    pub fn set_source(&mut self, src: impl Into<String>) {
        let src = src.into();
        if src != self.src {
            self.src = src;
            self.state = MagnifierState::fresh(&self.limits);
        }
    }

    pub const fn set_viewer_size(&mut self, viewer: Point) {
        self.viewer = viewer;
    }

    fn center(&self) -> Point {
        Point::new(self.viewer.x / 2.0, self.viewer.y / 2.0)
    }

    fn zoom(&mut self, factor: f32, at: Point) -> MagnifierOutcome {
        let before = self.state.transform;
        self.state.transform.zoom_at_point(factor, at, &self.limits);
        if self.state.transform == before {
            MagnifierOutcome::Ignored
        } else {
            MagnifierOutcome::Updated
        }
    }

    pub fn handle_pointer(&mut self, input: PointerInput) -> MagnifierOutcome {
        match input {
            PointerInput::Wheel { at, delta_y } => {
                let factor = if delta_y > 0.0 { 1.0 / ZOOM_STEP } else { ZOOM_STEP };
                self.zoom(factor, at)
            }
            PointerInput::Down { at, target } => {
                if target == HitTarget::Control {
                    return MagnifierOutcome::Ignored;
                }
                self.state.pan = Some(PanState {
                    origin: at,
                    start_tx: self.state.transform.tx,
                    start_ty: self.state.transform.ty,
                    on_backdrop: target == HitTarget::Backdrop,
                    moved: false,
                });
                MagnifierOutcome::Ignored
            }
            PointerInput::Move { at } => {
                let Some(pan) = self.state.pan.as_mut() else {
                    return MagnifierOutcome::Ignored;
                };
                let (dx, dy) = (at.x - pan.origin.x, at.y - pan.origin.y);
                if !pan.moved && dx.hypot(dy) < DRAG_SLOP_PX {
                    return MagnifierOutcome::Ignored;
                }
                pan.moved = true;
                self.state.transform.tx = pan.start_tx + dx;
                self.state.transform.ty = pan.start_ty + dy;
                MagnifierOutcome::Updated
            }
            PointerInput::Up { .. } => match self.state.pan.take() {
                Some(pan) if pan.on_backdrop && !pan.moved => MagnifierOutcome::Close,
                Some(pan) if pan.moved => MagnifierOutcome::Updated,
                _ => MagnifierOutcome::Ignored,
            },
            PointerInput::DoubleClick { at } => {
                self.state.pan = None;
                let scale = self.state.transform.scale;
                let target = if scale > 1.0 { 1.0 } else { 2.0 };
                self.zoom(target / scale, at)
            }
            PointerInput::TouchStart { touches } => self.touch_start(&touches),
            PointerInput::TouchMove { touches } => self.touch_move(&touches),
            PointerInput::TouchEnd { touches } => {
                self.state.pinch = None;
                self.state.pan = None;
                // The fingers left on the glass start a fresh pinch or pan.
                self.touch_start(&touches)
            }
        }
    }

    fn begin_touch_pan(&mut self, at: Point) {
        self.state.pan = Some(PanState {
            origin: at,
            start_tx: self.state.transform.tx,
            start_ty: self.state.transform.ty,
            on_backdrop: false,
            moved: false,
        });
    }

    fn touch_start(&mut self, touches: &[Point]) -> MagnifierOutcome {
        match touches {
            [a, b, ..] => {
                let start_dist = a.distance(*b);
                self.state.pan = None;
                self.state.pinch = (start_dist > 0.0).then(|| PinchState {
                    start_dist,
                    start_scale: self.state.transform.scale,
                    center: a.midpoint(*b),
                });
            }
            [finger] => {
                self.state.pinch = None;
                self.begin_touch_pan(*finger);
            }
            [] => {}
        }
        MagnifierOutcome::Ignored
    }

    fn touch_move(&mut self, touches: &[Point]) -> MagnifierOutcome {
        match touches {
            [a, b, ..] => {
                let Some(pinch) = self.state.pinch else {
                    return MagnifierOutcome::Ignored;
                };
                let dist = a.distance(*b);
                if dist <= 0.0 {
                    return MagnifierOutcome::Ignored;
                }
                let target = pinch.start_scale * dist / pinch.start_dist;
                let factor = target / self.state.transform.scale;
                self.zoom(factor, pinch.center)
            }
            [finger] => self.handle_pointer(PointerInput::Move { at: *finger }),
            [] => MagnifierOutcome::Ignored,
        }
    }

    pub fn handle_key(&mut self, input: KeyInput) -> MagnifierOutcome {
        match (input.key, input.command) {
            (MagnifierKey::Escape, _) => MagnifierOutcome::Close,
            (MagnifierKey::ZoomIn, true) => self.zoom(ZOOM_STEP, self.center()),
            (MagnifierKey::ZoomOut, true) => self.zoom(1.0 / ZOOM_STEP, self.center()),
            (MagnifierKey::Reset, true) => {
                self.state.transform = Transform::at_scale(self.limits.clamp(1.0));
                MagnifierOutcome::Updated
            }
            _ => MagnifierOutcome::Ignored,
        }
    }
}
