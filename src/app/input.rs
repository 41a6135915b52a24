use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::Frame;
use ratatui::layout::Rect;

use crate::app::{App, MAGNIFIER_CELL_PX, Message, Model};
use crate::image::MagnifierCanvas;
use crate::magnifier::{HitTarget, KeyInput, MagnifierKey, Point, PointerInput};
use crate::surface::Direction;

use super::event_loop::{ClickTracker, Debounced};

/// Rows scrolled per wheel notch.
const WHEEL_ROWS: usize = 3;
const HELP_PAGE: usize = 10;

impl App {
    pub(super) fn handle_event(
        event: &Event,
        model: &Model,
        now_ms: u64,
        pending_resize: &mut Debounced<(u16, u16)>,
        click_tracker: &mut ClickTracker,
    ) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::handle_key(*key, model),
            Event::Mouse(mouse) => Self::handle_mouse(*mouse, model, now_ms, click_tracker),
            Event::Paste(text) if model.editing_page().is_some() && model.magnifier.is_none() => {
                Some(Message::EditPaste(text.replace("\r\n", "\n").replace('\r', "\n")))
            }
            Event::Resize(w, h) => {
                pending_resize.set((*w, *h), now_ms);
                None
            }
            _ => None,
        }
    }

    pub(super) fn handle_mouse(
        mouse: MouseEvent,
        model: &Model,
        now_ms: u64,
        click_tracker: &mut ClickTracker,
    ) -> Option<Message> {
        if model.magnifier.is_some() {
            return magnifier_mouse(mouse, model, now_ms, click_tracker);
        }
        if model.help_visible {
            return match mouse.kind {
                MouseEventKind::ScrollUp => Some(Message::HelpScrollUp(WHEEL_ROWS)),
                MouseEventKind::ScrollDown => Some(Message::HelpScrollDown(WHEEL_ROWS)),
                _ => None,
            };
        }

        match mouse.kind {
            MouseEventKind::ScrollUp => Some(Message::ScrollUp(WHEEL_ROWS)),
            MouseEventKind::ScrollDown => Some(Message::ScrollDown(WHEEL_ROWS)),
            MouseEventKind::Up(MouseButton::Left) => {
                if mouse.row >= model.viewport.height() {
                    return None;
                }
                let row = model.viewport.offset() + usize::from(mouse.row);
                let target = model.layout.click_target(row)?;
                let left = model.layout.left_margin();
                let on_sheet = mouse.column >= left
                    && mouse.column < left.saturating_add(model.layout.sheet_cols());
                let is_cover = matches!(target, crate::document::ClickTarget::Cover);
                (on_sheet || is_cover).then_some(Message::Click(target))
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        if model.magnifier.is_some() {
            return magnifier_key(key);
        }

        if model.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?' | 'q') | KeyCode::F(1) => Some(Message::HideHelp),
                KeyCode::Char('j') | KeyCode::Down => Some(Message::HelpScrollDown(1)),
                KeyCode::Char('k') | KeyCode::Up => Some(Message::HelpScrollUp(1)),
                KeyCode::Char(' ') | KeyCode::PageDown => Some(Message::HelpScrollDown(HELP_PAGE)),
                KeyCode::Char('b') | KeyCode::PageUp => Some(Message::HelpScrollUp(HELP_PAGE)),
                KeyCode::Char('g') | KeyCode::Home => Some(Message::HelpScrollUp(usize::MAX)),
                KeyCode::Char('G') | KeyCode::End => Some(Message::HelpScrollDown(usize::MAX)),
                _ => None,
            };
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl {
            return match key.code {
                KeyCode::Char('c' | 'q') => Some(Message::Quit),
                KeyCode::Char('s') => Some(Message::WriteSnapshot),
                KeyCode::Char('e') => Some(Message::ToggleEdit),
                _ => None,
            };
        }

        if model.editing_page().is_some() {
            return Self::handle_edit_key(key);
        }

        match key.code {
            // Navigation
            KeyCode::Char('j') | KeyCode::Down => Some(Message::ScrollDown(1)),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::ScrollUp(1)),
            KeyCode::Char(' ') | KeyCode::PageDown => Some(Message::PageDown),
            KeyCode::Char('b') | KeyCode::PageUp => Some(Message::PageUp),
            KeyCode::Char('n') => Some(Message::NextSheet),
            KeyCode::Char('p') => Some(Message::PrevSheet),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::GoToTop),
            KeyCode::Char('G') | KeyCode::End => Some(Message::GoToBottom),

            // Sheets
            KeyCode::Char('e') => Some(Message::ToggleEdit),
            KeyCode::Enter if model.is_editing() => Some(Message::SelectSheetInView),
            KeyCode::Esc if model.is_editing() => Some(Message::ToggleEdit),
            KeyCode::Char('s') => Some(Message::WriteSnapshot),
            KeyCode::Char('a') => Some(Message::ToggleAutofix),

            // File
            KeyCode::Char('w') => Some(Message::ToggleWatch),
            KeyCode::Char('r' | 'R') => Some(Message::ForceReload),
            KeyCode::Char('?') | KeyCode::F(1) => Some(Message::ToggleHelp),

            KeyCode::Char('q') => Some(Message::Quit),
            _ => None,
        }
    }

    fn handle_edit_key(key: KeyEvent) -> Option<Message> {
        match key.code {
            KeyCode::Esc => Some(Message::Blur),
            KeyCode::Char(ch) => Some(Message::EditInsert(ch)),
            KeyCode::Tab => Some(Message::EditInsert('\t')),
            KeyCode::Enter => Some(Message::EditSplitLine),
            KeyCode::Backspace => Some(Message::EditDeleteBack),
            KeyCode::Delete => Some(Message::EditDeleteForward),
            KeyCode::Left => Some(Message::EditMove(Direction::Left)),
            KeyCode::Right => Some(Message::EditMove(Direction::Right)),
            KeyCode::Up => Some(Message::EditMove(Direction::Up)),
            KeyCode::Down => Some(Message::EditMove(Direction::Down)),
            KeyCode::Home => Some(Message::EditHome),
            KeyCode::End => Some(Message::EditEnd),
            KeyCode::PageUp => Some(Message::PageUp),
            KeyCode::PageDown => Some(Message::PageDown),
            _ => None,
        }
    }

    pub(super) fn view(model: &mut Model, frame: &mut Frame) {
        crate::ui::render(model, frame);
    }
}

fn magnifier_key(key: KeyEvent) -> Option<Message> {
    // Terminals rarely report Ctrl with `+`, so bare zoom keys count as
    // commands too.
    let input = match key.code {
        KeyCode::Esc | KeyCode::Char('q') => KeyInput {
            key: MagnifierKey::Escape,
            command: false,
        },
        KeyCode::Char(ch) => KeyInput::from_char(ch, true),
        _ => return None,
    };
    (input.key != MagnifierKey::Other).then_some(Message::MagnifierKey(input))
}

/// Centre of a cell in magnifier pixels, relative to the viewer.
fn viewer_point(viewer: Rect, column: u16, row: u16) -> Point {
    let (cell_w, cell_h) = MAGNIFIER_CELL_PX;
    Point::new(
        (f32::from(column) - f32::from(viewer.x)).mul_add(cell_w, cell_w / 2.0),
        (f32::from(row) - f32::from(viewer.y)).mul_add(cell_h, cell_h / 2.0),
    )
}

fn point_in_rect(col: u16, row: u16, rect: Rect) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

fn magnifier_hit(model: &Model, at: Point) -> HitTarget {
    let (Some(magnifier), Some((w, h))) = (model.magnifier.as_ref(), model.magnifier_image_size())
    else {
        return HitTarget::Backdrop;
    };
    let viewer = crate::app::viewer_size_px(model.magnifier_viewer);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let canvas = MagnifierCanvas::new(w, h, viewer.x as u32, viewer.y as u32);
    canvas.hit(&magnifier.transform(), at)
}

fn magnifier_mouse(
    mouse: MouseEvent,
    model: &Model,
    now_ms: u64,
    click_tracker: &mut ClickTracker,
) -> Option<Message> {
    let viewer = model.magnifier_viewer;
    let at = viewer_point(viewer, mouse.column, mouse.row);
    let area = Rect::new(
        0,
        0,
        model.viewport.width(),
        model.viewport.height().saturating_add(1),
    );
    let control = crate::ui::magnifier_controls(area)
        .into_iter()
        .find(|(rect, _)| point_in_rect(mouse.column, mouse.row, *rect))
        .map(|(_, key)| key);

    let input = match mouse.kind {
        MouseEventKind::ScrollUp => PointerInput::Wheel { at, delta_y: -1.0 },
        MouseEventKind::ScrollDown => PointerInput::Wheel { at, delta_y: 1.0 },
        MouseEventKind::Down(MouseButton::Left) => {
            if control.is_some() {
                PointerInput::Down {
                    at,
                    target: HitTarget::Control,
                }
            } else if click_tracker.press(mouse.column, mouse.row, now_ms) {
                PointerInput::DoubleClick { at }
            } else {
                let target = if point_in_rect(mouse.column, mouse.row, viewer) {
                    magnifier_hit(model, at)
                } else {
                    HitTarget::Backdrop
                };
                PointerInput::Down { at, target }
            }
        }
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
            PointerInput::Move { at }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if let Some(key) = control {
                return Some(Message::MagnifierKey(KeyInput { key, command: true }));
            }
            PointerInput::Up { at }
        }
        _ => return None,
    };
    Some(Message::MagnifierPointer(input))
}
