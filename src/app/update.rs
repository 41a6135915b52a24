use crate::app::{Model, ToastLevel};
use crate::document::ClickTarget;
use crate::edit::Interaction;
use crate::magnifier::{KeyInput, PointerInput};
use crate::surface::Direction;

/// All possible events and actions in the application.
///
/// These represent user input, system events, and internal actions.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Navigation
    /// Scroll up by n rows
    ScrollUp(usize),
    /// Scroll down by n rows
    ScrollDown(usize),
    /// Scroll up one screen
    PageUp,
    /// Scroll down one screen
    PageDown,
    /// Go to the first sheet
    GoToTop,
    /// Go to the end of the book
    GoToBottom,
    /// Jump to the next sheet
    NextSheet,
    /// Jump to the start of this sheet, or the previous one
    PrevSheet,
    /// Terminal resized
    Resize(u16, u16),

    // Sheets
    /// Click on a sheet, image or the cover
    Click(ClickTarget),
    /// Select the sheet in view for editing
    SelectSheetInView,
    /// Toggle edit mode
    ToggleEdit,
    /// Toggle sparse-page autofix
    ToggleAutofix,
    /// Collect pages and write the snapshot file
    WriteSnapshot,

    // Editing the selected page
    EditInsert(char),
    EditPaste(String),
    EditDeleteBack,
    EditDeleteForward,
    EditSplitLine,
    EditMove(Direction),
    EditHome,
    EditEnd,
    /// Leave the selected page
    Blur,

    // Magnifier
    MagnifierPointer(PointerInput),
    MagnifierKey(KeyInput),

    // File watching
    /// Toggle file watching
    ToggleWatch,
    /// Book file changed externally, reload
    BookChanged,
    /// Force reload of the book
    ForceReload,

    /// Toggle help overlay
    ToggleHelp,
    /// Hide help overlay
    HideHelp,
    /// Scroll the help overlay by lines
    HelpScrollDown(usize),
    HelpScrollUp(usize),
    /// Quit the application
    Quit,
}

/// Update the model based on a message.
///
/// Side effects that touch the file system live in the event loop.
pub fn update(mut model: Model, msg: Message) -> Model {
    let scroll_locked = model.scroll_lock.is_locked();
    match msg {
        Message::ScrollUp(n) if !scroll_locked => model.viewport.scroll_up(n),
        Message::ScrollDown(n) if !scroll_locked => model.viewport.scroll_down(n),
        Message::PageUp if !scroll_locked => model.viewport.page_up(),
        Message::PageDown if !scroll_locked => model.viewport.page_down(),
        Message::GoToTop if !scroll_locked => model.viewport.go_to_top(),
        Message::GoToBottom if !scroll_locked => model.viewport.go_to_bottom(),
        Message::NextSheet if !scroll_locked => {
            let next = model.sheet_in_view().map_or(0, |index| index + 1);
            model.scroll_to_sheet(next);
        }
        Message::PrevSheet if !scroll_locked => {
            if let Some(index) = model.sheet_in_view() {
                let at_top = model.layout.sheet_top(index) == Some(model.viewport.offset());
                model.scroll_to_sheet(if at_top { index.saturating_sub(1) } else { index });
            }
        }
        Message::ScrollUp(_)
        | Message::ScrollDown(_)
        | Message::PageUp
        | Message::PageDown
        | Message::GoToTop
        | Message::GoToBottom
        | Message::NextSheet
        | Message::PrevSheet => {}
        Message::Resize(width, height) => model.resize(width, height),

        Message::Click(target) => model.view.click(target),
        Message::SelectSheetInView => {
            if model.is_editing() {
                let focus_row = model.viewport.offset() + usize::from(model.viewport.height()) / 3;
                if let Some(index) = model.layout.sheet_at_row(focus_row) {
                    model.view.click(ClickTarget::Page(index));
                }
            }
        }
        Message::ToggleEdit => model.toggle_edit(),
        Message::ToggleAutofix => {
            let enabled = !model.view.props().auto_fix_sparse_pages;
            model.view.set_autofix(enabled);
            model.options.auto_fix_sparse_pages = enabled;
            model.mark_layout_dirty();
            model.show_toast(
                ToastLevel::Info,
                if enabled {
                    "Sparse-page autofix on"
                } else {
                    "Sparse-page autofix off"
                },
            );
        }
        // Written by the event loop.
        Message::WriteSnapshot => {}

        Message::EditInsert(ch) => model.edit_selected(Interaction::Input, |buffer| {
            buffer.insert_char(ch);
            true
        }),
        Message::EditPaste(text) => model.edit_selected(Interaction::Paste, |buffer| {
            buffer.insert_str(&text);
            !text.is_empty()
        }),
        Message::EditDeleteBack => {
            model.edit_selected(Interaction::KeyDown, |buffer| buffer.delete_back());
        }
        Message::EditDeleteForward => {
            model.edit_selected(Interaction::KeyDown, |buffer| buffer.delete_forward());
        }
        Message::EditSplitLine => model.edit_selected(Interaction::KeyDown, |buffer| {
            buffer.split_line();
            true
        }),
        // Cursor keys reach the surface too, so they count as interactions.
        Message::EditMove(direction) => model.edit_selected(Interaction::KeyDown, |buffer| {
            buffer.move_cursor(direction);
            true
        }),
        Message::EditHome => model.edit_selected(Interaction::KeyDown, |buffer| {
            buffer.move_home();
            true
        }),
        Message::EditEnd => model.edit_selected(Interaction::KeyDown, |buffer| {
            buffer.move_end();
            true
        }),
        Message::Blur => model.blur(),

        Message::MagnifierPointer(input) => {
            if let Some(magnifier) = model.magnifier.as_mut() {
                let outcome = magnifier.handle_pointer(input);
                model.apply_magnifier_outcome(outcome);
            }
        }
        Message::MagnifierKey(input) => {
            if let Some(magnifier) = model.magnifier.as_mut() {
                let outcome = magnifier.handle_key(input);
                model.apply_magnifier_outcome(outcome);
            }
        }

        Message::ToggleWatch => {
            model.watch_enabled = !model.watch_enabled;
        }
        // Reloads happen in the event loop.
        Message::BookChanged | Message::ForceReload => {}

        Message::ToggleHelp => {
            model.help_visible = !model.help_visible;
            model.help_scroll = 0;
        }
        Message::HideHelp => {
            model.help_visible = false;
            model.help_scroll = 0;
        }
        Message::HelpScrollDown(n) => model.help_scroll = model.help_scroll.saturating_add(n),
        Message::HelpScrollUp(n) => model.help_scroll = model.help_scroll.saturating_sub(n),
        Message::Quit => model.should_quit = true,
    }
    model.refresh();
    model
}
