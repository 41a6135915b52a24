use std::fs;
use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use tempfile::tempdir;

use crate::book::Book;
use crate::config::RenderOptions;
use crate::document::{ClickTarget, DocumentMeta};
use crate::magnifier::{KeyInput, MagnifierKey};

use super::event_loop::ClickTracker;
use super::{App, Message, Model, snapshot_path_for, update};

fn book(pages: &[&str]) -> Book {
    Book {
        meta: DocumentMeta {
            title: "Test".to_string(),
            ..DocumentMeta::default()
        },
        pages: pages.iter().map(|page| (*page).to_string()).collect(),
        ..Book::default()
    }
}

fn create_test_model() -> Model {
    Model::new(
        PathBuf::from("test.json"),
        book(&["<p>Hello world</p>", "<p>Second</p>"]),
        (80, 24),
        RenderOptions::default(),
    )
}

fn create_long_test_model() -> Model {
    let pages: Vec<String> = (1..=12)
        .map(|i| format!("<h2>Page {i}</h2><p>Body {i}</p>"))
        .collect();
    let refs: Vec<&str> = pages.iter().map(String::as_str).collect();
    Model::new(
        PathBuf::from("test.json"),
        book(&refs),
        (80, 24),
        RenderOptions::default(),
    )
}

fn write_book(path: &Path, pages: &[&str]) {
    let json = serde_json::json!({ "title": "Disk", "pages": pages });
    fs::write(path, json.to_string()).unwrap();
}

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn editing_first_page(model: Model) -> Model {
    let model = update(model, Message::ToggleEdit);
    update(model, Message::Click(ClickTarget::Page(0)))
}

#[test]
fn test_scroll_down_updates_viewport() {
    let model = create_long_test_model();
    let model = update(model, Message::ScrollDown(5));
    assert_eq!(model.viewport.offset(), 5);
}

#[test]
fn test_scroll_up_updates_viewport() {
    let mut model = create_long_test_model();
    model.viewport.scroll_down(10);
    let model = update(model, Message::ScrollUp(3));
    assert_eq!(model.viewport.offset(), 7);
}

#[test]
fn test_next_and_prev_sheet_jump_to_sheet_tops() {
    let model = create_long_test_model();
    let second_top = model.layout.sheet_top(1).unwrap();

    let model = update(model, Message::NextSheet);
    assert_eq!(model.viewport.offset(), second_top);
    assert_eq!(model.sheet_in_view(), Some(1));

    let model = update(model, Message::PrevSheet);
    assert_eq!(model.viewport.offset(), 0);
}

#[test]
fn test_scrolling_reports_page_in_view() {
    let model = create_long_test_model();
    assert_eq!(model.current_page, Some(1));
    let model = update(model, Message::NextSheet);
    let model = update(model, Message::NextSheet);
    assert_eq!(model.current_page, Some(3));
}

#[test]
fn test_toggle_edit_enables_editing() {
    let model = create_test_model();
    assert!(!model.is_editing());
    let model = update(model, Message::ToggleEdit);
    assert!(model.is_editing());
    assert_eq!(model.editing_page(), None);
    assert!(model.active_toast().is_some());
}

#[test]
fn test_click_selects_page_in_edit_mode() {
    let model = editing_first_page(create_test_model());
    assert_eq!(model.editing_page(), Some(0));
    assert!(model.layout.info(0).unwrap().selected);
}

#[test]
fn test_click_outside_edit_mode_does_not_select() {
    let model = update(create_test_model(), Message::Click(ClickTarget::Page(1)));
    assert_eq!(model.editing_page(), None);
    assert!(model.magnifier.is_none());
}

#[test]
fn test_typing_marks_page_dirty_and_leaving_adopts_it() {
    let model = editing_first_page(create_test_model());
    let model = update(model, Message::EditInsert('!'));
    assert!(model.view.session().is_dirty(0));
    assert!(model.layout.info(0).unwrap().dirty);

    let model = update(model, Message::ToggleEdit);
    assert!(!model.is_editing());
    assert_eq!(model.view.props().pages[0], "<p>Hello world</p>!");
    assert_eq!(model.view.props().pages[1], "<p>Second</p>");
}

#[test]
fn test_cursor_moves_do_not_change_content() {
    let model = editing_first_page(create_test_model());
    let model = update(model, Message::EditHome);
    let mut model = update(model, Message::EditEnd);
    assert_eq!(model.view.collect()[0], "<p>Hello world</p>");
}

#[test]
fn test_blur_deselects_but_keeps_edit_mode() {
    let model = editing_first_page(create_test_model());
    let model = update(model, Message::EditInsert('x'));
    let model = update(model, Message::Blur);
    assert!(model.is_editing());
    assert_eq!(model.editing_page(), None);
    assert!(model.view.session().is_dirty(0));
}

#[test]
fn test_write_snapshot_collects_edited_pages() {
    let dir = tempdir().unwrap();
    let model = editing_first_page(create_test_model());
    let model = update(model, Message::EditPaste(" more".to_string()));
    let mut model = update(model, Message::WriteSnapshot);
    model.snapshot_path = dir.path().join("out").join("snap.json");

    App::handle_message_side_effects(&mut model, &mut None, &Message::WriteSnapshot);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&model.snapshot_path).unwrap()).unwrap();
    assert_eq!(written["pages"][0], "<p>Hello world</p> more");
    assert_eq!(written["pages"][1], "<p>Second</p>");
}

#[test]
fn test_reload_keeps_dirty_pages() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.json");
    write_book(&path, &["<p>A</p>", "<p>B</p>"]);
    let model = Model::new(
        path.clone(),
        Book::load(&path).unwrap(),
        (80, 24),
        RenderOptions::default(),
    );
    let model = editing_first_page(model);
    let model = update(model, Message::EditInsert('+'));

    write_book(&path, &["<p>A2</p>", "<p>B2</p>"]);
    let mut model = update(model, Message::ForceReload);
    App::handle_message_side_effects(&mut model, &mut None, &Message::ForceReload);

    assert_eq!(model.view.props().meta.title, "Disk");
    let pages = model.view.collect();
    assert_eq!(pages, vec!["<p>A</p>+".to_string(), "<p>B2</p>".to_string()]);
}

#[test]
fn test_reload_failure_keeps_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("book.json");
    write_book(&path, &["<p>A</p>"]);
    let mut model = Model::new(
        path.clone(),
        Book::load(&path).unwrap(),
        (80, 24),
        RenderOptions::default(),
    );
    fs::write(&path, "{ not json").unwrap();

    App::handle_message_side_effects(&mut model, &mut None, &Message::ForceReload);
    assert_eq!(model.view.props().pages, vec!["<p>A</p>".to_string()]);
    assert!(
        model
            .active_toast()
            .is_some_and(|(text, _)| text.starts_with("Reload failed"))
    );
}

#[test]
fn test_image_click_opens_magnifier_and_locks_scroll() {
    let model = create_long_test_model();
    let model = update(
        model,
        Message::Click(ClickTarget::Image {
            page: 0,
            url: "missing.png".to_string(),
        }),
    );
    assert_eq!(model.magnifier.as_ref().map(|m| m.src()), Some("missing.png"));
    assert!(model.scroll_lock.is_locked());

    let model = update(model, Message::ScrollDown(5));
    assert_eq!(model.viewport.offset(), 0);

    let model = update(
        model,
        Message::MagnifierKey(KeyInput {
            key: MagnifierKey::Escape,
            command: false,
        }),
    );
    assert!(model.magnifier.is_none());
    assert!(!model.scroll_lock.is_locked());
    let model = update(model, Message::ScrollDown(5));
    assert_eq!(model.viewport.offset(), 5);
}

#[test]
fn test_image_click_in_edit_mode_selects_page() {
    let model = update(create_test_model(), Message::ToggleEdit);
    let model = update(
        model,
        Message::Click(ClickTarget::Image {
            page: 1,
            url: "pic.png".to_string(),
        }),
    );
    assert!(model.magnifier.is_none());
    assert_eq!(model.editing_page(), Some(1));
}

#[test]
fn test_cover_click_opens_cover_image() {
    let mut cover_book = book(&["<p>A</p>"]);
    cover_book.cover_image = Some("cover.png".to_string());
    let model = Model::new(
        PathBuf::from("test.json"),
        cover_book,
        (80, 24),
        RenderOptions::default(),
    );
    assert_eq!(model.layout.click_target(0), Some(ClickTarget::Cover));
    let model = update(model, Message::Click(ClickTarget::Cover));
    assert_eq!(model.magnifier.as_ref().map(|m| m.src()), Some("cover.png"));
}

#[test]
fn test_toggle_autofix_flips_option() {
    let model = create_test_model();
    assert!(model.view.props().auto_fix_sparse_pages);
    let model = update(model, Message::ToggleAutofix);
    assert!(!model.view.props().auto_fix_sparse_pages);
    assert!(!model.options.auto_fix_sparse_pages);
}

#[test]
fn test_help_and_quit() {
    let model = update(create_test_model(), Message::ToggleHelp);
    assert!(model.help_visible);
    let model = update(model, Message::HideHelp);
    assert!(!model.help_visible);
    let model = update(model, Message::Quit);
    assert!(model.should_quit);
}

#[test]
fn test_help_keys_scroll_help_not_document() {
    let model = update(create_long_test_model(), Message::ToggleHelp);
    assert_eq!(
        App::handle_key(press(KeyCode::Char('j')), &model),
        Some(Message::HelpScrollDown(1))
    );
    assert_eq!(
        App::handle_key(press(KeyCode::PageUp), &model),
        Some(Message::HelpScrollUp(10))
    );

    let model = update(model, Message::HelpScrollDown(4));
    assert_eq!(model.help_scroll, 4);
    assert_eq!(model.viewport.offset(), 0);
    let model = update(model, Message::HelpScrollUp(9));
    assert_eq!(model.help_scroll, 0);

    let model = update(model, Message::HelpScrollDown(2));
    let model = update(model, Message::HideHelp);
    assert_eq!(model.help_scroll, 0);
}

#[test]
fn test_resize_updates_viewport() {
    let model = update(create_test_model(), Message::Resize(100, 30));
    assert_eq!(model.viewport.width(), 100);
    assert_eq!(model.viewport.height(), 29);
}

#[test]
fn test_snapshot_path_sits_next_to_book() {
    assert_eq!(
        snapshot_path_for(Path::new("/books/cells.json")),
        PathBuf::from("/books/cells.snapshot.json")
    );
}

#[test]
fn test_keys_in_read_mode() {
    let model = create_test_model();
    assert_eq!(
        App::handle_key(press(KeyCode::Char('j')), &model),
        Some(Message::ScrollDown(1))
    );
    assert_eq!(
        App::handle_key(press(KeyCode::Char('e')), &model),
        Some(Message::ToggleEdit)
    );
    assert_eq!(
        App::handle_key(press(KeyCode::Char('q')), &model),
        Some(Message::Quit)
    );
    assert_eq!(
        App::handle_key(
            KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL),
            &model
        ),
        Some(Message::WriteSnapshot)
    );
}

#[test]
fn test_keys_while_editing_a_page_go_to_the_buffer() {
    let model = editing_first_page(create_test_model());
    assert_eq!(
        App::handle_key(press(KeyCode::Char('q')), &model),
        Some(Message::EditInsert('q'))
    );
    assert_eq!(
        App::handle_key(press(KeyCode::Esc), &model),
        Some(Message::Blur)
    );
    assert_eq!(
        App::handle_key(
            KeyEvent::new(KeyCode::Char('e'), KeyModifiers::CONTROL),
            &model
        ),
        Some(Message::ToggleEdit)
    );
}

#[test]
fn test_escape_without_selection_leaves_edit_mode() {
    let model = update(create_test_model(), Message::ToggleEdit);
    assert_eq!(
        App::handle_key(press(KeyCode::Esc), &model),
        Some(Message::ToggleEdit)
    );
}

#[test]
fn test_second_escape_leaves_edit_mode_keeping_edits() {
    let model = editing_first_page(create_test_model());
    let model = update(model, Message::EditInsert('x'));

    let msg = App::handle_key(press(KeyCode::Esc), &model).unwrap();
    assert_eq!(msg, Message::Blur);
    let model = update(model, msg);
    assert!(model.is_editing());
    assert_eq!(model.editing_page(), None);

    let msg = App::handle_key(press(KeyCode::Esc), &model).unwrap();
    assert_eq!(msg, Message::ToggleEdit);
    let mut model = update(model, msg);
    assert!(!model.is_editing());
    assert_eq!(model.view.collect()[0], "<p>Hello world</p>x");
}

#[test]
fn test_mouse_click_on_sheet_row_selects_it() {
    let model = update(create_test_model(), Message::ToggleEdit);
    let mut tracker = ClickTracker::new(400);
    let column = model.layout.left_margin() + 3;
    let click = MouseEvent {
        kind: MouseEventKind::Up(MouseButton::Left),
        column,
        row: 0,
        modifiers: KeyModifiers::NONE,
    };
    assert_eq!(
        App::handle_mouse(click, &model, 0, &mut tracker),
        Some(Message::Click(ClickTarget::Page(0)))
    );

    let outside = MouseEvent { column: 0, ..click };
    assert_eq!(App::handle_mouse(outside, &model, 0, &mut tracker), None);
}

#[test]
fn test_magnifier_backdrop_click_closes() {
    let model = update(
        create_test_model(),
        Message::Click(ClickTarget::Image {
            page: 0,
            url: "missing.png".to_string(),
        }),
    );
    let mut tracker = ClickTracker::new(400);
    let mut model = model;
    for kind in [
        MouseEventKind::Down(MouseButton::Left),
        MouseEventKind::Up(MouseButton::Left),
    ] {
        let event = MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        if let Some(msg) = App::handle_mouse(event, &model, 0, &mut tracker) {
            model = update(model, msg);
        }
    }
    assert!(model.magnifier.is_none());
}
