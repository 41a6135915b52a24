use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Model, ToastLevel};

/// Status line text.
pub fn status_text(model: &Model) -> String {
    let props = model.view.props();
    let title = if props.meta.title.trim().is_empty() {
        model
            .book_path
            .file_name()
            .map_or_else(|| "untitled".to_string(), |s| s.to_string_lossy().to_string())
    } else {
        props.meta.title.clone()
    };

    let total = model.view.page_count();
    let page = if model.is_editing() {
        model
            .editing_page()
            .map(|index| index + 1)
            .or_else(|| model.sheet_in_view().map(|index| index + 1))
    } else {
        model.current_page
    };
    let page_info = page.map_or_else(|| format!("{total} pages"), |p| format!("Page {p}/{total}"));

    let mut flags = String::new();
    if model.is_editing() {
        let dirty = model.view.session().dirty_pages().len();
        flags.push_str(" [EDIT");
        if dirty > 0 {
            flags.push_str(&format!(" {dirty} changed"));
        }
        flags.push(']');
    }
    if !props.auto_fix_sparse_pages {
        flags.push_str(" [autofix off]");
    }
    if model.watch_enabled {
        flags.push_str(" [watching]");
    }

    format!(
        " {title}  {page_info}  [{}%]{flags}  ?:help",
        model.viewport.scroll_percent()
    )
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let status_bar = Paragraph::new(status_text(model))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(status_bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}
