use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthChar;

use crate::app::Model;
use crate::image::ColorDepth;

use super::layout::{LayoutRow, RowKind, SHEET_PADDING, SheetLayout};
use super::style::{SheetPalette, style_for_line_kind};
use super::{overlays, status};

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let area = frame.area();
    let doc_height = area.height.saturating_sub(1);
    let doc_area = Rect::new(area.x, area.y, area.width, doc_height);
    let status_area = Rect::new(area.x, area.y + doc_height, area.width, 1);

    render_sheets(model, frame, doc_area);

    if model.active_toast().is_some() && doc_height > 0 {
        let toast_area = Rect::new(area.x, area.y + doc_height - 1, area.width, 1);
        status::render_toast_bar(model, frame, toast_area);
    }
    status::render_status_bar(model, frame, status_area);

    if model.magnifier.is_some() {
        overlays::render_magnifier_overlay(model, frame, area);
    } else if model.help_visible {
        overlays::render_help_overlay(model, frame, area);
    }
}

fn render_sheets(model: &Model, frame: &mut Frame, area: Rect) {
    let truecolor = ColorDepth::detect().is_truecolor();
    let palette = SheetPalette::from_theme(model.view.props().theme.as_ref(), truecolor);
    let layout = &model.layout;
    let range = model.viewport.visible_range();
    let buf = frame.buffer_mut();

    for (screen_row, row) in layout.rows()[range.start..range.end.min(layout.total_rows())]
        .iter()
        .enumerate()
    {
        #[allow(clippy::cast_possible_truncation)]
        let y = area.y + screen_row as u16;
        if y >= area.y + area.height {
            break;
        }
        render_row(layout, row, &palette, truecolor, buf, area, y);
    }
}

fn render_row(
    layout: &SheetLayout,
    row: &LayoutRow,
    palette: &SheetPalette,
    truecolor: bool,
    buf: &mut Buffer,
    area: Rect,
    y: u16,
) {
    let x = area.x + layout.left_margin();
    let width = layout.sheet_cols().min(area.width.saturating_sub(layout.left_margin()));
    if width < 2 {
        return;
    }
    let sheet_rect = Rect::new(x, y, width, 1);
    let info = row.sheet.and_then(|index| layout.info(index));
    let border = Style::default().fg(if info.is_some_and(|i| i.selected) {
        palette.selected_border
    } else {
        palette.border
    });
    let base = palette.sheet_style();
    let text_x = x + 1 + SHEET_PADDING;
    let text_width = usize::from(width.saturating_sub(2 + 2 * SHEET_PADDING));

    match &row.kind {
        RowKind::Gap => {}
        RowKind::Cover(src) => {
            let label = format!("[ Cover: {src} ]");
            Paragraph::new(label)
                .alignment(Alignment::Center)
                .style(style_for_line_kind(crate::document::LineKind::Image))
                .render(Rect::new(area.x, y, area.width, 1), buf);
        }
        RowKind::Bar(colour) => {
            let style = Style::default().fg(palette.bar(colour, truecolor));
            buf.set_string(x, y, "▀".repeat(usize::from(width)), style);
        }
        kind => {
            buf.set_style(sheet_rect, base);
            buf.set_string(x, y, "│", border);
            buf.set_string(x + width - 1, y, "│", border);
            match kind {
                RowKind::Header(text) => {
                    let mut line = text.clone();
                    if let Some(info) = info {
                        let mut marks = Vec::new();
                        if info.dirty {
                            marks.push("edited");
                        }
                        if info.has_background {
                            marks.push("bg");
                        }
                        if info.sparse {
                            marks.push("sparse");
                        }
                        if !marks.is_empty() {
                            line = format!("{line}  [{}]", marks.join(", "));
                        }
                    }
                    put_text(buf, text_x, y, &line, text_width, base.patch(palette.chrome));
                }
                RowKind::Footer(text) => {
                    put_text(buf, text_x, y, text, text_width, base.patch(palette.chrome));
                }
                RowKind::Body(line) => {
                    put_text(
                        buf,
                        text_x,
                        y,
                        &line.text,
                        text_width,
                        base.patch(style_for_line_kind(line.kind)),
                    );
                }
                RowKind::Source { line, text } => {
                    put_text(buf, text_x, y, text, text_width, base);
                    if let Some((page, cursor)) = layout.cursor()
                        && row.sheet == Some(page)
                        && cursor.line == *line
                    {
                        let col: usize = text
                            .chars()
                            .take(cursor.col)
                            .map(|ch| ch.width().unwrap_or(0))
                            .sum();
                        if col < text_width {
                            #[allow(clippy::cast_possible_truncation)]
                            let cx = text_x + col as u16;
                            let cell = &mut buf[(cx, y)];
                            cell.set_style(base.add_modifier(Modifier::REVERSED));
                            if cell.symbol().trim().is_empty() {
                                cell.set_symbol(" ");
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn put_text(buf: &mut Buffer, x: u16, y: u16, text: &str, width: usize, style: Style) {
    if width == 0 {
        return;
    }
    buf.set_stringn(x, y, text, width, style);
}
