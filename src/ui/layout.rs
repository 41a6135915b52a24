//! Placing sheets on terminal rows.
//!
//! Sheets are sized in pixels. The terminal maps one column to
//! [`CELL_WIDTH_PX`] and one row to the line height of the configured font
//! size, so a sheet's natural height is its row count times the row height.

use crate::document::{ClickTarget, DisplayLine, Sheet, SheetContent, layout_source};
use crate::metrics::{DeviceDimensions, Measurement, SheetHeight};
use crate::surface::Cursor;
use crate::viewport::SheetExtent;

/// Horizontal pixels per terminal column.
pub const CELL_WIDTH_PX: f32 = 10.0;
/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.6;
/// Blank columns between a sheet's border and its text.
pub const SHEET_PADDING: u16 = 2;

const MIN_SHEET_COLS: u16 = 20;

/// Pixel height of one terminal row at `font_size`.
pub fn row_px(font_size: f32) -> f32 {
    (font_size * LINE_HEIGHT).max(1.0)
}

/// Device dimensions equivalent to a terminal of `cols` x `rows`.
pub fn device_for_terminal(cols: u16, rows: u16, font_size: f32) -> DeviceDimensions {
    DeviceDimensions::new(
        f32::from(cols) * CELL_WIDTH_PX,
        f32::from(rows) * row_px(font_size),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    /// Cover image block above the sheets.
    Cover(String),
    /// Accent colour bar.
    Bar(String),
    Header(String),
    Body(DisplayLine),
    /// Raw markup line of the page being edited.
    Source { line: usize, text: String },
    /// Padding added to reach a fixed sheet height.
    Filler,
    Footer(String),
    /// Space between sheets.
    Gap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRow {
    pub sheet: Option<usize>,
    pub kind: RowKind,
}

/// Per-sheet flags the renderer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SheetInfo {
    pub number: usize,
    pub selected: bool,
    pub sparse: bool,
    pub dirty: bool,
    pub has_background: bool,
}

/// Row-level layout of every sheet.
#[derive(Debug, Clone, Default)]
pub struct SheetLayout {
    rows: Vec<LayoutRow>,
    extents: Vec<SheetExtent>,
    natural_px: Vec<f32>,
    info: Vec<SheetInfo>,
    sheet_cols: u16,
    left_margin: u16,
    cursor: Option<(usize, Cursor)>,
}

impl SheetLayout {
    /// Lay out `sheets` for a terminal `terminal_cols` wide.
    ///
    /// `cursor` is the edit cursor of the selected sheet, shown on its raw
    /// markup instead of the formatted text.
    pub fn build(
        sheets: &[Sheet],
        cover: Option<&str>,
        terminal_cols: u16,
        row_px: f32,
        cursor: Option<(usize, Cursor)>,
    ) -> Self {
        let sheet_width = sheets.first().map_or(0.0, |s| s.width);
        let max_cols = terminal_cols.saturating_sub(2).max(MIN_SHEET_COLS);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let wanted = (sheet_width / CELL_WIDTH_PX).floor() as u16;
        let sheet_cols = wanted.max(MIN_SHEET_COLS).min(max_cols);
        let text_width = usize::from(sheet_cols.saturating_sub(2 + 2 * SHEET_PADDING)).max(1);

        let mut layout = Self {
            sheet_cols,
            left_margin: terminal_cols.saturating_sub(sheet_cols) / 2,
            cursor,
            ..Self::default()
        };

        if let Some(url) = cover {
            layout.push(None, RowKind::Cover(url.to_string()));
            layout.push(None, RowKind::Gap);
        }

        for sheet in sheets {
            let index = sheet.index;
            let top = layout.rows.len();
            for bar in &sheet.top_bars {
                layout.push(Some(index), RowKind::Bar(bar.clone()));
            }
            layout.push(
                Some(index),
                RowKind::Header(chrome_line(sheet.header.text(), text_width)),
            );

            let editing = sheet.selected
                && matches!(sheet.content, SheetContent::Editable(_))
                && cursor.is_some_and(|(page, _)| page == index);
            let body: Vec<RowKind> = if editing {
                sheet
                    .content
                    .markup()
                    .split('\n')
                    .enumerate()
                    .map(|(line, text)| RowKind::Source {
                        line,
                        text: text.to_string(),
                    })
                    .collect()
            } else {
                layout_source(sheet.content.markup(), text_width)
                    .into_iter()
                    .map(RowKind::Body)
                    .collect()
            };

            let natural_rows = (layout.rows.len() - top) + body.len() + 1 + sheet.bottom_bars.len();
            let filler = match sheet.height {
                SheetHeight::Auto => 0,
                SheetHeight::Fixed(px) => {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let target_rows = (px / row_px).ceil().max(0.0) as usize;
                    target_rows.saturating_sub(natural_rows)
                }
            };

            for kind in body {
                layout.push(Some(index), kind);
            }
            for _ in 0..filler {
                layout.push(Some(index), RowKind::Filler);
            }
            layout.push(
                Some(index),
                RowKind::Footer(chrome_line(sheet.footer.text(), text_width)),
            );
            for bar in &sheet.bottom_bars {
                layout.push(Some(index), RowKind::Bar(bar.clone()));
            }

            layout.extents.push(SheetExtent {
                top,
                height: layout.rows.len() - top,
            });
            layout.natural_px.push(natural_rows as f32 * row_px);
            layout.info.push(SheetInfo {
                number: sheet.number,
                selected: sheet.selected,
                sparse: sheet.sparse,
                dirty: sheet.dirty,
                has_background: sheet.background.is_some(),
            });
            layout.push(None, RowKind::Gap);
        }
        layout
    }

    fn push(&mut self, sheet: Option<usize>, kind: RowKind) {
        self.rows.push(LayoutRow { sheet, kind });
    }

    pub fn rows(&self) -> &[LayoutRow] {
        &self.rows
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn extents(&self) -> &[SheetExtent] {
        &self.extents
    }

    pub fn info(&self, index: usize) -> Option<&SheetInfo> {
        self.info.get(index)
    }

    pub const fn sheet_cols(&self) -> u16 {
        self.sheet_cols
    }

    pub const fn left_margin(&self) -> u16 {
        self.left_margin
    }

    pub const fn cursor(&self) -> Option<(usize, Cursor)> {
        self.cursor
    }

    /// Natural sheet height, for the layout reader.
    pub fn measure(&self, index: usize) -> Option<Measurement> {
        self.natural_px.get(index).map(|px| Measurement {
            scroll_height: *px,
            bounding_height: *px,
        })
    }

    /// First row of a sheet.
    pub fn sheet_top(&self, index: usize) -> Option<usize> {
        self.extents.get(index).map(|extent| extent.top)
    }

    /// Sheet covering `row`, or the next sheet below it when `row` is a gap.
    pub fn sheet_at_row(&self, row: usize) -> Option<usize> {
        self.extents
            .iter()
            .position(|extent| row < extent.top + extent.height)
    }

    /// What a click on `row` hits.
    pub fn click_target(&self, row: usize) -> Option<ClickTarget> {
        let hit = self.rows.get(row)?;
        match (&hit.kind, hit.sheet) {
            (RowKind::Cover(_), _) => Some(ClickTarget::Cover),
            (
                RowKind::Body(DisplayLine {
                    image: Some(url), ..
                }),
                Some(page),
            ) => Some(ClickTarget::Image {
                page,
                url: url.clone(),
            }),
            (_, Some(page)) => Some(ClickTarget::Page(page)),
            (_, None) => None,
        }
    }
}

/// Chrome as a single line of plain text.
fn chrome_line(chrome: &str, width: usize) -> String {
    layout_source(chrome, width.max(1) * 4)
        .into_iter()
        .map(|line| line.text)
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chrome;

    fn sheet(index: usize, markup: &str, height: SheetHeight) -> Sheet {
        Sheet {
            index,
            number: index + 1,
            total: 2,
            width: 600.0,
            height,
            top_bars: vec!["#c00".to_string()],
            header: Chrome::Default(format!("Page {} of 2", index + 1)),
            content: SheetContent::ReadOnly(markup.to_string()),
            footer: Chrome::Template("<b>Cells</b>".to_string()),
            bottom_bars: vec!["#c00".to_string()],
            background: None,
            selected: false,
            sparse: false,
            dirty: false,
        }
    }

    #[test]
    fn test_rows_follow_sheet_structure() {
        let layout = SheetLayout::build(
            &[sheet(0, "<p>Hello</p>", SheetHeight::Auto)],
            None,
            100,
            25.6,
            None,
        );
        let kinds: Vec<_> = layout.rows().iter().map(|r| &r.kind).collect();
        assert!(matches!(kinds[0], RowKind::Bar(_)));
        assert_eq!(kinds[1], &RowKind::Header("Page 1 of 2".to_string()));
        assert!(matches!(kinds[2], RowKind::Body(line) if line.text == "Hello"));
        assert_eq!(kinds[3], &RowKind::Footer("Cells".to_string()));
        assert!(matches!(kinds[4], RowKind::Bar(_)));
        assert_eq!(kinds[5], &RowKind::Gap);
        assert_eq!(layout.extents()[0], SheetExtent { top: 0, height: 5 });
        assert_eq!(layout.sheet_cols(), 60);
        assert_eq!(layout.left_margin(), 20);
    }

    #[test]
    fn test_fixed_height_pads_without_changing_natural_height() {
        let auto = SheetLayout::build(&[sheet(0, "x", SheetHeight::Auto)], None, 100, 10.0, None);
        let fixed = SheetLayout::build(
            &[sheet(0, "x", SheetHeight::Fixed(200.0))],
            None,
            100,
            10.0,
            None,
        );
        assert_eq!(fixed.extents()[0].height, 20);
        assert_eq!(auto.measure(0), fixed.measure(0));
        assert_eq!(auto.measure(0).unwrap().scroll_height, 50.0);
    }

    #[test]
    fn test_cover_and_image_clicks() {
        let layout = SheetLayout::build(
            &[sheet(0, r#"<img src="a.png" alt="A">"#, SheetHeight::Auto)],
            Some("cover.png"),
            100,
            25.6,
            None,
        );
        assert_eq!(layout.click_target(0), Some(ClickTarget::Cover));
        assert_eq!(layout.click_target(1), None);
        let image_row = layout
            .rows()
            .iter()
            .position(|r| matches!(&r.kind, RowKind::Body(l) if l.image.is_some()))
            .unwrap();
        assert_eq!(
            layout.click_target(image_row),
            Some(ClickTarget::Image {
                page: 0,
                url: "a.png".to_string()
            })
        );
        assert_eq!(layout.click_target(image_row + 1), Some(ClickTarget::Page(0)));
    }

    #[test]
    fn test_sheet_at_row_skips_gaps() {
        let layout = SheetLayout::build(
            &[
                sheet(0, "a", SheetHeight::Auto),
                sheet(1, "b", SheetHeight::Auto),
            ],
            None,
            100,
            25.6,
            None,
        );
        let gap = layout.extents()[0].height;
        assert_eq!(layout.sheet_at_row(0), Some(0));
        assert_eq!(layout.sheet_at_row(gap), Some(1));
        assert_eq!(layout.sheet_top(1), Some(gap + 1));
        assert_eq!(layout.sheet_at_row(10_000), None);
    }

    #[test]
    fn test_selected_sheet_shows_raw_markup_while_editing() {
        let mut editing = sheet(0, "", SheetHeight::Auto);
        editing.selected = true;
        editing.content = SheetContent::Editable("<p>A</p>\n<p>B</p>".to_string());
        let layout =
            SheetLayout::build(&[editing], None, 100, 25.6, Some((0, Cursor::at(1, 2))));
        let source_rows: Vec<_> = layout
            .rows()
            .iter()
            .filter_map(|r| match &r.kind {
                RowKind::Source { line, text } => Some((*line, text.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(source_rows, vec![(0, "<p>A</p>"), (1, "<p>B</p>")]);
    }

    #[test]
    fn test_narrow_terminal_clamps_sheet() {
        let layout = SheetLayout::build(&[sheet(0, "a", SheetHeight::Auto)], None, 30, 25.6, None);
        assert_eq!(layout.sheet_cols(), 28);
        assert_eq!(layout.left_margin(), 1);
    }
}
