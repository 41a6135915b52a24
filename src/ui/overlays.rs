use image::{DynamicImage, Rgba};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};
use ratatui_image::picker::ProtocolType;
use ratatui_image::{Resize, StatefulImage};
use tracing::debug;

use crate::app::{MagnifierFrame, Model, viewer_size_px};
use crate::image::{ColorDepth, MagnifierCanvas, reduce_to_ansi256};
use crate::magnifier::{MagnifierKey, Transform};

const MAGNIFIER_BACKDROP: Rgba<u8> = Rgba([16, 16, 16, 255]);

const CONTROLS: [(&str, MagnifierKey); 4] = [
    (" + ", MagnifierKey::ZoomIn),
    (" - ", MagnifierKey::ZoomOut),
    (" 1:1 ", MagnifierKey::Reset),
    (" x ", MagnifierKey::Escape),
];

/// Help popup. Long help scrolls; `model.help_scroll` is clamped to the
/// last full screen.
pub fn render_help_overlay(model: &mut Model, frame: &mut Frame, area: Rect) {
    let popup_width = area.width.saturating_sub(12).max(48);
    let popup_height = area.height.saturating_sub(4).max(12);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let global_cfg = model
        .config_global_path
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string());
    let local_cfg = model
        .config_local_path
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());

    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let lines = vec![
        Line::styled("Navigation", section_style),
        Line::raw("  j/k or Up/Down      Scroll"),
        Line::raw("  Space/PageDown      Page down"),
        Line::raw("  b/PageUp            Page up"),
        Line::raw("  n / p               Next / previous sheet"),
        Line::raw("  g / G               Top / bottom"),
        Line::raw(""),
        Line::styled("Editing", section_style),
        Line::raw("  e / Ctrl-e          Toggle edit mode"),
        Line::raw("  Click, Enter        Edit the sheet"),
        Line::raw("  Esc                 Leave the sheet"),
        Line::raw("  s / Ctrl-s          Write snapshot"),
        Line::raw(""),
        Line::styled("Images", section_style),
        Line::raw("  Click image         Open magnifier"),
        Line::raw("  Wheel, + / -        Zoom"),
        Line::raw("  Drag                Pan"),
        Line::raw("  Double-click, 0     Toggle 2x / reset"),
        Line::raw("  Esc, click outside  Close"),
        Line::raw(""),
        Line::styled("Other", section_style),
        Line::raw("  a                   Toggle sparse-page autofix"),
        Line::raw("  w                   Toggle watch"),
        Line::raw("  r                   Reload book"),
        Line::raw("  q / Ctrl-c          Quit"),
        Line::raw("  ? / F1              Toggle help"),
        Line::raw(""),
        Line::styled("Config", section_style),
        Line::raw(format!("  Global: {global_cfg}")),
        Line::raw(format!("  Local override: {local_cfg}")),
    ];

    let block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    let inner = block.inner(popup);
    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);

    // The last inner row holds the scroll hint.
    let rows = inner.height.saturating_sub(1);
    let last_start = lines.len().saturating_sub(usize::from(rows));
    model.help_scroll = model.help_scroll.min(last_start);
    let visible: Vec<Line> = lines
        .into_iter()
        .skip(model.help_scroll)
        .take(usize::from(rows))
        .collect();
    frame.render_widget(
        Paragraph::new(visible),
        Rect::new(inner.x, inner.y, inner.width, rows),
    );

    let hint = if last_start == 0 {
        "Esc closes"
    } else {
        "j/k scroll \u{2502} Esc closes"
    };
    frame.render_widget(
        Paragraph::new(Line::styled(hint, Style::default().fg(Color::DarkGray))),
        Rect::new(inner.x, inner.y + rows, inner.width, 1.min(inner.height)),
    );
}

/// Outer rect of the magnifier overlay.
pub fn magnifier_popup_rect(area: Rect) -> Rect {
    let width = area.width.saturating_sub(4).max(20);
    let height = area.height.saturating_sub(2).max(8);
    centered_popup_rect(width, height, area)
}

/// Cells the magnified image is drawn into.
pub fn magnifier_viewer_rect(area: Rect) -> Rect {
    let popup = magnifier_popup_rect(area);
    // Border on every side, plus one row for the controls.
    Rect::new(
        popup.x + 1,
        popup.y + 1,
        popup.width.saturating_sub(2),
        popup.height.saturating_sub(3),
    )
}

/// Clickable zoom controls below the viewer.
pub fn magnifier_controls(area: Rect) -> Vec<(Rect, MagnifierKey)> {
    let popup = magnifier_popup_rect(area);
    let row = popup.y + popup.height.saturating_sub(2);
    let mut x = popup.x + 1;
    let right = popup.x + popup.width.saturating_sub(1);
    let mut controls = Vec::with_capacity(CONTROLS.len());
    for (label, key) in CONTROLS {
        #[allow(clippy::cast_possible_truncation)]
        let width = label.len() as u16;
        if x + width > right {
            break;
        }
        controls.push((Rect::new(x, row, width, 1), key));
        x += width + 1;
    }
    controls
}

pub fn render_magnifier_overlay(model: &mut Model, frame: &mut Frame, area: Rect) {
    let Some(magnifier) = model.magnifier.as_ref() else {
        return;
    };
    let src = magnifier.src().to_string();
    let transform = magnifier.transform();
    let popup = magnifier_popup_rect(area);
    let viewer = magnifier_viewer_rect(area);

    let block = Block::default()
        .title(format!(" {src} ({:.0}%) ", transform.scale * 100.0))
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::Black).fg(Color::White));
    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);

    let control_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    for ((rect, _), (label, _)) in magnifier_controls(area).into_iter().zip(CONTROLS) {
        frame.render_widget(Paragraph::new(label).style(control_style), rect);
    }

    let stale = model.magnifier_frame.as_ref().is_none_or(|cached| {
        cached.src != src || cached.transform != transform || cached.area != viewer
    });
    if stale {
        model.magnifier_frame = build_magnifier_frame(model, src, transform, viewer);
    }

    if let Some(cached) = model.magnifier_frame.as_mut() {
        let widget = StatefulImage::default().resize(Resize::Scale(None));
        frame.render_stateful_widget(widget, viewer, &mut cached.protocol);
    } else {
        let message = if model.magnifier_image_size().is_some() {
            "Image preview needs a graphics-capable terminal"
        } else {
            "Image unavailable"
        };
        let y = viewer.y + viewer.height / 2;
        frame.render_widget(
            Paragraph::new(message)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Indexed(245))),
            Rect::new(viewer.x, y, viewer.width, 1),
        );
    }
}

fn build_magnifier_frame(
    model: &mut Model,
    src: String,
    transform: Transform,
    viewer: Rect,
) -> Option<MagnifierFrame> {
    let image = model.images.load(&src)?.to_rgba8();
    let picker = model.picker.as_ref()?;
    let size = viewer_size_px(viewer);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let canvas = MagnifierCanvas::new(
        image.width(),
        image.height(),
        size.x as u32,
        size.y as u32,
    );
    let mut rendered = canvas.render(&image, &transform, MAGNIFIER_BACKDROP);
    // Half-blocks are drawn with cell colours.
    if matches!(picker.protocol_type(), ProtocolType::Halfblocks)
        && !ColorDepth::detect().is_truecolor()
    {
        reduce_to_ansi256(&mut rendered);
    }
    debug!(%src, scale = transform.scale, "magnifier frame rendered");
    Some(MagnifierFrame {
        protocol: picker.new_resize_protocol(DynamicImage::ImageRgba8(rendered)),
        src,
        transform,
        area: viewer,
    })
}

fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
