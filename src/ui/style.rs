//! Styles for sheet content and theme colours.
//!
//! Line styles use semantic ANSI colours so they follow the terminal
//! palette. Theme colours are CSS hex strings mapped to RGB, or to the
//! nearest ANSI-256 entry when the terminal lacks truecolor.

use ratatui::style::{Color, Modifier, Style};

use crate::document::{LineKind, Theme};
use crate::image::ansi256_index;

/// Get the style for a given line kind.
pub fn style_for_line_kind(kind: LineKind) -> Style {
    match kind {
        LineKind::Heading(1) => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        LineKind::Heading(2) => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        LineKind::Heading(3) => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        LineKind::Heading(_) => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD),
        LineKind::Code => Style::default().fg(Color::Indexed(245)),
        LineKind::Quote => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::ITALIC),
        LineKind::Rule => Style::default()
            .fg(Color::Indexed(240))
            .add_modifier(Modifier::DIM),
        // Images stand out as something to click.
        LineKind::Image => Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::ITALIC | Modifier::UNDERLINED),
        LineKind::ListItem | LineKind::Paragraph | LineKind::Blank => Style::default(),
    }
}

/// Parse a CSS colour: `#rgb`, `#rrggbb`, or a few basic names.
pub fn parse_css_color(value: &str) -> Option<(u8, u8, u8)> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return match hex.len() {
            3 => {
                let mut channels = hex.chars().map(|c| c.to_digit(16));
                let mut next = || {
                    #[allow(clippy::cast_possible_truncation)]
                    channels.next().flatten().map(|d| (d * 17) as u8)
                };
                Some((next()?, next()?, next()?))
            }
            6 => {
                let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
                Some((channel(0)?, channel(2)?, channel(4)?))
            }
            _ => None,
        };
    }
    match value.to_ascii_lowercase().as_str() {
        "black" => Some((0, 0, 0)),
        "white" => Some((255, 255, 255)),
        "red" => Some((255, 0, 0)),
        "green" => Some((0, 128, 0)),
        "blue" => Some((0, 0, 255)),
        "gray" | "grey" => Some((128, 128, 128)),
        "navy" => Some((0, 0, 128)),
        "teal" => Some((0, 128, 128)),
        "orange" => Some((255, 165, 0)),
        "purple" => Some((128, 0, 128)),
        _ => None,
    }
}

/// Terminal colour for an RGB value.
pub fn terminal_color((r, g, b): (u8, u8, u8), truecolor: bool) -> Color {
    if truecolor {
        Color::Rgb(r, g, b)
    } else {
        Color::Indexed(ansi256_index(r, g, b))
    }
}

/// Colours used to draw sheets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPalette {
    pub sheet_bg: Option<Color>,
    pub text: Option<Color>,
    pub accent: Color,
    pub border: Color,
    pub selected_border: Color,
    pub chrome: Style,
    pub status_bg: Color,
    pub status_fg: Color,
}

impl Default for SheetPalette {
    fn default() -> Self {
        Self {
            sheet_bg: None,
            text: None,
            accent: Color::Cyan,
            border: Color::Indexed(240),
            selected_border: Color::Yellow,
            chrome: Style::default().fg(Color::Indexed(245)),
            status_bg: Color::Indexed(236),
            status_fg: Color::Indexed(252),
        }
    }
}

impl SheetPalette {
    pub fn from_theme(theme: Option<&Theme>, truecolor: bool) -> Self {
        let defaults = Self::default();
        let Some(theme) = theme else {
            return defaults;
        };
        let color = |value: &Option<String>| {
            value
                .as_deref()
                .and_then(parse_css_color)
                .map(|rgb| terminal_color(rgb, truecolor))
        };
        let accent = color(&theme.accent).unwrap_or(defaults.accent);
        Self {
            sheet_bg: color(&theme.page_bg).or_else(|| color(&theme.body_bg)),
            text: color(&theme.text),
            accent,
            chrome: Style::default().fg(accent),
            ..defaults
        }
    }

    /// Colour for an accent bar.
    pub fn bar(&self, value: &str, truecolor: bool) -> Color {
        parse_css_color(value).map_or(self.accent, |rgb| terminal_color(rgb, truecolor))
    }

    /// Base style for sheet content.
    pub fn sheet_style(&self) -> Style {
        let mut style = Style::default();
        if let Some(bg) = self.sheet_bg {
            style = style.bg(bg);
        }
        if let Some(fg) = self.text {
            style = style.fg(fg);
        }
        style
    }
}
