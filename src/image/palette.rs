//! Colour depth detection and reduction to the xterm-256 palette.

use image::RgbaImage;

/// Channel values of the xterm 6x6x6 colour cube.
const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

/// How many colours the terminal can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    TrueColor,
    Indexed,
}

impl ColorDepth {
    /// Detect from the process environment.
    pub fn detect() -> Self {
        Self::from_env(|name| std::env::var(name).ok())
    }

    /// Detect from an environment lookup.
    ///
    /// `FOLIO_TRUECOLOR` overrides everything else.
    pub fn from_env(var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(force) = var("FOLIO_TRUECOLOR") {
            return if matches!(
                force.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ) {
                Self::TrueColor
            } else {
                Self::Indexed
            };
        }
        // Terminal.app accepts 24-bit escapes but renders them wrong.
        if var("TERM_PROGRAM").as_deref() == Some("Apple_Terminal") {
            return Self::Indexed;
        }
        let mentions = |name: &str, needles: &[&str]| {
            var(name).is_some_and(|value| {
                let value = value.to_ascii_lowercase();
                needles.iter().any(|needle| value.contains(needle))
            })
        };
        if mentions("COLORTERM", &["truecolor", "24bit"])
            || mentions("TERM", &["direct", "truecolor"])
        {
            Self::TrueColor
        } else {
            Self::Indexed
        }
    }

    pub const fn is_truecolor(self) -> bool {
        matches!(self, Self::TrueColor)
    }
}

fn cube_level(value: u8) -> u8 {
    let mut best = 0;
    for (index, level) in CUBE_LEVELS.iter().enumerate() {
        if value.abs_diff(*level) < value.abs_diff(CUBE_LEVELS[best]) {
            best = index;
        }
    }
    #[allow(clippy::cast_possible_truncation)]
    let best = best as u8;
    best
}

/// Nearest colour-cube index for an RGB value.
pub fn ansi256_index(r: u8, g: u8, b: u8) -> u8 {
    16 + 36 * cube_level(r) + 6 * cube_level(g) + cube_level(b)
}

/// RGB value of a colour-cube or grey-ramp index. System colours map to
/// black.
pub fn ansi256_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        16..=231 => {
            let i = index - 16;
            (
                CUBE_LEVELS[usize::from(i / 36)],
                CUBE_LEVELS[usize::from((i / 6) % 6)],
                CUBE_LEVELS[usize::from(i % 6)],
            )
        }
        232..=255 => {
            let grey = 8 + (index - 232) * 10;
            (grey, grey, grey)
        }
        _ => (0, 0, 0),
    }
}

/// Snap every pixel to the colour cube in place, keeping alpha.
pub fn reduce_to_ansi256(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let (r, g, b) = ansi256_rgb(ansi256_index(pixel[0], pixel[1], pixel[2]));
        pixel[0] = r;
        pixel[1] = g;
        pixel[2] = b;
    }
}
