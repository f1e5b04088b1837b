use std::fmt::{Display, Formatter};

use tracing::{debug, warn};

pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
pub const WHITE: Rgb = Rgb {
    r: 0xff,
    g: 0xff,
    b: 0xff,
};

const LIGHTNESS_THRESHOLD: f64 = 160.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Display for Rgb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// `#rrggbb` or `#rgb`, either case.
pub fn is_hex_color(color: &str) -> bool {
    split_color(color).is_some()
}

/// Splits a hex color into its components. Short `#rgb` digits are doubled.
pub fn split_color(color: &str) -> Option<Rgb> {
    let digits = color.strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let component = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    match digits.len() {
        6 => Some(Rgb {
            r: component(0..2)?,
            g: component(2..4)?,
            b: component(4..6)?,
        }),
        3 => Some(Rgb {
            r: component(0..1)? * 17,
            g: component(1..2)? * 17,
            b: component(2..3)? * 17,
        }),
        _ => None,
    }
}

/// Linear interpolation from `start` to `end`, `ratio` clamped to `[0, 1]`.
/// Black when either color does not parse.
pub fn color_between(start: &str, end: &str, ratio: f64) -> Rgb {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let (Some(from), Some(to)) = (split_color(start), split_color(end)) else {
        warn!(start, end, "cannot interpolate between invalid colors");
        return BLACK;
    };

    let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * ratio) as u8;
    let color = Rgb {
        r: mix(from.r, to.r),
        g: mix(from.g, to.g),
        b: mix(from.b, to.b),
    };
    debug!(%color, ratio, "color between");
    color
}

/// Black text on light backgrounds, white on dark ones.
pub fn contrast_color(color: &str) -> Rgb {
    match split_color(color) {
        Some(rgb) => {
            let lightness =
                f64::from(rgb.r) * 0.299 + f64::from(rgb.g) * 0.587 + f64::from(rgb.b) * 0.114;
            if lightness > LIGHTNESS_THRESHOLD {
                BLACK
            } else {
                WHITE
            }
        }
        None => BLACK,
    }
}
