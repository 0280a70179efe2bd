//! The palette formatter, which turns colors into strings and back.
//!
//! Two textual forms are supported:
//! - hex: `#rrggbb` with lowercase digits, e.g. `#ff8000`
//! - rgb: `rgb(r, g, b)` with decimal components, e.g. `rgb(255, 128, 0)`
//!
//! Formatting is exact: parsing the string of a color gives back the same color.

use crate::ParseColorError;
use palette::Srgb;
use std::fmt::Display;

/// The textual form of a palette color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorFormat {
    /// `#rrggbb`, lowercase.
    #[default]
    Hex,
    /// `rgb(r, g, b)`.
    Rgb,
}

impl Display for ColorFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorFormat::Hex => write!(f, "hex"),
            ColorFormat::Rgb => write!(f, "rgb"),
        }
    }
}

/// Formats a single color.
///
/// # Examples
/// ```
/// # use swatch::format::{format_color, ColorFormat};
/// # use palette::Srgb;
/// assert_eq!(format_color(Srgb::new(255, 128, 0), ColorFormat::Hex), "#ff8000");
/// assert_eq!(format_color(Srgb::new(255, 128, 0), ColorFormat::Rgb), "rgb(255, 128, 0)");
/// ```
#[must_use]
pub fn format_color(color: Srgb<u8>, format: ColorFormat) -> String {
    let (r, g, b) = color.into_components();
    match format {
        ColorFormat::Hex => format!("#{r:02x}{g:02x}{b:02x}"),
        ColorFormat::Rgb => format!("rgb({r}, {g}, {b})"),
    }
}

/// Formats at most `k` colors of the palette, keeping their order.
#[must_use]
pub fn format_palette(palette: &[Srgb<u8>], format: ColorFormat, k: usize) -> Vec<String> {
    palette
        .iter()
        .take(k)
        .map(|&color| format_color(color, format))
        .collect()
}

/// Parses a color in either of the forms produced by [`format_color`].
///
/// Hex digits may be upper or lower case, and whitespace around the rgb components is ignored.
///
/// # Errors
/// Returns [`ParseColorError::InvalidHex`] for a string starting with `#` that is not six hex digits,
/// and [`ParseColorError::InvalidRgb`] for anything else that is not `rgb(r, g, b)` with components in `0..=255`.
pub fn parse_color(s: &str) -> Result<Srgb<u8>, ParseColorError> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        parse_hex(hex).ok_or_else(|| ParseColorError::InvalidHex(s.to_owned()))
    } else {
        parse_rgb(s).ok_or_else(|| ParseColorError::InvalidRgb(s.to_owned()))
    }
}

/// Parses the six digits after the `#`.
fn parse_hex(hex: &str) -> Option<Srgb<u8>> {
    if hex.len() != 6 || !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Srgb::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Parses `rgb(r, g, b)`.
fn parse_rgb(s: &str) -> Option<Srgb<u8>> {
    let inner = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let mut components = inner.split(',').map(|c| {
        let c = c.trim();
        // u8::from_str accepts a leading '+'
        if c.bytes().all(|d| d.is_ascii_digit()) {
            c.parse::<u8>().ok()
        } else {
            None
        }
    });

    let r = components.next()??;
    let g = components.next()??;
    let b = components.next()??;
    if components.next().is_some() {
        None
    } else {
        Some(Srgb::new(r, g, b))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(format_color(Srgb::new(0, 10, 171), ColorFormat::Hex), "#000aab");
        assert_eq!(format_color(Srgb::new(255, 255, 255), ColorFormat::default()), "#ffffff");
    }

    #[test]
    fn round_trip() {
        for color in test_data_256() {
            for format in [ColorFormat::Hex, ColorFormat::Rgb] {
                let s = format_color(color, format);
                assert_eq!(parse_color(&s).unwrap(), color, "{s}");
            }
        }
    }

    #[test]
    fn palette_is_truncated_in_order() {
        let palette = [Srgb::new(1, 2, 3), Srgb::new(4, 5, 6), Srgb::new(7, 8, 9)];
        assert_eq!(
            format_palette(&palette, ColorFormat::Rgb, 2),
            vec!["rgb(1, 2, 3)", "rgb(4, 5, 6)"]
        );
        assert_eq!(format_palette(&palette, ColorFormat::Hex, 10).len(), 3);
        assert!(format_palette(&[], ColorFormat::Hex, 5).is_empty());
    }

    #[test]
    fn lenient_parsing() {
        assert_eq!(parse_color("#FF8000").unwrap(), Srgb::new(255, 128, 0));
        assert_eq!(parse_color(" rgb(1,2 , 3) ").unwrap(), Srgb::new(1, 2, 3));
    }

    #[test]
    fn invalid_colors() {
        for s in ["#fff", "#ff80001", "#gg8000", "#", "#ééé"] {
            assert_eq!(parse_color(s), Err(ParseColorError::InvalidHex(s.to_owned())));
        }

        for s in ["rgb(256, 0, 0)", "rgb(1, 2)", "rgb(1, 2, 3, 4)", "rgb(+1, 2, 3)", "rgb(-1, 2, 3)", "ff8000", ""] {
            assert_eq!(parse_color(s), Err(ParseColorError::InvalidRgb(s.to_owned())));
        }
    }
}
