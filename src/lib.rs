//! A library for extracting the dominant colors of an image as a small palette.
//!
//! Palette extraction runs in three stages:
//! 1. The [`sample`] stage walks the decoded pixels at a fixed stride given by the [`Quality`],
//!    dropping transparent pixels and, optionally, near-white ones.
//! 2. The samples are deduplicated into [`UniqueColorCounts`] and quantized into at most
//!    [`PaletteSize`] colors, either with deterministic [`kmeans`] (the default) or [`median_cut`].
//! 3. The [`format`] stage renders each color as a string such as `#ff8000` or `rgb(255, 128, 0)`.
//!
//! Colors are always returned from most to least dominant, and the same input always gives the same output.
//!
//! # Features
//! - `threads`: exposes parallel versions of the sampling and pipeline functions via [`rayon`].
//! - `image`: enables integration with the [`image`] crate, including the [`load`] module
//!   for decoding PNG and JPEG files, in-memory bytes, and base64 data URIs.
//!
//! # Examples
//! The simplest entry point is [`get_palette`]:
//! ```
//! # use swatch::{get_palette, PixelBuffer};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut bytes = [[230, 40, 40, 255]; 60].concat();
//! bytes.extend([[20, 40, 200, 255]; 40].concat());
//! let pixels = PixelBuffer::rgba(&bytes, 10, 10)?;
//!
//! let palette = get_palette(pixels, 5, 1, true)?;
//! assert_eq!(palette, vec!["#e62828", "#1428c8"]);
//! # Ok(())
//! # }
//! ```
//!
//! For more control, see [`PalettePipeline`]:
//! ```no_run
//! # use swatch::{PalettePipeline, PaletteSize, Quality, QuantizeMethod, MedianCutOptions};
//! # use swatch::format::ColorFormat;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("some image")?.into_rgba8();
//!
//! let palette = PalettePipeline::try_from(&img)?
//!     .palette_size(PaletteSize::try_from(8u8)?) // set the max number of colors in the palette
//!     .quality(Quality::BEST) // inspect every pixel
//!     .ignore_white(false) // keep near-white pixels
//!     .quantize_method(MedianCutOptions::new())
//!     .palette_strings(ColorFormat::Rgb);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

mod api;
mod color_counts;
mod error;
mod types;

pub mod format;
pub mod kmeans;
pub mod median_cut;
pub mod sample;

#[cfg(feature = "image")]
pub mod load;

pub use api::*;
pub use color_counts::*;
pub use error::*;
pub use format::ColorFormat;
pub use kmeans::Seeding;
pub use types::*;

use tracing::debug;

/// The maximum supported image size in number of pixels is `u32::MAX`.
pub const MAX_PIXELS: u32 = u32::MAX;

/// The maximum supported number of palette colors is `256`.
pub const MAX_COLORS: u16 = u8::MAX as u16 + 1;

/// `MAX_COLORS` as a `usize` for array and `Vec` lengths.
pub(crate) const MAX_K: usize = MAX_COLORS as usize;

/// The smallest (best) quality, which inspects every pixel.
pub const MIN_QUALITY: u8 = 1;

/// The largest (fastest) quality, which inspects every 10th pixel.
pub const MAX_QUALITY: u8 = 10;

/// The number of colors returned by default.
pub const DEFAULT_COLOR_COUNT: u16 = 5;

/// The default sampling quality.
pub const DEFAULT_QUALITY: u8 = MAX_QUALITY;

/// Near-white pixels are ignored by default.
pub const DEFAULT_IGNORE_WHITE: bool = true;

/// Extracts up to `color_count` dominant colors from the pixels as lowercase `#rrggbb` strings,
/// most dominant first.
///
/// `quality` must be in [`MIN_QUALITY`]`..=`[`MAX_QUALITY`]: every `quality`-th pixel is inspected.
/// Transparent pixels are always skipped, and near-white pixels are skipped if `ignore_white` is set.
/// An image without any eligible pixels gives an empty palette.
///
/// The usual defaults are [`DEFAULT_COLOR_COUNT`], [`DEFAULT_QUALITY`], and [`DEFAULT_IGNORE_WHITE`].
///
/// # Errors
/// Returns [`Error::InvalidParameter`] if `color_count` is not in `1..=`[`MAX_COLORS`]
/// or `quality` is out of range. Nothing is computed in that case.
pub fn get_palette(
    pixels: PixelBuffer<'_>,
    color_count: u32,
    quality: u32,
    ignore_white: bool,
) -> Result<Vec<String>, Error> {
    let k = PaletteSize::try_from(color_count)?;
    let quality = Quality::try_from(quality)?;
    Ok(get_palette_with(pixels, k, quality, ignore_white, ColorFormat::Hex))
}

/// The infallible form of [`get_palette`] over already validated parameters,
/// with a choice of output format.
#[must_use]
pub fn get_palette_with(
    pixels: PixelBuffer<'_>,
    k: PaletteSize,
    quality: Quality,
    ignore_white: bool,
    format: ColorFormat,
) -> Vec<String> {
    debug!(%k, %quality, ignore_white, %format, "extracting palette");
    PalettePipeline::new(pixels)
        .palette_size(k)
        .quality(quality)
        .ignore_white(ignore_white)
        .palette_strings(format)
}
