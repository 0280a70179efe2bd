//! Contains various types needed across the crate.

use crate::{
    InvalidParameter, PixelReadError, UniqueColorCounts, DEFAULT_COLOR_COUNT, DEFAULT_QUALITY,
    MAX_COLORS, MAX_PIXELS, MAX_QUALITY, MIN_QUALITY,
};
use palette::Srgb;
use std::fmt::Display;
#[cfg(feature = "image")]
use image::{RgbImage, RgbaImage};

/// The memory layout of each pixel in a [`PixelBuffer`].
///
/// Both layouts use 8 bits per channel and are not premultiplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelLayout {
    /// 4 bytes per pixel: red, green, blue, alpha.
    #[default]
    Rgba,
    /// 3 bytes per pixel: red, green, blue. Every pixel is treated as opaque.
    Rgb,
}

impl PixelLayout {
    /// The number of bytes used by a single pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgba => 4,
            PixelLayout::Rgb => 3,
        }
    }
}

impl Display for PixelLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelLayout::Rgba => write!(f, "RGBA"),
            PixelLayout::Rgb => write!(f, "RGB"),
        }
    }
}

/// A borrowed, row-major buffer of decoded pixels with its dimensions.
///
/// The buffer length is guaranteed to be exactly `width * height * bytes_per_pixel`
/// and the number of pixels is at most [`MAX_PIXELS`].
/// Nothing in this crate mutates or retains the buffer past a call.
///
/// # Examples
/// ```
/// # use swatch::{PixelBuffer, PixelReadError};
/// # fn main() -> Result<(), PixelReadError> {
/// let bytes = [255, 0, 0, 255, 0, 0, 255, 255];
/// let pixels = PixelBuffer::rgba(&bytes, 2, 1)?;
/// assert_eq!(pixels.num_pixels(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBuffer<'a> {
    /// The raw pixel bytes.
    bytes: &'a [u8],
    /// The image width in pixels.
    width: u32,
    /// The image height in pixels.
    height: u32,
    /// The layout of each pixel in `bytes`.
    layout: PixelLayout,
}

impl<'a> PixelBuffer<'a> {
    /// Creates a new [`PixelBuffer`], checking that the length of `bytes` matches the dimensions and layout.
    ///
    /// # Errors
    /// Returns [`PixelReadError::TooManyPixels`] if `width * height` is above [`MAX_PIXELS`],
    /// or [`PixelReadError::LengthMismatch`] if the buffer has the wrong length.
    pub fn new(
        bytes: &'a [u8],
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Self, PixelReadError> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels > u64::from(MAX_PIXELS) {
            return Err(PixelReadError::TooManyPixels(pixels));
        }

        let expected = pixels * layout.bytes_per_pixel() as u64;
        if u64::try_from(bytes.len()).map_or(true, |len| len != expected) {
            return Err(PixelReadError::LengthMismatch {
                width,
                height,
                layout,
                expected,
                actual: bytes.len(),
            });
        }

        Ok(Self { bytes, width, height, layout })
    }

    /// Creates a new [`PixelBuffer`] over RGBA pixels.
    ///
    /// # Errors
    /// See [`PixelBuffer::new`].
    pub fn rgba(bytes: &'a [u8], width: u32, height: u32) -> Result<Self, PixelReadError> {
        Self::new(bytes, width, height, PixelLayout::Rgba)
    }

    /// Creates a new [`PixelBuffer`] over RGB pixels.
    ///
    /// # Errors
    /// See [`PixelBuffer::new`].
    pub fn rgb(bytes: &'a [u8], width: u32, height: u32) -> Result<Self, PixelReadError> {
        Self::new(bytes, width, height, PixelLayout::Rgb)
    }

    /// Returns the raw pixel bytes.
    #[must_use]
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the image width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the image height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel layout.
    #[must_use]
    pub const fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Returns the number of pixels in the buffer.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn num_pixels(&self) -> u32 {
        (self.bytes.len() / self.layout.bytes_per_pixel()) as u32
    }

    /// Whether or not the buffer contains no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbaImage> for PixelBuffer<'a> {
    type Error = PixelReadError;

    fn try_from(image: &'a RgbaImage) -> Result<Self, Self::Error> {
        let len = image.pixels().len() * PixelLayout::Rgba.bytes_per_pixel();
        Self::rgba(&image.as_raw()[..len], image.width(), image.height())
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for PixelBuffer<'a> {
    type Error = PixelReadError;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        let len = image.pixels().len() * PixelLayout::Rgb.bytes_per_pixel();
        Self::rgb(&image.as_raw()[..len], image.width(), image.height())
    }
}

/// This type is used to specify the maximum number of colors to include in a palette.
///
/// This is a simple new type wrapper around `u16` with the invariant that it must be
/// between `1` and [`MAX_COLORS`] (inclusive).
///
/// # Examples
/// Use `try_into` or [`PaletteSize::from_clamped`] to create [`PaletteSize`]s.
///
/// ```
/// # use swatch::{PaletteSize, InvalidParameter};
/// # fn main() -> Result<(), InvalidParameter> {
/// let size = PaletteSize::try_from(16u8)?;
/// let size: PaletteSize = 128u16.try_into()?;
/// let size = PaletteSize::from_clamped(1024);
/// assert_eq!(size, PaletteSize::MAX);
/// assert!(PaletteSize::try_from(0u32).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PaletteSize(u16);

impl PaletteSize {
    /// The smallest palette size, a single color.
    pub const MIN: Self = Self(1);

    /// The maximum supported palette size (given by [`MAX_COLORS`]).
    pub const MAX: Self = Self(MAX_COLORS);

    /// Gets the inner `u16` value.
    #[must_use]
    pub const fn into_inner(self) -> u16 {
        self.0
    }

    /// Gets the inner value as a `usize` for lengths and indexing.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Creates a [`PaletteSize`] by clamping the given `u16` to `1..=MAX_COLORS`.
    #[must_use]
    pub const fn from_clamped(value: u16) -> Self {
        if value == 0 {
            Self::MIN
        } else if value <= MAX_COLORS {
            Self(value)
        } else {
            Self::MAX
        }
    }
}

impl Default for PaletteSize {
    fn default() -> Self {
        Self(DEFAULT_COLOR_COUNT)
    }
}

impl From<PaletteSize> for u16 {
    fn from(val: PaletteSize) -> Self {
        val.into_inner()
    }
}

impl TryFrom<u32> for PaletteSize {
    type Error = InvalidParameter;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match u16::try_from(value) {
            Ok(size @ 1..=MAX_COLORS) => Ok(Self(size)),
            _ => Err(InvalidParameter::ColorCount(value)),
        }
    }
}

impl TryFrom<u16> for PaletteSize {
    type Error = InvalidParameter;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        u32::from(value).try_into()
    }
}

impl TryFrom<u8> for PaletteSize {
    type Error = InvalidParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        u32::from(value).try_into()
    }
}

impl Display for PaletteSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_inner())
    }
}

/// The sampling quality, trading accuracy for speed.
///
/// This is a new type wrapper around `u8` with the invariant that it lies in
/// [`MIN_QUALITY`]`..=`[`MAX_QUALITY`]. A quality of `1` inspects every pixel,
/// while a quality of `n` inspects every `n`-th pixel of the flattened image.
///
/// # Examples
/// ```
/// # use swatch::{Quality, InvalidParameter};
/// # fn main() -> Result<(), InvalidParameter> {
/// let quality = Quality::try_from(3u8)?;
/// assert_eq!(quality.stride(), 3);
/// assert_eq!(Quality::from_clamped(0), Quality::BEST);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Quality(u8);

impl Quality {
    /// Inspect every pixel.
    pub const BEST: Self = Self(MIN_QUALITY);

    /// Inspect every [`MAX_QUALITY`]-th pixel.
    pub const FASTEST: Self = Self(MAX_QUALITY);

    /// Gets the inner `u8` value.
    #[must_use]
    pub const fn into_inner(self) -> u8 {
        self.0
    }

    /// Returns the distance between two inspected pixels in the flattened pixel index.
    #[must_use]
    pub const fn stride(self) -> usize {
        self.0 as usize
    }

    /// Creates a [`Quality`] by clamping the given value to `MIN_QUALITY..=MAX_QUALITY`.
    #[must_use]
    pub const fn from_clamped(value: u8) -> Self {
        if value < MIN_QUALITY {
            Self::BEST
        } else if value > MAX_QUALITY {
            Self::FASTEST
        } else {
            Self(value)
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

impl From<Quality> for u8 {
    fn from(val: Quality) -> Self {
        val.into_inner()
    }
}

impl TryFrom<u32> for Quality {
    type Error = InvalidParameter;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(quality @ MIN_QUALITY..=MAX_QUALITY) => Ok(Self(quality)),
            _ => Err(InvalidParameter::Quality(value)),
        }
    }
}

impl TryFrom<u8> for Quality {
    type Error = InvalidParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        u32::from(value).try_into()
    }
}

impl Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_inner())
    }
}

/// The output struct returned by quantization functions.
///
/// `palette` holds the representative colors ordered by descending weight,
/// and `counts` holds the number of samples assigned to each palette color.
/// Ties in weight keep the order in which the clusters were created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuantizeOutput {
    /// The representative colors, most dominant first.
    pub palette: Vec<Srgb<u8>>,
    /// The number of samples assigned to each color in `palette`. Every count is nonzero.
    pub counts: Vec<u32>,
}

impl QuantizeOutput {
    /// Creates a palette directly from the distinct colors, used when there are
    /// no more distinct colors than the requested palette size.
    ///
    /// Colors with equal counts are ordered by their first appearance in the samples.
    pub(crate) fn trivial_palette(color_counts: &UniqueColorCounts) -> Self {
        let (palette, counts) = color_counts
            .by_frequency()
            .into_iter()
            .map(|i| (color_counts.colors()[i], color_counts.counts()[i]))
            .unzip();

        Self { palette, counts }
    }

    /// Builds the output from unordered clusters, dropping empty ones.
    pub(crate) fn from_clusters(clusters: impl IntoIterator<Item = (Srgb<u8>, u32)>) -> Self {
        let (palette, counts) = clusters
            .into_iter()
            .filter(|&(_, count)| count > 0)
            .unzip();

        Self { palette, counts }.sorted_by_weight()
    }

    /// Stably sorts the palette by descending count.
    fn sorted_by_weight(self) -> Self {
        let Self { palette, counts } = self;
        let mut clusters = palette.into_iter().zip(counts).collect::<Vec<_>>();
        clusters.sort_by(|(_, a), (_, b)| b.cmp(a));
        let (palette, counts) = clusters.into_iter().unzip();
        Self { palette, counts }
    }

    /// Keeps only the first `k` colors.
    pub fn truncate(&mut self, k: PaletteSize) {
        self.palette.truncate(k.as_usize());
        self.counts.truncate(k.as_usize());
    }

    /// The number of colors in the palette.
    #[must_use]
    pub fn len(&self) -> usize {
        self.palette.len()
    }

    /// Whether or not the palette is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.palette.is_empty()
    }

    /// Returns the palette color closest to `color` by Euclidean distance in RGB.
    ///
    /// The earliest (most dominant) color wins ties. Returns `None` for an empty palette.
    #[must_use]
    pub fn nearest(&self, color: Srgb<u8>) -> Option<Srgb<u8>> {
        self.palette
            .iter()
            .copied()
            .min_by_key(|&candidate| distance_squared(candidate, color))
    }
}

/// The squared Euclidean distance between two colors.
pub(crate) fn distance_squared(a: Srgb<u8>, b: Srgb<u8>) -> u32 {
    let a = a.into_components();
    let b = b.into_components();
    [(a.0, b.0), (a.1, b.1), (a.2, b.2)]
        .into_iter()
        .map(|(x, y)| {
            let d = u32::from(x.abs_diff(y));
            d * d
        })
        .sum()
}
