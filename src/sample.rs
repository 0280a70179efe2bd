//! The pixel sampler, which reduces a [`PixelBuffer`] to the colors that take part in quantization.
//!
//! Pixels are inspected at a fixed stride over the flattened (row-major) pixel index,
//! so that the subsample is spread over the whole image instead of a single region.
//! A pixel is dropped if:
//! - its alpha is at or below the [`SampleOptions::alpha_threshold`] (RGBA buffers only), or
//! - [`SampleOptions::ignore_white`] is set and every channel is above the [`SampleOptions::white_threshold`].

use crate::{PixelBuffer, Quality};
use palette::Srgb;
use std::{
    iter::{FusedIterator, StepBy},
    slice::ChunksExact,
};
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// The default channel value that every channel must exceed for a pixel to count as near-white.
pub const DEFAULT_WHITE_THRESHOLD: u8 = 250;

/// The default alpha value at or below which a pixel is treated as transparent background.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 125;

/// A builder struct to specify the parameters for pixel sampling.
///
/// # Examples
/// ```
/// # use swatch::{sample::SampleOptions, Quality};
/// let options = SampleOptions::new()
///     .quality(Quality::BEST)
///     .ignore_white(false)
///     .alpha_threshold(0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOptions {
    /// Controls the stride between inspected pixels.
    quality: Quality,
    /// Whether or not to drop near-white pixels.
    ignore_white: bool,
    /// The near-white channel threshold.
    white_threshold: u8,
    /// The transparency threshold.
    alpha_threshold: u8,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleOptions {
    /// Creates a new [`SampleOptions`] with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            quality: Quality::FASTEST,
            ignore_white: true,
            white_threshold: DEFAULT_WHITE_THRESHOLD,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
        }
    }

    /// Sets the sampling quality. Only every `quality.stride()`-th pixel is inspected.
    ///
    /// The default is [`Quality::FASTEST`].
    #[must_use]
    pub const fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Sets whether or not near-white pixels are dropped.
    ///
    /// The default is `true`.
    #[must_use]
    pub const fn ignore_white(mut self, ignore_white: bool) -> Self {
        self.ignore_white = ignore_white;
        self
    }

    /// Sets the near-white threshold. A pixel is near-white if all of its channels are above this value.
    ///
    /// The default is [`DEFAULT_WHITE_THRESHOLD`].
    #[must_use]
    pub const fn white_threshold(mut self, threshold: u8) -> Self {
        self.white_threshold = threshold;
        self
    }

    /// Sets the transparency threshold. Pixels with an alpha at or below this value are dropped.
    ///
    /// A threshold of `0` only drops fully transparent pixels.
    /// The default is [`DEFAULT_ALPHA_THRESHOLD`].
    #[must_use]
    pub const fn alpha_threshold(mut self, threshold: u8) -> Self {
        self.alpha_threshold = threshold;
        self
    }

    /// Returns the sampling quality.
    #[must_use]
    pub const fn get_quality(&self) -> Quality {
        self.quality
    }

    /// Returns whether or not near-white pixels are dropped.
    #[must_use]
    pub const fn get_ignore_white(&self) -> bool {
        self.ignore_white
    }

    /// Returns the color of the given pixel if it passes the filters.
    #[inline]
    fn eligible(&self, pixel: &[u8]) -> Option<Srgb<u8>> {
        let (r, g, b) = match *pixel {
            [r, g, b, a] if a > self.alpha_threshold => (r, g, b),
            [r, g, b] => (r, g, b),
            _ => return None,
        };

        let t = self.white_threshold;
        if self.ignore_white && r > t && g > t && b > t {
            None
        } else {
            Some(Srgb::new(r, g, b))
        }
    }
}

/// A lazy, single-pass iterator over the eligible pixels of a [`PixelBuffer`].
///
/// Created by [`sample`].
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    /// The inspected pixels.
    pixels: StepBy<ChunksExact<'a, u8>>,
    /// The filters to apply.
    options: SampleOptions,
}

impl<'a> Iterator for Samples<'a> {
    type Item = Srgb<u8>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let options = self.options;
        self.pixels.find_map(|pixel| options.eligible(pixel))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.pixels.size_hint().1)
    }
}

impl<'a> FusedIterator for Samples<'a> {}

/// Returns an iterator over the colors of the eligible pixels in `pixels`.
///
/// The buffer is not copied, and every call walks the buffer anew.
#[must_use]
pub fn sample(pixels: PixelBuffer<'_>, options: SampleOptions) -> Samples<'_> {
    Samples {
        pixels: pixels
            .bytes()
            .chunks_exact(pixels.layout().bytes_per_pixel())
            .step_by(options.quality.stride()),
        options,
    }
}

/// Returns the number of pixels the sampler inspects for the given quality,
/// which is an upper bound on the number of samples.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn num_inspected(pixels: PixelBuffer<'_>, quality: Quality) -> u32 {
    (pixels.num_pixels() as usize).div_ceil(quality.stride()) as u32
}

/// Collects the eligible pixel colors in parallel.
///
/// The output is identical to collecting [`sample`] with the same options.
#[cfg(feature = "threads")]
#[must_use]
pub fn sample_par(pixels: PixelBuffer<'_>, options: SampleOptions) -> Vec<Srgb<u8>> {
    pixels
        .bytes()
        .par_chunks_exact(pixels.layout().bytes_per_pixel())
        .step_by(options.quality.stride())
        .filter_map(|pixel| options.eligible(pixel))
        .collect()
}
