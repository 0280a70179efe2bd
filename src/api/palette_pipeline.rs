use crate::{
    format::{format_palette, ColorFormat},
    kmeans::{self, Centroids},
    median_cut,
    sample::{self, SampleOptions},
    KmeansOptions, MedianCutOptions, PaletteSize, PixelBuffer, Quality, QuantizeMethod,
    QuantizeOutput, Seeding, UniqueColorCounts,
};
use palette::Srgb;
use tracing::debug;
#[cfg(feature = "image")]
use {
    crate::PixelReadError,
    image::{RgbImage, RgbaImage},
};

/// A builder struct to extract a palette from a [`PixelBuffer`].
///
/// The pipeline samples the pixels, deduplicates the samples, and quantizes them
/// into at most [`PalettePipeline::palette_size`] colors ordered from most to least dominant.
///
/// # Examples
/// ```
/// # use swatch::{PalettePipeline, PixelBuffer, PaletteSize, Quality, QuantizeMethod};
/// # use swatch::format::ColorFormat;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = [[200, 30, 30, 255]; 6].concat();
/// let pixels = PixelBuffer::rgba(&bytes, 3, 2)?;
///
/// let palette = PalettePipeline::new(pixels)
///     .palette_size(PaletteSize::try_from(3u8)?)
///     .quality(Quality::BEST)
///     .quantize_method(QuantizeMethod::median_cut())
///     .palette_strings(ColorFormat::Hex);
///
/// assert_eq!(palette, vec!["#c81e1e"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PalettePipeline<'a> {
    /// The input pixels.
    pub(crate) pixels: PixelBuffer<'a>,
    /// The maximum number of colors.
    pub(crate) k: PaletteSize,
    /// The sampling parameters.
    pub(crate) sample_options: SampleOptions,
    /// The quantization method and its parameters.
    pub(crate) quantize_method: QuantizeMethod,
}

impl<'a> PalettePipeline<'a> {
    /// Creates a new [`PalettePipeline`] with default values.
    #[must_use]
    pub fn new(pixels: PixelBuffer<'a>) -> Self {
        Self {
            pixels,
            k: PaletteSize::default(),
            sample_options: SampleOptions::new(),
            quantize_method: QuantizeMethod::default(),
        }
    }

    /// Sets the maximum number of colors in the palette.
    ///
    /// The default is [`DEFAULT_COLOR_COUNT`](crate::DEFAULT_COLOR_COUNT).
    #[must_use]
    pub fn palette_size(mut self, size: PaletteSize) -> Self {
        self.k = size;
        self
    }

    /// Sets the sampling quality.
    ///
    /// The default is [`Quality::FASTEST`].
    #[must_use]
    pub fn quality(mut self, quality: Quality) -> Self {
        self.sample_options = self.sample_options.quality(quality);
        self
    }

    /// Sets whether or not near-white pixels are ignored.
    ///
    /// The default is `true`.
    #[must_use]
    pub fn ignore_white(mut self, ignore_white: bool) -> Self {
        self.sample_options = self.sample_options.ignore_white(ignore_white);
        self
    }

    /// Replaces all of the sampling parameters.
    #[must_use]
    pub fn sample_options(mut self, options: SampleOptions) -> Self {
        self.sample_options = options;
        self
    }

    /// Sets the color quantization method to use.
    ///
    /// The default is [`QuantizeMethod::Kmeans`] with the default [`KmeansOptions`].
    #[must_use]
    pub fn quantize_method(mut self, quantize_method: impl Into<QuantizeMethod>) -> Self {
        self.quantize_method = quantize_method.into();
        self
    }

    /// Computes the palette and the number of samples represented by each color.
    #[must_use]
    pub fn quantize(self) -> QuantizeOutput {
        let color_counts = UniqueColorCounts::from_samples(sample::sample(self.pixels, self.sample_options));
        self.quantize_counts(&color_counts)
    }

    /// Computes the palette, most dominant color first.
    #[must_use]
    pub fn palette(self) -> Vec<Srgb<u8>> {
        self.quantize().palette
    }

    /// Computes the palette and formats each color, most dominant color first.
    #[must_use]
    pub fn palette_strings(self, format: ColorFormat) -> Vec<String> {
        let k = self.k.as_usize();
        format_palette(&self.palette(), format, k)
    }

    /// Quantizes already sampled colors.
    fn quantize_counts(self, color_counts: &UniqueColorCounts) -> QuantizeOutput {
        debug!(
            width = self.pixels.width(),
            height = self.pixels.height(),
            samples = color_counts.total_count(),
            unique = color_counts.num_colors(),
            k = self.k.into_inner(),
            "quantizing samples"
        );

        let output = palette(color_counts, self.k, self.quantize_method);
        debug!(colors = output.len(), "palette done");
        output
    }
}

#[cfg(feature = "threads")]
impl<'a> PalettePipeline<'a> {
    /// Computes the palette and the number of samples represented by each color,
    /// sampling the pixels in parallel.
    ///
    /// The result is identical to [`PalettePipeline::quantize`].
    #[must_use]
    pub fn quantize_par(self) -> QuantizeOutput {
        let samples = sample::sample_par(self.pixels, self.sample_options);
        self.quantize_counts(&UniqueColorCounts::new(&samples))
    }

    /// Computes the palette, sampling the pixels in parallel.
    ///
    /// The result is identical to [`PalettePipeline::palette`].
    #[must_use]
    pub fn palette_par(self) -> Vec<Srgb<u8>> {
        self.quantize_par().palette
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbaImage> for PalettePipeline<'a> {
    type Error = PixelReadError;

    fn try_from(image: &'a RgbaImage) -> Result<Self, Self::Error> {
        Ok(Self::new(image.try_into()?))
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for PalettePipeline<'a> {
    type Error = PixelReadError;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        Ok(Self::new(image.try_into()?))
    }
}

/// Runs the given quantization method on the unique colors.
fn palette(color_counts: &UniqueColorCounts, k: PaletteSize, method: QuantizeMethod) -> QuantizeOutput {
    match method {
        QuantizeMethod::Kmeans(KmeansOptions { max_iterations, seeding, snap }) => {
            let initial_centroids = match seeding {
                Seeding::MostFrequent => Centroids::most_frequent(color_counts, k),
                Seeding::MedianCut => Centroids::from_truncated(
                    median_cut::palette(
                        color_counts,
                        k,
                        median_cut::DEFAULT_MAX_ITERATIONS,
                        median_cut::DEFAULT_FRACTION_BY_POPULATION,
                    )
                    .palette,
                ),
            };

            kmeans::palette(color_counts, initial_centroids, max_iterations, snap)
        }
        QuantizeMethod::MedianCut(MedianCutOptions { max_iterations, fraction_by_population }) => {
            median_cut::palette(color_counts, k, max_iterations, fraction_by_population)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tests::*;

    fn methods() -> [QuantizeMethod; 4] {
        [
            QuantizeMethod::kmeans(),
            KmeansOptions::new().seeding(Seeding::MedianCut).into(),
            KmeansOptions::new().snap(false).into(),
            QuantizeMethod::median_cut(),
        ]
    }

    #[test]
    fn palette_is_bounded_and_ordered() {
        let bytes = test_image_rgba(64, 64);
        let pixels = PixelBuffer::rgba(&bytes, 64, 64).unwrap();

        for method in methods() {
            for k in [1u8, 5, 16] {
                let output = PalettePipeline::new(pixels)
                    .palette_size(PaletteSize::try_from(k).unwrap())
                    .quality(Quality::BEST)
                    .quantize_method(method)
                    .quantize();

                assert!(!output.is_empty() && output.len() <= usize::from(k));
                assert_eq!(output.palette.len(), output.counts.len());
                assert!(output.counts.windows(2).all(|w| w[0] >= w[1]));
            }
        }
    }

    #[test]
    fn strings_match_palette() {
        let bytes = test_image_rgba(20, 20);
        let pixels = PixelBuffer::rgba(&bytes, 20, 20).unwrap();
        let pipeline = PalettePipeline::new(pixels).palette_size(PaletteSize::try_from(4u8).unwrap());

        let palette = pipeline.palette();
        let strings = pipeline.palette_strings(ColorFormat::Rgb);
        assert_eq!(strings.len(), palette.len());
        for (s, &color) in strings.iter().zip(&palette) {
            assert_eq!(crate::format::parse_color(s).unwrap(), color);
        }
    }

    #[test]
    fn seeding_keeps_every_sample() {
        let bytes = test_image_rgba(48, 48);
        let pixels = PixelBuffer::rgba(&bytes, 48, 48).unwrap();
        let k = PaletteSize::try_from(8u8).unwrap();
        let pipeline = PalettePipeline::new(pixels).palette_size(k).quality(Quality::BEST);

        let samples = sample::sample(pixels, SampleOptions::new().quality(Quality::BEST)).count();

        for seeding in [Seeding::MostFrequent, Seeding::MedianCut] {
            for max_iterations in [0, kmeans::DEFAULT_MAX_ITERATIONS] {
                let options = KmeansOptions::new().seeding(seeding).max_iterations(max_iterations);
                let output = pipeline.quantize_method(options).quantize();
                assert_eq!(output.counts.iter().sum::<u32>() as usize, samples);
                assert_eq!(output, pipeline.quantize_method(options).quantize());
            }
        }
    }

    #[test]
    #[cfg(feature = "threads")]
    fn single_and_multi_threaded_match() {
        let bytes = test_image_rgba(101, 37);
        let pixels = PixelBuffer::rgba(&bytes, 101, 37).unwrap();

        for method in methods() {
            let pipeline = PalettePipeline::new(pixels)
                .quality(Quality::try_from(3u8).unwrap())
                .quantize_method(method);
            assert_eq!(pipeline.quantize(), pipeline.quantize_par());
        }
    }

    #[test]
    #[cfg(feature = "image")]
    fn from_image() {
        let image = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        let palette = PalettePipeline::try_from(&image).unwrap().palette();
        assert_eq!(palette, vec![Srgb::new(10, 20, 30)]);
    }
}
