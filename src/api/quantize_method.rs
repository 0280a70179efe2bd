//! Contains the builder structs for the supported quantization methods.

use crate::{kmeans, median_cut, Seeding};

/// A builder struct to specify the parameters for k-means.
///
/// # Examples
/// ```
/// # use swatch::{KmeansOptions, Seeding};
/// let options = KmeansOptions::new()
///     .max_iterations(16)
///     .seeding(Seeding::MedianCut)
///     .snap(false);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmeansOptions {
    /// The maximum number of assignment/update iterations.
    pub(crate) max_iterations: u32,
    /// How the initial centroids are picked.
    pub(crate) seeding: Seeding,
    /// Whether to represent each cluster by an input color.
    pub(crate) snap: bool,
}

impl Default for KmeansOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl KmeansOptions {
    /// Creates a new [`KmeansOptions`] with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_iterations: kmeans::DEFAULT_MAX_ITERATIONS,
            seeding: Seeding::MostFrequent,
            snap: true,
        }
    }

    /// Sets the maximum number of iterations to run before stopping.
    ///
    /// k-means usually converges well before this limit.
    /// The default is [`kmeans::DEFAULT_MAX_ITERATIONS`].
    #[must_use]
    pub const fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets how the initial centroids are picked.
    ///
    /// The default is [`Seeding::MostFrequent`].
    #[must_use]
    pub const fn seeding(mut self, seeding: Seeding) -> Self {
        self.seeding = seeding;
        self
    }

    /// Sets whether each cluster is represented by the sampled color closest to the cluster mean
    /// instead of the rounded mean itself.
    ///
    /// Snapping keeps the palette to colors that actually appear in the image,
    /// so that a dominant color is reported exactly even if a few outliers share its cluster.
    ///
    /// The default is `true`.
    #[must_use]
    pub const fn snap(mut self, snap: bool) -> Self {
        self.snap = snap;
        self
    }
}

/// A builder struct to specify the parameters for median cut.
///
/// # Examples
/// ```
/// # use swatch::MedianCutOptions;
/// let options = MedianCutOptions::new().fraction_by_population(0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedianCutOptions {
    /// The maximum number of box splits per phase.
    pub(crate) max_iterations: u32,
    /// The share of the palette produced while prioritizing population alone.
    pub(crate) fraction_by_population: f64,
}

impl Default for MedianCutOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl MedianCutOptions {
    /// Creates a new [`MedianCutOptions`] with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_iterations: median_cut::DEFAULT_MAX_ITERATIONS,
            fraction_by_population: median_cut::DEFAULT_FRACTION_BY_POPULATION,
        }
    }

    /// Sets the maximum number of box splits in each of the two phases.
    ///
    /// The default is [`median_cut::DEFAULT_MAX_ITERATIONS`].
    #[must_use]
    pub const fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the fraction of the palette that is produced by splitting the most populated boxes
    /// before switching to population times volume.
    ///
    /// Values are clamped to `0.0..=1.0`. Lower values favor rare but distinct colors.
    /// The default is [`median_cut::DEFAULT_FRACTION_BY_POPULATION`].
    #[must_use]
    pub const fn fraction_by_population(mut self, fraction: f64) -> Self {
        self.fraction_by_population = fraction;
        self
    }
}

/// The set of supported color quantization methods.
///
/// See the descriptions on each enum variant for more information.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuantizeMethod {
    /// Deterministic k-means clustering over the unique sampled colors.
    ///
    /// This is the default method.
    ///
    /// See the [`kmeans`](crate::kmeans) module for more details.
    Kmeans(KmeansOptions),
    /// Modified median cut over a 5 bit per channel histogram.
    ///
    /// This method is faster than k-means but coarser, since every color in a box is
    /// first reduced to its histogram bin when choosing where to split.
    ///
    /// See the [`median_cut`](crate::median_cut) module for more details.
    MedianCut(MedianCutOptions),
}

impl Default for QuantizeMethod {
    fn default() -> Self {
        Self::kmeans()
    }
}

impl QuantizeMethod {
    /// Creates a new [`QuantizeMethod::Kmeans`] with the default [`KmeansOptions`].
    #[must_use]
    pub const fn kmeans() -> Self {
        Self::Kmeans(KmeansOptions::new())
    }

    /// Creates a new [`QuantizeMethod::MedianCut`] with the default [`MedianCutOptions`].
    #[must_use]
    pub const fn median_cut() -> Self {
        Self::MedianCut(MedianCutOptions::new())
    }
}

impl From<KmeansOptions> for QuantizeMethod {
    fn from(options: KmeansOptions) -> Self {
        Self::Kmeans(options)
    }
}

impl From<MedianCutOptions> for QuantizeMethod {
    fn from(options: MedianCutOptions) -> Self {
        Self::MedianCut(options)
    }
}
