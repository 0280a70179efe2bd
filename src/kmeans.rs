//! Deterministic k-means (Lloyd's algorithm) over deduplicated colors.
//!
//! Each iteration assigns every unique color to its nearest centroid by Euclidean distance in RGB,
//! then moves each centroid to the count-weighted mean of its colors.
//! Iteration stops once no assignment changes or after a fixed number of iterations.
//! Each resulting cluster is reported as the rounded mean of its colors, or, with snapping enabled
//! (the default, see [`KmeansOptions::snap`](crate::KmeansOptions::snap)), as the member color closest to that mean.
//! Snapping keeps a dominant color exact even when a minority color shares its cluster.
//! There is no randomness: the same colors and initial centroids always give the same palette.

use crate::{
    types::distance_squared, InvalidParameter, PaletteSize, QuantizeOutput, UniqueColorCounts,
    MAX_K,
};
use palette::Srgb;
use std::array;
use tracing::{debug, trace};
use wide::{f32x8, u32x8, CmpLt};

/// The default maximum number of assignment/update iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 64;

/// The initial centroids for k-means.
///
/// This is a new type wrapper around a `Vec` of at most [`MAX_COLORS`](crate::MAX_COLORS) colors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Centroids(Vec<Srgb<u8>>);

impl Centroids {
    /// Returns the inner `Vec` of colors.
    #[must_use]
    pub fn into_inner(self) -> Vec<Srgb<u8>> {
        self.0
    }

    /// Creates [`Centroids`] by truncating the given colors to a max length of [`MAX_COLORS`](crate::MAX_COLORS).
    #[must_use]
    pub fn from_truncated(mut centroids: Vec<Srgb<u8>>) -> Self {
        centroids.truncate(MAX_K);
        Self(centroids)
    }

    /// Seeds centroids with the `k` most frequent unique colors.
    #[must_use]
    pub fn most_frequent(color_counts: &UniqueColorCounts, k: PaletteSize) -> Self {
        Self(color_counts.most_frequent(k.as_usize()))
    }

    /// Returns the number of centroids.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn num_colors(&self) -> u16 {
        self.0.len() as u16
    }
}

impl From<Centroids> for Vec<Srgb<u8>> {
    fn from(value: Centroids) -> Self {
        value.into_inner()
    }
}

impl TryFrom<Vec<Srgb<u8>>> for Centroids {
    type Error = InvalidParameter;

    fn try_from(colors: Vec<Srgb<u8>>) -> Result<Self, Self::Error> {
        if colors.len() <= MAX_K {
            Ok(Self(colors))
        } else {
            Err(InvalidParameter::ColorCount(
                u32::try_from(colors.len()).unwrap_or(u32::MAX),
            ))
        }
    }
}

/// How k-means picks its initial centroids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seeding {
    /// Use the most frequent unique colors. Ties are broken by first appearance in the samples.
    #[default]
    MostFrequent,
    /// Use the palette produced by median cut, which partitions the occupied color space.
    MedianCut,
}

/// Returns the index of the point nearest to `query`. The lowest index wins ties.
#[inline]
fn simd_argmin(points: &[[f32x8; 3]], query: [f32; 3]) -> u8 {
    let incr = u32x8::ONE;
    let mut cur_chunk = u32x8::ZERO;
    let mut min_chunk = cur_chunk;
    let mut min_distance = f32x8::splat(f32::INFINITY);

    let query = query.map(f32x8::splat);

    for chunk in points {
        let distance = (0..3).fold(f32x8::ZERO, |sum, i| {
            let diff = query[i] - chunk[i];
            sum + diff * diff
        });

        #[allow(unsafe_code)]
        let mask: u32x8 = unsafe { std::mem::transmute(distance.cmp_lt(min_distance)) };
        min_chunk = mask.blend(cur_chunk, min_chunk);
        min_distance = min_distance.fast_min(distance);
        cur_chunk += incr;
    }

    let mut min_index = usize::MAX;
    let mut min_dist = f32::INFINITY;
    for (lane, (&dist, &chunk)) in min_distance
        .as_array_ref()
        .iter()
        .zip(min_chunk.as_array_ref())
        .enumerate()
    {
        let index = chunk as usize * 8 + lane;
        if dist.total_cmp(&min_dist).then(index.cmp(&min_index)).is_lt() {
            min_dist = dist;
            min_index = index;
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    {
        min_index as u8
    }
}

/// The working state for k-means.
struct State<'a> {
    /// The unique colors and their counts.
    color_counts: &'a UniqueColorCounts,
    /// The current centroids.
    centroids: Vec<[f64; 3]>,
    /// The current centroids in chunks of 8, padded with infinity.
    components: Vec<[f32x8; 3]>,
    /// The centroid index assigned to each unique color.
    assignments: Vec<u8>,
}

impl<'a> State<'a> {
    fn new(color_counts: &'a UniqueColorCounts, centroids: Vec<Srgb<u8>>) -> Self {
        let centroids = centroids
            .into_iter()
            .map(|color| {
                let (r, g, b) = color.into_components();
                [r, g, b].map(f64::from)
            })
            .collect::<Vec<_>>();

        let mut state = Self {
            color_counts,
            components: Vec::with_capacity(centroids.len().div_ceil(8)),
            centroids,
            assignments: Vec::new(),
        };

        state.load_components();
        state.assignments = color_counts
            .colors()
            .iter()
            .map(|&color| state.nearest(color))
            .collect();

        state
    }

    /// Copies the centroids into the SIMD layout used for nearest neighbor queries.
    #[allow(clippy::cast_possible_truncation)]
    fn load_components(&mut self) {
        let Self { centroids, components, .. } = self;
        components.clear();
        components.extend(centroids.chunks(8).map(|chunk| {
            array::from_fn(|c| {
                f32x8::new(array::from_fn(|lane| {
                    chunk.get(lane).map_or(f32::INFINITY, |centroid| centroid[c] as f32)
                }))
            })
        }));
    }

    #[inline]
    fn nearest(&self, color: Srgb<u8>) -> u8 {
        let (r, g, b) = color.into_components();
        simd_argmin(&self.components, [r, g, b].map(f32::from))
    }

    /// Returns the count-weighted component sums and total counts for each centroid.
    fn cluster_sums(&self) -> (Vec<[f64; 3]>, Vec<u64>) {
        let k = self.centroids.len();
        let mut sums = vec![[0.0; 3]; k];
        let mut counts = vec![0u64; k];

        for ((&color, &count), &i) in self
            .color_counts
            .colors()
            .iter()
            .zip(self.color_counts.counts())
            .zip(&self.assignments)
        {
            let i = usize::from(i);
            let (r, g, b) = color.into_components();
            let weight = f64::from(count);
            for (sum, component) in sums[i].iter_mut().zip([r, g, b]) {
                *sum += weight * f64::from(component);
            }
            counts[i] += u64::from(count);
        }

        (sums, counts)
    }

    /// Moves each non-empty centroid to the mean of its colors.
    #[allow(clippy::cast_precision_loss)]
    fn update_centroids(&mut self) {
        let (sums, counts) = self.cluster_sums();
        for ((centroid, sum), count) in self.centroids.iter_mut().zip(sums).zip(counts) {
            if count > 0 {
                *centroid = sum.map(|s| s / count as f64);
            }
        }
        self.load_components();
    }

    /// Reassigns every color to its nearest centroid, returning the number of changed assignments.
    fn reassign(&mut self) -> usize {
        let mut changed = 0;
        for i in 0..self.assignments.len() {
            let nearest = self.nearest(self.color_counts.colors()[i]);
            if self.assignments[i] != nearest {
                self.assignments[i] = nearest;
                changed += 1;
            }
        }
        changed
    }

    /// Runs until convergence or `max_iterations`, returning the number of iterations run.
    fn run(&mut self, max_iterations: u32) -> u32 {
        for iteration in 1..=max_iterations {
            self.update_centroids();
            let changed = self.reassign();
            trace!(iteration, changed, "k-means iteration");
            if changed == 0 {
                debug!(iterations = iteration, "k-means converged");
                return iteration;
            }
        }

        debug!(iterations = max_iterations, "k-means stopped at the iteration cap");
        max_iterations
    }

    /// Consumes the state into the final palette.
    ///
    /// With `snap` set, each cluster is represented by the unique color closest to its mean.
    /// Otherwise the mean itself is rounded to the nearest integer color.
    #[allow(clippy::cast_precision_loss)]
    fn into_summary(self, snap: bool) -> QuantizeOutput {
        let (sums, counts) = self.cluster_sums();

        let means = sums
            .iter()
            .zip(&counts)
            .map(|(sum, &count)| {
                if count == 0 {
                    [0.0; 3]
                } else {
                    sum.map(|s| s / count as f64)
                }
            })
            .collect::<Vec<_>>();

        let colors = if snap {
            self.snapped_colors(&means)
        } else {
            means.iter().map(|&mean| round_color(mean)).collect()
        };

        #[allow(clippy::cast_possible_truncation)]
        let counts = counts.into_iter().map(|count| count as u32);

        QuantizeOutput::from_clusters(colors.into_iter().zip(counts))
    }

    /// For each cluster, finds the assigned unique color nearest to the cluster mean.
    fn snapped_colors(&self, means: &[[f64; 3]]) -> Vec<Srgb<u8>> {
        let mut best = vec![(f64::INFINITY, Srgb::new(0, 0, 0)); means.len()];
        for (&color, &i) in self.color_counts.colors().iter().zip(&self.assignments) {
            let i = usize::from(i);
            let (r, g, b) = color.into_components();
            let distance = [r, g, b]
                .into_iter()
                .zip(means[i])
                .map(|(c, m)| (f64::from(c) - m).powi(2))
                .sum::<f64>();

            if distance < best[i].0 {
                best[i] = (distance, color);
            }
        }
        best.into_iter().map(|(_, color)| color).collect()
    }
}

/// Rounds each component to the nearest integer in `0..=255`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_color(components: [f64; 3]) -> Srgb<u8> {
    let [r, g, b] = components.map(|c| c.round().clamp(0.0, 255.0) as u8);
    Srgb::new(r, g, b)
}

/// Computes a color palette using k-means, starting from the given centroids.
///
/// At most `initial_centroids.num_colors()` colors are returned, ordered by descending count.
/// Clusters that end up empty are dropped. If there are no more unique colors than centroids,
/// the unique colors themselves are returned without iterating.
///
/// `snap` controls the representative color of each cluster (see [`KmeansOptions::snap`](crate::KmeansOptions::snap)).
#[must_use]
pub fn palette(
    color_counts: &UniqueColorCounts,
    initial_centroids: Centroids,
    max_iterations: u32,
    snap: bool,
) -> QuantizeOutput {
    if color_counts.num_colors() <= u32::from(initial_centroids.num_colors()) {
        QuantizeOutput::trivial_palette(color_counts)
    } else if initial_centroids.num_colors() == 0 {
        QuantizeOutput::default()
    } else {
        let mut state = State::new(color_counts, initial_centroids.into());
        state.run(max_iterations);
        state.into_summary(snap)
    }
}

/// Returns the sum of squared distances from each sample to its nearest palette color.
///
/// Useful for comparing palettes for the same colors.
#[must_use]
pub fn total_squared_error(color_counts: &UniqueColorCounts, output: &QuantizeOutput) -> u64 {
    color_counts
        .colors()
        .iter()
        .zip(color_counts.counts())
        .filter_map(|(&color, &count)| {
            output
                .nearest(color)
                .map(|nearest| u64::from(distance_squared(color, nearest)) * u64::from(count))
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{tests::*, MAX_COLORS};
    use palette::Srgb;

    fn counts_of(groups: &[(Srgb<u8>, usize)]) -> UniqueColorCounts {
        UniqueColorCounts::from_samples(
            groups
                .iter()
                .flat_map(|&(color, n)| std::iter::repeat(color).take(n)),
        )
    }

    #[test]
    fn argmin_prefers_lowest_index() {
        let mut state_colors = vec![Srgb::new(9, 9, 9); 20];
        state_colors[3] = Srgb::new(0, 0, 0);
        state_colors[12] = Srgb::new(0, 0, 0);
        let counts = UniqueColorCounts::new(&[Srgb::new(1, 1, 1)]);
        let state = State::new(&counts, state_colors);

        assert_eq!(state.nearest(Srgb::new(1, 1, 1)), 3);
        assert_eq!(state.nearest(Srgb::new(9, 9, 9)), 0);
    }

    #[test]
    fn empty_input() {
        let counts = UniqueColorCounts::default();
        let output = palette(&counts, Centroids::most_frequent(&counts, PaletteSize::try_from(4u8).unwrap()), 10, true);
        assert_eq!(output, QuantizeOutput::default());
    }

    #[test]
    fn not_enough_colors() {
        let red = Srgb::new(255, 0, 0);
        let blue = Srgb::new(0, 0, 255);
        let counts = counts_of(&[(blue, 3), (red, 5)]);

        let centroids = Centroids::most_frequent(&counts, PaletteSize::try_from(5u8).unwrap());
        let output = palette(&counts, centroids, 10, false);
        assert_eq!(output.palette, vec![red, blue]);
        assert_eq!(output.counts, vec![5, 3]);
    }

    #[test]
    fn separates_distinct_groups() {
        let dark = [Srgb::new(10, 10, 10), Srgb::new(12, 10, 10), Srgb::new(10, 14, 10)];
        let light = [Srgb::new(200, 200, 200), Srgb::new(204, 200, 200)];
        let counts = counts_of(&[
            (dark[0], 10),
            (dark[1], 10),
            (dark[2], 10),
            (light[0], 5),
            (light[1], 5),
        ]);

        let centroids = Centroids::try_from(vec![dark[0], dark[1]]).unwrap();
        let output = palette(&counts, centroids, DEFAULT_MAX_ITERATIONS, false);
        assert_eq!(output.counts, vec![30, 10]);
        assert_eq!(output.palette[0], Srgb::new(11, 11, 10));
        assert_eq!(output.palette[1], Srgb::new(202, 200, 200));

        let centroids = Centroids::try_from(vec![dark[0], dark[1]]).unwrap();
        let output = palette(&counts, centroids, DEFAULT_MAX_ITERATIONS, true);
        assert_eq!(output.counts, vec![30, 10]);
        assert!(dark.contains(&output.palette[0]));
        assert!(light.contains(&output.palette[1]));
    }

    #[test]
    fn snapping_keeps_dominant_color_exact() {
        let white = Srgb::new(255, 255, 255);
        let red = Srgb::new(255, 0, 0);
        let counts = counts_of(&[(white, 90), (red, 10)]);
        let k = PaletteSize::try_from(1u8).unwrap();

        let snapped = palette(&counts, Centroids::most_frequent(&counts, k), DEFAULT_MAX_ITERATIONS, true);
        assert_eq!(snapped.palette, vec![white]);
        assert_eq!(snapped.counts, vec![100]);

        let mean = palette(&counts, Centroids::most_frequent(&counts, k), DEFAULT_MAX_ITERATIONS, false);
        assert_eq!(mean.palette, vec![Srgb::new(255, 230, 230)]);
        assert_eq!(mean.counts, vec![100]);
    }

    #[test]
    fn empty_clusters_are_dropped() {
        let a = Srgb::new(0, 0, 0);
        let a2 = Srgb::new(2, 0, 0);
        let b = Srgb::new(100, 0, 0);
        let c = Srgb::new(104, 0, 0);
        let counts = counts_of(&[(a, 4), (a2, 4), (b, 6), (c, 6)]);

        // the white centroid never receives a color
        let far = Srgb::new(255, 255, 255);
        let centroids = Centroids::try_from(vec![a, b, far]).unwrap();
        let output = palette(&counts, centroids, DEFAULT_MAX_ITERATIONS, false);
        assert_eq!(output.len(), 2);
        assert_eq!(output.counts, vec![12, 8]);
        assert_eq!(output.palette, vec![Srgb::new(102, 0, 0), Srgb::new(1, 0, 0)]);
    }

    #[test]
    fn iteration_cap_bounds_work() {
        let colors = test_data_1024();
        let counts = UniqueColorCounts::new(&colors);
        let k = PaletteSize::try_from(16u8).unwrap();

        for max_iterations in [0, 1, DEFAULT_MAX_ITERATIONS] {
            let output = palette(&counts, Centroids::most_frequent(&counts, k), max_iterations, false);
            assert!(!output.is_empty() && output.len() <= 16);
            assert_eq!(output.counts.iter().sum::<u32>(), counts.total_count());
        }
    }

    #[test]
    fn deterministic() {
        let colors = test_data_1024();
        let counts = UniqueColorCounts::new(&colors);
        let k = PaletteSize::try_from(8u8).unwrap();

        let a = palette(&counts, Centroids::most_frequent(&counts, k), DEFAULT_MAX_ITERATIONS, true);
        let b = palette(&counts, Centroids::most_frequent(&counts, k), DEFAULT_MAX_ITERATIONS, true);
        assert_eq!(a, b);
        assert!(a.counts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn exact_palette_has_no_error() {
        let colors = test_data_256();
        let counts = UniqueColorCounts::new(&[colors.as_slice(), &colors[..8]].concat());
        let output = palette(&counts, Centroids::from_truncated(colors.clone()), 0, false);
        assert_eq!(output.len(), colors.len());
        assert_eq!(total_squared_error(&counts, &output), 0);
        assert_eq!(output.counts[..8], [2; 8]);
    }

    #[test]
    fn too_many_centroids() {
        let result = Centroids::try_from(vec![Srgb::new(0, 0, 0); MAX_K + 1]);
        assert_eq!(result, Err(InvalidParameter::ColorCount(257)));
        assert_eq!(
            Centroids::from_truncated(vec![Srgb::new(0, 0, 0); MAX_K + 1]).num_colors(),
            MAX_COLORS
        );
    }
}
