//! Modified median cut quantization (MMCQ).
//!
//! Colors are binned into a `32 x 32 x 32` histogram (5 bits per channel).
//! Starting from the box that tightly encloses every occupied bin, the box with the highest priority
//! is repeatedly split along its widest channel near the median of its population.
//! The first phase prioritizes boxes by population until a fraction of the requested colors exist,
//! and the second phase prioritizes boxes by population times volume until all requested colors exist.
//! The representative color of a box is the rounded mean of the colors it contains.

use crate::{PaletteSize, QuantizeOutput, UniqueColorCounts};
use num_traits::Zero;
use palette::Srgb;
use std::{
    array,
    cmp::Ordering,
    collections::BinaryHeap,
    ops::{Add, AddAssign, Index, IndexMut, Sub},
};
use tracing::debug;

/// The number of color components.
const N: usize = 3;

/// The number of significant bits kept per channel.
const BITS: u32 = 5;

/// The number of bins per channel.
const B: usize = 1 << BITS;

/// The default maximum number of box splits per phase.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

/// The default fraction of the palette that is produced while prioritizing population alone.
pub const DEFAULT_FRACTION_BY_POPULATION: f64 = 0.75;

/// A box over a range of histogram bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cube {
    /// The lower bin indices (inclusive).
    min: [u8; N],
    /// The upper bin indices (exclusive).
    max: [u8; N],
}

impl Cube {
    /// The box spanning the whole histogram.
    #[allow(clippy::cast_possible_truncation)]
    const FULL: Self = Self { min: [0; N], max: [B as u8; N] };

    /// The number of bins along each channel.
    fn widths(self) -> [u8; N] {
        array::from_fn(|c| self.max[c] - self.min[c])
    }

    /// Whether or not this box contains a single bin.
    fn is_single_bin(self) -> bool {
        self.widths().iter().all(|&w| w == 1)
    }

    /// The number of bins inside the box.
    fn volume(self) -> u64 {
        self.widths().iter().map(|&w| u64::from(w)).product()
    }

    /// The channel with the most bins. Ties prefer red, then green, then blue.
    fn widest_dim(self) -> usize {
        let widths = self.widths();
        (1..N).fold(0, |widest, c| if widths[c] > widths[widest] { c } else { widest })
    }
}

/// Statistics for a histogram bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stats {
    /// The number of samples in the bin.
    count: u32,
    /// The component-wise sum of the samples in the bin.
    components: [u64; N],
}

impl Add for Stats {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            count: self.count + rhs.count,
            components: array::from_fn(|i| self.components[i] + rhs.components[i]),
        }
    }
}

impl Sub for Stats {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            count: self.count - rhs.count,
            components: array::from_fn(|i| self.components[i] - rhs.components[i]),
        }
    }
}

impl AddAssign for Stats {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.count += rhs.count;
        for i in 0..N {
            self.components[i] += rhs.components[i];
        }
    }
}

impl Zero for Stats {
    fn zero() -> Self {
        Self { count: 0, components: [0; N] }
    }

    fn is_zero(&self) -> bool {
        self.count == 0 && self.components.iter().all(Zero::is_zero)
    }
}

impl Stats {
    /// The rounded mean color.
    #[allow(clippy::cast_possible_truncation)]
    fn mean(self) -> Srgb<u8> {
        let n = u64::from(self.count);
        let [r, g, b] = self.components.map(|c| ((c + n / 2) / n) as u8);
        Srgb::new(r, g, b)
    }
}

/// The cumulative moments of the color histogram, stored flat in red, green, blue order.
struct Histogram(Vec<Stats>);

impl Index<[u8; N]> for Histogram {
    type Output = Stats;

    #[inline]
    fn index(&self, [r, g, b]: [u8; N]) -> &Self::Output {
        &self.0[(usize::from(r) * B + usize::from(g)) * B + usize::from(b)]
    }
}

impl IndexMut<[u8; N]> for Histogram {
    #[inline]
    fn index_mut(&mut self, [r, g, b]: [u8; N]) -> &mut Self::Output {
        &mut self.0[(usize::from(r) * B + usize::from(g)) * B + usize::from(b)]
    }
}

/// This macro generates code for a fixed number of recursive calls to a volume function.
macro_rules! ndvolume {
    ($self: ident, $min: ident, $max: ident, $index: ident; $n: literal $(, $ns: literal)* $(,)?) => {{
        $index[$n] = $max[$n] - 1;
        let upper = ndvolume!($self, $min, $max, $index; $($ns,)*);

        let lower = if $min[$n] == 0 {
            Stats::zero()
        } else {
            $index[$n] = $min[$n] - 1;
            ndvolume!($self, $min, $max, $index; $($ns,)*)
        };

        upper - lower
    }};
    ($self: ident, $min: ident, $max: ident, $index: ident;) => {
        $self[$index]
    };
}

impl Histogram {
    /// Bins the given colors and computes the cumulative moments.
    #[allow(clippy::cast_possible_truncation)]
    fn new(color_counts: &UniqueColorCounts) -> Self {
        let mut hist = Self(vec![Stats::zero(); B * B * B]);

        for (&color, &count) in color_counts.colors().iter().zip(color_counts.counts()) {
            let (r, g, b) = color.into_components();
            let components = [r, g, b];
            hist[components.map(|c| c >> (u8::BITS - BITS))] += Stats {
                count,
                components: components.map(|c| u64::from(c) * u64::from(count)),
            };
        }

        for r in 0..B as u8 {
            let mut area = [Stats::zero(); B];

            for g in 0..B as u8 {
                let mut line = Stats::zero();

                for b in 0..B as u8 {
                    line += hist[[r, g, b]];
                    area[usize::from(b)] += line;

                    hist[[r, g, b]] = if r == 0 {
                        area[usize::from(b)]
                    } else {
                        hist[[r - 1, g, b]] + area[usize::from(b)]
                    };
                }
            }
        }

        hist
    }

    /// Returns the sum of the histogram bins inside the given box.
    fn volume(&self, Cube { min, max }: Cube) -> Stats {
        let mut index = [0u8; N];
        ndvolume!(self, min, max, index; 0, 1, 2)
    }

    /// Returns the sum of the histogram bins inside the given box,
    /// but with `dim` covering every bin below `bin` instead.
    fn volume_at(&self, Cube { min, max }: Cube, dim: usize, bin: u8) -> Stats {
        if bin == 0 {
            Stats::zero()
        } else {
            let bin = bin - 1;
            let mut index = [0u8; N];
            match dim {
                0 => {
                    index[0] = bin;
                    ndvolume!(self, min, max, index; 1, 2)
                }
                1 => {
                    index[1] = bin;
                    ndvolume!(self, min, max, index; 0, 2)
                }
                2 => {
                    index[2] = bin;
                    ndvolume!(self, min, max, index; 0, 1)
                }
                _ => unreachable!("dim < {N}"),
            }
        }
    }

    /// The number of samples in the slice of the box at `bin` along `dim`.
    fn slice_count(&self, cube: Cube, dim: usize, bin: u8) -> u32 {
        self.volume_at(cube, dim, bin + 1).count - self.volume_at(cube, dim, bin).count
    }

    /// Shrinks the box to the smallest box containing the same occupied bins.
    ///
    /// The box must contain at least one sample.
    fn shrink(&self, mut cube: Cube) -> Cube {
        for dim in 0..N {
            let occupied = (cube.min[dim]..cube.max[dim])
                .filter(|&bin| self.slice_count(cube, dim, bin) > 0)
                .collect::<Vec<_>>();

            if let (Some(&first), Some(&last)) = (occupied.first(), occupied.last()) {
                cube.min[dim] = first;
                cube.max[dim] = last + 1;
            }
        }
        cube
    }

    /// Splits a shrunk box along its widest channel near the median sample.
    ///
    /// Both halves are shrunk and contain at least one sample.
    /// Returns `None` if the box is a single bin.
    fn cut(&self, cube: Cube) -> Option<(Cube, Cube)> {
        if cube.is_single_bin() {
            return None;
        }

        let dim = cube.widest_dim();
        let lo = cube.min[dim];
        let hi = cube.max[dim] - 1;

        let total = self.volume(cube).count;
        let base = self.volume_at(cube, dim, lo).count;
        let median = (lo..=hi).find(|&bin| self.volume_at(cube, dim, bin + 1).count - base > total / 2)?;

        // move the cut toward the middle of the longer side
        let left = median - lo;
        let right = hi - median;
        let cut = if left <= right {
            (hi - 1).min(median + right / 2)
        } else {
            (median - 1 - left / 2).max(lo)
        };

        let mut lower = cube;
        let mut upper = cube;
        lower.max[dim] = cut + 1;
        upper.min[dim] = cut + 1;

        Some((self.shrink(lower), self.shrink(upper)))
    }
}

/// A box and the statistics of the samples inside it.
#[derive(Debug, Clone, Copy)]
struct ColorBox {
    /// The box.
    cube: Cube,
    /// The samples inside the box.
    stats: Stats,
}

/// How to order boxes for splitting.
#[derive(Debug, Clone, Copy)]
enum Priority {
    /// Split the most populated box first.
    Count,
    /// Split the box with the largest population times volume first.
    CountTimesVolume,
}

impl Priority {
    /// The priority of the given box.
    fn of(self, color_box: &ColorBox) -> u64 {
        let count = u64::from(color_box.stats.count);
        match self {
            Priority::Count => count,
            Priority::CountTimesVolume => count * color_box.cube.volume(),
        }
    }
}

/// Splits boxes with [`Histogram::cut`].
struct MedianCut {
    /// The histogram.
    hist: Histogram,
}

impl MedianCut {
    /// Creates a new [`MedianCut`] over the given non-empty colors.
    fn new(color_counts: &UniqueColorCounts) -> Self {
        Self { hist: Histogram::new(color_counts) }
    }

    /// Returns the box over the given bins together with its statistics.
    fn color_box(&self, cube: Cube) -> ColorBox {
        ColorBox { cube, stats: self.hist.volume(cube) }
    }

    /// Splits the highest priority box until there are `target` boxes,
    /// no box can be split, or `max_iterations` splits were attempted.
    ///
    /// Returns the boxes ordered by descending priority, followed by the boxes that could not be split.
    fn split(
        &self,
        boxes: Vec<ColorBox>,
        target: usize,
        priority: Priority,
        max_iterations: u32,
    ) -> Vec<ColorBox> {
        /// A box in the priority queue. Equal priorities are popped in insertion order.
        struct Entry(u64, u32, ColorBox);

        impl PartialOrd for Entry {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for Entry {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.cmp(&other.0).then(other.1.cmp(&self.1))
            }
        }

        impl Eq for Entry {}

        impl PartialEq for Entry {
            fn eq(&self, other: &Self) -> bool {
                self.cmp(other) == Ordering::Equal
            }
        }

        let mut seq = 0u32;
        let mut entry = |color_box: ColorBox| {
            seq += 1;
            Entry(priority.of(&color_box), seq, color_box)
        };

        let mut queue = boxes.into_iter().map(&mut entry).collect::<BinaryHeap<_>>();
        let mut done = Vec::new();

        let mut iterations = 0;
        while queue.len() + done.len() < target && iterations < max_iterations {
            let Some(Entry(_, _, color_box)) = queue.pop() else {
                break;
            };
            iterations += 1;

            if let Some((lower, upper)) = self.hist.cut(color_box.cube) {
                queue.push(entry(self.color_box(lower)));
                queue.push(entry(self.color_box(upper)));
            } else {
                done.push(color_box);
            }
        }

        debug!(?priority, iterations, boxes = queue.len() + done.len(), "median cut phase done");

        queue
            .into_sorted_vec()
            .into_iter()
            .rev()
            .map(|Entry(_, _, color_box)| color_box)
            .chain(done)
            .collect()
    }

    /// Computes the color palette.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn palette(&self, k: PaletteSize, max_iterations: u32, fraction_by_population: f64) -> QuantizeOutput {
        let k = k.as_usize();
        let by_population = (fraction_by_population.clamp(0.0, 1.0) * k as f64).floor() as usize;

        let root = self.color_box(self.hist.shrink(Cube::FULL));
        // the first phase always splits at least once
        let boxes = self.split(vec![root], by_population.max(2), Priority::Count, max_iterations);
        let boxes = self.split(boxes, k, Priority::CountTimesVolume, max_iterations);

        let mut output = QuantizeOutput::from_clusters(
            boxes
                .into_iter()
                .map(|ColorBox { stats, .. }| (stats.mean(), stats.count)),
        );
        output.palette.truncate(k);
        output.counts.truncate(k);
        output
    }
}

/// Computes a color palette from the given `color_counts` with at most `k` colors using median cut.
///
/// Colors are ordered by descending count. If there are no more unique colors than `k`,
/// the unique colors themselves are returned.
///
/// `max_iterations` bounds the number of splits in each phase,
/// and `fraction_by_population` (clamped to `0.0..=1.0`) is the share of `k` produced in the first phase.
#[must_use]
pub fn palette(
    color_counts: &UniqueColorCounts,
    k: PaletteSize,
    max_iterations: u32,
    fraction_by_population: f64,
) -> QuantizeOutput {
    if color_counts.num_colors() <= u32::from(k.into_inner()) {
        QuantizeOutput::trivial_palette(color_counts)
    } else {
        MedianCut::new(color_counts).palette(k, max_iterations, fraction_by_population)
    }
}
