//! Contains the code for color deduplication.

use bitvec::vec::BitVec;
use palette::Srgb;
use std::ops::Range;

/// A byte-sized Radix
const RADIX: usize = u8::MAX as usize + 1;

/// Returns the range associated with the `i`-th chunk.
#[inline]
fn chunk_range(chunks: &[u32], i: usize) -> Range<usize> {
    (chunks[i] as usize)..(chunks[i + 1] as usize)
}

/// Computes the prefix sum of the array in place.
#[inline]
fn prefix_sum<const M: usize>(counts: &mut [u32; M]) {
    for i in 1..M {
        counts[i] += counts[i - 1];
    }
}

/// Deduplicated colors and their frequency counts.
///
/// The colors are sorted in ascending `(red, green, blue)` order.
/// The index of the first sample of each color is kept as well,
/// so that colors with equal counts can be ranked by first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniqueColorCounts {
    /// The unique colors.
    colors: Vec<Srgb<u8>>,
    /// The number of times each color was present in the samples.
    counts: Vec<u32>,
    /// The index of the first sample of each color.
    first_seen: Vec<u32>,
    /// The total number of samples.
    total_count: u32,
}

impl UniqueColorCounts {
    /// Returns the slice of unique colors.
    #[must_use]
    pub fn colors(&self) -> &[Srgb<u8>] {
        &self.colors
    }

    /// Returns a slice for the number of times each unique color was present in the samples.
    #[must_use]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Returns, for each unique color, the index of its first occurrence in the samples.
    #[must_use]
    pub fn first_seen(&self) -> &[u32] {
        &self.first_seen
    }

    /// Returns the number of samples.
    ///
    /// This is equal to the sum of [`UniqueColorCounts::counts`].
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    /// Returns the number of unique colors.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn num_colors(&self) -> u32 {
        self.colors.len() as u32
    }

    /// Whether or not there are no colors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Creates a new [`UniqueColorCounts`] from any sequence of samples, consuming it once.
    pub fn from_samples(samples: impl IntoIterator<Item = Srgb<u8>>) -> Self {
        let samples = samples.into_iter().collect::<Vec<_>>();
        Self::new(&samples)
    }

    /// Creates a new [`UniqueColorCounts`] from a slice of samples.
    ///
    /// The slice must not be longer than [`MAX_PIXELS`](crate::MAX_PIXELS).
    #[must_use]
    pub fn new(samples: &[Srgb<u8>]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        #[allow(clippy::cast_possible_truncation)]
        let total_count = samples.len() as u32;

        let mut colors = Vec::new();
        let mut counts = Vec::new();
        let mut first_seen = Vec::new();
        let mut green_blue = vec![([0; 2], 0); samples.len()];

        let mut lower_counts = vec![[0u32; RADIX]; RADIX];
        let mut lower_first = vec![[u32::MAX; RADIX]; RADIX];
        let mut bitmask: BitVec = BitVec::repeat(false, RADIX * RADIX);

        let mut red_prefix = [0u32; RADIX + 1];
        for color in samples {
            red_prefix[usize::from(color.red)] += 1;
        }
        prefix_sum(&mut red_prefix);

        for (i, color) in samples.iter().enumerate() {
            let r = usize::from(color.red);
            let j = red_prefix[r] - 1;
            #[allow(clippy::cast_possible_truncation)]
            let i = i as u32;
            green_blue[j as usize] = ([color.green, color.blue], i);
            red_prefix[r] = j;
        }
        red_prefix[RADIX] = total_count;

        for r in 0..RADIX {
            let chunk = chunk_range(&red_prefix, r);

            if !chunk.is_empty() {
                let green_blue = &green_blue[chunk.clone()];

                #[allow(clippy::cast_possible_truncation)]
                let red = r as u8;

                if chunk.len() < RADIX * RADIX / 4 {
                    for &(gb, i) in green_blue {
                        let [g, b] = gb.map(usize::from);
                        lower_counts[g][b] += 1;
                        lower_first[g][b] = lower_first[g][b].min(i);
                        bitmask.set(g * RADIX + b, true);
                    }

                    for i in bitmask.iter_ones() {
                        let g = i / RADIX;
                        let b = i % RADIX;
                        #[allow(clippy::cast_possible_truncation)]
                        let color = Srgb::new(red, g as u8, b as u8);
                        colors.push(color);
                        counts.push(lower_counts[g][b]);
                        first_seen.push(lower_first[g][b]);
                        lower_counts[g][b] = 0;
                        lower_first[g][b] = u32::MAX;
                    }

                    bitmask.fill(false);
                } else {
                    for &([g, b], i) in green_blue {
                        let (g, b) = (usize::from(g), usize::from(b));
                        lower_counts[g][b] += 1;
                        lower_first[g][b] = lower_first[g][b].min(i);
                    }

                    for (g, (row, first_row)) in lower_counts.iter_mut().zip(&mut lower_first).enumerate() {
                        for (b, (count, first)) in row.iter_mut().zip(first_row.iter_mut()).enumerate() {
                            if *count > 0 {
                                #[allow(clippy::cast_possible_truncation)]
                                let color = Srgb::new(red, g as u8, b as u8);
                                colors.push(color);
                                counts.push(*count);
                                first_seen.push(*first);
                                *count = 0;
                                *first = u32::MAX;
                            }
                        }
                    }
                }
            }
        }

        Self { colors, counts, first_seen, total_count }
    }

    /// Returns the indices of the unique colors, most frequent first.
    ///
    /// Colors with equal counts are ordered by their first appearance in the samples.
    pub(crate) fn by_frequency(&self) -> Vec<usize> {
        let mut order = (0..self.colors.len()).collect::<Vec<_>>();
        order.sort_unstable_by_key(|&i| (std::cmp::Reverse(self.counts[i]), self.first_seen[i]));
        order
    }

    /// Returns the `k` most frequent colors, most frequent first.
    ///
    /// Colors with equal counts are ordered by their first appearance in the samples.
    #[must_use]
    pub fn most_frequent(&self, k: usize) -> Vec<Srgb<u8>> {
        self.by_frequency().into_iter().take(k).map(|i| self.colors[i]).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tests::*;
    use rand::{seq::SliceRandom, SeedableRng};
    use rand_xoshiro::Xoroshiro128PlusPlus;

    fn assert_valid(unique: &UniqueColorCounts, samples: &[Srgb<u8>]) {
        assert_eq!(unique.colors().len(), unique.counts().len());
        assert_eq!(unique.total_count() as usize, samples.len());
        assert_eq!(unique.counts().iter().sum::<u32>(), unique.total_count());
        assert!(unique.counts().iter().all(|&count| count > 0));
        assert_eq!(unique.first_seen().len(), unique.colors().len());
        assert!(unique
            .colors()
            .windows(2)
            .all(|w| w[0].into_components() < w[1].into_components()));

        for ((color, &count), &first) in unique.colors().iter().zip(unique.counts()).zip(unique.first_seen()) {
            let expected = samples.iter().filter(|&c| c == color).count();
            assert_eq!(count as usize, expected);
            assert_eq!(samples.iter().position(|c| c == color), Some(first as usize));
        }
    }

    #[test]
    fn empty_input() {
        let unique = UniqueColorCounts::new(&[]);
        assert!(unique.is_empty() && unique.colors().is_empty() && unique.counts().is_empty());
        assert_eq!(unique.total_count(), 0);
        assert!(unique.most_frequent(3).is_empty());
    }

    #[test]
    fn counts_duplicates() {
        let colors = test_data_256();
        let samples = [colors.as_slice(), &colors[..10], &colors[..1]].concat();
        let unique = UniqueColorCounts::new(&samples);
        assert_valid(&unique, &samples);
        assert_eq!(unique.num_colors(), 256);
    }

    #[test]
    fn reordered_input() {
        let colors = test_data_1024();
        let mut reordered = colors.clone();
        let mut rng = Xoroshiro128PlusPlus::seed_from_u64(0);
        reordered.shuffle(&mut rng);

        let expected = UniqueColorCounts::new(&colors);
        let actual = UniqueColorCounts::new(&reordered);
        assert_valid(&actual, &reordered);
        assert_eq!(actual.colors(), expected.colors());
        assert_eq!(actual.counts(), expected.counts());

        let repeated = [colors.as_slice(); 64].concat();
        let dense = UniqueColorCounts::new(&repeated);
        assert_eq!(dense.colors(), expected.colors());
        assert!(dense
            .counts()
            .iter()
            .zip(expected.counts())
            .all(|(&a, &b)| a == b * 64));
    }

    #[test]
    fn dense_red_bucket() {
        let samples = (0..=u16::MAX)
            .map(|i| {
                let [g, b] = i.to_be_bytes();
                Srgb::new(7, g, b)
            })
            .collect::<Vec<_>>();

        let unique = UniqueColorCounts::from_samples(samples.iter().copied().rev());
        assert_eq!(unique.colors(), samples.as_slice());
        assert!(unique.counts().iter().all(|&count| count == 1));
        assert_eq!(unique.first_seen()[0], u32::from(u16::MAX));
    }

    #[test]
    fn most_frequent_is_stable() {
        let a = Srgb::new(1, 0, 0);
        let b = Srgb::new(2, 0, 0);
        let c = Srgb::new(3, 0, 0);
        let unique = UniqueColorCounts::from_samples([c, b, c, a, b, c]);

        assert_eq!(unique.most_frequent(1), vec![c]);
        assert_eq!(unique.most_frequent(3), vec![c, b, a]);
        assert_eq!(unique.most_frequent(10).len(), 3);

        let tied = UniqueColorCounts::from_samples([c, b, a]);
        assert_eq!(tied.most_frequent(2), vec![c, b]);

        let tied = UniqueColorCounts::from_samples([b, a, c, a, b]);
        assert_eq!(tied.most_frequent(3), vec![b, a, c]);
    }
}
