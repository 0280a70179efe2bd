#[path = "../util/util.rs"]
mod util;

use util::bench_images;

use std::time::Duration;

use criterion::{
    criterion_group, criterion_main, measurement::WallTime, Bencher, BenchmarkId, Criterion,
    SamplingMode,
};
use swatch::{
    kmeans::{self, Centroids},
    median_cut,
    sample::{self, SampleOptions},
    PalettePipeline, PaletteSize, PixelBuffer, Quality, QuantizeMethod, UniqueColorCounts,
};

fn unique_colors() -> Vec<(String, UniqueColorCounts)> {
    bench_images()
        .iter()
        .map(|(path, image)| {
            let pixels = PixelBuffer::try_from(image).unwrap();
            let options = SampleOptions::new().quality(Quality::BEST);
            (path.clone(), UniqueColorCounts::from_samples(sample::sample(pixels, options)))
        })
        .collect()
}

fn bench<T>(
    c: &mut Criterion,
    group: &str,
    inputs: &[(String, T)],
    mut f: impl FnMut(&mut Bencher<WallTime>, &(PaletteSize, &T)),
) {
    let mut group = c.benchmark_group(group);
    group
        .sample_size(30)
        .noise_threshold(0.05)
        .sampling_mode(SamplingMode::Flat)
        .warm_up_time(Duration::from_millis(500));

    for (k, secs) in [(5u8, 2), (16, 2), (64, 4)] {
        let k = PaletteSize::try_from(k).unwrap();
        group.measurement_time(Duration::from_secs(secs));
        for (path, input) in inputs {
            group.bench_with_input(BenchmarkId::new(k.to_string(), path), &(k, input), &mut f);
        }
    }
}

fn kmeans_palette(c: &mut Criterion) {
    let counts = unique_colors();
    bench(c, "kmeans_palette", &counts, |b, &(k, counts)| {
        b.iter(|| {
            kmeans::palette(
                counts,
                Centroids::most_frequent(counts, k),
                kmeans::DEFAULT_MAX_ITERATIONS,
                true,
            )
        })
    })
}

fn median_cut_palette(c: &mut Criterion) {
    let counts = unique_colors();
    bench(c, "median_cut_palette", &counts, |b, &(k, counts)| {
        b.iter(|| {
            median_cut::palette(
                counts,
                k,
                median_cut::DEFAULT_MAX_ITERATIONS,
                median_cut::DEFAULT_FRACTION_BY_POPULATION,
            )
        })
    })
}

fn pipeline_single(c: &mut Criterion) {
    bench(c, "pipeline_single", bench_images(), |b, &(k, image)| {
        let pixels = PixelBuffer::try_from(image).unwrap();
        b.iter(|| PalettePipeline::new(pixels).palette_size(k).palette())
    })
}

fn pipeline_par(c: &mut Criterion) {
    bench(c, "pipeline_par", bench_images(), |b, &(k, image)| {
        let pixels = PixelBuffer::try_from(image).unwrap();
        b.iter(|| {
            PalettePipeline::new(pixels)
                .palette_size(k)
                .quantize_method(QuantizeMethod::median_cut())
                .palette_par()
        })
    })
}

criterion_group!(
    benches,
    kmeans_palette,
    median_cut_palette,
    pipeline_single,
    pipeline_par
);
criterion_main!(benches);
