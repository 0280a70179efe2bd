#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use image::{Rgba, RgbaImage};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

pub fn load_images(images: &[PathBuf]) -> Vec<(String, RgbaImage)> {
    images
        .iter()
        .map(|path| {
            image::open(path).map(|image| {
                (
                    path.file_name().unwrap().to_owned().into_string().unwrap(),
                    image.into_rgba8(),
                )
            })
        })
        .collect::<Result<_, _>>()
        .expect("loaded each image")
}

pub fn load_image_dir(dir: impl AsRef<Path>) -> Vec<(String, RgbaImage)> {
    let mut paths = std::fs::read_dir(dir)
        .expect("read img directory")
        .collect::<Result<Vec<_>, _>>()
        .expect("read each file")
        .iter()
        .map(std::fs::DirEntry::path)
        .collect::<Vec<_>>();

    paths.sort();

    load_images(&paths)
}

/// Set this to a directory of PNG/JPEG files to benchmark on real images as well.
pub const IMAGE_DIR_VAR: &str = "SWATCH_BENCH_IMAGES";

pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            ((x + y) * 255 / (width + height)) as u8,
            255,
        ])
    })
}

/// Flat 16x16 blocks drawn from a few base colors, with per-pixel noise and some transparent blocks.
pub fn blocks(width: u32, height: u32, seed: u64) -> RgbaImage {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    let base = (0..12).map(|_| rng.gen::<[u8; 3]>()).collect::<Vec<_>>();

    let cols = width.div_ceil(16) as usize;
    let rows = height.div_ceil(16) as usize;
    let cells = (0..cols * rows)
        .map(|_| (*base.choose(&mut rng).unwrap(), rng.gen_bool(0.9)))
        .collect::<Vec<_>>();

    RgbaImage::from_fn(width, height, |x, y| {
        let ([r, g, b], opaque) = cells[(y / 16) as usize * cols + (x / 16) as usize];
        let mut noise = |c: u8| c.saturating_add_signed(rng.gen_range(-8..=8));
        Rgba([noise(r), noise(g), noise(b), if opaque { 255 } else { 0 }])
    })
}

pub fn noise(width: u32, height: u32, seed: u64) -> RgbaImage {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    RgbaImage::from_fn(width, height, |_, _| {
        let [r, g, b] = rng.gen::<[u8; 3]>();
        Rgba([r, g, b, 255])
    })
}

pub fn load_bench_images() -> Vec<(String, RgbaImage)> {
    let mut images = vec![
        ("gradient_640x480".to_owned(), gradient(640, 480)),
        ("blocks_1024x768".to_owned(), blocks(1024, 768, 0)),
        ("noise_512x512".to_owned(), noise(512, 512, 0)),
    ];

    if let Some(dir) = std::env::var_os(IMAGE_DIR_VAR) {
        images.extend(load_image_dir(dir));
    }

    images
}

static BENCH_IMAGES: OnceLock<Vec<(String, RgbaImage)>> = OnceLock::new();

pub fn bench_images() -> &'static [(String, RgbaImage)] {
    BENCH_IMAGES.get_or_init(load_bench_images)
}
