#![allow(dead_code)]

use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Write a solid-color JPEG fixture.
pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(&path)
        .expect("Failed to write fixture JPEG");
    path
}

/// A file with a JPEG extension that no decoder accepts.
pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"definitely not image data").expect("Failed to write fixture");
    path
}

/// A gradient JPEG cut off halfway through its bytes, as left behind by an
/// interrupted copy.
pub fn write_truncated_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
        .save(&path)
        .expect("Failed to write fixture JPEG");
    let bytes = fs::read(&path).expect("Failed to read fixture");
    fs::write(&path, &bytes[..bytes.len() / 2]).expect("Failed to truncate fixture");
    path
}

/// `count` fixtures named img_00.jpg, img_01.jpg, ... alternating
/// landscape and portrait.
pub fn write_roll(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let (w, h) = if i % 2 == 0 { (300, 200) } else { (200, 300) };
            write_jpeg(dir, &format!("img_{:02}.jpg", i), w, h, [40, 80, 120])
        })
        .collect()
}
