//! Test utilities for integration tests.
//!
//! Helpers that write fixture images into per-test scratch directories:
//! native files in either byte order, Analyze pairs, CSV text and anything
//! the `image` crate can encode.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{GrayImage, Luma, Rgb, RgbImage};

use lazy_image_io::{registry, BandFormat, ByteOrder};

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

// =============================================================================
// Scratch directories
// =============================================================================

/// A fresh, empty directory for one test.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "lazy-image-io-it-{}-{}-{}",
        std::process::id(),
        tag,
        NEXT_DIR.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Whether any open handle is named `filename`.
pub fn is_registered(filename: &str) -> bool {
    registry::open_filenames().iter().any(|f| f == filename)
}

// =============================================================================
// Fixtures through the image crate
// =============================================================================

/// Grey ramp: pixel (x, y) is `x + 10 * y`.
pub fn gray_ramp(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([(x + 10 * y) as u8]))
}

pub fn gray_ramp_bytes(width: u32, height: u32) -> Vec<u8> {
    gray_ramp(width, height).into_raw()
}

/// Colour test card: red grows left to right, green top to bottom.
pub fn rgb_card(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    })
}

pub fn write_png_gray(path: &Path, width: u32, height: u32) {
    gray_ramp(width, height).save(path).unwrap();
}

pub fn write_jpeg_rgb(path: &Path, width: u32, height: u32) {
    rgb_card(width, height).save(path).unwrap();
}

// =============================================================================
// Native files
// =============================================================================

fn put_u32(order: ByteOrder, value: u32) -> [u8; 4] {
    match order {
        ByteOrder::LittleEndian => value.to_le_bytes(),
        ByteOrder::BigEndian => value.to_be_bytes(),
    }
}

/// The byte order this machine doesn't use.
pub fn foreign_order() -> ByteOrder {
    match ByteOrder::native() {
        ByteOrder::LittleEndian => ByteOrder::BigEndian,
        ByteOrder::BigEndian => ByteOrder::LittleEndian,
    }
}

/// Write a one-coding-none native file.
///
/// `pixels` must already be in `order`.
pub fn write_native(
    path: &Path,
    order: ByteOrder,
    width: u32,
    height: u32,
    bands: u32,
    format: BandFormat,
    pixels: &[u8],
) {
    let magic = match order {
        ByteOrder::LittleEndian => [0x08, 0xF2, 0xA6, 0xB6],
        ByteOrder::BigEndian => [0xB6, 0xA6, 0xF2, 0x08],
    };

    let mut bytes = vec![0u8; 64];
    bytes[0..4].copy_from_slice(&magic);
    let fields = [
        width,
        height,
        bands,
        format.bits(),
        format.code() as u32,
        0, // coding none
        0, // multiband
        1.0f32.to_bits(),
        1.0f32.to_bits(),
    ];
    for (i, field) in fields.iter().enumerate() {
        bytes[4 + i * 4..8 + i * 4].copy_from_slice(&put_u32(order, *field));
    }
    bytes.extend_from_slice(pixels);
    std::fs::write(path, bytes).unwrap();
}

/// `values` as ushort samples in `order`.
pub fn ushort_bytes(values: &[u16], order: ByteOrder) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| match order {
            ByteOrder::LittleEndian => v.to_le_bytes(),
            ByteOrder::BigEndian => v.to_be_bytes(),
        })
        .collect()
}

pub fn ushort_native(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

// =============================================================================
// Analyze pairs
// =============================================================================

/// Write `base.hdr` and `base.img` for a short-typed `x` by `y` by `z`
/// volume stored in `order`.
pub fn write_analyze_short(base: &Path, order: ByteOrder, dims: [i16; 3], voxels: &[i16]) {
    let i16_bytes = |v: i16| match order {
        ByteOrder::LittleEndian => v.to_le_bytes(),
        ByteOrder::BigEndian => v.to_be_bytes(),
    };

    let mut hdr = vec![0u8; 348];
    hdr[0..4].copy_from_slice(&put_u32(order, 348));
    for (i, v) in [3, dims[0], dims[1], dims[2]].iter().enumerate() {
        hdr[40 + i * 2..42 + i * 2].copy_from_slice(&i16_bytes(*v));
    }
    hdr[70..72].copy_from_slice(&i16_bytes(4));
    hdr[72..74].copy_from_slice(&i16_bytes(16));
    for i in 1..4 {
        hdr[76 + i * 4..80 + i * 4].copy_from_slice(&put_u32(order, 0.5f32.to_bits()));
    }

    let img: Vec<u8> = voxels.iter().flat_map(|v| i16_bytes(*v)).collect();
    std::fs::write(base.with_extension("hdr"), hdr).unwrap();
    std::fs::write(base.with_extension("img"), img).unwrap();
}
