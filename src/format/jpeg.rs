//! JPEG read and write.
//!
//! Write options: `file.jpg:Q`, where `Q` is the quality, 1 to 100. Alpha
//! is dropped and 16-bit images are reduced to 8 bits on save.

use std::sync::Arc;

use ::image::codecs::jpeg::JpegEncoder;
use ::image::{ColorType, DynamicImage, ImageFormat};

use super::codec::{self, Decoder};
use super::{parse_options, Format, Probe};
use crate::error::ImageError;
use crate::image::Image;
use crate::open::split_filename;

const NAME: &str = "jpeg";

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Start Of Image marker, plus the first byte of the next marker
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Clamp quality to valid range.
///
/// Values below 1 become 1, values above 100 become 100.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

/// Quality from the option string, e.g. `"90"`.
fn quality_from_options(options: &str) -> Result<u8, ImageError> {
    match parse_options(options).first() {
        None => Ok(DEFAULT_JPEG_QUALITY),
        Some((q, _)) => q
            .parse::<u8>()
            .map(clamp_quality)
            .map_err(|_| ImageError::codec(NAME, format!("bad quality \"{q}\""))),
    }
}

/// Reduce to something baseline JPEG can store: 8-bit grey or RGB.
fn to_jpeg_layout(image: DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::L8 | ColorType::Rgb8 => image,
        ColorType::La8 | ColorType::L16 | ColorType::La16 => {
            DynamicImage::ImageLuma8(image.to_luma8())
        }
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

pub struct Jpeg;

impl Format for Jpeg {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_a(&self, probe: &Probe<'_>) -> bool {
        probe.magic.starts_with(&JPEG_MAGIC)
    }

    fn header(&self, filename: &str, image: &Image) -> Result<(), ImageError> {
        codec::read_header(NAME, filename, Decoder::Known(ImageFormat::Jpeg), image)
    }

    fn load(&self, filename: &str, image: &Arc<Image>) -> Result<(), ImageError> {
        codec::load(NAME, filename, Decoder::Known(ImageFormat::Jpeg), image)
    }

    fn suffixes(&self) -> &'static [&'static str] {
        &["jpeg", "jpg", "jfif", "jpe"]
    }

    fn save(&self, image: &Arc<Image>, filename: &str) -> Result<(), ImageError> {
        let (path, options) = split_filename(filename);
        let quality = quality_from_options(options)?;

        let dynamic = to_jpeg_layout(codec::to_dynamic(NAME, image)?);
        codec::write_file(NAME, path, |writer| {
            dynamic
                .write_with_encoder(JpegEncoder::new_with_quality(writer, quality))
                .map_err(|e| ImageError::codec(NAME, e))
        })
    }
}
