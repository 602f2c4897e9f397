//! PNG read and write.
//!
//! Write options: `file.png:C`, where `C` is the compression level, 0 to 9.

use std::sync::Arc;

use ::image::codecs::png::{CompressionType, FilterType, PngEncoder};
use ::image::ImageFormat;

use super::codec::{self, Decoder};
use super::{parse_options, Format, Probe};
use crate::error::ImageError;
use crate::image::Image;
use crate::open::split_filename;

const NAME: &str = "png";

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Default compression level.
pub const DEFAULT_COMPRESSION: u8 = 6;

fn compression_from_options(options: &str) -> Result<CompressionType, ImageError> {
    let level = match parse_options(options).first() {
        None => DEFAULT_COMPRESSION,
        Some((c, _)) => c
            .parse::<u8>()
            .ok()
            .filter(|c| *c <= 9)
            .ok_or_else(|| ImageError::codec(NAME, format!("bad compression \"{c}\"")))?,
    };

    Ok(match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    })
}

pub struct Png;

impl Format for Png {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_a(&self, probe: &Probe<'_>) -> bool {
        probe.magic.starts_with(&PNG_MAGIC)
    }

    fn header(&self, filename: &str, image: &Image) -> Result<(), ImageError> {
        codec::read_header(NAME, filename, Decoder::Known(ImageFormat::Png), image)
    }

    fn load(&self, filename: &str, image: &Arc<Image>) -> Result<(), ImageError> {
        codec::load(NAME, filename, Decoder::Known(ImageFormat::Png), image)
    }

    fn suffixes(&self) -> &'static [&'static str] {
        &["png"]
    }

    fn save(&self, image: &Arc<Image>, filename: &str) -> Result<(), ImageError> {
        let (path, options) = split_filename(filename);
        let compression = compression_from_options(options)?;

        let dynamic = codec::to_dynamic(NAME, image)?;
        codec::write_file(NAME, path, |writer| {
            let encoder = PngEncoder::new_with_quality(writer, compression, FilterType::Adaptive);
            dynamic
                .write_with_encoder(encoder)
                .map_err(|e| ImageError::codec(NAME, e))
        })
    }
}
