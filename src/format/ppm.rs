//! PPM, PGM and PBM read and write.
//!
//! Saves one-band images as PGM and everything else as PPM. Write option
//! `ascii` selects the plain-text variants; the default is binary.

use std::sync::Arc;

use ::image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use ::image::{ColorType, DynamicImage, ImageFormat};

use super::codec::{self, Decoder};
use super::{parse_options, Format, Probe};
use crate::error::ImageError;
use crate::image::Image;
use crate::open::split_filename;

const NAME: &str = "ppm";

/// `P1` to `P6`
fn is_pnm_magic(magic: &[u8]) -> bool {
    matches!(magic, [b'P', b'1'..=b'6', ..])
}

pub struct Ppm;

impl Format for Ppm {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_a(&self, probe: &Probe<'_>) -> bool {
        is_pnm_magic(probe.magic)
    }

    fn header(&self, filename: &str, image: &Image) -> Result<(), ImageError> {
        codec::read_header(NAME, filename, Decoder::Known(ImageFormat::Pnm), image)
    }

    fn load(&self, filename: &str, image: &Arc<Image>) -> Result<(), ImageError> {
        codec::load(NAME, filename, Decoder::Known(ImageFormat::Pnm), image)
    }

    fn suffixes(&self) -> &'static [&'static str] {
        &["ppm", "pbm", "pgm"]
    }

    fn save(&self, image: &Arc<Image>, filename: &str) -> Result<(), ImageError> {
        let (path, options) = split_filename(filename);
        let encoding = if parse_options(options).iter().any(|(o, _)| *o == "ascii") {
            SampleEncoding::Ascii
        } else {
            SampleEncoding::Binary
        };

        let dynamic = codec::to_dynamic(NAME, image)?;
        let (dynamic, subtype) = match dynamic.color() {
            ColorType::L8 | ColorType::L16 => (dynamic, PnmSubtype::Graymap(encoding)),
            ColorType::La8 => (
                DynamicImage::ImageLuma8(dynamic.to_luma8()),
                PnmSubtype::Graymap(encoding),
            ),
            ColorType::La16 => (
                DynamicImage::ImageLuma16(dynamic.to_luma16()),
                PnmSubtype::Graymap(encoding),
            ),
            ColorType::Rgb8 | ColorType::Rgb16 => (dynamic, PnmSubtype::Pixmap(encoding)),
            ColorType::Rgba16 => (
                DynamicImage::ImageRgb16(dynamic.to_rgb16()),
                PnmSubtype::Pixmap(encoding),
            ),
            _ => (
                DynamicImage::ImageRgb8(dynamic.to_rgb8()),
                PnmSubtype::Pixmap(encoding),
            ),
        };

        codec::write_file(NAME, path, |writer| {
            dynamic
                .write_with_encoder(PnmEncoder::new(writer).with_subtype(subtype))
                .map_err(|e| ImageError::codec(NAME, e))
        })
    }
}
