//! OpenEXR read.

use std::sync::Arc;

use ::image::ImageFormat;

use super::codec::{self, Decoder};
use super::{Format, Probe};
use crate::error::ImageError;
use crate::image::Image;

const NAME: &str = "exr";

const EXR_MAGIC: [u8; 4] = [0x76, 0x2F, 0x31, 0x01];

pub struct Exr;

impl Format for Exr {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_a(&self, probe: &Probe<'_>) -> bool {
        probe.magic.starts_with(&EXR_MAGIC)
    }

    fn header(&self, filename: &str, image: &Image) -> Result<(), ImageError> {
        codec::read_header(NAME, filename, Decoder::Known(ImageFormat::OpenExr), image)
    }

    fn load(&self, filename: &str, image: &Arc<Image>) -> Result<(), ImageError> {
        codec::load(NAME, filename, Decoder::Known(ImageFormat::OpenExr), image)
    }
}
