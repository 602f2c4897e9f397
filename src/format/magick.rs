//! Generic fallback decoder.
//!
//! Claims anything whose leading bytes the `image` crate can put a format
//! to. Tried last when reading because it only gives up after every other
//! recognizer has, and tried second for TIFF files the TIFF reader rejects.

use std::sync::Arc;

use ::image::guess_format;

use super::codec::{self, Decoder};
use super::{Format, Probe};
use crate::error::ImageError;
use crate::image::Image;

const NAME: &str = "magick";

pub struct Magick;

/// The fallback, for callers that need it by reference.
pub static FALLBACK: Magick = Magick;

impl Format for Magick {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_a(&self, probe: &Probe<'_>) -> bool {
        guess_format(probe.magic).is_ok()
    }

    fn header(&self, filename: &str, image: &Image) -> Result<(), ImageError> {
        codec::read_header(NAME, filename, Decoder::Guess, image)
    }

    fn load(&self, filename: &str, image: &Arc<Image>) -> Result<(), ImageError> {
        codec::load(NAME, filename, Decoder::Guess, image)
    }
}
