//! TIFF read and write.
//!
//! A TIFF file the TIFF reader can't handle gets one more chance through the
//! generic fallback decoder: at open time if the header is rejected, and at
//! pixel time if decoding fails. When the fallback fails too, the TIFF error
//! is what the caller sees.
//!
//! The TIFF reader decodes under an allocation limit. The fallback picks its
//! decoder from the file contents and runs without limits, so a file too
//! large for the TIFF reader still loads through it.

use std::sync::Arc;

use ::image::codecs::tiff::TiffEncoder;
use ::image::ImageFormat;
use tracing::{debug, warn};

use super::codec::{self, Decoder};
use super::magick::FALLBACK;
use super::{Format, Probe};
use crate::error::ImageError;
use crate::image::Image;
use crate::open::split_filename;
use crate::pipeline::open_lazy;

const NAME: &str = "tiff";

/// Classic TIFF, either byte order.
const TIFF_MAGIC_LE: [u8; 4] = [0x49, 0x49, 0x2A, 0x00];
const TIFF_MAGIC_BE: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2A];

/// BigTIFF, either byte order.
const BIGTIFF_MAGIC_LE: [u8; 4] = [0x49, 0x49, 0x2B, 0x00];
const BIGTIFF_MAGIC_BE: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2B];

/// Check if bytes look like a TIFF or BigTIFF header.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    match bytes.get(..4) {
        Some(m) => {
            m == TIFF_MAGIC_LE || m == TIFF_MAGIC_BE || m == BIGTIFF_MAGIC_LE || m == BIGTIFF_MAGIC_BE
        }
        None => false,
    }
}

/// Largest allocation the TIFF reader makes while decoding, 512 MiB.
pub const DEFAULT_MAX_ALLOC: u64 = 512 * 1024 * 1024;

pub struct Tiff {
    max_alloc: u64,
}

/// The TIFF entry of the format tables.
pub static TIFF: Tiff = Tiff::with_max_alloc(DEFAULT_MAX_ALLOC);

impl Tiff {
    /// A TIFF reader that refuses to allocate more than `max_alloc` bytes.
    pub const fn with_max_alloc(max_alloc: u64) -> Self {
        Self { max_alloc }
    }

    fn decoder(&self) -> Decoder {
        Decoder::Bounded(ImageFormat::Tiff, self.max_alloc)
    }

    fn load_with_fallback(&self, filename: &str, image: &Arc<Image>) -> Result<(), ImageError> {
        self.load(filename, image).or_else(|err| {
            warn!("TIFF decode of {} failed ({}), trying fallback decoder", filename, err);
            FALLBACK.load(filename, image).map_err(|_| err)
        })
    }
}

impl Format for Tiff {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_a(&self, probe: &Probe<'_>) -> bool {
        is_tiff_header(probe.magic)
    }

    fn header(&self, filename: &str, image: &Image) -> Result<(), ImageError> {
        codec::read_header(NAME, filename, self.decoder(), image)
    }

    fn load(&self, filename: &str, image: &Arc<Image>) -> Result<(), ImageError> {
        codec::load(NAME, filename, self.decoder(), image)
    }

    fn suffixes(&self) -> &'static [&'static str] {
        &["tif", "tiff"]
    }

    fn save(&self, image: &Arc<Image>, filename: &str) -> Result<(), ImageError> {
        let (path, options) = split_filename(filename);
        if !options.is_empty() {
            debug!("ignoring TIFF options \"{}\" for {}", options, path);
        }

        let dynamic = codec::to_dynamic(NAME, image)?;
        codec::write_file(NAME, path, |writer| {
            dynamic
                .write_with_encoder(TiffEncoder::new(writer))
                .map_err(|e| ImageError::codec(NAME, e))
        })
    }

    fn open(&'static self, filename: &str) -> Result<Arc<Image>, ImageError> {
        let opened = open_lazy(
            filename,
            |filename, image| self.header(filename, image),
            move |filename, image| self.load_with_fallback(filename, image),
        );

        opened.or_else(|err| {
            warn!("TIFF open of {} failed ({}), trying fallback decoder", filename, err);
            FALLBACK.open(filename).map_err(|_| err)
        })
    }
}
