//! Image file formats.
//!
//! Every supported format is a [`Format`]: a recognizer that looks at magic
//! bytes or the filename suffix, a header reader, a pixel reader and
//! optionally a writer. The dispatcher walks the fixed tables in [`detect`]
//! and hands the file to the first format that claims it.
//!
//! Supported formats:
//!
//! - **Native**: this crate's own uncompressed layout, read in place
//! - **TIFF, JPEG, PNG, PPM/PGM/PBM, OpenEXR**: through the `image` crate
//! - **CSV**: text matrices, one band of doubles
//! - **Analyze 7.5**: `.hdr`/`.img` medical volume pairs
//! - **Fallback**: anything else the `image` crate can guess
//!
//! Filenames handed to a format may carry a trailing `:options` suffix; each
//! format parses its own options.

use std::sync::Arc;

use crate::error::ImageError;
use crate::image::Image;
use crate::pipeline::open_lazy;

pub mod analyze;
pub(crate) mod codec;
pub mod csv;
pub mod detect;
pub mod exr;
pub mod jpeg;
pub mod magick;
pub mod native;
pub mod png;
pub mod ppm;
pub mod tiff;

pub use detect::{find_reader, find_writer, suffix_matches, WriteTarget};

/// What a recognizer gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct Probe<'a> {
    /// Path with any `:options` removed
    pub path: &'a str,
    /// Leading bytes of the file (may be shorter than requested)
    pub magic: &'a [u8],
    /// Open requested read-write access
    pub read_write: bool,
}

/// One image file format.
pub trait Format: Send + Sync {
    /// Short name, used in logs and codec errors.
    fn name(&self) -> &'static str;

    /// Whether this format claims the probed file.
    fn is_a(&self, probe: &Probe<'_>) -> bool;

    /// Fill in the header of `image` without decoding pixels.
    ///
    /// Only the default [`Format::open`] calls this; formats that override
    /// `open` can leave it out.
    fn header(&self, filename: &str, _image: &Image) -> Result<(), ImageError> {
        Err(ImageError::UnsupportedFormat(filename.to_string()))
    }

    /// Decode all pixels into the buffer handle `image`.
    fn load(&self, filename: &str, _image: &Arc<Image>) -> Result<(), ImageError> {
        Err(ImageError::UnsupportedFormat(filename.to_string()))
    }

    /// Suffixes this format writes, lower case without the dot.
    fn suffixes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Encode `image` to `filename`.
    fn save(&self, _image: &Arc<Image>, filename: &str) -> Result<(), ImageError> {
        Err(ImageError::UnknownSuffix(filename.to_string()))
    }

    /// Open `filename` for reading.
    ///
    /// The default reads the header now and defers [`Format::load`] to the
    /// first region pull.
    fn open(&'static self, filename: &str) -> Result<Arc<Image>, ImageError> {
        open_lazy(
            filename,
            |filename, image| self.header(filename, image),
            move |filename, image| self.load(filename, image),
        )
    }
}

/// Split comma-separated `key:value` options.
///
/// Bare words come back with an empty value.
pub(crate) fn parse_options(options: &str) -> Vec<(&str, &str)> {
    options
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| o.split_once(':').unwrap_or((o, "")))
        .collect()
}
