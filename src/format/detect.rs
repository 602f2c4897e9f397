//! Format tables and lookup.
//!
//! Reading walks [`READ_FORMATS`] in order and the first recognizer that
//! claims the file wins. The order matters:
//!
//! 1. Native, read-only
//! 2. TIFF (falls back to the generic decoder on failure)
//! 3. JPEG
//! 4. OpenEXR
//! 5. PPM family
//! 6. PNG
//! 7. CSV, by suffix
//! 8. Native, read-write
//! 9. Analyze
//! 10. Generic fallback, last because it is the slowest to reject a file
//!
//! Writing matches the filename suffix, case-insensitively, against the
//! suffix table of each writable format.

use super::{analyze, csv, exr, jpeg, magick, native, png, ppm, tiff, Format, Probe};

/// Number of leading bytes read for magic checks.
pub const MAGIC_BYTES: usize = 16;

/// Recognizers in priority order.
pub static READ_FORMATS: [&dyn Format; 10] = [
    &native::NativeRead,
    &tiff::TIFF,
    &jpeg::Jpeg,
    &exr::Exr,
    &ppm::Ppm,
    &png::Png,
    &csv::Csv,
    &native::NativeReadWrite,
    &analyze::Analyze,
    &magick::Magick,
];

/// Writable formats other than native, in lookup order.
pub static WRITE_FORMATS: [&dyn Format; 5] =
    [&tiff::TIFF, &jpeg::Jpeg, &ppm::Ppm, &png::Png, &csv::Csv];

/// Where a write-mode open sends its pixels.
#[derive(Clone, Copy)]
pub enum WriteTarget {
    /// Stream straight into a native file
    Native,
    /// Buffer through a partial image and encode at close
    Delayed(&'static dyn Format),
}

impl std::fmt::Debug for WriteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteTarget::Native => f.write_str("Native"),
            WriteTarget::Delayed(format) => write!(f, "Delayed({})", format.name()),
        }
    }
}

/// First format that claims the probed file.
pub fn find_reader(probe: &Probe<'_>) -> Option<&'static dyn Format> {
    READ_FORMATS.iter().copied().find(|format| format.is_a(probe))
}

/// Write target for `path`, chosen by suffix.
pub fn find_writer(path: &str) -> Option<WriteTarget> {
    if suffix_matches(path, native::SUFFIXES) {
        return Some(WriteTarget::Native);
    }
    WRITE_FORMATS
        .iter()
        .copied()
        .find(|format| suffix_matches(path, format.suffixes()))
        .map(WriteTarget::Delayed)
}

/// Suffix of the last path component, without the dot.
///
/// Empty when the name has no dot.
pub fn suffix(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(i) => &name[i + 1..],
        None => "",
    }
}

/// Whether the suffix of `path` is one of `suffixes`, ignoring case.
pub fn suffix_matches(path: &str, suffixes: &[&str]) -> bool {
    let suffix = suffix(path);
    suffixes.iter().any(|s| s.eq_ignore_ascii_case(suffix))
}
