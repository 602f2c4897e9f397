//! Descriptor sanity checks.

use tracing::warn;

use crate::image::{registry, BandFormat, Coding, Image, Interpretation};

/// First problem found with `image`, if any.
///
/// Checks, in order: a missing descriptor, an empty filename, a handle that
/// isn't open, zero dimensions, enum fields that don't make sense, and
/// negative or non-finite resolution. A format or coding that is still
/// "not set" is in range.
pub fn check(image: Option<&Image>) -> Option<&'static str> {
    let Some(image) = image else {
        return Some("NULL descriptor");
    };
    if image.filename().is_empty() {
        return Some("NULL filename");
    }
    if !registry::is_open(image.id()) {
        return Some("not on open image list");
    }

    let header = image.header();
    if header.width == 0 || header.height == 0 || header.bands == 0 {
        return Some("bad dimensions");
    }

    let bad_enum = matches!(header.interpretation, Interpretation::Other(_))
        || (header.coding == Coding::LabQ && header.format != BandFormat::UChar);
    if bad_enum {
        return Some("bad enum value");
    }

    if !(header.xres >= 0.0 && header.xres.is_finite())
        || !(header.yres >= 0.0 && header.yres.is_finite())
    {
        return Some("bad resolution");
    }

    None
}

/// Run [`check`] and log any problem along with the header.
///
/// Never fails; the return value says whether the image passed.
pub fn image_sanity(image: &Image) -> bool {
    match check(Some(image)) {
        None => true,
        Some(message) => {
            warn!(
                "sanity check failed for \"{}\" ({}): {}",
                image.filename(),
                image.id(),
                message
            );
            for line in image.header().to_string().lines() {
                warn!("  {}", line);
            }
            false
        }
    }
}
