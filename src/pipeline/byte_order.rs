//! Byte-order normalization for native files.
//!
//! Native files carry their writer's byte order. A read-only open of a
//! foreign-order file hands back a partial image that swaps samples to
//! platform order as regions are pulled, so callers only ever see native
//! order. The stored image stays open underneath and is closed with the
//! returned handle.

use std::sync::Arc;

use tracing::debug;

use crate::error::ImageError;
use crate::format::native;
use crate::image::{copy_swap, Coding, Image};

/// Open the native file at `path` read-only, in platform byte order.
///
/// Files already in platform order and LabQ-coded files come back as the
/// stored handle. Any other coding in foreign order can't be swapped and
/// fails with [`ImageError::UnknownCoding`], whatever the sample size.
/// Uncoded files with one-byte samples come back as stored.
pub fn read_native(path: &str) -> Result<Arc<Image>, ImageError> {
    let stored = native::open_read(path)?;
    let header = stored.header();

    if header.byte_order.is_native() || header.coding == Coding::LabQ {
        return Ok(stored);
    }
    if header.coding != Coding::None {
        let _ = stored.close();
        return Err(ImageError::UnknownCoding);
    }
    if header.format.size() == 1 {
        return Ok(stored);
    }

    debug!("{} is {:?}, swapping on read", path, header.byte_order);

    let swapped = Image::partial(path);
    let input = stored.clone();
    swapped.add_close_callback(move |_| input.close());
    copy_swap(&stored, &swapped)?;
    Ok(swapped)
}
