//! Delayed save: write now, encode at close.
//!
//! A write-mode open for an encoded format hands back a partial image under
//! a scratch name. Whatever the caller attaches to it stays lazy until the
//! handle is closed; the preclose callback then runs the real encoder over
//! the partial and writes the destination file. Encoder failures come back
//! from `close`.

use std::sync::Arc;

use tracing::debug;

use crate::error::ImageError;
use crate::format::Format;
use crate::image::Image;

/// Encoder and destination recorded for a delayed save.
pub struct SaveDescriptor {
    format: &'static dyn Format,
    filename: String,
}

impl SaveDescriptor {
    pub fn new(format: &'static dyn Format, filename: &str) -> Self {
        Self {
            format,
            filename: filename.to_string(),
        }
    }

    /// Destination, including any `:options`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Encode `image` to the destination.
    ///
    /// Consumes the descriptor, so a save runs at most once.
    pub fn invoke(self, image: &Image) -> Result<(), ImageError> {
        debug!(
            "delayed {} save of {} to {}",
            self.format.name(),
            image.filename(),
            self.filename
        );

        let view = image
            .view(image.filename())
            .map_err(|e| ImageError::codec(self.format.name(), e))?;
        let saved = self.format.save(&view, &self.filename);
        let closed = view.close();
        saved.and(closed)
    }
}

/// Open a partial image that is saved to `filename` with `format` when it
/// is closed.
pub fn open_delayed_save(
    filename: &str,
    format: &'static dyn Format,
) -> Result<Arc<Image>, ImageError> {
    let image = Image::partial(&format!("delayed-save:{}", format.name()));
    let descriptor = SaveDescriptor::new(format, filename);
    image.add_preclose_callback(move |image| descriptor.invoke(image));
    Ok(image)
}
