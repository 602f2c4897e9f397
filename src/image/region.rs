//! Rectangles and regions: the unit of demand-driven pixel transfer.

use std::sync::Arc;

use super::{Image, Sequence};
use crate::error::ImageError;

// =============================================================================
// Rect
// =============================================================================

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// One past the last column, saturating at `u32::MAX`.
    pub const fn right(&self) -> u32 {
        self.left.saturating_add(self.width)
    }

    /// One past the last row, saturating at `u32::MAX`.
    pub const fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height)
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Overlap of two rectangles; empty when they don't touch.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return Rect::default();
        }
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

// =============================================================================
// Region
// =============================================================================

/// A consumer's view over part of an image.
///
/// Each region owns its own sequence on the image's generator, created on
/// the first [`Region::prepare`]. Workers pulling concurrently from the same
/// image each use their own region.
pub struct Region {
    image: Arc<Image>,
    sequence: Option<Box<dyn Sequence>>,
    valid: Rect,
    data: Vec<u8>,
}

impl Region {
    pub(crate) fn new(image: Arc<Image>) -> Self {
        Self {
            image,
            sequence: None,
            valid: Rect::default(),
            data: Vec::new(),
        }
    }

    /// The image this region reads from.
    pub fn image(&self) -> &Arc<Image> {
        &self.image
    }

    /// Fill the region with pixels for `rect`, clipped to the image.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::BadRegion`] if `rect` does not overlap the image,
    /// or whatever the pixel source reports.
    pub fn prepare(&mut self, rect: Rect) -> Result<(), ImageError> {
        let header = self.image.header();
        header.validate(self.image.filename())?;

        let bounds = Rect::new(0, 0, header.width, header.height);
        let clipped = bounds.intersect(&rect);
        if clipped.is_empty() {
            return Err(ImageError::BadRegion {
                filename: self.image.filename().to_string(),
                reason: format!("{rect:?} lies outside {}x{}", header.width, header.height),
            });
        }

        self.data.clear();
        self.data
            .resize(clipped.area() as usize * header.pel_size(), 0);
        self.valid = clipped;

        self.image
            .fill_region(&mut self.sequence, clipped, &mut self.data)
    }

    /// Area that the last successful `prepare` filled.
    pub fn valid(&self) -> Rect {
        self.valid
    }

    /// Packed row-major pixels of the valid area.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the pixel buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Bytes of image row `y` inside the valid area.
    ///
    /// Returns `None` when `y` is outside the valid area.
    pub fn line(&self, y: u32) -> Option<&[u8]> {
        if y < self.valid.top || y >= self.valid.bottom() {
            return None;
        }
        let line_size = self.valid.width as usize * self.image.header().pel_size();
        let start = (y - self.valid.top) as usize * line_size;
        self.data.get(start..start + line_size)
    }
}

/// Copy the `rect` part of a packed image with `line_size`-byte rows into `out`.
pub(crate) fn copy_rect(
    src: &[u8],
    line_size: usize,
    pel_size: usize,
    rect: Rect,
    out: &mut [u8],
) {
    let row_bytes = rect.width as usize * pel_size;
    for (i, y) in (rect.top..rect.bottom()).enumerate() {
        let start = y as usize * line_size + rect.left as usize * pel_size;
        out[i * row_bytes..(i + 1) * row_bytes].copy_from_slice(&src[start..start + row_bytes]);
    }
}
