//! Image handles and the region pipeline they take part in.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                Consumer                  │
//! │        (encoder, sink, caller)           │
//! └────────────────────┬─────────────────────┘
//!                      │ Region::prepare(rect)
//!                      ▼
//! ┌──────────────────────────────────────────┐
//! │                 Image                    │
//! │  header · callbacks · pixel source       │
//! └────────────────────┬─────────────────────┘
//!                      │
//!      ┌───────────────┼────────────────┐
//!      ▼               ▼                ▼
//!  ┌────────┐   ┌─────────────┐   ┌────────────┐
//!  │ Memory │   │ Native file │   │ Generator  │
//!  │ buffer │   │ (BlockCache)│   │ (Sequence) │
//!  └────────┘   └─────────────┘   └────────────┘
//! ```
//!
//! Handles are shared as `Arc<Image>`. Closing is explicit through
//! [`Image::close`]; a handle dropped while still open is closed then, and a
//! close failure at that point is logged.

mod callbacks;
mod generate;
mod header;
mod region;
pub mod registry;
mod sink;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

pub use callbacks::{CloseFn, EvalFn};
pub use generate::{copy, copy_swap, Generate, Sequence};
use generate::FailedSequence;
pub use header::{BandFormat, Coding, Header, Interpretation};
pub use region::{Rect, Region};
pub use sink::EvalStatus;

use callbacks::{Callbacks, EvalPhase};
use region::copy_rect;

use crate::error::ImageError;
use crate::io::{BlockCache, FileRangeReader, RangeReader};

// =============================================================================
// ImageKind
// =============================================================================

/// How a handle stores or obtains its pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// Native file opened read-only
    Mmap,
    /// Native file opened for in-place reading and writing
    MmapRw,
    /// Native file being written as a stream
    OpenOut,
    /// Temporary in-memory buffer
    Buffer,
    /// Virtual image computed on demand by a generator
    Partial,
}

impl ImageKind {
    pub const fn name(&self) -> &'static str {
        match self {
            ImageKind::Mmap => "mmap",
            ImageKind::MmapRw => "mmap-rw",
            ImageKind::OpenOut => "openout",
            ImageKind::Buffer => "buffer",
            ImageKind::Partial => "partial",
        }
    }
}

// =============================================================================
// Pixel sources
// =============================================================================

/// Pixel data of a native file, read through a block cache.
pub(crate) struct NativeFile {
    cache: BlockCache<FileRangeReader>,
    data_offset: u64,
}

impl NativeFile {
    pub(crate) fn new(cache: BlockCache<FileRangeReader>, data_offset: u64) -> Self {
        Self { cache, data_offset }
    }

    fn read_rect(&self, header: &Header, rect: Rect, out: &mut [u8]) -> Result<(), ImageError> {
        let pel_size = header.pel_size();
        let line_size = header.line_size() as u64;
        let row_bytes = rect.width as usize * pel_size;

        for (i, y) in (rect.top..rect.bottom()).enumerate() {
            let offset =
                self.data_offset + y as u64 * line_size + rect.left as u64 * pel_size as u64;
            let bytes = self.cache.read_exact_at(offset, row_bytes)?;
            out[i * row_bytes..(i + 1) * row_bytes].copy_from_slice(&bytes);
        }
        Ok(())
    }

    fn write_rect(&self, header: &Header, rect: Rect, data: &[u8]) -> Result<(), ImageError> {
        let pel_size = header.pel_size();
        let line_size = header.line_size() as u64;
        let row_bytes = rect.width as usize * pel_size;

        for (i, y) in (rect.top..rect.bottom()).enumerate() {
            let offset =
                self.data_offset + y as u64 * line_size + rect.left as u64 * pel_size as u64;
            self.cache
                .inner()
                .write_all_at(offset, &data[i * row_bytes..(i + 1) * row_bytes])?;
        }
        self.cache.clear();
        Ok(())
    }
}

pub(crate) enum Pixels {
    /// Nothing attached yet, or released at close
    Empty,
    Memory(Vec<u8>),
    File(NativeFile),
    Generator(Arc<dyn Generate>),
    /// Streaming write finished
    Written,
}

// =============================================================================
// Image
// =============================================================================

/// An open image handle.
///
/// Carries the header, the five lifecycle callback lists and the pixel
/// source. Every handle is in the process-wide open set (see [`registry`])
/// from construction until it is closed.
pub struct Image {
    id: u64,
    filename: String,
    kind: ImageKind,
    header: RwLock<Header>,
    pixels: RwLock<Pixels>,
    pub(crate) callbacks: Callbacks,
    close_started: AtomicBool,
    closed: AtomicBool,
}

impl Image {
    pub(crate) fn new(filename: &str, kind: ImageKind, header: Header, pixels: Pixels) -> Arc<Self> {
        let id = registry::register(filename);
        debug!("new {} image {} ({})", kind.name(), filename, id);

        Arc::new(Self {
            id,
            filename: filename.to_string(),
            kind,
            header: RwLock::new(header),
            pixels: RwLock::new(pixels),
            callbacks: Callbacks::default(),
            close_started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// A temporary in-memory image. Pixels arrive through
    /// [`Image::set_pixels`] or [`Image::generate`].
    pub fn buffer(name: &str) -> Arc<Self> {
        Self::new(name, ImageKind::Buffer, Header::default(), Pixels::Empty)
    }

    /// A virtual image. Pixels are computed on demand once a generator is
    /// attached with [`Image::generate`].
    pub fn partial(name: &str) -> Arc<Self> {
        Self::new(name, ImageKind::Partial, Header::default(), Pixels::Empty)
    }

    /// A native file written as a stream by [`Image::generate`].
    pub(crate) fn open_out(path: &str) -> Arc<Self> {
        Self::new(path, ImageKind::OpenOut, Header::default(), Pixels::Empty)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Snapshot of the header.
    pub fn header(&self) -> Header {
        *self.header.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn width(&self) -> u32 {
        self.header().width
    }

    pub fn height(&self) -> u32 {
        self.header().height
    }

    pub fn bands(&self) -> u32 {
        self.header().bands
    }

    pub fn format(&self) -> BandFormat {
        self.header().format
    }

    pub fn coding(&self) -> Coding {
        self.header().coding
    }

    /// Whether [`Image::close`] has completed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Replace the header of a handle under construction.
    ///
    /// Only buffer, partial and streaming-write handles accept a new header;
    /// native read handles take theirs from the file.
    pub fn set_header(&self, header: Header) -> Result<(), ImageError> {
        self.check_open()?;
        match self.kind {
            ImageKind::Buffer | ImageKind::Partial | ImageKind::OpenOut => {
                *self.header.write().unwrap_or_else(PoisonError::into_inner) = header;
                Ok(())
            }
            ImageKind::Mmap | ImageKind::MmapRw => Err(ImageError::InvalidArgument(format!(
                "can't set the header of {} image \"{}\"",
                self.kind.name(),
                self.filename
            ))),
        }
    }

    /// Set header and pixels of a buffer image in one step.
    pub fn set_pixels(&self, header: Header, data: Vec<u8>) -> Result<(), ImageError> {
        self.check_open()?;
        if self.kind != ImageKind::Buffer {
            return Err(ImageError::InvalidArgument(format!(
                "\"{}\" is not a buffer image",
                self.filename
            )));
        }
        header.validate(&self.filename)?;
        if data.len() as u64 != header.image_size() {
            return Err(ImageError::bad_header(
                &self.filename,
                format!(
                    "expected {} bytes of pixels, got {}",
                    header.image_size(),
                    data.len()
                ),
            ));
        }

        *self.header.write().unwrap_or_else(PoisonError::into_inner) = header;
        *self.pixels.write().unwrap_or_else(PoisonError::into_inner) = Pixels::Memory(data);
        Ok(())
    }

    /// Attach `generator` as the source of this image's pixels.
    ///
    /// A partial image keeps the generator and runs it on demand. Buffer and
    /// streaming-write images evaluate it straight away, into memory or to
    /// disk, firing their eval callbacks as they go.
    pub fn generate(
        self: &Arc<Self>,
        header: Header,
        generator: Arc<dyn Generate>,
    ) -> Result<(), ImageError> {
        self.check_open()?;
        header.validate(&self.filename)?;

        match self.kind {
            ImageKind::Partial => {
                self.set_header(header)?;
                self.set_source(Pixels::Generator(generator));
                Ok(())
            }
            ImageKind::Buffer => {
                self.set_header(header)?;
                self.set_source(Pixels::Generator(generator));
                match self.write_to_memory() {
                    Ok(data) => {
                        self.set_source(Pixels::Memory(data));
                        Ok(())
                    }
                    Err(e) => {
                        self.set_source(Pixels::Empty);
                        Err(e)
                    }
                }
            }
            ImageKind::OpenOut => {
                self.set_header(header)?;
                self.set_source(Pixels::Generator(generator));
                let result = crate::format::native::write_image(self, &self.filename);
                self.set_source(if result.is_ok() {
                    Pixels::Written
                } else {
                    Pixels::Empty
                });
                result
            }
            ImageKind::Mmap | ImageKind::MmapRw => Err(ImageError::InvalidArgument(format!(
                "can't generate into {} image \"{}\"",
                self.kind.name(),
                self.filename
            ))),
        }
    }

    /// A new handle over the same pixels, for evaluating an image that only
    /// a plain reference is available for (close callbacks).
    ///
    /// The eval callbacks move to the view so evaluation progress is still
    /// reported.
    pub(crate) fn view(&self, name: &str) -> Result<Arc<Image>, ImageError> {
        self.check_open()?;
        let header = self.header();
        header.validate(&self.filename)?;

        let pixels = match &*self.pixels.read().unwrap_or_else(PoisonError::into_inner) {
            Pixels::Generator(generator) => Pixels::Generator(generator.clone()),
            Pixels::Memory(data) => Pixels::Memory(data.clone()),
            Pixels::File(_) | Pixels::Empty | Pixels::Written => {
                return Err(ImageError::NoPixels(self.filename.clone()))
            }
        };

        let kind = match pixels {
            Pixels::Memory(_) => ImageKind::Buffer,
            _ => ImageKind::Partial,
        };
        let view = Self::new(name, kind, header, pixels);
        self.callbacks.move_eval_to(&view.callbacks);
        Ok(view)
    }

    pub(crate) fn set_source(&self, pixels: Pixels) {
        *self.pixels.write().unwrap_or_else(PoisonError::into_inner) = pixels;
    }

    /// Create a new consumer region on this image.
    pub fn region(self: &Arc<Self>) -> Region {
        Region::new(self.clone())
    }

    /// Produce the pixels of `rect` (already clipped) into `out`.
    pub(crate) fn fill_region(
        &self,
        sequence: &mut Option<Box<dyn Sequence>>,
        rect: Rect,
        out: &mut [u8],
    ) -> Result<(), ImageError> {
        self.check_open()?;
        let header = self.header();

        let generator = {
            let pixels = self.pixels.read().unwrap_or_else(PoisonError::into_inner);
            match &*pixels {
                Pixels::Memory(data) => {
                    copy_rect(data, header.line_size(), header.pel_size(), rect, out);
                    return Ok(());
                }
                Pixels::File(file) => return file.read_rect(&header, rect, out),
                Pixels::Generator(generator) => generator.clone(),
                Pixels::Empty | Pixels::Written => {
                    return Err(ImageError::NoPixels(self.filename.clone()))
                }
            }
        };

        let sequence = match sequence {
            Some(sequence) => sequence,
            None => sequence.insert(
                generator
                    .start()
                    .unwrap_or_else(|e| Box::new(FailedSequence(e)) as Box<dyn Sequence>),
            ),
        };
        sequence.generate(rect, out)
    }

    /// Overwrite the pixels of `rect` in place.
    ///
    /// Supported on read-write native files and on buffer images that hold
    /// pixels. `data` must be packed row-major for exactly `rect`.
    pub fn write_region(&self, rect: Rect, data: &[u8]) -> Result<(), ImageError> {
        self.check_open()?;
        let header = self.header();
        header.validate(&self.filename)?;

        let bounds = Rect::new(0, 0, header.width, header.height);
        if rect.is_empty() || !bounds.contains(&rect) {
            return Err(ImageError::BadRegion {
                filename: self.filename.clone(),
                reason: format!("{rect:?} is not inside {}x{}", header.width, header.height),
            });
        }
        if data.len() as u64 != rect.area() * header.pel_size() as u64 {
            return Err(ImageError::BadRegion {
                filename: self.filename.clone(),
                reason: format!("{} bytes of data for {rect:?}", data.len()),
            });
        }

        let mut pixels = self.pixels.write().unwrap_or_else(PoisonError::into_inner);
        match (&mut *pixels, self.kind) {
            (Pixels::File(file), ImageKind::MmapRw) => file.write_rect(&header, rect, data),
            (Pixels::Memory(buf), ImageKind::Buffer) => {
                let pel_size = header.pel_size();
                let line_size = header.line_size();
                let row_bytes = rect.width as usize * pel_size;
                for (i, y) in (rect.top..rect.bottom()).enumerate() {
                    let start = y as usize * line_size + rect.left as usize * pel_size;
                    buf[start..start + row_bytes]
                        .copy_from_slice(&data[i * row_bytes..(i + 1) * row_bytes]);
                }
                Ok(())
            }
            _ => Err(ImageError::InvalidArgument(format!(
                "\"{}\" is not writable in place",
                self.filename
            ))),
        }
    }

    // -------------------------------------------------------------------------
    // Callbacks
    // -------------------------------------------------------------------------

    /// Run `callback` when the handle is finally torn down.
    pub fn add_close_callback<F>(&self, callback: F)
    where
        F: FnOnce(&Image) -> Result<(), ImageError> + Send + 'static,
    {
        self.callbacks.add_close(Box::new(callback));
    }

    /// Run `callback` at the start of close, while pixels are still readable.
    pub fn add_preclose_callback<F>(&self, callback: F)
    where
        F: FnOnce(&Image) -> Result<(), ImageError> + Send + 'static,
    {
        self.callbacks.add_preclose(Box::new(callback));
    }

    pub fn add_evalstart_callback<F>(&self, callback: F)
    where
        F: FnMut(&Image, &EvalStatus) -> Result<(), ImageError> + Send + 'static,
    {
        self.callbacks.add_eval(EvalPhase::Start, Box::new(callback));
    }

    pub fn add_eval_callback<F>(&self, callback: F)
    where
        F: FnMut(&Image, &EvalStatus) -> Result<(), ImageError> + Send + 'static,
    {
        self.callbacks
            .add_eval(EvalPhase::Progress, Box::new(callback));
    }

    pub fn add_evalend_callback<F>(&self, callback: F)
    where
        F: FnMut(&Image, &EvalStatus) -> Result<(), ImageError> + Send + 'static,
    {
        self.callbacks.add_eval(EvalPhase::End, Box::new(callback));
    }

    // -------------------------------------------------------------------------
    // Close
    // -------------------------------------------------------------------------

    /// Close the handle.
    ///
    /// Fires the preclose callbacks, releases the pixel source, fires the
    /// close callbacks and leaves the open set. Every step runs even if an
    /// earlier one fails; the first failure is returned. Closing an already
    /// closed handle does nothing.
    pub fn close(&self) -> Result<(), ImageError> {
        if self.close_started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!("closing {} ({})", self.filename, self.id);

        let mut result = self.callbacks.fire_preclose(self);

        self.closed.store(true, Ordering::SeqCst);
        let pixels = std::mem::replace(
            &mut *self.pixels.write().unwrap_or_else(PoisonError::into_inner),
            Pixels::Empty,
        );
        let unwritten = self.kind == ImageKind::OpenOut && !matches!(pixels, Pixels::Written);
        drop(pixels);

        let close = self.callbacks.fire_close(self);
        if result.is_ok() {
            result = close;
        }

        registry::remove(self.id);

        if unwritten && result.is_ok() {
            result = Err(ImageError::NothingWritten(self.filename.clone()));
        }
        result
    }

    fn check_open(&self) -> Result<(), ImageError> {
        if self.is_closed() {
            Err(ImageError::Closed(self.filename.clone()))
        } else {
            Ok(())
        }
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("error closing {} on drop: {}", self.filename, e);
        }
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("kind", &self.kind)
            .field("header", &self.header())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
