//! # lazy-image-io
//!
//! Open image files as handles whose pixels are produced on demand.
//!
//! Given a filename and an access mode, [`open`] recognizes the file format
//! and returns an [`Image`]. Reading a header is cheap: pixels are decoded
//! the first time something pulls a region. Writing to an encoded format is
//! deferred to [`Image::close`], which runs the encoder over whatever was
//! attached to the handle. Native files written on a machine of the other
//! byte order are swapped to platform order as they are read.
//!
//! ## Features
//!
//! - **Format dispatch**: magic-byte and suffix recognizers in a fixed order
//! - **Lazy decode**: header at open, pixels at first pull, once per handle
//! - **Delayed save**: TIFF, JPEG, PNG, PPM and CSV encoded at close
//! - **Native format**: read in place through a block cache, written as a
//!   stream, byte order normalized on read
//! - **Lifecycle callbacks**: close, preclose and eval hooks on every handle
//! - **Sanity checker**: consistency checks on any handle
//!
//! ## Architecture
//!
//! - [`mod@open`] - mode parsing and format dispatch
//! - [`mod@format`] - recognizers, readers and writers per format
//! - [`pipeline`] - lazy decode, delayed save, byte-order swap, progress
//! - [`mod@image`] - handles, headers, regions and the pull protocol
//! - [`io`] - positioned file reads and block caching
//! - [`config`] - process settings and CLI types
//! - [`sanity`] - descriptor checks
//!
//! ## Example
//!
//! ```rust,no_run
//! use lazy_image_io::{open, ImageError};
//!
//! fn convert() -> Result<(), ImageError> {
//!     let input = open("photo.jpg", "r")?;
//!     println!("{}x{}", input.width(), input.height());
//!
//!     let output = open("photo.tif", "w")?;
//!     lazy_image_io::copy(&input, &output)?;
//!     output.close()?;
//!     input.close()
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod image;
pub mod io;
pub mod open;
pub mod pipeline;
pub mod sanity;

// Re-export commonly used types
pub use crate::config::{configure, settings, Settings};
pub use crate::error::{ImageError, IoError};
pub use crate::image::{
    copy, copy_swap, registry, BandFormat, Coding, EvalStatus, Generate, Header, Image,
    ImageKind, Interpretation, Rect, Region, Sequence,
};
pub use crate::io::ByteOrder;
pub use crate::open::{open, open_header, split_filename};
pub use crate::pipeline::{
    open_delayed_save, open_lazy, progress_enabled, read_native, set_progress,
};
