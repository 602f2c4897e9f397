//! The pull protocol: generators, sequences and the built-in copy operations.
//!
//! A [`Generate`] is attached to a partial image. Each consumer region calls
//! [`Generate::start`] once to get its own [`Sequence`], then asks that
//! sequence for one rectangle at a time.

use std::sync::Arc;

use super::{Header, Image, Rect, Region};
use crate::error::ImageError;
use crate::io::{swap_in_place, ByteOrder};

/// Producer of pixels for a partial image.
pub trait Generate: Send + Sync {
    /// Begin a new consumer sequence.
    fn start(&self) -> Result<Box<dyn Sequence>, ImageError>;
}

/// Per-consumer state of a generator.
pub trait Sequence: Send {
    /// Write the pixels of `rect` into `out`, packed row-major.
    ///
    /// `out` is exactly `rect.area() * pel_size` bytes.
    fn generate(&mut self, rect: Rect, out: &mut [u8]) -> Result<(), ImageError>;
}

/// Copy `input` into `output`, keeping the stored byte order.
pub fn copy(input: &Arc<Image>, output: &Arc<Image>) -> Result<(), ImageError> {
    let header = input.header();
    header.validate(input.filename())?;

    output.generate(
        header,
        Arc::new(CopyGenerator {
            input: input.clone(),
            swap: 1,
        }),
    )
}

/// Copy `input` into `output`, swapping every sample into native byte order.
pub fn copy_swap(input: &Arc<Image>, output: &Arc<Image>) -> Result<(), ImageError> {
    let header = input.header();
    header.validate(input.filename())?;

    let swap = if header.byte_order.is_native() {
        1
    } else {
        header.format.swap_size()
    };
    let out_header = Header {
        byte_order: ByteOrder::native(),
        ..header
    };

    output.generate(
        out_header,
        Arc::new(CopyGenerator {
            input: input.clone(),
            swap,
        }),
    )
}

/// Stand-in sequence for a consumer whose start failed.
///
/// Keeps the consumer failing with the start error instead of retrying the
/// start on every later pull.
pub(crate) struct FailedSequence(pub(crate) ImageError);

impl Sequence for FailedSequence {
    fn generate(&mut self, _rect: Rect, _out: &mut [u8]) -> Result<(), ImageError> {
        Err(self.0.clone())
    }
}

struct CopyGenerator {
    input: Arc<Image>,
    swap: usize,
}

impl Generate for CopyGenerator {
    fn start(&self) -> Result<Box<dyn Sequence>, ImageError> {
        Ok(Box::new(CopySequence {
            region: self.input.region(),
            swap: self.swap,
        }))
    }
}

struct CopySequence {
    region: Region,
    swap: usize,
}

impl Sequence for CopySequence {
    fn generate(&mut self, rect: Rect, out: &mut [u8]) -> Result<(), ImageError> {
        self.region.prepare(rect)?;
        out.copy_from_slice(self.region.data());
        swap_in_place(out, self.swap);
        Ok(())
    }
}
