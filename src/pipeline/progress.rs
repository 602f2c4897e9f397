//! Percent-complete reporting on stdout.
//!
//! When enabled, every handle returned by [`crate::open`] gets eval
//! callbacks that print `<filename>: <n>% complete` with a carriage return
//! whenever the percentage changes, and a newline when evaluation ends.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{ImageError, IoError};
use crate::image::Image;

static PROGRESS: AtomicBool = AtomicBool::new(false);

/// Turn progress reporting on or off for images opened from now on.
pub fn set_progress(enabled: bool) {
    PROGRESS.store(enabled, Ordering::SeqCst);
}

pub fn progress_enabled() -> bool {
    PROGRESS.load(Ordering::SeqCst)
}

/// Progress state of one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    filename: String,
    last_percent: u32,
}

impl Progress {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            last_percent: 0,
        }
    }

    /// Reset at the start of an evaluation.
    pub fn start(&mut self) {
        self.last_percent = 0;
    }

    /// Report `percent`, if it moved. Returns whether anything was written.
    pub fn update(&mut self, percent: u32, out: &mut impl Write) -> io::Result<bool> {
        if percent == self.last_percent {
            return Ok(false);
        }
        self.last_percent = percent;
        write!(out, "{}: {}% complete\r", self.filename, percent)?;
        out.flush()?;
        Ok(true)
    }

    /// Finish the progress line.
    pub fn end(&mut self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out)?;
        out.flush()
    }
}

fn output_error(e: io::Error) -> ImageError {
    ImageError::Io(IoError::os("progress output", e))
}

/// Attach stdout progress reporting to `image`.
pub(crate) fn attach_progress(image: &Image) {
    attach_progress_to(image, io::stdout());
}

/// Attach progress reporting to `image`, written to `out`.
pub(crate) fn attach_progress_to<W>(image: &Image, out: W)
where
    W: Write + Send + 'static,
{
    let state = Arc::new(Mutex::new((Progress::new(image.filename()), out)));

    let s = state.clone();
    image.add_evalstart_callback(move |_, _| {
        s.lock().unwrap_or_else(PoisonError::into_inner).0.start();
        Ok(())
    });

    let s = state.clone();
    image.add_eval_callback(move |_, status| {
        let mut guard = s.lock().unwrap_or_else(PoisonError::into_inner);
        let (progress, out) = &mut *guard;
        progress
            .update(status.percent, out)
            .map(|_| ())
            .map_err(output_error)
    });

    image.add_evalend_callback(move |_, _| {
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        let (progress, out) = &mut *guard;
        progress.end(out).map_err(output_error)
    });
}
