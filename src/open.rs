//! The open dispatcher.
//!
//! [`open`] turns a filename and an access mode into an image handle:
//!
//! | mode  | handle                                                      |
//! |-------|-------------------------------------------------------------|
//! | `r`   | read, format chosen by magic bytes or suffix                |
//! | `rw`  | read, with in-place writes (native files only)              |
//! | `w`   | write, format chosen by suffix                              |
//! | `t`   | temporary in-memory buffer                                  |
//! | `p`   | partial image, pixels computed on demand                    |
//!
//! Only the first character of the mode is significant, except that a read
//! mode whose second character is `w` asks for read-write access.

use std::fs::File;
use std::io::Read;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::config;
use crate::error::ImageError;
use crate::format::detect::MAGIC_BYTES;
use crate::format::{find_reader, find_writer, Probe, WriteTarget};
use crate::image::Image;
use crate::pipeline::{attach_progress, open_delayed_save, progress_enabled};

static INIT: OnceCell<()> = OnceCell::new();

/// One-time process setup: settings from the environment and the global
/// worker pool.
fn init() {
    INIT.get_or_init(|| {
        let settings = config::settings();
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.concurrency)
            .build_global()
        {
            debug!("worker pool not configured: {}", e);
        }
    });
}

/// Split `name:options` into the path and the option string.
///
/// The split is at the `:` that directly follows the filename suffix, so
/// options may themselves contain colons (`a.csv:skip:2,sep:;`). A colon
/// in the second column is a Windows drive letter and is never a split.
pub fn split_filename(filename: &str) -> (&str, &str) {
    let bytes = filename.as_bytes();
    let after_suffix = |colon: usize| {
        let suffix_start = bytes[..colon]
            .iter()
            .rposition(|b| !b.is_ascii_alphanumeric())
            .unwrap_or(0);
        suffix_start > 0 && bytes[suffix_start] == b'.'
    };

    match filename
        .match_indices(':')
        .map(|(i, _)| i)
        .rev()
        .find(|&i| after_suffix(i))
    {
        Some(i) if i != 1 => (&filename[..i], &filename[i + 1..]),
        _ => (filename, ""),
    }
}

/// Open an image.
///
/// See the module docs for the modes. Read opens look only at the header;
/// pixels are decoded when first pulled. Write opens to an encoded format
/// encode when the handle is closed, so encoder errors come back from
/// [`Image::close`].
///
/// # Errors
///
/// - [`ImageError::InvalidArgument`] for an empty filename or mode
/// - [`ImageError::NotReadable`] if a read source can't be opened
/// - [`ImageError::UnsupportedFormat`] if no reader claims the file
/// - [`ImageError::UnknownSuffix`] if no writer matches the suffix
/// - [`ImageError::BadMode`] for any other mode
/// - anything the chosen reader fails with
pub fn open(filename: &str, mode: &str) -> Result<Arc<Image>, ImageError> {
    init();

    if filename.is_empty() || mode.is_empty() {
        return Err(ImageError::InvalidArgument(
            "NULL filename or mode".to_string(),
        ));
    }

    let mut tags = mode.chars();
    let image = match tags.next() {
        Some('r') => open_read(filename, tags.next() == Some('w'))?,
        Some('w') => open_write(filename)?,
        Some('t') => Image::buffer(filename),
        Some('p') => Image::partial(filename),
        _ => return Err(ImageError::BadMode(mode.to_string())),
    };

    if progress_enabled() {
        attach_progress(&image);
    }
    Ok(image)
}

/// Open `filename` for reading; the header is available straight away.
pub fn open_header(filename: &str) -> Result<Arc<Image>, ImageError> {
    open(filename, "r")
}

fn open_read(filename: &str, read_write: bool) -> Result<Arc<Image>, ImageError> {
    let (path, _) = split_filename(filename);

    let mut file = File::open(path).map_err(|_| ImageError::NotReadable(path.to_string()))?;
    let mut magic = Vec::with_capacity(MAGIC_BYTES);
    file.by_ref()
        .take(MAGIC_BYTES as u64)
        .read_to_end(&mut magic)
        .map_err(|_| ImageError::NotReadable(path.to_string()))?;
    drop(file);

    let probe = Probe {
        path,
        magic: &magic,
        read_write,
    };
    let format =
        find_reader(&probe).ok_or_else(|| ImageError::UnsupportedFormat(filename.to_string()))?;

    debug!("opening {} as {}", filename, format.name());
    format.open(filename)
}

fn open_write(filename: &str) -> Result<Arc<Image>, ImageError> {
    let (path, _) = split_filename(filename);

    match find_writer(path) {
        Some(WriteTarget::Native) => {
            debug!("writing {} as native", path);
            Ok(Image::open_out(path))
        }
        Some(WriteTarget::Delayed(format)) => {
            debug!("writing {} as {}, at close", filename, format.name());
            open_delayed_save(filename, format)
        }
        None => Err(ImageError::UnknownSuffix(filename.to_string())),
    }
}
