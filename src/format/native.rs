//! Native image format.
//!
//! # Layout
//!
//! A 64-byte header followed by the pixels, band-interleaved and row-major,
//! with no padding.
//!
//! ```text
//! offset  size  field
//!      0     4  magic: 08 F2 A6 B6 (little-endian file)
//!                      B6 A6 F2 08 (big-endian file)
//!      4     4  width            u32
//!      8     4  height           u32
//!     12     4  bands            u32
//!     16     4  bits per sample  u32
//!     20     4  band format      i32
//!     24     4  coding           i32
//!     28     4  interpretation   i32
//!     32     4  x resolution     f32, pixels per mm
//!     36     4  y resolution     f32, pixels per mm
//!     40     4  x offset         i32
//!     44     4  y offset         i32
//!     48    16  reserved, zero
//! ```
//!
//! Header fields and pixels are stored in the byte order the magic names.
//! Files written here are always in the platform's byte order. Reads go
//! straight to the file through a block cache, so opening costs one header
//! read no matter how large the image is.

use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use super::codec::write_file;
use super::{Format, Probe};
use crate::config;
use crate::error::{ImageError, IoError};
use crate::image::{
    BandFormat, Coding, Header, Image, ImageKind, Interpretation, NativeFile, Pixels,
};
use crate::io::{swap_in_place, BlockCache, ByteOrder, FileRangeReader, RangeReader};
use crate::open::split_filename;
use crate::pipeline::read_native;

/// Magic of a file stored little-endian.
pub const MAGIC_LE: [u8; 4] = [0x08, 0xF2, 0xA6, 0xB6];

/// Magic of a file stored big-endian.
pub const MAGIC_BE: [u8; 4] = [0xB6, 0xA6, 0xF2, 0x08];

/// Size of the file header; pixels start here.
pub const HEADER_SIZE: usize = 64;

/// Write suffixes of the native format.
pub const SUFFIXES: &[&str] = &["v", ""];

const NAME: &str = "native";

/// Byte order named by a native magic, if `magic` starts with one.
pub fn magic_byte_order(magic: &[u8]) -> Option<ByteOrder> {
    match magic.get(..4)? {
        m if m == MAGIC_LE => Some(ByteOrder::LittleEndian),
        m if m == MAGIC_BE => Some(ByteOrder::BigEndian),
        _ => None,
    }
}

// =============================================================================
// Header encoding
// =============================================================================

/// Parse a native file header.
pub fn parse_header(bytes: &[u8], filename: &str) -> Result<Header, ImageError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ImageError::bad_header(filename, "file too short"));
    }
    let order = magic_byte_order(bytes)
        .ok_or_else(|| ImageError::bad_header(filename, "bad magic number"))?;

    let u32_at = |offset: usize| order.read_u32(&bytes[offset..offset + 4]);
    let i32_at = |offset: usize| order.read_i32(&bytes[offset..offset + 4]);
    let f32_at = |offset: usize| order.read_f32(&bytes[offset..offset + 4]);

    let format = BandFormat::from_code(i32_at(20)).ok_or_else(|| {
        ImageError::bad_header(filename, format!("bad band format {}", i32_at(20)))
    })?;
    let bbits = u32_at(16);
    if bbits != format.bits() {
        return Err(ImageError::bad_header(
            filename,
            format!("{bbits} bits per sample for {format:?}"),
        ));
    }
    let coding = Coding::from_code(i32_at(24))
        .ok_or_else(|| ImageError::bad_header(filename, format!("bad coding {}", i32_at(24))))?;

    let header = Header {
        width: u32_at(4),
        height: u32_at(8),
        bands: u32_at(12),
        format,
        coding,
        interpretation: Interpretation::from_code(i32_at(28)),
        xres: f32_at(32) as f64,
        yres: f32_at(36) as f64,
        xoffset: i32_at(40),
        yoffset: i32_at(44),
        byte_order: order,
    };

    if header.width == 0 || header.height == 0 || header.bands == 0 {
        return Err(ImageError::bad_header(filename, "bad dimensions"));
    }
    Ok(header)
}

/// Encode `header` in platform byte order.
pub fn encode_header(header: &Header) -> [u8; HEADER_SIZE] {
    let mut bytes = [0u8; HEADER_SIZE];
    let magic = match ByteOrder::native() {
        ByteOrder::LittleEndian => MAGIC_LE,
        ByteOrder::BigEndian => MAGIC_BE,
    };
    bytes[0..4].copy_from_slice(&magic);

    let fields: [[u8; 4]; 11] = [
        header.width.to_ne_bytes(),
        header.height.to_ne_bytes(),
        header.bands.to_ne_bytes(),
        header.format.bits().to_ne_bytes(),
        header.format.code().to_ne_bytes(),
        header.coding.code().to_ne_bytes(),
        header.interpretation.code().to_ne_bytes(),
        (header.xres as f32).to_ne_bytes(),
        (header.yres as f32).to_ne_bytes(),
        header.xoffset.to_ne_bytes(),
        header.yoffset.to_ne_bytes(),
    ];
    for (i, field) in fields.iter().enumerate() {
        let offset = 4 + i * 4;
        bytes[offset..offset + 4].copy_from_slice(field);
    }
    bytes
}

// =============================================================================
// Opening
// =============================================================================

fn open_file(path: &str, reader: FileRangeReader, kind: ImageKind) -> Result<Arc<Image>, ImageError> {
    let bytes = reader.read_exact_at(0, HEADER_SIZE.min(reader.size() as usize))?;
    let header = parse_header(&bytes, path)?;

    let needed = HEADER_SIZE as u64 + header.image_size();
    if reader.size() < needed {
        return Err(ImageError::bad_header(
            path,
            format!("file is {} bytes, expected {}", reader.size(), needed),
        ));
    }

    if kind == ImageKind::MmapRw && header.format.size() != 1 && !header.byte_order.is_native() {
        return Err(ImageError::ReadWriteNotNative(path.to_string()));
    }

    debug!(
        "native {} {}x{}x{} {:?}, {:?}",
        path, header.width, header.height, header.bands, header.format, header.byte_order
    );

    let settings = config::settings();
    let cache = BlockCache::with_capacity(
        reader,
        settings.block_size,
        settings.block_cache_capacity,
    );
    Ok(Image::new(
        path,
        kind,
        header,
        Pixels::File(NativeFile::new(cache, HEADER_SIZE as u64)),
    ))
}

/// Open a native file read-only, as stored.
///
/// The handle reports the file's byte order; see [`read_native`] for the
/// normalizing open.
pub fn open_read(path: &str) -> Result<Arc<Image>, ImageError> {
    open_file(path, FileRangeReader::open(path)?, ImageKind::Mmap)
}

/// Open a native file for in-place reading and writing.
///
/// Refused for files with multi-byte samples stored in foreign byte order.
/// One-byte samples have no byte order and are always accepted.
pub fn open_read_write(path: &str) -> Result<Arc<Image>, ImageError> {
    open_file(path, FileRangeReader::open_rw(path)?, ImageKind::MmapRw)
}

// =============================================================================
// Writing
// =============================================================================

/// Evaluate `image` and write it to `path` as a native file.
///
/// Samples stored in foreign byte order are swapped on the way out.
pub fn write_image(image: &Arc<Image>, path: &str) -> Result<(), ImageError> {
    let header = image.header();
    header.validate(image.filename())?;

    let swap = if header.byte_order.is_native() {
        1
    } else {
        header.format.swap_size()
    };
    let out_header = Header {
        byte_order: ByteOrder::native(),
        ..header
    };
    let io_error = |e: std::io::Error| ImageError::Io(IoError::os(path, e));

    debug!("writing native {} ({} bytes of pixels)", path, header.image_size());

    write_file(NAME, path, |writer| {
        writer
            .write_all(&encode_header(&out_header))
            .map_err(io_error)?;

        let mut swapped = Vec::new();
        image.sink(|_, strip| {
            if swap > 1 {
                swapped.clear();
                swapped.extend_from_slice(strip);
                swap_in_place(&mut swapped, swap);
                writer.write_all(&swapped).map_err(io_error)
            } else {
                writer.write_all(strip).map_err(io_error)
            }
        })
    })
}

// =============================================================================
// Format entries
// =============================================================================

/// Native files opened read-only, through byte-order normalization.
///
/// Both native entries map the file directly in [`Format::open`]; there is
/// no separate header or decode step.
pub struct NativeRead;

/// Native files opened read-write, in place.
pub struct NativeReadWrite;

impl Format for NativeRead {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_a(&self, probe: &Probe<'_>) -> bool {
        !probe.read_write && magic_byte_order(probe.magic).is_some()
    }

    fn open(&'static self, filename: &str) -> Result<Arc<Image>, ImageError> {
        let (path, _) = split_filename(filename);
        read_native(path)
    }
}

impl Format for NativeReadWrite {
    fn name(&self) -> &'static str {
        "native-rw"
    }

    fn is_a(&self, probe: &Probe<'_>) -> bool {
        probe.read_write && magic_byte_order(probe.magic).is_some()
    }

    fn open(&'static self, filename: &str) -> Result<Arc<Image>, ImageError> {
        let (path, _) = split_filename(filename);
        open_read_write(path)
    }
}
