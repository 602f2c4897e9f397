use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use serde::Serialize;

use crate::error::IoError;

/// Trait for reading byte ranges from a local resource.
///
/// Native-format handles read their pixels through this abstraction so that
/// pixel access never requires loading the whole file. Implementations must
/// be thread-safe: region pulls arrive from several workers at once.
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Get the total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Get a unique identifier for this resource (for logging).
    fn identifier(&self) -> &str;
}

// =============================================================================
// FileRangeReader
// =============================================================================

/// Positioned access to a file on disk.
///
/// The file sits behind a mutex so seek+read pairs stay atomic. Files opened
/// with [`FileRangeReader::open_rw`] also accept in-place writes.
pub struct FileRangeReader {
    file: Mutex<File>,
    path: String,
    size: u64,
    writable: bool,
}

impl FileRangeReader {
    /// Open a file read-only.
    pub fn open(path: &str) -> Result<Self, IoError> {
        let file = File::open(path).map_err(|e| IoError::os(path, e))?;
        Self::from_file(file, path, false)
    }

    /// Open a file for reading and in-place writing.
    pub fn open_rw(path: &str) -> Result<Self, IoError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| IoError::os(path, e))?;
        Self::from_file(file, path, true)
    }

    fn from_file(file: File, path: &str, writable: bool) -> Result<Self, IoError> {
        let size = file.metadata().map_err(|e| IoError::os(path, e))?.len();
        Ok(Self {
            file: Mutex::new(file),
            path: path.to_string(),
            size,
            writable,
        })
    }

    /// Whether this reader accepts writes.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Overwrite `data.len()` bytes at `offset`. The file never grows.
    pub fn write_all_at(&self, offset: u64, data: &[u8]) -> Result<(), IoError> {
        if !self.writable {
            return Err(IoError::ReadOnly(self.path.clone()));
        }
        if offset + data.len() as u64 > self.size {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: data.len() as u64,
                size: self.size,
            });
        }

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.write_all(data))
            .map_err(|e| IoError::os(&self.path, e))
    }
}

impl RangeReader for FileRangeReader {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        if offset + len as u64 > self.size {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }

        let mut buf = vec![0u8; len];
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|e| IoError::os(&self.path, e))?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.path
    }
}

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of stored image data or file headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteOrder {
    /// Least significant byte first (Intel)
    LittleEndian,
    /// Most significant byte first (Motorola, SPARC)
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the machine we are running on.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    /// Whether this is the platform's own order.
    #[inline]
    pub fn is_native(self) -> bool {
        self == Self::native()
    }

    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    /// Read an i16 from a byte slice using this byte order.
    #[inline]
    pub fn read_i16(self, bytes: &[u8]) -> i16 {
        self.read_u16(bytes) as i16
    }

    /// Read an i32 from a byte slice using this byte order.
    #[inline]
    pub fn read_i32(self, bytes: &[u8]) -> i32 {
        self.read_u32(bytes) as i32
    }

    /// Read an f32 from a byte slice using this byte order.
    #[inline]
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        f32::from_bits(self.read_u32(bytes))
    }
}

// =============================================================================
// Endian Helper Functions
// =============================================================================

/// Read a little-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Read a big-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a big-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Reverse every `width`-byte group in place.
///
/// Used to bring foreign-order samples into native order. A trailing group
/// shorter than `width` is left untouched.
pub fn swap_in_place(data: &mut [u8], width: usize) {
    if width < 2 {
        return;
    }
    for chunk in data.chunks_exact_mut(width) {
        chunk.reverse();
    }
}
