//! Image header: geometry, sample format, coding and byte order.
//!
//! Every handle carries one [`Header`]. Readers fill it in before any pixel
//! is requested; [`Header::validate`] is the gate that all pixel access goes
//! through.

use std::fmt;

use serde::Serialize;

use crate::error::ImageError;
use crate::io::ByteOrder;

// =============================================================================
// BandFormat
// =============================================================================

/// Numeric type of one band element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BandFormat {
    /// Not yet determined (handle under construction)
    NotSet,
    UChar,
    Char,
    UShort,
    Short,
    UInt,
    Int,
    Float,
    /// Pair of f32 (real, imaginary)
    Complex,
    Double,
    /// Pair of f64 (real, imaginary)
    DpComplex,
}

impl BandFormat {
    /// Decode the on-disk code used by the native format.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            -1 => BandFormat::NotSet,
            0 => BandFormat::UChar,
            1 => BandFormat::Char,
            2 => BandFormat::UShort,
            3 => BandFormat::Short,
            4 => BandFormat::UInt,
            5 => BandFormat::Int,
            6 => BandFormat::Float,
            7 => BandFormat::Complex,
            8 => BandFormat::Double,
            9 => BandFormat::DpComplex,
            _ => return None,
        })
    }

    /// On-disk code used by the native format.
    pub const fn code(self) -> i32 {
        match self {
            BandFormat::NotSet => -1,
            BandFormat::UChar => 0,
            BandFormat::Char => 1,
            BandFormat::UShort => 2,
            BandFormat::Short => 3,
            BandFormat::UInt => 4,
            BandFormat::Int => 5,
            BandFormat::Float => 6,
            BandFormat::Complex => 7,
            BandFormat::Double => 8,
            BandFormat::DpComplex => 9,
        }
    }

    /// Size in bytes of one band element.
    pub const fn size(self) -> usize {
        match self {
            BandFormat::NotSet => 0,
            BandFormat::UChar | BandFormat::Char => 1,
            BandFormat::UShort | BandFormat::Short => 2,
            BandFormat::UInt | BandFormat::Int | BandFormat::Float => 4,
            BandFormat::Complex | BandFormat::Double => 8,
            BandFormat::DpComplex => 16,
        }
    }

    /// Width of the unit that has to be byte-swapped.
    ///
    /// Complex formats swap each component on its own.
    pub const fn swap_size(self) -> usize {
        match self {
            BandFormat::Complex => 4,
            BandFormat::DpComplex => 8,
            other => other.size(),
        }
    }

    /// Bits per band element, as stored in the native header.
    pub const fn bits(self) -> u32 {
        (self.size() * 8) as u32
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, BandFormat::Complex | BandFormat::DpComplex)
    }
}

// =============================================================================
// Coding
// =============================================================================

/// Pixel coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Coding {
    NotSet,
    /// Plain band-interleaved samples
    None,
    /// Packed LAB: 4 bytes per pixel, byte order irrelevant
    LabQ,
}

impl Coding {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Coding::NotSet),
            0 => Some(Coding::None),
            2 => Some(Coding::LabQ),
            _ => None,
        }
    }

    pub const fn code(self) -> i32 {
        match self {
            Coding::NotSet => -1,
            Coding::None => 0,
            Coding::LabQ => 2,
        }
    }
}

// =============================================================================
// Interpretation
// =============================================================================

/// Colour-space hint.
///
/// Codes this crate does not know are carried as [`Interpretation::Other`]
/// so files written by newer tools still open; the sanity checker reports
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Interpretation {
    Multiband,
    BW,
    Histogram,
    Xyz,
    Lab,
    Cmyk,
    LabQ,
    Rgb,
    Lch,
    LabS,
    Srgb,
    Yxy,
    Fourier,
    Rgb16,
    Grey16,
    Other(i32),
}

impl Interpretation {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Interpretation::Multiband,
            1 => Interpretation::BW,
            10 => Interpretation::Histogram,
            12 => Interpretation::Xyz,
            13 => Interpretation::Lab,
            15 => Interpretation::Cmyk,
            16 => Interpretation::LabQ,
            17 => Interpretation::Rgb,
            19 => Interpretation::Lch,
            21 => Interpretation::LabS,
            22 => Interpretation::Srgb,
            23 => Interpretation::Yxy,
            24 => Interpretation::Fourier,
            25 => Interpretation::Rgb16,
            26 => Interpretation::Grey16,
            other => Interpretation::Other(other),
        }
    }

    pub const fn code(self) -> i32 {
        match self {
            Interpretation::Multiband => 0,
            Interpretation::BW => 1,
            Interpretation::Histogram => 10,
            Interpretation::Xyz => 12,
            Interpretation::Lab => 13,
            Interpretation::Cmyk => 15,
            Interpretation::LabQ => 16,
            Interpretation::Rgb => 17,
            Interpretation::Lch => 19,
            Interpretation::LabS => 21,
            Interpretation::Srgb => 22,
            Interpretation::Yxy => 23,
            Interpretation::Fourier => 24,
            Interpretation::Rgb16 => 25,
            Interpretation::Grey16 => 26,
            Interpretation::Other(code) => code,
        }
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, Interpretation::Other(_))
    }
}

// =============================================================================
// Header
// =============================================================================

/// Format metadata of an image handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub bands: u32,
    pub format: BandFormat,
    pub coding: Coding,
    pub interpretation: Interpretation,
    /// Horizontal resolution, pixels per millimetre
    pub xres: f64,
    /// Vertical resolution, pixels per millimetre
    pub yres: f64,
    pub xoffset: i32,
    pub yoffset: i32,
    /// Byte order of the stored pixel data
    pub byte_order: ByteOrder,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            bands: 0,
            format: BandFormat::NotSet,
            coding: Coding::NotSet,
            interpretation: Interpretation::Multiband,
            xres: 1.0,
            yres: 1.0,
            xoffset: 0,
            yoffset: 0,
            byte_order: ByteOrder::native(),
        }
    }
}

impl Header {
    /// Uncoded header in native byte order.
    pub fn new(width: u32, height: u32, bands: u32, format: BandFormat) -> Self {
        Self {
            width,
            height,
            bands,
            format,
            coding: Coding::None,
            ..Self::default()
        }
    }

    pub fn with_interpretation(mut self, interpretation: Interpretation) -> Self {
        self.interpretation = interpretation;
        self
    }

    pub fn with_coding(mut self, coding: Coding) -> Self {
        self.coding = coding;
        self
    }

    pub fn with_resolution(mut self, xres: f64, yres: f64) -> Self {
        self.xres = xres;
        self.yres = yres;
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Bytes per band element.
    pub fn sample_size(&self) -> usize {
        self.format.size()
    }

    /// Bytes per pixel.
    pub fn pel_size(&self) -> usize {
        self.bands as usize * self.format.size()
    }

    /// Bytes per scanline.
    pub fn line_size(&self) -> usize {
        self.pel_size() * self.width as usize
    }

    /// Bytes for the whole image.
    pub fn image_size(&self) -> u64 {
        self.line_size() as u64 * self.height as u64
    }

    /// Check that the header describes pixels a consumer can read.
    pub fn validate(&self, filename: &str) -> Result<(), ImageError> {
        if self.width == 0 || self.height == 0 || self.bands == 0 {
            return Err(ImageError::bad_header(filename, "bad dimensions"));
        }
        if self.format == BandFormat::NotSet {
            return Err(ImageError::bad_header(filename, "band format not set"));
        }
        match self.coding {
            Coding::NotSet => Err(ImageError::bad_header(filename, "coding not set")),
            Coding::LabQ if self.bands != 4 || self.format != BandFormat::UChar => Err(
                ImageError::bad_header(filename, "LabQ coding needs 4 uchar bands"),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "width: {}", self.width)?;
        writeln!(f, "height: {}", self.height)?;
        writeln!(f, "bands: {}", self.bands)?;
        writeln!(f, "format: {:?}", self.format)?;
        writeln!(f, "coding: {:?}", self.coding)?;
        writeln!(f, "interpretation: {:?}", self.interpretation)?;
        writeln!(f, "resolution: {} x {} pixels/mm", self.xres, self.yres)?;
        writeln!(f, "offset: {}, {}", self.xoffset, self.yoffset)?;
        write!(f, "byte order: {:?}", self.byte_order)
    }
}
