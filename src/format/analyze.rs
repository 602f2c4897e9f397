//! Analyze 7.5 read.
//!
//! An Analyze image is a pair of files: `name.hdr`, a 348-byte header, and
//! `name.img`, the raw voxels. Either name opens the pair. The header's byte
//! order is whichever makes its size field read 348; voxels share it and are
//! swapped to platform order on load. Volumes are stacked vertically, so a
//! `x` by `y` by `z` volume becomes an `x` by `y * z` image.

use std::sync::Arc;

use crate::error::{ImageError, IoError};
use crate::format::detect::suffix_matches;
use crate::format::{Format, Probe};
use crate::image::{BandFormat, Header, Image, Interpretation};
use crate::io::{swap_in_place, ByteOrder, FileRangeReader, RangeReader};
use crate::open::split_filename;

const NAME: &str = "analyze";

/// Size of the header file, also stored as its first field.
pub const HEADER_SIZE: usize = 348;

const SUFFIXES: &[&str] = &["hdr", "img"];

// Field offsets inside the header
const DIM_OFFSET: usize = 40;
const DATATYPE_OFFSET: usize = 70;
const PIXDIM_OFFSET: usize = 76;
const VOX_OFFSET_OFFSET: usize = 108;

/// Header and image paths for either member of a pair.
fn pair_paths(path: &str) -> (String, String) {
    let base = match path.rfind('.') {
        Some(i) if suffix_matches(path, SUFFIXES) => &path[..i],
        _ => path,
    };
    (format!("{base}.hdr"), format!("{base}.img"))
}

/// Byte order that makes the size field read 348.
fn header_byte_order(bytes: &[u8]) -> Option<ByteOrder> {
    let size = bytes.get(..4)?;
    [ByteOrder::LittleEndian, ByteOrder::BigEndian]
        .into_iter()
        .find(|order| order.read_i32(size) == HEADER_SIZE as i32)
}

fn band_format(datatype: i16) -> Option<BandFormat> {
    match datatype {
        2 => Some(BandFormat::UChar),
        4 => Some(BandFormat::Short),
        8 => Some(BandFormat::Int),
        16 => Some(BandFormat::Float),
        64 => Some(BandFormat::Double),
        _ => None,
    }
}

/// What the header says about the voxels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Volume {
    header: Header,
    /// Byte order of the voxel data
    order: ByteOrder,
    /// Start of the voxels in the image file
    vox_offset: u64,
}

fn parse_header(bytes: &[u8], path: &str) -> Result<Volume, ImageError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ImageError::bad_header(path, "Analyze header too short"));
    }
    let order = header_byte_order(bytes)
        .ok_or_else(|| ImageError::bad_header(path, "not an Analyze header"))?;

    let dim = |i: usize| order.read_i16(&bytes[DIM_OFFSET + i * 2..DIM_OFFSET + i * 2 + 2]);
    let pixdim = |i: usize| order.read_f32(&bytes[PIXDIM_OFFSET + i * 4..PIXDIM_OFFSET + i * 4 + 4]);

    let datatype = order.read_i16(&bytes[DATATYPE_OFFSET..DATATYPE_OFFSET + 2]);
    let format = band_format(datatype).ok_or_else(|| {
        ImageError::codec(NAME, format!("unsupported datatype {datatype}"))
    })?;

    let ndims = dim(0);
    let (x, y) = (dim(1), dim(2));
    let z = if ndims >= 3 { dim(3).max(1) } else { 1 };
    if ndims < 2 || x <= 0 || y <= 0 {
        return Err(ImageError::bad_header(path, "bad dimensions"));
    }

    // pixdim is in mm per voxel; resolution is voxels per mm
    let resolution = |mm: f32| if mm > 0.0 { 1.0 / mm as f64 } else { 1.0 };

    let header = Header::new(x as u32, y as u32 * z as u32, 1, format)
        .with_interpretation(Interpretation::Multiband)
        .with_resolution(resolution(pixdim(1)), resolution(pixdim(2)));
    let vox_offset = order
        .read_f32(&bytes[VOX_OFFSET_OFFSET..VOX_OFFSET_OFFSET + 4])
        .max(0.0) as u64;

    Ok(Volume {
        header,
        order,
        vox_offset,
    })
}

fn read_volume(filename: &str) -> Result<(Volume, String), ImageError> {
    let (path, _) = split_filename(filename);
    let (hdr, img) = pair_paths(path);
    let bytes = std::fs::read(&hdr).map_err(|e| ImageError::Io(IoError::os(&hdr, e)))?;
    Ok((parse_header(&bytes, &hdr)?, img))
}

pub struct Analyze;

impl Format for Analyze {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_a(&self, probe: &Probe<'_>) -> bool {
        if !suffix_matches(probe.path, SUFFIXES) {
            return false;
        }
        let (hdr, _) = pair_paths(probe.path);
        FileRangeReader::open(&hdr)
            .and_then(|reader| reader.read_exact_at(0, 4))
            .map(|bytes| header_byte_order(&bytes).is_some())
            .unwrap_or(false)
    }

    fn header(&self, filename: &str, image: &Image) -> Result<(), ImageError> {
        let (volume, _) = read_volume(filename)?;
        image.set_header(volume.header)
    }

    fn load(&self, filename: &str, image: &Arc<Image>) -> Result<(), ImageError> {
        let (volume, img) = read_volume(filename)?;
        let header = volume.header;

        let reader = FileRangeReader::open(&img)?;
        let mut data = reader
            .read_exact_at(volume.vox_offset, header.image_size() as usize)?
            .to_vec();
        if !volume.order.is_native() {
            swap_in_place(&mut data, header.format.swap_size());
        }
        image.set_pixels(header, data)
    }
}
