//! Bridge to the `image` crate.
//!
//! Headers come from [`ImageReader::into_decoder`], which parses only the
//! file header. Pixels are decoded in one go into native-order samples.
//! Saving evaluates the whole image and hands it to an encoder as a
//! [`DynamicImage`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::sync::Arc;

use ::image::{
    ColorType, DynamicImage, ImageBuffer, ImageDecoder, ImageFormat, ImageReader, Limits,
    Luma, LumaA, Rgb, Rgba,
};

use crate::error::{ImageError, IoError};
use crate::image::{BandFormat, Coding, Header, Image, Interpretation};
use crate::open::split_filename;

/// Which decoder to use for a file.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Decoder {
    /// A known format
    Known(ImageFormat),
    /// A known format, allocating at most this many bytes while decoding
    Bounded(ImageFormat, u64),
    /// Whatever the leading bytes say
    Guess,
}

fn reader(
    name: &'static str,
    path: &str,
    decoder: Decoder,
) -> Result<ImageReader<BufReader<File>>, ImageError> {
    let mut reader =
        ImageReader::open(path).map_err(|e| ImageError::Io(IoError::os(path, e)))?;
    match decoder {
        Decoder::Known(format) => reader.set_format(format),
        Decoder::Bounded(format, max_alloc) => {
            reader.set_format(format);
            let mut limits = Limits::default();
            limits.max_alloc = Some(max_alloc);
            reader.limits(limits);
        }
        Decoder::Guess => {
            reader = reader
                .with_guessed_format()
                .map_err(|e| ImageError::Io(IoError::os(path, e)))?;
            reader.no_limits();
        }
    }
    if reader.format().is_none() {
        return Err(ImageError::codec(name, "unrecognised file"));
    }
    Ok(reader)
}

/// Bands, band format and interpretation for a decoded colour type.
fn layout(name: &'static str, color: ColorType) -> Result<(u32, BandFormat, Interpretation), ImageError> {
    Ok(match color {
        ColorType::L8 => (1, BandFormat::UChar, Interpretation::BW),
        ColorType::La8 => (2, BandFormat::UChar, Interpretation::BW),
        ColorType::Rgb8 => (3, BandFormat::UChar, Interpretation::Srgb),
        ColorType::Rgba8 => (4, BandFormat::UChar, Interpretation::Srgb),
        ColorType::L16 => (1, BandFormat::UShort, Interpretation::Grey16),
        ColorType::La16 => (2, BandFormat::UShort, Interpretation::Grey16),
        ColorType::Rgb16 => (3, BandFormat::UShort, Interpretation::Rgb16),
        ColorType::Rgba16 => (4, BandFormat::UShort, Interpretation::Rgb16),
        ColorType::Rgb32F => (3, BandFormat::Float, Interpretation::Rgb),
        ColorType::Rgba32F => (4, BandFormat::Float, Interpretation::Rgb),
        other => {
            return Err(ImageError::codec(
                name,
                format!("unsupported colour type {other:?}"),
            ))
        }
    })
}

fn header_for(
    name: &'static str,
    width: u32,
    height: u32,
    color: ColorType,
) -> Result<Header, ImageError> {
    let (bands, format, interpretation) = layout(name, color)?;
    Ok(Header::new(width, height, bands, format).with_interpretation(interpretation))
}

/// Read just the header of `filename` into `image`.
pub(crate) fn read_header(
    name: &'static str,
    filename: &str,
    decoder: Decoder,
    image: &Image,
) -> Result<(), ImageError> {
    let (path, _) = split_filename(filename);
    let decoder = reader(name, path, decoder)?
        .into_decoder()
        .map_err(|e| ImageError::codec(name, e))?;

    let (width, height) = decoder.dimensions();
    let header = header_for(name, width, height, decoder.color_type())?;
    image.set_header(header)
}

/// Decode every pixel of `filename` into the buffer handle `image`.
pub(crate) fn load(
    name: &'static str,
    filename: &str,
    decoder: Decoder,
    image: &Arc<Image>,
) -> Result<(), ImageError> {
    let (path, _) = split_filename(filename);
    let decoded = reader(name, path, decoder)?
        .decode()
        .map_err(|e| ImageError::codec(name, e))?;

    let header = header_for(name, decoded.width(), decoded.height(), decoded.color())?;
    image.set_pixels(header, decoded.as_bytes().to_vec())
}

/// Evaluate `image` and wrap the pixels for an encoder.
pub(crate) fn to_dynamic(name: &'static str, image: &Arc<Image>) -> Result<DynamicImage, ImageError> {
    let header = image.header();
    header
        .validate(image.filename())
        .map_err(|e| ImageError::codec(name, e))?;
    if header.coding != Coding::None {
        return Err(ImageError::codec(name, "can only save uncoded images"));
    }

    let data = image.write_to_memory()?;
    let (width, height) = (header.width, header.height);
    let too_small = || ImageError::codec(name, "pixel buffer too small");

    let dynamic = match (header.format, header.bands) {
        (BandFormat::UChar, 1) => DynamicImage::ImageLuma8(
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data).ok_or_else(too_small)?,
        ),
        (BandFormat::UChar, 2) => DynamicImage::ImageLumaA8(
            ImageBuffer::<LumaA<u8>, _>::from_raw(width, height, data).ok_or_else(too_small)?,
        ),
        (BandFormat::UChar, 3) => DynamicImage::ImageRgb8(
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data).ok_or_else(too_small)?,
        ),
        (BandFormat::UChar, 4) => DynamicImage::ImageRgba8(
            ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, data).ok_or_else(too_small)?,
        ),
        (BandFormat::UShort, bands) => {
            let samples: Vec<u16> = data
                .chunks_exact(2)
                .map(|c| u16::from_ne_bytes([c[0], c[1]]))
                .collect();
            match bands {
                1 => DynamicImage::ImageLuma16(
                    ImageBuffer::from_raw(width, height, samples).ok_or_else(too_small)?,
                ),
                2 => DynamicImage::ImageLumaA16(
                    ImageBuffer::from_raw(width, height, samples).ok_or_else(too_small)?,
                ),
                3 => DynamicImage::ImageRgb16(
                    ImageBuffer::from_raw(width, height, samples).ok_or_else(too_small)?,
                ),
                4 => DynamicImage::ImageRgba16(
                    ImageBuffer::from_raw(width, height, samples).ok_or_else(too_small)?,
                ),
                _ => return Err(unsupported(name, &header)),
            }
        }
        (BandFormat::Float, bands @ (3 | 4)) => {
            let samples: Vec<f32> = data
                .chunks_exact(4)
                .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            if bands == 3 {
                DynamicImage::ImageRgb32F(
                    ImageBuffer::from_raw(width, height, samples).ok_or_else(too_small)?,
                )
            } else {
                DynamicImage::ImageRgba32F(
                    ImageBuffer::from_raw(width, height, samples).ok_or_else(too_small)?,
                )
            }
        }
        _ => return Err(unsupported(name, &header)),
    };

    Ok(dynamic)
}

fn unsupported(name: &'static str, header: &Header) -> ImageError {
    ImageError::codec(
        name,
        format!(
            "can't save {} band {:?} images",
            header.bands, header.format
        ),
    )
}

/// Create `path` and run `write` against a buffered writer on it.
pub(crate) fn write_file<F>(name: &'static str, path: &str, write: F) -> Result<(), ImageError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), ImageError>,
{
    let file = File::create(path).map_err(|e| ImageError::Io(IoError::os(path, e)))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush().map_err(|e| ImageError::codec(name, e))
}
