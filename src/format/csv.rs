//! CSV read and write.
//!
//! Reading produces a one-band image of doubles, one image row per text
//! line. Read options, comma separated:
//!
//! - `skip:N` - ignore the first N lines (default 0)
//! - `line:N` - read at most N lines; -1 means all (default -1)
//! - `whi:<chars>` - characters trimmed from fields (default space and `"`)
//! - `sep:<chars>` - field separators (default `;`, tab, and `,`)
//!
//! Writing takes one-band uncoded images only; values are tab-separated
//! unless `sep:<chars>` says otherwise.

use std::io::Write;
use std::sync::Arc;

use super::codec::write_file;
use super::detect::suffix_matches;
use super::{parse_options, Format, Probe};
use crate::error::{ImageError, IoError};
use crate::image::{BandFormat, Coding, Header, Image, Interpretation};
use crate::open::split_filename;

const NAME: &str = "csv";

const SUFFIXES: &[&str] = &["csv"];

const DEFAULT_WHITESPACE: &str = " \"";
const DEFAULT_SEPARATORS: &str = ";,\t";
const DEFAULT_WRITE_SEPARATOR: &str = "\t";

// =============================================================================
// Reading
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct ReadOptions {
    skip: usize,
    lines: Option<usize>,
    whitespace: String,
    separators: String,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            lines: None,
            whitespace: DEFAULT_WHITESPACE.to_string(),
            separators: DEFAULT_SEPARATORS.to_string(),
        }
    }
}

impl ReadOptions {
    fn parse(options: &str) -> Result<Self, ImageError> {
        let mut parsed = Self::default();
        for (key, value) in parse_options(options) {
            match key {
                "skip" => {
                    parsed.skip = value
                        .parse()
                        .map_err(|_| ImageError::codec(NAME, format!("bad skip \"{value}\"")))?
                }
                "line" => {
                    let lines: i64 = value
                        .parse()
                        .map_err(|_| ImageError::codec(NAME, format!("bad line \"{value}\"")))?;
                    parsed.lines = usize::try_from(lines).ok();
                }
                "whi" => parsed.whitespace = value.to_string(),
                "sep" => parsed.separators = value.to_string(),
                other => {
                    return Err(ImageError::codec(NAME, format!("unknown option \"{other}\"")))
                }
            }
        }
        Ok(parsed)
    }
}

/// A parsed table: width, height and the values row by row.
struct Table {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

fn parse_table(text: &str, options: &ReadOptions) -> Result<Table, ImageError> {
    let is_white = |c: char| options.whitespace.contains(c) || c == '\r';
    let is_sep = |c: char| options.separators.contains(c);

    let lines = text
        .lines()
        .skip(options.skip)
        .take(options.lines.unwrap_or(usize::MAX))
        .map(|line| line.trim_matches(is_white))
        .filter(|line| !line.is_empty());

    let mut width = 0usize;
    let mut height = 0usize;
    let mut values = Vec::new();
    for line in lines {
        let before = values.len();
        for field in line.split(is_sep) {
            let field = field.trim_matches(is_white);
            let value = if field.is_empty() {
                0.0
            } else {
                field.parse::<f64>().map_err(|_| {
                    ImageError::codec(
                        NAME,
                        format!("bad number \"{}\" on row {}", field, height + 1),
                    )
                })?
            };
            values.push(value);
        }

        let fields = values.len() - before;
        if height == 0 {
            width = fields;
        } else if fields != width {
            return Err(ImageError::codec(
                NAME,
                format!("row {} has {} fields, expected {}", height + 1, fields, width),
            ));
        }
        height += 1;
    }

    if width == 0 || height == 0 {
        return Err(ImageError::codec(NAME, "no values"));
    }
    Ok(Table {
        width: width as u32,
        height: height as u32,
        values,
    })
}

fn read_table(filename: &str) -> Result<Table, ImageError> {
    let (path, options) = split_filename(filename);
    let options = ReadOptions::parse(options)?;
    let text =
        std::fs::read_to_string(path).map_err(|e| ImageError::Io(IoError::os(path, e)))?;
    parse_table(&text, &options)
}

fn table_header(table: &Table) -> Header {
    Header::new(table.width, table.height, 1, BandFormat::Double)
        .with_interpretation(Interpretation::BW)
}

// =============================================================================
// Writing
// =============================================================================

/// Text form of one native-order sample.
fn format_sample(format: BandFormat, bytes: &[u8]) -> String {
    let array = |n: usize| {
        let mut buf = [0u8; 8];
        buf[..n].copy_from_slice(&bytes[..n]);
        buf
    };
    match format {
        BandFormat::UChar => bytes[0].to_string(),
        BandFormat::Char => (bytes[0] as i8).to_string(),
        BandFormat::UShort => {
            let b = array(2);
            u16::from_ne_bytes([b[0], b[1]]).to_string()
        }
        BandFormat::Short => {
            let b = array(2);
            i16::from_ne_bytes([b[0], b[1]]).to_string()
        }
        BandFormat::UInt => {
            let b = array(4);
            u32::from_ne_bytes([b[0], b[1], b[2], b[3]]).to_string()
        }
        BandFormat::Int => {
            let b = array(4);
            i32::from_ne_bytes([b[0], b[1], b[2], b[3]]).to_string()
        }
        BandFormat::Float => {
            let b = array(4);
            f32::from_ne_bytes([b[0], b[1], b[2], b[3]]).to_string()
        }
        BandFormat::Double => f64::from_ne_bytes(array(8)).to_string(),
        BandFormat::Complex | BandFormat::DpComplex | BandFormat::NotSet => String::new(),
    }
}

fn save_csv(image: &Arc<Image>, filename: &str) -> Result<(), ImageError> {
    let (path, options) = split_filename(filename);
    let mut separator = DEFAULT_WRITE_SEPARATOR.to_string();
    for (key, value) in parse_options(options) {
        match key {
            "sep" => separator = value.to_string(),
            other => {
                return Err(ImageError::codec(NAME, format!("unknown option \"{other}\"")))
            }
        }
    }

    let header = image.header();
    header
        .validate(image.filename())
        .map_err(|e| ImageError::codec(NAME, e))?;
    if header.bands != 1 || header.coding != Coding::None || header.format.is_complex() {
        return Err(ImageError::codec(
            NAME,
            "can only save one-band uncoded real images",
        ));
    }
    if !header.byte_order.is_native() {
        return Err(ImageError::codec(NAME, "can only save native byte order images"));
    }

    let sample = header.sample_size();
    let row_bytes = header.line_size();
    let io_error = |e: std::io::Error| ImageError::Io(IoError::os(path, e));

    write_file(NAME, path, |writer| {
        image.sink(|_, strip| {
            for row in strip.chunks_exact(row_bytes) {
                let line = row
                    .chunks_exact(sample)
                    .map(|s| format_sample(header.format, s))
                    .collect::<Vec<_>>()
                    .join(separator.as_str());
                writeln!(writer, "{line}").map_err(io_error)?;
            }
            Ok(())
        })
    })
}

// =============================================================================
// Format entry
// =============================================================================

pub struct Csv;

impl Format for Csv {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_a(&self, probe: &Probe<'_>) -> bool {
        suffix_matches(probe.path, SUFFIXES)
    }

    fn header(&self, filename: &str, image: &Image) -> Result<(), ImageError> {
        let table = read_table(filename)?;
        image.set_header(table_header(&table))
    }

    fn load(&self, filename: &str, image: &Arc<Image>) -> Result<(), ImageError> {
        let table = read_table(filename)?;
        let data = table
            .values
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        image.set_pixels(table_header(&table), data)
    }

    fn suffixes(&self) -> &'static [&'static str] {
        SUFFIXES
    }

    fn save(&self, image: &Arc<Image>, filename: &str) -> Result<(), ImageError> {
        save_csv(image, filename)
    }
}
