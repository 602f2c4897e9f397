//! CSV, Analyze and TIFF reader tests.

use lazy_image_io::format::tiff::Tiff;
use lazy_image_io::format::Format;
use lazy_image_io::{open, BandFormat, ByteOrder, ImageError};

use super::test_utils::*;

fn doubles(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
        .collect()
}

#[test]
fn test_csv_default_options() {
    let dir = scratch_dir("csv-defaults");
    let file = dir.join("matrix.csv");
    std::fs::write(&file, "1, 2, 3\n\"4\";5\t6\n").unwrap();

    let image = open(&path_str(&file), "r").unwrap();
    assert_eq!((image.width(), image.height(), image.bands()), (3, 2, 1));
    assert_eq!(image.format(), BandFormat::Double);
    assert_eq!(
        doubles(&image.write_to_memory().unwrap()),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    );
}

#[test]
fn test_csv_skip_and_separator_options() {
    let dir = scratch_dir("csv-options");
    let file = dir.join("table.csv");
    std::fs::write(&file, "x|y\n1.5|2\n3|4.25\n").unwrap();

    let image = open(&format!("{}:skip:1,sep:|", path_str(&file)), "r").unwrap();
    assert_eq!((image.width(), image.height()), (2, 2));
    assert_eq!(
        doubles(&image.write_to_memory().unwrap()),
        vec![1.5, 2.0, 3.0, 4.25]
    );
}

#[test]
fn test_csv_line_limit() {
    let dir = scratch_dir("csv-lines");
    let file = dir.join("long.csv");
    std::fs::write(&file, "1\n2\n3\n4\n").unwrap();

    let image = open(&format!("{}:line:2", path_str(&file)), "r").unwrap();
    assert_eq!(image.height(), 2);
}

#[test]
fn test_csv_ragged_rows_fail_at_open() {
    let dir = scratch_dir("csv-ragged");
    let file = dir.join("ragged.csv");
    std::fs::write(&file, "1,2\n3\n").unwrap();

    assert!(matches!(
        open(&path_str(&file), "r"),
        Err(ImageError::Codec { format: "csv", .. })
    ));
}

#[test]
fn test_analyze_big_endian_volume() {
    let dir = scratch_dir("analyze-be");
    let base = dir.join("brain");
    let voxels: Vec<i16> = (0..12).map(|v| v * 100 - 300).collect();
    write_analyze_short(&base, ByteOrder::BigEndian, [3, 2, 2], &voxels);

    for member in ["brain.hdr", "brain.img"] {
        let image = open(&path_str(&dir.join(member)), "r").unwrap();
        assert_eq!((image.width(), image.height()), (3, 4));
        assert_eq!(image.format(), BandFormat::Short);
        assert_eq!(image.header().xres, 2.0);

        let expected: Vec<u8> = voxels.iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert_eq!(image.write_to_memory().unwrap(), expected);
    }
}

#[test]
fn test_analyze_little_endian_volume() {
    let dir = scratch_dir("analyze-le");
    let base = dir.join("scan");
    let voxels: Vec<i16> = vec![1, -2, 3, -4];
    write_analyze_short(&base, ByteOrder::LittleEndian, [2, 2, 1], &voxels);

    let image = open(&path_str(&dir.join("scan.hdr")), "r").unwrap();
    let expected: Vec<u8> = voxels.iter().flat_map(|v| v.to_ne_bytes()).collect();
    assert_eq!(image.write_to_memory().unwrap(), expected);
}

#[test]
fn test_tiff_over_the_allocation_limit_reads_through_fallback() {
    static SMALL_BUDGET: Tiff = Tiff::with_max_alloc(64);

    let dir = scratch_dir("tiff-fallback");
    let file = dir.join("wide.tif");
    gray_ramp(20, 10).save(&file).unwrap();
    let path = path_str(&file);

    let image = SMALL_BUDGET.open(&path).unwrap();
    assert_eq!((image.width(), image.height()), (20, 10));
    assert_eq!(image.write_to_memory().unwrap(), gray_ramp_bytes(20, 10));
}

#[test]
fn test_tiff_within_the_limit_reads_directly() {
    let dir = scratch_dir("tiff-direct");
    let file = dir.join("ramp.tif");
    gray_ramp(6, 3).save(&file).unwrap();

    let image = open(&path_str(&file), "r").unwrap();
    assert_eq!(image.write_to_memory().unwrap(), gray_ramp_bytes(6, 3));
}
