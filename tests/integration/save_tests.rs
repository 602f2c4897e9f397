//! Delayed save tests: write handles that encode at close.

use lazy_image_io::{copy, open, BandFormat, Header, ImageError, ImageKind};

use super::test_utils::*;

/// An in-memory grey ramp, opened the way callers make scratch images.
fn gray_buffer(width: u32, height: u32) -> std::sync::Arc<lazy_image_io::Image> {
    let image = open("gray-ramp", "t").unwrap();
    image
        .set_pixels(
            Header::new(width, height, 1, BandFormat::UChar),
            gray_ramp_bytes(width, height),
        )
        .unwrap();
    image
}

fn rgb_buffer(width: u32, height: u32) -> std::sync::Arc<lazy_image_io::Image> {
    let image = open("rgb-card", "t").unwrap();
    image
        .set_pixels(
            Header::new(width, height, 3, BandFormat::UChar),
            rgb_card(width, height).into_raw(),
        )
        .unwrap();
    image
}

#[test]
fn test_tiff_round_trip() {
    let dir = scratch_dir("tiff-round-trip");
    let path = path_str(&dir.join("out.tif"));

    let input = gray_buffer(6, 5);
    let output = open(&path, "w").unwrap();
    assert_eq!(output.kind(), ImageKind::Partial);
    copy(&input, &output).unwrap();
    assert!(!dir.join("out.tif").exists());

    output.close().unwrap();
    assert!(dir.join("out.tif").exists());

    let back = open(&path, "r").unwrap();
    assert_eq!((back.width(), back.height(), back.bands()), (6, 5, 1));
    assert_eq!(back.write_to_memory().unwrap(), gray_ramp_bytes(6, 5));
}

#[test]
fn test_png_with_compression_option() {
    let dir = scratch_dir("png-option");
    let file = dir.join("out.png");

    let input = rgb_buffer(8, 4);
    let output = open(&format!("{}:9", path_str(&file)), "w").unwrap();
    copy(&input, &output).unwrap();
    output.close().unwrap();

    let back = open(&path_str(&file), "r").unwrap();
    assert_eq!(back.bands(), 3);
    assert_eq!(back.write_to_memory().unwrap(), rgb_card(8, 4).into_raw());
}

#[test]
fn test_png_bad_option_fails_at_close() {
    let dir = scratch_dir("png-bad-option");
    let file = dir.join("out.png");

    let input = gray_buffer(2, 2);
    let output = open(&format!("{}:high", path_str(&file)), "w").unwrap();
    copy(&input, &output).unwrap();
    assert!(matches!(
        output.close(),
        Err(ImageError::Codec { format: "png", .. })
    ));
    assert!(!file.exists());
}

#[test]
fn test_jpeg_with_quality() {
    let dir = scratch_dir("jpeg-quality");
    let file = dir.join("out.JPG");

    let input = rgb_buffer(16, 16);
    let output = open(&format!("{}:95", path_str(&file)), "w").unwrap();
    copy(&input, &output).unwrap();
    output.close().unwrap();

    let back = open(&path_str(&file), "r").unwrap();
    assert_eq!((back.width(), back.height(), back.bands()), (16, 16, 3));
}

#[test]
fn test_ppm_round_trip() {
    let dir = scratch_dir("ppm-round-trip");
    let file = dir.join("out.ppm");

    let input = rgb_buffer(3, 3);
    let output = open(&path_str(&file), "w").unwrap();
    copy(&input, &output).unwrap();
    output.close().unwrap();

    let back = open(&path_str(&file), "r").unwrap();
    assert_eq!(back.write_to_memory().unwrap(), rgb_card(3, 3).into_raw());
}

#[test]
fn test_csv_round_trip() {
    let dir = scratch_dir("csv-round-trip");
    let file = dir.join("out.csv");

    let input = gray_buffer(3, 2);
    let output = open(&path_str(&file), "w").unwrap();
    copy(&input, &output).unwrap();
    output.close().unwrap();

    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        "0\t1\t2\n10\t11\t12\n"
    );

    let back = open(&path_str(&file), "r").unwrap();
    assert_eq!(back.format(), BandFormat::Double);
    let values: Vec<f64> = back
        .write_to_memory()
        .unwrap()
        .chunks_exact(8)
        .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(values, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
}

#[test]
fn test_close_without_pixels_fails_and_writes_nothing() {
    let dir = scratch_dir("close-empty");
    let file = dir.join("never.png");

    let output = open(&path_str(&file), "w").unwrap();
    assert!(output.close().is_err());
    assert!(!file.exists());

    // A second close is a no-op
    assert!(output.close().is_ok());
}

#[test]
fn test_unknown_save_suffix() {
    let err = open("out.xyz", "w").unwrap_err();
    assert_eq!(err.to_string(), "unknown suffix for save");
}
