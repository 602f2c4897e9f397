//! Format dispatch tests.

use lazy_image_io::{open, open_header, BandFormat, ImageError, ImageKind, Rect};

use super::test_utils::*;

#[test]
fn test_jpeg_header_is_known_before_any_pull() {
    let dir = scratch_dir("jpeg-header");
    let path = path_str(&dir.join("card.jpg"));
    write_jpeg_rgb(dir.join("card.jpg").as_path(), 16, 8);

    let image = open(&path, "r").unwrap();
    assert_eq!(image.kind(), ImageKind::Partial);
    assert_eq!((image.width(), image.height(), image.bands()), (16, 8, 3));
    assert_eq!(image.format(), BandFormat::UChar);

    let mut region = image.region();
    region.prepare(Rect::new(0, 0, 16, 8)).unwrap();
    assert_eq!(region.data().len(), 16 * 8 * 3);

    image.close().unwrap();
    assert!(!is_registered(&path));
}

#[test]
fn test_png_pixels_are_exact() {
    let dir = scratch_dir("png-pixels");
    let file = dir.join("ramp.png");
    write_png_gray(&file, 5, 3);

    let image = open(&path_str(&file), "r").unwrap();
    assert_eq!(image.bands(), 1);
    assert_eq!(image.write_to_memory().unwrap(), gray_ramp_bytes(5, 3));

    let mut region = image.region();
    region.prepare(Rect::new(2, 1, 2, 2)).unwrap();
    assert_eq!(region.data(), &[12, 13, 22, 23]);
}

#[test]
fn test_read_options_are_ignored_by_the_probe() {
    let dir = scratch_dir("png-options");
    let file = dir.join("ramp.png");
    write_png_gray(&file, 4, 4);

    let image = open(&format!("{}:ignored", path_str(&file)), "r").unwrap();
    assert_eq!(image.width(), 4);
}

#[test]
fn test_unrecognised_file_is_unsupported() {
    let dir = scratch_dir("unsupported");
    let file = dir.join("bad.ext");
    std::fs::write(&file, b"hello, this is not an image").unwrap();
    let path = path_str(&file);

    let err = open(&path, "r").unwrap_err();
    assert!(matches!(err, ImageError::UnsupportedFormat(ref f) if *f == path));
    assert_eq!(err.to_string(), format!("\"{path}\" is not a supported format"));
    assert!(!is_registered(&path));
}

#[test]
fn test_missing_file_is_not_readable() {
    let dir = scratch_dir("missing");
    let path = path_str(&dir.join("missing.png"));

    let err = open(&path, "r").unwrap_err();
    assert_eq!(err.to_string(), format!("\"{path}\" is not readable"));
}

#[test]
fn test_open_header_is_read_mode() {
    let dir = scratch_dir("open-header");
    let file = dir.join("ramp.png");
    write_png_gray(&file, 7, 2);

    let image = open_header(&path_str(&file)).unwrap();
    assert_eq!((image.width(), image.height()), (7, 2));
}

#[test]
fn test_modes() {
    assert!(matches!(open("x", "z"), Err(ImageError::BadMode(_))));
    assert!(matches!(open("", "r"), Err(ImageError::InvalidArgument(_))));
    assert!(matches!(open("x", ""), Err(ImageError::InvalidArgument(_))));
    assert_eq!(open("scratch", "t").unwrap().kind(), ImageKind::Buffer);
    assert_eq!(open("virtual", "p").unwrap().kind(), ImageKind::Partial);
}

#[test]
fn test_corrupt_tiff_reports_the_tiff_error() {
    let dir = scratch_dir("corrupt-tiff");
    let file = dir.join("broken.tif");
    let mut bytes = vec![0x49, 0x49, 0x2A, 0x00, 0xFF, 0xFF, 0xFF, 0x7F];
    bytes.extend_from_slice(&[0u8; 32]);
    std::fs::write(&file, bytes).unwrap();
    let path = path_str(&file);

    assert!(matches!(
        open(&path, "r"),
        Err(ImageError::Codec { format: "tiff", .. })
    ));
    assert!(!is_registered(&path));
}
