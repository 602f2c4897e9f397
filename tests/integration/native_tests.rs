//! Native format tests: streaming write, in-place read, byte-order swap.

use lazy_image_io::{
    copy, open, BandFormat, ByteOrder, Header, ImageError, ImageKind, Interpretation, Rect,
};

use super::test_utils::*;

#[test]
fn test_native_write_then_read() {
    let dir = scratch_dir("native-round-trip");
    let path = path_str(&dir.join("out.v"));
    let values = [1u16, 2, 300, 40000, 5, 6];

    let input = open("native-input", "t").unwrap();
    input
        .set_pixels(
            Header::new(3, 2, 1, BandFormat::UShort)
                .with_interpretation(Interpretation::Grey16)
                .with_resolution(2.5, 4.0),
            ushort_native(&values),
        )
        .unwrap();

    let output = open(&path, "w").unwrap();
    assert_eq!(output.kind(), ImageKind::OpenOut);
    copy(&input, &output).unwrap();
    output.close().unwrap();

    let back = open(&path, "r").unwrap();
    assert_eq!(back.kind(), ImageKind::Mmap);
    let header = back.header();
    assert_eq!((header.width, header.height), (3, 2));
    assert_eq!(header.interpretation, Interpretation::Grey16);
    assert_eq!((header.xres, header.yres), (2.5, 4.0));
    assert_eq!(back.write_to_memory().unwrap(), ushort_native(&values));
}

#[test]
fn test_suffixless_write_is_native() {
    let dir = scratch_dir("native-no-suffix");
    let path = path_str(&dir.join("plain"));

    let output = open(&path, "w").unwrap();
    assert_eq!(output.kind(), ImageKind::OpenOut);
    assert!(matches!(output.close(), Err(ImageError::NothingWritten(_))));
}

#[test]
fn test_foreign_order_is_swapped_on_read() {
    let dir = scratch_dir("native-foreign");
    let file = dir.join("foreign.v");
    let values = [0x0102u16, 0x0304, 0xA0B0, 7];
    write_native(
        &file,
        foreign_order(),
        2,
        2,
        1,
        BandFormat::UShort,
        &ushort_bytes(&values, foreign_order()),
    );
    let path = path_str(&file);

    let image = open(&path, "r").unwrap();
    assert_eq!(image.kind(), ImageKind::Partial);
    assert_eq!(image.header().byte_order, ByteOrder::native());

    let mut region = image.region();
    region.prepare(Rect::new(1, 0, 1, 2)).unwrap();
    assert_eq!(region.data(), ushort_native(&[0x0304, 7]).as_slice());

    image.close().unwrap();
    assert!(!is_registered(&path));
}

#[test]
fn test_read_write_refused_for_foreign_multibyte() {
    let dir = scratch_dir("native-rw-refused");
    let file = dir.join("foreign.v");
    write_native(
        &file,
        foreign_order(),
        1,
        1,
        1,
        BandFormat::UShort,
        &ushort_bytes(&[9], foreign_order()),
    );

    let err = open(&path_str(&file), "rw").unwrap_err();
    assert!(matches!(err, ImageError::ReadWriteNotNative(_)));
    assert_eq!(
        err.to_string(),
        "open for read-write for native format images only"
    );
}

#[test]
fn test_read_write_allowed_for_foreign_single_byte() {
    let dir = scratch_dir("native-rw-uchar");
    let file = dir.join("bytes.v");
    write_native(&file, foreign_order(), 2, 2, 1, BandFormat::UChar, &[1, 2, 3, 4]);
    let path = path_str(&file);

    let image = open(&path, "rw").unwrap();
    assert_eq!(image.kind(), ImageKind::MmapRw);
    image.write_region(Rect::new(1, 1, 1, 1), &[99]).unwrap();
    image.close().unwrap();

    let back = open(&path, "r").unwrap();
    assert_eq!(back.write_to_memory().unwrap(), vec![1, 2, 3, 99]);
}

#[test]
fn test_read_write_in_place() {
    let dir = scratch_dir("native-rw");
    let file = dir.join("native.v");
    write_native(
        &file,
        ByteOrder::native(),
        3,
        1,
        1,
        BandFormat::UShort,
        &ushort_native(&[10, 20, 30]),
    );
    let path = path_str(&file);

    let image = open(&path, "rw").unwrap();
    let mut region = image.region();
    region.prepare(Rect::new(0, 0, 3, 1)).unwrap();
    assert_eq!(region.data(), ushort_native(&[10, 20, 30]).as_slice());

    image
        .write_region(Rect::new(0, 0, 2, 1), &ushort_native(&[11, 21]))
        .unwrap();
    region.prepare(Rect::new(0, 0, 3, 1)).unwrap();
    assert_eq!(region.data(), ushort_native(&[11, 21, 30]).as_slice());

    assert!(matches!(
        image.write_region(Rect::new(2, 0, 2, 1), &ushort_native(&[1, 2])),
        Err(ImageError::BadRegion { .. })
    ));
}

#[test]
fn test_truncated_native_file_is_rejected() {
    let dir = scratch_dir("native-truncated");
    let file = dir.join("short.v");
    write_native(&file, ByteOrder::native(), 4, 4, 1, BandFormat::UChar, &[0; 10]);

    assert!(matches!(
        open(&path_str(&file), "r"),
        Err(ImageError::BadHeader { .. })
    ));
}
