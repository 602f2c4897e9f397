//! Lazy decode tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazy_image_io::{open, open_lazy, BandFormat, Header, ImageError, Rect};

use super::test_utils::*;

#[test]
fn test_concurrent_first_pulls_decode_once() {
    let decodes = Arc::new(AtomicUsize::new(0));
    let counter = decodes.clone();

    let image = open_lazy(
        "lazy-concurrent",
        |_, image| image.set_header(Header::new(32, 32, 1, BandFormat::UChar)),
        move |_, image| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            image.set_pixels(Header::new(32, 32, 1, BandFormat::UChar), vec![7; 32 * 32])
        },
    )
    .unwrap();

    std::thread::scope(|s| {
        for i in 0..8u32 {
            let image = image.clone();
            s.spawn(move || {
                let mut region = image.region();
                region.prepare(Rect::new(i * 4, i * 4, 4, 4)).unwrap();
                assert!(region.data().iter().all(|&p| p == 7));
            });
        }
    });

    assert_eq!(decodes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sink_over_lazy_image_decodes_once() {
    let dir = scratch_dir("lazy-sink");
    let file = dir.join("big.png");
    write_png_gray(&file, 20, 40);

    let image = open(&path_str(&file), "r").unwrap();
    // More strips than workers, so several regions share one decode
    assert_eq!(image.write_to_memory().unwrap(), gray_ramp_bytes(20, 40));
    assert_eq!(image.write_to_memory().unwrap(), gray_ramp_bytes(20, 40));
}

#[test]
fn test_decode_failure_surfaces_at_pull_time() {
    let dir = scratch_dir("lazy-truncated");
    let file = dir.join("cut.png");
    write_png_gray(&file, 64, 64);
    let path = path_str(&file);

    let image = open(&path, "r").unwrap();
    assert_eq!(image.width(), 64);

    // Keep the header, lose the pixel data
    let bytes = std::fs::read(&file).unwrap();
    std::fs::write(&file, &bytes[..40]).unwrap();

    let mut region = image.region();
    assert!(matches!(
        region.prepare(Rect::new(0, 0, 8, 8)),
        Err(ImageError::Codec { format: "png", .. })
    ));
}

#[test]
fn test_close_releases_decoded_pixels() {
    let dir = scratch_dir("lazy-close");
    let file = dir.join("ramp.png");
    write_png_gray(&file, 4, 4);
    let path = path_str(&file);

    let image = open(&path, "r").unwrap();
    image.region().prepare(Rect::new(0, 0, 1, 1)).unwrap();
    let handles = || {
        lazy_image_io::registry::open_filenames()
            .iter()
            .filter(|f| **f == path)
            .count()
    };
    assert_eq!(handles(), 2);

    image.close().unwrap();
    assert_eq!(handles(), 0);
    assert!(matches!(
        image.region().prepare(Rect::new(0, 0, 1, 1)),
        Err(ImageError::Closed(_))
    ));
}
