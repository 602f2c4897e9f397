//! Lazy decode: a two-phase reader behind one partial image.
//!
//! The header reader runs at open time, so geometry is known straight away.
//! The pixel reader runs the first time any consumer pulls a region: it
//! decodes into a private buffer image, which then serves every pull. The
//! buffer is created at most once per handle, however many consumers pull
//! and however concurrently; a [`OnceCell`] serializes the first pulls.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::ImageError;
use crate::image::{Generate, Header, Image, Rect, Region, Sequence};

type ReadPixels = Box<dyn Fn(&str, &Arc<Image>) -> Result<(), ImageError> + Send + Sync>;

/// Lazy-open state owned by the partial image.
struct LazyOpen {
    filename: String,
    header: Header,
    read_pixels: ReadPixels,
    backing: OnceCell<Arc<Image>>,
}

impl LazyOpen {
    /// The decoded backing image, decoding it on first use.
    fn backing(&self) -> Result<&Arc<Image>, ImageError> {
        self.backing.get_or_try_init(|| {
            debug!("decoding pixels of {}", self.filename);

            let backing = Image::buffer(&self.filename);
            let loaded = (self.read_pixels)(&self.filename, &backing).and_then(|_| {
                let header = backing.header();
                if (header.width, header.height, header.pel_size())
                    == (self.header.width, self.header.height, self.header.pel_size())
                {
                    Ok(())
                } else {
                    Err(ImageError::bad_header(
                        &self.filename,
                        "decoded pixels don't match the header",
                    ))
                }
            });

            match loaded {
                Ok(()) => Ok(backing),
                Err(e) => {
                    let _ = backing.close();
                    Err(e)
                }
            }
        })
    }

    fn close_backing(&self) -> Result<(), ImageError> {
        match self.backing.get() {
            Some(backing) => backing.close(),
            None => Ok(()),
        }
    }
}

impl Generate for LazyOpen {
    fn start(&self) -> Result<Box<dyn Sequence>, ImageError> {
        Ok(Box::new(LazySequence {
            region: self.backing()?.region(),
        }))
    }
}

struct LazySequence {
    region: Region,
}

impl Sequence for LazySequence {
    fn generate(&mut self, rect: Rect, out: &mut [u8]) -> Result<(), ImageError> {
        self.region.prepare(rect)?;
        out.copy_from_slice(self.region.data());
        Ok(())
    }
}

/// Open `filename` as a partial image whose pixels are decoded on demand.
///
/// `read_header` fills in the header now; a failure there fails the open.
/// `read_pixels` is called at most once, on the first region pull, with a
/// fresh buffer image to decode into.
pub fn open_lazy<H, P>(filename: &str, read_header: H, read_pixels: P) -> Result<Arc<Image>, ImageError>
where
    H: FnOnce(&str, &Image) -> Result<(), ImageError>,
    P: Fn(&str, &Arc<Image>) -> Result<(), ImageError> + Send + Sync + 'static,
{
    let image = Image::partial(filename);
    read_header(filename, &image)?;

    let lazy = Arc::new(LazyOpen {
        filename: filename.to_string(),
        header: image.header(),
        read_pixels: Box::new(read_pixels),
        backing: OnceCell::new(),
    });

    let owned = lazy.clone();
    image.add_close_callback(move |_| owned.close_backing());
    image.generate(lazy.header, lazy)?;

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::BandFormat;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gray_header(image: &Image) -> Result<(), ImageError> {
        image.set_header(Header::new(4, 4, 1, BandFormat::UChar))
    }

    fn counting_reader(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn(&str, &Arc<Image>) -> Result<(), ImageError> + Send + Sync + 'static {
        move |_, image| {
            calls.fetch_add(1, Ordering::SeqCst);
            image.set_pixels(Header::new(4, 4, 1, BandFormat::UChar), (0..16).collect())
        }
    }

    #[test]
    fn test_header_now_pixels_later() {
        let calls = Arc::new(AtomicUsize::new(0));
        let image = open_lazy("lazy", |_, im| gray_header(im), counting_reader(calls.clone()))
            .unwrap();

        assert_eq!(image.width(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mut region = image.region();
        region.prepare(Rect::new(1, 1, 2, 1)).unwrap();
        assert_eq!(region.data(), &[5, 6]);
        region.prepare(Rect::new(0, 3, 4, 1)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut other = image.region();
        other.prepare(Rect::new(0, 0, 1, 1)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_header_failure_fails_open() {
        let result = open_lazy(
            "lazy-bad-header",
            |_, _| Err(ImageError::codec("test", "no header")),
            |_, _| Ok(()),
        );
        assert!(result.is_err());
        assert!(!crate::image::registry::open_filenames()
            .iter()
            .any(|f| f == "lazy-bad-header"));
    }

    #[test]
    fn test_pixel_failure_fails_pull_and_retries_for_new_consumers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let image = open_lazy(
            "lazy-bad-pixels",
            |_, im| gray_header(im),
            move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ImageError::codec("test", "corrupt"))
            },
        )
        .unwrap();

        let mut region = image.region();
        assert!(region.prepare(Rect::new(0, 0, 1, 1)).is_err());
        assert!(region.prepare(Rect::new(0, 0, 1, 1)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut other = image.region();
        assert!(other.prepare(Rect::new(0, 0, 1, 1)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_mismatched_decode_is_rejected() {
        let image = open_lazy(
            "lazy-mismatch",
            |_, im| gray_header(im),
            |_, im| im.set_pixels(Header::new(2, 2, 1, BandFormat::UChar), vec![0; 4]),
        )
        .unwrap();

        let mut region = image.region();
        assert!(matches!(
            region.prepare(Rect::new(0, 0, 1, 1)),
            Err(ImageError::BadHeader { .. })
        ));
    }

    #[test]
    fn test_close_tears_down_backing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let image = open_lazy("lazy-close", |_, im| gray_header(im), counting_reader(calls))
            .unwrap();
        image.region().prepare(Rect::new(0, 0, 1, 1)).unwrap();

        let backing_open = || {
            crate::image::registry::open_filenames()
                .iter()
                .filter(|f| *f == "lazy-close")
                .count()
        };
        assert_eq!(backing_open(), 2);
        image.close().unwrap();
        assert_eq!(backing_open(), 0);
    }
}
