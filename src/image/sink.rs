//! Whole-image evaluation.
//!
//! [`Image::sink`] walks an image top to bottom in horizontal strips. Each
//! batch of strips is computed in parallel on the global rayon pool, one
//! region per worker, and then handed to the consumer in order. The image's
//! eval callbacks fire at start, after every batch, and at the end.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use super::callbacks::EvalPhase;
use super::{Image, Rect, Region};
use crate::config;
use crate::error::ImageError;

/// Progress of a running evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalStatus {
    /// Percent complete, 0 to 100
    pub percent: u32,
    /// Pixels computed so far
    pub processed: u64,
    /// Pixels in the whole image
    pub total: u64,
}

impl EvalStatus {
    fn advance(&mut self, pixels: u64) {
        self.processed += pixels;
        self.percent = if self.total == 0 {
            100
        } else {
            (self.processed * 100 / self.total) as u32
        };
    }
}

impl Image {
    /// Evaluate every pixel of this image, feeding strips to `consume` in
    /// top-to-bottom order.
    ///
    /// # Errors
    ///
    /// Fails if the header is incomplete, if any region pull fails, if the
    /// consumer fails, or if an eval callback fails. The evalend callbacks
    /// fire whether or not evaluation succeeded.
    pub fn sink<F>(self: &Arc<Self>, mut consume: F) -> Result<(), ImageError>
    where
        F: FnMut(Rect, &[u8]) -> Result<(), ImageError>,
    {
        let header = self.header();
        header.validate(self.filename())?;

        let settings = config::settings();
        let strip_height = settings.tile_height.max(1);
        let strips: Vec<Rect> = (0..header.height)
            .step_by(strip_height as usize)
            .map(|top| {
                Rect::new(
                    0,
                    top,
                    header.width,
                    strip_height.min(header.height - top),
                )
            })
            .collect();

        let workers = settings.concurrency.max(1).min(strips.len());
        let mut regions: Vec<Region> = (0..workers).map(|_| self.region()).collect();

        debug!(
            "sink {}: {} strips of {} rows, {} workers",
            self.filename(),
            strips.len(),
            strip_height,
            workers
        );

        let mut status = EvalStatus {
            total: header.width as u64 * header.height as u64,
            ..EvalStatus::default()
        };

        let result = self
            .callbacks
            .fire_eval(EvalPhase::Start, self, &status)
            .and_then(|_| {
                for batch in strips.chunks(workers) {
                    regions[..batch.len()]
                        .par_iter_mut()
                        .zip(batch.par_iter())
                        .try_for_each(|(region, rect)| region.prepare(*rect))?;

                    for (region, rect) in regions.iter().zip(batch) {
                        consume(*rect, region.data())?;
                        status.advance(rect.area());
                    }

                    self.callbacks
                        .fire_eval(EvalPhase::Progress, self, &status)?;
                }
                Ok(())
            });

        let end = self.callbacks.fire_eval(EvalPhase::End, self, &status);
        result.and(end)
    }

    /// Evaluate the whole image into one packed buffer.
    pub fn write_to_memory(self: &Arc<Self>) -> Result<Vec<u8>, ImageError> {
        let header = self.header();
        header.validate(self.filename())?;

        let mut data = Vec::with_capacity(header.image_size() as usize);
        self.sink(|_, strip| {
            data.extend_from_slice(strip);
            Ok(())
        })?;
        Ok(data)
    }
}
