// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image ingest: accumulate an arbitrary byte stream into memory, then
// decode it on a worker thread while the caller polls for completion.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use streampress_core::SpoolConfig;
use streampress_core::error::{Result, StreampressError};

use crate::raster::RasterImage;

/// A chunked byte source.
///
/// `Ok(Some(n))` delivers `n` bytes into the buffer — `n` may be zero,
/// which means "nothing available right now" and must NOT end the
/// accumulation loop. `Ok(None)` is the end of the feed.
pub trait ByteFeed {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>>;
}

/// Adapt an `io::Read`, whose `Ok(0)` convention means end-of-stream.
pub struct ReaderFeed<R: Read>(pub R);

impl<R: Read> ByteFeed for ReaderFeed<R> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        match self.0.read(buf)? {
            0 => Ok(None),
            n => Ok(Some(n)),
        }
    }
}

/// Accumulates a byte stream and decodes it into a `RasterImage`.
pub struct ImageIngest {
    chunk_bytes: usize,
    poll_interval: Duration,
}

impl ImageIngest {
    pub fn new(config: &SpoolConfig) -> Self {
        Self {
            chunk_bytes: config.ingest_chunk_bytes.max(1),
            poll_interval: Duration::from_millis(config.decode_poll_interval_ms.max(1)),
        }
    }

    /// Read the feed to completion and decode.
    ///
    /// Returns `Ok(None)` when `interrupt` is raised mid-decode: the
    /// deliberate soft-failure policy is "no image produced", not an
    /// error.
    pub fn ingest(
        &self,
        feed: &mut dyn ByteFeed,
        interrupt: &Arc<AtomicBool>,
    ) -> Result<Option<RasterImage>> {
        let bytes = self.slurp(feed)?;
        self.decode(bytes, interrupt)
    }

    /// Accumulate the feed into one contiguous buffer.
    ///
    /// Chunks track their actual lengths so the final buffer is sized
    /// by the summed payload, never by chunk capacity. Only an
    /// end-of-feed signal terminates the loop; zero-length reads
    /// continue it.
    #[instrument(skip_all)]
    pub fn slurp(&self, feed: &mut dyn ByteFeed) -> Result<Vec<u8>> {
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut total = 0usize;
        loop {
            let mut buf = vec![0u8; self.chunk_bytes];
            match feed.read_chunk(&mut buf)? {
                None => break,
                Some(0) => continue,
                Some(n) => {
                    buf.truncate(n);
                    total += n;
                    chunks.push(buf);
                }
            }
        }
        let mut out = Vec::with_capacity(total);
        for chunk in chunks {
            out.extend_from_slice(&chunk);
        }
        debug!(bytes = out.len(), "stream accumulated");
        Ok(out)
    }

    /// Decode on a worker thread, polling on a sleep-and-recheck loop.
    #[instrument(skip_all, fields(bytes = bytes.len()))]
    pub fn decode(
        &self,
        bytes: Vec<u8>,
        interrupt: &Arc<AtomicBool>,
    ) -> Result<Option<RasterImage>> {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = image::load_from_memory(&bytes)
                .map(|img| RasterImage::from_dynamic(&img))
                .map_err(|e| e.to_string());
            // The receiver may have been interrupted and dropped.
            let _ = tx.send(result);
        });

        loop {
            if interrupt.load(Ordering::Relaxed) {
                // Decoder thread finishes on its own; we just stop
                // waiting and report "no image".
                warn!("decode interrupted, returning no image");
                return Ok(None);
            }
            match rx.try_recv() {
                Ok(Ok(raster)) => {
                    debug!(
                        width = raster.width,
                        height = raster.height,
                        "image decoded"
                    );
                    return Ok(Some(raster));
                }
                Ok(Err(e)) => return Err(StreampressError::MalformedImageData(e)),
                Err(TryRecvError::Empty) => std::thread::sleep(self.poll_interval),
                Err(TryRecvError::Disconnected) => {
                    return Err(StreampressError::MalformedImageData(
                        "decoder terminated without a result".into(),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted feed: a sequence of chunk sizes, where 0 means "no
    /// data yet" and the list's end means end-of-feed.
    struct ScriptedFeed {
        script: Vec<usize>,
        step: usize,
        fill: u8,
    }

    impl ByteFeed for ScriptedFeed {
        fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
            let Some(&n) = self.script.get(self.step) else {
                return Ok(None);
            };
            self.step += 1;
            for b in buf.iter_mut().take(n) {
                *b = self.fill;
            }
            Ok(Some(n))
        }
    }

    fn ingest() -> ImageIngest {
        ImageIngest::new(&SpoolConfig::default())
    }

    #[test]
    fn zero_length_reads_do_not_end_the_loop() {
        let mut feed = ScriptedFeed {
            script: vec![0, 0, 5, 0, 3],
            step: 0,
            fill: 0xAB,
        };
        let bytes = ingest().slurp(&mut feed).expect("slurp");
        assert_eq!(bytes.len(), 8);
        assert!(bytes.iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn buffer_sized_by_actual_lengths_not_capacity() {
        let mut feed = ScriptedFeed {
            script: vec![1],
            step: 0,
            fill: 0x7F,
        };
        let bytes = ingest().slurp(&mut feed).expect("slurp");
        assert_eq!(bytes, vec![0x7F]);
    }

    #[test]
    fn reader_feed_treats_eof_as_end() {
        let data: &[u8] = &[1, 2, 3];
        let mut feed = ReaderFeed(data);
        let bytes = ingest().slurp(&mut feed).expect("slurp");
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn decode_valid_png() {
        let img = image::DynamicImage::new_rgb8(2, 2);
        let mut encoded = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut encoded),
            image::ImageFormat::Png,
        )
        .expect("encode");

        let interrupt = Arc::new(AtomicBool::new(false));
        let raster = ingest()
            .decode(encoded, &interrupt)
            .expect("decode")
            .expect("image");
        assert_eq!((raster.width, raster.height), (2, 2));
    }

    #[test]
    fn malformed_data_is_an_error() {
        let interrupt = Arc::new(AtomicBool::new(false));
        let result = ingest().decode(vec![0u8; 64], &interrupt);
        assert!(matches!(
            result,
            Err(StreampressError::MalformedImageData(_))
        ));
    }

    #[test]
    fn interrupt_is_a_soft_failure() {
        let interrupt = Arc::new(AtomicBool::new(true));
        // Even garbage decodes to "no image" when interrupted first.
        let result = ingest().decode(vec![0u8; 64], &interrupt).expect("soft");
        assert!(result.is_none());
    }
}
