// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded, blocking, one-writer/one-reader byte pipe.
//
// The converter task writes; the foreground delivery reads. The
// window bounds in-flight memory and forces the two sides to run
// concurrently: a write blocks until earlier windows drain, a read
// blocks until data arrives. Dropping or closing the writer ends the
// stream; dropping the reader turns further writes into broken-pipe
// errors, which is how a failed foreground unblocks the writer.

use std::io::{self, Read, Write};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

/// Create a connected pipe with the given window size in bytes.
///
/// At most two windows are in flight at once: one buffered in the
/// channel and one being written.
pub fn pipe(window_bytes: usize) -> (PipeWriter, PipeReader) {
    let window = window_bytes.max(1);
    let (tx, rx) = sync_channel::<Vec<u8>>(1);
    (
        PipeWriter {
            tx: Some(tx),
            window,
        },
        PipeReader {
            rx,
            current: Vec::new(),
            pos: 0,
        },
    )
}

/// Write end. Closing (or dropping) signals end-of-stream to the
/// reader.
pub struct PipeWriter {
    tx: Option<SyncSender<Vec<u8>>>,
    window: usize,
}

impl PipeWriter {
    /// Explicitly close the write end. Idempotent.
    pub fn close(&mut self) {
        self.tx = None;
    }

    fn sender(&self) -> io::Result<&SyncSender<Vec<u8>>> {
        self.tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "pipe writer closed"))
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let window = self.window;
        for chunk in buf.chunks(window) {
            self.sender()?
                .send(chunk.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader gone"))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Nothing buffered on this side; data lives in the channel.
        Ok(())
    }
}

/// Read end. Reports end-of-stream once the writer closes and all
/// in-flight windows are drained.
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    current: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.current.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                // Writer dropped: end of stream.
                Err(_) => return Ok(0),
            }
        }
        let n = (self.current.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
