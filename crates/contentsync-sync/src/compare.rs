//! Byte-exact file comparison

use crate::os;
use contentsync_types::{ChunkSize, Error, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Compares two files byte for byte
///
/// Clones share one byte counter, so the total read by every worker of a
/// diff can be observed through [`ContentComparator::bytes_read`].
#[derive(Debug, Clone)]
pub struct ContentComparator {
    chunk_size: usize,
    bytes_read: Arc<AtomicU64>,
}

impl Default for ContentComparator {
    fn default() -> Self {
        Self::new(ChunkSize::default())
    }
}

impl ContentComparator {
    /// Create a comparator reading `chunk_size` bytes per side per step
    pub fn new(chunk_size: ChunkSize) -> Self {
        Self {
            chunk_size: chunk_size.get(),
            bytes_read: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total bytes read from both sides since creation
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Whether two existing regular files hold the same bytes
    ///
    /// Files of different sizes are reported different without being
    /// opened. Otherwise both are read in lockstep and the first differing
    /// chunk ends the comparison. A short read on one side only means a file
    /// changed underneath us and counts as different.
    ///
    /// Cancellation is checked once per chunk. A cancelled comparison
    /// returns `true`; callers must not act on the answer once the token is
    /// cancelled.
    pub fn are_identical(
        &self,
        left: &Path,
        right: &Path,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let left_len = file_len(left)?;
        let right_len = file_len(right)?;
        if left_len != right_len {
            trace!(
                "Size mismatch {} ({}) vs {} ({})",
                left.display(),
                left_len,
                right.display(),
                right_len
            );
            return Ok(false);
        }

        let mut left_file = open(left)?;
        let mut right_file = open(right)?;
        let identical = self.compare_streams(&mut left_file, &mut right_file, cancel, left, right);

        os::release_cached_pages(&left_file);
        os::release_cached_pages(&right_file);
        identical
    }

    fn compare_streams(
        &self,
        left_file: &mut File,
        right_file: &mut File,
        cancel: &CancellationToken,
        left: &Path,
        right: &Path,
    ) -> Result<bool> {
        let mut left_buf = vec![0u8; self.chunk_size];
        let mut right_buf = vec![0u8; self.chunk_size];

        loop {
            if cancel.is_cancelled() {
                return Ok(true);
            }

            let left_read = fill(left_file, &mut left_buf).map_err(|e| read_error(left, &e))?;
            let right_read =
                fill(right_file, &mut right_buf).map_err(|e| read_error(right, &e))?;
            self.bytes_read
                .fetch_add((left_read + right_read) as u64, Ordering::Relaxed);

            if left_read != right_read {
                return Ok(false);
            }
            if left_read == 0 {
                return Ok(true);
            }
            if left_buf[..left_read] != right_buf[..right_read] {
                return Ok(false);
            }
        }
    }
}

/// Read until `buf` is full or the stream ends
fn fill(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn file_len(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|metadata| metadata.len())
        .map_err(|e| Error::compare(path, e.to_string()))
}

fn open(path: &Path) -> Result<File> {
    os::open_sequential(path).map_err(|e| Error::compare(path, e.to_string()))
}

fn read_error(path: &Path, error: &io::Error) -> Error {
    Error::compare(path, format!("read failed: {}", error))
}
