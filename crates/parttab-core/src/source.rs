//! Byte sources - bounded, read-only access to disk images
//!
//! A [`ByteSource`] is the only thing in the core that touches raw I/O.
//! All decoder reads are absolute-offset, bound-checked against the
//! source size before being issued. No write capability is exposed.

use crate::error::{Error, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Maximum file size for memory mapping (16 GB)
pub const MAX_MMAP_SIZE: u64 = 16 * 1024 * 1024 * 1024;

/// Read-only, sized, byte-addressable input
///
/// The caller owns the underlying handle; the pipeline only borrows a
/// read capability for the duration of one inspection run.
pub trait ByteSource: Send {
    /// Total addressable length in bytes
    fn size(&self) -> u64;

    /// Read exactly `length` bytes starting at `offset`
    ///
    /// # Errors
    ///
    /// - [`Error::TruncatedRead`] when the image ends before
    ///   `offset + length`
    /// - [`Error::Io`] on any lower-level read failure
    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>>;
}

/// Bound-check an absolute read against a known source size
fn check_bounds(offset: u64, length: usize, size: u64) -> Result<()> {
    let end = offset
        .checked_add(length as u64)
        .ok_or_else(|| Error::structural("read range overflows u64"))?;
    if end > size {
        return Err(Error::TruncatedRead {
            offset,
            length: length as u64,
            available: size.saturating_sub(offset),
        });
    }
    Ok(())
}

/// A byte source over any `Read + Seek` stream
///
/// Used for block devices and anything else that cannot be memory-mapped.
pub struct StreamSource<R: Read + Seek + Send> {
    inner: R,
    size: u64,
}

impl<R: Read + Seek + Send> StreamSource<R> {
    /// Wrap a stream, learning its size by seeking to the end
    pub fn new(mut inner: R) -> Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, size })
    }

    /// Wrap a stream whose size is already known (e.g. from `ioctl`
    /// on a block device where seeking to the end is unreliable)
    pub fn with_size(inner: R, size: u64) -> Self {
        Self { inner, size }
    }
}

impl StreamSource<File> {
    /// Open a file as a stream-backed source
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { inner: file, size })
    }
}

impl<R: Read + Seek + Send> ByteSource for StreamSource<R> {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        check_bounds(offset, length, self.size)?;
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length];
        self.inner.read_exact(&mut buf).map_err(|e| {
            // The bound check should make this unreachable for well-behaved
            // streams, but a shrinking file can still hit it.
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::TruncatedRead {
                    offset,
                    length: length as u64,
                    available: 0,
                }
            } else {
                Error::Io(e)
            }
        })?;
        Ok(buf)
    }
}

/// A byte source backed by a read-only memory mapping
///
/// # Safety
///
/// Mapping is `unsafe` because the file must not be truncated while
/// mapped; that is the caller's responsibility. Only regular files are
/// accepted and the mapping is read-only.
pub struct MmapSource {
    mmap: Mmap,
}

impl MmapSource {
    /// Open a regular file with a read-only memory mapping
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let metadata = file.metadata()?;

        if !metadata.is_file() {
            return Err(Error::custom(
                "only regular files can be memory-mapped; use a stream source for devices",
            ));
        }
        if metadata.len() > MAX_MMAP_SIZE {
            return Err(Error::custom(format!(
                "file size {} exceeds memory mapping limit {}",
                metadata.len(),
                MAX_MMAP_SIZE
            )));
        }

        // SAFETY: regular file, read-only mapping, size validated above.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }
}

impl ByteSource for MmapSource {
    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        check_bounds(offset, length, self.mmap.len() as u64)?;
        let start = offset as usize;
        Ok(self.mmap[start..start + length].to_vec())
    }
}
