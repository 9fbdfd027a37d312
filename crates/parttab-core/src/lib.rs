//! # parttab Core
//!
//! Foundational types for partition table inspection:
//! - **ByteSource**: bounded, read-only access to a disk image or device
//! - **PartitionRecord / DiskReport**: the normalized output model
//! - **Error / Warning**: the hard/soft failure taxonomy
//!
//! Decoders live in `parttab-tables`; probe orchestration lives in
//! `parttab-pipeline`. This crate never opens files itself — sources are
//! constructed by the caller and handed to the pipeline by reference.
//!
//! ## Example
//!
//! ```rust
//! use parttab_core::{ByteSource, StreamSource};
//! use std::io::Cursor;
//!
//! let mut source = StreamSource::new(Cursor::new(vec![0u8; 1024])).unwrap();
//! assert_eq!(source.size(), 1024);
//! let sector = source.read_at(0, 512).unwrap();
//! assert_eq!(sector.len(), 512);
//! ```

pub mod error;
pub mod source;
pub mod types;

// Re-export commonly used items
pub use error::{Error, Result};
pub use source::{ByteSource, MmapSource, StreamSource, MAX_MMAP_SIZE};
pub use types::{Detection, DiskReport, PartitionRecord, TableKind, TableReport, Warning};
