//! # parttab Tables
//!
//! Decoders for the three supported partition table formats:
//! - **MBR**: Master Boot Record (BIOS/legacy partitioning)
//! - **GPT**: GUID Partition Table (UEFI/modern partitioning)
//! - **BSD**: BSD DiskLabel (standalone or embedded in an MBR slice)
//!
//! Each decoder is a pure function from a [`ByteSource`] to a tagged
//! [`Detection`] result; none of them shares state with the others.
//! Precedence and fallback between formats is the pipeline's concern.
//!
//! ## Example
//!
//! ```rust,no_run
//! use parttab_core::{Detection, StreamSource};
//! use parttab_tables::mbr::MbrTable;
//! use std::fs::File;
//!
//! let file = File::open("disk.img").unwrap();
//! let mut source = StreamSource::new(file).unwrap();
//!
//! if let Detection::Recognized(table) = MbrTable::decode(&mut source).unwrap() {
//!     for record in table.records() {
//!         println!("{}", record);
//!     }
//! }
//! ```
//!
//! [`ByteSource`]: parttab_core::ByteSource
//! [`Detection`]: parttab_core::Detection

pub mod bsd;
pub mod gpt;
pub mod mbr;

pub use bsd::Disklabel;
pub use gpt::Gpt;
pub use mbr::MbrTable;
