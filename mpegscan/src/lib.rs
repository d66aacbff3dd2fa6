//! Frame-accurate scanning of MPEG audio elementary streams.
//!
//! `mpegscan` walks an MPEG 1/2/2.5 Layer I/II/III stream frame by frame without
//! decoding any audio: it measures the ID3 tag boundaries, locks onto the first
//! frame sync, then chains frame headers by computed length, cross-validating
//! each against its predecessor. The result is a [`StreamInfo`] inventory of the
//! stream (frame count, duration, bitrate, VBR-ness, channel layout).
//!
//! # Examples
//!
//! ## Scanning a file on disk
//!
//! ```rust,no_run
//! # fn main() -> mpegscan::error::Result<()> {
//! use mpegscan::config::ScanOptions;
//! use mpegscan::scan_from_path;
//!
//! let info = scan_from_path("song.mp3", ScanOptions::new())?;
//!
//! println!(
//! 	"{} frames, {:?}, {} Hz",
//! 	info.frame_count(),
//! 	info.duration(),
//! 	info.sample_rate()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Scanning an existing reader
//!
//! Anything `Read + Seek` works; custom sources only need to implement
//! [`Reader`](reader::Reader).
//!
//! ```rust,no_run
//! # fn main() -> mpegscan::error::Result<()> {
//! use mpegscan::config::{MismatchPolicy, ScanOptions};
//! use mpegscan::scan_from;
//! use std::fs::File;
//!
//! let mut file = File::open("song.mp3")?;
//!
//! // Tolerate streams whose frames disagree on more than the bitrate
//! let options = ScanOptions::new().mismatch_policy(MismatchPolicy::Skip);
//! let info = scan_from(&mut file, options)?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod buffer;
pub mod config;
pub mod error;
pub mod header;
pub mod id3;
pub(crate) mod macros;
pub mod reader;
pub mod scanner;

pub(crate) mod frame;

pub use config::{MismatchPolicy, ScanOptions};
pub use scanner::{Scanner, StreamInfo};

use crate::error::Result;
use crate::reader::Reader;

use std::fs::File;
use std::path::Path;

/// Scans a stream to completion through an existing reader
///
/// # Errors
///
/// See [`Scanner::parse`].
pub fn scan_from<R>(reader: &mut R, options: ScanOptions) -> Result<StreamInfo>
where
	R: Reader + ?Sized,
{
	Scanner::new(options).parse(reader)
}

/// Scans the file at `path` to completion
///
/// # Errors
///
/// * `path` does not exist
/// * See [`Scanner::parse`]
pub fn scan_from_path(path: impl AsRef<Path>, options: ScanOptions) -> Result<StreamInfo> {
	let mut file = File::open(path)?;

	scan_from(&mut file, options)
}
