//! The pull-based reader contract the scanner consumes
//!
//! The scanner never touches the OS; it pulls bytes on demand through [`Reader`].
//! Anything `Read + Seek` (a [`File`](std::fs::File), a [`Cursor`](std::io::Cursor))
//! already implements it.

use crate::error::Result;
use crate::macros::err;

use std::io::{Read, Seek, SeekFrom};

/// Where to position the stream before a read
///
/// [`SeekRequest::None`] means "do not seek, just read from the current position".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SeekRequest {
	/// Seek to an absolute offset from the start of the stream
	FromStart(u64),
	/// Seek relative to the current position
	FromCurrent(i64),
	/// Seek relative to the end of the stream
	FromEnd(i64),
	/// Do not seek
	None,
}

impl SeekRequest {
	fn to_seek_from(self) -> Option<SeekFrom> {
		match self {
			SeekRequest::FromStart(position) => Some(SeekFrom::Start(position)),
			SeekRequest::FromCurrent(position) => Some(SeekFrom::Current(position)),
			SeekRequest::FromEnd(position) => Some(SeekFrom::End(position)),
			SeekRequest::None => None,
		}
	}
}

/// A supplier of raw stream bytes
///
/// The scanner drives this with explicit positions, so implementations need no
/// bookkeeping beyond honoring the seek. Short reads are legal; the scanner
/// retries until it has what it needs. `Ok(0)` on a nonempty `dest` is the
/// end-of-stream sentinel.
pub trait Reader {
	/// Reads up to `dest.len()` bytes into `dest`, seeking first unless
	/// `seek` is [`SeekRequest::None`]
	///
	/// Returns the number of bytes actually written.
	///
	/// # Errors
	///
	/// Implementation-defined; the blanket implementation surfaces
	/// [`ErrorKind::Io`](crate::error::ErrorKind::Io).
	fn read(&mut self, dest: &mut [u8], seek: SeekRequest) -> Result<usize>;

	/// The total length of the stream in bytes
	///
	/// The current position is preserved across the call.
	///
	/// # Errors
	///
	/// Implementation-defined, as for [`read`](Reader::read).
	fn len(&mut self) -> Result<u64>;
}

impl<R> Reader for R
where
	R: Read + Seek,
{
	fn read(&mut self, dest: &mut [u8], seek: SeekRequest) -> Result<usize> {
		if let Some(seek_from) = seek.to_seek_from() {
			self.seek(seek_from)?;
		}

		Ok(Read::read(self, dest)?)
	}

	// TODO: use Seek::stream_len() once stabilized (rust-lang/rust#59359)
	fn len(&mut self) -> Result<u64> {
		let current_pos = self.stream_position()?;
		let len = self.seek(SeekFrom::End(0))?;

		self.seek(SeekFrom::Start(current_pos))?;

		Ok(len)
	}
}

/// Fills `dest` completely, looping over short reads
///
/// Errors with `NoMoreData` if the stream ends before `dest` is full.
pub(crate) fn read_fully<R>(reader: &mut R, dest: &mut [u8], seek: SeekRequest) -> Result<()>
where
	R: Reader + ?Sized,
{
	let mut seek = seek;
	let mut filled = 0;

	while filled < dest.len() {
		let count = reader.read(
			&mut dest[filled..],
			std::mem::replace(&mut seek, SeekRequest::None),
		)?;
		if count == 0 {
			err!(NoMoreData);
		}

		filled += count;
	}

	Ok(())
}
