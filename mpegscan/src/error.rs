//! Contains the errors that can arise while scanning a stream
//!
//! The primary error is [`ScanError`]. The type of error is determined by [`ErrorKind`].

use std::collections::TryReserveError;
use std::fmt::{Debug, Display, Formatter};

/// Alias for `Result<T, ScanError>`
pub type Result<T> = std::result::Result<T, ScanError>;

/// The frame header field that disagreed between two consecutive frames
///
/// Everything but the bitrate must stay constant across a stream; a
/// bitrate-only disagreement marks the stream as VBR instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum MismatchKind {
	ChannelMode,
	Layer,
	Version,
	Emphasis,
	SampleRate,
}

/// The types of errors that can occur
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
	// Reader related conditions
	/// The reader reached the end of the stream
	NoMoreData,
	/// A buffer reached its growth ceiling
	BufferFull,
	/// No ID3v2 tag was present at the start of the stream
	///
	/// This is informational; the scanner absorbs it internally (a missing
	/// tag is the normal case). It exists for custom [`Reader`](crate::reader::Reader)
	/// implementations that need to report the condition themselves.
	NoId3v2Tag,
	/// More bytes are needed before a frame can be completed
	///
	/// Retryable; it only escapes if the reader can make no further progress.
	NeedMoreData,
	/// The stream ended in the middle of an item
	DataIncomplete,

	// Frame header decoding errors
	/// The header uses the reserved MPEG version
	BadVersion,
	/// The header uses the reserved layer
	BadLayer,
	/// The header uses the free/bad bitrate index
	BadBitrate,
	/// The header uses the reserved sample rate index
	BadSampleRate,
	/// The header channel mode does not map to a known mode
	BadChannelMode,
	/// The header emphasis does not map to a known emphasis
	BadEmphasis,

	// Scanning errors
	/// No frame sync could be found in the searched window
	LostSync,
	/// The audio payload region is too small to contain a meaningful frame
	TinyFile,
	/// A frame was chained onto a frame that was never validated
	PreviousFrameInvalid,
	/// Two consecutive frames disagree on a property other than bitrate
	FrameMismatch(MismatchKind),

	// Conversions for external errors
	/// Failure to allocate enough memory
	OutOfMemory(TryReserveError),
	/// Represents all cases of [`std::io::Error`].
	Io(std::io::Error),
}

/// Errors that could occur within mpegscan
pub struct ScanError {
	pub(crate) kind: ErrorKind,
}

impl ScanError {
	/// Create a `ScanError` from an [`ErrorKind`]
	///
	/// # Examples
	///
	/// ```rust
	/// use mpegscan::error::{ErrorKind, ScanError};
	///
	/// let lost_sync = ScanError::new(ErrorKind::LostSync);
	/// ```
	#[must_use]
	pub const fn new(kind: ErrorKind) -> Self {
		Self { kind }
	}

	/// Returns the [`ErrorKind`]
	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}

	// The conditions `parse()` remaps to a clean end of stream
	pub(crate) fn is_end_of_stream(&self) -> bool {
		matches!(self.kind, ErrorKind::NoMoreData | ErrorKind::DataIncomplete)
	}
}

impl std::error::Error for ScanError {}

impl Debug for ScanError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}", self.kind)
	}
}

impl From<std::io::Error> for ScanError {
	fn from(input: std::io::Error) -> Self {
		Self {
			kind: ErrorKind::Io(input),
		}
	}
}

impl From<TryReserveError> for ScanError {
	fn from(input: TryReserveError) -> Self {
		Self {
			kind: ErrorKind::OutOfMemory(input),
		}
	}
}

impl Display for ScanError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self.kind {
			// Conversions
			ErrorKind::OutOfMemory(ref err) => write!(f, "{err}"),
			ErrorKind::Io(ref err) => write!(f, "{err}"),

			ErrorKind::NoMoreData => write!(f, "Reader: No more data to read"),
			ErrorKind::BufferFull => write!(f, "Buffer reached its growth ceiling"),
			ErrorKind::NoId3v2Tag => write!(f, "No ID3v2 tag at the start of the stream"),
			ErrorKind::NeedMoreData => write!(f, "More data is needed to complete the frame"),
			ErrorKind::DataIncomplete => write!(f, "The stream ended in the middle of an item"),

			ErrorKind::BadVersion => write!(f, "Frame header uses a reserved MPEG version"),
			ErrorKind::BadLayer => write!(f, "Frame header uses a reserved layer"),
			ErrorKind::BadBitrate => write!(f, "Frame header uses an invalid bitrate index"),
			ErrorKind::BadSampleRate => {
				write!(f, "Frame header uses a reserved sample rate index")
			},
			ErrorKind::BadChannelMode => write!(f, "Frame header uses an unknown channel mode"),
			ErrorKind::BadEmphasis => write!(f, "Frame header uses an unknown emphasis"),

			ErrorKind::LostSync => write!(f, "Unable to locate a frame sync"),
			ErrorKind::TinyFile => write!(
				f,
				"Audio payload region is too small to contain a meaningful frame"
			),
			ErrorKind::PreviousFrameInvalid => {
				write!(f, "Attempted to chain a frame onto an unvalidated frame")
			},
			ErrorKind::FrameMismatch(kind) => {
				write!(f, "Consecutive frames disagree on {kind:?}")
			},
		}
	}
}
