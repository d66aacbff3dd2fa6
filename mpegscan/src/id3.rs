//! ID3 tag boundary detection
//!
//! Only enough of ID3 is understood here to measure where the tags end and the
//! audio payload begins; no frame/field content is ever parsed.

use crate::error::{ErrorKind, Result};
use crate::reader::{Reader, SeekRequest, read_fully};

use std::ops::Range;

pub(crate) const ID3V2_HEADER_SIZE: usize = 10;
// Tags claiming to be larger than this are considered corrupt and ignored
pub(crate) const ID3V2_MAX_SIZE: u32 = 1024 * 1024;

pub(crate) const ID3V1_TAG_SIZE: usize = 128;
const ID3V1_TAG_MARKER: [u8; 3] = *b"TAG";

/// The 10-byte header leading an ID3v2 tag
#[derive(Copy, Clone, Debug)]
pub struct Id3v2Header {
	/// Tag version as `(major, minor)`
	pub version: (u8, u8),
	/// Raw header flags
	pub flags: u8,
	/// The size of the tag **including** this header, in bytes
	///
	/// Zero when the size field was empty or failed the sanity ceiling.
	pub total_size: u32,
}

/// The fixed 128-byte ID3v1 trailer
///
/// Fields are carried as raw bytes; ID3v1 predates any notion of text encoding,
/// so interpretation is left to the caller.
#[derive(Copy, Clone, Debug)]
#[allow(missing_docs)]
pub struct Id3v1Tag {
	pub title: [u8; 30],
	pub artist: [u8; 30],
	pub album: [u8; 30],
	pub year: [u8; 4],
	pub comment: [u8; 30],
	pub genre: u8,
}

// Decodes an ID3v2 sync-safe integer: 4 bytes, low 7 bits each, big-endian
pub(crate) fn decode_syncsafe(bytes: [u8; 4]) -> u32 {
	let mut size = 0u32;
	for (i, byte) in bytes.iter().enumerate() {
		size |= u32::from(byte & 0x7F) << ((3 - i) * 7);
	}

	size
}

/// Reads the leading ID3v2 header, if one is present
///
/// A missing tag is the normal case and returns `Ok(None)`, as does a stream too
/// short to hold the 10 header bytes.
///
/// # Errors
///
/// Propagates reader failures other than end-of-stream.
pub fn read_id3v2_header<R>(reader: &mut R) -> Result<Option<Id3v2Header>>
where
	R: Reader + ?Sized,
{
	let mut header = [0; ID3V2_HEADER_SIZE];
	match read_fully(reader, &mut header, SeekRequest::FromStart(0)) {
		Ok(()) => {},
		Err(e) if matches!(e.kind(), ErrorKind::NoMoreData) => return Ok(None),
		Err(e) => return Err(e),
	}

	if &header[..3] != b"ID3" {
		log::debug!("No ID3v2 tag at the start of the stream");
		return Ok(None);
	}

	let mut total_size = decode_syncsafe([header[6], header[7], header[8], header[9]]);
	if total_size != 0 {
		total_size += ID3V2_HEADER_SIZE as u32;
	}

	if total_size > ID3V2_MAX_SIZE {
		log::warn!("ID3v2 tag claims an absurd size ({total_size}), ignoring it");
		total_size = 0;
	}

	Ok(Some(Id3v2Header {
		version: (header[3], header[4]),
		flags: header[5],
		total_size,
	}))
}

/// Reads the trailing ID3v1 tag, if one is present
///
/// # Errors
///
/// Propagates reader failures; a stream shorter than 128 bytes simply has no tag.
pub fn find_id3v1<R>(reader: &mut R, stream_len: u64) -> Result<Option<Id3v1Tag>>
where
	R: Reader + ?Sized,
{
	if stream_len < ID3V1_TAG_SIZE as u64 {
		return Ok(None);
	}

	let mut tag = [0; ID3V1_TAG_SIZE];
	read_fully(
		reader,
		&mut tag,
		SeekRequest::FromEnd(-(ID3V1_TAG_SIZE as i64)),
	)?;

	if tag[..3] != ID3V1_TAG_MARKER {
		return Ok(None);
	}

	log::debug!("Found an ID3v1 tag");

	let mut parsed = Id3v1Tag {
		title: [0; 30],
		artist: [0; 30],
		album: [0; 30],
		year: [0; 4],
		comment: [0; 30],
		genre: tag[127],
	};
	parsed.title.copy_from_slice(&tag[3..33]);
	parsed.artist.copy_from_slice(&tag[33..63]);
	parsed.album.copy_from_slice(&tag[63..93]);
	parsed.year.copy_from_slice(&tag[93..97]);
	parsed.comment.copy_from_slice(&tag[97..127]);

	Ok(Some(parsed))
}

// The region of the stream that may contain audio frames, tags excluded
pub(crate) fn audio_payload_bounds(
	id3v2_total_size: u32,
	id3v1_present: bool,
	stream_len: u64,
) -> Range<u64> {
	let start = u64::from(id3v2_total_size).min(stream_len);
	let mut end = stream_len;
	if id3v1_present {
		end -= ID3V1_TAG_SIZE as u64;
	}

	start..end.max(start)
}
