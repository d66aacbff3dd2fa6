//! The stateful frame synchronization engine
//!
//! A [`Scanner`] walks a stream once: it measures the tag boundaries, hunts down
//! the first frame sync, then chains frame after frame by computed position,
//! cross-validating each against its predecessor. Nothing is decoded beyond the
//! 4-byte headers; the product is an inventory of the stream.

use crate::buffer::MAX_BUFFER_CAPACITY;
use crate::config::{MismatchPolicy, ScanOptions};
use crate::error::Result;
use crate::frame::{FRAME_POOL_SIZE, Frame};
use crate::header::{
	self, ChannelMode, Emphasis, FrameHeader, Layer, MPEG_HEADER_SIZE, MpegVersion,
};
use crate::id3;
use crate::macros::err;
use crate::reader::{Reader, SeekRequest};

use std::ops::Range;
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};

// A payload region at or below this cannot hold a meaningful frame sequence
const MIN_AUDIO_PAYLOAD: u64 = 512;

// How much to request from the reader per fill
const READ_CHUNK: usize = 1024;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
	Init,
	LocatingTags,
	SeekingFirstFrame,
	Streaming,
	Done,
	Failed,
}

/// The validated inventory of a scanned stream
///
/// Format properties are those of the first accepted frame; for a VBR stream,
/// [`bitrate`](StreamInfo::bitrate) is therefore only the first frame's rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct StreamInfo {
	pub(crate) frame_count: u32,
	pub(crate) duration: Duration,
	pub(crate) vbr: bool,
	pub(crate) version: MpegVersion,
	pub(crate) layer: Layer,
	pub(crate) channel_mode: ChannelMode,
	pub(crate) emphasis: Option<Emphasis>,
	pub(crate) copyright: bool,
	pub(crate) has_crc: bool,
	pub(crate) sample_rate: u32,
	pub(crate) bitrate: u32,
	pub(crate) channels: u8,
}

impl StreamInfo {
	/// Number of validated frames
	pub fn frame_count(&self) -> u32 {
		self.frame_count
	}

	/// Total playback duration
	pub fn duration(&self) -> Duration {
		self.duration
	}

	/// Whether the frames disagreed on bitrate
	pub fn is_vbr(&self) -> bool {
		self.vbr
	}

	/// MPEG version
	pub fn version(&self) -> MpegVersion {
		self.version
	}

	/// MPEG layer
	pub fn layer(&self) -> Layer {
		self.layer
	}

	/// Channel mode
	pub fn channel_mode(&self) -> ChannelMode {
		self.channel_mode
	}

	/// See [`Emphasis`]
	pub fn emphasis(&self) -> Option<Emphasis> {
		self.emphasis
	}

	/// Whether the audio is copyrighted
	pub fn is_copyright(&self) -> bool {
		self.copyright
	}

	/// Whether frames carry a CRC-16
	pub fn has_crc(&self) -> bool {
		self.has_crc
	}

	/// Sample rate (Hz)
	pub fn sample_rate(&self) -> u32 {
		self.sample_rate
	}

	/// Bitrate of the first frame (bps)
	pub fn bitrate(&self) -> u32 {
		self.bitrate
	}

	/// Channel count
	pub fn channels(&self) -> u8 {
		self.channels
	}
}

/// The frame synchronization engine; one instance scans one stream
pub struct Scanner {
	options: ScanOptions,
	state: State,
	frames: [Frame; FRAME_POOL_SIZE],
	current: usize,
	frame_count: u32,
	vbr: bool,
	first_header: Option<FrameHeader>,
	payload: Range<u64>,
	// Stream offset of the first byte not yet pulled into any buffer
	pos: u64,
}

impl Scanner {
	/// Creates a scanner for a single stream
	#[must_use]
	pub fn new(options: ScanOptions) -> Self {
		Self {
			options,
			state: State::Init,
			frames: [Frame::new(), Frame::new(), Frame::new(), Frame::new()],
			current: 0,
			frame_count: 0,
			vbr: false,
			first_header: None,
			payload: 0..0,
			pos: 0,
		}
	}

	/// Scans the stream to completion and returns its inventory
	///
	/// The end of the stream is not an error: a stream that simply stops at (or
	/// even inside) its final frame parses cleanly.
	///
	/// # Errors
	///
	/// * [`ErrorKind::TinyFile`](crate::error::ErrorKind::TinyFile) if, after tag accounting, no meaningful payload remains
	/// * [`ErrorKind::LostSync`](crate::error::ErrorKind::LostSync) if no valid first frame exists within the junk window
	/// * [`ErrorKind::FrameMismatch`](crate::error::ErrorKind::FrameMismatch) under [`MismatchPolicy::Fail`]
	/// * Any decode error from the first frame candidate window, or reader/buffer failures
	pub fn parse<R>(mut self, reader: &mut R) -> Result<StreamInfo>
	where
		R: Reader + ?Sized,
	{
		let result = self.run(reader);
		if result.is_err() {
			self.state = State::Failed;
		}

		result
	}

	// The single dispatch loop driving the state machine
	fn run<R>(&mut self, reader: &mut R) -> Result<StreamInfo>
	where
		R: Reader + ?Sized,
	{
		loop {
			match self.state {
				State::Init => self.state = State::LocatingTags,
				State::LocatingTags => self.locate_tags(reader)?,
				State::SeekingFirstFrame => self.seek_first_frame(reader)?,
				State::Streaming => match self.next_frame(reader) {
					Ok(true) => {},
					Ok(false) => self.state = State::Done,
					Err(e) if e.is_end_of_stream() => {
						// Running out of bytes while chaining frames is a clean finish
						self.state = State::Done;
					},
					Err(e) => return Err(e),
				},
				State::Done => return self.inventory(),
				State::Failed => err!(PreviousFrameInvalid),
			}
		}
	}

	fn locate_tags<R>(&mut self, reader: &mut R) -> Result<()>
	where
		R: Reader + ?Sized,
	{
		let stream_len = reader.len()?;

		let id3v2_total = id3::read_id3v2_header(reader)?.map_or(0, |header| header.total_size);
		let id3v1 = id3::find_id3v1(reader, stream_len)?;

		self.payload = id3::audio_payload_bounds(id3v2_total, id3v1.is_some(), stream_len);
		let payload_len = self.payload.end - self.payload.start;
		log::debug!("Audio payload spans {:?} ({payload_len} bytes)", self.payload);

		if payload_len <= MIN_AUDIO_PAYLOAD {
			err!(TinyFile);
		}

		self.pos = self.payload.start;
		self.state = State::SeekingFirstFrame;
		Ok(())
	}

	fn seek_first_frame<R>(&mut self, reader: &mut R) -> Result<()>
	where
		R: Reader + ?Sized,
	{
		let slot = 0;
		self.frames[slot].clear();

		let mut junk_scanned: usize = 0;

		loop {
			if !self.ensure_bytes(reader, slot, MPEG_HEADER_SIZE)? {
				// Ran out of payload without ever finding a frame
				err!(LostSync);
			}

			let data = self.frames[slot].buf.data();
			let Some(sync_offset) = header::find_sync(data) else {
				// All junk; keep the final byte in case a sync straddles the refill
				let size = self.frames[slot].buf.size();
				junk_scanned += size - 1;
				if junk_scanned > self.options.max_junk_bytes {
					err!(LostSync);
				}

				self.frames[slot].buf.consume(size - 1);
				continue;
			};

			junk_scanned += sync_offset;
			if junk_scanned > self.options.max_junk_bytes {
				err!(LostSync);
			}
			if sync_offset > 0 {
				self.frames[slot].buf.consume(sync_offset);
			}

			// The sync may sit close to the end of the buffered bytes
			if !self.ensure_bytes(reader, slot, MPEG_HEADER_SIZE)? {
				err!(LostSync);
			}

			let word = BigEndian::read_u32(&self.frames[slot].buf.data()[..MPEG_HEADER_SIZE]);
			match FrameHeader::read(word) {
				Ok(first_header) => {
					if !self.ensure_bytes(reader, slot, first_header.len as usize)? {
						// A first frame that can't be completed is no frame at all
						err!(LostSync);
					}

					let position = self.pos - self.frames[slot].buf.size() as u64;

					let frame = &mut self.frames[slot];
					frame.file_position = position;
					frame.header = Some(first_header);
					frame.valid = true;

					log::debug!("First frame accepted at offset {position}");

					self.current = slot;
					self.frame_count = 1;
					self.first_header = Some(first_header);
					self.state = State::Streaming;
					return Ok(());
				},
				Err(e) => {
					// A false sync; advance one byte and keep hunting
					log::debug!("Rejected frame candidate: {e}");

					junk_scanned += 1;
					if junk_scanned > self.options.max_junk_bytes {
						err!(LostSync);
					}

					self.frames[slot].buf.consume(1);
				},
			}
		}
	}

	// Chains one more frame onto the previous one. `Ok(false)` means the stream
	// ended cleanly at (or in the trailing shadow of) a frame boundary.
	fn next_frame<R>(&mut self, reader: &mut R) -> Result<bool>
	where
		R: Reader + ?Sized,
	{
		let prev = self.current;
		let (Some(prev_header), true) = (self.frames[prev].header, self.frames[prev].valid) else {
			err!(PreviousFrameInvalid);
		};

		let prev_len = self.frames[prev].len() as usize;
		let next_position = self.frames[prev].file_position + prev_len as u64;
		if next_position >= self.payload.end {
			return Ok(false);
		}

		let slot = (prev + 1) % FRAME_POOL_SIZE;

		// Carry bytes already buffered past the previous frame's boundary
		// instead of re-reading them
		{
			let (prev_frame, next_frame) = two_slots(&mut self.frames, prev, slot);
			next_frame.clear();
			if prev_frame.buf.size() > prev_len {
				next_frame.buf.append(&prev_frame.buf.data()[prev_len..])?;
			}
			next_frame.file_position = next_position;
		}

		let mut resync_scanned: usize = 0;

		loop {
			if !self.ensure_bytes(reader, slot, MPEG_HEADER_SIZE)? {
				return Ok(false);
			}

			// Field bits alone can decode plausibly by accident; the chained
			// position must hold an actual sync word before anything else
			let decoded = {
				let data = self.frames[slot].buf.data();
				if header::verify_frame_sync([data[0], data[1]]) {
					FrameHeader::read(BigEndian::read_u32(&data[..MPEG_HEADER_SIZE])).ok()
				} else {
					None
				}
			};

			match decoded {
				Some(next_header) => {
					match prev_header.mismatch(&next_header) {
						Some(kind) => match self.options.mismatch_policy {
							MismatchPolicy::Fail => err!(FrameMismatch(kind)),
							MismatchPolicy::Skip => {
								log::warn!(
									"Consecutive frames disagree on {kind:?}, continuing anyway"
								);
							},
						},
						None => {
							if next_header.bitrate != prev_header.bitrate && !self.vbr {
								log::debug!("Bitrate changed between frames; stream is VBR");
								self.vbr = true;
							}
						},
					}

					// Pull in the rest of the frame. A truncated final frame
					// still counts; the stream just ends inside it.
					self.ensure_bytes(reader, slot, next_header.len as usize)?;

					let position = self.pos - self.frames[slot].buf.size() as u64;

					let frame = &mut self.frames[slot];
					frame.file_position = position;
					frame.header = Some(next_header);
					frame.valid = true;

					self.current = slot;
					self.frame_count += 1;
					return Ok(true);
				},
				None => {
					// Sync recovery: hunt byte-by-byte for the next plausible sync
					let data = self.frames[slot].buf.data();
					let skip = match header::find_sync(&data[1..]) {
						Some(offset) => offset + 1,
						None => data.len() - 1,
					};

					resync_scanned += skip;
					if resync_scanned > MAX_BUFFER_CAPACITY {
						err!(LostSync);
					}

					self.frames[slot].buf.consume(skip);
				},
			}
		}
	}

	// Grows a slot's buffered bytes to at least `need`, returning false if the
	// payload region runs out first
	fn ensure_bytes<R>(&mut self, reader: &mut R, slot: usize, need: usize) -> Result<bool>
	where
		R: Reader + ?Sized,
	{
		while self.frames[slot].buf.size() < need {
			let missing = need - self.frames[slot].buf.size();
			if self.fill(reader, slot, missing.max(READ_CHUNK))? == 0 {
				return Ok(false);
			}
		}

		Ok(true)
	}

	// Appends up to `want` bytes from the stream into a slot's buffer, never
	// reading past the end of the audio payload
	fn fill<R>(&mut self, reader: &mut R, slot: usize, want: usize) -> Result<usize>
	where
		R: Reader + ?Sized,
	{
		let remaining = self.payload.end.saturating_sub(self.pos);
		let want = want.min(remaining as usize);
		if want == 0 {
			return Ok(0);
		}

		let pos = self.pos;
		let buf = &mut self.frames[slot].buf;
		let old_size = buf.size();
		buf.resize(old_size + want)?;

		let count = reader.read(&mut buf.data_mut()[old_size..], SeekRequest::FromStart(pos))?;
		buf.set_size(old_size + count);
		self.pos += count as u64;

		Ok(count)
	}

	fn inventory(&self) -> Result<StreamInfo> {
		let Some(header) = self.first_header else {
			err!(PreviousFrameInvalid);
		};

		let duration = Duration::from_millis(u64::from(self.frame_count) * header.duration_ms());

		log::debug!(
			"Scan finished: {} frames, {:?}, vbr: {}",
			self.frame_count,
			duration,
			self.vbr
		);

		Ok(StreamInfo {
			frame_count: self.frame_count,
			duration,
			vbr: self.vbr,
			version: header.version,
			layer: header.layer,
			channel_mode: header.channel_mode,
			emphasis: header.emphasis,
			copyright: header.copyright,
			has_crc: header.has_crc,
			sample_rate: header.sample_rate,
			bitrate: header.bitrate,
			channels: header.channels(),
		})
	}
}

// Splits two distinct pool slots out of the array
fn two_slots(frames: &mut [Frame; FRAME_POOL_SIZE], a: usize, b: usize) -> (&mut Frame, &mut Frame) {
	assert!(a != b);
	if a < b {
		let (left, right) = frames.split_at_mut(b);
		(&mut left[a], &mut right[0])
	} else {
		let (left, right) = frames.split_at_mut(a);
		(&mut right[0], &mut left[b])
	}
}

#[cfg(test)]
mod tests {
	use super::Scanner;
	use crate::config::{MismatchPolicy, ScanOptions};
	use crate::error::{ErrorKind, MismatchKind};
	use crate::header::FrameHeader;

	use std::io::Cursor;
	use std::time::Duration;

	// 128 kbps, 44.1 kHz joint stereo; 417 bytes
	const CBR_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
	// Same, at 160 kbps; 522 bytes
	const VBR_HEADER: [u8; 4] = [0xFF, 0xFB, 0xA0, 0x64];
	// Same, at 48 kHz; 384 bytes
	const OTHER_RATE_HEADER: [u8; 4] = [0xFF, 0xFB, 0x94, 0x64];

	fn frame_bytes(header: [u8; 4]) -> Vec<u8> {
		let decoded = FrameHeader::read(u32::from_be_bytes(header)).unwrap();
		let mut bytes = header.to_vec();
		bytes.resize(decoded.frame_length() as usize, 0);
		bytes
	}

	fn scan(data: Vec<u8>) -> crate::error::Result<super::StreamInfo> {
		Scanner::new(ScanOptions::new()).parse(&mut Cursor::new(data))
	}

	#[test_log::test]
	fn clean_eof_with_tags_on_both_ends() {
		let mut data = Vec::new();

		// ID3v2 header claiming 22 content bytes (32 total)
		data.extend_from_slice(&[b'I', b'D', b'3', 3, 0, 0, 0x00, 0x00, 0x00, 0x16]);
		data.resize(32, 0);

		for _ in 0..3 {
			data.extend_from_slice(&frame_bytes(CBR_HEADER));
		}

		let mut id3v1 = vec![0u8; 128];
		id3v1[..3].copy_from_slice(b"TAG");
		data.extend_from_slice(&id3v1);

		let info = scan(data).unwrap();
		assert_eq!(info.frame_count(), 3);
		assert!(!info.is_vbr());
		assert_eq!(info.sample_rate(), 44100);
		assert_eq!(info.bitrate(), 128_000);
		assert_eq!(info.channels(), 2);
		// Three frames of 26ms each
		assert_eq!(info.duration(), Duration::from_millis(78));
	}

	#[test_log::test]
	fn vbr_detection() {
		let mut data = Vec::new();
		data.extend_from_slice(&frame_bytes(CBR_HEADER));
		data.extend_from_slice(&frame_bytes(VBR_HEADER));
		data.extend_from_slice(&frame_bytes(CBR_HEADER));

		let info = scan(data).unwrap();
		assert_eq!(info.frame_count(), 3);
		assert!(info.is_vbr());
		// Properties stay pinned to the first frame
		assert_eq!(info.bitrate(), 128_000);
	}

	#[test_log::test]
	fn sample_rate_drift_aborts_by_default() {
		let mut data = Vec::new();
		data.extend_from_slice(&frame_bytes(CBR_HEADER));
		data.extend_from_slice(&frame_bytes(OTHER_RATE_HEADER));

		let err = scan(data).unwrap_err();
		assert!(matches!(
			err.kind(),
			ErrorKind::FrameMismatch(MismatchKind::SampleRate)
		));
	}

	#[test_log::test]
	fn sample_rate_drift_tolerated_under_skip_policy() {
		let mut data = Vec::new();
		data.extend_from_slice(&frame_bytes(CBR_HEADER));
		data.extend_from_slice(&frame_bytes(OTHER_RATE_HEADER));
		data.extend_from_slice(&frame_bytes(OTHER_RATE_HEADER));

		let options = ScanOptions::new().mismatch_policy(MismatchPolicy::Skip);
		let info = Scanner::new(options).parse(&mut Cursor::new(data)).unwrap();
		assert_eq!(info.frame_count(), 3);
	}

	#[test_log::test]
	fn tiny_file() {
		// A trailing ID3v1 tag shrinks the payload to 472 bytes
		let mut data = frame_bytes(CBR_HEADER);
		data.resize(600 - 128, 0);

		let mut id3v1 = vec![0u8; 128];
		id3v1[..3].copy_from_slice(b"TAG");
		data.extend_from_slice(&id3v1);

		let err = scan(data).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::TinyFile));
	}

	#[test_log::test]
	fn sync_recovery_in_leading_junk() {
		// 0xFF 0xE1 passes the sync check but uses the reserved layer
		let mut data = vec![0x00, 0xFF, 0xE1, 0x00, 0x11];
		data.extend_from_slice(&frame_bytes(CBR_HEADER));
		data.extend_from_slice(&frame_bytes(CBR_HEADER));

		let info = scan(data).unwrap();
		assert_eq!(info.frame_count(), 2);
	}

	#[test_log::test]
	fn syncless_bytes_never_chain_as_a_frame() {
		let mut data = frame_bytes(CBR_HEADER);

		// Field bits identical to CBR_HEADER, but the sync word is absent
		let mut tail = vec![0x00, 0x1B, 0x90, 0x64];
		tail.resize(417, 0);
		data.extend_from_slice(&tail);

		let info = scan(data).unwrap();
		assert_eq!(info.frame_count(), 1);
	}

	#[test_log::test]
	fn truncated_final_frame_still_counts() {
		let mut data = Vec::new();
		data.extend_from_slice(&frame_bytes(CBR_HEADER));
		data.extend_from_slice(&frame_bytes(CBR_HEADER));
		data.extend_from_slice(&frame_bytes(CBR_HEADER)[..100]);

		let info = scan(data).unwrap();
		assert_eq!(info.frame_count(), 3);
	}

	#[test_log::test]
	fn trailing_garbage_is_a_clean_finish() {
		let mut data = Vec::new();
		data.extend_from_slice(&frame_bytes(CBR_HEADER));
		data.extend_from_slice(&frame_bytes(CBR_HEADER));
		data.extend_from_slice(&[0u8; 600]);

		let info = scan(data).unwrap();
		assert_eq!(info.frame_count(), 2);
	}

	#[test_log::test]
	fn lost_sync_without_any_frame() {
		let err = scan(vec![0x55; 600]).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::LostSync));
	}

	#[test_log::test]
	fn junk_window_is_enforced() {
		let mut data = vec![0x55; 1500];
		data.extend_from_slice(&frame_bytes(CBR_HEADER));
		data.extend_from_slice(&frame_bytes(CBR_HEADER));

		let err = scan(data.clone()).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::LostSync));

		let options = ScanOptions::new().max_junk_bytes(4096);
		let info = Scanner::new(options).parse(&mut Cursor::new(data)).unwrap();
		assert_eq!(info.frame_count(), 2);
	}
}
