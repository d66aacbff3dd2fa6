//! The MPEG frame header codec
//!
//! Everything here is pure: a 4-byte header word goes in, decoded stream
//! properties come out. The scanner owns all of the I/O.

use crate::error::{MismatchKind, Result};
use crate::macros::err;

/// Size of a frame header in bytes
pub const MPEG_HEADER_SIZE: usize = 4;

// Bitrates in kbps, indexed by [version][layer][bitrate_index].
//
// MPEG 2 and 2.5 share one set of tables, with Layer III reusing the Layer II
// values. Index 0 (free) and index 15 (bad) are rejected before lookup.
const BITRATES: [[[u32; 16]; 3]; 2] = [
	[
		// Version 1
		[
			0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0,
		],
		[
			0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0,
		],
		[
			0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
		],
	],
	[
		// Versions 2 and 2.5
		[
			0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0,
		],
		[0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
		[0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
	],
];

// Sample rates in Hz, indexed by [version][sample_rate_index]; index 3 is reserved.
const SAMPLE_RATES: [[u32; 4]; 3] = [
	[44100, 48000, 32000, 0],
	[22050, 24000, 16000, 0],
	[11025, 12000, 8000, 0],
];

// Samples per frame, indexed by [version][layer]
const SAMPLES: [[u16; 3]; 2] = [[384, 1152, 1152], [384, 1152, 576]];

/// MPEG audio version
#[derive(Default, PartialEq, Eq, Copy, Clone, Debug)]
#[allow(missing_docs)]
pub enum MpegVersion {
	#[default]
	V1,
	V2,
	V2_5,
}

/// MPEG layer
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Layer {
	Layer1 = 1,
	Layer2 = 2,
	#[default]
	Layer3 = 3,
}

/// Channel mode
#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
#[allow(missing_docs)]
pub enum ChannelMode {
	#[default]
	Stereo = 0,
	JointStereo = 1,
	/// Two independent mono channels
	DualChannel = 2,
	SingleChannel = 3,
}

/// A rarely-used decoder hint that the file must be de-emphasized
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[allow(missing_docs, non_camel_case_types)]
pub enum Emphasis {
	/// 50/15 ms
	MS5015,
	Reserved,
	/// CCIT J.17
	CCIT_J17,
}

/// The decoded properties of a single frame header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
	pub(crate) version: MpegVersion,
	pub(crate) layer: Layer,
	pub(crate) bitrate: u32,
	pub(crate) sample_rate: u32,
	pub(crate) padding: bool,
	pub(crate) has_crc: bool,
	pub(crate) copyright: bool,
	pub(crate) channel_mode: ChannelMode,
	pub(crate) emphasis: Option<Emphasis>,
	pub(crate) len: u32,
	pub(crate) samples: u16,
}

impl FrameHeader {
	/// Decodes a big-endian header word already positioned at a sync point
	///
	/// # Errors
	///
	/// One of `BadVersion`, `BadLayer`, `BadBitrate`, `BadSampleRate`,
	/// `BadChannelMode`, or `BadEmphasis`, identifying the first field that
	/// failed to decode. The caller decides whether to resync at the next byte.
	pub fn read(data: u32) -> Result<Self> {
		let version = match (data >> 19) & 0b11 {
			0b00 => MpegVersion::V2_5,
			0b10 => MpegVersion::V2,
			0b11 => MpegVersion::V1,
			_ => {
				log::debug!("Frame header uses a reserved MPEG version");
				err!(BadVersion);
			},
		};

		let version_index = if version == MpegVersion::V1 { 0 } else { 1 };

		let layer = match (data >> 17) & 0b11 {
			0b01 => Layer::Layer3,
			0b10 => Layer::Layer2,
			0b11 => Layer::Layer1,
			_ => {
				log::debug!("Frame header uses a reserved layer");
				err!(BadLayer);
			},
		};

		let layer_index = (layer as usize) - 1;

		// The bit is a *protection* flag: 0 means a CRC follows the header
		let has_crc = (data >> 16) & 1 == 0;

		let bitrate_index = ((data >> 12) & 0xF) as usize;
		if bitrate_index == 0 || bitrate_index == 15 {
			err!(BadBitrate);
		}
		let bitrate = BITRATES[version_index][layer_index][bitrate_index] * 1000;

		let sample_rate_index = ((data >> 10) & 0b11) as usize;
		if sample_rate_index == 3 {
			err!(BadSampleRate);
		}
		let sample_rate = SAMPLE_RATES[version as usize][sample_rate_index];

		let padding = (data >> 9) & 1 == 1;

		let channel_mode = match (data >> 6) & 0b11 {
			0b00 => ChannelMode::Stereo,
			0b01 => ChannelMode::JointStereo,
			0b10 => ChannelMode::DualChannel,
			0b11 => ChannelMode::SingleChannel,
			_ => err!(BadChannelMode),
		};

		let copyright = (data >> 3) & 1 == 1;

		let emphasis = match data & 0b11 {
			0b00 => None,
			0b01 => Some(Emphasis::MS5015),
			0b10 => Some(Emphasis::Reserved),
			0b11 => Some(Emphasis::CCIT_J17),
			_ => err!(BadEmphasis),
		};

		let padding_slots = u32::from(padding);
		let len = match (layer, version) {
			(Layer::Layer1, _) => (12 * bitrate / sample_rate + padding_slots) * 4,
			(Layer::Layer3, MpegVersion::V2 | MpegVersion::V2_5) => {
				72 * bitrate / sample_rate + padding_slots
			},
			_ => 144 * bitrate / sample_rate + padding_slots,
		};

		let samples = SAMPLES[version_index][layer_index];

		Ok(Self {
			version,
			layer,
			bitrate,
			sample_rate,
			padding,
			has_crc,
			copyright,
			channel_mode,
			emphasis,
			len,
			samples,
		})
	}

	/// MPEG version
	pub fn version(&self) -> MpegVersion {
		self.version
	}

	/// MPEG layer
	pub fn layer(&self) -> Layer {
		self.layer
	}

	/// Bitrate (bps)
	pub fn bitrate(&self) -> u32 {
		self.bitrate
	}

	/// Sample rate (Hz)
	pub fn sample_rate(&self) -> u32 {
		self.sample_rate
	}

	/// Whether the frame carries a padding slot
	pub fn has_padding(&self) -> bool {
		self.padding
	}

	/// Whether a CRC-16 follows the header
	pub fn has_crc(&self) -> bool {
		self.has_crc
	}

	/// Whether the audio is copyrighted
	pub fn is_copyright(&self) -> bool {
		self.copyright
	}

	/// Channel mode
	pub fn channel_mode(&self) -> ChannelMode {
		self.channel_mode
	}

	/// See [`Emphasis`]
	pub fn emphasis(&self) -> Option<Emphasis> {
		self.emphasis
	}

	/// The whole frame length in bytes, header and padding slot included
	pub fn frame_length(&self) -> u32 {
		self.len
	}

	/// The number of audio samples the frame encodes
	pub fn samples_per_frame(&self) -> u16 {
		self.samples
	}

	/// Channel count (2 for every mode except `SingleChannel`)
	pub fn channels(&self) -> u8 {
		if self.channel_mode == ChannelMode::SingleChannel {
			1
		} else {
			2
		}
	}

	/// Playback duration of one frame, in whole milliseconds
	pub fn duration_ms(&self) -> u64 {
		(1000.0 * f64::from(self.samples) / f64::from(self.sample_rate)) as u64
	}

	// Compares everything but the bitrate against a sibling frame, in
	// priority order. A `None` result still permits a bitrate difference,
	// which the scanner treats as VBR rather than corruption.
	pub(crate) fn mismatch(&self, other: &Self) -> Option<MismatchKind> {
		if self.channel_mode != other.channel_mode {
			return Some(MismatchKind::ChannelMode);
		}
		if self.layer != other.layer {
			return Some(MismatchKind::Layer);
		}
		if self.version != other.version {
			return Some(MismatchKind::Version);
		}
		if self.emphasis != other.emphasis {
			return Some(MismatchKind::Emphasis);
		}
		if self.sample_rate != other.sample_rate {
			return Some(MismatchKind::SampleRate);
		}

		None
	}
}

/// Whether two bytes form a frame sync (11 set bits)
pub(crate) fn verify_frame_sync(frame_sync: [u8; 2]) -> bool {
	frame_sync[0] == 0xFF && frame_sync[1] >> 5 == 0b111
}

// Searches for a frame sync in the buffered bytes.
//
// The search moves in 8 bit steps, i.e. the sync must be byte aligned, and
// returns the index of the first match relative to the start of the slice.
pub(crate) fn find_sync(data: &[u8]) -> Option<usize> {
	data.windows(2)
		.position(|pair| verify_frame_sync([pair[0], pair[1]]))
}

#[cfg(test)]
mod tests {
	use super::{ChannelMode, FrameHeader, Layer, MpegVersion, find_sync};
	use crate::error::ErrorKind;

	#[test_log::test]
	fn decode_typical_layer3_header() {
		// 128 kbps, 44.1 kHz joint stereo, the most common header in the wild
		let header = FrameHeader::read(u32::from_be_bytes([0xFF, 0xFB, 0x90, 0x64])).unwrap();

		assert_eq!(header.version(), MpegVersion::V1);
		assert_eq!(header.layer(), Layer::Layer3);
		assert_eq!(header.bitrate(), 128_000);
		assert_eq!(header.sample_rate(), 44100);
		assert!(!header.has_padding());
		assert!(!header.has_crc());
		assert!(!header.is_copyright());
		assert_eq!(header.channel_mode(), ChannelMode::JointStereo);
		assert_eq!(header.emphasis(), None);

		// 144 * 128000 / 44100, truncating
		assert_eq!(header.frame_length(), 417);
		assert_eq!(header.samples_per_frame(), 1152);
		assert_eq!(header.channels(), 2);
		// 1152 samples at 44.1 kHz
		assert_eq!(header.duration_ms(), 26);
	}

	#[test_log::test]
	fn decode_rejections() {
		// Reserved version (bits 20-19 == 01)
		let err = FrameHeader::read(u32::from_be_bytes([0xFF, 0xEB, 0x90, 0x64])).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::BadVersion));

		// Reserved layer (bits 18-17 == 00)
		let err = FrameHeader::read(u32::from_be_bytes([0xFF, 0xF9, 0x90, 0x64])).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::BadLayer));

		// Free bitrate (index 0)
		let err = FrameHeader::read(u32::from_be_bytes([0xFF, 0xFB, 0x00, 0x64])).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::BadBitrate));

		// Bad bitrate (index 15)
		let err = FrameHeader::read(u32::from_be_bytes([0xFF, 0xFB, 0xF0, 0x64])).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::BadBitrate));

		// Reserved sample rate (index 3)
		let err = FrameHeader::read(u32::from_be_bytes([0xFF, 0xFB, 0x9C, 0x64])).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::BadSampleRate));
	}

	#[test_log::test]
	fn layer_version_length_formulas() {
		// V1 Layer I, 448 kbps @ 32 kHz, padded: (12 * 448000 / 32000 + 1) * 4
		let header = FrameHeader::read(u32::from_be_bytes([0xFF, 0xFF, 0xEA, 0x64])).unwrap();
		assert_eq!(header.layer(), Layer::Layer1);
		assert_eq!(header.frame_length(), 676);
		assert_eq!(header.samples_per_frame(), 384);

		// V2.5 Layer III, 64 kbps @ 11025 Hz: 72 * 64000 / 11025
		let header = FrameHeader::read(u32::from_be_bytes([0xFF, 0xE3, 0x80, 0x64])).unwrap();
		assert_eq!(header.version(), MpegVersion::V2_5);
		assert_eq!(header.frame_length(), 417);
		assert_eq!(header.samples_per_frame(), 576);
	}

	#[test_log::test]
	fn sync_never_found_at_the_wrong_offset() {
		assert_eq!(find_sync(&[0x00, 0xFF, 0xE1, 0x00]), Some(1));
		assert_eq!(find_sync(&[0xFF, 0xFB, 0x90, 0x64]), Some(0));
		assert_eq!(find_sync(&[0xFF, 0x1F, 0xFF, 0x00]), None);
		assert_eq!(find_sync(&[0x01, 0xFF]), None);
	}
}
