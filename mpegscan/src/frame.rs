use crate::buffer::ByteBuffer;
use crate::header::FrameHeader;

// The scanner rotates through this many frame slots, so buffers warmed up by
// earlier frames are reused instead of reallocated.
pub(crate) const FRAME_POOL_SIZE: usize = 4;

// One audio frame as read so far: its bytes, where it sits in the stream, and
// the decoded header once one has been accepted.
pub(crate) struct Frame {
	pub(crate) buf: ByteBuffer,
	pub(crate) file_position: u64,
	pub(crate) header: Option<FrameHeader>,
	pub(crate) valid: bool,
}

impl Frame {
	pub(crate) const fn new() -> Self {
		Self {
			buf: ByteBuffer::new(),
			file_position: 0,
			header: None,
			valid: false,
		}
	}

	// Resets everything but the buffer capacity
	pub(crate) fn clear(&mut self) {
		self.buf.clear();
		self.file_position = 0;
		self.header = None;
		self.valid = false;
	}

	// Whole frame length in bytes, zero until a header has been accepted
	pub(crate) fn len(&self) -> u32 {
		self.header.map_or(0, |header| header.len)
	}
}
