//! A growable byte store with an inline fast path
//!
//! Frame payloads are usually small enough to live in the inline storage, so the
//! common case of scanning a well-formed Layer III file never allocates per frame.

use crate::error::Result;
use crate::macros::err;

use std::fmt::{Debug, Formatter};

/// Size of the inline storage; contents at or below this size never touch the heap
pub const INLINE_CAPACITY: usize = 1024;

/// Hard ceiling on buffer growth
///
/// The largest frame any header can describe (MPEG 2.5 Layer II, 8000 Hz at
/// 160 kbps with a padding slot) is 2881 bytes, so a frame buffer has no
/// legitimate reason to outgrow this.
pub const MAX_BUFFER_CAPACITY: usize = 4096;

/// A contiguous, growable byte region with a small-buffer fast path
///
/// Shrinking only adjusts the logical size; capacity is never released until the
/// buffer is dropped. Heap growth allocates exactly the requested size rather
/// than amortizing, trading speed for a predictable footprint.
pub struct ByteBuffer {
	inline: [u8; INLINE_CAPACITY],
	heap: Option<Box<[u8]>>,
	size: usize,
}

impl ByteBuffer {
	/// Creates an empty buffer backed by the inline storage
	#[must_use]
	pub const fn new() -> Self {
		Self {
			inline: [0; INLINE_CAPACITY],
			heap: None,
			size: 0,
		}
	}

	/// The logical size in bytes
	pub fn size(&self) -> usize {
		self.size
	}

	/// Whether the buffer holds any bytes
	pub fn is_empty(&self) -> bool {
		self.size == 0
	}

	/// The usable backing storage size
	pub fn capacity(&self) -> usize {
		match self.heap {
			Some(ref heap) => heap.len(),
			None => INLINE_CAPACITY,
		}
	}

	/// The buffer contents
	pub fn data(&self) -> &[u8] {
		&self.storage()[..self.size]
	}

	/// The buffer contents, mutably
	pub fn data_mut(&mut self) -> &mut [u8] {
		let size = self.size;
		&mut self.storage_mut()[..size]
	}

	fn storage(&self) -> &[u8] {
		match self.heap {
			Some(ref heap) => heap,
			None => &self.inline,
		}
	}

	fn storage_mut(&mut self) -> &mut [u8] {
		match self.heap {
			Some(ref mut heap) => heap,
			None => &mut self.inline,
		}
	}

	/// Sets the logical size, growing the backing storage if needed
	///
	/// Newly exposed bytes are zeroed on the first migration to heap storage but
	/// are otherwise unspecified; callers are expected to write them before use.
	///
	/// # Errors
	///
	/// * [`ErrorKind::BufferFull`](crate::error::ErrorKind::BufferFull) past [`MAX_BUFFER_CAPACITY`]
	/// * [`ErrorKind::OutOfMemory`](crate::error::ErrorKind::OutOfMemory) if the allocation fails
	pub fn resize(&mut self, new_size: usize) -> Result<()> {
		if new_size > self.capacity() {
			self.grow(new_size)?;
		}

		self.size = new_size;
		Ok(())
	}

	// Migrates to (or reallocates) heap storage of exactly `new_capacity` bytes
	fn grow(&mut self, new_capacity: usize) -> Result<()> {
		if new_capacity > MAX_BUFFER_CAPACITY {
			err!(BufferFull);
		}

		let mut heap = Vec::new();
		heap.try_reserve_exact(new_capacity)?;
		heap.resize(new_capacity, 0);
		heap[..self.size].copy_from_slice(self.data());

		self.heap = Some(heap.into_boxed_slice());
		Ok(())
	}

	/// Declares how many bytes were actually written by a raw read
	///
	/// Unlike [`resize`](ByteBuffer::resize), this never grows the storage; it
	/// exists so a short read can shrink the logical size back down without
	/// copying anything.
	///
	/// # Panics
	///
	/// Panics if `size` exceeds the current capacity.
	pub fn set_size(&mut self, size: usize) {
		assert!(size <= self.capacity());
		self.size = size;
	}

	/// Appends bytes, growing the backing storage if needed
	///
	/// # Errors
	///
	/// Same as [`resize`](ByteBuffer::resize).
	pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
		let old_size = self.size;
		self.resize(old_size + bytes.len())?;
		self.data_mut()[old_size..].copy_from_slice(bytes);
		Ok(())
	}

	/// Resets the logical size to zero without releasing any storage
	pub fn clear(&mut self) {
		self.size = 0;
	}

	/// Discards `count` bytes from the front, shifting the remainder down
	///
	/// # Panics
	///
	/// Panics if `count` exceeds the logical size.
	pub fn consume(&mut self, count: usize) {
		assert!(count <= self.size);
		self.data_mut().copy_within(count.., 0);
		self.size -= count;
	}
}

impl Default for ByteBuffer {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for ByteBuffer {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ByteBuffer")
			.field("size", &self.size)
			.field("capacity", &self.capacity())
			.field("heap", &self.heap.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::{ByteBuffer, INLINE_CAPACITY, MAX_BUFFER_CAPACITY};
	use crate::error::ErrorKind;

	#[test_log::test]
	fn append_stays_inline_below_threshold() {
		let mut buf = ByteBuffer::new();
		buf.append(&[0xAB; 512]).unwrap();

		assert_eq!(buf.size(), 512);
		assert_eq!(buf.capacity(), INLINE_CAPACITY);
		assert!(buf.data().iter().all(|&b| b == 0xAB));
	}

	#[test_log::test]
	fn growth_migrates_contents_to_heap() {
		let mut buf = ByteBuffer::new();
		buf.append(&[0x11; 1000]).unwrap();
		buf.append(&[0x22; 100]).unwrap();

		assert_eq!(buf.size(), 1100);
		// Exact-size allocation, no amortization
		assert_eq!(buf.capacity(), 1100);
		assert!(buf.data()[..1000].iter().all(|&b| b == 0x11));
		assert!(buf.data()[1000..].iter().all(|&b| b == 0x22));
	}

	#[test_log::test]
	fn capacity_never_decreases() {
		let mut buf = ByteBuffer::new();
		buf.resize(2000).unwrap();
		buf.resize(8).unwrap();

		assert_eq!(buf.size(), 8);
		assert_eq!(buf.capacity(), 2000);

		buf.clear();
		assert_eq!(buf.capacity(), 2000);
	}

	#[test_log::test]
	fn growth_ceiling() {
		let mut buf = ByteBuffer::new();
		buf.resize(MAX_BUFFER_CAPACITY).unwrap();

		let err = buf.resize(MAX_BUFFER_CAPACITY + 1).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::BufferFull));

		// The failed resize must not disturb the logical size
		assert_eq!(buf.size(), MAX_BUFFER_CAPACITY);
	}

	#[test_log::test]
	fn set_size_after_short_read() {
		let mut buf = ByteBuffer::new();
		buf.resize(100).unwrap();
		buf.set_size(42);

		assert_eq!(buf.size(), 42);
		assert_eq!(buf.capacity(), INLINE_CAPACITY);
	}

	#[test_log::test]
	fn consume_shifts_remainder() {
		let mut buf = ByteBuffer::new();
		buf.append(&[1, 2, 3, 4, 5]).unwrap();
		buf.consume(2);

		assert_eq!(buf.data(), &[3, 4, 5]);
	}
}
