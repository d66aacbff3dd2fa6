//! Options to control how a stream is scanned

/// What to do when two consecutive frames disagree on a property other than bitrate
///
/// A bitrate-only disagreement is never an error; it marks the stream as VBR.
/// Historical scanners disagree on whether anything else should abort the scan
/// or merely be logged, so the policy is explicit here.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum MismatchPolicy {
	/// Abort the scan with [`ErrorKind::FrameMismatch`](crate::error::ErrorKind::FrameMismatch)
	#[default]
	Fail,
	/// Log the disagreement and keep scanning, adopting the new frame's properties
	Skip,
}

/// Options to control how a [`Scanner`](crate::scanner::Scanner) parses a stream
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct ScanOptions {
	pub(crate) mismatch_policy: MismatchPolicy,
	pub(crate) max_junk_bytes: usize,
}

impl Default for ScanOptions {
	/// The default implementation for `ScanOptions`
	///
	/// The defaults are as follows:
	///
	/// ```rust,ignore
	/// ScanOptions {
	/// 	mismatch_policy: MismatchPolicy::Fail,
	/// 	max_junk_bytes: 1024,
	/// }
	/// ```
	fn default() -> Self {
		Self::new()
	}
}

impl ScanOptions {
	/// Default number of junk bytes to tolerate ahead of the first frame
	pub const DEFAULT_MAX_JUNK_BYTES: usize = 1024;

	/// Creates a new `ScanOptions`, alias for `Default` implementation
	///
	/// See also: [`ScanOptions::default`]
	///
	/// # Examples
	///
	/// ```rust
	/// use mpegscan::config::ScanOptions;
	///
	/// let scan_options = ScanOptions::new();
	/// ```
	#[must_use]
	pub const fn new() -> Self {
		Self {
			mismatch_policy: MismatchPolicy::Fail,
			max_junk_bytes: Self::DEFAULT_MAX_JUNK_BYTES,
		}
	}

	/// The policy to apply when consecutive frames disagree, see [`MismatchPolicy`]
	///
	/// # Examples
	///
	/// ```rust
	/// use mpegscan::config::{MismatchPolicy, ScanOptions};
	///
	/// // By default, a disagreement aborts the scan. Here, we'd rather keep going.
	/// let scan_options = ScanOptions::new().mismatch_policy(MismatchPolicy::Skip);
	/// ```
	pub fn mismatch_policy(&mut self, mismatch_policy: MismatchPolicy) -> Self {
		self.mismatch_policy = mismatch_policy;
		*self
	}

	/// The maximum number of allowed junk bytes to search
	///
	/// Tag padding remnants or plain garbage may precede the first frame. This sets
	/// the maximum number of junk bytes to search through for a frame sync before
	/// giving up with [`ErrorKind::LostSync`](crate::error::ErrorKind::LostSync).
	///
	/// # Examples
	///
	/// ```rust
	/// use mpegscan::config::ScanOptions;
	///
	/// // I have files full of junk, I'll double the search window!
	/// let scan_options = ScanOptions::new().max_junk_bytes(2048);
	/// ```
	pub fn max_junk_bytes(&mut self, max_junk_bytes: usize) -> Self {
		self.max_junk_bytes = max_junk_bytes;
		*self
	}
}
