use core::ffi::c_void;

/// A read-only view into a metadata section of a loaded image.
///
/// The span borrows the image's mapping: it stays valid for as long as the
/// image remains mapped and is never copied or freed by this crate. A span
/// with size 0 means "no such section" and is never handed to a callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetadataSpan {
	data: *const u8,
	size: u64,
}

impl MetadataSpan {
	pub(crate) const EMPTY: Self = Self {
		data: core::ptr::null(),
		size: 0,
	};

	/// Decodes a span from a section-start symbol: the first 8 bytes at
	/// `symbol` are a native-endian length word, the payload follows
	/// immediately after.
	///
	/// ## Safety
	///
	/// `symbol` must point at a mapped section laid out as described above.
	/// The length word is read unaligned; no alignment is assumed.
	pub(crate) unsafe fn decode(symbol: *const c_void) -> Self {
		let size = core::ptr::read_unaligned(symbol as *const u64);
		Self {
			data: (symbol as *const u8).add(core::mem::size_of::<u64>()),
			size,
		}
	}

	/// Start of the section payload, immediately after the length word.
	#[inline]
	pub fn data(&self) -> *const u8 {
		self.data
	}

	/// The decoded length word. Whether this counts bytes or records is part
	/// of the contract with the emitting compiler; metasect treats it as
	/// opaque.
	#[inline]
	pub fn size(&self) -> u64 {
		self.size
	}

	/// Whether the section was absent.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.size == 0
	}

	/// The payload as a byte slice, for consumers whose length word counts
	/// bytes.
	///
	/// ## Safety
	///
	/// The image must still be mapped and the length word must be a byte
	/// count covered by the section.
	pub unsafe fn as_bytes(&self) -> &[u8] {
		core::slice::from_raw_parts(self.data, self.size as usize)
	}
}

// SAFETY: the span only reads immutable section data in a mapped image.
unsafe impl Send for MetadataSpan {}
unsafe impl Sync for MetadataSpan {}
