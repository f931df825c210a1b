use crate::Error;
use core::ffi::c_void;
use std::borrow::Cow;
use std::ffi::{CStr, CString};

#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) mod dl;

/// The host-loader operations the discovery core is built on.
///
/// [`DlLoader`](crate::DlLoader) implements this over `dlfcn`/`link.h`; tests
/// and alternative hosts can substitute their own image source.
///
/// ## Locking contract
///
/// Correctness of [`Registry`](crate::Registry) requires that
/// [`each_image`](Loader::each_image) and the host's delivery of
/// load notifications (the calls that end up in
/// [`Registry::on_image_loaded`](crate::Registry::on_image_loaded)) are
/// mutually exclusive: while a walk is in progress, no notification for a
/// newly added image may be delivered. `dl_iterate_phdr` provides this by
/// holding the loader's image-registration lock for the whole iteration. A
/// host without that guarantee must serialize the two paths with its own
/// mutex.
pub trait Loader {
	/// Transient image handle, only valid until passed to
	/// [`close`](Loader::close).
	type Handle;

	/// Resolves a handle for an image that is already resident, without
	/// loading anything. `None` identifies the main executable.
	fn open_resident(&self, image: Option<&CStr>) -> Result<Self::Handle, Error>;

	/// Looks up `symbol` within the image behind `handle`. `None` when the
	/// image does not export the symbol.
	fn lookup(&self, handle: &Self::Handle, symbol: &CStr) -> Option<*const c_void>;

	/// Releases a handle obtained from [`open_resident`](Loader::open_resident).
	fn close(&self, handle: Self::Handle);

	/// Calls `visit` once per currently mapped image with the name the loader
	/// reports for it. The main executable and the dynamic loader itself may
	/// be reported with an empty name.
	///
	/// Implementations must uphold the locking contract described on
	/// [`Loader`].
	fn each_image(&self, visit: &mut dyn FnMut(&CStr));

	/// Resolves the owning image and nearest preceding symbol for an address.
	///
	/// Returns `None` when no mapped image contains the address or the owning
	/// image reports no name. A pure query; never fails louder than that.
	fn resolve_symbol(&self, addr: *const c_void) -> Option<SymbolInfo>;
}

/// Result of resolving an address back to its owning image, as reported by
/// the loader. A diagnostic query result; nothing in the discovery core
/// retains it.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
	/// Path of the image containing the address, byte-exact as the loader
	/// reports it so it can be fed back into
	/// [`Loader::open_resident`].
	pub file_name: CString,
	/// Address the image is mapped at.
	pub base_address: *const c_void,
	/// Name of the nearest symbol at or preceding the address, when the
	/// image's symbol table carries one.
	pub symbol_name: Option<CString>,
	/// Address of that symbol.
	pub symbol_address: Option<*const c_void>,
}

impl SymbolInfo {
	/// The image path for display purposes.
	pub fn file_name_lossy(&self) -> Cow<'_, str> {
		self.file_name.to_string_lossy()
	}

	/// The symbol name for display purposes.
	pub fn symbol_name_lossy(&self) -> Option<Cow<'_, str>> {
		self.symbol_name.as_deref().map(CStr::to_string_lossy)
	}
}
