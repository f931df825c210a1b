use crate::loader::Loader;
use crate::span::MetadataSpan;
use crate::Error;
use core::mem::ManuallyDrop;
use std::ffi::CStr;

/// What the section locator does when the loader cannot re-resolve an image
/// it just reported as loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionFailurePolicy {
	/// Treat the failure as an inconsistent runtime state: print a diagnostic
	/// and abort the process. Desktop loaders keep every reported image
	/// re-resolvable, and the rest of the runtime relies on that invariant.
	Abort,
	/// Treat the failure as benign and report an empty span. The Android
	/// linker can decline to re-resolve images it did report.
	ReturnEmpty,
}

impl Default for ResolutionFailurePolicy {
	fn default() -> Self {
		if cfg!(target_os = "android") {
			Self::ReturnEmpty
		} else {
			Self::Abort
		}
	}
}

/// Holds an image handle open for the duration of a symbol lookup and
/// releases it on every exit path.
struct OpenImage<'a, L: Loader> {
	loader: &'a L,
	handle: ManuallyDrop<L::Handle>,
}

impl<'a, L: Loader> OpenImage<'a, L> {
	fn new(loader: &'a L, handle: L::Handle) -> Self {
		Self {
			loader,
			handle: ManuallyDrop::new(handle),
		}
	}
}

impl<L: Loader> Drop for OpenImage<'_, L> {
	fn drop(&mut self) {
		// SAFETY: the handle is taken exactly once, here.
		self.loader.close(unsafe { ManuallyDrop::take(&mut self.handle) });
	}
}

/// Locates the section named by `symbol` in `image` (`None` = the main
/// executable) and decodes its length-prefixed span.
///
/// A missing section is the normal case and yields an empty span; nothing is
/// retried. The handle used for symbol resolution is transient and released
/// before returning.
pub(crate) fn locate<L: Loader>(
	loader: &L,
	policy: ResolutionFailurePolicy,
	image: Option<&CStr>,
	symbol: &CStr,
) -> MetadataSpan {
	let handle = match loader.open_resident(image) {
		Ok(handle) => handle,
		Err(err) => match policy {
			ResolutionFailurePolicy::ReturnEmpty => {
				log::debug!("{err}; treating section as absent");
				return MetadataSpan::EMPTY;
			}
			ResolutionFailurePolicy::Abort => fatal(&err),
		},
	};
	let open = OpenImage::new(loader, handle);
	match loader.lookup(&open.handle, symbol) {
		// SAFETY: the symbol names a compiler-emitted section that starts
		// with its 8-byte length word.
		Some(section) => unsafe { MetadataSpan::decode(section) },
		None => MetadataSpan::EMPTY,
	}
}

fn fatal(err: &Error) -> ! {
	// No unwinding here: this can run inside a loader callback, and the
	// runtime state is already known to be inconsistent.
	eprintln!("metasect: fatal: {err}");
	std::process::abort();
}
