//! metasect locates compiler-emitted metadata tables embedded in the binary
//! sections of a process's loaded ELF images and hands them to the runtime's
//! type system as raw `(pointer, size)` spans.
//!
//! The compiler emits each table as a section whose start is named by a fixed
//! symbol; the first 8 bytes at that symbol are a native-endian length word,
//! immediately followed by the record data. metasect walks every image that is
//! already resident when a lookup kind is first initialized, and picks up
//! every image loaded afterwards through a loader notification hook. Images
//! without a matching section are normal and are skipped silently.
//!
//! # Usage
//!
//! ```no_run
//! use metasect::{DlLoader, KindConfig, Registry};
//!
//! let registry = Registry::new(
//! 	DlLoader,
//! 	KindConfig {
//! 		symbol_name: metasect::PROTOCOL_CONFORMANCES_SYMBOL,
//! 		add_block: Box::new(|span| { /* register conformance records */ }),
//! 	},
//! 	KindConfig {
//! 		symbol_name: metasect::TYPE_METADATA_RECORDS_SYMBOL,
//! 		add_block: Box::new(|span| { /* register type metadata records */ }),
//! 	},
//! );
//!
//! // Walks every image that is currently resident, then marks the kind
//! // initialized so later loads are picked up incrementally.
//! registry.initialize_conformance_lookup();
//!
//! // Wired to the loader's load-notification shim:
//! // registry.on_image_loaded(address_inside_new_image);
//! ```
//!
//! The discovery core never copies or frees a span; its lifetime is the
//! mapping lifetime of the image it was found in.

mod loader;
mod locate;
mod registry;
mod span;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod global;


use std::ffi::CStr;

/// Errors that can occur while talking to the host loader.
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// The loader could not produce a handle for an image it previously
	/// reported as loaded. Whether this aborts the process or degrades to an
	/// empty span is decided by [`ResolutionFailurePolicy`].
	#[error("image `{name}` is not resident: {reason}")]
	ImageNotResident {
		/// Image name as reported by the loader.
		name: String,
		/// Loader diagnostic, e.g. the `dlerror()` text.
		reason: String,
	},
}

/// Conventional section symbol naming the protocol conformance table.
pub const PROTOCOL_CONFORMANCES_SYMBOL: &CStr = c".metasect_protocol_conformances";

/// Conventional section symbol naming the type metadata record table.
pub const TYPE_METADATA_RECORDS_SYMBOL: &CStr = c".metasect_type_metadata_records";

// Public exports
pub use loader::{Loader, SymbolInfo};
pub use locate::ResolutionFailurePolicy;
pub use registry::{BlockCallback, KindConfig, Registry};
pub use span::MetadataSpan;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use loader::dl::DlLoader;
