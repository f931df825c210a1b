//! Process-wide access point for hosts whose loader shim calls plain
//! functions.
//!
//! An embedding runtime installs one [`Registry`] over the platform
//! [`DlLoader`] and wires these free functions to its exported entry points.
//! They are deliberately the only ambient state in the crate; everything else
//! takes the registry explicitly.

use crate::loader::dl::DlLoader;
use crate::loader::SymbolInfo;
use crate::registry::Registry;
use core::ffi::c_void;
use std::sync::OnceLock;

static REGISTRY: OnceLock<Registry<DlLoader>> = OnceLock::new();

/// Installs the process-wide registry. At most one install succeeds; a later
/// attempt gets its registry handed back.
pub fn install(registry: Registry<DlLoader>) -> Result<(), Registry<DlLoader>> {
	REGISTRY.set(registry)
}

/// The installed registry, if any.
pub fn registry() -> Option<&'static Registry<DlLoader>> {
	REGISTRY.get()
}

/// [`Registry::initialize_conformance_lookup`] on the installed registry.
pub fn initialize_conformance_lookup() {
	match REGISTRY.get() {
		Some(registry) => registry.initialize_conformance_lookup(),
		None => log::warn!("initialize_conformance_lookup: no registry installed"),
	}
}

/// [`Registry::initialize_type_metadata_lookup`] on the installed registry.
pub fn initialize_type_metadata_lookup() {
	match REGISTRY.get() {
		Some(registry) => registry.initialize_type_metadata_lookup(),
		None => log::warn!("initialize_type_metadata_lookup: no registry installed"),
	}
}

/// Entry point for the loader shim's load notification. A no-op until a
/// registry is installed: images loaded before that are covered by the
/// initializers' full walks.
pub fn on_image_loaded(addr: *const c_void) {
	if let Some(registry) = REGISTRY.get() {
		registry.on_image_loaded(addr);
	}
}

/// [`Registry::lookup_symbol`] on the installed registry.
pub fn lookup_symbol(addr: *const c_void) -> Option<SymbolInfo> {
	REGISTRY.get().and_then(|registry| registry.lookup_symbol(addr))
}
