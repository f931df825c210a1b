//! Exercises `DlLoader` against the real dynamic loader. glibc-only: the test
//! makes `libm.so.6` resident by path, which other libcs do not guarantee.
#![cfg(all(target_os = "linux", target_env = "gnu"))]

use core::ffi::c_void;
use metasect::{DlLoader, KindConfig, Loader, Registry, ResolutionFailurePolicy};
use std::ffi::CString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const LIBM: &str = "libm.so.6";

#[test]
fn walk_reports_loaded_images() {
	let mut names = Vec::new();
	DlLoader.each_image(&mut |name| names.push(name.to_owned()));

	// At least the main executable plus libc are mapped; at least one image
	// has a real path.
	assert!(!names.is_empty());
	assert!(names.iter().any(|name| !name.to_bytes().is_empty()));
}

#[test]
fn resolves_symbols_in_a_resident_library() {
	let lib = unsafe { libloading::Library::new(LIBM) }.expect("load libm");

	let loader = DlLoader;
	let name = CString::new(LIBM).unwrap();
	let handle = loader.open_resident(Some(name.as_c_str())).expect("libm is resident");
	let cos = loader.lookup(&handle, c"cos").expect("libm exports cos");
	assert!(loader.lookup(&handle, c".metasect_no_such_symbol").is_none());
	loader.close(handle);

	// The resolved address may be an ifunc target with a private name, but it
	// always lives inside libm's mapping.
	let info = loader.resolve_symbol(cos).expect("dladdr resolves cos");
	assert!(info.file_name_lossy().contains("libm"));
	assert!(!info.base_address.is_null());

	drop(lib);
}

#[test]
fn unknown_image_is_not_resident() {
	let name = CString::new("libmetasect-does-not-exist.so").unwrap();
	assert!(DlLoader.open_resident(Some(name.as_c_str())).is_err());
}

#[test]
fn initialization_against_host_loader_is_quiet() {
	let conf_count = Arc::new(AtomicUsize::new(0));
	let meta_count = Arc::new(AtomicUsize::new(0));
	let registry = Registry::with_policy(
		DlLoader,
		// The vdso shows up in the walk but cannot be re-opened by name, a
		// failure the Abort policy would escalate.
		ResolutionFailurePolicy::ReturnEmpty,
		KindConfig {
			symbol_name: metasect::PROTOCOL_CONFORMANCES_SYMBOL,
			add_block: {
				let conf_count = Arc::clone(&conf_count);
				Box::new(move |_| {
					conf_count.fetch_add(1, Ordering::Relaxed);
				})
			},
		},
		KindConfig {
			symbol_name: metasect::TYPE_METADATA_RECORDS_SYMBOL,
			add_block: {
				let meta_count = Arc::clone(&meta_count);
				Box::new(move |_| {
					meta_count.fetch_add(1, Ordering::Relaxed);
				})
			},
		},
	);

	registry.initialize_conformance_lookup();
	registry.initialize_type_metadata_lookup();

	// No loaded image carries the metasect sections.
	assert_eq!(conf_count.load(Ordering::Relaxed), 0);
	assert_eq!(meta_count.load(Ordering::Relaxed), 0);

	// A stack address belongs to no image: hook and lookup stay silent.
	let local = 0u8;
	registry.on_image_loaded(&local as *const u8 as *const c_void);
	assert_eq!(conf_count.load(Ordering::Relaxed), 0);
	assert!(registry.lookup_symbol(&local as *const u8 as *const c_void).is_none());

	// dlsym through the main executable's global scope finds libc's malloc at
	// its real address, which resolves back to libc.
	let loader = registry.loader();
	let main = loader.open_resident(None).expect("main executable handle");
	let malloc = loader.lookup(&main, c"malloc").expect("global scope exports malloc");
	loader.close(main);
	let info = registry.lookup_symbol(malloc).expect("malloc resolves");
	assert!(info.file_name_lossy().contains("libc"));
	assert!(info.symbol_name_lossy().is_some_and(|name| name.contains("malloc")));
	assert_eq!(info.symbol_address, Some(malloc));
}
