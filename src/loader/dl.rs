//! The production [`Loader`] over the platform's `dlfcn`/`link.h` interface.

use super::{Loader, SymbolInfo};
use crate::Error;
use core::ffi::{c_int, c_void};
use std::ffi::CStr;

/// Talks to `ld.so` (or Android's `linker`) through `dlopen`, `dlsym`,
/// `dl_iterate_phdr` and `dladdr`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DlLoader;

/// An image handle from `dlopen`, pending its `dlclose`.
pub struct DlHandle(*mut c_void);

fn last_dl_error() -> String {
	let err = unsafe { libc::dlerror() };
	if err.is_null() {
		String::from("unknown loader failure")
	} else {
		unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned()
	}
}

impl Loader for DlLoader {
	type Handle = DlHandle;

	fn open_resident(&self, image: Option<&CStr>) -> Result<DlHandle, Error> {
		let name = image.map_or(core::ptr::null(), CStr::as_ptr);
		// RTLD_NOLOAD: the image was just observed as loaded, so only resolve
		// it, never trigger a load of our own.
		let handle = unsafe { libc::dlopen(name, libc::RTLD_LAZY | libc::RTLD_NOLOAD) };
		if handle.is_null() {
			Err(Error::ImageNotResident {
				name: image.map_or_else(
					|| String::from("<main executable>"),
					|image| image.to_string_lossy().into_owned(),
				),
				reason: last_dl_error(),
			})
		} else {
			Ok(DlHandle(handle))
		}
	}

	fn lookup(&self, handle: &DlHandle, symbol: &CStr) -> Option<*const c_void> {
		let sym = unsafe { libc::dlsym(handle.0, symbol.as_ptr()) };
		if sym.is_null() {
			None
		} else {
			Some(sym as *const c_void)
		}
	}

	fn close(&self, handle: DlHandle) {
		unsafe {
			libc::dlclose(handle.0);
		}
	}

	fn each_image(&self, visit: &mut dyn FnMut(&CStr)) {
		unsafe extern "C" fn callback(
			info: *mut libc::dl_phdr_info,
			_size: libc::size_t,
			data: *mut c_void,
		) -> c_int {
			let visit = &mut *(data as *mut &mut dyn FnMut(&CStr));
			let name = (*info).dlpi_name;
			// Some libcs report the main executable with a null name rather
			// than an empty one.
			let name = if name.is_null() { c"" } else { CStr::from_ptr(name) };
			(*visit)(name);
			0
		}

		let mut visit = visit;
		unsafe {
			libc::dl_iterate_phdr(
				Some(callback),
				&mut visit as *mut &mut dyn FnMut(&CStr) as *mut c_void,
			);
		}
	}

	fn resolve_symbol(&self, addr: *const c_void) -> Option<SymbolInfo> {
		let mut info: libc::Dl_info = unsafe { core::mem::zeroed() };
		if unsafe { libc::dladdr(addr, &mut info) } == 0 || info.dli_fname.is_null() {
			return None;
		}
		Some(SymbolInfo {
			file_name: unsafe { CStr::from_ptr(info.dli_fname) }.to_owned(),
			base_address: info.dli_fbase as *const c_void,
			symbol_name: if info.dli_sname.is_null() {
				None
			} else {
				Some(unsafe { CStr::from_ptr(info.dli_sname) }.to_owned())
			},
			symbol_address: if info.dli_saddr.is_null() {
				None
			} else {
				Some(info.dli_saddr as *const c_void)
			},
		})
	}
}
