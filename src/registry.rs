use crate::loader::{Loader, SymbolInfo};
use crate::locate::{locate, ResolutionFailurePolicy};
use crate::span::MetadataSpan;
use core::ffi::c_void;
use core::sync::atomic::{AtomicBool, Ordering};
use std::ffi::CStr;

/// Callback receiving each discovered non-empty metadata span.
///
/// Invoked synchronously on whichever thread drove the discovery: the
/// initializing thread during the initial walk, the loading thread for
/// incremental loads. Re-delivery of an identical span is possible if the
/// host notifies twice for one image; deduplication, where needed, belongs
/// to the consumer.
pub type BlockCallback = Box<dyn Fn(MetadataSpan) + Send + Sync>;

/// Configuration for one metadata kind: the section-start symbol the
/// compiler emits and the consumer for discovered spans.
pub struct KindConfig {
	/// Symbol naming the section, e.g.
	/// [`PROTOCOL_CONFORMANCES_SYMBOL`](crate::PROTOCOL_CONFORMANCES_SYMBOL).
	pub symbol_name: &'static CStr,
	/// Receives every non-empty span found for this kind.
	pub add_block: BlockCallback,
}

/// Process-lifetime state for one metadata kind.
struct KindRecord {
	symbol_name: &'static CStr,
	add_block: BlockCallback,
	/// False until the kind's initial walk runs; written exactly once, from
	/// inside the walk (see [`Registry::enumerate`]).
	initialized: AtomicBool,
}

impl KindRecord {
	fn new(config: KindConfig) -> Self {
		Self {
			symbol_name: config.symbol_name,
			add_block: config.add_block,
			initialized: AtomicBool::new(false),
		}
	}
}

/// The process-wide discovery registry: one record per metadata kind, the
/// loader they are discovered through, and the resolution-failure policy.
///
/// Create one per process and keep it for the process lifetime; there is no
/// de-initialization. The registry adds no locking of its own — the ordering
/// between the initial walk and incremental notifications comes from the
/// loader's registration lock (see the [`Loader`] locking contract).
pub struct Registry<L: Loader> {
	loader: L,
	policy: ResolutionFailurePolicy,
	conformances: KindRecord,
	type_metadata: KindRecord,
}

impl<L: Loader> Registry<L> {
	/// Creates a registry with the platform-default
	/// [`ResolutionFailurePolicy`].
	pub fn new(loader: L, conformances: KindConfig, type_metadata: KindConfig) -> Self {
		Self::with_policy(loader, ResolutionFailurePolicy::default(), conformances, type_metadata)
	}

	/// Creates a registry with an explicit [`ResolutionFailurePolicy`].
	pub fn with_policy(
		loader: L,
		policy: ResolutionFailurePolicy,
		conformances: KindConfig,
		type_metadata: KindConfig,
	) -> Self {
		Self {
			loader,
			policy,
			conformances: KindRecord::new(conformances),
			type_metadata: KindRecord::new(type_metadata),
		}
	}

	/// The loader this registry discovers images through.
	pub fn loader(&self) -> &L {
		&self.loader
	}

	/// Walks every currently resident image for conformance sections, then
	/// marks the kind initialized so later loads are handled by
	/// [`on_image_loaded`](Registry::on_image_loaded).
	///
	/// Call once per process. A redundant call re-walks every image and
	/// re-delivers every span to the callback.
	pub fn initialize_conformance_lookup(&self) {
		self.enumerate(&self.conformances);
	}

	/// Same as [`initialize_conformance_lookup`](Registry::initialize_conformance_lookup),
	/// for the type metadata record kind.
	pub fn initialize_type_metadata_lookup(&self) {
		self.enumerate(&self.type_metadata);
	}

	fn enumerate(&self, kind: &KindRecord) {
		// The walk below may report the main executable with an empty name;
		// process it here explicitly, exactly once.
		self.add_block_for_image(kind, None);
		self.loader.each_image(&mut |name| {
			// The initialized flag flips here, inside the walk, while the
			// loader still holds its registration lock. Flipping it after the
			// walk returned could let an in-flight load be both missed by
			// this walk and skipped by on_image_loaded.
			kind.initialized.store(true, Ordering::Release);
			if !name.to_bytes().is_empty() {
				self.add_block_for_image(kind, Some(name));
			}
		});
		// A host whose walk reports no images at all still ends up
		// initialized.
		kind.initialized.store(true, Ordering::Release);
	}

	fn add_block_for_image(&self, kind: &KindRecord, image: Option<&CStr>) {
		let span = locate(&self.loader, self.policy, image, kind.symbol_name);
		if !span.is_empty() {
			log::debug!(
				"found `{}` (length word {}) in {}",
				kind.symbol_name.to_string_lossy(),
				span.size(),
				image.map_or_else(|| "<main executable>".into(), CStr::to_string_lossy),
			);
			(kind.add_block)(span);
		}
	}

	/// Feeds a newly loaded image, identified by any address inside it,
	/// through section discovery for every kind that has been initialized.
	///
	/// Wire this to the loader's load-notification shim. An address that
	/// resolves to no named image is a silent no-op. Kinds not yet
	/// initialized skip the image; their own initial walk picks it up later.
	pub fn on_image_loaded(&self, addr: *const c_void) {
		for kind in [&self.conformances, &self.type_metadata] {
			if !kind.initialized.load(Ordering::Acquire) {
				continue;
			}
			let Some(info) = self.loader.resolve_symbol(addr) else {
				continue;
			};
			self.add_block_for_image(kind, Some(&info.file_name));
		}
	}

	/// Resolves `addr` to its owning image and nearest preceding symbol, for
	/// diagnostics. `None` when no mapped image claims the address.
	pub fn lookup_symbol(&self, addr: *const c_void) -> Option<SymbolInfo> {
		self.loader.resolve_symbol(addr)
	}
}
