//! Dynamic extension loader using `libloading` (feature-gated).

use std::path::Path;

/// Symbol every dynamic extension library must export; see
/// [`export_extension!`](crate::export_extension).
pub const CREATE_SYMBOL: &[u8] = b"plughost_create_extension";

/// Whether `main` names a shared library for this platform family.
pub fn is_shared_library(main: &str) -> bool {
    Path::new(main)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| matches!(ext, "so" | "dylib" | "dll"))
}

#[cfg(feature = "dynamic")]
pub mod dynamic_loader {
    use std::path::Path;
    use std::sync::{Arc, Mutex, PoisonError};

    use tracing::info;

    use crate::extension::Extension;

    /// Type of the creation function exported by dynamic extensions.
    pub type CreateExtensionFn = unsafe extern "C" fn() -> *mut Box<dyn Extension>;

    /// Loads extensions from shared libraries and keeps the libraries
    /// mapped for the lifetime of the loader.
    pub struct DynamicLoader {
        libraries: Mutex<Vec<libloading::Library>>,
    }

    impl DynamicLoader {
        /// Creates a new dynamic loader.
        pub fn new() -> Self {
            Self {
                libraries: Mutex::new(Vec::new()),
            }
        }

        /// Loads an extension from the given shared library path.
        ///
        /// # Safety
        /// Runs arbitrary code from the library. Only load trusted
        /// extensions built against the same `plughost-runtime` version.
        pub unsafe fn load_from_path(&self, path: &Path) -> Result<Arc<dyn Extension>, String> {
            let lib = unsafe { libloading::Library::new(path) }
                .map_err(|e| format!("failed to load extension library: {e}"))?;

            let instance = {
                let create: libloading::Symbol<CreateExtensionFn> =
                    unsafe { lib.get(super::CREATE_SYMBOL) }
                        .map_err(|e| format!("library does not export the creation symbol: {e}"))?;
                let raw = unsafe { create() };
                if raw.is_null() {
                    return Err("creation function returned null".to_string());
                }
                let boxed = unsafe { Box::from_raw(raw) };
                Arc::<dyn Extension>::from(*boxed)
            };

            info!(path = %path.display(), "Dynamic extension loaded");

            self.libraries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(lib);

            Ok(instance)
        }
    }

    impl Default for DynamicLoader {
        fn default() -> Self {
            Self::new()
        }
    }

    impl std::fmt::Debug for DynamicLoader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let loaded = self
                .libraries
                .lock()
                .map(|libs| libs.len())
                .unwrap_or_default();
            f.debug_struct("DynamicLoader")
                .field("loaded_count", &loaded)
                .finish()
        }
    }
}

#[cfg(feature = "dynamic")]
pub use dynamic_loader::DynamicLoader;
