//! Locating plugin binaries and resolving their entry point.

use crate::dispatch::host_callback;
use crate::error::{HostError, LoadStage, Result};
use libloading::Library;
use std::path::{Path, PathBuf};
use vsthost_abi::abi::{AEffect, PluginMainProc};

/// Where a plugin's entry point comes from.
#[derive(Debug, Clone)]
pub enum ModuleOrigin {
    /// A shared library on disk.
    Library(PathBuf),
    /// An entry function linked into this process.
    Entry(PluginMainProc),
}

impl ModuleOrigin {
    /// Path used in errors and logs.
    pub fn display_path(&self) -> PathBuf {
        match self {
            ModuleOrigin::Library(path) => path.clone(),
            ModuleOrigin::Entry(entry) => {
                PathBuf::from(format!("<in-process entry {:p}>", *entry as *const ()))
            }
        }
    }
}

/// A loaded plugin binary. Unloading happens on drop, so it must outlive
/// every pointer obtained through [`instantiate`](Self::instantiate).
pub struct PluginModule {
    origin: ModuleOrigin,
    entry: PluginMainProc,
    library: Option<Library>,
}

impl std::fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginModule")
            .field("origin", &self.origin)
            .field("loaded", &self.library.is_some())
            .finish()
    }
}

impl PluginModule {
    /// Opens the library at `path` and resolves the first entry symbol it exports.
    pub fn open(path: &Path, entry_symbols: &[String]) -> Result<Self> {
        let resolved = resolve_bundle_path(path);

        // SAFETY: loading a plugin runs its initializers; hosting arbitrary
        // plugins accepts that.
        let library = unsafe { Library::new(&resolved) }.map_err(|e| HostError::LoadFailed {
            path: path.to_path_buf(),
            stage: LoadStage::Opening,
            reason: e.to_string(),
        })?;

        let entry = find_entry(&library, entry_symbols).ok_or_else(|| HostError::LoadFailed {
            path: path.to_path_buf(),
            stage: LoadStage::EntryPoint,
            reason: format!("none of {:?} is exported", entry_symbols),
        })?;

        tracing::debug!(path = %resolved.display(), "opened plugin library");
        Ok(Self {
            origin: ModuleOrigin::Library(path.to_path_buf()),
            entry,
            library: Some(library),
        })
    }

    /// Wraps an entry function that is already part of this process.
    ///
    /// # Safety
    /// `entry` must behave like a plugin's `VSTPluginMain`: return null or a
    /// descriptor that stays valid until its close opcode.
    pub unsafe fn from_entry(entry: PluginMainProc) -> Self {
        Self {
            origin: ModuleOrigin::Entry(entry),
            entry,
            library: None,
        }
    }

    /// Loads the same plugin again for a fresh instance.
    pub fn reopen(&self, entry_symbols: &[String]) -> Result<Self> {
        match &self.origin {
            ModuleOrigin::Library(path) => Self::open(path, entry_symbols),
            // SAFETY: the entry was accepted once already under the same contract.
            ModuleOrigin::Entry(entry) => Ok(unsafe { Self::from_entry(*entry) }),
        }
    }

    pub fn origin(&self) -> &ModuleOrigin {
        &self.origin
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            ModuleOrigin::Library(path) => Some(path),
            ModuleOrigin::Entry(_) => None,
        }
    }

    /// Calls the entry point with the shared host callback.
    pub(crate) fn instantiate(&self) -> *mut AEffect {
        // SAFETY: the entry symbol has the plugin-main signature and the
        // library stays loaded while `self` lives.
        unsafe { (self.entry)(host_callback) }
    }
}

fn find_entry(library: &Library, entry_symbols: &[String]) -> Option<PluginMainProc> {
    entry_symbols.iter().find_map(|symbol| {
        let mut name = symbol.as_bytes().to_vec();
        name.push(0);
        // SAFETY: exported plugin entry points share the plugin-main signature.
        let entry = unsafe { library.get::<PluginMainProc>(&name) }.ok()?;
        tracing::trace!(symbol = %symbol, "resolved entry symbol");
        Some(*entry)
    })
}

/// Resolve a macOS `.vst` bundle to the binary inside it
///
/// On macOS, VST2 plugins ship as bundle directories with the executable at
/// `Contents/MacOS/<name>`. Other paths are returned unchanged.
pub fn resolve_bundle_path(path: &Path) -> PathBuf {
    if path.is_dir() && path.extension().and_then(|e| e.to_str()) == Some("vst") {
        if let Some(stem) = path.file_stem() {
            let inner = path.join("Contents").join("MacOS").join(stem);
            if inner.exists() {
                return inner;
            }
        }
    }
    path.to_path_buf()
}
