//! Process-wide cache of dynamically resolved entry points.
//!
//! Nothing here is linked at load time: taking a static dependency on the
//! shell libraries would drag the windowing stack into every host process.
//! Each [`Symbol`] owns one slot that is published at most once with a
//! compare-and-swap from null. A failed lookup leaves the slot empty and the
//! next caller tries again.
//!
//! Library handles obtained while resolving are never released. The host may
//! keep calling into those libraries for its whole lifetime.

use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use cfredir_config::{log_symbols_debug, log_symbols_warn};
use once_cell::sync::Lazy;

/// Shared library an entry point is exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Library {
    Ntdll,
    Shlwapi,
    Shell32,
}

impl Library {
    /// NUL-terminated module file name.
    pub const fn file_name(self) -> &'static str {
        match self {
            Library::Ntdll => "ntdll.dll\0",
            Library::Shlwapi => "shlwapi.dll\0",
            Library::Shell32 => "shell32.dll\0",
        }
    }
}

/// Every entry point the redirector resolves at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    NtCreateFile,
    RtlInitUnicodeString,
    RtlNtStatusToDosError,
    PathIsUncW,
    PathAppendW,
    PathIsPrefixW,
    ShGetFolderPathW,
}

impl Symbol {
    pub const COUNT: usize = 7;

    pub const ALL: [Symbol; Symbol::COUNT] = [
        Symbol::NtCreateFile,
        Symbol::RtlInitUnicodeString,
        Symbol::RtlNtStatusToDosError,
        Symbol::PathIsUncW,
        Symbol::PathAppendW,
        Symbol::PathIsPrefixW,
        Symbol::ShGetFolderPathW,
    ];

    pub const fn library(self) -> Library {
        match self {
            Symbol::NtCreateFile | Symbol::RtlInitUnicodeString | Symbol::RtlNtStatusToDosError => {
                Library::Ntdll
            }
            Symbol::PathIsUncW | Symbol::PathAppendW | Symbol::PathIsPrefixW => Library::Shlwapi,
            Symbol::ShGetFolderPathW => Library::Shell32,
        }
    }

    /// NUL-terminated export name.
    pub const fn export_name(self) -> &'static str {
        match self {
            Symbol::NtCreateFile => "NtCreateFile\0",
            Symbol::RtlInitUnicodeString => "RtlInitUnicodeString\0",
            Symbol::RtlNtStatusToDosError => "RtlNtStatusToDosError\0",
            Symbol::PathIsUncW => "PathIsUNCW\0",
            Symbol::PathAppendW => "PathAppendW\0",
            Symbol::PathIsPrefixW => "PathIsPrefixW\0",
            Symbol::ShGetFolderPathW => "SHGetFolderPathW\0",
        }
    }

    pub fn name(self) -> &'static str {
        self.export_name().trim_end_matches('\0')
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Performs one library-load-and-lookup sequence.
pub trait SymbolLoader: Send + Sync {
    fn load(&self, symbol: Symbol) -> Option<NonNull<c_void>>;
}

impl<T: SymbolLoader + ?Sized> SymbolLoader for Arc<T> {
    fn load(&self, symbol: Symbol) -> Option<NonNull<c_void>> {
        (**self).load(symbol)
    }
}

/// Resolves through the platform dynamic loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

#[cfg(windows)]
impl SymbolLoader for SystemLoader {
    fn load(&self, symbol: Symbol) -> Option<NonNull<c_void>> {
        use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

        let library: Vec<u16> = symbol.library().file_name().encode_utf16().collect();
        // Intentionally leaked: see module docs.
        let module = unsafe { LoadLibraryW(library.as_ptr()) };
        if module == 0 {
            return None;
        }
        let proc = unsafe { GetProcAddress(module, symbol.export_name().as_ptr()) }?;
        NonNull::new(proc as *mut c_void)
    }
}

#[cfg(unix)]
impl SymbolLoader for SystemLoader {
    fn load(&self, symbol: Symbol) -> Option<NonNull<c_void>> {
        let library = symbol.library().file_name().as_ptr() as *const libc::c_char;
        // RTLD_NODELETE keeps the image mapped even if someone else dlcloses it.
        let module = unsafe { libc::dlopen(library, libc::RTLD_NOW | libc::RTLD_NODELETE) };
        if module.is_null() {
            return None;
        }
        let name = symbol.export_name().as_ptr() as *const libc::c_char;
        NonNull::new(unsafe { libc::dlsym(module, name) })
    }
}

static SYSTEM: Lazy<Arc<SymbolTable>> = Lazy::new(|| Arc::new(SymbolTable::new(SystemLoader)));

/// One store-once slot per [`Symbol`].
pub struct SymbolTable {
    slots: [AtomicPtr<c_void>; Symbol::COUNT],
    loader: Box<dyn SymbolLoader>,
}

impl SymbolTable {
    pub fn new(loader: impl SymbolLoader + 'static) -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut())),
            loader: Box::new(loader),
        }
    }

    /// The process-wide table backed by [`SystemLoader`].
    pub fn system() -> Arc<SymbolTable> {
        Arc::clone(&SYSTEM)
    }

    /// Address of `symbol`, resolving it on first use.
    ///
    /// Concurrent first calls may each run the loader, but only one address
    /// is ever published and every caller returns that one.
    pub fn resolve(&self, symbol: Symbol) -> Option<NonNull<c_void>> {
        let slot = &self.slots[symbol.index()];
        if let Some(p) = NonNull::new(slot.load(Ordering::Acquire)) {
            return Some(p);
        }

        let Some(found) = self.loader.load(symbol) else {
            log_symbols_warn!(
                "entry point not resolved",
                symbol = symbol.name(),
                library = symbol.library().file_name().trim_end_matches('\0'),
            );
            return None;
        };

        match slot.compare_exchange(
            ptr::null_mut(),
            found.as_ptr(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                log_symbols_debug!("entry point resolved", symbol = symbol.name());
                Some(found)
            }
            Err(winner) => NonNull::new(winner),
        }
    }

    /// Capability check: true only if every symbol resolves.
    pub fn resolve_all(&self, symbols: &[Symbol]) -> bool {
        symbols.iter().all(|&s| self.resolve(s).is_some())
    }

    /// Whether `symbol` has been published, without attempting resolution.
    pub fn is_resolved(&self, symbol: Symbol) -> bool {
        !self.slots[symbol.index()].load(Ordering::Acquire).is_null()
    }

    /// Resolve `symbol` as the function-pointer type `F`.
    ///
    /// # Safety
    /// `F` must be a function-pointer type matching the export's real
    /// signature and calling convention.
    pub unsafe fn function<F: Copy>(&self, symbol: Symbol) -> Option<F> {
        debug_assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*mut c_void>()
        );
        let p = self.resolve(symbol)?.as_ptr();
        Some(std::mem::transmute_copy::<*mut c_void, F>(&p))
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for symbol in Symbol::ALL {
            map.entry(&symbol.name(), &self.is_resolved(symbol));
        }
        map.finish()
    }
}
