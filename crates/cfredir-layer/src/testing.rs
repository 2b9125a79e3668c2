//! Test doubles for running the redirector on any host.
//!
//! Provides:
//! - `FakeLoader`, a [`SymbolLoader`] whose symbols can be switched on and off
//! - Fake shell helpers and a fake `NtCreateFile` over an in-memory volume
//! - `RecordingLegacy`, a [`LegacyApi`] that records what reached it
//!
//! # Usage
//!
//! ```ignore
//! use cfredir_layer::testing::{self, FakeLoader};
//!
//! let (loader, symbols) = FakeLoader::full();
//! loader.set_available(Symbol::NtCreateFile, false);
//! testing::insert_file("C:\\data\\existing.txt");
//! ```
//!
//! The fake volume is process-wide. Tests sharing a process must use
//! distinct paths.

use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;

use crate::legacy::LegacyApi;
use crate::ntdef::{
    Handle, HResult, IoStatusBlock, NtCreateFileFn, NtStatus, ObjectAttributes, PathAppendFn,
    PathIsPrefixFn, PathIsUncFn, RtlInitUnicodeStringFn, RtlNtStatusToDosErrorFn,
    ShGetFolderPathFn, UnicodeString, CSIDL_LOCAL_APPDATA, MAX_PATH,
};
use crate::request::{CreationRequest, Outcome};
use crate::symbols::{Symbol, SymbolLoader, SymbolTable};
use crate::translate::*;
use crate::wide::{self, wcslen};

/// What the fake `SHGetFolderPathW` reports for the local app-data folder.
pub const FAKE_LOCAL_APP_DATA: &str = "C:\\Users\\alice\\AppData\\Local";

const S_OK: HResult = 0;
const E_INVALIDARG: HResult = 0x8007_0057_u32 as HResult;

// === Loader ===

/// Serves the fake entry points below, one switch and one counter per symbol.
pub struct FakeLoader {
    available: [AtomicBool; Symbol::COUNT],
    loads: [AtomicUsize; Symbol::COUNT],
}

impl FakeLoader {
    /// Every symbol available.
    pub fn new() -> Self {
        Self {
            available: std::array::from_fn(|_| AtomicBool::new(true)),
            loads: std::array::from_fn(|_| AtomicUsize::new(0)),
        }
    }

    /// A fully capable loader and a fresh table over it.
    pub fn full() -> (Arc<FakeLoader>, Arc<SymbolTable>) {
        let loader = Arc::new(FakeLoader::new());
        let table = Arc::new(SymbolTable::new(Arc::clone(&loader)));
        (loader, table)
    }

    /// A table in which none of `missing` resolve.
    pub fn without(missing: &[Symbol]) -> (Arc<FakeLoader>, Arc<SymbolTable>) {
        let (loader, table) = Self::full();
        for &symbol in missing {
            loader.set_available(symbol, false);
        }
        (loader, table)
    }

    pub fn set_available(&self, symbol: Symbol, available: bool) {
        self.available[slot(symbol)].store(available, Ordering::SeqCst);
    }

    /// How many times the table asked for `symbol`.
    pub fn load_count(&self, symbol: Symbol) -> usize {
        self.loads[slot(symbol)].load(Ordering::SeqCst)
    }
}

impl Default for FakeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolLoader for FakeLoader {
    fn load(&self, symbol: Symbol) -> Option<NonNull<c_void>> {
        self.loads[slot(symbol)].fetch_add(1, Ordering::SeqCst);
        if !self.available[slot(symbol)].load(Ordering::SeqCst) {
            return None;
        }
        NonNull::new(fake_address(symbol))
    }
}

fn slot(symbol: Symbol) -> usize {
    symbol.index()
}

fn fake_address(symbol: Symbol) -> *mut c_void {
    match symbol {
        Symbol::NtCreateFile => fake_nt_create_file as NtCreateFileFn as *mut c_void,
        Symbol::RtlInitUnicodeString => {
            fake_rtl_init_unicode_string as RtlInitUnicodeStringFn as *mut c_void
        }
        Symbol::RtlNtStatusToDosError => {
            fake_rtl_nt_status_to_dos_error as RtlNtStatusToDosErrorFn as *mut c_void
        }
        Symbol::PathIsUncW => fake_path_is_unc as PathIsUncFn as *mut c_void,
        Symbol::PathAppendW => fake_path_append as PathAppendFn as *mut c_void,
        Symbol::PathIsPrefixW => fake_path_is_prefix as PathIsPrefixFn as *mut c_void,
        Symbol::ShGetFolderPathW => fake_sh_get_folder_path as ShGetFolderPathFn as *mut c_void,
    }
}

// === Fake volume ===

/// Parameters one fake `NtCreateFile` call received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCall {
    pub object_name: String,
    pub object_attributes: u32,
    pub desired_access: u32,
    pub file_attributes: u32,
    pub share_access: u32,
    pub create_disposition: u32,
    pub create_options: u32,
}

#[derive(Default)]
struct FakeVolume {
    files: HashSet<String>,
    denied: HashSet<String>,
    calls: HashMap<String, Vec<NativeCall>>,
    next_handle: Handle,
}

static VOLUME: Lazy<Mutex<FakeVolume>> = Lazy::new(|| {
    Mutex::new(FakeVolume {
        next_handle: 0x100,
        ..FakeVolume::default()
    })
});

fn volume() -> MutexGuard<'static, FakeVolume> {
    VOLUME.lock().unwrap_or_else(|e| e.into_inner())
}

fn key(dos_path: &str) -> String {
    dos_path.to_lowercase()
}

/// Make `dos_path` exist on the fake volume.
pub fn insert_file(dos_path: &str) {
    volume().files.insert(key(dos_path));
}

pub fn file_exists(dos_path: &str) -> bool {
    volume().files.contains(&key(dos_path))
}

/// Every fake native open of `dos_path` fails with access denied.
pub fn deny_access(dos_path: &str) {
    volume().denied.insert(key(dos_path));
}

/// Native calls made for `dos_path`, oldest first.
pub fn native_calls(dos_path: &str) -> Vec<NativeCall> {
    volume().calls.get(&key(dos_path)).cloned().unwrap_or_default()
}

// === Fake entry points ===

unsafe fn read_wide(ptr: *const u16) -> Vec<u16> {
    std::slice::from_raw_parts(ptr, wcslen(ptr)).to_vec()
}

/// Follows `NtCreateFile` disposition semantics against the fake volume.
pub unsafe extern "system" fn fake_nt_create_file(
    file_handle: *mut Handle,
    desired_access: u32,
    object_attributes: *mut ObjectAttributes,
    io_status_block: *mut IoStatusBlock,
    _allocation_size: *mut i64,
    file_attributes: u32,
    share_access: u32,
    create_disposition: u32,
    create_options: u32,
    _ea_buffer: *mut c_void,
    _ea_length: u32,
) -> NtStatus {
    let attrs = &*object_attributes;
    let name = &*attrs.object_name;
    let units = std::slice::from_raw_parts(name.buffer, name.length as usize / 2);
    let object_name = String::from_utf16_lossy(units);
    let Some(dos_path) = object_name.strip_prefix("\\??\\") else {
        return STATUS_OBJECT_PATH_NOT_FOUND;
    };

    let mut vol = volume();
    let k = key(dos_path);
    vol.calls.entry(k.clone()).or_default().push(NativeCall {
        object_name: object_name.clone(),
        object_attributes: attrs.attributes,
        desired_access,
        file_attributes,
        share_access,
        create_disposition,
        create_options,
    });

    if vol.denied.contains(&k) {
        return STATUS_ACCESS_DENIED;
    }

    let exists = vol.files.contains(&k);
    let information = match (create_disposition, exists) {
        (FILE_CREATE, true) => return STATUS_OBJECT_NAME_COLLISION,
        (FILE_CREATE, false) | (FILE_OPEN_IF, false) | (FILE_OVERWRITE_IF, false) => FILE_CREATED,
        (FILE_OPEN, true) | (FILE_OPEN_IF, true) => FILE_OPENED,
        (FILE_OVERWRITE, true) | (FILE_OVERWRITE_IF, true) => FILE_OVERWRITTEN,
        (FILE_SUPERSEDE, _) => FILE_SUPERSEDED,
        (FILE_OPEN, false) | (FILE_OVERWRITE, false) => return STATUS_OBJECT_NAME_NOT_FOUND,
        _ => return STATUS_UNSUCCESSFUL,
    };
    vol.files.insert(k);
    vol.next_handle += 4;
    *file_handle = vol.next_handle;
    (*io_status_block).status = 0;
    (*io_status_block).information = information;
    STATUS_SUCCESS
}

pub unsafe extern "system" fn fake_rtl_init_unicode_string(
    destination: *mut UnicodeString,
    source: *const u16,
) {
    let bytes = (wcslen(source) * 2) as u16;
    *destination = UnicodeString {
        length: bytes,
        maximum_length: bytes + 2,
        buffer: source as *mut u16,
    };
}

pub unsafe extern "system" fn fake_rtl_nt_status_to_dos_error(status: NtStatus) -> u32 {
    match status {
        STATUS_SUCCESS => ERROR_SUCCESS,
        STATUS_ACCESS_DENIED => ERROR_ACCESS_DENIED,
        STATUS_OBJECT_NAME_NOT_FOUND => ERROR_FILE_NOT_FOUND,
        STATUS_OBJECT_PATH_NOT_FOUND => ERROR_PATH_NOT_FOUND,
        STATUS_OBJECT_NAME_COLLISION => ERROR_ALREADY_EXISTS,
        STATUS_SHARING_VIOLATION => ERROR_SHARING_VIOLATION,
        _ => ERROR_MR_MID_NOT_FOUND,
    }
}

pub unsafe extern "system" fn fake_path_is_unc(path: *const u16) -> i32 {
    wide::has_unc_shape(&read_wide(path)) as i32
}

/// Like `PathAppendW`: one separator between the parts, and failure when the
/// result would not fit in `MAX_PATH`.
pub unsafe extern "system" fn fake_path_append(path: *mut u16, more: *const u16) -> i32 {
    let mut joined = read_wide(path);
    let more = read_wide(more);
    let more = match more.as_slice() {
        [first, rest @ ..] if wide::is_separator(*first) => rest,
        all => all,
    };
    if !joined.is_empty() && !joined.last().is_some_and(|&u| wide::is_separator(u)) {
        joined.push(b'\\' as u16);
    }
    joined.extend_from_slice(more);
    if joined.len() >= MAX_PATH {
        return 0;
    }
    std::ptr::copy_nonoverlapping(joined.as_ptr(), path, joined.len());
    *path.add(joined.len()) = 0;
    1
}

/// Like `PathIsPrefixW`: component-wise and case-insensitive, and true when
/// both paths are equal.
pub unsafe extern "system" fn fake_path_is_prefix(prefix: *const u16, path: *const u16) -> i32 {
    let prefix = read_wide(prefix);
    let prefix = wide::trim_trailing_separators(&prefix);
    let path = read_wide(path);
    if prefix.is_empty() || path.len() < prefix.len() {
        return 0;
    }
    let (head, tail) = path.split_at(prefix.len());
    let boundary = tail.first().map_or(true, |&u| wide::is_separator(u));
    (wide::eq_ignore_case(head, prefix) && boundary) as i32
}

pub unsafe extern "system" fn fake_sh_get_folder_path(
    _hwnd_owner: Handle,
    folder: i32,
    _token: Handle,
    _flags: u32,
    path: *mut u16,
) -> HResult {
    if folder != CSIDL_LOCAL_APPDATA {
        return E_INVALIDARG;
    }
    let units: Vec<u16> = FAKE_LOCAL_APP_DATA.encode_utf16().collect();
    std::ptr::copy_nonoverlapping(units.as_ptr(), path, units.len());
    *path.add(units.len()) = 0;
    S_OK
}

// === Legacy double ===

/// Records every request it receives and answers with a fixed outcome.
pub struct RecordingLegacy {
    outcome: Outcome,
    calls: Mutex<Vec<CreationRecord>>,
}

/// The parts of a request the legacy double keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationRecord {
    pub path: String,
    pub desired_access: u32,
    pub share_mode: u32,
    pub creation_disposition: u32,
    pub flags_and_attributes: u32,
    pub template_file: Handle,
}

impl RecordingLegacy {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CreationRecord> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for RecordingLegacy {
    /// Answers like a successful legacy open of a fresh file.
    fn default() -> Self {
        Self::new(Outcome::Opened {
            handle: 0x4c,
            last_error: ERROR_SUCCESS,
        })
    }
}

impl LegacyApi for RecordingLegacy {
    fn create_file(&self, request: &CreationRequest) -> Outcome {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(CreationRecord {
                path: request.path.to_string_lossy(),
                desired_access: request.desired_access,
                share_mode: request.share_mode,
                creation_disposition: request.creation_disposition,
                flags_and_attributes: request.flags_and_attributes,
                template_file: request.template_file,
            });
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    #[test]
    fn test_fake_append() {
        let mut buf = [0u16; MAX_PATH];
        unsafe {
            fake_sh_get_folder_path(0, CSIDL_LOCAL_APPDATA, 0, 0, buf.as_mut_ptr());
            assert_eq!(fake_path_append(buf.as_mut_ptr(), w("MyApp").as_ptr()), 1);
            assert_eq!(fake_path_append(buf.as_mut_ptr(), w("\\UserData").as_ptr()), 1);
        }
        let len = buf.iter().position(|&u| u == 0).unwrap();
        assert_eq!(
            String::from_utf16_lossy(&buf[..len]),
            format!("{FAKE_LOCAL_APP_DATA}\\MyApp\\UserData")
        );
    }

    #[test]
    fn test_fake_prefix_accepts_equal_paths() {
        unsafe {
            assert_eq!(fake_path_is_prefix(w("C:\\a").as_ptr(), w("c:\\A").as_ptr()), 1);
            assert_eq!(fake_path_is_prefix(w("C:\\a").as_ptr(), w("C:\\a\\b").as_ptr()), 1);
            assert_eq!(fake_path_is_prefix(w("C:\\a").as_ptr(), w("C:\\ab").as_ptr()), 0);
        }
    }

    #[test]
    fn test_loader_switches() {
        let (loader, table) = FakeLoader::without(&[Symbol::PathAppendW]);
        assert!(table.resolve(Symbol::PathAppendW).is_none());
        assert!(table.resolve(Symbol::PathIsUncW).is_some());
        loader.set_available(Symbol::PathAppendW, true);
        assert!(table.resolve(Symbol::PathAppendW).is_some());
        assert_eq!(loader.load_count(Symbol::PathAppendW), 2);
    }

    #[test]
    fn test_recording_legacy() {
        let legacy = RecordingLegacy::default();
        let path = crate::wide::WideString::encode("C:\\legacy.txt").unwrap();
        let outcome = legacy.create_file(&CreationRequest::new(path, 1, 2, 3, 4));
        assert!(outcome.is_opened());
        assert_eq!(legacy.calls()[0].path, "C:\\legacy.txt");
    }
}
