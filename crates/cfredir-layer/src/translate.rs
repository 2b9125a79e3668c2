//! Mapping between the legacy `CreateFileW` vocabulary and the native
//! `NtCreateFile` vocabulary. Pure functions, no I/O.

use crate::error::{RedirectError, Result};
use crate::ntdef::NtStatus;

// === Legacy creation dispositions ===

pub const CREATE_NEW: u32 = 1;
pub const CREATE_ALWAYS: u32 = 2;
pub const OPEN_EXISTING: u32 = 3;
pub const OPEN_ALWAYS: u32 = 4;
pub const TRUNCATE_EXISTING: u32 = 5;

// === Native create dispositions ===

pub const FILE_SUPERSEDE: u32 = 0;
pub const FILE_OPEN: u32 = 1;
pub const FILE_CREATE: u32 = 2;
pub const FILE_OPEN_IF: u32 = 3;
pub const FILE_OVERWRITE: u32 = 4;
pub const FILE_OVERWRITE_IF: u32 = 5;

// === IO_STATUS_BLOCK.Information after a successful create ===

pub const FILE_SUPERSEDED: usize = 0;
pub const FILE_OPENED: usize = 1;
pub const FILE_CREATED: usize = 2;
pub const FILE_OVERWRITTEN: usize = 3;
pub const FILE_EXISTS: usize = 4;
pub const FILE_DOES_NOT_EXIST: usize = 5;

// === Native status codes ===

pub const STATUS_SUCCESS: NtStatus = 0;
pub const STATUS_UNSUCCESSFUL: NtStatus = 0xC000_0001_u32 as NtStatus;
pub const STATUS_ACCESS_DENIED: NtStatus = 0xC000_0022_u32 as NtStatus;
pub const STATUS_OBJECT_NAME_NOT_FOUND: NtStatus = 0xC000_0034_u32 as NtStatus;
pub const STATUS_OBJECT_NAME_COLLISION: NtStatus = 0xC000_0035_u32 as NtStatus;
pub const STATUS_OBJECT_PATH_NOT_FOUND: NtStatus = 0xC000_003A_u32 as NtStatus;
pub const STATUS_SHARING_VIOLATION: NtStatus = 0xC000_0043_u32 as NtStatus;

// === Legacy error codes ===

pub const ERROR_SUCCESS: u32 = 0;
pub const ERROR_FILE_NOT_FOUND: u32 = 2;
pub const ERROR_PATH_NOT_FOUND: u32 = 3;
pub const ERROR_ACCESS_DENIED: u32 = 5;
pub const ERROR_GEN_FAILURE: u32 = 31;
pub const ERROR_SHARING_VIOLATION: u32 = 32;
pub const ERROR_FILE_EXISTS: u32 = 80;
pub const ERROR_INVALID_PARAMETER: u32 = 87;
pub const ERROR_PROC_NOT_FOUND: u32 = 127;
pub const ERROR_ALREADY_EXISTS: u32 = 183;
pub const ERROR_FILENAME_EXCED_RANGE: u32 = 206;
/// What the status translator answers for codes it has no mapping for.
pub const ERROR_MR_MID_NOT_FOUND: u32 = 317;

// === Access bits ===

/// Lets the handle be waited on. `CreateFileW` always asks for it because it
/// opens for synchronous I/O; `NtCreateFile` requires it for that mode.
pub const SYNCHRONIZE: u32 = 0x0010_0000;
/// `CreateFileW` always adds it so attribute queries work on any handle it
/// returns, whatever access the caller named.
pub const FILE_READ_ATTRIBUTES: u32 = 0x0000_0080;

/// Bits the legacy call ORs into every access mask.
pub const ACCESS_PARITY_BITS: u32 = SYNCHRONIZE | FILE_READ_ATTRIBUTES;

// === Attribute bits the native call accepts as FileAttributes ===

pub const FILE_ATTRIBUTE_READONLY: u32 = 0x0000_0001;
pub const FILE_ATTRIBUTE_HIDDEN: u32 = 0x0000_0002;
pub const FILE_ATTRIBUTE_SYSTEM: u32 = 0x0000_0004;
pub const FILE_ATTRIBUTE_ARCHIVE: u32 = 0x0000_0020;
pub const FILE_ATTRIBUTE_NORMAL: u32 = 0x0000_0080;
pub const FILE_ATTRIBUTE_TEMPORARY: u32 = 0x0000_0100;
pub const FILE_ATTRIBUTE_SPARSE_FILE: u32 = 0x0000_0200;
pub const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x0000_0400;
pub const FILE_ATTRIBUTE_COMPRESSED: u32 = 0x0000_0800;
pub const FILE_ATTRIBUTE_OFFLINE: u32 = 0x0000_1000;
pub const FILE_ATTRIBUTE_NOT_CONTENT_INDEXED: u32 = 0x0000_2000;
pub const FILE_ATTRIBUTE_ENCRYPTED: u32 = 0x0000_4000;
pub const FILE_ATTRIBUTE_INTEGRITY_STREAM: u32 = 0x0000_8000;
pub const FILE_ATTRIBUTE_NO_SCRUB_DATA: u32 = 0x0002_0000;

/// Attribute bits passed through to the native call.
///
/// Excluded: DIRECTORY (0x10) and DEVICE (0x40) describe the object kind and
/// are rejected as attributes; VIRTUAL (0x10000) is reserved; every
/// `FILE_FLAG_*` bit above 0xFFFF is a legacy open option with no
/// FileAttributes meaning and would be misread if passed through.
pub const ATTRIBUTE_ALLOW_LIST: u32 = FILE_ATTRIBUTE_READONLY
    | FILE_ATTRIBUTE_HIDDEN
    | FILE_ATTRIBUTE_SYSTEM
    | FILE_ATTRIBUTE_ARCHIVE
    | FILE_ATTRIBUTE_NORMAL
    | FILE_ATTRIBUTE_TEMPORARY
    | FILE_ATTRIBUTE_SPARSE_FILE
    | FILE_ATTRIBUTE_REPARSE_POINT
    | FILE_ATTRIBUTE_COMPRESSED
    | FILE_ATTRIBUTE_OFFLINE
    | FILE_ATTRIBUTE_NOT_CONTENT_INDEXED
    | FILE_ATTRIBUTE_ENCRYPTED
    | FILE_ATTRIBUTE_INTEGRITY_STREAM
    | FILE_ATTRIBUTE_NO_SCRUB_DATA;

// === Create options ===

/// Synchronous, non-alertable I/O: the default for a legacy handle opened
/// without `FILE_FLAG_OVERLAPPED`.
pub const FILE_SYNCHRONOUS_IO_NONALERT: u32 = 0x0000_0020;
/// Fail rather than open a directory, as the legacy call does without
/// `FILE_FLAG_BACKUP_SEMANTICS`.
pub const FILE_NON_DIRECTORY_FILE: u32 = 0x0000_0040;

/// Fixed create options for every native call.
pub const CREATE_OPTIONS: u32 = FILE_SYNCHRONOUS_IO_NONALERT | FILE_NON_DIRECTORY_FILE;

/// Legacy creation disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Disposition {
    CreateNew = CREATE_NEW,
    CreateAlways = CREATE_ALWAYS,
    OpenExisting = OPEN_EXISTING,
    OpenAlways = OPEN_ALWAYS,
    TruncateExisting = TRUNCATE_EXISTING,
}

impl TryFrom<u32> for Disposition {
    type Error = RedirectError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            CREATE_NEW => Ok(Disposition::CreateNew),
            CREATE_ALWAYS => Ok(Disposition::CreateAlways),
            OPEN_EXISTING => Ok(Disposition::OpenExisting),
            OPEN_ALWAYS => Ok(Disposition::OpenAlways),
            TRUNCATE_EXISTING => Ok(Disposition::TruncateExisting),
            other => Err(RedirectError::InvalidDisposition(other)),
        }
    }
}

/// Native create disposition. `FILE_SUPERSEDE` has no legacy counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NativeDisposition {
    Open = FILE_OPEN,
    Create = FILE_CREATE,
    OpenIf = FILE_OPEN_IF,
    Overwrite = FILE_OVERWRITE,
    OverwriteIf = FILE_OVERWRITE_IF,
}

impl NativeDisposition {
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

impl From<Disposition> for NativeDisposition {
    fn from(d: Disposition) -> Self {
        match d {
            Disposition::CreateNew => NativeDisposition::Create,
            Disposition::CreateAlways => NativeDisposition::OverwriteIf,
            Disposition::OpenExisting => NativeDisposition::Open,
            Disposition::OpenAlways => NativeDisposition::OpenIf,
            Disposition::TruncateExisting => NativeDisposition::Overwrite,
        }
    }
}

/// Total over the five legacy values; anything else is a caller error.
pub fn translate_disposition(legacy: u32) -> Result<NativeDisposition> {
    Disposition::try_from(legacy).map(NativeDisposition::from)
}

pub fn translate_access_mask(legacy: u32) -> u32 {
    legacy | ACCESS_PARITY_BITS
}

pub fn translate_attributes(legacy: u32) -> u32 {
    legacy & ATTRIBUTE_ALLOW_LIST
}

/// Legacy error for a native status.
///
/// A collision under a strict create is "file exists"; every other failure
/// maps to `ERROR_GEN_FAILURE`, which callers may refine further.
pub fn map_status_to_legacy_error(status: NtStatus, disposition: NativeDisposition) -> u32 {
    match status {
        STATUS_SUCCESS => ERROR_SUCCESS,
        STATUS_OBJECT_NAME_COLLISION if disposition == NativeDisposition::Create => {
            ERROR_FILE_EXISTS
        }
        _ => ERROR_GEN_FAILURE,
    }
}

/// Informational last-error after a successful create.
///
/// For the two "create if absent" dispositions the legacy call reports
/// `ERROR_ALREADY_EXISTS` when the object was there before. This is not a
/// failure.
pub fn creation_status(disposition: NativeDisposition, information: usize) -> u32 {
    let existed = match disposition {
        NativeDisposition::OpenIf => information == FILE_OPENED,
        NativeDisposition::OverwriteIf => information == FILE_OVERWRITTEN,
        _ => false,
    };
    if existed {
        ERROR_ALREADY_EXISTS
    } else {
        ERROR_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_table() {
        let table = [
            (CREATE_NEW, FILE_CREATE),
            (CREATE_ALWAYS, FILE_OVERWRITE_IF),
            (OPEN_EXISTING, FILE_OPEN),
            (OPEN_ALWAYS, FILE_OPEN_IF),
            (TRUNCATE_EXISTING, FILE_OVERWRITE),
        ];
        for (legacy, native) in table {
            assert_eq!(translate_disposition(legacy).unwrap().as_raw(), native);
        }
    }

    #[test]
    fn test_disposition_is_injective() {
        let mut seen: Vec<u32> = (CREATE_NEW..=TRUNCATE_EXISTING)
            .map(|d| translate_disposition(d).unwrap().as_raw())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 5);
        assert!(!seen.contains(&FILE_SUPERSEDE));
    }

    #[test]
    fn test_unknown_disposition_rejected() {
        for bad in [0, 6, 7, u32::MAX] {
            assert_eq!(
                translate_disposition(bad),
                Err(RedirectError::InvalidDisposition(bad))
            );
        }
    }

    #[test]
    fn test_mask_constants() {
        assert_eq!(ACCESS_PARITY_BITS, 0x0010_0080);
        assert_eq!(ATTRIBUTE_ALLOW_LIST, 0x0002_FFA7);
        assert_eq!(CREATE_OPTIONS, 0x60);
    }

    #[test]
    fn test_access_mask_adds_parity_bits() {
        const GENERIC_READ: u32 = 0x8000_0000;
        assert_eq!(translate_access_mask(GENERIC_READ), GENERIC_READ | 0x0010_0080);
        assert_eq!(translate_access_mask(0), ACCESS_PARITY_BITS);
        assert_eq!(translate_access_mask(SYNCHRONIZE), ACCESS_PARITY_BITS);
    }

    #[test]
    fn test_attributes_drop_legacy_flags() {
        const FILE_FLAG_OVERLAPPED: u32 = 0x4000_0000;
        const FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;
        const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;
        let legacy = FILE_ATTRIBUTE_HIDDEN
            | FILE_ATTRIBUTE_TEMPORARY
            | FILE_FLAG_OVERLAPPED
            | FILE_FLAG_BACKUP_SEMANTICS
            | FILE_ATTRIBUTE_DIRECTORY;
        assert_eq!(
            translate_attributes(legacy),
            FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_TEMPORARY
        );
        assert_eq!(translate_attributes(FILE_ATTRIBUTE_NORMAL), FILE_ATTRIBUTE_NORMAL);
    }

    #[test]
    fn test_status_mapping() {
        use NativeDisposition::*;
        assert_eq!(map_status_to_legacy_error(STATUS_SUCCESS, Create), ERROR_SUCCESS);
        assert_eq!(
            map_status_to_legacy_error(STATUS_OBJECT_NAME_COLLISION, Create),
            ERROR_FILE_EXISTS
        );
        assert_eq!(
            map_status_to_legacy_error(STATUS_OBJECT_NAME_COLLISION, OpenIf),
            ERROR_GEN_FAILURE
        );
        assert_eq!(
            map_status_to_legacy_error(STATUS_ACCESS_DENIED, Open),
            ERROR_GEN_FAILURE
        );
    }

    #[test]
    fn test_creation_status() {
        use NativeDisposition::*;
        assert_eq!(creation_status(OpenIf, FILE_OPENED), ERROR_ALREADY_EXISTS);
        assert_eq!(creation_status(OpenIf, FILE_CREATED), ERROR_SUCCESS);
        assert_eq!(creation_status(OverwriteIf, FILE_OVERWRITTEN), ERROR_ALREADY_EXISTS);
        assert_eq!(creation_status(OverwriteIf, FILE_CREATED), ERROR_SUCCESS);
        assert_eq!(creation_status(Open, FILE_OPENED), ERROR_SUCCESS);
        assert_eq!(creation_status(Overwrite, FILE_OVERWRITTEN), ERROR_SUCCESS);
        assert_eq!(creation_status(Create, FILE_CREATED), ERROR_SUCCESS);
    }

    #[cfg(windows)]
    #[test]
    fn test_constants_match_platform_headers() {
        use windows_sys::Win32::Foundation as F;
        use windows_sys::Win32::Storage::FileSystem as FS;
        assert_eq!(CREATE_NEW, FS::CREATE_NEW);
        assert_eq!(CREATE_ALWAYS, FS::CREATE_ALWAYS);
        assert_eq!(OPEN_EXISTING, FS::OPEN_EXISTING);
        assert_eq!(OPEN_ALWAYS, FS::OPEN_ALWAYS);
        assert_eq!(TRUNCATE_EXISTING, FS::TRUNCATE_EXISTING);
        assert_eq!(ERROR_FILE_EXISTS, F::ERROR_FILE_EXISTS);
        assert_eq!(ERROR_ALREADY_EXISTS, F::ERROR_ALREADY_EXISTS);
        assert_eq!(ERROR_INVALID_PARAMETER, F::ERROR_INVALID_PARAMETER);
        assert_eq!(STATUS_OBJECT_NAME_COLLISION, F::STATUS_OBJECT_NAME_COLLISION);
    }
}
