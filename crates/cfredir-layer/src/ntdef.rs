//! Native ABI records and entry-point signatures.
//!
//! Declared here rather than pulled from a bindings crate because every entry
//! point is resolved at runtime through [`crate::symbols`], never linked.

use std::ffi::c_void;
use std::ptr;

/// Kernel object handle, pointer-sized like the platform `HANDLE`.
pub type Handle = isize;
pub type NtStatus = i32;
pub type HResult = i32;

pub const INVALID_HANDLE: Handle = -1;
pub const MAX_PATH: usize = 260;
pub const CSIDL_LOCAL_APPDATA: i32 = 0x001c;
pub const OBJ_CASE_INSENSITIVE: u32 = 0x0000_0040;

/// Longest byte length a `UNICODE_STRING` can describe while leaving room
/// for the terminator in `maximum_length`.
pub const MAX_UNICODE_STRING_BYTES: usize = (u16::MAX as usize - 2) & !1;

#[repr(C)]
#[derive(Debug)]
pub struct UnicodeString {
    /// Byte length, excluding the terminator
    pub length: u16,
    pub maximum_length: u16,
    pub buffer: *mut u16,
}

impl Default for UnicodeString {
    fn default() -> Self {
        Self {
            length: 0,
            maximum_length: 0,
            buffer: ptr::null_mut(),
        }
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct ObjectAttributes {
    pub length: u32,
    pub root_directory: Handle,
    pub object_name: *mut UnicodeString,
    pub attributes: u32,
    pub security_descriptor: *mut c_void,
    pub security_quality_of_service: *mut c_void,
}

impl ObjectAttributes {
    /// Equivalent of `InitializeObjectAttributes` with no root directory and
    /// no security descriptor.
    pub fn new(object_name: &mut UnicodeString, attributes: u32) -> Self {
        Self {
            length: std::mem::size_of::<Self>() as u32,
            root_directory: 0,
            object_name: object_name as *mut UnicodeString,
            attributes,
            security_descriptor: ptr::null_mut(),
            security_quality_of_service: ptr::null_mut(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct IoStatusBlock {
    /// `Status`/`Pointer` union; only its width matters to callers.
    pub status: usize,
    pub information: usize,
}

pub type NtCreateFileFn = unsafe extern "system" fn(
    file_handle: *mut Handle,
    desired_access: u32,
    object_attributes: *mut ObjectAttributes,
    io_status_block: *mut IoStatusBlock,
    allocation_size: *mut i64,
    file_attributes: u32,
    share_access: u32,
    create_disposition: u32,
    create_options: u32,
    ea_buffer: *mut c_void,
    ea_length: u32,
) -> NtStatus;

pub type RtlInitUnicodeStringFn =
    unsafe extern "system" fn(destination: *mut UnicodeString, source: *const u16);

pub type RtlNtStatusToDosErrorFn = unsafe extern "system" fn(status: NtStatus) -> u32;

pub type PathIsUncFn = unsafe extern "system" fn(path: *const u16) -> i32;

/// `path` must be a writable `MAX_PATH` buffer.
pub type PathAppendFn = unsafe extern "system" fn(path: *mut u16, more: *const u16) -> i32;

pub type PathIsPrefixFn = unsafe extern "system" fn(prefix: *const u16, path: *const u16) -> i32;

/// `path` must be a writable `MAX_PATH` buffer.
pub type ShGetFolderPathFn = unsafe extern "system" fn(
    hwnd_owner: Handle,
    folder: i32,
    token: Handle,
    flags: u32,
    path: *mut u16,
) -> HResult;
