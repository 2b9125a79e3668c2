use std::ffi::c_void;
use std::ptr;

use crate::ntdef::{Handle, INVALID_HANDLE};
use crate::translate::ERROR_ALREADY_EXISTS;
use crate::wide::WideString;

/// Parameters of one legacy-shaped create-or-open call.
#[derive(Debug, Clone)]
pub struct CreationRequest {
    pub path: WideString,
    pub desired_access: u32,
    pub share_mode: u32,
    /// Opaque `SECURITY_ATTRIBUTES`, handed to the legacy call unexamined.
    pub security_attributes: *const c_void,
    pub creation_disposition: u32,
    pub flags_and_attributes: u32,
    /// Only the legacy call looks at it.
    pub template_file: Handle,
}

impl CreationRequest {
    pub fn new(
        path: WideString,
        desired_access: u32,
        share_mode: u32,
        creation_disposition: u32,
        flags_and_attributes: u32,
    ) -> Self {
        Self {
            path,
            desired_access,
            share_mode,
            security_attributes: ptr::null(),
            creation_disposition,
            flags_and_attributes,
            template_file: 0,
        }
    }

    /// Build from the raw arguments of a `CreateFileW` call.
    ///
    /// # Safety
    /// `file_name` must be null or a readable NUL-terminated UTF-16 string.
    pub unsafe fn from_raw(
        file_name: *const u16,
        desired_access: u32,
        share_mode: u32,
        security_attributes: *const c_void,
        creation_disposition: u32,
        flags_and_attributes: u32,
        template_file: Handle,
    ) -> Option<Self> {
        Some(Self {
            path: WideString::from_ptr(file_name)?,
            desired_access,
            share_mode,
            security_attributes,
            creation_disposition,
            flags_and_attributes,
            template_file,
        })
    }
}

/// Result of a create-or-open call in legacy shape: a handle plus the value
/// the caller will read back as its last error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Opened { handle: Handle, last_error: u32 },
    Failed { last_error: u32 },
}

impl Outcome {
    pub fn failed(last_error: u32) -> Self {
        Outcome::Failed { last_error }
    }

    /// The handle, or the invalid-handle sentinel on failure.
    pub fn handle(&self) -> Handle {
        match self {
            Outcome::Opened { handle, .. } => *handle,
            Outcome::Failed { .. } => INVALID_HANDLE,
        }
    }

    pub fn last_error(&self) -> u32 {
        match self {
            Outcome::Opened { last_error, .. } | Outcome::Failed { last_error } => *last_error,
        }
    }

    pub fn is_opened(&self) -> bool {
        matches!(self, Outcome::Opened { .. })
    }

    /// Opened, and the object was already there before the call.
    pub fn already_existed(&self) -> bool {
        matches!(
            self,
            Outcome::Opened {
                last_error: ERROR_ALREADY_EXISTS,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{ERROR_FILE_EXISTS, ERROR_SUCCESS};

    #[test]
    fn test_outcome_accessors() {
        let created = Outcome::Opened {
            handle: 8,
            last_error: ERROR_SUCCESS,
        };
        assert!(created.is_opened());
        assert!(!created.already_existed());
        assert_eq!(created.handle(), 8);

        let existed = Outcome::Opened {
            handle: 12,
            last_error: ERROR_ALREADY_EXISTS,
        };
        assert!(existed.already_existed());

        let failed = Outcome::failed(ERROR_FILE_EXISTS);
        assert!(!failed.is_opened());
        assert_eq!(failed.handle(), INVALID_HANDLE);
        assert_eq!(failed.last_error(), ERROR_FILE_EXISTS);
    }

    #[test]
    fn test_from_raw_copies_path() {
        let name: Vec<u16> = "C:\\x.txt\0".encode_utf16().collect();
        let req = unsafe {
            CreationRequest::from_raw(name.as_ptr(), 1, 2, ptr::null(), 3, 4, 0)
        }
        .unwrap();
        drop(name);
        assert_eq!(req.path.to_string_lossy(), "C:\\x.txt");
        assert_eq!(req.creation_disposition, 3);
        assert!(unsafe {
            CreationRequest::from_raw(ptr::null(), 1, 2, ptr::null(), 3, 4, 0)
        }
        .is_none());
    }
}
