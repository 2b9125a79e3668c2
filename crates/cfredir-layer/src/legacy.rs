//! The conventional create-or-open path, used whenever the bypass is not taken.

use crate::request::{CreationRequest, Outcome};

pub trait LegacyApi: Send + Sync {
    /// Perform the call unchanged and capture its last error.
    fn create_file(&self, request: &CreationRequest) -> Outcome;
}

/// `kernel32!CreateFileW`.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLegacy;

#[cfg(windows)]
impl LegacyApi for SystemLegacy {
    fn create_file(&self, request: &CreationRequest) -> Outcome {
        use windows_sys::Win32::Foundation::{GetLastError, INVALID_HANDLE_VALUE};
        use windows_sys::Win32::Security::SECURITY_ATTRIBUTES;
        use windows_sys::Win32::Storage::FileSystem::CreateFileW;

        let handle = unsafe {
            CreateFileW(
                request.path.as_ptr(),
                request.desired_access,
                request.share_mode,
                request.security_attributes as *const SECURITY_ATTRIBUTES,
                request.creation_disposition,
                request.flags_and_attributes,
                request.template_file,
            )
        };
        let last_error = unsafe { GetLastError() };
        if handle == INVALID_HANDLE_VALUE {
            Outcome::Failed { last_error }
        } else {
            Outcome::Opened { handle, last_error }
        }
    }
}
