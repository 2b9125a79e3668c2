//! Creates or opens a file through `NtCreateFile`, reporting the result the
//! way `CreateFileW` would.
//!
//! The path is prefixed with `\??\` and handed to the object manager as-is.
//! Relative paths, environment expansion and 8.3 short names are not handled
//! here; [`crate::policy`] keeps such paths away.

use std::ptr;
use std::sync::Arc;

use cfredir_config::log_redirect_debug;

use crate::error::{RedirectError, Result};
use crate::ntdef::{
    IoStatusBlock, NtCreateFileFn, ObjectAttributes, RtlInitUnicodeStringFn,
    RtlNtStatusToDosErrorFn, UnicodeString, INVALID_HANDLE, MAX_UNICODE_STRING_BYTES,
    OBJ_CASE_INSENSITIVE,
};
use crate::request::{CreationRequest, Outcome};
use crate::symbols::{Symbol, SymbolTable};
use crate::translate::{
    creation_status, map_status_to_legacy_error, translate_access_mask, translate_attributes,
    translate_disposition, CREATE_OPTIONS, ERROR_GEN_FAILURE, ERROR_MR_MID_NOT_FOUND,
    ERROR_SUCCESS, STATUS_SUCCESS,
};
use crate::wide::WideString;

/// `\??\`, the object-manager namespace for DOS device names.
pub const NT_PATH_PREFIX: [u16; 4] = [b'\\' as u16, b'?' as u16, b'?' as u16, b'\\' as u16];

/// Prefix `path` for the native layer, refusing anything a
/// `UNICODE_STRING` cannot describe.
pub fn to_nt_path(path: &WideString) -> Result<WideString> {
    let bytes = (path.len() + NT_PATH_PREFIX.len()) * 2;
    if bytes > MAX_UNICODE_STRING_BYTES {
        return Err(RedirectError::PathTooLong(bytes));
    }
    path.with_prefix(&NT_PATH_PREFIX)
        .ok_or(RedirectError::PathTooLong(bytes))
}

#[derive(Debug, Clone)]
pub struct NativeInvoker {
    symbols: Arc<SymbolTable>,
}

impl NativeInvoker {
    pub fn new(symbols: Arc<SymbolTable>) -> Self {
        Self { symbols }
    }

    /// Issue the native create.
    ///
    /// `Err` means the native path is unavailable and nothing was attempted;
    /// the caller decides whether to fall back. Every other result, including
    /// caller errors and native failures, is an `Outcome` to surface as-is.
    pub fn create(&self, request: &CreationRequest) -> Result<Outcome> {
        let disposition = match translate_disposition(request.creation_disposition) {
            Ok(d) => d,
            Err(err) => return Ok(Self::rejected(err)),
        };

        let create_file = unsafe { self.symbols.function::<NtCreateFileFn>(Symbol::NtCreateFile) }
            .ok_or(RedirectError::SymbolUnavailable(Symbol::NtCreateFile))?;
        let init_unicode_string = unsafe {
            self.symbols
                .function::<RtlInitUnicodeStringFn>(Symbol::RtlInitUnicodeString)
        }
        .ok_or(RedirectError::SymbolUnavailable(Symbol::RtlInitUnicodeString))?;

        let nt_path = match to_nt_path(&request.path) {
            Ok(p) => p,
            Err(err) => return Ok(Self::rejected(err)),
        };

        let mut name = UnicodeString::default();
        unsafe { init_unicode_string(&mut name, nt_path.as_ptr()) };
        let mut attributes = ObjectAttributes::new(&mut name, OBJ_CASE_INSENSITIVE);
        let mut io_status = IoStatusBlock::default();
        let mut handle = INVALID_HANDLE;

        // `nt_path` outlives the call; `name` borrows its buffer.
        let status = unsafe {
            create_file(
                &mut handle,
                translate_access_mask(request.desired_access),
                &mut attributes,
                &mut io_status,
                ptr::null_mut(),
                translate_attributes(request.flags_and_attributes),
                request.share_mode,
                disposition.as_raw(),
                CREATE_OPTIONS,
                ptr::null_mut(),
                0,
            )
        };

        if status != STATUS_SUCCESS {
            let mut last_error = map_status_to_legacy_error(status, disposition);
            if last_error == ERROR_GEN_FAILURE {
                last_error = self.refine_error(status).unwrap_or(last_error);
            }
            let status_hex = format!("{:#010x}", status as u32);
            log_redirect_debug!(
                "native create failed",
                path = tracing::field::display(&request.path),
                status = status_hex.as_str(),
                last_error = last_error,
            );
            return Ok(Outcome::failed(last_error));
        }

        Ok(Outcome::Opened {
            handle,
            last_error: creation_status(disposition, io_status.information),
        })
    }

    /// Legacy error for `status` from the platform translator, when present
    /// and when it knows the status.
    fn refine_error(&self, status: i32) -> Option<u32> {
        let to_dos = unsafe {
            self.symbols
                .function::<RtlNtStatusToDosErrorFn>(Symbol::RtlNtStatusToDosError)
        }?;
        match unsafe { to_dos(status) } {
            ERROR_SUCCESS | ERROR_MR_MID_NOT_FOUND => None,
            code => Some(code),
        }
    }

    fn rejected(err: RedirectError) -> Outcome {
        log_redirect_debug!("request rejected", error = tracing::field::display(&err));
        Outcome::failed(err.legacy_error().unwrap_or(ERROR_GEN_FAILURE))
    }
}
