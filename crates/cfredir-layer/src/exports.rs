//! C ABI surface loaded by the host process.

#![allow(non_snake_case)]

use std::ffi::c_void;

use cfredir_config::logging::init_logging;
use once_cell::sync::Lazy;
use windows_sys::Win32::Foundation::{SetLastError, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Security::SECURITY_ATTRIBUTES;
use windows_sys::Win32::Storage::FileSystem::CreateFileW;

use crate::legacy::SystemLegacy;
use crate::native::NativeInvoker;
use crate::redirect::Redirector;
use crate::request::{CreationRequest, Outcome};
use crate::symbols::SymbolTable;
use crate::translate::{ERROR_INVALID_PARAMETER, ERROR_PROC_NOT_FOUND};

static REDIRECTOR: Lazy<Redirector<SystemLegacy>> = Lazy::new(|| {
    let config = cfredir_config::config();
    // The host owns logging unless asked otherwise.
    if std::env::var_os("CFREDIR_LOG").is_some() {
        init_logging(config.logging.log_level());
    }
    Redirector::from_config(SymbolTable::system(), &config.redirect, SystemLegacy)
});

fn finish(outcome: Outcome) -> HANDLE {
    unsafe { SetLastError(outcome.last_error()) };
    outcome.handle()
}

/// Drop-in replacement for `CreateFileW`.
#[no_mangle]
pub unsafe extern "system" fn CreateFileWRedirect(
    file_name: *const u16,
    desired_access: u32,
    share_mode: u32,
    security_attributes: *const SECURITY_ATTRIBUTES,
    creation_disposition: u32,
    flags_and_attributes: u32,
    template_file: HANDLE,
) -> HANDLE {
    let request = CreationRequest::from_raw(
        file_name,
        desired_access,
        share_mode,
        security_attributes as *const c_void,
        creation_disposition,
        flags_and_attributes,
        template_file,
    );
    match request {
        Some(request) => finish(REDIRECTOR.create_file(&request)),
        // Null name: let the legacy call report it.
        None => CreateFileW(
            file_name,
            desired_access,
            share_mode,
            security_attributes,
            creation_disposition,
            flags_and_attributes,
            template_file,
        ),
    }
}

/// The native path alone, with no policy check and no fallback.
#[no_mangle]
pub unsafe extern "system" fn CreateFileNTDLL(
    file_name: *const u16,
    desired_access: u32,
    share_mode: u32,
    security_attributes: *const SECURITY_ATTRIBUTES,
    creation_disposition: u32,
    flags_and_attributes: u32,
    template_file: HANDLE,
) -> HANDLE {
    let Some(request) = CreationRequest::from_raw(
        file_name,
        desired_access,
        share_mode,
        security_attributes as *const c_void,
        creation_disposition,
        flags_and_attributes,
        template_file,
    ) else {
        SetLastError(ERROR_INVALID_PARAMETER);
        return INVALID_HANDLE_VALUE;
    };
    match NativeInvoker::new(SymbolTable::system()).create(&request) {
        Ok(outcome) => finish(outcome),
        Err(_) => {
            SetLastError(ERROR_PROC_NOT_FOUND);
            INVALID_HANDLE_VALUE
        }
    }
}
