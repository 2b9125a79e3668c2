//! cfredir layer: a drop-in `CreateFileW` replacement that opens files under
//! one application-private directory through `NtCreateFile`, so that
//! user-mode hooks on the legacy entry point never see them.
//!
//! Everything outside that directory, and everything the layer cannot
//! handle with certainty, goes through the legacy call untouched.
//!
//! # Layout
//!
//! - [`symbols`]: lazily resolved entry points, one store-once slot each
//! - [`translate`]: legacy-to-native flag, disposition and status mapping
//! - [`policy`]: the per-call bypass decision and the protected root
//! - [`native`]: the `NtCreateFile` invocation
//! - [`redirect`]: routing between the native and legacy paths
//!
//! The C ABI exports (`CreateFileWRedirect`, `CreateFileNTDLL`) are only
//! built for Windows. The rest of the crate runs anywhere against an
//! injected [`SymbolLoader`], which is how the tests drive it. The test
//! doubles in `testing` are only built for unit tests or with the `testing`
//! feature, never into the shipped library.

#![allow(clippy::missing_safety_doc)]

pub mod error;
pub mod legacy;
pub mod native;
pub mod ntdef;
pub mod policy;
pub mod redirect;
pub mod request;
pub mod symbols;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod translate;
pub mod wide;

#[cfg(windows)]
pub mod exports;

pub use error::{RedirectError, Result};
pub use legacy::LegacyApi;
#[cfg(windows)]
pub use legacy::SystemLegacy;
pub use native::NativeInvoker;
pub use policy::{PathPolicy, ProtectedRoot, RootSource};
pub use redirect::Redirector;
pub use request::{CreationRequest, Outcome};
pub use symbols::{Symbol, SymbolLoader, SymbolTable, SystemLoader};
pub use wide::WideString;
