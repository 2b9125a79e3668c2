//! Decides, per call, whether a path may take the native bypass.
//!
//! The answer is false whenever anything is uncertain: a helper that did not
//! resolve, a root that could not be composed, a path the native layer would
//! interpret differently from the legacy one.

use std::sync::Arc;

use cfredir_config::{log_redirect_debug, log_redirect_trace, RedirectConfig};
use once_cell::sync::OnceCell;

use crate::ntdef::{
    PathAppendFn, PathIsPrefixFn, PathIsUncFn, ShGetFolderPathFn, CSIDL_LOCAL_APPDATA, MAX_PATH,
};
use crate::symbols::{Symbol, SymbolTable};
use crate::wide::{self, WideString};

/// Shell helpers the policy calls.
pub const SHELL_SYMBOLS: [Symbol; 4] = [
    Symbol::PathIsUncW,
    Symbol::PathAppendW,
    Symbol::PathIsPrefixW,
    Symbol::ShGetFolderPathW,
];

/// Entry points the native invoker cannot run without.
pub const NATIVE_SYMBOLS: [Symbol; 2] = [Symbol::NtCreateFile, Symbol::RtlInitUnicodeString];

/// Application-private directory under which the bypass is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedRoot(WideString);

impl ProtectedRoot {
    /// Trailing separators are dropped. Empty and non-local roots are refused.
    pub fn new(path: &WideString) -> Option<Self> {
        let trimmed = wide::trim_trailing_separators(path.as_units());
        if !wide::is_plain_local_path(trimmed) {
            return None;
        }
        WideString::from_units(trimmed).map(Self)
    }

    pub fn encode(path: &str) -> Option<Self> {
        Self::new(&WideString::encode(path)?)
    }

    pub fn as_wide(&self) -> &WideString {
        &self.0
    }

    /// Strict, case-insensitive containment. The root itself is outside.
    pub fn contains(&self, path: &[u16]) -> bool {
        wide::is_strict_descendant(self.0.as_units(), path)
    }
}

/// Where the protected root comes from.
#[derive(Debug, Clone)]
pub enum RootSource {
    /// Supplied by the caller.
    Fixed(ProtectedRoot),
    /// Local app-data special folder plus two segments, in order.
    Shell {
        app_dir: WideString,
        user_data_dir: WideString,
    },
    /// Configuration could not describe a root; never bypass.
    Unavailable,
}

impl RootSource {
    pub fn from_config(config: &RedirectConfig) -> Self {
        let segments = match config.segments() {
            Ok(s) => s,
            Err(err) => {
                log_redirect_debug!(
                    "protected root disabled by config",
                    error = tracing::field::display(&err)
                );
                return RootSource::Unavailable;
            }
        };
        match (WideString::encode(segments[0]), WideString::encode(segments[1])) {
            (Some(app_dir), Some(user_data_dir)) => RootSource::Shell {
                app_dir,
                user_data_dir,
            },
            _ => RootSource::Unavailable,
        }
    }
}

#[derive(Debug)]
pub struct PathPolicy {
    symbols: Arc<SymbolTable>,
    source: RootSource,
    composed: OnceCell<ProtectedRoot>,
    enabled: bool,
}

impl PathPolicy {
    pub fn new(symbols: Arc<SymbolTable>, source: RootSource) -> Self {
        Self {
            symbols,
            source,
            composed: OnceCell::new(),
            enabled: true,
        }
    }

    pub fn from_config(symbols: Arc<SymbolTable>, config: &RedirectConfig) -> Self {
        Self::new(symbols, RootSource::from_config(config)).with_enabled(config.enabled)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// True iff `path` may be routed through the native invoker.
    pub fn should_bypass(&self, path: &WideString) -> bool {
        let decision = self.evaluate(path);
        log_redirect_trace!(
            "bypass decision",
            path = tracing::field::display(path),
            bypass = decision
        );
        decision
    }

    fn evaluate(&self, path: &WideString) -> bool {
        if !self.enabled {
            return false;
        }

        // Every helper and native entry point, or no bypass at all.
        if !self.symbols.resolve_all(&SHELL_SYMBOLS) || !self.symbols.resolve_all(&NATIVE_SYMBOLS)
        {
            return false;
        }
        let (Some(is_unc), Some(is_prefix)) = (unsafe {
            (
                self.symbols.function::<PathIsUncFn>(Symbol::PathIsUncW),
                self.symbols.function::<PathIsPrefixFn>(Symbol::PathIsPrefixW),
            )
        }) else {
            return false;
        };

        // The `\??\` rewrite is only valid for drive paths.
        let units = path.as_units();
        if wide::has_unc_shape(units) || unsafe { is_unc(path.as_ptr()) } != 0 {
            return false;
        }
        if !wide::is_plain_local_path(units) {
            return false;
        }

        let Some(root) = self.protected_root() else {
            return false;
        };

        root.contains(units) && unsafe { is_prefix(root.as_wide().as_ptr(), path.as_ptr()) } != 0
    }

    /// The protected root, composing and caching it on first success.
    /// A failed composition is not cached.
    pub fn protected_root(&self) -> Option<&ProtectedRoot> {
        match &self.source {
            RootSource::Fixed(root) => Some(root),
            RootSource::Unavailable => None,
            RootSource::Shell {
                app_dir,
                user_data_dir,
            } => {
                if let Some(root) = self.composed.get() {
                    return Some(root);
                }
                let root = self.compose_root(app_dir, user_data_dir)?;
                Some(self.composed.get_or_init(|| root))
            }
        }
    }

    fn compose_root(
        &self,
        app_dir: &WideString,
        user_data_dir: &WideString,
    ) -> Option<ProtectedRoot> {
        let (get_folder, append) = unsafe {
            (
                self.symbols
                    .function::<ShGetFolderPathFn>(Symbol::ShGetFolderPathW)?,
                self.symbols.function::<PathAppendFn>(Symbol::PathAppendW)?,
            )
        };

        let mut buf = [0u16; MAX_PATH];
        let hr = unsafe { get_folder(0, CSIDL_LOCAL_APPDATA, 0, 0, buf.as_mut_ptr()) };
        if hr < 0 {
            log_redirect_debug!("local app-data lookup failed", hresult = hr);
            return None;
        }
        for segment in [app_dir, user_data_dir] {
            if unsafe { append(buf.as_mut_ptr(), segment.as_ptr()) } == 0 {
                log_redirect_debug!(
                    "protected root append failed",
                    segment = tracing::field::display(segment)
                );
                return None;
            }
        }

        let len = buf.iter().position(|&u| u == 0)?;
        let root = ProtectedRoot::new(&WideString::from_units(&buf[..len])?)?;
        log_redirect_debug!(
            "protected root composed",
            root = tracing::field::display(root.as_wide())
        );
        Some(root)
    }
}
