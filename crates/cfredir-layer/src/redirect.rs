//! The entry point callers substitute for the legacy create call.

use std::sync::Arc;

use cfredir_config::{log_redirect_debug, RedirectConfig};

use crate::legacy::LegacyApi;
use crate::native::NativeInvoker;
use crate::policy::PathPolicy;
use crate::request::{CreationRequest, Outcome};
use crate::symbols::SymbolTable;

pub struct Redirector<L> {
    policy: PathPolicy,
    invoker: NativeInvoker,
    legacy: L,
}

impl<L: LegacyApi> Redirector<L> {
    pub fn new(policy: PathPolicy, invoker: NativeInvoker, legacy: L) -> Self {
        Self {
            policy,
            invoker,
            legacy,
        }
    }

    pub fn from_config(symbols: Arc<SymbolTable>, config: &RedirectConfig, legacy: L) -> Self {
        Self::new(
            PathPolicy::from_config(Arc::clone(&symbols), config),
            NativeInvoker::new(symbols),
            legacy,
        )
    }

    pub fn policy(&self) -> &PathPolicy {
        &self.policy
    }

    pub fn legacy(&self) -> &L {
        &self.legacy
    }

    /// Route one request. The outcome of whichever path ran is returned
    /// verbatim.
    pub fn create_file(&self, request: &CreationRequest) -> Outcome {
        if !self.policy.should_bypass(&request.path) {
            return self.legacy.create_file(request);
        }
        match self.invoker.create(request) {
            Ok(outcome) => outcome,
            Err(err) => {
                log_redirect_debug!(
                    "native path unavailable, using legacy call",
                    error = tracing::field::display(&err)
                );
                self.legacy.create_file(request)
            }
        }
    }
}
