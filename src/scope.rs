//! Per-provider scope state
//!
//! Every [`ServiceProvider`](crate::ServiceProvider), root or scope, owns one
//! [`ResolutionState`]: its scoped cache, the teardown hooks of the instances
//! it created, and the resolution path of the call in flight.

use crate::ContractKey;
use crate::storage::ScopedCache;
use std::sync::atomic::{AtomicU64, Ordering};

/// Teardown hook registered through [`Resolver::on_dispose`](crate::Resolver::on_dispose).
pub(crate) type Teardown = Box<dyn FnOnce() + Send + 'static>;

/// Unique scope identifier.
///
/// Each provider gets a unique ID for tracking and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    /// Generate a new unique scope ID.
    #[inline]
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Mutable state of one provider, guarded by its resolution lock.
#[derive(Default)]
pub(crate) struct ResolutionState {
    /// Contracts currently being resolved, outermost first
    pub(crate) path: Vec<ContractKey>,
    /// Instances with `Lifetime::Scoped`
    pub(crate) scoped: ScopedCache,
    /// Hooks for instances this provider created, in creation order
    pub(crate) teardown: Vec<Teardown>,
}

impl ResolutionState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run teardown hooks (most recent first) and forget scoped instances.
    ///
    /// Returns the number of hooks that ran.
    pub(crate) fn release(&mut self) -> usize {
        let count = self.teardown.len();
        while let Some(hook) = self.teardown.pop() {
            hook();
        }
        self.scoped.clear();
        self.path.clear();
        count
    }
}
