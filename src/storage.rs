//! Storage for registrations and realized instances
//!
//! - [`RegistrationSet`]: the immutable descriptor list a provider tree shares
//! - [`SingletonCache`]: instances shared by a whole scope tree (`DashMap`)
//! - [`ScopedCache`]: instances private to one provider

use crate::scope::Teardown;
use crate::{AnyArc, ContractKey, Descriptor};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// Registration Set
// =============================================================================

/// Ordered, immutable list of descriptors.
///
/// Cloning is cheap: every provider built from one collection shares the same
/// allocation.
#[derive(Clone, Default)]
pub struct RegistrationSet {
    descriptors: Arc<[Descriptor]>,
}

impl RegistrationSet {
    /// Freeze a list of descriptors.
    pub fn new(descriptors: Vec<Descriptor>) -> Self {
        Self {
            descriptors: descriptors.into(),
        }
    }

    /// Find the authoritative descriptor for `contract`.
    ///
    /// Scans from the end, so the most recent registration wins.
    #[inline]
    pub fn find(&self, contract: &ContractKey) -> Option<&Descriptor> {
        self.descriptors
            .iter()
            .rev()
            .find(|descriptor| descriptor.contract() == contract)
    }

    /// Check if any descriptor binds `contract`.
    #[inline]
    pub fn contains(&self, contract: &ContractKey) -> bool {
        self.find(contract).is_some()
    }

    /// Number of descriptors, duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }
}

impl std::fmt::Debug for RegistrationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.descriptors.iter()).finish()
    }
}

// =============================================================================
// Singleton Cache
// =============================================================================

/// Singleton instances of one provider tree, plus their teardown hooks.
///
/// Owned by the root provider and shared by `Arc` with every scope. Uses
/// `DashMap` with `ahash` so scopes on different threads never block each
/// other on cache reads.
pub struct SingletonCache {
    instances: DashMap<ContractKey, AnyArc, RandomState>,
    teardown: Mutex<Vec<Teardown>>,
}

impl SingletonCache {
    /// Create an empty cache.
    ///
    /// 8 shards: provider trees rarely hold more than a few dozen singletons.
    pub fn new() -> Self {
        Self {
            instances: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
            teardown: Mutex::new(Vec::new()),
        }
    }

    /// Cached instance for `contract`, if any.
    #[inline]
    pub fn get(&self, contract: &ContractKey) -> Option<AnyArc> {
        self.instances.get(contract).map(|entry| Arc::clone(entry.value()))
    }

    /// Cache `instance` unless another one got there first.
    ///
    /// Returns whichever instance ends up cached, so callers racing on the
    /// same contract all hand out the same service, and whether it was
    /// `instance`.
    #[inline]
    pub fn get_or_insert(&self, contract: ContractKey, instance: AnyArc) -> (AnyArc, bool) {
        match self.instances.entry(contract) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => (Arc::clone(entry.insert(instance).value()), true),
        }
    }

    /// Check if `contract` has been realized.
    #[inline]
    pub fn contains(&self, contract: &ContractKey) -> bool {
        self.instances.contains_key(contract)
    }

    /// Number of realized singletons.
    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Take ownership of hooks, keeping their order.
    pub(crate) fn adopt_teardown(&self, hooks: Vec<Teardown>) {
        if !hooks.is_empty() {
            self.teardown.lock().extend(hooks);
        }
    }

    /// Run teardown hooks (most recent first) and drop every cached instance.
    ///
    /// Returns the number of hooks that ran.
    pub(crate) fn release(&self) -> usize {
        let hooks = std::mem::take(&mut *self.teardown.lock());
        let count = hooks.len();
        for hook in hooks.into_iter().rev() {
            hook();
        }
        self.instances.clear();
        count
    }
}

impl Default for SingletonCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SingletonCache {
    fn drop(&mut self) {
        for hook in self.teardown.get_mut().drain(..).rev() {
            hook();
        }
    }
}

impl std::fmt::Debug for SingletonCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonCache")
            .field("count", &self.len())
            .field("teardown_hooks", &self.teardown.lock().len())
            .finish()
    }
}

// =============================================================================
// Scoped Cache
// =============================================================================

/// Scoped instances of a single provider.
///
/// Only ever touched while the provider's resolution lock is held, so a plain
/// map is enough.
#[derive(Default)]
pub struct ScopedCache {
    instances: HashMap<ContractKey, AnyArc, RandomState>,
}

impl ScopedCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance for `contract`, if any.
    #[inline]
    pub fn get(&self, contract: &ContractKey) -> Option<AnyArc> {
        self.instances.get(contract).cloned()
    }

    /// Cache `instance` for `contract`.
    #[inline]
    pub fn insert(&mut self, contract: ContractKey, instance: AnyArc) {
        self.instances.insert(contract, instance);
    }

    /// Number of realized scoped instances.
    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Drop every cached instance.
    #[inline]
    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

impl std::fmt::Debug for ScopedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedCache")
            .field("count", &self.len())
            .finish()
    }
}
