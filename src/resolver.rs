//! The resolution engine
//!
//! [`ServiceProvider`] is what callers hold: it owns the caches and takes its
//! resolution lock at every public entry point. [`Resolver`] is what factories
//! and blueprints receive: a handle on the provider's state for the duration
//! of one resolution, through which nested dependencies are resolved without
//! touching the lock again.

use crate::scope::{ResolutionState, ScopeId, Teardown};
use crate::storage::{RegistrationSet, SingletonCache};
use crate::{AnyArc, Contract, ContractKey, DiError, Lifetime, Result};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

// =============================================================================
// Service Provider
// =============================================================================

/// A built provider: the root of a scope tree, or one of its scopes.
///
/// Every provider sees the same registrations and the same singletons. Scoped
/// instances are private to the provider that created them.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use syringe::ServiceCollection;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let services = ServiceCollection::new();
/// services.add_singleton_factory::<dyn Greeter, _>(|_| Ok(Arc::new(English)));
///
/// let provider = services.build_provider();
/// let request = provider.create_scope();
///
/// let a = provider.resolve::<dyn Greeter>().unwrap();
/// let b = request.resolve::<dyn Greeter>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(b.greet(), "hello");
/// ```
pub struct ServiceProvider {
    /// Registrations shared by the whole tree
    registrations: RegistrationSet,
    /// Singletons shared by the whole tree
    singletons: Arc<SingletonCache>,
    /// Scoped cache, teardown hooks and the path of the resolution in flight
    state: ReentrantMutex<RefCell<ResolutionState>>,
    /// Unique ID of this provider
    scope: ScopeId,
    /// 0 for the root
    depth: u32,
}

impl ServiceProvider {
    /// Create the root provider of a new scope tree.
    pub(crate) fn root(registrations: RegistrationSet) -> Self {
        let provider = Self {
            registrations,
            singletons: Arc::new(SingletonCache::new()),
            state: ReentrantMutex::new(RefCell::new(ResolutionState::new())),
            scope: ScopeId::new(),
            depth: 0,
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "syringe",
            scope_id = %provider.scope,
            registrations = provider.registrations.len(),
            "Built root service provider"
        );

        provider
    }

    /// Create a child scope.
    ///
    /// The scope shares this provider's registrations and singletons and
    /// starts with an empty scoped cache.
    pub fn create_scope(&self) -> ServiceProvider {
        let scope = Self {
            registrations: self.registrations.clone(),
            singletons: Arc::clone(&self.singletons),
            state: ReentrantMutex::new(RefCell::new(ResolutionState::new())),
            scope: ScopeId::new(),
            depth: self.depth + 1,
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "syringe",
            parent_scope_id = %self.scope,
            scope_id = %scope.scope,
            depth = scope.depth,
            "Created child scope"
        );

        scope
    }

    /// Alias for `create_scope()`.
    #[inline]
    pub fn scope(&self) -> ServiceProvider {
        self.create_scope()
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve contract `C`.
    ///
    /// Holds this provider's resolution lock until the whole dependency tree
    /// of `C` has been resolved.
    pub fn resolve<C: ?Sized + Contract>(&self) -> Result<Arc<C>> {
        let contract = ContractKey::of::<C>();
        let instance = self.resolve_entry(&contract)?;
        downcast::<C>(&contract, &instance)
    }

    /// Resolve contract `C`, discarding the error.
    #[inline]
    pub fn try_resolve<C: ?Sized + Contract>(&self) -> Option<Arc<C>> {
        self.resolve::<C>().ok()
    }

    /// Resolve contract `C` or panic.
    ///
    /// # Panics
    ///
    /// Panics with the resolution error if `C` cannot be resolved.
    pub fn require_resolve<C: ?Sized + Contract>(&self) -> Arc<C> {
        match self.resolve::<C>() {
            Ok(service) => service,
            Err(err) => panic!(
                "required service {} could not be resolved: {err}",
                ContractKey::of::<C>()
            ),
        }
    }

    fn resolve_entry(&self, contract: &ContractKey) -> Result<AnyArc> {
        let guard = self.state.lock();

        // Already borrowed means this thread is inside one of our own
        // resolutions.
        let Ok(mut state) = guard.try_borrow_mut() else {
            #[cfg(feature = "logging")]
            debug!(
                target: "syringe",
                contract = %contract,
                scope_id = %self.scope,
                "Rejected re-entrant resolution"
            );
            return Err(DiError::ReentrantResolution { contract: *contract });
        };

        // A panic that unwound out of a factory may have left entries behind.
        state.path.clear();

        let mut resolver = Resolver {
            provider: self,
            state: &mut *state,
            owner: None,
            staged: Vec::new(),
        };
        resolver.resolve_key(contract)
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Check if contract `C` is registered.
    #[inline]
    pub fn contains<C: ?Sized + Contract>(&self) -> bool {
        self.registrations.contains(&ContractKey::of::<C>())
    }

    /// The registrations this provider resolves from.
    #[inline]
    pub fn registrations(&self) -> &RegistrationSet {
        &self.registrations
    }

    /// Get the scope ID.
    #[inline]
    pub fn scope_id(&self) -> ScopeId {
        self.scope
    }

    /// Get the scope depth (0 = root).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Check if this is the root provider.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Emit one `debug` record per registration, in registration order.
    pub fn log_registrations(&self) {
        #[cfg(feature = "logging")]
        for (index, descriptor) in self.registrations.iter().enumerate() {
            debug!(
                target: "syringe",
                index = index,
                contract = %descriptor.contract(),
                lifetime = descriptor.lifetime().as_str(),
                strategy = descriptor.strategy().map_or("none", |s| s.kind()),
                "Registration"
            );
        }
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Release this provider.
    ///
    /// Runs the teardown hooks of every instance this provider created, most
    /// recent first, and forgets its scoped instances. On the root this also
    /// tears down every singleton of the tree, even ones still referenced by
    /// live scopes.
    pub fn dispose(mut self) {
        let released = self.state.get_mut().get_mut().release();
        let singletons = if self.is_root() {
            self.singletons.release()
        } else {
            0
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "syringe",
            scope_id = %self.scope,
            depth = self.depth,
            released = released,
            singletons = singletons,
            "Disposed service provider"
        );
        #[cfg(not(feature = "logging"))]
        let _ = (released, singletons);
    }
}

impl Drop for ServiceProvider {
    fn drop(&mut self) {
        self.state.get_mut().get_mut().release();
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("scope_id", &self.scope)
            .field("depth", &self.depth)
            .field("registrations", &self.registrations.len())
            .field("singletons", &self.singletons.len())
            .finish()
    }
}

/// Run hooks most recent first.
fn run_teardown(hooks: Vec<Teardown>) {
    for hook in hooks.into_iter().rev() {
        hook();
    }
}

fn downcast<C: ?Sized + Contract>(contract: &ContractKey, instance: &AnyArc) -> Result<Arc<C>> {
    instance
        .downcast_ref::<Arc<C>>()
        .map(Arc::clone)
        .ok_or_else(|| DiError::invalid(*contract, "cached instance has a different type"))
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolution handle given to factories and blueprints.
///
/// Everything resolved through a `Resolver` shares the caches and the
/// resolution path of the provider that started the resolution, so cycles are
/// detected across factory boundaries.
///
/// ```rust
/// use std::sync::Arc;
/// use syringe::ServiceCollection;
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// let services = ServiceCollection::new();
/// services
///     .add_singleton_instance(Arc::new(Config { url: "postgres://localhost".into() }))
///     .add_scoped_factory::<Database, _>(|resolver| {
///         let config = resolver.resolve::<Config>()?;
///         resolver.on_dispose(|| println!("closing connection"));
///         Ok(Arc::new(Database { url: config.url.clone() }))
///     });
///
/// let provider = services.build_provider();
/// let scope = provider.create_scope();
/// assert_eq!(scope.resolve::<Database>().unwrap().url, "postgres://localhost");
/// scope.dispose();
/// ```
pub struct Resolver<'a> {
    provider: &'a ServiceProvider,
    state: &'a mut ResolutionState,
    /// Longest lifetime among the instances being built on this path, `None`
    /// at the public entry point
    owner: Option<Lifetime>,
    /// Hooks registered for the instance being built, committed once it is
    /// produced
    staged: Vec<Teardown>,
}

impl Resolver<'_> {
    /// Resolve contract `C` as part of the current resolution.
    pub fn resolve<C: ?Sized + Contract>(&mut self) -> Result<Arc<C>> {
        let contract = ContractKey::of::<C>();
        let instance = self.resolve_key(&contract)?;
        downcast::<C>(&contract, &instance)
    }

    /// Resolve contract `C` if it can be.
    ///
    /// Missing or failing services give `Ok(None)`. Circular dependencies
    /// are still reported as errors.
    pub fn try_resolve<C: ?Sized + Contract>(&mut self) -> Result<Option<Arc<C>>> {
        match self.resolve::<C>() {
            Ok(service) => Ok(Some(service)),
            Err(err) if err.is_structural() => Err(err),
            Err(_) => Ok(None),
        }
    }

    /// Check if contract `C` is registered.
    #[inline]
    pub fn contains<C: ?Sized + Contract>(&self) -> bool {
        self.provider.contains::<C>()
    }

    /// Run `hook` when the instance being built is released.
    ///
    /// The hook only takes effect once the instance has been produced: if the
    /// factory (or anything it is built into) fails, or a concurrent
    /// resolution caches its own singleton first, the hook is discarded or
    /// run right away instead.
    ///
    /// An instance is released with the longest-lived instance holding it.
    /// If any instance on the resolution path is a singleton, that is when
    /// the root provider is disposed (or the last provider of the tree is
    /// dropped). Otherwise it is when the provider that resolved it is
    /// disposed or dropped. Hooks run most recent first.
    ///
    /// Hooks of transient instances resolved straight from a provider are
    /// kept until that provider is released, so a long-lived root
    /// accumulates one hook per such resolution.
    pub fn on_dispose<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.owner.is_some() {
            self.staged.push(Box::new(hook));
        } else {
            self.state.teardown.push(Box::new(hook));
        }
    }

    /// Contracts currently being resolved, outermost first.
    #[inline]
    pub fn path(&self) -> &[ContractKey] {
        &self.state.path
    }

    /// ID of the provider performing the resolution.
    #[inline]
    pub fn scope_id(&self) -> ScopeId {
        self.provider.scope
    }

    /// Depth of the provider performing the resolution.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.provider.depth
    }

    /// Resolve `contract`, tracking it on the resolution path.
    pub(crate) fn resolve_key(&mut self, contract: &ContractKey) -> Result<AnyArc> {
        if self.state.path.contains(contract) {
            let mut path = self.state.path.clone();
            path.push(*contract);

            #[cfg(feature = "logging")]
            debug!(
                target: "syringe",
                contract = %contract,
                path_len = path.len(),
                scope_id = %self.provider.scope,
                "Circular dependency detected"
            );

            return Err(DiError::CircularDependency { path });
        }

        self.state.path.push(*contract);
        let result = self.resolve_on_path(contract);
        self.state.path.pop();
        result
    }

    fn resolve_on_path(&mut self, contract: &ContractKey) -> Result<AnyArc> {
        let provider = self.provider;

        if let Some(instance) = provider.singletons.get(contract) {
            #[cfg(feature = "logging")]
            trace!(
                target: "syringe",
                contract = %contract,
                location = "singleton",
                "Service resolved from cache"
            );
            return Ok(instance);
        }

        if let Some(instance) = self.state.scoped.get(contract) {
            #[cfg(feature = "logging")]
            trace!(
                target: "syringe",
                contract = %contract,
                location = "scoped",
                depth = provider.depth,
                "Service resolved from cache"
            );
            return Ok(instance);
        }

        let Some(descriptor) = provider.registrations.find(contract) else {
            #[cfg(feature = "logging")]
            debug!(
                target: "syringe",
                contract = %contract,
                path_len = self.state.path.len(),
                "Service not registered"
            );
            return Err(DiError::not_found(*contract));
        };

        let Some(strategy) = descriptor.strategy() else {
            return Err(DiError::invalid(
                *contract,
                "registered without a way to produce it",
            ));
        };

        let lifetime = descriptor.lifetime();

        #[cfg(feature = "logging")]
        trace!(
            target: "syringe",
            contract = %contract,
            lifetime = lifetime.as_str(),
            strategy = strategy.kind(),
            path_len = self.state.path.len(),
            "Resolving service (cache miss)"
        );

        let owner = self.owner.map_or(lifetime, |owner| owner.max(lifetime));

        // Hooks staged by a failed factory are dropped with `nested`.
        let (instance, staged) = {
            let mut nested = Resolver {
                provider,
                state: &mut *self.state,
                owner: Some(owner),
                staged: Vec::new(),
            };
            let instance = strategy.produce(contract, &mut nested)?;
            (instance, nested.staged)
        };

        if !contract.admits(&instance) {
            return Err(DiError::invalid(
                *contract,
                format!("{} did not produce an Arc<{}>", strategy.kind(), contract),
            ));
        }

        Ok(match lifetime {
            Lifetime::Singleton => {
                let (cached, inserted) = provider.singletons.get_or_insert(*contract, instance);
                if inserted {
                    provider.singletons.adopt_teardown(staged);
                } else {
                    #[cfg(feature = "logging")]
                    debug!(
                        target: "syringe",
                        contract = %contract,
                        hooks = staged.len(),
                        "Discarding singleton built by a concurrent resolution"
                    );
                    run_teardown(staged);
                }
                cached
            }
            Lifetime::Scoped => {
                self.state.scoped.insert(*contract, Arc::clone(&instance));
                self.commit(owner, staged);
                instance
            }
            Lifetime::Transient => {
                if self.owner.is_some() {
                    // Lives and dies with the instance it is being built into
                    self.staged.extend(staged);
                } else {
                    self.commit(owner, staged);
                }
                instance
            }
        })
    }

    /// Hand the hooks of a produced, non-singleton instance to its owner.
    fn commit(&mut self, owner: Lifetime, staged: Vec<Teardown>) {
        if owner == Lifetime::Singleton {
            self.provider.singletons.adopt_teardown(staged);
        } else {
            self.state.teardown.extend(staged);
        }
    }
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("scope_id", &self.provider.scope)
            .field("path", &self.state.path)
            .field("owner", &self.owner)
            .field("staged", &self.staged.len())
            .finish()
    }
}
