//! Registration builder
//!
//! A `ServiceCollection` accumulates [`Descriptor`]s, one per call, and
//! freezes them into a [`ServiceProvider`]. It never resolves anything
//! itself.

use crate::blueprint::Blueprint;
use crate::factory::{FactoryResult, Strategy};
use crate::storage::RegistrationSet;
use crate::{Contract, ContractKey, Descriptor, Implements, Lifetime, Resolver, ServiceProvider};
use parking_lot::RwLock;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Collects service registrations.
///
/// All methods take `&self` and return `&Self`, so registrations can be
/// chained and the collection can be shared between setup functions.
/// Registering a contract twice is allowed: the last registration wins.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use syringe::{provides, Blueprint, ServiceCollection};
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str);
/// }
///
/// #[derive(Default)]
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) { println!("{msg}"); }
/// }
///
/// provides!(ConsoleLogger => dyn Logger);
///
/// impl Blueprint for ConsoleLogger {
///     const SLOTS: &'static [syringe::Slot<Self>] = &[];
/// }
///
/// let services = ServiceCollection::new();
/// services.add_singleton::<dyn Logger, ConsoleLogger>();
///
/// let provider = services.build_provider();
/// provider.resolve::<dyn Logger>().unwrap().log("ready");
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    descriptors: RwLock<Vec<Descriptor>>,
}

impl ServiceCollection {
    /// Create an empty collection.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            descriptors: RwLock::new(Vec::with_capacity(capacity)),
        }
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register blueprint `B` as the singleton implementation of `C`.
    #[inline]
    pub fn add_singleton<C, B>(&self) -> &Self
    where
        C: ?Sized + Contract,
        B: Blueprint + Implements<C>,
    {
        self.add_blueprint::<C, B>(Lifetime::Singleton)
    }

    /// Register a factory producing the singleton instance of `C`.
    ///
    /// The factory runs at most once per scope tree.
    #[inline]
    pub fn add_singleton_factory<C, F>(&self, factory: F) -> &Self
    where
        C: ?Sized + Contract,
        F: Fn(&mut Resolver<'_>) -> FactoryResult<C> + Send + Sync + 'static,
    {
        self.add_factory::<C, F>(Lifetime::Singleton, factory)
    }

    /// Register a pre-built singleton instance of `C`.
    ///
    /// The instance is handed out as-is: it is never field-injected.
    #[inline]
    pub fn add_singleton_instance<C: ?Sized + Contract>(&self, instance: Arc<C>) -> &Self {
        self.register::<C>(Lifetime::Singleton, Some(Strategy::instance(instance)))
    }

    /// Register blueprint `B` as the scoped implementation of `C`.
    #[inline]
    pub fn add_scoped<C, B>(&self) -> &Self
    where
        C: ?Sized + Contract,
        B: Blueprint + Implements<C>,
    {
        self.add_blueprint::<C, B>(Lifetime::Scoped)
    }

    /// Register a factory producing one instance of `C` per scope.
    #[inline]
    pub fn add_scoped_factory<C, F>(&self, factory: F) -> &Self
    where
        C: ?Sized + Contract,
        F: Fn(&mut Resolver<'_>) -> FactoryResult<C> + Send + Sync + 'static,
    {
        self.add_factory::<C, F>(Lifetime::Scoped, factory)
    }

    /// Register blueprint `B` as the transient implementation of `C`.
    #[inline]
    pub fn add_transient<C, B>(&self) -> &Self
    where
        C: ?Sized + Contract,
        B: Blueprint + Implements<C>,
    {
        self.add_blueprint::<C, B>(Lifetime::Transient)
    }

    /// Register a factory producing a new instance of `C` on every resolve.
    #[inline]
    pub fn add_transient_factory<C, F>(&self, factory: F) -> &Self
    where
        C: ?Sized + Contract,
        F: Fn(&mut Resolver<'_>) -> FactoryResult<C> + Send + Sync + 'static,
    {
        self.add_factory::<C, F>(Lifetime::Transient, factory)
    }

    /// Declare contract `C` without any way to produce it.
    ///
    /// The contract counts as registered, but resolving it fails with
    /// [`DiError::InvalidServiceType`](crate::DiError::InvalidServiceType).
    #[inline]
    pub fn declare<C: ?Sized + Contract>(&self, lifetime: Lifetime) -> &Self {
        self.register::<C>(lifetime, None)
    }

    /// Add a hand-built descriptor.
    pub fn add(&self, descriptor: Descriptor) -> &Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "syringe",
            contract = %descriptor.contract(),
            lifetime = descriptor.lifetime().as_str(),
            strategy = descriptor.strategy().map_or("none", |s| s.kind()),
            "Registering descriptor"
        );

        self.descriptors.write().push(descriptor);
        self
    }

    fn add_blueprint<C, B>(&self, lifetime: Lifetime) -> &Self
    where
        C: ?Sized + Contract,
        B: Blueprint + Implements<C>,
    {
        self.register::<C>(lifetime, Some(Strategy::blueprint::<C, B>()))
    }

    fn add_factory<C, F>(&self, lifetime: Lifetime, factory: F) -> &Self
    where
        C: ?Sized + Contract,
        F: Fn(&mut Resolver<'_>) -> FactoryResult<C> + Send + Sync + 'static,
    {
        self.register::<C>(lifetime, Some(Strategy::factory::<C, F>(factory)))
    }

    fn register<C: ?Sized + Contract>(&self, lifetime: Lifetime, strategy: Option<Strategy>) -> &Self {
        let contract = ContractKey::of::<C>();
        let mut descriptors = self.descriptors.write();

        #[cfg(feature = "logging")]
        debug!(
            target: "syringe",
            contract = %contract,
            lifetime = lifetime.as_str(),
            strategy = strategy.as_ref().map_or("none", Strategy::kind),
            service_count = descriptors.len() + 1,
            "Registering service"
        );

        descriptors.push(Descriptor::new(contract, lifetime, strategy));
        self
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Number of descriptors, duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }

    /// Check if contract `C` has been registered.
    #[inline]
    pub fn contains<C: ?Sized + Contract>(&self) -> bool {
        let contract = ContractKey::of::<C>();
        self.descriptors
            .read()
            .iter()
            .any(|descriptor| descriptor.contract() == &contract)
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Build a root provider from a snapshot of the current registrations.
    ///
    /// Registrations added afterwards are not seen by this provider.
    pub fn build_provider(&self) -> ServiceProvider {
        let registrations = RegistrationSet::new(self.descriptors.read().clone());
        ServiceProvider::root(registrations)
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("descriptors", &*self.descriptors.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{provides, DiError};

    trait Storage: Send + Sync {
        fn name(&self) -> &'static str;
    }

    #[derive(Default)]
    struct Memory;

    impl Storage for Memory {
        fn name(&self) -> &'static str {
            "memory"
        }
    }

    impl Blueprint for Memory {
        const SLOTS: &'static [crate::Slot<Self>] = &[];
    }

    provides!(Memory => dyn Storage);

    struct Disk;

    impl Storage for Disk {
        fn name(&self) -> &'static str {
            "disk"
        }
    }

    #[test]
    fn test_one_descriptor_per_call() {
        let services = ServiceCollection::new();
        assert!(services.is_empty());

        services
            .add_singleton::<dyn Storage, Memory>()
            .add_scoped::<dyn Storage, Memory>()
            .add_transient::<Memory, Memory>();

        assert_eq!(services.len(), 3);
        assert!(services.contains::<dyn Storage>());
        assert!(services.contains::<Memory>());
        assert!(!services.contains::<Disk>());
    }

    #[test]
    fn test_descriptor_lifetimes() {
        let services = ServiceCollection::new();
        services
            .add_scoped_factory::<dyn Storage, _>(|_| Ok(Arc::new(Disk)))
            .declare::<Disk>(Lifetime::Singleton);

        let provider = services.build_provider();
        let lifetimes: Vec<_> = provider
            .registrations()
            .iter()
            .map(|d| (d.lifetime(), d.strategy().map(Strategy::kind)))
            .collect();

        assert_eq!(
            lifetimes,
            vec![
                (Lifetime::Scoped, Some("factory")),
                (Lifetime::Singleton, None),
            ]
        );
    }

    #[test]
    fn test_last_registration_wins() {
        let services = ServiceCollection::new();
        services
            .add_singleton::<dyn Storage, Memory>()
            .add_singleton_instance::<dyn Storage>(Arc::new(Disk));

        let provider = services.build_provider();
        assert_eq!(provider.resolve::<dyn Storage>().unwrap().name(), "disk");
    }

    #[test]
    fn test_built_provider_is_a_snapshot() {
        let services = ServiceCollection::new();
        services.add_transient::<dyn Storage, Memory>();

        let provider = services.build_provider();
        services.add_singleton_instance::<dyn Storage>(Arc::new(Disk));
        services.add_singleton_instance(Arc::new(Disk));

        assert_eq!(provider.resolve::<dyn Storage>().unwrap().name(), "memory");
        assert!(matches!(
            provider.resolve::<Disk>(),
            Err(DiError::ServiceNotFound { .. })
        ));

        let rebuilt = services.build_provider();
        assert_eq!(rebuilt.resolve::<dyn Storage>().unwrap().name(), "disk");
    }

    #[test]
    fn test_shared_between_threads() {
        let services = Arc::new(ServiceCollection::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let services = Arc::clone(&services);
                std::thread::spawn(move || {
                    services.add_transient::<dyn Storage, Memory>();
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(services.len(), 4);
    }
}
