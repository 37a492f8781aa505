//! Contract identities, lifetimes and registration descriptors
//!
//! These types describe *what* can be resolved and *how long* it lives.
//! The engine itself lives in [`crate::resolver`].

use crate::factory::Strategy;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type-erased instance as stored in caches and descriptors.
///
/// The value inside is always an `Arc<C>` for the contract `C` it was
/// produced for, so cloning an `AnyArc` and downcasting hands out the same
/// underlying service.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Marker trait for types that can act as a service contract.
///
/// This is automatically implemented for all `Send + Sync + 'static` types,
/// including trait objects such as `dyn Logger` when the trait has
/// `Send + Sync` as supertraits.
///
/// # Examples
///
/// ```rust
/// use syringe::Contract;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// fn assert_contract<C: ?Sized + Contract>() {}
///
/// assert_contract::<dyn Clock>();
/// assert_contract::<String>();
/// ```
pub trait Contract: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is a contract
impl<T: ?Sized + Send + Sync + 'static> Contract for T {}

/// Identity of a contract, used as the key for registrations and caches.
///
/// Two keys are equal when they were built from the same type; the name is
/// only carried for diagnostics.
#[derive(Clone, Copy)]
pub struct ContractKey {
    id: TypeId,
    handle: TypeId,
    name: &'static str,
}

impl ContractKey {
    /// Key for contract `C`.
    #[inline]
    pub fn of<C: ?Sized + Contract>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            handle: TypeId::of::<Arc<C>>(),
            name: std::any::type_name::<C>(),
        }
    }

    /// The `TypeId` of the contract type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Full type name, including module path.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// Type name with module paths stripped (`dyn app::Logger` -> `dyn Logger`).
    pub fn short_name(&self) -> String {
        strip_paths(self.name)
    }

    /// Whether `value` is an instance of this contract (an erased `Arc<C>`).
    #[inline]
    pub(crate) fn admits(&self, value: &AnyArc) -> bool {
        let value: &(dyn Any + Send + Sync) = &**value;
        value.type_id() == self.handle
    }
}

impl PartialEq for ContractKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContractKey {}

impl Hash for ContractKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContractKey").field(&self.name).finish()
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

fn strip_paths(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            segment.clear();
        } else if c.is_alphanumeric() || c == '_' {
            segment.push(c);
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(&segment);
    out
}

/// Service lifetime specification
///
/// Ordered by how long instances live: `Transient < Scoped < Singleton`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Lifetime {
    /// New instance created on every resolve
    #[default]
    Transient,

    /// One instance per scope
    Scoped,

    /// One instance shared by the root provider and all of its scopes
    Singleton,
}

impl Lifetime {
    /// Lower-case name used in log records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
            Lifetime::Singleton => "singleton",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts a shared concrete service into a shared contract.
///
/// Every type implements `Implements<Self>`. Implement it for a trait object
/// contract with [`provides!`](crate::provides) or `#[provides(...)]` on
/// `#[derive(Blueprint)]`.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use syringe::{provides, Implements};
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// #[derive(Default)]
/// struct FixedClock;
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 { 42 }
/// }
///
/// provides!(FixedClock => dyn Clock);
///
/// let clock: Arc<dyn Clock> = <FixedClock as Implements<dyn Clock>>::upcast(Arc::new(FixedClock));
/// assert_eq!(clock.now(), 42);
/// ```
pub trait Implements<C: ?Sized + Contract>: Contract + Sized {
    /// Upcast to the contract.
    fn upcast(self: Arc<Self>) -> Arc<C>;
}

impl<T: Contract> Implements<T> for T {
    #[inline]
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Declare that a concrete type provides one or more trait-object contracts.
///
/// ```rust
/// use syringe::provides;
///
/// trait Reader: Send + Sync {}
/// trait Writer: Send + Sync {}
///
/// #[derive(Default)]
/// struct File;
/// impl Reader for File {}
/// impl Writer for File {}
///
/// provides!(File => dyn Reader, dyn Writer);
/// ```
#[macro_export]
macro_rules! provides {
    ($concrete:ty => $($contract:ty),+ $(,)?) => {
        $(
            impl $crate::Implements<$contract> for $concrete {
                #[inline]
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$contract> {
                    self
                }
            }
        )+
    };
}

/// Binding of one contract to a lifetime and a production strategy.
///
/// Descriptors are produced by [`ServiceCollection`](crate::ServiceCollection)
/// and are immutable once a provider has been built from them.
#[derive(Clone)]
pub struct Descriptor {
    contract: ContractKey,
    lifetime: Lifetime,
    strategy: Option<Strategy>,
}

impl Descriptor {
    /// Create a descriptor from its parts.
    ///
    /// `strategy` may be `None`, in which case resolving the contract fails
    /// with [`DiError::InvalidServiceType`](crate::DiError::InvalidServiceType).
    #[inline]
    pub fn new(contract: ContractKey, lifetime: Lifetime, strategy: Option<Strategy>) -> Self {
        Self {
            contract,
            lifetime,
            strategy,
        }
    }

    /// The contract this descriptor binds.
    #[inline]
    pub fn contract(&self) -> &ContractKey {
        &self.contract
    }

    /// The lifetime of instances produced for the contract.
    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// The production strategy, if any.
    #[inline]
    pub fn strategy(&self) -> Option<&Strategy> {
        self.strategy.as_ref()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("contract", &self.contract)
            .field("lifetime", &self.lifetime)
            .field("strategy", &self.strategy.as_ref().map(Strategy::kind))
            .finish()
    }
}
