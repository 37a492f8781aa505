//! Production strategies for service instances
//!
//! A [`Strategy`] says how a descriptor turns into an instance: hand back a
//! pre-built value, call a factory, or default-construct a blueprint and
//! inject its fields.
//!
//! Like the rest of the crate, strategies are an enum rather than trait
//! objects so dispatch is a single match on the resolve path.

use crate::blueprint::{self, Blueprint};
use crate::error::BoxError;
use crate::{AnyArc, Contract, ContractKey, DiError, Implements, Resolver, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Result a factory returns for contract `C`.
pub type FactoryResult<C> = std::result::Result<Arc<C>, BoxError>;

/// Type-erased factory function
pub type FactoryFn =
    Arc<dyn Fn(&mut Resolver<'_>) -> std::result::Result<AnyArc, BoxError> + Send + Sync>;

/// Type-erased blueprint constructor (default-construct + field injection)
pub type BlueprintFn = Arc<dyn Fn(&mut Resolver<'_>) -> Result<AnyArc> + Send + Sync>;

/// How a registration produces its instance.
#[derive(Clone)]
pub enum Strategy {
    /// Pre-built instance, handed out as-is (never injected)
    Instance(AnyArc),
    /// Factory invoked with the resolver of the requesting provider
    Factory(FactoryFn),
    /// Concrete type default-constructed, then field-injected
    Blueprint {
        /// Name of the concrete type, for diagnostics
        concrete: &'static str,
        /// Type-erased constructor
        build: BlueprintFn,
    },
}

impl Strategy {
    /// Pre-built instance of contract `C`.
    #[inline]
    pub fn instance<C: ?Sized + Contract>(instance: Arc<C>) -> Self {
        Strategy::Instance(Arc::new(instance))
    }

    /// Factory producing contract `C`.
    ///
    /// The factory receives the [`Resolver`] of the provider performing the
    /// resolution, so it can resolve its own dependencies with `?`.
    #[inline]
    pub fn factory<C, F>(factory: F) -> Self
    where
        C: ?Sized + Contract,
        F: Fn(&mut Resolver<'_>) -> FactoryResult<C> + Send + Sync + 'static,
    {
        Strategy::Factory(erase_factory(move |resolver| {
            factory(resolver).map(|service| Arc::new(service) as AnyArc)
        }))
    }

    /// Blueprint `B` registered under contract `C`.
    #[inline]
    pub fn blueprint<C, B>() -> Self
    where
        C: ?Sized + Contract,
        B: Blueprint + Implements<C>,
    {
        Strategy::Blueprint {
            concrete: std::any::type_name::<B>(),
            build: erase_blueprint(|resolver| {
                let mut target = B::default();
                blueprint::inject_fields(&mut target, resolver)?;
                let service: Arc<C> = <B as Implements<C>>::upcast(Arc::new(target));
                Ok(Arc::new(service) as AnyArc)
            }),
        }
    }

    /// Short name of the strategy, for logs and `Debug`.
    pub fn kind(&self) -> &'static str {
        match self {
            Strategy::Instance(_) => "instance",
            Strategy::Factory(_) => "factory",
            Strategy::Blueprint { .. } => "blueprint",
        }
    }

    /// Produce a raw instance for `contract`.
    pub(crate) fn produce(&self, contract: &ContractKey, resolver: &mut Resolver<'_>) -> Result<AnyArc> {
        match self {
            Strategy::Instance(instance) => Ok(Arc::clone(instance)),
            Strategy::Factory(factory) => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "syringe",
                    contract = %contract,
                    "Invoking factory"
                );

                factory(resolver).map_err(|err| DiError::from_factory(*contract, err))
            }
            Strategy::Blueprint { concrete, build } => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "syringe",
                    contract = %contract,
                    concrete = *concrete,
                    "Constructing blueprint"
                );
                #[cfg(not(feature = "logging"))]
                let _ = concrete;

                build(resolver)
            }
        }
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Blueprint { concrete, .. } => {
                f.debug_struct("Blueprint").field("concrete", concrete).finish()
            }
            other => f.write_str(other.kind()),
        }
    }
}

// Pins the higher-ranked closure signature before erasing it.
fn erase_factory<F>(f: F) -> FactoryFn
where
    F: Fn(&mut Resolver<'_>) -> std::result::Result<AnyArc, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn erase_blueprint<F>(f: F) -> BlueprintFn
where
    F: Fn(&mut Resolver<'_>) -> Result<AnyArc> + Send + Sync + 'static,
{
    Arc::new(f)
}
