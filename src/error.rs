//! Error types for service resolution

use crate::ContractKey;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by factory functions.
///
/// `DiError` converts into it through `?`, so factories can resolve their own
/// dependencies and bubble failures up unchanged.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur while resolving services
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// No registration matches the requested contract
    #[error("Service not found: {contract}")]
    ServiceNotFound { contract: ContractKey },

    /// The requested contract is already being resolved further up the path
    #[error("Circular dependency detected: {}", ResolutionPath(.path))]
    CircularDependency { path: Vec<ContractKey> },

    /// A registration exists but cannot produce an instance of its contract
    #[error("Invalid service type {contract}: {reason}")]
    InvalidServiceType {
        contract: ContractKey,
        reason: String,
    },

    /// A factory reported an error
    #[error("Failed to create service {contract}: {source}")]
    FactoryFailed {
        contract: ContractKey,
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },

    /// A public entry point was re-entered while this provider was resolving
    #[error("Re-entrant resolution of {contract}: the provider is already resolving on this thread")]
    ReentrantResolution { contract: ContractKey },
}

impl DiError {
    /// Create a ServiceNotFound error
    #[inline]
    pub fn not_found(contract: ContractKey) -> Self {
        Self::ServiceNotFound { contract }
    }

    /// Create an InvalidServiceType error
    #[inline]
    pub fn invalid(contract: ContractKey, reason: impl Into<String>) -> Self {
        Self::InvalidServiceType {
            contract,
            reason: reason.into(),
        }
    }

    /// Wrap an error reported by the factory registered for `contract`.
    ///
    /// Cycle and re-entrancy errors pass through unchanged so that the
    /// diagnostics of the innermost resolution reach the caller.
    pub fn from_factory(contract: ContractKey, err: BoxError) -> Self {
        match err.downcast::<DiError>() {
            Ok(inner) if inner.is_structural() => *inner,
            Ok(inner) => Self::FactoryFailed {
                contract,
                source: Arc::new(*inner),
            },
            Err(other) => Self::FactoryFailed {
                contract,
                source: Arc::from(other),
            },
        }
    }

    /// True for `CircularDependency`.
    #[inline]
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }

    /// True for `ServiceNotFound`.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ServiceNotFound { .. })
    }

    /// Errors describing a broken wiring graph rather than a missing or
    /// failing service. These are never absorbed by best-effort injection.
    #[inline]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::CircularDependency { .. } | Self::ReentrantResolution { .. }
        )
    }

    /// The contract this error is about.
    ///
    /// For a cycle this is the contract that closed the loop.
    pub fn contract(&self) -> Option<&ContractKey> {
        match self {
            Self::ServiceNotFound { contract }
            | Self::InvalidServiceType { contract, .. }
            | Self::FactoryFailed { contract, .. }
            | Self::ReentrantResolution { contract } => Some(contract),
            Self::CircularDependency { path } => path.last(),
        }
    }
}

/// Displays a path as `A -> B -> C`.
struct ResolutionPath<'a>(&'a [ContractKey]);

impl fmt::Display for ResolutionPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    #[derive(Debug)]
    struct DiskFull;

    impl fmt::Display for DiskFull {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("disk full")
        }
    }

    impl StdError for DiskFull {}

    #[test]
    fn test_cycle_message_lists_path() {
        let err = DiError::CircularDependency {
            path: vec![
                ContractKey::of::<Alpha>(),
                ContractKey::of::<Beta>(),
                ContractKey::of::<Alpha>(),
            ],
        };

        assert_eq!(
            err.to_string(),
            "Circular dependency detected: Alpha -> Beta -> Alpha"
        );
        assert_eq!(err.contract(), Some(&ContractKey::of::<Alpha>()));
    }

    #[test]
    fn test_factory_error_is_wrapped() {
        let err = DiError::from_factory(ContractKey::of::<Alpha>(), Box::new(DiskFull));

        match &err {
            DiError::FactoryFailed { contract, source } => {
                assert_eq!(*contract, ContractKey::of::<Alpha>());
                assert_eq!(source.to_string(), "disk full");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().ends_with("disk full"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_nested_not_found_is_wrapped_with_outer_contract() {
        let inner = DiError::not_found(ContractKey::of::<Beta>());
        let err = DiError::from_factory(ContractKey::of::<Alpha>(), Box::new(inner));

        assert_eq!(err.contract(), Some(&ContractKey::of::<Alpha>()));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_cycle_passes_through_factory() {
        let cycle = DiError::CircularDependency {
            path: vec![ContractKey::of::<Beta>(), ContractKey::of::<Beta>()],
        };
        let err = DiError::from_factory(ContractKey::of::<Alpha>(), Box::new(cycle));

        assert!(err.is_circular());
        assert_eq!(err.contract(), Some(&ContractKey::of::<Beta>()));
    }
}
