//! # Syringe - Runtime Service Resolution for Rust
//!
//! Register how each service contract is produced, build a provider, and let
//! it resolve whole dependency trees on demand.
//!
//! ## Features
//!
//! - **Contracts** - Resolve by trait object (`dyn Logger`) or by concrete type
//! - **Three ways to produce** - Pre-built instances, factories, or blueprints
//!   that are default-constructed and field-injected
//! - **Lifetimes** - Transient, scoped (one per scope), singleton (one per tree)
//! - **Scopes** - Cheap child providers sharing singletons with their root
//! - **Cycle detection** - `A -> B -> C -> A` is reported, never stack-overflows
//! - **Thread-safe** - Concurrent scopes on `DashMap`, never two singletons
//! - **Observable** - Optional `tracing` integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use syringe::{Blueprint, ServiceCollection};
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str) -> String;
//! }
//!
//! trait Repository: Send + Sync {
//!     fn save(&self) -> String;
//! }
//!
//! struct Console;
//!
//! impl Logger for Console {
//!     fn log(&self, msg: &str) -> String { format!("[log] {msg}") }
//! }
//!
//! // Blueprint: default-constructed, then its `dyn` fields are injected.
//! #[derive(Default, Blueprint)]
//! #[provides(dyn Repository)]
//! struct UserRepository {
//!     logger: Option<Arc<dyn Logger>>,
//! }
//!
//! impl Repository for UserRepository {
//!     fn save(&self) -> String {
//!         self.logger.as_ref().map(|l| l.log("saved")).unwrap_or_default()
//!     }
//! }
//!
//! let services = ServiceCollection::new();
//! services
//!     .add_singleton_instance::<dyn Logger>(Arc::new(Console))
//!     .add_scoped::<dyn Repository, UserRepository>();
//!
//! let provider = services.build_provider();
//! let request = provider.create_scope();
//!
//! let repo = request.resolve::<dyn Repository>().unwrap();
//! assert_eq!(repo.save(), "[log] saved");
//! ```
//!
//! ## Factories
//!
//! ```rust
//! use std::sync::Arc;
//! use syringe::ServiceCollection;
//!
//! struct Config { url: String }
//! struct Database { url: String }
//!
//! let services = ServiceCollection::new();
//! services
//!     .add_singleton_instance(Arc::new(Config { url: "postgres://localhost".into() }))
//!     .add_singleton_factory::<Database, _>(|resolver| {
//!         let config = resolver.resolve::<Config>()?;
//!         Ok(Arc::new(Database { url: config.url.clone() }))
//!     });
//!
//! let provider = services.build_provider();
//! assert_eq!(provider.resolve::<Database>().unwrap().url, "postgres://localhost");
//! ```
//!
//! ## Errors
//!
//! Every failure is a [`DiError`]. Missing services, cycles, factory errors
//! and contract mismatches reach the caller of `resolve`. Blueprint fields
//! are injected best-effort unless marked `#[inject(required)]`: an
//! unresolvable field stays `None`, but a cycle through it still fails.

pub mod blueprint;
mod container;
mod error;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod resolver;
mod scope;
pub mod storage;

pub use blueprint::{assign_slot, Blueprint, InjectPolicy, Slot};
pub use container::*;
pub use error::*;
pub use factory::*;
pub use provider::*;
pub use resolver::*;
pub use scope::ScopeId;

#[cfg(feature = "derive")]
pub use syringe_derive::Blueprint;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        provides, Blueprint, Contract, ContractKey, DiError, FactoryResult, Implements, Lifetime,
        Resolver, Result, ServiceCollection, ServiceProvider,
    };
    pub use std::sync::Arc;
}
