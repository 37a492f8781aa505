//! Field injection for blueprint types
//!
//! A blueprint is a concrete type the provider default-constructs and then
//! wires up. Which fields get wired is described by a static table of
//! [`Slot`]s, one per contract-typed field, so no runtime type inspection is
//! involved. `#[derive(Blueprint)]` generates the table; it can also be
//! written by hand:
//!
//! ```rust
//! use std::sync::Arc;
//! use syringe::{assign_slot, AnyArc, Blueprint, ContractKey, ServiceCollection, Slot};
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { 1_700_000_000 }
//! }
//!
//! #[derive(Default)]
//! struct AuditLog {
//!     clock: Option<Arc<dyn Clock>>,
//!     entries: Vec<String>,
//! }
//!
//! impl AuditLog {
//!     fn assign_clock(&mut self, instance: &AnyArc) -> bool {
//!         assign_slot(&mut self.clock, instance)
//!     }
//! }
//!
//! impl Blueprint for AuditLog {
//!     const SLOTS: &'static [Slot<Self>] = &[
//!         Slot::optional("clock", ContractKey::of::<dyn Clock>, Self::assign_clock),
//!     ];
//! }
//!
//! let services = ServiceCollection::new();
//! services
//!     .add_singleton_instance::<dyn Clock>(Arc::new(FixedClock))
//!     .add_transient::<AuditLog, AuditLog>();
//!
//! let provider = services.build_provider();
//! let log = provider.resolve::<AuditLog>().unwrap();
//! assert_eq!(log.clock.as_ref().map(|c| c.now()), Some(1_700_000_000));
//! assert!(log.entries.is_empty());
//! ```

use crate::{AnyArc, Contract, ContractKey, DiError, Resolver, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// A concrete type the provider can construct and field-inject.
///
/// Construction is `Default::default()` followed by injection of every slot
/// in [`SLOTS`](Blueprint::SLOTS), in order. Fields that have no slot keep
/// their default value.
pub trait Blueprint: Default + Send + Sync + 'static {
    /// Contract-typed fields, in declaration order.
    const SLOTS: &'static [Slot<Self>];
}

/// What happens when a slot's contract cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InjectPolicy {
    /// Leave the field unset and carry on.
    ///
    /// Circular dependencies still fail the resolution.
    #[default]
    BestEffort,
    /// Fail the construction of the owning blueprint.
    Required,
}

/// One contract-typed field of a blueprint.
pub struct Slot<B> {
    /// Field name, for diagnostics
    pub field: &'static str,
    /// Contract held by the field
    pub contract: fn() -> ContractKey,
    /// Failure policy
    pub policy: InjectPolicy,
    /// Stores a resolved instance in the field; false if it is the wrong type
    pub assign: fn(&mut B, &AnyArc) -> bool,
}

impl<B> Slot<B> {
    /// A best-effort slot.
    pub const fn optional(
        field: &'static str,
        contract: fn() -> ContractKey,
        assign: fn(&mut B, &AnyArc) -> bool,
    ) -> Self {
        Self {
            field,
            contract,
            policy: InjectPolicy::BestEffort,
            assign,
        }
    }

    /// A slot whose failure fails the blueprint.
    pub const fn required(
        field: &'static str,
        contract: fn() -> ContractKey,
        assign: fn(&mut B, &AnyArc) -> bool,
    ) -> Self {
        Self {
            field,
            contract,
            policy: InjectPolicy::Required,
            assign,
        }
    }
}

impl<B> std::fmt::Debug for Slot<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("field", &self.field)
            .field("contract", &(self.contract)())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Store `instance` in `field` if it holds an `Arc<C>`.
///
/// This is the assign function every generated slot delegates to.
#[inline]
pub fn assign_slot<C: ?Sized + Contract>(field: &mut Option<Arc<C>>, instance: &AnyArc) -> bool {
    match instance.downcast_ref::<Arc<C>>() {
        Some(service) => {
            *field = Some(Arc::clone(service));
            true
        }
        None => false,
    }
}

/// Resolve and assign every slot of `target`, depth-first, in slot order.
///
/// Nested resolutions go through the same resolver, never through the
/// provider's locking entry point.
pub(crate) fn inject_fields<B: Blueprint>(target: &mut B, resolver: &mut Resolver<'_>) -> Result<()> {
    for slot in B::SLOTS {
        let contract = (slot.contract)();

        let outcome = resolver.resolve_key(&contract).and_then(|instance| {
            if (slot.assign)(target, &instance) {
                Ok(())
            } else {
                Err(DiError::invalid(
                    contract,
                    format!(
                        "slot `{}` of {} cannot hold this instance",
                        slot.field,
                        std::any::type_name::<B>()
                    ),
                ))
            }
        });

        let Err(err) = outcome else { continue };

        if slot.policy == InjectPolicy::Required || err.is_structural() {
            return Err(err);
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "syringe",
            blueprint = std::any::type_name::<B>(),
            field = slot.field,
            contract = %contract,
            error = %err,
            "Skipping optional slot"
        );
        #[cfg(not(feature = "logging"))]
        let _ = err;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{provides, ServiceCollection};
    use std::sync::Mutex;

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    trait Mailer: Send + Sync {
        fn send(&self) -> u64;
    }

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            self.0
        }
    }

    // Mailer blueprint that depends on the clock.
    #[derive(Default)]
    struct SmtpMailer {
        clock: Option<Arc<dyn Clock>>,
    }

    impl Mailer for SmtpMailer {
        fn send(&self) -> u64 {
            self.clock.as_ref().map_or(0, |c| c.now())
        }
    }

    impl SmtpMailer {
        fn assign_clock(&mut self, instance: &AnyArc) -> bool {
            assign_slot(&mut self.clock, instance)
        }
    }

    impl Blueprint for SmtpMailer {
        const SLOTS: &'static [Slot<Self>] = &[Slot::optional(
            "clock",
            ContractKey::of::<dyn Clock>,
            Self::assign_clock,
        )];
    }

    provides!(SmtpMailer => dyn Mailer);

    // One contract-typed field, one concrete field.
    #[derive(Default)]
    struct Signup {
        mailer: Option<Arc<dyn Mailer>>,
        retries: u32,
    }

    impl Signup {
        fn assign_mailer(&mut self, instance: &AnyArc) -> bool {
            assign_slot(&mut self.mailer, instance)
        }
    }

    impl Blueprint for Signup {
        const SLOTS: &'static [Slot<Self>] = &[Slot::optional(
            "mailer",
            ContractKey::of::<dyn Mailer>,
            Self::assign_mailer,
        )];
    }

    #[derive(Default)]
    struct StrictSignup {
        mailer: Option<Arc<dyn Mailer>>,
    }

    impl StrictSignup {
        fn assign_mailer(&mut self, instance: &AnyArc) -> bool {
            assign_slot(&mut self.mailer, instance)
        }
    }

    impl Blueprint for StrictSignup {
        const SLOTS: &'static [Slot<Self>] = &[Slot::required(
            "mailer",
            ContractKey::of::<dyn Mailer>,
            Self::assign_mailer,
        )];
    }

    #[test]
    fn test_contract_field_populated_and_concrete_field_untouched() {
        let services = ServiceCollection::new();
        services
            .add_singleton_instance::<dyn Clock>(Arc::new(FixedClock(99)))
            .add_transient::<dyn Mailer, SmtpMailer>()
            .add_transient::<Signup, Signup>();

        let provider = services.build_provider();
        let signup = provider.resolve::<Signup>().unwrap();

        let mailer = signup.mailer.as_ref().expect("mailer injected");
        assert_eq!(mailer.send(), 99);
        assert_eq!(signup.retries, 0);
    }

    #[test]
    fn test_missing_optional_slot_left_unset() {
        let services = ServiceCollection::new();
        services.add_transient::<Signup, Signup>();

        let provider = services.build_provider();
        let signup = provider.resolve::<Signup>().unwrap();

        assert!(signup.mailer.is_none());
    }

    #[test]
    fn test_failing_optional_slot_left_unset() {
        let services = ServiceCollection::new();
        services
            .add_transient_factory::<dyn Mailer, _>(|_| Err("smtp unreachable".into()))
            .add_transient::<Signup, Signup>();

        let provider = services.build_provider();
        let signup = provider.resolve::<Signup>().unwrap();

        assert!(signup.mailer.is_none());
    }

    #[test]
    fn test_missing_required_slot_fails_blueprint() {
        let services = ServiceCollection::new();
        services.add_transient::<StrictSignup, StrictSignup>();

        let provider = services.build_provider();
        let err = provider.resolve::<StrictSignup>().err().expect("resolution should fail");

        assert!(err.is_not_found());
        assert_eq!(err.contract(), Some(&ContractKey::of::<dyn Mailer>()));
    }

    #[test]
    fn test_nested_injection_is_depth_first() {
        static ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

        #[derive(Default)]
        struct Report {
            clock: Option<Arc<dyn Clock>>,
            mailer: Option<Arc<dyn Mailer>>,
        }

        impl Report {
            fn assign_clock(&mut self, instance: &AnyArc) -> bool {
                assign_slot(&mut self.clock, instance)
            }
            fn assign_mailer(&mut self, instance: &AnyArc) -> bool {
                assign_slot(&mut self.mailer, instance)
            }
        }

        impl Blueprint for Report {
            const SLOTS: &'static [Slot<Self>] = &[
                Slot::optional("mailer", ContractKey::of::<dyn Mailer>, Self::assign_mailer),
                Slot::optional("clock", ContractKey::of::<dyn Clock>, Self::assign_clock),
            ];
        }

        let services = ServiceCollection::new();
        services
            .add_transient_factory::<dyn Clock, _>(|_| {
                ORDER.lock().unwrap().push("clock");
                Ok(Arc::new(FixedClock(1)) as Arc<dyn Clock>)
            })
            .add_transient_factory::<dyn Mailer, _>(|resolver| {
                let clock = resolver.resolve::<dyn Clock>()?;
                ORDER.lock().unwrap().push("mailer");
                Ok(Arc::new(SmtpMailer { clock: Some(clock) }) as Arc<dyn Mailer>)
            })
            .add_transient::<Report, Report>();

        let provider = services.build_provider();
        let report = provider.resolve::<Report>().unwrap();

        assert!(report.clock.is_some());
        assert!(report.mailer.is_some());
        // mailer's own clock first, then mailer, then report's clock
        assert_eq!(*ORDER.lock().unwrap(), vec!["clock", "mailer", "clock"]);
    }

    // A -> B -> C -> A, each link a best-effort slot.
    #[derive(Default)]
    struct A {
        b: Option<Arc<B>>,
    }

    #[derive(Default)]
    struct B {
        c: Option<Arc<C>>,
    }

    #[derive(Default)]
    struct C {
        a: Option<Arc<A>>,
    }

    impl A {
        fn assign_b(&mut self, instance: &AnyArc) -> bool {
            assign_slot(&mut self.b, instance)
        }
    }

    impl B {
        fn assign_c(&mut self, instance: &AnyArc) -> bool {
            assign_slot(&mut self.c, instance)
        }
    }

    impl C {
        fn assign_a(&mut self, instance: &AnyArc) -> bool {
            assign_slot(&mut self.a, instance)
        }
    }

    impl Blueprint for A {
        const SLOTS: &'static [Slot<Self>] =
            &[Slot::optional("b", ContractKey::of::<B>, Self::assign_b)];
    }

    impl Blueprint for B {
        const SLOTS: &'static [Slot<Self>] =
            &[Slot::optional("c", ContractKey::of::<C>, Self::assign_c)];
    }

    impl Blueprint for C {
        const SLOTS: &'static [Slot<Self>] =
            &[Slot::optional("a", ContractKey::of::<A>, Self::assign_a)];
    }

    #[test]
    fn test_cycle_through_optional_slots_fails() {
        let services = ServiceCollection::new();
        services
            .add_transient::<A, A>()
            .add_transient::<B, B>()
            .add_transient::<C, C>();

        let provider = services.build_provider();
        let err = provider.resolve::<A>().err().expect("resolution should fail");

        assert!(err.is_circular());
        assert!(err.to_string().contains("A -> B -> C -> A"), "{err}");
        match err {
            DiError::CircularDependency { path } => {
                let expected = [
                    ContractKey::of::<A>(),
                    ContractKey::of::<B>(),
                    ContractKey::of::<C>(),
                    ContractKey::of::<A>(),
                ];
                assert_eq!(path, expected);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_assign_slot_rejects_wrong_type() {
        let mut field: Option<Arc<dyn Clock>> = None;
        let wrong: AnyArc = Arc::new(Arc::new(7u32));

        assert!(!assign_slot(&mut field, &wrong));
        assert!(field.is_none());
    }
}
