//! Integration tests for `#[derive(Blueprint)]`

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use syringe::{Blueprint, ContractKey, DiError, InjectPolicy, ServiceCollection};

trait Logger: Send + Sync {
    fn name(&self) -> &'static str;
}

trait Mailer: Send + Sync {
    fn send(&self, to: &str) -> String;
}

trait Auditor: Send + Sync {
    fn entries(&self) -> u32;
}

struct StdoutLogger;

impl Logger for StdoutLogger {
    fn name(&self) -> &'static str {
        "stdout"
    }
}

#[derive(Debug, PartialEq)]
struct Settings {
    sender: &'static str,
}

#[derive(Default, Blueprint)]
#[provides(dyn Mailer, dyn Auditor)]
struct SmtpMailer {
    logger: Option<Arc<dyn Logger>>,
    #[inject]
    settings: Option<Arc<Settings>>,
    sent: AtomicU32,
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str) -> String {
        self.sent.fetch_add(1, Ordering::SeqCst);
        let sender = self.settings.as_ref().map_or("nobody", |s| s.sender);
        let via = self.logger.as_ref().map_or("-", |l| l.name());
        format!("{sender} -> {to} via {via}")
    }
}

impl Auditor for SmtpMailer {
    fn entries(&self) -> u32 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[derive(Default, Blueprint)]
struct Signup {
    #[inject(required)]
    mailer: Option<Arc<dyn Mailer>>,
    #[inject(skip)]
    logger: Option<Arc<dyn Logger>>,
    attempts: u32,
}

#[test]
fn test_generated_slots() {
    let slots = <SmtpMailer as Blueprint>::SLOTS;

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].field, "logger");
    assert_eq!((slots[0].contract)(), ContractKey::of::<dyn Logger>());
    assert_eq!(slots[0].policy, InjectPolicy::BestEffort);
    assert_eq!(slots[1].field, "settings");
    assert_eq!((slots[1].contract)(), ContractKey::of::<Settings>());

    let signup = <Signup as Blueprint>::SLOTS;
    assert_eq!(signup.len(), 1);
    assert_eq!(signup[0].policy, InjectPolicy::Required);
}

#[test]
fn test_fields_injected() {
    let services = ServiceCollection::new();
    services
        .add_singleton_instance::<dyn Logger>(Arc::new(StdoutLogger))
        .add_singleton_instance(Arc::new(Settings { sender: "noreply" }))
        .add_transient::<dyn Mailer, SmtpMailer>();

    let provider = services.build_provider();
    let mailer = provider.resolve::<dyn Mailer>().unwrap();

    assert_eq!(mailer.send("ada"), "noreply -> ada via stdout");
}

#[test]
fn test_missing_optional_dependencies_left_unset() {
    let services = ServiceCollection::new();
    services.add_transient::<dyn Mailer, SmtpMailer>();

    let provider = services.build_provider();
    let mailer = provider.resolve::<dyn Mailer>().unwrap();

    assert_eq!(mailer.send("ada"), "nobody -> ada via -");
}

#[test]
fn test_one_type_behind_two_contracts() {
    let services = ServiceCollection::new();
    services
        .add_singleton::<dyn Mailer, SmtpMailer>()
        .add_singleton::<dyn Auditor, SmtpMailer>();

    let provider = services.build_provider();
    provider.resolve::<dyn Mailer>().unwrap().send("ada");

    // Separate registrations, separate singletons
    assert_eq!(provider.resolve::<dyn Auditor>().unwrap().entries(), 0);
}

#[test]
fn test_required_slot_and_skip() {
    let services = ServiceCollection::new();
    services
        .add_singleton_instance::<dyn Logger>(Arc::new(StdoutLogger))
        .add_transient::<Signup, Signup>();

    let provider = services.build_provider();
    let err = provider.resolve::<Signup>().err().expect("resolution should fail");
    assert!(matches!(
        err,
        DiError::ServiceNotFound { contract } if contract == ContractKey::of::<dyn Mailer>()
    ));

    services.add_scoped::<dyn Mailer, SmtpMailer>();
    let provider = services.build_provider();
    let signup = provider.resolve::<Signup>().unwrap();

    assert!(signup.mailer.is_some());
    assert!(signup.logger.is_none());
    assert_eq!(signup.attempts, 0);
}

// A -> B -> C -> A through auto-detected trait-object fields
trait A: Send + Sync {}
trait B: Send + Sync {}
trait C: Send + Sync {}

#[derive(Default, Blueprint)]
#[provides(dyn A)]
struct ServiceA {
    b: Option<Arc<dyn B>>,
}

#[derive(Default, Blueprint)]
#[provides(dyn B)]
struct ServiceB {
    c: Option<Arc<dyn C>>,
}

#[derive(Default, Blueprint)]
#[provides(dyn C)]
struct ServiceC {
    a: Option<Arc<dyn A>>,
}

impl A for ServiceA {}
impl B for ServiceB {}
impl C for ServiceC {}

#[test]
fn test_cycle_detected_through_derived_slots() {
    let services = ServiceCollection::new();
    services
        .add_transient::<dyn A, ServiceA>()
        .add_transient::<dyn B, ServiceB>()
        .add_transient::<dyn C, ServiceC>();

    let provider = services.build_provider();
    let err = provider.resolve::<dyn A>().err().expect("resolution should fail");

    assert!(err.is_circular());
    assert_eq!(
        err.to_string(),
        "Circular dependency detected: dyn A -> dyn B -> dyn C -> dyn A"
    );
}

#[test]
fn test_self_dependency_is_a_cycle() {
    #[derive(Default, Blueprint)]
    struct Node {
        #[inject]
        next: Option<Arc<Node>>,
    }

    let services = ServiceCollection::new();
    services.add_transient::<Node, Node>();

    let provider = services.build_provider();
    let err = provider.resolve::<Node>().err().expect("resolution should fail");

    match err {
        DiError::CircularDependency { path } => {
            assert_eq!(path, [ContractKey::of::<Node>(), ContractKey::of::<Node>()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
