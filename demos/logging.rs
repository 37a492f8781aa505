//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use std::sync::Arc;
use syringe::{Blueprint, ServiceCollection};

trait Database: Send + Sync {}
trait Repository: Send + Sync {}
trait Auditor: Send + Sync {}

struct Postgres;
impl Database for Postgres {}

#[allow(dead_code)]
#[derive(Default, Blueprint)]
#[provides(dyn Repository)]
struct UserRepository {
    db: Option<Arc<dyn Database>>,
    // Never registered, skipped at debug level
    audit: Option<Arc<dyn Auditor>>,
}

impl Repository for UserRepository {}

struct RequestContext {
    request_id: String,
}

fn main() {
    // Trace level to see cache hits; RUST_LOG overrides.
    // Falls back to plain text when logging-json is not enabled.
    syringe::logging::builder().trace().from_env().json().init();

    println!("=== Syringe Logging Demo ===\n");

    let services = ServiceCollection::new();

    // logs: "Registering service"
    services
        .add_singleton_factory::<dyn Database, _>(|resolver| {
            println!("  [App] Database being created...");
            resolver.on_dispose(|| println!("  [App] Database closed"));
            Ok(Arc::new(Postgres))
        })
        .add_scoped::<dyn Repository, UserRepository>()
        .add_scoped_factory::<RequestContext, _>(|resolver| {
            Ok(Arc::new(RequestContext {
                request_id: format!("req-{}", resolver.scope_id().id()),
            }))
        });

    // logs: "Built root service provider"
    let provider = services.build_provider();

    // logs: one "Registration" record per descriptor
    provider.log_registrations();

    // logs: "Resolving service (cache miss)", "Skipping optional slot"
    let request = provider.create_scope();
    let _repo = request.resolve::<dyn Repository>().unwrap();

    // logs: "Service resolved from cache"
    let _again = request.resolve::<dyn Repository>().unwrap();
    let ctx = request.resolve::<RequestContext>().unwrap();
    println!("  [App] Handling {}", ctx.request_id);

    // logs: "Service not registered"
    assert!(request.try_resolve::<String>().is_none());

    // logs: "Disposed service provider"
    request.dispose();
    provider.dispose();

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
