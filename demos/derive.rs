//! Example demonstrating the #[derive(Blueprint)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use std::sync::Arc;
use syringe::{Blueprint, ServiceCollection};

// Contracts
trait Database: Send + Sync {
    fn url(&self) -> &str;
}

trait Cache: Send + Sync {
    fn size(&self) -> usize;
}

trait Logger: Send + Sync {
    fn level(&self) -> &str;
}

trait Users: Send + Sync {
    fn describe(&self) -> String;
}

// Implementations registered as instances
struct Postgres {
    url: String,
}

impl Database for Postgres {
    fn url(&self) -> &str {
        &self.url
    }
}

struct MemoryCache {
    size: usize,
}

impl Cache for MemoryCache {
    fn size(&self) -> usize {
        self.size
    }
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn level(&self) -> &str {
        "DEBUG"
    }
}

// Blueprint: default-constructed, then its contract fields are injected
#[derive(Default, Blueprint)]
#[provides(dyn Users)]
struct UserService {
    #[inject(required)]
    db: Option<Arc<dyn Database>>,
    cache: Option<Arc<dyn Cache>>,
    logger: Option<Arc<dyn Logger>>,
    // Non-injected field keeps its Default
    request_count: u64,
}

impl Users for UserService {
    fn describe(&self) -> String {
        let db = self.db.as_ref().map_or("<none>", |db| db.url());
        let cache = self.cache.as_ref().map_or(0, |cache| cache.size());
        let logging = match &self.logger {
            Some(logger) => format!("logging at {}", logger.level()),
            None => "without logging".to_string(),
        };
        format!(
            "UserService connected to {db} with cache size {cache} ({logging}, requests: {})",
            self.request_count
        )
    }
}

// Nested injection: the controller's dependency is itself a blueprint
#[derive(Default, Blueprint)]
struct ApiController {
    users: Option<Arc<dyn Users>>,
}

fn main() {
    println!("=== Syringe Derive Macro Demo ===\n");

    let services = ServiceCollection::new();
    services
        .add_singleton_instance::<dyn Database>(Arc::new(Postgres {
            url: "postgres://localhost:5432/myapp".into(),
        }))
        .add_singleton_instance::<dyn Cache>(Arc::new(MemoryCache { size: 1024 }))
        .add_scoped::<dyn Users, UserService>()
        .add_transient::<ApiController, ApiController>();
    // Note: Logger is NOT registered, so it stays None

    println!("Resolving UserService...");
    let provider = services.build_provider();
    let users = provider.resolve::<dyn Users>().expect("Failed to resolve UserService");
    println!("  {}", users.describe());
    println!();

    // Register a logger and rebuild
    services.add_singleton_instance::<dyn Logger>(Arc::new(ConsoleLogger));
    let provider = services.build_provider();

    println!("Resolving ApiController with Logger...");
    let request = provider.create_scope();
    let controller = request
        .resolve::<ApiController>()
        .expect("Failed to resolve ApiController");
    if let Some(users) = &controller.users {
        println!("  {}", users.describe());
    }
    println!();

    println!("=== Demo Complete ===");
    println!("\nThe #[derive(Blueprint)] macro generated a slot table that:");
    println!("  - Injects Option<Arc<dyn Trait>> fields automatically");
    println!("  - Fails construction for #[inject(required)] fields");
    println!("  - Leaves every other field at its Default value");
}
