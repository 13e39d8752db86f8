//! Dyehouse server with demo accounts
//!
//! Usage: `cargo run --example server [config.yaml]`
//!
//! Without a config file, or when it seeds no users, one account per role is
//! created: admin/admin123, operator/operator123, factory/factory123 and
//! sales/sales123.

use anyhow::Result;
use dyehouse::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dyehouse=info,tower_http=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_yaml_file(&path)?,
        None => AppConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;

    let users = if config.users.is_empty() {
        tracing::info!("no users configured, seeding demo accounts");
        AppConfig::demo_users()
    } else {
        config.users.clone()
    };
    let store = InMemoryStore::with_users(users)?;

    println!("🧶 Dyehouse order tracking");
    println!("\n🌐 Server running on http://{}", config.server.bind);
    println!("\n📚 Routes:");
    println!("    GET    /health");
    println!("    POST   /api/auth/login");
    println!("    POST   /api/auth/logout");
    println!("    GET    /api/auth/me");
    println!("    GET    /api/auth/sales-users");
    println!("    GET    /api/users                          - admin");
    println!("    POST   /api/users                          - admin");
    println!("    DELETE /api/users/{{id}}                     - admin");
    println!("    GET    /api/orders?status=&searchTerm=&salespersonId=&startDate=&endDate=");
    println!("    GET    /api/orders/summary");
    println!("    POST   /api/orders                         - operator");
    println!("    GET    /api/orders/{{id}}");
    println!("    PATCH  /api/orders/{{id}}                    - factory one-time edit or approved change request");
    println!("    DELETE /api/orders/{{id}}                    - admin");
    println!("    POST   /api/orders/{{id}}/request-change     - factory, operator");
    println!("    PUT    /api/order-items/{{id}}/status        - operator");
    println!("    GET    /api/order-items/{{id}}/history");
    println!("    GET    /api/change-requests?status=&orderId=");
    println!("    POST   /api/change-requests                - factory, operator");
    println!("    PATCH  /api/change-requests/{{id}}/process   - admin");
    println!("    PATCH  /api/change-requests/{{id}}/mark-used");

    ServerBuilder::new()
        .with_store(store)
        .with_cors()
        .serve(&config.server.bind)
        .await
}
