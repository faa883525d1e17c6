/// Libris - Library catalogue server
///
/// A session-authenticated book catalogue: accounts register, verify
/// their email through a mailed link, and manage their own shelf of
/// books over a JSON API.

mod account;
mod api;
mod auth;
mod catalogue;
mod config;
mod context;
mod db;
mod error;
mod jobs;
mod mailer;
mod metrics;
mod password;
mod rate_limit;
mod server;
mod session;
mod token;
mod validation;

use config::ServerConfig;
use context::AppContext;
use error::LibrisResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> LibrisResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "libris=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Print banner
    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;
    let ctx = Arc::new(ctx);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    __    _ __         _
   / /   (_) /_  _____(_)____
  / /   / / __ \/ ___/ / ___/
 / /___/ / /_/ / /  / (__  )
/_____/_/_.___/_/  /_/____/

        Library catalogue server v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
