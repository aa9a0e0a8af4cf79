//! # Back Office Bootstrap
//!
//! Opens (and migrates) the configured database, then creates the head
//! office store and the first system admin if they are missing.
//!
//! ## Usage
//! ```bash
//! RETAIL_AUTH__JWT_SECRET=... \
//! RETAIL_BOOTSTRAP__ADMIN_PASSWORD=... \
//! cargo run -p retail-backoffice --bin bootstrap
//! ```

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use retail_backoffice::bootstrap::ensure_initial_state;
use retail_backoffice::BackofficeConfig;
use retail_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BackofficeConfig::load().context("loading configuration")?;
    init_tracing(&config.log_level);

    info!(path = %config.database.path, "Opening database");
    let db = Database::new(config.db_config())
        .await
        .context("opening database")?;

    match ensure_initial_state(&db, &config.bootstrap).await? {
        Some(admin) => info!(username = %admin.username, "Bootstrap complete, admin created"),
        None => info!("Bootstrap complete, nothing to create"),
    }

    db.close().await;
    Ok(())
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{fallback},sqlx=warn")));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
