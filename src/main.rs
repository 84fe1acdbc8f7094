use chrono::TimeDelta;
use dotenvy::dotenv;
use erugah::{
    config::{self, database},
    core::{catalog, gateway, payment, reconcile, settings},
    errors::Result,
};
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Pending payments older than this are treated as abandoned.
const STALE_PAYMENT_HOURS: i64 = 24;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Connect and ensure the schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;
    settings::ensure_default_settings(&db).await?;

    // 5. Seed the catalog from config.toml
    catalog::seed_catalog(&db, &app_config.catalog)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {e}"))?;

    let policy = settings::load_deposit_policy(&db).await?;
    let provider = gateway::select_provider(app_config.payments.active());
    info!(
        "Ready: deposit {}%, {} payment provider ({} environment)",
        policy.percentage,
        provider.name(),
        app_config.payments.environment
    );

    // 6. Expire abandoned payment attempts
    payment::expire_stale_payments(&db, TimeDelta::hours(STALE_PAYMENT_HOURS)).await?;

    // 7. Replay a saved gateway callback, if one was given
    if let Some(path) = env::args().nth(1) {
        let raw = std::fs::read_to_string(&path)
            .inspect_err(|e| error!("Failed to read callback file {path}: {e}"))?;
        let ack = reconcile::handle_callback_str(&db, &raw).await;
        if ack.success {
            info!("Replayed callback from {path}");
        } else {
            warn!(
                "Callback from {path} not applied: {}",
                ack.message.unwrap_or_default()
            );
        }
    }

    Ok(())
}
