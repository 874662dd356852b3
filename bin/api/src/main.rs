//! Tranche API Server: round metadata, investments, the testnet faucet and
//! the mock project catalogue.

mod projects;
mod routes;

use alloy::primitives::Address;
use eyre::WrapErr;
use std::{net::SocketAddr, sync::Arc};
use tranche_chain::{ChainProvider, WalletDispenser, create_signer_provider};
use tranche_core::{Settings, telemetry};
use tranche_rounds::{Faucet, FaucetConfig, cooldown_from_hours};
use tranche_storage::{self as storage, PgStore};

use routes::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    telemetry::init("api");
    let settings = Settings::from_env().wrap_err("Failed to load settings")?;

    tracing::info!("Starting Tranche API Server");

    let pool = storage::connect(&settings.database_url)
        .await
        .wrap_err("Failed to connect to database")?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .wrap_err("Failed to run migrations")?;

    tracing::info!("Database ready");

    let store = PgStore::new(pool);
    let faucet = build_faucet(&settings, store.clone()).await?;
    if faucet.is_none() {
        tracing::warn!("FAUCET_PRIVATE_KEY not set, faucet claims are disabled");
    }

    let state = Arc::new(AppState::new(
        store,
        faucet,
        settings.milestone_failure_policy,
        cooldown_from_hours(settings.faucet_cooldown_hours)?,
    ));
    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.api_port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

type LiveFaucet = Faucet<PgStore, WalletDispenser<ChainProvider>>;

/// The faucet is optional: without a funded key the API still serves
/// everything else, and claim attempts get a 503.
async fn build_faucet(settings: &Settings, store: PgStore) -> eyre::Result<Option<LiveFaucet>> {
    let Some(key) = settings.faucet_private_key.as_deref() else {
        return Ok(None);
    };

    let token = settings
        .token_address
        .as_deref()
        .map(|a| a.parse::<Address>())
        .transpose()
        .wrap_err("TOKEN_ADDRESS is not a valid address")?;

    let (provider, sender) = create_signer_provider(&settings.rpc_url, key)?;
    let dispenser = WalletDispenser::connect(provider, sender, token)
        .await
        .wrap_err("Failed to read faucet token decimals")?;
    tracing::info!(%sender, token = ?token, "Faucet wallet loaded");

    let faucet = Faucet::new(store, dispenser, FaucetConfig::from_settings(settings)?)?;
    Ok(Some(faucet))
}
