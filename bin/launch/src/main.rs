//! Tranche round launcher: creates a milestone-gated funding round on-chain
//! from a project submission file and records its metadata through the API.
//!
//! Flow:
//! 1. Validate the submission (no network access)
//! 2. Check the factory, token and jurors on-chain
//! 3. Submit `createRound` once and wait for one confirmation
//! 4. Save the round metadata through `POST /api/rounds`
//!
//! Usage: `launch <submission.json>`

use alloy::primitives::Address;
use eyre::{Result, WrapErr, bail, eyre};
use std::time::Duration;
use tranche_chain::{FactoryClient, create_signer_provider};
use tranche_core::{RetryPolicy, Settings, telemetry};
use tranche_rounds::{
    FundingLimits, HttpPersister, LaunchConfig, LaunchError, ProjectSubmission, RoundLauncher,
};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init("launch");
    let settings = Settings::from_env()?;

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| eyre!("usage: launch <submission.json>"))?;
    let raw = std::fs::read_to_string(&path).wrap_err_with(|| format!("reading {path}"))?;
    let submission: ProjectSubmission =
        serde_json::from_str(&raw).wrap_err_with(|| format!("parsing {path}"))?;

    let factory = parse_address("FACTORY_ADDRESS", settings.factory_address.as_deref())?;
    let default_token = settings
        .token_address
        .as_deref()
        .map(|a| parse_address("TOKEN_ADDRESS", Some(a)))
        .transpose()?;
    let Some(key) = settings.founder_private_key.as_deref() else {
        bail!("FOUNDER_PRIVATE_KEY must be set to sign the round creation");
    };

    let (provider, founder) = create_signer_provider(&settings.rpc_url, key)?;
    tracing::info!(rpc = %settings.rpc_url, %factory, %founder, "Launching round");

    let launcher = RoundLauncher::new(
        FactoryClient::new(provider, factory),
        HttpPersister::new(&settings.api_url),
        LaunchConfig {
            founder,
            default_token,
            limits: FundingLimits::from_settings(&settings),
            retry: RetryPolicy::new(
                settings.retry_attempts,
                Duration::from_millis(settings.retry_base_delay_ms),
            ),
        },
    );

    match launcher.launch(&submission, chrono::Utc::now()).await {
        Ok(launched) => {
            tracing::info!(
                round_id = launched.round_id,
                round_address = %launched.created.round_address,
                tx = %launched.created.transaction_hash,
                gas_limit = launched.gas.gas_limit,
                "Round launched"
            );
            Ok(())
        }
        Err(LaunchError::Validation(errors)) => {
            for error in &errors.0 {
                tracing::error!(field = %error.field, "{}", error.message);
            }
            bail!("submission has {} invalid field(s)", errors.0.len())
        }
        Err(e @ LaunchError::Persistence { .. }) => {
            tracing::error!("Round is on-chain without metadata; save it manually");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_address(var: &str, value: Option<&str>) -> Result<Address> {
    let value = value.ok_or_else(|| eyre!("{var} must be set"))?;
    value
        .trim()
        .parse()
        .wrap_err_with(|| format!("{var} is not a valid address"))
}
