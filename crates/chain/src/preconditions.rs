//! Read-only checks run before the irreversible `createRound` broadcast.
//!
//! Cheap existence checks run first and the gas-estimation dry run last, so
//! the common misconfigurations fail without touching the simulator.

use alloy::primitives::Address;
use thiserror::Error;

use crate::classify::{RpcFailure, TxErrorCategory};
use crate::reader::{ChainReader, CreateRoundParams};

/// Gas limit used to tell a contract-level rejection apart from a deployment
/// that merely ran out of gas at the estimated limit.
pub const HIGH_GAS_LIMIT: u64 = 10_000_000;

#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("{role} contract is not deployed at {address}")]
    MissingBytecode { role: &'static str, address: Address },

    #[error("factory not functioning: {0}")]
    FactoryNotFunctioning(RpcFailure),

    #[error("factory is paused")]
    Paused,

    #[error("juror {0} is not authorized by the factory")]
    UnauthorizedJuror(Address),

    #[error("validation failed: the factory rejected the round parameters ({0})")]
    ValidationFailed(RpcFailure),

    #[error("deployment failure: round contract creation fails at the estimated gas ({0})")]
    DeploymentFailure(RpcFailure),

    #[error("RPC error during precondition check: {0}")]
    Rpc(RpcFailure),
}

impl PreconditionError {
    /// Only transport-level hiccups are worth re-running the checks for.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(f) if f.category().is_transient())
    }
}

/// Gas numbers produced by the dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPlan {
    pub estimate: u64,
    /// Estimate plus 20% headroom.
    pub gas_limit: u64,
}

impl GasPlan {
    fn from_estimate(estimate: u64) -> Self {
        Self {
            estimate,
            gas_limit: estimate.saturating_add(estimate / 5),
        }
    }
}

/// Run every check in order, stopping at the first failure.
pub async fn check_preconditions<C: ChainReader>(
    chain: &C,
    params: &CreateRoundParams,
) -> Result<GasPlan, PreconditionError> {
    ensure_deployed(chain, "factory", chain.factory()).await?;
    ensure_deployed(chain, "token", params.funding_token).await?;

    let next_round_id = chain
        .next_round_id()
        .await
        .map_err(PreconditionError::FactoryNotFunctioning)?;
    tracing::debug!(%next_round_id, "Factory is live");

    if chain.is_paused().await.map_err(PreconditionError::Rpc)? {
        return Err(PreconditionError::Paused);
    }

    for juror in &params.jurors {
        let authorized = chain
            .is_authorized_juror(*juror)
            .await
            .map_err(PreconditionError::Rpc)?;
        if !authorized {
            tracing::warn!(%juror, "Juror not authorized");
            return Err(PreconditionError::UnauthorizedJuror(*juror));
        }
    }

    match chain.estimate_create_gas(params).await {
        Ok(estimate) => {
            tracing::debug!(estimate, "Gas estimation succeeded");
            Ok(GasPlan::from_estimate(estimate))
        }
        Err(failure) if failure.category() == TxErrorCategory::Network => {
            Err(PreconditionError::Rpc(failure))
        }
        Err(failure) => {
            // A revert that survives a generous gas limit comes from the
            // contract's own checks; one that disappears was gas exhaustion
            // while deploying the round contract.
            match chain.simulate_create(params, HIGH_GAS_LIMIT).await {
                Ok(()) => Err(PreconditionError::DeploymentFailure(failure)),
                Err(_) => Err(PreconditionError::ValidationFailed(failure)),
            }
        }
    }
}

/// Decimals of the funding token, after confirming it is deployed.
///
/// Amounts must be converted to base units before the gas dry run, so this
/// runs ahead of [`check_preconditions`].
pub async fn token_decimals<C: ChainReader>(
    chain: &C,
    token: Address,
) -> Result<u8, PreconditionError> {
    ensure_deployed(chain, "token", token).await?;
    chain
        .token_decimals(token)
        .await
        .map_err(PreconditionError::Rpc)
}

async fn ensure_deployed<C: ChainReader>(
    chain: &C,
    role: &'static str,
    address: Address,
) -> Result<(), PreconditionError> {
    let code = chain.code_at(address).await.map_err(PreconditionError::Rpc)?;
    if code.is_empty() {
        return Err(PreconditionError::MissingBytecode { role, address });
    }
    Ok(())
}
