//! validate → precondition-check → submit → persist.
//!
//! Each step short-circuits the rest. Precondition checks and persistence
//! are retried on transient failures; the submission never is.

use alloy::primitives::{Address, U256, utils::parse_units};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tranche_chain::{
    ChainReader, CreateRoundParams, CreatedRound, GasPlan, PreconditionError, RoundFactory,
    RoundSubmitter, SubmitError, check_preconditions, preconditions,
};
use tranche_core::{RetryPolicy, retry::retry};

use crate::persist::{MetadataPersister, PersistError, RoundMetadata};
use crate::validation::{
    DecimalAmount, FieldError, FundingLimits, ProjectSubmission, ValidatedProject,
    ValidationErrors, validate,
};

#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Account that signs the creation transaction.
    pub founder: Address,
    /// Funding token used when the submission names none.
    pub default_token: Option<Address>,
    pub limits: FundingLimits,
    pub retry: RetryPolicy,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("submission failed: {0}")]
    Submit(#[from] SubmitError),

    /// The round exists on-chain but has no off-chain record.
    #[error(
        "round {} was created on-chain at {} but its metadata was not saved: {source}",
        .round.round_id,
        .round.round_address
    )]
    Persistence {
        round: CreatedRound,
        source: PersistError,
    },
}

/// Outcome of a successful launch.
#[derive(Debug, Clone)]
pub struct LaunchedRound {
    pub created: CreatedRound,
    pub round_id: i64,
    pub gas: GasPlan,
}

/// Runs the whole creation workflow against injected collaborators.
pub struct RoundLauncher<C, P> {
    chain: C,
    persister: P,
    config: LaunchConfig,
}

impl<C, P> RoundLauncher<C, P>
where
    C: ChainReader + RoundSubmitter,
    P: MetadataPersister,
{
    pub fn new(chain: C, persister: P, config: LaunchConfig) -> Self {
        Self {
            chain,
            persister,
            config,
        }
    }

    pub async fn launch(
        &self,
        submission: &ProjectSubmission,
        now: DateTime<Utc>,
    ) -> Result<LaunchedRound, LaunchError> {
        let project = validate(submission, &self.config.limits, now)?;
        tracing::info!(
            name = %project.name,
            goal = %project.funding_goal,
            milestones = project.milestones.len(),
            "Submission valid"
        );

        let token = project
            .funding_token
            .or(self.config.default_token)
            .ok_or_else(|| {
                LaunchError::Config(
                    "no funding token: set fundingToken or TOKEN_ADDRESS".to_string(),
                )
            })?;

        let decimals = retry(
            self.config.retry,
            "token decimals",
            PreconditionError::is_transient,
            || preconditions::token_decimals(&self.chain, token),
        )
        .await?;

        let params = build_params(&project, self.config.founder, token, decimals)?;

        let gas = retry(
            self.config.retry,
            "preconditions",
            PreconditionError::is_transient,
            || check_preconditions(&self.chain, &params),
        )
        .await?;
        tracing::info!(estimate = gas.estimate, gas_limit = gas.gas_limit, "Preconditions passed");

        let params = CreateRoundParams {
            gas_limit: Some(gas.gas_limit),
            ..params
        };
        let created = self.chain.submit_round(&params).await?;

        let round_id = match u64::try_from(created.round_id)
            .ok()
            .and_then(|id| i64::try_from(id).ok())
        {
            Some(id) => id,
            None => {
                return Err(LaunchError::Config(format!(
                    "round id {} does not fit the store's id column",
                    created.round_id
                )));
            }
        };

        let metadata = RoundMetadata::for_created_round(&project, &created, round_id, token);
        let persisted = retry(
            self.config.retry,
            "persist metadata",
            PersistError::is_transient,
            || self.persister.persist(&metadata),
        )
        .await;

        match persisted {
            Ok(round_id) => Ok(LaunchedRound {
                created,
                round_id,
                gas,
            }),
            Err(source) => {
                tracing::error!(
                    round_id,
                    round = %created.round_address,
                    tx = %created.transaction_hash,
                    error = %source,
                    "Round is on-chain without metadata"
                );
                Err(LaunchError::Persistence {
                    round: created,
                    source,
                })
            }
        }
    }
}

/// Convert validated form values into contract arguments.
///
/// Amounts are scaled from the text they were entered as, so the milestone
/// amounts add up on-chain exactly as they did in the form.
fn build_params(
    project: &ValidatedProject,
    founder: Address,
    funding_token: Address,
    decimals: u8,
) -> Result<CreateRoundParams, LaunchError> {
    let mut errors = Vec::new();
    let mut scale = |field: String, amount: &DecimalAmount| {
        to_base_units(amount, decimals).unwrap_or_else(|message| {
            errors.push(FieldError { field, message });
            U256::ZERO
        })
    };

    let target_amount = scale("fundingGoal".to_string(), &project.funding_goal);
    let milestones = project
        .milestones
        .iter()
        .enumerate()
        .map(|(i, m)| RoundFactory::MilestoneParams {
            description: m.description.clone(),
            amount: scale(format!("milestones[{i}].fundingAmount"), &m.funding_amount),
            deadline: unix_seconds(m.deadline),
        })
        .collect();

    if !errors.is_empty() {
        return Err(ValidationErrors(errors).into());
    }

    Ok(CreateRoundParams {
        founder,
        funding_token,
        target_amount,
        funding_deadline: unix_seconds(project.funding_deadline),
        milestones,
        jurors: project.jurors.clone(),
        gas_limit: None,
    })
}

/// Scale an entered amount by the token's decimals without rounding.
fn to_base_units(amount: &DecimalAmount, decimals: u8) -> Result<U256, String> {
    if amount.fraction_digits() > usize::from(decimals) {
        return Err(format!(
            "Amount {amount} has more decimal places than the funding token ({decimals})"
        ));
    }
    parse_units(amount.as_str(), decimals)
        .map(|units| units.get_absolute())
        .map_err(|e| format!("Amount {amount} cannot be expressed in token units: {e}"))
}

fn unix_seconds(at: DateTime<Utc>) -> U256 {
    U256::from(u64::try_from(at.timestamp()).unwrap_or_default())
}
