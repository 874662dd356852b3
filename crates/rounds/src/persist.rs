//! Off-chain round metadata: the wire format shared by the launcher and the
//! round-creation endpoint, and the HTTP client the launcher writes through.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;
use tranche_chain::CreatedRound;
use tranche_storage::models::{NewMilestone, NewRound};

use crate::validation::{NumericInput, ValidatedProject};

/// Body of `POST /api/rounds`.
///
/// Only `roundId`, `contractAddress` and `founderAddress` are required; the
/// endpoint reports missing ones instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founder_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<NumericInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub milestones: Vec<MilestoneMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneMetadata {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// A JSON number or a decimal string.
    pub funding_amount: NumericInput,
    pub deadline: DateTime<Utc>,
}

/// `data` of a successful round-creation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundCreatedData {
    pub round_id: i64,
}

impl RoundMetadata {
    /// Metadata for a round that was just created on-chain.
    pub fn for_created_round(
        project: &ValidatedProject,
        created: &CreatedRound,
        round_id: i64,
        funding_token: Address,
    ) -> Self {
        Self {
            round_id: Some(round_id),
            contract_address: Some(format!("{:#x}", created.round_address)),
            founder_address: Some(format!("{:#x}", created.founder)),
            funding_token: Some(format!("{funding_token:#x}")),
            target_amount: Some(NumericInput::Text(project.funding_goal.to_string())),
            funding_deadline: Some(project.funding_deadline),
            title: Some(project.name.clone()),
            description: Some(project.description.clone()),
            image_url: project.cover_image_url.clone(),
            website: project.website_url.clone(),
            category: project.category.clone(),
            milestones: project
                .milestones
                .iter()
                .map(|m| MilestoneMetadata {
                    title: m.title.clone(),
                    description: m.description.clone(),
                    funding_amount: NumericInput::Text(m.funding_amount.to_string()),
                    deadline: m.deadline,
                })
                .collect(),
        }
    }

    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        let mut missing = Vec::new();
        if self.round_id.is_none() {
            missing.push("roundId");
        }
        if blank(&self.contract_address) {
            missing.push("contractAddress");
        }
        if blank(&self.founder_address) {
            missing.push("founderAddress");
        }
        missing
    }

    /// Split into insert-ready rows. Milestones are numbered from zero in
    /// submission order; amounts are stored exactly as sent.
    pub fn into_records(self) -> Result<(NewRound, Vec<NewMilestone>), MetadataError> {
        let missing = self.missing_fields();
        let (Some(round_id), Some(contract_address), Some(founder_address)) =
            (self.round_id, self.contract_address, self.founder_address)
        else {
            return Err(MetadataError::Missing(missing));
        };
        if !missing.is_empty() {
            return Err(MetadataError::Missing(missing));
        }

        let target_amount = match &self.target_amount {
            None => "0".to_string(),
            Some(input) => amount_text(input, "targetAmount".to_string())?,
        };

        let milestones = self
            .milestones
            .into_iter()
            .enumerate()
            .map(|(i, m)| -> Result<NewMilestone, MetadataError> {
                Ok(NewMilestone {
                    round_id,
                    milestone_id: i as i32,
                    funding_amount: amount_text(
                        &m.funding_amount,
                        format!("milestones[{i}].fundingAmount"),
                    )?,
                    title: m.title,
                    description: m.description,
                    deadline: m.deadline,
                })
            })
            .collect::<Result<Vec<_>, MetadataError>>()?;

        let round = NewRound {
            round_id,
            contract_address: contract_address.trim().to_string(),
            founder_address: founder_address.trim().to_string(),
            funding_token: self.funding_token,
            target_amount,
            funding_deadline: self.funding_deadline,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            website: self.website,
            category: self.category,
            milestone_count: milestones.len() as i32,
        };
        Ok((round, milestones))
    }
}

fn amount_text(input: &NumericInput, field: String) -> Result<String, MetadataError> {
    match input.to_amount() {
        Some(amount) if amount.as_f64() >= 0.0 => Ok(amount.to_string()),
        _ => Err(MetadataError::InvalidAmount(field)),
    }
}

/// Why a metadata body cannot be stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("Missing required fields: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("{0} must be a non-negative decimal amount")]
    InvalidAmount(String),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("could not reach the metadata endpoint: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metadata endpoint rejected the round (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected reply from the metadata endpoint: {0}")]
    Decode(String),
}

impl PersistError {
    /// Only failures where the request never reached the server are retried;
    /// a rejected insert may already have written the round row.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

/// Writes round metadata to the off-chain store.
pub trait MetadataPersister: Send + Sync {
    fn persist(
        &self,
        metadata: &RoundMetadata,
    ) -> impl Future<Output = Result<i64, PersistError>> + Send;
}

/// Persists through the API server, which holds the database credentials.
#[derive(Debug, Clone)]
pub struct HttpPersister {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct Reply {
    success: bool,
    data: Option<RoundCreatedData>,
    message: Option<String>,
}

impl HttpPersister {
    pub fn new(api_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/rounds", api_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl MetadataPersister for HttpPersister {
    async fn persist(&self, metadata: &RoundMetadata) -> Result<i64, PersistError> {
        let response = self.client.post(&self.endpoint).json(metadata).send().await?;
        let status = response.status();
        let reply: Reply = response
            .json()
            .await
            .map_err(|e| PersistError::Decode(e.to_string()))?;

        match reply {
            Reply {
                success: true,
                data: Some(data),
                ..
            } => {
                tracing::info!(round_id = data.round_id, "Round metadata saved");
                Ok(data.round_id)
            }
            Reply { message, .. } => Err(PersistError::Rejected {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| "no message".to_string()),
            }),
        }
    }
}
