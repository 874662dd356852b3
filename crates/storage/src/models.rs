use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ─── Lifecycle enums ────────────────────────────────────────────────────────

/// Lifecycle of a funding round: `Funding → Execution → Completed`, or `Cancelled`.
///
/// Stored as lowercase TEXT, guarded by a CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum RoundPhase {
    Funding,
    Execution,
    Completed,
    Cancelled,
}

/// `Pending → Active → Approved | Rejected → Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum MilestoneStatus {
    Pending,
    Active,
    Approved,
    Rejected,
    Completed,
}

// ─── Round ──────────────────────────────────────────────────────────────────

/// A funding round, keyed by its on-chain round id.
///
/// Amounts are decimal strings in token units, the same way they are
/// entered by founders.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Round {
    pub round_id: i64,
    pub contract_address: String,
    pub founder_address: String,
    pub funding_token: Option<String>,
    pub target_amount: String,
    pub funding_deadline: Option<DateTime<Utc>>,
    pub phase: RoundPhase,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub website: Option<String>,
    pub category: Option<String>,
    pub milestone_count: i32,
    pub milestones_completed: i32,
    pub created_at: DateTime<Utc>,
}

/// Insert-ready round (no `created_at`; phase always starts at `funding`).
#[derive(Debug, Clone, PartialEq)]
pub struct NewRound {
    pub round_id: i64,
    pub contract_address: String,
    pub founder_address: String,
    pub funding_token: Option<String>,
    pub target_amount: String,
    pub funding_deadline: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub website: Option<String>,
    pub category: Option<String>,
    pub milestone_count: i32,
}

// ─── Milestone ──────────────────────────────────────────────────────────────

/// A milestone, identified by its position within the round.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Milestone {
    pub round_id: i64,
    pub milestone_id: i32,
    pub title: String,
    pub description: String,
    pub funding_amount: String,
    pub deadline: DateTime<Utc>,
    pub status: MilestoneStatus,
    pub votes_for: i32,
    pub votes_against: i32,
    pub funds_released: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMilestone {
    pub round_id: i64,
    pub milestone_id: i32,
    pub title: String,
    pub description: String,
    pub funding_amount: String,
    pub deadline: DateTime<Utc>,
}

// ─── Investment ─────────────────────────────────────────────────────────────

/// Cumulative amount an investor has put into a round.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Investment {
    pub round_id: i64,
    pub investor_address: String,
    pub amount: String,
    pub updated_at: DateTime<Utc>,
}

// ─── Wallet ─────────────────────────────────────────────────────────────────

/// Faucet bookkeeping for one address.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub address: String,
    pub last_claim_at: Option<DateTime<Utc>>,
    pub claim_count: i32,
}
