//! Store traits the HTTP layer and the faucet are written against.
//!
//! `PgStore` is the production implementation; tests substitute in-memory
//! stores so handlers can be exercised without a database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::future::Future;
use tranche_core::AppError;

use crate::{models::*, repos};

/// Round, milestone and investment persistence.
pub trait RoundStore: Send + Sync {
    fn insert_round(
        &self,
        round: &NewRound,
    ) -> impl Future<Output = Result<Round, AppError>> + Send;

    fn insert_milestones(
        &self,
        milestones: &[NewMilestone],
    ) -> impl Future<Output = Result<u64, AppError>> + Send;

    /// Remove a round row. Used to compensate a failed milestone insert.
    fn delete_round(&self, round_id: i64) -> impl Future<Output = Result<(), AppError>> + Send;

    fn list_rounds(&self, limit: i64) -> impl Future<Output = Result<Vec<Round>, AppError>> + Send;

    fn get_round(
        &self,
        round_id: i64,
    ) -> impl Future<Output = Result<Option<Round>, AppError>> + Send;

    fn get_milestones(
        &self,
        round_id: i64,
    ) -> impl Future<Output = Result<Vec<Milestone>, AppError>> + Send;

    fn upsert_investment(
        &self,
        round_id: i64,
        investor_address: &str,
        amount: &str,
    ) -> impl Future<Output = Result<Investment, AppError>> + Send;
}

/// Faucet claim bookkeeping.
pub trait WalletStore: Send + Sync {
    fn get_wallet(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Wallet>, AppError>> + Send;

    fn record_claim(
        &self,
        address: &str,
        claimed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// PostgreSQL-backed store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::Database(e.to_string())
}

impl RoundStore for PgStore {
    async fn insert_round(&self, round: &NewRound) -> Result<Round, AppError> {
        repos::insert_round(&self.pool, round).await.map_err(db_err)
    }

    async fn insert_milestones(&self, milestones: &[NewMilestone]) -> Result<u64, AppError> {
        repos::insert_milestones_batch(&self.pool, milestones)
            .await
            .map_err(db_err)
    }

    async fn delete_round(&self, round_id: i64) -> Result<(), AppError> {
        let deleted = repos::delete_round(&self.pool, round_id)
            .await
            .map_err(db_err)?;
        tracing::debug!(round_id, deleted, "Deleted round row");
        Ok(())
    }

    async fn list_rounds(&self, limit: i64) -> Result<Vec<Round>, AppError> {
        repos::get_recent_rounds(&self.pool, limit)
            .await
            .map_err(db_err)
    }

    async fn get_round(&self, round_id: i64) -> Result<Option<Round>, AppError> {
        repos::get_round(&self.pool, round_id).await.map_err(db_err)
    }

    async fn get_milestones(&self, round_id: i64) -> Result<Vec<Milestone>, AppError> {
        repos::get_round_milestones(&self.pool, round_id)
            .await
            .map_err(db_err)
    }

    async fn upsert_investment(
        &self,
        round_id: i64,
        investor_address: &str,
        amount: &str,
    ) -> Result<Investment, AppError> {
        repos::upsert_investment(&self.pool, round_id, investor_address, amount)
            .await
            .map_err(db_err)
    }
}

impl WalletStore for PgStore {
    async fn get_wallet(&self, address: &str) -> Result<Option<Wallet>, AppError> {
        repos::get_wallet(&self.pool, address).await.map_err(db_err)
    }

    async fn record_claim(&self, address: &str, claimed_at: DateTime<Utc>) -> Result<(), AppError> {
        repos::record_claim(&self.pool, address, claimed_at)
            .await
            .map_err(db_err)
    }
}
