use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::models::*;

// ─── Round Queries ──────────────────────────────────────────────────────────

/// Insert a new round in the `funding` phase. `milestones_completed` always
/// starts at zero.
pub async fn insert_round<'e, E>(executor: E, round: &NewRound) -> Result<Round, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Round>(
        r#"
        INSERT INTO rounds (
            round_id, contract_address, founder_address, funding_token, target_amount,
            funding_deadline, phase, title, description, image_url, website, category,
            milestone_count, milestones_completed
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 0)
        RETURNING *
        "#,
    )
    .bind(round.round_id)
    .bind(&round.contract_address)
    .bind(&round.founder_address)
    .bind(&round.funding_token)
    .bind(&round.target_amount)
    .bind(round.funding_deadline)
    .bind(RoundPhase::Funding)
    .bind(&round.title)
    .bind(&round.description)
    .bind(&round.image_url)
    .bind(&round.website)
    .bind(&round.category)
    .bind(round.milestone_count)
    .fetch_one(executor)
    .await
}

/// Delete a round; its milestones and investments go with it via `ON DELETE CASCADE`.
pub async fn delete_round(pool: &PgPool, round_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM rounds WHERE round_id = $1")
        .bind(round_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Most recently created rounds first.
pub async fn get_recent_rounds(pool: &PgPool, limit: i64) -> Result<Vec<Round>, sqlx::Error> {
    sqlx::query_as::<_, Round>("SELECT * FROM rounds ORDER BY created_at DESC LIMIT $1")
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn get_round(pool: &PgPool, round_id: i64) -> Result<Option<Round>, sqlx::Error> {
    sqlx::query_as::<_, Round>("SELECT * FROM rounds WHERE round_id = $1")
        .bind(round_id)
        .fetch_optional(pool)
        .await
}

// ─── Milestone Queries ──────────────────────────────────────────────────────

/// Insert all milestones of a round with a single multi-value INSERT.
pub async fn insert_milestones_batch<'e, E>(
    executor: E,
    milestones: &[NewMilestone],
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    if milestones.is_empty() {
        return Ok(0);
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO milestones \
         (round_id, milestone_id, title, description, funding_amount, deadline) ",
    );

    qb.push_values(milestones, |mut b, m| {
        b.push_bind(m.round_id)
            .push_bind(m.milestone_id)
            .push_bind(&m.title)
            .push_bind(&m.description)
            .push_bind(&m.funding_amount)
            .push_bind(m.deadline);
    });

    let result = qb.build().execute(executor).await?;
    Ok(result.rows_affected())
}

pub async fn get_round_milestones(
    pool: &PgPool,
    round_id: i64,
) -> Result<Vec<Milestone>, sqlx::Error> {
    sqlx::query_as::<_, Milestone>(
        "SELECT * FROM milestones WHERE round_id = $1 ORDER BY milestone_id",
    )
    .bind(round_id)
    .fetch_all(pool)
    .await
}

// ─── Investment Queries ─────────────────────────────────────────────────────

/// Add `amount` to the investor's cumulative position in a round.
pub async fn upsert_investment(
    pool: &PgPool,
    round_id: i64,
    investor_address: &str,
    amount: &str,
) -> Result<Investment, sqlx::Error> {
    sqlx::query_as::<_, Investment>(
        r#"
        INSERT INTO investments (round_id, investor_address, amount, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (round_id, investor_address) DO UPDATE
        SET amount = (CAST(investments.amount AS NUMERIC) + CAST($3 AS NUMERIC))::TEXT,
            updated_at = NOW()
        RETURNING round_id, investor_address, amount, updated_at
        "#,
    )
    .bind(round_id)
    .bind(investor_address)
    .bind(amount)
    .fetch_one(pool)
    .await
}

// ─── Wallet Queries ─────────────────────────────────────────────────────────

pub async fn get_wallet(pool: &PgPool, address: &str) -> Result<Option<Wallet>, sqlx::Error> {
    sqlx::query_as::<_, Wallet>(
        "SELECT address, last_claim_at, claim_count FROM wallets WHERE address = $1",
    )
    .bind(address)
    .fetch_optional(pool)
    .await
}

/// Record a faucet claim. One row per address is enforced by the primary key.
pub async fn record_claim(
    pool: &PgPool,
    address: &str,
    claimed_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO wallets (address, last_claim_at, claim_count)
        VALUES ($1, $2, 1)
        ON CONFLICT (address) DO UPDATE
        SET last_claim_at = $2,
            claim_count = wallets.claim_count + 1
        "#,
    )
    .bind(address)
    .bind(claimed_at)
    .execute(pool)
    .await?;
    Ok(())
}
