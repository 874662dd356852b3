pub mod models;
pub mod repos;
pub mod store;

pub use sqlx::Pool;
pub use sqlx::Postgres;
pub use sqlx::postgres::PgPool;
pub use store::{PgStore, RoundStore, WalletStore};

use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Connect to PostgreSQL. Request handlers are short-lived, so the pool
/// stays small.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .connect(database_url)
        .await
}
