pub mod config;
pub mod error;
pub mod retry;
pub mod telemetry;

pub use config::{MilestoneFailurePolicy, Settings};
pub use error::AppError;
pub use retry::RetryPolicy;
