//! Round creation workflow and faucet service.
//!
//! Everything here is written against the collaborator traits from
//! `tranche-chain` and `tranche-storage`, so each step can be exercised
//! with in-memory fakes.

pub mod faucet;
pub mod persist;
pub mod validation;
pub mod workflow;

pub use faucet::{
    ClaimReceipt, ClaimStatus, Faucet, FaucetConfig, FaucetError, claim_status, cooldown_from_hours,
};
pub use persist::{HttpPersister, MetadataError, MetadataPersister, PersistError, RoundMetadata};
pub use validation::{
    DecimalAmount, FundingLimits, NumericInput, ProjectSubmission, ValidatedProject,
    ValidationErrors, validate,
};
pub use workflow::{LaunchConfig, LaunchError, LaunchedRound, RoundLauncher};
