pub mod abi;
pub mod classify;
pub mod decoder;
pub mod dispenser;
pub mod preconditions;
pub mod provider;
pub mod reader;
pub mod submitter;

pub use abi::{ERC20, RoundFactory};
pub use classify::{RpcFailure, TxErrorCategory, classify};
pub use decoder::{CreatedRound, decode_round_created};
pub use dispenser::{DispenseError, TokenDispenser, WalletDispenser};
pub use preconditions::{GasPlan, PreconditionError, check_preconditions};
pub use provider::{ChainProvider, create_signer_provider};
pub use reader::{ChainReader, CreateRoundParams, FactoryClient};
pub use submitter::{RoundSubmitter, SubmitError};
