//! Map opaque provider failures onto a closed set of categories.
//!
//! Rules are evaluated in order and the first match wins; anything no rule
//! recognises falls through to [`TxErrorCategory::Unknown`].

use alloy::transports::{RpcError, TransportError};
use std::fmt;

/// A provider failure reduced to the parts the rules look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcFailure {
    /// JSON-RPC (or EIP-1193) error code, when the node returned one.
    pub code: Option<i64>,
    pub message: String,
}

impl RpcFailure {
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Case-insensitive check for any of the given fragments.
    fn mentions(&self, fragments: &[&str]) -> bool {
        let message = self.message.to_ascii_lowercase();
        fragments.iter().any(|f| message.contains(f))
    }

    pub fn category(&self) -> TxErrorCategory {
        classify(self)
    }
}

impl fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RpcFailure {}

impl From<TransportError> for RpcFailure {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => Self::new(Some(payload.code), payload.message),
            other => Self::new(None, other.to_string()),
        }
    }
}

impl From<alloy::contract::Error> for RpcFailure {
    fn from(err: alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(e) => e.into(),
            other => Self::new(None, other.to_string()),
        }
    }
}

impl From<alloy::providers::PendingTransactionError> for RpcFailure {
    fn from(err: alloy::providers::PendingTransactionError) -> Self {
        Self::new(None, err.to_string())
    }
}

/// User-facing transaction failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxErrorCategory {
    UserRejected,
    InsufficientFunds,
    NonceConflict,
    Underpriced,
    Reverted,
    Network,
    Unknown,
}

impl TxErrorCategory {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UserRejected => "Transaction was rejected in the wallet",
            Self::InsufficientFunds => "Insufficient funds to pay for the transaction and gas",
            Self::NonceConflict => "A conflicting transaction is pending; wait for it and retry",
            Self::Underpriced => "Gas price too low; retry with a higher fee",
            Self::Reverted => "The contract rejected the transaction",
            Self::Network => "Could not reach the blockchain node",
            Self::Unknown => "Transaction failed for an unknown reason",
        }
    }

    /// Whether repeating the same read-only call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network)
    }
}

impl fmt::Display for TxErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

struct Rule {
    category: TxErrorCategory,
    matches: fn(&RpcFailure) -> bool,
}

fn user_rejected(f: &RpcFailure) -> bool {
    f.code == Some(4001) || f.mentions(&["user rejected", "user denied", "rejected the request"])
}

fn insufficient_funds(f: &RpcFailure) -> bool {
    f.mentions(&["insufficient funds", "insufficient balance"])
}

fn nonce_conflict(f: &RpcFailure) -> bool {
    f.mentions(&["nonce too low", "nonce too high", "already known"])
}

fn underpriced(f: &RpcFailure) -> bool {
    f.mentions(&["underpriced", "max fee per gas less than block base fee"])
}

fn reverted(f: &RpcFailure) -> bool {
    f.code == Some(3) || f.mentions(&["execution reverted", "revert"])
}

fn network(f: &RpcFailure) -> bool {
    f.code.is_none()
        && f.mentions(&[
            "timed out",
            "timeout",
            "connection refused",
            "connection reset",
            "error sending request",
            "dns error",
        ])
}

/// Rule order matters: a wallet rejection message can also mention gas,
/// and a revert can mention balances.
const RULES: &[Rule] = &[
    Rule {
        category: TxErrorCategory::UserRejected,
        matches: user_rejected,
    },
    Rule {
        category: TxErrorCategory::InsufficientFunds,
        matches: insufficient_funds,
    },
    Rule {
        category: TxErrorCategory::NonceConflict,
        matches: nonce_conflict,
    },
    Rule {
        category: TxErrorCategory::Underpriced,
        matches: underpriced,
    },
    Rule {
        category: TxErrorCategory::Reverted,
        matches: reverted,
    },
    Rule {
        category: TxErrorCategory::Network,
        matches: network,
    },
];

pub fn classify(failure: &RpcFailure) -> TxErrorCategory {
    RULES
        .iter()
        .find(|rule| (rule.matches)(failure))
        .map(|rule| rule.category)
        .unwrap_or(TxErrorCategory::Unknown)
}
