//! Testnet faucet: one native + one ERC-20 drip per address per cooldown.
//!
//! Per address the faucet cycles `Eligible → Claimed → (cooldown) → Eligible`.
//! The claim is recorded only after every transfer confirmed; a token
//! transfer failing after the native one succeeded is reported as a failure
//! and the native transfer stays sent.
//!
//! Claims for the same address are serialised within one process. Two API
//! instances sharing a database can still both pay out a claim started at
//! the same moment.

use alloy::primitives::{
    Address, B256, U256,
    utils::{parse_ether, parse_units},
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tranche_chain::{DispenseError, TokenDispenser};
use tranche_core::{AppError, Settings};
use tranche_storage::WalletStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaucetConfig {
    /// Native coin per claim, in wei.
    pub native_amount: U256,
    /// ERC-20 per claim, in whole tokens.
    pub token_amount: String,
    pub cooldown: Duration,
}

impl FaucetConfig {
    pub fn from_settings(settings: &Settings) -> eyre::Result<Self> {
        Ok(Self {
            native_amount: parse_ether(&settings.faucet_native_amount)?,
            token_amount: settings.faucet_token_amount.clone(),
            cooldown: cooldown_from_hours(settings.faucet_cooldown_hours)?,
        })
    }
}

/// A positive cooldown that chrono can represent.
pub fn cooldown_from_hours(hours: i64) -> eyre::Result<Duration> {
    if hours <= 0 {
        eyre::bail!("faucet cooldown must be a positive number of hours, got {hours}");
    }
    Duration::try_hours(hours)
        .ok_or_else(|| eyre::eyre!("faucet cooldown of {hours} hours is out of range"))
}

/// Claim eligibility of one address at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatus {
    pub can_claim: bool,
    /// Whole hours until the next claim, rounded up; zero when claimable.
    pub hours_left: i64,
    pub next_claim_time: Option<DateTime<Utc>>,
    pub last_claim_time: Option<DateTime<Utc>>,
}

/// Pure cooldown check.
pub fn claim_status(
    last_claim: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> ClaimStatus {
    let Some(last) = last_claim else {
        return ClaimStatus {
            can_claim: true,
            hours_left: 0,
            next_claim_time: None,
            last_claim_time: None,
        };
    };

    let next = last + cooldown;
    let hours_left = if now >= next {
        0
    } else {
        let seconds = (next - now).num_seconds();
        (seconds + 3599) / 3600
    };

    ClaimStatus {
        can_claim: now >= next,
        hours_left,
        next_claim_time: Some(next),
        last_claim_time: Some(last),
    }
}

/// Key under which a wallet's claims are stored: lowercase `0x` hex.
pub fn wallet_key(address: Address) -> String {
    format!("{address:#x}")
}

/// Look up the stored claim history and evaluate the cooldown.
pub async fn lookup_status<S: WalletStore>(
    store: &S,
    address: Address,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> Result<ClaimStatus, AppError> {
    let wallet = store.get_wallet(&wallet_key(address)).await?;
    Ok(claim_status(
        wallet.and_then(|w| w.last_claim_at),
        now,
        cooldown,
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub transaction_hashes: Vec<B256>,
    pub next_claim_time: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum FaucetError {
    #[error("Please wait {hours_left} more hour(s) before claiming again")]
    CoolingDown {
        next_claim_time: DateTime<Utc>,
        hours_left: i64,
    },

    #[error("A claim for this wallet is already in progress")]
    ClaimInProgress,

    #[error("Faucet transfer failed: {0}")]
    Dispense(#[from] DispenseError),

    #[error("Faucet storage error: {0}")]
    Store(#[from] AppError),

    #[error("Faucet misconfigured: {0}")]
    Config(String),
}

pub struct Faucet<S, D> {
    store: S,
    dispenser: D,
    config: FaucetConfig,
    /// Token amount in base units; `None` when no token is configured.
    token_units: Option<U256>,
    in_flight: Mutex<HashSet<Address>>,
}

/// Marks an address as mid-claim until dropped.
struct InFlight<'a> {
    claims: &'a Mutex<HashSet<Address>>,
    address: Address,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.address);
    }
}

impl<S: WalletStore, D: TokenDispenser> Faucet<S, D> {
    /// Fails when the token amount cannot be expressed in the token's decimals.
    pub fn new(store: S, dispenser: D, config: FaucetConfig) -> Result<Self, FaucetError> {
        let token_units = match dispenser.token_decimals() {
            Some(decimals) => Some(
                parse_units(&config.token_amount, decimals)
                    .map_err(|e| {
                        FaucetError::Config(format!(
                            "token amount {:?}: {e}",
                            config.token_amount
                        ))
                    })?
                    .get_absolute(),
            ),
            None => None,
        };
        Ok(Self {
            store,
            dispenser,
            config,
            token_units,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    fn begin_claim(&self, address: Address) -> Option<InFlight<'_>> {
        let mut claims = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        claims.insert(address).then(|| InFlight {
            claims: &self.in_flight,
            address,
        })
    }

    pub async fn status(
        &self,
        address: Address,
        now: DateTime<Utc>,
    ) -> Result<ClaimStatus, FaucetError> {
        Ok(lookup_status(&self.store, address, now, self.config.cooldown).await?)
    }

    pub async fn claim(
        &self,
        address: Address,
        now: DateTime<Utc>,
    ) -> Result<ClaimReceipt, FaucetError> {
        let _claim = self
            .begin_claim(address)
            .ok_or(FaucetError::ClaimInProgress)?;
        let status = self.status(address, now).await?;
        if !status.can_claim {
            return Err(FaucetError::CoolingDown {
                next_claim_time: status.next_claim_time.unwrap_or(now),
                hours_left: status.hours_left,
            });
        }

        self.dispenser
            .ensure_gas_budget(self.config.native_amount)
            .await?;

        let mut transaction_hashes = Vec::with_capacity(2);
        let native_tx = self
            .dispenser
            .send_native(address, self.config.native_amount)
            .await?;
        tracing::info!(to = %address, tx = %native_tx, "Native drip confirmed");
        transaction_hashes.push(native_tx);

        if let Some(units) = self.token_units {
            let token_tx = self
                .dispenser
                .send_token(address, units)
                .await
                .inspect_err(|e| {
                    tracing::warn!(
                        to = %address,
                        native_tx = %native_tx,
                        error = %e,
                        "Token drip failed after native drip"
                    )
                })?;
            tracing::info!(to = %address, tx = %token_tx, "Token drip confirmed");
            transaction_hashes.push(token_tx);
        }

        self.store.record_claim(&wallet_key(address), now).await?;

        Ok(ClaimReceipt {
            transaction_hashes,
            next_claim_time: now + self.config.cooldown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;
    use tranche_chain::RpcFailure;
    use tranche_storage::models::Wallet;

    const USER: Address = address!("5000000000000000000000000000000000000005");

    #[derive(Clone, Default)]
    struct MemoryWallets(Arc<Mutex<HashMap<String, Wallet>>>);

    impl WalletStore for MemoryWallets {
        async fn get_wallet(&self, address: &str) -> Result<Option<Wallet>, AppError> {
            Ok(self.0.lock().unwrap().get(address).cloned())
        }

        async fn record_claim(
            &self,
            address: &str,
            claimed_at: DateTime<Utc>,
        ) -> Result<(), AppError> {
            let mut wallets = self.0.lock().unwrap();
            let wallet = wallets.entry(address.to_string()).or_insert(Wallet {
                address: address.to_string(),
                last_claim_at: None,
                claim_count: 0,
            });
            wallet.last_claim_at = Some(claimed_at);
            wallet.claim_count += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDispenser {
        token_decimals: Option<u8>,
        broke: bool,
        token_fails: bool,
        /// When set, the native transfer waits for a notification.
        gate: Option<Arc<Notify>>,
        sent: Mutex<Vec<(&'static str, U256)>>,
    }

    impl TokenDispenser for FakeDispenser {
        fn token_decimals(&self) -> Option<u8> {
            self.token_decimals
        }

        async fn ensure_gas_budget(&self, native_amount: U256) -> Result<(), DispenseError> {
            if self.broke {
                return Err(DispenseError::InsufficientBalance {
                    balance: U256::ZERO,
                    required: native_amount,
                });
            }
            Ok(())
        }

        async fn send_native(&self, _to: Address, amount: U256) -> Result<B256, DispenseError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.sent.lock().unwrap().push(("native", amount));
            Ok(B256::repeat_byte(1))
        }

        async fn send_token(&self, _to: Address, amount: U256) -> Result<B256, DispenseError> {
            if self.token_fails {
                return Err(DispenseError::Token(RpcFailure::new(
                    Some(3),
                    "execution reverted: ERC20: transfer amount exceeds balance",
                )));
            }
            self.sent.lock().unwrap().push(("token", amount));
            Ok(B256::repeat_byte(2))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn config() -> FaucetConfig {
        FaucetConfig {
            native_amount: parse_ether("0.1").unwrap(),
            token_amount: "1000".into(),
            cooldown: Duration::hours(24),
        }
    }

    fn faucet(dispenser: FakeDispenser) -> (Faucet<MemoryWallets, FakeDispenser>, MemoryWallets) {
        let store = MemoryWallets::default();
        let faucet = Faucet::new(store.clone(), dispenser, config()).unwrap();
        (faucet, store)
    }

    #[test]
    fn never_claimed_is_eligible() {
        let status = claim_status(None, t0(), Duration::hours(24));
        assert_eq!(
            status,
            ClaimStatus {
                can_claim: true,
                hours_left: 0,
                next_claim_time: None,
                last_claim_time: None,
            }
        );
    }

    #[test]
    fn cooldown_boundary() {
        let cooldown = Duration::hours(24);
        let second_early = t0() + cooldown - Duration::seconds(1);
        let just_before = claim_status(Some(t0()), second_early, cooldown);
        assert!(!just_before.can_claim);
        assert_eq!(just_before.hours_left, 1);

        let exactly = claim_status(Some(t0()), t0() + cooldown, cooldown);
        assert!(exactly.can_claim);
        assert_eq!(exactly.hours_left, 0);
    }

    #[test]
    fn hours_left_rounds_up() {
        let status = claim_status(Some(t0()), t0() + Duration::minutes(90), Duration::hours(24));
        assert_eq!(status.hours_left, 23);
        assert_eq!(status.next_claim_time, Some(t0() + Duration::hours(24)));
    }

    #[test]
    fn status_serializes_camel_case() {
        let json = serde_json::to_value(claim_status(None, t0(), Duration::hours(24))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "canClaim": true,
                "hoursLeft": 0,
                "nextClaimTime": null,
                "lastClaimTime": null
            })
        );
    }

    #[tokio::test]
    async fn claim_sends_native_then_token_and_records() {
        let (faucet, store) = faucet(FakeDispenser {
            token_decimals: Some(6),
            ..Default::default()
        });

        let receipt = faucet.claim(USER, t0()).await.unwrap();

        assert_eq!(receipt.transaction_hashes.len(), 2);
        assert_eq!(receipt.next_claim_time, t0() + Duration::hours(24));
        let sent = faucet.dispenser.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                ("native", parse_ether("0.1").unwrap()),
                ("token", U256::from(1_000_000_000u64)),
            ]
        );
        let wallet = store.0.lock().unwrap()[&wallet_key(USER)].clone();
        assert_eq!(wallet.claim_count, 1);
        assert_eq!(wallet.last_claim_at, Some(t0()));
    }

    #[tokio::test]
    async fn second_claim_waits_for_cooldown() {
        let (faucet, _) = faucet(FakeDispenser::default());
        faucet.claim(USER, t0()).await.unwrap();

        let early = faucet
            .claim(USER, t0() + Duration::hours(24) - Duration::seconds(1))
            .await
            .unwrap_err();
        assert!(matches!(early, FaucetError::CoolingDown { hours_left: 1, .. }));

        let receipt = faucet.claim(USER, t0() + Duration::hours(24)).await.unwrap();
        assert_eq!(receipt.transaction_hashes.len(), 1);
    }

    #[tokio::test]
    async fn token_failure_is_not_recorded() {
        let (faucet, store) = faucet(FakeDispenser {
            token_decimals: Some(18),
            token_fails: true,
            ..Default::default()
        });

        let err = faucet.claim(USER, t0()).await.unwrap_err();

        assert!(matches!(err, FaucetError::Dispense(DispenseError::Token(_))));
        // The native drip went out and is not rolled back.
        assert_eq!(faucet.dispenser.sent.lock().unwrap().len(), 1);
        assert!(store.0.lock().unwrap().is_empty());
        assert!(faucet.status(USER, t0()).await.unwrap().can_claim);
    }

    #[tokio::test]
    async fn empty_faucet_sends_nothing() {
        let (faucet, _) = faucet(FakeDispenser {
            broke: true,
            ..Default::default()
        });

        let err = faucet.claim(USER, t0()).await.unwrap_err();
        assert!(matches!(
            err,
            FaucetError::Dispense(DispenseError::InsufficientBalance { .. })
        ));
        assert!(faucet.dispenser.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn unparseable_token_amount_is_rejected_up_front() {
        let dispenser = FakeDispenser {
            token_decimals: Some(6),
            ..Default::default()
        };
        let config = FaucetConfig {
            token_amount: "a lot".into(),
            ..config()
        };
        assert!(matches!(
            Faucet::new(MemoryWallets::default(), dispenser, config),
            Err(FaucetError::Config(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_claims_for_one_wallet_pay_once() {
        let gate = Arc::new(Notify::new());
        let (faucet, store) = faucet(FakeDispenser {
            gate: Some(gate.clone()),
            ..Default::default()
        });

        let (first, second) = tokio::join!(faucet.claim(USER, t0()), async {
            let result = faucet.claim(USER, t0()).await;
            gate.notify_one();
            result
        });

        assert_eq!(first.unwrap().transaction_hashes.len(), 1);
        assert!(matches!(second, Err(FaucetError::ClaimInProgress)));
        assert_eq!(faucet.dispenser.sent.lock().unwrap().len(), 1);
        assert_eq!(store.0.lock().unwrap()[&wallet_key(USER)].claim_count, 1);

        // Released once the first claim finished.
        assert!(faucet.begin_claim(USER).is_some());
    }

    #[test]
    fn cooldown_must_be_positive_and_representable() {
        assert_eq!(cooldown_from_hours(24).unwrap(), Duration::hours(24));
        assert!(cooldown_from_hours(0).is_err());
        assert!(cooldown_from_hours(-3).is_err());
        assert!(cooldown_from_hours(i64::MAX).is_err());
    }
}
