use alloy::{
    network::TransactionBuilder,
    primitives::{Address, B256, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
};
use std::future::Future;
use thiserror::Error;

use crate::abi::ERC20;
use crate::classify::RpcFailure;

/// Gas units held back for one native and one ERC-20 transfer.
const GAS_RESERVE_UNITS: u64 = 21_000 + 65_000;

#[derive(Debug, Error)]
pub enum DispenseError {
    #[error("faucet wallet balance {balance} does not cover {required} wei (amount plus gas)")]
    InsufficientBalance { balance: U256, required: U256 },

    #[error("native transfer failed: {0}")]
    Native(RpcFailure),

    #[error("token transfer failed: {0}")]
    Token(RpcFailure),

    #[error("transfer {0} reverted")]
    Reverted(B256),

    #[error("no faucet token is configured")]
    TokenNotConfigured,

    #[error("RPC error: {0}")]
    Rpc(RpcFailure),
}

/// Sends faucet funds from a privileged wallet.
pub trait TokenDispenser: Send + Sync {
    /// Decimals of the configured ERC-20, `None` when no token is configured.
    fn token_decimals(&self) -> Option<u8>;

    /// Fail unless the faucet wallet can pay `native_amount` plus gas.
    fn ensure_gas_budget(
        &self,
        native_amount: U256,
    ) -> impl Future<Output = Result<(), DispenseError>> + Send;

    /// Send native coin and wait for one confirmation.
    fn send_native(
        &self,
        to: Address,
        amount: U256,
    ) -> impl Future<Output = Result<B256, DispenseError>> + Send;

    /// Send the configured ERC-20 (base units) and wait for one confirmation.
    fn send_token(
        &self,
        to: Address,
        amount: U256,
    ) -> impl Future<Output = Result<B256, DispenseError>> + Send;
}

/// Dispenser backed by a signing provider.
#[derive(Debug, Clone)]
pub struct WalletDispenser<P> {
    provider: P,
    sender: Address,
    token: Option<(Address, u8)>,
}

impl<P: Provider> WalletDispenser<P> {
    /// Build a dispenser, reading the token's decimals once up front.
    pub async fn connect(
        provider: P,
        sender: Address,
        token: Option<Address>,
    ) -> Result<Self, RpcFailure> {
        let token = match token {
            Some(address) => {
                let decimals = ERC20::new(address, &provider).decimals().call().await?;
                tracing::info!(token = %address, decimals, "Faucet token configured");
                Some((address, decimals))
            }
            None => None,
        };
        Ok(Self {
            provider,
            sender,
            token,
        })
    }
}

impl<P: Provider> TokenDispenser for WalletDispenser<P> {
    fn token_decimals(&self) -> Option<u8> {
        self.token.map(|(_, decimals)| decimals)
    }

    async fn ensure_gas_budget(&self, native_amount: U256) -> Result<(), DispenseError> {
        let balance = self
            .provider
            .get_balance(self.sender)
            .await
            .map_err(|e| DispenseError::Rpc(e.into()))?;
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| DispenseError::Rpc(e.into()))?;

        let required = native_amount
            .saturating_add(U256::from(gas_price).saturating_mul(U256::from(GAS_RESERVE_UNITS)));
        if balance < required {
            tracing::warn!(%balance, %required, "Faucet wallet is running dry");
            return Err(DispenseError::InsufficientBalance { balance, required });
        }
        Ok(())
    }

    async fn send_native(&self, to: Address, amount: U256) -> Result<B256, DispenseError> {
        let tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(to)
            .with_value(amount);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| DispenseError::Native(e.into()))?;
        let tx_hash = *pending.tx_hash();

        let receipt = pending
            .with_required_confirmations(1)
            .get_receipt()
            .await
            .map_err(|e| DispenseError::Native(e.into()))?;
        settled(tx_hash, receipt.status())
    }

    async fn send_token(&self, to: Address, amount: U256) -> Result<B256, DispenseError> {
        let (token, _) = self.token.ok_or(DispenseError::TokenNotConfigured)?;
        let contract = ERC20::new(token, &self.provider);

        let pending = contract
            .transfer(to, amount)
            .from(self.sender)
            .send()
            .await
            .map_err(|e| DispenseError::Token(e.into()))?;
        let tx_hash = *pending.tx_hash();

        let receipt = pending
            .with_required_confirmations(1)
            .get_receipt()
            .await
            .map_err(|e| DispenseError::Token(e.into()))?;
        settled(tx_hash, receipt.status())
    }
}

fn settled(tx_hash: B256, succeeded: bool) -> Result<B256, DispenseError> {
    if succeeded {
        Ok(tx_hash)
    } else {
        tracing::warn!(tx = %tx_hash, "Faucet transfer reverted");
        Err(DispenseError::Reverted(tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, U128, address};
    use alloy::providers::{ProviderBuilder, RootProvider};
    use alloy::transports::mock::Asserter;

    const FAUCET: Address = address!("5000000000000000000000000000000000000005");
    const TOKEN: Address = address!("4000000000000000000000000000000000000004");
    const USER: Address = address!("6000000000000000000000000000000000000006");

    fn mocked() -> (Asserter, RootProvider) {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(asserter.clone());
        (asserter, provider)
    }

    fn word(value: u64) -> Bytes {
        Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec())
    }

    #[tokio::test]
    async fn connect_reads_token_decimals_once() {
        let (asserter, provider) = mocked();
        asserter.push_success(&word(6));

        let dispenser = WalletDispenser::connect(provider, FAUCET, Some(TOKEN)).await.unwrap();

        assert_eq!(dispenser.token_decimals(), Some(6));
        assert!(asserter.read_q().is_empty());
    }

    #[tokio::test]
    async fn connect_without_token_makes_no_calls() {
        let (_asserter, provider) = mocked();
        let dispenser = WalletDispenser::connect(provider, FAUCET, None).await.unwrap();
        assert_eq!(dispenser.token_decimals(), None);

        let err = dispenser.send_token(USER, U256::from(1u64)).await.unwrap_err();
        assert!(matches!(err, DispenseError::TokenNotConfigured));
    }

    #[tokio::test]
    async fn gas_budget_covers_amount_and_reserve() {
        let (asserter, provider) = mocked();
        let dispenser = WalletDispenser::connect(provider, FAUCET, None).await.unwrap();
        let native = U256::from(1_000_000u64);
        // 86_000 gas at 10 wei on top of the amount.
        let required = U256::from(1_860_000u64);

        asserter.push_success(&required);
        asserter.push_success(&U128::from(10u64));
        dispenser.ensure_gas_budget(native).await.unwrap();

        asserter.push_success(&(required - U256::from(1u64)));
        asserter.push_success(&U128::from(10u64));
        let err = dispenser.ensure_gas_budget(native).await.unwrap_err();
        assert!(matches!(
            err,
            DispenseError::InsufficientBalance { required: r, .. } if r == required
        ));
    }

    #[tokio::test]
    async fn balance_lookup_failure_is_an_rpc_error() {
        let (asserter, provider) = mocked();
        let dispenser = WalletDispenser::connect(provider, FAUCET, None).await.unwrap();
        asserter.push_failure_msg("header not found");

        let err = dispenser.ensure_gas_budget(U256::from(1u64)).await.unwrap_err();

        let DispenseError::Rpc(failure) = err else {
            panic!("expected an RPC error");
        };
        assert_eq!(failure.message, "header not found");
    }

    #[test]
    fn reverted_transfer_is_reported_with_its_hash() {
        let tx = B256::repeat_byte(9);
        assert_eq!(settled(tx, true).unwrap(), tx);
        assert!(matches!(settled(tx, false), Err(DispenseError::Reverted(h)) if h == tx));
    }
}
