use alloy::{
    primitives::{Address, B256},
    providers::Provider,
    rpc::types::Log,
};
use std::future::Future;
use thiserror::Error;

use crate::abi::RoundFactory;
use crate::classify::RpcFailure;
use crate::decoder::{CreatedRound, decode_round_created};
use crate::reader::{CreateRoundParams, FactoryClient};

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Nothing was broadcast.
    #[error("{}: {0}", .0.category().user_message())]
    Transaction(RpcFailure),

    /// Broadcast succeeded; the transaction may still be mined.
    #[error("transaction {tx_hash} was broadcast but confirmation failed: {failure}")]
    Confirmation { tx_hash: B256, failure: RpcFailure },

    #[error("transaction {tx_hash} reverted on-chain")]
    Reverted { tx_hash: B256 },

    #[error(
        "transaction {tx_hash} succeeded but emitted no RoundCreated event; \
         the client ABI does not match the deployed factory"
    )]
    MissingEvent { tx_hash: B256 },
}

/// Sends the irreversible round-creation transaction.
pub trait RoundSubmitter: Send + Sync {
    fn submit_round(
        &self,
        params: &CreateRoundParams,
    ) -> impl Future<Output = Result<CreatedRound, SubmitError>> + Send;
}

impl<P: Provider> RoundSubmitter for FactoryClient<P> {
    async fn submit_round(&self, params: &CreateRoundParams) -> Result<CreatedRound, SubmitError> {
        let contract = RoundFactory::new(self.factory, &self.provider);
        let mut call = contract
            .createRound(
                params.funding_token,
                params.target_amount,
                params.funding_deadline,
                params.milestones.clone(),
                params.jurors.clone(),
            )
            .from(params.founder);
        if let Some(gas) = params.gas_limit {
            call = call.gas(gas);
        }

        let pending = call
            .send()
            .await
            .map_err(|e| SubmitError::Transaction(e.into()))?;
        let tx_hash = *pending.tx_hash();
        tracing::info!(tx = %tx_hash, founder = %params.founder, "Round creation broadcast");

        let receipt = pending
            .with_required_confirmations(1)
            .get_receipt()
            .await
            .map_err(|e| SubmitError::Confirmation {
                tx_hash,
                failure: e.into(),
            })?;

        let created =
            created_round_from(tx_hash, receipt.status(), receipt.inner.logs(), self.factory)?;
        tracing::info!(
            round_id = %created.round_id,
            round = %created.round_address,
            block = ?created.block_number,
            "Round created on-chain"
        );
        Ok(created)
    }
}

/// The round a mined `createRound` produced, judged from its receipt.
fn created_round_from(
    tx_hash: B256,
    succeeded: bool,
    logs: &[Log],
    factory: Address,
) -> Result<CreatedRound, SubmitError> {
    if !succeeded {
        tracing::warn!(tx = %tx_hash, "Round creation reverted");
        return Err(SubmitError::Reverted { tx_hash });
    }
    decode_round_created(logs, factory, tx_hash).ok_or(SubmitError::MissingEvent { tx_hash })
}
