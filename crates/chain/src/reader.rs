use alloy::{
    primitives::{Address, Bytes, U256},
    providers::Provider,
};
use std::future::Future;

use crate::abi::{ERC20, RoundFactory};
use crate::classify::RpcFailure;

/// Fully resolved arguments of a `createRound` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoundParams {
    /// Account the transaction is sent from.
    pub founder: Address,
    pub funding_token: Address,
    /// Target in token base units.
    pub target_amount: U256,
    /// Unix seconds.
    pub funding_deadline: U256,
    pub milestones: Vec<RoundFactory::MilestoneParams>,
    pub jurors: Vec<Address>,
    /// Explicit gas limit; the provider estimates one when `None`.
    pub gas_limit: Option<u64>,
}

/// Read-only view of the factory and token contracts.
pub trait ChainReader: Send + Sync {
    /// Address of the round factory this reader talks to.
    fn factory(&self) -> Address;

    fn code_at(&self, address: Address) -> impl Future<Output = Result<Bytes, RpcFailure>> + Send;

    fn next_round_id(&self) -> impl Future<Output = Result<U256, RpcFailure>> + Send;

    fn is_paused(&self) -> impl Future<Output = Result<bool, RpcFailure>> + Send;

    fn is_authorized_juror(
        &self,
        juror: Address,
    ) -> impl Future<Output = Result<bool, RpcFailure>> + Send;

    fn token_decimals(&self, token: Address) -> impl Future<Output = Result<u8, RpcFailure>> + Send;

    fn estimate_create_gas(
        &self,
        params: &CreateRoundParams,
    ) -> impl Future<Output = Result<u64, RpcFailure>> + Send;

    /// `eth_call` the creation with a fixed gas limit.
    fn simulate_create(
        &self,
        params: &CreateRoundParams,
        gas_limit: u64,
    ) -> impl Future<Output = Result<(), RpcFailure>> + Send;
}

/// Factory client backed by a live provider.
#[derive(Debug, Clone)]
pub struct FactoryClient<P> {
    pub(crate) provider: P,
    pub(crate) factory: Address,
}

impl<P: Provider> FactoryClient<P> {
    pub fn new(provider: P, factory: Address) -> Self {
        Self { provider, factory }
    }
}

impl<P: Provider> ChainReader for FactoryClient<P> {
    fn factory(&self) -> Address {
        self.factory
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, RpcFailure> {
        Ok(self.provider.get_code_at(address).await?)
    }

    async fn next_round_id(&self) -> Result<U256, RpcFailure> {
        let contract = RoundFactory::new(self.factory, &self.provider);
        Ok(contract.nextRoundId().call().await?)
    }

    async fn is_paused(&self) -> Result<bool, RpcFailure> {
        let contract = RoundFactory::new(self.factory, &self.provider);
        Ok(contract.paused().call().await?)
    }

    async fn is_authorized_juror(&self, juror: Address) -> Result<bool, RpcFailure> {
        let contract = RoundFactory::new(self.factory, &self.provider);
        Ok(contract.isAuthorizedJuror(juror).call().await?)
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, RpcFailure> {
        let contract = ERC20::new(token, &self.provider);
        Ok(contract.decimals().call().await?)
    }

    async fn estimate_create_gas(&self, params: &CreateRoundParams) -> Result<u64, RpcFailure> {
        let contract = RoundFactory::new(self.factory, &self.provider);
        let gas = contract
            .createRound(
                params.funding_token,
                params.target_amount,
                params.funding_deadline,
                params.milestones.clone(),
                params.jurors.clone(),
            )
            .from(params.founder)
            .estimate_gas()
            .await?;
        Ok(gas)
    }

    async fn simulate_create(
        &self,
        params: &CreateRoundParams,
        gas_limit: u64,
    ) -> Result<(), RpcFailure> {
        let contract = RoundFactory::new(self.factory, &self.provider);
        contract
            .createRound(
                params.funding_token,
                params.target_amount,
                params.funding_deadline,
                params.milestones.clone(),
                params.jurors.clone(),
            )
            .from(params.founder)
            .gas(gas_limit)
            .call()
            .await?;
        Ok(())
    }
}
