//! Chain Gateway: the single point of contact with the settlement chain.
//! No business logic lives here — every method is a thin, typed wrapper
//! around an RPC/contract call.

mod evm;
mod typed_data;

pub use evm::EvmChainGateway;
pub use typed_data::{verify_attestation, AttestationTypedData};

use crate::error::{RelayerError, RelayerResult};
use crate::types::{Addr, AttestationSignature, BigAmount, MarketStatus, Outcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ChainMarketInfo {
    pub topic: String,
    pub threshold: i32,
    pub staking_token: Addr,
    pub participant_count: i32,
    pub total_staked: BigAmount,
    pub status: MarketStatus,
    pub created_at: DateTime<Utc>,
    pub proposed_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ChainProposal {
    pub proposer: Addr,
    pub outcome: Outcome,
    pub dispute_until: DateTime<Utc>,
    pub evidence_hash: String,
    pub attestation_count: i32,
    pub is_disputed: bool,
}

#[derive(Debug, Clone)]
pub struct ChainParticipant {
    pub user: Addr,
    pub stake: BigAmount,
    pub outcome: Outcome,
    pub has_attested: bool,
}

#[derive(Debug, Clone)]
pub struct FinalizeReceipt {
    pub tx_hash: String,
}

/// Trait boundary for the Chain Gateway so services can be tested against a
/// fake implementation without an RPC endpoint.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn get_market_info(&self, market: Addr) -> RelayerResult<ChainMarketInfo>;

    async fn get_proposal(&self, market: Addr) -> RelayerResult<Option<ChainProposal>>;

    async fn get_participants(&self, market: Addr) -> RelayerResult<Vec<ChainParticipant>>;

    async fn get_all_markets(&self) -> RelayerResult<Vec<Addr>>;

    /// Round-trips `eth_chainId` against the RPC endpoint and returns the
    /// live chain id, confirming the connection is actually up.
    async fn check_connectivity(&self) -> RelayerResult<u64>;

    async fn predict_market_address(
        &self,
        topic: &str,
        threshold: i32,
        token: Addr,
        min_stake: BigAmount,
        salt: BigAmount,
    ) -> RelayerResult<Addr>;

    /// Recovers the signer from `signature` under the market's typed-data
    /// domain and compares case-insensitively to `claimed_signer`. Any
    /// failure to recover is treated as a `false` result, never an error.
    fn verify_attestation(
        &self,
        signature: &AttestationSignature,
        claimed_signer: Addr,
        market: Addr,
        outcome: Outcome,
        nonce: BigAmount,
    ) -> bool;

    async fn finalize_market(
        &self,
        market: Addr,
        signatures: &[AttestationSignature],
        nonces: &[BigAmount],
        signers: &[Addr],
    ) -> RelayerResult<FinalizeReceipt>;
}

pub(crate) fn contract_call_err(context: &str, err: impl std::fmt::Display) -> RelayerError {
    RelayerError::ContractCall(format!("{context}: {err}"))
}

pub(crate) fn chain_unavailable_err(context: &str, err: impl std::fmt::Display) -> RelayerError {
    RelayerError::ChainUnavailable(format!("{context}: {err}"))
}
