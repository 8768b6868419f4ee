//! EVM implementation of the Chain Gateway.
//!
//! An Alloy provider built with a gas/nonce/chain-id filler stack and a
//! wallet filler wrapping the relayer's single hot-wallet signer, used only
//! by the Finalization Service to submit the `finalize` transaction. One RPC
//! endpoint and one signer per deployment; no multi-transport fallback or
//! signer pool.

use super::{
    chain_unavailable_err, contract_call_err, typed_data, ChainGateway, ChainMarketInfo,
    ChainParticipant, ChainProposal, FinalizeReceipt,
};
use crate::config::Config;
use crate::error::{RelayerError, RelayerResult};
use crate::types::{Addr, AttestationSignature, BigAmount, MarketStatus, Outcome};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::sol;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

sol! {
    #[sol(rpc)]
    interface ISidebetMarket {
        function topic() external view returns (string);
        function threshold() external view returns (uint256);
        function stakingToken() external view returns (address);
        function participantCount() external view returns (uint256);
        function totalStaked() external view returns (uint256);
        function status() external view returns (uint8);
        function createdAt() external view returns (uint256);
        function proposedAt() external view returns (uint256);
        function resolvedAt() external view returns (uint256);

        function proposalProposer() external view returns (address);
        function proposalOutcome() external view returns (uint256);
        function proposalDisputeUntil() external view returns (uint256);
        function proposalEvidenceHash() external view returns (string);
        function proposalAttestationCount() external view returns (uint256);
        function proposalIsDisputed() external view returns (bool);

        function participantAt(uint256 index) external view returns (address user, uint256 stake, uint256 outcome, bool hasAttested);

        function finalize(bytes[] calldata signatures, uint256[] calldata nonces, address[] calldata signers) external;
    }

    #[sol(rpc)]
    interface ISidebetFactory {
        function allMarkets() external view returns (address[]);
        function predictMarketAddress(string calldata topic, uint256 threshold, address token, uint256 minStake, uint256 salt) external view returns (address);
    }
}

fn status_from_code(code: u8) -> RelayerResult<MarketStatus> {
    MarketStatus::from_code(code)
        .ok_or_else(|| RelayerError::ContractCall(format!("unknown on-chain status code {code}")))
}

fn secs_to_datetime(secs: U256) -> DateTime<Utc> {
    let secs: i64 = secs.try_into().unwrap_or(i64::MAX);
    Utc.timestamp_opt(secs, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn optional_timestamp(secs: U256) -> Option<DateTime<Utc>> {
    if secs.is_zero() {
        None
    } else {
        Some(secs_to_datetime(secs))
    }
}

pub struct EvmChainGateway {
    provider: DynProvider,
    chain_id: u64,
    factory_address: Option<Address>,
    relayer_address: Address,
    call_timeout: Duration,
    finalize_timeout: Duration,
}

impl EvmChainGateway {
    pub async fn connect(config: &Config) -> RelayerResult<Self> {
        let signer = PrivateKeySigner::from_bytes(&config.relayer_private_key.0)
            .map_err(|e| chain_unavailable_err("invalid relayer key", e))?
            .with_chain_id(Some(config.chain_id));
        let relayer_address = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(config.rpc_url.clone())
            .erased();
        Ok(Self {
            provider,
            chain_id: config.chain_id,
            factory_address: config.factory_address.map(|a| a.inner()),
            relayer_address,
            call_timeout: Duration::from_secs(30),
            finalize_timeout: Duration::from_secs(60),
        })
    }

    pub fn relayer_address(&self) -> Address {
        self.relayer_address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn with_timeout<T>(
        &self,
        dur: Duration,
        fut: impl std::future::IntoFuture<Output = Result<T, alloy_contract::Error>>,
    ) -> RelayerResult<T> {
        match tokio::time::timeout(dur, fut.into_future()).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(contract_call_err("contract call", e)),
            Err(_) => Err(chain_unavailable_err("rpc timeout", "deadline exceeded")),
        }
    }
}

#[async_trait]
impl ChainGateway for EvmChainGateway {
    async fn get_market_info(&self, market: Addr) -> RelayerResult<ChainMarketInfo> {
        let contract = ISidebetMarket::new(market.inner(), &self.provider);
        let topic = self
            .with_timeout(self.call_timeout, contract.topic().call())
            .await?;
        let threshold = self
            .with_timeout(self.call_timeout, contract.threshold().call())
            .await?;
        let staking_token = self
            .with_timeout(self.call_timeout, contract.stakingToken().call())
            .await?;
        let participant_count = self
            .with_timeout(self.call_timeout, contract.participantCount().call())
            .await?;
        let total_staked = self
            .with_timeout(self.call_timeout, contract.totalStaked().call())
            .await?;
        let status = self
            .with_timeout(self.call_timeout, contract.status().call())
            .await?;
        let created_at = self
            .with_timeout(self.call_timeout, contract.createdAt().call())
            .await?;
        let proposed_at = self
            .with_timeout(self.call_timeout, contract.proposedAt().call())
            .await?;
        let resolved_at = self
            .with_timeout(self.call_timeout, contract.resolvedAt().call())
            .await?;

        Ok(ChainMarketInfo {
            topic,
            threshold: threshold.try_into().unwrap_or(0),
            staking_token: staking_token.into(),
            participant_count: participant_count.try_into().unwrap_or(0),
            total_staked: BigAmount(total_staked),
            status: status_from_code(status)?,
            created_at: secs_to_datetime(created_at),
            proposed_at: optional_timestamp(proposed_at),
            resolved_at: optional_timestamp(resolved_at),
        })
    }

    async fn get_proposal(&self, market: Addr) -> RelayerResult<Option<ChainProposal>> {
        let contract = ISidebetMarket::new(market.inner(), &self.provider);
        let attestation_count = self
            .with_timeout(self.call_timeout, contract.proposalAttestationCount().call())
            .await?;
        // A zero attestation count means no proposal has been made yet.
        if attestation_count.is_zero() {
            return Ok(None);
        }
        let proposer = self
            .with_timeout(self.call_timeout, contract.proposalProposer().call())
            .await?;
        let outcome = self
            .with_timeout(self.call_timeout, contract.proposalOutcome().call())
            .await?;
        let dispute_until = self
            .with_timeout(self.call_timeout, contract.proposalDisputeUntil().call())
            .await?;
        let evidence_hash = self
            .with_timeout(self.call_timeout, contract.proposalEvidenceHash().call())
            .await?;
        let is_disputed = self
            .with_timeout(self.call_timeout, contract.proposalIsDisputed().call())
            .await?;

        Ok(Some(ChainProposal {
            proposer: proposer.into(),
            outcome: Outcome(outcome.try_into().unwrap_or(0)),
            dispute_until: secs_to_datetime(dispute_until),
            evidence_hash,
            attestation_count: attestation_count.try_into().unwrap_or(0),
            is_disputed,
        }))
    }

    async fn get_participants(&self, market: Addr) -> RelayerResult<Vec<ChainParticipant>> {
        let contract = ISidebetMarket::new(market.inner(), &self.provider);
        let count: u64 = self
            .with_timeout(self.call_timeout, contract.participantCount().call())
            .await?
            .try_into()
            .unwrap_or(0);
        let mut out = Vec::with_capacity(count as usize);
        for i in 0..count {
            let ISidebetMarket::participantAtReturn {
                user,
                stake,
                outcome,
                hasAttested: has_attested,
            } = self
                .with_timeout(
                    self.call_timeout,
                    contract.participantAt(U256::from(i)).call(),
                )
                .await?;
            out.push(ChainParticipant {
                user: user.into(),
                stake: BigAmount(stake),
                outcome: Outcome(outcome.try_into().unwrap_or(0)),
                has_attested,
            });
        }
        Ok(out)
    }

    async fn check_connectivity(&self) -> RelayerResult<u64> {
        match tokio::time::timeout(self.call_timeout, self.provider.get_chain_id()).await {
            Ok(Ok(chain_id)) => Ok(chain_id),
            Ok(Err(e)) => Err(chain_unavailable_err("eth_chainId", e)),
            Err(_) => Err(chain_unavailable_err("eth_chainId", "deadline exceeded")),
        }
    }

    async fn get_all_markets(&self) -> RelayerResult<Vec<Addr>> {
        let Some(factory_address) = self.factory_address else {
            return Ok(Vec::new());
        };
        let factory = ISidebetFactory::new(factory_address, &self.provider);
        let markets = self
            .with_timeout(self.call_timeout, factory.allMarkets().call())
            .await?;
        Ok(markets.into_iter().map(Addr::from).collect())
    }

    async fn predict_market_address(
        &self,
        topic: &str,
        threshold: i32,
        token: Addr,
        min_stake: BigAmount,
        salt: BigAmount,
    ) -> RelayerResult<Addr> {
        let factory_address = self.factory_address.ok_or_else(|| {
            RelayerError::Validation("no factory configured for this deployment".to_string())
        })?;
        let factory = ISidebetFactory::new(factory_address, &self.provider);
        let predicted = self
            .with_timeout(
                self.call_timeout,
                factory
                    .predictMarketAddress(
                        topic.to_string(),
                        U256::from(threshold),
                        token.inner(),
                        min_stake.0,
                        salt.0,
                    )
                    .call(),
            )
            .await?;
        Ok(predicted.into())
    }

    fn verify_attestation(
        &self,
        signature: &AttestationSignature,
        claimed_signer: Addr,
        market: Addr,
        outcome: Outcome,
        nonce: BigAmount,
    ) -> bool {
        typed_data::verify_attestation(self.chain_id, signature, claimed_signer, market, outcome, nonce)
    }

    async fn finalize_market(
        &self,
        market: Addr,
        signatures: &[AttestationSignature],
        nonces: &[BigAmount],
        signers: &[Addr],
    ) -> RelayerResult<FinalizeReceipt> {
        let contract = ISidebetMarket::new(market.inner(), &self.provider);
        let sig_bytes: Vec<alloy_primitives::Bytes> = signatures
            .iter()
            .map(|s| alloy_primitives::Bytes::from(s.0.clone()))
            .collect();
        let nonce_words: Vec<U256> = nonces.iter().map(|n| n.0).collect();
        let signer_addrs: Vec<Address> = signers.iter().map(|a| a.inner()).collect();

        let pending = self
            .with_timeout(
                self.call_timeout,
                contract
                    .finalize(sig_bytes, nonce_words, signer_addrs)
                    .send(),
            )
            .await?;

        let receipt = tokio::time::timeout(self.finalize_timeout, pending.get_receipt())
            .await
            .map_err(|_| chain_unavailable_err("finalize confirmation", "deadline exceeded"))?
            .map_err(|e| contract_call_err("finalize confirmation", e))?;

        Ok(FinalizeReceipt {
            tx_hash: format!("{:#x}", receipt.transaction_hash),
        })
    }
}
