//! Signature Service: the authoritative ingestion path for attestations,
//! plus their retrieval operations.

use crate::chain::ChainGateway;
use crate::config::Config;
use crate::error::{RelayerError, RelayerResult};
use crate::store::{NewAttestation, Store};
use crate::sync_service::SyncService;
use crate::types::{
    required_signatures, Addr, Attestation, AttestationSignature, BigAmount, Outcome,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub attestation: Attestation,
    pub count_for_outcome: i64,
    pub enqueued: bool,
}

pub struct SignatureService {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainGateway>,
    sync: Arc<SyncService>,
    min_global_threshold: i64,
}

impl SignatureService {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainGateway>,
        sync: Arc<SyncService>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            chain,
            sync,
            min_global_threshold: config.min_signatures_threshold,
        }
    }

    /// Verifies, validates, persists, and (when the threshold is met)
    /// enqueues an attestation for finalization.
    #[tracing::instrument(skip(self, signature), fields(%market, %signer, %outcome))]
    pub async fn submit(
        &self,
        market: Addr,
        signer: Addr,
        outcome: Outcome,
        nonce: BigAmount,
        signature: AttestationSignature,
    ) -> RelayerResult<SubmitOutcome> {
        // 1. Signature must recover to the claimed signer.
        let ok = self
            .chain
            .verify_attestation(&signature, signer, market, outcome, nonce);
        if !ok {
            return Err(RelayerError::SignatureInvalid(
                "signature does not recover to the claimed signer".to_string(),
            ));
        }

        // 2. Unknown market triggers a synchronous one-shot sync.
        let market_row = match self.store.get_market(market).await? {
            Some(row) => row,
            None => {
                self.sync.sync_market(market).await?;
                self.store
                    .get_market(market)
                    .await?
                    .ok_or_else(|| RelayerError::NotFound(format!("market {market} not found")))?
            }
        };

        // 3. Signer must be a participant.
        let Some(participant) = self.store.get_participant(market, signer).await? else {
            return Err(RelayerError::NotParticipant);
        };

        // 4. Participant's staked outcome must match the attested outcome.
        if participant.outcome.0 != outcome.0 {
            return Err(RelayerError::OutcomeMismatch);
        }

        // 5. An active proposal must exist and agree on the outcome.
        let Some(proposal) = self.store.get_active_proposal(market).await? else {
            return Err(RelayerError::NoActiveProposal);
        };
        if proposal.outcome.0 != outcome.0 {
            return Err(RelayerError::OutcomeMismatch);
        }

        // 6. Persist; the Store enforces (market, signer, nonce) uniqueness.
        let attestation = self
            .store
            .create_attestation(NewAttestation {
                market,
                proposal_id: proposal.id,
                signer,
                outcome,
                nonce,
                signature,
            })
            .await?;

        // 7. Recompute and cache the attestation count.
        let count = self
            .store
            .count_valid_attestations(market, proposal.outcome)
            .await?;
        self.store
            .set_proposal_attestation_count(proposal.id, count as i32)
            .await?;

        // 8. Enqueue finalization if the threshold is met.
        let eligible = self
            .store
            .count_eligible_participants(market, proposal.outcome)
            .await?;
        let required = required_signatures(eligible, market_row.threshold, self.min_global_threshold);
        let enqueued = if count >= required {
            self.store
                .enqueue_finalization(market, count as i32, eligible as i32, proposal.outcome)
                .await?;
            true
        } else {
            false
        };

        Ok(SubmitOutcome {
            attestation,
            count_for_outcome: count,
            enqueued,
        })
    }

    pub async fn get_attestations(
        &self,
        market: Addr,
        outcome: Option<Outcome>,
    ) -> RelayerResult<Vec<Attestation>> {
        self.store.list_attestations(market, outcome).await
    }

    pub async fn get_attestations_for_finalization(
        &self,
        market: Addr,
        outcome: Outcome,
    ) -> RelayerResult<(Vec<AttestationSignature>, Vec<BigAmount>, Vec<Addr>)> {
        self.store.attestations_for_finalization(market, outcome).await
    }

    pub async fn count_attestations(&self, market: Addr, outcome: Outcome) -> RelayerResult<i64> {
        self.store.count_valid_attestations(market, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_signatures_matches_market_threshold() {
        assert_eq!(required_signatures(5, 60, 3), 3);
    }
}
