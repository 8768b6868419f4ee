//! Finalization Service: drives ready markets from Proposed to Resolved
//! on-chain. Never raises to its caller (the Scheduler) — failures are
//! recorded on the queue entry and the sync log.

use crate::chain::ChainGateway;
use crate::error::RelayerResult;
use crate::store::Store;
use crate::sync_service::SyncService;
use crate::types::{required_signatures, Addr, MarketStatus, SyncOpStatus};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;

pub struct FinalizationService {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainGateway>,
    sync: Arc<SyncService>,
    min_global_threshold: i64,
    max_proposal_age: ChronoDuration,
}

impl FinalizationService {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainGateway>,
        sync: Arc<SyncService>,
        min_global_threshold: i64,
        max_proposal_age_hours: i64,
    ) -> Self {
        Self {
            store,
            chain,
            sync,
            min_global_threshold,
            max_proposal_age: ChronoDuration::hours(max_proposal_age_hours),
        }
    }

    /// A market is ready to finalize once its dispute window has elapsed and
    /// enough attestations have accumulated for the proposed outcome. The
    /// Relayer has no direct chain-clock reader, so it treats its own wall
    /// clock as authoritative against the dispute deadline already mirrored
    /// from the chain at sync time.
    async fn is_ready(&self, market: Addr) -> RelayerResult<bool> {
        let Some(market_row) = self.store.get_market(market).await? else {
            return Ok(false);
        };
        if matches!(market_row.status, MarketStatus::Resolved | MarketStatus::Cancelled) {
            return Ok(false);
        }
        let Some(proposal) = self.store.get_active_proposal(market).await? else {
            return Ok(false);
        };
        // Strict `now >= disputeUntil`; exactly-at-boundary is NOT ready.
        if Utc::now() < proposal.dispute_until {
            return Ok(false);
        }
        let eligible = self
            .store
            .count_eligible_participants(market, proposal.outcome)
            .await?;
        let required = required_signatures(eligible, market_row.threshold, self.min_global_threshold);
        let signature_count = self
            .store
            .count_valid_attestations(market, proposal.outcome)
            .await?;
        Ok(signature_count >= required)
    }

    /// Re-checks readiness, re-reads live chain status, collects
    /// attestations, and submits the finalize transaction if everything
    /// still holds.
    #[tracing::instrument(skip(self), fields(%market))]
    pub async fn process_market(&self, market: Addr) -> RelayerResult<()> {
        if !self.is_ready(market).await? {
            self.store.touch_finalization_check(market).await?;
            return Ok(());
        }

        // Step 1: re-read chain status; already resolved short-circuits.
        let info = match self.chain.get_market_info(market).await {
            Ok(info) => info,
            Err(e) => {
                self.record_attempt_failure(market, &e.to_string()).await?;
                return Ok(());
            }
        };
        if info.status == MarketStatus::Resolved {
            self.store.mark_finalization_completed(market).await?;
            return Ok(());
        }

        let Some(proposal) = self.store.get_active_proposal(market).await? else {
            self.store.touch_finalization_check(market).await?;
            return Ok(());
        };

        // Step 2: collect attestations for the on-chain call.
        let (signatures, nonces, signers) = self
            .store
            .attestations_for_finalization(market, proposal.outcome)
            .await?;
        if signatures.is_empty() {
            tracing::warn!(%market, "ready queue entry has zero attestations to submit");
            self.store.touch_finalization_check(market).await?;
            self.store
                .log_sync_operation(
                    "finalize",
                    Some(market),
                    SyncOpStatus::Warning,
                    "ready but zero attestations collected",
                )
                .await?;
            return Ok(());
        }

        // Step 3: submit.
        match self
            .chain
            .finalize_market(market, &signatures, &nonces, &signers)
            .await
        {
            Ok(receipt) => {
                self.store.mark_finalization_completed(market).await?;
                self.store
                    .log_sync_operation(
                        "finalize",
                        Some(market),
                        SyncOpStatus::Ok,
                        &format!("finalized, tx={}", receipt.tx_hash),
                    )
                    .await?;
                // Mirror resolved state rather than trust the pending receipt.
                self.sync.sync_market(market).await?;
            }
            Err(e) => {
                self.record_attempt_failure(market, &e.to_string()).await?;
            }
        }

        Ok(())
    }

    async fn record_attempt_failure(&self, market: Addr, message: &str) -> RelayerResult<()> {
        self.store.mark_finalization_attempted(market, message).await?;
        self.store
            .log_sync_operation("finalize", Some(market), SyncOpStatus::Error, message)
            .await
    }

    /// Scheduler entry point: scans all pending queue entries and processes
    /// the ready ones. Per-entry failures are isolated.
    #[tracing::instrument(skip(self))]
    pub async fn run_sweep(&self) -> RelayerResult<()> {
        let entries = self.store.list_pending_queue_entries().await?;
        for entry in entries {
            if let Err(e) = self.process_market(entry.market).await {
                tracing::error!(market = %entry.market, error = %e, "finalization tick failed");
            }
        }
        Ok(())
    }

    /// Enqueues any proposal whose dispute window has elapsed without a
    /// dispute being raised.
    #[tracing::instrument(skip(self))]
    pub async fn check_dispute_windows(&self) -> RelayerResult<()> {
        let proposals = self.store.stale_undisputed_proposals(Utc::now()).await?;
        for proposal in proposals {
            let eligible = self
                .store
                .count_eligible_participants(proposal.market, proposal.outcome)
                .await?;
            let signature_count = self
                .store
                .count_valid_attestations(proposal.market, proposal.outcome)
                .await?;
            self.store
                .enqueue_finalization(
                    proposal.market,
                    signature_count as i32,
                    eligible as i32,
                    proposal.outcome,
                )
                .await?;
        }
        Ok(())
    }

    /// Safety net for aged proposals that never reached their threshold:
    /// enqueues them if they've since cleared the global minimum, otherwise
    /// logs a warning so the shortfall is visible.
    #[tracing::instrument(skip(self))]
    pub async fn check_old_proposals(&self) -> RelayerResult<()> {
        let cutoff = Utc::now() - self.max_proposal_age;
        let proposals = self.store.aged_proposals(cutoff).await?;
        for proposal in proposals {
            let signature_count = self
                .store
                .count_valid_attestations(proposal.market, proposal.outcome)
                .await?;
            if signature_count >= self.min_global_threshold {
                let eligible = self
                    .store
                    .count_eligible_participants(proposal.market, proposal.outcome)
                    .await?;
                self.store
                    .enqueue_finalization(
                        proposal.market,
                        signature_count as i32,
                        eligible as i32,
                        proposal.outcome,
                    )
                    .await?;
            } else {
                self.store
                    .log_sync_operation(
                        "check_old_proposals",
                        Some(proposal.market),
                        SyncOpStatus::Warning,
                        &format!(
                            "aged proposal {} has only {} attestations, below minimum {}",
                            proposal.id, signature_count, self.min_global_threshold
                        ),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}
