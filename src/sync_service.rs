//! Sync Service: reconciles chain state into the Store.

use crate::chain::ChainGateway;
use crate::error::RelayerResult;
use crate::store::Store;
use crate::types::{Addr, SyncOpStatus};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;

pub struct SyncService {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainGateway>,
    stale_after: ChronoDuration,
}

impl SyncService {
    pub fn new(store: Arc<dyn Store>, chain: Arc<dyn ChainGateway>, stale_after_secs: i64) -> Self {
        Self {
            store,
            chain,
            stale_after: ChronoDuration::seconds(stale_after_secs),
        }
    }

    /// Fetches market, proposal, and participant state in parallel and
    /// writes whatever succeeded; a failed sub-fetch is logged, not fatal.
    #[tracing::instrument(skip(self), fields(%market))]
    pub async fn sync_market(&self, market: Addr) -> RelayerResult<()> {
        let (info_res, proposal_res, participants_res) = tokio::join!(
            self.chain.get_market_info(market),
            self.chain.get_proposal(market),
            self.chain.get_participants(market),
        );

        let mut had_failure = false;

        match &info_res {
            Ok(info) => {
                self.store
                    .upsert_market(
                        market,
                        &info.topic,
                        info.threshold,
                        info.staking_token,
                        info.participant_count,
                        info.total_staked,
                        info.status,
                        info.created_at,
                        info.proposed_at,
                        info.resolved_at,
                    )
                    .await?;
            }
            Err(e) => {
                had_failure = true;
                self.log_error("sync_market.get_market_info", market, e).await?;
            }
        }

        match &participants_res {
            Ok(participants) => {
                for p in participants {
                    self.store
                        .upsert_participant(market, p.user, p.stake, p.outcome, p.has_attested)
                        .await?;
                }
            }
            Err(e) => {
                had_failure = true;
                self.log_error("sync_market.get_participants", market, e).await?;
            }
        }

        match &proposal_res {
            Ok(Some(proposal)) => {
                // "only if no active one yet" — Store enforces this via the
                // partial unique index; a conflict just returns the existing row.
                self.store
                    .create_proposal_if_absent(
                        market,
                        proposal.proposer,
                        proposal.outcome,
                        proposal.dispute_until,
                        &proposal.evidence_hash,
                    )
                    .await?;
            }
            Ok(None) => {}
            Err(e) => {
                had_failure = true;
                self.log_error("sync_market.get_proposal", market, e).await?;
            }
        }

        if !had_failure {
            self.store
                .log_sync_operation("sync_market", Some(market), SyncOpStatus::Ok, "synced")
                .await?;
        }

        Ok(())
    }

    async fn log_error(
        &self,
        operation: &str,
        market: Addr,
        err: &crate::error::RelayerError,
    ) -> RelayerResult<()> {
        tracing::warn!(%market, %operation, error = %err, "partial sync failure");
        self.store
            .log_sync_operation(operation, Some(market), SyncOpStatus::Error, &err.to_string())
            .await
    }

    /// Markets whose last sync is older than the configured staleness window.
    pub async fn stale_markets(&self) -> RelayerResult<Vec<Addr>> {
        let cutoff = Utc::now() - self.stale_after;
        self.store.stale_market_addresses(cutoff).await
    }

    /// Syncs any market the chain knows about that the Store doesn't yet.
    #[tracing::instrument(skip(self))]
    pub async fn discover_new_markets(&self) -> RelayerResult<usize> {
        let chain_markets = self.chain.get_all_markets().await?;
        let known: std::collections::HashSet<Addr> =
            self.store.list_all_market_addresses().await?.into_iter().collect();
        let mut discovered = 0;
        for market in chain_markets {
            if !known.contains(&market) {
                self.sync_market(market).await?;
                discovered += 1;
            }
        }
        Ok(discovered)
    }

    /// Runs a full sweep: discover new markets, then resync anything stale.
    /// Per-market failures are isolated — `sync_market` always returns
    /// `Ok(())` for partial chain failures, logging instead.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self) -> RelayerResult<()> {
        if let Err(e) = self.discover_new_markets().await {
            tracing::warn!(error = %e, "market discovery sweep failed");
        }
        let stale = self.stale_markets().await?;
        for market in stale {
            if let Err(e) = self.sync_market(market).await {
                tracing::warn!(%market, error = %e, "stale market sync failed");
            }
        }
        Ok(())
    }
}
