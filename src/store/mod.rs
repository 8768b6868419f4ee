//! The Store: durable off-chain state with atomic upserts.
//!
//! All write paths must be safe under concurrent reconciler ticks; the
//! Postgres implementation relies on unique indexes (schema in
//! `migrations/`) rather than in-process locking to enforce that.

mod postgres;

pub use postgres::PostgresStore;

use crate::error::RelayerResult;
use crate::types::{
    Addr, Attestation, AttestationSignature, BigAmount, FinalizationQueueEntry, Market,
    MarketStatus, Outcome, Proposal, SyncLogEntry, SyncOpStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct NewAttestation {
    pub market: Addr,
    pub proposal_id: i64,
    pub signer: Addr,
    pub outcome: Outcome,
    pub nonce: BigAmount,
    pub signature: AttestationSignature,
}

#[derive(Debug, Clone, Default)]
pub struct MarketFilter {
    pub status: Option<MarketStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    // --- Markets --------------------------------------------------------
    async fn upsert_market(
        &self,
        address: Addr,
        topic: &str,
        threshold: i32,
        staking_token: Addr,
        participant_count: i32,
        total_staked: BigAmount,
        status: MarketStatus,
        created_at: DateTime<Utc>,
        proposed_at: Option<DateTime<Utc>>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> RelayerResult<Market>;

    async fn get_market(&self, address: Addr) -> RelayerResult<Option<Market>>;

    async fn list_markets(&self, filter: MarketFilter) -> RelayerResult<Vec<Market>>;

    async fn list_all_market_addresses(&self) -> RelayerResult<Vec<Addr>>;

    async fn stale_market_addresses(&self, older_than: DateTime<Utc>) -> RelayerResult<Vec<Addr>>;

    // --- Participants -----------------------------------------------------
    async fn upsert_participant(
        &self,
        market: Addr,
        user: Addr,
        stake: BigAmount,
        outcome: Outcome,
        has_attested: bool,
    ) -> RelayerResult<()>;

    async fn get_participant(&self, market: Addr, user: Addr) -> RelayerResult<Option<crate::types::Participant>>;

    async fn list_participants(&self, market: Addr) -> RelayerResult<Vec<crate::types::Participant>>;

    async fn count_eligible_participants(&self, market: Addr, outcome: Outcome) -> RelayerResult<i64>;

    // --- Proposals --------------------------------------------------------
    /// Creates a proposal only if no non-disputed proposal exists yet for
    /// this market. Returns the existing active proposal on conflict.
    async fn create_proposal_if_absent(
        &self,
        market: Addr,
        proposer: Addr,
        outcome: Outcome,
        dispute_until: DateTime<Utc>,
        evidence_hash: &str,
    ) -> RelayerResult<Proposal>;

    async fn get_active_proposal(&self, market: Addr) -> RelayerResult<Option<Proposal>>;

    async fn set_proposal_attestation_count(&self, proposal_id: i64, count: i32) -> RelayerResult<()>;

    async fn stale_undisputed_proposals(
        &self,
        dispute_expired_before: DateTime<Utc>,
    ) -> RelayerResult<Vec<Proposal>>;

    async fn aged_proposals(&self, older_than: DateTime<Utc>) -> RelayerResult<Vec<Proposal>>;

    // --- Attestations -------------------------------------------------------
    /// Returns `Err(RelayerError::Conflict)` when a valid row already exists
    /// for `(market, signer, nonce)`.
    async fn create_attestation(&self, new: NewAttestation) -> RelayerResult<Attestation>;

    async fn count_valid_attestations(&self, market: Addr, outcome: Outcome) -> RelayerResult<i64>;

    async fn list_attestations(&self, market: Addr, outcome: Option<Outcome>) -> RelayerResult<Vec<Attestation>>;

    /// Parallel arrays `(signatures, nonces, signers)` in submission order,
    /// suitable for the on-chain `finalize` call.
    async fn attestations_for_finalization(
        &self,
        market: Addr,
        outcome: Outcome,
    ) -> RelayerResult<(Vec<AttestationSignature>, Vec<BigAmount>, Vec<Addr>)>;

    /// Forbidden outside development. Returns the number of rows removed.
    async fn delete_attestations(&self, market: Addr) -> RelayerResult<u64>;

    // --- Finalization queue -------------------------------------------------
    async fn enqueue_finalization(
        &self,
        market: Addr,
        signature_count: i32,
        eligible_count: i32,
        proposal_outcome: Outcome,
    ) -> RelayerResult<()>;

    async fn get_queue_entry(&self, market: Addr) -> RelayerResult<Option<FinalizationQueueEntry>>;

    async fn list_pending_queue_entries(&self) -> RelayerResult<Vec<FinalizationQueueEntry>>;

    async fn list_queue_entries(&self, limit: i64) -> RelayerResult<Vec<FinalizationQueueEntry>>;

    async fn mark_finalization_attempted(&self, market: Addr, error_message: &str) -> RelayerResult<()>;

    async fn mark_finalization_completed(&self, market: Addr) -> RelayerResult<()>;

    async fn touch_finalization_check(&self, market: Addr) -> RelayerResult<()>;

    // --- Sync log -----------------------------------------------------------
    async fn log_sync_operation(
        &self,
        operation: &str,
        market: Option<Addr>,
        status: SyncOpStatus,
        message: &str,
    ) -> RelayerResult<()>;

    async fn recent_sync_log(&self, limit: i64) -> RelayerResult<Vec<SyncLogEntry>>;

    /// Deletes sync log rows older than `before`. Returns the number removed.
    async fn delete_old_sync_log(&self, before: DateTime<Utc>) -> RelayerResult<u64>;

    // --- Aggregate counters for /health endpoints ---------------------------
    async fn market_counts_by_status(&self) -> RelayerResult<Vec<(MarketStatus, i64)>>;

    async fn total_attestation_count(&self) -> RelayerResult<i64>;

    async fn total_participant_count(&self) -> RelayerResult<i64>;

    async fn pending_finalization_count(&self) -> RelayerResult<i64>;

    /// A trivial round-trip used by `/health/detailed` to prove DB connectivity.
    async fn ping(&self) -> RelayerResult<()>;
}
