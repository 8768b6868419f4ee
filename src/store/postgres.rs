//! Postgres-backed `Store` implementation.
//!
//! Uses runtime-checked `sqlx::query_as` (not the `query!` macro) since
//! there is no reachable `DATABASE_URL` at build time in CI/dev images. Rows
//! are mapped into this crate's domain types at the boundary so nothing
//! above this module ever sees a raw `sqlx::Row`.

use super::{MarketFilter, NewAttestation, Store};
use crate::error::{RelayerError, RelayerResult};
use crate::types::{
    Addr, Attestation, AttestationSignature, BigAmount, FinalizationQueueEntry, Market,
    MarketStatus, Outcome, Participant, Proposal, SyncLogEntry, SyncOpStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::error::DatabaseError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Row};
use std::str::FromStr;
use std::time::Duration;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> RelayerResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(RelayerError::from)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RelayerError::internal(e))?;
        Ok(Self { pool })
    }
}

fn addr(s: &str) -> RelayerResult<Addr> {
    Addr::from_str(s).map_err(|e| RelayerError::internal(AddrDecodeError(e.to_string())))
}

fn big(s: &str) -> RelayerResult<BigAmount> {
    BigAmount::from_str(s).map_err(|_| RelayerError::internal(AddrDecodeError(format!("bad integer column: {s}"))))
}

fn status_str(status: MarketStatus) -> &'static str {
    match status {
        MarketStatus::Open => "open",
        MarketStatus::Proposed => "proposed",
        MarketStatus::Resolved => "resolved",
        MarketStatus::Disputed => "disputed",
        MarketStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(s: &str) -> RelayerResult<MarketStatus> {
    match s {
        "open" => Ok(MarketStatus::Open),
        "proposed" => Ok(MarketStatus::Proposed),
        "resolved" => Ok(MarketStatus::Resolved),
        "disputed" => Ok(MarketStatus::Disputed),
        "cancelled" => Ok(MarketStatus::Cancelled),
        other => Err(RelayerError::internal(AddrDecodeError(format!(
            "unknown status column value: {other}"
        )))),
    }
}

#[derive(Debug, thiserror::Error)]
#[error("data decode error: {0}")]
struct AddrDecodeError(String);

#[derive(FromRow)]
struct MarketRow {
    address: String,
    topic: String,
    threshold: i32,
    staking_token: String,
    participant_count: i32,
    total_staked: String,
    status: String,
    created_at: DateTime<Utc>,
    proposed_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    last_sync_at: DateTime<Utc>,
}

impl MarketRow {
    fn into_domain(self) -> RelayerResult<Market> {
        Ok(Market {
            address: addr(&self.address)?,
            topic: self.topic,
            threshold: self.threshold,
            staking_token: addr(&self.staking_token)?,
            participant_count: self.participant_count,
            total_staked: big(&self.total_staked)?,
            status: status_from_str(&self.status)?,
            created_at: self.created_at,
            proposed_at: self.proposed_at,
            resolved_at: self.resolved_at,
            last_sync_at: self.last_sync_at,
        })
    }
}

#[derive(FromRow)]
struct ParticipantRow {
    market: String,
    user: String,
    stake: String,
    outcome: i16,
    has_attested: bool,
}

impl ParticipantRow {
    fn into_domain(self) -> RelayerResult<Participant> {
        Ok(Participant {
            market: addr(&self.market)?,
            user: addr(&self.user)?,
            stake: big(&self.stake)?,
            outcome: Outcome(self.outcome as u8),
            has_attested: self.has_attested,
        })
    }
}

#[derive(FromRow)]
struct ProposalRow {
    id: i64,
    market: String,
    proposer: String,
    outcome: i16,
    dispute_until: DateTime<Utc>,
    evidence_hash: String,
    attestation_count: i32,
    is_disputed: bool,
    created_at: DateTime<Utc>,
}

impl ProposalRow {
    fn into_domain(self) -> RelayerResult<Proposal> {
        Ok(Proposal {
            id: self.id,
            market: addr(&self.market)?,
            proposer: addr(&self.proposer)?,
            outcome: Outcome(self.outcome as u8),
            dispute_until: self.dispute_until,
            evidence_hash: self.evidence_hash,
            attestation_count: self.attestation_count,
            is_disputed: self.is_disputed,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct AttestationRow {
    id: i64,
    market: String,
    proposal_id: i64,
    signer: String,
    outcome: i16,
    nonce: String,
    signature: String,
    submitted_at: DateTime<Utc>,
    is_valid: bool,
}

impl AttestationRow {
    fn into_domain(self) -> RelayerResult<Attestation> {
        Ok(Attestation {
            id: self.id,
            market: addr(&self.market)?,
            proposal_id: self.proposal_id,
            signer: addr(&self.signer)?,
            outcome: Outcome(self.outcome as u8),
            nonce: big(&self.nonce)?,
            signature: AttestationSignature::from_str(&self.signature)
                .map_err(|e| RelayerError::internal(AddrDecodeError(e.to_string())))?,
            submitted_at: self.submitted_at,
            is_valid: self.is_valid,
        })
    }
}

#[derive(FromRow)]
struct QueueRow {
    market: String,
    signature_count: i32,
    eligible_count: i32,
    proposal_outcome: i16,
    last_checked_at: DateTime<Utc>,
    attempted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    threshold_met: bool,
    last_error: Option<String>,
}

impl QueueRow {
    fn into_domain(self) -> RelayerResult<FinalizationQueueEntry> {
        Ok(FinalizationQueueEntry {
            market: addr(&self.market)?,
            signature_count: self.signature_count,
            eligible_count: self.eligible_count,
            proposal_outcome: Outcome(self.proposal_outcome as u8),
            last_checked_at: self.last_checked_at,
            attempted_at: self.attempted_at,
            completed_at: self.completed_at,
            threshold_met: self.threshold_met,
            last_error: self.last_error,
        })
    }
}

#[async_trait]
impl Store for PostgresStore {
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
    ) -> RelayerResult<Market> {
        sqlx::query("INSERT INTO users (address) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(staking_token.to_string())
            .execute(&self.pool)
            .await?;

        let row: MarketRow = sqlx::query_as(
            r#"
            INSERT INTO markets (address, topic, threshold, staking_token, participant_count,
                                  total_staked, status, created_at, proposed_at, resolved_at, last_sync_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
            ON CONFLICT (address) DO UPDATE SET
                topic = EXCLUDED.topic,
                threshold = EXCLUDED.threshold,
                staking_token = EXCLUDED.staking_token,
                participant_count = EXCLUDED.participant_count,
                total_staked = EXCLUDED.total_staked,
                status = EXCLUDED.status,
                proposed_at = COALESCE(EXCLUDED.proposed_at, markets.proposed_at),
                resolved_at = COALESCE(EXCLUDED.resolved_at, markets.resolved_at),
                last_sync_at = now()
            RETURNING *
            "#,
        )
        .bind(address.to_string())
        .bind(topic)
        .bind(threshold)
        .bind(staking_token.to_string())
        .bind(participant_count)
        .bind(total_staked.to_string())
        .bind(status_str(status))
        .bind(created_at)
        .bind(proposed_at)
        .bind(resolved_at)
        .fetch_one(&self.pool)
        .await?;
        row.into_domain()
    }

    async fn get_market(&self, address: Addr) -> RelayerResult<Option<Market>> {
        let row: Option<MarketRow> = sqlx::query_as("SELECT * FROM markets WHERE address = $1")
            .bind(address.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    async fn list_markets(&self, filter: MarketFilter) -> RelayerResult<Vec<Market>> {
        let rows: Vec<MarketRow> = match filter.status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT * FROM markets WHERE status = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(status_str(status))
                .bind(filter.limit)
                .bind(filter.offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM markets ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                    .bind(filter.limit)
                    .bind(filter.offset)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn list_all_market_addresses(&self) -> RelayerResult<Vec<Addr>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT address FROM markets")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|(a,)| addr(&a)).collect()
    }

    async fn stale_market_addresses(&self, older_than: DateTime<Utc>) -> RelayerResult<Vec<Addr>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT address FROM markets WHERE last_sync_at < $1")
                .bind(older_than)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(|(a,)| addr(&a)).collect()
    }

    async fn upsert_participant(
        &self,
        market: Addr,
        user: Addr,
        stake: BigAmount,
        outcome: Outcome,
        has_attested: bool,
    ) -> RelayerResult<()> {
        sqlx::query("INSERT INTO users (address) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user.to_string())
            .execute(&self.pool)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO participants (market, "user", stake, outcome, has_attested)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (market, "user") DO UPDATE SET
                stake = EXCLUDED.stake,
                outcome = EXCLUDED.outcome,
                has_attested = EXCLUDED.has_attested
            "#,
        )
        .bind(market.to_string())
        .bind(user.to_string())
        .bind(stake.to_string())
        .bind(outcome.0 as i16)
        .bind(has_attested)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_participant(&self, market: Addr, user: Addr) -> RelayerResult<Option<Participant>> {
        let row: Option<ParticipantRow> = sqlx::query_as(
            r#"SELECT * FROM participants WHERE market = $1 AND "user" = $2"#,
        )
        .bind(market.to_string())
        .bind(user.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    async fn list_participants(&self, market: Addr) -> RelayerResult<Vec<Participant>> {
        let rows: Vec<ParticipantRow> = sqlx::query_as("SELECT * FROM participants WHERE market = $1")
            .bind(market.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn count_eligible_participants(&self, market: Addr, outcome: Outcome) -> RelayerResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM participants WHERE market = $1 AND outcome = $2")
            .bind(market.to_string())
            .bind(outcome.0 as i16)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    async fn create_proposal_if_absent(
        &self,
        market: Addr,
        proposer: Addr,
        outcome: Outcome,
        dispute_until: DateTime<Utc>,
        evidence_hash: &str,
    ) -> RelayerResult<Proposal> {
        let inserted: Option<ProposalRow> = sqlx::query_as(
            r#"
            INSERT INTO proposals (market, proposer, outcome, dispute_until, evidence_hash)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (market) WHERE NOT is_disputed DO NOTHING
            RETURNING *
            "#,
        )
        .bind(market.to_string())
        .bind(proposer.to_string())
        .bind(outcome.0 as i16)
        .bind(dispute_until)
        .bind(evidence_hash)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => row.into_domain(),
            None => self
                .get_active_proposal(market)
                .await?
                .ok_or_else(|| RelayerError::internal(AddrDecodeError(
                    "proposal insert conflicted but no active proposal found".to_string(),
                ))),
        }
    }

    async fn get_active_proposal(&self, market: Addr) -> RelayerResult<Option<Proposal>> {
        let row: Option<ProposalRow> = sqlx::query_as(
            "SELECT * FROM proposals WHERE market = $1 AND NOT is_disputed ORDER BY created_at DESC LIMIT 1",
        )
        .bind(market.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    async fn set_proposal_attestation_count(&self, proposal_id: i64, count: i32) -> RelayerResult<()> {
        sqlx::query("UPDATE proposals SET attestation_count = $1 WHERE id = $2")
            .bind(count)
            .bind(proposal_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn stale_undisputed_proposals(
        &self,
        dispute_expired_before: DateTime<Utc>,
    ) -> RelayerResult<Vec<Proposal>> {
        let rows: Vec<ProposalRow> = sqlx::query_as(
            r#"
            SELECT p.* FROM proposals p
            JOIN markets m ON m.address = p.market
            WHERE NOT p.is_disputed
              AND p.dispute_until <= $1
              AND m.status NOT IN ('resolved', 'cancelled')
            "#,
        )
        .bind(dispute_expired_before)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn aged_proposals(&self, older_than: DateTime<Utc>) -> RelayerResult<Vec<Proposal>> {
        let rows: Vec<ProposalRow> = sqlx::query_as(
            r#"
            SELECT p.* FROM proposals p
            JOIN markets m ON m.address = p.market
            WHERE NOT p.is_disputed
              AND p.created_at <= $1
              AND m.status = 'proposed'
            "#,
        )
        .bind(older_than)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn create_attestation(&self, new: NewAttestation) -> RelayerResult<Attestation> {
        let result: Result<AttestationRow, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO attestations (market, proposal_id, signer, outcome, nonce, signature)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.market.to_string())
        .bind(new.proposal_id)
        .bind(new.signer.to_string())
        .bind(new.outcome.0 as i16)
        .bind(new.nonce.to_string())
        .bind(new.signature.to_string())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row.into_domain(),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(RelayerError::Conflict(
                    "an attestation for this (market, signer, nonce) already exists".to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn count_valid_attestations(&self, market: Addr, outcome: Outcome) -> RelayerResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM attestations WHERE market = $1 AND outcome = $2 AND is_valid",
        )
        .bind(market.to_string())
        .bind(outcome.0 as i16)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    async fn list_attestations(&self, market: Addr, outcome: Option<Outcome>) -> RelayerResult<Vec<Attestation>> {
        let rows: Vec<AttestationRow> = match outcome {
            Some(outcome) => {
                sqlx::query_as(
                    "SELECT * FROM attestations WHERE market = $1 AND outcome = $2 AND is_valid ORDER BY submitted_at ASC",
                )
                .bind(market.to_string())
                .bind(outcome.0 as i16)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT * FROM attestations WHERE market = $1 AND is_valid ORDER BY submitted_at ASC",
                )
                .bind(market.to_string())
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn attestations_for_finalization(
        &self,
        market: Addr,
        outcome: Outcome,
    ) -> RelayerResult<(Vec<AttestationSignature>, Vec<BigAmount>, Vec<Addr>)> {
        let rows = self.list_attestations(market, Some(outcome)).await?;
        let mut signatures = Vec::with_capacity(rows.len());
        let mut nonces = Vec::with_capacity(rows.len());
        let mut signers = Vec::with_capacity(rows.len());
        for row in rows {
            signatures.push(row.signature);
            nonces.push(row.nonce);
            signers.push(row.signer);
        }
        Ok((signatures, nonces, signers))
    }

    async fn delete_attestations(&self, market: Addr) -> RelayerResult<u64> {
        let result = sqlx::query("DELETE FROM attestations WHERE market = $1")
            .bind(market.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn enqueue_finalization(
        &self,
        market: Addr,
        signature_count: i32,
        eligible_count: i32,
        proposal_outcome: Outcome,
    ) -> RelayerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO finalization_queue (market, signature_count, eligible_count, proposal_outcome, last_checked_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (market) DO UPDATE SET
                signature_count = EXCLUDED.signature_count,
                eligible_count = EXCLUDED.eligible_count,
                proposal_outcome = EXCLUDED.proposal_outcome,
                last_checked_at = now()
            WHERE finalization_queue.completed_at IS NULL
            "#,
        )
        .bind(market.to_string())
        .bind(signature_count)
        .bind(eligible_count)
        .bind(proposal_outcome.0 as i16)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_queue_entry(&self, market: Addr) -> RelayerResult<Option<FinalizationQueueEntry>> {
        let row: Option<QueueRow> = sqlx::query_as("SELECT * FROM finalization_queue WHERE market = $1")
            .bind(market.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    async fn list_pending_queue_entries(&self) -> RelayerResult<Vec<FinalizationQueueEntry>> {
        let rows: Vec<QueueRow> =
            sqlx::query_as("SELECT * FROM finalization_queue WHERE completed_at IS NULL")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn list_queue_entries(&self, limit: i64) -> RelayerResult<Vec<FinalizationQueueEntry>> {
        let rows: Vec<QueueRow> = sqlx::query_as(
            "SELECT * FROM finalization_queue WHERE completed_at IS NULL ORDER BY last_checked_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn mark_finalization_attempted(&self, market: Addr, error_message: &str) -> RelayerResult<()> {
        sqlx::query(
            "UPDATE finalization_queue SET attempted_at = now(), last_checked_at = now(), last_error = $1 WHERE market = $2",
        )
        .bind(error_message)
        .bind(market.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_finalization_completed(&self, market: Addr) -> RelayerResult<()> {
        sqlx::query(
            "UPDATE finalization_queue SET completed_at = now(), last_checked_at = now(), threshold_met = true, last_error = NULL WHERE market = $1",
        )
        .bind(market.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn touch_finalization_check(&self, market: Addr) -> RelayerResult<()> {
        sqlx::query("UPDATE finalization_queue SET last_checked_at = now() WHERE market = $1")
            .bind(market.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn log_sync_operation(
        &self,
        operation: &str,
        market: Option<Addr>,
        status: SyncOpStatus,
        message: &str,
    ) -> RelayerResult<()> {
        let status_str = match status {
            SyncOpStatus::Ok => "ok",
            SyncOpStatus::Error => "error",
            SyncOpStatus::Warning => "warning",
        };
        sqlx::query("INSERT INTO sync_log (operation, market, status, message) VALUES ($1, $2, $3, $4)")
            .bind(operation)
            .bind(market.map(|a| a.to_string()))
            .bind(status_str)
            .bind(message)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn recent_sync_log(&self, limit: i64) -> RelayerResult<Vec<SyncLogEntry>> {
        let rows = sqlx::query(
            "SELECT id, operation, market, status, message, created_at FROM sync_log ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let market: Option<String> = row.try_get("market")?;
                let status: String = row.try_get("status")?;
                Ok(SyncLogEntry {
                    id: row.try_get("id")?,
                    operation: row.try_get("operation")?,
                    market: market.map(|m| addr(&m)).transpose()?,
                    status: match status.as_str() {
                        "ok" => SyncOpStatus::Ok,
                        "warning" => SyncOpStatus::Warning,
                        _ => SyncOpStatus::Error,
                    },
                    message: row.try_get("message")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, RelayerError>>()
    }

    async fn delete_old_sync_log(&self, before: DateTime<Utc>) -> RelayerResult<u64> {
        let result = sqlx::query("DELETE FROM sync_log WHERE created_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn market_counts_by_status(&self) -> RelayerResult<Vec<(MarketStatus, i64)>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM markets GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let status: String = row.try_get("status")?;
                let n: i64 = row.try_get("n")?;
                Ok((status_from_str(&status)?, n))
            })
            .collect()
    }

    async fn total_attestation_count(&self) -> RelayerResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM attestations WHERE is_valid")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    async fn total_participant_count(&self) -> RelayerResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM participants")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    async fn pending_finalization_count(&self) -> RelayerResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM finalization_queue WHERE completed_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    async fn ping(&self) -> RelayerResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
