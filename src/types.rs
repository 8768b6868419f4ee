//! Core domain types for the Sidebet relayer.
//!
//! Addresses are always normalized to lower-case on construction so that
//! `0xAB…CD` and `0xab…cd` compare equal everywhere in the Store. Big
//! chain-native integers (stakes, nonces) are carried as
//! [`alloy_primitives::U256`] and serialized as decimal strings at the API
//! boundary, never as JSON numbers.

use alloy_primitives::{Address as AlloyAddress, U256};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 20-byte EVM address, always stored and displayed lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(AlloyAddress);

static ADDR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("valid address regex"));

#[derive(Debug, thiserror::Error)]
#[error("invalid address: must be 0x-prefixed 40 hex characters")]
pub struct AddrParseError;

impl Addr {
    pub fn inner(&self) -> AlloyAddress {
        self.0
    }
}

impl FromStr for Addr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !ADDR_REGEX.is_match(s) {
            return Err(AddrParseError);
        }
        let inner = s.parse::<AlloyAddress>().map_err(|_| AddrParseError)?;
        Ok(Addr(inner))
    }
}

impl From<AlloyAddress> for Addr {
    fn from(value: AlloyAddress) -> Self {
        Addr(value)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl Serialize for Addr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Addr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Addr::from_str(&s).map_err(DeError::custom)
    }
}

/// A 65-byte ECDSA attestation signature, 0x-prefixed, 130 hex characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationSignature(pub Vec<u8>);

static SIG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{130}$").expect("valid signature regex"));

#[derive(Debug, thiserror::Error)]
#[error("invalid signature: must be 0x-prefixed 130 hex characters")]
pub struct SigParseError;

impl FromStr for AttestationSignature {
    type Err = SigParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !SIG_REGEX.is_match(s) {
            return Err(SigParseError);
        }
        let bytes = hex::decode(&s[2..]).map_err(|_| SigParseError)?;
        Ok(AttestationSignature(bytes))
    }
}

impl fmt::Display for AttestationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl Serialize for AttestationSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AttestationSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AttestationSignature::from_str(&s).map_err(DeError::custom)
    }
}

/// A binary market outcome: 0 ("no") or 1 ("yes").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Outcome(pub u8);

#[derive(Debug, thiserror::Error)]
#[error("outcome must be \"0\" or \"1\"")]
pub struct OutcomeParseError;

impl FromStr for Outcome {
    type Err = OutcomeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Outcome(0)),
            "1" => Ok(Outcome(1)),
            _ => Err(OutcomeParseError),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Outcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Outcome::from_str(&s).map_err(DeError::custom)
    }
}

/// A `U256` serialized as a decimal string at the API and DB boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BigAmount(pub U256);

impl fmt::Display for BigAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BigAmount {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_str(s).map(BigAmount).map_err(|_| ())
    }
}

impl Serialize for BigAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BigAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BigAmount::from_str(&s).map_err(|_| DeError::custom("invalid decimal integer"))
    }
}

/// Market lifecycle status. Monotonic under its partial order (`can_transition_to`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Proposed,
    Resolved,
    Disputed,
    Cancelled,
}

impl MarketStatus {
    /// Numeric encoding used by the `status=0..4` query filter.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MarketStatus::Open),
            1 => Some(MarketStatus::Proposed),
            2 => Some(MarketStatus::Resolved),
            3 => Some(MarketStatus::Disputed),
            4 => Some(MarketStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_code(&self) -> u8 {
        match self {
            MarketStatus::Open => 0,
            MarketStatus::Proposed => 1,
            MarketStatus::Resolved => 2,
            MarketStatus::Disputed => 3,
            MarketStatus::Cancelled => 4,
        }
    }

    /// True if `to` is a legal transition from `self`.
    pub fn can_transition_to(&self, to: MarketStatus) -> bool {
        use MarketStatus::*;
        matches!(
            (self, to),
            (Open, Proposed)
                | (Open, Cancelled)
                | (Proposed, Resolved)
                | (Proposed, Disputed)
                | (Proposed, Cancelled)
                | (Disputed, Resolved)
                | (Disputed, Cancelled)
        ) || self == &to
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketStatus::Open => "open",
            MarketStatus::Proposed => "proposed",
            MarketStatus::Resolved => "resolved",
            MarketStatus::Disputed => "disputed",
            MarketStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub address: Addr,
    pub topic: String,
    pub threshold: i32,
    pub staking_token: Addr,
    pub participant_count: i32,
    pub total_staked: BigAmount,
    pub status: MarketStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub proposed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_sync_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub market: Addr,
    pub user: Addr,
    pub stake: BigAmount,
    pub outcome: Outcome,
    pub has_attested: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: i64,
    pub market: Addr,
    pub proposer: Addr,
    pub outcome: Outcome,
    pub dispute_until: chrono::DateTime<chrono::Utc>,
    pub evidence_hash: String,
    pub attestation_count: i32,
    pub is_disputed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub id: i64,
    pub market: Addr,
    pub proposal_id: i64,
    pub signer: Addr,
    pub outcome: Outcome,
    pub nonce: BigAmount,
    pub signature: AttestationSignature,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizationQueueEntry {
    pub market: Addr,
    pub signature_count: i32,
    pub eligible_count: i32,
    pub proposal_outcome: Outcome,
    pub last_checked_at: chrono::DateTime<chrono::Utc>,
    pub attempted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub threshold_met: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOpStatus {
    Ok,
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEntry {
    pub id: i64,
    pub operation: String,
    pub market: Option<Addr>,
    pub status: SyncOpStatus,
    pub message: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Required signatures for an outcome to finalize.
///
/// `ceil(eligible * threshold / 100)`, floored at `min_global_threshold`
/// (and at least 1 when there are zero eligible participants).
pub fn required_signatures(eligible: i64, threshold_percent: i32, min_global_threshold: i64) -> i64 {
    if eligible == 0 {
        return min_global_threshold.max(1);
    }
    let numerator = eligible * threshold_percent as i64;
    let d = numerator / 100;
    let r = numerator % 100;
    let required = if r > 0 { d + 1 } else { d };
    required.max(min_global_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_case_insensitive_roundtrip() {
        let a: Addr = "0xABCDEF1234567890ABCDEF1234567890ABCDEF12".parse().unwrap();
        let b: Addr = "0xabcdef1234567890abcdef1234567890abcdef12".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0xabcdef1234567890abcdef1234567890abcdef12");
    }

    #[test]
    fn address_rejects_wrong_length() {
        assert!("0xabcd".parse::<Addr>().is_err());
    }

    #[test]
    fn signature_requires_130_hex_chars() {
        let good = format!("0x{}", "ab".repeat(65));
        assert!(good.parse::<AttestationSignature>().is_ok());
        let bad = format!("0x{}", "ab".repeat(64));
        assert!(bad.parse::<AttestationSignature>().is_err());
    }

    #[test]
    fn required_signatures_rounds_up() {
        assert_eq!(required_signatures(5, 60, 3), 3);
        assert_eq!(required_signatures(0, 60, 3), 3);
        assert_eq!(required_signatures(5, 61, 0), 4);
    }

    #[test]
    fn market_status_transitions() {
        assert!(MarketStatus::Open.can_transition_to(MarketStatus::Proposed));
        assert!(MarketStatus::Proposed.can_transition_to(MarketStatus::Disputed));
        assert!(!MarketStatus::Resolved.can_transition_to(MarketStatus::Open));
        assert!(!MarketStatus::Cancelled.can_transition_to(MarketStatus::Resolved));
    }
}
