//! EIP-712 typed-data domain and signature recovery for attestations.
//!
//! A `sol!` struct for the typed-data primary type, an `eip712_domain!`-built
//! domain, `eip712_signing_hash`, then `Signature::recover_address_from_prehash`.

use crate::types::{Addr, AttestationSignature, BigAmount, Outcome};
use alloy_primitives::{Signature, U256};
use alloy_sol_types::{eip712_domain, sol, SolStruct};

sol! {
    /// Primary EIP-712 type signed by participants: `Attestation(address market, uint256 outcome, uint256 nonce)`.
    struct AttestationTypedData {
        address market;
        uint256 outcome;
        uint256 nonce;
    }
}

/// Recovers the signer of `signature` over `(market, outcome, nonce)` under
/// the domain `{name:"Sidebet", version:"1", chainId, verifyingContract:market}`
/// and compares it case-insensitively to `claimed_signer`.
///
/// Returns `false` on any malformed signature or recovery failure, never an
/// error.
pub fn verify_attestation(
    chain_id: u64,
    signature: &AttestationSignature,
    claimed_signer: Addr,
    market: Addr,
    outcome: Outcome,
    nonce: BigAmount,
) -> bool {
    let Ok(raw): Result<[u8; 65], _> = signature.0.as_slice().try_into() else {
        return false;
    };
    let Ok(sig) = Signature::from_raw_array(&raw) else {
        return false;
    };
    let domain = eip712_domain! {
        name: "Sidebet",
        version: "1",
        chain_id: chain_id,
        verifying_contract: market.inner(),
    };
    let typed = AttestationTypedData {
        market: market.inner(),
        outcome: U256::from(outcome.0),
        nonce: nonce.0,
    };
    let hash = typed.eip712_signing_hash(&domain);
    match sig.recover_address_from_prehash(&hash) {
        Ok(recovered) => recovered == claimed_signer.inner(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256 as AU256;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use std::str::FromStr;

    #[test]
    fn recovers_matching_signer() {
        let signer = PrivateKeySigner::random();
        let market: Addr = "0x1111111111111111111111111111111111111111".parse().unwrap();
        let outcome = Outcome(1);
        let nonce = BigAmount(AU256::from(42u64));
        let chain_id = 84532u64;

        let domain = eip712_domain! {
            name: "Sidebet",
            version: "1",
            chain_id: chain_id,
            verifying_contract: market.inner(),
        };
        let typed = AttestationTypedData {
            market: market.inner(),
            outcome: AU256::from(outcome.0),
            nonce: nonce.0,
        };
        let hash = typed.eip712_signing_hash(&domain);
        let sig = signer.sign_hash_sync(&hash).unwrap();
        let sig_hex = AttestationSignature::from_str(&format!("0x{}", hex::encode(sig.as_bytes())))
            .unwrap();

        let signer_addr: Addr = signer.address().into();
        assert!(verify_attestation(chain_id, &sig_hex, signer_addr, market, outcome, nonce));

        let wrong: Addr = "0x2222222222222222222222222222222222222222".parse().unwrap();
        assert!(!verify_attestation(chain_id, &sig_hex, wrong, market, outcome, nonce));
    }
}
