//! ABI calldata encoding and mock hash synthesis

use rand::Rng;
use sha3::{Digest, Keccak256};

/// First four bytes of keccak256 of the canonical signature
fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Selector for `buy(uint256,uint256)`
pub fn buy_selector() -> [u8; 4] {
    selector("buy(uint256,uint256)")
}

fn push_word(out: &mut Vec<u8>, value: u128) {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    out.extend_from_slice(&word);
}

/// Calldata for `buy(listingId, amount)`
pub fn encode_buy_calldata(listing_id: u64, amount: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 64);
    out.extend_from_slice(&buy_selector());
    push_word(&mut out, listing_id as u128);
    push_word(&mut out, amount as u128);
    out
}

/// Calldata for the `listings(uint256)` view
pub fn encode_listings_calldata(listing_id: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 32);
    out.extend_from_slice(&selector("listings(uint256)"));
    push_word(&mut out, listing_id as u128);
    out
}

/// Synthesize a well-formed transaction hash for mock purchases.
/// Derived from the listing id plus wall-clock and random entropy so
/// repeated mock purchases of one listing still get distinct hashes.
pub fn mock_tx_hash(listing_id: u64) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(listing_id.to_be_bytes());
    hasher.update(chrono::Utc::now().timestamp_millis().to_be_bytes());
    hasher.update(rand::thread_rng().gen::<[u8; 8]>());
    format!("0x{}", hex::encode(hasher.finalize()))
}
