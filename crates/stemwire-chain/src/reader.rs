//! Marketplace listing reads

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

use crate::codec::encode_listings_calldata;
use crate::{ChainError, Result, ZERO_ADDRESS};

/// The marketplace contract's listing record as read from chain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainListing {
    pub seller: String,
    pub token_id: u64,
    pub amount: u64,
    pub price_per_unit_wei: u128,
    pub payment_token: String,
    /// Unix seconds
    pub expiry: i64,
}

impl OnChainListing {
    /// A listing is purchasable when a seller exists, supply remains,
    /// and the expiry has not elapsed.
    pub fn is_purchasable(&self, now_unix: i64) -> bool {
        !self.seller.eq_ignore_ascii_case(ZERO_ADDRESS)
            && self.amount > 0
            && self.expiry >= now_unix
    }
}

/// Read access to the marketplace's `listings(listingId)` view
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn listing(&self, listing_id: u64) -> Result<OnChainListing>;
}

/// In-memory chain double for tests and mock deployments
#[derive(Clone, Default)]
pub struct MockChain {
    listings: Arc<RwLock<HashMap<u64, OnChainListing>>>,
    failing: Arc<RwLock<bool>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_listing(&self, listing_id: u64, listing: OnChainListing) {
        self.listings.write().await.insert(listing_id, listing);
    }

    /// Make every subsequent read fail, for exercising RPC error paths
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    /// A purchasable listing with sensible defaults
    pub fn healthy_listing(token_id: u64, price_per_unit_wei: u128) -> OnChainListing {
        OnChainListing {
            seller: "0x7c3a9d41b2e85f06cd14a90f8e2b6173d25c98aa".to_string(),
            token_id,
            amount: 10,
            price_per_unit_wei,
            payment_token: ZERO_ADDRESS.to_string(),
            expiry: Utc::now().timestamp() + 86_400,
        }
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn listing(&self, listing_id: u64) -> Result<OnChainListing> {
        if *self.failing.read().await {
            return Err(ChainError::Rpc {
                message: "mock chain set to failing".to_string(),
            });
        }
        self.listings
            .read()
            .await
            .get(&listing_id)
            .cloned()
            .ok_or(ChainError::ListingNotFound { listing_id })
    }
}

/// JSON-RPC backed reader hitting a real node via `eth_call`
pub struct RpcChainReader {
    client: reqwest::Client,
    rpc_url: String,
    marketplace_address: String,
}

impl RpcChainReader {
    pub fn new(rpc_url: impl Into<String>, marketplace_address: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            marketplace_address: marketplace_address.into(),
        }
    }

    /// Build from `STEMWIRE_RPC_URL` and `STEMWIRE_MARKETPLACE_ADDRESS`
    pub fn from_env() -> Result<Self> {
        let rpc_url = std::env::var("STEMWIRE_RPC_URL").map_err(|_| ChainError::MissingConfig {
            name: "STEMWIRE_RPC_URL".to_string(),
        })?;
        let marketplace_address =
            std::env::var("STEMWIRE_MARKETPLACE_ADDRESS").map_err(|_| {
                ChainError::MissingConfig {
                    name: "STEMWIRE_MARKETPLACE_ADDRESS".to_string(),
                }
            })?;
        Ok(Self::new(rpc_url, marketplace_address))
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn listing(&self, listing_id: u64) -> Result<OnChainListing> {
        let calldata = encode_listings_calldata(listing_id);
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {
                    "to": self.marketplace_address,
                    "data": format!("0x{}", hex::encode(calldata)),
                },
                "latest"
            ]
        });

        let response: serde_json::Value = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.get("error") {
            return Err(ChainError::Rpc {
                message: error.to_string(),
            });
        }
        let result = response
            .get("result")
            .and_then(|r| r.as_str())
            .ok_or_else(|| ChainError::Decode {
                message: "missing result field".to_string(),
            })?;

        decode_listing_words(result)
    }
}

/// Decode the six 32-byte return words of `listings(uint256)`:
/// seller, tokenId, amount, pricePerUnit, paymentToken, expiry.
fn decode_listing_words(result: &str) -> Result<OnChainListing> {
    let raw = hex::decode(result.trim_start_matches("0x")).map_err(|e| ChainError::Decode {
        message: e.to_string(),
    })?;
    if raw.len() < 6 * 32 {
        return Err(ChainError::Decode {
            message: format!("expected 6 return words, got {} bytes", raw.len()),
        });
    }

    let word = |i: usize| &raw[i * 32..(i + 1) * 32];
    let as_u128 = |w: &[u8]| {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&w[16..32]);
        u128::from_be_bytes(buf)
    };
    let as_address = |w: &[u8]| format!("0x{}", hex::encode(&w[12..32]));

    Ok(OnChainListing {
        seller: as_address(word(0)),
        token_id: as_u128(word(1)) as u64,
        amount: as_u128(word(2)) as u64,
        price_per_unit_wei: as_u128(word(3)),
        payment_token: as_address(word(4)),
        expiry: as_u128(word(5)) as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchasable_rules() {
        let now = Utc::now().timestamp();
        let healthy = MockChain::healthy_listing(1, 1_000);
        assert!(healthy.is_purchasable(now));

        let mut zero_seller = healthy.clone();
        zero_seller.seller = ZERO_ADDRESS.to_string();
        assert!(!zero_seller.is_purchasable(now));

        let mut sold_out = healthy.clone();
        sold_out.amount = 0;
        assert!(!sold_out.is_purchasable(now));

        let mut expired = healthy;
        expired.expiry = now - 1;
        assert!(!expired.is_purchasable(now));
    }

    #[test]
    fn test_decode_listing_words() {
        let mut raw = vec![0u8; 6 * 32];
        raw[12..32].copy_from_slice(&[0xab; 20]); // seller
        raw[63] = 9; // tokenId
        raw[95] = 5; // amount
        raw[127] = 200; // pricePerUnit
        raw[191] = 100; // expiry low byte
        let listing = decode_listing_words(&format!("0x{}", hex::encode(raw))).unwrap();
        assert_eq!(listing.seller, format!("0x{}", "ab".repeat(20)));
        assert_eq!(listing.token_id, 9);
        assert_eq!(listing.amount, 5);
        assert_eq!(listing.price_per_unit_wei, 200);
        assert_eq!(listing.expiry, 100);
    }

    #[tokio::test]
    async fn test_mock_chain_round_trip() {
        let chain = MockChain::new();
        chain
            .put_listing(1, MockChain::healthy_listing(7, 500))
            .await;
        assert_eq!(chain.listing(1).await.unwrap().token_id, 7);
        assert!(matches!(
            chain.listing(2).await.unwrap_err(),
            ChainError::ListingNotFound { listing_id: 2 }
        ));
    }
}
