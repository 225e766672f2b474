//! Purchase submission paths

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stemwire_types::{ListingId, TxHash};
use tokio::sync::RwLock;
use tracing::warn;

use crate::codec::{encode_buy_calldata, mock_tx_hash};
use crate::{ChainError, Result, LOCAL_CHAIN_IDS};

/// A fully specified `buy` call awaiting submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyCall {
    pub marketplace: String,
    pub listing_id: ListingId,
    pub amount: u64,
    pub total_price_wei: u128,
    pub chain_id: u64,
}

impl BuyCall {
    pub fn calldata(&self) -> Vec<u8> {
        encode_buy_calldata(self.listing_id.0, self.amount)
    }
}

/// Which path carried a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionPath {
    Mock,
    Bundler,
    Direct,
}

/// Submits `buy` calls to the network
#[async_trait]
pub trait PurchaseSubmitter: Send + Sync {
    async fn submit_buy(&self, call: &BuyCall) -> Result<(TxHash, SubmissionPath)>;
}

/// Mock submitter: never touches the network, synthesizes a hash
#[derive(Clone, Default)]
pub struct MockSubmitter {
    fail_with: Arc<RwLock<Option<String>>>,
    submitted: Arc<RwLock<Vec<BuyCall>>>,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.write().await = Some(message.into());
    }

    pub async fn submitted(&self) -> Vec<BuyCall> {
        self.submitted.read().await.clone()
    }
}

#[async_trait]
impl PurchaseSubmitter for MockSubmitter {
    async fn submit_buy(&self, call: &BuyCall) -> Result<(TxHash, SubmissionPath)> {
        if let Some(message) = self.fail_with.read().await.clone() {
            return Err(ChainError::Submission { message });
        }
        self.submitted.write().await.push(call.clone());
        Ok((TxHash(mock_tx_hash(call.listing_id.0)), SubmissionPath::Mock))
    }
}

/// A relay that executes delegated calls for a smart account
#[async_trait]
pub trait BundlerClient: Send + Sync {
    async fn relay(&self, call: &BuyCall, serialized_key: &str) -> Result<TxHash>;
}

/// A signer that sends a transaction directly from a funded key
#[async_trait]
pub trait DirectSigner: Send + Sync {
    async fn send(&self, call: &BuyCall) -> Result<TxHash>;
}

/// Delegated submission with a direct-send fallback.
///
/// The bundler path is authoritative on public networks. On local test
/// chains a bundler is frequently absent, so a bundler error there falls
/// back to a direct signed send instead of failing the purchase.
pub struct DelegatedSubmitter {
    bundler: Arc<dyn BundlerClient>,
    direct: Arc<dyn DirectSigner>,
    serialized_key: String,
}

impl DelegatedSubmitter {
    pub fn new(
        bundler: Arc<dyn BundlerClient>,
        direct: Arc<dyn DirectSigner>,
        serialized_key: impl Into<String>,
    ) -> Self {
        Self {
            bundler,
            direct,
            serialized_key: serialized_key.into(),
        }
    }
}

#[async_trait]
impl PurchaseSubmitter for DelegatedSubmitter {
    async fn submit_buy(&self, call: &BuyCall) -> Result<(TxHash, SubmissionPath)> {
        match self.bundler.relay(call, &self.serialized_key).await {
            Ok(hash) => Ok((hash, SubmissionPath::Bundler)),
            Err(err) if LOCAL_CHAIN_IDS.contains(&call.chain_id) => {
                warn!(
                    chain_id = call.chain_id,
                    error = %err,
                    "bundler relay failed on local chain, falling back to direct send"
                );
                let hash = self.direct.send(call).await?;
                Ok((hash, SubmissionPath::Direct))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingBundler;

    #[async_trait]
    impl BundlerClient for FailingBundler {
        async fn relay(&self, _call: &BuyCall, _key: &str) -> Result<TxHash> {
            Err(ChainError::Submission {
                message: "no bundler at endpoint".to_string(),
            })
        }
    }

    struct StubSigner;

    #[async_trait]
    impl DirectSigner for StubSigner {
        async fn send(&self, _call: &BuyCall) -> Result<TxHash> {
            Ok(TxHash("0xdirect".to_string()))
        }
    }

    fn call(chain_id: u64) -> BuyCall {
        BuyCall {
            marketplace: "0x1111111111111111111111111111111111111111".to_string(),
            listing_id: ListingId(1),
            amount: 1,
            total_price_wei: 1_000,
            chain_id,
        }
    }

    #[tokio::test]
    async fn test_bundler_failure_falls_back_on_local_chain() {
        let submitter =
            DelegatedSubmitter::new(Arc::new(FailingBundler), Arc::new(StubSigner), "sk");
        let (hash, path) = submitter.submit_buy(&call(31337)).await.unwrap();
        assert_eq!(hash.0, "0xdirect");
        assert_eq!(path, SubmissionPath::Direct);
    }

    #[tokio::test]
    async fn test_bundler_failure_propagates_on_public_chain() {
        let submitter =
            DelegatedSubmitter::new(Arc::new(FailingBundler), Arc::new(StubSigner), "sk");
        assert!(submitter.submit_buy(&call(8453)).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_submitter_records_calls() {
        let submitter = MockSubmitter::new();
        let (hash, path) = submitter.submit_buy(&call(31337)).await.unwrap();
        assert!(hash.0.starts_with("0x"));
        assert_eq!(path, SubmissionPath::Mock);
        assert_eq!(submitter.submitted().await.len(), 1);
    }
}
