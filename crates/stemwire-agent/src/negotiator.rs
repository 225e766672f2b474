//! License negotiation

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use stemwire_catalog::CatalogStore;
use stemwire_chain::ChainReader;
use stemwire_tools::ToolRegistry;
use stemwire_types::{LicenseType, Listing, ListingStatus, NegotiationResult, TrackId};
use tracing::warn;

use crate::{AgentError, Result};

/// Quotes a price for a track, checks it against the remaining budget,
/// and validates the track's listings against live chain state.
pub struct LicenseNegotiator {
    tools: ToolRegistry,
    catalog: CatalogStore,
    chain: Arc<dyn ChainReader>,
}

impl LicenseNegotiator {
    pub fn new(tools: ToolRegistry, catalog: CatalogStore, chain: Arc<dyn ChainReader>) -> Self {
        Self {
            tools,
            catalog,
            chain,
        }
    }

    /// Negotiate one track.
    ///
    /// Over-budget is a structured rejection with no listings. When
    /// allowed, every active listing under the track's stems is checked
    /// on chain; a read that contradicts the stored record marks the
    /// listing stale, and a read failure excludes the listing without
    /// touching its stored status. Neither aborts the negotiation.
    pub async fn negotiate(
        &self,
        track_id: &TrackId,
        license_type: LicenseType,
        budget_remaining_usd: f64,
        stem_types: &[String],
    ) -> Result<NegotiationResult> {
        let output = self
            .tools
            .run(
                "pricing.quote",
                json!({ "licenseType": license_type, "volume": false }),
            )
            .await?;
        let price_usd = output["priceUsd"]
            .as_f64()
            .ok_or_else(|| AgentError::MalformedToolOutput {
                message: "pricing.quote priceUsd".to_string(),
            })?;

        if price_usd > budget_remaining_usd {
            return Ok(NegotiationResult::over_budget(license_type, price_usd));
        }

        let now = Utc::now().timestamp();
        let mut valid: Vec<Listing> = Vec::new();
        for listing in self.catalog.active_listings_for_track(track_id).await {
            match self.chain.listing(listing.listing_id.0).await {
                Ok(on_chain) if on_chain.is_purchasable(now) => valid.push(listing),
                Ok(_) => {
                    // Chain contradicts the stored record; demote best-effort
                    if let Err(err) = self
                        .catalog
                        .mark_listing(listing.listing_id, ListingStatus::Stale)
                        .await
                    {
                        warn!(
                            listing_id = listing.listing_id.0,
                            error = %err,
                            "failed to mark listing stale"
                        );
                    }
                }
                Err(err) => {
                    warn!(
                        listing_id = listing.listing_id.0,
                        error = %err,
                        "chain read failed, excluding listing"
                    );
                }
            }
        }

        if !stem_types.is_empty() {
            valid.retain(|l| stem_types.contains(&l.stem_type));
        }

        Ok(NegotiationResult {
            license_type,
            price_usd,
            allowed: true,
            reason: "within_budget".to_string(),
            listing: valid.first().cloned(),
            listings: valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stemwire_chain::{MockChain, OnChainListing, ZERO_ADDRESS};
    use stemwire_embeddings::EmbeddingStore;
    use stemwire_pricing::PricingPolicy;
    use stemwire_tools::MockGenerationClient;
    use stemwire_types::{ListingId, StemId, TokenId};

    async fn fixture() -> (LicenseNegotiator, CatalogStore, MockChain) {
        let catalog = CatalogStore::new();
        let chain = MockChain::new();
        let tools = ToolRegistry::with_builtins(
            catalog.clone(),
            EmbeddingStore::new(),
            PricingPolicy::default(),
            Arc::new(MockGenerationClient::new()),
        );
        let negotiator =
            LicenseNegotiator::new(tools, catalog.clone(), Arc::new(chain.clone()));
        (negotiator, catalog, chain)
    }

    async fn seed_listing(catalog: &CatalogStore, listing_id: u64, stem_type: &str) {
        let stem_id = format!("s{listing_id}");
        catalog
            .add_stem(Stem {
                id: StemId::from(stem_id.as_str()),
                track_id: TrackId::from("t1"),
                stem_type: stem_type.to_string(),
            })
            .await;
        catalog
            .add_listing(Listing {
                listing_id: ListingId(listing_id),
                token_id: TokenId(listing_id),
                stem_id: StemId::from(stem_id.as_str()),
                price_per_unit_wei: 1_000,
                chain_id: 31337,
                stem_type: stem_type.to_string(),
                status: ListingStatus::Active,
                expiry: Utc::now() + Duration::days(1),
            })
            .await;
    }

    use stemwire_catalog::Stem;

    #[tokio::test]
    async fn test_over_budget_returns_structured_rejection() {
        let (negotiator, _, _) = fixture().await;
        let result = negotiator
            .negotiate(&TrackId::from("t1"), LicenseType::Commercial, 0.05, &[])
            .await
            .unwrap();
        assert!(!result.allowed);
        assert_eq!(result.reason, "over_budget");
        assert!(result.listings.is_empty());
        assert_eq!(result.price_usd, 0.10);
    }

    #[tokio::test]
    async fn test_allowed_iff_price_within_budget() {
        let (negotiator, _, _) = fixture().await;
        let result = negotiator
            .negotiate(&TrackId::from("t1"), LicenseType::Personal, 1.00, &[])
            .await
            .unwrap();
        assert!(result.allowed);
        assert_eq!(result.price_usd, 0.02);
    }

    #[tokio::test]
    async fn test_contradicting_chain_state_marks_stale() {
        let (negotiator, catalog, chain) = fixture().await;
        seed_listing(&catalog, 1, "drums").await;
        let mut dead = MockChain::healthy_listing(1, 1_000);
        dead.seller = ZERO_ADDRESS.to_string();
        chain.put_listing(1, dead).await;

        let result = negotiator
            .negotiate(&TrackId::from("t1"), LicenseType::Personal, 1.00, &[])
            .await
            .unwrap();
        assert!(result.allowed);
        assert!(result.listings.is_empty());
        assert_eq!(
            catalog.listing(ListingId(1)).await.unwrap().status,
            ListingStatus::Stale
        );
    }

    #[tokio::test]
    async fn test_chain_read_failure_excludes_without_marking_stale() {
        let (negotiator, catalog, chain) = fixture().await;
        seed_listing(&catalog, 1, "drums").await;
        chain.set_failing(true).await;

        let result = negotiator
            .negotiate(&TrackId::from("t1"), LicenseType::Personal, 1.00, &[])
            .await
            .unwrap();
        assert!(result.listings.is_empty());
        assert_eq!(
            catalog.listing(ListingId(1)).await.unwrap().status,
            ListingStatus::Active
        );
    }

    #[tokio::test]
    async fn test_stem_type_filter() {
        let (negotiator, catalog, chain) = fixture().await;
        seed_listing(&catalog, 1, "drums").await;
        seed_listing(&catalog, 2, "vocals").await;
        chain.put_listing(1, MockChain::healthy_listing(1, 1_000)).await;
        chain.put_listing(2, MockChain::healthy_listing(2, 1_000)).await;

        let result = negotiator
            .negotiate(
                &TrackId::from("t1"),
                LicenseType::Personal,
                1.00,
                &["vocals".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.listings[0].stem_type, "vocals");
        assert_eq!(result.listing.as_ref().unwrap().listing_id, ListingId(2));
    }

    #[tokio::test]
    async fn test_expired_listing_is_excluded() {
        let (negotiator, catalog, chain) = fixture().await;
        seed_listing(&catalog, 1, "drums").await;
        let mut expired = MockChain::healthy_listing(1, 1_000);
        expired.expiry = Utc::now().timestamp() - 60;
        chain.put_listing(1, expired).await;

        let result = negotiator
            .negotiate(&TrackId::from("t1"), LicenseType::Personal, 1.00, &[])
            .await
            .unwrap();
        assert!(result.listings.is_empty());
    }
}
