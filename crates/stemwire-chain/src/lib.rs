//! Stemwire Chain - marketplace read/write contracts
//!
//! Reads the marketplace's `listings(uint256)` view and submits
//! `buy(uint256,uint256)` calls. Three submission paths exist: mock
//! (synthesized hash, no network), bundler-relayed delegated execution,
//! and a direct signed send used as a fallback on local test networks.

mod codec;
mod reader;
mod submit;

pub use codec::{buy_selector, encode_buy_calldata, encode_listings_calldata, mock_tx_hash};
pub use reader::{ChainReader, MockChain, OnChainListing, RpcChainReader};
pub use submit::{
    BundlerClient, BuyCall, DelegatedSubmitter, DirectSigner, MockSubmitter, PurchaseSubmitter,
    SubmissionPath,
};

use thiserror::Error;

/// The EVM zero address, the "no seller" sentinel in listing records
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Chain ids treated as local/test networks for the direct-send fallback
pub const LOCAL_CHAIN_IDS: [u64; 2] = [31337, 1337];

/// Errors that can occur talking to the chain
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Missing configuration: {name}")]
    MissingConfig { name: String },

    #[error("RPC request failed: {message}")]
    Rpc { message: String },

    #[error("Malformed RPC response: {message}")]
    Decode { message: String },

    #[error("Listing not found on chain: {listing_id}")]
    ListingNotFound { listing_id: u64 },

    #[error("Transaction submission failed: {message}")]
    Submission { message: String },
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::Rpc {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
