/// Storage seams for the bidding tables.
/// `postgres` is the production implementation; `in_memory` backs the
/// command unit tests.
// region:    --- Imports
use crate::bidding::model::{Bid, Product, User};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

pub mod in_memory;
pub mod postgres;
pub mod queries;

// endregion: --- Imports

// region:    --- Store Error

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// endregion: --- Store Error

// region:    --- Bid Store

/// One row per bid attempt. No uniqueness and no floor constraint at this
/// layer; the 90% floor lives on the place-bid path only.
#[async_trait]
pub trait BidStore: Send + Sync {
    async fn insert_bid(
        &self,
        product_id: i64,
        user_id: i64,
        bid_amount: Decimal,
    ) -> Result<i64, StoreError>;

    /// Maximum bid amount for a product, `None` when no bids exist.
    async fn highest_bid(&self, product_id: i64) -> Result<Option<Decimal>, StoreError>;

    async fn bid(&self, bid_id: i64) -> Result<Option<Bid>, StoreError>;

    /// All bids for a product, highest amount first.
    async fn bids_for_product(&self, product_id: i64) -> Result<Vec<Bid>, StoreError>;

    /// All bids by a user, newest first.
    async fn bids_for_user(&self, user_id: i64) -> Result<Vec<Bid>, StoreError>;

    /// Deletes one row; returns the number of rows removed.
    async fn delete_bid(&self, bid_id: i64) -> Result<u64, StoreError>;

    /// Deletes every bid for a product; returns the number of rows removed.
    async fn delete_product_bids(&self, product_id: i64) -> Result<u64, StoreError>;
}

// endregion: --- Bid Store

// region:    --- Listing Store

/// Products, users, and the ad-hoc key/value listing state.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn product(&self, product_id: i64) -> Result<Option<Product>, StoreError>;

    async fn products_by_author(
        &self,
        author_id: i64,
        category: &str,
    ) -> Result<Vec<Product>, StoreError>;

    async fn user(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn meta(&self, product_id: i64, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_meta(&self, product_id: i64, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete_meta(&self, product_id: i64, key: &str) -> Result<(), StoreError>;
}

// endregion: --- Listing Store
