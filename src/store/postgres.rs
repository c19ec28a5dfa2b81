// region:    --- Imports
use super::{queries, BidStore, ListingStore, StoreError};
use crate::bidding::model::{Bid, Product, User};
use crate::database::DatabaseManager;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;
use std::sync::Arc;

// endregion: --- Imports

// region:    --- Postgres Bid Store

pub struct PostgresBidStore {
    db: Arc<DatabaseManager>,
}

impl PostgresBidStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BidStore for PostgresBidStore {
    async fn insert_bid(
        &self,
        product_id: i64,
        user_id: i64,
        bid_amount: Decimal,
    ) -> Result<i64, StoreError> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let id = sqlx::query_scalar::<_, i64>(queries::INSERT_BID)
                        .bind(product_id)
                        .bind(user_id)
                        .bind(bid_amount)
                        .fetch_one(&mut **tx)
                        .await?;
                    Ok(id)
                })
            })
            .await
    }

    async fn highest_bid(&self, product_id: i64) -> Result<Option<Decimal>, StoreError> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let row = sqlx::query(queries::GET_HIGHEST_BID)
                        .bind(product_id)
                        .fetch_one(&mut **tx)
                        .await?;
                    Ok(row.try_get("highest_bid")?)
                })
            })
            .await
    }

    async fn bid(&self, bid_id: i64) -> Result<Option<Bid>, StoreError> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let bid = sqlx::query_as::<_, Bid>(queries::GET_BID)
                        .bind(bid_id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    Ok(bid)
                })
            })
            .await
    }

    async fn bids_for_product(&self, product_id: i64) -> Result<Vec<Bid>, StoreError> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let bids = sqlx::query_as::<_, Bid>(queries::GET_PRODUCT_BIDS)
                        .bind(product_id)
                        .fetch_all(&mut **tx)
                        .await?;
                    Ok(bids)
                })
            })
            .await
    }

    async fn bids_for_user(&self, user_id: i64) -> Result<Vec<Bid>, StoreError> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let bids = sqlx::query_as::<_, Bid>(queries::GET_USER_BIDS)
                        .bind(user_id)
                        .fetch_all(&mut **tx)
                        .await?;
                    Ok(bids)
                })
            })
            .await
    }

    async fn delete_bid(&self, bid_id: i64) -> Result<u64, StoreError> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let result = sqlx::query(queries::DELETE_BID)
                        .bind(bid_id)
                        .execute(&mut **tx)
                        .await?;
                    Ok(result.rows_affected())
                })
            })
            .await
    }

    async fn delete_product_bids(&self, product_id: i64) -> Result<u64, StoreError> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let result = sqlx::query(queries::DELETE_PRODUCT_BIDS)
                        .bind(product_id)
                        .execute(&mut **tx)
                        .await?;
                    Ok(result.rows_affected())
                })
            })
            .await
    }
}

// endregion: --- Postgres Bid Store

// region:    --- Postgres Listing Store

pub struct PostgresListingStore {
    db: Arc<DatabaseManager>,
}

impl PostgresListingStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ListingStore for PostgresListingStore {
    async fn product(&self, product_id: i64) -> Result<Option<Product>, StoreError> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let product = sqlx::query_as::<_, Product>(queries::GET_PRODUCT)
                        .bind(product_id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    Ok(product)
                })
            })
            .await
    }

    async fn products_by_author(
        &self,
        author_id: i64,
        category: &str,
    ) -> Result<Vec<Product>, StoreError> {
        let category = category.to_string();
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let products = sqlx::query_as::<_, Product>(queries::GET_PRODUCTS_BY_AUTHOR)
                        .bind(author_id)
                        .bind(category)
                        .fetch_all(&mut **tx)
                        .await?;
                    Ok(products)
                })
            })
            .await
    }

    async fn user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let user = sqlx::query_as::<_, User>(queries::GET_USER)
                        .bind(user_id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    Ok(user)
                })
            })
            .await
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let username = username.to_string();
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let user = sqlx::query_as::<_, User>(queries::GET_USER_BY_USERNAME)
                        .bind(username)
                        .fetch_optional(&mut **tx)
                        .await?;
                    Ok(user)
                })
            })
            .await
    }

    async fn meta(&self, product_id: i64, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let value = sqlx::query_scalar::<_, String>(queries::GET_META)
                        .bind(product_id)
                        .bind(key)
                        .fetch_optional(&mut **tx)
                        .await?;
                    Ok(value)
                })
            })
            .await
    }

    async fn set_meta(&self, product_id: i64, key: &str, value: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    sqlx::query(queries::UPSERT_META)
                        .bind(product_id)
                        .bind(key)
                        .bind(value)
                        .execute(&mut **tx)
                        .await?;
                    Ok(())
                })
            })
            .await
    }

    async fn delete_meta(&self, product_id: i64, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    sqlx::query(queries::DELETE_META)
                        .bind(product_id)
                        .bind(key)
                        .execute(&mut **tx)
                        .await?;
                    Ok(())
                })
            })
            .await
    }
}

// endregion: --- Postgres Listing Store
