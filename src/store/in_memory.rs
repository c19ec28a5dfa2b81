/// In-memory stores, used by the command unit tests in place of Postgres.
// region:    --- Imports
use super::{BidStore, ListingStore, StoreError};
use crate::bidding::model::{Bid, Product, User};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

// endregion: --- Imports

// region:    --- In-Memory Bid Store

#[derive(Default)]
pub struct InMemoryBidStore {
    bids: Mutex<Vec<Bid>>,
    next_id: AtomicI64,
}

impl InMemoryBidStore {
    pub fn new() -> Self {
        Self {
            bids: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn bid_count(&self) -> usize {
        self.bids.lock().unwrap().len()
    }
}

#[async_trait]
impl BidStore for InMemoryBidStore {
    async fn insert_bid(
        &self,
        product_id: i64,
        user_id: i64,
        bid_amount: Decimal,
    ) -> Result<i64, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.bids.lock().unwrap().push(Bid {
            id,
            product_id,
            user_id,
            bid_amount,
            bid_date: Utc::now(),
        });
        Ok(id)
    }

    async fn highest_bid(&self, product_id: i64) -> Result<Option<Decimal>, StoreError> {
        Ok(self
            .bids
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.product_id == product_id)
            .map(|b| b.bid_amount)
            .max())
    }

    async fn bid(&self, bid_id: i64) -> Result<Option<Bid>, StoreError> {
        Ok(self
            .bids
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == bid_id)
            .cloned())
    }

    async fn bids_for_product(&self, product_id: i64) -> Result<Vec<Bid>, StoreError> {
        let mut bids: Vec<Bid> = self
            .bids
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.product_id == product_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.bid_amount.cmp(&a.bid_amount));
        Ok(bids)
    }

    async fn bids_for_user(&self, user_id: i64) -> Result<Vec<Bid>, StoreError> {
        let mut bids: Vec<Bid> = self
            .bids
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.bid_date.cmp(&a.bid_date));
        Ok(bids)
    }

    async fn delete_bid(&self, bid_id: i64) -> Result<u64, StoreError> {
        let mut bids = self.bids.lock().unwrap();
        let before = bids.len();
        bids.retain(|b| b.id != bid_id);
        Ok((before - bids.len()) as u64)
    }

    async fn delete_product_bids(&self, product_id: i64) -> Result<u64, StoreError> {
        let mut bids = self.bids.lock().unwrap();
        let before = bids.len();
        bids.retain(|b| b.product_id != product_id);
        Ok((before - bids.len()) as u64)
    }
}

// endregion: --- In-Memory Bid Store

// region:    --- In-Memory Listing Store

#[derive(Default)]
pub struct InMemoryListingStore {
    products: Mutex<Vec<Product>>,
    users: Mutex<Vec<User>>,
    meta: Mutex<HashMap<(i64, String), String>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, product: Product) {
        self.products.lock().unwrap().push(product);
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn product(&self, product_id: i64) -> Result<Option<Product>, StoreError> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == product_id)
            .cloned())
    }

    async fn products_by_author(
        &self,
        author_id: i64,
        category: &str,
    ) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.author_id == author_id && p.category == category)
            .cloned()
            .collect())
    }

    async fn user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn meta(&self, product_id: i64, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .meta
            .lock()
            .unwrap()
            .get(&(product_id, key.to_string()))
            .cloned())
    }

    async fn set_meta(&self, product_id: i64, key: &str, value: &str) -> Result<(), StoreError> {
        self.meta
            .lock()
            .unwrap()
            .insert((product_id, key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete_meta(&self, product_id: i64, key: &str) -> Result<(), StoreError> {
        self.meta
            .lock()
            .unwrap()
            .remove(&(product_id, key.to_string()));
        Ok(())
    }
}

// endregion: --- In-Memory Listing Store
