use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Meta keys carrying the derived listing bid state. Both `_bid_closed`
/// and `_winning_bid` are absent until bidding is closed and are removed
/// together on restart; `_price` and `_sale_price` are denormalized
/// display prices cleared on restart.
pub const META_BID_CLOSED: &str = "_bid_closed";
pub const META_WINNING_BID: &str = "_winning_bid";
pub const META_PRICE: &str = "_price";
pub const META_SALE_PRICE: &str = "_sale_price";

/// Category slug marking a listing as biddable.
pub const CARS_CATEGORY: &str = "cars";

// Car listing
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub regular_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub category: String,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_cars_listing(&self) -> bool {
        self.category == CARS_CATEGORY
    }
}

// Bid row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub product_id: i64,
    pub user_id: i64,
    pub bid_amount: Decimal,
    pub bid_date: DateTime<Utc>,
}

// Bidder account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub mobile_number: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}
