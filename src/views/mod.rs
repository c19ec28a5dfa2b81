/// Read-only view renderers composing the bid store and the derived
/// listing state: product page, embeddable widget, admin bid table, and
/// the two-tab account view. Mutation triggers in each payload carry the
/// per-action nonce the client must send back.
// region:    --- Imports
use crate::auth::{self, NONCE_CLOSE_BIDDING, NONCE_DELETE_BID, NONCE_PLACE_BID, NONCE_RESTART_BID};
use crate::bidding::model::{User, CARS_CATEGORY, META_BID_CLOSED, META_WINNING_BID};
use crate::pricing::{self, format_price, PriceCache};
use crate::store::{BidStore, ListingStore, StoreError};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

// endregion: --- Imports

// region:    --- View Error

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

// endregion: --- View Error

// region:    --- Product Page View

/// Bid/ask comparison shown on the product page.
#[derive(Debug, Serialize)]
pub struct ProductBidView {
    pub product_id: i64,
    pub title: String,
    /// Formatted regular price, shown as the ask.
    pub ask_price: String,
    /// Formatted highest bid, absent when no bids exist.
    pub current_bid: Option<String>,
    /// Raw sale-or-regular price (after the bid override) for the dialog.
    pub sale_price: Decimal,
    pub minimum_bid: String,
    pub bid_closed: bool,
    pub logged_in: bool,
    pub place_bid_nonce: Option<String>,
}

pub async fn product_bid_view<B: BidStore + ?Sized, L: ListingStore + ?Sized>(
    product_id: i64,
    user: Option<&User>,
    bids: &B,
    listings: &L,
    prices: &PriceCache,
) -> Result<Option<ProductBidView>, ViewError> {
    let product = match listings.product(product_id).await? {
        Some(p) => p,
        None => return Ok(None),
    };

    let highest = prices.highest_bid(bids, product_id).await?;
    let sale = pricing::sale_price_with_override(&product, bids, prices)
        .await?
        .unwrap_or(product.regular_price);
    let closed = is_closed(listings, product_id).await?;

    let place_bid_nonce = match user {
        Some(u) => Some(auth::create_nonce(u.id, NONCE_PLACE_BID)?),
        None => None,
    };

    Ok(Some(ProductBidView {
        product_id,
        title: product.title,
        ask_price: format_price(product.regular_price),
        current_bid: highest.map(format_price),
        sale_price: sale,
        minimum_bid: format_price(pricing::minimum_bid(sale)),
        bid_closed: closed,
        logged_in: user.is_some(),
        place_bid_nonce,
    }))
}

// endregion: --- Product Page View

// region:    --- Widget View

/// Embeddable widget variant. `sold` requires BOTH the closed flag and a
/// recorded winning bid; a closed listing with an empty winning amount
/// still renders the bid panel.
#[derive(Debug, Serialize)]
pub struct WidgetView {
    pub product_id: i64,
    pub sold: bool,
    pub winning_bid: Option<String>,
    pub ask_price: String,
    pub sale_price: Decimal,
    pub current_bid: Option<String>,
    pub minimum_bid: String,
    pub logged_in: bool,
    pub place_bid_nonce: Option<String>,
}

pub async fn widget_view<B: BidStore + ?Sized, L: ListingStore + ?Sized>(
    product_id: i64,
    user: Option<&User>,
    bids: &B,
    listings: &L,
    prices: &PriceCache,
) -> Result<Option<WidgetView>, ViewError> {
    let product = match listings.product(product_id).await? {
        Some(p) => p,
        None => return Ok(None),
    };

    let highest = prices.highest_bid(bids, product_id).await?;
    let sale = pricing::sale_price_with_override(&product, bids, prices)
        .await?
        .unwrap_or(product.regular_price);
    let closed = is_closed(listings, product_id).await?;
    let winning = listings
        .meta(product_id, META_WINNING_BID)
        .await?
        .filter(|v| !v.is_empty());

    let place_bid_nonce = match user {
        Some(u) => Some(auth::create_nonce(u.id, NONCE_PLACE_BID)?),
        None => None,
    };

    Ok(Some(WidgetView {
        product_id,
        sold: closed && winning.is_some(),
        winning_bid: winning
            .and_then(|v| v.parse::<Decimal>().ok())
            .map(format_price),
        ask_price: format_price(sale),
        sale_price: sale,
        current_bid: highest.map(format_price),
        minimum_bid: format_price(pricing::minimum_bid(sale)),
        logged_in: user.is_some(),
        place_bid_nonce,
    }))
}

// endregion: --- Widget View

// region:    --- Admin Bids View

#[derive(Debug, Serialize)]
pub struct AdminBidRow {
    pub bid_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub mobile_number: Option<String>,
    pub bid_amount: String,
    pub bid_date: String,
}

/// Admin bid table with the applicable close or restart trigger.
#[derive(Debug, Serialize)]
pub struct AdminBidsView {
    pub product_id: i64,
    pub bids: Vec<AdminBidRow>,
    pub bid_closed: bool,
    pub winning_bid: Option<String>,
    pub close_nonce: Option<String>,
    pub restart_nonce: Option<String>,
}

pub async fn admin_bids_view<B: BidStore + ?Sized, L: ListingStore + ?Sized>(
    product_id: i64,
    admin: &User,
    bids: &B,
    listings: &L,
) -> Result<Option<AdminBidsView>, ViewError> {
    if listings.product(product_id).await?.is_none() {
        return Ok(None);
    }

    let mut rows = Vec::new();
    for bid in bids.bids_for_product(product_id).await? {
        let bidder = listings.user(bid.user_id).await?;
        let (user_name, user_email, mobile_number) = match bidder {
            Some(u) => (u.display_name, u.email, u.mobile_number),
            None => ("(unknown)".to_string(), String::new(), None),
        };
        rows.push(AdminBidRow {
            bid_id: bid.id,
            user_name,
            user_email,
            mobile_number,
            bid_amount: format_price(bid.bid_amount),
            bid_date: bid.bid_date.format("%Y-%m-%d %H:%M").to_string(),
        });
    }

    let closed = is_closed(listings, product_id).await?;
    let winning = listings
        .meta(product_id, META_WINNING_BID)
        .await?
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<Decimal>().ok())
        .map(format_price);

    // one trigger at a time, mirroring the meta box buttons
    let (close_nonce, restart_nonce) = if closed {
        (None, Some(auth::create_nonce(admin.id, NONCE_RESTART_BID)?))
    } else {
        (Some(auth::create_nonce(admin.id, NONCE_CLOSE_BIDDING)?), None)
    };

    Ok(Some(AdminBidsView {
        product_id,
        bids: rows,
        bid_closed: closed,
        winning_bid: winning,
        close_nonce,
        restart_nonce,
    }))
}

// endregion: --- Admin Bids View

// region:    --- Account View

#[derive(Debug, Serialize)]
pub struct MyBidRow {
    pub bid_id: i64,
    pub product_id: i64,
    pub product_title: String,
    pub bid_amount: String,
    pub bid_date: String,
    /// "Highest Bid" when this bid equals the product's maximum, else "Outbid".
    pub status: String,
    pub delete_nonce: String,
}

#[derive(Debug, Serialize)]
pub struct MyCarRow {
    pub product_id: i64,
    pub title: String,
    pub ask_price: String,
    pub current_bid: Option<String>,
    /// "Closed" or "Active".
    pub status: String,
    pub close_nonce: Option<String>,
    pub restart_nonce: Option<String>,
}

/// Two-tab account view: the caller's bids and the caller's cars for sale.
#[derive(Debug, Serialize)]
pub struct BidHistoryView {
    pub my_bids: Vec<MyBidRow>,
    pub my_cars: Vec<MyCarRow>,
}

pub async fn bid_history_view<B: BidStore + ?Sized, L: ListingStore + ?Sized>(
    user: &User,
    bids: &B,
    listings: &L,
) -> Result<BidHistoryView, ViewError> {
    let mut my_bids = Vec::new();
    for bid in bids.bids_for_user(user.id).await? {
        // bids on deleted listings are dropped
        let product = match listings.product(bid.product_id).await? {
            Some(p) => p,
            None => continue,
        };
        let highest = bids.highest_bid(bid.product_id).await?;
        let status = if highest == Some(bid.bid_amount) {
            "Highest Bid"
        } else {
            "Outbid"
        };
        my_bids.push(MyBidRow {
            bid_id: bid.id,
            product_id: bid.product_id,
            product_title: product.title,
            bid_amount: format_price(bid.bid_amount),
            bid_date: bid.bid_date.format("%Y-%m-%d").to_string(),
            status: status.to_string(),
            delete_nonce: auth::create_nonce(user.id, NONCE_DELETE_BID)?,
        });
    }

    let mut my_cars = Vec::new();
    for product in listings.products_by_author(user.id, CARS_CATEGORY).await? {
        let highest = bids.highest_bid(product.id).await?;
        let closed = is_closed(listings, product.id).await?;
        let (close_nonce, restart_nonce) = if closed {
            (None, Some(auth::create_nonce(user.id, NONCE_RESTART_BID)?))
        } else {
            (Some(auth::create_nonce(user.id, NONCE_CLOSE_BIDDING)?), None)
        };
        my_cars.push(MyCarRow {
            product_id: product.id,
            title: product.title.clone(),
            ask_price: format_price(product.regular_price),
            current_bid: highest.map(format_price),
            status: if closed { "Closed" } else { "Active" }.to_string(),
            close_nonce,
            restart_nonce,
        });
    }

    Ok(BidHistoryView { my_bids, my_cars })
}

// endregion: --- Account View

// region:    --- Helpers

/// Closed when the `_bid_closed` meta is present and non-empty.
async fn is_closed<L: ListingStore + ?Sized>(
    listings: &L,
    product_id: i64,
) -> Result<bool, StoreError> {
    Ok(listings
        .meta(product_id, META_BID_CLOSED)
        .await?
        .map(|v| !v.is_empty())
        .unwrap_or(false))
}

// endregion: --- Helpers

// region:    --- Tests


// endregion: --- Tests
