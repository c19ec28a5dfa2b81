/// Bid lifecycle commands:
/// 1. place bid
/// 2. close bidding
/// 3. restart bidding
/// 4. delete bid
/// 5. clear bids
/// 6. login
// region:    --- Imports
use crate::auth;
use crate::bidding::model::{
    User, META_BID_CLOSED, META_PRICE, META_SALE_PRICE, META_WINNING_BID,
};
use crate::pricing::{self, format_price, PriceCache};
use crate::store::{BidStore, ListingStore, StoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// Place-bid request. Both ids are optional so a missing parameter can be
/// reported as such rather than as an unknown product.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub product_id: Option<i64>,
    pub bid_amount: Option<Decimal>,
    #[serde(default)]
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CloseBiddingCommand {
    #[serde(default)]
    pub product_id: i64,
    #[serde(default)]
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RestartBiddingCommand {
    #[serde(default)]
    pub product_id: i64,
    #[serde(default)]
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeleteBidCommand {
    #[serde(default)]
    pub bid_id: i64,
    #[serde(default)]
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClearBidsCommand {
    #[serde(default)]
    pub product_id: i64,
    #[serde(default)]
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginCommand {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub security: String,
}

fn store_err(e: StoreError) -> serde_json::Value {
    json!({"message": e.to_string()})
}

/// 1. Place a bid. The floor is 90% of the current ask price (sale price
/// after the bid override, else regular price). Closing does not block
/// this path; bids on closed listings are accepted.
pub async fn handle_place_bid<B: BidStore + ?Sized, L: ListingStore + ?Sized>(
    cmd: &PlaceBidCommand,
    user: &User,
    bids: &B,
    listings: &L,
    prices: &PriceCache,
) -> Result<serde_json::Value, serde_json::Value> {
    info!("{:<12} --> place bid: {:?} by user {}", "Command", cmd, user.id);

    let (product_id, bid_amount) = match (cmd.product_id, cmd.bid_amount) {
        (Some(p), Some(a)) => (p, a),
        _ => return Err(json!({"message": "Invalid request: Missing required parameters"})),
    };

    let product = listings
        .product(product_id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| json!({"message": "Invalid product"}))?;

    let ask = pricing::ask_price(&product, bids, prices)
        .await
        .map_err(store_err)?;
    if bid_amount < pricing::minimum_bid(ask) {
        return Err(json!({"message": "Bid amount is below the minimum allowed"}));
    }

    bids.insert_bid(product_id, user.id, bid_amount)
        .await
        .map_err(|_| json!({"message": "Failed to place bid"}))?;

    prices.invalidate(product_id).await;

    Ok(json!({
        "message": "Bid placed successfully",
        "new_price": format_price(bid_amount)
    }))
}

/// 2. Close bidding (admin only). Freezes the current maximum as the
/// winning bid; closing with zero bids records an empty winning amount.
pub async fn handle_close_bidding<B: BidStore + ?Sized, L: ListingStore + ?Sized>(
    cmd: &CloseBiddingCommand,
    user: &User,
    bids: &B,
    listings: &L,
    prices: &PriceCache,
) -> Result<serde_json::Value, serde_json::Value> {
    info!("{:<12} --> close bidding: {:?}", "Command", cmd);

    if !auth::is_admin(user) {
        return Err(json!({"message": "You do not have permission to perform this action"}));
    }

    let highest = bids.highest_bid(cmd.product_id).await.map_err(store_err)?;

    listings
        .set_meta(cmd.product_id, META_BID_CLOSED, "1")
        .await
        .map_err(store_err)?;
    let winning = highest.map(|d| d.to_string()).unwrap_or_default();
    listings
        .set_meta(cmd.product_id, META_WINNING_BID, &winning)
        .await
        .map_err(store_err)?;

    prices.invalidate(cmd.product_id).await;

    Ok(json!({
        "message": "Bidding closed successfully",
        "winning_bid": format_price(highest.unwrap_or(Decimal::ZERO))
    }))
}

/// 3. Restart bidding (admin or listing author). Clears the derived
/// listing state, deletes every bid row for the product, then refreshes
/// the denormalized price meta. Irreversible.
pub async fn handle_restart_bidding<B: BidStore + ?Sized, L: ListingStore + ?Sized>(
    cmd: &RestartBiddingCommand,
    user: &User,
    bids: &B,
    listings: &L,
    prices: &PriceCache,
) -> Result<serde_json::Value, serde_json::Value> {
    info!("{:<12} --> restart bidding: {:?}", "Command", cmd);

    let product = listings
        .product(cmd.product_id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| json!({"message": "Invalid product"}))?;

    if !auth::is_admin(user) && !auth::is_product_author(user, &product) {
        return Err(json!({"message": "Permission denied"}));
    }

    for key in [META_BID_CLOSED, META_WINNING_BID, META_PRICE, META_SALE_PRICE] {
        listings
            .delete_meta(cmd.product_id, key)
            .await
            .map_err(store_err)?;
    }

    prices.invalidate(cmd.product_id).await;

    bids.delete_product_bids(cmd.product_id)
        .await
        .map_err(store_err)?;

    pricing::refresh_price_meta(&product, bids, listings)
        .await
        .map_err(store_err)?;

    Ok(json!({"message": "Bidding restarted successfully"}))
}

/// 4. Delete a single bid (the bid's own bidder or an admin). No
/// re-validation of listing state.
pub async fn handle_delete_bid<B: BidStore + ?Sized>(
    cmd: &DeleteBidCommand,
    user: &User,
    bids: &B,
) -> Result<serde_json::Value, serde_json::Value> {
    info!("{:<12} --> delete bid: {:?} by user {}", "Command", cmd, user.id);

    let bid = bids.bid(cmd.bid_id).await.map_err(store_err)?;
    let bid = match bid {
        Some(b) if b.user_id == user.id || auth::is_admin(user) => b,
        _ => return Err(json!({"message": "Permission denied"})),
    };

    bids.delete_bid(bid.id)
        .await
        .map_err(|_| json!({"message": "Failed to delete bid"}))?;

    Ok(json!({"message": "Bid deleted successfully"}))
}

/// 5. Clear every bid for a product (admin only), open or closed.
pub async fn handle_clear_bids<B: BidStore + ?Sized>(
    cmd: &ClearBidsCommand,
    user: &User,
    bids: &B,
) -> Result<serde_json::Value, serde_json::Value> {
    info!("{:<12} --> clear bids: {:?}", "Command", cmd);

    if !auth::is_admin(user) {
        return Err(json!({"message": "Permission denied"}));
    }

    bids.delete_product_bids(cmd.product_id)
        .await
        .map_err(store_err)?;

    Ok(json!({}))
}

/// 6. Login. Failure is a single generic message regardless of cause.
pub async fn handle_login<L: ListingStore + ?Sized>(
    cmd: &LoginCommand,
    listings: &L,
) -> Result<serde_json::Value, serde_json::Value> {
    info!("{:<12} --> login attempt: {}", "Command", cmd.username);

    let user = listings
        .user_by_username(&cmd.username)
        .await
        .map_err(store_err)?;

    match user {
        Some(u) if auth::verify_password(&cmd.password, &u.password_hash) => {
            let token = auth::create_session_token(u.id)
                .map_err(|e| json!({"message": e.to_string()}))?;
            Ok(json!({"message": "Login successful", "token": token}))
        }
        _ => Err(json!({"message": "Invalid login credentials"})),
    }
}

// endregion: --- Commands

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::model::{Product, CARS_CATEGORY};
    use crate::store::in_memory::{InMemoryBidStore, InMemoryListingStore};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn user(id: i64, is_admin: bool) -> User {
        User {
            id,
            username: format!("user{}", id),
            display_name: format!("User {}", id),
            email: format!("user{}@example.com", id),
            mobile_number: None,
            password_hash: String::new(),
            is_admin,
            created_at: Utc::now(),
        }
    }

    fn car(id: i64, author_id: i64, regular: Decimal) -> Product {
        Product {
            id,
            title: format!("Car {}", id),
            regular_price: regular,
            sale_price: None,
            category: CARS_CATEGORY.to_string(),
            author_id,
            created_at: Utc::now(),
        }
    }

    fn place(product_id: i64, amount: Decimal) -> PlaceBidCommand {
        PlaceBidCommand {
            product_id: Some(product_id),
            bid_amount: Some(amount),
            nonce: String::new(),
        }
    }

    fn setup() -> (InMemoryBidStore, InMemoryListingStore, PriceCache) {
        let listings = InMemoryListingStore::new();
        listings.add_product(car(1, 10, dec!(10000)));
        (InMemoryBidStore::new(), listings, PriceCache::new())
    }

    #[tokio::test]
    async fn bid_at_ninety_percent_of_ask_is_accepted() {
        let (bids, listings, prices) = setup();
        let bidder = user(2, false);

        let result =
            handle_place_bid(&place(1, dec!(9500)), &bidder, &bids, &listings, &prices).await;
        let data = result.unwrap();
        assert_eq!(data["new_price"], "$9,500.00");
        assert_eq!(bids.bid_count(), 1);
    }

    #[tokio::test]
    async fn bid_below_floor_is_rejected() {
        let (bids, listings, prices) = setup();
        let bidder = user(2, false);

        let err = handle_place_bid(&place(1, dec!(8000)), &bidder, &bids, &listings, &prices)
            .await
            .unwrap_err();
        assert_eq!(err["message"], "Bid amount is below the minimum allowed");
        assert_eq!(bids.bid_count(), 0);
    }

    #[tokio::test]
    async fn missing_parameters_are_reported() {
        let (bids, listings, prices) = setup();
        let cmd = PlaceBidCommand {
            product_id: Some(1),
            bid_amount: None,
            nonce: String::new(),
        };
        let err = handle_place_bid(&cmd, &user(2, false), &bids, &listings, &prices)
            .await
            .unwrap_err();
        assert_eq!(err["message"], "Invalid request: Missing required parameters");
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let (bids, listings, prices) = setup();
        let err = handle_place_bid(&place(99, dec!(9500)), &user(2, false), &bids, &listings, &prices)
            .await
            .unwrap_err();
        assert_eq!(err["message"], "Invalid product");
    }

    #[tokio::test]
    async fn floor_follows_the_overridden_ask_price() {
        let (bids, listings, prices) = setup();
        let bidder = user(2, false);

        handle_place_bid(&place(1, dec!(9500)), &bidder, &bids, &listings, &prices)
            .await
            .unwrap();

        // ask is now the highest bid (9500), so the floor is 8550
        handle_place_bid(&place(1, dec!(9000)), &bidder, &bids, &listings, &prices)
            .await
            .unwrap();
        let err = handle_place_bid(&place(1, dec!(8500)), &bidder, &bids, &listings, &prices)
            .await
            .unwrap_err();
        assert_eq!(err["message"], "Bid amount is below the minimum allowed");
        assert_eq!(bids.bid_count(), 2);
    }

    #[tokio::test]
    async fn close_records_the_maximum_bid() {
        let (bids, listings, prices) = setup();
        bids.insert_bid(1, 2, dec!(9200)).await.unwrap();
        bids.insert_bid(1, 3, dec!(9800)).await.unwrap();

        let cmd = CloseBiddingCommand {
            product_id: 1,
            nonce: String::new(),
        };
        let data = handle_close_bidding(&cmd, &user(1, true), &bids, &listings, &prices)
            .await
            .unwrap();

        assert_eq!(data["winning_bid"], "$9,800.00");
        assert_eq!(
            listings.meta(1, META_BID_CLOSED).await.unwrap().as_deref(),
            Some("1")
        );
        assert_eq!(
            listings.meta(1, META_WINNING_BID).await.unwrap().as_deref(),
            Some("9800")
        );
    }

    #[tokio::test]
    async fn close_with_zero_bids_records_empty_winning_amount() {
        let (bids, listings, prices) = setup();
        let cmd = CloseBiddingCommand {
            product_id: 1,
            nonce: String::new(),
        };
        let data = handle_close_bidding(&cmd, &user(1, true), &bids, &listings, &prices)
            .await
            .unwrap();

        assert_eq!(data["winning_bid"], "$0.00");
        assert_eq!(
            listings.meta(1, META_BID_CLOSED).await.unwrap().as_deref(),
            Some("1")
        );
        assert_eq!(
            listings.meta(1, META_WINNING_BID).await.unwrap().as_deref(),
            Some("")
        );
    }

    #[tokio::test]
    async fn close_requires_admin() {
        let (bids, listings, prices) = setup();
        let cmd = CloseBiddingCommand {
            product_id: 1,
            nonce: String::new(),
        };
        let err = handle_close_bidding(&cmd, &user(2, false), &bids, &listings, &prices)
            .await
            .unwrap_err();
        assert_eq!(
            err["message"],
            "You do not have permission to perform this action"
        );
        assert!(listings.meta(1, META_BID_CLOSED).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closing_does_not_block_new_bids() {
        let (bids, listings, prices) = setup();
        let cmd = CloseBiddingCommand {
            product_id: 1,
            nonce: String::new(),
        };
        handle_close_bidding(&cmd, &user(1, true), &bids, &listings, &prices)
            .await
            .unwrap();

        // the place-bid path does not consult the closed flag
        handle_place_bid(&place(1, dec!(9500)), &user(2, false), &bids, &listings, &prices)
            .await
            .unwrap();
        assert_eq!(bids.bid_count(), 1);
    }

    #[tokio::test]
    async fn restart_clears_bids_and_derived_state() {
        let (bids, listings, prices) = setup();
        bids.insert_bid(1, 2, dec!(9500)).await.unwrap();
        let close = CloseBiddingCommand {
            product_id: 1,
            nonce: String::new(),
        };
        handle_close_bidding(&close, &user(1, true), &bids, &listings, &prices)
            .await
            .unwrap();

        // the listing author may restart without admin rights
        let restart = RestartBiddingCommand {
            product_id: 1,
            nonce: String::new(),
        };
        handle_restart_bidding(&restart, &user(10, false), &bids, &listings, &prices)
            .await
            .unwrap();

        assert_eq!(bids.bid_count(), 0);
        for key in [META_BID_CLOSED, META_WINNING_BID, META_PRICE, META_SALE_PRICE] {
            assert!(listings.meta(1, key).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn restart_requires_admin_or_author() {
        let (bids, listings, prices) = setup();
        bids.insert_bid(1, 2, dec!(9500)).await.unwrap();

        let restart = RestartBiddingCommand {
            product_id: 1,
            nonce: String::new(),
        };
        let err = handle_restart_bidding(&restart, &user(3, false), &bids, &listings, &prices)
            .await
            .unwrap_err();
        assert_eq!(err["message"], "Permission denied");
        assert_eq!(bids.bid_count(), 1);
    }

    #[tokio::test]
    async fn delete_bid_removes_exactly_one_row() {
        let (bids, listings, _) = setup();
        listings.add_product(car(2, 10, dec!(5000)));
        let mine = bids.insert_bid(1, 2, dec!(9500)).await.unwrap();
        bids.insert_bid(1, 3, dec!(9600)).await.unwrap();
        bids.insert_bid(2, 2, dec!(4800)).await.unwrap();

        let cmd = DeleteBidCommand {
            bid_id: mine,
            nonce: String::new(),
        };
        handle_delete_bid(&cmd, &user(2, false), &bids).await.unwrap();

        assert_eq!(bids.bid_count(), 2);
        assert!(bids.bid(mine).await.unwrap().is_none());
        // the other product's bids are untouched
        assert_eq!(bids.bids_for_product(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_bid_denied_for_non_owner() {
        let (bids, _, _) = setup();
        let other = bids.insert_bid(1, 3, dec!(9500)).await.unwrap();

        let cmd = DeleteBidCommand {
            bid_id: other,
            nonce: String::new(),
        };
        let err = handle_delete_bid(&cmd, &user(2, false), &bids)
            .await
            .unwrap_err();
        assert_eq!(err["message"], "Permission denied");
        assert!(bids.bid(other).await.unwrap().is_some());

        // an admin may delete anyone's bid
        handle_delete_bid(&cmd, &user(1, true), &bids).await.unwrap();
        assert_eq!(bids.bid_count(), 0);
    }

    #[tokio::test]
    async fn clear_bids_is_admin_only() {
        let (bids, _, _) = setup();
        bids.insert_bid(1, 2, dec!(9500)).await.unwrap();
        bids.insert_bid(1, 3, dec!(9600)).await.unwrap();

        let cmd = ClearBidsCommand {
            product_id: 1,
            nonce: String::new(),
        };
        let err = handle_clear_bids(&cmd, &user(2, false), &bids)
            .await
            .unwrap_err();
        assert_eq!(err["message"], "Permission denied");
        assert_eq!(bids.bid_count(), 2);

        handle_clear_bids(&cmd, &user(1, true), &bids).await.unwrap();
        assert_eq!(bids.bid_count(), 0);
    }

    #[tokio::test]
    async fn login_succeeds_with_valid_credentials() {
        std::env::set_var("JWT_SECRET", "test-secret");
        let listings = InMemoryListingStore::new();
        let mut u = user(5, false);
        u.password_hash = auth::hash_password("pass123").unwrap();
        listings.add_user(u);

        let cmd = LoginCommand {
            username: "user5".to_string(),
            password: "pass123".to_string(),
            security: String::new(),
        };
        let data = handle_login(&cmd, &listings).await.unwrap();
        assert_eq!(data["message"], "Login successful");
        let token = data["token"].as_str().unwrap();
        assert_eq!(auth::validate_session_token(token), Some(5));
    }

    #[tokio::test]
    async fn login_fails_with_a_generic_message() {
        let listings = InMemoryListingStore::new();
        let mut u = user(5, false);
        u.password_hash = auth::hash_password("pass123").unwrap();
        listings.add_user(u);

        for (name, pass) in [("user5", "wrong"), ("nobody", "pass123")] {
            let cmd = LoginCommand {
                username: name.to_string(),
                password: pass.to_string(),
                security: String::new(),
            };
            let err = handle_login(&cmd, &listings).await.unwrap_err();
            assert_eq!(err["message"], "Invalid login credentials");
        }
    }
}

// endregion: --- Tests
