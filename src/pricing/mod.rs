/// Price override for cars listings: wherever the sale/effective price is
/// read, the highest recorded bid wins. Highest-bid reads on this path go
/// through a transient in-process cache that the lifecycle commands
/// invalidate after mutating.
// region:    --- Imports
use crate::bidding::model::{Product, META_PRICE};
use crate::store::{BidStore, ListingStore, StoreError};
use moka::future::Cache;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

// endregion: --- Imports

// region:    --- Price Cache

/// Transient highest-bid cache, the stand-in for product price transients.
pub struct PriceCache {
    cache: Cache<i64, Option<Decimal>>,
}

impl PriceCache {
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(300))
            .build();
        Self { cache }
    }

    /// Cached highest bid for a product, computed from the store on miss.
    pub async fn highest_bid<B: BidStore + ?Sized>(
        &self,
        bids: &B,
        product_id: i64,
    ) -> Result<Option<Decimal>, StoreError> {
        if let Some(hit) = self.cache.get(&product_id).await {
            return Ok(hit);
        }
        let value = bids.highest_bid(product_id).await?;
        self.cache.insert(product_id, value).await;
        Ok(value)
    }

    pub async fn invalidate(&self, product_id: i64) {
        self.cache.invalidate(&product_id).await;
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new()
    }
}

// endregion: --- Price Cache

// region:    --- Override Filter

/// Sale price with the bid override applied: for a cars listing with at
/// least one bid the highest bid replaces the sale price.
pub async fn sale_price_with_override<B: BidStore + ?Sized>(
    product: &Product,
    bids: &B,
    prices: &PriceCache,
) -> Result<Option<Decimal>, StoreError> {
    if product.is_cars_listing() {
        if let Some(highest) = prices.highest_bid(bids, product.id).await? {
            return Ok(Some(highest));
        }
    }
    Ok(product.sale_price)
}

/// Ask price for the bid floor: overridden sale price if set, else regular.
pub async fn ask_price<B: BidStore + ?Sized>(
    product: &Product,
    bids: &B,
    prices: &PriceCache,
) -> Result<Decimal, StoreError> {
    Ok(sale_price_with_override(product, bids, prices)
        .await?
        .unwrap_or(product.regular_price))
}

/// A bid must reach 90% of the ask price.
pub fn minimum_bid(ask: Decimal) -> Decimal {
    ask * dec!(0.9)
}

/// Rewrite the denormalized `_price` meta from the current highest bid;
/// the "product re-save" of the listing. Leaves the meta alone when no
/// bids exist.
pub async fn refresh_price_meta<B: BidStore + ?Sized, L: ListingStore + ?Sized>(
    product: &Product,
    bids: &B,
    listings: &L,
) -> Result<(), StoreError> {
    if product.is_cars_listing() {
        if let Some(highest) = bids.highest_bid(product.id).await? {
            listings
                .set_meta(product.id, META_PRICE, &highest.to_string())
                .await?;
        }
    }
    Ok(())
}

// endregion: --- Override Filter

// region:    --- Formatting

fn currency_symbol() -> String {
    std::env::var("CURRENCY_SYMBOL").unwrap_or_else(|_| "$".to_string())
}

/// Formatted display price with thousands grouping, e.g. `$1,234.50`.
pub fn format_price(amount: Decimal) -> String {
    let negative = amount.is_sign_negative();
    let s = format!("{:.2}", amount.abs().round_dp(2));
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let int_grouped: String = grouped.chars().rev().collect();

    format!(
        "{}{}{}.{}",
        if negative { "-" } else { "" },
        currency_symbol(),
        int_grouped,
        frac_part
    )
}

// endregion: --- Formatting

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::model::CARS_CATEGORY;
    use crate::store::in_memory::InMemoryBidStore;
    use chrono::Utc;

    fn car(id: i64, regular: Decimal, sale: Option<Decimal>) -> Product {
        Product {
            id,
            title: format!("Car {}", id),
            regular_price: regular,
            sale_price: sale,
            category: CARS_CATEGORY.to_string(),
            author_id: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn formats_with_thousands_grouping() {
        assert_eq!(format_price(dec!(1234.5)), "$1,234.50");
        assert_eq!(format_price(dec!(0)), "$0.00");
        assert_eq!(format_price(dec!(987654.321)), "$987,654.32");
    }

    #[test]
    fn minimum_bid_is_ninety_percent() {
        assert_eq!(minimum_bid(dec!(10000)), dec!(9000.0));
    }

    #[tokio::test]
    async fn highest_bid_overrides_sale_price_for_cars() {
        let bids = InMemoryBidStore::new();
        let prices = PriceCache::new();
        let product = car(1, dec!(10000), Some(dec!(9500)));

        // no bids: sale price stands
        let sale = sale_price_with_override(&product, &bids, &prices)
            .await
            .unwrap();
        assert_eq!(sale, Some(dec!(9500)));

        bids.insert_bid(1, 7, dec!(9800)).await.unwrap();
        prices.invalidate(1).await;
        let sale = sale_price_with_override(&product, &bids, &prices)
            .await
            .unwrap();
        assert_eq!(sale, Some(dec!(9800)));
    }

    #[tokio::test]
    async fn non_cars_listing_is_never_overridden() {
        let bids = InMemoryBidStore::new();
        let prices = PriceCache::new();
        let mut product = car(2, dec!(500), None);
        product.category = "parts".to_string();

        bids.insert_bid(2, 7, dec!(9999)).await.unwrap();
        let ask = ask_price(&product, &bids, &prices).await.unwrap();
        assert_eq!(ask, dec!(500));
    }

    #[tokio::test]
    async fn cache_serves_stale_value_until_invalidated() {
        let bids = InMemoryBidStore::new();
        let prices = PriceCache::new();

        assert_eq!(prices.highest_bid(&bids, 3).await.unwrap(), None);
        bids.insert_bid(3, 7, dec!(100)).await.unwrap();
        // still the cached miss
        assert_eq!(prices.highest_bid(&bids, 3).await.unwrap(), None);
        prices.invalidate(3).await;
        assert_eq!(prices.highest_bid(&bids, 3).await.unwrap(), Some(dec!(100)));
    }
}

// endregion: --- Tests
