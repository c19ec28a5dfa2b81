/// Insert a bid row
pub const INSERT_BID: &str = r#"
    INSERT INTO product_bids (product_id, user_id, bid_amount)
    VALUES ($1, $2, $3)
    RETURNING id
"#;

/// Highest bid for a product
pub const GET_HIGHEST_BID: &str =
    "SELECT MAX(bid_amount) AS highest_bid FROM product_bids WHERE product_id = $1";

/// Single bid lookup
pub const GET_BID: &str =
    "SELECT id, product_id, user_id, bid_amount, bid_date FROM product_bids WHERE id = $1";

/// Bids for a product, highest first
pub const GET_PRODUCT_BIDS: &str = r#"
    SELECT id, product_id, user_id, bid_amount, bid_date
    FROM product_bids
    WHERE product_id = $1
    ORDER BY bid_amount DESC
"#;

/// Bids by a user, newest first
pub const GET_USER_BIDS: &str = r#"
    SELECT id, product_id, user_id, bid_amount, bid_date
    FROM product_bids
    WHERE user_id = $1
    ORDER BY bid_date DESC
"#;

/// Delete a single bid
pub const DELETE_BID: &str = "DELETE FROM product_bids WHERE id = $1";

/// Delete every bid for a product
pub const DELETE_PRODUCT_BIDS: &str = "DELETE FROM product_bids WHERE product_id = $1";

/// Product lookup
pub const GET_PRODUCT: &str = r#"
    SELECT id, title, regular_price, sale_price, category, author_id, created_at
    FROM products
    WHERE id = $1
"#;

/// Listings an author is selling in a category
pub const GET_PRODUCTS_BY_AUTHOR: &str = r#"
    SELECT id, title, regular_price, sale_price, category, author_id, created_at
    FROM products
    WHERE author_id = $1 AND category = $2
    ORDER BY created_at DESC
"#;

/// User lookup by id
pub const GET_USER: &str = r#"
    SELECT id, username, display_name, email, mobile_number, password_hash, is_admin, created_at
    FROM users
    WHERE id = $1
"#;

/// User lookup by username
pub const GET_USER_BY_USERNAME: &str = r#"
    SELECT id, username, display_name, email, mobile_number, password_hash, is_admin, created_at
    FROM users
    WHERE username = $1
"#;

/// Listing meta value lookup
pub const GET_META: &str =
    "SELECT meta_value FROM product_meta WHERE product_id = $1 AND meta_key = $2";

/// Listing meta upsert
pub const UPSERT_META: &str = r#"
    INSERT INTO product_meta (product_id, meta_key, meta_value)
    VALUES ($1, $2, $3)
    ON CONFLICT (product_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value
"#;

/// Listing meta delete
pub const DELETE_META: &str =
    "DELETE FROM product_meta WHERE product_id = $1 AND meta_key = $2";
