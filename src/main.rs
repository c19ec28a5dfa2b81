// region:    --- Imports
use axum::routing::{get, post};
use axum::Router;
use car_bidding_service::database::DatabaseManager;
use car_bidding_service::handlers::{self, AppState};
use car_bidding_service::pricing::PriceCache;
use car_bidding_service::store::postgres::{PostgresBidStore, PostgresListingStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let db_manager = Arc::new(DatabaseManager::new().await);

    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> database initialization failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> database initialized", "Main");

    let state = AppState {
        bids: Arc::new(PostgresBidStore::new(Arc::clone(&db_manager))),
        listings: Arc::new(PostgresListingStore::new(Arc::clone(&db_manager))),
        prices: Arc::new(PriceCache::new()),
    };

    // cors for the storefront pages
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes_all = Router::new()
        // lifecycle actions
        .route("/ajax/place_bid", post(handlers::handle_place_bid))
        .route("/ajax/close_bidding", post(handlers::handle_close_bidding))
        .route(
            "/ajax/restart_bidding",
            post(handlers::handle_restart_bidding),
        )
        .route("/ajax/delete_bid", post(handlers::handle_delete_bid))
        .route("/ajax/clear_bids", post(handlers::handle_clear_bids))
        .route("/ajax/login", post(handlers::handle_login))
        // read-only views
        .route("/session", get(handlers::handle_get_session))
        .route(
            "/products/:id/view",
            get(handlers::handle_get_product_view),
        )
        .route(
            "/products/:id/widget",
            get(handlers::handle_get_widget_view),
        )
        .route(
            "/admin/products/:id/bids",
            get(handlers::handle_get_admin_bids),
        )
        .route(
            "/account/bid-history",
            get(handlers::handle_get_bid_history),
        )
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
