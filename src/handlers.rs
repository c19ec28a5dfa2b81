// region:    --- Imports
use crate::auth::{
    self, ANONYMOUS_USER, NONCE_AJAX_LOGIN, NONCE_CLOSE_BIDDING, NONCE_DELETE_BID,
    NONCE_PLACE_BID, NONCE_RESTART_BID,
};
use crate::bidding::commands::{
    self, ClearBidsCommand, CloseBiddingCommand, DeleteBidCommand, LoginCommand, PlaceBidCommand,
    RestartBiddingCommand,
};
use crate::bidding::model::User;
use crate::pricing::PriceCache;
use crate::store::postgres::{PostgresBidStore, PostgresListingStore};
use crate::views;
use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- App State

#[derive(Clone)]
pub struct AppState {
    pub bids: Arc<PostgresBidStore>,
    pub listings: Arc<PostgresListingStore>,
    pub prices: Arc<PriceCache>,
}

// endregion: --- App State

// region:    --- JSON Envelope

/// `{"success": true, "data": ...}`
fn json_success(data: serde_json::Value) -> Response {
    (StatusCode::OK, Json(json!({"success": true, "data": data}))).into_response()
}

/// `{"success": false, "data": {"message": ...}}`
fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"success": false, "data": {"message": message}})),
    )
        .into_response()
}

/// Command failures already carry their message payload.
fn command_error(err: serde_json::Value) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "data": err})),
    )
        .into_response()
}

fn view_error(e: views::ViewError) -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
}

// endregion: --- JSON Envelope

// region:    --- Identity Helpers

/// Resolve the caller or fail with the given message.
async fn require_user(state: &AppState, headers: &HeaderMap, message: &str) -> Result<User, Response> {
    match auth::current_user(&*state.listings, headers).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(json_error(StatusCode::UNAUTHORIZED, message)),
        Err(e) => Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())),
    }
}

/// Optional caller for the read-only views.
async fn optional_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, Response> {
    auth::current_user(&*state.listings, headers)
        .await
        .map_err(|e| json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))
}

// endregion: --- Identity Helpers

// region:    --- Command Handlers

/// `place_bid` action. Authenticated; the token mismatch short-circuits
/// before any mutation.
pub async fn handle_place_bid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(cmd): Form<PlaceBidCommand>,
) -> Response {
    info!("{:<12} --> place_bid request", "Handler");

    let user = match require_user(&state, &headers, "Please log in to place a bid").await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if !auth::verify_nonce(&cmd.nonce, user.id, NONCE_PLACE_BID) {
        return json_error(StatusCode::FORBIDDEN, "Security check failed");
    }

    match commands::handle_place_bid(&cmd, &user, &*state.bids, &*state.listings, &state.prices)
        .await
    {
        Ok(data) => json_success(data),
        Err(e) => command_error(e),
    }
}

/// `close_bidding` action (admin only).
pub async fn handle_close_bidding(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(cmd): Form<CloseBiddingCommand>,
) -> Response {
    info!("{:<12} --> close_bidding request", "Handler");

    let user = match require_user(
        &state,
        &headers,
        "You do not have permission to perform this action",
    )
    .await
    {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if !auth::verify_nonce(&cmd.nonce, user.id, NONCE_CLOSE_BIDDING) {
        return json_error(StatusCode::FORBIDDEN, "Security check failed");
    }

    match commands::handle_close_bidding(&cmd, &user, &*state.bids, &*state.listings, &state.prices)
        .await
    {
        Ok(data) => json_success(data),
        Err(e) => command_error(e),
    }
}

/// `restart_bidding` action (admin or listing author).
pub async fn handle_restart_bidding(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(cmd): Form<RestartBiddingCommand>,
) -> Response {
    info!("{:<12} --> restart_bidding request", "Handler");

    let user = match require_user(&state, &headers, "Permission denied").await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if !auth::verify_nonce(&cmd.nonce, user.id, NONCE_RESTART_BID) {
        return json_error(StatusCode::FORBIDDEN, "Security check failed");
    }

    match commands::handle_restart_bidding(
        &cmd,
        &user,
        &*state.bids,
        &*state.listings,
        &state.prices,
    )
    .await
    {
        Ok(data) => json_success(data),
        Err(e) => command_error(e),
    }
}

/// `delete_bid` action (the bid's own bidder or an admin).
pub async fn handle_delete_bid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(cmd): Form<DeleteBidCommand>,
) -> Response {
    info!("{:<12} --> delete_bid request", "Handler");

    let user = match require_user(&state, &headers, "Permission denied").await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if !auth::verify_nonce(&cmd.nonce, user.id, NONCE_DELETE_BID) {
        return json_error(StatusCode::FORBIDDEN, "Security check failed");
    }

    match commands::handle_delete_bid(&cmd, &user, &*state.bids).await {
        Ok(data) => json_success(data),
        Err(e) => command_error(e),
    }
}

/// `clear_bids` action (admin only). Accepts the restart nonce action.
pub async fn handle_clear_bids(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(cmd): Form<ClearBidsCommand>,
) -> Response {
    info!("{:<12} --> clear_bids request", "Handler");

    let user = match require_user(&state, &headers, "Permission denied").await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if !auth::verify_nonce(&cmd.nonce, user.id, NONCE_RESTART_BID) {
        return json_error(StatusCode::FORBIDDEN, "Security check failed");
    }

    match commands::handle_clear_bids(&cmd, &user, &*state.bids).await {
        Ok(data) => json_success(data),
        Err(e) => command_error(e),
    }
}

/// Unauthenticated `login` action; uses the anonymous nonce.
pub async fn handle_login(
    State(state): State<AppState>,
    Form(cmd): Form<LoginCommand>,
) -> Response {
    info!("{:<12} --> login request: {}", "Handler", cmd.username);

    if !auth::verify_nonce(&cmd.security, ANONYMOUS_USER, NONCE_AJAX_LOGIN) {
        return json_error(StatusCode::FORBIDDEN, "Security check failed");
    }

    match commands::handle_login(&cmd, &*state.listings).await {
        Ok(data) => json_success(data),
        Err(e) => command_error(e),
    }
}

// endregion: --- Command Handlers

// region:    --- View Handlers

/// Product-page bid/ask view.
pub async fn handle_get_product_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
) -> Response {
    info!("{:<12} --> product view id: {}", "HandlerQuery", product_id);

    let user = match optional_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    match views::product_bid_view(
        product_id,
        user.as_ref(),
        &*state.bids,
        &*state.listings,
        &state.prices,
    )
    .await
    {
        Ok(Some(view)) => json_success(json!(view)),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Product not found"),
        Err(e) => view_error(e),
    }
}

/// Embeddable widget view.
pub async fn handle_get_widget_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
) -> Response {
    info!("{:<12} --> widget view id: {}", "HandlerQuery", product_id);

    let user = match optional_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    match views::widget_view(
        product_id,
        user.as_ref(),
        &*state.bids,
        &*state.listings,
        &state.prices,
    )
    .await
    {
        Ok(Some(view)) => json_success(json!(view)),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Product not found"),
        Err(e) => view_error(e),
    }
}

/// Admin bid table for a product's edit screen.
pub async fn handle_get_admin_bids(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
) -> Response {
    info!("{:<12} --> admin bids id: {}", "HandlerQuery", product_id);

    let user = match require_user(
        &state,
        &headers,
        "You do not have permission to perform this action",
    )
    .await
    {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if !auth::is_admin(&user) {
        return json_error(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action",
        );
    }

    match views::admin_bids_view(product_id, &user, &*state.bids, &*state.listings).await {
        Ok(Some(view)) => json_success(json!(view)),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Product not found"),
        Err(e) => view_error(e),
    }
}

/// Two-tab account bid history.
pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    info!("{:<12} --> bid history", "HandlerQuery");

    let user = match require_user(&state, &headers, "Please log in to view your bids").await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    match views::bid_history_view(&user, &*state.bids, &*state.listings).await {
        Ok(view) => json_success(json!(view)),
        Err(e) => view_error(e),
    }
}

/// Login state plus the anonymous login nonce.
pub async fn handle_get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    info!("{:<12} --> session", "HandlerQuery");

    let user = match optional_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    match user {
        Some(user) => json_success(json!({
            "logged_in": true,
            "user_id": user.id,
            "display_name": user.display_name,
        })),
        None => match auth::create_nonce(ANONYMOUS_USER, NONCE_AJAX_LOGIN) {
            Ok(nonce) => json_success(json!({
                "logged_in": false,
                "login_nonce": nonce,
            })),
            Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        },
    }
}

// endregion: --- View Handlers
