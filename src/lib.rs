pub mod auth;
pub mod bidding;
pub mod database;
pub mod handlers;
pub mod pricing;
pub mod store;
pub mod views;
