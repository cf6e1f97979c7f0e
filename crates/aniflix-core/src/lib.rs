pub mod config;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod release;
pub mod storage;
pub mod watchlist;
