pub mod alert_monitor;
pub mod buff;
pub mod discord;
pub mod pacer;
pub mod watchlist_store;
