use std::sync::{Arc, RwLock};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::events::ContentFeed;

pub type DbPool = Pool<SqliteConnectionManager>;

pub struct AppState {
    /// Fan-out for approved-content changes; every SSE client subscribes here.
    pub feed: ContentFeed,
    /// Cached copy of the `booking_notify_address` setting; admins can
    /// change it at runtime without a restart.
    pub booking_notify_address: Arc<RwLock<String>>,
}

pub mod config;
pub mod events;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
