mod keys;
mod store;
mod user_state;

pub use keys::*;
pub use store::*;
pub use user_state::*;

/// SQL migration for the key-value table
pub const MIGRATION_001_KV_STORE: &str = include_str!("migrations/001_kv_store.sql");
