mod connection_pool;
mod versioned_schema;

pub use connection_pool::{open_read_only, SqlitePool, DEFAULT_READ_POOL_SIZE};
pub use versioned_schema::*;
