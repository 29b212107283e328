//! Storage substrate (§6): one RocksDB instance playing the role of "SQL
//! engine with vector columns" plus a KV store, each column family scoped to
//! a table (`{table}`, `embeddings.{table}`, `__kv`). Everything above this
//! module reaches the database only through [`StorageProvider`].

pub mod cache;
pub mod provider;
pub mod rocks;
pub mod ttl;

pub use cache::SchemaCache;
pub use provider::{FilterExpr, OrderBy, StorageProvider};
pub use rocks::RocksStorage;
pub use ttl::spawn_ttl_sweeper;
