//! Database module for the PostgreSQL store
//!
//! Connection handling and the SQL text the pipeline sends to the store.

pub mod connection;
pub mod sql;

pub use connection::{close, connect, StoreConfig};
