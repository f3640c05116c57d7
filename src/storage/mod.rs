//! Storage layer
//!
//! An embedded store holding every live child table and its history shadow,
//! with single-writer transactions and pluggable persistence (memory or one
//! atomically replaced JSON file).

pub mod backend;
pub mod database;
pub mod file_io;

pub use backend::{JsonFileBackend, MemoryBackend, StoreBackend};
pub use database::{
    Database, LiveRow, StoreData, TableReader, Transaction, STORE_SCHEMA_VERSION,
};
pub use file_io::{read_json_if_exists, write_json_atomic};
