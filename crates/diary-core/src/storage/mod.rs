//! Storage layer
//!
//! SQLite persistence for diary entries and UI preferences.
//!
//! ## Layout
//!
//! - `entries`: one row per entry, main photo and drawing as BLOBs,
//!   layers as JSON
//! - `entry_photos`: additional photos, ordered by position
//! - `preferences`: independent UI preference keys
//!
//! Every write runs in its own transaction, so a record is either fully
//! replaced or left untouched.

pub mod database;
pub mod error;
pub mod schema;

pub use database::Database;
pub use error::{StorageError, StorageResult};
pub use schema::{migrate, schema_version, SCHEMA_VERSION};
