//! Database bootstrap
//!
//! PostgreSQL connection and migrations, plus demo data for the in-memory
//! backend.

pub mod connection;
pub mod seed;

pub use connection::DatabaseConnection;
