//! Common library for the gallery API
//!
//! Shared infrastructure used by the API service: PostgreSQL connection
//! pooling and the database error types.

pub mod database;
pub mod error;
