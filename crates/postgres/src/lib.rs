//! # Postgres
//!
//! This crate provides the connection pool and schema migrations for the campsite database.

/// Database connection and migration utilities.
pub mod database;
