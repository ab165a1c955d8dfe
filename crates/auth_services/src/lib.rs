//! # Auth Services
//!
//! This crate provides authentication services for the application.
//! It includes password hashing, JWT token handling, credential storage,
//! the registration/login flow and middleware for request authentication.

/// Signing and hashing settings passed in at construction time.
pub mod config;
/// JWT token issuing and verification.
pub mod jwt;
/// Middleware and extractor for request authentication.
pub mod middleware;
/// bcrypt password hashing.
pub mod password;
/// Registration and login flow.
pub mod service;
/// Credential storage backends.
pub mod store;
/// Types and structures used in authentication services.
pub mod types;
