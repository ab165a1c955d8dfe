//! # Campsite Services
//!
//! Campsites, categories, reviews, user accounts and favourites.
//! Every review mutation keeps the campsite's `average_rating` in step with
//! its review set, atomically with the mutation itself.

/// In-process store used by tests and local runs.
pub mod memory;
/// PostgreSQL-backed store.
pub mod pg;
/// Average rating computation.
pub mod rating;
/// Repository interfaces per entity group.
pub mod repository;
/// Business operations on top of the repositories.
pub mod service;
/// Entities, requests and errors.
pub mod types;
