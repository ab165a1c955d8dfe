//! # Web Handlers for the Campsite Reviews API
//!
//! HTTP handlers, the route table and the mapping from domain errors to
//! status codes.

/// Handler error type and validation error formatting
pub mod error;

/// Route table and shared application data
pub mod routes;

/// Authentication handlers (register, login)
mod auth_handlers;
pub use auth_handlers::*;

/// Campsite and category handlers
mod campsite_handlers;
pub use campsite_handlers::*;

/// Review handlers
mod review_handlers;
pub use review_handlers::*;

/// Account, XP and favourites handlers
mod user_handlers;
pub use user_handlers::*;

/// Health check
mod admin_handlers;
pub use admin_handlers::*;

/// Serial ids start at 1, so this never matches a stored row.
const UNKNOWN_ID: i32 = 0;

/// Parses an id path segment. Non-numeric segments become an id that is
/// never found, so they produce the same 404 as a missing row.
pub(crate) fn path_id(raw: &str) -> i32 {
    raw.parse().unwrap_or(UNKNOWN_ID)
}
