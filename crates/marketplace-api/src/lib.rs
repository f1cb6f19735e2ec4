//! Marketplace API - HTTP surface for the hour-credit ledger.
//!
//! Exposes the marketplace core over JSON:
//! - Hour package purchase and payment verification
//! - Hour logging with NGO review
//! - Internship and certification payment flows
//! - Volunteer certificate issuance
//!
//! Caller identity comes from the upstream identity layer through the
//! `x-user-id` and `x-user-role` headers.

pub mod api;
pub mod config;
pub mod error;

pub use config::Config;
pub use error::ApiError;
