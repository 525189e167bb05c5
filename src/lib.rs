//! Offer negotiation core for a property marketplace.
//!
//! The lifecycle of a buyer's offer — submit, counter, accept, reject,
//! withdraw — with staff-session and buyer-email authorization models, a
//! cascading rejection of competing offers on acceptance, an append-only
//! audit trail per offer, and atomic per-listing persistence over sled.

pub mod auth;
pub mod engine;
pub mod error;
pub mod listing;
pub mod notify;
pub mod offer;
pub mod service;
pub mod store;
pub mod utils;

mod projector;
