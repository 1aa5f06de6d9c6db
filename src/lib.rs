//! Frontdesk — clinic front-desk and records service.
//!
//! Patient records, appointment booking and the daily walk-in queue:
//! ticketed check-in, a single consistent waiting-line order, and the
//! appointment status state machine, fronted by a role-scoped REST API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod notify;
pub mod queue;
pub mod state;
