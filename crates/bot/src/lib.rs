//! Duplicate-message guard bot.
//!
//! Exposes the building blocks (config, state, handler, update sources,
//! routes) so integration tests and the binary entrypoint can both use
//! them.

pub mod background;
pub mod config;
pub mod error;
pub mod handler;
pub mod polling;
pub mod router;
pub mod routes;
pub mod state;
pub mod webhook;
