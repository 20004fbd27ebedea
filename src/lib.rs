//! Gmail sender organiser: OAuth2 implicit-flow login, inbox sampling,
//! per-sender grouping and favorite senders.

pub mod app;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod favorites;
pub mod mail;
pub mod store;
pub mod terminal;

pub use error::{Error, Result};
