#![forbid(unsafe_code)]

//! Realtime call-queue monitoring over an Asterisk Manager Interface session.

pub mod ami;
pub mod config;
pub mod errors;
pub mod http;
pub mod models;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
