//! Core domain + application logic for the feed bot.
//!
//! This crate knows nothing about Telegram, Cloudflare or the image board. Those
//! live behind ports (traits) implemented in adapter crates.

pub mod caption;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod recent;
pub mod relay;
pub mod runner;

pub use errors::{Error, Result};
