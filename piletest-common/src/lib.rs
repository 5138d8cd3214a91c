//! # Pile Test Common Library
//!
//! Shared code for the pile load test services:
//! - Error type used across crates
//! - Configuration loading (TOML file, environment, defaults)
//! - Report event types and the broadcast EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
