//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the playback and transfer engine:
//! - Logging and tracing setup
//! - Configuration and bridge injection
//! - Event bus for host notifications

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
