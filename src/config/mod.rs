//! Configuration module for finvault
//!
//! - Platform path resolution with an environment override
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::{VaultPaths, DATA_DIR_ENV};
pub use settings::Settings;
