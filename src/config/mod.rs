// src/config/mod.rs

//! Configuration loading and validation for adminagent.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate command tables and templates (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ClearSection, CommandConfig, ConfigFile, ExportSection, LimitsSection, LogSection,
    PathsSection, PullSection, RawConfigFile, RpcSection, TelegramSection,
};
pub use validate::is_safe_command_name;
