// src/config/mod.rs

//! Configuration loading and validation for pipetask.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a pipeline file from disk (`loader.rs`).
//! - Validate it (`validate.rs`).
//! - Build tasks, the pipeline and items from it (`pipeline.rs`).

pub mod loader;
pub mod model;
pub mod pipeline;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{
    ConfigFile, ConfigSection, DefaultSection, ItemConfig, MaxTries, RawConfigFile, TaskConfig,
};
