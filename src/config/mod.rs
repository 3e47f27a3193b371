// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate coordinator timings and the processor manifest (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_and_validate};
pub use model::{
    AlgorithmConfig, ConfigFile, CoordinatorSection, DependencyConfig, ProcessorConfig,
    RawConfigFile,
};
pub use validate::{build_catalog, validate_config};
