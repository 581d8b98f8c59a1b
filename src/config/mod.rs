// src/config/mod.rs

//! Graph-file loading and validation for gradflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a graph file from disk (`loader.rs`).
//! - Validate references, arity and acyclicity (`validate.rs`).
//! - Turn a validated file into buffers, nodes and a graph (`build.rs`).

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::{BuiltGraph, build_graph};
pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{BufferConfig, ConfigFile, ConfigSection, OpConfig, RawConfigFile};
