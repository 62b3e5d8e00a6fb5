// src/config/mod.rs

//! `Sitepipe.toml`: data model, loading, validation and path resolution.
//!
//! Deserialization yields a [`RawConfigFile`]; the only way to a
//! [`ConfigFile`] is `TryFrom`, which runs the checks in `validate.rs`.
//! [`Paths`] turns the configured relative roots into absolute ones.

pub mod loader;
pub mod model;
pub mod paths;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, ConfigSection, PathsSection, RawConfigFile, ScriptsSection, ServerSection,
    StylesSection, TemplatesSection,
};
pub use paths::Paths;
