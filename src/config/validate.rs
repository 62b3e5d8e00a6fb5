// src/config/validate.rs

use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::paths::normalize_relative;
use crate::errors::{Result, SitepipeError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitepipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_paths(cfg)?;
    validate_server(cfg)?;
    validate_tools(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> SitepipeError {
    SitepipeError::ConfigError(msg.into())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(config_error("[config].queue_length must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let p = &cfg.paths;
    let dist = normalize_relative(&p.dist).map_err(config_error)?;
    let assets = normalize_relative(&p.assets).map_err(config_error)?;
    let src = normalize_relative(&p.src).map_err(config_error)?;
    let public = normalize_relative(&p.public).map_err(config_error)?;

    let dist_path = Path::new(&dist);
    if !Path::new(&assets).starts_with(dist_path) || assets == dist {
        return Err(config_error(format!(
            "[paths].assets ('{}') must be a subdirectory of [paths].dist ('{}')",
            p.assets, p.dist
        )));
    }

    // `clean` deletes dist recursively; it must never take inputs with it.
    // Outputs inside an input root would be picked up again as sources.
    for (key, input) in [("src", &src), ("public", &public)] {
        if Path::new(input).starts_with(dist_path) {
            return Err(config_error(format!(
                "[paths].{key} ('{input}') must not be inside [paths].dist ('{dist}')"
            )));
        }
        if dist_path.starts_with(input) {
            return Err(config_error(format!(
                "[paths].dist ('{dist}') must not be inside [paths].{key} ('{input}')"
            )));
        }
    }

    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.https {
        return Err(config_error(
            "[server].https = true is not supported; the dev server only speaks plain HTTP",
        ));
    }
    if cfg.server.host.trim().is_empty() {
        return Err(config_error("[server].host must not be empty"));
    }
    Ok(())
}

fn validate_tools(cfg: &RawConfigFile) -> Result<()> {
    let ext = cfg.templates.extension.trim_start_matches('.');
    if ext.is_empty() || ext.contains(['/', '*', '{', '}']) {
        return Err(config_error(format!(
            "[templates].extension '{}' is not a plain file extension",
            cfg.templates.extension
        )));
    }

    if cfg.styles.stages.is_empty() {
        return Err(config_error("[styles].stages must contain at least one command"));
    }
    for stage in &cfg.styles.stages {
        ensure_output_placeholder("[styles].stages", stage)?;
    }
    ensure_output_placeholder("[styles].minifier", &cfg.styles.minifier)?;
    ensure_output_placeholder("[scripts].bundler", &cfg.scripts.bundler)?;

    Ok(())
}

fn ensure_output_placeholder(key: &str, cmd: &str) -> Result<()> {
    if !cmd.contains("{output}") {
        return Err(config_error(format!(
            "{key} command '{cmd}' must contain an {{output}} placeholder"
        )));
    }
    Ok(())
}
