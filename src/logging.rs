// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The level comes from `--log-level`, then `SITEPIPE_LOG`, then `info`.
//! `SITEPIPE_LOG` may also hold full filter directives such as
//! `sitepipe=debug,tower_http=trace`. Output goes to stderr; stdout belongs
//! to `--dry-run`.

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "SITEPIPE_LOG";

/// Dependencies that are chatty at `info` and below.
const QUIET_DEPS: &[&str] = &["hyper=warn", "notify=warn", "globset=warn"];

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("installing tracing subscriber")
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let base = match (cli_level, env.map(str::trim)) {
        (Some(level), _) => level.as_directive().to_string(),
        (None, Some(directives)) if !directives.is_empty() => directives.to_lowercase(),
        _ => LogLevel::Info.as_directive().to_string(),
    };

    let mut directives = vec![base];
    directives.extend(QUIET_DEPS.iter().map(|d| d.to_string()));

    EnvFilter::try_new(directives.join(","))
        .with_context(|| format!("invalid log filter in {LOG_ENV_VAR}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_wins_over_environment() {
        let filter = build_filter(Some(LogLevel::Debug), Some("error")).unwrap().to_string();
        assert!(filter.contains("debug"));
        assert!(!filter.contains("error"));
    }

    #[test]
    fn environment_accepts_directives() {
        let filter = build_filter(None, Some(" Sitepipe=Trace ")).unwrap();
        assert!(filter.to_string().contains("sitepipe=trace"));

        let filter = build_filter(None, None).unwrap();
        assert!(filter.to_string().contains("info"));
    }

    #[test]
    fn second_install_reports_an_error() {
        init_logging(Some(LogLevel::Warn)).unwrap();
        let err = init_logging(Some(LogLevel::Warn)).unwrap_err();
        assert!(err.to_string().contains("installing tracing subscriber"));
    }

    #[test]
    fn garbage_environment_is_an_error() {
        assert!(build_filter(None, Some("sitepipe=loud")).is_err());
    }
}
