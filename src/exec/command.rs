// src/exec/command.rs

//! External stage commands.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Captured result of one stage command.
#[derive(Debug)]
pub struct StageOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run `cmd_line` through the platform shell in `cwd` with extra `envs`,
/// capturing both output streams.
pub async fn run_stage(cmd_line: &str, cwd: &Path, envs: &[(&str, &str)]) -> Result<StageOutput> {
    debug!(cmd = %cmd_line, ?cwd, "running stage command");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd_line);
        c
    };

    cmd.current_dir(cwd)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = cmd
        .output()
        .await
        .with_context(|| format!("spawning stage command `{cmd_line}`"))?;

    Ok(StageOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Substitute `{input}` / `{output}` in a stage template with shell-quoted
/// paths.
pub fn render_stage(template: &str, input: &Path, output: &Path) -> String {
    template
        .replace("{input}", &shell_quote(&input.to_string_lossy()))
        .replace("{output}", &shell_quote(&output.to_string_lossy()))
}

/// Quote a single argument for the platform shell.
pub fn shell_quote(arg: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", arg.replace('"', "\"\""))
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
