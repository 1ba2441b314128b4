/* src/cli/core/src/shell.rs */

// Shell command helpers shared across build and deploy.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result, bail};

use crate::ui::{self, DIM, RESET};

/// Run a shell command, bail on failure (shows both stdout and stderr on error).
pub(crate) fn run_command(
  base_dir: &Path,
  command: &str,
  label: &str,
  env: &[(&str, &str)],
) -> Result<()> {
  ui::detail(&format!("{DIM}{command}{RESET}"));
  let mut cmd = Command::new("sh");
  cmd.args(["-c", command]);
  cmd.current_dir(base_dir);
  for (k, v) in env {
    cmd.env(k, v);
  }
  let output = cmd.output().with_context(|| format!("failed to run {label}"))?;
  check_output(&output, label)?;
  Ok(())
}

/// Run a program directly (no `sh -c`), capturing output. Returns stdout on success.
pub(crate) fn run_program(
  base_dir: &Path,
  program: &str,
  args: &[&str],
  label: &str,
  env: &[(&str, &str)],
) -> Result<String> {
  ui::detail(&format!("{DIM}{program} {}{RESET}", args.join(" ")));
  tracing::debug!(program, ?args, cwd = %base_dir.display(), "spawning");
  let mut cmd = Command::new(program);
  cmd.args(args);
  cmd.current_dir(base_dir);
  for (k, v) in env {
    cmd.env(k, v);
  }
  let output = cmd.output().with_context(|| format!("failed to run {label} ({program})"))?;
  check_output(&output, label)?;
  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a program with inherited stdio so its own progress output reaches the terminal.
pub(crate) fn run_program_streaming(
  base_dir: &Path,
  program: &str,
  args: &[&str],
  label: &str,
  env: &[(&str, &str)],
) -> Result<()> {
  ui::detail(&format!("{DIM}{program} {}{RESET}", args.join(" ")));
  let mut cmd = Command::new(program);
  cmd.args(args);
  cmd.current_dir(base_dir);
  cmd.stdin(Stdio::null());
  for (k, v) in env {
    cmd.env(k, v);
  }
  let status = cmd.status().with_context(|| format!("failed to run {label} ({program})"))?;
  if !status.success() {
    bail!("{label} exited with status {status}");
  }
  Ok(())
}

fn check_output(output: &Output, label: &str) -> Result<()> {
  if output.status.success() {
    return Ok(());
  }
  let stdout = String::from_utf8_lossy(&output.stdout);
  let stderr = String::from_utf8_lossy(&output.stderr);
  let mut msg = format!("{label} exited with status {}", output.status);
  if !stderr.is_empty() {
    msg.push('\n');
    msg.push_str(&stderr);
  }
  if !stdout.is_empty() {
    msg.push('\n');
    msg.push_str(&stdout);
  }
  bail!("{msg}");
}

/// Resolve a path inside node_modules by walking up parent directories.
/// Mirrors Node.js module resolution: checks `<dir>/node_modules/<suffix>` at each level.
pub(crate) fn resolve_node_module(start: &Path, suffix: &str) -> Option<PathBuf> {
  let mut dir = start.to_path_buf();
  loop {
    let candidate = dir.join("node_modules").join(suffix);
    if candidate.exists() {
      return Some(candidate);
    }
    if !dir.pop() {
      return None;
    }
  }
}

/// Check if a command exists on PATH.
pub(crate) fn which_exists(cmd: &str) -> bool {
  Command::new("which")
    .arg(cmd)
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .map(|s| s.success())
    .unwrap_or(false)
}
