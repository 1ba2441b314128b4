/* src/cli/core/src/context.rs */

// Per-invocation state owned by `main` and threaded through every command.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context as _, Result};

#[derive(Debug, Clone)]
pub struct Context {
  /// Project root the command operates on.
  pub cwd: PathBuf,
  /// Snapshot of the process environment taken at startup.
  pub env: BTreeMap<String, String>,
  /// Fail on an unparsable nucel.toml instead of falling back to defaults.
  pub strict: bool,
  pub debug: bool,
}

impl Context {
  pub fn from_process(cwd: Option<PathBuf>, strict: bool, debug: bool) -> Result<Self> {
    let cwd = match cwd {
      Some(dir) => dir,
      None => std::env::current_dir().context("failed to get cwd")?,
    };
    let cwd = cwd.canonicalize().with_context(|| format!("failed to resolve {}", cwd.display()))?;
    let env = utf8_env(std::env::vars_os());
    let strict = strict || env.get("NUCEL_STRICT").is_some_and(|v| v == "1" || v == "true");
    Ok(Self { cwd, env, strict, debug })
  }

  /// Isolated context for tests: no process environment leaks in.
  #[cfg(test)]
  pub fn for_dir(cwd: impl Into<PathBuf>) -> Self {
    Self { cwd: cwd.into(), env: BTreeMap::new(), strict: false, debug: false }
  }

  pub fn var(&self, name: &str) -> Option<&str> {
    self.env.get(name).map(String::as_str)
  }
}

/// Keep the variables whose name and value are both valid UTF-8.
fn utf8_env(vars: impl IntoIterator<Item = (OsString, OsString)>) -> BTreeMap<String, String> {
  let mut env = BTreeMap::new();
  for (name, value) in vars {
    match (name.into_string(), value.into_string()) {
      (Ok(name), Ok(value)) => {
        env.insert(name, value);
      }
      (Ok(name), Err(_)) => tracing::debug!(%name, "skipping env var with non-UTF-8 value"),
      (Err(name), _) => tracing::debug!(name = ?name, "skipping env var with non-UTF-8 name"),
    }
  }
  env
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(unix)]
  #[test]
  fn non_utf8_variables_are_dropped() {
    use std::os::unix::ffi::OsStringExt;

    let vars = vec![
      (OsString::from("GOOD"), OsString::from("ok")),
      (OsString::from("BAD_VALUE"), OsString::from_vec(vec![0xff, 0xfe])),
      (OsString::from_vec(vec![0xff]), OsString::from("x")),
    ];
    let env = utf8_env(vars);
    assert_eq!(env.len(), 1);
    assert_eq!(env.get("GOOD").map(String::as_str), Some("ok"));
  }

  #[test]
  fn strict_follows_environment() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = Context::from_process(Some(tmp.path().to_path_buf()), true, false).unwrap();
    assert!(ctx.strict);
    assert_eq!(ctx.cwd, tmp.path().canonicalize().unwrap());
  }
}
