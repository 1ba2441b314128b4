/* src/cli/core/src/config/env.rs */

// Environment sources: .env files and the captured process environment.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::detect::Framework;

/// Read in this order; a later file overrides keys from an earlier one.
pub const ENV_FILES: [&str; 4] = [".env.local", ".env.test", ".env.production", ".env"];

/// Process variables that belong to the machine, not the application.
const SYSTEM_PREFIXES: &[&str] = &[
  "AWS_", "LAMBDA_", "NPM_", "NODE_", "XDG_", "SSH_", "LC_", "PULUMI_", "NUCEL_", "RUST_", "CARGO_",
  "GIT_",
];

const SYSTEM_NAMES: &[&str] = &[
  "HOME", "PATH", "PWD", "SHELL", "USER", "TERM", "LANG", "HOSTNAME", "OLDPWD", "SHLVL", "TMPDIR",
  "CI", "LOGNAME", "EDITOR", "DISPLAY", "TZ",
];

pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
  let iter =
    dotenvy::from_path_iter(path).with_context(|| format!("failed to open {}", path.display()))?;
  let mut vars = BTreeMap::new();
  for item in iter {
    let (key, value) = item.with_context(|| format!("failed to parse {}", path.display()))?;
    vars.insert(key, value);
  }
  Ok(vars)
}

/// Merge every env file present in `root`, in `ENV_FILES` order.
pub fn read_env_files(root: &Path) -> Result<BTreeMap<String, String>> {
  let mut merged = BTreeMap::new();
  for name in ENV_FILES {
    let path = root.join(name);
    if !path.is_file() {
      continue;
    }
    let vars = read_env_file(&path)?;
    tracing::debug!(file = name, count = vars.len(), "read env file");
    merged.extend(vars);
  }
  Ok(merged)
}

fn is_upper_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
    && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Whether a process variable is meant for the application.
pub fn is_app_variable(name: &str, framework: Framework) -> bool {
  if let Some(prefix) = framework.public_env_prefix()
    && name.starts_with(prefix)
  {
    return true;
  }
  is_upper_identifier(name)
    && !SYSTEM_NAMES.contains(&name)
    && !SYSTEM_PREFIXES.iter().any(|p| name.starts_with(p))
}

pub fn app_variables(
  process_env: &BTreeMap<String, String>,
  framework: Framework,
) -> BTreeMap<String, String> {
  process_env
    .iter()
    .filter(|(k, _)| is_app_variable(k, framework))
    .map(|(k, v)| (k.clone(), v.clone()))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn later_env_files_override_earlier() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join(".env.local"), "A=local\nB=local\n").unwrap();
    std::fs::write(tmp.path().join(".env.production"), "B=production\n# comment\nC=\"quoted value\"\n")
      .unwrap();
    std::fs::write(tmp.path().join(".env"), "C=base\n").unwrap();

    let vars = read_env_files(tmp.path()).unwrap();
    assert_eq!(vars["A"], "local");
    assert_eq!(vars["B"], "production");
    assert_eq!(vars["C"], "base");
  }

  #[test]
  fn no_env_files_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(read_env_files(tmp.path()).unwrap().is_empty());
  }

  #[test]
  fn app_variable_predicate() {
    assert!(is_app_variable("DATABASE_URL", Framework::Hono));
    assert!(is_app_variable("NEXT_PUBLIC_api", Framework::Next));
    assert!(!is_app_variable("NEXT_PUBLIC_api", Framework::SvelteKit));
    assert!(!is_app_variable("AWS_SECRET_ACCESS_KEY", Framework::Next));
    assert!(!is_app_variable("PATH", Framework::Next));
    assert!(!is_app_variable("npm_config_cache", Framework::Next));
    assert!(!is_app_variable("lowercase", Framework::Hono));
  }

  #[test]
  fn app_variables_filters_process_env() {
    let env = BTreeMap::from([
      ("HOME".to_string(), "/root".to_string()),
      ("AWS_FOO".to_string(), "x".to_string()),
      ("STRIPE_KEY".to_string(), "sk".to_string()),
      ("PUBLIC_SITE".to_string(), "s".to_string()),
    ]);
    let vars = app_variables(&env, Framework::SvelteKit);
    assert_eq!(vars.keys().collect::<Vec<_>>(), vec!["PUBLIC_SITE", "STRIPE_KEY"]);
  }
}
