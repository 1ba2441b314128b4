/* src/cli/core/src/config/loader.rs */

// Locating, parsing and validating the optional nucel.toml / nucel.json override.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;

use super::types::{MEMORY_RANGE, SCHEMA, TIMEOUT_RANGE, UserConfig};
use crate::detect::Framework;
use crate::ui;

/// Declarative override files, in lookup order.
pub const CONFIG_FILES: [&str; 2] = ["nucel.toml", "nucel.json"];

/// Script configs from the JavaScript toolchain. Never executed.
const SCRIPT_CONFIG_FILES: [&str; 3] = ["nucel.config.ts", "nucel.config.js", "nucel.config.mjs"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
  pub path: String,
  pub message: String,
}

impl fmt::Display for FieldError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.path.is_empty() {
      write!(f, "{}", self.message)
    } else {
      write!(f, "{}: {}", self.path, self.message)
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("{} is invalid:\n{}", .path.display(), list_errors(.errors))]
  Invalid { path: PathBuf, errors: Vec<FieldError> },

  #[error("failed to parse {}: {message}", .path.display())]
  Syntax { path: PathBuf, message: String },
}

fn list_errors(errors: &[FieldError]) -> String {
  errors.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n")
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
  pub path: PathBuf,
  pub config: UserConfig,
}

/// First declarative config file present in `root`.
pub fn find_user_config(root: &Path) -> Option<PathBuf> {
  CONFIG_FILES.iter().map(|name| root.join(name)).find(|p| p.is_file())
}

/// Load the override file, if any.
///
/// Syntax errors are reported and ignored unless `strict` is set; schema
/// violations are always fatal.
pub fn load_user_config(root: &Path, strict: bool) -> Result<Option<LoadedConfig>> {
  let Some(path) = find_user_config(root) else {
    if let Some(script) = SCRIPT_CONFIG_FILES.iter().find(|n| root.join(n).is_file()) {
      ui::warn(&format!("{script} is not executed -- move its settings into nucel.toml"));
    }
    return Ok(None);
  };

  match parse_user_config(&path) {
    Ok(config) => {
      tracing::debug!(path = %path.display(), "loaded user config");
      Ok(Some(LoadedConfig { path, config }))
    }
    Err(err @ ConfigError::Syntax { .. }) if !strict => {
      ui::warn(&format!("{err} -- continuing with defaults"));
      tracing::warn!(path = %path.display(), "user config ignored after parse failure");
      Ok(None)
    }
    Err(err) => Err(err.into()),
  }
}

pub fn parse_user_config(path: &Path) -> Result<UserConfig, ConfigError> {
  let content = std::fs::read_to_string(path)
    .map_err(|e| ConfigError::Syntax { path: path.to_path_buf(), message: e.to_string() })?;
  let is_json = path.extension().is_some_and(|e| e == "json");
  let value = parse_value(&content, is_json)
    .map_err(|message| ConfigError::Syntax { path: path.to_path_buf(), message })?;

  let mut errors = unknown_keys(&value);
  if !errors.is_empty() {
    return Err(ConfigError::Invalid { path: path.to_path_buf(), errors });
  }

  let config: UserConfig = serde_json::from_value(value).map_err(|e| ConfigError::Invalid {
    path: path.to_path_buf(),
    errors: vec![FieldError { path: String::new(), message: e.to_string() }],
  })?;

  errors = validate(&config);
  if !errors.is_empty() {
    return Err(ConfigError::Invalid { path: path.to_path_buf(), errors });
  }
  Ok(config)
}

/// Parse either format into one JSON tree so validation is format-agnostic.
fn parse_value(content: &str, is_json: bool) -> std::result::Result<Value, String> {
  if is_json {
    return serde_json::from_str(content).map_err(|e| e.to_string());
  }
  let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;
  serde_json::to_value(table).map_err(|e| e.to_string())
}

fn allowed_keys(section: &str) -> Option<&'static [&'static str]> {
  SCHEMA.iter().find(|(name, _)| *name == section).map(|(_, keys)| *keys)
}

fn unknown_keys(root: &Value) -> Vec<FieldError> {
  let mut errors = Vec::new();
  let Some(obj) = root.as_object() else {
    errors.push(FieldError {
      path: String::new(),
      message: "expected a table at top level".into(),
    });
    return errors;
  };
  check_keys("", obj, &mut errors);
  for (section, value) in obj {
    if allowed_keys(section).is_none() {
      continue;
    }
    match value {
      Value::Object(inner) => check_keys(section, inner, &mut errors),
      Value::Array(items) => {
        for (i, item) in items.iter().enumerate() {
          if let Some(inner) = item.as_object() {
            check_keys(&format!("{section}[{i}]"), inner, &mut errors);
          }
        }
      }
      _ => {}
    }
  }
  errors
}

fn check_keys(
  path: &str,
  obj: &serde_json::Map<String, Value>,
  errors: &mut Vec<FieldError>,
) {
  // "domains[0]" -> "domains"
  let section = path.split('[').next().unwrap_or(path);
  let Some(allowed) = allowed_keys(section) else { return };
  for key in obj.keys() {
    if !allowed.contains(&key.as_str()) {
      let full = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
      errors.push(FieldError { path: full, message: "unknown field".into() });
    }
  }
}

fn is_valid_region(region: &str) -> bool {
  let parts: Vec<&str> = region.split('-').collect();
  if parts.len() < 3 || parts[0].len() != 2 || !parts[0].chars().all(|c| c.is_ascii_lowercase()) {
    return false;
  }
  let last = parts[parts.len() - 1];
  !last.is_empty()
    && last.chars().all(|c| c.is_ascii_digit())
    && parts[1..parts.len() - 1]
      .iter()
      .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase()))
}

/// Relative, no `..`, and names at least one directory (`.` alone would be the root).
fn is_nested_relative(dir: &str) -> bool {
  let path = Path::new(dir);
  !path.is_absolute()
    && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    && path.components().any(|c| matches!(c, Component::Normal(_)))
}

fn is_route_source(s: &str) -> bool {
  s.starts_with('/')
}

fn is_destination(s: &str) -> bool {
  s.starts_with('/') || s.starts_with("https://") || s.starts_with("http://")
}

/// Semantic checks serde cannot express. Collects every violation.
pub(super) fn validate(config: &UserConfig) -> Vec<FieldError> {
  let mut errors = Vec::new();
  let mut push = |path: String, message: &str| {
    errors.push(FieldError { path, message: message.to_string() });
  };

  if config.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
    push("name".into(), "must not be empty");
  }
  if config.framework == Some(Framework::Unknown) {
    push("framework".into(), "must be one of next, sveltekit, react-router, hono");
  }
  if config.build_command.as_deref().is_some_and(|c| c.trim().is_empty()) {
    push("build_command".into(), "must not be empty");
  }
  if config.output_directory.as_deref().is_some_and(|d| d.is_empty() || Path::new(d).is_absolute())
  {
    push("output_directory".into(), "must be a non-empty relative path");
  }
  if !is_valid_region(&config.aws.region) {
    push("aws.region".into(), "must look like an AWS region (e.g. us-east-1)");
  }

  if config.domains.len() > 1 {
    push("domains".into(), "only one custom domain is supported");
  }
  for (i, d) in config.domains.iter().enumerate() {
    if !d.name.contains('.') || d.name.starts_with('.') || d.name.ends_with('.') {
      push(format!("domains[{i}].name"), "must be a fully qualified domain name");
    }
    match (&d.certificate_arn, &d.hosted_zone_id) {
      (Some(arn), _) if !arn.starts_with("arn:aws:acm:us-east-1:") => push(
        format!("domains[{i}].certificate_arn"),
        "CloudFront requires an ACM certificate in us-east-1",
      ),
      (None, None) => push(
        format!("domains[{i}]"),
        "requires either certificate_arn or hosted_zone_id",
      ),
      _ => {}
    }
  }

  for (i, h) in config.headers.iter().enumerate() {
    if !is_route_source(&h.source) {
      push(format!("headers[{i}].source"), "must start with '/'");
    }
    if h.values.is_empty() {
      push(format!("headers[{i}].values"), "must declare at least one header");
    }
  }
  for (i, r) in config.rewrites.iter().enumerate() {
    if !is_route_source(&r.source) {
      push(format!("rewrites[{i}].source"), "must start with '/'");
    }
    if !r.destination.starts_with('/') {
      push(format!("rewrites[{i}].destination"), "must be a path starting with '/'");
    }
  }
  for (i, r) in config.redirects.iter().enumerate() {
    if !is_route_source(&r.source) {
      push(format!("redirects[{i}].source"), "must start with '/'");
    }
    if !is_destination(&r.destination) {
      push(format!("redirects[{i}].destination"), "must be a path or an http(s) URL");
    }
  }

  if let Some(memory) = config.lambda.memory
    && !MEMORY_RANGE.contains(&memory)
  {
    push("lambda.memory".into(), "must be between 128 and 10240 MB");
  }
  if let Some(timeout) = config.lambda.timeout
    && !TIMEOUT_RANGE.contains(&timeout)
  {
    push("lambda.timeout".into(), "must be between 1 and 900 seconds");
  }
  if config.lambda.runtime.as_deref().is_some_and(|r| !r.starts_with("nodejs")) {
    push("lambda.runtime".into(), "must be a Node.js runtime (e.g. nodejs20.x)");
  }
  if config.adapter.out_dir.as_deref().is_some_and(|d| !is_nested_relative(d)) {
    push("adapter.out_dir".into(), "must be a relative path below the project root");
  }

  errors
}

/// Write a starter nucel.toml; refuses to overwrite.
pub fn write_starter_config(root: &Path, framework: Framework) -> Result<PathBuf> {
  let path = root.join(CONFIG_FILES[0]);
  if path.exists() {
    bail!("{} already exists", path.display());
  }
  let content = format!(
    "framework = \"{framework}\"\n\n[aws]\nregion = \"us-east-1\"\n\n[lambda]\nmemory = 1024\ntimeout = 30\n"
  );
  std::fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
  Ok(path)
}
