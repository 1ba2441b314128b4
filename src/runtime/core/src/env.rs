/* src/runtime/core/src/env.rs */

// Environment variable rules shared by the build pipeline and the rendered handler.

use std::collections::BTreeMap;
use std::fmt;

/// Prefixes the Lambda platform reserves for its own variables.
pub const RESERVED_PREFIXES: &[&str] = &["AWS_", "LAMBDA_", "_"];

/// Exact names the Lambda platform reserves.
pub const RESERVED_NAMES: &[&str] = &["TZ"];

/// `[a-zA-Z][a-zA-Z0-9_]*`
pub fn is_valid_env_name(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_reserved_env_name(name: &str) -> bool {
  RESERVED_NAMES.contains(&name) || RESERVED_PREFIXES.iter().any(|p| name.starts_with(p))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvRejection {
  InvalidName,
  Reserved,
  MissingPrefix(String),
}

impl fmt::Display for EnvRejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::InvalidName => write!(f, "name must match [a-zA-Z][a-zA-Z0-9_]*"),
      Self::Reserved => write!(f, "name is reserved by the Lambda runtime"),
      Self::MissingPrefix(prefix) => write!(f, "name does not start with \"{prefix}\""),
    }
  }
}

/// Name filter applied to every variable set handed to a function.
/// An empty prefix admits any valid, unreserved name.
#[derive(Debug, Clone, Default)]
pub struct EnvFilter {
  prefix: String,
}

#[derive(Debug, Default)]
pub struct FilteredEnv {
  pub kept: BTreeMap<String, String>,
  pub dropped: Vec<(String, EnvRejection)>,
}

impl EnvFilter {
  pub fn new(prefix: impl Into<String>) -> Self {
    Self { prefix: prefix.into() }
  }

  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  pub fn check(&self, name: &str) -> Result<(), EnvRejection> {
    if !is_valid_env_name(name) {
      return Err(EnvRejection::InvalidName);
    }
    if is_reserved_env_name(name) {
      return Err(EnvRejection::Reserved);
    }
    if !name.starts_with(&self.prefix) {
      return Err(EnvRejection::MissingPrefix(self.prefix.clone()));
    }
    Ok(())
  }

  pub fn allows(&self, name: &str) -> bool {
    self.check(name).is_ok()
  }

  pub fn apply<I>(&self, vars: I) -> FilteredEnv
  where
    I: IntoIterator<Item = (String, String)>,
  {
    let mut out = FilteredEnv::default();
    for (name, value) in vars {
      match self.check(&name) {
        Ok(()) => {
          out.kept.insert(name, value);
        }
        Err(reason) => out.dropped.push((name, reason)),
      }
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn valid_names() {
    assert!(is_valid_env_name("DATABASE_URL"));
    assert!(is_valid_env_name("publicKey2"));
    assert!(!is_valid_env_name("2FAST"));
    assert!(!is_valid_env_name("_PRIVATE"));
    assert!(!is_valid_env_name("MY-VAR"));
    assert!(!is_valid_env_name(""));
  }

  #[test]
  fn reserved_names() {
    assert!(is_reserved_env_name("AWS_FOO"));
    assert!(is_reserved_env_name("LAMBDA_TASK_ROOT"));
    assert!(is_reserved_env_name("_HANDLER"));
    assert!(is_reserved_env_name("TZ"));
    assert!(!is_reserved_env_name("TZ_OFFSET"));
    assert!(!is_reserved_env_name("API_KEY"));
  }

  #[test]
  fn filter_drops_and_reports() {
    let filter = EnvFilter::default();
    let vars = vec![
      ("API_KEY".to_string(), "k".to_string()),
      ("AWS_FOO".to_string(), "x".to_string()),
      ("bad-name".to_string(), "y".to_string()),
    ];
    let out = filter.apply(vars);
    assert_eq!(out.kept.len(), 1);
    assert_eq!(out.kept["API_KEY"], "k");
    assert_eq!(
      out.dropped,
      vec![
        ("AWS_FOO".to_string(), EnvRejection::Reserved),
        ("bad-name".to_string(), EnvRejection::InvalidName),
      ]
    );
  }

  #[test]
  fn prefix_restricts() {
    let filter = EnvFilter::new("APP_");
    assert!(filter.allows("APP_SECRET"));
    assert_eq!(filter.check("SECRET"), Err(EnvRejection::MissingPrefix("APP_".to_string())));
    // reserved wins over prefix
    let aws = EnvFilter::new("AWS_");
    assert_eq!(aws.check("AWS_REGION"), Err(EnvRejection::Reserved));
  }
}
