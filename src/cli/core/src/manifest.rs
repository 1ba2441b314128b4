/* src/cli/core/src/manifest.rs */

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The parts of `package.json` Nucel reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub dependencies: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
  pub fn read(project_dir: &Path) -> Result<Self> {
    let path = project_dir.join("package.json");
    let content =
      std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
  }

  pub fn has_dependency(&self, name: &str) -> bool {
    self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
  }

  /// Declared version range, runtime dependencies first.
  pub fn version_of(&self, name: &str) -> Option<&str> {
    self.dependencies.get(name).or_else(|| self.dev_dependencies.get(name)).map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_both_dependency_tables() {
    let m: PackageManifest = serde_json::from_str(
      r#"{"name":"web","dependencies":{"next":"15.1.0"},"devDependencies":{"typescript":"^5"},"scripts":{"build":"next build"}}"#,
    )
    .unwrap();
    assert_eq!(m.name.as_deref(), Some("web"));
    assert!(m.has_dependency("next"));
    assert!(m.has_dependency("typescript"));
    assert_eq!(m.version_of("typescript"), Some("^5"));
    assert!(!m.has_dependency("hono"));
  }

  #[test]
  fn missing_manifest_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = PackageManifest::read(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("package.json"));
  }
}
