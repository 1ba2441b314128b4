/* src/cli/core/src/detect.rs */

// Framework detection from package.json plus config files in the project root.

use std::fmt;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::manifest::PackageManifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
  Next,
  #[serde(rename = "sveltekit")]
  SvelteKit,
  ReactRouter,
  Hono,
  Unknown,
}

/// Detection order; the first match wins.
pub const SUPPORTED: [Framework; 4] =
  [Framework::Next, Framework::SvelteKit, Framework::ReactRouter, Framework::Hono];

impl Framework {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Next => "next",
      Self::SvelteKit => "sveltekit",
      Self::ReactRouter => "react-router",
      Self::Hono => "hono",
      Self::Unknown => "unknown",
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      Self::Next => "Next.js",
      Self::SvelteKit => "SvelteKit",
      Self::ReactRouter => "React Router",
      Self::Hono => "Hono",
      Self::Unknown => "unknown",
    }
  }

  pub fn signature_dependencies(self) -> &'static [&'static str] {
    match self {
      Self::Next => &["next"],
      Self::SvelteKit => &["@sveltejs/kit"],
      Self::ReactRouter => &["react-router", "@react-router/dev"],
      Self::Hono => &["hono"],
      Self::Unknown => &[],
    }
  }

  pub fn config_files(self) -> &'static [&'static str] {
    match self {
      Self::Next => &["next.config.js", "next.config.mjs", "next.config.ts"],
      Self::SvelteKit => &["svelte.config.js", "svelte.config.mjs", "svelte.config.ts"],
      Self::ReactRouter => &["react-router.config.ts", "react-router.config.js"],
      Self::Hono => &["tsconfig.json", "wrangler.toml", "src/index.ts", "src/index.js"],
      Self::Unknown => &[],
    }
  }

  pub fn default_build_command(self) -> &'static str {
    match self {
      Self::Next => "next build",
      Self::SvelteKit => "vite build",
      Self::ReactRouter => "react-router build",
      Self::Hono => "npm run build",
      Self::Unknown => "npm run build",
    }
  }

  pub fn default_output_directory(self) -> &'static str {
    match self {
      Self::Next => ".next",
      Self::SvelteKit => ".svelte-kit/output",
      Self::ReactRouter => "build",
      Self::Hono => "dist",
      Self::Unknown => "dist",
    }
  }

  /// Prefix the framework uses for variables exposed to client code.
  pub fn public_env_prefix(self) -> Option<&'static str> {
    match self {
      Self::Next => Some("NEXT_PUBLIC_"),
      Self::SvelteKit => Some("PUBLIC_"),
      Self::ReactRouter => Some("VITE_"),
      Self::Hono | Self::Unknown => None,
    }
  }

  fn matches(self, manifest: &PackageManifest, project_dir: &Path) -> bool {
    self.signature_dependencies().iter().any(|d| manifest.has_dependency(d))
      && self.config_files().iter().any(|f| project_dir.join(f).is_file())
  }
}

impl fmt::Display for Framework {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for Framework {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "next" | "nextjs" | "next.js" => Ok(Self::Next),
      "sveltekit" | "svelte-kit" => Ok(Self::SvelteKit),
      "react-router" | "reactrouter" => Ok(Self::ReactRouter),
      "hono" => Ok(Self::Hono),
      other => anyhow::bail!(
        "unsupported framework \"{other}\" (expected next, sveltekit, react-router or hono)"
      ),
    }
  }
}

/// Classify the project in `project_dir`. Fails only when package.json is missing or invalid.
pub fn detect_framework(project_dir: &Path) -> Result<Framework> {
  let manifest = PackageManifest::read(project_dir)?;
  Ok(detect_from_manifest(&manifest, project_dir))
}

pub fn detect_from_manifest(manifest: &PackageManifest, project_dir: &Path) -> Framework {
  let found = SUPPORTED.into_iter().find(|fw| fw.matches(manifest, project_dir));
  tracing::debug!(framework = ?found, dir = %project_dir.display(), "framework detection");
  found.unwrap_or(Framework::Unknown)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn project(package_json: &str, files: &[&str]) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("package.json"), package_json).unwrap();
    for f in files {
      let path = tmp.path().join(f);
      std::fs::create_dir_all(path.parent().unwrap()).unwrap();
      std::fs::write(path, "").unwrap();
    }
    tmp
  }

  #[test]
  fn detects_next() {
    let tmp = project(r#"{"dependencies":{"react":"19","next":"15"}}"#, &["next.config.ts"]);
    assert_eq!(detect_framework(tmp.path()).unwrap(), Framework::Next);
  }

  #[test]
  fn dependency_order_does_not_matter() {
    let a = project(
      r#"{"dependencies":{"@sveltejs/kit":"2","zod":"3","axios":"1"}}"#,
      &["svelte.config.js"],
    );
    let b = project(
      r#"{"dependencies":{"zod":"3","axios":"1","@sveltejs/kit":"2"}}"#,
      &["svelte.config.js"],
    );
    assert_eq!(detect_framework(a.path()).unwrap(), Framework::SvelteKit);
    assert_eq!(detect_framework(b.path()).unwrap(), Framework::SvelteKit);
  }

  #[test]
  fn dependency_without_config_file_is_unknown() {
    let tmp = project(r#"{"dependencies":{"next":"15"}}"#, &[]);
    assert_eq!(detect_framework(tmp.path()).unwrap(), Framework::Unknown);
  }

  #[test]
  fn dev_dependency_counts() {
    let tmp = project(
      r#"{"devDependencies":{"@react-router/dev":"7"}}"#,
      &["react-router.config.ts"],
    );
    assert_eq!(detect_framework(tmp.path()).unwrap(), Framework::ReactRouter);
  }

  #[test]
  fn priority_order_prefers_next_over_hono() {
    let tmp = project(
      r#"{"dependencies":{"hono":"4","next":"15"}}"#,
      &["next.config.js", "tsconfig.json"],
    );
    assert_eq!(detect_framework(tmp.path()).unwrap(), Framework::Next);
  }

  #[test]
  fn hono_with_entry_file() {
    let tmp = project(r#"{"dependencies":{"hono":"4"}}"#, &["src/index.ts"]);
    assert_eq!(detect_framework(tmp.path()).unwrap(), Framework::Hono);
  }

  #[test]
  fn invalid_manifest_fails() {
    let tmp = project("{ not json", &[]);
    assert!(detect_framework(tmp.path()).is_err());
  }

  #[test]
  fn parse_framework_names() {
    assert_eq!("Next.js".parse::<Framework>().unwrap(), Framework::Next);
    assert_eq!("react-router".parse::<Framework>().unwrap(), Framework::ReactRouter);
    assert!("remix".parse::<Framework>().is_err());
  }
}
