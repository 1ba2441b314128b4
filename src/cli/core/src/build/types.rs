/* src/cli/core/src/build/types.rs */

// Shared types for the build pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::AdapterSection;
use crate::detect::Framework;

pub const DEFAULT_OUT_DIR: &str = ".nucel/output";
pub const METADATA_FILE: &str = "metadata.json";
pub const METADATA_VERSION: u32 = 1;

pub const PAGE_METHODS: &[&str] = &["GET", "HEAD"];
pub const ALL_METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Options every adapter honours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOptions {
  /// Bundle directory, relative to the project root.
  pub out_dir: String,
  /// Only variables with this prefix are handed to the function.
  pub env_prefix: String,
  pub precompress: bool,
  pub polyfill: bool,
}

impl Default for AdapterOptions {
  fn default() -> Self {
    Self {
      out_dir: DEFAULT_OUT_DIR.to_string(),
      env_prefix: String::new(),
      precompress: false,
      polyfill: true,
    }
  }
}

impl AdapterOptions {
  pub fn from_section(section: &AdapterSection) -> Self {
    let defaults = Self::default();
    Self {
      out_dir: section.out_dir.clone().unwrap_or(defaults.out_dir),
      env_prefix: section.env_prefix.clone().unwrap_or(defaults.env_prefix),
      precompress: section.precompress.unwrap_or(defaults.precompress),
      polyfill: section.polyfill.unwrap_or(defaults.polyfill),
    }
  }
}

/// What the provisioning layer expects inside a bundle for one framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleLayout {
  /// Entry point file name inside `server/`.
  pub entry_file: &'static str,
  pub handler_export: &'static str,
  pub has_prerendered: bool,
}

impl BundleLayout {
  pub fn for_framework(framework: Framework) -> Self {
    match framework {
      Framework::SvelteKit => {
        Self { entry_file: "handler.mjs", handler_export: "handler", has_prerendered: true }
      }
      Framework::Next => {
        Self { entry_file: "index.mjs", handler_export: "handler", has_prerendered: true }
      }
      Framework::ReactRouter | Framework::Hono | Framework::Unknown => {
        Self { entry_file: "index.mjs", handler_export: "handler", has_prerendered: false }
      }
    }
  }

  /// Lambda handler string, e.g. `index.handler`.
  pub fn lambda_handler(&self) -> String {
    let stem = self.entry_file.rsplit_once('.').map_or(self.entry_file, |(s, _)| s);
    format!("{stem}.{}", self.handler_export)
  }
}

/// Resolved directories of one bundle.
#[derive(Debug, Clone)]
pub struct BundlePaths {
  pub root: PathBuf,
  pub server: PathBuf,
  pub static_dir: PathBuf,
  pub prerendered: PathBuf,
}

impl BundlePaths {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    Self {
      server: root.join("server"),
      static_dir: root.join("static"),
      prerendered: root.join("prerendered"),
      root,
    }
  }

  pub fn metadata(&self) -> PathBuf {
    self.root.join(METADATA_FILE)
  }

  pub fn entry(&self, layout: &BundleLayout) -> PathBuf {
    self.server.join(layout.entry_file)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
  Page,
  Api,
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: RouteKind,
  pub pattern: String,
  pub methods: Vec<String>,
}

impl RouteDescriptor {
  pub fn new(id: impl Into<String>, kind: RouteKind, pattern: impl Into<String>) -> Self {
    let methods = match kind {
      RouteKind::Page => PAGE_METHODS,
      RouteKind::Api | RouteKind::Unknown => ALL_METHODS,
    };
    Self {
      id: id.into(),
      kind,
      pattern: pattern.into(),
      methods: methods.iter().map(|m| (*m).to_string()).collect(),
    }
  }

  pub fn with_methods<I, S>(mut self, methods: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut methods: Vec<String> =
      methods.into_iter().map(|m| m.into().to_ascii_uppercase()).collect();
    methods.sort();
    methods.dedup();
    self.methods = methods;
    self
  }
}

/// `metadata.json`: diagnostics only, never read by the provisioning layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildMetadata {
  pub version: u32,
  pub timestamp: String,
  pub builder: String,
  pub routes: Vec<RouteDescriptor>,
  pub prerendered: Vec<String>,
}

impl BuildMetadata {
  pub fn read(path: &Path) -> Result<Self> {
    let content =
      std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
  }
}

/// How the server directory becomes self-contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packaging {
  /// Inline the handler and its imports into the entry file; `externals` stay as imports.
  Bundle { externals: Vec<String> },
  /// Declare the runtime as dependencies and install them into `server/node_modules`.
  Install { dependencies: Vec<(String, String)> },
}

#[derive(Debug, Clone, Default)]
pub struct AssetSummary {
  pub static_files: usize,
  pub prerendered: Vec<String>,
}
