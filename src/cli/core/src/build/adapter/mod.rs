/* src/cli/core/src/build/adapter/mod.rs */

// Framework adapters and the pipeline they share.

mod hono;
mod next;
mod react_router;
mod sveltekit;


use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;

use super::files::{copy_tree_if_exists, list_files, precompress, prerendered_route, reset_bundle};
use super::handler::{FrameworkEntry, HANDLER_SOURCE_FILE, HandlerSource};
use super::package::{Packager, server_manifest};
use super::types::{
  AssetSummary, BuildMetadata, BundleLayout, BundlePaths, METADATA_VERSION, Packaging,
  RouteDescriptor, RouteKind,
};
use crate::config::ProjectConfig;
use crate::detect::Framework;

pub use hono::HonoAdapter;
pub use next::NextAdapter;
pub use react_router::ReactRouterAdapter;
pub use sveltekit::SvelteKitAdapter;

/// Everything an adapter step can see.
pub struct AdapterContext<'a> {
  pub project: &'a ProjectConfig,
  /// Framework build output.
  pub source: PathBuf,
  pub paths: BundlePaths,
}

pub trait Adapter {
  /// Builder identity recorded in metadata.json.
  fn name(&self) -> &'static str;

  fn framework(&self) -> Framework;

  fn layout(&self) -> BundleLayout {
    BundleLayout::for_framework(self.framework())
  }

  fn source_dir(&self, project: &ProjectConfig) -> PathBuf {
    project.output_path()
  }

  /// Paths (relative to the build output) that must exist before the bundle is touched.
  fn required_outputs(&self) -> &'static [&'static str] {
    &[]
  }

  /// Hint appended to the missing-output error.
  fn missing_output_hint(&self) -> &'static str {
    "run the framework build first"
  }

  fn copy_assets(&self, ctx: &AdapterContext<'_>) -> Result<AssetSummary>;

  /// Copy the framework's server runtime next to the rendered handler.
  fn write_server(&self, ctx: &AdapterContext<'_>) -> Result<()>;

  fn routes(&self, ctx: &AdapterContext<'_>) -> Result<Vec<RouteDescriptor>>;

  fn entry(&self) -> FrameworkEntry;

  fn handler(&self, project: &ProjectConfig) -> HandlerSource {
    HandlerSource::new(self.entry())
      .env_prefix(project.adapter.env_prefix.clone())
      .polyfill(project.adapter.polyfill)
      .streaming(project.lambda.streaming)
  }

  fn packaging(&self, project: &ProjectConfig) -> Result<Packaging>;
}

pub fn adapter_for(framework: Framework) -> Result<Box<dyn Adapter>> {
  Ok(match framework {
    Framework::Next => Box::new(NextAdapter),
    Framework::SvelteKit => Box::new(SvelteKitAdapter),
    Framework::ReactRouter => Box::new(ReactRouterAdapter),
    Framework::Hono => Box::new(HonoAdapter),
    Framework::Unknown => bail!("no adapter for an unknown framework"),
  })
}

/// Result of one adapter run.
#[derive(Debug)]
pub struct AdapterReport {
  pub paths: BundlePaths,
  pub layout: BundleLayout,
  pub routes: Vec<RouteDescriptor>,
  pub assets: AssetSummary,
  pub compressed: usize,
}

/// Transform the framework build output into a bundle under `project.adapter.out_dir`.
pub fn run_adapter(project: &ProjectConfig, packager: &dyn Packager) -> Result<AdapterReport> {
  let adapter = adapter_for(project.framework)?;
  let layout = adapter.layout();
  let source = adapter.source_dir(project);
  verify_source(adapter.as_ref(), project, &source)?;

  let paths = BundlePaths::new(project.bundle_path());
  reset_bundle(&project.root, &paths, layout.has_prerendered)?;
  let ctx = AdapterContext { project, source, paths };

  let assets = adapter.copy_assets(&ctx)?;
  tracing::debug!(
    static_files = assets.static_files,
    prerendered = assets.prerendered.len(),
    "assets copied"
  );

  let handler = adapter.handler(project).render();
  let handler_path = ctx.paths.server.join(HANDLER_SOURCE_FILE);
  std::fs::write(&handler_path, handler)
    .with_context(|| format!("failed to write {}", handler_path.display()))?;

  adapter.write_server(&ctx)?;
  let routes = adapter.routes(&ctx)?;

  match adapter.packaging(project)? {
    Packaging::Bundle { externals } => {
      packager.bundle(&ctx.paths.server, HANDLER_SOURCE_FILE, layout.entry_file, &externals)?;
    }
    Packaging::Install { dependencies } => {
      let entry = ctx.paths.entry(&layout);
      std::fs::rename(&handler_path, &entry)
        .with_context(|| format!("failed to write {}", entry.display()))?;
      let manifest_path = ctx.paths.server.join("package.json");
      std::fs::write(&manifest_path, server_manifest(&project.name, &dependencies)?)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
      packager.install(&ctx.paths.server)?;
    }
  }

  let metadata = BuildMetadata {
    version: METADATA_VERSION,
    timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    builder: format!("{}@{}", adapter.name(), env!("CARGO_PKG_VERSION")),
    routes: routes.clone(),
    prerendered: assets.prerendered.clone(),
  };
  let metadata_path = ctx.paths.metadata();
  std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)
    .with_context(|| format!("failed to write {}", metadata_path.display()))?;

  let mut compressed = 0;
  if project.adapter.precompress {
    compressed += precompress(&ctx.paths.static_dir)?;
    if layout.has_prerendered {
      compressed += precompress(&ctx.paths.prerendered)?;
    }
  }

  Ok(AdapterReport { paths: ctx.paths, layout, routes, assets, compressed })
}

fn verify_source(adapter: &dyn Adapter, project: &ProjectConfig, source: &Path) -> Result<()> {
  let fw = project.framework.display_name();
  if !source.is_dir() {
    bail!(
      "{fw} build output not found at {} -- {}",
      source.display(),
      adapter.missing_output_hint()
    );
  }
  for required in adapter.required_outputs() {
    let path = source.join(required);
    if !path.exists() {
      bail!("{fw} build output is missing {} -- {}", path.display(), adapter.missing_output_hint());
    }
  }
  Ok(())
}

/// Read an optional JSON metadata file from the build output.
pub(super) fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
  if !path.is_file() {
    tracing::debug!(path = %path.display(), "route metadata not present");
    return Ok(None);
  }
  let content =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  serde_json::from_str(&content)
    .map(Some)
    .with_context(|| format!("failed to parse {}", path.display()))
}

/// Copy prerendered HTML and return the URL paths it serves, sorted.
pub(super) fn copy_prerendered(src: &Path, dst: &Path) -> Result<Vec<String>> {
  copy_tree_if_exists(src, dst)?;
  let mut routes: Vec<String> = list_files(dst)?
    .iter()
    .filter(|p| p.extension().is_some_and(|e| e == "html"))
    .map(|p| prerendered_route(p))
    .collect();
  routes.sort();
  routes.dedup();
  Ok(routes)
}

/// Single route covering every path, used when the framework exposes no route list.
pub(super) fn catch_all_route() -> RouteDescriptor {
  RouteDescriptor::new("/*", RouteKind::Unknown, "^/.*$")
}

/// `/users/:id/*` style path to an anchored regex.
pub(super) fn path_to_pattern(path: &str) -> String {
  let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
  if segments.is_empty() {
    return "^/$".to_string();
  }
  let mut pattern = String::from("^");
  for segment in segments {
    if segment == "*" {
      pattern.push_str("(?:/(.*))?");
    } else if let Some(param) = segment.strip_prefix(':') {
      if param.ends_with('?') {
        pattern.push_str("(?:/([^/]+?))?");
      } else {
        pattern.push_str("/([^/]+?)");
      }
    } else {
      pattern.push('/');
      pattern.push_str(&regex::escape(segment));
    }
  }
  pattern.push_str("/?$");
  pattern
}
