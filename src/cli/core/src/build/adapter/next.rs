/* src/cli/core/src/build/adapter/next.rs */

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

use super::{Adapter, AdapterContext, catch_all_route, read_optional_json};
use crate::build::files::{copy_tree, copy_tree_if_exists};
use crate::build::handler::FrameworkEntry;
use crate::build::types::{AssetSummary, Packaging, RouteDescriptor, RouteKind};
use crate::config::ProjectConfig;
use crate::detect::Framework;

pub struct NextAdapter;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutesManifest {
  #[serde(default)]
  static_routes: Vec<ManifestRoute>,
  #[serde(default)]
  dynamic_routes: Vec<ManifestRoute>,
}

#[derive(Debug, Deserialize)]
struct ManifestRoute {
  page: String,
  regex: String,
}

#[derive(Debug, Default, Deserialize)]
struct PrerenderManifest {
  #[serde(default)]
  routes: BTreeMap<String, serde_json::Value>,
}

/// HTML file Next writes for a prerendered route, searched in app/ then pages/.
fn prerendered_html(source: &Path, route: &str) -> Option<std::path::PathBuf> {
  let stem = if route == "/" { "/index" } else { route };
  ["server/app", "server/pages"]
    .iter()
    .map(|dir| source.join(format!("{dir}{stem}.html")))
    .find(|p| p.is_file())
}

impl Adapter for NextAdapter {
  fn name(&self) -> &'static str {
    "nucel-adapter-next"
  }

  fn framework(&self) -> Framework {
    Framework::Next
  }

  fn required_outputs(&self) -> &'static [&'static str] {
    &["standalone/server.js"]
  }

  fn missing_output_hint(&self) -> &'static str {
    "run `next build` with `output: \"standalone\"` in next.config"
  }

  fn copy_assets(&self, ctx: &AdapterContext<'_>) -> Result<AssetSummary> {
    let static_dir = &ctx.paths.static_dir;
    let mut files =
      copy_tree_if_exists(&ctx.source.join("static"), &static_dir.join("_next/static"))?;
    files += copy_tree_if_exists(&ctx.project.root.join("public"), static_dir)?;

    let manifest: PrerenderManifest =
      read_optional_json(&ctx.source.join("prerender-manifest.json"))?.unwrap_or_default();
    let mut prerendered = Vec::new();
    for route in manifest.routes.keys() {
      let Some(html) = prerendered_html(&ctx.source, route) else { continue };
      let rel = if route == "/" {
        "index.html".to_string()
      } else {
        format!("{}.html", route.trim_start_matches('/'))
      };
      let dst = ctx.paths.prerendered.join(rel);
      if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
      }
      std::fs::copy(&html, &dst)?;
      prerendered.push(route.clone());
    }
    Ok(AssetSummary { static_files: files, prerendered })
  }

  fn write_server(&self, ctx: &AdapterContext<'_>) -> Result<()> {
    copy_tree(&ctx.source.join("standalone"), &ctx.paths.server)?;
    Ok(())
  }

  fn routes(&self, ctx: &AdapterContext<'_>) -> Result<Vec<RouteDescriptor>> {
    let Some(manifest) =
      read_optional_json::<RoutesManifest>(&ctx.source.join("routes-manifest.json"))?
    else {
      return Ok(vec![catch_all_route()]);
    };
    let routes = manifest
      .static_routes
      .iter()
      .chain(&manifest.dynamic_routes)
      .map(|r| {
        let kind = if r.page == "/api" || r.page.starts_with("/api/") {
          RouteKind::Api
        } else {
          RouteKind::Page
        };
        RouteDescriptor::new(r.page.clone(), kind, r.regex.clone())
      })
      .collect();
    Ok(routes)
  }

  fn entry(&self) -> FrameworkEntry {
    FrameworkEntry::NextStandalone { server: "./server.js".into() }
  }

  fn packaging(&self, _project: &ProjectConfig) -> Result<Packaging> {
    Ok(Packaging::Bundle { externals: vec!["next".into()] })
  }
}
