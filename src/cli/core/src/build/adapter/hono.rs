/* src/cli/core/src/build/adapter/hono.rs */

use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;

use super::{Adapter, AdapterContext, catch_all_route, path_to_pattern, read_optional_json};
use crate::build::files::{copy_tree, copy_tree_if_exists};
use crate::build::handler::FrameworkEntry;
use crate::build::types::{AssetSummary, Packaging, RouteDescriptor, RouteKind};
use crate::config::ProjectConfig;
use crate::detect::Framework;

pub struct HonoAdapter;

const ENTRY: &str = "index.js";

fn app_export_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    // `export const app`, `export { app }`, `export { server as app }`
    Regex::new(r"export\s+(?:const|let|var)\s+app\b|export\s*\{[^}]*\b(?:as\s+)?app\s*(?:,[^}]*)?\}")
      .unwrap()
  })
}

/// `app.routes` entry as dumped by the build.
#[derive(Debug, Deserialize)]
struct HonoRoute {
  method: String,
  path: String,
}

pub(super) fn exports_app(source: &str) -> bool {
  app_export_re().is_match(source)
}

fn descriptors(routes: Vec<HonoRoute>) -> Vec<RouteDescriptor> {
  let mut by_path: BTreeMap<String, Vec<String>> = BTreeMap::new();
  for route in routes {
    let methods = by_path.entry(route.path).or_default();
    if route.method.eq_ignore_ascii_case("ALL") {
      methods.extend(crate::build::types::ALL_METHODS.iter().map(|m| (*m).to_string()));
    } else {
      methods.push(route.method);
    }
  }
  by_path
    .into_iter()
    .map(|(path, methods)| {
      RouteDescriptor::new(path.clone(), RouteKind::Api, path_to_pattern(&path))
        .with_methods(methods)
    })
    .collect()
}

impl Adapter for HonoAdapter {
  fn name(&self) -> &'static str {
    "nucel-adapter-hono"
  }

  fn framework(&self) -> Framework {
    Framework::Hono
  }

  fn required_outputs(&self) -> &'static [&'static str] {
    &[ENTRY]
  }

  fn missing_output_hint(&self) -> &'static str {
    "compile the app so that dist/index.js exports `app`"
  }

  fn copy_assets(&self, ctx: &AdapterContext<'_>) -> Result<AssetSummary> {
    let static_files =
      copy_tree_if_exists(&ctx.project.root.join("public"), &ctx.paths.static_dir)?;
    Ok(AssetSummary { static_files, prerendered: Vec::new() })
  }

  fn write_server(&self, ctx: &AdapterContext<'_>) -> Result<()> {
    let entry = ctx.source.join(ENTRY);
    let content = std::fs::read_to_string(&entry)
      .with_context(|| format!("failed to read {}", entry.display()))?;
    if !exports_app(&content) {
      bail!(
        "{} does not export a named `app` -- add `export const app = new Hono()`",
        entry.display()
      );
    }
    copy_tree(&ctx.source, &ctx.paths.server.join("app"))?;
    Ok(())
  }

  fn routes(&self, ctx: &AdapterContext<'_>) -> Result<Vec<RouteDescriptor>> {
    let routes: Option<Vec<HonoRoute>> = read_optional_json(&ctx.source.join("routes.json"))?;
    Ok(match routes {
      Some(routes) if !routes.is_empty() => descriptors(routes),
      _ => vec![catch_all_route()],
    })
  }

  fn entry(&self) -> FrameworkEntry {
    FrameworkEntry::Hono { app: "./app/index.js".into() }
  }

  fn packaging(&self, _project: &ProjectConfig) -> Result<Packaging> {
    Ok(Packaging::Bundle { externals: Vec::new() })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn recognizes_app_exports() {
    assert!(exports_app("const x = 1;\nexport const app = new Hono();"));
    assert!(exports_app("export { app };"));
    assert!(exports_app("export { server as app, other };"));
    assert!(!exports_app("export default app;"));
    assert!(!exports_app("export const application = 1;"));
  }

  #[test]
  fn groups_routes_by_path() {
    let routes = vec![
      HonoRoute { method: "GET".into(), path: "/items/:id".into() },
      HonoRoute { method: "DELETE".into(), path: "/items/:id".into() },
      HonoRoute { method: "POST".into(), path: "/items".into() },
    ];
    let out = descriptors(routes);
    assert_eq!(out.len(), 2);
    assert_eq!(out[1].id, "/items/:id");
    assert_eq!(out[1].methods, vec!["DELETE", "GET"]);
    assert!(out.iter().all(|r| r.kind == RouteKind::Api));
  }
}
