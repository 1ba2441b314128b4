/* src/cli/core/src/build/adapter/react_router.rs */

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::Deserialize;

use super::{Adapter, AdapterContext, catch_all_route, path_to_pattern, read_optional_json};
use crate::build::files::{copy_tree, copy_tree_if_exists};
use crate::build::handler::FrameworkEntry;
use crate::build::types::{AssetSummary, Packaging, RouteDescriptor, RouteKind};
use crate::config::ProjectConfig;
use crate::detect::Framework;

pub struct ReactRouterAdapter;

/// Runtime packages the rendered handler imports directly.
const RUNTIME_PACKAGES: &[&str] = &["react-router", "@react-router/node"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestRoute {
  id: String,
  #[serde(default)]
  parent_id: Option<String>,
  #[serde(default)]
  path: Option<String>,
  #[serde(default)]
  index: bool,
  #[serde(default)]
  has_component: bool,
  #[serde(default)]
  has_loader: bool,
  #[serde(default)]
  has_action: bool,
}

/// Full URL path of `id`, joining `path` segments up the parent chain.
fn full_path(routes: &BTreeMap<String, ManifestRoute>, id: &str) -> String {
  let mut segments = Vec::new();
  let mut current = routes.get(id);
  let mut depth = 0;
  while let Some(route) = current {
    if let Some(path) = route.path.as_deref().filter(|p| !p.is_empty()) {
      segments.push(path.trim_matches('/').to_string());
    }
    depth += 1;
    // guards against a parent cycle in a malformed manifest
    if depth > routes.len() {
      break;
    }
    current = route.parent_id.as_deref().and_then(|p| routes.get(p));
  }
  segments.reverse();
  let joined = segments.into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/");
  format!("/{joined}")
}

fn descriptors(routes: &BTreeMap<String, ManifestRoute>) -> Vec<RouteDescriptor> {
  routes
    .values()
    // layout routes without a path or index contribute only to their children
    .filter(|r| r.path.is_some() || r.index)
    .map(|r| {
      let path = full_path(routes, &r.id);
      if r.has_component {
        RouteDescriptor::new(path.clone(), RouteKind::Page, path_to_pattern(&path))
      } else {
        let mut methods = Vec::new();
        if r.has_loader {
          methods.extend(["GET", "HEAD"]);
        }
        if r.has_action {
          methods.extend(["POST", "PUT", "PATCH", "DELETE"]);
        }
        let route = RouteDescriptor::new(path.clone(), RouteKind::Api, path_to_pattern(&path));
        if methods.is_empty() { route } else { route.with_methods(methods) }
      }
    })
    .collect()
}

impl Adapter for ReactRouterAdapter {
  fn name(&self) -> &'static str {
    "nucel-adapter-react-router"
  }

  fn framework(&self) -> Framework {
    Framework::ReactRouter
  }

  fn required_outputs(&self) -> &'static [&'static str] {
    &["server/index.js"]
  }

  fn missing_output_hint(&self) -> &'static str {
    "run `react-router build` first"
  }

  fn copy_assets(&self, ctx: &AdapterContext<'_>) -> Result<AssetSummary> {
    let static_files = copy_tree_if_exists(&ctx.source.join("client"), &ctx.paths.static_dir)?;
    Ok(AssetSummary { static_files, prerendered: Vec::new() })
  }

  fn write_server(&self, ctx: &AdapterContext<'_>) -> Result<()> {
    copy_tree(&ctx.source.join("server"), &ctx.paths.server.join("build"))?;
    Ok(())
  }

  fn routes(&self, ctx: &AdapterContext<'_>) -> Result<Vec<RouteDescriptor>> {
    let manifest: Option<BTreeMap<String, ManifestRoute>> =
      read_optional_json(&ctx.source.join("server/routes.json"))?;
    Ok(match manifest {
      Some(routes) => descriptors(&routes),
      None => vec![catch_all_route()],
    })
  }

  fn entry(&self) -> FrameworkEntry {
    FrameworkEntry::ReactRouter { build: "./build/index.js".into() }
  }

  /// The server build keeps its dependencies as bare imports, so every runtime
  /// dependency of the project is installed next to it.
  fn packaging(&self, project: &ProjectConfig) -> Result<Packaging> {
    let manifest = &project.manifest;
    let Some(router) = manifest.version_of("react-router") else {
      bail!("react-router is not declared in package.json");
    };
    let mut dependencies: BTreeMap<String, String> = manifest.dependencies.clone();
    for package in RUNTIME_PACKAGES {
      let version = manifest.version_of(package).unwrap_or(router);
      dependencies.entry((*package).to_string()).or_insert_with(|| version.to_string());
    }
    Ok(Packaging::Install { dependencies: dependencies.into_iter().collect() })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn route(id: &str, parent: Option<&str>, path: Option<&str>, component: bool) -> ManifestRoute {
    ManifestRoute {
      id: id.into(),
      parent_id: parent.map(Into::into),
      path: path.map(Into::into),
      index: false,
      has_component: component,
      has_loader: true,
      has_action: false,
    }
  }

  #[test]
  fn paths_join_along_parent_chain() {
    let routes: BTreeMap<String, ManifestRoute> = [
      route("root", None, Some(""), true),
      route("routes/dashboard", Some("root"), Some("dashboard"), true),
      route("routes/dashboard.$id", Some("routes/dashboard"), Some(":id"), true),
    ]
    .into_iter()
    .map(|r| (r.id.clone(), r))
    .collect();
    assert_eq!(full_path(&routes, "routes/dashboard.$id"), "/dashboard/:id");
    assert_eq!(full_path(&routes, "root"), "/");
  }

  #[test]
  fn resource_routes_are_api() {
    let mut action = route("routes/api.items", Some("root"), Some("api/items"), false);
    action.has_action = true;
    let routes: BTreeMap<String, ManifestRoute> =
      [route("root", None, Some(""), true), action]
        .into_iter()
        .map(|r| (r.id.clone(), r))
        .collect();
    let out = descriptors(&routes);
    let api = out.iter().find(|r| r.id == "/api/items").unwrap();
    assert_eq!(api.kind, RouteKind::Api);
    assert_eq!(api.methods, vec!["DELETE", "GET", "HEAD", "PATCH", "POST", "PUT"]);
    assert_eq!(api.pattern, "^/api/items/?$");
  }
}
