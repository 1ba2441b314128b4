/* src/cli/core/src/build/adapter/sveltekit.rs */

use anyhow::Result;
use serde::Deserialize;

use super::{Adapter, AdapterContext, catch_all_route, copy_prerendered, read_optional_json};
use crate::build::files::{copy_tree, copy_tree_if_exists};
use crate::build::handler::FrameworkEntry;
use crate::build::types::{AssetSummary, Packaging, RouteDescriptor, RouteKind};
use crate::config::ProjectConfig;
use crate::detect::Framework;

pub struct SvelteKitAdapter;

/// One entry of the builder route list written next to the build output.
#[derive(Debug, Deserialize)]
struct BuilderRoute {
  id: String,
  pattern: String,
  #[serde(default)]
  page: Option<Capability>,
  #[serde(default)]
  api: Option<Capability>,
}

#[derive(Debug, Deserialize)]
struct Capability {
  #[serde(default)]
  methods: Vec<String>,
}

impl BuilderRoute {
  fn into_descriptor(self) -> RouteDescriptor {
    match (self.page, self.api) {
      (Some(page), _) => {
        let route = RouteDescriptor::new(self.id, RouteKind::Page, self.pattern);
        if page.methods.is_empty() { route } else { route.with_methods(page.methods) }
      }
      (None, Some(api)) => {
        let route = RouteDescriptor::new(self.id, RouteKind::Api, self.pattern);
        if api.methods.is_empty() { route } else { route.with_methods(api.methods) }
      }
      (None, None) => RouteDescriptor::new(self.id, RouteKind::Unknown, self.pattern),
    }
  }
}

impl Adapter for SvelteKitAdapter {
  fn name(&self) -> &'static str {
    "nucel-adapter-sveltekit"
  }

  fn framework(&self) -> Framework {
    Framework::SvelteKit
  }

  fn required_outputs(&self) -> &'static [&'static str] {
    &["server/index.js", "server/manifest.js"]
  }

  fn missing_output_hint(&self) -> &'static str {
    "run `vite build` first"
  }

  fn copy_assets(&self, ctx: &AdapterContext<'_>) -> Result<AssetSummary> {
    let static_files = copy_tree_if_exists(&ctx.source.join("client"), &ctx.paths.static_dir)?;
    let prerendered =
      copy_prerendered(&ctx.source.join("prerendered/pages"), &ctx.paths.prerendered)?;
    Ok(AssetSummary { static_files, prerendered })
  }

  fn write_server(&self, ctx: &AdapterContext<'_>) -> Result<()> {
    copy_tree(&ctx.source.join("server"), &ctx.paths.server)?;
    Ok(())
  }

  fn routes(&self, ctx: &AdapterContext<'_>) -> Result<Vec<RouteDescriptor>> {
    let routes: Option<Vec<BuilderRoute>> = read_optional_json(&ctx.source.join("routes.json"))?;
    Ok(match routes {
      Some(routes) => routes.into_iter().map(BuilderRoute::into_descriptor).collect(),
      None => vec![catch_all_route()],
    })
  }

  fn entry(&self) -> FrameworkEntry {
    FrameworkEntry::SvelteKit { server: "./index.js".into(), manifest: "./manifest.js".into() }
  }

  fn packaging(&self, _project: &ProjectConfig) -> Result<Packaging> {
    Ok(Packaging::Bundle { externals: Vec::new() })
  }
}
