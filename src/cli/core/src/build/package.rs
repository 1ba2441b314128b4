/* src/cli/core/src/build/package.rs */

// Turning server/ into a self-contained function directory: esbuild or npm install.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::shell::{resolve_node_module, run_program, which_exists};

/// Node toolchain operations the adapter pipeline needs.
pub trait Packager {
  /// Inline `source` and its imports into `outfile` (ESM, node20). `externals` stay imports.
  fn bundle(&self, server_dir: &Path, source: &str, outfile: &str, externals: &[String])
  -> Result<()>;

  /// Install production dependencies declared in `server_dir/package.json`.
  fn install(&self, server_dir: &Path) -> Result<()>;
}

/// Real toolchain: esbuild from the project's node_modules (or npx), npm for installs.
#[derive(Debug, Clone)]
pub struct NodeToolchain {
  project_root: PathBuf,
}

const ESM_REQUIRE_BANNER: &str =
  "--banner:js=import { createRequire } from 'module'; const require = createRequire(import.meta.url);";

impl NodeToolchain {
  pub fn new(project_root: impl Into<PathBuf>) -> Self {
    Self { project_root: project_root.into() }
  }

  fn esbuild(&self) -> (String, Vec<String>) {
    match resolve_node_module(&self.project_root, ".bin/esbuild") {
      Some(bin) => (bin.to_string_lossy().into_owned(), Vec::new()),
      None => ("npx".to_string(), vec!["--yes".to_string(), "esbuild".to_string()]),
    }
  }
}

/// esbuild arguments for one handler bundle.
pub(crate) fn esbuild_args(source: &str, outfile: &str, externals: &[String]) -> Vec<String> {
  let mut args = vec![
    source.to_string(),
    "--bundle".to_string(),
    "--platform=node".to_string(),
    "--target=node20".to_string(),
    "--format=esm".to_string(),
    "--log-level=warning".to_string(),
    ESM_REQUIRE_BANNER.to_string(),
  ];
  args.extend(externals.iter().map(|e| format!("--external:{e}")));
  args.push(format!("--outfile={outfile}"));
  args
}

impl Packager for NodeToolchain {
  fn bundle(
    &self,
    server_dir: &Path,
    source: &str,
    outfile: &str,
    externals: &[String],
  ) -> Result<()> {
    let (program, mut args) = self.esbuild();
    args.extend(esbuild_args(source, outfile, externals));
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run_program(server_dir, &program, &args, "esbuild", &[])?;
    let bundled = server_dir.join(source);
    std::fs::remove_file(&bundled)
      .with_context(|| format!("failed to remove {}", bundled.display()))?;
    Ok(())
  }

  fn install(&self, server_dir: &Path) -> Result<()> {
    let npm = if which_exists("npm") { "npm" } else { "pnpm" };
    run_program(
      server_dir,
      npm,
      &["install", "--omit=dev", "--no-audit", "--no-fund", "--ignore-scripts"],
      "dependency install",
      &[],
    )?;
    Ok(())
  }
}

/// `server/package.json` for install-style packaging.
pub fn server_manifest(name: &str, dependencies: &[(String, String)]) -> Result<String> {
  let deps: serde_json::Map<String, serde_json::Value> =
    dependencies.iter().map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone()))).collect();
  let manifest = serde_json::json!({
    "name": format!("{name}-server"),
    "private": true,
    "type": "module",
    "dependencies": deps,
  });
  serde_json::to_string_pretty(&manifest).context("failed to serialize server package.json")
}

#[cfg(test)]
pub(crate) mod fake {
  use std::cell::RefCell;

  use super::*;

  /// Records calls; `bundle` copies the source to the outfile.
  #[derive(Default)]
  pub struct FakePackager {
    pub bundles: RefCell<Vec<(String, Vec<String>)>>,
    pub installs: RefCell<usize>,
    pub fail_install: bool,
  }

  impl Packager for FakePackager {
    fn bundle(
      &self,
      server_dir: &Path,
      source: &str,
      outfile: &str,
      externals: &[String],
    ) -> Result<()> {
      std::fs::rename(server_dir.join(source), server_dir.join(outfile))?;
      self.bundles.borrow_mut().push((outfile.to_string(), externals.to_vec()));
      Ok(())
    }

    fn install(&self, server_dir: &Path) -> Result<()> {
      if self.fail_install {
        anyhow::bail!("dependency install exited with status 1");
      }
      std::fs::create_dir_all(server_dir.join("node_modules"))?;
      *self.installs.borrow_mut() += 1;
      Ok(())
    }
  }
}
