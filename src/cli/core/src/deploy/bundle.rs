/* src/cli/core/src/deploy/bundle.rs */

use std::path::Path;

use anyhow::{Result, bail};

use crate::build::types::{BundleLayout, BundlePaths};

/// Check the bundle shape the program relies on. Nothing is declared when this fails.
pub fn validate_bundle(dir: &Path, layout: &BundleLayout) -> Result<BundlePaths> {
  let paths = BundlePaths::new(dir);
  if !paths.root.is_dir() {
    bail!("bundle not found at {} -- run `nucel build` first", paths.root.display());
  }
  for required in [&paths.server, &paths.static_dir] {
    if !required.is_dir() {
      bail!("invalid bundle: expected directory {}", required.display());
    }
  }
  let entry = paths.entry(layout);
  if !entry.is_file() {
    bail!("invalid bundle: expected entry point {}", entry.display());
  }
  Ok(paths)
}
