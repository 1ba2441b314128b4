/* src/cli/core/src/clean.rs */

// `nucel clean` command: removes the deployment bundle and Nucel's working directory.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::build::files::{normalize_path, remove_generated_dir};
use crate::build::types::DEFAULT_OUT_DIR;
use crate::config::load_user_config;
use crate::ui;

/// Nucel's scratch directory inside the project.
pub const WORK_DIR: &str = ".nucel";

/// Remove generated artifacts. Works without package.json so a broken project can be reset.
pub fn run_clean(root: &Path) -> Result<()> {
  ui::arrow("cleaning project");

  let user = load_user_config(root, false)?.map(|loaded| loaded.config);
  let out_dir = user
    .as_ref()
    .and_then(|c| c.adapter.out_dir.clone())
    .unwrap_or_else(|| DEFAULT_OUT_DIR.to_string());
  let backend = user.as_ref().and_then(|c| c.pulumi.backend_url.clone());

  delete_dir_if_exists(root, &root.join(out_dir))?;

  let work_dir = root.join(WORK_DIR);
  match local_backend_dir(root, backend.as_deref()) {
    Some(state) if normalize_path(&state).starts_with(normalize_path(&work_dir)) => {
      ui::warn(&format!(
        "keeping {} -- it holds Pulumi state for {}",
        work_dir.display(),
        state.display()
      ));
    }
    _ => delete_dir_if_exists(root, &work_dir)?,
  }

  ui::ok("clean complete");
  Ok(())
}

/// Directory of a `file://` backend, resolved against the project root.
fn local_backend_dir(root: &Path, backend: Option<&str>) -> Option<PathBuf> {
  let path = backend?.strip_prefix("file://")?;
  let path = Path::new(path);
  Some(if path.is_absolute() { path.to_path_buf() } else { root.join(path) })
}

fn delete_dir_if_exists(root: &Path, path: &Path) -> Result<()> {
  if remove_generated_dir(root, path)? {
    ui::detail(&format!("deleted {}", path.display()));
  }
  Ok(())
}
