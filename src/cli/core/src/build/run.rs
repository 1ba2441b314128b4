/* src/cli/core/src/build/run.rs */

// `nucel build`: framework build (3 steps) followed by the adapter.

use std::time::Instant;

use anyhow::Result;

use super::adapter::{AdapterReport, run_adapter};
use super::files::dir_size;
use super::package::Packager;
use crate::config::ProjectConfig;
use crate::shell::run_command;
use crate::ui;

/// Run the project's own build command with the resolved environment.
pub fn run_framework_build(project: &ProjectConfig) -> Result<()> {
  let env: Vec<(&str, &str)> =
    project.environment.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
  run_command(&project.root, &project.build_command, "framework build", &env)
}

pub fn print_report(project: &ProjectConfig, report: &AdapterReport) -> Result<()> {
  let root = &report.paths.root;
  let rel = root.strip_prefix(&project.root).unwrap_or(root);
  ui::detail_ok(&format!(
    "{}/server/{}  {}",
    rel.display(),
    report.layout.entry_file,
    ui::format_size(dir_size(&report.paths.server)?)
  ));
  ui::detail_ok(&format!("{} static files", report.assets.static_files));
  if report.layout.has_prerendered {
    ui::detail_ok(&format!("{} prerendered pages", report.assets.prerendered.len()));
  }
  if report.compressed > 0 {
    ui::detail_ok(&format!("{} files precompressed", report.compressed));
  }
  Ok(())
}

pub fn run_build(project: &ProjectConfig, packager: &dyn Packager) -> Result<AdapterReport> {
  let started = Instant::now();

  // [1/3] Framework build
  ui::step(1, 3, &format!("Building {}", project.framework.display_name()));
  run_framework_build(project)?;
  ui::blank();

  // [2/3] Adapter
  ui::step(2, 3, "Adapting build output");
  let report = run_adapter(project, packager)?;
  print_report(project, &report)?;
  ui::blank();

  // [3/3] Routes
  ui::step(3, 3, "Collecting routes");
  for route in &report.routes {
    ui::detail(&format!("{:<8}{}", format!("{:?}", route.kind).to_lowercase(), route.id));
  }
  ui::detail_ok("metadata.json");
  ui::blank();

  let elapsed = started.elapsed().as_secs_f64();
  ui::ok(&format!("build complete in {elapsed:.1}s"));
  ui::detail(&format!(
    "{} \u{00b7} {} routes \u{00b7} {} assets",
    project.framework.display_name(),
    report.routes.len(),
    report.assets.static_files,
  ));
  Ok(report)
}
