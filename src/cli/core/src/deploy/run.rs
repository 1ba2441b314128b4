/* src/cli/core/src/deploy/run.rs */

use std::time::Instant;

use anyhow::Result;

use super::engine::{DeploymentOutputs, ProvisioningEngine};
use super::program::Program;
use crate::build::package::Packager;
use crate::build::run::run_build;
use crate::config::ProjectConfig;
use crate::ui;

#[derive(Debug, Clone)]
pub struct DeployOptions {
  pub stack: String,
  /// Show the plan without applying it.
  pub preview: bool,
  /// Reuse the existing bundle instead of rebuilding.
  pub skip_build: bool,
}

/// Build (unless skipped), declare the program and hand it to the engine.
/// Returns the stack outputs when changes were applied.
pub fn run_deploy(
  project: &ProjectConfig,
  opts: &DeployOptions,
  packager: &dyn Packager,
  engine: &dyn ProvisioningEngine,
) -> Result<Option<DeploymentOutputs>> {
  let started = Instant::now();

  // [1/4] Build
  if opts.skip_build {
    ui::step(1, 4, "Reusing existing bundle");
  } else {
    ui::step(1, 4, "Building");
    ui::blank();
    run_build(project, packager)?;
  }
  ui::blank();

  // [2/4] Declare
  ui::step(2, 4, "Declaring infrastructure");
  let program = Program::declare(project, &project.bundle_path())?;
  let resources = program.resource_types().len();
  ui::detail_ok(&format!("{} \u{00b7} {resources} resource types", program.name()));
  if let Some(domain) = project.domains.first() {
    ui::detail_ok(&format!("custom domain {}", domain.name));
  }
  ui::blank();

  // [3/4] Provision
  if opts.preview {
    ui::step(3, 4, &format!("Previewing stack {}", opts.stack));
    engine.preview(&program)?;
    ui::blank();
    ui::ok(&format!("preview complete in {:.1}s", started.elapsed().as_secs_f64()));
    ui::detail("no changes applied");
    return Ok(None);
  }
  ui::step(3, 4, &format!("Deploying stack {}", opts.stack));
  let outputs = engine.up(&program)?;
  ui::blank();

  // [4/4] Outputs
  ui::step(4, 4, "Stack outputs");
  print_outputs(&outputs);
  ui::blank();

  ui::ok(&format!("deploy complete in {:.1}s", started.elapsed().as_secs_f64()));
  Ok(Some(outputs))
}

fn print_outputs(outputs: &DeploymentOutputs) {
  ui::output("url", &outputs.url);
  ui::output("function url", &outputs.function_url);
  if let Some(id) = &outputs.distribution_id {
    ui::output("distribution", id);
  }
  if let Some(bucket) = &outputs.bucket_name {
    ui::output("bucket", bucket);
  }
}

pub fn run_destroy(stack: &str, engine: &dyn ProvisioningEngine) -> Result<()> {
  let started = Instant::now();
  ui::arrow(&format!("destroying stack {stack}"));
  engine.destroy()?;
  ui::blank();
  ui::ok(&format!("destroy complete in {:.1}s", started.elapsed().as_secs_f64()));
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use super::*;
  use crate::build::package::fake::FakePackager;
  use crate::config::resolve_project;
  use crate::context::Context;
  use crate::deploy::engine::fake::FakeEngine;

  fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
  }

  fn built_hono() -> (tempfile::TempDir, ProjectConfig) {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write(root, "package.json", r#"{"name":"api","dependencies":{"hono":"4"}}"#);
    write(root, "tsconfig.json", "{}");
    write(root, ".nucel/output/server/index.mjs", "export const handler = () => {};");
    write(root, ".nucel/output/static/robots.txt", "");
    let project = resolve_project(&Context::for_dir(root)).unwrap();
    (tmp, project)
  }

  fn opts(preview: bool) -> DeployOptions {
    DeployOptions { stack: "dev".into(), preview, skip_build: true }
  }

  #[test]
  fn preview_never_applies() {
    let (_tmp, project) = built_hono();
    let engine = FakeEngine::default();
    let out = run_deploy(&project, &opts(true), &FakePackager::default(), &engine).unwrap();
    assert!(out.is_none());
    assert_eq!(*engine.calls.borrow(), vec!["preview api".to_string()]);
  }

  #[test]
  fn up_returns_outputs() {
    let (_tmp, project) = built_hono();
    let engine = FakeEngine::default();
    let out = run_deploy(&project, &opts(false), &FakePackager::default(), &engine)
      .unwrap()
      .unwrap();
    assert_eq!(out.url, "https://d111.cloudfront.net");
    assert_eq!(*engine.calls.borrow(), vec!["up api".to_string()]);
  }

  #[test]
  fn invalid_bundle_stops_before_engine() {
    let (tmp, project) = built_hono();
    std::fs::remove_dir_all(tmp.path().join(".nucel/output/server")).unwrap();
    let engine = FakeEngine::default();
    let err = run_deploy(&project, &opts(false), &FakePackager::default(), &engine).unwrap_err();
    assert!(err.to_string().contains("invalid bundle"));
    assert!(engine.calls.borrow().is_empty());
  }

  #[test]
  fn destroy_delegates_to_engine() {
    let engine = FakeEngine::default();
    run_destroy("prod", &engine).unwrap();
    assert_eq!(*engine.calls.borrow(), vec!["destroy".to_string()]);
  }
}
