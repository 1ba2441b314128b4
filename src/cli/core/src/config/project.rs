/* src/cli/core/src/config/project.rs */

// Merge defaults, env files, process env and the user override into one ProjectConfig.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use nucel_runtime::EnvFilter;

use super::env::{app_variables, read_env_files};
use super::loader::{LoadedConfig, load_user_config};
use super::types::{
  AwsSection, DomainConfig, HeaderRule, LambdaConfig, PulumiSection, RedirectRule, RewriteRule,
  UserConfig,
};
use crate::build::types::AdapterOptions;
use crate::context::Context;
use crate::detect::{Framework, detect_from_manifest};
use crate::manifest::PackageManifest;
use crate::ui;

/// Everything one invocation knows about the project. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
  pub root: PathBuf,
  pub name: String,
  pub framework: Framework,
  pub build_command: String,
  pub output_directory: String,
  pub environment: BTreeMap<String, String>,
  pub aws: AwsSection,
  pub domains: Vec<DomainConfig>,
  pub headers: Vec<HeaderRule>,
  pub rewrites: Vec<RewriteRule>,
  pub redirects: Vec<RedirectRule>,
  pub lambda: LambdaConfig,
  pub adapter: AdapterOptions,
  pub pulumi: PulumiSection,
  pub manifest: PackageManifest,
  /// Path of the override file that was applied, if any.
  pub config_file: Option<PathBuf>,
}

impl ProjectConfig {
  pub fn output_path(&self) -> PathBuf {
    self.root.join(&self.output_directory)
  }

  pub fn bundle_path(&self) -> PathBuf {
    self.root.join(&self.adapter.out_dir)
  }

  pub fn has_routing_rules(&self) -> bool {
    !self.headers.is_empty() || !self.rewrites.is_empty() || !self.redirects.is_empty()
  }
}

/// Resolve the project rooted at `ctx.cwd`.
pub fn resolve_project(ctx: &Context) -> Result<ProjectConfig> {
  let root = ctx.cwd.as_path();
  let manifest = PackageManifest::read(root)?;
  let loaded = load_user_config(root, ctx.strict)?;
  let (user, config_file) = match loaded {
    Some(LoadedConfig { path, config }) => (config, Some(path)),
    None => (UserConfig::default(), None),
  };

  let framework = match user.framework {
    Some(fw) => fw,
    None => detect_from_manifest(&manifest, root),
  };
  if framework == Framework::Unknown {
    bail!(
      "could not detect a supported framework in {} (expected next, sveltekit, react-router or \
       hono with its config file) -- set `framework` in nucel.toml",
      root.display()
    );
  }

  let adapter = AdapterOptions::from_section(&user.adapter);
  let environment = merge_environment(root, ctx, framework, &user, &adapter)?;

  let name = user
    .name
    .clone()
    .or_else(|| manifest.name.clone())
    .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
    .unwrap_or_else(|| "app".to_string());

  Ok(ProjectConfig {
    root: root.to_path_buf(),
    name: sanitize_name(&name),
    framework,
    build_command: user
      .build_command
      .clone()
      .unwrap_or_else(|| framework.default_build_command().to_string()),
    output_directory: user
      .output_directory
      .clone()
      .unwrap_or_else(|| framework.default_output_directory().to_string()),
    environment,
    aws: user.aws.clone(),
    domains: user.domains.clone(),
    headers: user.headers.clone(),
    rewrites: user.rewrites.clone(),
    redirects: user.redirects.clone(),
    lambda: LambdaConfig::from(&user.lambda),
    adapter,
    pulumi: user.pulumi.clone(),
    manifest,
    config_file,
  })
}

/// env files < process env < user override, then the Lambda name filter.
fn merge_environment(
  root: &Path,
  ctx: &Context,
  framework: Framework,
  user: &UserConfig,
  adapter: &AdapterOptions,
) -> Result<BTreeMap<String, String>> {
  let mut merged = read_env_files(root)?;
  merged.extend(app_variables(&ctx.env, framework));
  merged.extend(user.environment.iter().map(|(k, v)| (k.clone(), v.clone())));

  let filtered = EnvFilter::new(adapter.env_prefix.clone()).apply(merged);
  for (name, reason) in &filtered.dropped {
    ui::warn(&format!("dropping environment variable {name}: {reason}"));
  }
  Ok(filtered.kept)
}

/// Lowercase, `[a-z0-9-]`, no leading/trailing dash, at most 40 chars (leaves room for suffixes).
pub fn sanitize_name(raw: &str) -> String {
  let base = raw.rsplit('/').next().unwrap_or(raw);
  let mut out = String::with_capacity(base.len());
  for c in base.chars() {
    let c = c.to_ascii_lowercase();
    if c.is_ascii_alphanumeric() {
      out.push(c);
    } else if !out.ends_with('-') {
      out.push('-');
    }
  }
  let trimmed: String = out.trim_matches('-').chars().take(40).collect();
  let trimmed = trimmed.trim_end_matches('-').to_string();
  if trimmed.is_empty() { "app".to_string() } else { trimmed }
}
