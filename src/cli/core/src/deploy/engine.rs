/* src/cli/core/src/deploy/engine.rs */

// Driving the Pulumi CLI against a generated YAML program.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use super::program::{PROGRAM_FILE, Program};
use crate::config::ProjectConfig;
use crate::shell::{run_program, run_program_streaming, which_exists};

/// Working directory for Pulumi projects, relative to the project root.
pub const PULUMI_DIR: &str = ".nucel/pulumi";

/// Stack outputs read back after `up`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOutputs {
  pub url: String,
  pub function_url: String,
  #[serde(default)]
  pub distribution_id: Option<String>,
  #[serde(default)]
  pub bucket_name: Option<String>,
}

pub trait ProvisioningEngine {
  fn preview(&self, program: &Program) -> Result<()>;
  fn up(&self, program: &Program) -> Result<DeploymentOutputs>;
  fn destroy(&self) -> Result<()>;
}

/// The `pulumi` binary, one stack per working directory.
#[derive(Debug, Clone)]
pub struct PulumiCli {
  work_dir: PathBuf,
  project_name: String,
  stack: String,
  region: String,
  profile: Option<String>,
  env: Vec<(String, String)>,
}

impl PulumiCli {
  pub fn new(
    project: &ProjectConfig,
    stack: &str,
    process_env: &BTreeMap<String, String>,
  ) -> Self {
    let mut env = Vec::new();
    if let Some(url) = &project.pulumi.backend_url {
      env.push(("PULUMI_BACKEND_URL".to_string(), url.clone()));
    }
    // self-managed backends prompt for a passphrase otherwise
    if !process_env.contains_key("PULUMI_CONFIG_PASSPHRASE")
      && !process_env.contains_key("PULUMI_CONFIG_PASSPHRASE_FILE")
    {
      env.push(("PULUMI_CONFIG_PASSPHRASE".to_string(), String::new()));
    }
    Self {
      work_dir: project.root.join(PULUMI_DIR).join(stack),
      project_name: project.name.clone(),
      stack: stack.to_string(),
      region: project.aws.region.clone(),
      profile: project.aws.profile.clone(),
      env,
    }
  }

  pub fn work_dir(&self) -> &Path {
    &self.work_dir
  }

  fn env(&self) -> Vec<(&str, &str)> {
    self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
  }

  fn ensure_cli() -> Result<()> {
    if !which_exists("pulumi") {
      bail!("pulumi CLI not found on PATH -- install it from https://www.pulumi.com/docs/install/");
    }
    Ok(())
  }

  fn capture(&self, args: &[&str], label: &str) -> Result<String> {
    run_program(&self.work_dir, "pulumi", args, label, &self.env())
  }

  fn stream(&self, args: &[&str], label: &str) -> Result<()> {
    run_program_streaming(&self.work_dir, "pulumi", args, label, &self.env())
  }

  /// Write the program, select (or create) the stack and set provider config.
  fn prepare(&self, program: &Program) -> Result<()> {
    Self::ensure_cli()?;
    program.write(&self.work_dir)?;
    self.select_stack()?;
    self.capture(
      &["config", "set", "aws:region", &self.region, "--stack", &self.stack],
      "pulumi config",
    )?;
    if let Some(profile) = &self.profile {
      self.capture(
        &["config", "set", "aws:profile", profile, "--stack", &self.stack],
        "pulumi config",
      )?;
    }
    Ok(())
  }

  fn select_stack(&self) -> Result<()> {
    self.capture(
      &["stack", "select", &self.stack, "--create", "--non-interactive"],
      "pulumi stack select",
    )?;
    Ok(())
  }

  fn outputs(&self) -> Result<DeploymentOutputs> {
    let json = self.capture(
      &["stack", "output", "--json", "--show-secrets", "--stack", &self.stack],
      "pulumi stack output",
    )?;
    parse_outputs(&json)
  }
}

pub fn parse_outputs(json: &str) -> Result<DeploymentOutputs> {
  serde_json::from_str(json).context("failed to parse pulumi stack outputs")
}

impl ProvisioningEngine for PulumiCli {
  fn preview(&self, program: &Program) -> Result<()> {
    self.prepare(program)?;
    self.stream(
      &["preview", "--stack", &self.stack, "--non-interactive", "--diff"],
      "pulumi preview",
    )
  }

  fn up(&self, program: &Program) -> Result<DeploymentOutputs> {
    self.prepare(program)?;
    self.stream(
      &["up", "--yes", "--skip-preview", "--stack", &self.stack, "--non-interactive"],
      "pulumi up",
    )?;
    self.outputs()
  }

  fn destroy(&self) -> Result<()> {
    Self::ensure_cli()?;
    let program_file = self.work_dir.join(PROGRAM_FILE);
    if !program_file.exists() {
      // destroy only needs the project name; resources come from stack state
      std::fs::create_dir_all(&self.work_dir)
        .with_context(|| format!("failed to create {}", self.work_dir.display()))?;
      let stub = format!("name: {}\nruntime: yaml\n", self.project_name);
      std::fs::write(&program_file, stub)
        .with_context(|| format!("failed to write {}", program_file.display()))?;
    }
    self.select_stack()?;
    self.stream(
      &["destroy", "--yes", "--stack", &self.stack, "--non-interactive"],
      "pulumi destroy",
    )
  }
}

#[cfg(test)]
pub(crate) mod fake {
  use std::cell::RefCell;

  use super::*;

  /// Records calls instead of provisioning.
  #[derive(Default)]
  pub struct FakeEngine {
    pub calls: RefCell<Vec<String>>,
  }

  impl ProvisioningEngine for FakeEngine {
    fn preview(&self, program: &Program) -> Result<()> {
      self.calls.borrow_mut().push(format!("preview {}", program.name()));
      Ok(())
    }

    fn up(&self, program: &Program) -> Result<DeploymentOutputs> {
      self.calls.borrow_mut().push(format!("up {}", program.name()));
      Ok(DeploymentOutputs {
        url: "https://d111.cloudfront.net".into(),
        function_url: "https://abc.lambda-url.us-east-1.on.aws/".into(),
        distribution_id: Some("E123".into()),
        bucket_name: Some("bucket-1".into()),
      })
    }

    fn destroy(&self) -> Result<()> {
      self.calls.borrow_mut().push("destroy".into());
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_stack_outputs() {
    let outputs = parse_outputs(
      r#"{"url":"https://d1.cloudfront.net","functionUrl":"https://x.lambda-url.eu-west-1.on.aws/",
          "distributionId":"E1","bucketName":"b"}"#,
    )
    .unwrap();
    assert_eq!(outputs.distribution_id.as_deref(), Some("E1"));
    assert_eq!(outputs.function_url, "https://x.lambda-url.eu-west-1.on.aws/");
  }

  #[test]
  fn passphrase_defaults_only_when_unset() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    std::fs::write(root.join("package.json"), r#"{"name":"api","dependencies":{"hono":"4"}}"#)
      .unwrap();
    std::fs::write(root.join("tsconfig.json"), "{}").unwrap();
    std::fs::write(root.join("nucel.toml"), "[pulumi]\nbackend_url = \"file://.nucel/state\"\n")
      .unwrap();
    let project =
      crate::config::resolve_project(&crate::context::Context::for_dir(root)).unwrap();

    let cli = PulumiCli::new(&project, "prod", &BTreeMap::new());
    assert_eq!(cli.work_dir(), project.root.join(".nucel/pulumi/prod"));
    assert!(cli.env().contains(&("PULUMI_BACKEND_URL", "file://.nucel/state")));
    assert!(cli.env().contains(&("PULUMI_CONFIG_PASSPHRASE", "")));

    let process_env =
      BTreeMap::from([("PULUMI_CONFIG_PASSPHRASE_FILE".to_string(), "/run/pass".to_string())]);
    let cli = PulumiCli::new(&project, "prod", &process_env);
    assert!(cli.env().iter().all(|(k, _)| *k != "PULUMI_CONFIG_PASSPHRASE"));
  }

  #[test]
  fn optional_outputs_may_be_absent() {
    let outputs = parse_outputs(r#"{"url":"u","functionUrl":"f"}"#).unwrap();
    assert!(outputs.bucket_name.is_none());
    assert!(parse_outputs("{}").is_err());
  }
}
