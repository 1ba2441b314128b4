/* src/cli/core/src/config/types.rs */

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detect::Framework;

/// Contents of `nucel.toml` / `nucel.json`. Every field is an override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
  pub name: Option<String>,
  pub framework: Option<Framework>,
  #[serde(alias = "buildCommand")]
  pub build_command: Option<String>,
  #[serde(alias = "outputDirectory")]
  pub output_directory: Option<String>,
  #[serde(default)]
  pub environment: BTreeMap<String, String>,
  #[serde(default)]
  pub aws: AwsSection,
  #[serde(default)]
  pub domains: Vec<DomainConfig>,
  #[serde(default)]
  pub headers: Vec<HeaderRule>,
  #[serde(default)]
  pub rewrites: Vec<RewriteRule>,
  #[serde(default)]
  pub redirects: Vec<RedirectRule>,
  #[serde(default)]
  pub lambda: LambdaSection,
  #[serde(default)]
  pub adapter: AdapterSection,
  #[serde(default)]
  pub pulumi: PulumiSection,
}

/// Keys accepted at each level; used to report every unknown key at once.
pub(super) const SCHEMA: &[(&str, &[&str])] = &[
  (
    "",
    &[
      "name",
      "framework",
      "build_command",
      "buildCommand",
      "output_directory",
      "outputDirectory",
      "environment",
      "aws",
      "domains",
      "headers",
      "rewrites",
      "redirects",
      "lambda",
      "adapter",
      "pulumi",
    ],
  ),
  ("aws", &["region", "profile"]),
  ("domains", &["name", "certificate_arn", "certificateArn", "hosted_zone_id", "hostedZoneId"]),
  ("headers", &["source", "values"]),
  ("rewrites", &["source", "destination"]),
  ("redirects", &["source", "destination", "permanent"]),
  ("lambda", &["memory", "timeout", "streaming", "architecture", "runtime"]),
  ("adapter", &["env_prefix", "envPrefix", "precompress", "polyfill", "out_dir", "outDir"]),
  ("pulumi", &["backend_url", "backendUrl"]),
];

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AwsSection {
  #[serde(default = "default_region")]
  pub region: String,
  pub profile: Option<String>,
}

impl Default for AwsSection {
  fn default() -> Self {
    Self { region: default_region(), profile: None }
  }
}

fn default_region() -> String {
  DEFAULT_REGION.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
  pub name: String,
  #[serde(default, alias = "certificateArn")]
  pub certificate_arn: Option<String>,
  #[serde(default, alias = "hostedZoneId")]
  pub hosted_zone_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HeaderRule {
  pub source: String,
  pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RewriteRule {
  pub source: String,
  pub destination: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RedirectRule {
  pub source: String,
  pub destination: String,
  #[serde(default)]
  pub permanent: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Architecture {
  #[serde(rename = "x86_64")]
  X86_64,
  #[default]
  #[serde(rename = "arm64")]
  Arm64,
}

impl Architecture {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Arm64 => "arm64",
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LambdaSection {
  pub memory: Option<u32>,
  pub timeout: Option<u32>,
  pub streaming: Option<bool>,
  pub architecture: Option<Architecture>,
  pub runtime: Option<String>,
}

/// Resolved function settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaConfig {
  pub memory: u32,
  pub timeout: u32,
  pub streaming: bool,
  pub architecture: Architecture,
  pub runtime: String,
}

pub const MEMORY_RANGE: std::ops::RangeInclusive<u32> = 128..=10_240;
pub const TIMEOUT_RANGE: std::ops::RangeInclusive<u32> = 1..=900;

impl From<&LambdaSection> for LambdaConfig {
  fn from(s: &LambdaSection) -> Self {
    Self {
      memory: s.memory.unwrap_or(1024),
      timeout: s.timeout.unwrap_or(30),
      streaming: s.streaming.unwrap_or(false),
      architecture: s.architecture.unwrap_or_default(),
      runtime: s.runtime.clone().unwrap_or_else(|| "nodejs20.x".to_string()),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterSection {
  #[serde(alias = "envPrefix")]
  pub env_prefix: Option<String>,
  pub precompress: Option<bool>,
  pub polyfill: Option<bool>,
  #[serde(alias = "outDir")]
  pub out_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PulumiSection {
  #[serde(alias = "backendUrl")]
  pub backend_url: Option<String>,
}
