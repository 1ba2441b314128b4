/* src/cli/core/src/config/tests/precedence.rs */

use std::collections::BTreeMap;

use super::*;
use crate::context::Context;
use crate::detect::Framework;

fn next_project() -> tempfile::TempDir {
  let tmp = tempfile::tempdir().unwrap();
  std::fs::write(
    tmp.path().join("package.json"),
    r#"{"name":"@acme/web","dependencies":{"next":"15.1.0","react":"19.0.0"}}"#,
  )
  .unwrap();
  std::fs::write(tmp.path().join("next.config.ts"), "export default {}").unwrap();
  tmp
}

#[test]
fn defaults_without_env_files_or_user_config() {
  let tmp = next_project();
  let project = resolve_project(&Context::for_dir(tmp.path())).unwrap();
  assert_eq!(project.framework, Framework::Next);
  assert_eq!(project.build_command, "next build");
  assert_eq!(project.output_directory, ".next");
  assert_eq!(project.name, "web");
  assert!(project.environment.is_empty());
  assert!(project.config_file.is_none());
  assert_eq!(project.aws.region, "us-east-1");
}

#[test]
fn user_config_wins_over_env_file() {
  let tmp = next_project();
  std::fs::write(tmp.path().join(".env"), "API_URL=from-env-file\nONLY_FILE=1\n").unwrap();
  std::fs::write(tmp.path().join("nucel.toml"), "[environment]\nAPI_URL = \"from-config\"\n")
    .unwrap();
  let project = resolve_project(&Context::for_dir(tmp.path())).unwrap();
  assert_eq!(project.environment["API_URL"], "from-config");
  assert_eq!(project.environment["ONLY_FILE"], "1");
}

#[test]
fn process_env_sits_between_files_and_user_config() {
  let tmp = next_project();
  std::fs::write(tmp.path().join(".env.local"), "A=file\nB=file\n").unwrap();
  std::fs::write(tmp.path().join("nucel.toml"), "[environment]\nB = \"config\"\n").unwrap();
  let mut ctx = Context::for_dir(tmp.path());
  ctx.env = BTreeMap::from([
    ("A".to_string(), "process".to_string()),
    ("B".to_string(), "process".to_string()),
  ]);
  let project = resolve_project(&ctx).unwrap();
  assert_eq!(project.environment["A"], "process");
  assert_eq!(project.environment["B"], "config");
}

#[test]
fn reserved_and_invalid_names_never_reach_the_adapter() {
  let tmp = next_project();
  std::fs::write(tmp.path().join(".env"), "AWS_FROM_FILE=1\n").unwrap();
  std::fs::write(
    tmp.path().join("nucel.toml"),
    "[environment]\nAWS_REGION = \"eu-west-1\"\n\"bad-name\" = \"x\"\nGOOD = \"ok\"\n",
  )
  .unwrap();
  let mut ctx = Context::for_dir(tmp.path());
  ctx.env = BTreeMap::from([("AWS_FOO".to_string(), "x".to_string())]);
  let project = resolve_project(&ctx).unwrap();
  assert_eq!(project.environment.keys().collect::<Vec<_>>(), vec!["GOOD"]);
}

#[test]
fn env_prefix_restricts_variables() {
  let tmp = next_project();
  std::fs::write(tmp.path().join(".env"), "APP_KEY=1\nOTHER=2\n").unwrap();
  std::fs::write(tmp.path().join("nucel.toml"), "[adapter]\nenv_prefix = \"APP_\"\n").unwrap();
  let project = resolve_project(&Context::for_dir(tmp.path())).unwrap();
  assert_eq!(project.environment.keys().collect::<Vec<_>>(), vec!["APP_KEY"]);
  assert_eq!(project.adapter.env_prefix, "APP_");
}

#[test]
fn unknown_framework_is_fatal() {
  let tmp = tempfile::tempdir().unwrap();
  std::fs::write(tmp.path().join("package.json"), r#"{"dependencies":{"express":"4"}}"#).unwrap();
  let err = resolve_project(&Context::for_dir(tmp.path())).unwrap_err();
  assert!(err.to_string().contains("could not detect a supported framework"));
}

#[test]
fn explicit_framework_skips_detection() {
  let tmp = tempfile::tempdir().unwrap();
  std::fs::write(tmp.path().join("package.json"), r#"{"dependencies":{"hono":"4"}}"#).unwrap();
  std::fs::write(tmp.path().join("nucel.toml"), "framework = \"hono\"\n").unwrap();
  let project = resolve_project(&Context::for_dir(tmp.path())).unwrap();
  assert_eq!(project.framework, Framework::Hono);
  assert_eq!(project.output_directory, "dist");
}

#[test]
fn missing_manifest_is_fatal() {
  let tmp = tempfile::tempdir().unwrap();
  assert!(resolve_project(&Context::for_dir(tmp.path())).is_err());
}

#[test]
fn sanitized_names() {
  assert_eq!(sanitize_name("@acme/Web App"), "web-app");
  assert_eq!(sanitize_name("__"), "app");
  assert_eq!(sanitize_name("My.Site--v2"), "my-site-v2");
}
