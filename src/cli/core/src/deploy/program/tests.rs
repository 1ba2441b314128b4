/* src/cli/core/src/deploy/program/tests.rs */

use std::path::Path;

use super::*;
use crate::config::resolve_project;
use crate::context::Context;

fn write(root: &Path, rel: &str, content: &str) {
  let path = root.join(rel);
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(path, content).unwrap();
}

fn sveltekit_project(config: &str) -> (tempfile::TempDir, ProjectConfig) {
  let tmp = tempfile::tempdir().unwrap();
  let root = tmp.path();
  write(root, "package.json", r#"{"name":"kit","dependencies":{"@sveltejs/kit":"2"}}"#);
  write(root, "svelte.config.js", "");
  write(root, "nucel.toml", config);
  write(root, ".nucel/output/server/handler.mjs", "export const handler = () => {};");
  write(root, ".nucel/output/static/_app/immutable/app.js", "js");
  write(root, ".nucel/output/static/_app/immutable/app.js.gz", "gz");
  write(root, ".nucel/output/static/favicon.png", "png");
  write(root, ".nucel/output/prerendered/index.html", "<h1>home</h1>");
  write(root, ".nucel/output/prerendered/docs/intro.html", "<h1>intro</h1>");
  let project = resolve_project(&Context::for_dir(root)).unwrap();
  (tmp, project)
}

fn hono_project() -> (tempfile::TempDir, ProjectConfig) {
  let tmp = tempfile::tempdir().unwrap();
  let root = tmp.path();
  write(root, "package.json", r#"{"name":"api","dependencies":{"hono":"4"}}"#);
  write(root, "tsconfig.json", "{}");
  write(root, ".nucel/output/server/index.mjs", "export const handler = () => {};");
  write(root, ".nucel/output/static/robots.txt", "");
  let project = resolve_project(&Context::for_dir(root)).unwrap();
  (tmp, project)
}

#[test]
fn declares_function_with_layout_handler() {
  let (_tmp, project) =
    sveltekit_project("[lambda]\nmemory = 2048\narchitecture = \"x86_64\"\n");
  let program = Program::declare(&project, &project.bundle_path()).unwrap();
  let props = &program.resource("function").unwrap()["properties"];
  assert_eq!(props["handler"], "handler.handler");
  assert_eq!(props["memorySize"], 2048);
  assert_eq!(props["timeout"], 30);
  assert_eq!(props["architectures"][0], "x86_64");
  assert_eq!(props["runtime"], "nodejs20.x");
  assert_eq!(props["sourceCodeHash"].as_str().unwrap().len(), 64);
  let archive = props["code"]["fn::fileArchive"].as_str().unwrap();
  assert!(archive.ends_with(".nucel/output/server"));
  assert_eq!(program.resource("functionUrl").unwrap()["properties"]["invokeMode"], "BUFFERED");
}

#[test]
fn streaming_switches_invoke_mode() {
  let (_tmp, project) = sveltekit_project("[lambda]\nstreaming = true\n");
  let program = Program::declare(&project, &project.bundle_path()).unwrap();
  assert_eq!(
    program.resource("functionUrl").unwrap()["properties"]["invokeMode"],
    "RESPONSE_STREAM"
  );
}

#[test]
fn uploads_precompressed_assets_under_original_key() {
  let (_tmp, project) = sveltekit_project("");
  let layout = BundleLayout::for_framework(project.framework);
  let paths = BundlePaths::new(project.bundle_path());
  let objects = collect_objects(&paths, &layout).unwrap();
  let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
  assert_eq!(keys, vec!["_app/immutable/app.js", "favicon.png", "docs/intro", "index.html"]);

  let app = &objects[0];
  assert_eq!(app.content_encoding, Some("gzip"));
  assert!(app.source.ends_with("app.js.gz"));
  assert_eq!(objects[1].content_type, "image/png");
  assert_eq!(app.cache_control, IMMUTABLE);
  assert_eq!(objects[2].content_type, "text/html");
  assert_eq!(objects[3].cache_control, REVALIDATE);

  let program = Program::declare(&project, &project.bundle_path()).unwrap();
  assert_eq!(program.resources_of_type("aws:s3:BucketObjectv2").len(), 4);
}

#[test]
fn static_paths_route_to_bucket() {
  let (_tmp, project) = sveltekit_project("");
  let program = Program::declare(&project, &project.bundle_path()).unwrap();
  let dist = &program.resource("distribution").unwrap()["properties"];
  let patterns: Vec<&str> = dist["orderedCacheBehaviors"]
    .as_array()
    .unwrap()
    .iter()
    .map(|b| b["pathPattern"].as_str().unwrap())
    .collect();
  assert_eq!(patterns, vec!["/_app/*", "/docs/intro", "/favicon.png", "/index.html"]);
  assert_eq!(dist["defaultCacheBehavior"]["targetOriginId"], "function");
  assert_eq!(dist["defaultRootObject"], "index.html");
  assert_eq!(dist["viewerCertificate"]["cloudfrontDefaultCertificate"], true);
}

#[test]
fn prerendered_pages_do_not_capture_sibling_routes() {
  let (tmp, project) = sveltekit_project("");
  write(tmp.path(), ".nucel/output/prerendered/blog/first.html", "<h1>first</h1>");
  write(tmp.path(), ".nucel/output/prerendered/blog/index.html", "<h1>blog</h1>");
  let layout = BundleLayout::for_framework(project.framework);
  let objects = collect_objects(&BundlePaths::new(project.bundle_path()), &layout).unwrap();
  let patterns = static_patterns(&objects);
  assert!(patterns.contains(&"/blog/first".to_string()));
  assert!(patterns.contains(&"/blog".to_string()));
  assert!(!patterns.iter().any(|p| p.starts_with("/blog/*")));
  assert!(patterns.contains(&"/_app/*".to_string()));
}

#[test]
fn routing_rules_and_environment_reach_the_function() {
  let (_tmp, project) = sveltekit_project(
    r#"
[environment]
API_URL = "https://api.example.com"
TEMPLATE = "${HOME}"

[[redirects]]
source = "/old"
destination = "/new"
permanent = true
"#,
  );
  let program = Program::declare(&project, &project.bundle_path()).unwrap();
  let vars = &program.resource("function").unwrap()["properties"]["environment"]["variables"];
  assert_eq!(vars["API_URL"], "https://api.example.com");
  assert_eq!(vars["TEMPLATE"], "$${HOME}");
  let routing: serde_json::Value =
    serde_json::from_str(vars[ROUTING_ENV].as_str().unwrap()).unwrap();
  assert_eq!(routing["redirects"][0]["destination"], "/new");
  assert_eq!(routing["redirects"][0]["permanent"], true);
}

#[test]
fn no_environment_block_without_variables() {
  let (_tmp, project) = hono_project();
  let program = Program::declare(&project, &project.bundle_path()).unwrap();
  assert!(program.resource("function").unwrap()["properties"].get("environment").is_none());
}

#[test]
fn every_framework_gets_the_same_shape() {
  let (_a, kit) = sveltekit_project("");
  let (_b, hono) = hono_project();
  let kit = Program::declare(&kit, &kit.bundle_path()).unwrap();
  let hono = Program::declare(&hono, &hono.bundle_path()).unwrap();
  assert_eq!(kit.resource_types(), hono.resource_types());
  assert_eq!(hono.resource("function").unwrap()["properties"]["handler"], "index.handler");
}

#[test]
fn domain_with_hosted_zone_issues_certificate() {
  let (_tmp, project) =
    sveltekit_project("[[domains]]\nname = \"shop.example.com\"\nhosted_zone_id = \"Z123\"\n");
  let program = Program::declare(&project, &project.bundle_path()).unwrap();
  assert!(program.resource("certificate").is_some());
  assert_eq!(program.resource("certificate").unwrap()["options"]["provider"], "${usEast1}");
  assert_eq!(program.resource("usEast1").unwrap()["properties"]["region"], "us-east-1");
  assert_eq!(program.resource("aliasRecord").unwrap()["properties"]["zoneId"], "Z123");
  let dist = &program.resource("distribution").unwrap()["properties"];
  assert_eq!(dist["aliases"][0], "shop.example.com");
  assert_eq!(
    dist["viewerCertificate"]["acmCertificateArn"],
    "${certificateValidation.certificateArn}"
  );
  let yaml = program.to_yaml().unwrap();
  assert!(yaml.contains("https://shop.example.com"));
}

#[test]
fn given_certificate_is_attached_directly() {
  let (_tmp, project) = sveltekit_project(
    "[[domains]]\nname = \"shop.example.com\"\ncertificate_arn = \"arn:aws:acm:us-east-1:1:certificate/abc\"\n",
  );
  let program = Program::declare(&project, &project.bundle_path()).unwrap();
  assert!(program.resource("certificate").is_none());
  assert!(program.resource("aliasRecord").is_none());
  assert_eq!(
    program.resource("distribution").unwrap()["properties"]["viewerCertificate"]
      ["acmCertificateArn"],
    "arn:aws:acm:us-east-1:1:certificate/abc"
  );
}

#[test]
fn missing_server_fails_before_declaration() {
  let (tmp, project) = hono_project();
  std::fs::remove_dir_all(tmp.path().join(".nucel/output/server")).unwrap();
  let err = Program::declare(&project, &project.bundle_path()).unwrap_err();
  assert!(err.to_string().contains("server"));
}

#[test]
fn writes_yaml_program() {
  let (tmp, project) = hono_project();
  let program = Program::declare(&project, &project.bundle_path()).unwrap();
  let path = program.write(&tmp.path().join(".nucel/pulumi/dev")).unwrap();
  let parsed: serde_yaml::Value =
    serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
  assert_eq!(parsed["runtime"], serde_yaml::Value::from("yaml"));
  assert_eq!(parsed["name"], serde_yaml::Value::from("api"));
  assert_eq!(
    parsed["outputs"]["functionUrl"],
    serde_yaml::Value::from("${functionUrl.functionUrl}")
  );
  assert_eq!(program.name(), "api");
}
