/* src/cli/core/src/deploy/program.rs */

// Resource graph for one deployment, emitted as a Pulumi YAML program.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use super::bundle::validate_bundle;
use crate::build::files::{digest_dir, list_files, prerendered_route};
use crate::build::handler::{ROUTING_ENV, routing_env};
use crate::build::types::{ALL_METHODS, BundleLayout, BundlePaths};
use crate::config::ProjectConfig;

pub const PROGRAM_FILE: &str = "Pulumi.yaml";

// AWS managed CloudFront policies
const CACHING_DISABLED: &str = "4135ea2d-6df8-44a3-9df3-4b5a84be39ad";
const CACHING_OPTIMIZED: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";
const ALL_VIEWER_EXCEPT_HOST: &str = "b689b0a8-53d0-40ab-baf2-68738e2966ac";

const BASIC_EXECUTION_POLICY: &str =
  "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Hashed build assets that never change under the same key.
const IMMUTABLE_PREFIXES: &[&str] = &["_app/immutable/", "_next/static/", "assets/"];
const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const REVALIDATE: &str = "public, max-age=0, must-revalidate";

/// CloudFront's default quota of cache behaviors per distribution.
const MAX_CACHE_BEHAVIORS: usize = 25;

/// One file uploaded to the asset bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticObject {
  pub key: String,
  pub source: PathBuf,
  pub content_type: String,
  pub content_encoding: Option<&'static str>,
  pub cache_control: &'static str,
  /// Served at exactly its own path rather than under a directory wildcard.
  pub prerendered: bool,
}

/// Escape Pulumi YAML interpolation in a literal string.
fn literal(s: &str) -> String {
  s.replace("${", "$${")
}

fn path_literal(path: &Path) -> String {
  literal(&path.to_string_lossy())
}

fn rel_key(rel: &Path) -> String {
  rel.to_string_lossy().replace('\\', "/")
}

/// Objects for one asset root. Precompressed `<file>.gz` siblings replace
/// their original under the original key.
fn objects_in(dir: &Path, prerendered: bool) -> Result<Vec<StaticObject>> {
  let files = list_files(dir)?;
  let names: BTreeSet<String> = files.iter().map(|p| rel_key(p)).collect();
  let mut objects = Vec::new();
  for rel in &files {
    let name = rel_key(rel);
    if let Some(original) = name.strip_suffix(".gz")
      && names.contains(original)
    {
      continue;
    }
    let gz = format!("{name}.gz");
    let (source, content_encoding) = if names.contains(&gz) {
      (dir.join(&gz), Some("gzip"))
    } else {
      (dir.join(rel), None)
    };
    let content_type = mime_guess::from_path(rel).first_or_octet_stream().essence_str().to_string();
    let (key, cache_control) = if prerendered && name.ends_with(".html") {
      let route = prerendered_route(rel);
      let key = if route == "/" { "index.html".to_string() } else { route[1..].to_string() };
      (key, REVALIDATE)
    } else if IMMUTABLE_PREFIXES.iter().any(|p| name.starts_with(p)) {
      (name.clone(), IMMUTABLE)
    } else {
      (name.clone(), REVALIDATE)
    };
    objects.push(StaticObject {
      key,
      source,
      content_type,
      content_encoding,
      cache_control,
      prerendered,
    });
  }
  Ok(objects)
}

/// Every object the bucket receives, static assets first.
pub fn collect_objects(paths: &BundlePaths, layout: &BundleLayout) -> Result<Vec<StaticObject>> {
  let mut objects = objects_in(&paths.static_dir, false)?;
  if layout.has_prerendered {
    objects.extend(objects_in(&paths.prerendered, true)?);
  }
  Ok(objects)
}

/// Path patterns routed to the bucket. Static asset directories get one wildcard
/// per top-level entry; prerendered pages only their exact path, so dynamic
/// routes next to them still reach the function.
pub fn static_patterns(objects: &[StaticObject]) -> Vec<String> {
  let patterns: BTreeSet<String> = objects
    .iter()
    .map(|o| match o.key.split_once('/') {
      Some((dir, _)) if !o.prerendered => format!("/{dir}/*"),
      _ => format!("/{}", o.key),
    })
    .collect();
  patterns.into_iter().collect()
}

fn object_resource_name(key: &str) -> String {
  let digest = hex::encode(Sha256::digest(key.as_bytes()));
  format!("asset-{}", &digest[..12])
}

fn to_json_policy(statement: Value) -> Value {
  json!({ "fn::toJSON": { "Version": "2012-10-17", "Statement": [statement] } })
}

#[derive(Debug, Clone)]
pub struct Program {
  document: Value,
}

impl Program {
  /// Declare the full resource graph for `project` from the bundle at `bundle_dir`.
  pub fn declare(project: &ProjectConfig, bundle_dir: &Path) -> Result<Self> {
    let layout = BundleLayout::for_framework(project.framework);
    let paths = validate_bundle(bundle_dir, &layout)?;
    let paths = BundlePaths::new(
      paths
        .root
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", paths.root.display()))?,
    );
    let objects = collect_objects(&paths, &layout)?;
    let patterns = static_patterns(&objects);
    if patterns.len() > MAX_CACHE_BEHAVIORS {
      tracing::warn!(
        count = patterns.len(),
        "static path patterns exceed the default CloudFront cache behavior quota"
      );
    }

    let mut resources = Map::new();
    declare_function(&mut resources, project, &paths, &layout)?;
    declare_assets(&mut resources, &objects);
    let certificate = declare_certificate(&mut resources, project);
    declare_distribution(&mut resources, project, &objects, &patterns, certificate);

    let url = match project.domains.first() {
      Some(domain) => Value::String(format!("https://{}", literal(&domain.name))),
      None => json!("https://${distribution.domainName}"),
    };
    let document = json!({
      "name": project.name,
      "runtime": "yaml",
      "description":
        format!("{} on AWS Lambda, deployed by nucel", project.framework.display_name()),
      "resources": resources,
      "outputs": {
        "url": url,
        "functionUrl": "${functionUrl.functionUrl}",
        "distributionId": "${distribution.id}",
        "bucketName": "${bucket.bucket}",
      },
    });
    tracing::debug!(resources = resources_len(&document), "program declared");
    Ok(Self { document })
  }

  pub fn name(&self) -> &str {
    self.document["name"].as_str().unwrap_or_default()
  }

  pub fn resource(&self, name: &str) -> Option<&Value> {
    self.document["resources"].get(name)
  }

  /// Logical names of every resource of type `ty`.
  pub fn resources_of_type(&self, ty: &str) -> Vec<&str> {
    self.document["resources"]
      .as_object()
      .map(|r| {
        r.iter().filter(|(_, v)| v["type"] == ty).map(|(k, _)| k.as_str()).collect()
      })
      .unwrap_or_default()
  }

  pub fn resource_types(&self) -> BTreeSet<String> {
    self.document["resources"]
      .as_object()
      .map(|r| r.values().filter_map(|v| v["type"].as_str().map(String::from)).collect())
      .unwrap_or_default()
  }

  pub fn to_yaml(&self) -> Result<String> {
    serde_yaml::to_string(&self.document).context("failed to serialize program")
  }

  /// Write `Pulumi.yaml` into `dir`, creating it if needed.
  pub fn write(&self, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(PROGRAM_FILE);
    std::fs::write(&path, self.to_yaml()?)
      .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
  }
}

fn resources_len(document: &Value) -> usize {
  document["resources"].as_object().map_or(0, Map::len)
}

fn declare_function(
  resources: &mut Map<String, Value>,
  project: &ProjectConfig,
  paths: &BundlePaths,
  layout: &BundleLayout,
) -> Result<()> {
  resources.insert(
    "role".into(),
    json!({
      "type": "aws:iam:Role",
      "properties": {
        "assumeRolePolicy": to_json_policy(json!({
          "Effect": "Allow",
          "Principal": { "Service": "lambda.amazonaws.com" },
          "Action": "sts:AssumeRole",
        })),
      },
    }),
  );
  resources.insert(
    "rolePolicy".into(),
    json!({
      "type": "aws:iam:RolePolicyAttachment",
      "properties": { "role": "${role.name}", "policyArn": BASIC_EXECUTION_POLICY },
    }),
  );

  let mut variables: BTreeMap<String, String> =
    project.environment.iter().map(|(k, v)| (k.clone(), literal(v))).collect();
  if let Some(routing) = routing_env(project)? {
    variables.insert(ROUTING_ENV.to_string(), literal(&routing));
  }
  let lambda = &project.lambda;
  let mut properties = json!({
    "role": "${role.arn}",
    "runtime": lambda.runtime,
    "handler": layout.lambda_handler(),
    "code": { "fn::fileArchive": path_literal(&paths.server) },
    "memorySize": lambda.memory,
    "timeout": lambda.timeout,
    "architectures": [lambda.architecture.as_str()],
    "sourceCodeHash": digest_dir(&paths.server)?,
  });
  if !variables.is_empty() {
    properties["environment"] = json!({ "variables": variables });
  }
  resources.insert(
    "function".into(),
    json!({
      "type": "aws:lambda:Function",
      "properties": properties,
      "options": { "dependsOn": ["${rolePolicy}"] },
    }),
  );
  resources.insert(
    "functionUrl".into(),
    json!({
      "type": "aws:lambda:FunctionUrl",
      "properties": {
        "functionName": "${function.name}",
        "authorizationType": "NONE",
        "invokeMode": if lambda.streaming { "RESPONSE_STREAM" } else { "BUFFERED" },
      },
    }),
  );
  resources.insert(
    "functionUrlPermission".into(),
    json!({
      "type": "aws:lambda:Permission",
      "properties": {
        "action": "lambda:InvokeFunctionUrl",
        "function": "${function.name}",
        "principal": "*",
        "functionUrlAuthType": "NONE",
      },
    }),
  );
  Ok(())
}

fn declare_assets(resources: &mut Map<String, Value>, objects: &[StaticObject]) {
  resources.insert(
    "bucket".into(),
    json!({ "type": "aws:s3:BucketV2", "properties": { "forceDestroy": true } }),
  );
  for object in objects {
    let mut properties = json!({
      "bucket": "${bucket.id}",
      "key": literal(&object.key),
      "source": { "fn::fileAsset": path_literal(&object.source) },
      "contentType": object.content_type,
      "cacheControl": object.cache_control,
    });
    if let Some(encoding) = object.content_encoding {
      properties["contentEncoding"] = json!(encoding);
    }
    resources.insert(
      object_resource_name(&object.key),
      json!({ "type": "aws:s3:BucketObjectv2", "properties": properties }),
    );
  }
}

/// Declare the certificate when a domain needs one; returns the ARN expression to attach.
fn declare_certificate(
  resources: &mut Map<String, Value>,
  project: &ProjectConfig,
) -> Option<String> {
  let domain = project.domains.first()?;
  let name = literal(&domain.name);

  if let Some(zone) = &domain.hosted_zone_id {
    let zone = literal(zone);
    for (resource, record_type) in [("aliasRecord", "A"), ("aliasRecordIpv6", "AAAA")] {
      resources.insert(
        resource.into(),
        json!({
          "type": "aws:route53:Record",
          "properties": {
            "zoneId": zone,
            "name": name,
            "type": record_type,
            "aliases": [{
              "name": "${distribution.domainName}",
              "zoneId": "${distribution.hostedZoneId}",
              "evaluateTargetHealth": false,
            }],
          },
        }),
      );
    }
  }

  if let Some(arn) = &domain.certificate_arn {
    return Some(literal(arn));
  }

  // validation guarantees a hosted zone when no certificate is given
  let zone = literal(domain.hosted_zone_id.as_deref().unwrap_or_default());
  let mut provider = json!({ "region": "us-east-1" });
  if let Some(profile) = &project.aws.profile {
    provider["profile"] = json!(literal(profile));
  }
  resources.insert(
    "usEast1".into(),
    json!({ "type": "pulumi:providers:aws", "properties": provider }),
  );
  resources.insert(
    "certificate".into(),
    json!({
      "type": "aws:acm:Certificate",
      "properties": { "domainName": name, "validationMethod": "DNS" },
      "options": { "provider": "${usEast1}" },
    }),
  );
  resources.insert(
    "certificateRecord".into(),
    json!({
      "type": "aws:route53:Record",
      "properties": {
        "zoneId": zone,
        "name": "${certificate.domainValidationOptions[0].resourceRecordName}",
        "type": "${certificate.domainValidationOptions[0].resourceRecordType}",
        "records": ["${certificate.domainValidationOptions[0].resourceRecordValue}"],
        "ttl": 60,
        "allowOverwrite": true,
      },
    }),
  );
  resources.insert(
    "certificateValidation".into(),
    json!({
      "type": "aws:acm:CertificateValidation",
      "properties": {
        "certificateArn": "${certificate.arn}",
        "validationRecordFqdns": ["${certificateRecord.fqdn}"],
      },
      "options": { "provider": "${usEast1}" },
    }),
  );
  Some("${certificateValidation.certificateArn}".to_string())
}

fn declare_distribution(
  resources: &mut Map<String, Value>,
  project: &ProjectConfig,
  objects: &[StaticObject],
  patterns: &[String],
  certificate: Option<String>,
) {
  resources.insert(
    "originAccessControl".into(),
    json!({
      "type": "aws:cloudfront:OriginAccessControl",
      "properties": {
        "originAccessControlOriginType": "s3",
        "signingBehavior": "always",
        "signingProtocol": "sigv4",
      },
    }),
  );

  let static_behaviors: Vec<Value> = patterns
    .iter()
    .map(|pattern| {
      json!({
        "pathPattern": literal(pattern),
        "targetOriginId": "static",
        "viewerProtocolPolicy": "redirect-to-https",
        "allowedMethods": ["GET", "HEAD"],
        "cachedMethods": ["GET", "HEAD"],
        "cachePolicyId": CACHING_OPTIMIZED,
        "compress": true,
      })
    })
    .collect();

  let viewer_certificate = match &certificate {
    Some(arn) => json!({
      "acmCertificateArn": arn,
      "sslSupportMethod": "sni-only",
      "minimumProtocolVersion": "TLSv1.2_2021",
    }),
    None => json!({ "cloudfrontDefaultCertificate": true }),
  };

  let mut properties = json!({
    "enabled": true,
    "isIpv6Enabled": true,
    "httpVersion": "http2and3",
    "priceClass": "PriceClass_100",
    "comment": literal(&project.name),
    "origins": [
      {
        "originId": "static",
        "domainName": "${bucket.bucketRegionalDomainName}",
        "originAccessControlId": "${originAccessControl.id}",
      },
      {
        "originId": "function",
        "domainName": { "fn::select": [2, { "fn::split": ["/", "${functionUrl.functionUrl}"] }] },
        "customOriginConfig": {
          "httpPort": 80,
          "httpsPort": 443,
          "originProtocolPolicy": "https-only",
          "originSslProtocols": ["TLSv1.2"],
        },
      },
    ],
    "defaultCacheBehavior": {
      "targetOriginId": "function",
      "viewerProtocolPolicy": "redirect-to-https",
      "allowedMethods": ALL_METHODS,
      "cachedMethods": ["GET", "HEAD"],
      "cachePolicyId": CACHING_DISABLED,
      "originRequestPolicyId": ALL_VIEWER_EXCEPT_HOST,
      "compress": true,
    },
    "orderedCacheBehaviors": static_behaviors,
    "restrictions": { "geoRestriction": { "restrictionType": "none" } },
    "viewerCertificate": viewer_certificate,
  });
  if let Some(domain) = project.domains.first() {
    properties["aliases"] = json!([literal(&domain.name)]);
  }
  if objects.iter().any(|o| o.key == "index.html") {
    properties["defaultRootObject"] = json!("index.html");
  }
  resources.insert(
    "distribution".into(),
    json!({ "type": "aws:cloudfront:Distribution", "properties": properties }),
  );

  resources.insert(
    "bucketPolicy".into(),
    json!({
      "type": "aws:s3:BucketPolicy",
      "properties": {
        "bucket": "${bucket.id}",
        "policy": to_json_policy(json!({
          "Effect": "Allow",
          "Principal": { "Service": "cloudfront.amazonaws.com" },
          "Action": "s3:GetObject",
          "Resource": "${bucket.arn}/*",
          "Condition": { "StringEquals": { "AWS:SourceArn": "${distribution.arn}" } },
        })),
      },
    }),
  );
}

#[cfg(test)]
mod tests;
