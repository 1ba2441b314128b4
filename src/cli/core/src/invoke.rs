/* src/cli/core/src/invoke.rs */

// `nucel invoke`: replay a Lambda event against a locally running app and
// print the response the function would return. Only the JSON goes to stdout.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use nucel_runtime::{FrameworkResponse, LambdaEvent, LambdaResponse, NormalizedRequest};

pub const DEFAULT_TARGET: &str = "http://localhost:3000";

/// Headers the local client sets itself.
const SKIPPED_HEADERS: [&str; 3] = ["host", "content-length", "connection"];

pub async fn run_invoke(event_file: &Path, target: Option<&str>) -> Result<()> {
  let bytes = std::fs::read(event_file)
    .with_context(|| format!("failed to read {}", event_file.display()))?;
  let event = LambdaEvent::parse(&bytes)
    .with_context(|| format!("failed to parse {}", event_file.display()))?;
  let kind = event.kind();
  let request = event.normalize()?;

  let target = target.unwrap_or(DEFAULT_TARGET);
  tracing::info!(method = %request.method, path = %request.path_and_query(), ?kind, "invoking");

  let response = forward(&request, target).await?;
  let lambda: LambdaResponse = response.into_lambda(kind);

  let json = serde_json::to_string_pretty(&lambda)?;
  let mut stdout = std::io::stdout().lock();
  writeln!(stdout, "{json}").context("failed to write response")?;
  Ok(())
}

pub fn target_url(base: &str, request: &NormalizedRequest) -> String {
  format!("{}{}", base.trim_end_matches('/'), request.path_and_query())
}

async fn forward(request: &NormalizedRequest, base: &str) -> Result<FrameworkResponse> {
  let url = target_url(base, request);
  let method = reqwest::Method::from_bytes(request.method.as_bytes())
    .with_context(|| format!("invalid HTTP method {}", request.method))?;

  let client = reqwest::Client::builder()
    .redirect(reqwest::redirect::Policy::none())
    .build()
    .context("failed to build HTTP client")?;
  let mut builder = client.request(method, &url).header("x-forwarded-host", &request.host);
  for (name, value) in &request.headers {
    if SKIPPED_HEADERS.contains(&name.as_str()) {
      continue;
    }
    builder = builder.header(name, value);
  }
  if let Some(body) = &request.body {
    builder = builder.body(body.clone());
  }

  let resp = builder.send().await.with_context(|| format!("failed to reach {url}"))?;
  let status = resp.status().as_u16();
  let headers = resp
    .headers()
    .iter()
    .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
    .collect();
  let body = resp.bytes().await.context("failed to read response body")?.to_vec();
  tracing::debug!(status, bytes = body.len(), "local response");
  Ok(FrameworkResponse { status, headers, body })
}
