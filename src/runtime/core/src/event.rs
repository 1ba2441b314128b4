/* src/runtime/core/src/event.rs */

// Incoming Lambda payloads and their normalization into a single request shape.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

use crate::errors::RuntimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
  /// Function URL invocation (payload format 2.0)
  FunctionUrl,
  /// API Gateway REST invocation with a stage (payload format 1.0)
  ApiGateway,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionUrlEvent {
  pub raw_path: String,
  #[serde(default)]
  pub raw_query_string: String,
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
  #[serde(default)]
  pub cookies: Vec<String>,
  pub request_context: FunctionUrlContext,
  #[serde(default)]
  pub body: Option<String>,
  #[serde(default)]
  pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionUrlContext {
  pub http: HttpContext,
  #[serde(default)]
  pub domain_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpContext {
  pub method: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayEvent {
  pub http_method: String,
  pub path: String,
  // API Gateway sends `null` rather than omitting these
  #[serde(default)]
  pub headers: Option<BTreeMap<String, String>>,
  #[serde(default)]
  pub multi_value_headers: Option<BTreeMap<String, Vec<String>>>,
  #[serde(default)]
  pub query_string_parameters: Option<BTreeMap<String, String>>,
  #[serde(default)]
  pub multi_value_query_string_parameters: Option<BTreeMap<String, Vec<String>>>,
  pub request_context: ApiGatewayContext,
  #[serde(default)]
  pub body: Option<String>,
  #[serde(default)]
  pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayContext {
  pub stage: String,
  #[serde(default)]
  pub domain_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LambdaEvent {
  FunctionUrl(FunctionUrlEvent),
  ApiGateway(ApiGatewayEvent),
}

/// Platform-independent request handed to the framework entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
  pub method: String,
  pub host: String,
  pub path: String,
  pub query: Option<String>,
  /// Lowercased names; repeated names keep one entry per value.
  pub headers: Vec<(String, String)>,
  pub body: Option<Vec<u8>>,
}

impl NormalizedRequest {
  pub fn url(&self) -> String {
    format!("https://{}{}", self.host, self.path_and_query())
  }

  pub fn path_and_query(&self) -> String {
    match &self.query {
      Some(q) => format!("{}?{q}", self.path),
      None => self.path.clone(),
    }
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
  }
}

impl LambdaEvent {
  pub fn parse(bytes: &[u8]) -> Result<Self, RuntimeError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    Self::deserialize(value).map_err(|_| RuntimeError::UnrecognizedEvent)
  }

  pub fn kind(&self) -> EventKind {
    match self {
      Self::FunctionUrl(_) => EventKind::FunctionUrl,
      Self::ApiGateway(_) => EventKind::ApiGateway,
    }
  }

  pub fn normalize(&self) -> Result<NormalizedRequest, RuntimeError> {
    match self {
      Self::FunctionUrl(ev) => normalize_function_url(ev),
      Self::ApiGateway(ev) => normalize_api_gateway(ev),
    }
  }
}

fn normalize_function_url(ev: &FunctionUrlEvent) -> Result<NormalizedRequest, RuntimeError> {
  let mut headers: Vec<(String, String)> =
    ev.headers.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.clone())).collect();
  // Payload 2.0 moves cookies out of the header map
  if !ev.cookies.is_empty() {
    headers.retain(|(k, _)| k != "cookie");
    headers.push(("cookie".to_string(), ev.cookies.join("; ")));
  }
  let host = pick_host(&headers, ev.request_context.domain_name.as_deref());
  let method = ev.request_context.http.method.to_ascii_uppercase();
  let query = (!ev.raw_query_string.is_empty()).then(|| ev.raw_query_string.clone());
  let body = decode_body(&method, ev.body.as_deref(), ev.is_base64_encoded)?;
  Ok(NormalizedRequest { method, host, path: ev.raw_path.clone(), query, headers, body })
}

fn normalize_api_gateway(ev: &ApiGatewayEvent) -> Result<NormalizedRequest, RuntimeError> {
  let mut headers = Vec::new();
  match (&ev.multi_value_headers, &ev.headers) {
    (Some(multi), _) if !multi.is_empty() => {
      for (k, values) in multi {
        for v in values {
          headers.push((k.to_ascii_lowercase(), v.clone()));
        }
      }
    }
    (_, Some(single)) => {
      headers.extend(single.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.clone())));
    }
    _ => {}
  }
  let host = pick_host(&headers, ev.request_context.domain_name.as_deref());
  let method = ev.http_method.to_ascii_uppercase();
  let path = strip_stage(&ev.path, &ev.request_context.stage);
  let query = encode_query(
    ev.multi_value_query_string_parameters.as_ref(),
    ev.query_string_parameters.as_ref(),
  );
  let body = decode_body(&method, ev.body.as_deref(), ev.is_base64_encoded)?;
  Ok(NormalizedRequest { method, host, path, query, headers, body })
}

fn pick_host(headers: &[(String, String)], domain_name: Option<&str>) -> String {
  headers
    .iter()
    .find(|(k, _)| k == "host")
    .map(|(_, v)| v.clone())
    .or_else(|| domain_name.map(str::to_string))
    .unwrap_or_else(|| "localhost".to_string())
}

/// Drop a leading `/{stage}` segment; `$default` stages never prefix the path.
fn strip_stage(path: &str, stage: &str) -> String {
  if stage.is_empty() || stage == "$default" {
    return path.to_string();
  }
  let prefix = format!("/{stage}");
  match path.strip_prefix(&prefix) {
    Some("") => "/".to_string(),
    Some(rest) if rest.starts_with('/') => rest.to_string(),
    _ => path.to_string(),
  }
}

fn encode_query(
  multi: Option<&BTreeMap<String, Vec<String>>>,
  single: Option<&BTreeMap<String, String>>,
) -> Option<String> {
  let mut ser = url::form_urlencoded::Serializer::new(String::new());
  let mut any = false;
  match (multi, single) {
    (Some(m), _) if !m.is_empty() => {
      for (k, values) in m {
        for v in values {
          ser.append_pair(k, v);
          any = true;
        }
      }
    }
    (_, Some(s)) => {
      for (k, v) in s {
        ser.append_pair(k, v);
        any = true;
      }
    }
    _ => {}
  }
  any.then(|| ser.finish())
}

fn decode_body(
  method: &str,
  body: Option<&str>,
  is_base64: bool,
) -> Result<Option<Vec<u8>>, RuntimeError> {
  if method == "GET" || method == "HEAD" {
    return Ok(None);
  }
  match body {
    None | Some("") => Ok(None),
    Some(b) if is_base64 => Ok(Some(STANDARD.decode(b)?)),
    Some(b) => Ok(Some(b.as_bytes().to_vec())),
  }
}
