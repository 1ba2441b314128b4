/* src/runtime/core/src/response.rs */

// Conversion of a framework response into the shape Lambda expects back.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::event::EventKind;

#[derive(Debug, Clone, Default)]
pub struct FrameworkResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LambdaResponse {
  pub status_code: u16,
  pub headers: BTreeMap<String, String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub cookies: Vec<String>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub multi_value_headers: BTreeMap<String, Vec<String>>,
  pub body: String,
  pub is_base64_encoded: bool,
}

/// Exact content types (besides `text/*`, `+json`, `+xml`) whose bodies travel as plain strings.
pub const TEXT_CONTENT_TYPES: &[&str] = &[
  "application/json",
  "application/javascript",
  "application/ecmascript",
  "application/xml",
  "application/x-www-form-urlencoded",
  "application/graphql",
  "image/svg+xml",
];

pub fn is_text_content_type(content_type: &str) -> bool {
  let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
  essence.starts_with("text/")
    || essence.ends_with("+json")
    || essence.ends_with("+xml")
    || TEXT_CONTENT_TYPES.contains(&essence.as_str())
}

impl FrameworkResponse {
  pub fn content_type(&self) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
      .map(|(_, v)| v.as_str())
  }

  pub fn into_lambda(self, kind: EventKind) -> LambdaResponse {
    let textual = self.content_type().is_some_and(is_text_content_type);

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    let mut set_cookies = Vec::new();
    for (name, value) in self.headers {
      let name = name.to_ascii_lowercase();
      if name == "set-cookie" {
        set_cookies.push(value);
        continue;
      }
      headers
        .entry(name)
        .and_modify(|existing| {
          existing.push_str(", ");
          existing.push_str(&value);
        })
        .or_insert(value);
    }

    let (cookies, multi_value_headers) = match kind {
      EventKind::FunctionUrl => (set_cookies, BTreeMap::new()),
      EventKind::ApiGateway if set_cookies.is_empty() => (Vec::new(), BTreeMap::new()),
      EventKind::ApiGateway => {
        (Vec::new(), BTreeMap::from([("set-cookie".to_string(), set_cookies)]))
      }
    };

    let (body, is_base64_encoded) = if self.body.is_empty() {
      (String::new(), false)
    } else if textual {
      match String::from_utf8(self.body) {
        Ok(s) => (s, false),
        Err(e) => (STANDARD.encode(e.as_bytes()), true),
      }
    } else {
      (STANDARD.encode(&self.body), true)
    };

    LambdaResponse {
      status_code: self.status,
      headers,
      cookies,
      multi_value_headers,
      body,
      is_base64_encoded,
    }
  }
}
