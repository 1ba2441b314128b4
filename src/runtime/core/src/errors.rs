/* src/runtime/core/src/errors.rs */

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  #[error("event is not valid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("unrecognized event shape (expected a function URL or API Gateway payload)")]
  UnrecognizedEvent,

  #[error("event body is flagged base64 but does not decode: {0}")]
  Base64(#[from] base64::DecodeError),
}
