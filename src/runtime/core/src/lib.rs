/* src/runtime/core/src/lib.rs */

pub mod env;
pub mod errors;
pub mod event;
pub mod response;

// Re-exports for ergonomic use
pub use env::{
  EnvFilter, EnvRejection, FilteredEnv, RESERVED_NAMES, RESERVED_PREFIXES, is_reserved_env_name,
  is_valid_env_name,
};
pub use errors::RuntimeError;
pub use event::{
  ApiGatewayEvent, EventKind, FunctionUrlEvent, LambdaEvent, NormalizedRequest,
};
pub use response::{FrameworkResponse, LambdaResponse, TEXT_CONTENT_TYPES, is_text_content_type};
