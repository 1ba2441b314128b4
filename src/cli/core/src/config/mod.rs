/* src/cli/core/src/config/mod.rs */

mod env;
mod loader;
mod project;
mod types;

#[cfg(test)]
mod tests;

pub use env::{ENV_FILES, is_app_variable, read_env_files};
pub use loader::{ConfigError, FieldError, find_user_config, load_user_config, write_starter_config};
pub use project::{ProjectConfig, resolve_project, sanitize_name};
pub use types::{
  AdapterSection, Architecture, AwsSection, DomainConfig, HeaderRule, LambdaConfig, RedirectRule,
  RewriteRule, UserConfig,
};
