/* src/cli/core/src/deploy/mod.rs */

pub mod bundle;
pub mod engine;
pub mod program;
pub mod run;
