/* src/cli/core/src/build/mod.rs */

pub mod adapter;
pub mod files;
pub mod handler;
pub mod package;
pub mod run;
pub mod types;
