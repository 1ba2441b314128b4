/* src/cli/core/src/main.rs */

mod build;
mod clean;
mod config;
mod context;
mod deploy;
mod detect;
mod invoke;
mod manifest;
mod shell;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use build::package::NodeToolchain;
use config::{resolve_project, write_starter_config};
use context::Context;
use deploy::engine::PulumiCli;
use deploy::run::{DeployOptions, run_deploy, run_destroy};

#[derive(Parser)]
#[command(name = "nucel", version, about = "Deploy web apps to AWS Lambda, S3 and CloudFront")]
struct Cli {
  /// Project directory (defaults to the current directory)
  #[arg(long, global = true)]
  cwd: Option<PathBuf>,
  /// Verbose diagnostics on stderr
  #[arg(long, global = true)]
  debug: bool,
  /// Treat an unparsable nucel.toml as an error
  #[arg(long, global = true)]
  strict: bool,
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Detect the framework and write a starter nucel.toml
  Init,
  /// Run the framework build and produce the deployment bundle
  Build,
  /// Build, then provision or update the stack
  Deploy {
    /// Stack name
    #[arg(short, long, default_value = "dev")]
    stack: String,
    /// Show planned changes without applying them
    #[arg(long)]
    preview: bool,
    /// Deploy the existing bundle as-is
    #[arg(long)]
    skip_build: bool,
  },
  /// Tear down every resource in the stack
  Destroy {
    /// Stack name
    #[arg(short, long, default_value = "dev")]
    stack: String,
  },
  /// Replay a Lambda event file against a locally running app
  Invoke {
    /// Path to the event JSON
    event: PathBuf,
    /// Base URL of the local server (e.g. http://localhost:3000)
    #[arg(short, long)]
    url: Option<String>,
  },
  /// Remove the bundle and Nucel's working directory
  Clean,
}

/// Warn if `.nucel/` is not covered by any gitignore rule
fn warn_nucel_not_gitignored(base_dir: &std::path::Path) {
  use std::process::Command;
  let output =
    Command::new("git").args(["check-ignore", "-q", ".nucel"]).current_dir(base_dir).output();
  // exit 1 = not ignored; other codes mean no repo or no git
  if let Ok(o) = output
    && o.status.code() == Some(1)
  {
    ui::warn(
      ".nucel/ is not in .gitignore -- consider adding it to avoid tracking build artifacts",
    );
  }
}

fn init_tracing(debug: bool) {
  let default = if debug { "nucel=debug,nucel_runtime=debug" } else { "warn" };
  let filter = EnvFilter::try_from_env("NUCEL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<()> {
  let ctx = Context::from_process(cli.cwd, cli.strict, cli.debug)?;
  tracing::debug!(cwd = %ctx.cwd.display(), strict = ctx.strict, "context ready");

  match cli.command {
    Command::Init => {
      ui::banner("init", None);
      let framework = detect::detect_framework(&ctx.cwd)?;
      if framework == detect::Framework::Unknown {
        anyhow::bail!("no supported framework detected in {}", ctx.cwd.display());
      }
      let path = write_starter_config(&ctx.cwd, framework)?;
      ui::ok(&format!("{} project -- wrote {}", framework.display_name(), path.display()));
    }
    Command::Build => {
      let project = resolve_project(&ctx)?;
      ui::banner("build", Some(&project.name));
      build::run::run_build(&project, &NodeToolchain::new(&project.root))?;
      warn_nucel_not_gitignored(&project.root);
    }
    Command::Deploy { stack, preview, skip_build } => {
      let project = resolve_project(&ctx)?;
      ui::banner("deploy", Some(&project.name));
      let engine = PulumiCli::new(&project, &stack, &ctx.env);
      let opts = DeployOptions { stack, preview, skip_build };
      run_deploy(&project, &opts, &NodeToolchain::new(&project.root), &engine)?;
    }
    Command::Destroy { stack } => {
      let project = resolve_project(&ctx)?;
      ui::banner("destroy", Some(&project.name));
      let engine = PulumiCli::new(&project, &stack, &ctx.env);
      run_destroy(&stack, &engine)?;
    }
    Command::Invoke { event, url } => {
      let event = if event.is_absolute() { event } else { ctx.cwd.join(event) };
      invoke::run_invoke(&event, url.as_deref()).await?;
    }
    Command::Clean => {
      ui::banner("clean", None);
      clean::run_clean(&ctx.cwd)?;
    }
  }
  Ok(())
}

#[tokio::main]
async fn main() {
  let cli = Cli::parse();
  let debug = cli.debug;
  init_tracing(debug);

  if let Err(err) = run(cli).await {
    tracing::error!(error = %err, "command failed");
    let mut chain = err.chain();
    if let Some(top) = chain.next() {
      ui::fail(&top.to_string());
    }
    for cause in chain {
      ui::detail(&format!("caused by: {cause}"));
    }
    if debug {
      ui::detail(&format!("{err:?}"));
    }
    std::process::exit(1);
  }
}
