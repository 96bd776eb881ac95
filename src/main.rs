mod commands;
mod ui;

use bundle_rail::core::config::ErrorPolicyKind;
use bundle_rail::core::error::{BundleError, print_error};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Content-addressed debug IDs and release reconciliation for bundler output
#[derive(Parser)]
#[command(name = "bundle-rail")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Explicit config file (default: search bundle-rail.toml in the current directory)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the debug ID derived from each file's content
  Id {
    /// Files to hash
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Inject debug IDs into built JavaScript files in place
  Inject {
    /// Files or directories to instrument
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Glob patterns to skip
    #[arg(long)]
    ignore: Vec<String>,
    /// File extensions to instrument
    #[arg(long, value_delimiter = ',', default_values = ["js", "mjs", "cjs"])]
    ext: Vec<String>,
    /// Show what would be injected without writing files
    #[arg(long)]
    dry_run: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Copy instrumented bundles and their maps into an upload folder keyed by debug ID
  Prepare {
    /// Glob patterns of built assets (default: `sourcemaps.assets` from config)
    #[arg(long)]
    assets: Vec<String>,
    /// Glob patterns excluded from assets
    #[arg(long)]
    ignore: Vec<String>,
    /// Upload folder
    #[arg(long, short)]
    out: PathBuf,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Run the release pipeline (create, clean, upload, commits, finalize, deploy)
  Release {
    /// Release name (default: config, then CI environment, then git HEAD)
    #[arg(long)]
    name: Option<String>,
    /// Error policy override: raise (abort on first failure) or report (keep going)
    #[arg(long, value_parser = parse_policy)]
    policy: Option<ErrorPolicyKind>,
    /// Record the remote operations without performing them
    #[arg(long)]
    dry_run: bool,
    /// Output the pipeline report in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn parse_policy(value: &str) -> Result<ErrorPolicyKind, String> {
  match value {
    "raise" => Ok(ErrorPolicyKind::Raise),
    "report" => Ok(ErrorPolicyKind::Report),
    other => Err(format!("unknown policy '{}', expected 'raise' or 'report'", other)),
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_logging() {
  let filter = tracing_subscriber::EnvFilter::try_from_env("BUNDLE_RAIL_LOG")
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() {
  init_logging();
  let cli = Cli::parse();

  let current_dir = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => handle_error(e.into()),
  };
  let config_path = cli.config.as_deref();

  let result = match cli.command {
    Commands::Id { files, json } => commands::run_id(&files, json),
    Commands::Inject {
      paths,
      ignore,
      ext,
      dry_run,
      json,
    } => commands::run_inject(&current_dir, config_path, &paths, &ignore, &ext, dry_run, json),
    Commands::Prepare {
      assets,
      ignore,
      out,
      json,
    } => commands::run_prepare(&current_dir, config_path, assets, ignore, &out, json),
    Commands::Release {
      name,
      policy,
      dry_run,
      json,
    } => commands::run_release(&current_dir, config_path, name, policy, dry_run, json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: BundleError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
