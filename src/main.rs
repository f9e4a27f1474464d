use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sitesync::config::{LoggingConfig, LOCAL_CONFIG_FILE};
use sitesync::{Config, DeploymentStats, Deployer, EntryOutcome, HealthCheck, RunOptions};

#[derive(Parser)]
#[command(name = "sitesync")]
#[command(about = "Build and deploy static sites to FTP hosting")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to ./sitesync.yml, then the XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site and upload it
    Deploy {
        /// Show what would be uploaded without connecting
        #[arg(long)]
        dry_run: bool,

        /// Upload the existing build output without rebuilding
        #[arg(long)]
        skip_build: bool,

        /// Print the deployment summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file to the current directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// System health check and diagnostics
    Doctor,

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Credentials usually live in a .env file next to the site
    let dotenv_path = dotenvy::dotenv().ok();

    // Init replaces the config file, so it must not depend on the current one parsing
    if let Commands::Init { force } = cli.command {
        init_logging(cli.verbose, &LoggingConfig::default())?;
        return cmd_init(force);
    }

    // Load configuration
    let config = Config::resolve(cli.config.as_deref())?;

    init_logging(cli.verbose, &config.logging)?;
    info!("Starting sitesync v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Commands::Deploy {
            dry_run,
            skip_build,
            json,
        } => cmd_deploy(dry_run, skip_build, json, config).await,
        Commands::Init { force } => cmd_init(force),
        Commands::Doctor => cmd_doctor(&config),
        Commands::Config => cmd_config(&config),
    }
}

/// Initialize logging based on verbosity level and configuration
fn init_logging(verbose: bool, logging: &LoggingConfig) -> Result<()> {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("Invalid log level: {}", default_level))?;

    let compact = logging.format == "compact";

    tracing_subscriber::registry()
        .with(compact.then(|| {
            fmt::layer()
                .compact()
                .with_target(false)
                .with_ansi(logging.color)
                .with_writer(std::io::stderr)
        }))
        .with((!compact).then(|| {
            fmt::layer()
                .with_ansi(logging.color)
                .with_writer(std::io::stderr)
        }))
        .with(filter)
        .init();

    Ok(())
}

/// Build and upload the site
async fn cmd_deploy(dry_run: bool, skip_build: bool, json: bool, config: Config) -> Result<()> {
    if !dry_run && !config.has_credentials() {
        bail!("FTP credentials missing: set FTP_USER and FTP_PASSWORD");
    }

    // Stdout carries only the JSON document in --json mode
    if !json {
        println!("🚀 Starting deployment to {}...", config.ftp.host);
    }

    let deployer = Deployer::new(config);
    let stats = deployer
        .deploy(RunOptions {
            dry_run,
            skip_build,
        })
        .await
        .context("Deployment failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_summary(&stats, dry_run);
    }

    Ok(())
}

fn print_summary(stats: &DeploymentStats, dry_run: bool) {
    if dry_run {
        println!("\n🔍 Dry run - nothing was transferred");
    }

    println!("\n📊 Deployment Summary:");
    println!("   ✅ Files uploaded: {}", stats.uploaded);
    println!("   ⏭️  Files skipped: {}", stats.skipped);
    println!("   ❌ Errors: {}", stats.errors);
    println!("   ⏱️  Duration: {:.2}s", stats.duration.as_secs_f64());

    if stats.has_errors() {
        println!("\n🔍 Failed entries:");
        for outcome in &stats.outcomes {
            if let EntryOutcome::Failed { path, error } = outcome {
                println!("   ❌ {}: {}", path, error);
            }
        }
        println!("\n⚠️  Deployment completed with {} errors", stats.errors);
    } else {
        println!("\n🎉 Deployment completed successfully!");
    }
}

/// Write a default configuration file
fn cmd_init(force: bool) -> Result<()> {
    let path = Path::new(LOCAL_CONFIG_FILE);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", LOCAL_CONFIG_FILE);
    }

    Config::default().save(path)?;

    println!("✅ sitesync initialized successfully!");
    println!("   Config: {}", path.display());
    println!("   Next: put FTP_USER and FTP_PASSWORD in .env and run 'sitesync deploy'");

    Ok(())
}

/// System health check and diagnostics
fn cmd_doctor(config: &Config) -> Result<()> {
    let health = HealthCheck::run(config);
    print_health_report(&health);
    Ok(())
}

/// Print the effective configuration with secrets masked
fn cmd_config(config: &Config) -> Result<()> {
    let content =
        serde_yaml::to_string(&config.redacted()).context("Failed to serialize configuration")?;
    print!("{}", content);
    Ok(())
}

/// Print health check report to stdout
fn print_health_report(health: &HealthCheck) {
    use sitesync::health::CheckResult;

    fn print_check(name: &str, result: &CheckResult) {
        println!("{}:", name);
        let icon = if result.passed {
            if result.is_warning { "⚠️ " } else { "✅" }
        } else {
            "❌"
        };
        println!("  {} {}", icon, result.message);
        if let Some(details) = &result.details {
            for line in details.lines() {
                println!("     {}", line);
            }
        }
    }

    println!("🔍 sitesync System Diagnostics");
    println!();

    for (name, result) in health.all_checks() {
        print_check(name, result);
        println!();
    }

    let errors = health.errors().len();
    let warnings = health.warnings().len();

    if health.all_passed() {
        println!("✅ All checks passed ({} warnings)", warnings);
    } else {
        println!("❌ Some checks failed ({} errors, {} warnings)", errors, warnings);
    }
}
