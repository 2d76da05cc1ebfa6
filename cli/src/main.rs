//! Tenantlog CLI
//!
//! Command-line interface for the Tenantlog file log.
//!
//! # Usage
//!
//! ```bash
//! tenantlog --help
//! tenantlog emit --scope billing --level warn --tenant bot-1 "Invoice retry scheduled"
//! tenantlog read --tenant bot-1 --level warn
//! ```

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use shared::config::LoggerConfig;
use shared::logger::Logger;
use shared::models::{DisplayLevel, LogEntry, LogLevel};
use shared::persist::{
    read_file_log, LogPersister, QueuedPersister, RotatingFileSink, FILE_LOG_NAME,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tenantlog CLI - emit tenant-scoped log lines and read back the file log
#[derive(Parser)]
#[command(name = "tenantlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of the file log
    #[arg(short = 'd', long, env = "TENANTLOG_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log one message through the logger pipeline
    Emit(EmitArgs),
    /// Print entries of the file log, oldest first
    Read(ReadArgs),
}

#[derive(Args)]
struct EmitArgs {
    /// Scope the message is logged under
    #[arg(short, long)]
    scope: String,

    /// Severity: debug, info, warn, error or critical
    #[arg(short, long, default_value = "info")]
    level: LogLevel,

    /// Tenant the message belongs to
    #[arg(short, long)]
    tenant: Option<String>,

    /// Metadata as JSON
    #[arg(short, long, value_parser = parse_json)]
    meta: Option<Value>,

    /// Display threshold: 0 production, 1 dev, 2 debug
    #[arg(short, long, env = "TENANTLOG_VERBOSITY")]
    verbosity: Option<u8>,

    /// Message text
    message: String,
}

#[derive(Args)]
struct ReadArgs {
    /// Only entries of this tenant
    #[arg(short, long)]
    tenant: Option<String>,

    /// Only entries of this level
    #[arg(short, long)]
    level: Option<LogLevel>,

    /// Print raw JSON lines
    #[arg(long)]
    json: bool,
}

fn parse_json(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = LoggerConfig::from_env().context("Invalid TENANTLOG_* environment")?;
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = log_dir;
    }

    match cli.command {
        Some(Commands::Emit(args)) => emit(&args, config).await,
        Some(Commands::Read(args)) => {
            for entry in read_entries(&config.log_dir, &args)? {
                if args.json {
                    println!("{}", serde_json::to_string(&entry)?);
                } else {
                    println!("{}", render(&entry));
                }
            }
            Ok(())
        }
        None => {
            println!("Tenantlog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

async fn emit(args: &EmitArgs, mut config: LoggerConfig) -> Result<()> {
    if let Some(verbosity) = args.verbosity {
        config.verbosity = DisplayLevel::from_verbosity(verbosity);
    }

    let sink = RotatingFileSink::open(
        &config.log_dir,
        FILE_LOG_NAME,
        config.file_max_bytes,
        config.file_max_files,
    )
    .with_context(|| format!("Failed to open file log in {}", config.log_dir.display()))?;
    let file = Arc::new(QueuedPersister::spawn("file", sink, config.queue_config()));

    let logger = Logger::builder(args.scope.as_str())
        .config(&config)
        .file_persister(Arc::clone(&file) as Arc<dyn LogPersister>)
        .build();

    let mut call = logger.call();
    if let Some(tenant) = &args.tenant {
        call = call.for_tenant(tenant.as_str());
    }
    if let Some(meta) = &args.meta {
        call = call.meta(meta);
    }
    let message = args.message.as_str();
    match args.level {
        LogLevel::Debug => call.debug(message),
        LogLevel::Info => call.info(message),
        LogLevel::Warn => call.warn(message),
        LogLevel::Error => call.error(message),
        LogLevel::Critical => call.critical(message),
    }

    file.shutdown().await;
    if file.dropped() > 0 {
        anyhow::bail!("{} entries were dropped", file.dropped());
    }
    Ok(())
}

fn read_entries(dir: &Path, args: &ReadArgs) -> Result<Vec<LogEntry>> {
    let entries = read_file_log(dir, FILE_LOG_NAME)
        .with_context(|| format!("Failed to read file log in {}", dir.display()))?;
    Ok(entries
        .into_iter()
        .filter(|e| args.tenant.is_none() || e.tenant_id == args.tenant)
        .filter(|e| args.level.is_none_or(|level| e.level == level))
        .collect())
}

fn render(entry: &LogEntry) -> String {
    format!(
        "{} {:<8} {} {} {}{}",
        entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        entry.level.to_string(),
        entry.tenant_id.as_deref().unwrap_or("*"),
        entry.scope,
        entry.message,
        entry.metadata
    )
}
