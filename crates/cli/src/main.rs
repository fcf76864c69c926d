use clap::Parser;
use credmount_config::{ConfigLoader, LogLevel, SharedConfig};
use credmount_resolver::SecretResolver;
use credmount_store::LocalStore;
use credmount_utils::SystemCommandExecutor;
use credmount_vault::CommandVault;
use std::path::PathBuf;

mod commands;
mod execute;

use commands::Commands;

#[derive(Parser)]
#[command(name = "credmount")]
#[command(
    about = "Resolve secrets through an in-process cache, a local store and the vault",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Settings file (JSON); defaults to the user config directory
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Local store root directory
    #[arg(long, global = true, value_name = "DIR")]
    store_root: Option<PathBuf>,

    /// Do not verify the vault's TLS certificates
    #[arg(long, global = true)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let mut settings = loader.load()?;
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }
    if let Some(root) = cli.store_root {
        settings.store_root = Some(root);
    }
    if cli.insecure {
        settings.verify_tls = false;
    }
    let config = SharedConfig::new(settings);

    let log = credmount_utils::tracing::init(config.log_level().as_str())
        .map_err(eyre::Report::msg)?;
    // RUST_LOG keeps precedence over the configured level
    if std::env::var_os("RUST_LOG").is_none() {
        config.on_log_level(move |level| {
            if let Err(e) = log.set_directive(level.as_str()) {
                tracing::warn!(error = %e, "could not change log level");
            }
        });
    }

    let vault = CommandVault::new(config.clone(), Box::new(SystemCommandExecutor));
    let store = LocalStore::platform(config.clone(), Box::new(SystemCommandExecutor));
    let resolver = SecretResolver::new(Box::new(vault), store, config)?;

    cli.command.execute(&resolver)
}
