use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use sea_orm::{ConnectOptions, Database};
use url::Url;

use api_ingress::{ApiIngress, ApiIngressConfig};
use storefront::{StorefrontConfig, StorefrontModule};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Storefront Server - digital goods catalog, purchases and downloads
#[derive(Parser)]
#[command(name = "storefront-server")]
#[command(about = "Storefront Server - digital goods catalog, purchases and downloads")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, config.home_dir());
    tracing::info!("Storefront Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

/// Only sqlite is linked into this build.
fn ensure_sqlite(cfg: &DatabaseConfig) -> Result<()> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;
    match url.scheme() {
        "sqlite" => Ok(()),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

/// Decode and cross-check every section the server consumes.
fn validate(config: &AppConfig) -> Result<(StorefrontConfig, ApiIngressConfig)> {
    let db = config
        .database
        .as_ref()
        .ok_or_else(|| anyhow!("database section is required"))?;
    ensure_sqlite(db)?;

    let storefront: StorefrontConfig = config.module_config("storefront")?;
    let ingress: ApiIngressConfig = config.module_config("api_ingress")?;

    let identity = &storefront.identity;
    if identity.hs256_secret.is_some() == identity.rs256_public_key_pem.is_some() {
        return Err(anyhow!(
            "modules.storefront.identity: set exactly one of hs256_secret or rs256_public_key_pem"
        ));
    }

    ApiIngress::new(ingress.clone()).bind_addr(&config.server.host, config.server.port)?;
    Ok((storefront, ingress))
}

async fn run_server(config: AppConfig) -> Result<()> {
    let (storefront_cfg, ingress_cfg) = validate(&config)?;
    let home = config.home_dir().to_path_buf();

    let db_cfg = config
        .database
        .as_ref()
        .ok_or_else(|| anyhow!("database section is required"))?;
    let dsn = db_cfg.resolved_url(&home)?;

    let mut opts = ConnectOptions::new(dsn.clone());
    opts.acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    if dsn == "sqlite::memory:" {
        // every pooled connection would otherwise open its own empty database
        opts.max_connections(1);
    } else if let Some(max) = db_cfg.max_conns {
        opts.max_connections(max);
    }

    tracing::info!("Connecting to database: {}", dsn);
    let db = Database::connect(opts)
        .await
        .with_context(|| format!("failed to connect to {dsn}"))?;

    let module = StorefrontModule::init(db, &storefront_cfg, &home).await?;

    let ingress = ApiIngress::new(ingress_cfg).with_openapi(&StorefrontModule::openapi())?;
    let addr = ingress.bind_addr(&config.server.host, config.server.port)?;
    let router = ingress.build_router(module.router())?;

    api_ingress::serve(router, addr, async {
        if let Err(e) = runtime::shutdown::wait_for_shutdown().await {
            tracing::error!("failed to listen for shutdown signals: {e:#}");
        }
    })
    .await
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    validate(&config)?;
    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
