use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, AppConfigProvider, CliArgs};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use api_ingress::ApiIngress;
use modkit::{run, ModuleEntry, ModuleRegistry, RunOptions, ShutdownOptions};
use people::People;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// People API Server - schema-validated person records over HTTP
#[derive(Parser)]
#[command(name = "people-server")]
#[command(about = "People API Server - schema-validated person records over HTTP")]
#[command(version)]
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
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);
    wire_ingress_section(&mut config, args.port.is_some())?;

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("People API Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

/// Make `server.host`/`server.port`/`server.timeout_sec` reach the ingress section.
///
/// Keys already present under `modules.api_ingress` win, except `bind_addr` when
/// `--port` was given on the command line.
fn wire_ingress_section(config: &mut AppConfig, port_from_cli: bool) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let timeout = config.server.timeout_sec;

    let section = config
        .modules
        .entry("api_ingress".to_string())
        .or_insert_with(|| serde_json::json!({}));
    let Some(obj) = section.as_object_mut() else {
        anyhow::bail!("modules.api_ingress must be a mapping");
    };

    if port_from_cli || !obj.contains_key("bind_addr") {
        obj.insert("bind_addr".into(), bind_addr.into());
    }
    obj.entry("request_timeout_secs")
        .or_insert_with(|| timeout.into());
    Ok(())
}

fn registry() -> Result<ModuleRegistry> {
    let ingress = Arc::new(ApiIngress::default());
    let people = Arc::new(People::default());

    ModuleRegistry::builder()
        .register(
            ModuleEntry::new("api_ingress", ingress.clone())
                .with_rest_host(ingress.clone())
                .with_stateful(ingress),
        )
        .register(
            ModuleEntry::new("people", people.clone())
                .depends_on(&["api_ingress"])
                .with_rest(people),
        )
        .build()
        .map_err(Into::into)
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");

    let run_options = RunOptions {
        modules_cfg: Arc::new(AppConfigProvider::new(config)),
        registry: registry()?,
        shutdown: ShutdownOptions::Signals,
    };

    run(run_options).await
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    registry()?;
    let ingress: api_ingress::ApiIngressConfig = section(&config, "api_ingress")?;
    ingress
        .bind_addr
        .parse::<std::net::SocketAddr>()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", ingress.bind_addr, e))?;
    let _: people::PeopleConfig = section(&config, "people")?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}

/// Strictly decode one module section; a missing section means defaults.
fn section<T: serde::de::DeserializeOwned + Default>(config: &AppConfig, name: &str) -> Result<T> {
    match config.modules.get(name) {
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| anyhow::anyhow!("invalid modules.{name} config: {e}")),
        None => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> AppConfig {
        let mut c = AppConfig::default();
        c.server.host = "0.0.0.0".into();
        c.server.port = 9000;
        c.server.timeout_sec = 5;
        c
    }

    #[test]
    fn server_section_fills_missing_ingress_keys() {
        let mut c = config();
        wire_ingress_section(&mut c, false).unwrap();
        assert_eq!(
            c.modules["api_ingress"],
            json!({"bind_addr": "0.0.0.0:9000", "request_timeout_secs": 5})
        );
    }

    #[test]
    fn explicit_bind_addr_wins_unless_port_flag_is_set() {
        let mut c = config();
        c.modules.insert(
            "api_ingress".into(),
            json!({"bind_addr": "127.0.0.1:1234", "request_timeout_secs": 60}),
        );
        wire_ingress_section(&mut c, false).unwrap();
        assert_eq!(c.modules["api_ingress"]["bind_addr"], "127.0.0.1:1234");
        assert_eq!(c.modules["api_ingress"]["request_timeout_secs"], 60);

        wire_ingress_section(&mut c, true).unwrap();
        assert_eq!(c.modules["api_ingress"]["bind_addr"], "0.0.0.0:9000");
    }

    #[test]
    fn module_sections_are_decoded_strictly() {
        let mut c = config();
        c.modules
            .insert("people".into(), json!({"greeting": "hi"}));
        assert!(section::<people::PeopleConfig>(&c, "people").is_err());
        assert!(section::<api_ingress::ApiIngressConfig>(&c, "api_ingress").is_ok());
    }

    #[test]
    fn registry_orders_ingress_first() {
        let names: Vec<_> = registry().unwrap().modules().iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["api_ingress", "people"]);
    }
}
