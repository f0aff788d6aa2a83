//! `octane` command line: development server and database bootstrap.

mod app;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use octane_core::{AppConfig, AppContext, Application, DatabasePool, Server, ServerConfig};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Command-line interface for Octane
#[derive(Parser)]
#[command(name = "octane", version)]
#[command(about = "Octane web framework", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Environment file loaded before configuration is resolved
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the development server
    #[command(name = "server:start")]
    ServerStart {
        /// Interface to listen on
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Create an empty SQLite database
    #[command(name = "app:database")]
    AppDatabase {
        /// Database file (defaults to database.sqlite_path)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let exported = load_env(&cli.env_file);
    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.debug);
    if let Some(count) = exported {
        debug!(file = %cli.env_file.display(), count, "Environment file loaded");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        match cli.command {
            Commands::ServerStart { host, port } => match start_server(config, &host, port).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    ExitCode::FAILURE
                }
            },
            Commands::AppDatabase { path } => {
                let path = path.unwrap_or_else(|| config.database.sqlite_path.clone());
                match create_database(&path).await {
                    Ok(message) => {
                        println!("{message}");
                        ExitCode::SUCCESS
                    }
                    Err(message) => {
                        eprintln!("{message}");
                        ExitCode::FAILURE
                    }
                }
            }
        }
    })
}

/// Load `.env` when present; a missing file is not an error
fn load_env(path: &Path) -> Option<usize> {
    if !path.is_file() {
        return None;
    }
    match octane_core::config::load_env_file(path) {
        Ok(count) => Some(count),
        Err(e) => {
            eprintln!("Ignoring {}: {e}", path.display());
            None
        }
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("octane={level},octane_core={level}")));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if debug {
        builder.pretty().try_init()
    } else {
        builder.json().try_init()
    };
}

async fn start_server(config: AppConfig, host: &str, port: u16) -> Result<()> {
    let address = resolve_address(host, port)?;
    let context = AppContext::new(config);
    let app = Application::new(context, app::web_routes()).context("invalid route table")?;

    let server = Server::new(
        app,
        ServerConfig {
            address,
            ..ServerConfig::default()
        },
    );
    info!("Starting development server on http://{address}");
    server.serve().await?;
    info!("Server stopped");
    Ok(())
}

fn resolve_address(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("cannot resolve {host}:{port}"))?
        .next()
        .with_context(|| format!("no address for {host}:{port}"))
}

/// Returns the line to print on stdout, or on stderr when creation failed
async fn create_database(path: &Path) -> std::result::Result<String, String> {
    DatabasePool::create_sqlite_file(path)
        .await
        .map(|()| format!("SQLite database created successfully at: {}", path.display()))
        .map_err(|e| format!("Failed to create SQLite database: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_server_start() {
        let cli = Cli::try_parse_from(["octane", "server:start", "--port", "9000"]).unwrap();
        match cli.command {
            Commands::ServerStart { host, port } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 9000);
            }
            Commands::AppDatabase { .. } => panic!("wrong command"),
        }
        assert_eq!(cli.env_file, PathBuf::from(".env"));
    }

    #[test]
    fn test_parse_app_database() {
        let cli =
            Cli::try_parse_from(["octane", "app:database", "--path", "var/app.sqlite"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::AppDatabase { path: Some(ref p) } if p == Path::new("var/app.sqlite")
        ));
    }

    #[test]
    fn test_resolve_address() {
        assert_eq!(
            resolve_address("127.0.0.1", 8000).unwrap(),
            SocketAddr::from(([127, 0, 0, 1], 8000))
        );
    }

    #[tokio::test]
    async fn test_create_database_messages() {
        let dir = std::env::temp_dir().join(format!("octane-cli-{}", std::process::id()));
        let path = dir.join("database.sqlite");
        let message = create_database(&path).await.unwrap();
        assert!(message.starts_with("SQLite database created successfully at: "));
        assert!(path.exists());

        let blocked = path.join("nested.sqlite");
        let message = create_database(&blocked).await.unwrap_err();
        assert!(message.starts_with("Failed to create SQLite database: "));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_env_file_is_skipped() {
        assert_eq!(load_env(Path::new("/definitely/not/here/.env")), None);
    }
}
