mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use client::StorekeeperClient;
use output::{OutputConfig, OutputFormat};
use std::process;
use storekeeper::config;

/// CLI for the Storekeeper shop backend
#[derive(Parser, Debug)]
#[clap(name = "storekeeper-cli", about = "CLI for the Storekeeper shop backend")]
struct Cli {
    /// Server URL to connect to
    #[clap(long, env = "STOREKEEPER_URL", global = true)]
    server_url: Option<String>,

    /// Bearer token from `auth login`
    #[clap(long, env = "STOREKEEPER_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    format: OutputFormat,

    /// Quiet mode: minimal output (just IDs or counts)
    #[clap(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register, log in, inspect the current account
    #[command(subcommand)]
    Auth(commands::auth::AuthCommands),
    /// Browse and manage the catalog
    #[command(subcommand)]
    Product(commands::product::ProductCommands),
    /// Manage your shopping cart
    #[command(subcommand)]
    Cart(commands::cart::CartCommands),
    /// Place and track orders
    #[command(subcommand)]
    Order(commands::order::OrderCommands),
    /// Administer accounts and orders
    #[command(subcommand)]
    Admin(commands::admin::AdminCommands),
}

/// Resolves the server URL from CLI args, config file, or the default
///
/// Precedence: CLI flag / env var > config file > http://localhost:3000
fn resolve_server_url(cli_url: Option<String>) -> String {
    if let Some(url) = cli_url {
        return url;
    }

    if let Some(dir) = config::get_config_dir_path() {
        let config_path = dir.join(config::CONFIG_FILE_NAME);
        if let Ok(update) = config::config_from_file(Some(config_path)) {
            if let Some(url) = update.server_url {
                return url;
            }
        }
    }

    "http://localhost:3000".to_string()
}

/// Formats an error for human-readable stderr output
fn format_error(err: &dyn std::error::Error) -> String {
    let err_string = err.to_string();

    if err_string.contains("error sending request")
        || err_string.contains("connection refused")
        || err_string.contains("Connection refused")
        || err_string.contains("tcp connect error")
    {
        return format!(
            "Could not connect to server. Is storekeeper running?\n  {}",
            err_string
        );
    }

    err_string
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let server_url = resolve_server_url(cli.server_url);
    let client = StorekeeperClient::new(server_url, cli.token);
    let output_config = OutputConfig {
        format: cli.format,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Auth(cmd) => commands::auth::execute(&client, cmd, &output_config).await,
        Commands::Product(cmd) => commands::product::execute(&client, cmd, &output_config).await,
        Commands::Cart(cmd) => commands::cart::execute(&client, cmd, &output_config).await,
        Commands::Order(cmd) => commands::order::execute(&client, cmd, &output_config).await,
        Commands::Admin(cmd) => commands::admin::execute(&client, cmd, &output_config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", format_error(e.as_ref()));
        process::exit(1);
    }
}
