use clap::Subcommand;

use crate::client::StorekeeperClient;
use crate::output::{self, OutputConfig};

/// Account commands
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Create a customer account
    Register {
        #[clap(long)]
        username: String,
        #[clap(long, env = "STOREKEEPER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and print a bearer token
    Login {
        #[clap(long)]
        username: String,
        #[clap(long, env = "STOREKEEPER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the account the current token belongs to
    Me,
}

/// Executes an account command
pub async fn execute(
    client: &StorekeeperClient,
    cmd: AuthCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        AuthCommands::Register { username, password } => {
            let user = client.register(username, password).await?;
            output::print_user(&user, config);
        }
        AuthCommands::Login { username, password } => {
            let login = client.login(username, password).await?;
            output::print_login(&login, config);
        }
        AuthCommands::Me => {
            let user = client.me().await?;
            output::print_user(&user, config);
        }
    }
    Ok(())
}
