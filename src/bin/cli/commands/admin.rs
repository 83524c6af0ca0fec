use clap::Subcommand;
use storekeeper::models::OrderStatus;

use crate::client::StorekeeperClient;
use crate::output::{self, OutputConfig};

/// Administration commands
#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// List every account
    Users,
    /// Activate or deactivate an account
    ToggleUser {
        /// The user ID
        id: String,
    },
    /// List every order
    Orders,
    /// Move an order to a new status
    SetStatus {
        /// The order ID
        id: String,
        /// One of pending, processing, shipped, delivered, cancelled
        status: OrderStatus,
    },
}

/// Executes an administration command
pub async fn execute(
    client: &StorekeeperClient,
    cmd: AdminCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        AdminCommands::Users => {
            let users = client.list_users().await?;
            output::print_users(&users, config);
        }
        AdminCommands::ToggleUser { id } => {
            let user = client.toggle_user_active(&id).await?;
            output::print_user(&user, config);
        }
        AdminCommands::Orders => {
            let orders = client.list_all_orders().await?;
            output::print_order_details(&orders, config);
        }
        AdminCommands::SetStatus { id, status } => {
            let order = client.update_order_status(&id, status).await?;
            output::print_order(&order, config);
        }
    }
    Ok(())
}
