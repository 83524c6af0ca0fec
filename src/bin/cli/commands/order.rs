use clap::Subcommand;

use crate::client::StorekeeperClient;
use crate::output::{self, OutputConfig};

/// Order commands
#[derive(Subcommand, Debug)]
pub enum OrderCommands {
    /// Check out the cart
    Place,
    /// List your orders, newest first
    List,
    /// Show one order with its lines
    Get {
        /// The order ID
        id: String,
    },
    /// Cancel a pending order
    Cancel {
        /// The order ID
        id: String,
    },
}

/// Executes an order command
pub async fn execute(
    client: &StorekeeperClient,
    cmd: OrderCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        OrderCommands::Place => {
            let detail = client.place_order().await?;
            output::print_order_detail(&detail, config);
        }
        OrderCommands::List => {
            let orders = client.list_orders().await?;
            output::print_order_details(&orders, config);
        }
        OrderCommands::Get { id } => {
            let detail = client.get_order(&id).await?;
            output::print_order_detail(&detail, config);
        }
        OrderCommands::Cancel { id } => {
            let order = client.cancel_order(&id).await?;
            output::print_order(&order, config);
        }
    }
    Ok(())
}
