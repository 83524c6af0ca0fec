use clap::Subcommand;

use crate::client::StorekeeperClient;
use crate::output::{self, OutputConfig};

/// Shopping cart commands
#[derive(Subcommand, Debug)]
pub enum CartCommands {
    /// Show the cart with totals
    Show,
    /// Add a product to the cart
    Add {
        /// The product ID
        product_id: String,
        #[clap(long, short = 'n', default_value_t = 1)]
        quantity: i32,
    },
    /// Set the quantity of a cart line
    Set {
        /// The cart item ID
        item_id: String,
        quantity: i32,
    },
    /// Remove a line from the cart
    Remove {
        /// The cart item ID
        item_id: String,
    },
    /// Empty the cart
    Clear,
}

/// Executes a cart command
pub async fn execute(
    client: &StorekeeperClient,
    cmd: CartCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        CartCommands::Show => {
            let cart = client.get_cart().await?;
            output::print_cart(&cart, config);
        }
        CartCommands::Add { product_id, quantity } => {
            let item = client.add_to_cart(product_id, quantity).await?;
            output::print_cart_item(&item, config);
        }
        CartCommands::Set { item_id, quantity } => {
            let item = client.update_cart_item(&item_id, quantity).await?;
            output::print_cart_item(&item, config);
        }
        CartCommands::Remove { item_id } => {
            client.remove_from_cart(&item_id).await?;
            output::print_success(&format!("Removed cart item {}", item_id), config);
        }
        CartCommands::Clear => {
            let removed = client.clear_cart().await?;
            output::print_success(&format!("Removed {} cart item(s)", removed), config);
        }
    }
    Ok(())
}
