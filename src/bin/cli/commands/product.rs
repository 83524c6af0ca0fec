use clap::Subcommand;
use storekeeper::dto::{CreateProductDto, ProductQueryDto, UpdateProductDto};

use crate::client::StorekeeperClient;
use crate::output::{self, parse_price, OutputConfig};

/// Catalog commands
#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// List products
    List {
        /// Only products whose name contains this text
        #[clap(long)]
        search: Option<String>,
        /// Only products with stock left
        #[clap(long)]
        in_stock: bool,
    },
    /// Get a specific product by ID
    Get {
        /// The product ID
        id: String,
    },
    /// Create a product (admin)
    Create {
        #[clap(long)]
        name: String,
        #[clap(long)]
        description: Option<String>,
        /// Unit price in dollars, e.g. 19.99
        #[clap(long, value_parser = parse_price)]
        price: i64,
        /// Initial stock
        #[clap(long, default_value_t = 0)]
        stock: i32,
    },
    /// Change product fields (admin)
    Update {
        /// The product ID
        id: String,
        #[clap(long)]
        name: Option<String>,
        /// New description; pass an empty string to clear it
        #[clap(long)]
        description: Option<String>,
        /// Unit price in dollars, e.g. 19.99
        #[clap(long, value_parser = parse_price)]
        price: Option<i64>,
        #[clap(long)]
        stock: Option<i32>,
    },
    /// Add or remove stock (admin)
    Stock {
        /// The product ID
        id: String,
        /// Units to add; negative to remove
        #[clap(allow_hyphen_values = true)]
        delta: i32,
    },
    /// Delete a product that was never ordered (admin)
    Delete {
        /// The product ID
        id: String,
    },
}

/// Executes a catalog command
pub async fn execute(
    client: &StorekeeperClient,
    cmd: ProductCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ProductCommands::List { search, in_stock } => {
            let query = ProductQueryDto { search, in_stock };
            let products = client.list_products(&query).await?;
            output::print_products(&products, config);
        }
        ProductCommands::Get { id } => {
            let product = client.get_product(&id).await?;
            output::print_product(&product, config);
        }
        ProductCommands::Create { name, description, price, stock } => {
            let dto = CreateProductDto { name, description, price_cents: price, stock };
            let product = client.create_product(&dto).await?;
            output::print_product(&product, config);
        }
        ProductCommands::Update { id, name, description, price, stock } => {
            let dto = UpdateProductDto { name, description, price_cents: price, stock };
            let product = client.update_product(&id, &dto).await?;
            output::print_product(&product, config);
        }
        ProductCommands::Stock { id, delta } => {
            let product = client.adjust_stock(&id, delta).await?;
            output::print_product(&product, config);
        }
        ProductCommands::Delete { id } => {
            client.delete_product(&id).await?;
            output::print_success(&format!("Deleted product {}", id), config);
        }
    }
    Ok(())
}
