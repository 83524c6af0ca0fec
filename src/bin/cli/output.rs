use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use storekeeper::dto::{CartView, LoginResponse, OrderDetail};
use storekeeper::models::{CartItem, Order, Product, User};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Bundled output configuration passed to all print functions
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// The output format
    pub format: OutputFormat,
    /// When true, print minimal output (just IDs or counts)
    pub quiet: bool,
}

/// Renders an amount of cents as dollars, e.g. `1999` as `$19.99`
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

/// Parses a dollar amount such as `19.99`, `5` or `$0.5` into cents
///
/// At most two decimal places are accepted.
pub fn parse_price(input: &str) -> Result<i64, String> {
    let trimmed = input.trim().trim_start_matches('$');
    let (whole, frac) = match trimmed.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (trimmed, ""),
    };

    let invalid = || format!("invalid price '{}', expected dollars like 19.99", input);

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > 2 {
        return Err(format!("invalid price '{}', at most two decimal places", input));
    }

    let dollars: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => frac.parse().map_err(|_| invalid())?,
    };

    dollars
        .checked_mul(100)
        .and_then(|d| d.checked_add(cents))
        .ok_or_else(invalid)
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: could not encode output: {}", e),
    }
}

/// Prints the result of a login
///
/// Quiet mode prints the bare token, handy for `export STOREKEEPER_TOKEN=$(...)`.
pub fn print_login(login: &LoginResponse, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", login.token);
                return;
            }
            println!("Logged in as {} ({})", login.user.get_username(), login.user.get_role());
            println!("Expires: {}", format_time(login.expires_at));
            println!("Token:   {}", login.token);
        }
        OutputFormat::Json => print_json(login),
    }
}

/// Prints a single account
pub fn print_user(user: &User, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", user.get_id());
                return;
            }
            println!("ID:       {}", user.get_id());
            println!("Username: {}", user.get_username());
            println!("Role:     {}", user.get_role());
            println!("Active:   {}", if user.is_active() { "yes" } else { "no" });
            println!("Created:  {}", format_time(user.get_created_at()));
        }
        OutputFormat::Json => print_json(user),
    }
}

/// Prints a list of accounts
pub fn print_users(users: &[User], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if users.is_empty() {
                if !config.quiet {
                    println!("No users found.");
                }
                return;
            }
            if config.quiet {
                for user in users {
                    println!("{}", user.get_id());
                }
                return;
            }
            let max_id = users.iter().map(|u| u.get_id().len()).max().unwrap_or(2);
            let max_name = users.iter().map(|u| u.get_username().len()).max().unwrap_or(8).max(8);
            println!("{:<id_w$}  {:<name_w$}  {:<8}  ACTIVE", "ID", "USERNAME", "ROLE", id_w = max_id, name_w = max_name);
            for user in users {
                println!(
                    "{:<id_w$}  {:<name_w$}  {:<8}  {}",
                    user.get_id(),
                    user.get_username(),
                    user.get_role().to_string(),
                    if user.is_active() { "yes" } else { "no" },
                    id_w = max_id,
                    name_w = max_name,
                );
            }
        }
        OutputFormat::Json => print_json(users),
    }
}

/// Prints a single product
pub fn print_product(product: &Product, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", product.get_id());
                return;
            }
            println!("ID:          {}", product.get_id());
            println!("Name:        {}", product.get_name());
            if let Some(description) = product.get_description() {
                println!("Description: {}", description);
            }
            println!("Price:       {}", format_cents(product.get_price_cents()));
            println!("Stock:       {}", product.get_stock());
            println!("Updated:     {}", format_time(product.get_updated_at()));
        }
        OutputFormat::Json => print_json(product),
    }
}

/// Prints a list of products
pub fn print_products(products: &[Product], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if products.is_empty() {
                if !config.quiet {
                    println!("No products found.");
                }
                return;
            }
            if config.quiet {
                for product in products {
                    println!("{}", product.get_id());
                }
                return;
            }
            let max_id = products.iter().map(|p| p.get_id().len()).max().unwrap_or(2);
            let max_name = products.iter().map(|p| p.get_name().len()).max().unwrap_or(4).max(4);
            println!("{:<id_w$}  {:<name_w$}  {:>12}  {:>6}", "ID", "NAME", "PRICE", "STOCK", id_w = max_id, name_w = max_name);
            for product in products {
                println!(
                    "{:<id_w$}  {:<name_w$}  {:>12}  {:>6}",
                    product.get_id(),
                    product.get_name(),
                    format_cents(product.get_price_cents()),
                    product.get_stock(),
                    id_w = max_id,
                    name_w = max_name,
                );
            }
        }
        OutputFormat::Json => print_json(products),
    }
}

/// Prints a cart line as stored
pub fn print_cart_item(item: &CartItem, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", item.get_id());
                return;
            }
            println!("Cart item {}: {} x product {}", item.get_id(), item.get_quantity(), item.get_product_id());
        }
        OutputFormat::Json => print_json(item),
    }
}

/// Prints a cart with its lines and total
pub fn print_cart(cart: &CartView, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                for line in &cart.items {
                    println!("{}", line.id);
                }
                return;
            }
            if cart.items.is_empty() {
                println!("Your cart is empty.");
                return;
            }
            let max_id = cart.items.iter().map(|l| l.id.len()).max().unwrap_or(2);
            let max_name = cart.items.iter().map(|l| l.product_name.len()).max().unwrap_or(7).max(7);
            println!("{:<id_w$}  {:<name_w$}  {:>4}  {:>12}  {:>12}", "ID", "PRODUCT", "QTY", "UNIT", "TOTAL", id_w = max_id, name_w = max_name);
            for line in &cart.items {
                let warning = if line.quantity > line.available_stock {
                    format!("  (only {} left)", line.available_stock)
                } else {
                    String::new()
                };
                println!(
                    "{:<id_w$}  {:<name_w$}  {:>4}  {:>12}  {:>12}{}",
                    line.id,
                    line.product_name,
                    line.quantity,
                    format_cents(line.unit_price_cents),
                    format_cents(line.line_total_cents),
                    warning,
                    id_w = max_id,
                    name_w = max_name,
                );
            }
            println!("Total: {}", format_cents(cart.total_cents));
        }
        OutputFormat::Json => print_json(cart),
    }
}

/// Prints an order header without its lines
pub fn print_order(order: &Order, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", order.get_id());
                return;
            }
            println!("Order {}: {} ({})", order.get_id(), order.get_status(), format_cents(order.get_total_cents()));
        }
        OutputFormat::Json => print_json(order),
    }
}

/// Prints one order with its lines
pub fn print_order_detail(detail: &OrderDetail, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", detail.order.get_id());
                return;
            }
            println!("Order:   {}", detail.order.get_id());
            println!("Owner:   {}", detail.username);
            println!("Status:  {}", detail.order.get_status());
            println!("Placed:  {}", format_time(detail.order.get_created_at()));
            for line in &detail.items {
                println!(
                    "  {} x {} @ {} = {}",
                    line.quantity,
                    line.product_name,
                    format_cents(line.price_at_purchase_cents),
                    format_cents(line.line_total_cents),
                );
            }
            println!("Total:   {}", format_cents(detail.order.get_total_cents()));
        }
        OutputFormat::Json => print_json(detail),
    }
}

/// Prints a list of orders, one summary row each
pub fn print_order_details(details: &[OrderDetail], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if details.is_empty() {
                if !config.quiet {
                    println!("No orders found.");
                }
                return;
            }
            if config.quiet {
                for detail in details {
                    println!("{}", detail.order.get_id());
                }
                return;
            }
            let max_id = details.iter().map(|d| d.order.get_id().len()).max().unwrap_or(2);
            let max_user = details.iter().map(|d| d.username.len()).max().unwrap_or(4).max(4);
            println!("{:<id_w$}  {:<user_w$}  {:<9}  {:>5}  {:>12}  PLACED", "ID", "USER", "STATUS", "ITEMS", "TOTAL", id_w = max_id, user_w = max_user);
            for detail in details {
                let units: i64 = detail.items.iter().map(|l| i64::from(l.quantity)).sum();
                println!(
                    "{:<id_w$}  {:<user_w$}  {:<9}  {:>5}  {:>12}  {}",
                    detail.order.get_id(),
                    detail.username,
                    detail.order.get_status().to_string(),
                    units,
                    format_cents(detail.order.get_total_cents()),
                    format_time(detail.order.get_created_at()),
                    id_w = max_id,
                    user_w = max_user,
                );
            }
        }
        OutputFormat::Json => print_json(details),
    }
}

/// Prints a success message (suppressed in quiet mode)
pub fn print_success(message: &str, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if !config.quiet {
                println!("{}", message);
            }
        }
        OutputFormat::Json => {
            print_json(&serde_json::json!({ "success": true, "message": message }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "$0.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(1999), "$19.99");
        assert_eq!(format_cents(100000), "$1000.00");
        assert_eq!(format_cents(-250), "-$2.50");
        assert_eq!(format_cents(i64::MIN), "-$92233720368547758.08");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("19.99"), Ok(1999));
        assert_eq!(parse_price("5"), Ok(500));
        assert_eq!(parse_price("$0.5"), Ok(50));
        assert_eq!(parse_price(".75"), Ok(75));
        assert_eq!(parse_price("3."), Ok(300));
    }

    #[test]
    fn test_parse_price_rejects_malformed() {
        for input in ["", ".", "abc", "1.234", "-1", "1,50", "99999999999999999999"] {
            assert!(parse_price(input).is_err(), "{:?} should be rejected", input);
        }
    }
}
