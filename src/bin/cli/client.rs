use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use storekeeper::dto::{
    AddToCartDto, AdjustStockDto, CartView, ClearCartResponse, CreateProductDto, LoginDto,
    LoginResponse, OrderDetail, ProductQueryDto, RegisterDto, UpdateCartItemDto,
    UpdateOrderStatusDto, UpdateProductDto,
};
use storekeeper::models::{CartItem, Order, OrderStatus, Product, User};

/// Error type for CLI client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Server returned an error status with a message body
    #[error("Server error ({}): {message}", status.as_u16())]
    Server { status: reqwest::StatusCode, message: String },
    /// Network/connection/request error
    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

/// Extension trait for checking HTTP responses and extracting server error messages
trait ResponseExt {
    /// Checks for error status and extracts the server's error message body
    async fn check(self) -> Result<reqwest::Response, ClientError>;
}

impl ResponseExt for reqwest::Response {
    async fn check(self) -> Result<reqwest::Response, ClientError> {
        if self.status().is_success() {
            return Ok(self);
        }
        let status = self.status();
        let message = match self.json::<serde_json::Value>().await {
            Ok(body) => body.get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("Unknown error")
                .to_string(),
            Err(_) => format!("HTTP {}", status),
        };
        Err(ClientError::Server { status, message })
    }
}

/// HTTP client wrapper for communicating with the Storekeeper server
pub struct StorekeeperClient {
    /// The base URL of the server (e.g. "http://localhost:3000")
    base_url: String,
    /// Bearer token sent with every request, when set
    token: Option<String>,
    /// The underlying HTTP client
    client: Client,
}

impl StorekeeperClient {
    /// Creates a new StorekeeperClient
    ///
    /// ### Arguments
    ///
    /// * `base_url` - The base URL of the Storekeeper server
    /// * `token` - A bearer token from `auth login`, if any
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
        }
    }

    /// Starts a request to `path`, authenticated when a token is set
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and decodes the JSON body of a successful response
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?.check().await?;
        Ok(response.json().await?)
    }

    // ── Auth endpoints ───────────────────────────────────────────────

    /// Registers a new customer account
    pub async fn register(&self, username: String, password: String) -> Result<User, ClientError> {
        let dto = RegisterDto { username, password };
        self.send(self.request(Method::POST, "/auth/register").json(&dto)).await
    }

    /// Logs in and returns a bearer token
    pub async fn login(&self, username: String, password: String) -> Result<LoginResponse, ClientError> {
        let dto = LoginDto { username, password };
        self.send(self.request(Method::POST, "/auth/login").json(&dto)).await
    }

    /// Returns the account the token belongs to
    pub async fn me(&self) -> Result<User, ClientError> {
        self.send(self.request(Method::GET, "/auth/me")).await
    }

    // ── Product endpoints ────────────────────────────────────────────

    /// Lists products with optional filters
    pub async fn list_products(&self, query: &ProductQueryDto) -> Result<Vec<Product>, ClientError> {
        let mut params: Vec<(&'static str, String)> = Vec::new();
        if let Some(ref search) = query.search {
            params.push(("search", search.clone()));
        }
        if query.in_stock {
            params.push(("in_stock", "true".to_string()));
        }
        self.send(self.request(Method::GET, "/products").query(&params)).await
    }

    /// Gets a specific product by ID
    pub async fn get_product(&self, id: &str) -> Result<Product, ClientError> {
        self.send(self.request(Method::GET, &format!("/products/{}", id))).await
    }

    /// Creates a new product (admin)
    pub async fn create_product(&self, dto: &CreateProductDto) -> Result<Product, ClientError> {
        self.send(self.request(Method::POST, "/products").json(dto)).await
    }

    /// Applies a partial update to a product (admin)
    pub async fn update_product(&self, id: &str, dto: &UpdateProductDto) -> Result<Product, ClientError> {
        self.send(self.request(Method::PATCH, &format!("/products/{}", id)).json(dto)).await
    }

    /// Adds `delta` units to a product's stock (admin)
    pub async fn adjust_stock(&self, id: &str, delta: i32) -> Result<Product, ClientError> {
        let dto = AdjustStockDto { delta };
        self.send(self.request(Method::POST, &format!("/products/{}/stock", id)).json(&dto)).await
    }

    /// Deletes a product (admin)
    pub async fn delete_product(&self, id: &str) -> Result<(), ClientError> {
        self.request(Method::DELETE, &format!("/products/{}", id))
            .send()
            .await?
            .check()
            .await?;
        Ok(())
    }

    // ── Cart endpoints ───────────────────────────────────────────────

    /// Gets the caller's cart
    pub async fn get_cart(&self) -> Result<CartView, ClientError> {
        self.send(self.request(Method::GET, "/cart")).await
    }

    /// Adds units of a product to the cart
    pub async fn add_to_cart(&self, product_id: String, quantity: i32) -> Result<CartItem, ClientError> {
        let dto = AddToCartDto { product_id, quantity };
        self.send(self.request(Method::POST, "/cart/items").json(&dto)).await
    }

    /// Sets the quantity of a cart line
    pub async fn update_cart_item(&self, item_id: &str, quantity: i32) -> Result<CartItem, ClientError> {
        let dto = UpdateCartItemDto { quantity };
        self.send(self.request(Method::PATCH, &format!("/cart/items/{}", item_id)).json(&dto)).await
    }

    /// Removes a line from the cart
    pub async fn remove_from_cart(&self, item_id: &str) -> Result<(), ClientError> {
        self.request(Method::DELETE, &format!("/cart/items/{}", item_id))
            .send()
            .await?
            .check()
            .await?;
        Ok(())
    }

    /// Empties the cart, returning how many lines were removed
    pub async fn clear_cart(&self) -> Result<usize, ClientError> {
        let response: ClearCartResponse = self.send(self.request(Method::DELETE, "/cart")).await?;
        Ok(response.removed)
    }

    // ── Order endpoints ──────────────────────────────────────────────

    /// Places an order from the cart
    pub async fn place_order(&self) -> Result<OrderDetail, ClientError> {
        self.send(self.request(Method::POST, "/orders")).await
    }

    /// Lists the caller's orders
    pub async fn list_orders(&self) -> Result<Vec<OrderDetail>, ClientError> {
        self.send(self.request(Method::GET, "/orders")).await
    }

    /// Gets one order
    pub async fn get_order(&self, id: &str) -> Result<OrderDetail, ClientError> {
        self.send(self.request(Method::GET, &format!("/orders/{}", id))).await
    }

    /// Cancels one of the caller's pending orders
    pub async fn cancel_order(&self, id: &str) -> Result<Order, ClientError> {
        self.send(self.request(Method::POST, &format!("/orders/{}/cancel", id))).await
    }

    // ── Admin endpoints ──────────────────────────────────────────────

    /// Lists every account (admin)
    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        self.send(self.request(Method::GET, "/admin/users")).await
    }

    /// Flips an account's active flag (admin)
    pub async fn toggle_user_active(&self, id: &str) -> Result<User, ClientError> {
        self.send(self.request(Method::POST, &format!("/admin/users/{}/toggle-active", id))).await
    }

    /// Lists every order (admin)
    pub async fn list_all_orders(&self) -> Result<Vec<OrderDetail>, ClientError> {
        self.send(self.request(Method::GET, "/admin/orders")).await
    }

    /// Moves an order to a new status (admin)
    pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<Order, ClientError> {
        let dto = UpdateOrderStatusDto { status };
        self.send(self.request(Method::PATCH, &format!("/admin/orders/{}/status", id)).json(&dto)).await
    }
}
