use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Longest accepted token lifetime, one year
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Configuration for the storekeeper server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// URL for the database connection
    pub database_url: String,
    /// Address the HTTP server listens on
    pub bind_address: String,
    /// Secret used to sign bearer tokens; a random one is used when unset
    pub jwt_secret: Option<String>,
    /// Lifetime of issued bearer tokens, in minutes
    pub token_ttl_minutes: i64,
    /// Admin account ensured at startup, together with `admin_password`
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

/// Update structure for Config with all fields optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub bind_address: Option<String>,
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub token_ttl_minutes: Option<i64>,
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
    /// Server URL used by the CLI client; ignored by the server
    #[serde(default)]
    pub server_url: Option<String>,
}

/// Command line arguments for the server
#[derive(Parser, Debug)]
#[clap(name = "storekeeper", about = "An e-commerce backend: accounts, catalog, carts and orders")]
pub struct CliArgs {
    /// Database URL
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Address to listen on, e.g. 127.0.0.1:3000
    #[clap(long, env = "STOREKEEPER_BIND")]
    pub bind_address: Option<String>,

    /// Secret used to sign bearer tokens
    #[clap(long, env = "STOREKEEPER_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Lifetime of bearer tokens in minutes
    #[clap(long, env = "STOREKEEPER_TOKEN_TTL_MINUTES")]
    pub token_ttl_minutes: Option<i64>,

    /// Admin account to create or promote at startup
    #[clap(long, env = "STOREKEEPER_ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    /// Password for the startup admin account
    #[clap(long, env = "STOREKEEPER_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Directory for daily-rolling JSON log files
    #[clap(long, env = "STOREKEEPER_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Emit JSON logs on stdout
    #[clap(long, env = "STOREKEEPER_LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// Debug mode
    #[clap(long, env = "STOREKEEPER_DEBUG", default_value_t = false)]
    pub debug: bool,
}

impl Config {
    /// Applies a config update to the current configuration
    pub fn apply_update(self, update: ConfigUpdate) -> Self {
        Self {
            database_url: update.database_url.unwrap_or(self.database_url),
            bind_address: update.bind_address.unwrap_or(self.bind_address),
            jwt_secret: update.jwt_secret.or(self.jwt_secret),
            token_ttl_minutes: update.token_ttl_minutes.unwrap_or(self.token_ttl_minutes),
            admin_username: update.admin_username.or(self.admin_username),
            admin_password: update.admin_password.or(self.admin_password),
        }
    }

    /// Parses the bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.bind_address))
    }

    /// Returns the configured token secret, or a random one for this process
    ///
    /// Tokens signed with a random secret stop working when the server restarts.
    pub fn jwt_secret_or_random(&self) -> String {
        match &self.jwt_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                warn!("No JWT secret configured; using a random one, tokens will not survive a restart");
                Alphanumeric.sample_string(&mut rand::rng(), 48)
            }
        }
    }

    /// Rejects settings the server cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.token_ttl_minutes <= 0 {
            bail!("token_ttl_minutes must be positive, got {}", self.token_ttl_minutes);
        }
        if self.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
            bail!(
                "token_ttl_minutes must be at most {}, got {}",
                MAX_TOKEN_TTL_MINUTES,
                self.token_ttl_minutes
            );
        }
        self.socket_addr()?;
        if self.admin_username.is_some() != self.admin_password.is_some() {
            bail!("admin_username and admin_password must be set together");
        }
        Ok(())
    }
}

/// Returns the base (default) configuration
pub fn base_config(config_path: Option<PathBuf>) -> Config {
    let database_url = config_path.map_or("storekeeper.db".to_string(), |path| {
        path.join("storekeeper.db").to_string_lossy().to_string()
    });

    Config {
        database_url,
        bind_address: "127.0.0.1:3000".to_string(),
        jwt_secret: None,
        token_ttl_minutes: 60,
        admin_username: None,
        admin_password: None,
    }
}

/// Loads configuration from a TOML file
///
/// A missing path or missing file yields an empty update.
pub fn config_from_file(config_path: Option<PathBuf>) -> Result<ConfigUpdate> {
    let Some(config_path) = config_path else {
        return Ok(ConfigUpdate::default());
    };

    if !config_path.exists() {
        info!("Config file not found at {:?}, using defaults", config_path);
        return Ok(ConfigUpdate::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file {:?}", config_path))?;
    let update = toml::from_str::<ConfigUpdate>(&content)
        .with_context(|| format!("Failed to parse config file {:?}", config_path))?;

    info!("Loaded configuration from {:?}", config_path);
    Ok(update)
}

/// Loads configuration from command line arguments
pub fn config_from_args(args: CliArgs) -> ConfigUpdate {
    ConfigUpdate {
        database_url: args.database_url,
        bind_address: args.bind_address,
        jwt_secret: args.jwt_secret,
        token_ttl_minutes: args.token_ttl_minutes,
        admin_username: args.admin_username,
        admin_password: args.admin_password,
        server_url: None,
    }
}

/// Returns the platform config directory, if it can be determined
pub fn get_config_dir_path() -> Option<PathBuf> {
    match ProjectDirs::from("com", "storekeeper", "storekeeper") {
        Some(proj_dirs) => Some(proj_dirs.config_dir().to_path_buf()),
        None => {
            warn!("Could not determine XDG config directory, skipping config file");
            None
        }
    }
}

/// Gets the complete configuration by combining defaults with
/// values from config file, environment variables, and command line arguments
/// in order of increasing precedence
pub fn get_config(args: CliArgs) -> Config {
    let config_dir = get_config_dir_path().and_then(|path| {
        if !path.exists() {
            info!("Config path not found at {:?}, using defaults", path);
            None
        } else {
            Some(path)
        }
    });

    let base = base_config(config_dir.clone());

    let file_update = config_from_file(config_dir.map(|dir| dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_else(|e| {
            warn!("Ignoring config file: {:#}", e);
            ConfigUpdate::default()
        });

    // Apply updates in order of increasing precedence
    let config = base
        .apply_update(file_update)
        .apply_update(config_from_args(args));

    info!(
        "Final configuration: database_url={}, bind_address={}, token_ttl={}min, admin={}",
        config.database_url,
        config.bind_address,
        config.token_ttl_minutes,
        config.admin_username.as_deref().unwrap_or("<none>")
    );

    config
}
