//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SHOP_BASE_URL` - Public URL of the shop, used in emails and invoice links
//! - `SHOP_ADMIN_SECRET` - Shared secret for the admin back-office (high entropy)
//!
//! ## Optional
//! - `SHOP_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOP_PORT` - Listen port (default: 3000)
//! - `SHOP_UPLOAD_DIR` - Directory for uploaded images and invoices (default: uploads)
//! - `SHOP_NAME` - Display name in emails and invoices (default: Shoply)
//! - `SHOP_CURRENCY` - ISO currency code (default: CZK)
//! - `SHOP_VAT_RATE` - VAT rate in percent (default: 21)
//! - `SHOP_SHIPPING_FEE` - Flat shipping fee (default: 99)
//! - `SHOP_FREE_SHIPPING_FROM` - Subtotal from which shipping is free (default: 2000, empty disables)
//! - `SHOP_SELLER_NAME`, `SHOP_SELLER_ADDRESS`, `SHOP_SELLER_COMPANY_ID`, `SHOP_SELLER_VAT_ID`
//! - `SHOP_BANK_ACCOUNT` - IBAN for bank transfers and QR payments
//! - `SMTP_HOST` - Enables email when set; with `SMTP_PORT` (587), `SMTP_USERNAME`,
//!   `SMTP_PASSWORD`, `SMTP_FROM`
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//! - `SHOP_LOG_JSON` - Emit JSON logs when set

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use shoply_core::CurrencyCode;
use shoply_core::cart::ShippingPolicy;
use thiserror::Error;

const MIN_ADMIN_SECRET_LENGTH: usize = 24;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Shared admin secret
    pub admin_secret: SecretString,
    /// Directory for uploads and generated invoices
    pub upload_dir: PathBuf,
    /// Store-wide commercial settings
    pub store: StoreConfig,
    /// SMTP settings; email is disabled when absent
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// Emit JSON logs
    pub log_json: bool,
}

/// Prices, taxes and the seller's identity.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub name: String,
    pub currency: CurrencyCode,
    /// VAT rate in percent.
    pub vat_rate: Decimal,
    pub shipping: ShippingPolicy,
    pub seller: SellerInfo,
    /// IBAN for bank transfers; QR payments are unavailable without it.
    pub bank_account: Option<String>,
}

/// Seller block printed on invoices.
#[derive(Debug, Clone, Default)]
pub struct SellerInfo {
    pub name: String,
    pub address: String,
    pub company_id: Option<String>,
    pub vat_id: Option<String>,
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ShopConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the admin secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHOP_DATABASE_URL")?;
        let host = parse_env("SHOP_HOST", "127.0.0.1")?;
        let port = parse_env("SHOP_PORT", "3000")?;
        let base_url = get_required_env("SHOP_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SHOP_BASE_URL".to_string(), e.to_string()))?;

        let admin_secret = get_validated_secret("SHOP_ADMIN_SECRET")?;
        validate_secret_length(&admin_secret, "SHOP_ADMIN_SECRET")?;

        let upload_dir = PathBuf::from(get_env_or_default("SHOP_UPLOAD_DIR", "uploads"));
        let store = StoreConfig::from_env()?;
        let email = EmailConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);
        let log_json = get_optional_env("SHOP_LOG_JSON").is_some_and(|v| is_truthy(&v));

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            admin_secret,
            upload_dir,
            store,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            log_json,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Absolute URL for a path under the public base URL.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = get_env_or_default("SHOP_CURRENCY", "CZK")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOP_CURRENCY".to_string(), e))?;
        let vat_rate: Decimal = parse_env("SHOP_VAT_RATE", "21")?;
        if vat_rate < Decimal::ZERO || vat_rate >= Decimal::ONE_HUNDRED {
            return Err(ConfigError::InvalidEnvVar(
                "SHOP_VAT_RATE".to_string(),
                "must be between 0 and 100".to_string(),
            ));
        }
        let flat_fee = parse_env("SHOP_SHIPPING_FEE", "99")?;
        let free_from = match get_env_or_default("SHOP_FREE_SHIPPING_FROM", "2000").trim() {
            "" => None,
            value => Some(value.parse::<Decimal>().map_err(|e| {
                ConfigError::InvalidEnvVar("SHOP_FREE_SHIPPING_FROM".to_string(), e.to_string())
            })?),
        };

        let name = get_env_or_default("SHOP_NAME", "Shoply");
        let seller = SellerInfo {
            name: get_optional_env("SHOP_SELLER_NAME").unwrap_or_else(|| name.clone()),
            address: get_env_or_default("SHOP_SELLER_ADDRESS", ""),
            company_id: get_optional_env("SHOP_SELLER_COMPANY_ID"),
            vat_id: get_optional_env("SHOP_SELLER_VAT_ID"),
        };

        Ok(Self {
            name,
            currency,
            vat_rate,
            shipping: ShippingPolicy {
                flat_fee,
                free_from,
            },
            seller,
            bank_account: get_optional_env("SHOP_BANK_ACCOUNT"),
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Validate that a secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_ADMIN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
