//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SNIPPETBOX_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SNIPPETBOX_USER_SESSION_SECRET` - User session signing secret (min 32 chars, high entropy)
//! - `SNIPPETBOX_ADMIN_SESSION_SECRET` - Admin session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `SNIPPETBOX_ADDR` - Bind address (default: 127.0.0.1:4000)
//! - `SNIPPETBOX_STATIC_DIR` - Static asset directory (default: ./static)
//! - `SNIPPETBOX_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## Optional (TLS)
//! - `SNIPPETBOX_TLS_CERT` - Path to a PEM certificate chain
//! - `SNIPPETBOX_TLS_KEY` - Path to a PEM private key

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tower_sessions::cookie::time::Duration;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_ADDR: &str = "127.0.0.1:4000";
const DEFAULT_STATIC_DIR: &str = "./static";

/// Sessions expire this many hours after their last renewal.
pub const SESSION_LIFETIME_HOURS: i64 = 12;

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

/// Web server configuration.
///
/// Built once at startup and shared read-only through `AppState`.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Address the listener binds to
    pub addr: SocketAddr,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Settings for the user session scope
    pub user_session: SessionScopeConfig,
    /// Settings for the admin session scope
    pub admin_session: SessionScopeConfig,
    /// TLS certificate and key paths (optional)
    pub tls: Option<TlsConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

/// Settings for one session scope.
#[derive(Clone)]
pub struct SessionScopeConfig {
    /// Cookie signing secret
    pub secret: SecretString,
    /// Inactivity lifetime
    pub lifetime: Duration,
    /// Whether the cookie survives a browser restart
    pub persist: bool,
    /// Whether the cookie carries the `Secure` attribute
    pub secure: bool,
}

impl std::fmt::Debug for SessionScopeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScopeConfig")
            .field("secret", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .field("persist", &self.persist)
            .field("secure", &self.secure)
            .finish()
    }
}

impl SessionScopeConfig {
    /// Settings with the default 12 hour lifetime and persistent cookies.
    #[must_use]
    pub fn new(secret: SecretString, secure: bool) -> Self {
        Self {
            secret,
            lifetime: Duration::hours(SESSION_LIFETIME_HOURS),
            persist: true,
            secure,
        }
    }
}

/// TLS configuration for HTTPS.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the PEM-encoded certificate chain
    pub cert_path: PathBuf,
    /// Path to the PEM-encoded private key
    pub key_path: PathBuf,
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_path = get_optional_env("SNIPPETBOX_TLS_CERT");
        let key_path = get_optional_env("SNIPPETBOX_TLS_KEY");

        match (cert_path, key_path) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SNIPPETBOX_TLS_*".to_string(),
                "Both SNIPPETBOX_TLS_CERT and SNIPPETBOX_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check,
    /// both scopes sharing one secret).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SNIPPETBOX_DATABASE_URL")?;
        let addr = get_env_or_default("SNIPPETBOX_ADDR", DEFAULT_ADDR)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SNIPPETBOX_ADDR".to_string(), e.to_string()))?;
        let static_dir = PathBuf::from(get_env_or_default(
            "SNIPPETBOX_STATIC_DIR",
            DEFAULT_STATIC_DIR,
        ));

        let user_secret = get_validated_secret("SNIPPETBOX_USER_SESSION_SECRET")?;
        validate_session_secret(&user_secret, "SNIPPETBOX_USER_SESSION_SECRET")?;
        let admin_secret = get_validated_secret("SNIPPETBOX_ADMIN_SESSION_SECRET")?;
        validate_session_secret(&admin_secret, "SNIPPETBOX_ADMIN_SESSION_SECRET")?;
        validate_distinct_secrets(&user_secret, &admin_secret)?;

        let tls = TlsConfig::from_env()?;
        let secure = tls.is_some();

        Ok(Self {
            database_url,
            addr,
            static_dir,
            user_session: SessionScopeConfig::new(user_secret, secure),
            admin_session: SessionScopeConfig::new(admin_secret, secure),
            tls,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            log_json: get_optional_env("SNIPPETBOX_LOG_JSON").is_some(),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether cookies must carry the `Secure` attribute.
    #[must_use]
    pub const fn secure_cookies(&self) -> bool {
        self.tls.is_some()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// The two scopes must not be able to forge each other's cookies.
fn validate_distinct_secrets(user: &SecretString, admin: &SecretString) -> Result<(), ConfigError> {
    if user.expose_secret() == admin.expose_secret() {
        return Err(ConfigError::InsecureSecret(
            "SNIPPETBOX_ADMIN_SESSION_SECRET".to_string(),
            "must differ from SNIPPETBOX_USER_SESSION_SECRET".to_string(),
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
    let len = s.len() as f64;
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
