//! Web application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BIZGROW_DATABASE_URL` - `PostgreSQL` connection string for the session store
//!   (falls back to `DATABASE_URL`)
//! - `BIZGROW_BASE_URL` - Public URL of the site, used for storefront links and QR codes
//! - `SUPABASE_URL` - Project URL of the hosted backend (e.g. `https://abc.supabase.co`)
//! - `SUPABASE_ANON_KEY` - Public anon key of the project
//!
//! ## Optional
//! - `BIZGROW_HOST` - Bind address (default: 127.0.0.1)
//! - `BIZGROW_PORT` - Listen port (default: 3000)
//! - `BIZGROW_UTC_OFFSET_MINUTES` - Store-local offset for date bucketing (default: 330, IST)
//! - `BIZGROW_CONTENT_DIR` - Marketing markdown directory (default: crates/web/content)
//! - `BIZGROW_STATIC_DIR` - Static assets directory (default: crates/web/static)
//! - `BIZGROW_LOG_JSON` - Emit JSON logs when set to `1` or `true`
//! - `SUPABASE_STORAGE_BUCKET` - Bucket for product and logo images (default: product-images)
//! - `SUPABASE_DETECT_FUNCTION` - Edge function for AI detection (default: detect-products)
//! - `SUPABASE_SERVICE_ROLE_KEY` - Service key, only read by the CLI
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::FixedOffset;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_SERVICE_KEY_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Web application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// `PostgreSQL` URL of the session store (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL without trailing slash
    pub base_url: String,
    /// Hosted backend configuration
    pub supabase: SupabaseConfig,
    /// Offset used to turn order timestamps into calendar days
    pub utc_offset: FixedOffset,
    /// Directory holding marketing markdown
    pub content_dir: PathBuf,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Emit JSON formatted logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Hosted backend (Supabase) configuration.
///
/// Implements `Debug` manually to redact keys.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL without trailing slash
    pub url: String,
    /// Anon key, sent as `apikey` on every request
    pub anon_key: SecretString,
    /// Service role key (CLI only; bypasses row-level security)
    pub service_role_key: Option<SecretString>,
    /// Storage bucket for uploaded images
    pub storage_bucket: String,
    /// Name of the product detection edge function
    pub detect_function: String,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("storage_bucket", &self.storage_bucket)
            .field("detect_function", &self.detect_function)
            .finish()
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BIZGROW_DATABASE_URL")?;
        let host = get_env_or_default("BIZGROW_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BIZGROW_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("BIZGROW_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BIZGROW_PORT".to_string(), e.to_string()))?;
        let base_url = get_url("BIZGROW_BASE_URL")?;
        let utc_offset = parse_utc_offset(get_optional_env("BIZGROW_UTC_OFFSET_MINUTES").as_deref())?;

        let supabase = SupabaseConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            supabase,
            utc_offset,
            content_dir: PathBuf::from(get_env_or_default(
                "BIZGROW_CONTENT_DIR",
                "crates/web/content",
            )),
            static_dir: PathBuf::from(get_env_or_default(
                "BIZGROW_STATIC_DIR",
                "crates/web/static",
            )),
            log_json: get_optional_env("BIZGROW_LOG_JSON")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Public URL of a store's catalogue.
    #[must_use]
    pub fn storefront_url(&self, store_id: impl std::fmt::Display) -> String {
        format!("{}/store/{store_id}", self.base_url)
    }
}

impl SupabaseConfig {
    /// Load backend settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `SUPABASE_URL` or `SUPABASE_ANON_KEY` are missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: get_url("SUPABASE_URL")?,
            anon_key: SecretString::from(get_required_env("SUPABASE_ANON_KEY")?),
            service_role_key: None,
            storage_bucket: get_env_or_default("SUPABASE_STORAGE_BUCKET", "product-images"),
            detect_function: get_env_or_default("SUPABASE_DETECT_FUNCTION", "detect-products"),
        })
    }

    /// Load backend settings including the validated service role key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the service key is missing, short, or looks
    /// like a placeholder.
    pub fn from_env_with_service_role() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::from_env()?;
        config.service_role_key = Some(get_validated_secret("SUPABASE_SERVICE_ROLE_KEY")?);
        Ok(config)
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
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a required absolute http(s) URL, normalised without trailing slash.
fn get_url(key: &str) -> Result<String, ConfigError> {
    let raw = get_required_env(key)?;
    normalize_url(&raw).map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
}

fn normalize_url(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Parse the store-local UTC offset in minutes.
fn parse_utc_offset(raw: Option<&str>) -> Result<FixedOffset, ConfigError> {
    let invalid = |reason: String| {
        ConfigError::InvalidEnvVar("BIZGROW_UTC_OFFSET_MINUTES".to_string(), reason)
    };
    let minutes = match raw {
        Some(value) => value
            .trim()
            .parse::<i32>()
            .map_err(|e| invalid(e.to_string()))?,
        None => DEFAULT_UTC_OFFSET_MINUTES,
    };
    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| invalid(format!("{minutes} minutes is out of range")))
}

/// Parse a Sentry sample rate between 0 and 1.
fn parse_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = raw
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be between 0 and 1".to_string(),
        ));
    }
    Ok(rate)
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
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is long enough, not a placeholder, and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SERVICE_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_SERVICE_KEY_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_config() -> WebConfig {
        WebConfig {
            database_url: SecretString::from("postgres://localhost/bizgrow_sessions"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://bizgrow.example.in".to_string(),
            supabase: SupabaseConfig {
                url: "https://abc.supabase.co".to_string(),
                anon_key: SecretString::from("anon-key-value"),
                service_role_key: Some(SecretString::from("service-key-value")),
                storage_bucket: "product-images".to_string(),
                detect_function: "detect-products".to_string(),
            },
            utc_offset: FixedOffset::east_opt(330 * 60).unwrap(),
            content_dir: PathBuf::from("content"),
            static_dir: PathBuf::from("static"),
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-service-role-key-goes-right-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_too_short() {
        assert!(validate_secret_strength("aB3$xY9!", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_normalize_url_strips_trailing_slash() {
        assert_eq!(
            normalize_url("https://abc.supabase.co/").unwrap(),
            "https://abc.supabase.co"
        );
        assert!(normalize_url("ftp://abc.supabase.co").is_err());
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(
            parse_utc_offset(None).unwrap().local_minus_utc(),
            330 * 60
        );
        assert_eq!(
            parse_utc_offset(Some("-300")).unwrap().local_minus_utc(),
            -300 * 60
        );
        assert!(parse_utc_offset(Some("abc")).is_err());
        assert!(parse_utc_offset(Some("100000")).is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = sample_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_storefront_url() {
        let id = "6f1c2a7e-1b7c-4e5f-9a0b-2c3d4e5f6a7b";
        assert_eq!(
            sample_config().storefront_url(id),
            format!("https://bizgrow.example.in/store/{id}")
        );
    }

    #[test]
    fn test_supabase_config_debug_redacts_keys() {
        let debug_output = format!("{:?}", sample_config().supabase);
        assert!(debug_output.contains("abc.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("anon-key-value"));
        assert!(!debug_output.contains("service-key-value"));
    }
}
