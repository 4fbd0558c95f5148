//! Process configuration read from environment variables.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use accountdesk_infra::Argon2Cost;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 480;
const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_ADMIN_NAME: &str = "Administrator";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("ADMIN_EMAIL and ADMIN_PASSWORD must be set together")]
    IncompleteAdmin,
}

/// Administrator created at startup when no account uses its email yet.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub argon2: Argon2Cost,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind", &self.bind)
            .field("session_ttl", &self.session_ttl)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .field("argon2", &self.argon2)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    /// Defaults for everything except the signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            bootstrap_admin: None,
            argon2: Argon2Cost::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });
        let mut config = Self::new(jwt_secret);

        let bind = get("ACCOUNTDESK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        config.bind = bind.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
            key: "ACCOUNTDESK_BIND",
            value: bind.clone(),
            reason: e.to_string(),
        })?;

        if let Some(minutes) = get("SESSION_TTL_MINUTES") {
            let parsed = parse_positive("SESSION_TTL_MINUTES", &minutes)?;
            config.session_ttl = Duration::minutes(i64::from(parsed));
        }

        if let Some(v) = get("ARGON2_MEMORY_KIB") {
            config.argon2.memory_kib = parse_positive("ARGON2_MEMORY_KIB", &v)?;
        }
        if let Some(v) = get("ARGON2_ITERATIONS") {
            config.argon2.iterations = parse_positive("ARGON2_ITERATIONS", &v)?;
        }
        if let Some(v) = get("ARGON2_PARALLELISM") {
            config.argon2.parallelism = parse_positive("ARGON2_PARALLELISM", &v)?;
        }

        config.bootstrap_admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password,
                display_name: get("ADMIN_NAME").unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string()),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteAdmin),
        };

        Ok(config)
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let parsed: u32 = value.parse().map_err(|_| invalid("expected a positive integer"))?;
    if parsed == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(parsed)
}
