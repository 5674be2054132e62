use anyhow::{anyhow, bail, Context, Result};
use common_auth::FallbackPolicy;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::hasher::HasherParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Production never signs with the embedded development key pair.
    pub fn key_fallback(&self) -> FallbackPolicy {
        match self {
            Environment::Development => FallbackPolicy::AllowEmbedded,
            Environment::Production => FallbackPolicy::Refuse,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub issuer: String,
    pub access_lifetime: Duration,
    pub refresh_lifetime: Duration,
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
    pub leeway_seconds: u32,
}

/// The tenant/role grant a bearer token must carry to use the admin routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminGrant {
    pub tenant: String,
    pub role: String,
}

#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub passphrase: String,
}

impl fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,
    pub grace_period: Duration,
    pub log_level: String,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub environment: Environment,
    pub token: TokenSettings,
    pub admin: AdminGrant,
    pub bootstrap: Option<BootstrapAdmin>,
    pub hasher: HasherParams,
    pub server: ServerSettings,
}

pub fn load_identity_config() -> Result<IdentityConfig> {
    load_from(|key| env::var(key).ok())
}

fn load_from<F>(lookup: F) -> Result<IdentityConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).and_then(|value| normalize_optional(&value));

    let environment = var("IDENTITY_ENV")
        .map(|value| parse_environment(&value))
        .transpose()
        .context("Failed to parse IDENTITY_ENV")?
        .unwrap_or(Environment::Development);

    let access_lifetime = var("TOKEN_AGE_ACCESS")
        .map(|value| parse_duration(&value))
        .transpose()
        .context("Failed to parse TOKEN_AGE_ACCESS")?
        .unwrap_or(Duration::from_secs(15 * 60));
    let refresh_lifetime = var("TOKEN_AGE_REFRESH")
        .map(|value| parse_duration(&value))
        .transpose()
        .context("Failed to parse TOKEN_AGE_REFRESH")?
        .unwrap_or(Duration::from_secs(7 * 24 * 60 * 60));
    if access_lifetime >= refresh_lifetime {
        bail!(
            "TOKEN_AGE_ACCESS ({}) must be shorter than TOKEN_AGE_REFRESH ({})",
            humantime::format_duration(access_lifetime),
            humantime::format_duration(refresh_lifetime)
        );
    }
    let leeway_seconds = var("TOKEN_LEEWAY_SECONDS")
        .map(|value| value.parse::<u32>())
        .transpose()
        .context("Failed to parse TOKEN_LEEWAY_SECONDS")?
        .unwrap_or(30);

    let token = TokenSettings {
        issuer: var("TOKEN_ISSUER").unwrap_or_else(|| "identity-service".to_string()),
        access_lifetime,
        refresh_lifetime,
        private_key_path: var("TOKEN_KEY_PRIVATE_PEM_PATH").map(PathBuf::from),
        public_key_path: var("TOKEN_KEY_PUBLIC_PEM_PATH").map(PathBuf::from),
        leeway_seconds,
    };

    let admin = AdminGrant {
        tenant: var("IDENTITY_ADMIN_TENANT").unwrap_or_else(|| "system".to_string()),
        role: var("IDENTITY_ADMIN_ROLE").unwrap_or_else(|| "admin".to_string()),
    };

    let bootstrap = match (
        var("IDENTITY_BOOTSTRAP_EMAIL"),
        var("IDENTITY_BOOTSTRAP_PASSPHRASE"),
    ) {
        (Some(email), Some(passphrase)) => Some(BootstrapAdmin { email, passphrase }),
        (None, None) => None,
        _ => bail!(
            "IDENTITY_BOOTSTRAP_EMAIL and IDENTITY_BOOTSTRAP_PASSPHRASE must be set together"
        ),
    };

    let defaults = HasherParams::default();
    let hasher = HasherParams {
        memory_kib: u32_from(&var, "HASH_MEMORY_KIB")?.unwrap_or(defaults.memory_kib),
        iterations: u32_from(&var, "HASH_ITERATIONS")?.unwrap_or(defaults.iterations),
        parallelism: u32_from(&var, "HASH_PARALLELISM")?.unwrap_or(defaults.parallelism),
    };

    let host = var("SERVER_HOST")
        .unwrap_or_else(|| "0.0.0.0".to_string())
        .parse::<IpAddr>()
        .context("Failed to parse SERVER_HOST")?;
    let port = var("SERVER_PORT")
        .map(|value| value.parse::<u16>())
        .transpose()
        .context("Failed to parse SERVER_PORT")?
        .unwrap_or(8086);
    let grace_period = var("SERVER_TIMEOUT_GRACESHUT")
        .map(|value| parse_duration(&value))
        .transpose()
        .context("Failed to parse SERVER_TIMEOUT_GRACESHUT")?
        .unwrap_or(Duration::from_secs(15));
    let server = ServerSettings {
        host,
        port,
        grace_period,
        log_level: var("SERVER_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
    };

    Ok(IdentityConfig {
        environment,
        token,
        admin,
        bootstrap,
        hasher,
        server,
    })
}

fn u32_from<F>(var: &F, key: &str) -> Result<Option<u32>>
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|value| value.parse::<u32>())
        .transpose()
        .with_context(|| format!("Failed to parse {key}"))
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_duration(value: &str) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|err| anyhow!("Invalid duration '{value}': {err}"))
}

fn parse_environment(value: &str) -> Result<Environment> {
    match value.trim().to_ascii_lowercase().as_str() {
        "development" | "dev" | "local" => Ok(Environment::Development),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(anyhow!(
            "Unsupported environment '{other}'. Use development or production."
        )),
    }
}
