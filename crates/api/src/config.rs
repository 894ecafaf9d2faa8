//! Application configuration loaded from environment variables.

use std::fmt;

use sqlx::postgres::PgConnectOptions;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string (default: none)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
///
/// Without `DATABASE_URL`, the connection is built from `DB_USERNAME`,
/// `DB_PASSWORD`, `DB_NAME` and `DB_HOST` (default `localhost`, optionally
/// `host:port`) when the first three are all set. With no database at all
/// the server runs on the in-memory store.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database: Option<DatabaseConfig>,
    pub database_max_connections: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let database = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .map(DatabaseConfig::Url)
            .or_else(|| DatabaseConfig::from_parts(&lookup));

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.database_max_connections),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the PostgreSQL store connects.
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// A complete connection string from `DATABASE_URL`.
    Url(String),
    /// Separate settings, passed to the driver as-is so the password needs
    /// no URL escaping.
    Parts {
        host: String,
        port: Option<u16>,
        username: String,
        password: String,
        name: String,
    },
}

impl DatabaseConfig {
    fn from_parts(lookup: &impl Fn(&str) -> Option<String>) -> Option<Self> {
        let username = lookup("DB_USERNAME")?;
        let password = lookup("DB_PASSWORD")?;
        let name = lookup("DB_NAME")?;
        let host = lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string());
        let (host, port) = match host.rsplit_once(':') {
            Some((bare, port)) if !bare.contains(':') => match port.parse() {
                Ok(port) => (bare.to_string(), Some(port)),
                Err(_) => (host, None),
            },
            _ => (host, None),
        };
        Some(Self::Parts {
            host,
            port,
            username,
            password,
            name,
        })
    }

    /// Builds the driver's connect options.
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match self {
            Self::Url(url) => url.parse(),
            Self::Parts {
                host,
                port,
                username,
                password,
                name,
            } => {
                let options = PgConnectOptions::new()
                    .host(host)
                    .username(username)
                    .password(password)
                    .database(name);
                Ok(match port {
                    Some(port) => options.port(*port),
                    None => options,
                })
            }
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(_) => f.write_str("Url(..)"),
            Self::Parts {
                host,
                port,
                username,
                name,
                ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("username", username)
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database: None,
            database_max_connections: 5,
        }
    }
}
