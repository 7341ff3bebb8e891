//! Process configuration read from environment variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CLIENT_URL: &str = "http://localhost:5173";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }

    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Where the database lives and how to reach it.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub sslmode: Option<String>,
    pub pool_size: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl DatabaseConfig {
    /// Connection string handed to libpq. `url` wins over the discrete fields.
    pub fn connection_string(&self) -> String {
        match &self.url {
            Some(url) => match &self.sslmode {
                Some(mode) if !url.contains("sslmode=") => {
                    let separator = if url.contains('?') { '&' } else { '?' };
                    format!("{url}{separator}sslmode={mode}")
                }
                _ => url.clone(),
            },
            None => {
                let mut conninfo = format!(
                    "host={} port={} user={} password={} dbname={}",
                    quote_conninfo(&self.host),
                    self.port,
                    quote_conninfo(&self.user),
                    quote_conninfo(&self.password),
                    quote_conninfo(&self.name),
                );
                if let Some(mode) = &self.sslmode {
                    conninfo.push_str(" sslmode=");
                    conninfo.push_str(&quote_conninfo(mode));
                }
                conninfo
            }
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("sslmode", &self.sslmode)
            .field("pool_size", &self.pool_size)
            .field("connect_timeout", &self.connect_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

fn quote_conninfo(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

#[derive(Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub admin_token: Option<String>,
    pub seed_on_create: bool,
    pub database: DatabaseConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("environment", &self.environment)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("seed_on_create", &self.seed_on_create)
            .field("database", &self.database)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            port: DEFAULT_PORT,
            allowed_origins: vec![DEFAULT_CLIENT_URL.to_owned()],
            admin_token: None,
            seed_on_create: false,
            database: DatabaseConfig {
                url: None,
                host: "localhost".to_owned(),
                port: 5432,
                user: "postgres".to_owned(),
                password: "password".to_owned(),
                name: "todo_db".to_owned(),
                sslmode: None,
                pool_size: 10,
                connect_timeout: Duration::from_secs(10),
                idle_timeout: Duration::from_secs(30),
            },
        }
    }
}

impl AppConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is set but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let environment = parse_or(&var, "APP_ENV", defaults.environment)?;
        let sslmode = var("DB_SSLMODE")
            .or_else(|| environment.is_production().then(|| "require".to_owned()));

        let allowed_origins = var("CLIENT_URL")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().trim_end_matches('/').to_owned())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.allowed_origins);

        let db = defaults.database;
        let database = DatabaseConfig {
            url: var("DATABASE_URL"),
            host: var("DB_HOST").unwrap_or(db.host),
            port: parse_or(&var, "DB_PORT", db.port)?,
            user: var("DB_USER").unwrap_or(db.user),
            password: var("DB_PASSWORD").unwrap_or(db.password),
            name: var("DB_NAME").unwrap_or(db.name),
            sslmode,
            pool_size: parse_or(&var, "DB_POOL_SIZE", db.pool_size)?,
            connect_timeout: parse_or(&var, "DB_CONNECT_TIMEOUT_SECS", db.connect_timeout.as_secs())
                .map(Duration::from_secs)?,
            idle_timeout: parse_or(&var, "DB_IDLE_TIMEOUT_SECS", db.idle_timeout.as_secs())
                .map(Duration::from_secs)?,
        };

        if database.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DB_POOL_SIZE",
                message: "must be at least 1".to_owned(),
            });
        }

        Ok(Self {
            environment,
            port: parse_or(&var, "PORT", defaults.port)?,
            allowed_origins,
            admin_token: var("ADMIN_TOKEN"),
            seed_on_create: parse_or(&var, "SEED_ON_CREATE", defaults.seed_on_create)?,
            database,
        })
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.parse().map_err(|err: T::Err| ConfigError::InvalidValue {
            key,
            message: err.to_string(),
        }),
        None => Ok(default),
    }
}
