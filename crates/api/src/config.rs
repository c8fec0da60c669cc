//! Process configuration read from the environment (and `.env`, loaded by
//! the binary before this runs).

use chrono::Duration;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "bazaar-dev-secret";

/// Longest accepted token lifetime: one year.
const MAX_JWT_EXPIRE_HOURS: i64 = 24 * 365;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    InMemory,
    Postgres { url: String },
}

/// Credentials for the operator account created at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub persistence: Persistence,
    /// `None` allows any origin.
    pub cors_origin: Option<String>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                expected: "a port number",
                value: v,
            })?,
            None => 5000,
        };

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let hours: i64 = match var("JWT_EXPIRE_HOURS") {
            Some(v) => match v.trim().parse() {
                Ok(h) if (1..=MAX_JWT_EXPIRE_HOURS).contains(&h) => h,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "JWT_EXPIRE_HOURS",
                        expected: "between 1 and 8760 hours",
                        value: v,
                    });
                }
            },
            None => 24 * 7,
        };

        let use_persistent = match var("USE_PERSISTENT_STORES") {
            Some(v) => v.trim().parse::<bool>().map_err(|_| ConfigError::Invalid {
                name: "USE_PERSISTENT_STORES",
                expected: "true or false",
                value: v,
            })?,
            None => false,
        };
        let persistence = if use_persistent {
            Persistence::Postgres {
                url: var("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?,
            }
        } else {
            Persistence::InMemory
        };

        let bootstrap_admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                name: var("ADMIN_NAME").unwrap_or_else(|| "Admin".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            port,
            jwt_secret,
            jwt_ttl: Duration::hours(hours),
            persistence,
            cors_origin: var("CORS_ORIGIN").filter(|o| o.trim() != "*"),
            bootstrap_admin,
        })
    }

    /// In-memory configuration with the given signing secret.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            port: 0,
            jwt_secret: jwt_secret.to_string(),
            jwt_ttl: Duration::hours(1),
            persistence: Persistence::InMemory,
            cors_origin: None,
            bootstrap_admin: None,
        }
    }
}
