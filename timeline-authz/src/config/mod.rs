use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Verification settings for access tokens. Exactly one key source is set.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Option<String>,
    pub public_key_path: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl AuthzConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment: Environment = lookup("ENVIRONMENT")
            .unwrap_or_else(|| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;
        let var = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let config = AuthzConfig {
            common,
            environment: environment.clone(),
            service_name: var("SERVICE_NAME", Some("timeline-authz"))?,
            service_version: var("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")))?,
            log_level: var("LOG_LEVEL", Some("info"))?,
            database: DatabaseConfig {
                url: var("DATABASE_URL", None)?,
                max_connections: parse_u32(
                    "DATABASE_MAX_CONNECTIONS",
                    &var("DATABASE_MAX_CONNECTIONS", Some("10"))?,
                )?,
                min_connections: parse_u32(
                    "DATABASE_MIN_CONNECTIONS",
                    &var("DATABASE_MIN_CONNECTIONS", Some("1"))?,
                )?,
            },
            jwt: JwtConfig {
                secret: lookup("JWT_SECRET").filter(|s| !s.is_empty()),
                public_key_path: lookup("JWT_PUBLIC_KEY_PATH").filter(|s| !s.is_empty()),
                issuer: lookup("JWT_ISSUER").filter(|s| !s.is_empty()),
                audience: lookup("JWT_AUDIENCE").filter(|s| !s.is_empty()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        match (&self.jwt.secret, &self.jwt.public_key_path) {
            (Some(_), Some(_)) => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Set only one of JWT_SECRET or JWT_PUBLIC_KEY_PATH"
                )));
            }
            (None, None) => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "One of JWT_SECRET or JWT_PUBLIC_KEY_PATH is required"
                )));
            }
            _ => {}
        }

        if self.database.max_connections == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MAX_CONNECTIONS must be greater than 0"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        if self.environment == Environment::Prod {
            if self.jwt.secret.is_some() {
                tracing::warn!(
                    "Shared-secret token verification in production - prefer JWT_PUBLIC_KEY_PATH"
                );
            }
            if self.jwt.audience.is_none() {
                tracing::warn!("JWT_AUDIENCE not set; token audience is not checked");
            }
        }

        Ok(())
    }
}

fn get_env<F>(
    lookup: &F,
    key: &str,
    default: Option<&str>,
    is_prod: bool,
) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, AppError> {
    value
        .parse()
        .map_err(|e: std::num::ParseIntError| {
            AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e))
        })
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
