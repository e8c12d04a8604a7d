//! Typed view of the runtime environment the handler is deployed into

use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// Name of the environment variable holding the [Environment]
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// The environment the binary is running in
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production account
    Production,
    /// Development account
    Develop,
    /// Running on a developer machine, e.g. through `cargo lambda watch`
    Local,
}

/// An error which can occur when constructing an [Environment]
#[derive(Debug, Error)]
pub enum CaptureEnvErr {
    /// The variable could not be read
    #[error("An error occurred while reading envvar: {var_name}. Err: {err}")]
    VarErr {
        /// name of the variable that was read
        var_name: &'static str,
        /// underlying lookup failure
        err: std::env::VarError,
    },
    /// The value was read but is not a known environment
    #[error("{0}")]
    InvalidValue(#[from] UnknownEnvironment),
}

/// Represents a value which cannot be converted into an [Environment]
#[derive(Debug, Error)]
#[error("Could not convert {0} into an environment value")]
pub struct UnknownEnvironment(String);

impl Environment {
    /// Attempt to construct an [Environment] from the `ENVIRONMENT` variable
    #[tracing::instrument(err, level = tracing::Level::TRACE)]
    pub fn new_from_env() -> Result<Self, CaptureEnvErr> {
        let value = std::env::var(ENVIRONMENT_VAR).map_err(|err| CaptureEnvErr::VarErr {
            var_name: ENVIRONMENT_VAR,
            err,
        })?;
        Ok(Self::from_str(&value)?)
    }

    /// Construct an [Environment] from the process environment, falling back to production
    pub fn new_or_prod() -> Self {
        Self::new_from_env().unwrap_or(Environment::Production)
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "prod"),
            Environment::Develop => write!(f, "dev"),
            Environment::Local => write!(f, "local"),
        }
    }
}

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(environment: &str) -> Result<Self, UnknownEnvironment> {
        match environment {
            "prod" => Ok(Environment::Production),
            "dev" => Ok(Environment::Develop),
            "local" => Ok(Environment::Local),
            s => Err(UnknownEnvironment(s.to_string())),
        }
    }
}
