#![deny(missing_docs)]
//! Standardized start-up for the metadata capture binaries.
//! Every entrypoint calls [CaptureEntrypoint::init] first so that tracing output
//! has the same shape in every function.

mod environment;

pub use environment::{CaptureEnvErr, ENVIRONMENT_VAR, Environment, UnknownEnvironment};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// defines how a binary is initialized
#[derive(Debug)]
pub struct CaptureEntrypoint {
    env: Environment,
}

impl Default for CaptureEntrypoint {
    fn default() -> Self {
        CaptureEntrypoint {
            env: Environment::new_or_prod(),
        }
    }
}

/// proof that [CaptureEntrypoint::init] ran
#[derive(Debug)]
pub struct InitializedEntrypoint {
    env: Environment,
}

impl InitializedEntrypoint {
    /// the environment the subscriber was configured for
    pub fn environment(&self) -> Environment {
        self.env
    }
}

/// The global subscriber could not be installed
#[derive(Debug, Error)]
#[error("failed to install the global tracing subscriber: {0}")]
pub struct EntrypointErr(String);

impl CaptureEntrypoint {
    /// create a new instance of [Self] for an explicit [Environment]
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// the environment [Self::init] will configure the subscriber for
    pub fn environment(&self) -> Environment {
        self.env
    }

    /// consume self, install the panic hook and the global subscriber
    pub fn init(self) -> Result<InitializedEntrypoint, EntrypointErr> {
        dotenv::dotenv().ok();
        std::panic::set_hook(Box::new(tracing_panic::panic_hook));

        match self.env {
            Environment::Local => {
                tracing_subscriber::fmt()
                    .with_ansi(true)
                    .with_env_filter(EnvFilter::from_default_env())
                    .with_file(true)
                    .with_line_number(true)
                    .pretty()
                    .try_init()
                    .map_err(|e| EntrypointErr(e.to_string()))?;
            }
            Environment::Production | Environment::Develop => {
                // lambda already stamps each line, the json layer only needs the event + span
                tracing_subscriber::fmt()
                    .with_ansi(false)
                    .with_env_filter(EnvFilter::from_default_env())
                    .with_file(true)
                    .with_line_number(true)
                    .without_time()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .flatten_event(true)
                    .try_init()
                    .map_err(|e| EntrypointErr(e.to_string()))?;
            }
        }

        Ok(InitializedEntrypoint { env: self.env })
    }
}
