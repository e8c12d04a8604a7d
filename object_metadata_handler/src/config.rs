use anyhow::Context;
use chrono::TimeDelta;
use object_metadata_capture::domain::models::CaptureSettings;

/// The configuration parameters for the handler, pulled from environment variables.
/// The region is resolved by the aws sdk itself from `AWS_REGION`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The DynamoDB table the metadata records are written to
    pub metadata_table: String,

    /// Total attempts, including the first, the sdk makes for each backend call
    pub store_max_attempts: u32,

    /// No new event is started with less than this left before the deadline
    pub deadline_margin: TimeDelta,

    /// Keys under these prefixes are ignored
    pub ignored_key_prefixes: Vec<String>,

    /// Report invocations with retryable failures as errors so the platform retries them
    pub propagate_retryable_failures: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let metadata_table = lookup("METADATA_TABLE")
            .filter(|table| !table.trim().is_empty())
            .context("METADATA_TABLE must be provided")?;

        let store_max_attempts = match lookup("STORE_MAX_ATTEMPTS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .context("STORE_MAX_ATTEMPTS must be a positive integer")?,
            None => 3,
        };
        if store_max_attempts == 0 {
            anyhow::bail!("STORE_MAX_ATTEMPTS must be at least 1");
        }

        let deadline_margin = match lookup("DEADLINE_MARGIN_MS") {
            Some(raw) => TimeDelta::milliseconds(
                raw.trim()
                    .parse::<u32>()
                    .context("DEADLINE_MARGIN_MS must be a non-negative integer")?
                    .into(),
            ),
            None => TimeDelta::milliseconds(500),
        };

        let ignored_key_prefixes = lookup("IGNORED_KEY_PREFIXES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|prefix| !prefix.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let propagate_retryable_failures = match lookup("PROPAGATE_RETRYABLE_FAILURES") {
            Some(raw) => raw
                .trim()
                .parse::<bool>()
                .context("PROPAGATE_RETRYABLE_FAILURES must be true or false")?,
            None => true,
        };

        Ok(Config {
            metadata_table,
            store_max_attempts,
            deadline_margin,
            ignored_key_prefixes,
            propagate_retryable_failures,
        })
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            ignored_key_prefixes: self.ignored_key_prefixes.clone(),
            deadline_margin: self.deadline_margin,
        }
    }
}
