//! Types flowing through the capture pipeline: per-event errors and outcomes, and the
//! summary of one invocation

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

pub use models_object_metadata::{
    MetadataRecord, ObjectAttributes, ObjectChangeEvent, ObjectLocation, UNKNOWN_ATTRIBUTE,
};


/// A notification entry could not be turned into an [ObjectChangeEvent]
#[derive(Debug, Error)]
pub enum DecodeErr {
    /// the entry does not have the shape of a storage notification
    #[error("notification entry could not be read: {0}")]
    Shape(String),
    /// the entry has no bucket name
    #[error("notification entry has no bucket name")]
    MissingBucket {
        /// the key, if the entry had one
        key: Option<String>,
    },
    /// the entry has no object key
    #[error("notification entry for bucket {bucket} has no object key")]
    MissingKey {
        /// the bucket named by the entry
        bucket: String,
    },
    /// the key is not valid url encoded utf-8
    #[error("object key {key} is not valid url encoded utf-8")]
    KeyEncoding {
        /// the bucket named by the entry
        bucket: String,
        /// the raw, still encoded key
        key: String,
    },
}

impl DecodeErr {
    /// the bucket named by the entry, when it had one
    pub fn bucket(&self) -> Option<&str> {
        match self {
            DecodeErr::Shape(_) | DecodeErr::MissingBucket { .. } => None,
            DecodeErr::MissingKey { bucket } | DecodeErr::KeyEncoding { bucket, .. } => {
                Some(bucket)
            }
        }
    }

    /// the key named by the entry, when it had one
    pub fn key(&self) -> Option<&str> {
        match self {
            DecodeErr::Shape(_) | DecodeErr::MissingKey { .. } => None,
            DecodeErr::MissingBucket { key } => key.as_deref(),
            DecodeErr::KeyEncoding { key, .. } => Some(key),
        }
    }
}

/// The attributes of an object could not be fetched
#[derive(Debug, Error)]
pub enum ResolveErr {
    /// the object was deleted before its metadata could be read
    #[error("object {0} no longer exists")]
    ObjectNotFound(ObjectLocation),
    /// the storage backend failed
    #[error("storage backend unavailable: {0:#}")]
    BackendUnavailable(anyhow::Error),
    /// the storage backend answered without a mandatory attribute
    #[error("storage backend did not report a valid {field} for {location}")]
    IncompleteMetadata {
        /// the object that was queried
        location: ObjectLocation,
        /// the missing attribute
        field: &'static str,
    },
}

/// The record could not be written to the metadata store
#[derive(Debug, Error)]
pub enum PersistErr {
    /// the store is throttling writes
    #[error("metadata store throttled the write: {0:#}")]
    Throttled(anyhow::Error),
    /// the store refused the write, e.g. missing table or permissions
    #[error("metadata store rejected the write: {0:#}")]
    Rejected(anyhow::Error),
    /// the store could not be reached
    #[error("metadata store is unreachable: {0:#}")]
    Unreachable(anyhow::Error),
    /// any other store failure
    #[error("metadata store unavailable: {0:#}")]
    Unavailable(anyhow::Error),
}

impl PersistErr {
    /// true when every following write of this invocation is expected to fail the same way
    pub fn is_fatal(&self) -> bool {
        matches!(self, PersistErr::Rejected(_) | PersistErr::Unreachable(_))
    }
}

/// Any failure of one event's pipeline
#[derive(Debug, Error)]
pub enum CaptureErr {
    /// see [DecodeErr]
    #[error(transparent)]
    Decode(#[from] DecodeErr),
    /// see [ResolveErr]
    #[error(transparent)]
    Resolve(#[from] ResolveErr),
    /// see [PersistErr]
    #[error(transparent)]
    Persist(#[from] PersistErr),
    /// the invocation ran out of time before this event completed
    #[error("invocation deadline exceeded")]
    Timeout,
    /// not attempted because the metadata store is unusable for this invocation
    #[error("not attempted, the metadata store is unusable")]
    Aborted,
}

impl CaptureErr {
    /// the [FailureKind] this error is reported as
    pub fn kind(&self) -> FailureKind {
        match self {
            CaptureErr::Decode(_) => FailureKind::MalformedEvent,
            CaptureErr::Resolve(ResolveErr::ObjectNotFound(_)) => FailureKind::ObjectNotFound,
            CaptureErr::Resolve(_) => FailureKind::BackendUnavailable,
            CaptureErr::Persist(_) => FailureKind::Persistence,
            CaptureErr::Timeout => FailureKind::Timeout,
            CaptureErr::Aborted => FailureKind::Aborted,
        }
    }
}

/// Why an event ended in failure
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// the notification entry was unusable
    MalformedEvent,
    /// the object was gone by the time it was queried
    ObjectNotFound,
    /// the storage backend failed
    BackendUnavailable,
    /// the metadata store failed
    Persistence,
    /// the invocation deadline passed
    Timeout,
    /// skipped after the metadata store became unusable
    Aborted,
}

impl FailureKind {
    /// contained failures are logged but do not fail the invocation
    pub fn is_contained(self) -> bool {
        matches!(self, FailureKind::ObjectNotFound)
    }

    /// retryable failures may succeed if the batch is delivered again
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FailureKind::BackendUnavailable
                | FailureKind::Persistence
                | FailureKind::Timeout
                | FailureKind::Aborted
        )
    }
}

/// The last stage an event reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventStage {
    /// raw notification entry
    Received,
    /// turned into an [ObjectChangeEvent]
    Decoded,
    /// [ObjectAttributes] fetched
    AttributesResolved,
    /// [MetadataRecord] built
    RecordBuilt,
    /// record accepted by the store
    Persisted,
}

/// The result of a successful write
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PersistOutcome {
    /// the record was created or replaced
    Written,
    /// the store already holds a record processed later, which is kept
    Superseded,
}

/// Why an event was deliberately not processed
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// the notification is for something other than an object creation
    NotACreationEvent(String),
    /// the key is under a prefix configured to be skipped
    IgnoredPrefix(String),
}

/// Terminal state of one event
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// the record is stored
    Persisted(PersistOutcome),
    /// the event was skipped without touching any backend
    Ignored(IgnoreReason),
    /// the event failed
    Failed {
        /// the failure classification
        kind: FailureKind,
        /// the last stage reached before failing
        stage: EventStage,
        /// human readable cause
        reason: String,
    },
}

/// One event's outcome, with enough identity to trace it in the logs
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EventOutcome {
    /// position of the entry in the delivered batch
    pub index: usize,
    /// bucket of the object, if the entry named one
    pub bucket: Option<String>,
    /// decoded key of the object, if the entry named one
    pub key: Option<String>,
    /// terminal state
    pub status: OutcomeStatus,
}

impl EventOutcome {
    /// successful outcome for an event
    pub fn persisted(index: usize, event: &ObjectChangeEvent, outcome: PersistOutcome) -> Self {
        Self {
            index,
            bucket: Some(event.bucket.clone()),
            key: Some(event.key.clone()),
            status: OutcomeStatus::Persisted(outcome),
        }
    }

    /// ignored outcome for an event
    pub fn ignored(index: usize, event: &ObjectChangeEvent, reason: IgnoreReason) -> Self {
        Self {
            index,
            bucket: Some(event.bucket.clone()),
            key: Some(event.key.clone()),
            status: OutcomeStatus::Ignored(reason),
        }
    }

    /// failed outcome for an event which was decoded
    pub fn failed(
        index: usize,
        event: &ObjectChangeEvent,
        stage: EventStage,
        err: &CaptureErr,
    ) -> Self {
        Self {
            index,
            bucket: Some(event.bucket.clone()),
            key: Some(event.key.clone()),
            status: OutcomeStatus::Failed {
                kind: err.kind(),
                stage,
                reason: err.to_string(),
            },
        }
    }

    /// failed outcome for an entry which could not be decoded
    pub fn malformed(index: usize, err: &DecodeErr) -> Self {
        Self {
            index,
            bucket: err.bucket().map(str::to_string),
            key: err.key().map(str::to_string),
            status: OutcomeStatus::Failed {
                kind: FailureKind::MalformedEvent,
                stage: EventStage::Received,
                reason: err.to_string(),
            },
        }
    }

    /// the failure kind, if this outcome is a failure of any kind
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.status {
            OutcomeStatus::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// true when this outcome makes the invocation fail
    pub fn is_failure(&self) -> bool {
        self.failure_kind().is_some_and(|kind| !kind.is_contained())
    }

    /// writes this outcome to the operational log
    pub fn log(&self) {
        let bucket = self.bucket.as_deref();
        let key = self.key.as_deref();
        match &self.status {
            OutcomeStatus::Persisted(outcome) => {
                tracing::info!(index = self.index, bucket, key, outcome = %outcome, "metadata stored");
            }
            OutcomeStatus::Ignored(reason) => {
                tracing::info!(index = self.index, bucket, key, outcome = "ignored", reason = ?reason, "event ignored");
            }
            OutcomeStatus::Failed {
                kind,
                stage,
                reason,
            } if kind.is_contained() => {
                tracing::warn!(index = self.index, bucket, key, outcome = %kind, stage = %stage, reason, "event skipped");
            }
            OutcomeStatus::Failed {
                kind,
                stage,
                reason,
            } => {
                tracing::error!(index = self.index, bucket, key, outcome = %kind, stage = %stage, reason, "event failed");
            }
        }
    }
}

/// Identity and time budget of one invocation
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// platform request id
    pub request_id: String,
    /// the point in time the platform stops the invocation
    pub deadline: Option<DateTime<Utc>>,
}

/// Knobs of the capture service
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// keys starting with any of these prefixes are ignored
    pub ignored_key_prefixes: Vec<String>,
    /// no new event is started when less than this is left before the deadline
    pub deadline_margin: TimeDelta,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            ignored_key_prefixes: Vec::new(),
            deadline_margin: TimeDelta::milliseconds(500),
        }
    }
}

/// Overall result of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvocationOutcome {
    /// no event failed
    AllSucceeded,
    /// some events failed, others did not
    PartialFailure,
    /// every event failed
    AllFailed,
}

/// The structured value returned to the platform
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    /// 200 on success, 400 when only permanent failures occurred, 500 when a retry may help
    pub status_code: u16,
    /// human readable summary
    pub body: String,
}

/// Every event outcome of one invocation, in delivery order
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InvocationSummary {
    /// platform request id
    pub request_id: String,
    /// one entry per delivered notification entry
    pub outcomes: Vec<EventOutcome>,
}

impl InvocationSummary {
    /// number of events whose record is stored
    pub fn persisted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Persisted(_)))
            .count()
    }

    /// number of events deliberately skipped
    pub fn ignored(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Ignored(_)))
            .count()
    }

    /// the outcomes that make the invocation fail
    pub fn failures(&self) -> impl Iterator<Item = &EventOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// failure counts per kind, contained failures included
    pub fn failure_counts(&self) -> BTreeMap<FailureKind, usize> {
        self.outcomes
            .iter()
            .filter_map(EventOutcome::failure_kind)
            .fold(BTreeMap::new(), |mut acc, kind| {
                *acc.entry(kind).or_default() += 1;
                acc
            })
    }

    /// classify the invocation
    pub fn outcome(&self) -> InvocationOutcome {
        let failed = self.failures().count();
        match failed {
            0 => InvocationOutcome::AllSucceeded,
            n if n == self.outcomes.len() => InvocationOutcome::AllFailed,
            _ => InvocationOutcome::PartialFailure,
        }
    }

    /// true when delivering the same batch again may succeed
    pub fn is_retryable(&self) -> bool {
        self.failures()
            .filter_map(EventOutcome::failure_kind)
            .any(FailureKind::is_retryable)
    }

    /// the http-like status reported to the platform
    pub fn status_code(&self) -> u16 {
        match self.outcome() {
            InvocationOutcome::AllSucceeded => 200,
            _ if self.is_retryable() => 500,
            _ => 400,
        }
    }

    /// human readable summary, e.g. `stored metadata for 2 of 3 objects; 1 failed (malformed_event: 1)`
    pub fn body(&self) -> String {
        let mut body = format!(
            "stored metadata for {} of {} objects",
            self.persisted(),
            self.outcomes.len()
        );

        let ignored = self.ignored();
        if ignored > 0 {
            body.push_str(&format!("; {ignored} ignored"));
        }

        let counts = self.failure_counts();
        let (contained, failed): (Vec<_>, Vec<_>) =
            counts.iter().partition(|(kind, _)| kind.is_contained());

        let missing: usize = contained.iter().map(|(_, n)| **n).sum();
        if missing > 0 {
            body.push_str(&format!("; {missing} no longer exist"));
        }

        let failed_total: usize = failed.iter().map(|(_, n)| **n).sum();
        if failed_total > 0 {
            let detail = failed
                .iter()
                .map(|(kind, n)| format!("{kind}: {n}"))
                .collect::<Vec<_>>()
                .join(", ");
            body.push_str(&format!("; {failed_total} failed ({detail})"));
        }

        body
    }

    /// the value returned to the platform
    pub fn response(&self) -> InvocationResponse {
        InvocationResponse {
            status_code: self.status_code(),
            body: self.body(),
        }
    }

    /// writes the invocation summary to the operational log
    pub fn log(&self) {
        let outcome = self.outcome();
        let status_code = self.status_code();
        let failed = self.failures().count();
        if failed == 0 {
            tracing::info!(request_id = %self.request_id, outcome = %outcome, status_code, total = self.outcomes.len(), persisted = self.persisted(), "invocation complete");
        } else {
            tracing::error!(request_id = %self.request_id, outcome = %outcome, status_code, total = self.outcomes.len(), persisted = self.persisted(), failed, "invocation complete with failures");
        }
    }
}
