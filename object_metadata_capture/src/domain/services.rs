//! This module defines the services that are exposed by this crate

use crate::{
    domain::{
        models::{
            CaptureErr, CaptureSettings, EventOutcome, EventStage, IgnoreReason, Invocation,
            InvocationSummary, ObjectChangeEvent, PersistOutcome,
        },
        ports::{
            DecodedEntry, MetadataCaptureService, MetadataRecordStore, ObjectAttributesSource,
            TimeGetter,
        },
        record::build_record,
    },
    outbound::time::DefaultTime,
};
use chrono::TimeDelta;

#[cfg(test)]
mod tests;

const CREATION_EVENT_PREFIX: &str = "ObjectCreated:";

/// Why the remaining events of a batch are not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    Deadline,
    StoreUnusable,
}

impl Halt {
    fn err(self) -> CaptureErr {
        match self {
            Halt::Deadline => CaptureErr::Timeout,
            Halt::StoreUnusable => CaptureErr::Aborted,
        }
    }
}

/// concrete struct which implements [MetadataCaptureService]
#[derive(Clone)]
pub struct MetadataCaptureImpl<S, R, T> {
    source: S,
    store: R,
    time: T,
    settings: CaptureSettings,
}

impl<S, R, T> MetadataCaptureImpl<S, R, T>
where
    S: ObjectAttributesSource,
    R: MetadataRecordStore,
    T: TimeGetter,
{
    /// create a new instance of this service
    pub fn new(source: S, store: R, time: T, settings: CaptureSettings) -> Self {
        MetadataCaptureImpl {
            source,
            store,
            time,
            settings,
        }
    }

    fn ignore_reason(&self, event: &ObjectChangeEvent) -> Option<IgnoreReason> {
        if let Some(name) = &event.event_name
            && !name.starts_with(CREATION_EVENT_PREFIX)
        {
            return Some(IgnoreReason::NotACreationEvent(name.clone()));
        }

        self.settings
            .ignored_key_prefixes
            .iter()
            .find(|prefix| event.key.starts_with(prefix.as_str()))
            .map(|prefix| IgnoreReason::IgnoredPrefix(prefix.clone()))
    }

    /// the time left for the next event, `Err` when it must not be started
    fn remaining_budget(&self, invocation: &Invocation) -> Result<Option<TimeDelta>, Halt> {
        let Some(deadline) = invocation.deadline else {
            return Ok(None);
        };

        let remaining = deadline - self.time.now() - self.settings.deadline_margin;
        if remaining <= TimeDelta::zero() {
            return Err(Halt::Deadline);
        }

        Ok(Some(remaining))
    }

    async fn capture_entry(
        &self,
        invocation: &Invocation,
        entry: DecodedEntry,
    ) -> (EventOutcome, Option<Halt>) {
        let DecodedEntry { index, event } = entry;
        let event = match event {
            Ok(event) => event,
            Err(err) => return (EventOutcome::malformed(index, &err), None),
        };

        if let Some(reason) = self.ignore_reason(&event) {
            return (EventOutcome::ignored(index, &event, reason), None);
        }

        let budget = match self.remaining_budget(invocation) {
            Ok(budget) => budget,
            Err(halt) => {
                let err = halt.err();
                return (
                    EventOutcome::failed(index, &event, EventStage::Decoded, &err),
                    Some(halt),
                );
            }
        };

        let mut stage = EventStage::Decoded;
        let result = match budget.and_then(|b| b.to_std().ok()) {
            Some(budget) => {
                match tokio::time::timeout(budget, self.run_pipeline(&event, &mut stage)).await {
                    Ok(result) => result,
                    Err(_) => Err(CaptureErr::Timeout),
                }
            }
            None => self.run_pipeline(&event, &mut stage).await,
        };

        match result {
            Ok(outcome) => (EventOutcome::persisted(index, &event, outcome), None),
            Err(err) => {
                let halt = match &err {
                    CaptureErr::Timeout => Some(Halt::Deadline),
                    CaptureErr::Persist(persist) if persist.is_fatal() => {
                        Some(Halt::StoreUnusable)
                    }
                    _ => None,
                };
                (EventOutcome::failed(index, &event, stage, &err), halt)
            }
        }
    }

    /// Decoded -> AttributesResolved -> RecordBuilt -> Persisted
    async fn run_pipeline(
        &self,
        event: &ObjectChangeEvent,
        stage: &mut EventStage,
    ) -> Result<PersistOutcome, CaptureErr> {
        let attributes = self.source.head_object(event.location()).await?;
        *stage = EventStage::AttributesResolved;

        let now = self.time.now();
        let record = build_record(event, attributes, now);
        if record.processed_at < record.upload_time {
            tracing::warn!(
                bucket = %record.bucket_name,
                key = %record.object_key,
                upload_time = %record.upload_time,
                processed_at = %record.processed_at,
                "processing time is earlier than the object's last modified time, clocks are skewed"
            );
        }
        tracing::debug!(
            key = %record.object_key,
            latency_ms = (now - event.event_time).num_milliseconds(),
            "record built"
        );
        *stage = EventStage::RecordBuilt;

        let outcome = self.store.upsert(record).await?;
        *stage = EventStage::Persisted;

        Ok(outcome)
    }
}

impl<S, R> MetadataCaptureImpl<S, R, DefaultTime>
where
    S: ObjectAttributesSource,
    R: MetadataRecordStore,
{
    /// create an instance of self passing the default impl for [TimeGetter]
    pub fn new_with_default_time(source: S, store: R, settings: CaptureSettings) -> Self {
        Self::new(source, store, DefaultTime, settings)
    }
}

impl<S, R, T> MetadataCaptureService for MetadataCaptureImpl<S, R, T>
where
    S: ObjectAttributesSource,
    R: MetadataRecordStore,
    T: TimeGetter,
{
    #[tracing::instrument(skip(self, invocation, entries), fields(request_id = %invocation.request_id))]
    async fn capture_batch<I>(&self, invocation: Invocation, entries: I) -> InvocationSummary
    where
        I: IntoIterator<Item = DecodedEntry> + Send,
        I::IntoIter: Send,
    {
        let mut outcomes = Vec::new();
        let mut halted: Option<Halt> = None;

        for entry in entries {
            let outcome = match halted {
                Some(halt) => halted_outcome(entry, halt),
                None => {
                    let (outcome, halt) = self.capture_entry(&invocation, entry).await;
                    if let Some(halt) = halt {
                        tracing::warn!(?halt, "skipping the remaining events of this batch");
                    }
                    halted = halt;
                    outcome
                }
            };

            outcome.log();
            outcomes.push(outcome);
        }

        let summary = InvocationSummary {
            request_id: invocation.request_id,
            outcomes,
        };
        summary.log();
        summary
    }
}

/// outcome of an entry that comes after the batch was halted, no backend is called
fn halted_outcome(entry: DecodedEntry, halt: Halt) -> EventOutcome {
    match entry.event {
        Ok(event) => EventOutcome::failed(entry.index, &event, EventStage::Decoded, &halt.err()),
        Err(err) => EventOutcome::malformed(entry.index, &err),
    }
}
