//! Durable order queue on a store stream with one consumer group
//!
//! Delivery is at-least-once: a read moves an entry into the consumer's
//! pending list and only [`OrderQueue::acknowledge`] removes it. Entries a
//! consumer read but never acknowledged (crash, transient failure) are
//! redelivered by [`OrderQueue::consume_pending`], oldest first.

use crate::error::QueueError;
use crate::store::{DynStore, ReadMode, StoreResult, StreamEntry};
use std::time::Duration;

/// Payload of one admitted purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderEntry {
    pub order_id: i64,
    pub user_id: i64,
    pub voucher_id: i64,
}

impl OrderEntry {
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("userId", self.user_id.to_string()),
            ("voucherId", self.voucher_id.to_string()),
            ("id", self.order_id.to_string()),
        ]
    }

    pub fn from_stream(entry: &StreamEntry) -> Result<Self, QueueError> {
        let field = |name: &str| -> Result<i64, QueueError> {
            let raw = entry
                .fields
                .get(name)
                .ok_or_else(|| QueueError::corrupt(&entry.id, format!("missing field `{name}`")))?;
            raw.parse()
                .map_err(|_| QueueError::corrupt(&entry.id, format!("field `{name}` is not an id: {raw:?}")))
        };
        Ok(Self {
            order_id: field("id")?,
            user_id: field("userId")?,
            voucher_id: field("voucherId")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    /// Upper bound on one blocking read
    pub block: Duration,
}

#[derive(Clone)]
pub struct OrderQueue {
    store: DynStore,
    settings: QueueSettings,
    dead_letter: String,
}

impl OrderQueue {
    pub fn new(store: DynStore, settings: QueueSettings) -> Self {
        let dead_letter = format!("{}.dlq", settings.stream);
        Self {
            store,
            settings,
            dead_letter,
        }
    }

    pub fn stream(&self) -> &str {
        &self.settings.stream
    }

    pub fn dead_letter_stream(&self) -> &str {
        &self.dead_letter
    }

    /// Create the consumer group if it does not exist yet
    pub async fn init(&self) -> StoreResult<()> {
        self.store
            .ensure_group(&self.settings.stream, &self.settings.group)
            .await
    }

    /// Append without waiting for any consumer
    pub async fn enqueue(&self, entry: &OrderEntry) -> StoreResult<String> {
        self.store
            .append(&self.settings.stream, &entry.to_fields())
            .await
    }

    /// Next never-delivered entry, waiting up to the configured block time
    pub async fn consume(&self) -> StoreResult<Vec<StreamEntry>> {
        self.read(ReadMode::New {
            block: self.settings.block,
        })
        .await
    }

    /// Oldest entry this consumer has read but not acknowledged; never waits
    pub async fn consume_pending(&self) -> StoreResult<Vec<StreamEntry>> {
        self.read(ReadMode::Pending).await
    }

    async fn read(&self, mode: ReadMode) -> StoreResult<Vec<StreamEntry>> {
        self.store
            .read_group(
                &self.settings.stream,
                &self.settings.group,
                &self.settings.consumer,
                mode,
                1,
            )
            .await
    }

    pub async fn acknowledge(&self, entry_id: &str) -> StoreResult<()> {
        let acked = self
            .store
            .ack(
                &self.settings.stream,
                &self.settings.group,
                &[entry_id.to_string()],
            )
            .await?;
        if acked == 0 {
            tracing::debug!(entry_id = %entry_id, "Entry was already acknowledged");
        }
        Ok(())
    }

    /// Park an unprocessable entry on the dead-letter stream
    pub async fn dead_letter(&self, entry: &StreamEntry, reason: &str) -> StoreResult<String> {
        let mut fields: Vec<(&str, String)> = entry
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        fields.push(("sourceId", entry.id.clone()));
        fields.push(("reason", reason.to_string()));
        self.store.append(&self.dead_letter, &fields).await
    }

    pub async fn pending_count(&self) -> StoreResult<usize> {
        self.store
            .pending_count(&self.settings.stream, &self.settings.group)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn stream_entry(fields: &[(&str, &str)]) -> StreamEntry {
        StreamEntry {
            id: "1-0".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_entry_fields_round_trip() {
        let entry = OrderEntry {
            order_id: 42,
            user_id: 7,
            voucher_id: 3,
        };
        let fields: Vec<(String, String)> = entry
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let stream = StreamEntry {
            id: "1-0".into(),
            fields: fields.into_iter().collect(),
        };
        assert_eq!(OrderEntry::from_stream(&stream).unwrap(), entry);
    }

    #[test]
    fn test_missing_field_is_corrupt() {
        let err = OrderEntry::from_stream(&stream_entry(&[("id", "1"), ("userId", "2")])).unwrap_err();
        assert!(matches!(err, QueueError::CorruptEntry { .. }));
        assert!(err.to_string().contains("voucherId"));
    }

    #[test]
    fn test_non_numeric_field_is_corrupt() {
        let err = OrderEntry::from_stream(&stream_entry(&[
            ("id", "abc"),
            ("userId", "2"),
            ("voucherId", "3"),
        ]))
        .unwrap_err();
        assert!(matches!(err, QueueError::CorruptEntry { .. }));
    }
}
