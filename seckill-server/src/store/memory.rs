//! In-process store
//!
//! All state sits behind one mutex, so every trait method (including the
//! stock gate) runs as a single indivisible step, the same guarantee a Redis
//! server gives its scripts. Expiry uses `tokio::time::Instant`, which lets
//! tests drive leases and TTLs with a paused clock.

use super::keys::{admission_key, stock_key};
use super::{ReadMode, SharedStore, StoreError, StoreResult, StreamEntry, gate_code};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

type EntryId = (u64, u64);

#[derive(Debug)]
struct StringValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StringValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Default)]
struct ConsumerGroup {
    last_delivered: EntryId,
    /// entry id -> consumer name
    pending: BTreeMap<EntryId, String>,
}

#[derive(Debug, Default)]
struct Stream {
    entries: BTreeMap<EntryId, HashMap<String, String>>,
    last_id: EntryId,
    groups: HashMap<String, ConsumerGroup>,
}

impl Stream {
    fn next_id(&mut self) -> EntryId {
        let now = shared::util::now_millis().max(0) as u64;
        let id = if now > self.last_id.0 {
            (now, 0)
        } else {
            (self.last_id.0, self.last_id.1 + 1)
        };
        self.last_id = id;
        id
    }

    fn push(&mut self, fields: HashMap<String, String>) -> EntryId {
        let id = self.next_id();
        self.entries.insert(id, fields);
        id
    }
}

#[derive(Debug, Default)]
struct Inner {
    strings: HashMap<String, StringValue>,
    sets: HashMap<String, HashSet<String>>,
    streams: HashMap<String, Stream>,
}

impl Inner {
    fn live_value(&mut self, key: &str) -> Option<&mut StringValue> {
        let now = Instant::now();
        if self.strings.get(key).is_some_and(|v| !v.is_live(now)) {
            self.strings.remove(key);
        }
        self.strings.get_mut(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    appended: Notify,
    unavailable: AtomicBool,
}

fn format_id((ms, seq): EntryId) -> String {
    format!("{ms}-{seq}")
}

fn parse_id(id: &str) -> Option<EntryId> {
    let (ms, seq) = id.split_once('-')?;
    Some((ms.parse().ok()?, seq.parse().ok()?))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`StoreError::Unavailable`]
    /// until switched back (outage simulation)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of entries ever appended to `stream` and still retained
    pub fn stream_len(&self, stream: &str) -> usize {
        self.inner
            .lock()
            .streams
            .get(stream)
            .map_or(0, |s| s.entries.len())
    }

    /// Remaining native TTL of a string key
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let mut inner = self.inner.lock();
        let expires_at = inner.live_value(key)?.expires_at?;
        Some(expires_at.saturating_duration_since(Instant::now()))
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    fn read_new(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> StoreResult<Vec<StreamEntry>> {
        let mut inner = self.inner.lock();
        let Some(s) = inner.streams.get_mut(stream) else {
            return Err(StoreError::UnexpectedReply(format!("no such stream: {stream}")));
        };
        let Some(g) = s.groups.get_mut(group) else {
            return Err(StoreError::UnexpectedReply(format!("no such group: {group}")));
        };

        let mut out = Vec::new();
        let start = (g.last_delivered.0, g.last_delivered.1.saturating_add(1));
        for (id, fields) in s.entries.range(start..).take(count) {
            g.pending.insert(*id, consumer.to_string());
            g.last_delivered = *id;
            out.push(StreamEntry {
                id: format_id(*id),
                fields: fields.clone(),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check()
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check()?;
        Ok(self.inner.lock().live_value(key).map(|v| v.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        self.check()?;
        self.inner.lock().strings.insert(
            key.to_string(),
            StringValue {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check()?;
        let mut inner = self.inner.lock();
        let had_string = inner.live_value(key).is_some();
        inner.strings.remove(key);
        let had_set = inner.sets.remove(key).is_some();
        let had_stream = inner.streams.remove(key).is_some();
        Ok(had_string || had_set || had_stream)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.check()?;
        let mut inner = self.inner.lock();
        match inner.live_value(key) {
            Some(v) => {
                v.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.check()?;
        let mut inner = self.inner.lock();
        if inner.live_value(key).is_some() {
            return Ok(false);
        }
        inner.strings.insert(
            key.to_string(),
            StringValue {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<bool> {
        self.check()?;
        let mut inner = self.inner.lock();
        if inner.live_value(key).is_some_and(|v| v.value == expected) {
            inner.strings.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn increment(&self, key: &str) -> StoreResult<i64> {
        self.check()?;
        let mut inner = self.inner.lock();
        let next = match inner.live_value(key) {
            Some(v) => {
                let current: i64 = v.value.parse().map_err(|_| {
                    StoreError::UnexpectedReply(format!("value at {key} is not an integer"))
                })?;
                let next = current + 1;
                v.value = next.to_string();
                next
            }
            None => {
                inner.strings.insert(
                    key.to_string(),
                    StringValue {
                        value: "1".to_string(),
                        expires_at: None,
                    },
                );
                1
            }
        };
        Ok(next)
    }

    async fn stock_gate(
        &self,
        voucher_id: i64,
        user_id: i64,
        order_id: i64,
        stream: &str,
    ) -> StoreResult<i64> {
        self.check()?;
        let stock_key = stock_key(voucher_id);
        let admission_key = admission_key(voucher_id);
        let user = user_id.to_string();

        let mut inner = self.inner.lock();
        let stock: i64 = match inner.live_value(&stock_key) {
            Some(v) => v.value.parse().map_err(|_| {
                StoreError::UnexpectedReply(format!("value at {stock_key} is not an integer"))
            })?,
            None => return Ok(gate_code::UNKNOWN_VOUCHER),
        };
        if inner
            .sets
            .get(&admission_key)
            .is_some_and(|users| users.contains(&user))
        {
            return Ok(gate_code::ALREADY_ADMITTED);
        }
        if stock <= 0 {
            return Ok(gate_code::OUT_OF_STOCK);
        }

        if let Some(v) = inner.live_value(&stock_key) {
            v.value = (stock - 1).to_string();
        }
        inner.sets.entry(admission_key).or_default().insert(user.clone());
        let fields = HashMap::from([
            ("userId".to_string(), user),
            ("voucherId".to_string(), voucher_id.to_string()),
            ("id".to_string(), order_id.to_string()),
        ]);
        inner.streams.entry(stream.to_string()).or_default().push(fields);
        drop(inner);

        self.appended.notify_waiters();
        Ok(gate_code::ADMITTED)
    }

    async fn seed_stock(&self, voucher_id: i64, stock: i64) -> StoreResult<()> {
        self.check()?;
        self.inner.lock().strings.insert(
            stock_key(voucher_id),
            StringValue {
                value: stock.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn reset_admissions(&self, voucher_id: i64) -> StoreResult<()> {
        self.check()?;
        self.inner.lock().sets.remove(&admission_key(voucher_id));
        Ok(())
    }

    async fn ensure_group(&self, stream: &str, group: &str) -> StoreResult<()> {
        self.check()?;
        let mut inner = self.inner.lock();
        inner
            .streams
            .entry(stream.to_string())
            .or_default()
            .groups
            .entry(group.to_string())
            .or_default();
        Ok(())
    }

    async fn append(&self, stream: &str, fields: &[(&str, String)]) -> StoreResult<String> {
        self.check()?;
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let id = self
            .inner
            .lock()
            .streams
            .entry(stream.to_string())
            .or_default()
            .push(fields);
        self.appended.notify_waiters();
        Ok(format_id(id))
    }

    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        mode: ReadMode,
        count: usize,
    ) -> StoreResult<Vec<StreamEntry>> {
        self.check()?;
        match mode {
            ReadMode::Pending => {
                let inner = self.inner.lock();
                let Some(s) = inner.streams.get(stream) else {
                    return Ok(Vec::new());
                };
                let Some(g) = s.groups.get(group) else {
                    return Ok(Vec::new());
                };
                Ok(g.pending
                    .iter()
                    .filter(|(_, owner)| owner.as_str() == consumer)
                    .take(count)
                    .map(|(id, _)| StreamEntry {
                        id: format_id(*id),
                        fields: s.entries.get(id).cloned().unwrap_or_default(),
                    })
                    .collect())
            }
            ReadMode::New { block } => {
                let deadline = Instant::now() + block;
                loop {
                    // Register interest before looking so an append between
                    // the check and the wait is not missed
                    let notified = self.appended.notified();
                    tokio::pin!(notified);
                    notified.as_mut().enable();
                    let entries = self.read_new(stream, group, consumer, count)?;
                    if !entries.is_empty() || block.is_zero() {
                        return Ok(entries);
                    }
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(Vec::new());
                    }
                    self.check()?;
                }
            }
        }
    }

    async fn ack(&self, stream: &str, group: &str, ids: &[String]) -> StoreResult<usize> {
        self.check()?;
        let mut inner = self.inner.lock();
        let Some(g) = inner
            .streams
            .get_mut(stream)
            .and_then(|s| s.groups.get_mut(group))
        else {
            return Ok(0);
        };
        Ok(ids
            .iter()
            .filter_map(|id| parse_id(id))
            .filter(|id| g.pending.remove(id).is_some())
            .count())
    }

    async fn pending_count(&self, stream: &str, group: &str) -> StoreResult<usize> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner
            .streams
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .map_or(0, |g| g.pending.len()))
    }
}
