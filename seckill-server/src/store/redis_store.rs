//! Redis backend
//!
//! One multiplexed [`ConnectionManager`] shared by every caller; it
//! reconnects on its own after a broken connection. Scripts are loaded once
//! and invoked by SHA (falling back to EVAL on `NOSCRIPT`).

use super::keys::{admission_key, stock_key};
use super::{ReadMode, SharedStore, StoreError, StoreResult, StreamEntry, scripts};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamPendingReply, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, Script};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    seckill: Script,
    unlock: Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!("Connected to Redis");
        Ok(Self {
            conn,
            seckill: Script::new(scripts::SECKILL),
            unlock: Script::new(scripts::UNLOCK),
        })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    // PX 0 is rejected by Redis
    (ttl.as_millis() as u64).max(1)
}

fn block_millis(block: Duration) -> usize {
    // BLOCK 0 waits forever
    (block.as_millis() as usize).max(1)
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(StoreError::UnexpectedReply(reply));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut conn = self.conn();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.conn();
        let applied: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(applied == 1)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.conn();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<bool> {
        let mut conn = self.conn();
        let removed: i64 = self
            .unlock
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }

    async fn increment(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn stock_gate(
        &self,
        voucher_id: i64,
        user_id: i64,
        order_id: i64,
        stream: &str,
    ) -> StoreResult<i64> {
        let mut conn = self.conn();
        let code: i64 = self
            .seckill
            .key(stock_key(voucher_id))
            .key(admission_key(voucher_id))
            .key(stream)
            .arg(voucher_id)
            .arg(user_id)
            .arg(order_id)
            .invoke_async(&mut conn)
            .await?;
        Ok(code)
    }

    async fn seed_stock(&self, voucher_id: i64, stock: i64) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = conn.set(stock_key(voucher_id), stock).await?;
        Ok(())
    }

    async fn reset_admissions(&self, voucher_id: i64) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: i64 = conn.del(admission_key(voucher_id)).await?;
        Ok(())
    }

    async fn ensure_group(&self, stream: &str, group: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        let created: redis::RedisResult<()> = conn.xgroup_create_mkstream(stream, group, "0").await;
        match created {
            Ok(()) => {
                tracing::info!(stream = %stream, group = %group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn append(&self, stream: &str, fields: &[(&str, String)]) -> StoreResult<String> {
        let mut conn = self.conn();
        let id: String = conn.xadd(stream, "*", fields).await?;
        Ok(id)
    }

    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        mode: ReadMode,
        count: usize,
    ) -> StoreResult<Vec<StreamEntry>> {
        let mut conn = self.conn();
        let mut opts = StreamReadOptions::default().group(group, consumer).count(count);
        let start = match mode {
            ReadMode::New { block } => {
                opts = opts.block(block_millis(block));
                ">"
            }
            ReadMode::Pending => "0",
        };

        // A blocking read that times out replies nil
        let reply: Option<StreamReadReply> =
            conn.xread_options(&[stream], &[start], &opts).await?;
        let Some(reply) = reply else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for key in reply.keys {
            for item in key.ids {
                let mut fields = HashMap::with_capacity(item.map.len());
                for (name, value) in &item.map {
                    // Non-string values are left out; the consumer treats the
                    // entry as corrupt when a required field is missing
                    if let Ok(text) = redis::from_redis_value::<String>(value) {
                        fields.insert(name.clone(), text);
                    }
                }
                entries.push(StreamEntry { id: item.id, fields });
            }
        }
        Ok(entries)
    }

    async fn ack(&self, stream: &str, group: &str, ids: &[String]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn();
        let acked: usize = conn.xack(stream, group, ids).await?;
        Ok(acked)
    }

    async fn pending_count(&self, stream: &str, group: &str) -> StoreResult<usize> {
        let mut conn = self.conn();
        let reply: StreamPendingReply = conn.xpending(stream, group).await?;
        Ok(reply.count())
    }
}
