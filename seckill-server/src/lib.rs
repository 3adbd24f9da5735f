//! Seckill Server - flash-sale order pipeline
//!
//! # Architecture
//!
//! - **Stock gate** (`seckill::gate`): one atomic store script admits or
//!   rejects each purchase and enqueues admitted orders
//! - **Order queue / worker** (`seckill::queue`, `seckill::worker`):
//!   at-least-once stream consumer with pending-list recovery
//! - **Materializer** (`seckill::materializer`): per-buyer lease plus guarded
//!   SQL update turns admissions into orders
//! - **Lease lock** (`lock`), **id worker** (`id_worker`), **cache**
//!   (`cache`): coordination utilities over the shared store
//!
//! # Layout
//!
//! ```text
//! seckill-server/src/
//! ├── core/      # config, state, background tasks
//! ├── common/    # logging
//! ├── store/     # shared store seam (Redis / in-process)
//! ├── seckill/   # gate, queue, worker, materializer, purchase service
//! ├── cache/     # logical-expire and pass-through caches
//! ├── db/        # SQLite pool, migrations, queries
//! └── api/       # HTTP routes and extractors
//! ```

pub mod api;
pub mod cache;
pub mod common;
pub mod core;
pub mod db;
pub mod error;
pub mod id_worker;
pub mod lock;
pub mod seckill;
pub mod shop;
pub mod store;

pub use core::{AppState, BackgroundTasks, Config, TaskKind};
pub use error::{QueueError, ServiceError, ServiceResult};
pub use id_worker::IdWorker;
pub use lock::DistributedLock;
pub use store::{DynStore, MemoryStore, RedisStore, SharedStore, StoreError};
