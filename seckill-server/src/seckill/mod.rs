//! Flash-sale core
//!
//! ```text
//! purchase ──► StockGate ──(admitted, same step)──► order stream
//!                                                      │
//!                          OrderWorker ◄───────────────┘
//!                              │ per-buyer lease
//!                              ▼
//!                      OrderMaterializer ──► tb_voucher_order
//! ```
//!
//! The gate admits each buyer at most once per voucher; the materializer
//! relies on that when it drops entries whose buyer lease is busy.

pub mod gate;
pub mod materializer;
pub mod queue;
pub mod service;
pub mod worker;

pub use gate::{GateOutcome, StockGate};
pub use materializer::{Materialized, OrderMaterializer};
pub use queue::{OrderEntry, OrderQueue, QueueSettings};
pub use service::SeckillService;
pub use worker::OrderWorker;
