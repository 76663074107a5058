//! # Vigil Events
//!
//! Push-based analysis of encrypted records.
//!
//! ## Overview
//!
//! The runtime delivers change notifications for services whose tags match
//! a filter it can evaluate without decrypting. Vigil decrypts each
//! delivered service through the runtime, classifies its observation, and
//! rewrites the service's tags in place of the pending-analysis marker.
//!
//! ## Key Properties
//!
//! - **Idempotent**: redelivering a processed notification writes nothing
//! - **Read-before-write**: every update is preceded by a fresh read
//! - **Bounded retry**: conflicts and transient failures back off, then drop
//! - **Cooperative stop**: checked between polls, never mid-update
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vigil_core::CodeStub;
//! use vigil_events::{
//!     stop_signal, ConsumerConfig, EncryptedRuntime, EventConsumer, EventType,
//!     MemoryRuntime, TagFilterBuilder,
//! };
//!
//! async fn example() {
//!     let runtime = MemoryRuntime::new();
//!     let filter = TagFilterBuilder::new()
//!         .by_code(&CodeStub::pending_analysis())
//!         .build();
//!     let channel = runtime
//!         .subscribe(&filter, &[EventType::Create, EventType::Update])
//!         .await
//!         .unwrap();
//!
//!     let mut consumer =
//!         EventConsumer::new(Arc::clone(&runtime), ConsumerConfig::default()).unwrap();
//!     let (_stop_tx, stop_rx) = stop_signal();
//!     let report = consumer.run(&channel, stop_rx).await;
//!     println!("classified {}", report.classified);
//! }
//! ```

pub mod consumer;
pub mod error;
pub mod event;
pub mod filter;
pub mod memory;
pub mod retry;
pub mod runtime;

pub use consumer::{
    stop_signal, ConsumerConfig, ConsumerReport, EventConsumer, LoopState, ProcessOutcome,
};
pub use error::{EventError, Result, RuntimeError};
pub use event::{EntityRef, EventType, SubscriptionEvent};
pub use filter::{FilterExpression, TagFilterBuilder, TagPredicate};
pub use memory::{MemoryChannel, MemoryRuntime};
pub use retry::RetryPolicy;
pub use runtime::{EncryptedRuntime, EventChannel};
