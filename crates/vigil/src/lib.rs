//! # Vigil
//!
//! The unified API for Vigil: trust decisions for encrypted health
//! records, and background classification of observations as they are
//! written.
//!
//! ## Overview
//!
//! Vigil sits beside an encrypted-records runtime and provides:
//!
//! - **Trust policy**: answers the runtime's key recovery, key generation,
//!   delegate verification, and anonymity questions
//! - **Analysis**: subscribes to services tagged as pending analysis,
//!   classifies their measurement against a range, and replaces the
//!   pending tag with the outcome
//! - **Configuration**: JSON settings for polling, retry, thresholds, and
//!   pre-shared local keys
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vigil::{Session, VigilConfig};
//! use vigil::events::MemoryRuntime;
//! use vigil::policy::PermissivePolicy;
//!
//! async fn example() {
//!     let config = VigilConfig::from_json(r#"{ "locale": "en" }"#).unwrap();
//!     let policy = PermissivePolicy::new(config.key_store());
//!
//!     let session = Session::new(MemoryRuntime::new(), policy, config).unwrap();
//!     let analysis = session.start_analysis().await.unwrap();
//!
//!     // ... records are created elsewhere ...
//!
//!     let report = session.shutdown(analysis).await.unwrap();
//!     println!("classified {} observations", report.classified);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `vigil::core` - Data model and classifier
//! - `vigil::policy` - Key trust policies
//! - `vigil::events` - Filters, runtime traits, and the event consumer

pub mod config;
pub mod error;
pub mod session;

// Re-export component crates
pub use vigil_core as core;
pub use vigil_events as events;
pub use vigil_policy as policy;

// Re-export main types for convenience
pub use config::{RetryConfig, VigilConfig};
pub use error::{ConfigError, Result, VigilError};
pub use session::{AnalysisHandle, Session, ANALYSIS_EVENT_TYPES};

// Re-export commonly used types
pub use vigil_core::{Classification, CodeStub, Contact, Service, Thresholds};
pub use vigil_events::{ConsumerReport, EncryptedRuntime, EventChannel};
pub use vigil_policy::{KeyTrustPolicy, PermissivePolicy, StrictPolicy};
