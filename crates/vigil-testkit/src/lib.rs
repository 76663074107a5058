//! # Vigil Testkit
//!
//! Testing utilities for Vigil.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Key pairs, actors, and glycemia contacts, plus a
//!   [`TestFixture`] wrapping an in-memory runtime
//! - **Generators**: Proptest strategies for policy and filter properties
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use vigil_policy::{KeyTrustPolicy, PermissivePolicy};
//! use vigil_testkit::generators::RecoveryScenario;
//!
//! proptest! {
//!     #[test]
//!     fn recovery_is_idempotent(scenario: RecoveryScenario) {
//!         let policy = PermissivePolicy::new(scenario.store.clone());
//!         prop_assert_eq!(
//!             policy.recover_keys(&scenario.requests).unwrap(),
//!             policy.recover_keys(&scenario.requests).unwrap()
//!         );
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use vigil_testkit::fixtures::{glycemia_contact, hcp, KeyPairFixture};
//!
//! let key = KeyPairFixture::with_seed(1);
//! let doctor = hcp("hcp-1", &key);
//! let contact = glycemia_contact("ctc-1", 95.0);
//! assert!(doctor.declares(&key.public));
//! assert_eq!(contact.services.len(), 1);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{key_pairs, KeyPairFixture, TestFixture};
