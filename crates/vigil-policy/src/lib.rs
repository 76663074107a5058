//! # Vigil Policy
//!
//! Trust decisions the encrypted runtime delegates to application code.
//!
//! ## Overview
//!
//! The runtime calls into a [`KeyTrustPolicy`] whenever it needs one of
//! four decisions:
//!
//! - **Recovery**: can a lost private key be restored from local secrets?
//! - **Generation**: may a fresh keypair be minted for an actor?
//! - **Delegate verification**: which of a counterpart's declared public
//!   keys are acceptable?
//! - **Anonymity**: must delegations toward an actor omit its identity?
//!
//! ## Implementations
//!
//! - [`PermissivePolicy`]: recovers from a [`LocalKeyStore`], allows
//!   generation, accepts every delegate key.
//! - [`StrictPolicy`]: same recovery, denies generation, accepts only
//!   delegate keys the delegate declares itself.
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use vigil_core::{Actor, ActorId, ActorType};
//! use vigil_policy::{KeyTrustPolicy, LocalKeyStore, PermissivePolicy};
//!
//! let policy = PermissivePolicy::new(LocalKeyStore::new(BTreeMap::new()));
//! let patient = Actor::new(ActorId::new("patient-1"), ActorType::Patient);
//!
//! assert!(policy.requires_anonymous_delegation(&patient));
//! ```

pub mod error;
pub mod permissive;
pub mod policy;
pub mod recovery;
pub mod store;
pub mod strict;

pub use error::{PolicyError, Result};
pub use permissive::PermissivePolicy;
pub use policy::{requires_anonymity, KeyGenerationDecision, KeyTrustPolicy};
pub use recovery::{RecoveredKey, RecoveryOutcome, RecoveryRequest};
pub use store::LocalKeyStore;
pub use strict::StrictPolicy;
