//! # Vigil Core
//!
//! Foundation types shared by every Vigil crate.
//!
//! ## Overview
//!
//! - **Actors**: data owners with scheme-partitioned public key sets
//! - **Keys**: full key identifiers, short fingerprints, exported material
//! - **Codes**: `TYPE|CODE|VERSION` stubs used as record tags
//! - **Records**: contacts holding services with localized content
//! - **Classifier**: maps a numeric observation to a coded result
//!
//! Nothing in this crate performs I/O or cryptography. The encrypted
//! runtime owns those concerns; these types only describe what it hands
//! over and what Vigil hands back.

pub mod actor;
pub mod classifier;
pub mod code;
pub mod error;
pub mod keys;
pub mod record;

pub use actor::{Actor, ActorId, ActorType};
pub use classifier::{classify, Classification, Thresholds};
pub use code::CodeStub;
pub use error::{CoreError, Result};
pub use keys::{ExportedKeyMaterial, KeyFingerprint, KeyId, RsaEncryptionAlgorithm, FINGERPRINT_LEN};
pub use record::{Contact, Content, Measure, Observation, Service};
