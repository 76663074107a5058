//! Server-evaluable tag filters.
//!
//! A [`FilterExpression`] is a conjunction of [`TagPredicate`]s. The
//! runtime adds the implicit "only records this actor can decrypt" clause
//! itself. Predicate order does not change what matches, but it is kept
//! in the serialized form so filters are reproducible.

use serde::{Deserialize, Serialize};

use vigil_core::{CodeStub, Service};

use crate::error::{EventError, Result};

/// A single tag condition with optional value-date bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPredicate {
    /// Code system of the tag.
    pub code_type: String,

    /// Code of the tag.
    pub code: String,

    /// Earliest accepted value date (inclusive).
    pub validity_start: Option<i64>,

    /// Latest accepted value date (inclusive).
    pub validity_end: Option<i64>,
}

impl TagPredicate {
    /// Whether `service` satisfies this predicate.
    ///
    /// When bounds are set, a service without a value date never matches.
    pub fn matches(&self, service: &Service) -> bool {
        if !service.tags.iter().any(|t| t.is(&self.code_type, &self.code)) {
            return false;
        }
        if self.validity_start.is_none() && self.validity_end.is_none() {
            return true;
        }
        let Some(date) = service.value_date else {
            return false;
        };
        self.validity_start.map_or(true, |start| date >= start)
            && self.validity_end.map_or(true, |end| date <= end)
    }
}

/// Immutable conjunction of tag predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpression {
    predicates: Vec<TagPredicate>,
}

impl FilterExpression {
    /// Predicates in insertion order.
    pub fn predicates(&self) -> &[TagPredicate] {
        &self.predicates
    }

    /// Whether every predicate matches `service`.
    pub fn matches(&self, service: &Service) -> bool {
        self.predicates.iter().all(|p| p.matches(service))
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| EventError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| EventError::Serialization(e.to_string()))
    }
}

/// Accumulates predicates into a [`FilterExpression`].
///
/// `build` consumes the builder; start a fresh one for each filter.
#[derive(Debug, Default)]
pub struct TagFilterBuilder {
    predicates: Vec<TagPredicate>,
}

impl TagFilterBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a tag, optionally within a value-date window.
    pub fn by_tag(
        mut self,
        code_type: impl Into<String>,
        code: impl Into<String>,
        validity_start: Option<i64>,
        validity_end: Option<i64>,
    ) -> Self {
        self.predicates.push(TagPredicate {
            code_type: code_type.into(),
            code: code.into(),
            validity_start,
            validity_end,
        });
        self
    }

    /// Require a tag given as a code stub, with no date window.
    pub fn by_code(self, stub: &CodeStub) -> Self {
        self.by_tag(stub.code_type.clone(), stub.code.clone(), None, None)
    }

    /// Finalize the filter.
    pub fn build(self) -> FilterExpression {
        FilterExpression {
            predicates: self.predicates,
        }
    }
}
