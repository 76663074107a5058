//! Decrypted records: contacts and the services they contain.
//!
//! A [`Contact`] is the container the runtime versions and updates as a
//! whole. Each [`Service`] carries localized content and a tag list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::Classification;
use crate::code::CodeStub;

/// A measured value with its units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Numeric value.
    pub value: f64,

    /// Unit codes (e.g. UCUM).
    pub unit_codes: Vec<CodeStub>,
}

/// Content of a service for one locale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Optional measurement.
    pub measure_value: Option<Measure>,
}

impl Content {
    /// Content holding a single measurement.
    pub fn measure(value: f64, unit: CodeStub) -> Self {
        Self {
            measure_value: Some(Measure {
                value,
                unit_codes: vec![unit],
            }),
        }
    }
}

/// A numeric observation extracted from a service.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// The value.
    pub value: f64,
    /// First unit code, if any.
    pub unit: Option<CodeStub>,
}

/// A single piece of information inside a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Service identifier.
    pub id: String,

    /// Identifier of the containing contact.
    pub contact_id: String,

    /// When the value was observed (`YYYYMMDDhhmmss`).
    pub value_date: Option<i64>,

    /// Content keyed by locale.
    pub content: BTreeMap<String, Content>,

    /// Ordered tag list.
    pub tags: Vec<CodeStub>,
}

impl Service {
    /// The observation stored under `locale`, if present and finite.
    pub fn observation(&self, locale: &str) -> Option<Observation> {
        let measure = self.content.get(locale)?.measure_value.as_ref()?;
        if !measure.value.is_finite() {
            return None;
        }
        Some(Observation {
            value: measure.value,
            unit: measure.unit_codes.first().cloned(),
        })
    }

    /// Whether any tag matches `tag` (version-agnostic).
    pub fn has_tag(&self, tag: &CodeStub) -> bool {
        self.tags.iter().any(|t| t.matches(tag))
    }

    /// Classification tags currently present.
    pub fn classification_tags(&self) -> impl Iterator<Item = &CodeStub> {
        self.tags
            .iter()
            .filter(|t| Classification::is_classification_tag(t))
    }

    /// Replace the workflow tags with a classification outcome.
    ///
    /// Drops every tag matching `sentinel` and every classification tag,
    /// keeps the remaining tags in order, then appends `outcome`'s tag.
    /// Returns whether the tag list changed.
    pub fn retag(&mut self, sentinel: &CodeStub, outcome: Classification) -> bool {
        let mut tags: Vec<CodeStub> = self
            .tags
            .iter()
            .filter(|t| !t.matches(sentinel) && !Classification::is_classification_tag(t))
            .cloned()
            .collect();
        tags.push(outcome.tag());

        if tags == self.tags {
            return false;
        }
        self.tags = tags;
        true
    }
}

/// A versioned container of services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact identifier.
    pub id: String,

    /// Revision assigned by the runtime; `None` before first save.
    pub rev: Option<String>,

    /// Opening date (`YYYYMMDDhhmmss`).
    pub opening_date: Option<i64>,

    /// Closing date (`YYYYMMDDhhmmss`).
    pub closing_date: Option<i64>,

    /// Services in order.
    pub services: Vec<Service>,
}

impl Contact {
    /// Find a service by identifier.
    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    /// Find a service by identifier, mutably.
    pub fn service_mut(&mut self, id: &str) -> Option<&mut Service> {
        self.services.iter_mut().find(|s| s.id == id)
    }
}
