//! Coded labels attached to records.
//!
//! A code stub is a `(type, code, version)` triple with a derived
//! identifier of the form `TYPE|CODE|VERSION`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A coded label such as a tag or a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeStub {
    /// Derived identifier, `TYPE|CODE|VERSION`.
    pub id: String,

    /// Code system (e.g. `LOINC`, `UCUM`).
    pub code_type: String,

    /// Code within the system.
    pub code: String,

    /// Version of the code.
    pub version: String,
}

impl CodeStub {
    /// Build a stub and derive its identifier.
    pub fn new(
        code_type: impl Into<String>,
        code: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let code_type = code_type.into();
        let code = code.into();
        let version = version.into();
        Self {
            id: format!("{}|{}|{}", code_type, code, version),
            code_type,
            code,
            version,
        }
    }

    /// Workflow marker for services awaiting analysis.
    pub fn pending_analysis() -> Self {
        Self::new("ICURE", "TO_BE_ANALYZED", "1")
    }

    /// LOINC code for a blood glucose measurement.
    pub fn glucose_test() -> Self {
        Self::new("LOINC", "2339-0", "1")
    }

    /// UCUM unit for blood glucose concentration.
    pub fn glucose_unit() -> Self {
        Self::new("UCUM", "mmol/L", "1")
    }

    /// Whether two stubs denote the same code, ignoring version.
    pub fn matches(&self, other: &CodeStub) -> bool {
        self.code_type == other.code_type && self.code == other.code
    }

    /// Whether this stub has the given type and code.
    pub fn is(&self, code_type: &str, code: &str) -> bool {
        self.code_type == code_type && self.code == code
    }
}

impl fmt::Display for CodeStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl FromStr for CodeStub {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('|');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(c), Some(v), None) if !t.is_empty() && !c.is_empty() => {
                Ok(Self::new(t, c, v))
            }
            _ => Err(CoreError::InvalidCode(s.to_string())),
        }
    }
}
