//! Range classification of numeric observations.
//!
//! `[low, high]` is in range; both boundaries belong to the in-range branch.

use serde::{Deserialize, Serialize};

use crate::code::CodeStub;
use crate::error::{CoreError, Result};

/// Code system for classification tags.
pub const CLASSIFICATION_CODE_TYPE: &str = "VIGIL_RANGE";

/// Outcome of classifying an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Strictly below the low threshold.
    BelowRange,
    /// Within `[low, high]`.
    InRange,
    /// Strictly above the high threshold.
    AboveRange,
}

impl Classification {
    /// Every classification, in ascending order.
    pub const ALL: [Classification; 3] = [
        Classification::BelowRange,
        Classification::InRange,
        Classification::AboveRange,
    ];

    /// The code of this classification.
    pub fn code(&self) -> &'static str {
        match self {
            Classification::BelowRange => "BELOW_RANGE",
            Classification::InRange => "IN_RANGE",
            Classification::AboveRange => "ABOVE_RANGE",
        }
    }

    /// The tag recorded on a classified service.
    pub fn tag(&self) -> CodeStub {
        CodeStub::new(CLASSIFICATION_CODE_TYPE, self.code(), "1")
    }

    /// Whether `tag` belongs to the closed classification set.
    pub fn is_classification_tag(tag: &CodeStub) -> bool {
        tag.code_type == CLASSIFICATION_CODE_TYPE
            && Self::ALL.iter().any(|c| c.code() == tag.code)
    }
}

/// Closed interval of in-range values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Lowest in-range value.
    #[serde(default = "default_low")]
    pub low: f64,
    /// Highest in-range value.
    #[serde(default = "default_high")]
    pub high: f64,
}

const fn default_low() -> f64 {
    Thresholds::DEFAULT_LOW
}

const fn default_high() -> f64 {
    Thresholds::DEFAULT_HIGH
}

impl Thresholds {
    /// Default low threshold.
    pub const DEFAULT_LOW: f64 = 80.0;
    /// Default high threshold.
    pub const DEFAULT_HIGH: f64 = 130.0;

    /// Create validated thresholds.
    pub fn new(low: f64, high: f64) -> Result<Self> {
        let thresholds = Self { low, high };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Both bounds finite and `low <= high`.
    pub fn validate(&self) -> Result<()> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low > self.high {
            return Err(CoreError::InvalidThresholds {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    /// Classify a value against these thresholds.
    pub fn classify(&self, value: f64) -> Classification {
        if value < self.low {
            Classification::BelowRange
        } else if value > self.high {
            Classification::AboveRange
        } else {
            Classification::InRange
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low: Self::DEFAULT_LOW,
            high: Self::DEFAULT_HIGH,
        }
    }
}

/// Classify a value against the default thresholds.
pub fn classify(value: f64) -> Classification {
    Thresholds::default().classify(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundaries_are_in_range() {
        assert_eq!(classify(79.9), Classification::BelowRange);
        assert_eq!(classify(80.0), Classification::InRange);
        assert_eq!(classify(130.0), Classification::InRange);
        assert_eq!(classify(130.1), Classification::AboveRange);
    }

    #[test]
    fn test_typical_values() {
        assert_eq!(classify(55.0), Classification::BelowRange);
        assert_eq!(classify(100.0), Classification::InRange);
        assert_eq!(classify(140.0), Classification::AboveRange);
    }

    #[test]
    fn test_degenerate_interval() {
        let t = Thresholds::new(5.0, 5.0).unwrap();
        assert_eq!(t.classify(5.0), Classification::InRange);
        assert_eq!(t.classify(4.99), Classification::BelowRange);
        assert_eq!(t.classify(5.01), Classification::AboveRange);
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(Thresholds::new(130.0, 80.0).is_err());
        assert!(Thresholds::new(f64::NAN, 80.0).is_err());
        assert!(Thresholds::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_classification_tags() {
        assert_eq!(Classification::BelowRange.tag().id, "VIGIL_RANGE|BELOW_RANGE|1");

        for c in Classification::ALL {
            assert!(Classification::is_classification_tag(&c.tag()));
        }
        assert!(!Classification::is_classification_tag(&CodeStub::pending_analysis()));
        assert!(!Classification::is_classification_tag(&CodeStub::new(
            CLASSIFICATION_CODE_TYPE,
            "SOMETHING_ELSE",
            "1"
        )));
    }

    proptest! {
        #[test]
        fn test_classification_is_monotonic(a in -1000.0f64..1000.0, b in -1000.0f64..1000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let rank = |c: Classification| Classification::ALL.iter().position(|x| *x == c);

            prop_assert!(rank(classify(lo)) <= rank(classify(hi)));
        }
    }
}
