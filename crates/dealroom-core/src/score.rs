//! # Negotiation Scores
//!
//! Bounded numeric inputs and outputs of the negotiation algorithms.
//!
//! | Type | Range | Meaning |
//! |------|-------|---------|
//! | [`Priority`] | 1..=5 | How important a clause is to a party |
//! | [`Flexibility`] | 1..=5 | Willingness to accept another option |
//! | [`Bias`] | −1.0..=1.0 | How much an option favors party A (+) or B (−) |
//! | [`Satisfaction`] | 0..=100 | Estimated contentment with a suggestion |
//!
//! Every type rejects out-of-range values at construction and when
//! deserialized, so the algorithms never see an invalid score.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! one_to_five {
    ($(#[$meta:meta])* $name:ident, $err:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "u8")]
        pub struct $name(u8);

        impl $name {
            /// Lowest accepted value.
            pub const MIN: u8 = 1;
            /// Highest accepted value.
            pub const MAX: u8 = 5;

            /// Validate and wrap a raw value.
            pub fn new(value: i64) -> Result<Self, ValidationError> {
                if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
                    Ok(Self(value as u8))
                } else {
                    Err(ValidationError::$err(value))
                }
            }

            /// The raw value.
            pub fn value(&self) -> u8 {
                self.0
            }

            /// The value as `f64`, for use in scoring formulas.
            pub fn as_f64(&self) -> f64 {
                f64::from(self.0)
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for u8 {
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

one_to_five!(
    /// Self-reported importance of a clause, 1 (low) to 5 (critical).
    Priority,
    PriorityOutOfRange
);

one_to_five!(
    /// Self-reported willingness to move off one's first choice,
    /// 1 (rigid) to 5 (very flexible).
    Flexibility,
    FlexibilityOutOfRange
);

impl Default for Priority {
    fn default() -> Self {
        Self(3)
    }
}

impl Default for Flexibility {
    fn default() -> Self {
        Self(3)
    }
}

/// How much an option favors party A (positive) or party B (negative).
///
/// Catalog options carry one bias per party perspective (`bias_a`,
/// `bias_b`); both are stored as `Bias`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Bias(f64);

impl Bias {
    /// Neutral bias.
    pub const NEUTRAL: Bias = Bias(0.0);

    /// Validate and wrap a raw value. NaN and infinities are rejected.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if value.is_finite() && (-1.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::BiasOutOfRange(value))
        }
    }

    /// The raw value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Magnitude of the bias, ignoring direction.
    pub fn magnitude(&self) -> f64 {
        self.0.abs()
    }
}

impl TryFrom<f64> for Bias {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Bias> for f64 {
    fn from(b: Bias) -> Self {
        b.0
    }
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 0–100 estimate of how content a party is with a suggested option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Satisfaction(u8);

impl Satisfaction {
    /// Full satisfaction.
    pub const FULL: Satisfaction = Satisfaction(100);

    /// Validate and wrap a raw value.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (0..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::SatisfactionOutOfRange(value))
        }
    }

    /// Round a raw score half away from zero and clamp it into 0..=100.
    /// NaN maps to 0.
    pub fn from_score(raw: f64) -> Self {
        if raw.is_nan() {
            return Self(0);
        }
        Self(raw.round().clamp(0.0, 100.0) as u8)
    }

    /// The raw value.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// The value as `f64`.
    pub fn as_f64(&self) -> f64 {
        f64::from(self.0)
    }
}

impl TryFrom<i64> for Satisfaction {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Satisfaction> for u8 {
    fn from(s: Satisfaction) -> Self {
        s.0
    }
}

impl std::fmt::Display for Satisfaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
