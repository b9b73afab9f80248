//! StorySpec domain type
//!
//! The narrative input of a session: free-text lore plus two numeric ranges
//! (branching factor and depth) constraining the shape of the quest.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

/// Rendering used for a bound that could not be parsed
const UNSPECIFIED: &str = "N/A";

/// One end of a range constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bound {
    /// A concrete numeric bound
    Value(u32),
    /// Missing or unparsable input
    #[default]
    Unspecified,
}

impl Bound {
    /// Parse a bound from free text; anything that is not a non-negative
    /// integer is `Unspecified`
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.parse::<u32>() {
            Ok(value) => Self::Value(value),
            Err(_) => {
                debug!(%trimmed, "Bound::parse: not a number, unspecified");
                Self::Unspecified
            }
        }
    }
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{}", v),
            Self::Unspecified => write!(f, "{}", UNSPECIFIED),
        }
    }
}

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_u32(*v),
            Self::Unspecified => serializer.serialize_str(UNSPECIFIED),
        }
    }
}

impl<'de> Deserialize<'de> for Bound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawBound {
            Number(u32),
            Text(String),
        }

        Ok(match RawBound::deserialize(deserializer)? {
            RawBound::Number(v) => Self::Value(v),
            RawBound::Text(s) => Self::parse(&s),
        })
    }
}

/// Inclusive `{min, max}` range constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RangeSpec {
    pub min: Bound,
    pub max: Bound,
}

impl RangeSpec {
    /// Create a fully specified range
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min: Bound::Value(min),
            max: Bound::Value(max),
        }
    }

    /// A range with both ends unspecified
    pub fn unspecified() -> Self {
        Self::default()
    }

    /// True when neither end carries a value
    pub fn is_unspecified(&self) -> bool {
        self.min == Bound::Unspecified && self.max == Bound::Unspecified
    }
}

impl std::fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// The narrative specification a session is generated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySpec {
    /// Free-text quest description
    pub lore: String,

    /// Allowed number of choices per story state
    pub branching: RangeSpec,

    /// Allowed number of steps from start to goal
    pub depth: RangeSpec,
}

impl StorySpec {
    /// Create a new story specification
    pub fn new(lore: impl Into<String>, branching: RangeSpec, depth: RangeSpec) -> Self {
        let lore = lore.into();
        debug!(lore_len = lore.len(), %branching, %depth, "StorySpec::new: called");
        Self { lore, branching, depth }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_parse() {
        assert_eq!(Bound::parse("3"), Bound::Value(3));
        assert_eq!(Bound::parse("  12 "), Bound::Value(12));
        assert_eq!(Bound::parse("three"), Bound::Unspecified);
        assert_eq!(Bound::parse(""), Bound::Unspecified);
        assert_eq!(Bound::parse("-1"), Bound::Unspecified);
    }

    #[test]
    fn test_range_display() {
        assert_eq!(RangeSpec::new(2, 3).to_string(), "2-3");
        assert_eq!(RangeSpec::unspecified().to_string(), "N/A-N/A");
    }

    #[test]
    fn test_bound_serialization() {
        let range = RangeSpec {
            min: Bound::Value(2),
            max: Bound::Unspecified,
        };
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(json, serde_json::json!({"min": 2, "max": "N/A"}));

        let back: RangeSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, range);
    }

    #[test]
    fn test_bound_deserialize_numeric_string() {
        let range: RangeSpec = serde_json::from_str(r#"{"min": "4", "max": "x"}"#).unwrap();
        assert_eq!(range.min, Bound::Value(4));
        assert_eq!(range.max, Bound::Unspecified);
    }
}
