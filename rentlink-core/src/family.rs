//! Index family enumeration.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Published price index a contract is linked to.
///
/// Each family has its own chaining table and its own index time series.
/// Families are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFamily {
    /// Consumer Price Index
    Cpi,
    /// Housing-cost index
    Housing,
    /// Construction-input cost index
    Construction,
}

impl IndexFamily {
    /// All supported families.
    pub const ALL: [IndexFamily; 3] = [
        IndexFamily::Cpi,
        IndexFamily::Housing,
        IndexFamily::Construction,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            IndexFamily::Cpi => "cpi",
            IndexFamily::Housing => "housing",
            IndexFamily::Construction => "construction",
        }
    }

    /// Parse from database string representation.
    ///
    /// Unknown families (including currency linkages such as `usd`) are a
    /// configuration error, never a default.
    pub fn from_db_str(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "cpi" => Ok(IndexFamily::Cpi),
            "housing" => Ok(IndexFamily::Housing),
            "construction" => Ok(IndexFamily::Construction),
            _ => Err(ConfigError::UnsupportedIndexFamily {
                family: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for IndexFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for IndexFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_family_parse_known() {
        assert_eq!("cpi".parse::<IndexFamily>(), Ok(IndexFamily::Cpi));
        assert_eq!("Housing".parse::<IndexFamily>(), Ok(IndexFamily::Housing));
        assert_eq!(
            " CONSTRUCTION ".parse::<IndexFamily>(),
            Ok(IndexFamily::Construction)
        );
    }

    #[test]
    fn test_index_family_parse_unknown_is_config_error() {
        for input in ["usd", "eur", "", "cpi2"] {
            let err = input.parse::<IndexFamily>().unwrap_err();
            assert_eq!(
                err,
                ConfigError::UnsupportedIndexFamily {
                    family: input.to_string()
                }
            );
        }
    }

    #[test]
    fn test_index_family_display_matches_db_str() {
        for family in IndexFamily::ALL {
            assert_eq!(family.to_string(), family.as_db_str());
            assert_eq!(IndexFamily::from_db_str(family.as_db_str()), Ok(family));
        }
    }

    #[test]
    fn test_index_family_serde_lowercase() {
        let json = serde_json::to_string(&IndexFamily::Construction).unwrap();
        assert_eq!(json, "\"construction\"");
        let back: IndexFamily = serde_json::from_str("\"housing\"").unwrap();
        assert_eq!(back, IndexFamily::Housing);
    }
}
