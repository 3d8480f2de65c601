use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::CareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = CareError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Low" => Ok(RiskLevel::Low),
            "High" => Ok(RiskLevel::High),
            other => Err(CareError::integrity(format!("unknown risk level '{other}'"))),
        }
    }
}

/// Classifier output for the long-form survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Minimal,
    Moderate,
    Severe,
}

impl Prediction {
    pub fn code(&self) -> i32 {
        match self {
            Prediction::Minimal => 0,
            Prediction::Moderate => 1,
            Prediction::Severe => 2,
        }
    }

    /// Risk group searched during cluster assignment. `None` for minimal risk,
    /// which never gets a cluster.
    pub fn cluster_group(&self) -> Option<RiskGroup> {
        match self {
            Prediction::Minimal => None,
            Prediction::Moderate => Some(RiskGroup::Moderate),
            Prediction::Severe => Some(RiskGroup::Severe),
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Prediction::Minimal => "Minimal to Mild Risk",
            Prediction::Moderate => "Moderate Risk",
            Prediction::Severe => "Severe Risk",
        }
    }
}

impl TryFrom<i32> for Prediction {
    type Error = CareError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Prediction::Minimal),
            1 => Ok(Prediction::Moderate),
            2 => Ok(Prediction::Severe),
            other => Err(CareError::model(format!(
                "classifier produced unknown class {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskGroup {
    Mild,
    Moderate,
    Severe,
}

impl RiskGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskGroup::Mild => "Mild",
            RiskGroup::Moderate => "Moderate",
            RiskGroup::Severe => "Severe",
        }
    }

    /// Group a stored `prediction_result` belongs to. Anything other than
    /// 1 or 2 reads back as Mild.
    pub fn from_prediction_code(code: i32) -> Self {
        match code {
            1 => RiskGroup::Moderate,
            2 => RiskGroup::Severe,
            _ => RiskGroup::Mild,
        }
    }
}

impl fmt::Display for RiskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelfCheckStats {
    pub total: i64,
    pub low: i64,
    pub high: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentCluster {
    pub label: String,
    pub date: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatestReflection {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_codes_map_to_groups() {
        assert_eq!(Prediction::try_from(0).unwrap().cluster_group(), None);
        assert_eq!(
            Prediction::try_from(1).unwrap().cluster_group(),
            Some(RiskGroup::Moderate)
        );
        assert_eq!(
            Prediction::try_from(2).unwrap().cluster_group(),
            Some(RiskGroup::Severe)
        );
        assert!(Prediction::try_from(3).is_err());
    }

    #[test]
    fn stored_codes_read_back_as_groups() {
        assert_eq!(RiskGroup::from_prediction_code(1), RiskGroup::Moderate);
        assert_eq!(RiskGroup::from_prediction_code(2), RiskGroup::Severe);
        assert_eq!(RiskGroup::from_prediction_code(0), RiskGroup::Mild);
    }

    #[test]
    fn risk_level_round_trips_through_text() {
        assert_eq!("High".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert_eq!(RiskLevel::Low.to_string(), "Low");
        assert!("Medium".parse::<RiskLevel>().is_err());
    }
}
