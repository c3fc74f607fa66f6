use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::camera::{Coordinates, Zone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    IllegalDumping,
    Overflow,
    DrainClogging,
    CleanlinessViolation,
}

impl IncidentType {
    pub const ALL: [IncidentType; 4] = [
        IncidentType::IllegalDumping,
        IncidentType::Overflow,
        IncidentType::DrainClogging,
        IncidentType::CleanlinessViolation,
    ];

    /// Multiplier applied to the detection confidence when scoring severity
    pub fn weight(&self) -> f64 {
        match self {
            IncidentType::IllegalDumping => 3.0,
            IncidentType::Overflow => 2.0,
            IncidentType::DrainClogging => 2.0,
            IncidentType::CleanlinessViolation => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::IllegalDumping => "illegal_dumping",
            IncidentType::Overflow => "overflow",
            IncidentType::DrainClogging => "drain_clogging",
            IncidentType::CleanlinessViolation => "cleanliness_violation",
        }
    }

    pub fn describe_at(&self, place: &str) -> String {
        match self {
            IncidentType::IllegalDumping => format!("Illegal waste dumping activity detected at {}", place),
            IncidentType::Overflow => format!("Waste container overflow detected at {}", place),
            IncidentType::DrainClogging => format!("Drain blockage or overflow detected at {}", place),
            IncidentType::CleanlinessViolation => format!("Cleanliness violation detected at {}", place),
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncidentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| "Invalid detection type".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical];

    /// Cutoffs are inclusive: a score of exactly 2.5 is critical.
    pub fn from_score(score: f64) -> Self {
        if score >= 2.5 {
            Severity::Critical
        } else if score >= 2.0 {
            Severity::High
        } else if score >= 1.5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Position in `ALL`; low is 0 and critical is 3
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[default]
    Detected,
    Pending,
    InProgress,
    Resolved,
    FalsePositive,
}

impl IncidentStatus {
    pub const ALL: [IncidentStatus; 5] = [
        IncidentStatus::Detected,
        IncidentStatus::Pending,
        IncidentStatus::InProgress,
        IncidentStatus::Resolved,
        IncidentStatus::FalsePositive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Detected => "detected",
            IncidentStatus::Pending => "pending",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::FalsePositive => "false_positive",
        }
    }

    /// `resolved` and `false_positive` end the lifecycle
    pub fn is_closed(&self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::FalsePositive)
    }

    /// Any open incident may move to any later-or-sibling state; closed ones never move
    /// and nothing re-enters `detected`.
    pub fn can_transition_to(&self, next: IncidentStatus) -> bool {
        !self.is_closed() && next != IncidentStatus::Detected
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentLocation {
    pub zone: Zone,
    #[serde(default)]
    pub specific: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiDetection {
    pub confidence: f64,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    pub model_version: String,
    pub processed_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Evidence {
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IncidentResponse {
    pub assigned_to: Option<ObjectId>,
    pub assigned_at: Option<String>,
    pub resolved_by: Option<ObjectId>,
    pub resolved_at: Option<String>,
    pub action_taken: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub incident_id: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: Severity,
    #[serde(default)]
    pub status: IncidentStatus,
    pub camera: ObjectId,
    pub camera_id: String,
    pub location: IncidentLocation,
    pub description: String,
    #[serde(default)]
    pub ai_detection: Option<AiDetection>,
    #[serde(default)]
    pub evidence: Evidence,
    #[serde(default)]
    pub response: IncidentResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub version: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Incident {
    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// `INC-{creation millis}-{sequence}`; the sequence comes from a store-side counter so
/// two incidents created in the same millisecond still differ and sort by creation.
pub fn format_incident_id(created_at_millis: i64, sequence: i64) -> String {
    format!("INC-{}-{:04}", created_at_millis, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_boundaries_take_the_higher_tier() {
        assert_eq!(Severity::from_score(2.5), Severity::Critical);
        assert_eq!(Severity::from_score(2.0), Severity::High);
        assert_eq!(Severity::from_score(1.5), Severity::Medium);
        assert_eq!(Severity::from_score(1.4999), Severity::Low);
        assert_eq!(Severity::from_score(0.0), Severity::Low);
    }

    #[test]
    fn test_severity_rank_follows_urgency() {
        let ranks: Vec<u8> = Severity::ALL.iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(Severity::Critical.rank() > Severity::High.rank());
        assert!(Severity::Low.rank() < Severity::Medium.rank());
    }

    #[test]
    fn test_type_weights() {
        assert_eq!(IncidentType::IllegalDumping.weight(), 3.0);
        assert_eq!(IncidentType::Overflow.weight(), 2.0);
        assert_eq!(IncidentType::DrainClogging.weight(), 2.0);
        assert_eq!(IncidentType::CleanlinessViolation.weight(), 1.0);
    }

    #[test]
    fn test_type_parse() {
        assert_eq!("overflow".parse::<IncidentType>().unwrap(), IncidentType::Overflow);
        assert_eq!("fire".parse::<IncidentType>().unwrap_err(), "Invalid detection type");
    }

    #[test]
    fn test_closed_states_do_not_transition() {
        for next in IncidentStatus::ALL {
            assert!(!IncidentStatus::Resolved.can_transition_to(next));
            assert!(!IncidentStatus::FalsePositive.can_transition_to(next));
        }
    }

    #[test]
    fn test_open_states_reach_resolution_directly() {
        for from in [IncidentStatus::Detected, IncidentStatus::Pending, IncidentStatus::InProgress] {
            assert!(from.can_transition_to(IncidentStatus::Resolved));
            assert!(from.can_transition_to(IncidentStatus::FalsePositive));
            assert!(!from.can_transition_to(IncidentStatus::Detected));
        }
    }

    #[test]
    fn test_incident_id_orders_by_sequence_within_a_millisecond() {
        let first = format_incident_id(1_700_000_000_000, 9);
        let second = format_incident_id(1_700_000_000_000, 10);
        assert_eq!(first, "INC-1700000000000-0009");
        assert!(first < second);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_value(IncidentStatus::InProgress).unwrap(), "in_progress");
        assert_eq!(serde_json::to_value(IncidentStatus::FalsePositive).unwrap(), "false_positive");
    }
}
