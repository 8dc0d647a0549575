//! Mission catalog and the per-user mission status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MissionInfo {
    pub id: i32,
    pub name: &'static str,
    pub focus: &'static str,
}

pub const MISSION_CATALOG: [MissionInfo; 13] = [
    MissionInfo { id: 1, name: "The First Flame", focus: "Web Basics" },
    MissionInfo { id: 2, name: "Records of Apprentices", focus: "ORM & CRUD" },
    MissionInfo { id: 3, name: "Seal of the Keeper", focus: "JWT Authentication" },
    MissionInfo { id: 4, name: "External Scrolls", focus: "API Integration" },
    MissionInfo { id: 5, name: "Parallel Prophecies", focus: "Async Programming" },
    MissionInfo { id: 6, name: "The Guild Archives", focus: "Data Analysis" },
    MissionInfo { id: 7, name: "Echo of Time", focus: "Caching" },
    MissionInfo { id: 8, name: "Circle of Truth", focus: "Testing & CI" },
    MissionInfo { id: 9, name: "The Forge", focus: "Packaging" },
    MissionInfo { id: 10, name: "Ascension", focus: "Container Deployment" },
    MissionInfo { id: 11, name: "The Whispering Stream", focus: "WebSockets" },
    MissionInfo { id: 12, name: "The Mirror Gateway", focus: "GraphQL" },
    MissionInfo { id: 13, name: "The Sky Forge", focus: "Cloud Deployment" },
];

#[must_use]
pub fn find_mission(id: i32) -> Option<&'static MissionInfo> {
    MISSION_CATALOG.iter().find(|m| m.id == id)
}

/// Display name for a mission id, including ids outside the catalog.
#[must_use]
pub fn mission_name(id: i32) -> String {
    find_mission(id).map_or_else(|| format!("Mission {id}"), |m| m.name.to_string())
}

/// `not_started -> in_progress -> completed`, terminal at `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl MissionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Staying in the same non-terminal state is allowed so score updates
    /// can be recorded without a transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::NotStarted | Self::InProgress | Self::Completed)
                | (Self::InProgress, Self::InProgress | Self::Completed)
        )
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(format!(
                "Invalid mission status '{other}' (expected not_started, in_progress or completed)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_complete_and_ordered() {
        assert_eq!(MISSION_CATALOG.len(), 13);
        for (index, mission) in MISSION_CATALOG.iter().enumerate() {
            assert_eq!(mission.id, i32::try_from(index).unwrap() + 1);
        }
        assert_eq!(MISSION_CATALOG[0].name, "The First Flame");
    }

    #[test]
    fn mission_names() {
        assert_eq!(mission_name(3), "Seal of the Keeper");
        assert_eq!(mission_name(42), "Mission 42");
    }

    #[test]
    fn forward_transitions_allowed() {
        use MissionStatus::{Completed, InProgress, NotStarted};
        assert!(NotStarted.can_transition_to(InProgress));
        assert!(NotStarted.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(InProgress));
    }

    #[test]
    fn completed_is_terminal() {
        use MissionStatus::{Completed, InProgress, NotStarted};
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(NotStarted));
        assert!(!Completed.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(NotStarted));
    }

    #[test]
    fn status_parsing() {
        assert_eq!("in_progress".parse(), Ok(MissionStatus::InProgress));
        assert!("done".parse::<MissionStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&MissionStatus::NotStarted).unwrap(),
            "\"not_started\""
        );
    }
}
