//! Item categories and sync record types

use serde::{Deserialize, Serialize};

/// Informational category of a queued request
///
/// Also names the background-sync interest registered per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Workout,
    Nutrition,
    Progress,
    Chat,
    #[default]
    General,
}

impl Category {
    /// Categories that can be enabled for background sync
    pub fn syncable() -> [Category; 4] {
        [Self::Workout, Self::Nutrition, Self::Progress, Self::Chat]
    }

    /// Tag registered with the host background agent for this category
    pub fn sync_tag(&self) -> String {
        format!("sync-{}", self)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Workout => write!(f, "workout"),
            Self::Nutrition => write!(f, "nutrition"),
            Self::Progress => write!(f, "progress"),
            Self::Chat => write!(f, "chat"),
            Self::General => write!(f, "general"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "workout" => Ok(Self::Workout),
            "nutrition" => Ok(Self::Nutrition),
            "progress" => Ok(Self::Progress),
            "chat" => Ok(Self::Chat),
            "general" => Ok(Self::General),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Kind of domain record carried by a SyncRecord
///
/// Each record type is delivered to its own remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Workout,
    Nutrition,
    Progress,
    Chat,
}

impl RecordType {
    /// The request category matching this record type
    pub fn category(&self) -> Category {
        match self {
            Self::Workout => Category::Workout,
            Self::Nutrition => Category::Nutrition,
            Self::Progress => Category::Progress,
            Self::Chat => Category::Chat,
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.category())
    }
}

impl std::str::FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "workout" => Ok(Self::Workout),
            "nutrition" => Ok(Self::Nutrition),
            "progress" => Ok(Self::Progress),
            "chat" => Ok(Self::Chat),
            _ => Err(format!("Unknown record type: {}", s)),
        }
    }
}
