use crate::model::{default_timestamp, generate_id, CableAttributes, Id, Voltage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Grid,
    Generator,
}

impl Default for SourceType {
    fn default() -> Self {
        SourceType::Grid
    }
}

/// Supply point at the root of one or more panel trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSource {
    pub id: Id,
    pub name: String,
    pub source_type: SourceType,
    pub voltage: Voltage,

    /// Total current available from the source in amperes
    pub total_ampacity: f64,

    #[serde(default)]
    pub cable: CableAttributes,

    pub main_breaker: Option<Id>,

    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPowerSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub voltage: Voltage,
    #[serde(default)]
    pub total_ampacity: f64,
    #[serde(default)]
    pub cable: CableAttributes,
    #[serde(default)]
    pub main_breaker: Option<Id>,
}

impl NewPowerSource {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            source_type: SourceType::default(),
            voltage: Voltage::default(),
            total_ampacity: 0.0,
            cable: CableAttributes::default(),
            main_breaker: None,
        }
    }

    pub fn into_source(self) -> PowerSource {
        let now = Utc::now();
        PowerSource {
            id: self.id.unwrap_or_else(generate_id),
            name: self.name,
            source_type: self.source_type,
            voltage: self.voltage,
            total_ampacity: self.total_ampacity,
            cable: self.cable,
            main_breaker: None,
            created_at: now,
            updated_at: now,
        }
    }
}
