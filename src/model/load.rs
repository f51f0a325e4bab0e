use crate::model::{default_timestamp, generate_id, CableAttributes, Id, Voltage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadType {
    Lighting,
    Power,
    Hvac,
    Motor,
    Heating,
    Other,
}

impl Default for LoadType {
    fn default() -> Self {
        LoadType::Other
    }
}

fn default_power_factor() -> f64 {
    1.0
}

/// An end consumer, the leaf of the topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: Id,
    pub name: String,
    pub load_type: LoadType,
    pub panel: Option<Id>,
    pub breaker: Option<Id>,
    pub voltage: Option<Voltage>,

    /// Carried current in amperes
    pub ampacity: f64,

    #[serde(default)]
    pub cable: CableAttributes,

    /// Power draw in watts
    pub power_consumption: f64,

    /// Expected operating hours per day
    pub estimated_usage_hours: f64,

    #[serde(default = "default_power_factor")]
    pub power_factor: f64,

    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoad {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub load_type: LoadType,
    #[serde(default)]
    pub panel: Option<Id>,
    #[serde(default)]
    pub breaker: Option<Id>,
    #[serde(default)]
    pub voltage: Option<Voltage>,
    #[serde(default)]
    pub ampacity: f64,
    #[serde(default)]
    pub cable: CableAttributes,
    #[serde(default)]
    pub power_consumption: f64,
    #[serde(default)]
    pub estimated_usage_hours: f64,
    #[serde(default = "default_power_factor")]
    pub power_factor: f64,
}

impl NewLoad {
    pub fn named(name: &str, ampacity: f64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            load_type: LoadType::default(),
            panel: None,
            breaker: None,
            voltage: None,
            ampacity,
            cable: CableAttributes::default(),
            power_consumption: 0.0,
            estimated_usage_hours: 0.0,
            power_factor: default_power_factor(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ampacity < 0.0 || !self.ampacity.is_finite() {
            return Err(format!("load ampacity must be non-negative, got {}", self.ampacity));
        }
        if self.power_consumption < 0.0 || !self.power_consumption.is_finite() {
            return Err(format!(
                "power consumption must be non-negative, got {}",
                self.power_consumption
            ));
        }
        if !(0.0..=24.0).contains(&self.estimated_usage_hours) {
            return Err(format!(
                "estimated usage must be between 0 and 24 hours per day, got {}",
                self.estimated_usage_hours
            ));
        }
        if !(0.0..=1.0).contains(&self.power_factor) {
            return Err(format!(
                "power factor must be between 0 and 1, got {}",
                self.power_factor
            ));
        }
        self.cable.validate()
    }

    pub fn into_load(self) -> Load {
        let now = Utc::now();
        Load {
            id: self.id.unwrap_or_else(generate_id),
            name: self.name,
            load_type: self.load_type,
            panel: self.panel,
            breaker: self.breaker,
            voltage: self.voltage,
            ampacity: self.ampacity,
            cable: self.cable,
            power_consumption: self.power_consumption,
            estimated_usage_hours: self.estimated_usage_hours,
            power_factor: self.power_factor,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_factor_defaults_to_unity() {
        let input: NewLoad = serde_json::from_str(r#"{"name": "Pump"}"#).unwrap();
        assert_eq!(input.power_factor, 1.0);
        assert_eq!(input.load_type, LoadType::Other);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut input = NewLoad::named("Chiller", 40.0);
        input.power_factor = 1.2;
        assert!(input.validate().is_err());

        input.power_factor = 0.85;
        input.estimated_usage_hours = 25.0;
        assert!(input.validate().is_err());

        input.estimated_usage_hours = 8.0;
        assert!(input.validate().is_ok());
    }
}
