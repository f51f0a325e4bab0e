use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type Id = String;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Default timestamp for records restored from snapshots written before audit fields existed
pub(crate) fn default_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).unwrap_or_else(Utc::now)
}

/// Nominal voltage levels used across the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voltage {
    #[serde(rename = "11KV")]
    Kv11,
    #[serde(rename = "380")]
    V380,
    #[serde(rename = "220")]
    V220,
    #[serde(rename = "24")]
    V24,
}

impl Voltage {
    pub fn volts(&self) -> f64 {
        match self {
            Voltage::Kv11 => 11_000.0,
            Voltage::V380 => 380.0,
            Voltage::V220 => 220.0,
            Voltage::V24 => 24.0,
        }
    }
}

impl Default for Voltage {
    fn default() -> Self {
        Voltage::V220
    }
}

impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Voltage::Kv11 => write!(f, "11KV"),
            Voltage::V380 => write!(f, "380V"),
            Voltage::V220 => write!(f, "220V"),
            Voltage::V24 => write!(f, "24V"),
        }
    }
}

/// The four kinds of records held by a topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    PowerSource,
    Panel,
    Breaker,
    Load,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::PowerSource => "power source",
            EntityKind::Panel => "panel",
            EntityKind::Breaker => "circuit breaker",
            EntityKind::Load => "load",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voltage_wire_names() {
        assert_eq!(serde_json::to_string(&Voltage::Kv11).unwrap(), "\"11KV\"");
        assert_eq!(serde_json::to_string(&Voltage::V380).unwrap(), "\"380\"");

        let parsed: Voltage = serde_json::from_str("\"24\"").unwrap();
        assert_eq!(parsed, Voltage::V24);
        assert_eq!(parsed.volts(), 24.0);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(generate_id(), generate_id());
    }
}
