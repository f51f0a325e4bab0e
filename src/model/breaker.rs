use crate::model::{default_timestamp, generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerRole {
    Main,       // Feeds a whole panel or power source
    SubMain,    // Feeds a downstream panel
    Distribution,
}

impl Default for BreakerRole {
    fn default() -> Self {
        BreakerRole::Distribution
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreakerType {
    Mcb,
    Mccb,
    Acb,
    Elcb,
    Rcd,
    Rcbo,
}

impl Default for BreakerType {
    fn default() -> Self {
        BreakerType::Mcb
    }
}

impl BreakerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerType::Mcb => "MCB",
            BreakerType::Mccb => "MCCB",
            BreakerType::Acb => "ACB",
            BreakerType::Elcb => "ELCB",
            BreakerType::Rcd => "RCD",
            BreakerType::Rcbo => "RCBO",
        }
    }
}

fn default_manufacturer() -> String {
    "Schneider".to_string()
}

fn default_trip_curve() -> String {
    "C".to_string()
}

fn default_poles() -> u8 {
    1
}

/// A protective switching device, optionally mounted in a panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    pub id: Id,
    pub name: Option<String>,

    /// Short description shown next to the breaker, e.g. "first floor lighting"
    pub label: Option<String>,
    pub model: Option<String>,
    pub manufacturer: String,
    pub breaker_type: BreakerType,
    pub breaker_role: BreakerRole,
    pub poles: u8,

    /// Rated current in amperes
    pub rated_current: f64,

    /// Breaking capacity in kA
    pub short_circuit_current: f64,
    pub trip_curve: String,

    /// Slot order inside the owning panel
    pub position: i32,

    /// Owning panel
    pub panel: Option<Id>,

    /// Breakers this breaker is fed by. Together these sets form the feeding graph.
    #[serde(default)]
    pub feeding_breakers: BTreeSet<Id>,

    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl CircuitBreaker {
    /// Name used in paths and listings when the breaker has no explicit name
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!(
                "{} {} {}A",
                self.manufacturer,
                self.breaker_type.as_str(),
                self.rated_current
            ),
        }
    }

    pub fn is_main(&self) -> bool {
        self.breaker_role == BreakerRole::Main
    }
}

/// Circuit breaker input model for creation and full updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCircuitBreaker {
    /// Optional ID - if not provided, will be generated server-side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    #[serde(default)]
    pub breaker_type: BreakerType,

    /// Requested role; absent means distribution
    #[serde(default)]
    pub breaker_role: Option<BreakerRole>,
    #[serde(default = "default_poles")]
    pub poles: u8,
    #[serde(default)]
    pub rated_current: f64,
    #[serde(default)]
    pub short_circuit_current: f64,
    #[serde(default = "default_trip_curve")]
    pub trip_curve: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub panel: Option<Id>,
    #[serde(default)]
    pub feeding_breakers: BTreeSet<Id>,
}

impl Default for NewCircuitBreaker {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            label: None,
            model: None,
            manufacturer: default_manufacturer(),
            breaker_type: BreakerType::default(),
            breaker_role: None,
            poles: default_poles(),
            rated_current: 0.0,
            short_circuit_current: 0.0,
            trip_curve: default_trip_curve(),
            position: 0,
            panel: None,
            feeding_breakers: BTreeSet::new(),
        }
    }
}

impl NewCircuitBreaker {
    pub fn named(name: &str, rated_current: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            rated_current,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=4).contains(&self.poles) {
            return Err(format!("breaker poles must be between 1 and 4, got {}", self.poles));
        }
        if self.rated_current < 0.0 || !self.rated_current.is_finite() {
            return Err(format!(
                "rated current must be non-negative, got {}",
                self.rated_current
            ));
        }
        if self.short_circuit_current < 0.0 || !self.short_circuit_current.is_finite() {
            return Err(format!(
                "short-circuit current must be non-negative, got {}",
                self.short_circuit_current
            ));
        }
        Ok(())
    }

    /// Build the stored record. Relations (panel, feeding set) are left empty and
    /// attached afterwards by the validated operations.
    pub fn into_breaker(self) -> CircuitBreaker {
        let now = Utc::now();
        CircuitBreaker {
            id: self.id.unwrap_or_else(generate_id),
            name: self.name,
            label: self.label,
            model: self.model,
            manufacturer: self.manufacturer,
            breaker_type: self.breaker_type,
            breaker_role: self.breaker_role.unwrap_or_default(),
            poles: self.poles,
            rated_current: self.rated_current,
            short_circuit_current: self.short_circuit_current,
            trip_curve: self.trip_curve,
            position: self.position,
            panel: None,
            feeding_breakers: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy the scalar fields onto an existing record
    pub fn apply_scalars(&self, breaker: &mut CircuitBreaker) {
        breaker.name = self.name.clone();
        breaker.label = self.label.clone();
        breaker.model = self.model.clone();
        breaker.manufacturer = self.manufacturer.clone();
        breaker.breaker_type = self.breaker_type;
        if let Some(role) = self.breaker_role {
            breaker.breaker_role = role;
        }
        breaker.poles = self.poles;
        breaker.rated_current = self.rated_current;
        breaker.short_circuit_current = self.short_circuit_current;
        breaker.trip_curve = self.trip_curve.clone();
        breaker.position = self.position;
        breaker.updated_at = Utc::now();
    }
}
