//! Static cable calculations: resistance, voltage drop, power loss and ampacity
//! from fixed lookup tables, plus the consumption figures derived from a load's
//! rating.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TopologyError};
use crate::model::{CableAttributes, CableMaterial, CablePath, Voltage};

// (cross-section mm², resistance Ω/km)
const COPPER_RESISTIVITY: &[(f64, f64)] = &[
    (1.5, 12.1),
    (2.5, 7.41),
    (4.0, 4.61),
    (6.0, 3.08),
    (10.0, 1.83),
    (16.0, 1.15),
    (25.0, 0.727),
    (35.0, 0.524),
    (50.0, 0.387),
    (70.0, 0.268),
    (95.0, 0.193),
    (120.0, 0.153),
    (150.0, 0.124),
    (185.0, 0.0991),
    (240.0, 0.0754),
    (300.0, 0.0601),
    (400.0, 0.0470),
    (500.0, 0.0366),
    (630.0, 0.0283),
];

const ALUMINUM_RESISTIVITY: &[(f64, f64)] = &[
    (16.0, 1.91),
    (25.0, 1.20),
    (35.0, 0.868),
    (50.0, 0.641),
    (70.0, 0.443),
    (95.0, 0.320),
    (120.0, 0.253),
    (150.0, 0.206),
    (185.0, 0.164),
    (240.0, 0.125),
    (300.0, 0.100),
    (400.0, 0.0778),
    (500.0, 0.0605),
    (630.0, 0.0469),
];

// (cross-section mm², base ampacity A)
const COPPER_CAPACITY: &[(f64, f64)] = &[
    (1.5, 16.0),
    (2.5, 22.0),
    (4.0, 30.0),
    (6.0, 38.0),
    (10.0, 52.0),
    (16.0, 69.0),
    (25.0, 90.0),
    (35.0, 111.0),
    (50.0, 133.0),
    (70.0, 171.0),
    (95.0, 207.0),
    (120.0, 239.0),
    (150.0, 272.0),
    (185.0, 310.0),
    (240.0, 364.0),
    (300.0, 419.0),
    (400.0, 502.0),
    (500.0, 578.0),
    (630.0, 669.0),
];

const ALUMINUM_CAPACITY: &[(f64, f64)] = &[
    (16.0, 53.0),
    (25.0, 70.0),
    (35.0, 86.0),
    (50.0, 104.0),
    (70.0, 133.0),
    (95.0, 161.0),
    (120.0, 186.0),
    (150.0, 212.0),
    (185.0, 240.0),
    (240.0, 282.0),
    (300.0, 324.0),
    (400.0, 385.0),
    (500.0, 443.0),
    (630.0, 510.0),
];

fn lookup(table: &[(f64, f64)], cross_section: f64) -> Option<f64> {
    table
        .iter()
        .find(|(section, _)| (section - cross_section).abs() < 1e-9)
        .map(|(_, value)| *value)
}

/// Table resistance in Ω/km, if the cross-section is listed for the material
pub fn resistivity_ohm_per_km(material: CableMaterial, cross_section: f64) -> Option<f64> {
    match material {
        CableMaterial::Copper => lookup(COPPER_RESISTIVITY, cross_section),
        CableMaterial::Aluminum => lookup(ALUMINUM_RESISTIVITY, cross_section),
    }
}

/// Table ampacity for a single conductor laid in air
pub fn base_current_capacity(material: CableMaterial, cross_section: f64) -> Option<f64> {
    match material {
        CableMaterial::Copper => lookup(COPPER_CAPACITY, cross_section),
        CableMaterial::Aluminum => lookup(ALUMINUM_CAPACITY, cross_section),
    }
}

pub fn path_correction_factor(path: CablePath) -> f64 {
    match path {
        CablePath::Aerial => 1.0,
        CablePath::Buried => 0.8,
        CablePath::Conduit => 0.7,
        CablePath::Tray => 0.9,
    }
}

/// `"{quantity}x{cross_section}"`, with `"+{neutral}"` appended when a neutral is present
pub fn cable_specification(quantity: u32, cross_section: f64, neutral: Option<f64>) -> String {
    match neutral.filter(|section| *section > 0.0) {
        Some(neutral) => format!("{}x{}+{}", quantity, cross_section, neutral),
        None => format!("{}x{}", quantity, cross_section),
    }
}

pub fn voltage_drop(current: f64, resistance_per_meter: f64, length: f64) -> f64 {
    current * resistance_per_meter * length
}

pub fn power_loss(current: f64, resistance_per_meter: f64, length: f64) -> f64 {
    current.powi(2) * resistance_per_meter * length
}

pub fn voltage_drop_percent(drop: f64, nominal_voltage: f64) -> Option<f64> {
    if nominal_voltage > 0.0 {
        Some(drop / nominal_voltage * 100.0)
    } else {
        None
    }
}

pub fn daily_consumption_kwh(power_watts: f64, usage_hours: f64) -> f64 {
    power_watts * usage_hours / 1000.0
}

/// What to do when a cross-section has no table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCrossSectionPolicy {
    /// Use the configured fallback resistance and zero ampacity
    #[default]
    Fallback,
    /// Reject with `UnknownCrossSection`
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableReport {
    pub specification: String,
    pub carried_current: f64,
    pub resistance_per_meter: f64,
    pub voltage_drop: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage_drop_percent: Option<f64>,
    pub power_loss: f64,
    pub max_current_capacity: f64,
    /// Carried current exceeds the corrected cable capacity
    pub overloaded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CableCalculator {
    pub unknown_cross_section: UnknownCrossSectionPolicy,
    pub fallback_resistance_ohm_per_km: f64,
}

impl Default for CableCalculator {
    fn default() -> Self {
        Self {
            unknown_cross_section: UnknownCrossSectionPolicy::Fallback,
            fallback_resistance_ohm_per_km: 0.5,
        }
    }
}

impl CableCalculator {
    pub fn strict() -> Self {
        Self {
            unknown_cross_section: UnknownCrossSectionPolicy::Strict,
            ..Self::default()
        }
    }

    /// Effective resistance in Ω/m of `quantity` parallel conductors
    pub fn resistance_per_meter(
        &self,
        material: CableMaterial,
        cross_section: f64,
        quantity: u32,
    ) -> Result<f64> {
        if quantity == 0 {
            return Err(TopologyError::Validation(
                "cable quantity must be at least 1".to_string(),
            ));
        }
        let per_km = match resistivity_ohm_per_km(material, cross_section) {
            Some(value) => value,
            None => match self.unknown_cross_section {
                UnknownCrossSectionPolicy::Strict => {
                    return Err(TopologyError::UnknownCrossSection {
                        material,
                        cross_section,
                    })
                }
                UnknownCrossSectionPolicy::Fallback => {
                    warn!(
                        "No resistance data for {} {} mm², using fallback {} Ω/km",
                        material, cross_section, self.fallback_resistance_ohm_per_km
                    );
                    self.fallback_resistance_ohm_per_km
                }
            },
        };
        Ok(per_km / 1000.0 / f64::from(quantity))
    }

    pub fn max_current_capacity(
        &self,
        material: CableMaterial,
        cross_section: f64,
        path: CablePath,
        quantity: u32,
    ) -> Result<f64> {
        let base = match base_current_capacity(material, cross_section) {
            Some(value) => value,
            None => match self.unknown_cross_section {
                UnknownCrossSectionPolicy::Strict => {
                    return Err(TopologyError::UnknownCrossSection {
                        material,
                        cross_section,
                    })
                }
                UnknownCrossSectionPolicy::Fallback => 0.0,
            },
        };
        Ok(base * path_correction_factor(path) * f64::from(quantity))
    }

    /// Full set of derived figures for one cable carrying `current`
    pub fn report(
        &self,
        cable: &CableAttributes,
        current: f64,
        nominal_voltage: Option<Voltage>,
    ) -> Result<CableReport> {
        let resistance =
            self.resistance_per_meter(cable.material, cable.cross_section, cable.quantity)?;
        let drop = voltage_drop(current, resistance, cable.length);
        let capacity = self.max_current_capacity(
            cable.material,
            cable.cross_section,
            cable.path,
            cable.quantity,
        )?;

        Ok(CableReport {
            specification: cable_specification(
                cable.quantity,
                cable.cross_section,
                cable.neutral(),
            ),
            carried_current: current,
            resistance_per_meter: resistance,
            voltage_drop: drop,
            voltage_drop_percent: nominal_voltage
                .and_then(|voltage| voltage_drop_percent(drop, voltage.volts())),
            power_loss: power_loss(current, resistance, cable.length),
            max_current_capacity: capacity,
            overloaded: capacity > 0.0 && current > capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cable_specification_format() {
        assert_eq!(cable_specification(2, 4.0, None), "2x4");
        assert_eq!(cable_specification(2, 4.0, Some(1.5)), "2x4+1.5");
        assert_eq!(cable_specification(4, 2.5, Some(0.0)), "4x2.5");
    }

    #[test]
    fn test_resistance_lookup_and_parallel_conductors() {
        let calculator = CableCalculator::default();

        let single = calculator
            .resistance_per_meter(CableMaterial::Copper, 16.0, 1)
            .unwrap();
        assert_eq!(single, 1.15 / 1000.0);

        let doubled = calculator
            .resistance_per_meter(CableMaterial::Copper, 16.0, 2)
            .unwrap();
        assert_eq!(doubled, single / 2.0);
    }

    #[test]
    fn test_voltage_drop_and_loss() {
        let r = 0.00727;
        assert_eq!(voltage_drop(20.0, r, 50.0), 20.0 * r * 50.0);
        assert_eq!(power_loss(20.0, r, 50.0), 400.0 * r * 50.0);
    }

    #[test]
    fn test_unknown_cross_section_fallback() {
        let calculator = CableCalculator::default();
        // Aluminium tables start at 16 mm²
        let r = calculator
            .resistance_per_meter(CableMaterial::Aluminum, 2.5, 1)
            .unwrap();
        assert_eq!(r, 0.5 / 1000.0);

        let capacity = calculator
            .max_current_capacity(CableMaterial::Aluminum, 2.5, CablePath::Aerial, 1)
            .unwrap();
        assert_eq!(capacity, 0.0);
    }

    #[test]
    fn test_unknown_cross_section_strict() {
        let calculator = CableCalculator::strict();
        let err = calculator
            .resistance_per_meter(CableMaterial::Aluminum, 2.5, 1)
            .unwrap_err();
        assert!(matches!(err, TopologyError::UnknownCrossSection { .. }));
    }

    #[test]
    fn test_capacity_applies_path_factor_and_quantity() {
        let calculator = CableCalculator::default();
        let capacity = calculator
            .max_current_capacity(CableMaterial::Copper, 16.0, CablePath::Buried, 2)
            .unwrap();
        assert!((capacity - 69.0 * 0.8 * 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_flags_overload() {
        let cable = CableAttributes {
            quantity: 1,
            cross_section: 2.5,
            length: 30.0,
            path: CablePath::Conduit,
            ..CableAttributes::default()
        };
        let report = CableCalculator::default()
            .report(&cable, 20.0, Some(Voltage::V220))
            .unwrap();

        assert_eq!(report.specification, "1x2.5");
        assert!((report.max_current_capacity - 22.0 * 0.7).abs() < 1e-9);
        assert!(report.overloaded);
        let expected_drop = 20.0 * (7.41 / 1000.0) * 30.0;
        assert!((report.voltage_drop - expected_drop).abs() < 1e-9);
        assert!((report.voltage_drop_percent.unwrap() - expected_drop / 220.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_consumption() {
        assert_eq!(daily_consumption_kwh(1500.0, 4.0), 6.0);
    }
}
