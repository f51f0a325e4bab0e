use serde::{Deserialize, Serialize};
use std::fmt;

/// Cross-sections a cable may be specified with (mm²)
pub const COMMON_CROSS_SECTIONS: [f64; 19] = [
    1.5, 2.5, 4.0, 6.0, 10.0, 16.0, 25.0, 35.0, 50.0, 70.0, 95.0, 120.0, 150.0, 185.0, 240.0,
    300.0, 400.0, 500.0, 630.0,
];

fn is_common_section(section: f64) -> bool {
    COMMON_CROSS_SECTIONS.contains(&section)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CableMaterial {
    Copper,
    Aluminum,
}

impl Default for CableMaterial {
    fn default() -> Self {
        CableMaterial::Copper
    }
}

impl fmt::Display for CableMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CableMaterial::Copper => f.write_str("copper"),
            CableMaterial::Aluminum => f.write_str("aluminum"),
        }
    }
}

/// How the cable is routed; drives the ampacity correction factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CablePath {
    Aerial,
    Buried,
    Conduit,
    Tray,
}

impl Default for CablePath {
    fn default() -> Self {
        CablePath::Aerial
    }
}

/// Feeder cable description shared by power sources, panels and loads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CableAttributes {
    /// Number of parallel conductors
    pub quantity: u32,

    /// Phase conductor cross-section in mm²
    pub cross_section: f64,

    /// Neutral conductor cross-section in mm², absent when there is no separate neutral
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neutral_cross_section: Option<f64>,

    pub material: CableMaterial,

    /// Run length in meters
    pub length: f64,

    pub path: CablePath,
}

impl Default for CableAttributes {
    fn default() -> Self {
        Self {
            quantity: 1,
            cross_section: 2.5,
            neutral_cross_section: None,
            material: CableMaterial::Copper,
            length: 0.0,
            path: CablePath::Aerial,
        }
    }
}

impl CableAttributes {
    /// A zero neutral section is stored by some clients to mean "no neutral"
    pub fn neutral(&self) -> Option<f64> {
        self.neutral_cross_section.filter(|section| *section > 0.0)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.quantity == 0 {
            return Err("cable quantity must be at least 1".to_string());
        }
        if !is_common_section(self.cross_section) {
            return Err(format!(
                "cable cross-section must be one of the standard sizes (1.5 to 630 mm²), got {}",
                self.cross_section
            ));
        }
        if let Some(neutral) = self.neutral() {
            if !is_common_section(neutral) {
                return Err(format!(
                    "neutral cross-section must be one of the standard sizes (1.5 to 630 mm²), got {}",
                    neutral
                ));
            }
        }
        if self.length < 0.0 || !self.length.is_finite() {
            return Err(format!("cable length must be non-negative, got {}", self.length));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_cable_json_uses_defaults() {
        let cable: CableAttributes =
            serde_json::from_str(r#"{"cross_section": 16, "material": "aluminum"}"#).unwrap();

        assert_eq!(cable.quantity, 1);
        assert_eq!(cable.cross_section, 16.0);
        assert_eq!(cable.material, CableMaterial::Aluminum);
        assert_eq!(cable.path, CablePath::Aerial);
        assert_eq!(cable.neutral(), None);
    }

    #[test]
    fn test_zero_neutral_is_treated_as_absent() {
        let cable = CableAttributes {
            neutral_cross_section: Some(0.0),
            ..CableAttributes::default()
        };
        assert_eq!(cable.neutral(), None);
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let cable = CableAttributes {
            quantity: 0,
            ..CableAttributes::default()
        };
        assert!(cable.validate().is_err());
        assert!(CableAttributes::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_standard_sections() {
        let odd = CableAttributes {
            cross_section: 3.0,
            ..CableAttributes::default()
        };
        assert!(odd.validate().is_err());

        let odd_neutral = CableAttributes {
            cross_section: 16.0,
            neutral_cross_section: Some(7.0),
            ..CableAttributes::default()
        };
        assert!(odd_neutral.validate().is_err());

        // Aluminium below 16 mm² is a standard size without table entries
        let small_aluminum = CableAttributes {
            cross_section: 4.0,
            neutral_cross_section: Some(0.0),
            material: CableMaterial::Aluminum,
            ..CableAttributes::default()
        };
        assert!(small_aluminum.validate().is_ok());
    }
}
