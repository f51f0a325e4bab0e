use crate::model::{default_timestamp, generate_id, CableAttributes, Id, Voltage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelType {
    Main,    // Fed directly by a power source
    SubMain, // Fed by a parent panel, may feed further panels
    Sub,     // Fed by a parent panel, leaf of the panel tree
}

impl PanelType {
    pub fn is_root(&self) -> bool {
        matches!(self, PanelType::Main)
    }

    pub fn can_have_children(&self) -> bool {
        !matches!(self, PanelType::Sub)
    }
}

/// A switchboard distributing power to breakers and downstream panels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub id: Id,
    pub name: String,
    pub panel_type: PanelType,

    /// Set for `main` panels only
    pub power_source: Option<Id>,

    /// Set for `sub` and `sub_main` panels only
    pub parent_panel: Option<Id>,

    /// Breaker in the parent panel that feeds this panel
    pub feeder_breaker: Option<Id>,

    pub main_breaker: Option<Id>,

    /// None until inherited from the power source or parent panel
    pub voltage: Option<Voltage>,

    pub ampacity: f64,

    #[serde(default)]
    pub cable: CableAttributes,

    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Panel input model for creation and full updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPanel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub name: String,

    /// When absent the type follows the linkage: `sub` under a parent, `main` otherwise
    #[serde(default)]
    pub panel_type: Option<PanelType>,
    #[serde(default)]
    pub power_source: Option<Id>,
    #[serde(default)]
    pub parent_panel: Option<Id>,
    #[serde(default)]
    pub feeder_breaker: Option<Id>,
    #[serde(default)]
    pub main_breaker: Option<Id>,
    #[serde(default)]
    pub voltage: Option<Voltage>,
    #[serde(default)]
    pub ampacity: f64,
    #[serde(default)]
    pub cable: CableAttributes,
}

impl NewPanel {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            panel_type: None,
            power_source: None,
            parent_panel: None,
            feeder_breaker: None,
            main_breaker: None,
            voltage: None,
            ampacity: 0.0,
            cable: CableAttributes::default(),
        }
    }

    pub fn resolved_type(&self) -> PanelType {
        self.panel_type.unwrap_or(if self.parent_panel.is_some() {
            PanelType::Sub
        } else {
            PanelType::Main
        })
    }

    /// Build the stored record with the tree linkage applied. Breaker references
    /// are attached afterwards so they go through role synchronization.
    pub fn into_panel(self) -> Panel {
        let now = Utc::now();
        let panel_type = self.resolved_type();
        Panel {
            id: self.id.unwrap_or_else(generate_id),
            name: self.name,
            panel_type,
            power_source: self.power_source,
            parent_panel: self.parent_panel,
            feeder_breaker: None,
            main_breaker: None,
            voltage: self.voltage,
            ampacity: self.ampacity,
            cable: self.cable,
            created_at: now,
            updated_at: now,
        }
    }
}
