use chrono::Utc;
use log::{debug, info};
use std::collections::HashSet;

use crate::error::{Result, TopologyError};
use crate::logic::BreakerGraph;
use crate::model::{BreakerRole, Id, Load, MainBreakerOwner, Panel, Topology, Voltage};

/// Keeps denormalized fields in step after a relation changes. Every method is
/// idempotent and reports whether it changed anything.
pub struct Synchronizer;

impl Synchronizer {
    /// Force the main breaker's role to `main` and mount it in the owning panel
    /// when it is not mounted anywhere yet.
    pub fn main_breaker(topology: &mut Topology, owner: &MainBreakerOwner, breaker_id: &Id) -> Result<bool> {
        let mut breaker = topology.require_breaker(breaker_id)?.clone();
        let mut changed = false;

        if breaker.breaker_role != BreakerRole::Main {
            breaker.breaker_role = BreakerRole::Main;
            changed = true;
        }
        if let MainBreakerOwner::Panel(panel_id) = owner {
            if breaker.panel.is_none() {
                breaker.panel = Some(panel_id.clone());
                changed = true;
            }
        }

        if changed {
            info!("Synchronized main breaker '{}' for {}", breaker_id, owner);
            breaker.updated_at = Utc::now();
            topology.upsert_breaker(breaker);
        }
        Ok(changed)
    }

    /// Mount the panel's feeder breaker in the parent panel and register it as
    /// a feeder of the panel's main breaker.
    pub fn feeder_breaker(topology: &mut Topology, panel_id: &Id) -> Result<bool> {
        let panel = topology.require_panel(panel_id)?.clone();
        let (Some(feeder_id), Some(parent_id)) = (&panel.feeder_breaker, &panel.parent_panel) else {
            return Ok(false);
        };

        let mut changed = false;
        let mut feeder = topology.require_breaker(feeder_id)?.clone();
        if feeder.panel.as_ref() != Some(parent_id) {
            feeder.panel = Some(parent_id.clone());
            feeder.updated_at = Utc::now();
            topology.upsert_breaker(feeder);
            changed = true;
        }

        if let Some(main_id) = &panel.main_breaker {
            let mut main = topology.require_breaker(main_id)?.clone();
            if !main.feeding_breakers.contains(feeder_id) {
                let mut proposed = main.feeding_breakers.clone();
                proposed.insert(feeder_id.clone());
                BreakerGraph::validate_feed(topology, main_id, &proposed)?;
                main.feeding_breakers = proposed;
                main.updated_at = Utc::now();
                topology.upsert_breaker(main);
                changed = true;
            }
        }

        if changed {
            info!("Synchronized feeder breaker '{}' for panel '{}'", feeder_id, panel.name);
        }
        Ok(changed)
    }

    /// Make a load's breaker and panel agree. A breaker that is not mounted
    /// anywhere moves into the load's panel; otherwise the load follows the
    /// breaker's panel.
    pub fn load_breaker(topology: &mut Topology, load: &mut Load) -> Result<bool> {
        let Some(breaker_id) = load.breaker.clone() else {
            return Ok(false);
        };
        let mut breaker = topology.require_breaker(&breaker_id)?.clone();

        match (breaker.panel.clone(), load.panel.clone()) {
            (Some(breaker_panel), Some(load_panel)) if breaker_panel == load_panel => Ok(false),
            (Some(breaker_panel), _) => {
                debug!(
                    "Load '{}' moved to panel '{}' of its breaker '{}'",
                    load.name, breaker_panel, breaker_id
                );
                load.panel = Some(breaker_panel);
                Ok(true)
            }
            (None, Some(load_panel)) => {
                topology.require_panel(&load_panel)?;
                debug!(
                    "Breaker '{}' mounted in panel '{}' of load '{}'",
                    breaker_id, load_panel, load.name
                );
                breaker.panel = Some(load_panel);
                breaker.updated_at = Utc::now();
                topology.upsert_breaker(breaker);
                Ok(true)
            }
            (None, None) => Err(TopologyError::InvalidTopology(format!(
                "load '{}' uses breaker '{}' which is not mounted in any panel",
                load.name, breaker_id
            ))),
        }
    }

    /// Voltage a panel runs at: its own, else the nearest ancestor's, else the
    /// power source's at the root of its tree.
    pub fn resolve_panel_voltage(topology: &Topology, panel: &Panel) -> Option<Voltage> {
        let mut visited = HashSet::new();
        let mut current = Some(panel);

        while let Some(panel) = current {
            if let Some(voltage) = panel.voltage {
                return Some(voltage);
            }
            if !visited.insert(panel.id.clone()) {
                return None;
            }
            if let Some(source) = panel
                .power_source
                .as_ref()
                .and_then(|id| topology.power_source(id))
            {
                return Some(source.voltage);
            }
            current = panel
                .parent_panel
                .as_ref()
                .and_then(|id| topology.panel(id));
        }
        None
    }

    /// Fill an unset panel voltage from its source or parent
    pub fn inherit_panel_voltage(topology: &Topology, panel: &mut Panel) -> bool {
        if panel.voltage.is_some() {
            return false;
        }
        panel.voltage = Self::resolve_panel_voltage(topology, panel);
        panel.voltage.is_some()
    }

    /// Fill an unset load voltage from its panel
    pub fn inherit_load_voltage(topology: &Topology, load: &mut Load) -> bool {
        if load.voltage.is_some() {
            return false;
        }
        load.voltage = load
            .panel
            .as_ref()
            .and_then(|id| topology.panel(id))
            .and_then(|panel| Self::resolve_panel_voltage(topology, panel));
        load.voltage.is_some()
    }
}
