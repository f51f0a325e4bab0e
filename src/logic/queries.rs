use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::logic::cable::{daily_consumption_kwh, CableCalculator, CableReport};
use crate::logic::{BreakerGraph, BreakerLoadMode, BreakerRef, LoadAggregate, PanelTree, Synchronizer};
use crate::model::{
    BreakerRole, CircuitBreaker, Id, Load, LoadType, Panel, PowerSource, Topology, Voltage,
};

/// Knobs for derived figures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub calculator: CableCalculator,
    pub breaker_load_mode: BreakerLoadMode,
    pub tariff_per_kwh: Option<f64>,
    pub days_per_month: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            calculator: CableCalculator::default(),
            breaker_load_mode: BreakerLoadMode::default(),
            tariff_per_kwh: None,
            days_per_month: 30.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BreakerFilter {
    pub panel_id: Option<Id>,
    pub role: Option<BreakerRole>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadFilter {
    pub panel_id: Option<Id>,
    pub load_type: Option<LoadType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelPath {
    pub panel_id: Id,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelLoadSummary {
    pub panel_id: Id,
    #[serde(flatten)]
    pub aggregate: LoadAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerPath {
    pub breaker_id: Id,
    pub path: Vec<BreakerRef>,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerLoadSummary {
    pub breaker_id: Id,
    pub mode: BreakerLoadMode,
    pub total_current: f64,
    pub rated_current: f64,
}

/// Everything derived about one load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadDetails {
    pub load: Load,
    pub total_path: String,
    pub voltage: Option<Voltage>,
    pub cable: CableReport,
    pub daily_consumption_kwh: f64,
    pub monthly_consumption_kwh: f64,
    pub monthly_cost: Option<f64>,
}

/// Read-only views over a topology. Lists come back in a stable order.
pub struct TopologyQueries;

impl TopologyQueries {
    pub fn power_sources(topology: &Topology) -> Vec<PowerSource> {
        topology
            .power_sources()
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .cloned()
            .collect()
    }

    pub fn panels(topology: &Topology) -> Vec<Panel> {
        Self::sorted_panels(topology.panels())
    }

    pub fn panels_of_source(topology: &Topology, source_id: &Id) -> Result<Vec<Panel>> {
        topology.require_power_source(source_id)?;
        let ids = topology.panel_ids_of_source(source_id);
        Ok(Self::sorted_panels(ids.iter().filter_map(|id| topology.panel(id))))
    }

    pub fn child_panels(topology: &Topology, panel_id: &Id, include_indirect: bool) -> Result<Vec<Panel>> {
        let ids = PanelTree::descendants(topology, panel_id, include_indirect)?;
        Ok(ids.iter().filter_map(|id| topology.panel(id)).cloned().collect())
    }

    pub fn breakers(topology: &Topology, filter: &BreakerFilter) -> Vec<CircuitBreaker> {
        let candidates: Box<dyn Iterator<Item = &CircuitBreaker> + '_> = match &filter.panel_id {
            Some(panel_id) => Box::new(
                topology
                    .breaker_ids_of_panel(panel_id)
                    .into_iter()
                    .filter_map(move |id| topology.breaker(&id)),
            ),
            None => Box::new(topology.breakers()),
        };
        Self::sorted_breakers(
            candidates.filter(|breaker| filter.role.map_or(true, |role| breaker.breaker_role == role)),
        )
    }

    /// Breakers mounted in a panel, by position
    pub fn breakers_of_panel(topology: &Topology, panel_id: &Id) -> Result<Vec<CircuitBreaker>> {
        topology.require_panel(panel_id)?;
        Ok(Self::breakers(
            topology,
            &BreakerFilter {
                panel_id: Some(panel_id.clone()),
                role: None,
            },
        ))
    }

    pub fn breakers_by_role(topology: &Topology, role: BreakerRole) -> Vec<CircuitBreaker> {
        Self::breakers(
            topology,
            &BreakerFilter {
                panel_id: None,
                role: Some(role),
            },
        )
    }

    pub fn feeding_breakers(topology: &Topology, breaker_id: &Id) -> Result<Vec<CircuitBreaker>> {
        topology.require_breaker(breaker_id)?;
        let ids = topology.feeding_breaker_ids(breaker_id);
        Ok(Self::sorted_breakers(ids.iter().filter_map(|id| topology.breaker(id))))
    }

    pub fn fed_breakers(topology: &Topology, breaker_id: &Id) -> Result<Vec<CircuitBreaker>> {
        topology.require_breaker(breaker_id)?;
        let ids = topology.fed_breaker_ids(breaker_id);
        Ok(Self::sorted_breakers(ids.iter().filter_map(|id| topology.breaker(id))))
    }

    pub fn loads(topology: &Topology, filter: &LoadFilter) -> Vec<Load> {
        topology
            .loads()
            .filter(|load| {
                filter
                    .panel_id
                    .as_ref()
                    .map_or(true, |panel_id| load.panel.as_ref() == Some(panel_id))
            })
            .filter(|load| filter.load_type.map_or(true, |kind| load.load_type == kind))
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .cloned()
            .collect()
    }

    pub fn loads_of_panel(topology: &Topology, panel_id: &Id) -> Result<Vec<Load>> {
        topology.require_panel(panel_id)?;
        let ids = topology.load_ids_of_panel(panel_id);
        Ok(Self::sorted_loads(ids.iter().filter_map(|id| topology.load(id))))
    }

    pub fn loads_of_breaker(topology: &Topology, breaker_id: &Id) -> Result<Vec<Load>> {
        topology.require_breaker(breaker_id)?;
        let ids = topology.load_ids_of_breaker(breaker_id);
        Ok(Self::sorted_loads(ids.iter().filter_map(|id| topology.load(id))))
    }

    pub fn loads_by_type(topology: &Topology, load_type: LoadType) -> Vec<Load> {
        Self::loads(
            topology,
            &LoadFilter {
                panel_id: None,
                load_type: Some(load_type),
            },
        )
    }

    // Paths and aggregates

    pub fn panel_path(topology: &Topology, panel_id: &Id) -> Result<PanelPath> {
        Ok(PanelPath {
            panel_id: panel_id.clone(),
            path: PanelTree::full_path(topology, panel_id)?,
        })
    }

    pub fn panel_load(topology: &Topology, panel_id: &Id) -> Result<PanelLoadSummary> {
        Ok(PanelLoadSummary {
            panel_id: panel_id.clone(),
            aggregate: PanelTree::aggregate_loads(topology, panel_id)?,
        })
    }

    pub fn breaker_path(topology: &Topology, breaker_id: &Id) -> Result<BreakerPath> {
        let path = BreakerGraph::full_path(topology, breaker_id)?;
        Ok(BreakerPath {
            breaker_id: breaker_id.clone(),
            display: BreakerGraph::format_path(&path),
            path,
        })
    }

    pub fn breaker_load(
        topology: &Topology,
        breaker_id: &Id,
        settings: &EngineSettings,
    ) -> Result<BreakerLoadSummary> {
        let breaker = topology.require_breaker(breaker_id)?;
        Ok(BreakerLoadSummary {
            breaker_id: breaker_id.clone(),
            mode: settings.breaker_load_mode,
            total_current: BreakerGraph::aggregate_load(topology, breaker_id, settings.breaker_load_mode)?,
            rated_current: breaker.rated_current,
        })
    }

    /// "source → panel … → load", following the load's panel up the tree
    pub fn load_total_path(topology: &Topology, load: &Load) -> Result<String> {
        let mut path = match &load.panel {
            Some(panel_id) => PanelTree::full_path(topology, panel_id)?,
            None => Vec::new(),
        };
        path.push(load.name.clone());
        Ok(path.join(" → "))
    }

    // Electrical reports

    pub fn source_cable(topology: &Topology, source_id: &Id, settings: &EngineSettings) -> Result<CableReport> {
        let source = topology.require_power_source(source_id)?;
        settings
            .calculator
            .report(&source.cable, source.total_ampacity, Some(source.voltage))
    }

    pub fn panel_cable(topology: &Topology, panel_id: &Id, settings: &EngineSettings) -> Result<CableReport> {
        let panel = topology.require_panel(panel_id)?;
        let voltage = Synchronizer::resolve_panel_voltage(topology, panel);
        settings.calculator.report(&panel.cable, panel.ampacity, voltage)
    }

    pub fn load_details(topology: &Topology, load_id: &Id, settings: &EngineSettings) -> Result<LoadDetails> {
        let load = topology.require_load(load_id)?;
        let voltage = load.voltage.or_else(|| {
            load.panel
                .as_ref()
                .and_then(|id| topology.panel(id))
                .and_then(|panel| Synchronizer::resolve_panel_voltage(topology, panel))
        });

        let daily = daily_consumption_kwh(load.power_consumption, load.estimated_usage_hours);
        let monthly = daily * settings.days_per_month;

        Ok(LoadDetails {
            total_path: Self::load_total_path(topology, load)?,
            voltage,
            cable: settings.calculator.report(&load.cable, load.ampacity, voltage)?,
            daily_consumption_kwh: daily,
            monthly_consumption_kwh: monthly,
            monthly_cost: settings.tariff_per_kwh.map(|tariff| monthly * tariff),
            load: load.clone(),
        })
    }

    fn sorted_panels<'a>(panels: impl Iterator<Item = &'a Panel>) -> Vec<Panel> {
        panels
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .cloned()
            .collect()
    }

    fn sorted_breakers<'a>(breakers: impl Iterator<Item = &'a CircuitBreaker>) -> Vec<CircuitBreaker> {
        breakers
            .sorted_by(|a, b| {
                a.position
                    .cmp(&b.position)
                    .then_with(|| a.display_name().cmp(&b.display_name()))
            })
            .cloned()
            .collect()
    }

    fn sorted_loads<'a>(loads: impl Iterator<Item = &'a Load>) -> Vec<Load> {
        loads.sorted_by(|a, b| a.name.cmp(&b.name)).cloned().collect()
    }
}
