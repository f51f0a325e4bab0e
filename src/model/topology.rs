use crate::error::{Result, TopologyError};
use crate::model::{CircuitBreaker, EntityKind, Id, Load, Panel, PowerSource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Which record uses a breaker as its main breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MainBreakerOwner {
    Panel(Id),
    PowerSource(Id),
}

impl fmt::Display for MainBreakerOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MainBreakerOwner::Panel(id) => write!(f, "panel '{}'", id),
            MainBreakerOwner::PowerSource(id) => write!(f, "power source '{}'", id),
        }
    }
}

/// Reverse lookups derived from the records. Never serialized; rebuilt on load.
#[derive(Debug, Clone, Default)]
struct TopologyIndex {
    panels_by_source: HashMap<Id, BTreeSet<Id>>,
    children_by_panel: HashMap<Id, BTreeSet<Id>>,
    breakers_by_panel: HashMap<Id, BTreeSet<Id>>,
    loads_by_panel: HashMap<Id, BTreeSet<Id>>,
    loads_by_breaker: HashMap<Id, BTreeSet<Id>>,
    /// feeder id -> breakers it feeds
    fed_by_breaker: HashMap<Id, BTreeSet<Id>>,
}

fn link(map: &mut HashMap<Id, BTreeSet<Id>>, key: &Id, value: &Id) {
    map.entry(key.clone()).or_default().insert(value.clone());
}

fn unlink(map: &mut HashMap<Id, BTreeSet<Id>>, key: &Id, value: &Id) {
    if let Some(set) = map.get_mut(key) {
        set.remove(value);
        if set.is_empty() {
            map.remove(key);
        }
    }
}

fn members(map: &HashMap<Id, BTreeSet<Id>>, key: &Id) -> Vec<Id> {
    map.get(key)
        .map(|set| set.iter().cloned().collect())
        .unwrap_or_default()
}

impl TopologyIndex {
    fn add_panel(&mut self, panel: &Panel) {
        if let Some(source) = &panel.power_source {
            link(&mut self.panels_by_source, source, &panel.id);
        }
        if let Some(parent) = &panel.parent_panel {
            link(&mut self.children_by_panel, parent, &panel.id);
        }
    }

    fn remove_panel(&mut self, panel: &Panel) {
        if let Some(source) = &panel.power_source {
            unlink(&mut self.panels_by_source, source, &panel.id);
        }
        if let Some(parent) = &panel.parent_panel {
            unlink(&mut self.children_by_panel, parent, &panel.id);
        }
    }

    fn add_breaker(&mut self, breaker: &CircuitBreaker) {
        if let Some(panel) = &breaker.panel {
            link(&mut self.breakers_by_panel, panel, &breaker.id);
        }
        for feeder in &breaker.feeding_breakers {
            link(&mut self.fed_by_breaker, feeder, &breaker.id);
        }
    }

    fn remove_breaker(&mut self, breaker: &CircuitBreaker) {
        if let Some(panel) = &breaker.panel {
            unlink(&mut self.breakers_by_panel, panel, &breaker.id);
        }
        for feeder in &breaker.feeding_breakers {
            unlink(&mut self.fed_by_breaker, feeder, &breaker.id);
        }
    }

    fn add_load(&mut self, load: &Load) {
        if let Some(panel) = &load.panel {
            link(&mut self.loads_by_panel, panel, &load.id);
        }
        if let Some(breaker) = &load.breaker {
            link(&mut self.loads_by_breaker, breaker, &load.id);
        }
    }

    fn remove_load(&mut self, load: &Load) {
        if let Some(panel) = &load.panel {
            unlink(&mut self.loads_by_panel, panel, &load.id);
        }
        if let Some(breaker) = &load.breaker {
            unlink(&mut self.loads_by_breaker, breaker, &load.id);
        }
    }
}

/// Serialized shape of a topology: the records only
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopologyRecords {
    power_sources: HashMap<Id, PowerSource>,
    panels: HashMap<Id, Panel>,
    breakers: HashMap<Id, CircuitBreaker>,
    loads: HashMap<Id, Load>,
}

/// In-memory topology: all records keyed by id plus derived adjacency indexes.
///
/// Records are only written through the `upsert_*` / `remove_*` methods so the
/// indexes always match the records. These methods do not validate anything;
/// validation lives in `logic`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "TopologyRecords")]
pub struct Topology {
    power_sources: HashMap<Id, PowerSource>,
    panels: HashMap<Id, Panel>,
    breakers: HashMap<Id, CircuitBreaker>,
    loads: HashMap<Id, Load>,
    #[serde(skip)]
    index: TopologyIndex,
}

impl From<TopologyRecords> for Topology {
    fn from(records: TopologyRecords) -> Self {
        let mut topology = Topology {
            power_sources: records.power_sources,
            panels: records.panels,
            breakers: records.breakers,
            loads: records.loads,
            index: TopologyIndex::default(),
        };
        topology.rebuild_index();
        topology
    }
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn rebuild_index(&mut self) {
        let mut index = TopologyIndex::default();
        for panel in self.panels.values() {
            index.add_panel(panel);
        }
        for breaker in self.breakers.values() {
            index.add_breaker(breaker);
        }
        for load in self.loads.values() {
            index.add_load(load);
        }
        self.index = index;
    }

    // Lookups

    pub fn power_source(&self, id: &Id) -> Option<&PowerSource> {
        self.power_sources.get(id)
    }

    pub fn panel(&self, id: &Id) -> Option<&Panel> {
        self.panels.get(id)
    }

    pub fn breaker(&self, id: &Id) -> Option<&CircuitBreaker> {
        self.breakers.get(id)
    }

    pub fn load(&self, id: &Id) -> Option<&Load> {
        self.loads.get(id)
    }

    pub fn require_power_source(&self, id: &Id) -> Result<&PowerSource> {
        self.power_sources
            .get(id)
            .ok_or_else(|| TopologyError::not_found(EntityKind::PowerSource, id))
    }

    pub fn require_panel(&self, id: &Id) -> Result<&Panel> {
        self.panels
            .get(id)
            .ok_or_else(|| TopologyError::not_found(EntityKind::Panel, id))
    }

    pub fn require_breaker(&self, id: &Id) -> Result<&CircuitBreaker> {
        self.breakers
            .get(id)
            .ok_or_else(|| TopologyError::not_found(EntityKind::Breaker, id))
    }

    pub fn require_load(&self, id: &Id) -> Result<&Load> {
        self.loads
            .get(id)
            .ok_or_else(|| TopologyError::not_found(EntityKind::Load, id))
    }

    pub fn power_sources(&self) -> impl Iterator<Item = &PowerSource> {
        self.power_sources.values()
    }

    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.panels.values()
    }

    pub fn breakers(&self) -> impl Iterator<Item = &CircuitBreaker> {
        self.breakers.values()
    }

    pub fn loads(&self) -> impl Iterator<Item = &Load> {
        self.loads.values()
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn breaker_count(&self) -> usize {
        self.breakers.len()
    }

    // Adjacency

    pub fn panel_ids_of_source(&self, source_id: &Id) -> Vec<Id> {
        members(&self.index.panels_by_source, source_id)
    }

    pub fn child_panel_ids(&self, panel_id: &Id) -> Vec<Id> {
        members(&self.index.children_by_panel, panel_id)
    }

    pub fn has_child_panels(&self, panel_id: &Id) -> bool {
        self.index.children_by_panel.contains_key(panel_id)
    }

    pub fn breaker_ids_of_panel(&self, panel_id: &Id) -> Vec<Id> {
        members(&self.index.breakers_by_panel, panel_id)
    }

    pub fn load_ids_of_panel(&self, panel_id: &Id) -> Vec<Id> {
        members(&self.index.loads_by_panel, panel_id)
    }

    pub fn load_ids_of_breaker(&self, breaker_id: &Id) -> Vec<Id> {
        members(&self.index.loads_by_breaker, breaker_id)
    }

    /// Breakers directly fed by `breaker_id`
    pub fn fed_breaker_ids(&self, breaker_id: &Id) -> Vec<Id> {
        members(&self.index.fed_by_breaker, breaker_id)
    }

    /// Breakers directly feeding `breaker_id`
    pub fn feeding_breaker_ids(&self, breaker_id: &Id) -> Vec<Id> {
        self.breakers
            .get(breaker_id)
            .map(|breaker| breaker.feeding_breakers.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn main_breaker_owner(&self, breaker_id: &Id) -> Option<MainBreakerOwner> {
        if let Some(panel) = self
            .panels
            .values()
            .find(|panel| panel.main_breaker.as_ref() == Some(breaker_id))
        {
            return Some(MainBreakerOwner::Panel(panel.id.clone()));
        }
        self.power_sources
            .values()
            .find(|source| source.main_breaker.as_ref() == Some(breaker_id))
            .map(|source| MainBreakerOwner::PowerSource(source.id.clone()))
    }

    /// Panel whose feeder breaker is `breaker_id`
    pub fn panel_fed_by(&self, breaker_id: &Id) -> Option<&Panel> {
        self.panels
            .values()
            .find(|panel| panel.feeder_breaker.as_ref() == Some(breaker_id))
    }

    // Writes

    pub fn upsert_power_source(&mut self, source: PowerSource) {
        self.power_sources.insert(source.id.clone(), source);
    }

    pub fn upsert_panel(&mut self, panel: Panel) {
        if let Some(previous) = self.panels.get(&panel.id) {
            self.index.remove_panel(previous);
        }
        self.index.add_panel(&panel);
        self.panels.insert(panel.id.clone(), panel);
    }

    pub fn upsert_breaker(&mut self, breaker: CircuitBreaker) {
        if let Some(previous) = self.breakers.get(&breaker.id) {
            self.index.remove_breaker(previous);
        }
        self.index.add_breaker(&breaker);
        self.breakers.insert(breaker.id.clone(), breaker);
    }

    pub fn upsert_load(&mut self, load: Load) {
        if let Some(previous) = self.loads.get(&load.id) {
            self.index.remove_load(previous);
        }
        self.index.add_load(&load);
        self.loads.insert(load.id.clone(), load);
    }

    pub fn remove_power_source(&mut self, id: &Id) -> Option<PowerSource> {
        self.power_sources.remove(id)
    }

    pub fn remove_panel(&mut self, id: &Id) -> Option<Panel> {
        let panel = self.panels.remove(id)?;
        self.index.remove_panel(&panel);
        Some(panel)
    }

    pub fn remove_breaker(&mut self, id: &Id) -> Option<CircuitBreaker> {
        let breaker = self.breakers.remove(id)?;
        self.index.remove_breaker(&breaker);
        Some(breaker)
    }

    pub fn remove_load(&mut self, id: &Id) -> Option<Load> {
        let load = self.loads.remove(id)?;
        self.index.remove_load(&load);
        Some(load)
    }
}
