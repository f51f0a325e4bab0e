use chrono::Utc;
use log::info;
use std::collections::BTreeSet;

use crate::error::{Result, TopologyError};
use crate::logic::{BreakerGraph, PanelTree, Synchronizer};
use crate::model::{
    BreakerRole, CircuitBreaker, EntityKind, Id, Load, MainBreakerOwner, NewCircuitBreaker,
    NewLoad, NewPanel, NewPowerSource, Panel, PanelType, PowerSource, Topology,
};

/// Validated mutations of a topology.
///
/// Every operation validates against the current state before it writes, and
/// writes through the topology so the indexes stay in step. Callers run them
/// inside a store unit of work: on `Err` the draft is dropped, so partial writes
/// made before the failing check never become visible.
pub struct TopologyOperations;

fn ensure_name_free<'a>(
    existing: impl Iterator<Item = (&'a Id, &'a String)>,
    kind: EntityKind,
    name: &str,
    except: Option<&Id>,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TopologyError::Validation(format!("{} name must not be empty", kind)));
    }
    for (id, existing_name) in existing {
        if existing_name == name && Some(id) != except {
            return Err(TopologyError::Conflict(format!(
                "a {} named '{}' already exists",
                kind, name
            )));
        }
    }
    Ok(())
}

fn ensure_id_free(taken: bool, kind: EntityKind, id: &Id) -> Result<()> {
    if taken {
        return Err(TopologyError::Conflict(format!("{} '{}' already exists", kind, id)));
    }
    Ok(())
}

fn ensure_non_negative(value: f64, what: &str) -> Result<()> {
    if value < 0.0 || !value.is_finite() {
        return Err(TopologyError::Validation(format!(
            "{} must be non-negative, got {}",
            what, value
        )));
    }
    Ok(())
}

impl TopologyOperations {
    // Power sources

    pub fn create_power_source(topology: &mut Topology, input: NewPowerSource) -> Result<PowerSource> {
        Self::validate_source_input(&input)?;
        if let Some(id) = &input.id {
            ensure_id_free(topology.power_source(id).is_some(), EntityKind::PowerSource, id)?;
        }
        ensure_name_free(
            topology.power_sources().map(|s| (&s.id, &s.name)),
            EntityKind::PowerSource,
            &input.name,
            None,
        )?;

        let main_breaker = input.main_breaker.clone();
        let source = input.into_source();
        let id = source.id.clone();
        info!("Creating power source '{}' ({})", source.name, id);
        topology.upsert_power_source(source);

        if let Some(breaker_id) = main_breaker {
            Self::set_source_main_breaker(topology, &id, &breaker_id)?;
        }
        Ok(topology.require_power_source(&id)?.clone())
    }

    pub fn update_power_source(
        topology: &mut Topology,
        id: &Id,
        input: NewPowerSource,
    ) -> Result<PowerSource> {
        Self::validate_source_input(&input)?;
        let mut source = topology.require_power_source(id)?.clone();
        ensure_name_free(
            topology.power_sources().map(|s| (&s.id, &s.name)),
            EntityKind::PowerSource,
            &input.name,
            Some(id),
        )?;

        source.name = input.name;
        source.source_type = input.source_type;
        source.voltage = input.voltage;
        source.total_ampacity = input.total_ampacity;
        source.cable = input.cable;
        source.updated_at = Utc::now();

        let previous_main = source.main_breaker.clone();
        if input.main_breaker.is_none() {
            if let Some(old_id) = source.main_breaker.take() {
                Self::demote(topology, &old_id);
            }
        }
        info!("Updating power source '{}' ({})", source.name, id);
        topology.upsert_power_source(source);

        if let Some(breaker_id) = input.main_breaker {
            if previous_main.as_ref() != Some(&breaker_id) {
                Self::set_source_main_breaker(topology, id, &breaker_id)?;
            }
        }
        Ok(topology.require_power_source(id)?.clone())
    }

    /// Delete a power source and every panel tree it feeds
    pub fn delete_power_source(topology: &mut Topology, id: &Id) -> Result<()> {
        let source = topology.require_power_source(id)?;
        info!("Deleting power source '{}' ({})", source.name, id);

        for panel_id in topology.panel_ids_of_source(id) {
            Self::delete_panel(topology, &panel_id)?;
        }
        topology.remove_power_source(id);
        Ok(())
    }

    pub fn set_source_main_breaker(
        topology: &mut Topology,
        source_id: &Id,
        breaker_id: &Id,
    ) -> Result<PowerSource> {
        let mut source = topology.require_power_source(source_id)?.clone();
        topology.require_breaker(breaker_id)?;
        let owner = MainBreakerOwner::PowerSource(source_id.clone());

        if source.main_breaker.as_ref() != Some(breaker_id) {
            if let Some(current) = topology.main_breaker_owner(breaker_id) {
                return Err(TopologyError::Conflict(format!(
                    "breaker '{}' is already the main breaker of {}",
                    breaker_id, current
                )));
            }
            if let Some(previous_id) = source.main_breaker.take() {
                Self::demote(topology, &previous_id);
            }
            source.main_breaker = Some(breaker_id.clone());
            source.updated_at = Utc::now();
            topology.upsert_power_source(source);
            info!("Breaker '{}' is now main breaker of {}", breaker_id, owner);
        }

        Synchronizer::main_breaker(topology, &owner, breaker_id)?;
        Ok(topology.require_power_source(source_id)?.clone())
    }

    // Panels

    pub fn create_panel(topology: &mut Topology, input: NewPanel) -> Result<Panel> {
        Self::validate_panel_input(&input)?;
        if let Some(id) = &input.id {
            ensure_id_free(topology.panel(id).is_some(), EntityKind::Panel, id)?;
        }
        ensure_name_free(
            topology.panels().map(|p| (&p.id, &p.name)),
            EntityKind::Panel,
            &input.name,
            None,
        )?;
        if let Some(source_id) = &input.power_source {
            topology.require_power_source(source_id)?;
        }

        let main_breaker = input.main_breaker.clone();
        let feeder_breaker = input.feeder_breaker.clone();
        let mut panel = input.into_panel();

        if let Some(parent_id) = &panel.parent_panel {
            PanelTree::validate_parent(topology, &panel.id, parent_id)?;
            PanelTree::validate_can_adopt(topology, parent_id)?;
        }
        PanelTree::validate_type_consistency(topology, &panel)?;
        Synchronizer::inherit_panel_voltage(topology, &mut panel);

        let id = panel.id.clone();
        info!("Creating {:?} panel '{}' ({})", panel.panel_type, panel.name, id);
        topology.upsert_panel(panel);

        if let Some(breaker_id) = main_breaker {
            Self::set_panel_main_breaker(topology, &id, &breaker_id)?;
        }
        if let Some(breaker_id) = feeder_breaker {
            Self::set_feeder_breaker(topology, &id, &breaker_id)?;
        }
        Ok(topology.require_panel(&id)?.clone())
    }

    /// Replace a panel's attributes and linkage. An omitted type keeps the
    /// current one; a moved panel loses a feeder breaker that sat in the old
    /// parent.
    pub fn update_panel(topology: &mut Topology, id: &Id, input: NewPanel) -> Result<Panel> {
        Self::validate_panel_input(&input)?;
        let existing = topology.require_panel(id)?.clone();
        ensure_name_free(
            topology.panels().map(|p| (&p.id, &p.name)),
            EntityKind::Panel,
            &input.name,
            Some(id),
        )?;
        if let Some(source_id) = &input.power_source {
            topology.require_power_source(source_id)?;
        }

        let mut draft = existing.clone();
        draft.name = input.name;
        draft.panel_type = input.panel_type.unwrap_or(existing.panel_type);
        draft.power_source = input.power_source;
        draft.parent_panel = input.parent_panel;
        draft.voltage = input.voltage;
        draft.ampacity = input.ampacity;
        draft.cable = input.cable;
        draft.updated_at = Utc::now();

        if draft.parent_panel != existing.parent_panel {
            if let Some(parent_id) = &draft.parent_panel {
                PanelTree::validate_parent(topology, id, parent_id)?;
                PanelTree::validate_can_adopt(topology, parent_id)?;
            }
        }
        PanelTree::validate_type_consistency(topology, &draft)?;
        Synchronizer::inherit_panel_voltage(topology, &mut draft);

        if draft.parent_panel != existing.parent_panel {
            Self::release_feeder(topology, &mut draft);
        }
        if input.main_breaker.is_none() && draft.main_breaker.is_some() {
            Self::release_feeder_registration(topology, &draft);
            if let Some(old_id) = draft.main_breaker.take() {
                Self::demote(topology, &old_id);
            }
        }
        if input.feeder_breaker.is_none() {
            Self::release_feeder(topology, &mut draft);
        }

        let current_main = draft.main_breaker.clone();
        let current_feeder = draft.feeder_breaker.clone();
        info!("Updating panel '{}' ({})", draft.name, id);
        topology.upsert_panel(draft);

        if let Some(breaker_id) = input.main_breaker {
            if current_main.as_ref() != Some(&breaker_id) {
                Self::set_panel_main_breaker(topology, id, &breaker_id)?;
            }
        }
        if let Some(breaker_id) = input.feeder_breaker {
            if current_feeder.as_ref() != Some(&breaker_id) {
                Self::set_feeder_breaker(topology, id, &breaker_id)?;
            }
        }
        Ok(topology.require_panel(id)?.clone())
    }

    /// Delete a panel together with its sub-panels, breakers and loads
    pub fn delete_panel(topology: &mut Topology, id: &Id) -> Result<()> {
        let panel = topology.require_panel(id)?;
        info!("Deleting panel '{}' ({}) and everything below it", panel.name, id);

        let mut doomed = vec![id.clone()];
        doomed.extend(PanelTree::descendants(topology, id, true)?);

        for panel_id in doomed.iter().rev() {
            for load_id in topology.load_ids_of_panel(panel_id) {
                topology.remove_load(&load_id);
            }
            for breaker_id in topology.breaker_ids_of_panel(panel_id) {
                Self::delete_breaker(topology, &breaker_id)?;
            }
            topology.remove_panel(panel_id);
        }
        Ok(())
    }

    pub fn set_panel_parent(topology: &mut Topology, panel_id: &Id, parent_id: &Id) -> Result<Panel> {
        let panel = topology.require_panel(panel_id)?.clone();
        if panel.parent_panel.as_ref() == Some(parent_id) {
            return Ok(panel);
        }

        PanelTree::validate_parent(topology, panel_id, parent_id)?;
        PanelTree::validate_can_adopt(topology, parent_id)?;

        let mut draft = panel;
        draft.parent_panel = Some(parent_id.clone());
        draft.updated_at = Utc::now();
        PanelTree::validate_type_consistency(topology, &draft)?;
        Self::release_feeder(topology, &mut draft);

        info!("Moving panel '{}' under '{}'", draft.name, parent_id);
        topology.upsert_panel(draft);
        Ok(topology.require_panel(panel_id)?.clone())
    }

    pub fn set_panel_type(topology: &mut Topology, panel_id: &Id, panel_type: PanelType) -> Result<Panel> {
        let mut draft = topology.require_panel(panel_id)?.clone();
        if draft.panel_type == panel_type {
            return Ok(draft);
        }
        draft.panel_type = panel_type;
        draft.updated_at = Utc::now();
        PanelTree::validate_type_consistency(topology, &draft)?;

        info!("Panel '{}' is now {:?}", draft.name, panel_type);
        topology.upsert_panel(draft.clone());
        Ok(draft)
    }

    /// Make `breaker_id` the panel's main breaker. A replaced main breaker is
    /// demoted to `distribution`.
    pub fn set_panel_main_breaker(topology: &mut Topology, panel_id: &Id, breaker_id: &Id) -> Result<Panel> {
        let mut panel = topology.require_panel(panel_id)?.clone();
        let breaker = topology.require_breaker(breaker_id)?;
        let owner = MainBreakerOwner::Panel(panel_id.clone());

        if panel.main_breaker.as_ref() != Some(breaker_id) {
            if let Some(current) = topology.main_breaker_owner(breaker_id) {
                return Err(TopologyError::Conflict(format!(
                    "breaker '{}' is already the main breaker of {}",
                    breaker_id, current
                )));
            }
            if let Some(mounted) = &breaker.panel {
                if mounted != panel_id {
                    return Err(TopologyError::InvalidTopology(format!(
                        "breaker '{}' is mounted in panel '{}', not '{}'",
                        breaker_id, mounted, panel.name
                    )));
                }
            }
            if panel.feeder_breaker.as_ref() == Some(breaker_id) {
                return Err(TopologyError::InvalidTopology(format!(
                    "breaker '{}' feeds panel '{}' and cannot also be its main breaker",
                    breaker_id, panel.name
                )));
            }
            let stray_main = topology
                .breaker_ids_of_panel(panel_id)
                .into_iter()
                .filter(|id| id != breaker_id && Some(id) != panel.main_breaker.as_ref())
                .find(|id| topology.breaker(id).is_some_and(|b| b.is_main()));
            if let Some(other) = stray_main {
                return Err(TopologyError::Conflict(format!(
                    "panel '{}' already holds main breaker '{}'",
                    panel.name, other
                )));
            }

            Self::release_feeder_registration(topology, &panel);
            if let Some(previous_id) = panel.main_breaker.take() {
                Self::demote(topology, &previous_id);
            }
            panel.main_breaker = Some(breaker_id.clone());
            panel.updated_at = Utc::now();
            topology.upsert_panel(panel);
            info!("Breaker '{}' is now main breaker of {}", breaker_id, owner);
        }

        Synchronizer::main_breaker(topology, &owner, breaker_id)?;
        Synchronizer::feeder_breaker(topology, panel_id)?;
        Ok(topology.require_panel(panel_id)?.clone())
    }

    /// Feed a sub panel from a breaker of its parent panel
    pub fn set_feeder_breaker(topology: &mut Topology, panel_id: &Id, breaker_id: &Id) -> Result<Panel> {
        let mut panel = topology.require_panel(panel_id)?.clone();
        let breaker = topology.require_breaker(breaker_id)?;

        if panel.feeder_breaker.as_ref() != Some(breaker_id) {
            let Some(parent_id) = panel.parent_panel.clone() else {
                return Err(TopologyError::InvalidTopology(format!(
                    "panel '{}' has no parent panel to be fed from",
                    panel.name
                )));
            };
            if panel.main_breaker.as_ref() == Some(breaker_id) {
                return Err(TopologyError::InvalidTopology(format!(
                    "main breaker '{}' cannot feed its own panel '{}'",
                    breaker_id, panel.name
                )));
            }
            if let Some(mounted) = &breaker.panel {
                if *mounted != parent_id {
                    return Err(TopologyError::InvalidTopology(format!(
                        "feeder breaker '{}' must belong to parent panel '{}', found in '{}'",
                        breaker_id, parent_id, mounted
                    )));
                }
            }
            if let Some(other) = topology.panel_fed_by(breaker_id) {
                return Err(TopologyError::Conflict(format!(
                    "breaker '{}' already feeds panel '{}'",
                    breaker_id, other.name
                )));
            }

            Self::release_feeder(topology, &mut panel);
            panel.feeder_breaker = Some(breaker_id.clone());
            panel.updated_at = Utc::now();
            info!("Breaker '{}' now feeds panel '{}'", breaker_id, panel.name);
            topology.upsert_panel(panel);
        }

        Synchronizer::feeder_breaker(topology, panel_id)?;
        Ok(topology.require_panel(panel_id)?.clone())
    }

    /// Create a main panel under a power source
    pub fn add_panel_to_source(topology: &mut Topology, source_id: &Id, mut input: NewPanel) -> Result<Panel> {
        topology.require_power_source(source_id)?;
        input.power_source = Some(source_id.clone());
        input.parent_panel = None;
        input.feeder_breaker = None;
        input.panel_type = Some(PanelType::Main);
        Self::create_panel(topology, input)
    }

    /// Create a child panel; the type defaults to `sub`
    pub fn add_child_panel(topology: &mut Topology, parent_id: &Id, mut input: NewPanel) -> Result<Panel> {
        PanelTree::validate_can_adopt(topology, parent_id)?;
        input.parent_panel = Some(parent_id.clone());
        input.power_source = None;
        if input.panel_type.is_none() {
            input.panel_type = Some(PanelType::Sub);
        }
        Self::create_panel(topology, input)
    }

    // Breakers

    /// Create a breaker; with a panel set this is `add_breaker_to_panel`
    pub fn create_breaker(topology: &mut Topology, input: NewCircuitBreaker) -> Result<CircuitBreaker> {
        if let Some(panel_id) = input.panel.clone() {
            return Self::add_breaker_to_panel(topology, &panel_id, input);
        }
        Self::insert_breaker(topology, input, None)
    }

    /// Mount a new breaker in a panel. The role defaults to `distribution`; a
    /// `main` breaker becomes the panel's main breaker when it has none.
    pub fn add_breaker_to_panel(
        topology: &mut Topology,
        panel_id: &Id,
        mut input: NewCircuitBreaker,
    ) -> Result<CircuitBreaker> {
        let panel = topology.require_panel(panel_id)?;
        let role = *input.breaker_role.get_or_insert(BreakerRole::Distribution);
        let panel_has_main = panel.main_breaker.is_some();

        if role == BreakerRole::Main {
            if let Some(existing) = topology
                .breaker_ids_of_panel(panel_id)
                .into_iter()
                .find(|id| topology.breaker(id).is_some_and(|b| b.is_main()))
            {
                return Err(TopologyError::Conflict(format!(
                    "panel '{}' already holds main breaker '{}'",
                    panel_id, existing
                )));
            }
        }

        let breaker = Self::insert_breaker(topology, input, Some(panel_id))?;
        if role == BreakerRole::Main && !panel_has_main {
            Self::set_panel_main_breaker(topology, panel_id, &breaker.id)?;
        }
        Ok(topology.require_breaker(&breaker.id)?.clone())
    }

    fn insert_breaker(
        topology: &mut Topology,
        input: NewCircuitBreaker,
        panel_id: Option<&Id>,
    ) -> Result<CircuitBreaker> {
        input.validate().map_err(TopologyError::Validation)?;
        if let Some(id) = &input.id {
            ensure_id_free(topology.breaker(id).is_some(), EntityKind::Breaker, id)?;
        }

        let feeders = input.feeding_breakers.clone();
        let mut breaker = input.into_breaker();
        BreakerGraph::validate_feed(topology, &breaker.id, &feeders)?;
        breaker.feeding_breakers = feeders;
        breaker.panel = panel_id.cloned();

        info!("Creating breaker '{}' ({})", breaker.display_name(), breaker.id);
        topology.upsert_breaker(breaker.clone());
        Ok(breaker)
    }

    /// Replace a breaker's attributes and mounting panel. The feeding set is
    /// left alone; it changes through `set_feeding_breakers`.
    pub fn update_breaker(
        topology: &mut Topology,
        id: &Id,
        input: NewCircuitBreaker,
    ) -> Result<CircuitBreaker> {
        input.validate().map_err(TopologyError::Validation)?;
        let mut breaker = topology.require_breaker(id)?.clone();
        let owner = topology.main_breaker_owner(id);
        input.apply_scalars(&mut breaker);

        if input.panel != breaker.panel {
            Self::validate_remount(topology, &breaker, owner.as_ref(), input.panel.as_ref())?;
            breaker.panel = input.panel.clone();
        }
        if breaker.is_main() {
            if let Some(panel_id) = &breaker.panel {
                let other_main = topology
                    .breaker_ids_of_panel(panel_id)
                    .into_iter()
                    .filter(|other| other != id)
                    .find(|other| topology.breaker(other).is_some_and(|b| b.is_main()));
                if let Some(other) = other_main {
                    return Err(TopologyError::Conflict(format!(
                        "panel '{}' already holds main breaker '{}'",
                        panel_id, other
                    )));
                }
            }
        }

        info!("Updating breaker '{}' ({})", breaker.display_name(), id);
        topology.upsert_breaker(breaker);

        if let Some(owner) = &owner {
            Synchronizer::main_breaker(topology, owner, id)?;
        }
        for load_id in topology.load_ids_of_breaker(id) {
            let mut load = topology.require_load(&load_id)?.clone();
            if Synchronizer::load_breaker(topology, &mut load)? {
                load.updated_at = Utc::now();
                topology.upsert_load(load);
            }
        }
        Ok(topology.require_breaker(id)?.clone())
    }

    fn validate_remount(
        topology: &Topology,
        breaker: &CircuitBreaker,
        owner: Option<&MainBreakerOwner>,
        target: Option<&Id>,
    ) -> Result<()> {
        if let Some(panel_id) = target {
            topology.require_panel(panel_id)?;
        }
        if let Some(MainBreakerOwner::Panel(owner_panel)) = owner {
            if target != Some(owner_panel) {
                return Err(TopologyError::InvalidTopology(format!(
                    "breaker '{}' is the main breaker of panel '{}' and must stay in it",
                    breaker.id, owner_panel
                )));
            }
        }
        if let Some(fed) = topology.panel_fed_by(&breaker.id) {
            if target != fed.parent_panel.as_ref() {
                return Err(TopologyError::InvalidTopology(format!(
                    "breaker '{}' feeds panel '{}' and must stay in its parent panel",
                    breaker.id, fed.name
                )));
            }
        }
        if target.is_none() && !topology.load_ids_of_breaker(&breaker.id).is_empty() {
            return Err(TopologyError::InvalidTopology(format!(
                "breaker '{}' still protects loads and cannot be unmounted",
                breaker.id
            )));
        }
        Ok(())
    }

    /// Delete a breaker and clear every reference to it
    pub fn delete_breaker(topology: &mut Topology, id: &Id) -> Result<()> {
        let breaker = topology.require_breaker(id)?;
        info!("Deleting breaker '{}' ({})", breaker.display_name(), id);
        let now = Utc::now();

        let panels: Vec<Panel> = topology
            .panels()
            .filter(|p| p.main_breaker.as_ref() == Some(id) || p.feeder_breaker.as_ref() == Some(id))
            .cloned()
            .collect();
        for mut panel in panels {
            if panel.main_breaker.as_ref() == Some(id) {
                panel.main_breaker = None;
            }
            if panel.feeder_breaker.as_ref() == Some(id) {
                panel.feeder_breaker = None;
            }
            panel.updated_at = now;
            topology.upsert_panel(panel);
        }

        let sources: Vec<PowerSource> = topology
            .power_sources()
            .filter(|s| s.main_breaker.as_ref() == Some(id))
            .cloned()
            .collect();
        for mut source in sources {
            source.main_breaker = None;
            source.updated_at = now;
            topology.upsert_power_source(source);
        }

        for load_id in topology.load_ids_of_breaker(id) {
            let mut load = topology.require_load(&load_id)?.clone();
            load.breaker = None;
            load.updated_at = now;
            topology.upsert_load(load);
        }

        for fed_id in topology.fed_breaker_ids(id) {
            let mut fed = topology.require_breaker(&fed_id)?.clone();
            fed.feeding_breakers.remove(id);
            fed.updated_at = now;
            topology.upsert_breaker(fed);
        }

        topology.remove_breaker(id);
        Ok(())
    }

    /// Replace the set of breakers feeding `breaker_id`
    pub fn set_feeding_breakers(
        topology: &mut Topology,
        breaker_id: &Id,
        feeders: BTreeSet<Id>,
    ) -> Result<CircuitBreaker> {
        let mut breaker = topology.require_breaker(breaker_id)?.clone();
        BreakerGraph::validate_feed(topology, breaker_id, &feeders)?;

        info!(
            "Breaker '{}' is now fed by {} breaker(s)",
            breaker.display_name(),
            feeders.len()
        );
        breaker.feeding_breakers = feeders;
        breaker.updated_at = Utc::now();
        topology.upsert_breaker(breaker.clone());
        Ok(breaker)
    }

    // Loads

    pub fn create_load(topology: &mut Topology, input: NewLoad) -> Result<Load> {
        input.validate().map_err(TopologyError::Validation)?;
        if let Some(id) = &input.id {
            ensure_id_free(topology.load(id).is_some(), EntityKind::Load, id)?;
        }
        ensure_name_free(
            topology.loads().map(|l| (&l.id, &l.name)),
            EntityKind::Load,
            &input.name,
            None,
        )?;
        if let Some(panel_id) = &input.panel {
            topology.require_panel(panel_id)?;
        }

        let mut load = input.into_load();
        Synchronizer::load_breaker(topology, &mut load)?;
        Synchronizer::inherit_load_voltage(topology, &mut load);

        info!("Creating load '{}' ({})", load.name, load.id);
        topology.upsert_load(load.clone());
        Ok(load)
    }

    /// Create a load protected by `breaker_id`. The load sits in the given panel
    /// or, when none is given, in the breaker's panel.
    pub fn add_load_to_breaker(topology: &mut Topology, breaker_id: &Id, mut input: NewLoad) -> Result<Load> {
        let breaker_panel = topology.require_breaker(breaker_id)?.panel.clone();
        input.breaker = Some(breaker_id.clone());
        if input.panel.is_none() {
            input.panel = breaker_panel;
        }
        if input.panel.is_none() {
            return Err(TopologyError::InvalidTopology(format!(
                "breaker '{}' is not mounted in a panel; give the load a panel",
                breaker_id
            )));
        }
        Self::create_load(topology, input)
    }

    pub fn update_load(topology: &mut Topology, id: &Id, input: NewLoad) -> Result<Load> {
        input.validate().map_err(TopologyError::Validation)?;
        let mut load = topology.require_load(id)?.clone();
        ensure_name_free(
            topology.loads().map(|l| (&l.id, &l.name)),
            EntityKind::Load,
            &input.name,
            Some(id),
        )?;
        if let Some(panel_id) = &input.panel {
            topology.require_panel(panel_id)?;
        }

        load.name = input.name;
        load.load_type = input.load_type;
        load.panel = input.panel;
        load.breaker = input.breaker;
        load.voltage = input.voltage;
        load.ampacity = input.ampacity;
        load.cable = input.cable;
        load.power_consumption = input.power_consumption;
        load.estimated_usage_hours = input.estimated_usage_hours;
        load.power_factor = input.power_factor;
        load.updated_at = Utc::now();

        Synchronizer::load_breaker(topology, &mut load)?;
        Synchronizer::inherit_load_voltage(topology, &mut load);

        info!("Updating load '{}' ({})", load.name, id);
        topology.upsert_load(load.clone());
        Ok(load)
    }

    pub fn delete_load(topology: &mut Topology, id: &Id) -> Result<()> {
        let load = topology.require_load(id)?;
        info!("Deleting load '{}' ({})", load.name, id);
        topology.remove_load(id);
        Ok(())
    }

    // Helpers

    fn validate_source_input(input: &NewPowerSource) -> Result<()> {
        ensure_non_negative(input.total_ampacity, "total ampacity")?;
        input.cable.validate().map_err(TopologyError::Validation)
    }

    fn validate_panel_input(input: &NewPanel) -> Result<()> {
        ensure_non_negative(input.ampacity, "panel ampacity")?;
        input.cable.validate().map_err(TopologyError::Validation)
    }

    /// Set a replaced main breaker back to `distribution`
    fn demote(topology: &mut Topology, breaker_id: &Id) {
        if let Some(mut previous) = topology.breaker(breaker_id).cloned() {
            info!("Demoting former main breaker '{}'", breaker_id);
            previous.breaker_role = BreakerRole::Distribution;
            previous.updated_at = Utc::now();
            topology.upsert_breaker(previous);
        }
    }

    /// Drop the panel's feeder breaker and its registration on the main breaker
    fn release_feeder(topology: &mut Topology, panel: &mut Panel) {
        Self::release_feeder_registration(topology, panel);
        if let Some(feeder_id) = panel.feeder_breaker.take() {
            info!("Panel '{}' no longer fed by '{}'", panel.name, feeder_id);
        }
    }

    fn release_feeder_registration(topology: &mut Topology, panel: &Panel) {
        let (Some(feeder_id), Some(main_id)) = (&panel.feeder_breaker, &panel.main_breaker) else {
            return;
        };
        if let Some(mut main) = topology.breaker(main_id).cloned() {
            if main.feeding_breakers.remove(feeder_id) {
                main.updated_at = Utc::now();
                topology.upsert_breaker(main);
            }
        }
    }
}
