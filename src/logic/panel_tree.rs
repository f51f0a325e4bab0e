use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::error::{Result, TopologyError};
use crate::model::{Id, Panel, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadAggregate {
    pub total_ampacity: f64,
    pub load_count: usize,
}

/// Checks and queries over the panel forest
pub struct PanelTree;

impl PanelTree {
    /// Reject making `proposed_parent` the parent of `panel_id` when that would
    /// put `panel_id` among its own ancestors.
    pub fn validate_parent(topology: &Topology, panel_id: &Id, proposed_parent: &Id) -> Result<()> {
        if panel_id == proposed_parent {
            return Err(TopologyError::Cycle(format!(
                "panel '{}' cannot be its own parent",
                panel_id
            )));
        }
        topology.require_panel(proposed_parent)?;

        let mut visited = HashSet::new();
        let mut cursor = Some(proposed_parent.clone());
        while let Some(current) = cursor {
            if &current == panel_id {
                return Err(TopologyError::Cycle(format!(
                    "panel '{}' is an ancestor of '{}'",
                    panel_id, proposed_parent
                )));
            }
            if !visited.insert(current.clone()) {
                warn!("Stored panel tree already loops through '{}'", current);
                return Err(TopologyError::Cycle(format!(
                    "existing parent chain of '{}' loops through '{}'",
                    proposed_parent, current
                )));
            }
            cursor = topology
                .panel(&current)
                .and_then(|panel| panel.parent_panel.clone());
        }
        Ok(())
    }

    /// Check the panel's linkage against its type. `panel` may be a draft that
    /// is not yet stored; child panels are looked up by its id.
    pub fn validate_type_consistency(topology: &Topology, panel: &Panel) -> Result<()> {
        if panel.panel_type.is_root() {
            if panel.power_source.is_none() {
                return Err(TopologyError::InvalidTopology(format!(
                    "main panel '{}' must be connected to a power source",
                    panel.name
                )));
            }
            if panel.parent_panel.is_some() {
                return Err(TopologyError::InvalidTopology(format!(
                    "main panel '{}' cannot have a parent panel",
                    panel.name
                )));
            }
        } else {
            if panel.parent_panel.is_none() {
                return Err(TopologyError::InvalidTopology(format!(
                    "sub panel '{}' must have a parent panel",
                    panel.name
                )));
            }
            if panel.power_source.is_some() {
                return Err(TopologyError::InvalidTopology(format!(
                    "sub panel '{}' cannot be connected directly to a power source",
                    panel.name
                )));
            }
        }

        if !panel.panel_type.can_have_children() && topology.has_child_panels(&panel.id) {
            return Err(TopologyError::InvalidTopology(format!(
                "panel '{}' has child panels; only main and sub_main panels may feed other panels",
                panel.name
            )));
        }
        Ok(())
    }

    /// Reject attaching a child under a panel whose type does not allow children
    pub fn validate_can_adopt(topology: &Topology, parent_id: &Id) -> Result<()> {
        let parent = topology.require_panel(parent_id)?;
        if !parent.panel_type.can_have_children() {
            return Err(TopologyError::InvalidTopology(format!(
                "panel '{}' is a sub panel and cannot have child panels",
                parent.name
            )));
        }
        Ok(())
    }

    /// Ancestor ids from the direct parent up to the root
    pub fn ancestors(topology: &Topology, panel_id: &Id) -> Result<Vec<Id>> {
        let panel = topology.require_panel(panel_id)?;
        let mut chain = Vec::new();
        let mut visited = HashSet::from([panel_id.clone()]);
        let mut cursor = panel.parent_panel.clone();

        while let Some(current) = cursor {
            if !visited.insert(current.clone()) {
                warn!("Parent chain of '{}' loops through '{}'", panel_id, current);
                break;
            }
            cursor = topology
                .panel(&current)
                .and_then(|panel| panel.parent_panel.clone());
            chain.push(current);
        }
        Ok(chain)
    }

    /// Names from the power source down to `panel_id`
    pub fn full_path(topology: &Topology, panel_id: &Id) -> Result<Vec<String>> {
        let panel = topology.require_panel(panel_id)?;
        let ancestors = Self::ancestors(topology, panel_id)?;

        let root = match ancestors.last() {
            Some(root_id) => topology.panel(root_id),
            None => Some(panel),
        };

        let mut path = Vec::with_capacity(ancestors.len() + 2);
        if let Some(source) = root
            .and_then(|root| root.power_source.as_ref())
            .and_then(|source_id| topology.power_source(source_id))
        {
            path.push(source.name.clone());
        }
        for ancestor_id in ancestors.iter().rev() {
            if let Some(ancestor) = topology.panel(ancestor_id) {
                path.push(ancestor.name.clone());
            }
        }
        path.push(panel.name.clone());
        Ok(path)
    }

    /// Child panels of `panel_id`, breadth first. With `include_indirect` the
    /// whole subtree is returned.
    pub fn descendants(topology: &Topology, panel_id: &Id, include_indirect: bool) -> Result<Vec<Id>> {
        topology.require_panel(panel_id)?;
        if !include_indirect {
            return Ok(topology.child_panel_ids(panel_id));
        }

        let mut result = Vec::new();
        let mut visited = HashSet::from([panel_id.clone()]);
        let mut queue = VecDeque::from([panel_id.clone()]);

        while let Some(current) = queue.pop_front() {
            for child in topology.child_panel_ids(&current) {
                if visited.insert(child.clone()) {
                    result.push(child.clone());
                    queue.push_back(child);
                } else {
                    warn!("Panel '{}' reached twice below '{}'", child, panel_id);
                }
            }
        }
        Ok(result)
    }

    /// Sum of load currents on the panel and every panel below it
    pub fn aggregate_loads(topology: &Topology, panel_id: &Id) -> Result<LoadAggregate> {
        let mut panels = vec![panel_id.clone()];
        panels.extend(Self::descendants(topology, panel_id, true)?);

        let mut aggregate = LoadAggregate {
            total_ampacity: 0.0,
            load_count: 0,
        };
        for id in &panels {
            for load_id in topology.load_ids_of_panel(id) {
                if let Some(load) = topology.load(&load_id) {
                    aggregate.total_ampacity += load.ampacity;
                    aggregate.load_count += 1;
                }
            }
        }
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewLoad, NewPanel, NewPowerSource, PanelType};

    fn add_panel(topology: &mut Topology, name: &str, parent: Option<&str>, panel_type: PanelType) {
        let mut input = NewPanel::named(name);
        input.id = Some(name.to_string());
        input.panel_type = Some(panel_type);
        match parent {
            Some(parent) => input.parent_panel = Some(parent.to_string()),
            None => input.power_source = Some("grid".to_string()),
        }
        topology.upsert_panel(input.into_panel());
    }

    fn add_load(topology: &mut Topology, name: &str, panel: &str, amps: f64) {
        let mut input = NewLoad::named(name, amps);
        input.panel = Some(panel.to_string());
        topology.upsert_load(input.into_load());
    }

    fn sample() -> Topology {
        let mut topology = Topology::new();
        let mut source = NewPowerSource::named("Grid");
        source.id = Some("grid".to_string());
        topology.upsert_power_source(source.into_source());
        add_panel(&mut topology, "root", None, PanelType::Main);
        add_panel(&mut topology, "child", Some("root"), PanelType::SubMain);
        add_panel(&mut topology, "grandchild", Some("child"), PanelType::Sub);
        topology
    }

    fn id(value: &str) -> Id {
        value.to_string()
    }

    #[test]
    fn test_parent_cycle_rejected() {
        let topology = sample();

        let self_parent = PanelTree::validate_parent(&topology, &id("root"), &id("root"));
        assert!(matches!(self_parent, Err(TopologyError::Cycle(_))));

        let descendant = PanelTree::validate_parent(&topology, &id("root"), &id("grandchild"));
        assert!(matches!(descendant, Err(TopologyError::Cycle(_))));

        assert!(PanelTree::validate_parent(&topology, &id("grandchild"), &id("root")).is_ok());
    }

    #[test]
    fn test_parent_walk_terminates_on_stored_cycle() {
        let mut topology = sample();
        // Corrupt the tree behind the validator's back: root <-> child
        let mut root = topology.panel(&id("root")).unwrap().clone();
        root.parent_panel = Some(id("child"));
        topology.upsert_panel(root);

        let result = PanelTree::validate_parent(&topology, &id("grandchild"), &id("child"));
        assert!(matches!(result, Err(TopologyError::Cycle(_))));

        let ancestors = PanelTree::ancestors(&topology, &id("grandchild")).unwrap();
        assert!(ancestors.len() <= topology.panel_count());
    }

    #[test]
    fn test_parent_chain_ends_at_root() {
        let topology = sample();
        for panel in topology.panels() {
            let chain = PanelTree::ancestors(&topology, &panel.id).unwrap();
            assert!(chain.len() < topology.panel_count());
            let top = chain.last().unwrap_or(&panel.id);
            assert!(topology.panel(top).unwrap().parent_panel.is_none());
        }
    }

    #[test]
    fn test_type_consistency() {
        let topology = sample();

        let mut orphan_main = topology.panel(&id("root")).unwrap().clone();
        orphan_main.power_source = None;
        assert!(matches!(
            PanelTree::validate_type_consistency(&topology, &orphan_main),
            Err(TopologyError::InvalidTopology(_))
        ));

        let mut demoted = topology.panel(&id("child")).unwrap().clone();
        demoted.panel_type = PanelType::Sub;
        assert!(matches!(
            PanelTree::validate_type_consistency(&topology, &demoted),
            Err(TopologyError::InvalidTopology(_))
        ));

        let mut sourced_sub = topology.panel(&id("grandchild")).unwrap().clone();
        sourced_sub.power_source = Some(id("grid"));
        assert!(PanelTree::validate_type_consistency(&topology, &sourced_sub).is_err());

        for panel in topology.panels() {
            assert!(PanelTree::validate_type_consistency(&topology, panel).is_ok());
        }
    }

    #[test]
    fn test_sub_panel_cannot_adopt() {
        let topology = sample();
        assert!(PanelTree::validate_can_adopt(&topology, &id("child")).is_ok());
        assert!(matches!(
            PanelTree::validate_can_adopt(&topology, &id("grandchild")),
            Err(TopologyError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_full_path_starts_at_source() {
        let topology = sample();
        let path = PanelTree::full_path(&topology, &id("grandchild")).unwrap();
        assert_eq!(path, vec!["Grid", "root", "child", "grandchild"]);

        let root_path = PanelTree::full_path(&topology, &id("root")).unwrap();
        assert_eq!(root_path, vec!["Grid", "root"]);
    }

    #[test]
    fn test_descendants_direct_and_indirect() {
        let topology = sample();
        assert_eq!(
            PanelTree::descendants(&topology, &id("root"), false).unwrap(),
            vec![id("child")]
        );
        assert_eq!(
            PanelTree::descendants(&topology, &id("root"), true).unwrap(),
            vec![id("child"), id("grandchild")]
        );
    }

    #[test]
    fn test_aggregate_loads_over_subtree() {
        let mut topology = sample();
        add_load(&mut topology, "l1", "root", 5.0);
        add_load(&mut topology, "l2", "child", 3.0);
        add_load(&mut topology, "l3", "grandchild", 2.0);

        let total = PanelTree::aggregate_loads(&topology, &id("root")).unwrap();
        assert_eq!(total.total_ampacity, 10.0);
        assert_eq!(total.load_count, 3);

        let child_total = PanelTree::aggregate_loads(&topology, &id("child")).unwrap();
        assert_eq!(child_total.total_ampacity, 5.0);
        assert_eq!(child_total.load_count, 2);
    }

    #[test]
    fn test_deep_tree_is_walked_iteratively() {
        let mut topology = sample();
        let mut parent = "child".to_string();
        for depth in 0..5_000 {
            let name = format!("deep-{}", depth);
            add_panel(&mut topology, &name, Some(&parent), PanelType::SubMain);
            parent = name;
        }

        let all = PanelTree::descendants(&topology, &id("root"), true).unwrap();
        assert_eq!(all.len(), 5_002);
        let path = PanelTree::full_path(&topology, &parent).unwrap();
        assert_eq!(path.len(), 5_003);
    }
}
