use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::error::{Result, TopologyError};
use crate::model::{Id, Topology};

/// How far `aggregate_load` looks below a breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BreakerLoadMode {
    /// Own loads plus the rated current of directly fed breakers
    #[default]
    Direct,
    /// Own loads plus the loads of every breaker reachable downstream
    Transitive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerRef {
    pub id: Id,
    pub name: String,
}

/// Checks and queries over the breaker feeding graph.
///
/// Edges are stored on the fed breaker (`feeding_breakers`); the topology keeps
/// the reverse direction (`fed_breaker_ids`) as an index. All walks track
/// visited ids, so they terminate even if a loop was persisted by mistake.
pub struct BreakerGraph;

impl BreakerGraph {
    /// Every breaker `breaker_id` feeds, directly or through other breakers
    pub fn downstream(topology: &Topology, breaker_id: &Id) -> HashSet<Id> {
        let mut reached = HashSet::new();
        let mut queue = VecDeque::from([breaker_id.clone()]);

        while let Some(current) = queue.pop_front() {
            for fed in topology.fed_breaker_ids(&current) {
                if fed != *breaker_id && reached.insert(fed.clone()) {
                    queue.push_back(fed);
                }
            }
        }
        reached
    }

    /// Reject a feeding set for `breaker_id` that contains the breaker itself or
    /// any breaker it already feeds.
    pub fn validate_feed(
        topology: &Topology,
        breaker_id: &Id,
        proposed_feeders: &BTreeSet<Id>,
    ) -> Result<()> {
        if proposed_feeders.contains(breaker_id) {
            return Err(TopologyError::Cycle(format!(
                "breaker '{}' cannot feed itself",
                breaker_id
            )));
        }
        for feeder in proposed_feeders {
            topology.require_breaker(feeder)?;
        }
        if proposed_feeders.is_empty() {
            return Ok(());
        }

        let downstream = Self::downstream(topology, breaker_id);
        if let Some(feeder) = proposed_feeders.iter().find(|id| downstream.contains(*id)) {
            return Err(TopologyError::Cycle(format!(
                "breaker '{}' is already fed by '{}'; adding it as a feeder would close a loop",
                feeder, breaker_id
            )));
        }
        Ok(())
    }

    /// Chain of breakers from the supply side down to `breaker_id`, found by a
    /// breadth-first walk over feeding breakers.
    pub fn full_path(topology: &Topology, breaker_id: &Id) -> Result<Vec<BreakerRef>> {
        let start = topology.require_breaker(breaker_id)?;

        let mut order = vec![BreakerRef {
            id: start.id.clone(),
            name: start.display_name(),
        }];
        let mut visited = HashSet::from([start.id.clone()]);
        let mut queue = VecDeque::from([start.id.clone()]);

        while let Some(current) = queue.pop_front() {
            for feeder_id in topology.feeding_breaker_ids(&current) {
                if !visited.insert(feeder_id.clone()) {
                    if feeder_id == *breaker_id {
                        warn!("Feeding graph loops back to breaker '{}'", breaker_id);
                    }
                    continue;
                }
                if let Some(feeder) = topology.breaker(&feeder_id) {
                    order.push(BreakerRef {
                        id: feeder.id.clone(),
                        name: feeder.display_name(),
                    });
                    queue.push_back(feeder_id);
                }
            }
        }

        order.reverse();
        Ok(order)
    }

    pub fn format_path(path: &[BreakerRef]) -> String {
        path.iter()
            .map(|breaker| breaker.name.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    }

    /// Current drawn through `breaker_id`
    pub fn aggregate_load(topology: &Topology, breaker_id: &Id, mode: BreakerLoadMode) -> Result<f64> {
        topology.require_breaker(breaker_id)?;
        let own = Self::direct_load_current(topology, breaker_id);

        let below = match mode {
            BreakerLoadMode::Direct => topology
                .fed_breaker_ids(breaker_id)
                .iter()
                .filter_map(|id| topology.breaker(id))
                .map(|breaker| breaker.rated_current)
                .sum::<f64>(),
            BreakerLoadMode::Transitive => Self::downstream(topology, breaker_id)
                .iter()
                .map(|id| Self::direct_load_current(topology, id))
                .sum::<f64>(),
        };
        Ok(own + below)
    }

    fn direct_load_current(topology: &Topology, breaker_id: &Id) -> f64 {
        topology
            .load_ids_of_breaker(breaker_id)
            .iter()
            .filter_map(|id| topology.load(id))
            .map(|load| load.ampacity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewCircuitBreaker, NewLoad};

    fn id(value: &str) -> Id {
        value.to_string()
    }

    fn add_breaker(topology: &mut Topology, name: &str, rated: f64, feeders: &[&str]) {
        let mut breaker = NewCircuitBreaker::named(name, rated);
        breaker.id = Some(name.to_string());
        let mut breaker = breaker.into_breaker();
        breaker.feeding_breakers = feeders.iter().map(|f| f.to_string()).collect();
        topology.upsert_breaker(breaker);
    }

    fn add_load(topology: &mut Topology, name: &str, breaker: &str, amps: f64) {
        let mut load = NewLoad::named(name, amps);
        load.breaker = Some(breaker.to_string());
        topology.upsert_load(load.into_load());
    }

    /// A is fed by B, B is fed by C
    fn chain() -> Topology {
        let mut topology = Topology::new();
        add_breaker(&mut topology, "C", 100.0, &[]);
        add_breaker(&mut topology, "B", 63.0, &["C"]);
        add_breaker(&mut topology, "A", 20.0, &["B"]);
        topology
    }

    #[test]
    fn test_self_feed_rejected() {
        let topology = chain();
        let proposed = BTreeSet::from([id("A")]);
        assert!(matches!(
            BreakerGraph::validate_feed(&topology, &id("A"), &proposed),
            Err(TopologyError::Cycle(_))
        ));
    }

    #[test]
    fn test_downstream_feeder_rejected() {
        let topology = chain();
        // C feeds B feeds A, so neither A nor B may feed C
        for candidate in ["A", "B"] {
            let proposed = BTreeSet::from([id(candidate)]);
            let result = BreakerGraph::validate_feed(&topology, &id("C"), &proposed);
            assert!(matches!(result, Err(TopologyError::Cycle(_))), "{}", candidate);
        }

        // Redundant but acyclic: C feeding A directly
        let proposed = BTreeSet::from([id("B"), id("C")]);
        assert!(BreakerGraph::validate_feed(&topology, &id("A"), &proposed).is_ok());
    }

    #[test]
    fn test_unknown_feeder_is_not_found() {
        let topology = chain();
        let proposed = BTreeSet::from([id("missing")]);
        assert!(matches!(
            BreakerGraph::validate_feed(&topology, &id("A"), &proposed),
            Err(TopologyError::NotFound { .. })
        ));
    }

    #[test]
    fn test_full_path_is_source_first() {
        let topology = chain();
        let path = BreakerGraph::full_path(&topology, &id("A")).unwrap();
        let ids: Vec<_> = path.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "B", "A"]);
        assert_eq!(BreakerGraph::format_path(&path), "C → B → A");
    }

    #[test]
    fn test_full_path_terminates_on_stored_cycle() {
        let mut topology = chain();
        // Persist C <- A behind the validator's back
        add_breaker(&mut topology, "C", 100.0, &["A"]);

        let path = BreakerGraph::full_path(&topology, &id("A")).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.last().unwrap().id, "A");
    }

    #[test]
    fn test_aggregate_load_modes() {
        let mut topology = chain();
        add_load(&mut topology, "heater", "C", 10.0);
        add_load(&mut topology, "lamp", "A", 4.0);

        let direct = BreakerGraph::aggregate_load(&topology, &id("C"), BreakerLoadMode::Direct).unwrap();
        assert_eq!(direct, 10.0 + 63.0);

        let transitive =
            BreakerGraph::aggregate_load(&topology, &id("C"), BreakerLoadMode::Transitive).unwrap();
        assert_eq!(transitive, 14.0);
    }
}
