use crate::error::Result as TopologyResult;
use crate::logic::TopologyOperations;
use crate::model::{
    BreakerRole, BreakerType, CableAttributes, CableMaterial, CablePath, LoadType, NewCircuitBreaker,
    NewLoad, NewPanel, NewPowerSource, PanelType, SourceType, Topology, Voltage,
};
use crate::store::traits::{Store, TopologyStore};
use anyhow::Result;
use log::info;

fn cable(quantity: u32, cross_section: f64, material: CableMaterial, length: f64, path: CablePath) -> CableAttributes {
    CableAttributes {
        quantity,
        cross_section,
        neutral_cross_section: None,
        material,
        length,
        path,
    }
}

fn breaker(name: &str, breaker_type: BreakerType, rated_current: f64, poles: u8, position: i32) -> NewCircuitBreaker {
    NewCircuitBreaker {
        breaker_type,
        poles,
        position,
        ..NewCircuitBreaker::named(name, rated_current)
    }
}

fn load(name: &str, load_type: LoadType, ampacity: f64, watts: f64, hours: f64) -> NewLoad {
    NewLoad {
        load_type,
        power_consumption: watts,
        estimated_usage_hours: hours,
        ..NewLoad::named(name, ampacity)
    }
}

/// Small building: utility grid and a standby generator feeding a main board,
/// one sub-main board and two final distribution boards.
fn build_demo_network(topology: &mut Topology) -> TopologyResult<()> {
    let grid = TopologyOperations::create_power_source(
        topology,
        NewPowerSource {
            source_type: SourceType::Grid,
            voltage: Voltage::V380,
            total_ampacity: 400.0,
            cable: cable(2, 185.0, CableMaterial::Copper, 40.0, CablePath::Buried),
            ..NewPowerSource::named("Utility Grid")
        },
    )?;
    TopologyOperations::create_power_source(
        topology,
        NewPowerSource {
            source_type: SourceType::Generator,
            voltage: Voltage::V380,
            total_ampacity: 250.0,
            cable: cable(1, 120.0, CableMaterial::Copper, 15.0, CablePath::Tray),
            ..NewPowerSource::named("Standby Generator")
        },
    )?;

    let grid_main = TopologyOperations::create_breaker(topology, breaker("Grid Incomer", BreakerType::Acb, 400.0, 4, 0))?;
    TopologyOperations::set_source_main_breaker(topology, &grid.id, &grid_main.id)?;

    let mdb = TopologyOperations::add_panel_to_source(
        topology,
        &grid.id,
        NewPanel {
            ampacity: 400.0,
            cable: cable(2, 185.0, CableMaterial::Copper, 10.0, CablePath::Tray),
            ..NewPanel::named("MDB")
        },
    )?;
    let mut mdb_main = breaker("MDB Main", BreakerType::Mccb, 400.0, 4, 0);
    mdb_main.breaker_role = Some(BreakerRole::Main);
    let mdb_main = TopologyOperations::add_breaker_to_panel(topology, &mdb.id, mdb_main)?;
    TopologyOperations::set_feeding_breakers(topology, &mdb_main.id, [grid_main.id.clone()].into())?;

    let smdb = TopologyOperations::add_child_panel(
        topology,
        &mdb.id,
        NewPanel {
            panel_type: Some(PanelType::SubMain),
            ampacity: 160.0,
            cable: cable(1, 70.0, CableMaterial::Aluminum, 35.0, CablePath::Conduit),
            ..NewPanel::named("SMDB Floor 1")
        },
    )?;
    let to_smdb = TopologyOperations::add_breaker_to_panel(topology, &mdb.id, breaker("To SMDB", BreakerType::Mccb, 160.0, 4, 1))?;
    let mut smdb_main = breaker("SMDB Main", BreakerType::Mccb, 160.0, 4, 0);
    smdb_main.breaker_role = Some(BreakerRole::Main);
    TopologyOperations::add_breaker_to_panel(topology, &smdb.id, smdb_main)?;
    TopologyOperations::set_feeder_breaker(topology, &smdb.id, &to_smdb.id)?;

    for (position, name) in [(1, "DB Lighting"), (2, "DB Power")] {
        let db = TopologyOperations::add_child_panel(
            topology,
            &smdb.id,
            NewPanel {
                ampacity: 63.0,
                cable: cable(1, 16.0, CableMaterial::Copper, 25.0, CablePath::Conduit),
                ..NewPanel::named(name)
            },
        )?;
        let feeder = TopologyOperations::add_breaker_to_panel(
            topology,
            &smdb.id,
            breaker(&format!("To {}", name), BreakerType::Mcb, 63.0, 4, position),
        )?;
        let mut main = breaker(&format!("{} Main", name), BreakerType::Mcb, 63.0, 4, 0);
        main.breaker_role = Some(BreakerRole::Main);
        TopologyOperations::add_breaker_to_panel(topology, &db.id, main)?;
        TopologyOperations::set_feeder_breaker(topology, &db.id, &feeder.id)?;

        let circuits: Vec<NewLoad> = if position == 1 {
            vec![
                load("Corridor Lights", LoadType::Lighting, 4.0, 800.0, 12.0),
                load("Office Lights", LoadType::Lighting, 6.5, 1400.0, 10.0),
            ]
        } else {
            vec![
                load("Split AC Unit", LoadType::Hvac, 12.0, 2600.0, 8.0),
                load("Water Pump", LoadType::Motor, 9.0, 1800.0, 3.0),
                load("Water Heater", LoadType::Heating, 13.0, 3000.0, 2.0),
            ]
        };
        for (index, mut circuit) in circuits.into_iter().enumerate() {
            let protection = TopologyOperations::add_breaker_to_panel(
                topology,
                &db.id,
                breaker(
                    &format!("{} C{}", name, index + 1),
                    BreakerType::Mcb,
                    if circuit.ampacity > 10.0 { 20.0 } else { 16.0 },
                    1,
                    index as i32 + 1,
                ),
            )?;
            circuit.cable = cable(1, 2.5, CableMaterial::Copper, 30.0, CablePath::Conduit);
            TopologyOperations::add_load_to_breaker(topology, &protection.id, circuit)?;
        }
    }
    Ok(())
}

/// Load a demonstration network into an empty store
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    let empty = store.read(|t| Ok(t.power_sources().next().is_none())).await?;
    if !empty {
        info!("Store already holds a topology, skipping seed data");
        return Ok(());
    }

    store.transact(build_demo_network).await?;
    info!("Seed network loaded");
    Ok(())
}
