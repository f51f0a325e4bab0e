use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::Topology;
use crate::store::traits::{Store, TopologyStore};

/// Topology held in memory behind a read/write lock, optionally mirrored to a
/// JSON snapshot file after every successful unit of work.
pub struct MemoryStore {
    topology: RwLock<Topology>,
    snapshot_path: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_topology(Topology::new())
    }

    pub fn with_topology(topology: Topology) -> Self {
        Self {
            topology: RwLock::new(topology),
            snapshot_path: None,
        }
    }

    /// Open a store backed by `path`. A missing file starts an empty topology;
    /// the file is created on the first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let topology = if tokio::fs::try_exists(&path).await? {
            let bytes = tokio::fs::read(&path).await?;
            let topology: Topology = serde_json::from_slice(&bytes)?;
            info!(
                "Loaded topology snapshot from {} ({} panels, {} breakers)",
                path.display(),
                topology.panel_count(),
                topology.breaker_count()
            );
            topology
        } else {
            info!("No snapshot at {}, starting with an empty topology", path.display());
            Topology::new()
        };

        Ok(Self {
            topology: RwLock::new(topology),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    async fn persist(path: &Path, topology: &Topology) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(topology)?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TopologyStore for MemoryStore {
    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Topology) -> Result<T> + Send,
        T: Send,
    {
        let topology = self.topology.read().await;
        f(&topology)
    }

    async fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Topology) -> Result<T> + Send,
        T: Send,
    {
        let mut current = self.topology.write().await;
        let mut draft = current.clone();

        let value = match f(&mut draft) {
            Ok(value) => value,
            Err(e) => {
                warn!("Rejected topology change: {}", e);
                return Err(e);
            }
        };

        if let Some(path) = &self.snapshot_path {
            Self::persist(path, &draft).await?;
        }
        *current = draft;
        Ok(value)
    }

    async fn snapshot(&self) -> Topology {
        self.topology.read().await.clone()
    }
}

impl Store for MemoryStore {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopologyError;
    use crate::logic::TopologyOperations;
    use crate::model::{generate_id, NewPanel, NewPowerSource};

    #[tokio::test]
    async fn test_failed_unit_of_work_leaves_store_unchanged() {
        let store = MemoryStore::new();
        store
            .transact(|t| TopologyOperations::create_power_source(t, NewPowerSource::named("Grid")))
            .await
            .unwrap();

        // The source is written before the panel validation fails
        let result = store
            .transact(|t| {
                TopologyOperations::create_power_source(t, NewPowerSource::named("Generator"))?;
                let mut orphan = NewPanel::named("Orphan");
                orphan.panel_type = Some(crate::model::PanelType::Main);
                TopologyOperations::create_panel(t, orphan)
            })
            .await;
        assert!(matches!(result, Err(TopologyError::InvalidTopology(_))));

        let names = store
            .read(|t| Ok(t.power_sources().map(|s| s.name.clone()).collect::<Vec<_>>()))
            .await
            .unwrap();
        assert_eq!(names, vec!["Grid".to_string()]);
    }

    #[tokio::test]
    async fn test_snapshot_file_round_trip() {
        let path = std::env::temp_dir().join(format!("topology-{}.json", generate_id()));
        {
            let store = MemoryStore::open(&path).await.unwrap();
            store
                .transact(|t| {
                    let source = TopologyOperations::create_power_source(t, NewPowerSource::named("Grid"))?;
                    TopologyOperations::add_panel_to_source(t, &source.id, NewPanel::named("MDB"))
                })
                .await
                .unwrap();
        }

        let reopened = MemoryStore::open(&path).await.unwrap();
        let topology = reopened.snapshot().await;
        assert_eq!(topology.panel_count(), 1);
        let source = topology.power_sources().next().unwrap();
        assert_eq!(topology.panel_ids_of_source(&source.id).len(), 1);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
