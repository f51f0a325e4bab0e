use crate::error::Result;
use crate::model::Topology;

/// Access to the topology as units of work.
///
/// `read` sees one consistent state for the whole closure. `transact` runs the
/// closure against a draft copy and publishes the draft only when the closure
/// returns `Ok`; an `Err` leaves the stored topology untouched.
#[async_trait::async_trait]
pub trait TopologyStore: Send + Sync {
    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Topology) -> Result<T> + Send,
        T: Send;

    async fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Topology) -> Result<T> + Send,
        T: Send;

    /// Copy of the current topology
    async fn snapshot(&self) -> Topology;
}

/// Everything the API layer needs from a backend
pub trait Store: TopologyStore + Send + Sync {}
