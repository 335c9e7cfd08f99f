mod config;
mod db;
mod error;
mod messages;
mod node;
mod replication;
mod settle;
mod topology;

pub use config::{Config, RingConfig, DEFAULT_STRIPES};
pub use error::RingError;
pub use messages::NodeSnapshot;
pub use node::{NodeHandle, Stall};
pub use replication::ReplicationJob;
pub use topology::{key_hash, Topology};

use rand::seq::IndexedRandom;
use std::{fmt::Debug, hash::Hash, sync::Arc, time::Duration};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info};

use settle::Settle;

pub trait RingKey: Hash + Eq + Clone + Debug + Send + Sync + 'static {}
impl<T> RingKey for T where T: Hash + Eq + Clone + Debug + Send + Sync + 'static {}

pub trait RingValue: Clone + Debug + Send + Sync + 'static {}
impl<T> RingValue for T where T: Clone + Debug + Send + Sync + 'static {}

pub struct Ring<K, V> {
    topology: Topology,
    nodes: Arc<[NodeHandle<K, V>]>,
    settle: Arc<Settle>,
    workers: Vec<JoinHandle<()>>,
}

impl<K, V> Ring<K, V>
where
    K: RingKey,
    V: RingValue,
{
    // hosted on the current tokio runtime
    pub fn new(n: usize, w: usize) -> Result<Self, RingError> {
        Self::with_config(RingConfig::new(n, w))
    }

    pub fn with_config(config: RingConfig) -> Result<Self, RingError> {
        // validate before looking for a runtime so bad parameters are
        // reported as such
        validate(&config)?;
        let handle = Handle::try_current().map_err(|_| RingError::NoRuntime)?;
        Self::spawn_on(config, &handle)
    }

    pub fn spawn_on(config: RingConfig, handle: &Handle) -> Result<Self, RingError> {
        let topology = validate(&config)?;
        let settle = Arc::new(Settle::new());

        let (handles, pending): (Vec<_>, Vec<_>) = (0..config.nodes)
            .map(|id| node::channel(id, topology, config.stripes, settle.clone()))
            .unzip();
        let nodes: Arc<[NodeHandle<K, V>]> = handles.into();

        let workers = pending
            .into_iter()
            .map(|worker| handle.spawn(worker.with_peers(nodes.clone()).run()))
            .collect();

        info!(
            "Ring started with {} nodes, band width {}, {} stripes per node",
            config.nodes, config.replicas, config.stripes
        );

        Ok(Self {
            topology,
            nodes,
            settle,
            workers,
        })
    }

    pub fn n(&self) -> usize {
        self.topology.n()
    }

    pub fn w(&self) -> usize {
        self.topology.w()
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn nodes(&self) -> &[NodeHandle<K, V>] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&NodeHandle<K, V>> {
        self.nodes.get(id)
    }

    // messages dispatched and not yet processed
    pub fn pending(&self) -> usize {
        self.settle.pending()
    }

    pub fn node_index(&self, i: u64) -> usize {
        self.topology.node_index(i)
    }

    pub fn base_index(&self, key: &K) -> usize {
        self.topology.base_index(key)
    }

    pub fn band_indices(&self, key: &K) -> Vec<usize> {
        self.topology.band_indices(key)
    }

    pub fn band_nodes(&self, key: &K) -> Vec<&NodeHandle<K, V>> {
        self.band_indices(key)
            .into_iter()
            .map(|i| &self.nodes[i])
            .collect()
    }

    pub fn is_responsible(&self, id: usize, key: &K) -> bool {
        self.topology.is_responsible(id, key)
    }

    // uniformly random band member
    pub fn pick_responsible(&self, key: &K) -> &NodeHandle<K, V> {
        let band = self.band_indices(key);
        let id = band.choose(&mut rand::rng()).copied().unwrap_or_default();
        &self.nodes[id]
    }

    // reads exactly one node, so a write still replicating may read as None
    pub async fn get(&self, entry: &NodeHandle<K, V>, key: &K) -> Option<V> {
        if self.is_responsible(entry.id(), key) {
            entry.read_direct(key).await
        } else {
            let target = self.pick_responsible(key);
            debug!(
                "get for {:?} redirected from node {} to node {}",
                key,
                entry.id(),
                target.id()
            );
            target.read_direct(key).await
        }
    }

    pub fn put(&self, entry: &NodeHandle<K, V>, key: K, value: V) {
        entry.apply_write(key, value);
    }

    pub async fn get_ring(&self, key: &K) -> Option<V> {
        let entry = self.pick_responsible(key);
        self.get(entry, key).await
    }

    pub fn put_ring(&self, key: K, value: V) {
        let entry = self.pick_responsible(&key);
        self.put(entry, key, value);
    }

    // waits for every dispatched message, including the replication it
    // triggered. Blocks for as long as any node is stalled
    pub async fn await_ring(&self) {
        self.settle.wait().await;
    }

    // true if the ring settled before the timeout
    pub async fn await_ring_for(&self, timeout: Duration) -> bool {
        self.settle.wait_for(timeout).await
    }

    pub async fn shutdown(mut self) {
        self.await_ring().await;
        for node in self.nodes.iter() {
            node.shutdown();
        }
        for worker in std::mem::take(&mut self.workers) {
            let _ = worker.await;
        }
        info!("Ring with {} nodes shut down", self.n());
    }
}

impl<K, V> Drop for Ring<K, V> {
    // discards queued messages; empty after a graceful shutdown
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

fn validate(config: &RingConfig) -> Result<Topology, RingError> {
    let topology = Topology::new(config.nodes, config.replicas)?;
    if config.stripes == 0 {
        return Err(RingError::InvalidStripes);
    }
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_outside_runtime_fails() {
        let result = Ring::<u64, u64>::new(4, 2);
        assert_eq!(result.err(), Some(RingError::NoRuntime));
    }

    #[test]
    fn bad_parameters_win_over_missing_runtime() {
        let result = Ring::<u64, u64>::new(3, 3);
        assert_eq!(
            result.err(),
            Some(RingError::InvalidConfiguration {
                nodes: 3,
                replicas: 3
            })
        );
    }

    #[tokio::test]
    async fn rejects_zero_stripes() {
        let result = Ring::<u64, u64>::with_config(RingConfig::new(4, 2).with_stripes(0));
        assert_eq!(result.err(), Some(RingError::InvalidStripes));
    }

    #[tokio::test]
    async fn pick_responsible_stays_in_band() {
        let ring: Ring<String, u8> = Ring::new(6, 3).unwrap();
        let key = "dupont".to_string();
        let band = ring.band_indices(&key);
        for _ in 0..100 {
            assert!(band.contains(&ring.pick_responsible(&key).id()));
        }
        let members: Vec<usize> = ring.band_nodes(&key).iter().map(|n| n.id()).collect();
        assert_eq!(members, band);
    }

    #[tokio::test]
    async fn pick_responsible_reaches_every_member() {
        let ring: Ring<u64, u8> = Ring::new(5, 3).unwrap();
        let band = ring.band_indices(&8);
        let mut seen = vec![false; ring.n()];
        for _ in 0..500 {
            seen[ring.pick_responsible(&8).id()] = true;
        }
        for id in 0..ring.n() {
            assert_eq!(seen[id], band.contains(&id));
        }
    }

    #[tokio::test]
    async fn single_member_band_is_deterministic() {
        let ring: Ring<u64, u8> = Ring::new(4, 1).unwrap();
        let base = ring.base_index(&11);
        for _ in 0..20 {
            assert_eq!(ring.pick_responsible(&11).id(), base);
        }
    }
}
