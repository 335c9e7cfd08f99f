use std::collections::VecDeque;
use tracing::debug;

use crate::messages::NodeMessage;
use crate::node::NodeHandle;
use crate::{RingKey, RingValue};

// send (key, value) directly to node `target`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicationJob<K, V> {
    pub target: usize,
    pub key: K,
    pub value: V,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct WritePlan<K, V> {
    pub(crate) store_locally: bool,
    pub(crate) jobs: Vec<ReplicationJob<K, V>>,
}

// hit: store locally and copy to every other band member
// miss: do not store, copy to the whole band
pub(crate) fn plan_write<K: Clone, V: Clone>(
    own_id: usize,
    band: &[usize],
    key: &K,
    value: &V,
) -> WritePlan<K, V> {
    let store_locally = band.contains(&own_id);
    let jobs = band
        .iter()
        .filter(|id| **id != own_id)
        .map(|target| ReplicationJob {
            target: *target,
            key: key.clone(),
            value: value.clone(),
        })
        .collect();

    WritePlan {
        store_locally,
        jobs,
    }
}

// oldest first
#[derive(Debug)]
pub(crate) struct ReplicationQueue<K, V> {
    jobs: VecDeque<ReplicationJob<K, V>>,
}

impl<K, V> Default for ReplicationQueue<K, V> {
    fn default() -> Self {
        Self {
            jobs: VecDeque::new(),
        }
    }
}

impl<K: Clone, V: Clone> ReplicationQueue<K, V> {
    pub(crate) fn enqueue(&mut self, jobs: impl IntoIterator<Item = ReplicationJob<K, V>>) {
        self.jobs.extend(jobs);
    }

    // no-op on an empty queue
    pub(crate) fn dequeue_head(&mut self) -> Option<ReplicationJob<K, V>> {
        self.jobs.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn to_vec(&self) -> Vec<ReplicationJob<K, V>> {
        self.jobs.iter().cloned().collect()
    }
}

// sends never wait, so a stalled target only keeps the ring from settling.
// targets come from the key's band and are always valid peer indices
pub(crate) fn drain<K, V>(
    own_id: usize,
    queue: &mut ReplicationQueue<K, V>,
    peers: &[NodeHandle<K, V>],
) -> usize
where
    K: RingKey,
    V: RingValue,
{
    let mut sent = 0;
    while let Some(job) = queue.dequeue_head() {
        debug!(
            "node {} replicating key {:?} to node {}",
            own_id, job.key, job.target
        );
        peers[job.target].dispatch(NodeMessage::DirectWrite {
            key: job.key,
            value: job.value,
        });
        sent += 1;
    }
    sent
}
