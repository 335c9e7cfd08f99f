use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::db::StripedDb;
use crate::messages::{NodeMessage, NodeSnapshot};
use crate::replication::{self, plan_write, ReplicationQueue};
use crate::settle::Settle;
use crate::topology::Topology;
use crate::{RingKey, RingValue};

pub struct NodeHandle<K, V> {
    id: usize,
    sender: mpsc::UnboundedSender<NodeMessage<K, V>>,
    db: StripedDb<K, V>,
    settle: Arc<Settle>,
}

impl<K, V> Clone for NodeHandle<K, V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sender: self.sender.clone(),
            db: self.db.clone(),
            settle: self.settle.clone(),
        }
    }
}

impl<K, V> fmt::Debug for NodeHandle<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle").field("id", &self.id).finish()
    }
}

impl<K, V> NodeHandle<K, V>
where
    K: RingKey,
    V: RingValue,
{
    pub fn id(&self) -> usize {
        self.id
    }

    // bypasses the inbox, so writes still queued for this node are not visible
    pub async fn read_direct(&self, key: &K) -> Option<V> {
        self.db.get(key).await
    }

    // None once the actor has stopped
    pub async fn snapshot(&self) -> Option<NodeSnapshot<K, V>> {
        let (response_sender, response_receiver) = oneshot::channel();
        self.dispatch(NodeMessage::Inspect { response_sender });
        response_receiver.await.ok()
    }

    // messages behind this one wait until the Stall is released or dropped
    pub fn stall(&self) -> Stall {
        let (release_sender, release) = oneshot::channel();
        self.dispatch(NodeMessage::Stall { release });
        Stall {
            release: Some(release_sender),
        }
    }

    pub(crate) fn apply_write(&self, key: K, value: V) {
        self.dispatch(NodeMessage::ApplyWrite { key, value });
    }

    pub(crate) fn shutdown(&self) {
        self.dispatch(NodeMessage::Shutdown);
    }

    // counted before the send so the ring cannot look settled while the
    // message is in flight
    pub(crate) fn dispatch(&self, msg: NodeMessage<K, V>) {
        self.settle.enter();
        if let Err(e) = self.sender.send(msg) {
            debug!("node {} has stopped, dropping {:?}", self.id, e.0);
            self.settle.leave();
        }
    }
}

#[derive(Debug)]
pub struct Stall {
    release: Option<oneshot::Sender<()>>,
}

impl Stall {
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
        }
    }
}

impl Drop for Stall {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
        }
    }
}

pub(crate) struct NodeWorker<K, V> {
    id: usize,
    topology: Topology,
    inbox: mpsc::UnboundedReceiver<NodeMessage<K, V>>,
    db: StripedDb<K, V>,
    queue: ReplicationQueue<K, V>,
    // every node of the ring, indexed by id
    peers: Arc<[NodeHandle<K, V>]>,
    settle: Arc<Settle>,
}

pub(crate) fn channel<K, V>(
    id: usize,
    topology: Topology,
    stripes: usize,
    settle: Arc<Settle>,
) -> (NodeHandle<K, V>, PendingWorker<K, V>)
where
    K: RingKey,
    V: RingValue,
{
    let (sender, inbox) = mpsc::unbounded_channel();
    let db = StripedDb::new(stripes);
    let handle = NodeHandle {
        id,
        sender,
        db: db.clone(),
        settle: settle.clone(),
    };
    let pending = PendingWorker {
        id,
        topology,
        inbox,
        db,
        settle,
    };
    (handle, pending)
}

// worker waiting for the full peer list
pub(crate) struct PendingWorker<K, V> {
    id: usize,
    topology: Topology,
    inbox: mpsc::UnboundedReceiver<NodeMessage<K, V>>,
    db: StripedDb<K, V>,
    settle: Arc<Settle>,
}

impl<K, V> PendingWorker<K, V> {
    pub(crate) fn with_peers(self, peers: Arc<[NodeHandle<K, V>]>) -> NodeWorker<K, V> {
        NodeWorker {
            id: self.id,
            topology: self.topology,
            inbox: self.inbox,
            db: self.db,
            queue: ReplicationQueue::default(),
            peers,
            settle: self.settle,
        }
    }
}

impl<K, V> NodeWorker<K, V>
where
    K: RingKey,
    V: RingValue,
{
    pub(crate) async fn run(mut self) {
        while let Some(msg) = self.inbox.recv().await {
            let keep_running = self.handle_message(msg).await;
            self.settle.leave();
            if !keep_running {
                break;
            }
        }

        // release whatever was queued behind the shutdown
        self.inbox.close();
        while self.inbox.recv().await.is_some() {
            self.settle.leave();
        }
        debug!("node {} stopped", self.id);
    }

    // returns false when the node should stop
    async fn handle_message(&mut self, msg: NodeMessage<K, V>) -> bool {
        match msg {
            NodeMessage::ApplyWrite { key, value } => {
                self.apply_write(key, value).await;
            }
            NodeMessage::DirectWrite { key, value } => {
                self.db.put(key, value).await;
            }
            NodeMessage::Inspect { response_sender } => {
                let snapshot = NodeSnapshot {
                    id: self.id,
                    store: self.db.snapshot().await,
                    queue: self.queue.to_vec(),
                };
                let _ = response_sender.send(snapshot);
            }
            NodeMessage::Stall { release } => {
                debug!("node {} stalled", self.id);
                let _ = release.await;
                debug!("node {} resumed", self.id);
            }
            NodeMessage::Shutdown => return false,
        }
        true
    }

    async fn apply_write(&mut self, key: K, value: V) {
        let band = self.topology.band_indices(&key);
        let plan = plan_write(self.id, &band, &key, &value);

        if plan.store_locally {
            debug!("node {} hit for key {:?}, band {:?}", self.id, key, band);
            self.db.put(key, value).await;
        } else {
            debug!("node {} miss for key {:?}, band {:?}", self.id, key, band);
        }

        self.queue.enqueue(plan.jobs);
        debug!("node {} has {} replication jobs queued", self.id, self.queue.len());
        let sent = replication::drain(self.id, &mut self.queue, &self.peers);
        debug!("node {} dispatched {} copies of {:?}", self.id, sent, band);
        debug_assert!(self.queue.is_empty());
    }
}
