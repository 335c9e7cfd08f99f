use crate::replication::ReplicationJob;
use std::collections::HashMap;
use tokio::sync::oneshot;

// everything a node actor can be asked to do, processed one at a time in
// arrival order
#[derive(Debug)]
pub(crate) enum NodeMessage<K, V> {
    // responsibility-aware write: store if in the band, queue copies for peers
    ApplyWrite {
        key: K,
        value: V,
    },
    // copy delivered by a band peer; never re-replicated
    DirectWrite {
        key: K,
        value: V,
    },
    // test harness asking for the node's state
    Inspect {
        response_sender: oneshot::Sender<NodeSnapshot<K, V>>,
    },
    // park the actor until the sender side is released or dropped
    Stall {
        release: oneshot::Receiver<()>,
    },
    // stop the actor; anything queued behind this is dropped
    Shutdown,
}

#[derive(Clone, Debug)]
pub struct NodeSnapshot<K, V> {
    pub id: usize,
    pub store: HashMap<K, V>,
    pub queue: Vec<ReplicationJob<K, V>>,
}
