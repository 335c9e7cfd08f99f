use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::topology::key_hash;

// only the owning node actor writes; readers lock a single stripe and never
// wait on the actor's inbox
pub struct StripedDb<K, V> {
    stripes: Vec<Arc<RwLock<HashMap<K, V>>>>,
    num_stripes: usize,
}

// clones share the same stripes
impl<K, V> Clone for StripedDb<K, V> {
    fn clone(&self) -> Self {
        Self {
            stripes: self.stripes.clone(),
            num_stripes: self.num_stripes,
        }
    }
}

impl<K, V> StripedDb<K, V> {
    pub fn new(num_stripes: usize) -> Self {
        let stripes = (0..num_stripes)
            .map(|_| Arc::new(RwLock::new(HashMap::new())))
            .collect();
        Self {
            stripes,
            num_stripes,
        }
    }
}

impl<K, V> StripedDb<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    // high bits pick the stripe, low bits already pick the ring position
    pub fn stripe_index(&self, key: &K) -> usize {
        (key_hash(key).rotate_left(32) as usize) % self.num_stripes
    }

    // get a value
    pub async fn get(&self, key: &K) -> Option<V> {
        let guard = self.stripes[self.stripe_index(key)].read().await;
        guard.get(key).cloned()
    }

    // Stores/replaces the value
    pub async fn put(&self, key: K, value: V) {
        let mut guard = self.stripes[self.stripe_index(&key)].write().await;
        guard.insert(key, value);
    }

    // copy of every entry, one stripe at a time
    pub async fn snapshot(&self) -> HashMap<K, V> {
        let mut all = HashMap::new();
        for stripe in &self.stripes {
            let guard = stripe.read().await;
            all.extend(guard.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        all
    }
}
