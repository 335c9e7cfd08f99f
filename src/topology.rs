use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use crate::error::RingError;

// n nodes, each key held by a band of w consecutive nodes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Topology {
    n: usize,
    w: usize,
}

impl Topology {
    pub fn new(n: usize, w: usize) -> Result<Self, RingError> {
        if n == 0 || w == 0 || w >= n {
            return Err(RingError::InvalidConfiguration {
                nodes: n,
                replicas: w,
            });
        }
        Ok(Self { n, w })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn w(&self) -> usize {
        self.w
    }

    // wraps any position onto the ring
    pub fn node_index(&self, i: u64) -> usize {
        (i % self.n as u64) as usize
    }

    pub fn base_index<K: Hash>(&self, key: &K) -> usize {
        self.node_index(key_hash(key))
    }

    pub fn band_indices<K: Hash>(&self, key: &K) -> Vec<usize> {
        band_from(self.base_index(key), self.n, self.w)
    }

    pub fn is_responsible<K: Hash>(&self, id: usize, key: &K) -> bool {
        self.band_indices(key).contains(&id)
    }
}

// same input gives the same value on every node
pub fn key_hash<K: Hash>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

// Pure function: band of `w` indices starting at `base` on a ring of `n`.
// Separated for testing logic
fn band_from(base: usize, n: usize, w: usize) -> Vec<usize> {
    (0..w).map(|i| (base + i) % n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_parameters() {
        assert!(Topology::new(0, 1).is_err());
        assert!(Topology::new(5, 0).is_err());
        assert!(Topology::new(3, 3).is_err());
        assert!(Topology::new(3, 4).is_err());
        assert!(Topology::new(4, 3).is_ok());
    }

    #[test]
    fn band_has_w_distinct_entries_in_range() {
        for n in 2..8 {
            for w in 1..n {
                let topology = Topology::new(n, w).unwrap();
                for key in 0u64..200 {
                    let band = topology.band_indices(&key);
                    assert_eq!(band.len(), w);
                    assert!(band.iter().all(|i| *i < n));

                    let mut unique = band.clone();
                    unique.sort();
                    unique.dedup();
                    assert_eq!(unique.len(), w);
                }
            }
        }
    }

    #[test]
    fn same_key_same_band() {
        let topology = Topology::new(6, 3).unwrap();
        let a = topology.band_indices(&"dupont");
        let b = topology.band_indices(&"dupont");
        assert_eq!(a, b);
        assert_eq!(a[0], topology.base_index(&"dupont"));
    }

    #[test]
    fn band_depends_only_on_hash() {
        // two rings with the same (n, w) agree on every key
        let a = Topology::new(7, 2).unwrap();
        let b = Topology::new(7, 2).unwrap();
        for key in ["a", "b", "dupont", "durand"] {
            assert_eq!(a.band_indices(&key), b.band_indices(&key));
            assert_eq!(a.base_index(&key), (key_hash(&key) % 7) as usize);
        }
    }

    #[test]
    fn band_is_contiguous_on_ring() {
        let topology = Topology::new(5, 3).unwrap();
        let band = topology.band_indices(&7u64);
        for i in 1..band.len() {
            assert_eq!(band[i], (band[i - 1] + 1) % 5);
        }
    }

    #[test]
    fn band_wraps_around_ring() {
        assert_eq!(band_from(4, 5, 3), vec![4, 0, 1]);
        assert_eq!(band_from(0, 5, 3), vec![0, 1, 2]);
    }

    #[test]
    fn node_index_wraps() {
        let topology = Topology::new(6, 3).unwrap();
        assert_eq!(topology.node_index(0), 0);
        assert_eq!(topology.node_index(6), 0);
        assert_eq!(topology.node_index(13), 1);
        assert_eq!(topology.node_index(u64::MAX), (u64::MAX % 6) as usize);
    }

    #[test]
    fn responsibility_matches_band_membership() {
        let topology = Topology::new(6, 2).unwrap();
        for key in 0u64..100 {
            let band = topology.band_indices(&key);
            for id in 0..6 {
                assert_eq!(topology.is_responsible(id, &key), band.contains(&id));
            }
        }
    }

    #[test]
    fn widest_band_leaves_one_node_out() {
        let topology = Topology::new(5, 4).unwrap();
        for key in 0u64..50 {
            let band = topology.band_indices(&key);
            let outside: Vec<usize> = (0..5).filter(|id| !band.contains(id)).collect();
            assert_eq!(outside.len(), 1);
        }
    }

    #[test]
    fn different_keys_distribute() {
        let topology = Topology::new(5, 1).unwrap();
        let mut base_counts = vec![0usize; 5];
        for key in 0u64..1000 {
            base_counts[topology.base_index(&key)] += 1;
        }
        for (i, count) in base_counts.iter().enumerate() {
            assert!(
                *count > 50,
                "node {} only got {} keys out of 1000, distribution looks broken",
                i,
                count
            );
        }
    }
}
