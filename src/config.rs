use clap::Parser;

pub const DEFAULT_STRIPES: usize = 16;

/// Parameters of one ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingConfig {
    /// number of nodes on the ring (n)
    pub nodes: usize,
    /// how many consecutive nodes hold each key (w)
    pub replicas: usize,
    /// locked sections in each node's store
    pub stripes: usize,
}

impl RingConfig {
    pub fn new(nodes: usize, replicas: usize) -> Self {
        Self {
            nodes,
            replicas,
            stripes: DEFAULT_STRIPES,
        }
    }

    pub fn with_stripes(mut self, stripes: usize) -> Self {
        self.stripes = stripes;
        self
    }
}

/// Times ring writes until settled for a range of band widths
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Config {
    /// Number of nodes on the ring
    #[arg(short, long, default_value = "6")]
    pub nodes: usize,

    /// Band widths to compare, one run each
    #[arg(short = 'w', long, value_delimiter = ',', default_value = "1,2,3")]
    pub replicas: Vec<usize>,

    /// Number of writes per run
    #[arg(short = 'x', long, default_value = "10000")]
    pub ops: usize,

    /// Range of keys
    #[arg(short, long, default_value = "1000")]
    pub key_range: u64,

    /// How many locked sections in each node's store
    #[arg(short, long, default_value = "16")]
    pub stripes: usize,

    /// Threads in the runtime hosting the node actors
    #[arg(short = 't', long, default_value = "4")]
    pub worker_threads: usize,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn ring_config(&self, replicas: usize) -> RingConfig {
        RingConfig::new(self.nodes, replicas).with_stripes(self.stripes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_replica_list() {
        let config = Config::parse_from(["ringkv", "-n", "8", "-w", "1,3,5", "-x", "50"]);
        assert_eq!(config.nodes, 8);
        assert_eq!(config.replicas, vec![1, 3, 5]);
        assert_eq!(config.ops, 50);
        assert_eq!(config.stripes, DEFAULT_STRIPES);
        assert_eq!(config.ring_config(3), RingConfig::new(8, 3));
    }

    #[test]
    fn defaults() {
        let config = Config::parse_from(["ringkv"]);
        assert_eq!(config.nodes, 6);
        assert_eq!(config.replicas, vec![1, 2, 3]);
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.log_level, "info");
    }
}
