// only construction fails; reads return None and writes are fire-and-forget
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    #[error("invalid ring configuration: n={nodes}, w={replicas} (need n > 0, w > 0, w < n)")]
    InvalidConfiguration {
        nodes: usize,
        replicas: usize,
    },

    #[error("invalid store configuration: stripes must be greater than 0")]
    InvalidStripes,

    #[error("no tokio runtime available to host node actors")]
    NoRuntime,
}
