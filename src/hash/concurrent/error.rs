use thiserror::Error;

/// Rejected map configuration.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("shard count must not be zero")]
    ZeroShards,
    #[error("shard count must be a power of two, got {0}")]
    ShardsNotPowerOfTwo(usize),
}
