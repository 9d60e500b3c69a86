//! Node and cluster configuration.
//!
//! Everything here is plain data supplied at startup and immutable for
//! the run. [`ClusterConfig::validate`] catches every inconsistency before
//! any process starts exchanging messages.

use halo_core::{Aoi, ConfigError, GlobalDomain, IntRect};
use halo_space::{validate_aoi, GridPartition, Partition, RectPartition};
use std::sync::Arc;
use std::time::Duration;

// ── NodeConfig ─────────────────────────────────────────────────────

/// Per-process synchronisation settings. Must be identical on every
/// process of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfig {
    /// Halo radius per axis. Default: 1.
    pub aoi: Aoi,
    /// Longest a single blocking wait may last. `None` waits forever.
    /// Default: 30 s.
    pub exchange_timeout: Option<Duration>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            aoi: Aoi::uniform(1),
            exchange_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl NodeConfig {
    /// Check settings that do not depend on the partition.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exchange_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

// ── PartitionScheme ────────────────────────────────────────────────

/// How the domain is cut into owned regions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionScheme {
    /// `px × py` uniform blocks.
    Grid {
        /// Blocks per row.
        px: u32,
        /// Blocks per column.
        py: u32,
    },
    /// Most square factorisation of the partition count.
    Balanced,
    /// One rectangle per pid.
    Explicit(Vec<IntRect>),
}

// ── ClusterConfig ──────────────────────────────────────────────────

/// Everything needed to build the same partition on every process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterConfig {
    /// The global domain.
    pub domain: GlobalDomain,
    /// Number of processes.
    pub partitions: u32,
    /// Decomposition scheme.
    pub scheme: PartitionScheme,
    /// Per-node settings.
    pub node: NodeConfig,
}

impl ClusterConfig {
    /// Validate the configuration, including the AOI against the
    /// resulting partition.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build_partition().map(|_| ())
    }

    /// Build the partition described by this configuration.
    pub fn build_partition(&self) -> Result<Arc<dyn Partition>, ConfigError> {
        self.node.validate()?;
        if self.partitions == 0 {
            return Err(ConfigError::ZeroPartitions);
        }
        let partition: Arc<dyn Partition> = match &self.scheme {
            PartitionScheme::Grid { px, py } => {
                Arc::new(GridPartition::new(self.domain, *px, *py)?)
            }
            PartitionScheme::Balanced => {
                Arc::new(GridPartition::balanced(self.domain, self.partitions)?)
            }
            PartitionScheme::Explicit(rects) => {
                Arc::new(RectPartition::new(self.domain, rects.clone())?)
            }
        };
        if partition.num_partitions() != self.partitions as usize {
            return Err(ConfigError::GroupSizeMismatch {
                partitions: partition.num_partitions(),
                group: self.partitions as usize,
            });
        }
        validate_aoi(partition.as_ref(), self.node.aoi)?;
        Ok(partition)
    }
}
