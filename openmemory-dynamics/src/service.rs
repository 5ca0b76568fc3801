use std::sync::Arc;

use openmemory_core::config::{DecayConfig, DynamicsConfig};
use openmemory_core::errors::OpenMemoryResult;
use openmemory_core::traits::{Clock, MemoryRepository, VectorRepository, WaypointRepository};

use crate::decay::decay_batch;

/// Outcome of one `run_decay_sweep` call.
#[derive(Debug, Clone, Default)]
pub struct SweepStats {
    pub rows_scanned: u64,
    pub rows_flagged_cold: u64,
    pub orphan_vectors_pruned: u64,
    pub waypoints_pruned: u64,
}

/// Owns the repositories the scheduled decay sweep needs
/// (`spec.md` §4.6's last paragraph): batched fetch, in-batch decay
/// computation, write-back, then orphan pruning, bounded by
/// `sweep_ratio`/`sweep_batch_size` and paced by `sweep_sleep_ms`.
pub struct DynamicsService {
    memories: Arc<dyn MemoryRepository>,
    vectors: Arc<dyn VectorRepository>,
    waypoints: Arc<dyn WaypointRepository>,
    clock: Arc<dyn Clock>,
    decay: DecayConfig,
    #[allow(dead_code)]
    dynamics: DynamicsConfig,
}

impl DynamicsService {
    pub fn new(
        memories: Arc<dyn MemoryRepository>,
        vectors: Arc<dyn VectorRepository>,
        waypoints: Arc<dyn WaypointRepository>,
        clock: Arc<dyn Clock>,
        decay: DecayConfig,
        dynamics: DynamicsConfig,
    ) -> Self {
        Self { memories, vectors, waypoints, clock, decay, dynamics }
    }

    /// `spec.md` §4.6: processes at most `sweep_ratio·totalCount` rows in
    /// batches of `sweep_batch_size`, sleeping `sweep_sleep_ms` between
    /// batches, then prunes orphaned vectors and sub-threshold waypoints.
    pub async fn run_decay_sweep(&self) -> OpenMemoryResult<SweepStats> {
        let mut stats = SweepStats::default();
        let total = self.memories.total_count().await?;
        let budget = ((total as f64) * self.decay.sweep_ratio).ceil() as u64;
        let mut offset = 0u64;
        let now = self.clock.now();

        while stats.rows_scanned < budget {
            let remaining = budget - stats.rows_scanned;
            let page_size = self.decay.sweep_batch_size as u64;
            let batch = self.memories.list_page(offset, page_size.min(remaining)).await?;
            if batch.is_empty() {
                break;
            }

            let outcomes = decay_batch(&batch, now, self.decay.cold_threshold);
            for (memory, outcome) in batch.iter().zip(outcomes.iter()) {
                let mut updated = memory.clone();
                updated.salience = outcome.new_salience;
                if let Err(err) = self.memories.update(&updated).await {
                    tracing::warn!(error = %err, memory_id = %memory.id, "decay sweep update failed, continuing");
                    continue;
                }
                stats.rows_scanned += 1;
                if outcome.is_cold {
                    stats.rows_flagged_cold += 1;
                }
            }

            offset += batch.len() as u64;
            if (offset as u64) >= total {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(self.decay.sweep_sleep_ms)).await;
        }

        stats.orphan_vectors_pruned = self.vectors.cleanup_orphaned().await?;
        stats.waypoints_pruned = self.waypoints.prune_below(self.decay.prune_threshold).await?;

        Ok(stats)
    }
}
