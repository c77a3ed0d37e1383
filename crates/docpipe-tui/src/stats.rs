//! Lifetime counters kept in the durable store — survive task resets and
//! sessions.

use serde::{Deserialize, Serialize};

use docpipe_proto::store::{keys, DurableStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub tasks_completed: u64,
    pub metrics_extracted: u64,
    pub rows_loaded: u64,
}

#[derive(Debug, Clone, Default)]
pub struct LifetimeStats {
    pub documents_processed: u64,
    pub aggregate: AggregateStats,
}

impl LifetimeStats {
    pub fn restore(durable: &DurableStore) -> Self {
        Self {
            documents_processed: durable.get(keys::LIFETIME_PROCESSED).unwrap_or(0),
            aggregate: durable.get(keys::AGGREGATE_STATS).unwrap_or_default(),
        }
    }

    /// Record one successful pipeline completion.
    pub fn record_completion(
        &mut self,
        durable: &mut DurableStore,
        documents: u64,
        metrics: u64,
        rows_loaded: u64,
    ) {
        self.documents_processed += documents;
        self.aggregate.tasks_completed += 1;
        self.aggregate.metrics_extracted += metrics;
        self.aggregate.rows_loaded += rows_loaded;
        if let Err(e) = durable.put(keys::LIFETIME_PROCESSED, &self.documents_processed) {
            tracing::warn!("stats: failed to persist counter: {}", e);
        }
        if let Err(e) = durable.put(keys::AGGREGATE_STATS, &self.aggregate) {
            tracing::warn!("stats: failed to persist aggregates: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_across_restores() {
        let dir = tempfile::tempdir().unwrap();
        let mut durable = DurableStore::open(dir.path().join("durable.json"));

        let mut stats = LifetimeStats::restore(&durable);
        stats.record_completion(&mut durable, 2, 3, 12);
        stats.record_completion(&mut durable, 1, 2, 5);

        let restored = LifetimeStats::restore(&durable);
        assert_eq!(restored.documents_processed, 3);
        assert_eq!(restored.aggregate.tasks_completed, 2);
        assert_eq!(restored.aggregate.rows_loaded, 17);
    }
}
