//! Contig-based shard planning for parallel VCF/BCF scans.
//!
//! When an index is available, this module distributes contigs across a
//! target number of shards using index-derived record counts. Contigs are
//! never split: each shard owns whole contigs, kept in header declaration
//! order, so concatenating shard outputs in shard order reproduces the
//! file's global record order.

use crate::index_utils::ContigStats;
use log::debug;

/// One shard's assignment: contigs scanned sequentially, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardAssignment {
    /// Contigs assigned to this shard, in header declaration order.
    pub contigs: Vec<String>,
    /// Sum of index-reported record counts across the assigned contigs.
    pub estimated_records: u64,
}

/// Distributes non-empty contigs across at most `max_shards` shards.
///
/// # Algorithm
///
/// Walk the contigs in declaration order, maintaining a record-count budget
/// per shard. A shard closes when its budget is reached, or when exactly one
/// contig remains per unopened shard. Empty contigs (zero indexed records)
/// are dropped up front, so every returned shard scans at least one contig
/// and the shard count is `min(max_shards, non-empty contigs)`.
///
/// # Edge cases
///
/// - No non-empty contigs → empty plan (callers degrade to a single
///   unsharded scan or an empty result).
/// - `max_shards == 0` is treated as 1.
/// - One oversized contig can exceed its budget; it still occupies a single
///   shard because contigs are atomic.
pub fn plan_shards(stats: &[ContigStats], max_shards: usize) -> Vec<ShardAssignment> {
    let nonempty: Vec<&ContigStats> = stats.iter().filter(|s| s.record_count > 0).collect();
    if nonempty.is_empty() {
        return Vec::new();
    }

    let num_shards = max_shards.max(1).min(nonempty.len());
    let total_records: u64 = nonempty.iter().map(|s| s.record_count).sum();

    // Per-shard budgets: distribute total_records evenly, remainder to the
    // first shards.
    let base_budget = total_records / num_shards as u64;
    let extra = (total_records % num_shards as u64) as usize;
    let budget_for = |idx: usize| -> u64 {
        if idx < extra {
            base_budget + 1
        } else {
            base_budget
        }
    };

    let mut shards: Vec<ShardAssignment> = Vec::with_capacity(num_shards);
    let mut current = ShardAssignment {
        contigs: Vec::new(),
        estimated_records: 0,
    };

    for (pos, stat) in nonempty.iter().enumerate() {
        current.contigs.push(stat.name.clone());
        current.estimated_records += stat.record_count;

        let remaining_contigs = nonempty.len() - pos - 1;
        let remaining_shards = num_shards - shards.len() - 1;
        let budget_reached = current.estimated_records >= budget_for(shards.len());
        let must_close = remaining_contigs == remaining_shards;

        if remaining_shards > 0 && (budget_reached || must_close) {
            shards.push(std::mem::replace(
                &mut current,
                ShardAssignment {
                    contigs: Vec::new(),
                    estimated_records: 0,
                },
            ));
        }
    }
    shards.push(current);

    debug!(
        "planned {} shard(s) over {} contig(s), {} record(s) total",
        shards.len(),
        nonempty.len(),
        total_records
    );

    shards
}
