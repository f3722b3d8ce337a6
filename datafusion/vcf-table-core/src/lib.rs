//! Core utilities for the DataFusion VCF/BCF table provider
//!
//! This crate provides the format-independent infrastructure behind
//! `datafusion-vcf-table`:
//!
//! - **Field Specification Tables**: the reserved INFO/FORMAT field
//!   definitions from the VCF specification, used for bind-time schema
//!   conformance checking and correction
//! - **Index Utilities**: tabix/CSI sidecar discovery and per-contig record
//!   statistics for shard planning
//! - **Shard Planning**: contig-based, order-preserving distribution of work
//!   across parallel scan shards
//! - **Genomic Filter Extraction**: turning SQL `WHERE` clauses on
//!   `CHROM`/`POS` into index region queries
//! - **Table Utilities**: Arrow builder helpers for dynamically typed variant
//!   columns
//!
//! Most users will depend on `datafusion-vcf-table` rather than using this
//! crate directly.

#![warn(missing_docs)]

/// Error taxonomy shared by binding, scanning, and merging.
pub mod errors;
/// Reserved INFO/FORMAT field specifications and conformance checks.
pub mod field_spec;
/// Genomic region extraction from DataFusion filter expressions.
pub mod genomic_filter;
/// Index discovery and per-contig statistics.
pub mod index_utils;
/// Contig-based shard planning for parallel scans.
pub mod shard_planner;
/// Arrow builder utilities for dynamically typed columns.
pub mod table_utils;

pub use errors::{Result, VcfTableError};
pub use field_spec::{
    check_cardinality, reserved_format, reserved_info, Cardinality, CardinalityCheck, FieldSpec,
    ValueKind,
};
pub use genomic_filter::{
    extract_genomic_regions, is_genomic_coordinate_filter, GenomicFilterAnalysis, GenomicRegion,
};
pub use index_utils::{discover_index, read_index, ContigStats, VariantIndex};
pub use shard_planner::{plan_shards, ShardAssignment};
