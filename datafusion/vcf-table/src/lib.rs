//! VCF/BCF file format support for Apache DataFusion
//!
//! This crate exposes VCF and BCF variant files as queryable typed columnar
//! tables. The table schema is derived from the file header at bind time and
//! checked against the reserved field definitions of the VCF specification;
//! mis-declared cardinalities on reserved fields are corrected with a warning.
//!
//! # Features
//!
//! - Direct SQL queries on VCF/BCF files via DataFusion
//! - Compression sniffing by magic bytes (plain, GZIP, BGZF)
//! - Indexed region queries (`.tbi` / `.csi`) with CHROM/POS predicate
//!   pushdown
//! - Contig-based shard planning from index statistics, one partition per
//!   shard
//! - Wide, genotype-only, and tidy (one row per variant-sample pair) layouts
//! - Sharded Parquet export with an ordered, optionally Hive-partitioned
//!   merge
//!
//! # Schema
//!
//! Core columns `CHROM`, `POS`, `ID`, `REF`, `ALT`, `QUAL`, `FILTER` are
//! followed by one column per INFO field (named exactly as declared) and the
//! per-sample FORMAT block: `FORMAT_<field>_<sample>` in wide mode,
//! `GT_<sample>` in the genotype-only layout, or a `SAMPLE_ID` column plus
//! `FORMAT_<field>` columns in tidy mode.
//!
//! # Example
//!
//! ```rust,no_run
//! use datafusion::prelude::*;
//! use datafusion_vcf_table::{VcfTableOptions, VcfTableProvider};
//! use std::sync::Arc;
//!
//! # async fn example() -> datafusion::error::Result<()> {
//! let ctx = SessionContext::new();
//!
//! let table = VcfTableProvider::try_new(
//!     "data/variants.vcf.gz",
//!     VcfTableOptions::default(),
//! )?;
//! ctx.register_table("variants", Arc::new(table))?;
//!
//! let df = ctx.sql("
//!     SELECT \"CHROM\", \"POS\", \"REF\", \"ALT\"
//!     FROM variants
//!     WHERE \"CHROM\" = 'chr1' AND \"POS\" BETWEEN 1000000 AND 2000000
//!     LIMIT 10
//! ").await?;
//! df.show().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Important Notes
//!
//! - INFO and FORMAT field names are case-sensitive per VCF specification
//! - Region queries require an index; full scans without one degrade to a
//!   single sequential shard

#![warn(missing_docs)]

/// Bind-time schema catalog: header parsing, conformance checking, column
/// naming, schema metadata.
pub mod catalog;
/// Streaming record cursor over a single file: sequential iteration or
/// indexed region queries.
pub mod cursor;
/// Ordered merge of shard artifacts into the final dataset.
pub mod merge;
/// Physical execution plan implementation for VCF/BCF scans.
mod physical_exec;
/// Column projection and record decoding into Arrow batches.
pub mod projector;
/// Per-shard scan workers writing Parquet artifacts.
pub mod shard_exec;
/// Storage layer: format sniffing and compressed reader construction.
pub mod storage;
/// DataFusion table provider implementation for VCF/BCF files.
pub mod table_provider;

pub use catalog::{CatalogOptions, SampleLayout, VcfCatalog};
pub use merge::{merge_artifacts, MergeOptions, MergedDataset};
pub use shard_exec::{
    run_sharded_scan, ParquetCodec, ShardArtifact, ShardScanSummary, ShardWriteOptions,
};
pub use table_provider::{VcfTableOptions, VcfTableProvider};
