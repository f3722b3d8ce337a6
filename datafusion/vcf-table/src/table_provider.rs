//! DataFusion `TableProvider` for VCF/BCF files.
//!
//! Binding sniffs the storage format, parses the header once, derives the
//! corrected schema, and discovers the sidecar index. `scan` extracts
//! CHROM/POS predicates for index pushdown, plans shards from per-contig
//! index statistics, and hands one partition per shard to the physical
//! operator. Without an index the scan degrades to a single sequential
//! partition with a warning.

use crate::catalog::{CatalogOptions, SampleLayout, VcfCatalog};
use crate::physical_exec::VcfScanExec;
use crate::storage::{sniff_format, VariantFormat, VcfSourceReader};
use async_trait::async_trait;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::catalog::{Session, TableProvider};
use datafusion::datasource::TableType;
use datafusion::logical_expr::{Expr, TableProviderFilterPushDown};
use datafusion::physical_plan::ExecutionPlan;
use datafusion_vcf_table_core::errors::{Result as VcfResult, VcfTableError};
use datafusion_vcf_table_core::genomic_filter::{
    extract_genomic_regions, is_genomic_coordinate_filter, GenomicRegion,
};
use datafusion_vcf_table_core::index_utils::{discover_index, read_index, ContigStats};
use datafusion_vcf_table_core::shard_planner::plan_shards;
use log::{debug, info, warn};
use std::any::Any;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

/// Options controlling table binding.
#[derive(Debug, Clone, Default)]
pub struct VcfTableOptions {
    /// Genomic interval restricting every scan of this table
    /// (`chrom`, `chrom:start`, or `chrom:start-end`, 1-based closed).
    /// Requires an index.
    pub region: Option<String>,
    /// INFO fields to expose (None = all).
    pub info_fields: Option<Vec<String>>,
    /// FORMAT fields to expose (None = all).
    pub format_fields: Option<Vec<String>>,
    /// Per-sample column layout.
    pub sample_layout: SampleLayout,
    /// Explicit index path, bypassing auto-detection.
    pub index_path: Option<PathBuf>,
    /// BGZF decompression worker threads for sequential scans.
    pub thread_num: Option<usize>,
    /// Maximum shard count (None = available parallelism).
    pub target_partitions: Option<usize>,
}

/// A single VCF/BCF file exposed as a DataFusion table.
#[derive(Debug, Clone)]
pub struct VcfTableProvider {
    file_path: String,
    catalog: Arc<VcfCatalog>,
    index_path: Option<PathBuf>,
    contig_stats: Option<Vec<ContigStats>>,
    query_region: Option<GenomicRegion>,
    thread_num: Option<usize>,
    target_partitions: usize,
}

impl VcfTableProvider {
    /// Binds a table to `file_path`: parses the header, derives the
    /// corrected schema, and discovers the index when one exists.
    ///
    /// # Errors
    ///
    /// Returns [`datafusion_vcf_table_core::errors::VcfTableError::Header`]
    /// when the file or its header cannot be read, or when a requested
    /// field is not declared, and
    /// [`datafusion_vcf_table_core::errors::VcfTableError::Index`] when a
    /// `region` option is supplied but no index exists.
    pub fn try_new(file_path: impl Into<String>, options: VcfTableOptions) -> VcfResult<Self> {
        let file_path = file_path.into();
        let query_region = options
            .region
            .as_deref()
            .map(|spec| spec.parse::<GenomicRegion>().map_err(VcfTableError::Index))
            .transpose()?;
        let (format, compression) = sniff_format(&file_path)?;
        debug!("binding {file_path}: format={format:?} compression={compression:?}");

        let mut reader = VcfSourceReader::open(&file_path, options.thread_num)?;
        let header = reader.read_header()?;
        let catalog_options = CatalogOptions {
            info_fields: options.info_fields,
            format_fields: options.format_fields,
            sample_layout: options.sample_layout,
        };
        let catalog = Arc::new(VcfCatalog::from_header(&header, &catalog_options)?);

        let is_bcf = matches!(format, VariantFormat::Bcf);
        let index_path = options
            .index_path
            .or_else(|| discover_index(&file_path, is_bcf));
        // A bound region is a region query: without an index it must fail
        // before any row is produced, never degrade to a full scan.
        if query_region.is_some() && index_path.is_none() {
            return Err(VcfTableError::Index(format!(
                "region query on {file_path} requires an index, none found"
            )));
        }
        let contig_stats = match &index_path {
            Some(path) => {
                let index = read_index(path)?;
                let names = index
                    .contig_names()
                    .unwrap_or_else(|| catalog.contig_names.clone());
                Some(index.contig_stats(&names))
            }
            None => None,
        };

        let target_partitions = options.target_partitions.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        });

        Ok(VcfTableProvider {
            file_path,
            catalog,
            index_path,
            contig_stats,
            query_region,
            thread_num: options.thread_num,
            target_partitions,
        })
    }

    /// Path of the bound file.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// The bound schema catalog.
    pub fn catalog(&self) -> &Arc<VcfCatalog> {
        &self.catalog
    }

    /// Per-contig record-count estimates from the index, when one exists.
    pub fn contig_stats(&self) -> Option<&[ContigStats]> {
        self.contig_stats.as_deref()
    }

    /// Distributes explicit query regions across up to
    /// `target_partitions` partitions, preserving region order.
    fn partition_query_regions(&self, regions: Vec<GenomicRegion>) -> Vec<Vec<GenomicRegion>> {
        let n = self.target_partitions.min(regions.len()).max(1);
        let mut partitions: Vec<Vec<GenomicRegion>> = vec![Vec::new(); n];
        for (i, region) in regions.into_iter().enumerate() {
            partitions[i % n].push(region);
        }
        partitions
    }
}

#[async_trait]
impl TableProvider for VcfTableProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.catalog.schema)
    }

    fn table_type(&self) -> TableType {
        TableType::Base
    }

    fn supports_filters_pushdown(
        &self,
        filters: &[&Expr],
    ) -> datafusion::common::Result<Vec<TableProviderFilterPushDown>> {
        // Coordinate filters narrow the index query, but region overlap is
        // not exact row membership, so DataFusion re-evaluates them.
        Ok(filters
            .iter()
            .map(|f| {
                if self.index_path.is_some() && is_genomic_coordinate_filter(f) {
                    TableProviderFilterPushDown::Inexact
                } else {
                    TableProviderFilterPushDown::Unsupported
                }
            })
            .collect())
    }

    async fn scan(
        &self,
        _state: &dyn Session,
        projection: Option<&Vec<usize>>,
        filters: &[Expr],
        limit: Option<usize>,
    ) -> datafusion::common::Result<Arc<dyn ExecutionPlan>> {
        let analysis = extract_genomic_regions(filters);

        let partition_regions = if let Some(region) = &self.query_region {
            // The bound region restricts the whole table; filters are
            // re-evaluated by the engine on top of it.
            Some(vec![vec![region.clone()]])
        } else if self.index_path.is_some() && !analysis.regions.is_empty() {
            Some(self.partition_query_regions(analysis.regions))
        } else if let Some(stats) = &self.contig_stats {
            let plan = plan_shards(stats, self.target_partitions);
            if plan.is_empty() {
                // An index with no mapped records: nothing to scan.
                Some(vec![Vec::new()])
            } else {
                info!(
                    "{}: planned {} shards over {} contigs",
                    self.file_path,
                    plan.len(),
                    stats.len()
                );
                Some(
                    plan.into_iter()
                        .map(|shard| {
                            shard
                                .contigs
                                .into_iter()
                                .map(GenomicRegion::whole_contig)
                                .collect()
                        })
                        .collect(),
                )
            }
        } else {
            warn!(
                "{}: no index found, degrading to a single sequential shard",
                self.file_path
            );
            None
        };

        Ok(Arc::new(VcfScanExec::new(
            self.file_path.clone(),
            Arc::clone(&self.catalog),
            projection.cloned(),
            limit,
            self.thread_num,
            partition_regions,
            self.index_path.clone(),
        )))
    }
}
