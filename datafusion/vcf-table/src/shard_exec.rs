//! Per-shard scan workers writing Parquet artifacts.
//!
//! Each shard worker is fully independent: it opens its own reader, header,
//! and index, scans its assigned contigs through the projector, and writes
//! one Parquet artifact. A failing shard is logged and excluded from the
//! merge; the remaining shards keep running.

use crate::catalog::VcfCatalog;
use crate::cursor::RecordCursor;
use crate::projector::BatchAccumulator;
use datafusion_vcf_table_core::errors::{Result, VcfTableError};
use datafusion_vcf_table_core::genomic_filter::GenomicRegion;
use datafusion_vcf_table_core::shard_planner::ShardAssignment;
use log::{debug, warn};
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compression codec for shard artifacts and merged output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParquetCodec {
    /// No compression.
    None,
    /// Snappy (default).
    #[default]
    Snappy,
    /// Gzip at the default level.
    Gzip,
    /// Brotli at the default level.
    Brotli,
    /// Zstandard at the default level.
    Zstd,
}

impl ParquetCodec {
    pub(crate) fn to_parquet(self) -> Compression {
        match self {
            ParquetCodec::None => Compression::UNCOMPRESSED,
            ParquetCodec::Snappy => Compression::SNAPPY,
            ParquetCodec::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCodec::Brotli => Compression::BROTLI(BrotliLevel::default()),
            ParquetCodec::Zstd => Compression::ZSTD(ZstdLevel::default()),
        }
    }
}

/// Options for shard artifact writing.
#[derive(Debug, Clone)]
pub struct ShardWriteOptions {
    /// Artifact compression codec.
    pub codec: ParquetCodec,
    /// Target Parquet row group size.
    pub row_group_size: usize,
    /// Record batch size used while scanning.
    pub batch_size: usize,
    /// Decompression worker threads for sequential BGZF scans.
    pub thread_num: Option<usize>,
}

impl Default for ShardWriteOptions {
    fn default() -> Self {
        ShardWriteOptions {
            codec: ParquetCodec::default(),
            row_group_size: 100_000,
            batch_size: 8192,
            thread_num: None,
        }
    }
}

/// One finished shard artifact, ready for the merge.
#[derive(Debug, Clone)]
pub struct ShardArtifact {
    /// Shard index within the plan.
    pub shard: usize,
    /// Path of the Parquet artifact.
    pub path: PathBuf,
    /// Contigs covered, in declaration order.
    pub contigs: Vec<String>,
    /// Records written.
    pub record_count: u64,
}

/// Outcome of a sharded scan: surviving artifacts plus the counts of shards
/// excluded from the merge.
#[derive(Debug)]
pub struct ShardScanSummary {
    /// Artifacts with at least one record, in plan order.
    pub artifacts: Vec<ShardArtifact>,
    /// Shards that failed and were excluded.
    pub failed_shards: usize,
    /// Shards that scanned cleanly but produced zero records.
    pub empty_shards: usize,
}

fn shard_err(shard: usize, e: impl std::fmt::Display) -> VcfTableError {
    VcfTableError::Shard {
        shard,
        message: e.to_string(),
    }
}

/// Scans one shard's contigs and writes its Parquet artifact.
///
/// With `contigs` empty the whole file is scanned sequentially (the
/// degraded single-shard plan used when no index exists).
///
/// # Errors
///
/// Returns [`VcfTableError::Shard`] on any failure; the caller decides
/// whether to isolate or propagate it.
pub fn execute_shard(
    file_path: &str,
    index_path: Option<PathBuf>,
    catalog: &VcfCatalog,
    contigs: &[String],
    shard: usize,
    output_dir: &Path,
    options: &ShardWriteOptions,
) -> Result<ShardArtifact> {
    let path = output_dir.join(format!("shard-{shard:05}.parquet"));
    let file = File::create(&path).map_err(|e| shard_err(shard, e))?;
    let props = WriterProperties::builder()
        .set_compression(options.codec.to_parquet())
        .set_max_row_group_size(options.row_group_size)
        .build();
    let mut writer = ArrowWriter::try_new(file, Arc::clone(&catalog.schema), Some(props))
        .map_err(|e| shard_err(shard, e))?;
    let mut acc = BatchAccumulator::new(catalog, None, options.batch_size)
        .map_err(|e| shard_err(shard, e))?;
    let mut record_count = 0u64;

    let scan = |acc: &mut BatchAccumulator,
                writer: &mut ArrowWriter<File>,
                record_count: &mut u64|
     -> Result<()> {
        if contigs.is_empty() {
            let mut cursor = RecordCursor::open_sequential(file_path, options.thread_num)?;
            let header = Arc::clone(cursor.header());
            while let Some(record) = cursor.next_record()? {
                acc.append(&header, record.as_variant())?;
                *record_count += 1;
                if acc.len() >= options.batch_size {
                    writer.write(&acc.finish()?).map_err(|e| shard_err(shard, e))?;
                }
            }
            cursor.close();
        } else {
            let mut cursor = RecordCursor::open_indexed(file_path, index_path.clone())?;
            for contig in contigs {
                let region = GenomicRegion::whole_contig(contig.clone());
                cursor.visit_region(&region, |header, record| {
                    acc.append(header, record.as_variant())?;
                    *record_count += 1;
                    if acc.len() >= options.batch_size {
                        writer
                            .write(&acc.finish()?)
                            .map_err(|e| shard_err(shard, e))?;
                    }
                    Ok(true)
                })?;
            }
            cursor.close();
        }
        Ok(())
    };

    let wrap = |e: VcfTableError| match e {
        VcfTableError::Shard { .. } => e,
        other => shard_err(shard, other),
    };

    let finish = |acc: &mut BatchAccumulator, writer: &mut ArrowWriter<File>| -> Result<()> {
        if !acc.is_empty() {
            writer
                .write(&acc.finish()?)
                .map_err(|e| shard_err(shard, e))?;
        }
        Ok(())
    };

    if let Err(e) = scan(&mut acc, &mut writer, &mut record_count)
        .and_then(|_| finish(&mut acc, &mut writer))
    {
        // Remove the partial artifact so the merge never sees it.
        let _ = std::fs::remove_file(&path);
        return Err(wrap(e));
    }
    writer.close().map_err(|e| shard_err(shard, e))?;

    debug!("shard {shard}: {record_count} records into {}", path.display());
    Ok(ShardArtifact {
        shard,
        path,
        contigs: contigs.to_vec(),
        record_count,
    })
}

/// Runs one worker thread per shard and collects the surviving artifacts.
///
/// Shard failures are isolated: the failure is logged, its artifact is
/// dropped, and the other shards complete normally. Empty-result shards are
/// excluded from the merge without being errors. Both exclusions are counted
/// in the returned summary; surviving artifacts keep plan order.
pub fn run_sharded_scan(
    file_path: &str,
    index_path: Option<PathBuf>,
    catalog: &Arc<VcfCatalog>,
    plan: &[ShardAssignment],
    output_dir: &Path,
    options: &ShardWriteOptions,
) -> Result<ShardScanSummary> {
    std::fs::create_dir_all(output_dir)?;

    let results: Vec<Result<ShardArtifact>> = std::thread::scope(|scope| {
        let handles: Vec<_> = plan
            .iter()
            .enumerate()
            .map(|(shard, assignment)| {
                let index_path = index_path.clone();
                scope.spawn(move || {
                    execute_shard(
                        file_path,
                        index_path,
                        catalog,
                        &assignment.contigs,
                        shard,
                        output_dir,
                        options,
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(shard, handle)| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(shard_err(shard, "worker panicked")))
            })
            .collect()
    });

    let mut summary = ShardScanSummary {
        artifacts: Vec::with_capacity(results.len()),
        failed_shards: 0,
        empty_shards: 0,
    };
    for result in results {
        match result {
            Ok(artifact) if artifact.record_count == 0 => {
                debug!("excluding empty shard {}", artifact.shard);
                let _ = std::fs::remove_file(&artifact.path);
                summary.empty_shards += 1;
            }
            Ok(artifact) => summary.artifacts.push(artifact),
            Err(e) => {
                warn!("excluding failed shard: {e}");
                summary.failed_shards += 1;
            }
        }
    }
    Ok(summary)
}
