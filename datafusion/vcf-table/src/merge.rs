//! Single-threaded merge of shard artifacts into the final dataset.
//!
//! Runs after every shard worker has finished. Surviving artifacts are
//! ordered by contig declaration order and concatenated; optionally the
//! output is laid out Hive-style with one `COLUMN=value/` directory per
//! distinct value of a chosen column.

use crate::catalog::VcfCatalog;
use crate::shard_exec::{ParquetCodec, ShardArtifact};
use datafusion::arrow::array::{BooleanArray, StringArray};
use datafusion::arrow::compute::filter_record_batch;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion_vcf_table_core::errors::{Result, VcfTableError};
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for the merge step.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Output compression codec.
    pub codec: ParquetCodec,
    /// Hive-style partitioning column (typically `CHROM`). The column stays
    /// in the data files.
    pub hive_partition_column: Option<String>,
}

/// The merged dataset: one file, or one file per Hive partition.
#[derive(Debug, Clone)]
pub struct MergedDataset {
    /// Data files, in output order.
    pub files: Vec<PathBuf>,
    /// Total records across all files.
    pub record_count: u64,
}

/// Concatenates surviving shard artifacts into the final dataset under
/// `output_dir`.
///
/// Artifacts are ordered by the declaration order of their first contig, so
/// the merged dataset preserves input contig order. Shard artifacts are
/// deleted after a successful merge.
///
/// # Errors
///
/// Returns [`VcfTableError::Merge`] when zero artifacts survive (every shard
/// failed or was empty) or when the output cannot be written. This is a
/// terminal condition, distinct from a valid scan that returns zero rows.
pub fn merge_artifacts(
    catalog: &VcfCatalog,
    artifacts: &[ShardArtifact],
    output_dir: &Path,
    options: &MergeOptions,
) -> Result<MergedDataset> {
    if artifacts.is_empty() {
        return Err(VcfTableError::Merge(
            "no artifacts survive the scan (all shards failed or were empty)".to_string(),
        ));
    }
    std::fs::create_dir_all(output_dir).map_err(merge_err)?;

    let mut ordered: Vec<&ShardArtifact> = artifacts.iter().collect();
    let order_of = |artifact: &ShardArtifact| {
        artifact
            .contigs
            .first()
            .and_then(|c| catalog.contig_names.iter().position(|n| n == c))
            .unwrap_or(usize::MAX)
    };
    ordered.sort_by_key(|a| (order_of(a), a.shard));

    let dataset = match &options.hive_partition_column {
        None => merge_flat(catalog, &ordered, output_dir, options),
        Some(column) => merge_hive(catalog, &ordered, column, output_dir, options),
    }?;

    for artifact in artifacts {
        let _ = std::fs::remove_file(&artifact.path);
    }
    info!(
        "merged {} artifacts into {} files, {} records",
        artifacts.len(),
        dataset.files.len(),
        dataset.record_count
    );
    Ok(dataset)
}

fn merge_err(e: impl std::fmt::Display) -> VcfTableError {
    VcfTableError::Merge(e.to_string())
}

fn writer_props(options: &MergeOptions) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(options.codec.to_parquet())
        .build()
}

fn read_artifact(artifact: &ShardArtifact) -> Result<impl Iterator<Item = Result<RecordBatch>>> {
    let file = File::open(&artifact.path).map_err(merge_err)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(merge_err)?
        .build()
        .map_err(merge_err)?;
    Ok(reader.map(|batch| batch.map_err(merge_err)))
}

fn merge_flat(
    catalog: &VcfCatalog,
    ordered: &[&ShardArtifact],
    output_dir: &Path,
    options: &MergeOptions,
) -> Result<MergedDataset> {
    let path = output_dir.join("part-00000.parquet");
    let file = File::create(&path).map_err(merge_err)?;
    let mut writer = ArrowWriter::try_new(
        file,
        Arc::clone(&catalog.schema),
        Some(writer_props(options)),
    )
    .map_err(merge_err)?;

    let mut record_count = 0u64;
    for artifact in ordered {
        for batch in read_artifact(artifact)? {
            let batch = batch?;
            record_count += batch.num_rows() as u64;
            writer.write(&batch).map_err(merge_err)?;
        }
        debug!("merged shard {} ({})", artifact.shard, artifact.path.display());
    }
    writer.close().map_err(merge_err)?;
    Ok(MergedDataset {
        files: vec![path],
        record_count,
    })
}

fn merge_hive(
    catalog: &VcfCatalog,
    ordered: &[&ShardArtifact],
    column: &str,
    output_dir: &Path,
    options: &MergeOptions,
) -> Result<MergedDataset> {
    let column_index = catalog
        .schema
        .index_of(column)
        .map_err(|_| merge_err(format!("partition column {column} not in schema")))?;
    if catalog.schema.field(column_index).data_type()
        != &datafusion::arrow::datatypes::DataType::Utf8
    {
        return Err(merge_err(format!(
            "partition column {column} must be a string column"
        )));
    }

    let mut writers: HashMap<String, ArrowWriter<File>> = HashMap::new();
    let mut files: Vec<PathBuf> = Vec::new();
    let mut record_count = 0u64;

    for artifact in ordered {
        for batch in read_artifact(artifact)? {
            let batch = batch?;
            let keys = batch
                .column(column_index)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| merge_err(format!("partition column {column} is not Utf8")))?;

            // Distinct keys in first-seen order; batches are contig-sorted,
            // so this is a handful of values per batch.
            let mut distinct: Vec<&str> = Vec::new();
            for key in keys.iter().flatten() {
                if !distinct.contains(&key) {
                    distinct.push(key);
                }
            }

            for key in distinct {
                let mask: BooleanArray =
                    keys.iter().map(|v| Some(v == Some(key))).collect();
                let part = filter_record_batch(&batch, &mask).map_err(merge_err)?;
                record_count += part.num_rows() as u64;

                if !writers.contains_key(key) {
                    let dir = output_dir.join(format!("{column}={key}"));
                    std::fs::create_dir_all(&dir).map_err(merge_err)?;
                    let path = dir.join("part-00000.parquet");
                    let file = File::create(&path).map_err(merge_err)?;
                    let writer = ArrowWriter::try_new(
                        file,
                        Arc::clone(&catalog.schema),
                        Some(writer_props(options)),
                    )
                    .map_err(merge_err)?;
                    writers.insert(key.to_string(), writer);
                    files.push(path);
                }
                if let Some(writer) = writers.get_mut(key) {
                    writer.write(&part).map_err(merge_err)?;
                }
            }
        }
    }

    for (_, writer) in writers {
        writer.close().map_err(merge_err)?;
    }
    Ok(MergedDataset {
        files,
        record_count,
    })
}
