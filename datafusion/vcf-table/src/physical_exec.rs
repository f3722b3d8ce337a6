//! Physical scan operator for VCF/BCF tables.
//!
//! Each partition runs its scan on a dedicated OS thread and streams record
//! batches back through a bounded channel, so at most a few batches are in
//! flight regardless of file size. With an index and shard assignments, every
//! partition queries its own contigs through its own cursor; without an index
//! the whole file is read sequentially by a single partition.

use crate::catalog::VcfCatalog;
use crate::cursor::RecordCursor;
use crate::projector::{projected_schema, BatchAccumulator};
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::common::DataFusionError;
use datafusion::execution::{SendableRecordBatchStream, TaskContext};
use datafusion::physical_expr::{EquivalenceProperties, Partitioning};
use datafusion::physical_plan::stream::RecordBatchStreamAdapter;
use datafusion::physical_plan::{
    execution_plan::{Boundedness, EmissionType},
    DisplayAs, DisplayFormatType, ExecutionPlan, PlanProperties,
};
use datafusion_vcf_table_core::genomic_filter::GenomicRegion;
use futures::channel::mpsc::Sender;
use futures::StreamExt;
use log::{debug, info};
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

pub struct VcfScanExec {
    pub(crate) file_path: String,
    pub(crate) catalog: Arc<VcfCatalog>,
    pub(crate) projection: Option<Vec<usize>>,
    pub(crate) limit: Option<usize>,
    pub(crate) thread_num: Option<usize>,
    /// Region assignments per partition (None = sequential full scan).
    pub(crate) partition_regions: Option<Vec<Vec<GenomicRegion>>>,
    pub(crate) index_path: Option<PathBuf>,
    pub(crate) cache: PlanProperties,
    projected: SchemaRef,
}

impl VcfScanExec {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        file_path: String,
        catalog: Arc<VcfCatalog>,
        projection: Option<Vec<usize>>,
        limit: Option<usize>,
        thread_num: Option<usize>,
        partition_regions: Option<Vec<Vec<GenomicRegion>>>,
        index_path: Option<PathBuf>,
    ) -> Self {
        let projected = projected_schema(&catalog.schema, projection.as_ref());
        let num_partitions = partition_regions.as_ref().map_or(1, Vec::len).max(1);
        let cache = PlanProperties::new(
            EquivalenceProperties::new(projected.clone()),
            Partitioning::UnknownPartitioning(num_partitions),
            EmissionType::Final,
            Boundedness::Bounded,
        );
        VcfScanExec {
            file_path,
            catalog,
            projection,
            limit,
            thread_num,
            partition_regions,
            index_path,
            cache,
            projected,
        }
    }
}

impl Debug for VcfScanExec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VcfScanExec")
            .field("file_path", &self.file_path)
            .field("projection", &self.projection)
            .finish()
    }
}

impl DisplayAs for VcfScanExec {
    fn fmt_as(&self, _t: DisplayFormatType, f: &mut Formatter) -> std::fmt::Result {
        let proj_str = match &self.projection {
            Some(_) => self
                .projected
                .fields()
                .iter()
                .map(|f| f.name().as_str())
                .collect::<Vec<_>>()
                .join(", "),
            None => "*".to_string(),
        };
        write!(f, "VcfScanExec: projection=[{proj_str}]")
    }
}

impl ExecutionPlan for VcfScanExec {
    fn name(&self) -> &str {
        "VcfScanExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn properties(&self) -> &PlanProperties {
        &self.cache
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        _children: Vec<Arc<dyn ExecutionPlan>>,
    ) -> datafusion::common::Result<Arc<dyn ExecutionPlan>> {
        Ok(self)
    }

    fn execute(
        &self,
        partition: usize,
        context: Arc<TaskContext>,
    ) -> datafusion::common::Result<SendableRecordBatchStream> {
        info!(
            "{}: executing partition={} on {}",
            self.name(),
            partition,
            self.file_path
        );
        let batch_size = context.session_config().batch_size();
        let schema = Arc::clone(&self.projected);
        let (mut tx, rx) = futures::channel::mpsc::channel::<Result<RecordBatch, ArrowError>>(2);

        let file_path = self.file_path.clone();
        let catalog = Arc::clone(&self.catalog);
        let projection = self.projection.clone();
        let limit = self.limit;

        match &self.partition_regions {
            Some(assignments) => {
                let regions = assignments
                    .get(partition)
                    .ok_or_else(|| {
                        DataFusionError::Internal(format!(
                            "partition {partition} out of range ({} assigned)",
                            assignments.len()
                        ))
                    })?
                    .clone();
                let index_path = self.index_path.clone();
                std::thread::spawn(move || {
                    let scan = || -> Result<(), DataFusionError> {
                        scan_regions(
                            &file_path, index_path, &regions, &catalog, projection, batch_size,
                            limit, &mut tx,
                        )
                    };
                    if let Err(e) = scan() {
                        send_error(&mut tx, e);
                    }
                });
            }
            None => {
                if partition != 0 {
                    return Err(DataFusionError::Internal(format!(
                        "partition {partition} out of range for a sequential scan"
                    )));
                }
                let thread_num = self.thread_num;
                std::thread::spawn(move || {
                    let scan = || -> Result<(), DataFusionError> {
                        scan_sequential(
                            &file_path, thread_num, &catalog, projection, batch_size, limit,
                            &mut tx,
                        )
                    };
                    if let Err(e) = scan() {
                        send_error(&mut tx, e);
                    }
                });
            }
        }

        let stream = rx.map(|item| item.map_err(|e| DataFusionError::ArrowError(e, None)));
        Ok(Box::pin(RecordBatchStreamAdapter::new(schema, stream)))
    }
}

/// Sends one batch with backpressure. Returns false when the consumer is
/// gone and the scan should stop.
fn send_batch(tx: &mut Sender<Result<RecordBatch, ArrowError>>, batch: RecordBatch) -> bool {
    loop {
        match tx.try_send(Ok(batch.clone())) {
            Ok(()) => return true,
            Err(e) if e.is_disconnected() => return false,
            Err(_) => std::thread::yield_now(),
        }
    }
}

/// Delivers a scan failure with the same backpressure loop as data batches.
/// A full channel must never swallow the error, or the stream would end
/// cleanly with partial rows.
fn send_error(tx: &mut Sender<Result<RecordBatch, ArrowError>>, e: DataFusionError) {
    let mut item = Err(ArrowError::ExternalError(Box::new(e)));
    loop {
        match tx.try_send(item) {
            Ok(()) => return,
            Err(e) if e.is_disconnected() => return,
            Err(e) => {
                item = e.into_inner();
                std::thread::yield_now();
            }
        }
    }
}

fn arrow_err(e: ArrowError) -> DataFusionError {
    DataFusionError::ArrowError(e, None)
}

#[allow(clippy::too_many_arguments)]
fn scan_regions(
    file_path: &str,
    index_path: Option<PathBuf>,
    regions: &[GenomicRegion],
    catalog: &VcfCatalog,
    projection: Option<Vec<usize>>,
    batch_size: usize,
    limit: Option<usize>,
    tx: &mut Sender<Result<RecordBatch, ArrowError>>,
) -> Result<(), DataFusionError> {
    let mut cursor = RecordCursor::open_indexed(file_path, index_path)?;
    let mut acc = BatchAccumulator::new(catalog, projection, batch_size).map_err(arrow_err)?;
    let mut total_records = 0usize;
    let mut disconnected = false;

    for region in regions {
        cursor.visit_region(region, |header, record| {
            acc.append(header, record.as_variant())?;
            total_records += 1;
            if acc.len() >= batch_size {
                let batch = acc.finish()?;
                if !send_batch(tx, batch) {
                    disconnected = true;
                    return Ok(false);
                }
            }
            Ok(!limit.is_some_and(|l| total_records >= l))
        })?;
        if disconnected || limit.is_some_and(|l| total_records >= l) {
            break;
        }
    }

    if !disconnected && !acc.is_empty() {
        let batch = acc.finish().map_err(arrow_err)?;
        send_batch(tx, batch);
    }
    cursor.close();
    debug!("indexed scan of {file_path}: {total_records} records");
    Ok(())
}

fn scan_sequential(
    file_path: &str,
    thread_num: Option<usize>,
    catalog: &VcfCatalog,
    projection: Option<Vec<usize>>,
    batch_size: usize,
    limit: Option<usize>,
    tx: &mut Sender<Result<RecordBatch, ArrowError>>,
) -> Result<(), DataFusionError> {
    let mut cursor = RecordCursor::open_sequential(file_path, thread_num)?;
    let header = Arc::clone(cursor.header());
    let mut acc = BatchAccumulator::new(catalog, projection, batch_size).map_err(arrow_err)?;
    let mut total_records = 0usize;

    while let Some(record) = cursor.next_record()? {
        acc.append(&header, record.as_variant()).map_err(arrow_err)?;
        total_records += 1;
        if acc.len() >= batch_size {
            let batch = acc.finish().map_err(arrow_err)?;
            if !send_batch(tx, batch) {
                cursor.close();
                return Ok(());
            }
        }
        if limit.is_some_and(|l| total_records >= l) {
            break;
        }
    }

    if !acc.is_empty() {
        let batch = acc.finish().map_err(arrow_err)?;
        send_batch(tx, batch);
    }
    cursor.close();
    debug!("sequential scan of {file_path}: {total_records} records");
    Ok(())
}
