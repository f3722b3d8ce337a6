//! Streaming record cursor over a single VCF/BCF file.
//!
//! A cursor owns its file handle, parsed header, and (for region queries) its
//! index; nothing is shared across threads. Records are materialized one at a
//! time and handed to the caller by reference, so nothing is retained across
//! iterations. EOF is idempotent, and both [`RecordCursor::close`] and `Drop`
//! release the handle deterministically.

use crate::storage::{build_noodles_region, IndexedVariantReader, VcfSourceReader};
use datafusion_vcf_table_core::errors::{Result, VcfTableError};
use datafusion_vcf_table_core::genomic_filter::GenomicRegion;
use datafusion_vcf_table_core::index_utils::{discover_index, read_index};
use noodles::{bcf, vcf};
use std::path::PathBuf;
use std::sync::Arc;

/// One decoded record, text or binary.
///
/// Both variants implement the `noodles` variant record trait, so downstream
/// projection code is format-agnostic.
#[derive(Debug)]
pub enum RecordHolder {
    /// A lazily parsed text VCF record.
    Vcf(vcf::Record),
    /// A lazily parsed binary BCF record.
    Bcf(bcf::Record),
}

impl RecordHolder {
    /// Returns the record behind the format-independent variant interface.
    pub fn as_variant(&self) -> &dyn vcf::variant::Record {
        match self {
            RecordHolder::Vcf(r) => r,
            RecordHolder::Bcf(r) => r,
        }
    }
}

#[derive(Debug)]
enum CursorState {
    Sequential { reader: VcfSourceReader, eof: bool },
    Indexed(IndexedVariantReader),
    Closed,
}

/// A streaming cursor over one VCF/BCF file.
#[derive(Debug)]
pub struct RecordCursor {
    header: Arc<vcf::Header>,
    state: CursorState,
}

impl RecordCursor {
    /// Opens a cursor for sequential whole-file iteration.
    pub fn open_sequential(file_path: &str, thread_num: Option<usize>) -> Result<Self> {
        let mut reader = VcfSourceReader::open(file_path, thread_num)?;
        let header = Arc::new(reader.read_header()?);
        Ok(RecordCursor {
            header,
            state: CursorState::Sequential { reader, eof: false },
        })
    }

    /// Opens a cursor for indexed region queries.
    ///
    /// When `index_path` is `None` the sidecar index is auto-discovered.
    ///
    /// # Errors
    ///
    /// Returns [`VcfTableError::Index`] when no index can be found: region
    /// queries without an index are fatal, they never degrade to a full scan.
    pub fn open_indexed(file_path: &str, index_path: Option<PathBuf>) -> Result<Self> {
        let is_bcf = matches!(
            crate::storage::sniff_format(file_path)?.0,
            crate::storage::VariantFormat::Bcf
        );
        let index_path = match index_path {
            Some(path) => path,
            None => discover_index(file_path, is_bcf).ok_or_else(|| {
                VcfTableError::Index(format!(
                    "region query on {file_path} requires an index, none found"
                ))
            })?,
        };
        let index = read_index(&index_path)?;
        let mut reader = IndexedVariantReader::open(file_path, index)?;
        let header = Arc::new(reader.read_header()?);
        Ok(RecordCursor {
            header,
            state: CursorState::Indexed(reader),
        })
    }

    /// Returns the parsed header.
    pub fn header(&self) -> &Arc<vcf::Header> {
        &self.header
    }

    /// Reads the next record of a sequential cursor. Returns `Ok(None)` at
    /// EOF and on every call thereafter, including after [`Self::close`].
    pub fn next_record(&mut self) -> Result<Option<RecordHolder>> {
        match &mut self.state {
            CursorState::Sequential { reader, eof } => {
                if *eof {
                    return Ok(None);
                }
                let record = match reader {
                    VcfSourceReader::Plain(r) => read_vcf_record(|rec| r.read_record(rec))?,
                    VcfSourceReader::Bgzf(r) => read_vcf_record(|rec| r.read_record(rec))?,
                    VcfSourceReader::Gzip(r) => read_vcf_record(|rec| r.read_record(rec))?,
                    VcfSourceReader::Bcf(r) => read_bcf_record(|rec| r.read_record(rec))?,
                    VcfSourceReader::PlainBcf(r) => read_bcf_record(|rec| r.read_record(rec))?,
                };
                if record.is_none() {
                    *eof = true;
                }
                Ok(record)
            }
            CursorState::Indexed(_) => Err(VcfTableError::Index(
                "cursor opened for region queries; use visit_region".to_string(),
            )),
            CursorState::Closed => Ok(None),
        }
    }

    /// Runs `f` over every record overlapping `region`, in file order.
    ///
    /// `f` returns `Ok(false)` to stop the traversal early (limit reached,
    /// consumer gone); the cursor stays usable for further regions.
    pub fn visit_region<F>(&mut self, region: &GenomicRegion, mut f: F) -> Result<()>
    where
        F: FnMut(&vcf::Header, &RecordHolder) -> Result<bool>,
    {
        let noodles_region = build_noodles_region(region)?;
        let header = Arc::clone(&self.header);
        match &mut self.state {
            CursorState::Indexed(IndexedVariantReader::Vcf(reader)) => {
                let query = reader
                    .query(&header, &noodles_region)
                    .map_err(|e| VcfTableError::Index(format!("{}: {e}", region.chrom)))?;
                for result in query {
                    let record = result.map_err(|e| decode_error(region, e))?;
                    if !f(&header, &RecordHolder::Vcf(record))? {
                        break;
                    }
                }
                Ok(())
            }
            CursorState::Indexed(IndexedVariantReader::Bcf(reader)) => {
                let query = reader
                    .query(&header, &noodles_region)
                    .map_err(|e| VcfTableError::Index(format!("{}: {e}", region.chrom)))?;
                for result in query {
                    let record = result.map_err(|e| decode_error(region, e))?;
                    if !f(&header, &RecordHolder::Bcf(record))? {
                        break;
                    }
                }
                Ok(())
            }
            CursorState::Sequential { .. } => Err(VcfTableError::Index(
                "cursor opened for sequential iteration; use next_record".to_string(),
            )),
            CursorState::Closed => Ok(()),
        }
    }

    /// Releases the file handle. Subsequent reads return `Ok(None)`.
    pub fn close(&mut self) {
        self.state = CursorState::Closed;
    }
}

fn read_vcf_record<F>(mut read: F) -> Result<Option<RecordHolder>>
where
    F: FnMut(&mut vcf::Record) -> std::io::Result<usize>,
{
    let mut record = vcf::Record::default();
    match read(&mut record)? {
        0 => Ok(None),
        _ => Ok(Some(RecordHolder::Vcf(record))),
    }
}

fn read_bcf_record<F>(mut read: F) -> Result<Option<RecordHolder>>
where
    F: FnMut(&mut bcf::Record) -> std::io::Result<usize>,
{
    let mut record = bcf::Record::default();
    match read(&mut record)? {
        0 => Ok(None),
        _ => Ok(Some(RecordHolder::Bcf(record))),
    }
}

fn decode_error(region: &GenomicRegion, e: std::io::Error) -> VcfTableError {
    VcfTableError::Decode {
        contig: region.chrom.clone(),
        position: region.start.unwrap_or(1),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_VCF: &str = "\
##fileformat=VCFv4.3
##contig=<ID=chr1>
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
chr1\t100\trs1\tA\tT\t30\tPASS\tDP=10
chr1\t200\t.\tG\tC\t.\tPASS\tDP=7
chr1\t300\t.\tT\tA,G\t12.5\tq10\tDP=3
";

    fn write_sample(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("sample.vcf");
        std::fs::write(&path, SAMPLE_VCF).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn sequential_iteration_reads_all_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut cursor = RecordCursor::open_sequential(&write_sample(&dir), None).unwrap();
        let header = Arc::clone(cursor.header());
        let mut count = 0;
        while let Some(record) = cursor.next_record().unwrap() {
            assert_eq!(
                record
                    .as_variant()
                    .reference_sequence_name(&header)
                    .unwrap(),
                "chr1"
            );
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn eof_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut cursor = RecordCursor::open_sequential(&write_sample(&dir), None).unwrap();
        while cursor.next_record().unwrap().is_some() {}
        assert!(cursor.next_record().unwrap().is_none());
        assert!(cursor.next_record().unwrap().is_none());
    }

    #[test]
    fn close_releases_and_reads_return_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut cursor = RecordCursor::open_sequential(&write_sample(&dir), None).unwrap();
        assert!(cursor.next_record().unwrap().is_some());
        cursor.close();
        assert!(cursor.next_record().unwrap().is_none());
    }

    #[test]
    fn region_query_without_index_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = RecordCursor::open_indexed(&write_sample(&dir), None).unwrap_err();
        assert!(matches!(err, VcfTableError::Index(_)));
    }

    #[test]
    fn header_is_available_after_open() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = RecordCursor::open_sequential(&write_sample(&dir), None).unwrap();
        assert!(cursor.header().infos().get("DP").is_some());
    }
}
