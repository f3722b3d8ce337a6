//! Storage layer and file I/O for VCF/BCF scans.
//!
//! Input container and compression are detected from magic bytes, never from
//! file extensions: plain text, gzip, and BGZF are told apart by the gzip
//! header's extra-field subfield, and BCF is recognized by its `BCF` magic
//! behind the BGZF layer. Each opened reader owns its file handle; readers
//! are never shared across threads.

use datafusion_vcf_table_core::errors::{Result, VcfTableError};
use datafusion_vcf_table_core::genomic_filter::GenomicRegion;
use datafusion_vcf_table_core::index_utils::VariantIndex;
use flate2::read::MultiGzDecoder;
use log::debug;
use noodles::csi::BinningIndex;
use noodles::{bcf, bgzf, core, vcf};
use std::fs::File;
use std::io::{BufReader, Read};
use std::num::NonZeroUsize;
use std::path::Path;

/// Container format of the input, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantFormat {
    /// Text VCF.
    Vcf,
    /// Binary BCF.
    Bcf,
}

/// Compression wrapping the input, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCompression {
    /// Uncompressed.
    None,
    /// Plain gzip (not seekable; no index queries).
    Gzip,
    /// Blocked gzip, the indexable variant container compression.
    Bgzf,
}

/// Detects the container format and compression of `file_path` by sniffing
/// its leading bytes.
///
/// # Errors
///
/// Returns an I/O error when the file cannot be opened, or a header error
/// when the leading bytes match no supported container.
pub fn sniff_format(file_path: &str) -> Result<(VariantFormat, FileCompression)> {
    let mut file = File::open(file_path)?;
    let mut magic = [0u8; 18];
    let n = read_up_to(&mut file, &mut magic)?;

    if n >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
        let compression = if is_bgzf_header(&magic[..n]) {
            FileCompression::Bgzf
        } else {
            FileCompression::Gzip
        };
        // Look behind the gzip layer for the BCF magic.
        let mut inner = [0u8; 3];
        let inner_n = match compression {
            FileCompression::Bgzf => {
                let mut reader = bgzf::Reader::new(File::open(file_path)?);
                read_up_to(&mut reader, &mut inner)?
            }
            _ => {
                let mut reader = MultiGzDecoder::new(File::open(file_path)?);
                read_up_to(&mut reader, &mut inner)?
            }
        };
        let format = if inner_n == 3 && &inner == b"BCF" {
            VariantFormat::Bcf
        } else {
            VariantFormat::Vcf
        };
        if format == VariantFormat::Bcf && compression == FileCompression::Gzip {
            return Err(VcfTableError::Header(format!(
                "{file_path}: BCF requires BGZF compression, found plain gzip"
            )));
        }
        debug!("sniffed {file_path}: {format:?} + {compression:?}");
        return Ok((format, compression));
    }

    if n >= 3 && &magic[..3] == b"BCF" {
        // Uncompressed BCF is legal but rare.
        return Ok((VariantFormat::Bcf, FileCompression::None));
    }
    if n >= 1 && magic[0] == b'#' {
        return Ok((VariantFormat::Vcf, FileCompression::None));
    }
    Err(VcfTableError::Header(format!(
        "{file_path}: not a recognizable VCF or BCF file"
    )))
}

/// A sequential reader over a local VCF/BCF file. Owns its handle.
pub enum VcfSourceReader {
    /// Uncompressed text VCF.
    Plain(vcf::io::Reader<BufReader<File>>),
    /// BGZF-compressed text VCF with multithreaded block decompression.
    Bgzf(vcf::io::Reader<bgzf::MultithreadedReader<File>>),
    /// Plain-gzip text VCF (sequential only).
    Gzip(vcf::io::Reader<BufReader<MultiGzDecoder<File>>>),
    /// BGZF-compressed BCF.
    Bcf(bcf::io::Reader<bgzf::Reader<File>>),
    /// Uncompressed BCF.
    PlainBcf(bcf::io::Reader<BufReader<File>>),
}

impl std::fmt::Debug for VcfSourceReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            VcfSourceReader::Plain(_) => "Plain",
            VcfSourceReader::Bgzf(_) => "Bgzf",
            VcfSourceReader::Gzip(_) => "Gzip",
            VcfSourceReader::Bcf(_) => "Bcf",
            VcfSourceReader::PlainBcf(_) => "PlainBcf",
        };
        f.debug_tuple("VcfSourceReader").field(&variant).finish()
    }
}

impl VcfSourceReader {
    /// Opens `file_path` for sequential reading, sniffing its format first.
    /// `thread_num` sets the BGZF decompression worker count.
    pub fn open(file_path: &str, thread_num: Option<usize>) -> Result<Self> {
        let (format, compression) = sniff_format(file_path)?;
        let file = File::open(file_path)?;
        let worker_count =
            NonZeroUsize::new(thread_num.unwrap_or(1)).unwrap_or(NonZeroUsize::MIN);
        let reader = match (format, compression) {
            (VariantFormat::Vcf, FileCompression::None) => {
                VcfSourceReader::Plain(vcf::io::Reader::new(BufReader::new(file)))
            }
            (VariantFormat::Vcf, FileCompression::Bgzf) => VcfSourceReader::Bgzf(
                vcf::io::Reader::new(bgzf::MultithreadedReader::with_worker_count(
                    worker_count,
                    file,
                )),
            ),
            (VariantFormat::Vcf, FileCompression::Gzip) => VcfSourceReader::Gzip(
                vcf::io::Reader::new(BufReader::new(MultiGzDecoder::new(file))),
            ),
            (VariantFormat::Bcf, FileCompression::None) => {
                VcfSourceReader::PlainBcf(bcf::io::Reader::from(BufReader::new(file)))
            }
            (VariantFormat::Bcf, _) => VcfSourceReader::Bcf(bcf::io::Reader::new(file)),
        };
        Ok(reader)
    }

    /// Reads and parses the header. Must be called once before records.
    pub fn read_header(&mut self) -> Result<vcf::Header> {
        let header = match self {
            VcfSourceReader::Plain(r) => r.read_header(),
            VcfSourceReader::Bgzf(r) => r.read_header(),
            VcfSourceReader::Gzip(r) => r.read_header(),
            VcfSourceReader::Bcf(r) => r.read_header(),
            VcfSourceReader::PlainBcf(r) => r.read_header(),
        };
        header.map_err(|e| VcfTableError::Header(e.to_string()))
    }
}

/// Reads and parses only the header of `file_path`.
pub fn get_header(file_path: &str) -> Result<vcf::Header> {
    VcfSourceReader::open(file_path, None)?.read_header()
}

/// An index-backed reader supporting region queries. Owns its handle.
pub enum IndexedVariantReader {
    /// BGZF text VCF behind a tabix/CSI index.
    Vcf(vcf::io::IndexedReader<bgzf::Reader<File>>),
    /// BCF behind a CSI index.
    Bcf(bcf::io::IndexedReader<bgzf::Reader<File>>),
}

impl std::fmt::Debug for IndexedVariantReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            IndexedVariantReader::Vcf(_) => "Vcf",
            IndexedVariantReader::Bcf(_) => "Bcf",
        };
        f.debug_tuple("IndexedVariantReader")
            .field(&variant)
            .finish()
    }
}

impl IndexedVariantReader {
    /// Opens `file_path` with the given index for region queries.
    ///
    /// # Errors
    ///
    /// Returns [`VcfTableError::Index`] when the container does not support
    /// indexed access (plain gzip, or an index kind mismatching the format).
    pub fn open(file_path: &str, index: VariantIndex) -> Result<Self> {
        let (format, compression) = sniff_format(file_path)?;
        match (format, compression) {
            (VariantFormat::Vcf, FileCompression::Bgzf) => {
                let index: Box<dyn BinningIndex + Send + Sync> = match index {
                    VariantIndex::Tabix(i) => Box::new(i),
                    VariantIndex::Csi(i) => Box::new(i),
                };
                let reader = vcf::io::indexed_reader::Builder::default()
                    .set_index(index)
                    .build_from_path(file_path)
                    .map_err(|e| VcfTableError::Index(format!("{file_path}: {e}")))?;
                Ok(IndexedVariantReader::Vcf(reader))
            }
            (VariantFormat::Bcf, FileCompression::Bgzf) => {
                let index = match index {
                    VariantIndex::Csi(i) => i,
                    VariantIndex::Tabix(_) => {
                        return Err(VcfTableError::Index(format!(
                            "{file_path}: BCF requires a CSI index, found tabix"
                        )));
                    }
                };
                let reader = bcf::io::indexed_reader::Builder::default()
                    .set_index(index)
                    .build_from_path(file_path)
                    .map_err(|e| VcfTableError::Index(format!("{file_path}: {e}")))?;
                Ok(IndexedVariantReader::Bcf(reader))
            }
            _ => Err(VcfTableError::Index(format!(
                "{file_path}: container does not support indexed access"
            ))),
        }
    }

    /// Reads and parses the header. Must be called once before queries.
    pub fn read_header(&mut self) -> Result<vcf::Header> {
        let header = match self {
            IndexedVariantReader::Vcf(r) => r.read_header(),
            IndexedVariantReader::Bcf(r) => r.read_header(),
        };
        header.map_err(|e| VcfTableError::Header(e.to_string()))
    }
}

/// Formats a region constraint the way noodles parses it
/// (`chrom`, `chrom:start`, or `chrom:start-end`).
pub fn build_noodles_region(region: &GenomicRegion) -> Result<core::Region> {
    let spec = match (region.start, region.end) {
        (None, None) => region.chrom.clone(),
        (Some(start), None) => format!("{}:{}", region.chrom, start),
        (None, Some(end)) => format!("{}:1-{}", region.chrom, end),
        (Some(start), Some(end)) => format!("{}:{}-{}", region.chrom, start, end),
    };
    spec.parse::<core::Region>()
        .map_err(|e| VcfTableError::Index(format!("invalid region {spec}: {e}")))
}

fn is_bgzf_header(magic: &[u8]) -> bool {
    // gzip FLG.FEXTRA set and a BC subfield in the extra header block.
    magic.len() >= 14
        && magic[3] & 0x04 != 0
        && magic[12] == b'B'
        && magic[13] == b'C'
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = reader.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}
