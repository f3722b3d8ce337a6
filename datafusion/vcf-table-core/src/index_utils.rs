//! Index discovery and per-contig statistics for VCF/BCF files.
//!
//! Region queries and shard planning both depend on a binning index (tabix
//! `.tbi` or CSI `.csi`). Discovery follows the htslib sidecar convention:
//! for a bgzip-compressed text VCF, `<path>.tbi` is preferred and `<path>.csi`
//! is the fallback; BCF files only ever carry a `.csi`. Callers may also pass
//! an explicit index path, which bypasses discovery entirely.

use crate::errors::{Result, VcfTableError};
use noodles::csi::binning_index::index::reference_sequence::Index as ReferenceSequenceIndex;
use noodles::csi::binning_index::index::ReferenceSequence;
use noodles::csi::binning_index::ReferenceSequence as _;
use noodles::csi::BinningIndex;
use noodles::{csi, tabix};
use std::path::{Path, PathBuf};

/// A loaded binning index, either tabix or CSI.
#[derive(Debug)]
pub enum VariantIndex {
    /// Tabix index (`.tbi`), used for bgzip-compressed text VCF.
    Tabix(tabix::Index),
    /// CSI index (`.csi`), used for BCF and as a fallback for text VCF.
    Csi(csi::Index),
}

/// Per-contig record statistics read from an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigStats {
    /// Contig name, as declared in the header or index.
    pub name: String,
    /// Number of records placed on this contig.
    pub record_count: u64,
}

/// Locates the sidecar index for `file_path`, trying `.tbi` before `.csi`
/// for text VCF and `.csi` only for BCF.
///
/// Returns `None` when no index exists; full scans then proceed unsharded.
pub fn discover_index(file_path: &str, is_bcf: bool) -> Option<PathBuf> {
    let candidates: &[&str] = if is_bcf { &["csi"] } else { &["tbi", "csi"] };
    for ext in candidates {
        let candidate = PathBuf::from(format!("{file_path}.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Reads an index file, dispatching on its extension.
///
/// # Errors
///
/// Returns [`VcfTableError::Index`] when the file cannot be read or has an
/// unrecognized extension.
pub fn read_index(index_path: &Path) -> Result<VariantIndex> {
    let ext = index_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match ext {
        "tbi" => tabix::read(index_path)
            .map(VariantIndex::Tabix)
            .map_err(|e| VcfTableError::Index(format!("{}: {e}", index_path.display()))),
        "csi" => csi::read(index_path)
            .map(VariantIndex::Csi)
            .map_err(|e| VcfTableError::Index(format!("{}: {e}", index_path.display()))),
        _ => Err(VcfTableError::Index(format!(
            "unrecognized index extension: {}",
            index_path.display()
        ))),
    }
}

impl VariantIndex {
    /// Returns the contig names stored in the index header, if any.
    ///
    /// Tabix indexes carry contig names; CSI indexes do not, so BCF contig
    /// names must come from the file header instead.
    pub fn contig_names(&self) -> Option<Vec<String>> {
        match self {
            VariantIndex::Tabix(index) => index.header().map(|h| {
                h.reference_sequence_names()
                    .iter()
                    .map(|n| n.to_string())
                    .collect()
            }),
            VariantIndex::Csi(_) => None,
        }
    }

    /// Computes per-contig record counts, pairing the index's reference
    /// sequences with `contig_names` positionally.
    ///
    /// Counts come from the index metadata pseudo-bin. A reference sequence
    /// without metadata but with populated bins is reported with a count of
    /// the number of chunks, which keeps it visibly non-empty for planning.
    pub fn contig_stats(&self, contig_names: &[String]) -> Vec<ContigStats> {
        match self {
            VariantIndex::Tabix(index) => {
                stats_from_reference_sequences(index.reference_sequences(), contig_names)
            }
            VariantIndex::Csi(index) => {
                stats_from_reference_sequences(index.reference_sequences(), contig_names)
            }
        }
    }
}

fn stats_from_reference_sequences<I: ReferenceSequenceIndex>(
    reference_sequences: &[ReferenceSequence<I>],
    contig_names: &[String],
) -> Vec<ContigStats> {
    contig_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let record_count = reference_sequences
                .get(i)
                .map(record_count_estimate)
                .unwrap_or(0);
            ContigStats {
                name: name.clone(),
                record_count,
            }
        })
        .collect()
}

fn record_count_estimate<I: ReferenceSequenceIndex>(
    reference_sequence: &ReferenceSequence<I>,
) -> u64 {
    match reference_sequence.metadata() {
        Some(metadata) => metadata.mapped_record_count(),
        None => reference_sequence
            .bins()
            .values()
            .map(|b| b.chunks().len() as u64)
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn discovery_prefers_tbi_for_text_vcf() {
        let dir = tempfile::tempdir().unwrap();
        let vcf = dir.path().join("sample.vcf.gz");
        File::create(&vcf).unwrap();
        let vcf_str = vcf.to_str().unwrap();

        assert_eq!(discover_index(vcf_str, false), None);

        let csi = dir.path().join("sample.vcf.gz.csi");
        File::create(&csi).unwrap().write_all(b"x").unwrap();
        assert_eq!(discover_index(vcf_str, false), Some(csi.clone()));

        let tbi = dir.path().join("sample.vcf.gz.tbi");
        File::create(&tbi).unwrap().write_all(b"x").unwrap();
        assert_eq!(discover_index(vcf_str, false), Some(tbi));
    }

    #[test]
    fn discovery_ignores_tbi_for_bcf() {
        let dir = tempfile::tempdir().unwrap();
        let bcf = dir.path().join("sample.bcf");
        File::create(&bcf).unwrap();
        let bcf_str = bcf.to_str().unwrap();

        let tbi = dir.path().join("sample.bcf.tbi");
        File::create(&tbi).unwrap().write_all(b"x").unwrap();
        assert_eq!(discover_index(bcf_str, true), None);

        let csi = dir.path().join("sample.bcf.csi");
        File::create(&csi).unwrap().write_all(b"x").unwrap();
        assert_eq!(discover_index(bcf_str, true), Some(csi));
    }

    #[test]
    fn unknown_extension_is_an_index_error() {
        let err = read_index(Path::new("/tmp/sample.vcf.gz.bai")).unwrap_err();
        assert!(matches!(err, VcfTableError::Index(_)));
    }

    #[test]
    fn missing_index_file_is_an_index_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.vcf.gz.tbi");
        let err = read_index(&path).unwrap_err();
        assert!(matches!(err, VcfTableError::Index(_)));
    }
}
