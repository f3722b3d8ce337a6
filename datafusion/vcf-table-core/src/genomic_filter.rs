//! Genomic region extraction from DataFusion SQL expressions.
//!
//! Parses SQL `WHERE` clauses for constraints on the `CHROM` and `POS`
//! columns so region scans can go through the tabix/CSI index instead of
//! reading the whole file. VCF positions are 1-based and `POS` constrains a
//! single point coordinate, so a `POS` range maps directly onto a closed
//! 1-based region interval.

use datafusion::common::ScalarValue;
use datafusion::logical_expr::{Expr, Operator};

/// A genomic region extracted from SQL filters, in 1-based closed coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicRegion {
    /// Contig name.
    pub chrom: String,
    /// 1-based inclusive start position (None = from beginning of contig).
    pub start: Option<u64>,
    /// 1-based inclusive end position (None = to end of contig).
    pub end: Option<u64>,
}

impl GenomicRegion {
    /// Returns a region spanning the whole of `chrom`.
    pub fn whole_contig(chrom: impl Into<String>) -> Self {
        GenomicRegion {
            chrom: chrom.into(),
            start: None,
            end: None,
        }
    }
}

impl std::str::FromStr for GenomicRegion {
    type Err = String;

    /// Parses an interval spec: `chrom`, `chrom:start`, or `chrom:start-end`,
    /// 1-based closed, thousands separators tolerated (`chr1:1,000-2,000`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        let (chrom, range) = match spec.rsplit_once(':') {
            None if !spec.is_empty() => return Ok(GenomicRegion::whole_contig(spec)),
            None => return Err("empty region".to_string()),
            Some((chrom, range)) => (chrom, range),
        };
        if chrom.is_empty() {
            return Err(format!("region {spec:?}: missing contig name"));
        }
        let parse_pos = |p: &str| {
            p.replace(',', "")
                .parse::<u64>()
                .map_err(|e| format!("region {spec:?}: {e}"))
        };
        match range.split_once('-') {
            None => Ok(GenomicRegion {
                chrom: chrom.to_string(),
                start: Some(parse_pos(range)?),
                end: None,
            }),
            Some((low, high)) => {
                let start = parse_pos(low)?;
                let end = parse_pos(high)?;
                if end < start {
                    return Err(format!("region {spec:?}: end precedes start"));
                }
                Ok(GenomicRegion {
                    chrom: chrom.to_string(),
                    start: Some(start),
                    end: Some(end),
                })
            }
        }
    }
}

/// Result of analyzing filter expressions for genomic region information.
#[derive(Debug, Clone)]
pub struct GenomicFilterAnalysis {
    /// Regions answerable through the index.
    pub regions: Vec<GenomicRegion>,
    /// Filters that are not coordinate constraints and must run post-read.
    pub residual_filters: Vec<Expr>,
    /// All original filters. Index queries are inexact (they return every
    /// record overlapping the region), so the engine re-evaluates these.
    pub all_filters: Vec<Expr>,
}

/// Analyzes filter expressions and extracts genomic regions for index queries.
///
/// Supported patterns:
/// - `CHROM = 'chr1'`
/// - `CHROM = 'chr1' AND POS >= 1000 AND POS <= 2000`
/// - `CHROM IN ('chr1', 'chr2')`
/// - `CHROM = 'chr1' AND POS BETWEEN 1000 AND 2000`
pub fn extract_genomic_regions(filters: &[Expr]) -> GenomicFilterAnalysis {
    let mut chroms: Vec<String> = Vec::new();
    let mut pos_lower: Option<u64> = None;
    let mut pos_upper: Option<u64> = None;
    let mut residual_filters: Vec<Expr> = Vec::new();

    for filter in filters {
        collect_constraints(
            filter,
            &mut chroms,
            &mut pos_lower,
            &mut pos_upper,
            &mut residual_filters,
        );
    }

    chroms.sort();
    chroms.dedup();

    let regions = chroms
        .into_iter()
        .map(|chrom| GenomicRegion {
            chrom,
            start: pos_lower,
            end: pos_upper,
        })
        .collect();

    GenomicFilterAnalysis {
        regions,
        residual_filters,
        all_filters: filters.to_vec(),
    }
}

/// Checks whether a filter expression involves the coordinate columns.
pub fn is_genomic_coordinate_filter(expr: &Expr) -> bool {
    match expr {
        Expr::BinaryExpr(binary_expr) => {
            if matches!(binary_expr.op, Operator::And) {
                is_genomic_coordinate_filter(&binary_expr.left)
                    || is_genomic_coordinate_filter(&binary_expr.right)
            } else if let Expr::Column(col) = &*binary_expr.left {
                matches!(col.name.as_str(), "CHROM" | "POS")
            } else {
                false
            }
        }
        Expr::Between(between) => {
            if let Expr::Column(col) = &*between.expr {
                col.name == "POS"
            } else {
                false
            }
        }
        Expr::InList(in_list) => {
            if let Expr::Column(col) = &*in_list.expr {
                col.name == "CHROM"
            } else {
                false
            }
        }
        _ => false,
    }
}

fn collect_constraints(
    expr: &Expr,
    chroms: &mut Vec<String>,
    pos_lower: &mut Option<u64>,
    pos_upper: &mut Option<u64>,
    residual_filters: &mut Vec<Expr>,
) {
    match expr {
        Expr::BinaryExpr(binary_expr) if matches!(binary_expr.op, Operator::And) => {
            collect_constraints(
                &binary_expr.left,
                chroms,
                pos_lower,
                pos_upper,
                residual_filters,
            );
            collect_constraints(
                &binary_expr.right,
                chroms,
                pos_lower,
                pos_upper,
                residual_filters,
            );
        }
        Expr::BinaryExpr(binary_expr) => {
            if let (Expr::Column(col), Expr::Literal(scalar, _)) =
                (&*binary_expr.left, &*binary_expr.right)
            {
                match col.name.as_str() {
                    "CHROM" => {
                        if binary_expr.op == Operator::Eq {
                            if let Some(s) = scalar_to_string(scalar) {
                                chroms.push(s);
                                return;
                            }
                        }
                        residual_filters.push(expr.clone());
                    }
                    "POS" => {
                        if let Some(val) = scalar_to_u64(scalar) {
                            match binary_expr.op {
                                Operator::Eq => {
                                    *pos_lower = Some(pos_lower.map_or(val, |v| v.max(val)));
                                    *pos_upper = Some(pos_upper.map_or(val, |v| v.min(val)));
                                }
                                Operator::Gt => {
                                    *pos_lower =
                                        Some(pos_lower.map_or(val + 1, |v| v.max(val + 1)));
                                }
                                Operator::GtEq => {
                                    *pos_lower = Some(pos_lower.map_or(val, |v| v.max(val)));
                                }
                                Operator::Lt => {
                                    *pos_upper = Some(
                                        pos_upper
                                            .map_or(val.saturating_sub(1), |v| {
                                                v.min(val.saturating_sub(1))
                                            }),
                                    );
                                }
                                Operator::LtEq => {
                                    *pos_upper = Some(pos_upper.map_or(val, |v| v.min(val)));
                                }
                                _ => residual_filters.push(expr.clone()),
                            }
                            return;
                        }
                        residual_filters.push(expr.clone());
                    }
                    _ => residual_filters.push(expr.clone()),
                }
            } else {
                residual_filters.push(expr.clone());
            }
        }
        Expr::Between(between) => {
            if let Expr::Column(col) = &*between.expr {
                if col.name == "POS" && !between.negated {
                    if let (Expr::Literal(low, _), Expr::Literal(high, _)) =
                        (&*between.low, &*between.high)
                    {
                        if let (Some(low_val), Some(high_val)) =
                            (scalar_to_u64(low), scalar_to_u64(high))
                        {
                            *pos_lower = Some(pos_lower.map_or(low_val, |v| v.max(low_val)));
                            *pos_upper = Some(pos_upper.map_or(high_val, |v| v.min(high_val)));
                            return;
                        }
                    }
                }
            }
            residual_filters.push(expr.clone());
        }
        Expr::InList(in_list) => {
            if let Expr::Column(col) = &*in_list.expr {
                if col.name == "CHROM" && !in_list.negated {
                    let mut extracted: Vec<String> = in_list
                        .list
                        .iter()
                        .filter_map(|e| {
                            if let Expr::Literal(scalar, _) = e {
                                scalar_to_string(scalar)
                            } else {
                                None
                            }
                        })
                        .collect();
                    if !extracted.is_empty() {
                        chroms.append(&mut extracted);
                        return;
                    }
                }
            }
            residual_filters.push(expr.clone());
        }
        _ => residual_filters.push(expr.clone()),
    }
}

fn scalar_to_string(scalar: &ScalarValue) -> Option<String> {
    match scalar {
        ScalarValue::Utf8(Some(s)) | ScalarValue::LargeUtf8(Some(s)) => Some(s.clone()),
        _ => None,
    }
}

fn scalar_to_u64(scalar: &ScalarValue) -> Option<u64> {
    match scalar {
        ScalarValue::UInt32(Some(v)) => Some(*v as u64),
        ScalarValue::UInt64(Some(v)) => Some(*v),
        ScalarValue::Int32(Some(v)) if *v >= 0 => Some(*v as u64),
        ScalarValue::Int64(Some(v)) if *v >= 0 => Some(*v as u64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::logical_expr::{ident, lit, Between};

    #[test]
    fn chrom_eq_becomes_whole_contig_region() {
        let filters = vec![ident("CHROM").eq(lit("chr1"))];
        let analysis = extract_genomic_regions(&filters);
        assert_eq!(analysis.regions, vec![GenomicRegion::whole_contig("chr1")]);
        assert!(analysis.residual_filters.is_empty());
    }

    #[test]
    fn chrom_in_list_yields_one_region_per_contig() {
        let filters = vec![ident("CHROM").in_list(vec![lit("chr1"), lit("chr2")], false)];
        let analysis = extract_genomic_regions(&filters);
        assert_eq!(analysis.regions.len(), 2);
        assert_eq!(analysis.regions[0].chrom, "chr1");
        assert_eq!(analysis.regions[1].chrom, "chr2");
    }

    #[test]
    fn pos_range_maps_to_closed_interval() {
        let filters = vec![
            ident("CHROM").eq(lit("chr1")),
            ident("POS").gt_eq(lit(1000i64)),
            ident("POS").lt_eq(lit(2000i64)),
        ];
        let analysis = extract_genomic_regions(&filters);
        assert_eq!(analysis.regions.len(), 1);
        assert_eq!(analysis.regions[0].start, Some(1000));
        assert_eq!(analysis.regions[0].end, Some(2000));
        assert!(analysis.residual_filters.is_empty());
    }

    #[test]
    fn strict_bounds_are_tightened() {
        let filters = vec![
            ident("CHROM").eq(lit("chr1")),
            ident("POS").gt(lit(999i64)),
            ident("POS").lt(lit(2001i64)),
        ];
        let analysis = extract_genomic_regions(&filters);
        assert_eq!(analysis.regions[0].start, Some(1000));
        assert_eq!(analysis.regions[0].end, Some(2000));
    }

    #[test]
    fn pos_eq_pins_both_bounds() {
        let filters = vec![ident("CHROM").eq(lit("chr1")), ident("POS").eq(lit(5000i64))];
        let analysis = extract_genomic_regions(&filters);
        assert_eq!(analysis.regions[0].start, Some(5000));
        assert_eq!(analysis.regions[0].end, Some(5000));
    }

    #[test]
    fn pos_between_with_chrom() {
        let filters = vec![
            ident("CHROM").eq(lit("chr1")),
            Expr::Between(Between {
                expr: Box::new(ident("POS")),
                negated: false,
                low: Box::new(lit(1000i64)),
                high: Box::new(lit(1999i64)),
            }),
        ];
        let analysis = extract_genomic_regions(&filters);
        assert_eq!(analysis.regions[0].start, Some(1000));
        assert_eq!(analysis.regions[0].end, Some(1999));
    }

    #[test]
    fn pos_without_chrom_yields_no_region() {
        let filters = vec![ident("POS").gt_eq(lit(1000i64))];
        let analysis = extract_genomic_regions(&filters);
        assert!(analysis.regions.is_empty());
    }

    #[test]
    fn non_coordinate_filter_becomes_residual() {
        let filters = vec![ident("CHROM").eq(lit("chr1")), ident("QUAL").gt_eq(lit(30.0))];
        let analysis = extract_genomic_regions(&filters);
        assert_eq!(analysis.regions.len(), 1);
        assert_eq!(analysis.residual_filters.len(), 1);
    }

    #[test]
    fn region_spec_parses_all_shapes() {
        let whole: GenomicRegion = "chr1".parse().unwrap();
        assert_eq!(whole, GenomicRegion::whole_contig("chr1"));

        let from: GenomicRegion = "chr1:100".parse().unwrap();
        assert_eq!(from.start, Some(100));
        assert_eq!(from.end, None);

        let interval: GenomicRegion = "chr1:1,000-2,000".parse().unwrap();
        assert_eq!(interval.chrom, "chr1");
        assert_eq!(interval.start, Some(1000));
        assert_eq!(interval.end, Some(2000));
    }

    #[test]
    fn malformed_region_specs_are_rejected() {
        assert!("".parse::<GenomicRegion>().is_err());
        assert!(":100".parse::<GenomicRegion>().is_err());
        assert!("chr1:abc".parse::<GenomicRegion>().is_err());
        assert!("chr1:200-100".parse::<GenomicRegion>().is_err());
    }

    #[test]
    fn coordinate_filter_detection() {
        assert!(is_genomic_coordinate_filter(&ident("CHROM").eq(lit("chr1"))));
        assert!(is_genomic_coordinate_filter(&ident("POS").gt_eq(lit(1i64))));
        assert!(!is_genomic_coordinate_filter(&ident("QUAL").gt_eq(lit(30.0))));
    }
}
