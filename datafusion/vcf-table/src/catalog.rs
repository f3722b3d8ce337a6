//! Bind-time schema catalog for VCF/BCF tables.
//!
//! Derives the Arrow schema from a parsed header, checking every INFO and
//! FORMAT definition against the reserved field specifications. Cardinality
//! mis-declarations on reserved fields are corrected (with a warning) before
//! the schema is built; type mismatches are warned about but the header type
//! is trusted for decoding. Header-level facts (file format version, contigs,
//! filters, sample names) are serialized into schema metadata as JSON.

use datafusion::arrow::array::{RecordBatch, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::error::ArrowError;
use datafusion_vcf_table_core::errors::{Result, VcfTableError};
use datafusion_vcf_table_core::field_spec::{
    check_cardinality, reserved_format, reserved_info, Cardinality, CardinalityCheck, ValueKind,
};
use log::warn;
use noodles::vcf;
use noodles::vcf::header::record::value::map::format::{
    Number as FormatNumber, Type as FormatType,
};
use noodles::vcf::header::record::value::map::info::{Number as InfoNumber, Type as InfoType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Schema metadata key holding the file format version (e.g. `VCFv4.3`).
pub const VCF_FILE_FORMAT_KEY: &str = "vcf.file_format";
/// Schema metadata key holding the contig dictionary as JSON.
pub const VCF_CONTIGS_KEY: &str = "vcf.contigs";
/// Schema metadata key holding the FILTER dictionary as JSON.
pub const VCF_FILTERS_KEY: &str = "vcf.filters";
/// Schema metadata key holding the sample names as JSON.
pub const VCF_SAMPLE_NAMES_KEY: &str = "vcf.sample_names";
/// Field metadata key holding the header description.
pub const VCF_FIELD_DESCRIPTION_KEY: &str = "vcf.field.description";
/// Field metadata key holding the VCF value type (`Integer`, `Float`, ...).
pub const VCF_FIELD_TYPE_KEY: &str = "vcf.field.type";
/// Field metadata key holding the corrected cardinality (`1`, `A`, `R`, ...).
pub const VCF_FIELD_NUMBER_KEY: &str = "vcf.field.number";
/// Field metadata key distinguishing `INFO` from `FORMAT` columns.
pub const VCF_FIELD_CATEGORY_KEY: &str = "vcf.field.category";

/// Name of the per-sample identifier column in tidy mode.
pub const SAMPLE_ID_COLUMN: &str = "SAMPLE_ID";

/// Number of fixed positional columns preceding INFO columns.
pub const CORE_COLUMN_COUNT: usize = 7;

/// One contig declaration, serialized into schema metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContigMetadata {
    /// Contig name.
    pub id: String,
    /// Contig length in base pairs, when declared.
    pub length: Option<u64>,
}

/// One FILTER declaration, serialized into schema metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterMetadata {
    /// Filter identifier.
    pub id: String,
    /// Header description.
    pub description: String,
}

/// How per-sample FORMAT data is laid out in the output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleLayout {
    /// One `FORMAT_<field>_<sample>` column per (field, sample) pair.
    #[default]
    Wide,
    /// Genotype-only column set: one `GT_<sample>` column per sample.
    LegacyGenotype,
    /// One row per (variant, sample) pair: a `SAMPLE_ID` column followed by
    /// `FORMAT_<field>` columns.
    Tidy,
}

/// Options controlling schema derivation.
#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// INFO fields to expose (None = all, in declaration order).
    pub info_fields: Option<Vec<String>>,
    /// FORMAT fields to expose (None = all, in declaration order).
    pub format_fields: Option<Vec<String>>,
    /// Per-sample column layout.
    pub sample_layout: SampleLayout,
}

/// The corrected schema: Arrow schema plus the header facts scan execution
/// needs (field order, sample names, contig dictionary).
#[derive(Debug, Clone)]
pub struct VcfCatalog {
    /// Derived Arrow schema with header metadata attached.
    pub schema: SchemaRef,
    /// INFO column names, in schema order.
    pub info_fields: Vec<String>,
    /// FORMAT field names, in schema order.
    pub format_fields: Vec<String>,
    /// Sample names, in header order.
    pub sample_names: Vec<String>,
    /// Contig names, in header declaration order.
    pub contig_names: Vec<String>,
    /// Per-sample column layout the schema was built for.
    pub sample_layout: SampleLayout,
}

impl VcfCatalog {
    /// Derives the corrected schema from a parsed header.
    ///
    /// # Errors
    ///
    /// Returns [`VcfTableError::Header`] when a requested INFO/FORMAT field
    /// is not declared in the header.
    pub fn from_header(header: &vcf::Header, options: &CatalogOptions) -> Result<Self> {
        let sample_names: Vec<String> = header
            .sample_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let contigs: Vec<ContigMetadata> = header
            .contigs()
            .iter()
            .map(|(id, contig)| ContigMetadata {
                id: id.to_string(),
                length: contig.length().map(|l| l as u64),
            })
            .collect();
        let contig_names: Vec<String> = contigs.iter().map(|c| c.id.clone()).collect();

        let info_fields = select_fields(
            &options.info_fields,
            header.infos().keys().map(|k| k.to_string()),
            "INFO",
        )?;
        let format_fields = match options.sample_layout {
            SampleLayout::LegacyGenotype => vec!["GT".to_string()],
            _ => select_fields(
                &options.format_fields,
                header.formats().keys().map(|k| k.to_string()),
                "FORMAT",
            )?,
        };

        let mut fields = vec![
            Field::new("CHROM", DataType::Utf8, false),
            Field::new("POS", DataType::Int64, false),
            Field::new("ID", DataType::Utf8, true),
            Field::new("REF", DataType::Utf8, false),
            Field::new(
                "ALT",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                false,
            ),
            Field::new("QUAL", DataType::Float64, true),
            Field::new(
                "FILTER",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                false,
            ),
        ];

        for tag in &info_fields {
            let info = header
                .infos()
                .get(tag.as_str())
                .ok_or_else(|| VcfTableError::Header(format!("INFO field {tag} not declared")))?;
            let cardinality = corrected_info_cardinality(tag, info.number());
            check_info_type(tag, info.ty());
            let dtype = arrow_type(info_type_to_kind(info.ty()), cardinality);
            let nullable = !matches!(info.ty(), InfoType::Flag);
            let field = Field::new(tag.clone(), dtype, nullable).with_metadata(field_metadata(
                info.description(),
                info_type_str(info.ty()),
                &cardinality,
                "INFO",
            ));
            fields.push(field);
        }

        match options.sample_layout {
            SampleLayout::Wide => {
                for sample in &sample_names {
                    for tag in &format_fields {
                        fields.push(format_field(
                            header,
                            tag,
                            format!("FORMAT_{tag}_{sample}"),
                        )?);
                    }
                }
            }
            SampleLayout::LegacyGenotype => {
                for sample in &sample_names {
                    fields.push(format_field(header, "GT", format!("GT_{sample}"))?);
                }
            }
            SampleLayout::Tidy => {
                fields.push(Field::new(SAMPLE_ID_COLUMN, DataType::Utf8, false));
                for tag in &format_fields {
                    fields.push(format_field(header, tag, format!("FORMAT_{tag}"))?);
                }
            }
        }

        let file_format = header.file_format();
        let filters: Vec<FilterMetadata> = header
            .filters()
            .iter()
            .map(|(id, filter)| FilterMetadata {
                id: id.to_string(),
                description: filter.description().to_string(),
            })
            .collect();

        let mut metadata = HashMap::new();
        metadata.insert(
            VCF_FILE_FORMAT_KEY.to_string(),
            format!("VCFv{}.{}", file_format.major(), file_format.minor()),
        );
        metadata.insert(VCF_CONTIGS_KEY.to_string(), to_json(&contigs));
        metadata.insert(VCF_FILTERS_KEY.to_string(), to_json(&filters));
        metadata.insert(VCF_SAMPLE_NAMES_KEY.to_string(), to_json(&sample_names));

        Ok(VcfCatalog {
            schema: Arc::new(Schema::new_with_metadata(fields, metadata)),
            info_fields,
            format_fields,
            sample_names,
            contig_names,
            sample_layout: options.sample_layout,
        })
    }

    /// Builds the INFO/FORMAT dictionary as a record batch with `name`,
    /// `category`, `number`, `type`, and `description` columns.
    pub fn describe(header: &vcf::Header) -> std::result::Result<RecordBatch, ArrowError> {
        let mut names = Vec::new();
        let mut categories = Vec::new();
        let mut numbers = Vec::new();
        let mut types = Vec::new();
        let mut descriptions = Vec::new();

        for (id, info) in header.infos() {
            names.push(id.to_string());
            categories.push("INFO".to_string());
            numbers.push(corrected_info_cardinality(id, info.number()).as_vcf_str());
            types.push(info_type_str(info.ty()).to_string());
            descriptions.push(info.description().to_string());
        }
        for (id, format) in header.formats() {
            names.push(id.to_string());
            categories.push("FORMAT".to_string());
            numbers.push(corrected_format_cardinality(id, format.number()).as_vcf_str());
            types.push(format_type_str(format.ty()).to_string());
            descriptions.push(format.description().to_string());
        }

        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("number", DataType::Utf8, false),
            Field::new("type", DataType::Utf8, false),
            Field::new("description", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(names)),
                Arc::new(StringArray::from(categories)),
                Arc::new(StringArray::from(numbers)),
                Arc::new(StringArray::from(types)),
                Arc::new(StringArray::from(descriptions)),
            ],
        )
    }
}

fn select_fields(
    requested: &Option<Vec<String>>,
    declared: impl Iterator<Item = String>,
    category: &str,
) -> Result<Vec<String>> {
    let declared: Vec<String> = declared.collect();
    match requested {
        None => Ok(declared),
        Some(tags) => {
            for tag in tags {
                if !declared.contains(tag) {
                    return Err(VcfTableError::Header(format!(
                        "{category} field {tag} not declared"
                    )));
                }
            }
            Ok(tags.clone())
        }
    }
}

fn format_field(header: &vcf::Header, tag: &str, column_name: String) -> Result<Field> {
    let format = header
        .formats()
        .get(tag)
        .ok_or_else(|| VcfTableError::Header(format!("FORMAT field {tag} not declared")))?;
    let cardinality = corrected_format_cardinality(tag, format.number());
    check_format_type(tag, format.ty());
    // GT is encoded genotype calls; always rendered as a string.
    let dtype = if tag == "GT" {
        DataType::Utf8
    } else {
        arrow_type(format_type_to_kind(format.ty()), cardinality)
    };
    Ok(
        Field::new(column_name, dtype, true).with_metadata(field_metadata(
            format.description(),
            format_type_str(format.ty()),
            &cardinality,
            "FORMAT",
        )),
    )
}

fn field_metadata(
    description: &str,
    type_str: &str,
    cardinality: &Cardinality,
    category: &str,
) -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert(
        VCF_FIELD_DESCRIPTION_KEY.to_string(),
        description.to_string(),
    );
    m.insert(VCF_FIELD_TYPE_KEY.to_string(), type_str.to_string());
    m.insert(VCF_FIELD_NUMBER_KEY.to_string(), cardinality.as_vcf_str());
    m.insert(VCF_FIELD_CATEGORY_KEY.to_string(), category.to_string());
    m
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

/// Maps a corrected (kind, cardinality) pair onto an Arrow type: fixed counts
/// of zero or one stay scalar, everything else becomes a list.
fn arrow_type(kind: ValueKind, cardinality: Cardinality) -> DataType {
    let inner = match kind {
        ValueKind::Integer => DataType::Int32,
        ValueKind::Float => DataType::Float32,
        ValueKind::Flag => DataType::Boolean,
        ValueKind::Character | ValueKind::String => DataType::Utf8,
    };
    match cardinality {
        Cardinality::Fixed(0) | Cardinality::Fixed(1) => inner,
        _ => DataType::List(Arc::new(Field::new("item", inner, true))),
    }
}

fn corrected_info_cardinality(id: &str, declared: InfoNumber) -> Cardinality {
    let declared = info_number_to_cardinality(declared);
    match reserved_info(id) {
        None => declared,
        Some(spec) => apply_check(id, declared, spec.cardinality),
    }
}

fn corrected_format_cardinality(id: &str, declared: FormatNumber) -> Cardinality {
    let declared = format_number_to_cardinality(declared);
    match reserved_format(id) {
        None => declared,
        Some(spec) => apply_check(id, declared, spec.cardinality),
    }
}

fn apply_check(id: &str, declared: Cardinality, spec: Cardinality) -> Cardinality {
    match check_cardinality(declared, spec) {
        CardinalityCheck::Conforms | CardinalityCheck::Tolerated => declared,
        CardinalityCheck::Corrected(corrected) => {
            warn!(
                "field {id} declares Number={}, should be Number={} per VCF spec; correcting schema",
                declared.as_vcf_str(),
                corrected.as_vcf_str()
            );
            corrected
        }
    }
}

fn check_info_type(id: &str, declared: InfoType) {
    if let Some(spec) = reserved_info(id) {
        let declared_kind = info_type_to_kind(declared);
        if declared_kind != spec.kind {
            warn!(
                "INFO field {id} declares Type={}, should be Type={} per VCF spec; using header type",
                info_type_str(declared),
                spec.kind.as_vcf_str()
            );
        }
    }
}

fn check_format_type(id: &str, declared: FormatType) {
    if let Some(spec) = reserved_format(id) {
        let declared_kind = format_type_to_kind(declared);
        if declared_kind != spec.kind {
            warn!(
                "FORMAT field {id} declares Type={}, should be Type={} per VCF spec; using header type",
                format_type_str(declared),
                spec.kind.as_vcf_str()
            );
        }
    }
}

fn info_number_to_cardinality(number: InfoNumber) -> Cardinality {
    match number {
        InfoNumber::Count(n) => Cardinality::Fixed(n),
        InfoNumber::AlternateBases => Cardinality::PerAltAllele,
        InfoNumber::ReferenceAlternateBases => Cardinality::PerAllele,
        InfoNumber::Samples => Cardinality::PerGenotype,
        InfoNumber::Unknown => Cardinality::Variable,
    }
}

fn format_number_to_cardinality(number: FormatNumber) -> Cardinality {
    match number {
        FormatNumber::Count(n) => Cardinality::Fixed(n),
        FormatNumber::AlternateBases | FormatNumber::LocalAlternateBases => {
            Cardinality::PerAltAllele
        }
        FormatNumber::ReferenceAlternateBases | FormatNumber::LocalReferenceAlternateBases => {
            Cardinality::PerAllele
        }
        FormatNumber::Samples | FormatNumber::LocalSamples => Cardinality::PerGenotype,
        _ => Cardinality::Variable,
    }
}

fn info_type_to_kind(ty: InfoType) -> ValueKind {
    match ty {
        InfoType::Integer => ValueKind::Integer,
        InfoType::Float => ValueKind::Float,
        InfoType::Flag => ValueKind::Flag,
        InfoType::Character => ValueKind::Character,
        InfoType::String => ValueKind::String,
    }
}

fn format_type_to_kind(ty: FormatType) -> ValueKind {
    match ty {
        FormatType::Integer => ValueKind::Integer,
        FormatType::Float => ValueKind::Float,
        FormatType::Character => ValueKind::Character,
        FormatType::String => ValueKind::String,
    }
}

fn info_type_str(ty: InfoType) -> &'static str {
    match ty {
        InfoType::Integer => "Integer",
        InfoType::Float => "Float",
        InfoType::Flag => "Flag",
        InfoType::Character => "Character",
        InfoType::String => "String",
    }
}

fn format_type_str(ty: FormatType) -> &'static str {
    match ty {
        FormatType::Integer => "Integer",
        FormatType::Float => "Float",
        FormatType::Character => "Character",
        FormatType::String => "String",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::Array;

    const HEADER: &str = "\
##fileformat=VCFv4.3
##contig=<ID=chr1,length=248956422>
##contig=<ID=chr2,length=242193529>
##FILTER=<ID=PASS,Description=\"All filters passed\">
##FILTER=<ID=q10,Description=\"Quality below 10\">
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total depth\">
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">
##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership\">
##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"SV type\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allelic depths\">
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description=\"Genotype quality\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA00001\tNA00002
";

    // AC mis-declared as Number=1 and PL mis-declared as Number=R; both must
    // be corrected to their reserved cardinalities.
    const MISDECLARED_HEADER: &str = "\
##fileformat=VCFv4.2
##contig=<ID=1>
##INFO=<ID=AC,Number=1,Type=Integer,Description=\"Alt allele count\">
##INFO=<ID=AF,Number=.,Type=Float,Description=\"Allele frequency\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=PL,Number=R,Type=Integer,Description=\"Phred likelihoods\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1
";

    fn parse(header: &str) -> vcf::Header {
        header.parse().unwrap()
    }

    #[test]
    fn core_columns_come_first_in_order() {
        let catalog =
            VcfCatalog::from_header(&parse(HEADER), &CatalogOptions::default()).unwrap();
        let names: Vec<&str> = catalog
            .schema
            .fields()
            .iter()
            .take(CORE_COLUMN_COUNT)
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(
            names,
            vec!["CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER"]
        );
        assert_eq!(
            catalog.schema.field_with_name("POS").unwrap().data_type(),
            &DataType::Int64
        );
        assert!(catalog.schema.field_with_name("ID").unwrap().is_nullable());
    }

    #[test]
    fn info_columns_follow_declaration_order() {
        let catalog =
            VcfCatalog::from_header(&parse(HEADER), &CatalogOptions::default()).unwrap();
        assert_eq!(catalog.info_fields, vec!["DP", "AF", "DB", "SVTYPE"]);
        assert_eq!(
            catalog.schema.field_with_name("DP").unwrap().data_type(),
            &DataType::Int32
        );
        // AF is Number=A, so it becomes a list even at a biallelic site.
        assert!(matches!(
            catalog.schema.field_with_name("AF").unwrap().data_type(),
            DataType::List(_)
        ));
        let db = catalog.schema.field_with_name("DB").unwrap();
        assert_eq!(db.data_type(), &DataType::Boolean);
        assert!(!db.is_nullable());
    }

    #[test]
    fn wide_layout_names_format_columns_per_sample() {
        let catalog =
            VcfCatalog::from_header(&parse(HEADER), &CatalogOptions::default()).unwrap();
        assert!(catalog.schema.field_with_name("FORMAT_GT_NA00001").is_ok());
        assert!(catalog.schema.field_with_name("FORMAT_AD_NA00002").is_ok());
        assert_eq!(
            catalog
                .schema
                .field_with_name("FORMAT_GT_NA00001")
                .unwrap()
                .data_type(),
            &DataType::Utf8
        );
    }

    #[test]
    fn legacy_layout_exposes_gt_columns_only() {
        let options = CatalogOptions {
            sample_layout: SampleLayout::LegacyGenotype,
            ..Default::default()
        };
        let catalog = VcfCatalog::from_header(&parse(HEADER), &options).unwrap();
        assert!(catalog.schema.field_with_name("GT_NA00001").is_ok());
        assert!(catalog.schema.field_with_name("GT_NA00002").is_ok());
        assert!(catalog.schema.field_with_name("FORMAT_AD_NA00001").is_err());
    }

    #[test]
    fn tidy_layout_adds_sample_id_and_unsuffixed_format_columns() {
        let options = CatalogOptions {
            sample_layout: SampleLayout::Tidy,
            ..Default::default()
        };
        let catalog = VcfCatalog::from_header(&parse(HEADER), &options).unwrap();
        let sample_id_idx = catalog.schema.index_of(SAMPLE_ID_COLUMN).unwrap();
        assert_eq!(sample_id_idx, CORE_COLUMN_COUNT + catalog.info_fields.len());
        assert!(catalog.schema.field_with_name("FORMAT_GT").is_ok());
        assert!(catalog.schema.field_with_name("FORMAT_AD").is_ok());
        assert!(catalog.schema.field_with_name("FORMAT_GT_NA00001").is_err());
    }

    #[test]
    fn misdeclared_reserved_cardinalities_are_corrected() {
        let catalog =
            VcfCatalog::from_header(&parse(MISDECLARED_HEADER), &CatalogOptions::default())
                .unwrap();
        // AC: Number=1 corrected to Number=A, so the column is a list.
        let ac = catalog.schema.field_with_name("AC").unwrap();
        assert!(matches!(ac.data_type(), DataType::List(_)));
        assert_eq!(ac.metadata().get(VCF_FIELD_NUMBER_KEY).unwrap(), "A");
        // AF: Number=. tolerated, declaration kept.
        let af = catalog.schema.field_with_name("AF").unwrap();
        assert_eq!(af.metadata().get(VCF_FIELD_NUMBER_KEY).unwrap(), ".");
        // PL: Number=R corrected to Number=G.
        let pl = catalog.schema.field_with_name("FORMAT_PL_S1").unwrap();
        assert_eq!(pl.metadata().get(VCF_FIELD_NUMBER_KEY).unwrap(), "G");
    }

    #[test]
    fn schema_metadata_carries_header_facts() {
        let catalog =
            VcfCatalog::from_header(&parse(HEADER), &CatalogOptions::default()).unwrap();
        let metadata = catalog.schema.metadata();
        assert_eq!(metadata.get(VCF_FILE_FORMAT_KEY).unwrap(), "VCFv4.3");
        let contigs: Vec<ContigMetadata> =
            serde_json::from_str(metadata.get(VCF_CONTIGS_KEY).unwrap()).unwrap();
        assert_eq!(contigs.len(), 2);
        assert_eq!(contigs[0].id, "chr1");
        assert_eq!(contigs[0].length, Some(248956422));
        let samples: Vec<String> =
            serde_json::from_str(metadata.get(VCF_SAMPLE_NAMES_KEY).unwrap()).unwrap();
        assert_eq!(samples, vec!["NA00001", "NA00002"]);
    }

    #[test]
    fn requested_field_subset_is_validated() {
        let options = CatalogOptions {
            info_fields: Some(vec!["AF".to_string()]),
            ..Default::default()
        };
        let catalog = VcfCatalog::from_header(&parse(HEADER), &options).unwrap();
        assert_eq!(catalog.info_fields, vec!["AF"]);
        assert!(catalog.schema.field_with_name("DP").is_err());

        let bad = CatalogOptions {
            info_fields: Some(vec!["NOPE".to_string()]),
            ..Default::default()
        };
        assert!(VcfCatalog::from_header(&parse(HEADER), &bad).is_err());
    }

    #[test]
    fn describe_lists_info_and_format_fields() {
        let batch = VcfCatalog::describe(&parse(HEADER)).unwrap();
        assert_eq!(batch.num_rows(), 7);
        let names = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        let categories = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(0), "DP");
        assert_eq!(categories.value(0), "INFO");
        assert_eq!(names.value(4), "GT");
        assert_eq!(categories.value(4), "FORMAT");
        assert!(!batch.column(2).is_null(0));
    }
}
