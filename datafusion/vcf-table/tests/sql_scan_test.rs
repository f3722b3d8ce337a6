use datafusion::arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, ListArray,
    StringArray,
};
use datafusion::prelude::*;
use datafusion_vcf_table::{VcfTableOptions, VcfTableProvider};
use std::sync::Arc;

const SAMPLE_VCF: &str = r#"##fileformat=VCFv4.3
##contig=<ID=chr1>
##contig=<ID=chr2>
##FILTER=<ID=q10,Description="Quality below 10">
##INFO=<ID=DP,Number=1,Type=Integer,Description="Combined depth">
##INFO=<ID=AF,Number=A,Type=Float,Description="Allele frequency">
##INFO=<ID=DB,Number=0,Type=Flag,Description="dbSNP membership">
##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description="Genotype quality">
#CHROM	POS	ID	REF	ALT	QUAL	FILTER	INFO	FORMAT	S1	S2
chr1	100	rs1	A	T	60	PASS	DP=20;AF=0.5;DB	GT:GQ	0|1:99	0/0:80
chr1	200	rs2	G	C	80	PASS	DP=25;AF=1.0	GT:GQ	1/1:70	0/1:.
chr2	300	.	C	T,A	70	q10	DP=30;AF=0.33,0.33	GT:GQ	1/2:50	./.:30
chr2	400	.	T	G	.	PASS	DP=40	GT:GQ	0/1:60	0/0:90
"#;

async fn register_sample(ctx: &SessionContext) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.vcf");
    std::fs::write(&path, SAMPLE_VCF).unwrap();
    let table =
        VcfTableProvider::try_new(path.to_str().unwrap(), VcfTableOptions::default()).unwrap();
    ctx.register_table("variants", Arc::new(table)).unwrap();
    dir
}

#[tokio::test]
async fn select_star_exposes_naming_contract() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = SessionContext::new();
    let _dir = register_sample(&ctx).await;

    let df = ctx.sql("SELECT * FROM variants").await?;
    let schema = df.schema().clone();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        &names[..7],
        &["CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER"]
    );
    assert!(names.contains(&"DP"));
    assert!(names.contains(&"AF"));
    assert!(names.contains(&"FORMAT_GT_S1"));
    assert!(names.contains(&"FORMAT_GQ_S2"));

    let batches = df.collect().await?;
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 4);
    Ok(())
}

#[tokio::test]
async fn core_column_values_decode() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = SessionContext::new();
    let _dir = register_sample(&ctx).await;

    let df = ctx
        .sql(r#"SELECT "CHROM", "POS", "ID", "REF", "QUAL" FROM variants ORDER BY "POS""#)
        .await?;
    let batches = df.collect().await?;
    let batch = &batches[0];

    let chroms = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    let positions = batch
        .column(1)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    let ids = batch
        .column(2)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    let quals = batch
        .column(4)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();

    assert_eq!(chroms.value(0), "chr1");
    assert_eq!(positions.value(0), 100);
    assert_eq!(ids.value(0), "rs1");
    assert!(ids.is_null(2));
    // Missing QUAL is null, never zero.
    assert!(quals.is_null(3));
    Ok(())
}

#[tokio::test]
async fn info_columns_are_typed_and_backfilled() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = SessionContext::new();
    let _dir = register_sample(&ctx).await;

    let df = ctx
        .sql(r#"SELECT "DP", "AF", "DB" FROM variants ORDER BY "POS""#)
        .await?;
    let batches = df.collect().await?;
    let batch = &batches[0];

    let dp = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap();
    assert_eq!(dp.value(0), 20);
    assert_eq!(dp.value(3), 40);

    // Number=A field is a list even at biallelic sites.
    let af = batch.column(1).as_any().downcast_ref::<ListArray>().unwrap();
    let first = af.value(0);
    let first = first.as_any().downcast_ref::<Float32Array>().unwrap();
    assert_eq!(first.value(0), 0.5);
    let multi = af.value(2);
    assert_eq!(multi.len(), 2);
    assert!(af.is_null(3));

    // Flags are false when absent, not null.
    let db = batch
        .column(2)
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap();
    assert!(db.value(0));
    assert!(!db.value(1));
    Ok(())
}

#[tokio::test]
async fn format_columns_decode_per_sample() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = SessionContext::new();
    let _dir = register_sample(&ctx).await;

    let df = ctx
        .sql(
            r#"SELECT "FORMAT_GT_S1", "FORMAT_GT_S2", "FORMAT_GQ_S2"
               FROM variants ORDER BY "POS""#,
        )
        .await?;
    let batches = df.collect().await?;
    let batch = &batches[0];

    let gt_s1 = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(gt_s1.value(0), "0|1");
    assert_eq!(gt_s1.value(2), "1/2");

    let gt_s2 = batch
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(gt_s2.value(2), "./.");

    let gq_s2 = batch
        .column(2)
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap();
    assert_eq!(gq_s2.value(0), 80);
    assert!(gq_s2.is_null(1));
    Ok(())
}

#[tokio::test]
async fn count_star_works_with_empty_projection() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = SessionContext::new();
    let _dir = register_sample(&ctx).await;

    let df = ctx.sql("SELECT COUNT(*) FROM variants").await?;
    let batches = df.collect().await?;
    let count = batches[0]
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap()
        .value(0);
    assert_eq!(count, 4);
    Ok(())
}

#[tokio::test]
async fn limit_stops_the_scan() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = SessionContext::new();
    let _dir = register_sample(&ctx).await;

    let df = ctx.sql(r#"SELECT "CHROM" FROM variants LIMIT 2"#).await?;
    let batches = df.collect().await?;
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 2);
    Ok(())
}

#[tokio::test]
async fn chrom_filter_without_index_is_applied_by_engine(
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = SessionContext::new();
    let _dir = register_sample(&ctx).await;

    let df = ctx
        .sql(r#"SELECT "POS" FROM variants WHERE "CHROM" = 'chr2' AND "POS" >= 350"#)
        .await?;
    let batches = df.collect().await?;
    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 1);
    let positions = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(positions.value(0), 400);
    Ok(())
}

#[test]
fn region_option_without_index_fails_at_bind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.vcf");
    std::fs::write(&path, SAMPLE_VCF).unwrap();

    let options = VcfTableOptions {
        region: Some("chr1:100-200".to_string()),
        ..Default::default()
    };
    let err = VcfTableProvider::try_new(path.to_str().unwrap(), options).unwrap_err();
    assert!(matches!(
        err,
        datafusion_vcf_table_core::VcfTableError::Index(_)
    ));
}

#[test]
fn malformed_region_option_fails_at_bind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.vcf");
    std::fs::write(&path, SAMPLE_VCF).unwrap();

    let options = VcfTableOptions {
        region: Some("chr1:abc".to_string()),
        ..Default::default()
    };
    let err = VcfTableProvider::try_new(path.to_str().unwrap(), options).unwrap_err();
    assert!(matches!(
        err,
        datafusion_vcf_table_core::VcfTableError::Index(_)
    ));
}

#[tokio::test]
async fn info_field_subset_limits_schema() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.vcf");
    std::fs::write(&path, SAMPLE_VCF).unwrap();

    let options = VcfTableOptions {
        info_fields: Some(vec!["DP".to_string()]),
        ..Default::default()
    };
    let table = VcfTableProvider::try_new(path.to_str().unwrap(), options).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("variants", Arc::new(table))?;

    let df = ctx.sql("SELECT * FROM variants").await?;
    let schema = df.schema().clone();
    assert!(schema.field_with_unqualified_name("DP").is_ok());
    assert!(schema.field_with_unqualified_name("AF").is_err());
    Ok(())
}
