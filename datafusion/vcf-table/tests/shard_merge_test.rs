use datafusion::arrow::array::Int64Array;
use datafusion::prelude::*;
use datafusion_vcf_table::catalog::CatalogOptions;
use datafusion_vcf_table::{
    merge_artifacts, run_sharded_scan, MergeOptions, ShardWriteOptions, VcfCatalog,
};
use datafusion_vcf_table_core::shard_planner::ShardAssignment;
use noodles::vcf;
use std::sync::Arc;

const SAMPLE_VCF: &str = r#"##fileformat=VCFv4.3
##contig=<ID=chr1>
##contig=<ID=chr2>
##INFO=<ID=DP,Number=1,Type=Integer,Description="Combined depth">
#CHROM	POS	ID	REF	ALT	QUAL	FILTER	INFO
chr1	100	rs1	A	T	60	PASS	DP=20
chr1	200	rs2	G	C	80	PASS	DP=25
chr2	300	.	C	T	70	PASS	DP=30
chr2	400	.	T	G	50	PASS	DP=40
"#;

fn catalog() -> Arc<VcfCatalog> {
    let mut reader = vcf::io::Reader::new(SAMPLE_VCF.as_bytes());
    let header = reader.read_header().unwrap();
    Arc::new(VcfCatalog::from_header(&header, &CatalogOptions::default()).unwrap())
}

#[tokio::test]
async fn export_and_query_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir().unwrap();
    let vcf_path = dir.path().join("sample.vcf");
    std::fs::write(&vcf_path, SAMPLE_VCF).unwrap();
    let catalog = catalog();

    // One whole-file shard: the degraded plan used without an index.
    let plan = vec![ShardAssignment {
        contigs: vec![],
        estimated_records: 4,
    }];
    let shard_dir = dir.path().join("shards");
    let summary = run_sharded_scan(
        vcf_path.to_str().unwrap(),
        None,
        &catalog,
        &plan,
        &shard_dir,
        &ShardWriteOptions::default(),
    )?;
    assert_eq!(summary.artifacts.len(), 1);
    assert_eq!(summary.artifacts[0].record_count, 4);
    assert_eq!(summary.failed_shards, 0);

    let merged_dir = dir.path().join("merged");
    let dataset = merge_artifacts(
        &catalog,
        &summary.artifacts,
        &merged_dir,
        &MergeOptions::default(),
    )?;
    assert_eq!(dataset.record_count, 4);

    let ctx = SessionContext::new();
    let df = ctx
        .read_parquet(
            dataset.files[0].to_str().unwrap().to_string(),
            ParquetReadOptions::default(),
        )
        .await?;
    let df = df.sort(vec![ident("POS").sort(true, false)])?;
    let batches = df.collect().await?;
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 4);
    let positions = batches[0]
        .column_by_name("POS")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(positions.value(0), 100);
    Ok(())
}

#[tokio::test]
async fn hive_layout_is_queryable_by_partition() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir().unwrap();
    let vcf_path = dir.path().join("sample.vcf");
    std::fs::write(&vcf_path, SAMPLE_VCF).unwrap();
    let catalog = catalog();

    let plan = vec![ShardAssignment {
        contigs: vec![],
        estimated_records: 4,
    }];
    let shard_dir = dir.path().join("shards");
    let summary = run_sharded_scan(
        vcf_path.to_str().unwrap(),
        None,
        &catalog,
        &plan,
        &shard_dir,
        &ShardWriteOptions::default(),
    )?;

    let merged_dir = dir.path().join("merged");
    let options = MergeOptions {
        hive_partition_column: Some("CHROM".to_string()),
        ..Default::default()
    };
    let dataset = merge_artifacts(&catalog, &summary.artifacts, &merged_dir, &options)?;
    assert_eq!(dataset.files.len(), 2);
    assert!(merged_dir.join("CHROM=chr1/part-00000.parquet").exists());

    // The partition column survives inside the data files, so each file is
    // independently queryable.
    let ctx = SessionContext::new();
    let df = ctx
        .read_parquet(
            merged_dir
                .join("CHROM=chr2/part-00000.parquet")
                .to_str()
                .unwrap()
                .to_string(),
            ParquetReadOptions::default(),
        )
        .await?;
    let batches = df.collect().await?;
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 2);
    assert!(batches[0].column_by_name("CHROM").is_some());
    Ok(())
}

#[tokio::test]
async fn failed_shard_is_counted_and_survivors_merge() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir().unwrap();
    let vcf_path = dir.path().join("sample.vcf");
    std::fs::write(&vcf_path, SAMPLE_VCF).unwrap();
    let catalog = catalog();

    // The indexed shard fails (no index exists); the whole-file shard
    // survives, and the caller sees exactly one excluded shard.
    let plan = vec![
        ShardAssignment {
            contigs: vec!["chr1".to_string()],
            estimated_records: 2,
        },
        ShardAssignment {
            contigs: vec![],
            estimated_records: 4,
        },
    ];
    let shard_dir = dir.path().join("shards");
    let summary = run_sharded_scan(
        vcf_path.to_str().unwrap(),
        None,
        &catalog,
        &plan,
        &shard_dir,
        &ShardWriteOptions::default(),
    )?;
    assert_eq!(summary.failed_shards, 1);
    assert_eq!(summary.artifacts.len(), 1);

    let merged_dir = dir.path().join("merged");
    let dataset = merge_artifacts(
        &catalog,
        &summary.artifacts,
        &merged_dir,
        &MergeOptions::default(),
    )?;
    assert_eq!(dataset.record_count, 4);

    let ctx = SessionContext::new();
    let df = ctx
        .read_parquet(
            dataset.files[0].to_str().unwrap().to_string(),
            ParquetReadOptions::default(),
        )
        .await?;
    let batches = df.collect().await?;
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 4);
    Ok(())
}
