use datafusion::arrow::array::Int64Array;
use datafusion::prelude::*;
use datafusion_vcf_table::{VcfTableOptions, VcfTableProvider};
use flate2::write::GzEncoder;
use noodles::bgzf;
use std::io::Write;
use std::sync::Arc;

const SAMPLE_VCF: &str = r#"##fileformat=VCFv4.3
##contig=<ID=chr1>
##INFO=<ID=DP,Number=1,Type=Integer,Description="Combined depth">
#CHROM	POS	ID	REF	ALT	QUAL	FILTER	INFO
chr1	100	rs1	A	T	60	PASS	DP=20
chr1	200	rs2	G	C	80	PASS	DP=25
chr1	300	.	C	T	70	PASS	DP=30
"#;

async fn query_positions(path: &str) -> Vec<i64> {
    let table = VcfTableProvider::try_new(path, VcfTableOptions::default()).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("variants", Arc::new(table)).unwrap();
    let df = ctx
        .sql(r#"SELECT "POS" FROM variants ORDER BY "POS""#)
        .await
        .unwrap();
    let batches = df.collect().await.unwrap();
    batches
        .iter()
        .flat_map(|b| {
            b.column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap()
                .values()
                .to_vec()
        })
        .collect()
}

#[tokio::test]
async fn bgzf_compressed_vcf_scans() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.vcf.gz");
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = bgzf::Writer::new(file);
    writer.write_all(SAMPLE_VCF.as_bytes()).unwrap();
    writer.finish().unwrap();

    let positions = query_positions(path.to_str().unwrap()).await;
    assert_eq!(positions, vec![100, 200, 300]);
}

#[tokio::test]
async fn plain_gzip_vcf_scans() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.vcf.gz");
    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(file, flate2::Compression::default());
    encoder.write_all(SAMPLE_VCF.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let positions = query_positions(path.to_str().unwrap()).await;
    assert_eq!(positions, vec![100, 200, 300]);
}

#[tokio::test]
async fn uncompressed_vcf_scans() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.vcf");
    std::fs::write(&path, SAMPLE_VCF).unwrap();

    let positions = query_positions(path.to_str().unwrap()).await;
    assert_eq!(positions, vec![100, 200, 300]);
}
