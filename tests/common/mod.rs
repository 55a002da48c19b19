#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use multigenome::{
    ChromosomeCatalog, GenomeFile, GenomeSynchronizer, SyncConfig, SyncOutcome, VariantRecord,
};

pub const CHROM: &str = "chr1";

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("MULTIGENOME_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set MULTIGENOME_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Single-ALT record on [`CHROM`] with one genotype column.
pub fn call(position: i64, reference: &str, alternate: &str, genotype: &str) -> VariantRecord {
    VariantRecord::new(
        CHROM,
        position,
        reference,
        vec![alternate.to_string()],
        vec![genotype.to_string()],
    )
}

pub fn genome(name: &str, records: Vec<VariantRecord>) -> GenomeFile {
    GenomeFile::single(name, records)
}

pub fn catalog() -> Arc<ChromosomeCatalog> {
    Arc::new(ChromosomeCatalog::from_pairs([(CHROM, 100_000), ("chr2", 50_000)]))
}

pub fn synchronize(files: &[GenomeFile]) -> SyncOutcome {
    synchronize_with(files, SyncConfig::default())
}

pub fn synchronize_with(files: &[GenomeFile], config: SyncConfig) -> SyncOutcome {
    GenomeSynchronizer::new(catalog(), config)
        .synchronize(CHROM, files)
        .expect("synchronization succeeds")
}
