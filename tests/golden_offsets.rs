#[path = "common/mod.rs"]
mod common;

use common::{assert_snapshot, call, genome, synchronize};
use multigenome::genomics::render_offsets;
use multigenome::{GenomeFile, Variants};

fn two_genomes() -> Vec<GenomeFile> {
    vec![
        genome(
            "G1",
            vec![call(100, "A", "ATT", "1|1"), call(200, "ACGT", "A", "0|1")],
        ),
        genome(
            "G2",
            vec![call(100, "A", "AT", "1|0"), call(150, "A", "G", "1|1")],
        ),
    ]
}

#[test]
fn offset_table_matches_golden() {
    let outcome = synchronize(&two_genomes());
    assert!(outcome.diagnostics.is_empty());
    let actual = render_offsets(&outcome.table).expect("rendering succeeds");
    assert_snapshot("offsets/two_genomes.tsv", &actual);
}

#[test]
fn variant_replay_matches_golden() {
    let table = synchronize(&two_genomes()).table;
    let mut actual = String::new();
    for name in ["G1", "G2"] {
        for variant in &Variants::new(&table, name, true).expect("genome exists") {
            actual.push_str(&format!("{variant}\n"));
        }
    }
    assert_snapshot("variants/two_genomes.tsv", &actual);
}
