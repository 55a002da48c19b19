//! Input data model: chromosomes, genotype calls, tokenized records and
//! genome files, plus the text reader and table writer used by the CLI.
//!
//! The engine itself only consumes the in-memory types; [`vcf`] is a thin
//! convenience layer on top of them.

mod types;
pub mod vcf;

pub use types::{
    Chromosome, ChromosomeCatalog, GenomeFile, Genotype, GenotypeError, VariantRecord,
};
pub use vcf::{read_genome_file, render_offsets, write_offsets, RecordError};
