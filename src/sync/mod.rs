//! Genome synchronization: one sequential scan per chromosome across every
//! declared genome, producing an [`OffsetTable`] plus diagnostics.
//!
//! Records of each genome file must arrive sorted by position. A file that
//! goes backwards aborts that chromosome with [`SyncError::OutOfOrderRecord`];
//! everything else that is wrong with a record is reported as a
//! [`Diagnostic`] and the scan carries on.

mod diagnostics;
mod merge;
mod scan;
mod state;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use merge::{merge_locus, merge_pair, overlay_insertions, stack_insertions};
pub use state::ScanState;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::genomics::{ChromosomeCatalog, GenomeFile};
use crate::ledger::OffsetTable;
use scan::ChromosomeScan;

/// Errors that end a synchronization or lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Requested chromosome is not in the catalog.
    #[error("unknown chromosome '{0}'")]
    UnknownChromosome(String),

    /// A genome file went backwards; the chromosome's table would be wrong.
    #[error("out-of-order record in {genome_file} on {chromosome}: {position} after {previous}")]
    OutOfOrderRecord {
        /// Chromosome being scanned.
        chromosome: String,
        /// Offending genome file.
        genome_file: String,
        /// Position of the offending record.
        position: i64,
        /// Position of the record before it.
        previous: i64,
    },

    /// Scan abandoned through the cancellation flag.
    #[error("synchronization of {chromosome} cancelled")]
    Cancelled {
        /// Chromosome whose scan was abandoned.
        chromosome: String,
    },

    /// Two samples share a genome name.
    #[error("genome '{0}' is declared more than once")]
    DuplicateGenome(String),

    /// Genome not part of the synchronized set.
    #[error("unknown genome '{0}'")]
    UnknownGenome(String),

    /// Chromosome has no offset table yet.
    #[error("chromosome '{0}' has not been synchronized")]
    NotSynchronized(String),

    /// Scan lifecycle violated.
    #[error("invalid scan transition {from} -> {to}")]
    InvalidTransition {
        /// State left.
        from: ScanState,
        /// State requested.
        to: ScanState,
    },
}

/// Cooperative cancellation shared between a host and running scans.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// New, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask running scans to stop at the next record.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Synchronization settings.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Whether variant replay yields blank padding.
    pub emit_blank_variants: bool,
    /// Whether simultaneous insertions from different genomes stack.
    pub stack_insertions: bool,
    /// Whether batch synchronization runs chromosomes in parallel.
    pub parallel: bool,
    /// Optional cancellation flag checked between records.
    pub cancellation: Option<CancellationFlag>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            emit_blank_variants: true,
            stack_insertions: true,
            parallel: true,
            cancellation: None,
        }
    }
}

impl SyncConfig {
    /// Toggle blank padding in replay.
    pub fn with_blank_variants(mut self, enabled: bool) -> Self {
        self.emit_blank_variants = enabled;
        self
    }

    /// Toggle insertion stacking.
    pub fn with_insertion_stacking(mut self, enabled: bool) -> Self {
        self.stack_insertions = enabled;
        self
    }

    /// Toggle parallel batch synchronization.
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Attach a cancellation flag.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationFlag::is_cancelled)
    }
}

/// Result of one chromosome scan.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Offset table for every declared genome-allele.
    pub table: OffsetTable,
    /// Non-fatal conditions, in encounter order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Where a genome's genotypes live.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GenomeSlot {
    pub(crate) file: usize,
    pub(crate) sample: usize,
}

/// Drives chromosome scans against a shared, read-only catalog.
#[derive(Debug, Clone)]
pub struct GenomeSynchronizer {
    catalog: Arc<ChromosomeCatalog>,
    config: SyncConfig,
}

impl GenomeSynchronizer {
    /// Create a synchronizer.
    pub fn new(catalog: Arc<ChromosomeCatalog>, config: SyncConfig) -> Self {
        Self { catalog, config }
    }

    /// Chromosome catalog.
    pub fn catalog(&self) -> &ChromosomeCatalog {
        &self.catalog
    }

    /// Configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Synchronize one chromosome across all genome files.
    ///
    /// Records on chromosomes missing from the catalog are reported here.
    pub fn synchronize(
        &self,
        chromosome: &str,
        files: &[GenomeFile],
    ) -> Result<SyncOutcome, SyncError> {
        self.scan(chromosome, files, true)
    }

    pub(crate) fn scan(
        &self,
        chromosome: &str,
        files: &[GenomeFile],
        report_unknown: bool,
    ) -> Result<SyncOutcome, SyncError> {
        let chromosome = self
            .catalog
            .get(chromosome)
            .cloned()
            .ok_or_else(|| SyncError::UnknownChromosome(chromosome.to_string()))?;
        let (names, slots) = declare_genomes(files)?;

        let mut scan = ChromosomeScan::new(&self.config, chromosome, names, slots);
        scan.begin()?;
        let prepared = match scan.prepare(files, &self.catalog, report_unknown) {
            Ok(prepared) => prepared,
            Err(err) => {
                scan.abort(&err)?;
                return Err(err);
            }
        };
        if let Err(err) = scan.run(&prepared) {
            scan.abort(&err)?;
            return Err(err);
        }
        scan.finish()
    }

    /// Diagnostics for records whose chromosome is not in the catalog.
    pub fn unknown_chromosome_records(&self, files: &[GenomeFile]) -> Vec<Diagnostic> {
        files
            .iter()
            .flat_map(|file| {
                file.records
                    .iter()
                    .filter(|record| !self.catalog.contains(&record.chrom))
                    .map(move |record| {
                        Diagnostic::new(
                            DiagnosticKind::UnknownChromosome,
                            &record.chrom,
                            &file.name,
                            record.position,
                            format!("chromosome '{}' is not in the catalog", record.chrom),
                        )
                    })
            })
            .collect()
    }
}

/// Flatten file samples into the declared genome order.
fn declare_genomes(files: &[GenomeFile]) -> Result<(Vec<Arc<str>>, Vec<GenomeSlot>), SyncError> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut slots = Vec::new();
    for (file_idx, file) in files.iter().enumerate() {
        for (sample_idx, sample) in file.samples.iter().enumerate() {
            if !seen.insert(Arc::clone(sample)) {
                return Err(SyncError::DuplicateGenome(sample.to_string()));
            }
            names.push(Arc::clone(sample));
            slots.push(GenomeSlot {
                file: file_idx,
                sample: sample_idx,
            });
        }
    }
    Ok((names, slots))
}
