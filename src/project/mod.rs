//! Per-chromosome offset tables of one set of genome files.
//!
//! A [`SyncProject`] owns the synchronizer and the finished outcomes keyed
//! by chromosome. Each chromosome is written by exactly one scan, so batch
//! synchronization fans chromosomes out over a `rayon` pool without locks.

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::coords::CoordinateSystem;
use crate::cursor::AlleleSlot;
use crate::genomics::{ChromosomeCatalog, GenomeFile};
use crate::ledger::OffsetTable;
use crate::sync::{Diagnostic, GenomeSynchronizer, SyncConfig, SyncError, SyncOutcome};
use crate::variant::Variants;

/// Outcome of [`SyncProject::synchronize_all`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-chromosome result, in catalog order.
    pub results: Vec<(Arc<str>, Result<(), SyncError>)>,
    /// Records naming chromosomes missing from the catalog, reported once.
    pub diagnostics: Vec<Diagnostic>,
}

impl BatchReport {
    /// Chromosomes whose scan failed.
    pub fn failures(&self) -> impl Iterator<Item = (&Arc<str>, &SyncError)> {
        self.results
            .iter()
            .filter_map(|(name, result)| result.as_ref().err().map(|err| (name, err)))
    }

    /// Whether every chromosome synchronized.
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Synchronized offset tables across chromosomes.
#[derive(Debug)]
pub struct SyncProject {
    synchronizer: GenomeSynchronizer,
    outcomes: HashMap<Arc<str>, SyncOutcome>,
}

impl SyncProject {
    /// Create an empty project.
    pub fn new(catalog: ChromosomeCatalog, config: SyncConfig) -> Self {
        Self {
            synchronizer: GenomeSynchronizer::new(Arc::new(catalog), config),
            outcomes: HashMap::new(),
        }
    }

    /// Synchronizer shared by every scan.
    pub fn synchronizer(&self) -> &GenomeSynchronizer {
        &self.synchronizer
    }

    /// Synchronize one chromosome and keep its table.
    ///
    /// On failure any table kept from an earlier scan stays in place.
    pub fn synchronize(
        &mut self,
        chromosome: &str,
        files: &[GenomeFile],
    ) -> Result<&SyncOutcome, SyncError> {
        let outcome = self.synchronizer.synchronize(chromosome, files)?;
        let key = Arc::clone(outcome.table.chromosome().name());
        self.outcomes.insert(Arc::clone(&key), outcome);
        self.outcome(&key)
            .ok_or_else(|| SyncError::NotSynchronized(key.to_string()))
    }

    /// Synchronize every catalog chromosome.
    ///
    /// Runs in parallel when the configuration allows it. A failing
    /// chromosome does not affect the others.
    pub fn synchronize_all(&mut self, files: &[GenomeFile]) -> BatchReport {
        let names: Vec<Arc<str>> = self
            .synchronizer
            .catalog()
            .iter()
            .map(|chromosome| Arc::clone(chromosome.name()))
            .collect();
        tracing::info!(
            chromosomes = names.len(),
            files = files.len(),
            parallel = self.synchronizer.config().parallel,
            "synchronizing batch"
        );

        let synchronizer = &self.synchronizer;
        let scan = |name: &Arc<str>| (Arc::clone(name), synchronizer.scan(name, files, false));
        let scanned: Vec<(Arc<str>, Result<SyncOutcome, SyncError>)> =
            if synchronizer.config().parallel {
                names.par_iter().map(scan).collect()
            } else {
                names.iter().map(scan).collect()
            };

        let mut report = BatchReport {
            results: Vec::with_capacity(scanned.len()),
            diagnostics: self.synchronizer.unknown_chromosome_records(files),
        };
        for (name, result) in scanned {
            let result = result.map(|outcome| {
                self.outcomes.insert(Arc::clone(&name), outcome);
            });
            if let Err(err) = &result {
                tracing::warn!(chromosome = %name, %err, "chromosome not synchronized");
            }
            report.results.push((name, result));
        }
        report
    }

    /// Chromosomes with a table, in catalog order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &Arc<str>> {
        self.synchronizer
            .catalog()
            .iter()
            .map(|chromosome| chromosome.name())
            .filter(|name| self.outcomes.contains_key(*name))
    }

    /// Outcome of a synchronized chromosome.
    pub fn outcome(&self, chromosome: &str) -> Option<&SyncOutcome> {
        self.outcomes.get(chromosome)
    }

    /// Offset table of a synchronized chromosome.
    pub fn table(&self, chromosome: &str) -> Result<&OffsetTable, SyncError> {
        match self.outcomes.get(chromosome) {
            Some(outcome) => Ok(&outcome.table),
            None if self.synchronizer.catalog().contains(chromosome) => {
                Err(SyncError::NotSynchronized(chromosome.to_string()))
            }
            None => Err(SyncError::UnknownChromosome(chromosome.to_string())),
        }
    }

    /// Diagnostics collected while synchronizing a chromosome.
    pub fn diagnostics(&self, chromosome: &str) -> &[Diagnostic] {
        self.outcomes
            .get(chromosome)
            .map(|outcome| outcome.diagnostics.as_slice())
            .unwrap_or_default()
    }

    /// Translate a REFERENCE position for one genome-allele.
    pub fn translate(
        &self,
        genome: &str,
        slot: AlleleSlot,
        chromosome: &str,
        position: i64,
        target: CoordinateSystem,
    ) -> Result<i64, SyncError> {
        self.translate_between(
            genome,
            slot,
            chromosome,
            position,
            CoordinateSystem::Reference,
            target,
        )
    }

    /// Translate a position between any two coordinate systems.
    pub fn translate_between(
        &self,
        genome: &str,
        slot: AlleleSlot,
        chromosome: &str,
        position: i64,
        source: CoordinateSystem,
        target: CoordinateSystem,
    ) -> Result<i64, SyncError> {
        let table = self.table(chromosome)?;
        let genome_index = table
            .genome_index(genome)
            .ok_or_else(|| SyncError::UnknownGenome(genome.to_string()))?;
        let track = table
            .track(genome_index, slot)
            .ok_or_else(|| SyncError::UnknownGenome(genome.to_string()))?;
        Ok(track.translate_between(position, source, target))
    }

    /// Re-iterable variant replay of one genome on one chromosome.
    pub fn variants(&self, genome: &str, chromosome: &str) -> Result<Variants<'_>, SyncError> {
        let table = self.table(chromosome)?;
        Variants::new(
            table,
            genome,
            self.synchronizer.config().emit_blank_variants,
        )
    }
}
