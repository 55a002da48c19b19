//! One chromosome scan: a k-way merge of every genome file's records by
//! REFERENCE position, advancing all allele cursors in lockstep.

use std::sync::Arc;

use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::merge::{merge_locus, overlay_insertions, stack_insertions};
use super::state::ScanState;
use super::{GenomeSlot, SyncConfig, SyncError, SyncOutcome};
use crate::coords;
use crate::cursor::{AlleleCall, AlleleCursor, AlleleSlot};
use crate::genomics::{Chromosome, ChromosomeCatalog, GenomeFile, Genotype, VariantRecord};
use crate::ledger::{Breakpoint, EventKind, LocusEvent, OffsetTable};
use crate::resolver::{resolve_record, Resolution};

/// A record on the scanned chromosome with its lengths resolved.
#[derive(Debug)]
pub(super) struct PreparedRecord<'f> {
    record: &'f VariantRecord,
    resolution: Resolution,
}

/// One genome file's usable records, in file order.
#[derive(Debug)]
pub(super) struct PreparedFile<'f> {
    file: &'f GenomeFile,
    records: Vec<PreparedRecord<'f>>,
}

#[derive(Debug)]
pub(super) struct ChromosomeScan<'c> {
    config: &'c SyncConfig,
    state: ScanState,
    chromosome: Arc<str>,
    table: OffsetTable,
    slots: Vec<GenomeSlot>,
    cursors: Vec<[AlleleCursor; 2]>,
    diagnostics: Vec<Diagnostic>,
    pending: Vec<(usize, AlleleSlot, LocusEvent)>,
    pending_index: Option<usize>,
    /// Meta-genome room opened after the anchor of the pending locus.
    locus_width: i64,
}

impl<'c> ChromosomeScan<'c> {
    pub(super) fn new(
        config: &'c SyncConfig,
        chromosome: Chromosome,
        genomes: Vec<Arc<str>>,
        slots: Vec<GenomeSlot>,
    ) -> Self {
        let cursors = vec![AlleleSlot::BOTH.map(AlleleCursor::new); genomes.len()];
        Self {
            config,
            state: ScanState::Idle,
            chromosome: Arc::clone(chromosome.name()),
            table: OffsetTable::new(chromosome, genomes),
            slots,
            cursors,
            diagnostics: Vec::new(),
            pending: Vec::new(),
            pending_index: None,
            locus_width: 0,
        }
    }

    fn move_to(&mut self, next: ScanState) -> Result<(), SyncError> {
        let from = self.state;
        self.state = from.transition(next)?;
        tracing::debug!(chromosome = %self.chromosome, %from, to = %next, "scan state");
        Ok(())
    }

    pub(super) fn begin(&mut self) -> Result<(), SyncError> {
        self.move_to(ScanState::Scanning)
    }

    /// Abandon the scan; everything gathered so far is dropped.
    pub(super) fn abort(&mut self, reason: &SyncError) -> Result<(), SyncError> {
        tracing::warn!(chromosome = %self.chromosome, %reason, "scan aborted");
        self.pending.clear();
        self.move_to(ScanState::Idle)
    }

    pub(super) fn finish(mut self) -> Result<SyncOutcome, SyncError> {
        self.move_to(ScanState::Finalizing)?;
        self.flush();
        self.move_to(ScanState::Idle)?;
        tracing::info!(
            chromosome = %self.chromosome,
            positions = self.table.positions().len(),
            breakpoints = self.table.breakpoint_count(),
            diagnostics = self.diagnostics.len(),
            "chromosome synchronized"
        );
        Ok(SyncOutcome {
            table: self.table,
            diagnostics: self.diagnostics,
        })
    }

    fn report(
        &mut self,
        kind: DiagnosticKind,
        chromosome: &Arc<str>,
        file: &GenomeFile,
        position: i64,
        message: String,
    ) {
        self.diagnostics
            .push(Diagnostic::new(kind, chromosome, &file.name, position, message));
    }

    /// Filter, validate and resolve every file's records for this chromosome.
    pub(super) fn prepare<'f>(
        &mut self,
        files: &'f [GenomeFile],
        catalog: &ChromosomeCatalog,
        report_unknown: bool,
    ) -> Result<Vec<PreparedFile<'f>>, SyncError> {
        files
            .iter()
            .map(|file| self.prepare_file(file, catalog, report_unknown))
            .collect()
    }

    fn prepare_file<'f>(
        &mut self,
        file: &'f GenomeFile,
        catalog: &ChromosomeCatalog,
        report_unknown: bool,
    ) -> Result<PreparedFile<'f>, SyncError> {
        let mut records = Vec::new();
        let mut previous: Option<i64> = None;
        for record in &file.records {
            if record.chrom != self.chromosome {
                if report_unknown && !catalog.contains(&record.chrom) {
                    self.report(
                        DiagnosticKind::UnknownChromosome,
                        &record.chrom,
                        file,
                        record.position,
                        format!("chromosome '{}' is not in the catalog", record.chrom),
                    );
                }
                continue;
            }

            if let Some(previous) = previous.filter(|&previous| record.position < previous) {
                return Err(SyncError::OutOfOrderRecord {
                    chromosome: self.chromosome.to_string(),
                    genome_file: file.name.to_string(),
                    position: record.position,
                    previous,
                });
            }
            previous = Some(record.position);

            let chromosome = Arc::clone(&self.chromosome);
            let length = self.table.chromosome().length();
            if !self.table.chromosome().contains(record.position) {
                self.report(
                    DiagnosticKind::MalformedRecord,
                    &chromosome,
                    file,
                    record.position,
                    format!("position outside 1..={length}"),
                );
                continue;
            }

            let resolution = match resolve_record(record) {
                Ok(resolution) => resolution,
                Err(err) => {
                    self.report(
                        DiagnosticKind::MalformedRecord,
                        &chromosome,
                        file,
                        record.position,
                        err.to_string(),
                    );
                    continue;
                }
            };
            let oversized = resolution.alleles.iter().enumerate().find(|(_, allele)| {
                allele.length.unsigned_abs() > length.unsigned_abs() || allele.extent > length
            });
            if let Some((index, allele)) = oversized {
                self.report(
                    DiagnosticKind::MalformedRecord,
                    &chromosome,
                    file,
                    record.position,
                    format!(
                        "ALT #{index} spans {} bases, longer than the chromosome ({length})",
                        allele.length.unsigned_abs().max(allele.extent.unsigned_abs())
                    ),
                );
                continue;
            }
            for warning in &resolution.warnings {
                self.report(
                    DiagnosticKind::UnresolvedStructuralVariant,
                    &chromosome,
                    file,
                    record.position,
                    format!("ALT #{}: {}", warning.allele, warning.detail),
                );
            }
            records.push(PreparedRecord { record, resolution });
        }
        Ok(PreparedFile { file, records })
    }

    /// Consume prepared records in position order.
    ///
    /// Several records at one position in one file are taken one per round,
    /// so each round sees at most one record per file.
    pub(super) fn run(&mut self, prepared: &[PreparedFile<'_>]) -> Result<(), SyncError> {
        let mut heads = vec![0usize; prepared.len()];
        loop {
            let next = prepared
                .iter()
                .zip(&heads)
                .filter_map(|(file, &head)| file.records.get(head))
                .map(|entry| entry.record.position)
                .min();
            let Some(position) = next else {
                return Ok(());
            };
            if self.config.is_cancelled() {
                return Err(SyncError::Cancelled {
                    chromosome: self.chromosome.to_string(),
                });
            }

            let round: Vec<Option<&PreparedRecord<'_>>> = prepared
                .iter()
                .zip(heads.iter_mut())
                .map(|(file, head)| match file.records.get(*head) {
                    Some(entry) if entry.record.position == position => {
                        *head += 1;
                        Some(entry)
                    }
                    _ => None,
                })
                .collect();
            self.process_round(position, prepared, &round);
        }
    }

    fn process_round(
        &mut self,
        position: i64,
        prepared: &[PreparedFile<'_>],
        round: &[Option<&PreparedRecord<'_>>],
    ) {
        let position_index = self.table.push_position(position);
        if self.pending_index != Some(position_index) {
            self.flush();
            self.pending_index = Some(position_index);
            self.locus_width = 0;
        }
        let floor = self.locus_width;
        tracing::trace!(chromosome = %self.chromosome, position, "round");

        for genome in 0..self.slots.len() {
            let GenomeSlot { file, sample } = self.slots[genome];
            let pair = match round[file] {
                Some(entry) => {
                    let calls = self.calls(prepared[file].file, entry.record, sample);
                    let mut pair = self.cursors[genome];
                    for slot in AlleleSlot::BOTH {
                        let cursor = pair[slot.index()].advance(
                            position,
                            &entry.resolution,
                            calls[slot.index()],
                        );
                        pair[slot.index()] = self.check_overlap(cursor, prepared[file].file);
                    }
                    pair
                }
                None => self.cursors[genome].map(|cursor| cursor.idle(position)),
            };
            self.cursors[genome] = pair.map(|cursor| cursor.resume(floor));
        }

        if self.config.stack_insertions {
            stack_insertions(&mut self.cursors, floor);
        } else {
            overlay_insertions(&mut self.cursors, floor);
        }
        merge_locus(&mut self.cursors);
        self.locus_width = self
            .cursors
            .iter()
            .flatten()
            .map(AlleleCursor::locus_width)
            .fold(floor, i64::max);

        for genome in 0..self.cursors.len() {
            for slot in AlleleSlot::BOTH {
                let cursor = self.cursors[genome][slot.index()];
                self.buffer_events(genome, slot, position_index, &cursor);
                self.cursors[genome][slot.index()] = self.fold(genome, slot, position, cursor);
            }
        }
    }

    /// Genotype calls of one sample, one per slot.
    fn calls(&mut self, file: &GenomeFile, record: &VariantRecord, sample: usize) -> [AlleleCall; 2] {
        let chromosome = Arc::clone(&self.chromosome);
        let sample_name = file
            .samples
            .get(sample)
            .map_or_else(|| format!("#{sample}"), |name| name.to_string());
        let genotype = match record.genotype(sample).map(str::parse::<Genotype>) {
            Some(Ok(genotype)) => genotype,
            Some(Err(err)) => {
                self.report(
                    DiagnosticKind::MalformedRecord,
                    &chromosome,
                    file,
                    record.position,
                    format!("sample {sample_name}: {err}"),
                );
                return [AlleleCall::NoCall; 2];
            }
            None => {
                self.report(
                    DiagnosticKind::MalformedRecord,
                    &chromosome,
                    file,
                    record.position,
                    format!("sample {sample_name}: no genotype"),
                );
                return [AlleleCall::NoCall; 2];
            }
        };

        let alt_count = record.alternates.len();
        AlleleSlot::BOTH.map(|slot| {
            match AlleleCall::from_genotype(genotype.allele(slot.index()), alt_count) {
                Ok(call) => call,
                Err(index) => {
                    self.report(
                        DiagnosticKind::GenotypeOutOfRange,
                        &chromosome,
                        file,
                        record.position,
                        format!(
                            "sample {sample_name} allele {slot}: index {index} with {alt_count} ALT(s)"
                        ),
                    );
                    AlleleCall::NoCall
                }
            }
        })
    }

    /// A call starting before the previous variant on the same allele ended
    /// falls back to the reference.
    fn check_overlap(&mut self, cursor: AlleleCursor, file: &GenomeFile) -> AlleleCursor {
        if !cursor.has_variant() {
            return cursor;
        }
        let position = cursor.current_start(coords::CoordinateSystem::Reference);
        match coords::remaining_length(cursor.last_stop(), position) {
            Ok(_) => cursor,
            Err(underflow) => {
                let chromosome = Arc::clone(&self.chromosome);
                self.report(
                    DiagnosticKind::OffsetUnderflow,
                    &chromosome,
                    file,
                    position,
                    format!(
                        "allele {} overlaps the variant ending at {} by {} base(s)",
                        cursor.slot(),
                        cursor.last_stop(),
                        underflow.deficit
                    ),
                );
                cursor.degrade_to_reference()
            }
        }
    }

    fn buffer_events(
        &mut self,
        genome: usize,
        slot: AlleleSlot,
        position_index: usize,
        cursor: &AlleleCursor,
    ) {
        if let (Some(class), Some(allele)) = (cursor.class(), cursor.allele()) {
            self.pending.push((
                genome,
                slot,
                LocusEvent {
                    position_index,
                    kind: EventKind::Call {
                        class,
                        length: cursor.current_length(),
                        extent: allele.extent,
                        extra: cursor.offsets().extra,
                    },
                },
            ));
        }
        for (skip, length) in cursor.padding() {
            if length > 0 {
                self.pending.push((
                    genome,
                    slot,
                    LocusEvent {
                        position_index,
                        kind: EventKind::Padding { skip, length },
                    },
                ));
            }
        }
    }

    /// Fold the cursor's call into its offsets and record a breakpoint when
    /// they moved.
    fn fold(
        &mut self,
        genome: usize,
        slot: AlleleSlot,
        position: i64,
        cursor: AlleleCursor,
    ) -> AlleleCursor {
        let before = *cursor.offsets();
        let after = cursor.accumulate();
        let offsets = after.offsets();
        if offsets.initial_reference != before.initial_reference
            || offsets.initial_meta_genome != before.initial_meta_genome
        {
            self.table.track_mut(genome, slot).push_breakpoint(Breakpoint {
                position: after.current_stop(),
                span_start: position + 1,
                reference_offset: offsets.initial_reference,
                meta_offset: offsets.initial_meta_genome,
            });
        }
        after
    }

    /// Hand the pending locus's events to their tracks, each allele's in
    /// replay order.
    fn flush(&mut self) {
        self.pending
            .sort_by_key(|(genome, slot, event)| (*genome, *slot, event.kind.locus_order()));
        for (genome, slot, event) in self.pending.drain(..) {
            self.table.track_mut(genome, slot).push_event(event);
        }
    }
}
