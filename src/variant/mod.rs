//! Typed variants replayed from an offset table.
//!
//! A [`Variant`] is only ever built here, from the call and padding events a
//! chromosome scan recorded. Starts are META_GENOME positions; the variant
//! also keeps the index of its REFERENCE position in the table's shared
//! position array so every coordinate system resolves through one lookup.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::coords::{self, CoordinateSystem};
use crate::cursor::AlleleSlot;
use crate::ledger::{AlleleTrack, EventKind, LocusEvent, OffsetTable};
use crate::resolver::{AlleleClass, SvType};
use crate::sync::SyncError;

/// Variant discriminant, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VariantType {
    /// Single-base substitution.
    SingleNucleotide,
    /// Insertion.
    Insertion,
    /// Deletion.
    Deletion,
    /// Multi-base or unequal substitution.
    Mix,
    /// Declared structural variant.
    Structural,
    /// Padding with no call of its own.
    Blank,
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VariantType::SingleNucleotide => "SNV",
            VariantType::Insertion => "INS",
            VariantType::Deletion => "DEL",
            VariantType::Mix => "MIX",
            VariantType::Structural => "SV",
            VariantType::Blank => "BLANK",
        })
    }
}

/// Type-specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VariantKind {
    /// Single-base substitution.
    SingleNucleotide,
    /// Inserted bases (`length > 0`).
    Insertion {
        /// Number of inserted bases.
        length: i64,
    },
    /// Deleted bases (`length < 0`).
    Deletion {
        /// Signed length delta.
        length: i64,
    },
    /// Substitution whose shape is neither SNV nor a clean indel.
    Mix {
        /// Signed length delta.
        length: i64,
        /// Bases spanned.
        extent: i64,
    },
    /// Declared structural variant.
    Structural {
        /// Declared type.
        sv_type: SvType,
        /// Signed length delta.
        length: i64,
        /// Bases spanned.
        extent: i64,
    },
    /// Padding that lines a genome up with other genomes' insertions.
    Blank {
        /// Padding width.
        length: i64,
    },
}

impl VariantKind {
    /// Kind for a resolved call, or `None` for placeholder alleles.
    pub fn from_call(class: AlleleClass, length: i64, extent: i64) -> Option<Self> {
        Some(match class {
            AlleleClass::Snv => VariantKind::SingleNucleotide,
            AlleleClass::Insertion => VariantKind::Insertion { length },
            AlleleClass::Deletion => VariantKind::Deletion { length },
            AlleleClass::Mnv | AlleleClass::Complex => VariantKind::Mix { length, extent },
            AlleleClass::Structural(sv_type) => VariantKind::Structural {
                sv_type,
                length,
                extent,
            },
            AlleleClass::Placeholder => return None,
        })
    }

    /// Discriminant.
    pub fn variant_type(&self) -> VariantType {
        match self {
            VariantKind::SingleNucleotide => VariantType::SingleNucleotide,
            VariantKind::Insertion { .. } => VariantType::Insertion,
            VariantKind::Deletion { .. } => VariantType::Deletion,
            VariantKind::Mix { .. } => VariantType::Mix,
            VariantKind::Structural { .. } => VariantType::Structural,
            VariantKind::Blank { .. } => VariantType::Blank,
        }
    }

    /// Signed length delta (padding width for blanks).
    pub fn length(&self) -> i64 {
        match *self {
            VariantKind::SingleNucleotide => 0,
            VariantKind::Insertion { length }
            | VariantKind::Deletion { length }
            | VariantKind::Mix { length, .. }
            | VariantKind::Structural { length, .. }
            | VariantKind::Blank { length } => length,
        }
    }

}

/// One call (or padding) of one genome-allele on one chromosome.
///
/// Equality and ordering only look at genome, chromosome, start and stop.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variant {
    genome: Arc<str>,
    chromosome: Arc<str>,
    slot: AlleleSlot,
    position_index: usize,
    start: i64,
    span: i64,
    kind: VariantKind,
}

impl Variant {
    /// Owning genome.
    pub fn genome(&self) -> &Arc<str> {
        &self.genome
    }

    /// Chromosome.
    pub fn chromosome(&self) -> &Arc<str> {
        &self.chromosome
    }

    /// Genotype slot of the allele carrying the call.
    pub fn slot(&self) -> AlleleSlot {
        self.slot
    }

    /// Index into the table's position array.
    pub fn position_index(&self) -> usize {
        self.position_index
    }

    /// REFERENCE position of the record, looked up through `table`.
    pub fn reference_position(&self, table: &OffsetTable) -> Option<i64> {
        table.position(self.position_index)
    }

    /// META_GENOME start.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// META_GENOME stop (exclusive).
    ///
    /// Room other genomes opened inside a deletion or a multi-base
    /// substitution counts towards its span.
    pub fn stop(&self) -> i64 {
        self.start + self.span
    }

    /// Signed length delta.
    pub fn length(&self) -> i64 {
        self.kind.length()
    }

    /// Payload.
    pub fn kind(&self) -> &VariantKind {
        &self.kind
    }

    /// Discriminant.
    pub fn variant_type(&self) -> VariantType {
        self.kind.variant_type()
    }

    /// Whether this is padding rather than a call.
    pub fn is_blank(&self) -> bool {
        matches!(self.kind, VariantKind::Blank { .. })
    }

    fn key(&self) -> (&str, &str, i64, i64) {
        (self.genome.as_ref(), self.chromosome.as_ref(), self.start, self.stop())
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Variant {}

impl PartialOrd for Variant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.genome,
            self.slot,
            self.chromosome,
            self.variant_type(),
            self.start,
            self.stop(),
            self.length()
        )?;
        if let VariantKind::Structural { sv_type, .. } = self.kind {
            write!(f, "\t{sv_type}")?;
        }
        Ok(())
    }
}

/// Re-iterable replay of one genome's variants on one chromosome.
///
/// Nothing is materialized; each [`Variants::iter`] call walks the table's
/// events again from the start.
#[derive(Debug, Clone, Copy)]
pub struct Variants<'t> {
    table: &'t OffsetTable,
    genome: usize,
    emit_blank: bool,
}

impl<'t> Variants<'t> {
    /// Replay `genome` from `table`.
    pub fn new(table: &'t OffsetTable, genome: &str, emit_blank: bool) -> Result<Self, SyncError> {
        let genome = table
            .genome_index(genome)
            .ok_or_else(|| SyncError::UnknownGenome(genome.to_string()))?;
        Ok(Self {
            table,
            genome,
            emit_blank,
        })
    }

    /// Fresh iterator, ordered by META_GENOME start (first slot on ties).
    pub fn iter(&self) -> VariantIter<'t> {
        let replays = AlleleSlot::BOTH.map(|slot| SlotReplay {
            slot,
            track: self.table.track(self.genome, slot),
            next: 0,
            covered: i64::MIN,
        });
        VariantIter {
            table: self.table,
            genome: Arc::clone(&self.table.genomes()[self.genome]),
            emit_blank: self.emit_blank,
            replays,
            heads: [None, None],
        }
    }
}

impl<'t> IntoIterator for &Variants<'t> {
    type Item = Variant;
    type IntoIter = VariantIter<'t>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
struct SlotReplay<'t> {
    slot: AlleleSlot,
    track: Option<&'t AlleleTrack>,
    next: usize,
    /// META_GENOME stop of the last call replayed.
    covered: i64,
}

impl<'t> SlotReplay<'t> {
    fn next_event(&mut self) -> Option<&'t LocusEvent> {
        let event = self.track?.events().get(self.next)?;
        self.next += 1;
        Some(event)
    }
}

/// Iterator returned by [`Variants::iter`].
#[derive(Debug, Clone)]
pub struct VariantIter<'t> {
    table: &'t OffsetTable,
    genome: Arc<str>,
    emit_blank: bool,
    replays: [SlotReplay<'t>; 2],
    heads: [Option<Variant>; 2],
}

impl<'t> VariantIter<'t> {
    /// META_GENOME interval of one event as `(start, span)`.
    ///
    /// Inserted bases and padding sit in the room after the anchor, `skip`
    /// bases in. A deletion covers the reference bases it removes, from the
    /// first base after that room; a substitution covers its own bases.
    fn interval(track: &AlleleTrack, position: i64, kind: &EventKind) -> (i64, i64) {
        let meta = |position: i64| track.from_reference(position, CoordinateSystem::MetaGenome);
        match *kind {
            EventKind::Call { length, extra, .. } if length > 0 => {
                let offsets = track.offsets_at(position).with_extra(extra);
                (
                    coords::finalize_start(CoordinateSystem::MetaGenome, position, length, &offsets),
                    length,
                )
            }
            EventKind::Call { length, .. } if length < 0 => {
                let start = meta(position + 1);
                let last = position.saturating_add(length.saturating_neg());
                (start, meta(last) + 1 - start)
            }
            EventKind::Call { extent, .. } => {
                let start = meta(position);
                let last = position.saturating_add(extent.max(1) - 1);
                (start, meta(last) + 1 - start)
            }
            EventKind::Padding { skip, length } => (meta(position) + 1 + skip, length),
        }
    }

    fn build(&mut self, idx: usize, track: &AlleleTrack, event: &LocusEvent) -> Option<Variant> {
        let position = self.table.position(event.position_index)?;
        let (start, span) = Self::interval(track, position, &event.kind);
        let replay = &mut self.replays[idx];
        let kind = match event.kind {
            EventKind::Call {
                class,
                length,
                extent,
                ..
            } => {
                let kind = VariantKind::from_call(class, length, extent)?;
                replay.covered = replay.covered.max(start + span);
                kind
            }
            // Room inside a deletion or substitution already replayed.
            EventKind::Padding { .. } if start < replay.covered => return None,
            EventKind::Padding { length, .. } => VariantKind::Blank { length },
        };
        Some(Variant {
            genome: Arc::clone(&self.genome),
            chromosome: Arc::clone(self.table.chromosome().name()),
            slot: replay.slot,
            position_index: event.position_index,
            start,
            span,
            kind,
        })
    }

    fn refill(&mut self, idx: usize) {
        while self.heads[idx].is_none() {
            let Some(track) = self.replays[idx].track else {
                return;
            };
            let Some(event) = self.replays[idx].next_event() else {
                return;
            };
            if !self.emit_blank && matches!(event.kind, EventKind::Padding { .. }) {
                continue;
            }
            self.heads[idx] = self.build(idx, track, event);
        }
    }
}

impl Iterator for VariantIter<'_> {
    type Item = Variant;

    fn next(&mut self) -> Option<Variant> {
        self.refill(0);
        self.refill(1);
        let pick = match (&self.heads[0], &self.heads[1]) {
            (Some(first), Some(second)) if second.start < first.start => 1,
            (Some(_), _) => 0,
            (None, Some(_)) => 1,
            (None, None) => return None,
        };
        self.heads[pick].take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{ChromosomeCatalog, GenomeFile, VariantRecord};
    use crate::sync::{GenomeSynchronizer, SyncConfig};

    fn record(position: i64, reference: &str, alt: &str, gt: &str) -> VariantRecord {
        VariantRecord::new("chr1", position, reference, vec![alt.to_string()], vec![gt.to_string()])
    }

    fn table(files: Vec<GenomeFile>) -> OffsetTable {
        let catalog = Arc::new(ChromosomeCatalog::from_pairs([("chr1", 5_000)]));
        GenomeSynchronizer::new(catalog, SyncConfig::default())
            .synchronize("chr1", &files)
            .unwrap()
            .table
    }

    #[test]
    fn stop_rules_per_kind() {
        let table = table(vec![GenomeFile::single(
            "g1",
            vec![
                record(10, "A", "G", "1|1"),
                record(20, "A", "ATT", "1|0"),
                record(30, "ACGT", "A", "0|1"),
            ],
        )]);
        let variants: Vec<Variant> = Variants::new(&table, "g1", true).unwrap().iter().collect();
        let summary: Vec<(VariantType, i64, i64)> = variants
            .iter()
            .map(|v| (v.variant_type(), v.start(), v.stop()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (VariantType::SingleNucleotide, 10, 11),
                (VariantType::SingleNucleotide, 10, 11),
                (VariantType::Insertion, 21, 23),
                (VariantType::Blank, 21, 23),
                (VariantType::Deletion, 33, 36),
            ]
        );
        assert_eq!(variants[2].reference_position(&table), Some(20));
    }

    #[test]
    fn replay_is_repeatable() {
        let table = table(vec![GenomeFile::single("g1", vec![record(10, "A", "AT", "0|1")])]);
        let variants = Variants::new(&table, "g1", true).unwrap();
        let first: Vec<Variant> = variants.iter().collect();
        let second: Vec<Variant> = (&variants).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn blanks_can_be_suppressed() {
        let table = table(vec![
            GenomeFile::single("g1", vec![record(10, "A", "ATT", "1|1")]),
            GenomeFile::single("g2", vec![record(10, "A", "G", "1|1")]),
        ]);
        let with_blanks = Variants::new(&table, "g2", true).unwrap().iter().count();
        let without = Variants::new(&table, "g2", false).unwrap().iter().count();
        assert_eq!(with_blanks, 4);
        assert_eq!(without, 2);
    }

    fn summary(table: &OffsetTable, genome: &str) -> Vec<(VariantType, i64, i64)> {
        Variants::new(table, genome, true)
            .unwrap()
            .iter()
            .map(|v| (v.variant_type(), v.start(), v.stop()))
            .collect()
    }

    #[test]
    fn deletion_absorbs_room_opened_inside_it() {
        let table = table(vec![
            GenomeFile::single("g1", vec![record(100, "ACGT", "A", "1|1")]),
            GenomeFile::single("g2", vec![record(101, "C", "CTT", "1|1")]),
        ]);
        assert_eq!(
            summary(&table, "g1"),
            vec![(VariantType::Deletion, 101, 106), (VariantType::Deletion, 101, 106)]
        );
        assert_eq!(
            summary(&table, "g2"),
            vec![(VariantType::Insertion, 102, 104), (VariantType::Insertion, 102, 104)]
        );
    }

    #[test]
    fn multi_base_substitution_absorbs_room_at_its_anchor() {
        let table = table(vec![
            GenomeFile::single("g1", vec![record(100, "ACG", "TTA", "1|0")]),
            GenomeFile::single("g2", vec![record(100, "A", "AT", "1|1")]),
        ]);
        assert_eq!(
            summary(&table, "g1"),
            vec![(VariantType::Mix, 100, 104), (VariantType::Blank, 101, 102)]
        );
    }

    #[test]
    fn unknown_genome_is_an_error() {
        let table = table(vec![GenomeFile::single("g1", vec![])]);
        assert_eq!(
            Variants::new(&table, "nope", true).unwrap_err(),
            SyncError::UnknownGenome("nope".to_string())
        );
    }

    #[test]
    fn ordering_ignores_kind() {
        let a = Variant {
            genome: "g".into(),
            chromosome: "chr1".into(),
            slot: AlleleSlot::First,
            position_index: 0,
            start: 5,
            span: 2,
            kind: VariantKind::Insertion { length: 2 },
        };
        let b = Variant {
            slot: AlleleSlot::Second,
            position_index: 3,
            kind: VariantKind::Blank { length: 2 },
            ..a.clone()
        };
        assert_eq!(a, b);
        let c = Variant { start: 4, ..a.clone() };
        assert!(c < a);
    }
}
