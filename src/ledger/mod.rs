//! Offset ledger
//!
//! Per chromosome, per genome-allele breakpoints: the REFERENCE positions
//! from which a new pair of (CURRENT_GENOME, META_GENOME) offsets holds.
//! The META_GENOME offset moves right after a locus anchor; the
//! CURRENT_GENOME offset only once a deletion's bases are behind.
//! Breakpoints are appended in increasing position order during a scan and
//! looked up by binary search afterwards, so translation never re-scans
//! records. The ledger also keeps the per-locus call events that variant
//! replay walks.

use std::sync::Arc;

use crate::coords::{CoordinateSystem, PositionOffsets};
use crate::cursor::AlleleSlot;
use crate::genomics::Chromosome;
use crate::resolver::AlleleClass;

/// Offsets in effect after one locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Breakpoint {
    /// First REFERENCE position where `reference_offset` holds.
    pub position: i64,
    /// Base right after the locus anchor, where `meta_offset` holds. Below
    /// `position` for deletions, whose bases in `span_start..position` are
    /// absent from the genome's own axis.
    pub span_start: i64,
    /// REFERENCE -> CURRENT_GENOME offset.
    pub reference_offset: i64,
    /// REFERENCE -> META_GENOME offset.
    pub meta_offset: i64,
}

impl Breakpoint {
    /// First REFERENCE position where the offset of `system` holds.
    fn valid_from(&self, system: CoordinateSystem) -> i64 {
        match system {
            CoordinateSystem::MetaGenome => self.span_start,
            _ => self.position,
        }
    }

    fn offset_in(&self, system: CoordinateSystem) -> i64 {
        match system {
            CoordinateSystem::Reference => 0,
            CoordinateSystem::CurrentGenome => self.reference_offset,
            CoordinateSystem::MetaGenome => self.meta_offset,
        }
    }
}

/// What happened to one allele at one locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// The allele carries a variant.
    Call {
        /// Shape of the called ALT.
        class: AlleleClass,
        /// Signed length delta.
        length: i64,
        /// Display span in bases.
        extent: i64,
        /// Meta-genome room stacked ahead of an insertion.
        extra: i64,
    },
    /// Padding that keeps the allele level with siblings' insertions.
    Padding {
        /// Meta-genome bases after the anchor that precede the padding.
        skip: i64,
        /// Padding length in bases.
        length: i64,
    },
}

impl EventKind {
    /// Replay order among one allele's events at a shared locus: the
    /// anchor call, then room after the anchor left to right, then the
    /// bases a deletion removes.
    pub(crate) fn locus_order(&self) -> (u8, i64) {
        match *self {
            EventKind::Call { length: 0, .. } => (0, 0),
            EventKind::Call { length, extra, .. } if length > 0 => (1, extra),
            EventKind::Call { .. } => (2, 0),
            EventKind::Padding { skip, .. } => (1, skip),
        }
    }
}

/// One event, pointing into the chromosome's shared position array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocusEvent {
    /// Index into [`OffsetTable::positions`].
    pub position_index: usize,
    /// Event payload.
    pub kind: EventKind,
}

/// Breakpoints and events of one genome-allele.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlleleTrack {
    breakpoints: Vec<Breakpoint>,
    events: Vec<LocusEvent>,
}

impl AlleleTrack {
    /// Append a breakpoint in locus order.
    ///
    /// A later round at the same locus replaces the offsets of the last
    /// breakpoint. The CURRENT_GENOME position never moves back inside an
    /// earlier deletion.
    pub(crate) fn push_breakpoint(&mut self, breakpoint: Breakpoint) {
        match self.breakpoints.last_mut() {
            Some(last) if last.span_start == breakpoint.span_start => {
                *last = Breakpoint {
                    position: last.position.max(breakpoint.position),
                    ..breakpoint
                };
            }
            Some(last) => {
                debug_assert!(
                    last.span_start < breakpoint.span_start,
                    "breakpoints must be appended in locus order"
                );
                let position = last.position.max(breakpoint.position);
                self.breakpoints.push(Breakpoint {
                    position,
                    ..breakpoint
                });
            }
            None => self.breakpoints.push(breakpoint),
        }
    }

    pub(crate) fn push_event(&mut self, event: LocusEvent) {
        self.events.push(event);
    }

    /// Breakpoints in position order.
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Events in locus order.
    pub fn events(&self) -> &[LocusEvent] {
        &self.events
    }

    /// Whether loci strictly increase and CURRENT_GENOME positions never
    /// go back.
    pub fn is_monotonic(&self) -> bool {
        self.breakpoints.windows(2).all(|pair| {
            pair[0].span_start < pair[1].span_start && pair[0].position <= pair[1].position
        })
    }

    /// Offset of `system` valid at a REFERENCE position.
    pub fn offset_at(&self, position: i64, system: CoordinateSystem) -> i64 {
        let idx = self
            .breakpoints
            .partition_point(|bp| bp.valid_from(system) <= position);
        idx.checked_sub(1)
            .map_or(0, |prev| self.breakpoints[prev].offset_in(system))
    }

    /// Offsets valid at a REFERENCE position.
    pub fn offsets_at(&self, position: i64) -> PositionOffsets {
        PositionOffsets::new(
            self.offset_at(position, CoordinateSystem::CurrentGenome),
            self.offset_at(position, CoordinateSystem::MetaGenome),
        )
    }

    /// REFERENCE -> `target`.
    ///
    /// A position inside a deletion has no base of its own on the
    /// CURRENT_GENOME axis and collapses onto the first base after it.
    pub fn from_reference(&self, position: i64, target: CoordinateSystem) -> i64 {
        if target == CoordinateSystem::CurrentGenome {
            let idx = self
                .breakpoints
                .partition_point(|bp| bp.position <= position);
            if let Some(next) = self.breakpoints.get(idx) {
                if next.span_start <= position {
                    return next.position + next.reference_offset;
                }
            }
        }
        position + self.offset_at(position, target)
    }

    /// `source` -> REFERENCE.
    ///
    /// A position inside inserted bases maps back to the insertion anchor.
    pub fn to_reference(&self, position: i64, source: CoordinateSystem) -> i64 {
        if source == CoordinateSystem::Reference {
            return position;
        }
        let idx = self
            .breakpoints
            .partition_point(|bp| bp.valid_from(source) + bp.offset_in(source) <= position);
        let offset = idx
            .checked_sub(1)
            .map_or(0, |prev| self.breakpoints[prev].offset_in(source));
        let reference = position - offset;
        match self.breakpoints.get(idx) {
            Some(next) if reference >= next.span_start => next.span_start - 1,
            _ => reference,
        }
    }

    /// `source` -> `target`, through REFERENCE.
    pub fn translate_between(
        &self,
        position: i64,
        source: CoordinateSystem,
        target: CoordinateSystem,
    ) -> i64 {
        self.from_reference(self.to_reference(position, source), target)
    }
}

/// Offset table of one chromosome across every synchronized genome.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffsetTable {
    chromosome: Chromosome,
    genomes: Vec<Arc<str>>,
    positions: Vec<i64>,
    tracks: Vec<[AlleleTrack; 2]>,
}

impl OffsetTable {
    /// Empty table for the given genomes.
    pub fn new(chromosome: Chromosome, genomes: Vec<Arc<str>>) -> Self {
        let tracks = vec![Default::default(); genomes.len()];
        Self {
            chromosome,
            genomes,
            positions: Vec::new(),
            tracks,
        }
    }

    /// Register a locus and return its index in the position array.
    ///
    /// Repeating the last position returns the existing index.
    pub(crate) fn push_position(&mut self, position: i64) -> usize {
        if self.positions.last() != Some(&position) {
            self.positions.push(position);
        }
        self.positions.len() - 1
    }

    pub(crate) fn track_mut(&mut self, genome: usize, slot: AlleleSlot) -> &mut AlleleTrack {
        &mut self.tracks[genome][slot.index()]
    }

    /// Chromosome the table covers.
    pub fn chromosome(&self) -> &Chromosome {
        &self.chromosome
    }

    /// Genome names in declared order.
    pub fn genomes(&self) -> &[Arc<str>] {
        &self.genomes
    }

    /// Index of a genome by name.
    pub fn genome_index(&self, genome: &str) -> Option<usize> {
        self.genomes.iter().position(|name| name.as_ref() == genome)
    }

    /// Shared, sorted array of REFERENCE positions that carried records.
    pub fn positions(&self) -> &[i64] {
        &self.positions
    }

    /// REFERENCE position at an index of the shared array.
    pub fn position(&self, index: usize) -> Option<i64> {
        self.positions.get(index).copied()
    }

    /// Track of one genome-allele.
    pub fn track(&self, genome: usize, slot: AlleleSlot) -> Option<&AlleleTrack> {
        self.tracks.get(genome).map(|pair| &pair[slot.index()])
    }

    /// Tracks in genome order, paired with their slots.
    pub fn tracks(&self) -> impl Iterator<Item = (usize, AlleleSlot, &AlleleTrack)> {
        self.tracks.iter().enumerate().flat_map(|(genome, pair)| {
            AlleleSlot::BOTH
                .into_iter()
                .map(move |slot| (genome, slot, &pair[slot.index()]))
        })
    }

    /// Total breakpoints across all tracks.
    pub fn breakpoint_count(&self) -> usize {
        self.tracks().map(|(_, _, track)| track.breakpoints().len()).sum()
    }

    /// Translate a REFERENCE position for one genome-allele.
    pub fn translate(
        &self,
        genome: usize,
        slot: AlleleSlot,
        position: i64,
        target: CoordinateSystem,
    ) -> Option<i64> {
        self.track(genome, slot)
            .map(|track| track.from_reference(position, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(breakpoints: &[Breakpoint]) -> AlleleTrack {
        let mut track = AlleleTrack::default();
        for bp in breakpoints {
            track.push_breakpoint(*bp);
        }
        track
    }

    fn deletion_at_500() -> AlleleTrack {
        track(&[Breakpoint {
            position: 504,
            span_start: 501,
            reference_offset: -3,
            meta_offset: 0,
        }])
    }

    #[test]
    fn lookup_before_and_after_deletion() {
        let track = deletion_at_500();
        assert_eq!(track.offsets_at(100), PositionOffsets::default());
        assert_eq!(track.offsets_at(504), PositionOffsets::new(-3, 0));
        assert_eq!(track.from_reference(500, CoordinateSystem::CurrentGenome), 500);
        assert_eq!(track.from_reference(600, CoordinateSystem::CurrentGenome), 597);
        assert_eq!(track.from_reference(600, CoordinateSystem::MetaGenome), 600);
    }

    #[test]
    fn deleted_bases_collapse_on_current_axis() {
        let track = deletion_at_500();
        for position in 501..504 {
            assert_eq!(track.from_reference(position, CoordinateSystem::CurrentGenome), 501);
            assert_eq!(
                track.from_reference(position, CoordinateSystem::MetaGenome),
                position
            );
        }
    }

    #[test]
    fn inverse_skips_inserted_bases() {
        // +2 insertion anchored at 1000.
        let track = track(&[Breakpoint {
            position: 1001,
            span_start: 1001,
            reference_offset: 2,
            meta_offset: 2,
        }]);
        assert_eq!(track.to_reference(1000, CoordinateSystem::CurrentGenome), 1000);
        assert_eq!(track.to_reference(1001, CoordinateSystem::CurrentGenome), 1000);
        assert_eq!(track.to_reference(1002, CoordinateSystem::CurrentGenome), 1000);
        assert_eq!(track.to_reference(1003, CoordinateSystem::CurrentGenome), 1001);
        assert_eq!(
            track.translate_between(
                1003,
                CoordinateSystem::MetaGenome,
                CoordinateSystem::CurrentGenome
            ),
            1003
        );
    }

    #[test]
    fn inverse_after_deletion() {
        let track = deletion_at_500();
        assert_eq!(track.to_reference(500, CoordinateSystem::CurrentGenome), 500);
        assert_eq!(track.to_reference(501, CoordinateSystem::CurrentGenome), 504);
        assert_eq!(track.to_reference(597, CoordinateSystem::CurrentGenome), 600);
    }

    #[test]
    fn meta_offset_moves_inside_a_deletion() {
        let mut track = deletion_at_500();
        // Another genome inserts two bases after 502, inside the deletion.
        track.push_breakpoint(Breakpoint {
            position: 503,
            span_start: 503,
            reference_offset: -3,
            meta_offset: 2,
        });
        assert!(track.is_monotonic());
        assert_eq!(track.breakpoints()[1].position, 504);
        assert_eq!(track.from_reference(502, CoordinateSystem::MetaGenome), 502);
        assert_eq!(track.from_reference(503, CoordinateSystem::MetaGenome), 505);
        assert_eq!(track.from_reference(503, CoordinateSystem::CurrentGenome), 501);
        assert_eq!(track.from_reference(504, CoordinateSystem::CurrentGenome), 501);
        assert_eq!(track.to_reference(504, CoordinateSystem::MetaGenome), 502);
        assert_eq!(track.to_reference(505, CoordinateSystem::MetaGenome), 503);
    }

    #[test]
    fn later_round_replaces_offsets_at_the_same_locus() {
        let mut track = AlleleTrack::default();
        track.push_breakpoint(Breakpoint {
            position: 104,
            span_start: 101,
            reference_offset: -3,
            meta_offset: 2,
        });
        track.push_breakpoint(Breakpoint {
            position: 101,
            span_start: 101,
            reference_offset: -3,
            meta_offset: 5,
        });
        assert_eq!(
            track.breakpoints(),
            &[Breakpoint {
                position: 104,
                span_start: 101,
                reference_offset: -3,
                meta_offset: 5,
            }]
        );
    }

    #[test]
    fn shared_positions_deduplicate() {
        let mut table = OffsetTable::new(Chromosome::new("chr1", 100), vec![Arc::from("g")]);
        assert_eq!(table.push_position(5), 0);
        assert_eq!(table.push_position(5), 0);
        assert_eq!(table.push_position(9), 1);
        assert_eq!(table.positions(), &[5, 9]);
        assert_eq!(table.tracks().count(), 2);
    }
}
