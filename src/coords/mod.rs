//! Coordinate systems and the pure translation rules between them.
//!
//! Every function here takes a REFERENCE position plus the offsets valid at
//! that position; nothing holds state. Positions are 1-based.
//!
//! * REFERENCE: the unmodified reference axis.
//! * CURRENT_GENOME: one genome-allele's own axis; insertions widen it,
//!   deletions shrink it.
//! * META_GENOME: the shared display axis. Every insertion at a locus
//!   widens it for all genome-alleles alike (stacked behind earlier genomes'
//!   insertions at the same locus); deleted bases stay on it as gaps.

use std::fmt;
use std::str::FromStr;

/// Target system of a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoordinateSystem {
    /// Unmodified reference coordinates.
    Reference,
    /// Coordinates of one genome-allele.
    CurrentGenome,
    /// Shared meta-genome coordinates.
    MetaGenome,
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoordinateSystem::Reference => "reference",
            CoordinateSystem::CurrentGenome => "current",
            CoordinateSystem::MetaGenome => "meta",
        })
    }
}

impl FromStr for CoordinateSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reference" | "ref" => Ok(CoordinateSystem::Reference),
            "current" | "current_genome" | "genome" => Ok(CoordinateSystem::CurrentGenome),
            "meta" | "meta_genome" | "metagenome" => Ok(CoordinateSystem::MetaGenome),
            other => Err(format!("unknown coordinate system '{other}'")),
        }
    }
}

/// Offsets valid at one REFERENCE position of one genome-allele.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionOffsets {
    /// REFERENCE -> CURRENT_GENOME.
    pub initial_reference: i64,
    /// REFERENCE -> META_GENOME.
    pub initial_meta_genome: i64,
    /// Meta-genome room at this exact locus that precedes this allele's
    /// own bases: other genomes' insertions stacked ahead of an insertion,
    /// or every insertion at the locus ahead of a deletion.
    pub extra: i64,
}

impl PositionOffsets {
    /// Offsets with no extra correction.
    pub fn new(initial_reference: i64, initial_meta_genome: i64) -> Self {
        Self {
            initial_reference,
            initial_meta_genome,
            extra: 0,
        }
    }

    /// Add to the stacking correction.
    pub fn add_extra_offset(&mut self, offset: i64) {
        self.extra += offset;
    }

    /// Same offsets with the given stacking correction.
    pub fn with_extra(mut self, extra: i64) -> Self {
        self.extra = extra;
        self
    }
}

/// REFERENCE -> CURRENT_GENOME.
pub fn to_current_genome(reference_position: i64, offsets: &PositionOffsets) -> i64 {
    reference_position + offsets.initial_reference
}

/// REFERENCE -> META_GENOME.
pub fn to_meta_genome(reference_position: i64, offsets: &PositionOffsets) -> i64 {
    reference_position + offsets.initial_meta_genome
}

/// REFERENCE -> any system.
pub fn translate(
    reference_position: i64,
    offsets: &PositionOffsets,
    target: CoordinateSystem,
) -> i64 {
    match target {
        CoordinateSystem::Reference => reference_position,
        CoordinateSystem::CurrentGenome => to_current_genome(reference_position, offsets),
        CoordinateSystem::MetaGenome => to_meta_genome(reference_position, offsets),
    }
}

/// First reference base after a variant anchored at `start`.
///
/// Substitutions and insertions end at `start + 1`; a deletion also skips
/// the deleted bases.
pub fn next_reference_position(start: i64, length: i64) -> i64 {
    start
        .saturating_add(1)
        .saturating_add(length.min(0).saturating_neg())
}

/// Position following a variant, expressed in `system`.
///
/// Derived by translating [`next_reference_position`] through the offsets
/// in effect after the variant, never by incrementing the translated start.
/// `opened` is the meta-genome room the locus opens after its anchor; it is
/// the same for every allele, whatever the allele itself called.
pub fn next_position(
    system: CoordinateSystem,
    start: i64,
    length: i64,
    opened: i64,
    offsets: &PositionOffsets,
) -> i64 {
    let next = next_reference_position(start, length);
    match system {
        CoordinateSystem::Reference => next,
        CoordinateSystem::CurrentGenome => next + offsets.initial_reference + length,
        CoordinateSystem::MetaGenome => next + offsets.initial_meta_genome + opened,
    }
}

/// Marginal offset at the position following a variant.
pub fn next_position_offset(
    system: CoordinateSystem,
    start: i64,
    length: i64,
    opened: i64,
    offsets: &PositionOffsets,
) -> i64 {
    next_position(system, start, length, opened, offsets) - next_reference_position(start, length)
}

/// Offsets valid from the position following a variant onwards.
pub fn offsets_after(
    start: i64,
    length: i64,
    opened: i64,
    offsets: &PositionOffsets,
) -> PositionOffsets {
    PositionOffsets::new(
        next_position_offset(CoordinateSystem::CurrentGenome, start, length, opened, offsets),
        next_position_offset(CoordinateSystem::MetaGenome, start, length, opened, offsets),
    )
}

/// Reported start of a variant anchored at `start`, in `system`.
///
/// An indel opens at the base after its shared anchor, so on the
/// META_GENOME axis its start moves forward by one and past the room that
/// precedes it at this locus (`extra`): the insertions stacked ahead of an
/// insertion, or every insertion at the locus for a deletion. This is the
/// only place that adjustment is made.
pub fn finalize_start(
    system: CoordinateSystem,
    start: i64,
    length: i64,
    offsets: &PositionOffsets,
) -> i64 {
    let translated = translate(start, offsets, system);
    match system {
        CoordinateSystem::MetaGenome if length != 0 => translated + 1 + offsets.extra,
        _ => translated,
    }
}

/// A difference that would have gone negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetUnderflow {
    /// How far below zero the difference went.
    pub deficit: i64,
}

/// Remaining length between two positions, `end - start`.
///
/// A negative result means an earlier variant consumed more than the data
/// allows; callers record the underflow and continue with zero.
pub fn remaining_length(start: i64, end: i64) -> Result<i64, OffsetUnderflow> {
    let remaining = end - start;
    if remaining < 0 {
        Err(OffsetUnderflow {
            deficit: -remaining,
        })
    } else {
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_applies_offsets() {
        let offsets = PositionOffsets::new(-3, 5);
        assert_eq!(to_current_genome(600, &offsets), 597);
        assert_eq!(to_meta_genome(600, &offsets), 605);
        assert_eq!(translate(600, &offsets, CoordinateSystem::Reference), 600);
    }

    #[test]
    fn deletion_next_positions() {
        let offsets = PositionOffsets::default();
        assert_eq!(next_reference_position(500, -3), 504);
        assert_eq!(
            next_position(CoordinateSystem::CurrentGenome, 500, -3, 0, &offsets),
            501
        );
        assert_eq!(
            next_position_offset(CoordinateSystem::CurrentGenome, 500, -3, 0, &offsets),
            -3
        );
        // Deleted bases stay on the meta axis.
        assert_eq!(
            next_position_offset(CoordinateSystem::MetaGenome, 500, -3, 0, &offsets),
            0
        );
        // Room another genome opened at the same anchor still widens it.
        assert_eq!(
            next_position_offset(CoordinateSystem::MetaGenome, 500, -3, 2, &offsets),
            2
        );
    }

    #[test]
    fn extreme_lengths_do_not_overflow() {
        assert_eq!(next_reference_position(10, i64::MIN), i64::MAX);
        assert_eq!(next_reference_position(10, i64::MAX), 11);
    }

    #[test]
    fn insertion_next_positions_include_stacking() {
        let offsets = PositionOffsets::new(1, 4).with_extra(2);
        assert_eq!(next_reference_position(100, 3), 101);
        assert_eq!(
            next_position(CoordinateSystem::CurrentGenome, 100, 3, 5, &offsets),
            105
        );
        assert_eq!(
            next_position(CoordinateSystem::MetaGenome, 100, 3, 5, &offsets),
            110
        );
        assert_eq!(offsets_after(100, 3, 5, &offsets), PositionOffsets::new(4, 9));
    }

    #[test]
    fn substitution_changes_nothing_on_its_own() {
        let offsets = PositionOffsets::new(7, 11);
        assert_eq!(offsets_after(42, 0, 0, &offsets), offsets);
        // Next to another genome's insertion only the meta axis moves.
        assert_eq!(offsets_after(42, 0, 3, &offsets), PositionOffsets::new(7, 14));
    }

    #[test]
    fn meta_start_moves_past_anchor_for_indels() {
        let offsets = PositionOffsets::new(0, 10).with_extra(2);
        assert_eq!(finalize_start(CoordinateSystem::MetaGenome, 500, 0, &offsets), 510);
        assert_eq!(finalize_start(CoordinateSystem::MetaGenome, 500, -3, &offsets), 513);
        assert_eq!(finalize_start(CoordinateSystem::MetaGenome, 500, 3, &offsets), 513);
        assert_eq!(finalize_start(CoordinateSystem::Reference, 500, -3, &offsets), 500);
    }

    #[test]
    fn extra_offset_accumulates_the_argument() {
        let mut offsets = PositionOffsets::default();
        offsets.add_extra_offset(2);
        offsets.add_extra_offset(3);
        assert_eq!(offsets.extra, 5);
    }

    #[test]
    fn remaining_length_underflow() {
        assert_eq!(remaining_length(10, 14), Ok(4));
        assert_eq!(remaining_length(14, 10), Err(OffsetUnderflow { deficit: 4 }));
    }

    #[test]
    fn parses_system_names() {
        assert_eq!("META".parse::<CoordinateSystem>(), Ok(CoordinateSystem::MetaGenome));
        assert_eq!("current".parse::<CoordinateSystem>(), Ok(CoordinateSystem::CurrentGenome));
        assert!("sideways".parse::<CoordinateSystem>().is_err());
    }
}
