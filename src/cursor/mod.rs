//! Per-allele running state of a chromosome scan.
//!
//! An [`AlleleCursor`] is a plain value: [`AlleleCursor::advance`] derives
//! the current record's window and returns a new cursor, and
//! [`AlleleCursor::accumulate`] folds the current variant into the running
//! offsets. Only the synchronizer decides when each is applied.

use std::fmt;

use crate::coords::{self, CoordinateSystem, PositionOffsets};
use crate::resolver::{AlleleClass, Resolution, ResolvedAllele};

/// Which of the two genotype positions a cursor reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlleleSlot {
    /// Genotype position 0.
    First,
    /// Genotype position 1.
    Second,
}

impl AlleleSlot {
    /// Both slots, in genotype order.
    pub const BOTH: [AlleleSlot; 2] = [AlleleSlot::First, AlleleSlot::Second];

    /// Genotype position (0 or 1).
    pub fn index(self) -> usize {
        match self {
            AlleleSlot::First => 0,
            AlleleSlot::Second => 1,
        }
    }

    /// Slot for a genotype position.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(AlleleSlot::First),
            1 => Some(AlleleSlot::Second),
            _ => None,
        }
    }
}

impl fmt::Display for AlleleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// What one allele calls at the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlleleCall {
    /// Matches the reference (genotype index 0), or no record at this locus.
    Reference,
    /// ALT allele by zero-based ALT index (genotype index minus one).
    Alternate(usize),
    /// Unresolved genotype (`.`).
    NoCall,
}

impl AlleleCall {
    /// Map a genotype allele index onto a call, given the number of ALTs.
    ///
    /// Returns `Err` with the offending index when it points past the ALT
    /// list; the caller treats that allele as a no-call.
    pub fn from_genotype(index: Option<usize>, alt_count: usize) -> Result<Self, usize> {
        match index {
            None => Ok(AlleleCall::NoCall),
            Some(0) => Ok(AlleleCall::Reference),
            Some(idx) if idx <= alt_count => Ok(AlleleCall::Alternate(idx - 1)),
            Some(idx) => Err(idx),
        }
    }

    /// Numeric ALT index: `-1` for reference, `-2` for no call.
    pub fn alt_index(self) -> i64 {
        match self {
            AlleleCall::Reference => -1,
            AlleleCall::Alternate(idx) => idx as i64,
            AlleleCall::NoCall => -2,
        }
    }
}

/// Running state of one sample-allele on one chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlleleCursor {
    slot: AlleleSlot,
    offsets: PositionOffsets,
    start: i64,
    stop: i64,
    length: i64,
    call: AlleleCall,
    allele: Option<ResolvedAllele>,
    last_stop: i64,
    floor: i64,
    inherited: i64,
}

impl AlleleCursor {
    /// Fresh cursor with zero offsets.
    pub fn new(slot: AlleleSlot) -> Self {
        Self {
            slot,
            offsets: PositionOffsets::default(),
            start: 0,
            stop: 0,
            length: 0,
            call: AlleleCall::Reference,
            allele: None,
            last_stop: 0,
            floor: 0,
            inherited: 0,
        }
    }

    /// Derive the current record's window.
    ///
    /// Running offsets are left as they were after the previous record.
    pub fn advance(self, position: i64, resolution: &Resolution, call: AlleleCall) -> Self {
        let allele = match call {
            AlleleCall::Alternate(idx) => resolution.allele(idx).copied(),
            _ => None,
        };
        let call = match (call, allele) {
            (AlleleCall::Alternate(_), None) => AlleleCall::NoCall,
            _ => call,
        };
        let length = allele.map_or(0, |allele| allele.length);
        Self {
            start: position,
            stop: coords::next_reference_position(position, length),
            length,
            call,
            allele,
            floor: 0,
            inherited: 0,
            offsets: self.offsets.with_extra(0),
            ..self
        }
    }

    /// Window for a locus where this allele has no record.
    pub fn idle(self, position: i64) -> Self {
        self.advance(position, &Resolution::default(), AlleleCall::Reference)
    }

    /// Continue a locus whose earlier rounds already opened `floor` bases of
    /// meta-genome room after the anchor.
    pub fn resume(self, floor: i64) -> Self {
        Self {
            floor,
            inherited: self.inherited.max(floor),
            ..self
        }
    }

    /// Drop the current call back to the reference.
    pub fn degrade_to_reference(self) -> Self {
        Self {
            stop: coords::next_reference_position(self.start, 0),
            length: 0,
            call: AlleleCall::Reference,
            allele: None,
            ..self
        }
    }

    /// Place this allele's insertion behind `extra` bases of other genomes'
    /// insertions at the same locus.
    pub fn with_extra(self, extra: i64) -> Self {
        Self {
            offsets: self.offsets.with_extra(extra),
            ..self
        }
    }

    /// Take over a sibling's meta-genome extent at this locus.
    ///
    /// Commutative and idempotent: only the sibling's own extent is read,
    /// never what it inherited.
    pub fn merge_from(self, sibling: &AlleleCursor) -> Self {
        self.inherit(sibling.meta_extent())
    }

    /// Widen the inherited meta-genome extent to at least `extent`.
    pub fn inherit(self, extent: i64) -> Self {
        Self {
            inherited: self.inherited.max(extent),
            ..self
        }
    }

    /// Fold the current round into the running offsets.
    ///
    /// CURRENT_GENOME moves by the allele's own length; META_GENOME moves by
    /// the room the round opened at the locus, called or not.
    pub fn accumulate(self) -> Self {
        let called = self.has_variant();
        let opened = self.opened();
        if !called && opened == 0 {
            return self;
        }
        let length = if called { self.length } else { 0 };
        Self {
            offsets: coords::offsets_after(self.start, length, opened, &self.offsets),
            last_stop: if called { self.reach() } else { self.last_stop },
            ..self
        }
    }

    /// Genotype slot.
    pub fn slot(&self) -> AlleleSlot {
        self.slot
    }

    /// Running offsets (with the current record's stacking correction).
    pub fn offsets(&self) -> &PositionOffsets {
        &self.offsets
    }

    /// Cumulative REFERENCE -> CURRENT_GENOME offset.
    pub fn current_offset(&self) -> i64 {
        self.offsets.initial_reference
    }

    /// Start of the current record in `system`.
    pub fn current_start(&self, system: CoordinateSystem) -> i64 {
        coords::translate(self.start, &self.offsets, system)
    }

    /// Reference stop of the current record.
    pub fn current_stop(&self) -> i64 {
        self.stop
    }

    /// Signed length of the current call (0 at reference).
    pub fn current_length(&self) -> i64 {
        self.length
    }

    /// `-1` reference, `-2` no call, otherwise the zero-based ALT index.
    pub fn current_alt_index(&self) -> i64 {
        self.call.alt_index()
    }

    /// Current call.
    pub fn call(&self) -> AlleleCall {
        self.call
    }

    /// Resolved ALT of the current call.
    pub fn allele(&self) -> Option<&ResolvedAllele> {
        self.allele.as_ref()
    }

    /// First reference base past the last variant folded into the offsets.
    pub fn last_stop(&self) -> i64 {
        self.last_stop
    }

    /// First reference base past every base the current call touches.
    ///
    /// Wider than [`current_stop`](Self::current_stop) only for
    /// substitutions spanning several bases.
    pub fn reach(&self) -> i64 {
        match self.allele {
            Some(allele) if self.length == 0 => self.start.saturating_add(allele.extent.max(1)),
            _ => self.stop,
        }
    }

    /// Whether the current call is a real variant.
    pub fn has_variant(&self) -> bool {
        matches!(self.call, AlleleCall::Alternate(_))
            && self
                .allele
                .is_some_and(|allele| allele.class.is_variant())
    }

    /// Whether the current call inserts bases.
    pub fn is_insertion(&self) -> bool {
        self.has_variant() && self.length > 0
    }

    /// Meta-genome room this allele's own call takes at this locus,
    /// including the room stacked ahead of it.
    pub fn meta_extent(&self) -> i64 {
        if self.is_insertion() {
            self.offsets.extra + self.length
        } else {
            0
        }
    }

    /// Meta-genome room the locus has opened after its anchor so far.
    pub fn locus_width(&self) -> i64 {
        self.inherited.max(self.meta_extent()).max(self.floor)
    }

    /// Room opened by this round alone.
    pub fn opened(&self) -> i64 {
        self.locus_width() - self.floor
    }

    /// Blank stretches that keep this allele level with the room opened by
    /// this round, as `(skip, length)` pairs counted from the first
    /// meta-genome base after the anchor. Zero-length entries mean nothing
    /// to pad.
    pub fn padding(&self) -> [(i64, i64); 2] {
        let width = self.locus_width();
        if self.is_insertion() {
            let extra = self.offsets.extra;
            let own_end = extra + self.length;
            [
                (self.floor, (extra - self.floor).max(0)),
                (own_end, (width - own_end).max(0)),
            ]
        } else {
            [(self.floor, width - self.floor), (width, 0)]
        }
    }

    /// Total blank padding this round, in bases.
    pub fn padding_len(&self) -> i64 {
        self.padding().iter().map(|&(_, length)| length).sum()
    }

    /// Class of the current call, if it is a variant.
    pub fn class(&self) -> Option<AlleleClass> {
        self.allele
            .filter(|_| self.has_variant())
            .map(|allele| allele.class)
    }
}
