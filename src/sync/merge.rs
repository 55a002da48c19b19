//! Cross-allele merge at one locus.
//!
//! Two steps, both order-independent with respect to which allele is
//! visited first:
//!
//! 1. Insertions from different genomes at the same locus are stacked on the
//!    meta-genome axis in declared genome order, behind any room earlier
//!    rounds at the locus already opened, so each keeps its own room.
//! 2. Every allele inherits the largest meta-genome extent of any other
//!    allele at the locus. The room an allele does not fill with its own
//!    insertion becomes blank padding; running offsets are never touched
//!    here.

use crate::cursor::AlleleCursor;

/// Merge two alleles sharing a locus.
pub fn merge_pair(a: AlleleCursor, b: AlleleCursor) -> (AlleleCursor, AlleleCursor) {
    (a.merge_from(&b), b.merge_from(&a))
}

/// Give each genome's insertions the room taken by earlier genomes'
/// insertions at this locus, starting from `floor` bases already opened by
/// earlier rounds. Both alleles of one genome share a start.
///
/// Returns the room opened at the locus once this round is stacked.
pub fn stack_insertions(cursors: &mut [[AlleleCursor; 2]], floor: i64) -> i64 {
    let mut stacked = floor;
    for pair in cursors.iter_mut() {
        let width = pair
            .iter()
            .filter(|cursor| cursor.is_insertion())
            .map(AlleleCursor::current_length)
            .max()
            .unwrap_or(0);
        if width == 0 {
            continue;
        }
        for cursor in pair.iter_mut().filter(|cursor| cursor.is_insertion()) {
            *cursor = cursor.with_extra(stacked);
        }
        stacked += width;
    }
    stacked
}

/// Without stacking, every insertion of this round starts right after the
/// `floor` bases earlier rounds opened, sharing that room with the others.
pub fn overlay_insertions(cursors: &mut [[AlleleCursor; 2]], floor: i64) {
    for cursor in cursors.iter_mut().flatten() {
        if cursor.is_insertion() {
            *cursor = cursor.with_extra(floor);
        }
    }
}

/// Merge every allele at the locus against every other one.
///
/// Equivalent to folding [`merge_pair`] over all pairs, computed from the
/// two largest extents.
pub fn merge_locus(cursors: &mut [[AlleleCursor; 2]]) {
    let mut best: Option<(usize, i64)> = None;
    let mut runner_up = 0;
    for (idx, cursor) in cursors.iter().flatten().enumerate() {
        let extent = cursor.meta_extent();
        match best {
            Some((_, top)) if extent <= top => runner_up = runner_up.max(extent),
            Some((_, top)) => {
                runner_up = top;
                best = Some((idx, extent));
            }
            None => best = Some((idx, extent)),
        }
    }
    let Some((best_idx, top)) = best else {
        return;
    };
    for (idx, cursor) in cursors.iter_mut().flatten().enumerate() {
        let extent = if idx == best_idx { runner_up } else { top };
        *cursor = cursor.inherit(extent);
    }
}
