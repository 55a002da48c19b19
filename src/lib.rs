//! # Multi-genome coordinate synchronization
//!
//! Several genomes, each carrying its own insertions and deletions relative
//! to a shared reference, are laid out on one synthetic axis so they can be
//! compared position by position. Three coordinate systems are tracked:
//!
//! * **REFERENCE**: the unmodified reference genome.
//! * **CURRENT_GENOME**: one genome-allele's own coordinates.
//! * **META_GENOME**: an axis wide enough to hold every insertion observed
//!   in any genome on the chromosome.
//!
//! ## Pipeline
//!
//! 1. [`resolver`] turns REF/ALT strings (or declared SV lengths) into
//!    signed length deltas.
//! 2. [`sync::GenomeSynchronizer`] scans a chromosome's records across all
//!    genomes in position order, advancing one [`cursor::AlleleCursor`] per
//!    genome-allele and merging them at each locus.
//! 3. The resulting [`ledger::OffsetTable`] answers translations by binary
//!    search and replays [`variant::Variant`]s on demand.
//!
//! ## Usage Example
//!
//! ```
//! use std::sync::Arc;
//! use multigenome::{
//!     AlleleSlot, ChromosomeCatalog, CoordinateSystem, GenomeFile, SyncConfig, SyncProject,
//!     VariantRecord,
//! };
//!
//! let catalog = ChromosomeCatalog::from_pairs([("chr1", 10_000)]);
//! let mut project = SyncProject::new(catalog, SyncConfig::default());
//! let files = vec![GenomeFile::single(
//!     "g1",
//!     vec![VariantRecord::new("chr1", 1000, "A", vec!["ATT".into()], vec!["1|1".into()])],
//! )];
//! project.synchronize("chr1", &files)?;
//! let shifted = project.translate("g1", AlleleSlot::First, "chr1", 1001, CoordinateSystem::CurrentGenome)?;
//! assert_eq!(shifted, 1003);
//! # Ok::<(), multigenome::SyncError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod coords;     // Coordinate systems and translation rules
pub mod cursor;     // Per-allele scan state
pub mod genomics;   // Input data model and text I/O
pub mod ledger;     // Offset tables
pub mod project;    // Per-chromosome tables and batch synchronization
pub mod resolver;   // Variant length resolution
pub mod sync;       // Chromosome scans
pub mod variant;    // Variant replay

// Re-exports for convenience
pub use coords::{CoordinateSystem, PositionOffsets};
pub use cursor::{AlleleCall, AlleleCursor, AlleleSlot};
pub use genomics::{Chromosome, ChromosomeCatalog, GenomeFile, Genotype, VariantRecord};
pub use ledger::{AlleleTrack, Breakpoint, OffsetTable};
pub use project::{BatchReport, SyncProject};
pub use resolver::{resolve_lengths, resolve_record, AlleleClass, Resolution, SvType};
pub use sync::{
    CancellationFlag, Diagnostic, DiagnosticKind, GenomeSynchronizer, SyncConfig, SyncError,
    SyncOutcome,
};
pub use variant::{Variant, VariantKind, VariantType, Variants};
