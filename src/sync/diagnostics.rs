use std::fmt;
use std::sync::Arc;

/// Non-fatal conditions met during a chromosome scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiagnosticKind {
    /// Unusable position or alleles; the record was skipped.
    MalformedRecord,
    /// Record names a chromosome missing from the catalog; skipped.
    UnknownChromosome,
    /// Structural hint unresolved; string lengths were used instead.
    UnresolvedStructuralVariant,
    /// A length difference went negative and was treated as zero.
    OffsetUnderflow,
    /// Genotype points past the ALT list; that allele was treated as a no-call.
    GenotypeOutOfRange,
}

impl DiagnosticKind {
    /// Whether the whole record was dropped.
    pub fn skips_record(self) -> bool {
        matches!(
            self,
            DiagnosticKind::MalformedRecord | DiagnosticKind::UnknownChromosome
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::MalformedRecord => "malformed-record",
            DiagnosticKind::UnknownChromosome => "unknown-chromosome",
            DiagnosticKind::UnresolvedStructuralVariant => "unresolved-structural-variant",
            DiagnosticKind::OffsetUnderflow => "offset-underflow",
            DiagnosticKind::GenotypeOutOfRange => "genotype-out-of-range",
        })
    }
}

/// One reported condition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    /// Condition class.
    pub kind: DiagnosticKind,
    /// Chromosome being scanned (or named by the record).
    pub chromosome: Arc<str>,
    /// Genome file the record came from.
    pub genome_file: Option<Arc<str>>,
    /// REFERENCE position of the record.
    pub position: Option<i64>,
    /// Human-readable detail.
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(
        kind: DiagnosticKind,
        chromosome: &Arc<str>,
        genome_file: &Arc<str>,
        position: i64,
        message: impl Into<String>,
    ) -> Self {
        let diagnostic = Self {
            kind,
            chromosome: Arc::clone(chromosome),
            genome_file: Some(Arc::clone(genome_file)),
            position: Some(position),
            message: message.into(),
        };
        tracing::debug!(
            kind = %diagnostic.kind,
            chromosome = %diagnostic.chromosome,
            file = %genome_file,
            position,
            "{}",
            diagnostic.message
        );
        diagnostic
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.chromosome)?;
        if let Some(position) = self.position {
            write!(f, ":{position}")?;
        }
        if let Some(file) = &self.genome_file {
            write!(f, " ({file})")?;
        }
        write!(f, ": {}", self.message)
    }
}
