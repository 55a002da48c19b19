//! Signed length deltas implied by each ALT allele of a record.
//!
//! Positive lengths are insertions, negative lengths deletions, zero a
//! substitution. Declared structural lengths (`SVLEN`, or `END` for a
//! symbolic ALT, with a known type) take precedence over the string-length
//! heuristic. A literal allele that cannot be resolved falls back to the
//! heuristic; a symbolic one resolves to no length change. Both are reported
//! as warnings.

mod svtype;

pub use svtype::{SvType, UnknownSvType};

use thiserror::Error;

use crate::genomics::VariantRecord;

/// Shape of an ALT allele relative to its reference allele.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlleleClass {
    /// Single-base substitution.
    Snv,
    /// Equal-length substitution of several bases.
    Mnv,
    /// Anchored insertion (1-base REF).
    Insertion,
    /// Anchored deletion (1-base ALT).
    Deletion,
    /// Unequal REF/ALT where neither is a lone anchor base.
    Complex,
    /// Declared structural variant.
    Structural(SvType),
    /// `*` or `.`: no sequence of its own at this locus.
    Placeholder,
}

impl AlleleClass {
    /// Whether a call on this allele is a real variant.
    pub fn is_variant(self) -> bool {
        !matches!(self, AlleleClass::Placeholder)
    }
}

/// Length bookkeeping for one ALT allele.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedAllele {
    /// Signed length delta (ALT minus REF, or the signed declared SV length).
    pub length: i64,
    /// Allele shape.
    pub class: AlleleClass,
    /// Number of bases the variant spans for display purposes.
    pub extent: i64,
}

impl ResolvedAllele {
    fn placeholder() -> Self {
        Self {
            length: 0,
            class: AlleleClass::Placeholder,
            extent: 0,
        }
    }

    /// Symbolic allele whose length is unknown: kept at its anchor base.
    fn unresolved(sv_type: Option<SvType>) -> Self {
        Self {
            length: 0,
            class: sv_type.map_or(AlleleClass::Complex, AlleleClass::Structural),
            extent: 1,
        }
    }
}

/// Structural hint that could not be honoured; the heuristic was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedStructural {
    /// Zero-based ALT index.
    pub allele: usize,
    /// What could not be resolved.
    pub detail: String,
}

/// Per-ALT resolution of a record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    /// One entry per ALT allele, in ALT order.
    pub alleles: Vec<ResolvedAllele>,
    /// Structural hints that fell back to the string-length heuristic.
    pub warnings: Vec<UnresolvedStructural>,
}

impl Resolution {
    /// Signed lengths, one per ALT.
    pub fn lengths(&self) -> Vec<i64> {
        self.alleles.iter().map(|allele| allele.length).collect()
    }

    /// Resolved ALT by zero-based index.
    pub fn allele(&self, alt_index: usize) -> Option<&ResolvedAllele> {
        self.alleles.get(alt_index)
    }
}

/// Records whose lengths cannot be computed at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// REF allele string is empty.
    #[error("reference allele is empty")]
    EmptyReference,
    /// An ALT allele string is empty.
    #[error("alternate allele #{index} is empty")]
    EmptyAlternate {
        /// Zero-based ALT index.
        index: usize,
    },
}

/// Resolve the signed length of every ALT allele.
///
/// `structural_info` is the raw INFO string; only `SVTYPE` and `SVLEN`
/// are consulted. Use [`resolve_record`] when `END` should count too.
pub fn resolve_lengths<S: AsRef<str>>(
    reference: &str,
    alternates: &[S],
    structural_info: Option<&str>,
) -> Result<Resolution, ResolveError> {
    resolve(reference, alternates, structural_info, None)
}

/// Resolve a record's ALT alleles, measuring symbolic ALTs without `SVLEN`
/// from `END` to the record position.
pub fn resolve_record(record: &VariantRecord) -> Result<Resolution, ResolveError> {
    resolve(
        &record.reference,
        &record.alternates,
        record.info.as_deref(),
        Some(record.position),
    )
}

fn resolve<S: AsRef<str>>(
    reference: &str,
    alternates: &[S],
    structural_info: Option<&str>,
    position: Option<i64>,
) -> Result<Resolution, ResolveError> {
    if reference.is_empty() {
        return Err(ResolveError::EmptyReference);
    }

    let hints = StructuralHints::parse(structural_info);
    let mut resolution = Resolution {
        alleles: Vec::with_capacity(alternates.len()),
        warnings: Vec::new(),
    };

    for (index, alternate) in alternates.iter().enumerate() {
        let alternate = alternate.as_ref();
        if alternate.is_empty() {
            return Err(ResolveError::EmptyAlternate { index });
        }
        if alternate == "*" || alternate == "." {
            resolution.alleles.push(ResolvedAllele::placeholder());
            continue;
        }
        let symbolic = is_symbolic(alternate);

        let sv_type = match structural_type(alternate, &hints) {
            Ok(Some(sv_type)) => sv_type,
            Ok(None) => {
                resolution.alleles.push(heuristic(reference, alternate));
                continue;
            }
            Err(UnknownSvType(code)) => {
                resolution.warnings.push(UnresolvedStructural {
                    allele: index,
                    detail: format!("unknown SV type '{code}'"),
                });
                resolution.alleles.push(if symbolic {
                    ResolvedAllele::unresolved(None)
                } else {
                    heuristic(reference, alternate)
                });
                continue;
            }
        };

        let declared = match hints.declared_length(index) {
            Ok(declared) => declared,
            Err(raw) => {
                resolution.warnings.push(UnresolvedStructural {
                    allele: index,
                    detail: format!("unusable SVLEN '{raw}'"),
                });
                None
            }
        };
        if let Some(magnitude) = declared {
            resolution
                .alleles
                .push(declared_structural(sv_type, magnitude));
            continue;
        }

        if !symbolic {
            // Literal sequence or breakend: the strings carry the length.
            let mut allele = heuristic(reference, alternate);
            if is_breakend(alternate) {
                allele.length = 0;
                allele.extent = 1;
            }
            allele.class = AlleleClass::Structural(sv_type);
            resolution.alleles.push(allele);
            continue;
        }

        let span = hints.span_from_end(position);
        let allele = match span {
            Ok(Some(magnitude)) if magnitude > 0 => declared_structural(sv_type, magnitude),
            _ if sv_type.length_sign() == 0 => declared_structural(sv_type, 0),
            _ => {
                let already_reported = resolution
                    .warnings
                    .last()
                    .is_some_and(|warning| warning.allele == index);
                if !already_reported {
                    let detail = match span {
                        Err(raw) => format!("{sv_type} allele with unusable END '{raw}'"),
                        _ => format!("{sv_type} allele without a usable SVLEN or END"),
                    };
                    resolution.warnings.push(UnresolvedStructural {
                        allele: index,
                        detail,
                    });
                }
                ResolvedAllele::unresolved(Some(sv_type))
            }
        };
        resolution.alleles.push(allele);
    }

    Ok(resolution)
}

fn declared_structural(sv_type: SvType, magnitude: i64) -> ResolvedAllele {
    ResolvedAllele {
        length: sv_type.length_sign() * magnitude,
        class: AlleleClass::Structural(sv_type),
        extent: magnitude.max(1),
    }
}

/// String-length heuristic: `len(ALT) - len(REF)`.
fn heuristic(reference: &str, alternate: &str) -> ResolvedAllele {
    let ref_len = reference.len() as i64;
    let alt_len = alternate.len() as i64;
    let length = alt_len - ref_len;
    let class = match (ref_len, alt_len) {
        (1, 1) => AlleleClass::Snv,
        _ if length == 0 => AlleleClass::Mnv,
        (1, _) => AlleleClass::Insertion,
        (_, 1) => AlleleClass::Deletion,
        _ => AlleleClass::Complex,
    };
    let extent = match class {
        AlleleClass::Mnv => ref_len,
        _ => length.abs().max(1),
    };
    ResolvedAllele {
        length,
        class,
        extent,
    }
}

fn is_symbolic(alternate: &str) -> bool {
    alternate.starts_with('<') && alternate.ends_with('>')
}

fn is_breakend(alternate: &str) -> bool {
    alternate.contains('[') || alternate.contains(']')
}

/// Symbolic ALT first, then `SVTYPE`, then breakend notation.
///
/// A symbolic ALT that names no known type defers to `SVTYPE` before the
/// unknown code is reported.
fn structural_type(
    alternate: &str,
    hints: &StructuralHints<'_>,
) -> Result<Option<SvType>, UnknownSvType> {
    let from_info = hints.sv_type.map(str::parse::<SvType>);
    if is_symbolic(alternate) {
        return match alternate.parse::<SvType>() {
            Ok(sv_type) => Ok(Some(sv_type)),
            Err(unknown) => match from_info {
                Some(Ok(sv_type)) => Ok(Some(sv_type)),
                _ => Err(unknown),
            },
        };
    }
    match from_info {
        Some(parsed) => parsed.map(Some),
        None if is_breakend(alternate) => Ok(Some(SvType::Breakend)),
        None => Ok(None),
    }
}

/// `SVTYPE` / `SVLEN` / `END` entries extracted from an INFO string.
#[derive(Debug, Default)]
struct StructuralHints<'a> {
    sv_type: Option<&'a str>,
    sv_len: Option<&'a str>,
    end: Option<&'a str>,
}

impl<'a> StructuralHints<'a> {
    fn parse(info: Option<&'a str>) -> Self {
        let mut hints = Self::default();
        let Some(info) = info else {
            return hints;
        };
        for field in info.split(';') {
            match field.split_once('=') {
                Some(("SVTYPE", value)) => hints.sv_type = Some(value.trim()),
                Some(("SVLEN", value)) => hints.sv_len = Some(value.trim()),
                Some(("END", value)) => hints.end = Some(value.trim()),
                _ => {}
            }
        }
        hints
    }

    /// Declared length magnitude for an ALT; a single `SVLEN` value applies
    /// to all.
    fn declared_length(&self, index: usize) -> Result<Option<i64>, String> {
        let Some(raw) = self.sv_len else {
            return Ok(None);
        };
        let values: Vec<&str> = raw.split(',').collect();
        let value = match values.as_slice() {
            [single] => *single,
            many => match many.get(index) {
                Some(value) => *value,
                None => return Ok(None),
            },
        };
        if value == "." {
            return Ok(None);
        }
        value
            .parse::<i64>()
            .ok()
            .and_then(i64::checked_abs)
            .map(Some)
            .ok_or_else(|| value.to_string())
    }

    /// Bases from `position` to `END`, when both are known.
    fn span_from_end(&self, position: Option<i64>) -> Result<Option<i64>, String> {
        let (Some(raw), Some(position)) = (self.end, position) else {
            return Ok(None);
        };
        raw.parse::<i64>()
            .ok()
            .and_then(|end| end.checked_sub(position))
            .filter(|span| *span >= 0)
            .map(Some)
            .ok_or_else(|| raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn alts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test_case("A", "G", 0, AlleleClass::Snv ; "snv")]
    #[test_case("A", "ATT", 2, AlleleClass::Insertion ; "insertion")]
    #[test_case("ACGT", "A", -3, AlleleClass::Deletion ; "deletion")]
    #[test_case("AC", "GT", 0, AlleleClass::Mnv ; "mnv")]
    #[test_case("ACG", "TT", -1, AlleleClass::Complex ; "complex")]
    fn string_length_heuristic(reference: &str, alternate: &str, length: i64, class: AlleleClass) {
        let resolution = resolve_lengths(reference, &alts(&[alternate]), None).unwrap();
        assert_eq!(resolution.alleles[0].length, length);
        assert_eq!(resolution.alleles[0].class, class);
        assert!(resolution.warnings.is_empty());
    }

    #[test_case("<DEL>", "SVTYPE=DEL;SVLEN=-100", -100 ; "deletion keeps sign")]
    #[test_case("<DEL>", "SVTYPE=DEL;SVLEN=100", -100 ; "deletion sign from type")]
    #[test_case("<INS>", "SVLEN=250", 250 ; "insertion from symbol")]
    #[test_case("<DUP:TANDEM>", "SVLEN=40", 40 ; "duplication subtype")]
    #[test_case("<INV>", "SVTYPE=INV;SVLEN=900", 0 ; "inversion has no delta")]
    fn declared_structural_lengths(alternate: &str, info: &str, length: i64) {
        let resolution = resolve_lengths("N", &alts(&[alternate]), Some(info)).unwrap();
        assert_eq!(resolution.alleles[0].length, length);
        assert!(matches!(
            resolution.alleles[0].class,
            AlleleClass::Structural(_)
        ));
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn multiallelic_lengths_are_independent() {
        let resolution = resolve_lengths("AC", &alts(&["A", "ACGT", "GC"]), None).unwrap();
        assert_eq!(resolution.lengths(), vec![-1, 2, 0]);
    }

    #[test]
    fn per_alt_svlen_list() {
        let resolution = resolve_lengths(
            "N",
            &alts(&["<DEL>", "<INS>"]),
            Some("SVLEN=-10,30"),
        )
        .unwrap();
        assert_eq!(resolution.lengths(), vec![-10, 30]);
    }

    #[test]
    fn unknown_svtype_falls_back_with_warning() {
        let resolution = resolve_lengths("A", &alts(&["ATTT"]), Some("SVTYPE=XYZ;SVLEN=3")).unwrap();
        assert_eq!(resolution.alleles[0].length, 3);
        assert_eq!(resolution.alleles[0].class, AlleleClass::Insertion);
        assert_eq!(resolution.warnings.len(), 1);
        assert!(resolution.warnings[0].detail.contains("XYZ"));
    }

    #[test]
    fn unknown_symbol_defers_to_info_type() {
        let resolution =
            resolve_lengths("N", &alts(&["<DEL:FOO_BAR>"]), Some("SVTYPE=DEL;SVLEN=5")).unwrap();
        assert_eq!(resolution.alleles[0].length, -5);

        let resolution = resolve_lengths("N", &alts(&["<WEIRD>"]), Some("SVLEN=5")).unwrap();
        assert_eq!(resolution.alleles[0].length, 0);
        assert_eq!(resolution.warnings.len(), 1);
        assert!(resolution.warnings[0].detail.contains("WEIRD"));
    }

    fn symbolic_record(alternate: &str, info: &str) -> VariantRecord {
        VariantRecord::new("chr1", 1000, "N", alts(&[alternate]), vec![]).with_info(info)
    }

    #[test_case("<DEL>", "SVTYPE=DEL;END=1100", -100, 100 ; "deletion from end")]
    #[test_case("<DUP>", "END=1040", 40, 40 ; "duplication from end")]
    #[test_case("<INV>", "SVTYPE=INV;END=1900", 0, 900 ; "inversion extent from end")]
    #[test_case("<INV>", "SVTYPE=INV", 0, 1 ; "inversion without end")]
    #[test_case("<DEL>", "SVTYPE=DEL;SVLEN=-7;END=1100", -7, 7 ; "svlen beats end")]
    fn symbolic_lengths_from_end(alternate: &str, info: &str, length: i64, extent: i64) {
        let resolution = resolve_record(&symbolic_record(alternate, info)).unwrap();
        assert_eq!(resolution.alleles[0].length, length);
        assert_eq!(resolution.alleles[0].extent, extent);
        assert!(resolution.warnings.is_empty());
    }

    #[test_case("<DEL>", "SVTYPE=DEL" ; "deletion without length")]
    #[test_case("<INS>", "SVTYPE=INS;END=1000" ; "insertion with empty end span")]
    #[test_case("<DEL>", "SVTYPE=DEL;END=900" ; "end before position")]
    #[test_case("<DEL>", "SVTYPE=DEL;END=far" ; "end not a number")]
    fn symbolic_without_length_changes_nothing(alternate: &str, info: &str) {
        let resolution = resolve_record(&symbolic_record(alternate, info)).unwrap();
        assert_eq!(resolution.alleles[0].length, 0);
        assert_eq!(resolution.warnings.len(), 1);
        assert_eq!(resolution.warnings[0].allele, 0);
    }

    #[test]
    fn end_is_ignored_without_a_position() {
        let resolution = resolve_lengths("N", &alts(&["<DEL>"]), Some("END=1100")).unwrap();
        assert_eq!(resolution.alleles[0].length, 0);
        assert_eq!(resolution.warnings.len(), 1);
    }

    #[test_case("-9223372036854775808" ; "most negative")]
    #[test_case("99999999999999999999" ; "past i64")]
    #[test_case("long" ; "not a number")]
    fn unusable_svlen_is_reported_once(svlen: &str) {
        let info = format!("SVTYPE=DEL;SVLEN={svlen}");
        let resolution = resolve_record(&symbolic_record("<DEL>", &info)).unwrap();
        assert_eq!(resolution.alleles[0].length, 0);
        assert_eq!(resolution.warnings.len(), 1);
        assert!(resolution.warnings[0].detail.contains(svlen));
    }

    #[test]
    fn unusable_svlen_falls_back_to_end() {
        let info = "SVTYPE=DEL;SVLEN=-9223372036854775808;END=1010";
        let resolution = resolve_record(&symbolic_record("<DEL>", info)).unwrap();
        assert_eq!(resolution.alleles[0].length, -10);
        assert_eq!(resolution.warnings.len(), 1);
    }

    #[test]
    fn symbolic_breakend_has_no_delta() {
        let resolution = resolve_lengths("N", &alts(&["<BND>"]), None).unwrap();
        assert_eq!(resolution.alleles[0].length, 0);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn breakend_has_no_delta() {
        let resolution = resolve_lengths("G", &alts(&["G]17:198982]"]), None).unwrap();
        assert_eq!(resolution.alleles[0].length, 0);
        assert_eq!(
            resolution.alleles[0].class,
            AlleleClass::Structural(SvType::Breakend)
        );
    }

    #[test]
    fn placeholders_do_not_count() {
        let resolution = resolve_lengths("A", &alts(&["*"]), None).unwrap();
        assert_eq!(resolution.alleles[0].length, 0);
        assert!(!resolution.alleles[0].class.is_variant());
    }

    #[test]
    fn empty_alleles_are_rejected() {
        assert_eq!(
            resolve_lengths("", &alts(&["A"]), None),
            Err(ResolveError::EmptyReference)
        );
        assert_eq!(
            resolve_lengths("A", &alts(&["G", ""]), None),
            Err(ResolveError::EmptyAlternate { index: 1 })
        );
    }
}
