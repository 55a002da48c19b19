use std::fmt;
use std::str::FromStr;

/// Structural-variant classes recognised in `SVTYPE` or symbolic ALTs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SvType {
    /// Deletion (`DEL`).
    Deletion,
    /// Insertion, including mobile elements (`INS`, `INS:ME:ALU`).
    Insertion,
    /// Duplication (`DUP`, `DUP:TANDEM`).
    Duplication,
    /// Inversion (`INV`).
    Inversion,
    /// Copy-number variant (`CNV`).
    CopyNumber,
    /// Breakend (`BND`).
    Breakend,
}

impl SvType {
    /// Sign applied to a declared SV length: DEL shrinks the genome,
    /// INS/DUP grow it, the rest leave it unchanged.
    pub fn length_sign(self) -> i64 {
        match self {
            SvType::Deletion => -1,
            SvType::Insertion | SvType::Duplication => 1,
            SvType::Inversion | SvType::CopyNumber | SvType::Breakend => 0,
        }
    }

    /// Canonical VCF token.
    pub fn as_str(self) -> &'static str {
        match self {
            SvType::Deletion => "DEL",
            SvType::Insertion => "INS",
            SvType::Duplication => "DUP",
            SvType::Inversion => "INV",
            SvType::CopyNumber => "CNV",
            SvType::Breakend => "BND",
        }
    }
}

impl fmt::Display for SvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised SV type code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSvType(pub String);

impl FromStr for SvType {
    type Err = UnknownSvType;

    /// Matches the leading `:`-separated token, case-insensitively, so
    /// subtypes like `DUP:TANDEM` resolve to their parent class.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().trim_start_matches('<').trim_end_matches('>');
        let head = code.split(':').next().unwrap_or_default();
        match head.to_ascii_uppercase().as_str() {
            "DEL" => Ok(SvType::Deletion),
            "INS" => Ok(SvType::Insertion),
            "DUP" => Ok(SvType::Duplication),
            "INV" => Ok(SvType::Inversion),
            "CNV" => Ok(SvType::CopyNumber),
            "BND" | "TRA" => Ok(SvType::Breakend),
            _ => Err(UnknownSvType(code.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtypes_resolve_to_parent() {
        assert_eq!("DUP:TANDEM".parse::<SvType>(), Ok(SvType::Duplication));
        assert_eq!("<INS:ME:ALU>".parse::<SvType>(), Ok(SvType::Insertion));
        assert_eq!("del".parse::<SvType>(), Ok(SvType::Deletion));
    }

    #[test]
    fn unknown_code_keeps_visible_characters() {
        assert_eq!(
            "<XYZ>".parse::<SvType>(),
            Err(UnknownSvType("XYZ".to_string()))
        );
    }
}
