use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

/// Chromosome identity and reference length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chromosome {
    name: Arc<str>,
    length: i64,
}

impl Chromosome {
    /// Construct a chromosome from its name and reference length.
    pub fn new(name: impl Into<Arc<str>>, length: i64) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }

    /// Chromosome name as it appears in variant records.
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Reference length in bases.
    pub fn length(&self) -> i64 {
        self.length
    }

    /// Whether a 1-based reference position lies on this chromosome.
    pub fn contains(&self, position: i64) -> bool {
        position >= 1 && position <= self.length
    }
}

/// Name-indexed chromosome lookup, preserving declaration order.
#[derive(Debug, Clone, Default)]
pub struct ChromosomeCatalog {
    order: Vec<Chromosome>,
    by_name: HashMap<Arc<str>, usize>,
}

impl ChromosomeCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from `(name, length)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<Arc<str>>,
    {
        let mut catalog = Self::new();
        for (name, length) in pairs {
            catalog.insert(Chromosome::new(name, length));
        }
        catalog
    }

    /// Register a chromosome. A repeated name keeps the first declaration.
    pub fn insert(&mut self, chromosome: Chromosome) -> bool {
        if self.by_name.contains_key(chromosome.name()) {
            return false;
        }
        self.by_name
            .insert(Arc::clone(chromosome.name()), self.order.len());
        self.order.push(chromosome);
        true
    }

    /// Look up a chromosome by name.
    pub fn get(&self, name: &str) -> Option<&Chromosome> {
        self.by_name.get(name).map(|&idx| &self.order[idx])
    }

    /// Whether the catalog knows this chromosome.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Chromosomes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Chromosome> {
        self.order.iter()
    }

    /// Number of chromosomes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Errors raised while parsing a genotype string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenotypeError {
    /// Allele token is neither `.` nor a non-negative integer.
    #[error("invalid allele token '{0}' in genotype")]
    InvalidToken(String),
    /// More than two alleles were listed.
    #[error("genotype '{0}' is not diploid")]
    NotDiploid(String),
    /// Genotype string is empty.
    #[error("empty genotype")]
    Empty,
}

/// Diploid genotype call: one allele index per slot, `None` for `.`.
///
/// Index 0 is the reference, 1..=N select ALT #1..N.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Genotype {
    alleles: [Option<usize>; 2],
    phased: bool,
}

impl Genotype {
    /// Construct a genotype from its two allele indices.
    pub fn new(first: Option<usize>, second: Option<usize>, phased: bool) -> Self {
        Self {
            alleles: [first, second],
            phased,
        }
    }

    /// Allele index read by the given slot (0 or 1).
    pub fn allele(&self, slot: usize) -> Option<usize> {
        self.alleles.get(slot).copied().flatten()
    }

    /// Whether the genotype was written with `|`.
    pub fn is_phased(&self) -> bool {
        self.phased
    }
}

impl FromStr for Genotype {
    type Err = GenotypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(GenotypeError::Empty);
        }
        let phased = s.contains('|');
        let tokens: Vec<&str> = s.split(['|', '/']).collect();
        let parse = |token: &str| -> Result<Option<usize>, GenotypeError> {
            if token == "." {
                return Ok(None);
            }
            token
                .parse::<usize>()
                .map(Some)
                .map_err(|_| GenotypeError::InvalidToken(token.to_string()))
        };
        match tokens.as_slice() {
            // Haploid calls occupy both slots.
            [single] => {
                let allele = parse(single)?;
                Ok(Self::new(allele, allele, phased))
            }
            [first, second] => Ok(Self::new(parse(first)?, parse(second)?, phased)),
            _ => Err(GenotypeError::NotDiploid(s.to_string())),
        }
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |allele: Option<usize>| match allele {
            Some(idx) => idx.to_string(),
            None => ".".to_string(),
        };
        let sep = if self.phased { '|' } else { '/' };
        write!(
            f,
            "{}{}{}",
            render(self.alleles[0]),
            sep,
            render(self.alleles[1])
        )
    }
}

/// Tokenized variant-call record, as handed over by an external reader.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariantRecord {
    /// Chromosome name.
    pub chrom: Arc<str>,
    /// 1-based position in REFERENCE coordinates.
    pub position: i64,
    /// Optional record identifier.
    pub id: Option<String>,
    /// Reference allele string.
    pub reference: String,
    /// Alternate allele strings (empty for monomorphic sites).
    pub alternates: Vec<String>,
    /// Optional call quality.
    pub quality: Option<f64>,
    /// Optional filter status.
    pub filter: Option<String>,
    /// Raw INFO string, consulted for structural-variant hints.
    pub info: Option<String>,
    /// Raw genotype string per sample, in sample order.
    pub genotypes: Vec<String>,
}

impl VariantRecord {
    /// Construct a record without annotations.
    pub fn new(
        chrom: impl Into<Arc<str>>,
        position: i64,
        reference: impl Into<String>,
        alternates: Vec<String>,
        genotypes: Vec<String>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            position,
            id: None,
            reference: reference.into(),
            alternates,
            quality: None,
            filter: None,
            info: None,
            genotypes,
        }
    }

    /// Attach a raw INFO string.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Genotype string for a sample, if present.
    pub fn genotype(&self, sample: usize) -> Option<&str> {
        self.genotypes.get(sample).map(String::as_str)
    }
}

/// One genome file: a set of samples and their records, sorted by
/// `(chromosome, position)`.
///
/// Each sample is one genome on the shared axis. The sort order is a
/// precondition; the synchronizer rejects a chromosome whose records go
/// backwards.
#[derive(Debug, Clone)]
pub struct GenomeFile {
    /// File label used in diagnostics.
    pub name: Arc<str>,
    /// Sample (genome) names, one per genotype column.
    pub samples: Vec<Arc<str>>,
    /// Records in file order.
    pub records: Vec<VariantRecord>,
}

impl GenomeFile {
    /// Construct a genome file.
    pub fn new(
        name: impl Into<Arc<str>>,
        samples: Vec<Arc<str>>,
        records: Vec<VariantRecord>,
    ) -> Self {
        Self {
            name: name.into(),
            samples,
            records,
        }
    }

    /// Single-sample file whose sample shares the file name.
    pub fn single(name: impl Into<Arc<str>>, records: Vec<VariantRecord>) -> Self {
        let name = name.into();
        Self {
            samples: vec![Arc::clone(&name)],
            name,
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("0|1", Some(0), Some(1), true ; "phased het")]
    #[test_case("1/0", Some(1), Some(0), false ; "unphased het")]
    #[test_case("./.", None, None, false ; "missing diploid")]
    #[test_case(".", None, None, false ; "missing haploid")]
    #[test_case("1", Some(1), Some(1), false ; "haploid duplicated")]
    #[test_case("./1", None, Some(1), false ; "half missing")]
    #[test_case(" 2|2 ", Some(2), Some(2), true ; "surrounding whitespace")]
    fn parses_genotypes(text: &str, first: Option<usize>, second: Option<usize>, phased: bool) {
        let gt: Genotype = text.parse().unwrap();
        assert_eq!(gt.allele(0), first);
        assert_eq!(gt.allele(1), second);
        assert_eq!(gt.is_phased(), phased);
    }

    #[test_case("", GenotypeError::Empty ; "empty")]
    #[test_case("0|x", GenotypeError::InvalidToken("x".into()) ; "bad token")]
    #[test_case("-1|0", GenotypeError::InvalidToken("-1".into()) ; "negative index")]
    #[test_case("0/1/2", GenotypeError::NotDiploid("0/1/2".into()) ; "triploid")]
    fn rejects_genotypes(text: &str, expected: GenotypeError) {
        assert_eq!(text.parse::<Genotype>(), Err(expected));
    }

    #[test]
    fn catalog_keeps_declaration_order() {
        let catalog = ChromosomeCatalog::from_pairs([("chr2", 200), ("chr1", 100), ("chr2", 5)]);
        let names: Vec<&str> = catalog.iter().map(|c| c.name().as_ref()).collect();
        assert_eq!(names, vec!["chr2", "chr1"]);
        assert_eq!(catalog.get("chr2").map(Chromosome::length), Some(200));
        assert!(catalog.get("chrX").is_none());
    }

    #[test]
    fn chromosome_bounds_are_one_based() {
        let chrom = Chromosome::new("chr1", 10);
        assert!(!chrom.contains(0));
        assert!(chrom.contains(1));
        assert!(chrom.contains(10));
        assert!(!chrom.contains(11));
    }

    #[test]
    fn genotype_display_round_trips_phasing() {
        let gt: Genotype = "1|0".parse().unwrap();
        assert_eq!(gt.to_string(), "1|0");
        let gt: Genotype = "./1".parse().unwrap();
        assert_eq!(gt.to_string(), "./1");
    }
}
