//! VCF-shaped text in, offset-table TSV out.
//!
//! The reader keeps only what synchronization needs: contig headers, sample
//! names, and per record CHROM, POS, ID, REF, ALT, QUAL, FILTER, INFO and
//! the GT field of every sample. It is not a general VCF parser.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use thiserror::Error;

use super::{Chromosome, GenomeFile, VariantRecord};
use crate::ledger::OffsetTable;

/// Fixed columns before FORMAT.
const FIXED_COLUMNS: usize = 8;

const OFFSET_HEADER: &str = "genome\tslot\tposition\tspan_start\treference_offset\tmeta_offset\n";

/// Errors raised while tokenizing genome-file text.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Underlying reader failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A data line appeared before the `#CHROM` header.
    #[error("line {line}: record before the #CHROM header line")]
    MissingHeader {
        /// 1-based line number.
        line: usize,
    },
    /// Fewer columns than the fixed VCF columns.
    #[error("line {line}: expected at least {expected} columns, found {found}")]
    MissingColumns {
        /// 1-based line number.
        line: usize,
        /// Minimum column count.
        expected: usize,
        /// Column count seen.
        found: usize,
    },
    /// POS is not an integer.
    #[error("line {line}: invalid position '{value}'")]
    InvalidPosition {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        value: String,
    },
    /// A `##contig` header could not be read.
    #[error("line {line}: invalid contig header ({detail})")]
    InvalidContig {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        detail: String,
    },
}

/// Read one genome file, returning it with the contigs its header declares.
///
/// Each sample column becomes one genome. Contigs without a `length` are
/// ignored.
pub fn read_genome_file<R: BufRead>(
    reader: R,
    name: impl Into<Arc<str>>,
) -> Result<(GenomeFile, Vec<Chromosome>), RecordError> {
    let name = name.into();
    let mut contigs = Vec::new();
    let mut samples: Option<Vec<Arc<str>>> = None;
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if let Some(meta) = line.strip_prefix("##") {
            if let Some(body) = meta.strip_prefix("contig=") {
                if let Some(contig) = parse_contig(body, line_no)? {
                    contigs.push(contig);
                }
            }
            continue;
        }
        if let Some(header) = line.strip_prefix('#') {
            samples = Some(
                header
                    .split('\t')
                    .skip(FIXED_COLUMNS + 1)
                    .map(Arc::from)
                    .collect(),
            );
            continue;
        }
        let Some(samples) = samples.as_ref() else {
            return Err(RecordError::MissingHeader { line: line_no });
        };
        records.push(parse_record(line, line_no, samples.len())?);
    }

    let file = GenomeFile::new(name, samples.unwrap_or_default(), records);
    tracing::debug!(
        file = %file.name,
        samples = file.samples.len(),
        records = file.records.len(),
        contigs = contigs.len(),
        "genome file read"
    );
    Ok((file, contigs))
}

fn parse_contig(body: &str, line: usize) -> Result<Option<Chromosome>, RecordError> {
    let inner = body
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .ok_or_else(|| RecordError::InvalidContig {
            line,
            detail: "expected <...>".to_string(),
        })?;
    let mut id = None;
    let mut length = None;
    for field in inner.split(',') {
        match field.split_once('=') {
            Some(("ID", value)) => id = Some(value),
            Some(("length", value)) => length = Some(value),
            _ => {}
        }
    }
    let id = id.ok_or_else(|| RecordError::InvalidContig {
        line,
        detail: "missing ID".to_string(),
    })?;
    let Some(length) = length else {
        return Ok(None);
    };
    let length = length
        .parse::<i64>()
        .map_err(|_| RecordError::InvalidContig {
            line,
            detail: format!("invalid length '{length}'"),
        })?;
    Ok(Some(Chromosome::new(id, length)))
}

fn dot_to_none(value: &str) -> Option<&str> {
    (value != ".").then_some(value)
}

fn parse_record(line: &str, line_no: usize, sample_count: usize) -> Result<VariantRecord, RecordError> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < FIXED_COLUMNS {
        return Err(RecordError::MissingColumns {
            line: line_no,
            expected: FIXED_COLUMNS,
            found: columns.len(),
        });
    }
    let position = columns[1]
        .parse::<i64>()
        .map_err(|_| RecordError::InvalidPosition {
            line: line_no,
            value: columns[1].to_string(),
        })?;
    let alternates = match dot_to_none(columns[4]) {
        Some(alts) => alts.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    };

    let gt_index = columns
        .get(FIXED_COLUMNS)
        .and_then(|format| format.split(':').position(|key| key == "GT"));
    let genotypes = (0..sample_count)
        .map(|sample| {
            columns
                .get(FIXED_COLUMNS + 1 + sample)
                .zip(gt_index)
                .and_then(|(column, gt)| column.split(':').nth(gt))
                .unwrap_or(".")
                .to_string()
        })
        .collect();

    let mut record = VariantRecord::new(columns[0], position, columns[3], alternates, genotypes);
    record.id = dot_to_none(columns[2]).map(str::to_string);
    record.quality = dot_to_none(columns[5]).and_then(|qual| qual.parse().ok());
    record.filter = dot_to_none(columns[6]).map(str::to_string);
    record.info = dot_to_none(columns[7]).map(str::to_string);
    Ok(record)
}

/// Write every breakpoint of a table as TSV, genome and slot order first.
pub fn write_offsets<W: Write>(writer: &mut W, table: &OffsetTable) -> Result<()> {
    let chromosome = table.chromosome();
    writeln!(
        writer,
        "##chromosome={} length={}",
        chromosome.name(),
        chromosome.length()
    )?;
    writer.write_all(OFFSET_HEADER.as_bytes())?;

    for (genome, slot, track) in table.tracks() {
        let name = &table.genomes()[genome];
        for bp in track.breakpoints() {
            writeln!(
                writer,
                "{name}\t{slot}\t{}\t{}\t{}\t{}",
                bp.position, bp.span_start, bp.reference_offset, bp.meta_offset
            )?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Render a table into a TSV string (useful for tests and snapshots).
pub fn render_offsets(table: &OffsetTable) -> Result<String> {
    let mut buffer = Vec::new();
    write_offsets(&mut buffer, table)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered offsets are not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
##fileformat=VCFv4.3
##contig=<ID=chr1,length=5000>
##contig=<ID=chrM>
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tg1\tg2
chr1\t100\trs1\tA\tATT\t50\tPASS\t.\tGT:DP\t0|1:12\t1/1:9
chr1\t200\t.\tN\t<DEL>\t.\t.\tSVTYPE=DEL;SVLEN=-30\tDP:GT\t4:1|0\t3:./.
";

    #[test]
    fn reads_contigs_samples_and_genotypes() {
        let (file, contigs) = read_genome_file(Cursor::new(SAMPLE), "calls.vcf").unwrap();
        assert_eq!(contigs, vec![Chromosome::new("chr1", 5000)]);
        assert_eq!(file.samples.len(), 2);
        assert_eq!(file.samples[1].as_ref(), "g2");
        assert_eq!(file.records.len(), 2);

        let first = &file.records[0];
        assert_eq!(first.id.as_deref(), Some("rs1"));
        assert_eq!(first.alternates, vec!["ATT".to_string()]);
        assert_eq!(first.genotypes, vec!["0|1".to_string(), "1/1".to_string()]);
        assert_eq!(first.quality, Some(50.0));

        let second = &file.records[1];
        assert_eq!(second.info.as_deref(), Some("SVTYPE=DEL;SVLEN=-30"));
        assert_eq!(second.genotypes, vec!["1|0".to_string(), "./.".to_string()]);
        assert!(second.quality.is_none());
    }

    #[test]
    fn rejects_records_before_header() {
        let text = "chr1\t1\t.\tA\tG\t.\t.\t.\n";
        assert!(matches!(
            read_genome_file(Cursor::new(text), "x"),
            Err(RecordError::MissingHeader { line: 1 })
        ));
    }

    #[test]
    fn rejects_bad_position() {
        let text = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\nchr1\tabc\t.\tA\tG\t.\t.\t.\n";
        assert!(matches!(
            read_genome_file(Cursor::new(text), "x"),
            Err(RecordError::InvalidPosition { line: 2, .. })
        ));
    }

    #[test]
    fn empty_table_renders_header_only() {
        let table = OffsetTable::new(Chromosome::new("chr1", 10), vec![Arc::from("g1")]);
        let rendered = render_offsets(&table).unwrap();
        assert_eq!(
            rendered,
            format!("##chromosome=chr1 length=10\n{OFFSET_HEADER}")
        );
    }
}
