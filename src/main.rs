use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use multigenome::genomics::{read_genome_file, write_offsets};
use multigenome::{
    AlleleSlot, Chromosome, ChromosomeCatalog, CoordinateSystem, GenomeFile, SyncConfig,
    SyncProject,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "multigenome",
    about = "Synchronize several genomes' coordinates on one shared axis"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize chromosomes and print their offset tables.
    Sync {
        /// VCF-shaped genome files (one genome per sample column).
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Only this chromosome (default: every catalog chromosome).
        #[arg(long)]
        chrom: Option<String>,
        /// Chromosome catalog as `name<TAB>length` lines.
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Scan chromosomes one after another.
        #[arg(long)]
        serial: bool,
    },
    /// Translate one position for one genome-allele.
    Translate {
        /// VCF-shaped genome files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Chromosome name.
        #[arg(long)]
        chrom: String,
        /// Genome (sample) name.
        #[arg(long)]
        genome: String,
        /// Genotype slot (0 or 1).
        #[arg(long, default_value_t = 0)]
        allele: usize,
        /// Position in the source system.
        #[arg(long)]
        position: i64,
        /// Target system: reference, current or meta.
        #[arg(long)]
        to: CoordinateSystem,
        /// Source system.
        #[arg(long, default_value = "reference")]
        from: CoordinateSystem,
        /// Chromosome catalog as `name<TAB>length` lines.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Print the variants replayed for one genome.
    Variants {
        /// VCF-shaped genome files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Chromosome name.
        #[arg(long)]
        chrom: String,
        /// Genome (sample) name.
        #[arg(long)]
        genome: String,
        /// Leave out blank padding.
        #[arg(long)]
        no_blanks: bool,
        /// Chromosome catalog as `name<TAB>length` lines.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Sync {
            inputs,
            chrom,
            catalog,
            serial,
        } => run_sync(&inputs, chrom.as_deref(), catalog.as_deref(), serial)?,
        Commands::Translate {
            inputs,
            chrom,
            genome,
            allele,
            position,
            to,
            from,
            catalog,
        } => run_translate(
            &inputs,
            &chrom,
            &genome,
            allele,
            position,
            from,
            to,
            catalog.as_deref(),
        )?,
        Commands::Variants {
            inputs,
            chrom,
            genome,
            no_blanks,
            catalog,
        } => run_variants(&inputs, &chrom, &genome, no_blanks, catalog.as_deref())?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_sync(
    inputs: &[PathBuf],
    chrom: Option<&str>,
    catalog_path: Option<&Path>,
    serial: bool,
) -> Result<()> {
    let (files, catalog) = load_inputs(inputs, catalog_path)?;
    let config = SyncConfig::default().with_parallel(!serial);
    let mut project = SyncProject::new(catalog, config);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match chrom {
        Some(chrom) => {
            let outcome = project
                .synchronize(chrom, &files)
                .with_context(|| format!("failed to synchronize {chrom}"))?;
            write_offsets(&mut out, &outcome.table)?;
            for diagnostic in &outcome.diagnostics {
                eprintln!("{diagnostic}");
            }
        }
        None => {
            let report = project.synchronize_all(&files);
            for diagnostic in &report.diagnostics {
                eprintln!("{diagnostic}");
            }
            let names: Vec<_> = project.chromosomes().cloned().collect();
            for name in names {
                write_offsets(&mut out, project.table(&name)?)?;
                for diagnostic in project.diagnostics(&name) {
                    eprintln!("{diagnostic}");
                }
            }
            for (name, err) in report.failures() {
                eprintln!("{name}: {err}");
            }
            if !report.is_complete() {
                bail!("some chromosomes could not be synchronized");
            }
        }
    }

    out.flush()?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_translate(
    inputs: &[PathBuf],
    chrom: &str,
    genome: &str,
    allele: usize,
    position: i64,
    from: CoordinateSystem,
    to: CoordinateSystem,
    catalog_path: Option<&Path>,
) -> Result<()> {
    let slot = AlleleSlot::from_index(allele)
        .with_context(|| format!("allele must be 0 or 1, got {allele}"))?;
    let (files, catalog) = load_inputs(inputs, catalog_path)?;
    let mut project = SyncProject::new(catalog, SyncConfig::default());
    project
        .synchronize(chrom, &files)
        .with_context(|| format!("failed to synchronize {chrom}"))?;
    let translated = project
        .translate_between(genome, slot, chrom, position, from, to)
        .context("translation failed")?;
    println!("{chrom}\t{genome}\t{slot}\t{from}:{position}\t{to}:{translated}");
    Ok(())
}

fn run_variants(
    inputs: &[PathBuf],
    chrom: &str,
    genome: &str,
    no_blanks: bool,
    catalog_path: Option<&Path>,
) -> Result<()> {
    let (files, catalog) = load_inputs(inputs, catalog_path)?;
    let config = SyncConfig::default().with_blank_variants(!no_blanks);
    let mut project = SyncProject::new(catalog, config);
    project
        .synchronize(chrom, &files)
        .with_context(|| format!("failed to synchronize {chrom}"))?;

    let variants = project.variants(genome, chrom)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for variant in &variants {
        writeln!(out, "{variant}")?;
    }
    out.flush()?;
    Ok(())
}

/// Read every genome file and assemble the chromosome catalog.
///
/// An explicit catalog file wins; otherwise contig headers are merged in
/// file order.
fn load_inputs(
    inputs: &[PathBuf],
    catalog_path: Option<&Path>,
) -> Result<(Vec<GenomeFile>, ChromosomeCatalog)> {
    let mut files = Vec::with_capacity(inputs.len());
    let mut catalog = ChromosomeCatalog::new();
    for path in inputs {
        let reader = BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        );
        let (file, contigs) = read_genome_file(reader, path.display().to_string())
            .with_context(|| format!("failed to read {}", path.display()))?;
        if catalog_path.is_none() {
            for contig in contigs {
                catalog.insert(contig);
            }
        }
        files.push(file);
    }
    if let Some(path) = catalog_path {
        catalog = read_catalog(path)?;
    }
    if catalog.is_empty() {
        bail!("no chromosomes declared: add ##contig headers or pass --catalog");
    }
    Ok((files, catalog))
}

fn read_catalog(path: &Path) -> Result<ChromosomeCatalog> {
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open catalog {}", path.display()))?,
    );
    let mut catalog = ChromosomeCatalog::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, length) = line
            .split_once('\t')
            .ok_or_else(|| anyhow::anyhow!("missing length on line {}", line_no + 1))?;
        let length: i64 = length.trim().parse().with_context(|| {
            format!("invalid length '{}' on line {}", length.trim(), line_no + 1)
        })?;
        catalog.insert(Chromosome::new(name, length));
    }
    Ok(catalog)
}
