use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use std::io::{self, BufWriter, Write};

use pangene::classify::{post_process, OverlapClassifier};
use pangene::format_io::{write_bed, write_gfa};
use pangene::graph::PangeneGraph;
use pangene::hit::PangeneData;
use pangene::options::PangeneOpts;
use pangene::paf::read_paf;

/// pangene - Construct a gene graph from protein-to-genome alignments
///
/// Each input is the PAF output of aligning one set of proteins to one genome,
/// with the CIGAR in the cg:Z: tag
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// PAF files, one per genome ("-" for stdin)
    #[clap(value_name = "PAF", required = true)]
    inputs: Vec<String>,

    /// Gene name is the protein name up to this character
    #[clap(short = 'd', long = "gene-sep", default_value = ":")]
    gene_sep: char,

    /// Keep genes whose best hit is unshadowed in at least this fraction of genomes
    #[clap(short = 'p', long = "min-vertex-ratio", default_value = "0.05")]
    min_vertex_ratio: f64,

    /// Overlap fraction of the shorter hit at which a weaker hit of another gene is shadowed
    #[clap(long = "max-shadow-overlap", default_value = "0.5")]
    max_shadow_overlap: f64,

    /// Write the hits of this genome (0-based) as BED instead of the graph
    #[clap(long = "bed", value_name = "GENOME")]
    bed: Option<usize>,

    /// Output file (stdout if not specified)
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// Number of threads for parallel processing
    #[clap(short = 't', long = "threads", default_value = "8")]
    threads: usize,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[clap(long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        LevelFilter::Warn
    } else {
        match args.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let opts = PangeneOpts {
        gene_sep: args.gene_sep,
        min_vertex_ratio: args.min_vertex_ratio,
        max_shadow_overlap: args.max_shadow_overlap,
        threads: args.threads,
    };
    opts.validate()?;

    if args.inputs.iter().filter(|p| p.as_str() == "-").count() > 1 {
        bail!("stdin (\"-\") can be given at most once");
    }

    // Set up rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(opts.threads)
        .build_global()?;

    let mut data = PangeneData::new();
    for path in &args.inputs {
        read_paf(&mut data, path, opts.gene_sep)
            .with_context(|| format!("failed to read genome from {path}"))?;
    }

    let classifier = OverlapClassifier::new(opts.max_shadow_overlap);
    post_process(&mut data, &classifier)?;
    let graph = PangeneGraph::build(&mut data, &opts, &classifier)?;

    let mut output: Box<dyn Write> = if let Some(ref path) = args.output {
        Box::new(BufWriter::new(
            std::fs::File::create(path).with_context(|| format!("failed to create {path}"))?,
        ))
    } else {
        Box::new(BufWriter::new(io::stdout().lock()))
    };

    match args.bed {
        Some(genome_idx) => write_bed(&data, genome_idx, &mut output)?,
        None => write_gfa(&data, &graph, &mut output)?,
    }
    output.flush()?;

    info!(
        "wrote {} vertices and {} arcs",
        graph.vertices.len(),
        graph.arcs.len()
    );
    Ok(())
}
