//! The command-line surface: a single declarative `clap` struct, following
//! this codebase's convention of deriving flags rather than hand-parsing
//! `std::env::args()`.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, error::ErrorKind};

use crate::backend::BackendKind;

/// Identifies, orients, and trims full-length cDNA long reads around known
/// primer sequences.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input FASTA/FASTQ file, or `-` for stdin. May be gzip-compressed.
    pub input: PathBuf,

    /// Output file for trimmed, oriented fragments, or `-` for stdout.
    #[arg(short = 'o', long, default_value = "-")]
    pub output: String,

    /// Primer FASTA file.
    #[arg(short = 'b', long)]
    pub primers: Option<PathBuf>,

    /// Profile-HMM file for backend A.
    #[arg(short = 'g', long)]
    pub hmm: Option<PathBuf>,

    /// Primer-pair configuration string (`direction:A,B|...`).
    #[arg(short = 'c', long)]
    pub config: Option<String>,

    /// Bundled kit preset name, used when `-b`/`-g`/`-c` are not set.
    #[arg(short = 'k', long)]
    pub kit: Option<String>,

    /// Score cutoff; autotuned from a sample when absent.
    #[arg(short = 'q', long)]
    pub cutoff: Option<f32>,

    /// Minimum mean read quality.
    #[arg(short = 'Q', long, default_value_t = 7.0)]
    pub min_qual: f32,

    /// Minimum usable segment length.
    #[arg(short = 'z', long, default_value_t = 50)]
    pub min_len: usize,

    /// Target sample size for autotuning.
    #[arg(short = 'Y', long, default_value_t = 10_000)]
    pub autotune_sample: usize,

    /// Number of candidate cutoffs tried during autotuning.
    #[arg(short = 'L', long, default_value_t = crate::autotune::CANDIDATE_COUNT)]
    pub autotune_candidates: usize,

    /// Detection backend.
    #[arg(short = 'm', long, value_enum, default_value_t = BackendKind::Edlib)]
    pub backend: BackendKind,

    /// Protocol preset overriding `-c`.
    #[arg(short = 'x', long)]
    pub protocol: Option<String>,

    /// Keep flanking primers in emitted fragments.
    #[arg(short = 'p', long, default_value_t = false)]
    pub keep_primers: bool,

    /// Worker thread count.
    #[arg(short = 't', long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Batch size.
    #[arg(short = 'B', long, default_value_t = 4_000)]
    pub batch_size: usize,

    /// Reproducible RNG seed for sampling.
    #[arg(short = 's', long)]
    pub seed: Option<u64>,

    /// Path to the external profile-HMM search tool, for backend A.
    #[arg(long, default_value = "nhmmscan")]
    pub hmm_tool: PathBuf,

    /// Side output: unclassified reads.
    #[arg(short = 'u', long)]
    pub unclassified_output: Option<PathBuf>,

    /// Side output: rescued fragments.
    #[arg(short = 'r', long)]
    pub rescued_output: Option<PathBuf>,

    /// Side output: length-failing fragments.
    #[arg(short = 'l', long)]
    pub len_fail_output: Option<PathBuf>,

    /// Side output: quality-failing reads.
    #[arg(short = 'w', long)]
    pub qual_fail_output: Option<PathBuf>,

    /// Side output: alignment-hit BED file.
    #[arg(short = 'S', long)]
    pub bed_output: Option<PathBuf>,

    /// Side output: per-read TSV.
    #[arg(short = 'K', long)]
    pub per_read_tsv: Option<PathBuf>,

    /// Side output: statistics TSV.
    #[arg(short = 'A', long)]
    pub stats_tsv: Option<PathBuf>,

    /// Side output: PDF report.
    #[arg(short = 'D', long)]
    pub pdf_report: Option<PathBuf>,
}

/// Aborts clap with a given error `message` due to a custom validation
/// failure not expressible through derive attributes alone (e.g. a `-c`/`-x`
/// clash).
pub fn abort_clap(kind: ErrorKind, message: impl std::fmt::Display) -> ! {
    Cli::command().error(kind, message).exit()
}

impl Cli {
    /// Validates flag combinations that `clap`'s derive attributes alone
    /// can't express: `-c` and `-x` are mutually exclusive, and at least one
    /// of a kit, explicit primer/HMM paths, or a protocol preset must select
    /// a primer source.
    pub fn validate(&self) {
        if self.config.is_some() && self.protocol.is_some() {
            abort_clap(ErrorKind::ArgumentConflict, "`-c` and `-x` cannot both be set; `-x` already implies a config string");
        }
        if self.kit.is_none() && self.protocol.is_none() && self.primers.is_none() {
            abort_clap(
                ErrorKind::MissingRequiredArgument,
                "one of `-k`, `-x`, or `-b` is required to select a primer source",
            );
        }
    }
}
