//! The crate's orchestration entry point (§4.9/§5): resolves CLI inputs into
//! a primer store, config, and backend, autotunes a cutoff when none is
//! given, then streams batches through the per-read pipeline with an
//! order-preserving parallel map, accumulating statistics and routing
//! output on the driver thread only.

use std::io::Write;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;

use crate::args::Cli;
use crate::backend::edlib::EdlibBackend;
use crate::backend::phmm::PhmmBackend;
use crate::backend::{Backend, BackendKind};
use crate::config::{Config, find_kit_preset};
use crate::emitter::emit_segment;
use crate::io::{self, FilteredReader};
use crate::model::{Hit, Segment, Seq};
use crate::primers::PrimerStore;
use crate::reducer::reduce_hits;
use crate::reporting::{bed, tsv};
use crate::segmenter::segment as segment_hits;
use crate::stats::{Outcome, Stats};
use crate::utils;

const MODULE: &str = module_path!();

/// The two-or-three input paths plus the default `Config` string that select
/// a primer source, resolved from a kit/protocol preset or from explicit
/// `-b`/`-g`/`-c` flags.
struct PrimerSource {
    primers_path:  PathBuf,
    hmm_path:      PathBuf,
    config_string: String,
}

fn resolve_primer_source(cli: &Cli) -> std::io::Result<PrimerSource> {
    let preset_name = cli.protocol.as_ref().or(cli.kit.as_ref());
    let preset = preset_name
        .map(|name| {
            find_kit_preset(name)
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, format!("unknown kit/protocol preset '{name}'")))
        })
        .transpose()?;

    let primers_path = cli
        .primers
        .clone()
        .or_else(|| preset.map(|kit| PathBuf::from(kit.primers_path)))
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no primer source: pass `-b`, `-k`, or `-x`"))?;
    let hmm_path = cli.hmm.clone().or_else(|| preset.map(|kit| PathBuf::from(kit.hmm_path))).unwrap_or_default();
    let config_string = cli.config.clone().or_else(|| preset.map(|kit| kit.config_string.to_string())).unwrap_or_default();

    Ok(PrimerSource {
        primers_path,
        hmm_path,
        config_string,
    })
}

fn build_backend(cli: &Cli, primers: PrimerStore, hmm_path: &Path) -> Backend {
    match cli.backend {
        BackendKind::Phmm => Backend::Phmm(PhmmBackend::new(cli.hmm_tool.clone(), hmm_path.to_path_buf())),
        BackendKind::Edlib => Backend::Edlib(EdlibBackend::new(primers)),
    }
}

fn path_str(path: &Path) -> std::io::Result<&str> {
    path.to_str()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("non-UTF-8 path: {}", path.display())))
}

/// Picks a cutoff by Bernoulli-sampling the input down to roughly
/// `cli.autotune_sample` records and running [`crate::autotune::autotune`]
/// over the sample (§4.8). Falls back to sampling everything (`p = 1.0`) if
/// the record count can't be determined.
fn autotune_cutoff(cli: &Cli, backend: &Backend, config: &Config, seed: Option<u64>) -> std::io::Result<f32> {
    let is_fastq = sniff_is_fastq(&cli.input)?;
    let n = if cli.input.to_str() == Some("-") {
        None
    } else {
        count_records_best_effort(&cli.input, is_fastq)
    };
    let p = n.map_or(1.0, |n| (cli.autotune_sample as f32 / n.max(1) as f32).min(1.0));

    let rng = seed.map_or_else(Xoshiro256StarStar::from_os_rng, Xoshiro256StarStar::seed_from_u64);
    let (reader, reader_thread) = io::open_input(path_str(&cli.input)?)?;
    let filtered = FilteredReader::new(reader, cli.min_qual, Some(p), Some(rng));
    let sample: Vec<Seq> = filtered.filter_map(|r| r.ok()).collect();
    if let Some(handle) = reader_thread {
        let _ = handle.join();
    }

    eprintln!("{MODULE}: autotuning on a sample of {} reads (p={p:.4})", sample.len());
    let result = crate::autotune::autotune(&sample, backend, config, cli.autotune_candidates);
    Ok(result.best_cutoff)
}

/// Counts records for autotune's sample-size target, tolerating failure
/// (gzip-compressed inputs aren't line-counted by [`io::count_records`]):
/// falls back to `None`, which makes the caller sample everything.
fn count_records_best_effort(path: &Path, is_fastq: bool) -> Option<usize> {
    if path.extension().is_some_and(|ext| ext == "gz") {
        return None;
    }
    io::count_records(path, is_fastq).ok()
}

/// Peeks the leading non-whitespace byte of `path` to distinguish FASTQ
/// (`@`) from FASTA (`>`), without paying for a full parse.
fn sniff_is_fastq(path: &Path) -> std::io::Result<bool> {
    use std::io::BufRead;
    if path.to_str() == Some("-") {
        return Ok(true);
    }
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mut first = None;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        if let Some(&b) = buf.iter().find(|b| !b.is_ascii_whitespace()) {
            first = Some(b);
            break;
        }
        let len = buf.len();
        reader.consume(len);
    }
    Ok(first == Some(b'@'))
}

/// How one emitted fragment should be routed.
enum FragmentClass {
    Classified,
    Rescued,
    LengthFailed,
}

/// The pure per-read work unit of §4.9: `(read) -> (segments, hits,
/// usable_len)`, expanded here to also carry the materialised output
/// fragments and the per-read data stats/reporting need, so the driver
/// thread can do nothing but route and count.
struct WorkResult {
    read_id:   String,
    read_len:  usize,
    hits:      Vec<Hit>,
    outcome:   Outcome,
    fragments: Vec<(Seq, FragmentClass, Segment, Option<(String, String)>)>,
    pairs:     Vec<(String, String, bool)>,
}

/// Finds the cleaned hit pair that produced `segment`, by matching its
/// `left`/`right` boundaries back to a hit's `ref_start`/`ref_end`. The
/// segmenter itself discards this association once the DP has run (§4.6),
/// so it is reconstructed here for stats/reporting that need primer names.
fn primer_pair_for(segment: &Segment, hits: &[Hit]) -> Option<(String, String)> {
    let left = hits.iter().find(|h| h.ref_start == segment.left)?;
    let right = hits.iter().find(|h| h.ref_end == segment.right)?;
    Some((left.query_name.clone(), right.query_name.clone()))
}

fn process_read(read: &Seq, raw_hits: Vec<Hit>, config: &Config, cutoff: f32, min_len: usize, keep_primers: bool) -> WorkResult {
    let cleaned = reduce_hits(raw_hits, cutoff);

    let pairs: Vec<(String, String, bool)> = cleaned
        .windows(2)
        .map(|pair| {
            let [a, b] = pair else { unreachable!() };
            let in_config = config.get(&a.query_name, &b.query_name).is_some();
            (a.query_name.clone(), b.query_name.clone(), in_config)
        })
        .collect();

    let segmentation = segment_hits(&cleaned, config);
    let usable: Vec<Segment> = segmentation.segments.into_iter().filter(Segment::is_valid).collect();

    let (outcome, fragments) = if usable.is_empty() {
        (Outcome::Unusable, Vec::new())
    } else if usable.len() == 1 {
        let seg = usable[0];
        let names = primer_pair_for(&seg, &cleaned);
        let emitted = emit_segment(read, &seg, keep_primers, false);
        if seg.len >= min_len {
            (Outcome::PrimersFound, vec![(emitted, FragmentClass::Classified, seg, names)])
        } else {
            (Outcome::LengthFailed, vec![(emitted, FragmentClass::LengthFailed, seg, names)])
        }
    } else {
        let mut fragments = Vec::with_capacity(usable.len());
        let mut any_passed = false;
        for seg in &usable {
            let names = primer_pair_for(seg, &cleaned);
            let emitted = emit_segment(read, seg, keep_primers, true);
            if seg.len >= min_len {
                any_passed = true;
                fragments.push((emitted, FragmentClass::Rescued, *seg, names));
            } else {
                fragments.push((emitted, FragmentClass::LengthFailed, *seg, names));
            }
        }
        (if any_passed { Outcome::Rescued } else { Outcome::LengthFailed }, fragments)
    };

    WorkResult {
        read_id: read.id().to_string(),
        read_len: read.len(),
        hits: cleaned,
        outcome,
        fragments,
        pairs,
    }
}

fn process_batch(
    batch: &[Seq],
    backend: &Backend,
    config: &Config,
    cutoff: f32,
    edlib_max_ed: f32,
    min_len: usize,
    keep_primers: bool,
) -> std::io::Result<Vec<WorkResult>> {
    match backend {
        Backend::Phmm(_) => {
            let hits_per_read = backend.search_batch(batch, edlib_max_ed)?;
            Ok(batch
                .maybe_par_iter()
                .zip(hits_per_read)
                .map(|(read, hits)| process_read(read, hits, config, cutoff, min_len, keep_primers))
                .collect())
        }
        Backend::Edlib(_) => Ok(batch
            .maybe_par_iter()
            .map(|read| {
                let hits = backend.search_one(read, edlib_max_ed).unwrap_or_default();
                process_read(read, hits, config, cutoff, min_len, keep_primers)
            })
            .collect()),
    }
}

#[cfg(not(feature = "dev_no_rayon"))]
trait MaybeParIter<'a>: IntoParallelRefIterator<'a> {
    #[inline]
    fn maybe_par_iter(&'a self) -> Self::Iter {
        self.par_iter()
    }
}
#[cfg(not(feature = "dev_no_rayon"))]
impl<'a, T: ?Sized + IntoParallelRefIterator<'a>> MaybeParIter<'a> for T {}

#[cfg(feature = "dev_no_rayon")]
trait MaybeParIter<'a>
where
    &'a Self: IntoIterator,
    Self: 'a, {
    #[inline]
    fn maybe_par_iter(&'a self) -> <&'a Self as IntoIterator>::IntoIter {
        self.into_iter()
    }
}
#[cfg(feature = "dev_no_rayon")]
impl<'a, T: 'a + ?Sized> MaybeParIter<'a> for T where &'a T: IntoIterator {}

/// A main output sink plus every optional side-output sink, opened once
/// up-front so the per-batch loop only ever writes.
struct Outputs {
    main:          io::WriteTransport,
    unclassified:  Option<io::WriteTransport>,
    rescued:       Option<io::WriteTransport>,
    len_fail:      Option<io::WriteTransport>,
    qual_fail:     Option<io::WriteTransport>,
    bed:           Option<io::WriteTransport>,
    per_read_tsv:  Option<io::WriteTransport>,
}

fn open_side_output(path: &Option<PathBuf>) -> std::io::Result<Option<io::WriteTransport>> {
    path.as_ref().map(|p| io::open_output(path_str(p)?)).transpose()
}

impl Outputs {
    fn open(cli: &Cli) -> std::io::Result<Self> {
        let mut per_read_tsv = open_side_output(&cli.per_read_tsv)?;
        if let Some(out) = &mut per_read_tsv {
            tsv::write_per_read_header(out)?;
        }
        Ok(Self {
            main: io::open_output(&cli.output)?,
            unclassified: open_side_output(&cli.unclassified_output)?,
            rescued: open_side_output(&cli.rescued_output)?,
            len_fail: open_side_output(&cli.len_fail_output)?,
            qual_fail: open_side_output(&cli.qual_fail_output)?,
            bed: open_side_output(&cli.bed_output)?,
            per_read_tsv,
        })
    }

    fn flush_all(&mut self) -> std::io::Result<()> {
        self.main.flush()?;
        for sink in [&mut self.unclassified, &mut self.rescued, &mut self.len_fail, &mut self.qual_fail, &mut self.bed, &mut self.per_read_tsv]
            .into_iter()
            .flatten()
        {
            sink.flush()?;
        }
        Ok(())
    }
}

fn status_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::PrimersFound => "primers_found",
        Outcome::Rescued => "rescued",
        Outcome::Unusable => "unusable",
        Outcome::QualityFailed => "quality_failed",
        Outcome::LengthFailed => "length_failed",
    }
}

fn route_result(result: WorkResult, out: &mut Outputs, stats: &mut Stats) -> std::io::Result<()> {
    stats.record_read();
    stats.record_hit_count(result.hits.len());

    for (left, right, in_config) in &result.pairs {
        stats.record_candidate_pair(left, right, *in_config);
    }

    if let Some(bed_out) = &mut out.bed {
        bed::write_hits(bed_out, &result.read_id, &result.hits)?;
    }

    if result.fragments.is_empty() {
        stats.record_outcome(result.outcome);
        if let Some(unclassified) = &mut out.unclassified {
            writeln!(unclassified, "Read {} ({} bp) had no usable segment", result.read_id, result.read_len)?;
        }
        if let Some(tsv_out) = &mut out.per_read_tsv {
            tsv::write_per_read_row(tsv_out, &result.read_id, result.read_len, status_label(result.outcome), None)?;
        }
        return Ok(());
    }

    stats.record_segment_count(result.fragments.len());

    for (fragment, class, segment, names) in &result.fragments {
        // One outcome per emitted fragment, not per read: a concatemer with
        // a mix of usable and too-short segments counts each independently.
        stats.record_outcome(match class {
            FragmentClass::Classified => Outcome::PrimersFound,
            FragmentClass::Rescued => Outcome::Rescued,
            FragmentClass::LengthFailed => Outcome::LengthFailed,
        });

        let sink = match class {
            FragmentClass::Classified => &mut out.main,
            FragmentClass::Rescued => out.rescued.as_mut().unwrap_or(&mut out.main),
            FragmentClass::LengthFailed => out.len_fail.as_mut().unwrap_or(&mut out.main),
        };
        write!(sink, "{fragment}")?;

        if matches!(class, FragmentClass::Classified | FragmentClass::Rescued) {
            if let Some((left, right)) = names {
                stats.record_segment(segment, left, right);
            }
        }

        if let Some(tsv_out) = &mut out.per_read_tsv {
            let status = match class {
                FragmentClass::Classified => "primers_found",
                FragmentClass::Rescued => "rescued",
                FragmentClass::LengthFailed => "length_failed",
            };
            tsv::write_per_read_row(tsv_out, &result.read_id, result.read_len, status, Some(segment))?;
        }
    }

    Ok(())
}

/// Runs the full identify/orient/trim pipeline described by `cli`: resolves
/// the primer source, builds the configured backend, autotunes a cutoff
/// when `-q` is absent, then streams the input in batches through an
/// order-preserving parallel map, writing every configured output.
///
/// ## Errors
///
/// Returns an error for any fatal condition in §7: a missing/malformed
/// primer or config source, an external tool failure, or an unreadable
/// input/output path. Record-level parse errors are not fatal and are
/// instead counted in [`Stats`].
pub fn run(cli: Cli) -> std::io::Result<()> {
    cli.validate();

    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build()
        .map_err(std::io::Error::other)?;

    thread_pool.install(|| run_inner(&cli))
}

fn run_inner(cli: &Cli) -> std::io::Result<()> {
    let source = resolve_primer_source(cli)?;
    let primers = PrimerStore::load(&source.primers_path)?;
    let config = Config::parse(&source.config_string)?;
    let seed = cli.seed.or_else(utils::get_seed);

    let backend = build_backend(cli, primers, &source.hmm_path);

    let cutoff = match cli.cutoff {
        Some(q) => q,
        None => autotune_cutoff(cli, &backend, &config, seed)?,
    };
    let edlib_max_ed = 1.2 * cutoff;

    let mut outputs = Outputs::open(cli)?;
    let mut stats = Stats::new();

    let (reader, reader_thread) = io::open_input(path_str(&cli.input)?)?;
    let mut batch: Vec<Seq> = Vec::with_capacity(cli.batch_size);

    for record in reader {
        let record = record?;
        let passes_quality = record.mean_quality().is_none_or(|q| q >= cli.min_qual);
        if !passes_quality {
            stats.record_read();
            stats.record_outcome(Outcome::QualityFailed);
            if let Some(qual_fail) = &mut outputs.qual_fail {
                write!(qual_fail, "{record}")?;
            }
            continue;
        }

        batch.push(record);
        if batch.len() == cli.batch_size {
            let results = process_batch(&batch, &backend, &config, cutoff, edlib_max_ed, cli.min_len, cli.keep_primers)?;
            for result in results {
                route_result(result, &mut outputs, &mut stats)?;
            }
            batch.clear();
        }
    }
    if !batch.is_empty() {
        let results = process_batch(&batch, &backend, &config, cutoff, edlib_max_ed, cli.min_len, cli.keep_primers)?;
        for result in results {
            route_result(result, &mut outputs, &mut stats)?;
        }
    }

    if let Some(handle) = reader_thread {
        handle.join().map_err(|_| std::io::Error::other("gzip decoder thread panicked"))??;
    }

    for (left, right, count, pct) in stats.anomalies(0.01) {
        eprintln!("{MODULE}: potential artefactual primer configuration ({left},{right}): {count} reads ({:.1}%)", pct * 100.0);
    }

    if let Some(path) = &cli.stats_tsv {
        let mut out = io::open_output(path_str(path)?)?;
        tsv::write_stats(&mut out, &stats)?;
        out.flush()?;
    }
    if let Some(path) = &cli.pdf_report {
        crate::reporting::pdf::write_report(path, &stats)?;
    }

    outputs.flush_all()?;

    eprintln!(
        "{MODULE}: {} reads: {} primers-found, {} rescued, {} unusable, {} quality-failed, {} length-failed",
        stats.total_reads(),
        stats.outcome_count(Outcome::PrimersFound),
        stats.outcome_count(Outcome::Rescued),
        stats.outcome_count(Outcome::Unusable),
        stats.outcome_count(Outcome::QualityFailed),
        stats.outcome_count(Outcome::LengthFailed),
    );

    Ok(())
}
