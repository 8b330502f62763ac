//! Picks a score cutoff by maximising total classified bases over a sampled
//! subset of the input (§4.8).

use crate::backend::Backend;
use crate::config::Config;
use crate::model::Seq;
use crate::reducer::reduce_hits;
use crate::segmenter::segment;

/// Number of candidate cutoffs tried, `L`.
pub const CANDIDATE_COUNT: usize = 10;

/// The result of one autotune run: the chosen cutoff and whether the search
/// range was saturated (the best candidate was the last one tried, meaning
/// the true optimum may lie beyond the tried range).
#[derive(Debug, Clone, Copy)]
pub struct AutotuneResult {
    pub best_cutoff: f32,
    pub best_index:  usize,
    pub saturated:   bool,
}

/// Builds `n` evenly spaced values over `[lo, hi]` inclusive (`n >= 2`).
fn linspace(lo: f32, hi: f32, n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![lo];
    }
    let step = (hi - lo) / (n - 1) as f32;
    (0..n).map(|i| lo + step * i as f32).collect()
}

/// Runs the full backend → reducer → segmenter pipeline over `sample` at
/// cutoff `q`, returning the total length of bases in reads that yielded
/// exactly one usable segment.
fn classified_bases_at(sample: &[Seq], backend: &Backend, config: &Config, q: f32, edlib_max_ed: f32) -> u64 {
    let hits_per_read = backend
        .search_batch(sample, edlib_max_ed)
        .unwrap_or_else(|_| vec![Vec::new(); sample.len()]);

    hits_per_read
        .into_iter()
        .map(|hits| {
            let cleaned = reduce_hits(hits, q);
            let segmentation = segment(&cleaned, config);
            let usable: Vec<_> = segmentation.segments.iter().filter(|s| s.len > 0).collect();
            if usable.len() == 1 { usable[0].len as u64 } else { 0 }
        })
        .sum()
}

/// Runs the autotune loop over `sample`, trying `candidate_count` cutoffs
/// appropriate to `backend` (`linspace(1e-5, 5.0, L)` for the HMM backend,
/// `linspace(0, 1, L)` for the edit-distance backend), and picks the one
/// maximising total classified bases.
///
/// Emits a warning to stderr if the chosen cutoff is the last candidate
/// tried, since that means the search range may be too narrow.
#[must_use]
pub fn autotune(sample: &[Seq], backend: &Backend, config: &Config, candidate_count: usize) -> AutotuneResult {
    let candidates = match backend {
        Backend::Phmm(_) => linspace(1e-5, 5.0, candidate_count),
        Backend::Edlib(_) => linspace(0.0, 1.0, candidate_count),
    };

    let scores: Vec<u64> = candidates
        .iter()
        .map(|&q| classified_bases_at(sample, backend, config, q, 1.2 * q))
        .collect();

    let best_index = scores
        .iter()
        .enumerate()
        .max_by_key(|&(_, &len)| len)
        .map_or(0, |(idx, _)| idx);

    let saturated = best_index == candidates.len() - 1;
    if saturated {
        eprintln!(
            "{}: autotune chose the last candidate cutoff ({:.5}); the search range may be saturated and this cutoff unsafe.",
            module_path!(),
            candidates[best_index]
        );
    }

    AutotuneResult {
        best_cutoff: candidates[best_index],
        best_index,
        saturated,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_linspace_endpoints_and_count() {
        let v = linspace(1e-5, 5.0, 10);
        assert_eq!(v.len(), 10);
        assert!((v[0] - 1e-5).abs() < 1e-9);
        assert!((v[9] - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_linspace_single_value() {
        assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
    }

    #[test]
    fn test_classified_bases_counts_only_single_segment_reads() {
        use crate::backend::edlib::EdlibBackend;
        use crate::primers::PrimerStore;

        let config = Config::parse("+:SSP,-VNP").unwrap();
        let backend = Backend::Edlib(EdlibBackend::new(PrimerStore::default()));
        // No primers loaded, so no hits are ever found: every read yields zero
        // segments, never exactly one, so classified bases must be zero.
        let read = Seq::new("r".to_string(), b"ACGTACGTACGT".to_vec(), None);
        let bases = classified_bases_at(&[read], &backend, &config, 0.1, 0.12);
        assert_eq!(bases, 0);
    }

    #[test]
    fn test_autotune_picks_a_non_saturated_optimum() {
        // A unimodal synthetic classified-bases curve peaking at index 4,
        // mirroring the documented end-to-end scenario, checked directly
        // against the selection logic rather than the full pipeline.
        let scores = [10u64, 20, 35, 50, 60, 55, 40, 30, 20, 10];
        let best_index = scores.iter().enumerate().max_by_key(|&(_, &v)| v).map_or(0, |(i, _)| i);
        assert_eq!(best_index, 4);
        assert_ne!(best_index, scores.len() - 1);
    }
}
