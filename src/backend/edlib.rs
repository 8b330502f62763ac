//! Backend B: an edit-distance prefilter that locates coarse candidate
//! windows cheaply, followed by local-alignment refinement for exact
//! boundaries (§4.4).

use crate::backend::refine::refine;
use crate::model::Hit;
use crate::primers::PrimerStore;

/// Extra bases added on each side of a prefilter's candidate window before
/// handing it to the refinement aligner, to absorb the prefilter's own
/// positional slop.
const REFINE_FLANK: usize = 8;

pub struct EdlibBackend {
    primers: PrimerStore,
}

impl EdlibBackend {
    #[must_use]
    pub fn new(primers: PrimerStore) -> Self {
        Self { primers }
    }

    /// Searches `read` for every primer (and its reverse-complement alias) in
    /// the store, tolerating up to `max_ed_frac * primer.len()` edits per
    /// candidate window.
    #[must_use]
    pub fn search_one(&self, read: &crate::model::Seq, max_ed_frac: f32) -> Vec<Hit> {
        let mut hits = Vec::new();
        for (name, primer) in self.primers.iter() {
            if primer.is_empty() {
                continue;
            }
            let max_edits = (max_ed_frac * primer.len() as f32).floor() as usize;
            for (window_start, window_end) in candidate_windows(primer, &read.seq, max_edits) {
                if let Some(hit) = refine(name, primer, &read.seq, window_start, window_end) {
                    hits.push(hit);
                }
            }
        }
        hits
    }
}

/// Finds approximate end positions of `pattern` within `text` allowing up to
/// `max_edits` edits, via Sellers' banded dynamic program, then widens each
/// end into a window wide enough for [`refine`] to find the true boundaries.
///
/// This only locates plausible windows; it deliberately does not attempt to
/// recover exact start positions from the DP (that needs either a
/// traceback or a reverse pass), since the refinement alignment recovers
/// exact boundaries from the widened window regardless.
fn candidate_windows(pattern: &[u8], text: &[u8], max_edits: usize) -> Vec<(usize, usize)> {
    let m = pattern.len();
    let n = text.len();
    if m == 0 || n == 0 {
        return Vec::new();
    }

    let mut prev = vec![0usize; n + 1];
    let mut cur = vec![0usize; n + 1];

    for (i, &p) in pattern.iter().enumerate() {
        cur[0] = i + 1;
        for j in 1..=n {
            let cost = usize::from(!p.eq_ignore_ascii_case(&text[j - 1]));
            cur[j] = (prev[j - 1] + cost).min(prev[j] + 1).min(cur[j - 1] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    let distances = prev;

    let mut windows = Vec::new();
    let mut run_best: Option<(usize, usize)> = None; // (end, distance)

    let mut flush = |run: &mut Option<(usize, usize)>, windows: &mut Vec<(usize, usize)>| {
        if let Some((end, _)) = run.take() {
            let lo = end.saturating_sub(m + max_edits + REFINE_FLANK);
            let hi = (end + REFINE_FLANK).min(n);
            windows.push((lo, hi));
        }
    };

    for (j, &dist) in distances.iter().enumerate().skip(1) {
        if dist <= max_edits {
            run_best = Some(match run_best {
                Some((end, best)) if best <= dist => (end, best),
                _ => (j, dist),
            });
        } else {
            flush(&mut run_best, &mut windows);
        }
    }
    flush(&mut run_best, &mut windows);

    windows
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_exact_match_found() {
        let pattern = b"ACGTACGT";
        let text = b"TTTTTTTTACGTACGTTTTTTTTT";
        let windows = candidate_windows(pattern, text, 1);
        assert!(!windows.is_empty());
        let (lo, hi) = windows[0];
        assert!(text[lo..hi].windows(pattern.len()).any(|w| w == pattern));
    }

    #[test]
    fn test_no_match_beyond_edit_budget() {
        let pattern = b"ACGTACGTACGTACGT";
        let text = b"TTTTTTTTTTTTTTTTTTTTTTTTTTTTTTTTTT";
        let windows = candidate_windows(pattern, text, 1);
        assert!(windows.is_empty());
    }

    #[test]
    fn test_single_substitution_tolerated() {
        let pattern = b"ACGTACGT";
        let text = b"TTTTTTTTACGAACGTTTTTTTTT";
        let windows = candidate_windows(pattern, text, 1);
        assert!(!windows.is_empty());
    }

    #[test]
    fn test_backend_end_to_end_hit() {
        use crate::model::Seq;
        let mut primers = PrimerStore::default();
        // PrimerStore::load requires a file; build hits manually against the
        // prefilter + refine pipeline instead of going through the store.
        let _ = &mut primers;
        let pattern = b"ACGTACGTACGT";
        let text: Vec<u8> = [b"GGGGGGGGGG".as_slice(), pattern, b"GGGGGGGGGG".as_slice()].concat();
        let read = Seq::new("r".to_string(), text.clone(), None);
        let windows = candidate_windows(pattern, &read.seq, 1);
        let hit = refine("P", pattern, &read.seq, windows[0].0, windows[0].1).unwrap();
        assert_eq!(&read.seq[hit.ref_start..hit.ref_end], pattern.as_slice());
    }
}
