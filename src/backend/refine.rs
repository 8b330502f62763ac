//! Local-alignment refinement of an edit-distance prefilter's candidate
//! window, producing the accurate hit boundaries the prefilter only
//! approximates.

use crate::model::Hit;
use bio::alignment::pairwise::Aligner;

const MATCH_SCORE: i32 = 1;
const MISMATCH_SCORE: i32 = -2;
// `Aligner::new` takes gap penalties as negative scores; magnitude 1 each,
// matching the configured gap_open/gap_extend of 1.
const GAP_OPEN: i32 = -1;
const GAP_EXTEND: i32 = -1;

fn score_fn(a: u8, b: u8) -> i32 {
    if a.to_ascii_uppercase() == b.to_ascii_uppercase() {
        MATCH_SCORE
    } else {
        MISMATCH_SCORE
    }
}

/// Aligns `primer` against `text[window_start..window_end]` with a striped
/// local alignment, translating the alignment's own start/end positions back
/// into absolute coordinates on `text`.
///
/// Returns `None` if the window is empty; an empty alignment (no bases
/// consumed on either side) is still returned as a degenerate, maximally
/// penalized [`Hit`], since the caller already committed to a candidate here
/// and filters on `score` afterward.
#[must_use]
pub fn refine(primer_name: &str, primer: &[u8], text: &[u8], window_start: usize, window_end: usize) -> Option<Hit> {
    let window = text.get(window_start..window_end)?;
    if window.is_empty() || primer.is_empty() {
        return None;
    }

    let mut aligner = Aligner::new(GAP_OPEN, GAP_EXTEND, score_fn);
    let alignment = aligner.local(primer, window);

    let max_possible = MATCH_SCORE as f32 * primer.len() as f32;
    let score = (max_possible - alignment.score as f32) / max_possible;

    Some(Hit {
        query_name: primer_name.to_string(),
        ref_start: window_start + alignment.ystart,
        ref_end: window_start + alignment.yend,
        query_start: alignment.xstart,
        query_end: alignment.xend,
        score,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_exact_match_scores_zero() {
        let primer = b"ACGTACGT";
        let text = b"TTTTTTTTACGTACGTTTTTTTTT";
        let hit = refine("P", primer, text, 0, text.len()).unwrap();
        assert_eq!(hit.score, 0.0);
        assert_eq!(&text[hit.ref_start..hit.ref_end], primer);
    }

    #[test]
    fn test_single_mismatch_scores_above_zero() {
        let primer = b"ACGTACGT";
        let text = b"TTTTTTTTACGAACGTTTTTTTTT";
        let hit = refine("P", primer, text, 0, text.len()).unwrap();
        assert!(hit.score > 0.0);
        assert!(hit.score < 0.5);
    }

    #[test]
    fn test_empty_window_returns_none() {
        let primer = b"ACGT";
        let text = b"ACGTACGT";
        assert!(refine("P", primer, text, 4, 4).is_none());
    }
}
