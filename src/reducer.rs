//! Sanitises a read's raw hits: drop anything past the score cutoff, then
//! collapse overlaps keeping the better-scoring hit.

use crate::model::Hit;

/// Filters `hits` to those with `score <= max_score`, sorts by
/// `(ref_start, ref_end)`, then collapses overlaps, keeping the
/// better-scoring hit of any overlapping pair.
///
/// This is a greedy left-to-right pass, not an optimal interval scheduler: it
/// is a cheap pre-pass ahead of the segmenter's dynamic program.
#[must_use]
pub fn reduce_hits(hits: Vec<Hit>, max_score: f32) -> Vec<Hit> {
    let mut survivors: Vec<Hit> = hits.into_iter().filter(|h| h.score <= max_score).collect();
    survivors.sort_by(|a, b| (a.ref_start, a.ref_end).cmp(&(b.ref_start, b.ref_end)));

    let mut accumulator: Vec<Hit> = Vec::with_capacity(survivors.len());
    for hit in survivors {
        match accumulator.last_mut() {
            Some(last) if last.ref_end > hit.ref_start && hit.score < last.score => {
                *last = hit;
            }
            _ => accumulator.push(hit),
        }
    }

    accumulator
}
