//! Alignment-hit BED sink: `read_name\tRefStart\tRefEnd\tprimer\tq\tstrand`.

use std::io::Write;

use crate::model::Hit;

/// Converts a hit's `Score` (lower is better) into a Phred-like quality,
/// `round(-10 * log10(score))`, clamped to `[0, 100]`.
#[must_use]
pub fn score_to_q(score: f32) -> u8 {
    if score <= 0.0 {
        return 100;
    }
    let q = (-10.0 * score.log10()).round();
    q.clamp(0.0, 100.0) as u8
}

/// Writes one BED row per hit for `read_name` to `out`.
///
/// ## Errors
///
/// Propagates any write error from `out`.
pub fn write_hits<W: Write>(out: &mut W, read_name: &str, hits: &[Hit]) -> std::io::Result<()> {
    for hit in hits {
        let strand = if hit.is_reverse_primer() { '-' } else { '+' };
        let q = score_to_q(hit.score);
        writeln!(out, "{read_name}\t{}\t{}\t{}\t{q}\t{strand}", hit.ref_start, hit.ref_end, hit.query_name)?;
    }
    Ok(())
}
