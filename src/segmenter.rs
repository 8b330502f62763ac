//! Builds candidate segments from adjacent hit pairs and selects a
//! maximum-coverage, non-adjacent subset via a two-row dynamic program.

use crate::config::Config;
use crate::model::{Hit, Segment};

/// The outcome of segmenting one read's cleaned hits.
pub struct Segmentation {
    /// Chosen segments, in traceback-insertion (reverse) order. Callers must
    /// not rely on this being position-sorted.
    pub segments: Vec<Segment>,
    /// The best total length achieved by the DP (`max(M[0,m-1], M[1,m-1])`),
    /// exposed so callers can assert the optimality invariant.
    pub best_total_len: usize,
}

/// Builds the `max(0, n-1)` candidate segments between adjacent hits,
/// consulting `config` for the strand of each adjacent primer pair. Pairs
/// absent from `config` still produce a placeholder segment (`strand = None`,
/// `len == 0`) so segment indices stay aligned with hit-pair indices.
fn build_candidate_segments(hits: &[Hit], config: &Config) -> Vec<Segment> {
    hits.windows(2)
        .map(|pair| {
            let [left, right] = pair else { unreachable!() };
            let strand = config.get(&left.query_name, &right.query_name);
            let (start, end) = (left.ref_end, right.ref_start);
            // Per §4.6, an unconfigured pair still produces a placeholder
            // segment so indices stay aligned with hit pairs, but its
            // contribution to the DP must be forced to zero.
            let len = if strand.is_some() { end.saturating_sub(start) } else { 0 };
            Segment {
                left: left.ref_start,
                start,
                end,
                right: right.ref_end,
                strand,
                len,
            }
        })
        .collect()
}

/// Runs the segmenter over one read's cleaned, position-sorted hits.
#[must_use]
pub fn segment(hits: &[Hit], config: &Config) -> Segmentation {
    let segments = build_candidate_segments(hits, config);

    if segments.is_empty() {
        return Segmentation {
            segments: Vec::new(),
            best_total_len: 0,
        };
    }

    let lens: Vec<usize> = segments.iter().map(|s| s.len).collect();
    let m = segments.len();

    // included[j] / excluded[j]: best total length through segment j ending
    // with it included / excluded, per the §4.6 recurrence.
    let mut excluded = vec![0usize; m];
    let mut included = vec![0usize; m];

    excluded[0] = 0;
    included[0] = lens[0];

    for j in 1..m {
        excluded[j] = excluded[j - 1].max(included[j - 1]);
        included[j] = excluded[j - 1] + lens[j];
    }

    let best_total_len = excluded[m - 1].max(included[m - 1]);

    // Traceback: start from whichever final state achieved the optimum,
    // walking backward and recording every index taken in the "included"
    // state. `state` tracks whether index j is taken as included (true) or
    // excluded (false) at each step.
    let mut chosen_indices = Vec::new();
    let mut state_is_included = included[m - 1] >= excluded[m - 1];
    let mut j = m - 1;

    loop {
        if state_is_included {
            chosen_indices.push(j);
            if j == 0 {
                break;
            }
            // Included at j transitions only from excluded at j-1.
            j -= 1;
            state_is_included = false;
        } else {
            if j == 0 {
                break;
            }
            // Excluded at j came from the better of included/excluded at j-1.
            state_is_included = included[j - 1] >= excluded[j - 1];
            j -= 1;
        }
    }

    let segments_chosen = chosen_indices
        .into_iter()
        .map(|idx| segments[idx])
        .filter(|s| s.len > 0)
        .collect();

    Segmentation {
        segments: segments_chosen,
        best_total_len,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::Strand;

    fn hit(name: &str, start: usize, end: usize) -> Hit {
        Hit {
            query_name: name.to_string(),
            ref_start: start,
            ref_end: end,
            query_start: 0,
            query_end: 0,
            score: 0.01,
        }
    }

    #[test]
    fn test_single_forward_full_length_read() {
        let config = Config::parse("+:SSP,-VNP|-:VNP,-SSP").unwrap();
        let hits = vec![hit("SSP", 10, 30), hit("-VNP", 970, 990)];
        let result = segment(&hits, &config);
        assert_eq!(result.segments.len(), 1);
        let s = result.segments[0];
        assert_eq!((s.start, s.end), (30, 970));
        assert_eq!(s.strand, Some(Strand::Plus));
        assert_eq!(s.len, 940);
    }

    #[test]
    fn test_reverse_full_length_read() {
        let config = Config::parse("+:SSP,-VNP|-:VNP,-SSP").unwrap();
        let hits = vec![hit("VNP", 5, 25), hit("-SSP", 960, 980)];
        let result = segment(&hits, &config);
        assert_eq!(result.segments.len(), 1);
        let s = result.segments[0];
        assert_eq!(s.strand, Some(Strand::Minus));
        assert_eq!(s.len, 935);
    }

    #[test]
    fn test_concatemer_rescue() {
        let config = Config::parse("+:SSP,-VNP|-:VNP,-SSP").unwrap();
        let hits = vec![
            hit("SSP", 0, 20),
            hit("-VNP", 500, 520),
            hit("SSP", 540, 560),
            hit("-VNP", 1020, 1040),
        ];
        let result = segment(&hits, &config);
        assert_eq!(result.segments.len(), 2);
        let mut starts_ends: Vec<_> = result.segments.iter().map(|s| (s.start, s.end)).collect();
        starts_ends.sort_unstable();
        assert_eq!(starts_ends, vec![(20, 500), (560, 1020)]);
    }

    #[test]
    fn test_unclassified_orphan_hit() {
        let config = Config::parse("+:SSP,-VNP").unwrap();
        let hits = vec![hit("SSP", 0, 20)];
        let result = segment(&hits, &config);
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_no_hits() {
        let config = Config::parse("+:SSP,-VNP").unwrap();
        let result = segment(&[], &config);
        assert!(result.segments.is_empty());
        assert_eq!(result.best_total_len, 0);
    }

    #[test]
    fn test_unconfigured_pair_yields_zero_length_placeholder() {
        let config = Config::parse("+:SSP,-VNP").unwrap();
        let hits = vec![hit("SSP", 0, 20), hit("OTHER", 100, 120)];
        let result = segment(&hits, &config);
        assert!(result.segments.is_empty());
        assert_eq!(result.best_total_len, 0);
    }

    #[test]
    fn test_no_adjacent_inclusions() {
        // Three configured adjacent pairs in a row; choosing segment 0 and 2
        // (non-adjacent, j>=i+2) must be allowed, and the DP should find the
        // larger sum rather than being forced into only one segment.
        let config = Config::parse("+:A,B|+:B,C|+:C,D").unwrap();
        let hits = vec![hit("A", 0, 10), hit("B", 100, 110), hit("C", 200, 210), hit("D", 300, 310)];
        let result = segment(&hits, &config);
        // Segment 0 spans (10,100), segment 1 spans (110,200), segment 2 spans (210,300),
        // all length 90; optimal DP should pick segments 0 and 2 (sum 180) over adjacent 0,1.
        assert_eq!(result.best_total_len, 180);
        assert_eq!(result.segments.len(), 2);
    }

    #[test]
    fn test_segmenter_optimality_matches_dp_value() {
        let config = Config::parse("+:SSP,-VNP|-:VNP,-SSP").unwrap();
        let hits = vec![
            hit("SSP", 0, 20),
            hit("-VNP", 500, 520),
            hit("SSP", 540, 560),
            hit("-VNP", 1020, 1040),
        ];
        let result = segment(&hits, &config);
        let sum: usize = result.segments.iter().map(|s| s.len).sum();
        assert_eq!(sum, result.best_total_len);
    }
}
