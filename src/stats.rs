//! Run-wide statistics: monotonic counters by classification outcome,
//! strand, hit/segment-count histograms, usable-length distribution, and
//! primer-combination counts.

use std::collections::BTreeMap;

use crate::model::{Segment, Strand};

/// How a single read was classified after segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exactly one usable segment.
    PrimersFound,
    /// More than one usable segment (a concatemer split into parts).
    Rescued,
    /// No usable segment.
    Unusable,
    /// Dropped before segmentation by a quality or length filter.
    QualityFailed,
    LengthFailed,
}

/// Accumulates run-wide counters. All fields only ever increase; merging two
/// accumulators (e.g. across batches) sums or maxes them pairwise, mirroring
/// how per-batch quality metadata is combined elsewhere in this codebase.
#[derive(Debug, Default, Clone)]
pub struct Stats {
    outcome_counts:      BTreeMap<&'static str, u64>,
    strand_counts:       BTreeMap<Strand, u64>,
    hit_count_histogram: BTreeMap<usize, u64>,
    segment_count_histogram: BTreeMap<usize, u64>,
    usable_len_total:    u64,
    usable_len_count:    u64,
    primer_combo_counts: BTreeMap<(String, String), u64>,
    unconfigured_combo_counts: BTreeMap<(String, String), u64>,
    total_reads:         u64,
}

impl Stats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&mut self, outcome: Outcome) {
        *self.outcome_counts.entry(outcome.label()).or_insert(0) += 1;
    }

    /// Records one read entering the classification pipeline, independent of
    /// its eventual outcome. The denominator for [`Stats::anomalies`].
    pub fn record_read(&mut self) {
        self.total_reads += 1;
    }

    #[must_use]
    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    /// Records one adjacent hit-pair observed while segmenting a read.
    /// Pairs already present in the active `Config` (`in_config`) are not
    /// anomalies and are not tracked here.
    pub fn record_candidate_pair(&mut self, left: &str, right: &str, in_config: bool) {
        if !in_config {
            *self
                .unconfigured_combo_counts
                .entry((left.to_string(), right.to_string()))
                .or_insert(0) += 1;
        }
    }

    /// Two-primer hit combinations absent from `Config` that account for at
    /// least `threshold` (a fraction, e.g. `0.01` for 1%) of all reads,
    /// sorted by descending count. Empty if [`Stats::total_reads`] is zero.
    #[must_use]
    pub fn anomalies(&self, threshold: f64) -> Vec<(String, String, u64, f64)> {
        if self.total_reads == 0 {
            return Vec::new();
        }
        let mut rows: Vec<_> = self
            .unconfigured_combo_counts
            .iter()
            .map(|((a, b), &count)| {
                let pct = count as f64 / self.total_reads as f64;
                (a.clone(), b.clone(), count, pct)
            })
            .filter(|&(_, _, _, pct)| pct >= threshold)
            .collect();
        rows.sort_by(|a, b| b.2.cmp(&a.2));
        rows
    }

    pub fn record_hit_count(&mut self, n: usize) {
        *self.hit_count_histogram.entry(n).or_insert(0) += 1;
    }

    pub fn record_segment_count(&mut self, n: usize) {
        *self.segment_count_histogram.entry(n).or_insert(0) += 1;
    }

    /// Records one chosen, valid segment: its strand, usable length, and the
    /// primer pair that bounded it (if its source hit pair is tracked by
    /// name; callers pass the two primer query names directly since
    /// [`Segment`] itself does not retain them).
    pub fn record_segment(&mut self, segment: &Segment, left_primer: &str, right_primer: &str) {
        if let Some(strand) = segment.strand {
            *self.strand_counts.entry(strand).or_insert(0) += 1;
        }
        self.usable_len_total += segment.len as u64;
        self.usable_len_count += 1;
        *self
            .primer_combo_counts
            .entry((left_primer.to_string(), right_primer.to_string()))
            .or_insert(0) += 1;
    }

    #[must_use]
    pub fn outcome_count(&self, outcome: Outcome) -> u64 {
        self.outcome_counts.get(outcome.label()).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn strand_count(&self, strand: Strand) -> u64 {
        self.strand_counts.get(&strand).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn mean_usable_len(&self) -> Option<f64> {
        (self.usable_len_count > 0).then(|| self.usable_len_total as f64 / self.usable_len_count as f64)
    }

    /// Iterates every `(category, name, value)` triple for the statistics
    /// TSV sink, in a stable order.
    pub fn rows(&self) -> impl Iterator<Item = (String, String, u64)> + '_ {
        let outcomes = self.outcome_counts.iter().map(|(name, &count)| ("outcome".to_string(), (*name).to_string(), count));
        let strands = self
            .strand_counts
            .iter()
            .map(|(strand, &count)| ("strand".to_string(), strand.to_string(), count));
        let hits = self
            .hit_count_histogram
            .iter()
            .map(|(n, &count)| ("hit_count".to_string(), n.to_string(), count));
        let segments = self
            .segment_count_histogram
            .iter()
            .map(|(n, &count)| ("segment_count".to_string(), n.to_string(), count));
        let combos = self
            .primer_combo_counts
            .iter()
            .map(|((a, b), &count)| ("primer_combo".to_string(), format!("{a},{b}"), count));
        let anomalies = self
            .unconfigured_combo_counts
            .iter()
            .map(|((a, b), &count)| ("primer_combo_anomaly".to_string(), format!("{a},{b}"), count));

        outcomes.chain(strands).chain(hits).chain(segments).chain(combos).chain(anomalies)
    }

    /// Merges `other`'s counters into `self`, preserving monotonicity.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        for (k, v) in other.outcome_counts {
            *self.outcome_counts.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.strand_counts {
            *self.strand_counts.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.hit_count_histogram {
            *self.hit_count_histogram.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.segment_count_histogram {
            *self.segment_count_histogram.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.primer_combo_counts {
            *self.primer_combo_counts.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.unconfigured_combo_counts {
            *self.unconfigured_combo_counts.entry(k).or_insert(0) += v;
        }
        self.usable_len_total += other.usable_len_total;
        self.usable_len_count += other.usable_len_count;
        self.total_reads += other.total_reads;
        self
    }
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::PrimersFound => "primers_found",
            Outcome::Rescued => "rescued",
            Outcome::Unusable => "unusable",
            Outcome::QualityFailed => "quality_failed",
            Outcome::LengthFailed => "length_failed",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn segment(strand: Strand, len: usize) -> Segment {
        Segment {
            left:   0,
            start:  0,
            end:    len,
            right:  len,
            strand: Some(strand),
            len,
        }
    }

    #[test]
    fn test_outcome_counts_monotonic() {
        let mut s = Stats::new();
        s.record_outcome(Outcome::PrimersFound);
        s.record_outcome(Outcome::PrimersFound);
        s.record_outcome(Outcome::Unusable);
        assert_eq!(s.outcome_count(Outcome::PrimersFound), 2);
        assert_eq!(s.outcome_count(Outcome::Unusable), 1);
        assert_eq!(s.outcome_count(Outcome::Rescued), 0);
    }

    #[test]
    fn test_strand_and_length_tracking() {
        let mut s = Stats::new();
        s.record_segment(&segment(Strand::Plus, 100), "SSP", "-VNP");
        s.record_segment(&segment(Strand::Minus, 300), "VNP", "-SSP");
        assert_eq!(s.strand_count(Strand::Plus), 1);
        assert_eq!(s.strand_count(Strand::Minus), 1);
        assert_eq!(s.mean_usable_len(), Some(200.0));
    }

    #[test]
    fn test_merge_sums_counters() {
        let mut a = Stats::new();
        a.record_outcome(Outcome::PrimersFound);
        a.record_segment(&segment(Strand::Plus, 100), "SSP", "-VNP");

        let mut b = Stats::new();
        b.record_outcome(Outcome::PrimersFound);
        b.record_segment(&segment(Strand::Plus, 200), "SSP", "-VNP");

        let merged = a.merge(b);
        assert_eq!(merged.outcome_count(Outcome::PrimersFound), 2);
        assert_eq!(merged.mean_usable_len(), Some(150.0));
    }

    #[test]
    fn test_hit_and_segment_histograms() {
        let mut s = Stats::new();
        s.record_hit_count(2);
        s.record_hit_count(2);
        s.record_segment_count(1);
        let rows: Vec<_> = s.rows().collect();
        assert!(rows.iter().any(|(cat, name, val)| cat == "hit_count" && name == "2" && *val == 2));
        assert!(rows.iter().any(|(cat, name, val)| cat == "segment_count" && name == "1" && *val == 1));
    }

    #[test]
    fn test_anomalies_above_threshold_only() {
        let mut s = Stats::new();
        for _ in 0..10 {
            s.record_read();
        }
        for _ in 0..2 {
            s.record_candidate_pair("SSP", "SSP", false);
        }
        s.record_candidate_pair("VNP", "VNP", false);
        s.record_candidate_pair("SSP", "-VNP", true);
        let anomalies = s.anomalies(0.1);
        assert_eq!(anomalies.len(), 1);
        assert_eq!((anomalies[0].0.as_str(), anomalies[0].1.as_str(), anomalies[0].2), ("SSP", "SSP", 2));
    }

    #[test]
    fn test_anomalies_empty_with_no_reads() {
        let mut s = Stats::new();
        s.record_candidate_pair("A", "B", false);
        assert!(s.anomalies(0.0).is_empty());
    }

    #[test]
    fn test_primer_combo_counts() {
        let mut s = Stats::new();
        s.record_segment(&segment(Strand::Plus, 50), "SSP", "-VNP");
        s.record_segment(&segment(Strand::Plus, 60), "SSP", "-VNP");
        let rows: Vec<_> = s.rows().collect();
        assert!(rows.iter().any(|(cat, name, val)| cat == "primer_combo" && name == "SSP,-VNP" && *val == 2));
    }
}
