//! Side-output sinks: alignment-hit BED, per-read and statistics TSV, and a
//! PDF summary report (§6).

pub mod bed;
pub mod pdf;
pub mod tsv;
