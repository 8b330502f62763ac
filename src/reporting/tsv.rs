//! Per-read and statistics TSV sinks.

use std::io::Write;

use crate::model::{Segment, Strand};
use crate::stats::Stats;

/// Writes the `Read\tLength\tStatus\tStart\tEnd\tStrand` header.
///
/// ## Errors
///
/// Propagates any write error from `out`.
pub fn write_per_read_header<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Read\tLength\tStatus\tStart\tEnd\tStrand")
}

/// Writes one per-read row. `segment` is `None` for reads with no usable
/// segment, in which case `Start`/`End`/`Strand` are written as `-`.
///
/// ## Errors
///
/// Propagates any write error from `out`.
pub fn write_per_read_row<W: Write>(out: &mut W, read_name: &str, read_len: usize, status: &str, segment: Option<&Segment>) -> std::io::Result<()> {
    match segment {
        Some(s) => {
            let strand = s.strand.map_or('-', Strand::as_char);
            writeln!(out, "{read_name}\t{read_len}\t{status}\t{}\t{}\t{strand}", s.start, s.end)
        }
        None => writeln!(out, "{read_name}\t{read_len}\t{status}\t-\t-\t-"),
    }
}

/// Writes the `Category\tName\tValue` statistics table header and rows.
///
/// ## Errors
///
/// Propagates any write error from `out`.
pub fn write_stats<W: Write>(out: &mut W, stats: &Stats) -> std::io::Result<()> {
    writeln!(out, "Category\tName\tValue")?;
    for (category, name, value) in stats.rows() {
        writeln!(out, "{category}\t{name}\t{value}")?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_per_read_row_with_segment() {
        let segment = Segment {
            left:   0,
            start:  10,
            end:    90,
            right:  100,
            strand: Some(Strand::Plus),
            len:    80,
        };
        let mut buf = Vec::new();
        write_per_read_row(&mut buf, "r1", 100, "primers_found", Some(&segment)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "r1\t100\tprimers_found\t10\t90\t+\n");
    }

    #[test]
    fn test_per_read_row_without_segment() {
        let mut buf = Vec::new();
        write_per_read_row(&mut buf, "r2", 50, "unusable", None).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "r2\t50\tunusable\t-\t-\t-\n");
    }

    #[test]
    fn test_write_stats_includes_header_and_rows() {
        use crate::stats::Outcome;
        let mut stats = Stats::new();
        stats.record_outcome(Outcome::PrimersFound);
        let mut buf = Vec::new();
        write_stats(&mut buf, &stats).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Category\tName\tValue\n"));
        assert!(text.contains("outcome\tprimers_found\t1"));
    }
}
