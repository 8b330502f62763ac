//! Materialises chosen segments of a parent read as new, oriented `Seq`
//! records.

use crate::model::{Segment, Seq, Strand};
use zoe::data::types::nucleotides::reverse_complement;

/// Builds the output record for one chosen `segment` of `read`.
///
/// `rescue` should be `true` when more than one segment was chosen from the
/// same parent read (a concatemer), which appends `" rescue=1"` to the name.
#[must_use]
pub fn emit_segment(read: &Seq, segment: &Segment, keep_primers: bool, rescue: bool) -> Seq {
    let (lo, hi) = if keep_primers {
        (segment.left, segment.right)
    } else {
        (segment.start, segment.end)
    };

    let mut seq = read.seq[lo..hi].to_vec();
    let mut qual = read.qual.as_ref().map(|q| q[lo..hi].to_vec());

    let strand = segment.strand.unwrap_or(Strand::Plus);
    if strand == Strand::Minus {
        seq = reverse_complement(&seq);
        if let Some(q) = &mut qual {
            q.reverse();
        }
    }

    let id = format!("{lo}:{hi}|{}", read.id());
    let mut name = format!("{id} {} strand={strand}", read.name);
    if rescue {
        name.push_str(" rescue=1");
    }

    Seq::new(name, seq, qual)
}

#[cfg(test)]
mod test {
    use super::*;

    fn read_with_len(len: usize) -> Seq {
        let seq: Vec<u8> = (0..len).map(|i| b"ACGT"[i % 4]).collect();
        let qual: Vec<u8> = vec![b'I'; len];
        Seq::new("R description".to_string(), seq, Some(qual))
    }

    #[test]
    fn test_keep_primers_forward_round_trip() {
        let read = read_with_len(1000);
        let segment = Segment {
            left:   100,
            start:  120,
            end:    900,
            right:  920,
            strand: Some(Strand::Plus),
            len:    780,
        };
        let out = emit_segment(&read, &segment, true, false);
        assert_eq!(out.seq, read.seq[100..920]);
        assert!(out.name.contains("strand=+"));
        assert!(!out.name.contains("rescue=1"));
    }

    #[test]
    fn test_keep_primers_reverse_round_trip() {
        let read = read_with_len(1000);
        let segment = Segment {
            left:   100,
            start:  120,
            end:    900,
            right:  920,
            strand: Some(Strand::Minus),
            len:    780,
        };
        let out = emit_segment(&read, &segment, true, false);
        let expected = reverse_complement(&read.seq[100..920]);
        assert_eq!(out.seq, expected);
        assert!(out.name.contains("strand=-"));
    }

    #[test]
    fn test_drop_primers_uses_start_end() {
        let read = read_with_len(1000);
        let segment = Segment {
            left:   100,
            start:  120,
            end:    900,
            right:  920,
            strand: Some(Strand::Plus),
            len:    780,
        };
        let out = emit_segment(&read, &segment, false, false);
        assert_eq!(out.seq, read.seq[120..900]);
    }

    #[test]
    fn test_rescue_flag_appended() {
        let read = read_with_len(100);
        let segment = Segment {
            left:   0,
            start:  5,
            end:    50,
            right:  55,
            strand: Some(Strand::Plus),
            len:    45,
        };
        let out = emit_segment(&read, &segment, false, true);
        assert!(out.name.ends_with("rescue=1"));
    }

    #[test]
    fn test_id_prefix_and_quality_slice() {
        let read = read_with_len(50);
        let segment = Segment {
            left:   0,
            start:  10,
            end:    20,
            right:  30,
            strand: Some(Strand::Plus),
            len:    10,
        };
        let out = emit_segment(&read, &segment, false, false);
        assert!(out.name.starts_with("10:20|R"));
        assert_eq!(out.qual.unwrap().len(), 10);
    }
}
