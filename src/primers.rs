//! Loading primer sequences and building the reverse-complement-augmented
//! lookup table backends match against.

use std::collections::HashMap;
use std::path::Path;

use zoe::prelude::FastaReader;

const MODULE: &str = module_path!();

/// Maps a primer name (and its reverse-complement alias, prefixed `-`) to its
/// sequence. Backed by a plain map since lookup, not insertion order, is all
/// that matters for this table (contrast [`crate::config::Config`]).
#[derive(Debug, Default, Clone)]
pub struct PrimerStore {
    sequences: HashMap<String, Vec<u8>>,
}

impl PrimerStore {
    /// Loads primer sequences from a FASTA file and augments the table with a
    /// `-name` entry holding the reverse complement of each primer.
    ///
    /// ## Errors
    ///
    /// Propagates any IO or FASTA-parsing error from opening `path`.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let reader = FastaReader::from_filename(&path)?;
        let mut sequences = HashMap::new();

        for record in reader {
            let record = record?;
            let name = record.name.split_ascii_whitespace().next().unwrap_or(&record.name).to_string();
            let rc = reverse_complement_primer(&record.sequence);
            sequences.insert(format!("-{name}"), rc);
            sequences.insert(name, record.sequence);
        }

        Ok(Self { sequences })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.sequences.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.sequences.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Complements a single base following the permissive table used for primer
/// names: `A<=>T`, `C<=>G`, case preserved; `N`, `X`, and `-` pass through
/// unchanged. Any other symbol is passed through unchanged with a warning,
/// since it cannot be a real ambiguity code in a primer sequence.
fn complement_base(b: u8) -> u8 {
    match b {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        b'N' | b'n' | b'X' | b'x' | b'-' => b,
        other => {
            eprintln!("{MODULE}: no reverse complement for byte {other:#04x} ('{}'), passing through unchanged.", other as char);
            other
        }
    }
}

/// Reverse-complements a primer sequence using the permissive primer-name
/// alphabet (see [`complement_base`]), as opposed to [`zoe`]'s strict
/// nucleotide reverse complement used for actual read bases.
#[must_use]
pub fn reverse_complement_primer(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement_base(b)).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_revcomp_basic() {
        assert_eq!(reverse_complement_primer(b"ACGT"), b"ACGT");
        assert_eq!(reverse_complement_primer(b"AACCGGTT"), b"AACCGGTT");
        assert_eq!(reverse_complement_primer(b"GATTACA"), b"TGTAATC");
    }

    #[test]
    fn test_revcomp_passthrough_symbols() {
        assert_eq!(reverse_complement_primer(b"ACGTN-X"), b"X-NACGT");
    }

    #[test]
    fn test_revcomp_involution() {
        let seq = b"ACGTNACGTN-X".to_vec();
        let twice = reverse_complement_primer(&reverse_complement_primer(&seq));
        assert_eq!(twice, seq);
    }

    #[test]
    fn test_revcomp_empty() {
        assert_eq!(reverse_complement_primer(b""), Vec::<u8>::new());
    }
}
