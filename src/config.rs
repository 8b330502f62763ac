//! The primer-pair configuration: an insertion-ordered mapping from ordered
//! primer-name pairs to a strand, plus the small set of bundled kit presets
//! that can populate it without a user-supplied config string.

use crate::model::Strand;
use std::fmt;

/// An insertion-ordered mapping `(queryA, queryB) -> strand`.
///
/// Backed by a `Vec` rather than a hash map: the contract (§9 `OrderedDict`
/// semantics) is specifically about preserving insertion order, which a hash
/// map's iteration order does not guarantee.
#[derive(Debug, Default, Clone)]
pub struct Config {
    entries: Vec<((String, String), Strand)>,
}

#[derive(Debug)]
pub struct ConfigParseError(String);

impl fmt::Display for ConfigParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid config string: {}", self.0)
    }
}

impl std::error::Error for ConfigParseError {}

impl From<ConfigParseError> for std::io::Error {
    fn from(e: ConfigParseError) -> Self {
        std::io::Error::other(e.to_string())
    }
}

impl Config {
    /// Parses the grammar `direction:A,B|direction:C,D|...` into an
    /// insertion-ordered map. Primer names may carry a leading `-`.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigParseError`] if any token is malformed (wrong field
    /// count, unknown direction, or a duplicate key).
    pub fn parse(s: &str) -> Result<Self, ConfigParseError> {
        let mut entries = Vec::new();

        for token in s.split('|') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            let (direction, pair) = token
                .split_once(':')
                .ok_or_else(|| ConfigParseError(format!("missing ':' in token '{token}'")))?;

            let strand = Strand::from_char(direction.chars().next().unwrap_or('?'))
                .filter(|_| direction.len() == 1)
                .ok_or_else(|| ConfigParseError(format!("unknown direction '{direction}' in token '{token}'")))?;

            let mut names = pair.split(',');
            let a = names
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ConfigParseError(format!("missing first primer name in token '{token}'")))?;
            let b = names
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ConfigParseError(format!("missing second primer name in token '{token}'")))?;
            if names.next().is_some() {
                return Err(ConfigParseError(format!("too many fields in token '{token}'")));
            }

            let key = (a.to_string(), b.to_string());
            if entries.iter().any(|(k, _): &((String, String), Strand)| *k == key) {
                return Err(ConfigParseError(format!("duplicate key ({a},{b})")));
            }
            entries.push((key, strand));
        }

        Ok(Self { entries })
    }

    /// Serializes back into the same grammar [`Config::parse`] accepts, in
    /// insertion order.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.entries
            .iter()
            .map(|((a, b), strand)| format!("{strand}:{a},{b}"))
            .collect::<Vec<_>>()
            .join("|")
    }

    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<Strand> {
        self.entries
            .iter()
            .find(|((ea, eb), _)| ea == a && eb == b)
            .map(|(_, strand)| *strand)
    }

    pub fn iter(&self) -> impl Iterator<Item = &((String, String), Strand)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A bundled `(primer FASTA, HMM file, default config string)` preset for a
/// known library preparation kit, selectable with `-k` without supplying
/// `-b`/`-g`/`-c` directly. The payload files themselves are opaque shipped
/// data outside this crate's scope; only the preset table is owned here.
#[derive(Debug, Clone, Copy)]
pub struct KitPreset {
    pub name:          &'static str,
    pub primers_path:  &'static str,
    pub hmm_path:      &'static str,
    pub config_string: &'static str,
}

/// Known kit presets, mirroring the protocols supported by this tool's
/// upstream predecessor (PCS109/PCS111 cDNA kits and the DCS109 direct cDNA
/// kit).
pub const KIT_PRESETS: &[KitPreset] = &[
    KitPreset {
        name:          "PCS109",
        primers_path:  "data/kits/pcs109/primers.fas",
        hmm_path:      "data/kits/pcs109/primers.hmm",
        config_string: "+:SSP,-VNP|-:VNP,-SSP",
    },
    KitPreset {
        name:          "PCS111",
        primers_path:  "data/kits/pcs111/primers.fas",
        hmm_path:      "data/kits/pcs111/primers.hmm",
        config_string: "+:SSP,-VNP|-:VNP,-SSP",
    },
    KitPreset {
        name:          "DCS109",
        primers_path:  "data/kits/dcs109/primers.fas",
        hmm_path:      "data/kits/dcs109/primers.hmm",
        config_string: "+:SSP,-VNP|-:VNP,-SSP",
    },
    KitPreset {
        name:          "LSK114",
        primers_path:  "data/kits/lsk114/primers.fas",
        hmm_path:      "data/kits/lsk114/primers.hmm",
        config_string: "+:SSP,-VNP|-:VNP,-SSP",
    },
];

#[must_use]
pub fn find_kit_preset(name: &str) -> Option<&'static KitPreset> {
    KIT_PRESETS.iter().find(|kit| kit.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_single_entry() {
        let c = Config::parse("+:SSP,-VNP").unwrap();
        assert_eq!(c.get("SSP", "-VNP"), Some(Strand::Plus));
        assert_eq!(c.get("-VNP", "SSP"), None);
    }

    #[test]
    fn test_parse_multiple_entries_preserve_order() {
        let c = Config::parse("+:SSP,-VNP|-:VNP,-SSP").unwrap();
        let keys: Vec<_> = c.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(
            keys,
            vec![
                ("SSP".to_string(), "-VNP".to_string()),
                ("VNP".to_string(), "-SSP".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_idempotence() {
        let c1 = Config::parse("+:SSP,-VNP|-:VNP,-SSP").unwrap();
        let serialized = c1.serialize();
        let c2 = Config::parse(&serialized).unwrap();
        assert_eq!(c1.entries, c2.entries);
    }

    #[test]
    fn test_parse_rejects_bad_direction() {
        assert!(Config::parse("x:A,B").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        assert!(Config::parse("+:A").is_err());
        assert!(Config::parse("+:A,B,C").is_err());
    }

    #[test]
    fn test_parse_rejects_duplicate_key() {
        assert!(Config::parse("+:A,B|-:A,B").is_err());
    }

    #[test]
    fn test_parse_empty_string() {
        let c = Config::parse("").unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn test_find_kit_preset_case_insensitive() {
        assert!(find_kit_preset("dcs109").is_some());
        assert!(find_kit_preset("nonexistent-kit").is_none());
    }
}
