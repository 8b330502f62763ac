//! Backend A: profile-HMM search run as an external subprocess, one
//! invocation per batch (§4.3).

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::model::{Hit, Seq};

const MODULE: &str = module_path!();

pub struct PhmmBackend {
    /// Path to the `nhmmscan`-compatible search tool.
    tool_path: PathBuf,
    /// Path to the HMM profile file for the active kit.
    hmm_path:  PathBuf,
}

impl PhmmBackend {
    #[must_use]
    pub fn new(tool_path: impl Into<PathBuf>, hmm_path: impl Into<PathBuf>) -> Self {
        Self {
            tool_path: tool_path.into(),
            hmm_path:  hmm_path.into(),
        }
    }

    /// Runs one subprocess over the whole batch, feeding `reads` as a
    /// concatenated FASTA (headers carrying only [`Seq::id`]) and parsing the
    /// tool's tabular stdout into per-read hit lists, in batch order.
    ///
    /// ## Errors
    ///
    /// Returns an error if the HMM file is missing, the subprocess cannot be
    /// spawned, writing its stdin fails, or it exits with nonzero status.
    pub fn search_batch(&self, reads: &[Seq]) -> std::io::Result<Vec<Vec<Hit>>> {
        if !self.hmm_path.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("HMM file not found: {}", self.hmm_path.display()),
            ));
        }

        let mut child = Command::new(&self.tool_path)
            .arg(&self.hmm_path)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        {
            let stdin = child.stdin.as_mut().expect("piped stdin");
            for read in reads {
                writeln!(stdin, ">{}", read.id())?;
                stdin.write_all(&read.seq)?;
                stdin.write_all(b"\n")?;
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            eprintln!(
                "{MODULE}: profile-HMM search tool exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(std::io::Error::other(format!("profile-HMM search tool exited with {}", output.status)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let hits_by_ref = parse_tblout(&stdout);

        Ok(reads
            .iter()
            .map(|read| hits_by_ref.get(read.id()).cloned().unwrap_or_default())
            .collect())
    }
}

/// Parses tabular profile-HMM search output, grouping [`Hit`]s by `Ref`
/// (read id). Columns are taken by whitespace-delimited position:
/// `Ref=col[2]`, `Query=col[0]`, `RefStart=col[6]`, `RefEnd=col[7]+1`,
/// `QueryStart=col[4]`, `QueryEnd=col[5]+1`, `Score=col[12]`.
fn parse_tblout(text: &str) -> HashMap<String, Vec<Hit>> {
    let mut by_ref: HashMap<String, Vec<Hit>> = HashMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let cols: Vec<&str> = line.split_ascii_whitespace().collect();
        if cols.len() < 13 {
            eprintln!("{MODULE}: skipping malformed tblout line (expected >=13 columns): {line}");
            continue;
        }

        let (Ok(ref_start), Ok(ref_end_raw), Ok(query_start), Ok(query_end_raw), Ok(score)) = (
            cols[6].parse::<usize>(),
            cols[7].parse::<usize>(),
            cols[4].parse::<usize>(),
            cols[5].parse::<usize>(),
            cols[12].parse::<f32>(),
        ) else {
            eprintln!("{MODULE}: skipping malformed tblout line (unparseable numeric column): {line}");
            continue;
        };

        let hit = Hit {
            query_name: cols[0].to_string(),
            ref_start,
            ref_end: ref_end_raw + 1,
            query_start,
            query_end: query_end_raw + 1,
            score,
        };
        by_ref.entry(cols[2].to_string()).or_default().push(hit);
    }

    by_ref
}
