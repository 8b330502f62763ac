//! The two interchangeable primer-hit detection backends: a profile-HMM
//! search run as an external subprocess, and an edit-distance prefilter with
//! local-alignment refinement.

pub mod edlib;
pub mod phmm;
mod refine;

use crate::model::{Hit, Seq};
use clap::ValueEnum;

/// Which detection backend a run uses, selected with `-m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Profile-HMM search via an external `nhmmscan`-compatible subprocess.
    Phmm,
    /// Edit-distance prefilter refined with a striped local alignment.
    Edlib,
}

/// A configured detection backend, ready to search reads for primer hits.
pub enum Backend {
    Phmm(phmm::PhmmBackend),
    Edlib(edlib::EdlibBackend),
}

impl Backend {
    /// Searches an entire batch at once, returning one hit list per read in
    /// batch order.
    ///
    /// For [`Backend::Phmm`] this is a single subprocess round-trip over the
    /// whole batch (§4.3). For [`Backend::Edlib`] each read is searched
    /// independently and the batch is only a unit of parallel dispatch
    /// (§4.4); the work is still embarrassingly parallel across reads, which
    /// the driver exploits when mapping this batch.
    ///
    /// ## Errors
    ///
    /// Propagates subprocess failures for [`Backend::Phmm`]; infallible for
    /// [`Backend::Edlib`].
    pub fn search_batch(&self, reads: &[Seq], max_ed: f32) -> std::io::Result<Vec<Vec<Hit>>> {
        match self {
            Backend::Phmm(backend) => backend.search_batch(reads),
            Backend::Edlib(backend) => Ok(reads.iter().map(|read| backend.search_one(read, max_ed)).collect()),
        }
    }

    /// Searches a single read. Used by the driver's per-read parallel map so
    /// that edlib's candidate search can run inside the same worker task as
    /// the reducer and segmenter, rather than as a separate batch stage.
    ///
    /// Returns `None` for [`Backend::Phmm`], since that backend can only
    /// search a whole batch at once; callers must use [`Backend::search_batch`]
    /// and distribute the results themselves.
    #[must_use]
    pub fn search_one(&self, read: &Seq, max_ed: f32) -> Option<Vec<Hit>> {
        match self {
            Backend::Phmm(_) => None,
            Backend::Edlib(backend) => Some(backend.search_one(read, max_ed)),
        }
    }
}
