use std::env;

const SEED_ENV_VAR: &str = "FLC_SEED";

/// Reads a reproducibility seed from the environment, for callers that don't
/// receive one explicitly via `-s`.
pub fn get_seed() -> Option<u64> {
    env::var(SEED_ENV_VAR).ok().map(|s| s.bytes().fold(0, |a, b| a ^ b) as u64)
}
