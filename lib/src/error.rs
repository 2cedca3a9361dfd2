//! Error taxonomy shared by the loaders, the allocation search and the mapping rounds.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedError {
    /// Fatal problem with the workflow or the platform, detected before any round runs.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The inner CPA loop ran past its iteration bound without saturating.
    #[error("Allocation search for {nworkstations} workstations did not converge after {iterations} iterations")]
    ConvergenceAnomaly {
        nworkstations: usize,
        iterations: usize,
    },

    /// State left over from a previous round (resource edges, availability dates).
    #[error("Stale scheduling state: {0}")]
    StaleState(String),

    #[error("Failed to read or write a file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to scan YAML: {0}")]
    Yaml(#[from] yaml_rust::ScanError),

    #[error("Failed to (de)serialize YAML: {0}")]
    Serde(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SchedError>;
