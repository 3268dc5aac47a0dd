use thiserror::Error;

/// Inconsistent match state. Fatal to the current match, never to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("agent index {index} out of range (agents: {count})")]
    AgentOutOfRange { index: usize, count: usize },
    #[error("no agent can take the initial chaser role")]
    NoChaserCandidate,
    #[error("single mode requires exactly one chaser, found {found}")]
    ChaserCount { found: usize },
    #[error("chaser count decreased from {before} to {after} in multi mode")]
    ChaserCountDecreased { before: usize, after: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
