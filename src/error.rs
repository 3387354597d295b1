//! Error types for reading alignments and building the pangene graph
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PangeneError {
    /// Input could not be opened; nothing was added to the store
    #[error("failed to open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    /// A positional field could not be parsed
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// An operation length or the decoded span does not fit in 64 bits
    #[error("CIGAR '{0}' overflows")]
    CigarOverflow(String),

    /// The operation string does not cover the declared genomic span
    #[error("line {line}: CIGAR of '{query}' spans {decoded} bp but the hit spans {declared} bp")]
    SpanMismatch {
        line: usize,
        query: String,
        decoded: i64,
        declared: i64,
    },

    #[error("hits of genome {genome} are not sorted by start position")]
    UnsortedHits { genome: usize },

    #[error("graph state: {0}")]
    GraphState(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

pub type Result<T> = std::result::Result<T, PangeneError>;
