use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Method;

/// Which input a unit failed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    GroundTruth,
    Called(Method),
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::GroundTruth => f.write_str("ground-truth"),
            InputKind::Called(method) => write!(f, "{} call", method),
        }
    }
}

#[derive(Debug, Error)]
pub enum VcfError {
    #[error("htslib: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),
    #[error("sample '{name}' not found in VCF header (available: {available:?})")]
    MissingSample { name: String, available: Vec<String> },
    #[error("VCF has no sample columns")]
    NoSamples,
    #[error("record at position {0} has no contig")]
    MissingContig(u64),
}

/// Fatal error for one (run, chromosome) unit of work.
#[derive(Debug, Error)]
#[error("cannot read {kind} VCF {}: {error}", .path.display())]
pub struct UnitError {
    pub kind: InputKind,
    pub path: PathBuf,
    #[source]
    pub error: VcfError,
}

impl UnitError {
    pub fn new(kind: InputKind, path: impl Into<PathBuf>, error: impl Into<VcfError>) -> Self {
        UnitError {
            kind,
            path: path.into(),
            error: error.into(),
        }
    }
}

/// A unit that was excluded from the merged tables, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    pub run: String,
    pub samples: String,
    pub chromosome: String,
    pub reason: String,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} ({}) on {}: {}",
            self.run, self.samples, self.chromosome, self.reason
        )
    }
}
