//! Execution target selection for the filter core

use std::fmt;
use std::str::FromStr;

use crate::image_pipeline::common::error::ReconstructionError;

/// Where a reconstruction runs. Chosen per call; results are identical on every
/// target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionTarget {
    /// Single-threaded, channel after channel
    #[default]
    Cpu,
    /// Channels filtered concurrently on the rayon pool
    Parallel,
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}

impl FromStr for ExecutionTarget {
    type Err = ReconstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "parallel" | "accelerated" => Ok(Self::Parallel),
            other => Err(ReconstructionError::InvalidParameter(format!(
                "unknown execution target '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_targets() {
        assert_eq!("cpu".parse::<ExecutionTarget>().unwrap(), ExecutionTarget::Cpu);
        assert_eq!("CPU".parse::<ExecutionTarget>().unwrap(), ExecutionTarget::Cpu);
        assert_eq!(
            "accelerated".parse::<ExecutionTarget>().unwrap(),
            ExecutionTarget::Parallel
        );
        assert!("gpu0".parse::<ExecutionTarget>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for target in [ExecutionTarget::Cpu, ExecutionTarget::Parallel] {
            assert_eq!(target.to_string().parse::<ExecutionTarget>().unwrap(), target);
        }
    }
}
