//! Display pipelines
//!
//! A pipeline is one scan-out path of the display engine. Pipe A drives the built-in
//! panel, pipe B the external output. Planes are not hard-partitioned between pipelines,
//! but each pipeline has an affinity to the planes sharing its index.

use crate::error::Error;

/// A display pipeline planes can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pipeline {
    /// The built-in panel (pipe A)
    Primary,
    /// The external output (pipe B)
    External,
    /// A virtual display without scan-out hardware
    Virtual,
}

impl Pipeline {
    /// Pipelines that own hardware planes
    pub const SCANOUT: [Pipeline; 2] = [Pipeline::Primary, Pipeline::External];

    /// Index of the planes this pipeline prefers.
    ///
    /// Returns `None` for pipelines that can not use hardware planes at all.
    pub fn preferred_index(self) -> Option<usize> {
        match self {
            Pipeline::Primary => Some(0),
            Pipeline::External => Some(1),
            Pipeline::Virtual => None,
        }
    }

    /// Returns true if planes can be assigned to this pipeline
    pub fn supports_planes(self) -> bool {
        self.preferred_index().is_some()
    }
}

impl TryFrom<i32> for Pipeline {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Pipeline::Primary),
            1 => Ok(Pipeline::External),
            2 => Ok(Pipeline::Virtual),
            x => Err(Error::InvalidPipeline(x)),
        }
    }
}

impl From<Pipeline> for i32 {
    fn from(pipeline: Pipeline) -> i32 {
        match pipeline {
            Pipeline::Primary => 0,
            Pipeline::External => 1,
            Pipeline::Virtual => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_ids_roundtrip() {
        for pipeline in [Pipeline::Primary, Pipeline::External, Pipeline::Virtual] {
            assert_eq!(Pipeline::try_from(i32::from(pipeline)).unwrap(), pipeline);
        }
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        assert!(matches!(Pipeline::try_from(-1), Err(Error::InvalidPipeline(-1))));
        assert!(matches!(Pipeline::try_from(3), Err(Error::InvalidPipeline(3))));
    }

    #[test]
    fn preference_index() {
        assert_eq!(Pipeline::Primary.preferred_index(), Some(0));
        assert_eq!(Pipeline::External.preferred_index(), Some(1));
        assert_eq!(Pipeline::Virtual.preferred_index(), None);
        assert!(!Pipeline::Virtual.supports_planes());
    }
}
