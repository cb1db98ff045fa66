use std::path::PathBuf;

use thiserror::Error;

use crate::splat::MotionModel;

pub type SortResult<T> = Result<T, SortError>;
pub type LoadResult<T> = Result<T, LoadError>;

/// Misuse of a [`crate::sorter::SplatSorter`]. The sort kernel itself never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    #[error("distance map range must have at least 2 buckets, got {0}")]
    InvalidDistanceMapRange(u32),

    #[error("sorter holds {expected:?} centers, got {actual:?}")]
    MotionModelMismatch {
        expected: MotionModel,
        actual: MotionModel,
    },

    #[error("center buffer of {len} values is not a multiple of the {stride}-value stride")]
    MisalignedCenters { len: usize, stride: usize },

    #[error("upload of {count} entries at offset {from} exceeds capacity {capacity}")]
    UploadOutOfRange {
        from: usize,
        count: usize,
        capacity: usize,
    },

    #[error("splat index {index} out of range for {capacity} splats")]
    IndexOutOfRange { index: u32, capacity: usize },

    #[error("precomputed distances requested but none were uploaded")]
    MissingPrecomputedDistances,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SPLAT parse error: {0}")]
    Splat(String),

    #[error("PLY parse error: {0}")]
    Ply(String),

    #[error("unsupported input '{0}'; use a .ply or .splat file")]
    UnsupportedFormat(PathBuf),
}
