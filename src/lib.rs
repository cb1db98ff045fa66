//! Per-frame back-to-front ordering of Gaussian splats.
//!
//! [`sort::sort_splats`] is the allocation-free kernel: it projects the active
//! window of an index buffer onto the camera depth axis, buckets the
//! distances, and emits the permutation with a counting-sort scatter.
//! [`sorter::SplatSorter`] owns the buffers around it for a whole scene.

pub mod camera;
pub mod centers;
pub mod demo;
pub mod error;
pub mod parser;
pub mod sort;
pub mod sorter;
pub mod splat;

pub use error::{LoadError, SortError};
pub use sort::{sort_splats, DistanceBounds, DistanceSource, Kernel, SortOptions};
pub use sorter::{SortOutcome, SortRequest, SorterConfig, SplatSorter};
pub use splat::{CenterData, MotionModel, SpaceTimeSplat, SplatCloud};
