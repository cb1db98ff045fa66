use std::time::{Duration, Instant};

use tracing::debug;

use crate::centers::{SPACETIME_CENTER_STRIDE, STATIC_CENTER_STRIDE};
use crate::error::{SortError, SortResult};
use crate::sort::{sort_splats, DistanceBounds, DistanceSource, Kernel, SortOptions};
use crate::splat::{CenterData, MotionModel};

pub const DEFAULT_DISTANCE_MAP_RANGE: u32 = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SorterConfig {
    /// Number of depth buckets.
    pub distance_map_range: u32,
    pub kernel: Kernel,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            distance_map_range: DEFAULT_DISTANCE_MAP_RANGE,
            kernel: Kernel::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortRequest {
    /// Column-major view-projection matrix.
    pub view_projection: [f32; 16],
    /// Scene time; ignored by static centers.
    pub timestamp: f32,
    pub render_count: usize,
    pub sort_count: usize,
    pub use_precomputed_distances: bool,
}

impl SortRequest {
    pub fn new(view_projection: [f32; 16], count: usize) -> Self {
        Self {
            view_projection,
            timestamp: 0.0,
            render_count: count,
            sort_count: count,
            use_precomputed_distances: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SortOutcome<'a> {
    /// The first `render_count` entries of the new order.
    pub sorted_indexes: &'a [u32],
    pub render_count: usize,
    pub sort_count: usize,
    pub bounds: DistanceBounds,
    pub sort_time: Duration,
}

/// Owns every buffer the sort kernel needs for one scene.
///
/// Centers may be uploaded in ranges as a scene streams in; sorts only ever
/// consider splats that have been uploaded. A sorter is single-threaded, but
/// independent sorters can run side by side.
#[derive(Debug)]
pub struct SplatSorter {
    config: SorterConfig,
    capacity: usize,
    centers: CenterData,
    precomputed_distances: Option<Vec<i32>>,
    indexes: Vec<u32>,
    mapped_distances: Vec<i32>,
    frequencies: Vec<u32>,
    sorted_indexes: Vec<u32>,
    uploaded_count: usize,
}

impl SplatSorter {
    pub fn new(capacity: usize, model: MotionModel, config: SorterConfig) -> SortResult<Self> {
        if config.distance_map_range < 2 {
            return Err(SortError::InvalidDistanceMapRange(config.distance_map_range));
        }

        let centers = match model {
            MotionModel::Static => CenterData::Static(vec![0; capacity * STATIC_CENTER_STRIDE]),
            MotionModel::SpaceTime => {
                CenterData::SpaceTime(vec![0.0; capacity * SPACETIME_CENTER_STRIDE])
            }
        };

        Ok(Self {
            config,
            capacity,
            centers,
            precomputed_distances: None,
            indexes: (0..capacity as u32).collect(),
            mapped_distances: vec![0; capacity],
            frequencies: vec![0; config.distance_map_range as usize],
            sorted_indexes: vec![0; capacity],
            uploaded_count: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn uploaded_count(&self) -> usize {
        self.uploaded_count
    }

    pub fn motion_model(&self) -> MotionModel {
        self.centers.motion_model()
    }

    /// Current input order.
    pub fn indexes(&self) -> &[u32] {
        &self.indexes
    }

    /// Output of the most recent sort.
    pub fn sorted_indexes(&self) -> &[u32] {
        &self.sorted_indexes
    }

    /// Copies encoded centers for splats `from..from + n` into the sorter.
    pub fn upload_centers(&mut self, from: usize, data: &CenterData) -> SortResult<()> {
        let expected = self.motion_model();
        let count = match (&mut self.centers, data) {
            (CenterData::Static(dst), CenterData::Static(src)) => {
                copy_strided(dst, from, src, STATIC_CENTER_STRIDE, self.capacity)?
            }
            (CenterData::SpaceTime(dst), CenterData::SpaceTime(src)) => {
                copy_strided(dst, from, src, SPACETIME_CENTER_STRIDE, self.capacity)?
            }
            _ => {
                return Err(SortError::MotionModelMismatch {
                    expected,
                    actual: data.motion_model(),
                })
            }
        };

        self.uploaded_count = from + count;
        debug!(from, count, uploaded = self.uploaded_count, "uploaded splat centers");
        Ok(())
    }

    /// Stores caller-computed distances for splats `from..from + n`.
    pub fn upload_precomputed_distances(&mut self, from: usize, distances: &[i32]) -> SortResult<()> {
        let capacity = self.capacity;
        let dst = self
            .precomputed_distances
            .get_or_insert_with(|| vec![0; capacity]);
        copy_strided(dst, from, distances, 1, capacity)?;
        Ok(())
    }

    /// Replaces the leading entries of the input order.
    pub fn set_indexes(&mut self, indexes: &[u32]) -> SortResult<()> {
        if indexes.len() > self.capacity {
            return Err(SortError::UploadOutOfRange {
                from: 0,
                count: indexes.len(),
                capacity: self.capacity,
            });
        }
        if let Some(&index) = indexes.iter().find(|&&i| i as usize >= self.capacity) {
            return Err(SortError::IndexOutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        self.indexes[..indexes.len()].copy_from_slice(indexes);
        Ok(())
    }

    /// Sorts the current input order for one frame.
    ///
    /// Counts are clamped to the number of uploaded splats, and the sort
    /// count to the render count.
    pub fn sort(&mut self, request: &SortRequest) -> SortResult<SortOutcome<'_>> {
        let render_count = request.render_count.min(self.uploaded_count);
        let options = SortOptions {
            sort_count: request.sort_count.min(render_count),
            active_count: render_count,
            kernel: self.config.kernel,
        };
        let sort_start = options.sort_start();

        if let Some(&index) = self.indexes[sort_start..render_count]
            .iter()
            .find(|&&i| i as usize >= self.uploaded_count)
        {
            return Err(SortError::IndexOutOfRange {
                index,
                capacity: self.uploaded_count,
            });
        }

        let source = if request.use_precomputed_distances {
            let distances = self
                .precomputed_distances
                .as_deref()
                .ok_or(SortError::MissingPrecomputedDistances)?;
            DistanceSource::Precomputed { distances }
        } else {
            match &self.centers {
                CenterData::Static(centers) => DistanceSource::Static { centers },
                CenterData::SpaceTime(centers) => DistanceSource::SpaceTime {
                    centers,
                    timestamp: request.timestamp,
                },
            }
        };

        self.frequencies.fill(0);
        let started = Instant::now();
        let bounds = sort_splats(
            &self.indexes,
            &mut self.sorted_indexes,
            &mut self.frequencies,
            &mut self.mapped_distances,
            source,
            &request.view_projection,
            options,
        );
        let sort_time = started.elapsed();

        debug!(
            render_count,
            sort_count = options.sort_count,
            min_distance = bounds.min,
            max_distance = bounds.max,
            sort_time_us = sort_time.as_micros() as u64,
            "sorted splats"
        );

        Ok(SortOutcome {
            sorted_indexes: &self.sorted_indexes[..render_count],
            render_count,
            sort_count: options.sort_count,
            bounds,
            sort_time,
        })
    }
}

/// Copies `src` into `dst` starting at record `from`; returns the record count.
fn copy_strided<T: Copy>(
    dst: &mut [T],
    from: usize,
    src: &[T],
    stride: usize,
    capacity: usize,
) -> SortResult<usize> {
    if src.len() % stride != 0 {
        return Err(SortError::MisalignedCenters {
            len: src.len(),
            stride,
        });
    }
    let count = src.len() / stride;
    let end = from
        .checked_add(count)
        .filter(|&end| end <= capacity)
        .ok_or(SortError::UploadOutOfRange {
            from,
            count,
            capacity,
        })?;
    dst[from * stride..end * stride].copy_from_slice(src);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centers::encode_static_centers;
    use glam::{Mat4, Vec3};

    fn z_axis_view_projection() -> [f32; 16] {
        Mat4::IDENTITY.to_cols_array()
    }

    fn line_of_splats(count: usize) -> CenterData {
        let positions: Vec<Vec3> = (0..count).map(|i| Vec3::new(0.0, 0.0, i as f32)).collect();
        CenterData::Static(encode_static_centers(&positions))
    }

    #[test]
    fn rejects_single_bucket() {
        let config = SorterConfig {
            distance_map_range: 1,
            ..SorterConfig::default()
        };
        let err = SplatSorter::new(4, MotionModel::Static, config).unwrap_err();
        assert_eq!(err, SortError::InvalidDistanceMapRange(1));
    }

    #[test]
    fn sorts_repeatedly_without_caller_clearing_frequencies() {
        let mut sorter = SplatSorter::new(4, MotionModel::Static, SorterConfig::default())
            .expect("sorter should build");
        sorter.upload_centers(0, &line_of_splats(4)).expect("upload should fit");

        let request = SortRequest::new(z_axis_view_projection(), 4);
        for _ in 0..3 {
            let outcome = sorter.sort(&request).expect("sort should succeed");
            assert_eq!(outcome.sorted_indexes, &[3, 2, 1, 0]);
        }
    }

    #[test]
    fn counts_clamp_to_uploaded_splats() {
        let mut sorter = SplatSorter::new(8, MotionModel::Static, SorterConfig::default())
            .expect("sorter should build");
        sorter.upload_centers(0, &line_of_splats(3)).expect("upload should fit");
        assert_eq!(sorter.capacity(), 8);
        assert_eq!(sorter.uploaded_count(), 3);

        let outcome = sorter
            .sort(&SortRequest::new(z_axis_view_projection(), 8))
            .expect("sort should succeed");
        assert_eq!(outcome.render_count, 3);
        assert_eq!(outcome.sort_count, 3);
        assert_eq!(outcome.sorted_indexes, &[2, 1, 0]);
        assert_eq!(&sorter.sorted_indexes()[..3], &[2, 1, 0]);
    }

    #[test]
    fn set_indexes_replaces_leading_order() {
        let mut sorter = SplatSorter::new(4, MotionModel::Static, SorterConfig::default())
            .expect("sorter should build");
        assert_eq!(sorter.indexes(), &[0, 1, 2, 3]);

        sorter.set_indexes(&[2, 0]).expect("indexes fit capacity");
        assert_eq!(sorter.indexes(), &[2, 0, 2, 3]);
        assert_eq!(
            sorter.set_indexes(&[4]),
            Err(SortError::IndexOutOfRange {
                index: 4,
                capacity: 4,
            })
        );
    }

    #[test]
    fn upload_rejects_wrong_model_and_overflow() {
        let mut sorter = SplatSorter::new(2, MotionModel::SpaceTime, SorterConfig::default())
            .expect("sorter should build");
        assert_eq!(
            sorter.upload_centers(0, &line_of_splats(1)),
            Err(SortError::MotionModelMismatch {
                expected: MotionModel::SpaceTime,
                actual: MotionModel::Static,
            })
        );
        assert_eq!(
            sorter.upload_centers(1, &CenterData::SpaceTime(vec![0.0; 2 * SPACETIME_CENTER_STRIDE])),
            Err(SortError::UploadOutOfRange {
                from: 1,
                count: 2,
                capacity: 2,
            })
        );
        assert_eq!(
            sorter.upload_centers(0, &CenterData::SpaceTime(vec![0.0; 5])),
            Err(SortError::MisalignedCenters { len: 5, stride: 13 })
        );
    }

    #[test]
    fn precomputed_distances_drive_the_order() {
        let mut sorter = SplatSorter::new(4, MotionModel::Static, SorterConfig::default())
            .expect("sorter should build");
        sorter.upload_centers(0, &line_of_splats(4)).expect("upload should fit");

        let mut request = SortRequest::new(z_axis_view_projection(), 4);
        request.use_precomputed_distances = true;
        assert_eq!(
            sorter.sort(&request).unwrap_err(),
            SortError::MissingPrecomputedDistances
        );

        sorter
            .upload_precomputed_distances(0, &[10, 40, 20, 30])
            .expect("upload should fit");
        let outcome = sorter.sort(&request).expect("sort should succeed");
        assert_eq!(outcome.sorted_indexes, &[1, 3, 2, 0]);
    }

    #[test]
    fn stale_indexes_beyond_upload_are_rejected() {
        let mut sorter = SplatSorter::new(4, MotionModel::Static, SorterConfig::default())
            .expect("sorter should build");
        sorter.upload_centers(0, &line_of_splats(2)).expect("upload should fit");
        sorter.set_indexes(&[3, 0]).expect("indexes fit capacity");

        assert_eq!(
            sorter.sort(&SortRequest::new(z_axis_view_projection(), 2)).unwrap_err(),
            SortError::IndexOutOfRange {
                index: 3,
                capacity: 2,
            }
        );
    }
}
