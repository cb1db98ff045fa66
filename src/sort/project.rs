use super::{simd, DistanceBounds, DistanceSource, Kernel};
use crate::centers::{
    SPACETIME_CENTER_STRIDE, SPACETIME_DISTANCE_SCALE, SPACETIME_TIME_SLOT,
    STATIC_CENTER_STRIDE, STATIC_ROW_SCALE,
};

// --- View-projection rows ---

/// Third row of a column-major 4x4 matrix: the entries that feed clip-space depth.
pub fn depth_row(view_projection: &[f32; 16]) -> [f32; 4] {
    [
        view_projection[2],
        view_projection[6],
        view_projection[10],
        view_projection[14],
    ]
}

/// Depth row scaled by 1000 and truncated for integer multiply-accumulate.
/// The homogeneous lane is pinned to 1.
pub fn fixed_point_depth_row(view_projection: &[f32; 16]) -> [i32; 4] {
    let row = depth_row(view_projection);
    [
        scale_and_truncate(row[0]),
        scale_and_truncate(row[1]),
        scale_and_truncate(row[2]),
        1,
    ]
}

// The product is formed in f64 so it is exact; an f32 product can round up
// to the next integer before truncation.
#[inline]
fn scale_and_truncate(entry: f32) -> i32 {
    (f64::from(entry) * f64::from(STATIC_ROW_SCALE)) as i32
}

// --- Scalar reference paths ---

#[inline]
pub(super) fn static_distance(center: &[i32], row: &[i32; 4]) -> i32 {
    row[0]
        .wrapping_mul(center[0])
        .wrapping_add(row[1].wrapping_mul(center[1]))
        .wrapping_add(row[2].wrapping_mul(center[2]))
}

/// Evaluates the per-axis position polynomial at `timestamp`.
///
/// Accumulates `c0 * 1 + c1 * dt + c2 * dt^2` term by term; the vector path
/// performs the same operations in the same order so both agree bit for bit.
#[inline]
pub(super) fn spacetime_position(center: &[f32], timestamp: f32) -> [f32; 3] {
    let delta_t = timestamp - center[SPACETIME_TIME_SLOT];
    let mut delta_t_pow = 1.0_f32;
    let mut position = [0.0_f32; 3];
    for term in 0..3 {
        position[0] += center[3 * term] * delta_t_pow;
        position[1] += center[3 * term + 1] * delta_t_pow;
        position[2] += center[3 * term + 2] * delta_t_pow;
        delta_t_pow *= delta_t;
    }
    position
}

#[inline]
pub(super) fn spacetime_distance(position: [f32; 3], row: &[f32; 4]) -> i32 {
    ((row[0] * position[0] + row[1] * position[1] + row[2] * position[2])
        * SPACETIME_DISTANCE_SCALE) as i32
}

fn project_static_scalar(
    indexes: &[u32],
    centers: &[i32],
    row: &[i32; 4],
    distances: &mut [i32],
) -> DistanceBounds {
    let mut bounds = DistanceBounds::EMPTY;
    for (&index, slot) in indexes.iter().zip(distances.iter_mut()) {
        let offset = STATIC_CENTER_STRIDE * index as usize;
        let distance = static_distance(&centers[offset..offset + STATIC_CENTER_STRIDE], row);
        *slot = distance;
        bounds.include(distance);
    }
    bounds
}

fn project_spacetime_scalar(
    indexes: &[u32],
    centers: &[f32],
    timestamp: f32,
    row: &[f32; 4],
    distances: &mut [i32],
) -> DistanceBounds {
    let mut bounds = DistanceBounds::EMPTY;
    for (&index, slot) in indexes.iter().zip(distances.iter_mut()) {
        let offset = SPACETIME_CENTER_STRIDE * index as usize;
        let position =
            spacetime_position(&centers[offset..offset + SPACETIME_CENTER_STRIDE], timestamp);
        let distance = spacetime_distance(position, row);
        *slot = distance;
        bounds.include(distance);
    }
    bounds
}

fn gather_precomputed(indexes: &[u32], precomputed: &[i32], distances: &mut [i32]) -> DistanceBounds {
    let mut bounds = DistanceBounds::EMPTY;
    for (&index, slot) in indexes.iter().zip(distances.iter_mut()) {
        let distance = precomputed[index as usize];
        *slot = distance;
        bounds.include(distance);
    }
    bounds
}

/// Writes one raw distance per entry of `indexes` into the matching slot of
/// `distances` and returns the running min/max.
///
/// `indexes` and `distances` are the active window only; both must have the
/// same length.
pub fn project_distances(
    indexes: &[u32],
    source: DistanceSource<'_>,
    view_projection: &[f32; 16],
    kernel: Kernel,
    distances: &mut [i32],
) -> DistanceBounds {
    assert_eq!(
        indexes.len(),
        distances.len(),
        "distance window must match the index window"
    );

    match source {
        DistanceSource::Precomputed { distances: precomputed } => {
            gather_precomputed(indexes, precomputed, distances)
        }
        DistanceSource::Static { centers } => {
            let row = fixed_point_depth_row(view_projection);
            if kernel.wants_simd() {
                if let Some(bounds) = simd::project_static(indexes, centers, &row, distances) {
                    return bounds;
                }
            }
            project_static_scalar(indexes, centers, &row, distances)
        }
        DistanceSource::SpaceTime { centers, timestamp } => {
            let row = depth_row(view_projection);
            if kernel.wants_simd() {
                if let Some(bounds) =
                    simd::project_spacetime(indexes, centers, timestamp, &row, distances)
                {
                    return bounds;
                }
            }
            project_spacetime_scalar(indexes, centers, timestamp, &row, distances)
        }
    }
}
