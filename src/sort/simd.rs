//! 128-bit lane versions of the distance projector.
//!
//! Each entry point returns `None` when the running CPU (or the compile
//! target) lacks the required lanes, and the caller falls back to the scalar
//! path. Results are identical to the scalar path: static distances use the
//! same wrapping i32 arithmetic, and space-time positions are accumulated with
//! the same f32 operations in the same order, lane by lane.

use super::DistanceBounds;

/// True when the static (i32 multiply) path can run vectorized here.
pub fn static_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        is_x86_feature_detected!("sse4.1")
    }
    #[cfg(all(target_arch = "wasm32", target_feature = "simd128"))]
    {
        true
    }
    #[cfg(not(any(
        target_arch = "x86_64",
        all(target_arch = "wasm32", target_feature = "simd128")
    )))]
    {
        false
    }
}

/// True when the space-time (f32 polynomial) path can run vectorized here.
pub fn spacetime_available() -> bool {
    cfg!(any(
        target_arch = "x86_64",
        all(target_arch = "wasm32", target_feature = "simd128")
    ))
}

pub(super) fn project_static(
    indexes: &[u32],
    centers: &[i32],
    row: &[i32; 4],
    distances: &mut [i32],
) -> Option<DistanceBounds> {
    if !static_available() {
        return None;
    }
    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: sse4.1 support was checked at runtime above.
        Some(unsafe { x86::project_static(indexes, centers, row, distances) })
    }
    #[cfg(all(target_arch = "wasm32", target_feature = "simd128"))]
    {
        Some(wasm::project_static(indexes, centers, row, distances))
    }
    #[cfg(not(any(
        target_arch = "x86_64",
        all(target_arch = "wasm32", target_feature = "simd128")
    )))]
    {
        let _ = (indexes, centers, row, distances);
        None
    }
}

pub(super) fn project_spacetime(
    indexes: &[u32],
    centers: &[f32],
    timestamp: f32,
    row: &[f32; 4],
    distances: &mut [i32],
) -> Option<DistanceBounds> {
    if !spacetime_available() {
        return None;
    }
    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: sse2 is part of the x86_64 baseline.
        Some(unsafe { x86::project_spacetime(indexes, centers, timestamp, row, distances) })
    }
    #[cfg(all(target_arch = "wasm32", target_feature = "simd128"))]
    {
        Some(wasm::project_spacetime(
            indexes, centers, timestamp, row, distances,
        ))
    }
    #[cfg(not(any(
        target_arch = "x86_64",
        all(target_arch = "wasm32", target_feature = "simd128")
    )))]
    {
        let _ = (indexes, centers, timestamp, row, distances);
        None
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::{
        __m128, __m128i, _mm_add_ps, _mm_loadu_ps, _mm_loadu_si128, _mm_mul_ps,
        _mm_mullo_epi32, _mm_set1_ps, _mm_setzero_ps, _mm_storeu_ps, _mm_storeu_si128,
    };

    use super::super::project::spacetime_distance;
    use super::DistanceBounds;
    use crate::centers::{SPACETIME_CENTER_STRIDE, SPACETIME_TIME_SLOT, STATIC_CENTER_STRIDE};

    #[target_feature(enable = "sse4.1")]
    pub(super) unsafe fn project_static(
        indexes: &[u32],
        centers: &[i32],
        row: &[i32; 4],
        distances: &mut [i32],
    ) -> DistanceBounds {
        let mut bounds = DistanceBounds::EMPTY;
        let row_lanes = _mm_loadu_si128(row.as_ptr() as *const __m128i);
        let mut lanes = [0_i32; 4];
        for (&index, slot) in indexes.iter().zip(distances.iter_mut()) {
            let offset = STATIC_CENTER_STRIDE * index as usize;
            let center = &centers[offset..offset + STATIC_CENTER_STRIDE];
            let center_lanes = _mm_loadu_si128(center.as_ptr() as *const __m128i);
            let product = _mm_mullo_epi32(center_lanes, row_lanes);
            _mm_storeu_si128(lanes.as_mut_ptr() as *mut __m128i, product);
            let distance = lanes[0].wrapping_add(lanes[1]).wrapping_add(lanes[2]);
            *slot = distance;
            bounds.include(distance);
        }
        bounds
    }

    #[target_feature(enable = "sse2")]
    pub(super) unsafe fn project_spacetime(
        indexes: &[u32],
        centers: &[f32],
        timestamp: f32,
        row: &[f32; 4],
        distances: &mut [i32],
    ) -> DistanceBounds {
        let mut bounds = DistanceBounds::EMPTY;
        let mut lanes = [0.0_f32; 4];
        for (&index, slot) in indexes.iter().zip(distances.iter_mut()) {
            let offset = SPACETIME_CENTER_STRIDE * index as usize;
            let center = &centers[offset..offset + SPACETIME_CENTER_STRIDE];
            let delta_t = timestamp - center[SPACETIME_TIME_SLOT];

            // Term j occupies center[3j..3j+3]; the fourth lane reads the next
            // term (or padding) and is discarded.
            let mut acc: __m128 = _mm_setzero_ps();
            let mut delta_t_pow = 1.0_f32;
            for term in 0..3 {
                let coefficients = _mm_loadu_ps(center[3 * term..3 * term + 4].as_ptr());
                acc = _mm_add_ps(acc, _mm_mul_ps(coefficients, _mm_set1_ps(delta_t_pow)));
                delta_t_pow *= delta_t;
            }
            _mm_storeu_ps(lanes.as_mut_ptr(), acc);

            let distance = spacetime_distance([lanes[0], lanes[1], lanes[2]], row);
            *slot = distance;
            bounds.include(distance);
        }
        bounds
    }
}

#[cfg(all(target_arch = "wasm32", target_feature = "simd128"))]
mod wasm {
    use core::arch::wasm32::{
        f32x4_add, f32x4_extract_lane, f32x4_mul, f32x4_splat, i32x4_extract_lane, i32x4_mul,
        v128, v128_load,
    };

    use super::super::project::spacetime_distance;
    use super::DistanceBounds;
    use crate::centers::{SPACETIME_CENTER_STRIDE, SPACETIME_TIME_SLOT, STATIC_CENTER_STRIDE};

    pub(super) fn project_static(
        indexes: &[u32],
        centers: &[i32],
        row: &[i32; 4],
        distances: &mut [i32],
    ) -> DistanceBounds {
        let mut bounds = DistanceBounds::EMPTY;
        // SAFETY: `row` is four contiguous i32s; v128_load tolerates unaligned pointers.
        let row_lanes = unsafe { v128_load(row.as_ptr() as *const v128) };
        for (&index, slot) in indexes.iter().zip(distances.iter_mut()) {
            let offset = STATIC_CENTER_STRIDE * index as usize;
            let center = &centers[offset..offset + STATIC_CENTER_STRIDE];
            // SAFETY: the slice above is exactly four i32s.
            let center_lanes = unsafe { v128_load(center.as_ptr() as *const v128) };
            let product = i32x4_mul(center_lanes, row_lanes);
            let distance = i32x4_extract_lane::<0>(product)
                .wrapping_add(i32x4_extract_lane::<1>(product))
                .wrapping_add(i32x4_extract_lane::<2>(product));
            *slot = distance;
            bounds.include(distance);
        }
        bounds
    }

    pub(super) fn project_spacetime(
        indexes: &[u32],
        centers: &[f32],
        timestamp: f32,
        row: &[f32; 4],
        distances: &mut [i32],
    ) -> DistanceBounds {
        let mut bounds = DistanceBounds::EMPTY;
        for (&index, slot) in indexes.iter().zip(distances.iter_mut()) {
            let offset = SPACETIME_CENTER_STRIDE * index as usize;
            let center = &centers[offset..offset + SPACETIME_CENTER_STRIDE];
            let delta_t = timestamp - center[SPACETIME_TIME_SLOT];

            let mut acc = f32x4_splat(0.0);
            let mut delta_t_pow = 1.0_f32;
            for term in 0..3 {
                let coefficients = &center[3 * term..3 * term + 4];
                // SAFETY: the slice above is exactly four f32s.
                let lanes = unsafe { v128_load(coefficients.as_ptr() as *const v128) };
                acc = f32x4_add(acc, f32x4_mul(lanes, f32x4_splat(delta_t_pow)));
                delta_t_pow *= delta_t;
            }

            let position = [
                f32x4_extract_lane::<0>(acc),
                f32x4_extract_lane::<1>(acc),
                f32x4_extract_lane::<2>(acc),
            ];
            let distance = spacetime_distance(position, row);
            *slot = distance;
            bounds.include(distance);
        }
        bounds
    }
}
