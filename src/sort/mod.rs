//! Linear-time approximate depth ordering.
//!
//! Each frame the active window of the index buffer is projected onto the
//! camera's depth axis, the resulting integer distances are quantized into
//! `frequencies.len()` buckets, and a counting-sort scatter writes the splat
//! indexes farthest-bucket-first into the output buffer.
//!
//! All memory is supplied by the caller. `mapped_distances` is reused in
//! place: it first holds raw distances and is then overwritten with bucket
//! ids, so raw distances do not survive the call.

mod project;
pub mod simd;


pub use project::{depth_row, fixed_point_depth_row, project_distances};

/// Where per-splat depth values come from.
#[derive(Debug, Clone, Copy)]
pub enum DistanceSource<'a> {
    /// Fixed-point positions, four i32 per splat (`x, y, z, w` scaled by 1000).
    Static { centers: &'a [i32] },
    /// Quadratic position polynomials, thirteen f32 per splat.
    SpaceTime { centers: &'a [f32], timestamp: f32 },
    /// Distances already computed by the caller, one i32 per splat index.
    Precomputed { distances: &'a [i32] },
}

/// Projector implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kernel {
    /// Vectorized when the capability check passes, scalar otherwise.
    #[default]
    Auto,
    Scalar,
    /// Requests 128-bit lanes; falls back to scalar if they are unavailable.
    Simd,
}

impl Kernel {
    pub(crate) fn wants_simd(self) -> bool {
        !matches!(self, Self::Scalar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOptions {
    /// Length of the suffix of the index buffer that gets re-sorted.
    pub sort_count: usize,
    /// Number of leading entries of the index buffer that are rendered.
    pub active_count: usize,
    pub kernel: Kernel,
}

impl SortOptions {
    pub fn full(count: usize) -> Self {
        Self {
            sort_count: count,
            active_count: count,
            kernel: Kernel::Auto,
        }
    }

    pub fn sort_start(&self) -> usize {
        self.active_count - self.sort_count
    }
}

/// Running min/max of the raw distances of one sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceBounds {
    pub min: i32,
    pub max: i32,
}

impl DistanceBounds {
    pub const EMPTY: Self = Self {
        min: i32::MAX,
        max: i32::MIN,
    };

    #[inline]
    pub fn include(&mut self, distance: i32) {
        if distance > self.max {
            self.max = distance;
        }
        if distance < self.min {
            self.min = distance;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// `max - min` widened so it cannot overflow. Zero for empty bounds.
    pub fn span(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (i64::from(self.max) - i64::from(self.min)) as u64
        }
    }
}

/// Maps each raw distance to its bucket id in place and counts bucket sizes.
///
/// `bucket = floor((d - min) * (buckets - 1) / (max - min))`, evaluated in
/// exact integer arithmetic and clamped to the last bucket. A degenerate range
/// (`min == max`) sends every element to bucket 0.
pub fn build_histogram(distances: &mut [i32], bounds: DistanceBounds, frequencies: &mut [u32]) {
    let top = frequencies.len() - 1;
    let span = bounds.span();

    if span == 0 {
        for distance in distances.iter_mut() {
            *distance = 0;
        }
        frequencies[0] += distances.len() as u32;
        return;
    }

    let top_wide = top as u64;
    let min = i64::from(bounds.min);
    for distance in distances.iter_mut() {
        // Both factors are below 2^32, so the product fits in u64.
        let offset = (i64::from(*distance) - min) as u64;
        let bucket = ((offset * top_wide / span) as usize).min(top);
        *distance = bucket as i32;
        frequencies[bucket] += 1;
    }
}

/// Turns bucket counts into inclusive prefix sums, in place.
pub fn accumulate_frequencies(frequencies: &mut [u32]) {
    let mut cumulative = frequencies[0];
    for freq in frequencies.iter_mut().skip(1) {
        cumulative += *freq;
        *freq = cumulative;
    }
}

/// Counting-sort scatter of the active window `[sort_start, active_count)`.
///
/// Walks the window backwards. Each element goes to slot
/// `active_count - frequencies[bucket]` and the entry is decremented, so
/// higher buckets land first and, within a bucket, later input lands earlier.
/// Entries before `sort_start` are copied unchanged.
pub fn scatter_indexes(
    indexes: &[u32],
    buckets: &[i32],
    frequencies: &mut [u32],
    sort_start: usize,
    active_count: usize,
    indexes_out: &mut [u32],
) {
    indexes_out[..sort_start].copy_from_slice(&indexes[..sort_start]);

    for i in (sort_start..active_count).rev() {
        let bucket = buckets[i] as usize;
        let remaining = frequencies[bucket];
        indexes_out[active_count - remaining as usize] = indexes[i];
        frequencies[bucket] = remaining - 1;
    }
}

/// Orders the active window of `indexes` by descending bucketed depth.
///
/// * `frequencies` - one counter per bucket; must be zero on entry and is left
///   consumed on exit, so callers clear it before the next call.
/// * `mapped_distances` - scratch indexed by buffer position, at least
///   `active_count` long. Holds bucket ids on return.
/// * `indexes_out` - receives the permutation, at least `active_count` long.
///
/// Precondition violations (fewer than two buckets, `sort_count >
/// active_count`, undersized buffers) panic. The zeroed-frequencies check runs
/// in debug builds only.
pub fn sort_splats(
    indexes: &[u32],
    indexes_out: &mut [u32],
    frequencies: &mut [u32],
    mapped_distances: &mut [i32],
    source: DistanceSource<'_>,
    view_projection: &[f32; 16],
    options: SortOptions,
) -> DistanceBounds {
    let SortOptions {
        sort_count,
        active_count,
        kernel,
    } = options;

    assert!(frequencies.len() > 1, "distance map range must be at least 2");
    assert!(
        sort_count <= active_count,
        "sort count {sort_count} exceeds active count {active_count}"
    );
    assert!(indexes.len() >= active_count, "index buffer shorter than active count");
    assert!(indexes_out.len() >= active_count, "output buffer shorter than active count");
    assert!(
        mapped_distances.len() >= active_count,
        "distance scratch shorter than active count"
    );
    debug_assert!(
        frequencies.iter().all(|&f| f == 0),
        "frequencies must be zeroed before each sort"
    );

    let sort_start = options.sort_start();
    if sort_count == 0 {
        indexes_out[..active_count].copy_from_slice(&indexes[..active_count]);
        return DistanceBounds::EMPTY;
    }

    let window = sort_start..active_count;
    let bounds = project_distances(
        &indexes[window.clone()],
        source,
        view_projection,
        kernel,
        &mut mapped_distances[window.clone()],
    );

    build_histogram(&mut mapped_distances[window], bounds, frequencies);
    accumulate_frequencies(frequencies);
    scatter_indexes(
        indexes,
        mapped_distances,
        frequencies,
        sort_start,
        active_count,
        indexes_out,
    );

    bounds
}
