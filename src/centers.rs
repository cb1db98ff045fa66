use glam::Vec3;

use crate::splat::SpaceTimeSplat;

// --- Sort buffer layout ---

/// i32 slots per splat in a static center buffer: `x, y, z, w`.
pub const STATIC_CENTER_STRIDE: usize = 4;
/// f32 slots per splat in a space-time center buffer.
pub const SPACETIME_CENTER_STRIDE: usize = 13;
/// Slot holding the splat's reference time in a space-time center.
pub const SPACETIME_TIME_SLOT: usize = 12;

/// Fixed-point scale applied to static positions.
pub const STATIC_POSITION_SCALE: f32 = 1000.0;
/// Fixed-point scale applied to the view-projection depth row for static sorts.
pub const STATIC_ROW_SCALE: f32 = 1000.0;
/// Scale applied to space-time depths before truncation to i32.
pub const SPACETIME_DISTANCE_SCALE: f32 = 4096.0;

/// Packs a position into fixed-point sort coordinates.
pub fn encode_static_center(position: Vec3) -> [i32; STATIC_CENTER_STRIDE] {
    [
        (position.x * STATIC_POSITION_SCALE).round() as i32,
        (position.y * STATIC_POSITION_SCALE).round() as i32,
        (position.z * STATIC_POSITION_SCALE).round() as i32,
        STATIC_POSITION_SCALE as i32,
    ]
}

pub fn encode_static_centers(positions: &[Vec3]) -> Vec<i32> {
    let mut centers = Vec::with_capacity(positions.len() * STATIC_CENTER_STRIDE);
    for &position in positions {
        centers.extend_from_slice(&encode_static_center(position));
    }
    centers
}

/// Packs a motion polynomial: term `j` of axis `a` at `a + 3j`, then three
/// padding slots, then the reference time.
pub fn encode_spacetime_center(splat: &SpaceTimeSplat) -> [f32; SPACETIME_CENTER_STRIDE] {
    let mut center = [0.0_f32; SPACETIME_CENTER_STRIDE];
    center[0..3].copy_from_slice(&splat.position.to_array());
    center[3..6].copy_from_slice(&splat.velocity.to_array());
    center[6..9].copy_from_slice(&splat.acceleration.to_array());
    center[SPACETIME_TIME_SLOT] = splat.time_center;
    center
}

pub fn encode_spacetime_centers(splats: &[SpaceTimeSplat]) -> Vec<f32> {
    let mut centers = Vec::with_capacity(splats.len() * SPACETIME_CENTER_STRIDE);
    for splat in splats {
        centers.extend_from_slice(&encode_spacetime_center(splat));
    }
    centers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_center_rounds_to_millimetres() {
        let center = encode_static_center(Vec3::new(1.2344, -0.0006, 3.0));
        assert_eq!(center, [1234, -1, 3000, 1000]);
    }

    #[test]
    fn spacetime_center_layout() {
        let splat = SpaceTimeSplat {
            position: Vec3::new(1.0, 2.0, 3.0),
            velocity: Vec3::new(4.0, 5.0, 6.0),
            acceleration: Vec3::new(7.0, 8.0, 9.0),
            time_center: 0.5,
        };
        let center = encode_spacetime_center(&splat);
        assert_eq!(&center[..9], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(&center[9..12], &[0.0, 0.0, 0.0]);
        assert_eq!(center[SPACETIME_TIME_SLOT], 0.5);
    }

    #[test]
    fn slice_encoders_concatenate_records() {
        let centers = encode_static_centers(&[Vec3::ZERO, Vec3::ONE]);
        assert_eq!(centers, vec![0, 0, 0, 1000, 1000, 1000, 1000, 1000]);
    }
}
