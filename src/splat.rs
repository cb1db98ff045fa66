use glam::Vec3;

use crate::centers::{encode_spacetime_centers, encode_static_centers};

/// How a splat's position evolves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionModel {
    Static,
    SpaceTime,
}

/// A splat whose centre follows a quadratic in `t - time_center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceTimeSplat {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub time_center: f32,
}

impl SpaceTimeSplat {
    pub fn position_at(&self, timestamp: f32) -> Vec3 {
        let dt = timestamp - self.time_center;
        self.position + self.velocity * dt + self.acceleration * (dt * dt)
    }
}

/// Encoded sort centers ready for upload, tagged by layout.
#[derive(Debug, Clone, PartialEq)]
pub enum CenterData {
    Static(Vec<i32>),
    SpaceTime(Vec<f32>),
}

impl CenterData {
    pub fn motion_model(&self) -> MotionModel {
        match self {
            Self::Static(_) => MotionModel::Static,
            Self::SpaceTime(_) => MotionModel::SpaceTime,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SplatCloud {
    Static(Vec<Vec3>),
    SpaceTime(Vec<SpaceTimeSplat>),
}

impl SplatCloud {
    pub fn len(&self) -> usize {
        match self {
            Self::Static(positions) => positions.len(),
            Self::SpaceTime(splats) => splats.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn motion_model(&self) -> MotionModel {
        match self {
            Self::Static(_) => MotionModel::Static,
            Self::SpaceTime(_) => MotionModel::SpaceTime,
        }
    }

    pub fn encode_centers(&self) -> CenterData {
        match self {
            Self::Static(positions) => CenterData::Static(encode_static_centers(positions)),
            Self::SpaceTime(splats) => CenterData::SpaceTime(encode_spacetime_centers(splats)),
        }
    }

    /// Axis-aligned bounding box centre at `timestamp`, or the origin when empty.
    pub fn center_at(&self, timestamp: f32) -> Vec3 {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        let mut grow = |p: Vec3| {
            min = min.min(p);
            max = max.max(p);
        };
        match self {
            Self::Static(positions) => positions.iter().copied().for_each(&mut grow),
            Self::SpaceTime(splats) => splats
                .iter()
                .for_each(|splat| grow(splat.position_at(timestamp))),
        }
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (min + max) * 0.5
        }
    }
}
