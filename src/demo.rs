use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::splat::{SpaceTimeSplat, SplatCloud};

// --- Demo scene generators ---

fn random_sphere_point(rng: &mut impl Rng) -> Vec3 {
    let z = rng.random_range(-1.0_f32..1.0_f32);
    let theta = rng.random_range(0.0_f32..TAU);
    let r = (1.0 - z * z).sqrt();
    Vec3::new(r * theta.cos(), z, r * theta.sin())
}

fn jitter(rng: &mut impl Rng, amount: f32) -> Vec3 {
    Vec3::new(
        rng.random_range(-amount..amount),
        rng.random_range(-amount..amount),
        rng.random_range(-amount..amount),
    )
}

fn torus_knot_positions(rng: &mut impl Rng, count: usize) -> Vec<Vec3> {
    let p = 2.0;
    let q = 3.0;
    let major = 1.4;
    let minor = 0.38;

    (0..count)
        .map(|i| {
            let t = i as f32 / count.max(1) as f32 * TAU * 2.0;
            let base = Vec3::new(
                (major + minor * (q * t).cos()) * (p * t).cos(),
                minor * (q * t).sin(),
                (major + minor * (q * t).cos()) * (p * t).sin(),
            );
            base + jitter(rng, 0.04)
        })
        .collect()
}

fn sphere_cluster_positions(rng: &mut impl Rng, count: usize) -> Vec<Vec3> {
    let centers = [
        Vec3::new(1.8, 0.3, 0.4),
        Vec3::new(-1.6, -0.2, 0.8),
        Vec3::new(0.3, 1.2, -1.6),
        Vec3::new(-0.5, -1.0, -1.4),
    ];

    (0..count)
        .map(|i| {
            let center = centers[i % centers.len()];
            let dir = random_sphere_point(rng);
            let radius = rng.random::<f32>().cbrt() * rng.random_range(0.5_f32..1.4_f32);
            center + dir * radius + jitter(rng, 0.03)
        })
        .collect()
}

/// Two thirds torus knot, one third sphere clusters.
pub fn generate_static_positions(count: usize, seed: u64) -> Vec<Vec3> {
    let mut rng = StdRng::seed_from_u64(seed);
    let knot = count * 2 / 3;
    let mut positions = torus_knot_positions(&mut rng, knot);
    positions.extend(sphere_cluster_positions(&mut rng, count - knot));
    positions
}

/// The static scene with drifting splats, each centred somewhere in `[0, 1)` time.
pub fn generate_spacetime_splats(count: usize, seed: u64) -> Vec<SpaceTimeSplat> {
    let positions = generate_static_positions(count, seed);
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    positions
        .into_iter()
        .map(|position| SpaceTimeSplat {
            position,
            velocity: jitter(&mut rng, 0.8),
            acceleration: jitter(&mut rng, 0.3),
            time_center: rng.random_range(0.0_f32..1.0_f32),
        })
        .collect()
}

pub fn generate_demo_cloud(count: usize, seed: u64, spacetime: bool) -> SplatCloud {
    if spacetime {
        SplatCloud::SpaceTime(generate_spacetime_splats(count, seed))
    } else {
        SplatCloud::Static(generate_static_positions(count, seed))
    }
}
