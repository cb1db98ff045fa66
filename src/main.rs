use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use glam::Vec3;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use splatsort::camera::{orbit, Camera};
use splatsort::demo::generate_demo_cloud;
use splatsort::parser::load_scene;
use splatsort::sort::simd;
use splatsort::sorter::DEFAULT_DISTANCE_MAP_RANGE;
use splatsort::{CenterData, Kernel, MotionModel, SortRequest, SorterConfig, SplatCloud, SplatSorter};

const ORBIT_STEP: f32 = 0.02;
const ASPECT: f32 = 16.0 / 9.0;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KernelArg {
    Auto,
    Scalar,
    Simd,
}

impl From<KernelArg> for Kernel {
    fn from(arg: KernelArg) -> Self {
        match arg {
            KernelArg::Auto => Kernel::Auto,
            KernelArg::Scalar => Kernel::Scalar,
            KernelArg::Simd => Kernel::Simd,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "splatsort",
    version,
    about = "Sorts a splat scene back-to-front along an orbiting camera and reports timings"
)]
struct Cli {
    /// Path to a .ply or .splat scene file (generates a demo scene if omitted)
    input: Option<PathBuf>,
    #[arg(long, help = "Generate a space-time demo scene", conflicts_with = "input")]
    spacetime: bool,
    #[arg(long, value_name = "N", default_value_t = 100_000, help = "Demo splat count")]
    count: usize,
    #[arg(long, default_value_t = 42, help = "Demo scene seed")]
    seed: u64,
    #[arg(long, default_value_t = 120, help = "Frames to sort per view")]
    frames: usize,
    #[arg(long, default_value_t = 1, help = "Independent views sorted in parallel")]
    views: usize,
    #[arg(long, value_name = "BUCKETS", default_value_t = DEFAULT_DISTANCE_MAP_RANGE)]
    distance_map_range: u32,
    #[arg(long, value_enum, default_value_t = KernelArg::Auto)]
    kernel: KernelArg,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Fraction of the rendered splats re-sorted each frame"
    )]
    sort_fraction: f32,
    #[arg(long, default_value_t = 1.0 / 60.0, help = "Scene time advanced per frame")]
    time_step: f32,
    #[arg(long, default_value_t = 5.0, help = "Camera orbit radius")]
    orbit_radius: f32,
}

#[derive(Debug)]
struct ViewStats {
    view: usize,
    frames: usize,
    total: Duration,
    fastest: Duration,
    slowest: Duration,
}

fn load_cloud(cli: &Cli) -> Result<SplatCloud> {
    match cli.input.as_deref() {
        Some(path) => {
            load_scene(path).with_context(|| format!("loading scene '{}'", path.display()))
        }
        None => Ok(generate_demo_cloud(cli.count, cli.seed, cli.spacetime)),
    }
}

fn check_permutation(order: &[u32], seen: &mut [bool]) -> bool {
    seen.fill(false);
    for &index in order {
        match seen.get_mut(index as usize) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

fn run_view(
    view: usize,
    cli: &Cli,
    cloud: &SplatCloud,
    centers: &CenterData,
    config: SorterConfig,
) -> Result<ViewStats> {
    let count = cloud.len();
    let mut sorter = SplatSorter::new(count, cloud.motion_model(), config)?;
    sorter.upload_centers(0, centers)?;

    let sort_count = (count as f32 * cli.sort_fraction.clamp(0.0, 1.0)).round() as usize;
    let angle_offset = view as f32 * std::f32::consts::TAU / cli.views.max(1) as f32;
    let mut camera = Camera::new(Vec3::ZERO, 0.0, 0.0);
    let mut order = Vec::with_capacity(count);
    let mut seen = vec![false; count];
    let mut stats = ViewStats {
        view,
        frames: 0,
        total: Duration::ZERO,
        fastest: Duration::MAX,
        slowest: Duration::ZERO,
    };

    for frame in 0..cli.frames {
        let timestamp = frame as f32 * cli.time_step;
        let target = cloud.center_at(timestamp);
        let angle = angle_offset + frame as f32 * ORBIT_STEP;
        orbit(&mut camera, target, cli.orbit_radius, angle, cli.orbit_radius * 0.2);

        let request = SortRequest {
            view_projection: camera.view_projection(ASPECT),
            timestamp,
            render_count: count,
            sort_count,
            use_precomputed_distances: false,
        };
        let outcome = sorter.sort(&request)?;
        ensure!(
            check_permutation(outcome.sorted_indexes, &mut seen),
            "view {view} frame {frame}: sorted order is not a permutation"
        );

        stats.frames += 1;
        stats.total += outcome.sort_time;
        stats.fastest = stats.fastest.min(outcome.sort_time);
        stats.slowest = stats.slowest.max(outcome.sort_time);

        // The next frame starts from this order, as a renderer would.
        order.clear();
        order.extend_from_slice(&sorter.sorted_indexes()[..count]);
        sorter.set_indexes(&order)?;
    }

    Ok(stats)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = SorterConfig {
        distance_map_range: cli.distance_map_range,
        kernel: cli.kernel.into(),
    };

    let cloud = load_cloud(&cli)?;
    ensure!(!cloud.is_empty(), "scene contains no splats");
    let centers = cloud.encode_centers();

    let simd_available = match cloud.motion_model() {
        MotionModel::Static => simd::static_available(),
        MotionModel::SpaceTime => simd::spacetime_available(),
    };
    if matches!(config.kernel, Kernel::Simd) && !simd_available {
        warn!("vector lanes unavailable on this target; falling back to the scalar kernel");
    }

    info!(
        splats = cloud.len(),
        model = ?cloud.motion_model(),
        buckets = config.distance_map_range,
        kernel = ?config.kernel,
        simd = simd_available,
        views = cli.views,
        "starting sort run"
    );

    let stats = (0..cli.views.max(1))
        .into_par_iter()
        .map(|view| run_view(view, &cli, &cloud, &centers, config))
        .collect::<Result<Vec<_>>>()?;

    for view in &stats {
        if view.frames == 0 {
            continue;
        }
        let mean = view.total / view.frames as u32;
        info!(
            view = view.view,
            frames = view.frames,
            mean_us = mean.as_micros() as u64,
            fastest_us = view.fastest.as_micros() as u64,
            slowest_us = view.slowest.as_micros() as u64,
            "view finished"
        );
        println!(
            "view {:>2}: {} frames, mean {:.3} ms, fastest {:.3} ms, slowest {:.3} ms",
            view.view,
            view.frames,
            mean.as_secs_f64() * 1e3,
            view.fastest.as_secs_f64() * 1e3,
            view.slowest.as_secs_f64() * 1e3,
        );
    }

    Ok(())
}
