use std::fs;
use std::path::PathBuf;

use glam::Vec3;
use rayon::prelude::*;

use splatsort::camera::{orbit, Camera};
use splatsort::demo::generate_demo_cloud;
use splatsort::parser::load_scene;
use splatsort::{LoadError, Kernel, SortRequest, SorterConfig, SplatCloud, SplatSorter};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("splatsort-{}-{name}", std::process::id()))
}

fn write_splat_file(name: &str, positions: &[Vec3]) -> PathBuf {
    let mut data = Vec::with_capacity(positions.len() * 32);
    for p in positions {
        for v in p.to_array() {
            data.extend_from_slice(&v.to_le_bytes());
        }
        // scale, rgba, rotation
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&[255, 255, 255, 255]);
        data.extend_from_slice(&[255, 128, 128, 128]);
    }
    let path = temp_path(name);
    fs::write(&path, data).expect("temp file should be writable");
    path
}

fn camera_looking_down_neg_z() -> Camera {
    let mut camera = Camera::new(Vec3::ZERO, 0.0, 0.0);
    orbit(&mut camera, Vec3::ZERO, 10.0, std::f32::consts::FRAC_PI_2, 0.0);
    camera
}

#[test]
fn splat_file_sorts_back_to_front() {
    let positions = [
        Vec3::new(0.0, 0.0, 2.0),
        Vec3::new(0.3, 0.0, -4.0),
        Vec3::new(-0.2, 0.1, 0.0),
        Vec3::new(0.0, -0.3, 5.0),
    ];
    let path = write_splat_file("line.splat", &positions);
    let cloud = load_scene(&path).expect("scene should load");
    let _ = fs::remove_file(&path);
    assert_eq!(cloud, SplatCloud::Static(positions.to_vec()));

    let mut sorter = SplatSorter::new(cloud.len(), cloud.motion_model(), SorterConfig::default())
        .expect("sorter should build");
    sorter
        .upload_centers(0, &cloud.encode_centers())
        .expect("upload should fit");

    // Camera at z=10 looking toward -z: the splat at z=-4 is farthest.
    let camera = camera_looking_down_neg_z();
    let request = SortRequest::new(camera.view_projection(1.0), cloud.len());
    let outcome = sorter.sort(&request).expect("sort should succeed");
    assert_eq!(outcome.sorted_indexes, &[1, 2, 0, 3]);
}

#[test]
fn unknown_extension_is_rejected() {
    let err = load_scene(&temp_path("scene.obj")).unwrap_err();
    assert!(matches!(err, LoadError::UnsupportedFormat(_)));
}

#[test]
fn missing_file_reports_path() {
    let path = temp_path("does-not-exist.ply");
    let err = load_scene(&path).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
    assert!(err.to_string().contains("does-not-exist.ply"));
}

#[test]
fn parallel_sorters_match_sequential_results() {
    let cloud = generate_demo_cloud(20_000, 5, true);
    let centers = cloud.encode_centers();

    let sort_view = |view: usize| {
        let config = SorterConfig {
            kernel: Kernel::Auto,
            ..SorterConfig::default()
        };
        let mut sorter =
            SplatSorter::new(cloud.len(), cloud.motion_model(), config).expect("sorter should build");
        sorter.upload_centers(0, &centers).expect("upload should fit");

        let mut camera = Camera::new(Vec3::ZERO, 0.0, 0.0);
        orbit(&mut camera, Vec3::ZERO, 6.0, view as f32 * 0.7, 1.0);
        let mut request = SortRequest::new(camera.view_projection(1.0), cloud.len());
        request.timestamp = view as f32 * 0.1;
        sorter
            .sort(&request)
            .expect("sort should succeed")
            .sorted_indexes
            .to_vec()
    };

    let sequential: Vec<Vec<u32>> = (0..6).map(sort_view).collect();
    let parallel: Vec<Vec<u32>> = (0..6).into_par_iter().map(sort_view).collect();
    assert_eq!(sequential, parallel);
}

#[test]
fn partial_window_keeps_previous_prefix() {
    let cloud = generate_demo_cloud(1_000, 9, false);
    let mut sorter = SplatSorter::new(cloud.len(), cloud.motion_model(), SorterConfig::default())
        .expect("sorter should build");
    sorter
        .upload_centers(0, &cloud.encode_centers())
        .expect("upload should fit");

    let camera = camera_looking_down_neg_z();
    let full = sorter
        .sort(&SortRequest::new(camera.view_projection(1.0), 1_000))
        .expect("sort should succeed")
        .sorted_indexes
        .to_vec();
    sorter.set_indexes(&full).expect("indexes fit");

    let mut request = SortRequest::new(camera.view_projection(1.0), 1_000);
    request.sort_count = 400;
    let outcome = sorter.sort(&request).expect("sort should succeed");
    assert_eq!(outcome.sort_count, 400);
    assert_eq!(&outcome.sorted_indexes[..600], &full[..600]);
}
