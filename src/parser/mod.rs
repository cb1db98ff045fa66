pub mod dot_splat;
pub mod ply;

use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::splat::SplatCloud;

/// Loads a `.ply` or `.splat` scene, choosing the parser by extension.
pub fn load_scene(path: &Path) -> LoadResult<SplatCloud> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "ply" => ply::load_ply_file(path),
        "splat" => dot_splat::load_splat_file(path).map(SplatCloud::Static),
        _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}
