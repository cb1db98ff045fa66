use std::fs;
use std::path::Path;

use glam::Vec3;

use crate::error::{LoadError, LoadResult};

const RECORD_SIZE: usize = 32;

fn read_vec3_f32(bytes: &[u8]) -> Vec3 {
    let x = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let y = f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let z = f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    Vec3::new(x, y, z)
}

/// Extracts splat centres from the 32-byte `.splat` record layout.
/// Scale, colour and rotation are not needed for ordering and are skipped.
pub fn parse_splat_bytes(data: &[u8]) -> LoadResult<Vec<Vec3>> {
    if data.len() < RECORD_SIZE {
        return Err(LoadError::Splat("file too small".into()));
    }
    if data.len() % RECORD_SIZE != 0 {
        return Err(LoadError::Splat(format!(
            "size {} is not a multiple of {RECORD_SIZE} bytes ({} complete records)",
            data.len(),
            data.len() / RECORD_SIZE
        )));
    }

    Ok(data
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| read_vec3_f32(&chunk[0..12]))
        .collect())
}

pub fn load_splat_file(path: &Path) -> LoadResult<Vec<Vec3>> {
    let data = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_splat_bytes(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(position: [f32; 3]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(RECORD_SIZE);
        for v in position {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.resize(RECORD_SIZE, 0x80);
        bytes
    }

    #[test]
    fn reads_positions_from_each_record() {
        let mut data = record([1.0, 2.0, 3.0]);
        data.extend(record([-4.0, 0.5, 9.0]));
        let positions = parse_splat_bytes(&data).expect("valid records");
        assert_eq!(
            positions,
            vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(-4.0, 0.5, 9.0)]
        );
    }

    #[test]
    fn rejects_truncated_records() {
        let mut data = record([1.0, 2.0, 3.0]);
        data.push(0);
        assert!(matches!(parse_splat_bytes(&data), Err(LoadError::Splat(_))));
        assert!(matches!(parse_splat_bytes(&[0; 8]), Err(LoadError::Splat(_))));
    }
}
