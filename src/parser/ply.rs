use std::fs;
use std::path::Path;

use glam::Vec3;

use crate::error::{LoadError, LoadResult};
use crate::splat::{SpaceTimeSplat, SplatCloud};

fn ply_error(msg: impl Into<String>) -> LoadError {
    LoadError::Ply(msg.into())
}

#[derive(Debug, Clone, Copy)]
enum PlyType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl PlyType {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "char" | "int8" => Some(Self::Char),
            "uchar" | "uint8" => Some(Self::UChar),
            "short" | "int16" => Some(Self::Short),
            "ushort" | "uint16" => Some(Self::UShort),
            "int" | "int32" => Some(Self::Int),
            "uint" | "uint32" => Some(Self::UInt),
            "float" | "float32" => Some(Self::Float),
            "double" | "float64" => Some(Self::Double),
            _ => None,
        }
    }

    fn size(self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Double => 8,
        }
    }

    fn read_as_f32(self, bytes: &[u8]) -> f32 {
        match self {
            Self::Char => i8::from_le_bytes([bytes[0]]) as f32,
            Self::UChar => bytes[0] as f32,
            Self::Short => i16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            Self::UShort => u16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            Self::Int => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            Self::UInt => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            Self::Float => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            Self::Double => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&bytes[0..8]);
                f64::from_le_bytes(arr) as f32
            }
        }
    }
}

/// Vertex fields the sorter cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    X,
    Y,
    Z,
    /// `motion_0..motion_5`: linear then quadratic coefficients.
    Motion(usize),
    TimeCenter,
    Ignored,
}

impl Field {
    fn from_name(name: &str) -> Self {
        match name {
            "x" => Self::X,
            "y" => Self::Y,
            "z" => Self::Z,
            "trbf_center" => Self::TimeCenter,
            _ => match name.strip_prefix("motion_").and_then(|n| n.parse::<usize>().ok()) {
                Some(n) if n < 6 => Self::Motion(n),
                _ => Self::Ignored,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PlyProperty {
    field: Field,
    ty: PlyType,
}

fn find_ply_header_end(data: &[u8]) -> Option<usize> {
    let marker = b"end_header";
    let pos = data.windows(marker.len()).position(|w| w == marker)?;
    let mut end = pos + marker.len();
    while end < data.len() && data[end] != b'\n' {
        end += 1;
    }
    if end < data.len() {
        end += 1;
    }
    Some(end)
}

struct PlyHeader {
    vertex_count: usize,
    vertex_props: Vec<PlyProperty>,
}

fn parse_header(header_text: &str) -> LoadResult<PlyHeader> {
    let mut is_binary_le = false;
    let mut vertex_count: usize = 0;
    let mut in_vertex_element = false;
    let mut vertex_props = Vec::new();

    for line in header_text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("comment") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0] {
            "format" => {
                if parts.len() >= 2 && parts[1] == "binary_little_endian" {
                    is_binary_le = true;
                }
            }
            "element" => {
                if parts.len() >= 3 {
                    in_vertex_element = parts[1] == "vertex";
                    if in_vertex_element {
                        vertex_count = parts[2]
                            .parse::<usize>()
                            .map_err(|e| ply_error(format!("bad vertex count: {e}")))?;
                    }
                }
            }
            "property" if in_vertex_element => {
                if parts.len() >= 3 && parts[1] == "list" {
                    return Err(ply_error("list properties in vertex element are unsupported"));
                }
                if parts.len() >= 3 {
                    let ty = PlyType::parse(parts[1]).ok_or_else(|| {
                        ply_error(format!("unsupported property type '{}'", parts[1]))
                    })?;
                    vertex_props.push(PlyProperty {
                        field: Field::from_name(parts[2]),
                        ty,
                    });
                }
            }
            _ => {}
        }
    }

    if !is_binary_le {
        return Err(ply_error("only binary_little_endian format is supported"));
    }
    if vertex_count == 0 || vertex_props.is_empty() {
        return Err(ply_error("missing vertex element or properties"));
    }

    Ok(PlyHeader {
        vertex_count,
        vertex_props,
    })
}

/// Parses an in-memory PLY scene.
///
/// A vertex element carrying `trbf_center` and `motion_0..motion_5` yields a
/// space-time cloud; anything else yields static positions.
pub fn parse_ply_bytes(data: &[u8]) -> LoadResult<SplatCloud> {
    let header_end = find_ply_header_end(data).ok_or_else(|| ply_error("missing end_header"))?;
    let header_text = std::str::from_utf8(&data[..header_end])
        .map_err(|e| ply_error(format!("header is not UTF-8: {e}")))?;
    let PlyHeader {
        vertex_count,
        vertex_props,
    } = parse_header(header_text)?;

    let has_field = |f: Field| vertex_props.iter().any(|p| p.field == f);
    let is_spacetime = has_field(Field::TimeCenter);
    if is_spacetime {
        if let Some(n) = (0..6).find(|&n| !has_field(Field::Motion(n))) {
            return Err(ply_error(format!(
                "vertex has trbf_center but no motion_{n} property"
            )));
        }
    }

    let stride: usize = vertex_props.iter().map(|p| p.ty.size()).sum();
    let needed = vertex_count
        .checked_mul(stride)
        .and_then(|bytes| bytes.checked_add(header_end))
        .ok_or_else(|| ply_error("size overflow computing buffer size"))?;
    if data.len() < needed {
        return Err(ply_error(format!(
            "file truncated (need {needed} bytes, have {})",
            data.len()
        )));
    }

    let body = &data[header_end..needed];
    let mut positions = Vec::with_capacity(if is_spacetime { 0 } else { vertex_count });
    let mut splats = Vec::with_capacity(if is_spacetime { vertex_count } else { 0 });

    for chunk in body.chunks_exact(stride) {
        let mut p = Vec3::ZERO;
        let mut motion = [0.0_f32; 6];
        let mut time_center = 0.0_f32;

        let mut cursor = 0;
        for prop in &vertex_props {
            let size = prop.ty.size();
            let value = prop.ty.read_as_f32(&chunk[cursor..cursor + size]);
            cursor += size;

            match prop.field {
                Field::X => p.x = value,
                Field::Y => p.y = value,
                Field::Z => p.z = value,
                Field::Motion(n) => motion[n] = value,
                Field::TimeCenter => time_center = value,
                Field::Ignored => {}
            }
        }

        if is_spacetime {
            splats.push(SpaceTimeSplat {
                position: p,
                velocity: Vec3::new(motion[0], motion[1], motion[2]),
                acceleration: Vec3::new(motion[3], motion[4], motion[5]),
                time_center,
            });
        } else {
            positions.push(p);
        }
    }

    Ok(if is_spacetime {
        SplatCloud::SpaceTime(splats)
    } else {
        SplatCloud::Static(positions)
    })
}

pub fn load_ply_file(path: &Path) -> LoadResult<SplatCloud> {
    let data = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_ply_bytes(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ply(props: &[&str], rows: &[&[f32]]) -> Vec<u8> {
        let mut header = format!(
            "ply\nformat binary_little_endian 1.0\ncomment test\nelement vertex {}\n",
            rows.len()
        );
        for name in props {
            header.push_str(&format!("property float {name}\n"));
        }
        header.push_str("end_header\n");

        let mut data = header.into_bytes();
        for row in rows {
            for v in *row {
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn plain_vertices_load_as_static() {
        let data = ply(
            &["x", "y", "z", "opacity"],
            &[&[1.0, 2.0, 3.0, 0.5], &[4.0, 5.0, 6.0, 0.5]],
        );
        let cloud = parse_ply_bytes(&data).expect("valid ply");
        assert_eq!(
            cloud,
            SplatCloud::Static(vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)])
        );
    }

    #[test]
    fn motion_fields_load_as_spacetime() {
        let props = [
            "x", "y", "z", "motion_0", "motion_1", "motion_2", "motion_3", "motion_4",
            "motion_5", "motion_6", "trbf_center",
        ];
        let row: &[f32] = &[1.0, 2.0, 3.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 9.0, 0.75];
        let cloud = parse_ply_bytes(&ply(&props, &[row])).expect("valid ply");
        assert_eq!(
            cloud,
            SplatCloud::SpaceTime(vec![SpaceTimeSplat {
                position: Vec3::new(1.0, 2.0, 3.0),
                velocity: Vec3::new(0.1, 0.2, 0.3),
                acceleration: Vec3::new(0.4, 0.5, 0.6),
                time_center: 0.75,
            }])
        );
    }

    #[test]
    fn time_center_without_motion_is_an_error() {
        let props = ["x", "y", "z", "motion_0", "motion_1", "motion_2", "trbf_center"];
        let row: &[f32] = &[1.0, 2.0, 3.0, 0.1, 0.2, 0.3, 0.75];
        let err = parse_ply_bytes(&ply(&props, &[row])).unwrap_err();
        assert!(matches!(err, LoadError::Ply(_)));
        assert!(err.to_string().contains("motion_3"), "{err}");
    }

    #[test]
    fn motion_without_time_center_loads_as_static() {
        let props = ["x", "y", "z", "motion_0", "motion_1", "motion_2"];
        let row: &[f32] = &[1.0, 2.0, 3.0, 0.1, 0.2, 0.3];
        let cloud = parse_ply_bytes(&ply(&props, &[row])).expect("valid ply");
        assert_eq!(cloud, SplatCloud::Static(vec![Vec3::new(1.0, 2.0, 3.0)]));
    }

    #[test]
    fn truncated_body_is_an_error() {
        let mut data = ply(&["x", "y", "z"], &[&[1.0, 2.0, 3.0]]);
        data.truncate(data.len() - 2);
        let err = parse_ply_bytes(&data).unwrap_err();
        assert!(err.to_string().contains("truncated"), "{err}");
    }

    #[test]
    fn ascii_format_is_rejected() {
        let data = b"ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nend_header\n1\n";
        assert!(matches!(parse_ply_bytes(data), Err(LoadError::Ply(_))));
    }
}
