/// Binary STL reader and writer
///
/// Layout: 80-byte header (ignored), little-endian `u32` triangle count, then
/// 50 bytes per triangle: normal, three vertices (each 3 x `f32`) and a
/// 2-byte attribute field (ignored).
use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::take,
    number::complete::{le_f32, le_u32},
    sequence::tuple,
    IResult,
};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{StlError, StlResult};
use crate::geometry::Mesh;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// One parsed facet: stored normal and its three corners in file order
type Facet = (Vector3<f32>, [Point3<f32>; 3]);

fn header(input: &[u8]) -> IResult<&[u8], u32> {
    let (input, _) = take(HEADER_LEN)(input)?;
    le_u32(input)
}

fn vector3(input: &[u8]) -> IResult<&[u8], Vector3<f32>> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Vector3::new(x, y, z)))
}

fn facet(input: &[u8]) -> IResult<&[u8], Facet> {
    let (input, normal) = vector3(input)?;
    let (input, (a, b, c)) = tuple((vector3, vector3, vector3))(input)?;
    let (input, _attribute) = take(2usize)(input)?;
    Ok((
        input,
        (normal, [Point3::from(a), Point3::from(b), Point3::from(c)]),
    ))
}

/// Parse a binary STL held in memory.
///
/// The declared triangle count is trusted only as far as the data goes: a
/// stream that ends early fails with [`StlError::Truncated`]. Bytes after the
/// last declared triangle are ignored.
pub fn parse_binary_stl(data: &[u8]) -> StlResult<Mesh> {
    let (mut rest, declared) =
        header(data).map_err(|_| StlError::TruncatedHeader { len: data.len() })?;

    // Never reserve more than the remaining bytes could hold
    let capacity = (declared as usize).min(rest.len() / FACET_LEN);
    let mut mesh = Mesh::with_capacity(capacity);

    for complete in 0..declared {
        let (next, (normal, corners)) =
            facet(rest).map_err(|_| StlError::Truncated { declared, complete })?;
        mesh.push_triangle(normal, corners);
        rest = next;
    }

    if !rest.is_empty() {
        debug!(trailing = rest.len(), "ignoring bytes after the last declared triangle");
    }

    Ok(mesh)
}

/// Read a whole binary STL stream, then parse it
pub fn read_binary_stl<R: Read>(mut reader: R) -> StlResult<Mesh> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    parse_binary_stl(&data)
}

/// Load a binary STL file from disk
pub fn load_stl<P: AsRef<Path>>(path: P) -> StlResult<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| StlError::InvalidPath {
        path: path.to_path_buf(),
        source,
    })?;

    let mesh = read_binary_stl(BufReader::new(file))?;
    info!(
        path = %path.display(),
        triangles = mesh.triangle_count(),
        "loaded STL"
    );
    Ok(mesh)
}

/// Write a mesh as binary STL. Each facet stores its first vertex's normal.
pub fn write_binary_stl<W: Write>(mesh: &Mesh, mut writer: W) -> std::io::Result<()> {
    let mut header = [0u8; HEADER_LEN];
    let tag = b"binary STL written by stlview";
    header[..tag.len()].copy_from_slice(tag);
    writer.write_all(&header)?;
    writer.write_all(&(mesh.triangle_count() as u32).to_le_bytes())?;

    for triangle in mesh.triangles() {
        let normal = triangle[0].normal;
        for value in normal.iter() {
            writer.write_all(&value.to_le_bytes())?;
        }
        for vertex in triangle {
            for value in vertex.position.coords.iter() {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        writer.write_all(&[0u8; 2])?;
    }

    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stl_bytes(count: u32, facets: &[[f32; 12]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&count.to_le_bytes());
        for facet in facets {
            for value in facet {
                data.extend_from_slice(&value.to_le_bytes());
            }
            data.extend_from_slice(&[0xAB, 0xCD]);
        }
        data
    }

    const FACET_A: [f32; 12] = [
        0.0, 0.0, 1.0, // normal
        1.0, 2.0, 3.0, //
        4.0, 5.0, 6.0, //
        7.0, 8.0, 9.0,
    ];
    const FACET_B: [f32; 12] = [
        1.0, 0.0, 0.0, //
        -1.0, -2.0, -3.0, //
        0.0, 0.0, 0.0, //
        0.5, 0.5, 0.5,
    ];

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        // Set triangle count to 0
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let mesh = parse_binary_stl(&data).unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_vertices_follow_file_order_with_flat_normals() {
        let data = stl_bytes(2, &[FACET_A, FACET_B]);
        let mesh = parse_binary_stl(&data).unwrap();

        assert_eq!(mesh.vertex_count(), 6);
        let positions: Vec<[f32; 3]> = mesh
            .vertices()
            .iter()
            .map(|v| [v.position.x, v.position.y, v.position.z])
            .collect();
        assert_eq!(
            positions,
            vec![
                [1.0, 2.0, 3.0],
                [4.0, 5.0, 6.0],
                [7.0, 8.0, 9.0],
                [-1.0, -2.0, -3.0],
                [0.0, 0.0, 0.0],
                [0.5, 0.5, 0.5],
            ]
        );
        assert!(mesh.vertices()[..3].iter().all(|v| v.normal == Vector3::z()));
        assert!(mesh.vertices()[3..].iter().all(|v| v.normal == Vector3::x()));
    }

    #[test]
    fn test_single_triangle_bounding_box() {
        let data = stl_bytes(1, &[FACET_B]);
        let bbox = parse_binary_stl(&data).unwrap().bounding_box().unwrap();
        assert_eq!(bbox.min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(bbox.max, Point3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_short_header_is_rejected() {
        let err = parse_binary_stl(&[0u8; 83]).unwrap_err();
        assert!(matches!(err, StlError::TruncatedHeader { len: 83 }));
    }

    #[test]
    fn test_truncated_triangle_reports_progress() {
        let mut data = stl_bytes(3, &[FACET_A, FACET_B]);
        // Half of a third facet
        data.extend_from_slice(&[0u8; 25]);

        let err = parse_binary_stl(&data).unwrap_err();
        assert!(matches!(
            err,
            StlError::Truncated {
                declared: 3,
                complete: 2
            }
        ));
    }

    #[test]
    fn test_huge_declared_count_fails_cleanly() {
        let data = stl_bytes(u32::MAX, &[FACET_A]);
        let err = parse_binary_stl(&data).unwrap_err();
        assert!(matches!(err, StlError::Truncated { complete: 1, .. }));
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let mut data = stl_bytes(1, &[FACET_A]);
        data.extend_from_slice(b"trailing garbage");
        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_missing_file_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_stl(dir.path().join("missing.stl")).unwrap_err();
        assert!(matches!(err, StlError::InvalidPath { .. }));
    }

    #[test]
    fn test_written_cube_reads_back() {
        let cube = Mesh::cube(3.0);
        let mut data = Vec::new();
        write_binary_stl(&cube, &mut data).unwrap();

        assert_eq!(data.len(), HEADER_LEN + 4 + 12 * FACET_LEN);
        assert_eq!(read_binary_stl(data.as_slice()).unwrap(), cube);
    }
}
