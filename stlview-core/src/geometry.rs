/// Geometry primitives for the viewer
use nalgebra::{Point3, Vector3};

/// A mesh vertex with position and (flat) normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }

    /// Position followed by normal, the layout uploaded to the GPU
    pub fn interleaved(&self) -> [f32; 6] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.normal.x,
            self.normal.y,
            self.normal.z,
        ]
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for no points
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f32>>,
    {
        let mut points = points.into_iter();
        let first = *points.next()?;

        Some(points.fold(Self { min: first, max: first }, |bbox, p| Self {
            min: bbox.min.inf(p),
            max: bbox.max.sup(p),
        }))
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn extents(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Length of the min-to-max diagonal
    pub fn diagonal(&self) -> f32 {
        self.extents().norm()
    }

    pub fn contains(&self, point: &Point3<f32>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }
}

/// Flat, non-indexed triangle list.
///
/// Every three consecutive vertices form one triangle in file order, and all
/// three carry that triangle's stored normal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve room for `triangles` triangles
    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(triangles * 3),
        }
    }

    /// Append one triangle, duplicating its normal onto each corner
    pub fn push_triangle(&mut self, normal: Vector3<f32>, corners: [Point3<f32>; 3]) {
        self.vertices
            .extend(corners.iter().map(|&position| Vertex::new(position, normal)));
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterate triangles as slices of three vertices
    pub fn triangles(&self) -> impl Iterator<Item = &[Vertex]> + '_ {
        self.vertices.chunks_exact(3)
    }

    /// Bounding box over vertex positions (normals are ignored)
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().map(|v| &v.position))
    }

    /// Axis-aligned cube centered on the origin with outward facing normals
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        let (x, y, z) = (Vector3::x(), Vector3::y(), Vector3::z());

        // (normal, u, v) with u x v == normal so both triangles wind outward
        let faces = [
            (x, y, z),
            (-x, z, y),
            (y, z, x),
            (-y, x, z),
            (z, x, y),
            (-z, y, x),
        ];

        let mut mesh = Self::with_capacity(faces.len() * 2);
        for (normal, u, v) in faces {
            let corner = |su: f32, sv: f32| Point3::from((normal + u * su + v * sv) * half);
            let (a, b, c, d) = (
                corner(-1.0, -1.0),
                corner(1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, 1.0),
            );
            mesh.push_triangle(normal, [a, b, c]);
            mesh.push_triangle(normal, [a, c, d]);
        }

        mesh
    }
}
