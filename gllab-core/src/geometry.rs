/// Geometry primitives for 3D rendering
use nalgebra::{Point3, Vector3};
use thiserror::Error;

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding of the positions, or zero for a degenerate face
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let [v0, v1, v2] = self.vertices.map(|v| v.position);
        (v1 - v0)
            .cross(&(v2 - v0))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// A 3D mesh composed of standalone triangles
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("{name} holds {len} floats, not a multiple of {stride}")]
    RaggedBuffer {
        name: &'static str,
        len: usize,
        stride: usize,
    },

    #[error("{name} describes {found} vertices but positions describe {expected}")]
    AttributeCountMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("index {index} exceeds vertex count {count}")]
    IndexOutOfRange { index: u32, count: usize },

    #[error("index count {0} is not a multiple of 3")]
    IncompleteTriangle(usize),
}

/// Flat vertex attribute arrays plus a triangle index list, laid out for
/// direct upload into GPU buffers.
///
/// `normals`, `tex_coords` and `colors` are either empty or hold one entry
/// per position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedGeometry {
    /// xyz triples
    pub positions: Vec<f32>,
    /// xyz triples
    pub normals: Vec<f32>,
    /// uv pairs
    pub tex_coords: Vec<f32>,
    /// rgba quads
    pub colors: Vec<f32>,
    pub indices: Vec<u32>,
}

impl IndexedGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_tex_coords(&self) -> bool {
        !self.tex_coords.is_empty()
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// Check the buffers agree with each other before they are uploaded.
    pub fn validate(&self) -> Result<(), GeometryError> {
        check_stride("positions", &self.positions, 3)?;
        let count = self.vertex_count();

        for (name, data, stride) in [
            ("normals", &self.normals, 3),
            ("tex_coords", &self.tex_coords, 2),
            ("colors", &self.colors, 4),
        ] {
            if data.is_empty() {
                continue;
            }
            check_stride(name, data, stride)?;
            if data.len() / stride != count {
                return Err(GeometryError::AttributeCountMismatch {
                    name,
                    expected: count,
                    found: data.len() / stride,
                });
            }
        }

        if self.indices.len() % 3 != 0 {
            return Err(GeometryError::IncompleteTriangle(self.indices.len()));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(GeometryError::IndexOutOfRange { index, count });
        }
        Ok(())
    }

    fn position(&self, index: usize) -> Point3<f32> {
        let p = &self.positions[index * 3..index * 3 + 3];
        Point3::new(p[0], p[1], p[2])
    }

    fn normal(&self, index: usize) -> Option<Vector3<f32>> {
        self.normals
            .get(index * 3..index * 3 + 3)
            .map(|n| Vector3::new(n[0], n[1], n[2]))
    }

    /// Expand into standalone triangles. Faces without per-vertex normals get
    /// their face normal. Indices that fall outside the positions are skipped.
    pub fn to_mesh(&self) -> Mesh {
        let count = self.vertex_count();
        let mut mesh = Mesh::with_capacity(self.triangle_count());

        for face in self.indices.chunks_exact(3) {
            if face.iter().any(|&i| i as usize >= count) {
                continue;
            }
            let corners = [face[0], face[1], face[2]].map(|i| i as usize);
            let mut triangle = Triangle::new(
                Vertex::new(self.position(corners[0]), Vector3::zeros()),
                Vertex::new(self.position(corners[1]), Vector3::zeros()),
                Vertex::new(self.position(corners[2]), Vector3::zeros()),
            );

            let face_normal = triangle.calculate_normal();
            for (vertex, &corner) in triangle.vertices.iter_mut().zip(&corners) {
                vertex.normal = self.normal(corner).unwrap_or(face_normal);
            }
            mesh.add_triangle(triangle);
        }

        mesh
    }

    /// Single white triangle in the XY plane.
    pub fn triangle() -> Self {
        Self {
            positions: vec![0.0, 1.0, 0.0, -1.0, -1.0, 0.0, 1.0, -1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            colors: [1.0; 12].to_vec(),
            indices: vec![0, 1, 2],
            ..Self::default()
        }
    }

    /// Unit square in the XY plane, two triangles.
    pub fn square() -> Self {
        Self {
            positions: vec![
                1.0, 1.0, 0.0, //
                -1.0, 1.0, 0.0, //
                1.0, -1.0, 0.0, //
                -1.0, -1.0, 0.0,
            ],
            normals: [0.0, 0.0, 1.0].repeat(4),
            tex_coords: vec![1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            colors: [0.5, 0.5, 1.0, 1.0].repeat(4),
            indices: vec![0, 1, 2, 2, 1, 3],
        }
    }

    /// Four-sided pyramid with red apex and green/blue base corners.
    pub fn pyramid() -> Self {
        let apex = [0.0, 1.0, 0.0];
        let front_left = [-1.0, -1.0, 1.0];
        let front_right = [1.0, -1.0, 1.0];
        let back_right = [1.0, -1.0, -1.0];
        let back_left = [-1.0, -1.0, -1.0];

        let faces = [
            [apex, front_left, front_right],
            [apex, front_right, back_right],
            [apex, back_right, back_left],
            [apex, back_left, front_left],
        ];

        const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
        const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
        const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
        let face_colors = [
            [RED, GREEN, BLUE],
            [RED, BLUE, GREEN],
            [RED, GREEN, BLUE],
            [RED, BLUE, GREEN],
        ];

        let mut geometry = Self::default();
        for (face, colors) in faces.iter().zip(&face_colors) {
            let [a, b, c] = face.map(Point3::from);
            let normal = (b - a)
                .cross(&(c - a))
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vector3::zeros);

            for (corner, color) in face.iter().zip(colors) {
                geometry.positions.extend_from_slice(corner);
                geometry.normals.extend_from_slice(normal.as_slice());
                geometry.colors.extend_from_slice(color);
            }
        }
        geometry.indices = (0..12).collect();
        geometry
    }

    /// Textured, lit cube of edge length `size`, four vertices per face.
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;

        // (normal, four corners counter-clockwise seen from outside, uvs)
        let faces: [([f32; 3], [[f32; 3]; 4], [[f32; 2]; 4]); 6] = [
            (
                [0.0, 0.0, 1.0],
                [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
                [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            ),
            (
                [0.0, 0.0, -1.0],
                [[-h, -h, -h], [-h, h, -h], [h, h, -h], [h, -h, -h]],
                [[1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]],
            ),
            (
                [0.0, 1.0, 0.0],
                [[-h, h, -h], [-h, h, h], [h, h, h], [h, h, -h]],
                [[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
            ),
            (
                [0.0, -1.0, 0.0],
                [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]],
                [[1.0, 1.0], [0.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
            ),
            (
                [1.0, 0.0, 0.0],
                [[h, -h, -h], [h, h, -h], [h, h, h], [h, -h, h]],
                [[1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]],
            ),
            (
                [-1.0, 0.0, 0.0],
                [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]],
                [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            ),
        ];

        let mut geometry = Self::default();
        for (face, (normal, corners, uvs)) in faces.iter().enumerate() {
            let base = (face * 4) as u32;
            for (corner, uv) in corners.iter().zip(uvs) {
                geometry.positions.extend_from_slice(corner);
                geometry.normals.extend_from_slice(normal);
                geometry.tex_coords.extend_from_slice(uv);
                geometry.colors.extend_from_slice(&[1.0, 1.0, 1.0, 1.0]);
            }
            geometry
                .indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        geometry
    }
}

fn check_stride(name: &'static str, data: &[f32], stride: usize) -> Result<(), GeometryError> {
    if data.len() % stride != 0 {
        return Err(GeometryError::RaggedBuffer {
            name,
            len: data.len(),
            stride,
        });
    }
    Ok(())
}
