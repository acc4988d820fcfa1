use foundation::bounds::Aabb3;
use foundation::math::{Mat4, Vec3, mat4_transform_dir, mat4_transform_point};

/// Indexed triangle list, the common output of every model parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    /// Same length as `positions`.
    pub normals: Vec<[f32; 3]>,
    /// Triangle list; length is a multiple of 3.
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    NormalCountMismatch { positions: usize, normals: usize },
    RaggedIndices(usize),
    IndexOutOfRange { index: u32, vertex_count: usize },
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::NormalCountMismatch { positions, normals } => {
                write!(f, "{normals} normals for {positions} positions")
            }
            MeshError::RaggedIndices(n) => write!(f, "index count {n} is not a multiple of 3"),
            MeshError::IndexOutOfRange {
                index,
                vertex_count,
            } => write!(f, "index {index} out of range for {vertex_count} vertices"),
        }
    }
}

impl std::error::Error for MeshError {}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(self.positions.iter())
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if self.normals.len() != self.positions.len() {
            return Err(MeshError::NormalCountMismatch {
                positions: self.positions.len(),
                normals: self.normals.len(),
            });
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::RaggedIndices(self.indices.len()));
        }
        let vertex_count = self.positions.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        Ok(())
    }

    /// Appends `other`, rebasing its indices.
    pub fn append(&mut self, other: Mesh) {
        let base = self.positions.len() as u32;
        self.positions.extend(other.positions);
        self.normals.extend(other.normals);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    pub fn transform(&mut self, m: &Mat4) {
        for p in &mut self.positions {
            *p = mat4_transform_point(m, *p);
        }
        // Fine for the rigid and uniformly scaled node transforms models use.
        for n in &mut self.normals {
            *n = normalize3(mat4_transform_dir(m, *n));
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        let o = offset.to_f32();
        for p in &mut self.positions {
            p[0] += o[0];
            p[1] += o[1];
            p[2] += o[2];
        }
    }

    /// Moves the bounding-box center to the origin; returns the old center.
    pub fn recenter(&mut self) -> Vec3 {
        let center = self.bounds().center();
        self.translate(-center);
        center
    }

    /// Area-weighted smooth normals from the triangle list.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![[0.0f32; 3]; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let (Some(pa), Some(pb), Some(pc)) = (
                self.positions.get(a),
                self.positions.get(b),
                self.positions.get(c),
            ) else {
                continue;
            };
            let n = face_normal_unnormalized(*pa, *pb, *pc);
            for idx in [a, b, c] {
                acc[idx][0] += n[0];
                acc[idx][1] += n[1];
                acc[idx][2] += n[2];
            }
        }
        self.normals = acc
            .into_iter()
            .map(|n| {
                let n = normalize3(n);
                if n == [0.0, 0.0, 0.0] { [0.0, 1.0, 0.0] } else { n }
            })
            .collect();
    }

    /// Axis-aligned cube centered on the origin with flat-shaded faces.
    pub fn cube(size: f32) -> Mesh {
        let h = 0.5 * size;
        // (normal, u axis, v axis) per face; corners wind counter-clockwise
        // when seen from outside.
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];

        let mut mesh = Mesh::new();
        for (n, u, v) in faces {
            let base = mesh.positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                mesh.positions.push([
                    h * (n[0] + su * u[0] + sv * v[0]),
                    h * (n[1] + su * u[1] + sv * v[1]),
                    h * (n[2] + su * u[2] + sv * v[2]),
                ]);
                mesh.normals.push(n);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }
}

pub(crate) fn face_normal_unnormalized(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    [
        ab[1] * ac[2] - ab[2] * ac[1],
        ab[2] * ac[0] - ab[0] * ac[2],
        ab[0] * ac[1] - ab[1] * ac[0],
    ]
}

pub(crate) fn normalize3(v: [f32; 3]) -> [f32; 3] {
    let l = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if l <= f32::EPSILON {
        return [0.0, 0.0, 0.0];
    }
    [v[0] / l, v[1] / l, v[2] / l]
}
