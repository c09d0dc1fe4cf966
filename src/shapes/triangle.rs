//! Triangle soups loaded from PLY files: spider obstructions, curved
//! channel plates, and optional mesh detectors. Meshes are baked into
//! world space at load time by adding a fixed translation to every
//! vertex.

// std
use std::fs::File;
use std::io;
use std::path::Path;
// others
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
// xrt
use crate::core::error::XrtError;
use crate::core::geometry::{
    bnd3_union_pnt3, vec3_cross_vec3, vec3_dot_vec3, Bounds3f, Normal3f, Point3f, Ray, Vector3f,
};
use crate::core::xrt::Float;

const DET_EPSILON: Float = 1.0e-12;

#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub n_triangles: usize,
    /// flat index triples, one per triangle
    pub vertex_indices: Vec<u32>,
    /// world-space vertex positions
    pub p: Vec<Point3f>,
}

impl TriangleMesh {
    pub fn new(vertex_indices: Vec<u32>, p: Vec<Point3f>) -> Self {
        TriangleMesh {
            n_triangles: vertex_indices.len() / 3,
            vertex_indices,
            p,
        }
    }
    /// Read a PLY triangle mesh (ASCII or binary) and translate every
    /// vertex by `position`. Polygons with more than three corners are
    /// fan-triangulated.
    pub fn from_ply(path: &Path, position: Vector3f) -> Result<TriangleMesh, XrtError> {
        let mesh_error = |reason: &str| XrtError::MeshLoad {
            path: path.display().to_string(),
            source: io::Error::new(io::ErrorKind::InvalidData, reason.to_string()),
        };
        let mut file = File::open(path).map_err(|source| XrtError::MeshLoad {
            path: path.display().to_string(),
            source,
        })?;
        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut file).map_err(|source| XrtError::MeshLoad {
            path: path.display().to_string(),
            source,
        })?;

        let vertices = ply
            .payload
            .get("vertex")
            .ok_or_else(|| mesh_error("no vertex element"))?;
        let mut p: Vec<Point3f> = Vec::with_capacity(vertices.len());
        for vertex in vertices {
            let coord = |name: &str| -> Result<Float, XrtError> {
                match vertex.get(name) {
                    Some(Property::Float(v)) => Ok(*v as Float),
                    Some(Property::Double(v)) => Ok(*v),
                    _ => Err(mesh_error("vertex coordinate is not a float")),
                }
            };
            p.push(Point3f::new(
                coord("x")? + position.x,
                coord("y")? + position.y,
                coord("z")? + position.z,
            ));
        }

        let faces = ply
            .payload
            .get("face")
            .ok_or_else(|| mesh_error("no face element"))?;
        let mut vertex_indices: Vec<u32> = Vec::with_capacity(faces.len() * 3);
        for face in faces {
            let list = face
                .get("vertex_indices")
                .or_else(|| face.get("vertex_index"))
                .ok_or_else(|| mesh_error("face without vertex indices"))?;
            let corners: Vec<u32> = match list {
                Property::ListInt(v) => v.iter().map(|i| *i as u32).collect(),
                Property::ListUInt(v) => v.clone(),
                Property::ListShort(v) => v.iter().map(|i| *i as u32).collect(),
                Property::ListUShort(v) => v.iter().map(|i| u32::from(*i)).collect(),
                _ => return Err(mesh_error("unsupported face index type")),
            };
            if corners.len() < 3 {
                return Err(mesh_error("face with fewer than three corners"));
            }
            for window in 1..corners.len() - 1 {
                vertex_indices.push(corners[0]);
                vertex_indices.push(corners[window]);
                vertex_indices.push(corners[window + 1]);
            }
        }
        if vertex_indices.iter().any(|i| *i as usize >= p.len()) {
            return Err(mesh_error("face index out of range"));
        }
        Ok(TriangleMesh::new(vertex_indices, p))
    }
    pub fn world_bound(&self) -> Bounds3f {
        let mut bounds = Bounds3f::default();
        for point in &self.p {
            bounds = bnd3_union_pnt3(&bounds, point);
        }
        bounds
    }
    /// Nearest triangle hit via Moeller-Trumbore; commits `t_far` and
    /// the unflipped winding normal.
    pub fn intersect(&self, ray: &mut Ray) -> bool {
        let mut hit: bool = false;
        for tri in 0..self.n_triangles {
            let p0: Point3f = self.p[self.vertex_indices[3 * tri] as usize];
            let p1: Point3f = self.p[self.vertex_indices[3 * tri + 1] as usize];
            let p2: Point3f = self.p[self.vertex_indices[3 * tri + 2] as usize];
            let e1: Vector3f = p1 - p0;
            let e2: Vector3f = p2 - p0;
            let h: Vector3f = vec3_cross_vec3(&ray.d, &e2);
            let det: Float = vec3_dot_vec3(&e1, &h);
            if det.abs() < DET_EPSILON {
                continue;
            }
            let inv_det: Float = 1.0 / det;
            let s: Vector3f = ray.o - p0;
            let u: Float = inv_det * vec3_dot_vec3(&s, &h);
            if !(0.0..=1.0).contains(&u) {
                continue;
            }
            let q: Vector3f = vec3_cross_vec3(&s, &e1);
            let v: Float = inv_det * vec3_dot_vec3(&ray.d, &q);
            if v < 0.0 || u + v > 1.0 {
                continue;
            }
            let t: Float = inv_det * vec3_dot_vec3(&e2, &q);
            if t < ray.t_near || t > ray.t_far {
                continue;
            }
            ray.t_far = t;
            ray.n = Normal3f::from(vec3_cross_vec3(&e1, &e2).normalize());
            hit = true;
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn quad_mesh(z: Float) -> TriangleMesh {
        let p = vec![
            Point3f::new(-1.0, -1.0, z),
            Point3f::new(1.0, -1.0, z),
            Point3f::new(1.0, 1.0, z),
            Point3f::new(-1.0, 1.0, z),
        ];
        TriangleMesh::new(vec![0, 1, 2, 0, 2, 3], p)
    }

    #[test]
    fn nearest_triangle_wins() {
        let mesh = quad_mesh(2.0);
        let mut ray = Ray::new(
            Point3f::new(0.2, 0.1, 10.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        assert!(mesh.intersect(&mut ray));
        assert!((ray.t_far - 8.0).abs() < 1.0e-12);
    }

    #[test]
    fn ray_outside_the_quad_misses() {
        let mesh = quad_mesh(2.0);
        let mut ray = Ray::new(
            Point3f::new(5.0, 0.0, 10.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        assert!(!mesh.intersect(&mut ray));
    }

    #[test]
    fn ascii_ply_round_trip() {
        let dir = std::env::temp_dir();
        let path = dir.join("rs_xrt_triangle_test.ply");
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, "ply").unwrap();
            writeln!(f, "format ascii 1.0").unwrap();
            writeln!(f, "element vertex 4").unwrap();
            writeln!(f, "property float x").unwrap();
            writeln!(f, "property float y").unwrap();
            writeln!(f, "property float z").unwrap();
            writeln!(f, "element face 1").unwrap();
            writeln!(f, "property list uchar int vertex_indices").unwrap();
            writeln!(f, "end_header").unwrap();
            writeln!(f, "-1 -1 0").unwrap();
            writeln!(f, "1 -1 0").unwrap();
            writeln!(f, "1 1 0").unwrap();
            writeln!(f, "-1 1 0").unwrap();
            writeln!(f, "4 0 1 2 3").unwrap();
        }
        let mesh = TriangleMesh::from_ply(&path, Vector3f::new(0.0, 0.0, 7.0)).unwrap();
        std::fs::remove_file(&path).ok();
        // the quad fans into two triangles, translated to z = 7
        assert_eq!(mesh.n_triangles, 2);
        let b = mesh.world_bound();
        assert!((b.p_min.z - 7.0).abs() < 1.0e-12);
        let mut ray = Ray::new(
            Point3f::new(0.0, 0.0, 10.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        assert!(mesh.intersect(&mut ray));
        assert!((ray.t_far - 3.0).abs() < 1.0e-6);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = TriangleMesh::from_ply(Path::new("/no/such/mesh.ply"), Vector3f::default())
            .unwrap_err();
        assert!(format!("{}", err).contains("/no/such/mesh.ply"));
    }
}
