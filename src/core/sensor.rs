//! Detector description. A sensor is either the implicit plane
//! `z = -d` with a finite extent, or an arbitrary triangle mesh; in
//! both cases the traversal only needs the geometry id the sensor got
//! when it was attached to the scene.

// std
use std::path::PathBuf;
// xrt
use crate::core::error::XrtError;
use crate::core::geometry::Vector3f;
use crate::core::scene::Scene;
use crate::core::xrt::Float;
use crate::shapes::plane::Plane;
use crate::shapes::triangle::TriangleMesh;
use crate::shapes::Shape;

#[derive(Debug)]
pub enum SensorSpec {
    Plane {
        d: Float,
        extent_x: Float,
        extent_y: Float,
    },
    Mesh {
        path: PathBuf,
        position: Vector3f,
    },
}

impl SensorSpec {
    /// Build the detector geometry and attach it, returning its id.
    pub fn attach(&self, scene: &mut Scene) -> Result<u32, XrtError> {
        match self {
            SensorSpec::Plane {
                d,
                extent_x,
                extent_y,
            } => Ok(scene.attach(Shape::Plane(Plane::new(
                0.0, 0.0, 1.0, *d, *extent_x, *extent_y,
            )))),
            SensorSpec::Mesh { path, position } => {
                let mesh = TriangleMesh::from_ply(path, *position)?;
                Ok(scene.attach(Shape::TriangleMesh(mesh)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Point3f, Ray};

    #[test]
    fn plane_sensor_attaches_and_detects() {
        let mut scene = Scene::new();
        let spec = SensorSpec::Plane {
            d: 0.0,
            extent_x: 100.0,
            extent_y: 100.0,
        };
        let id = spec.attach(&mut scene).unwrap();
        scene.commit();
        let mut ray = Ray::new(
            Point3f::new(1.0, -2.0, 30.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        assert!(scene.intersect(&mut ray));
        assert_eq!(ray.hit_id, Some(id));
        assert!((ray.t_far - 30.0).abs() < 1.0e-12);
    }
}
