//! Scene facade the traversal controllers talk to: primitives are
//! attached one by one and receive dense ids, `commit` freezes the
//! scene into a BVH, and `intersect` answers nearest-hit queries.
//! Ids index straight into per-assembly lookup tables, so id `k` is
//! always the k-th attached primitive.

// std
use std::sync::Arc;
// others
use log::debug;
// xrt
use crate::accelerators::bvh::BVHAccel;
use crate::core::geometry::{Bounds3f, Ray};
use crate::shapes::Shape;

const MAX_PRIMS_IN_NODE: usize = 4;

#[derive(Debug)]
pub struct ScenePrimitive {
    pub id: u32,
    pub shape: Shape,
}

impl ScenePrimitive {
    pub fn world_bound(&self) -> Bounds3f {
        self.shape.world_bound()
    }
    /// Forward to the shape; on a committed hit, stamp this
    /// primitive's id into the ray.
    pub fn intersect(&self, ray: &mut Ray) -> bool {
        if self.shape.intersect(ray) {
            ray.hit_id = Some(self.id);
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    staged: Vec<Arc<ScenePrimitive>>,
    accel: Option<BVHAccel>,
}

impl Scene {
    pub fn new() -> Self {
        Scene::default()
    }
    /// Register a primitive and hand back its geometry id.
    pub fn attach(&mut self, shape: Shape) -> u32 {
        let id = self.staged.len() as u32;
        self.staged.push(Arc::new(ScenePrimitive { id, shape }));
        id
    }
    pub fn n_primitives(&self) -> usize {
        self.staged.len()
    }
    /// Freeze the scene. Attaching after commit is a usage error; the
    /// new primitive would be invisible to queries.
    pub fn commit(&mut self) {
        debug!("committing scene with {} primitives", self.staged.len());
        self.accel = Some(BVHAccel::new(self.staged.clone(), MAX_PRIMS_IN_NODE));
    }
    pub fn world_bound(&self) -> Bounds3f {
        match &self.accel {
            Some(accel) => accel.world_bound(),
            None => Bounds3f::default(),
        }
    }
    /// Nearest hit in the committed scene; `false` leaves the ray
    /// untouched.
    pub fn intersect(&self, ray: &mut Ray) -> bool {
        match &self.accel {
            Some(accel) => accel.intersect(ray),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Point3f, Vector3f};
    use crate::shapes::plane::Plane;

    #[test]
    fn ids_are_dense_and_stamped() {
        let mut scene = Scene::new();
        let far = scene.attach(Shape::Plane(Plane::new(0.0, 0.0, 1.0, 20.0, 50.0, 50.0)));
        let near = scene.attach(Shape::Plane(Plane::new(0.0, 0.0, 1.0, 5.0, 50.0, 50.0)));
        assert_eq!(far, 0);
        assert_eq!(near, 1);
        scene.commit();
        let mut ray = Ray::new(
            Point3f::new(0.0, 0.0, 10.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        assert!(scene.intersect(&mut ray));
        // z = -5 is hit before z = -20
        assert_eq!(ray.hit_id, Some(near));
        assert!((ray.t_far - 15.0).abs() < 1.0e-12);
    }

    #[test]
    fn uncommitted_scene_never_hits() {
        let mut scene = Scene::new();
        scene.attach(Shape::Plane(Plane::new(0.0, 0.0, 1.0, 5.0, 50.0, 50.0)));
        let mut ray = Ray::new(
            Point3f::new(0.0, 0.0, 10.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        assert!(!scene.intersect(&mut ray));
    }

    #[test]
    fn bounds_cull_rays_outside_the_detector() {
        let mut scene = Scene::new();
        scene.attach(Shape::Plane(Plane::new(0.0, 0.0, 1.0, 5.0, 10.0, 10.0)));
        scene.commit();
        // the plane is infinite but its world bound is a 10x10 slab
        let mut ray = Ray::new(
            Point3f::new(50.0, 0.0, 10.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        assert!(!scene.intersect(&mut ray));
    }
}
