//! Scene traversal controllers. A telescope owns the committed scene
//! for one optical assembly and walks a photon through it bounce by
//! bounce, up to a fixed depth budget.

pub mod lobster;
pub mod wolter;

// std
use std::f64::consts::FRAC_PI_2;
use std::path::Path;
// xrt
use crate::core::error::XrtError;
use crate::core::geometry::{nrm_angle_vec3, vec3_reflect, Ray, Vector3f};
use crate::core::paramset::{ParamSet, SceneDescription};
use crate::core::rng::Rng;
use crate::core::scene::Scene;
use crate::core::surface::{MicrofacetKind, MicrofacetSurface, SurfaceModel};
use crate::core::xrt::{Float, RAY_EPSILON};
use crate::shapes::triangle::TriangleMesh;
use crate::shapes::Shape;
use crate::telescopes::lobster::LobsterEyeTelescope;
use crate::telescopes::wolter::WolterTelescope;

/// Terminal state of one photon.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TraceOutcome {
    /// Reached the detector after at least one surface interaction.
    SensorHit,
    /// Left the assembly, was absorbed, or hit the detector directly.
    Missed,
    /// Stopped by a support structure.
    Obstructed,
    /// Still bouncing when the depth budget ran out.
    DepthExhausted,
}

#[derive(Debug)]
pub enum Telescope {
    Wolter(WolterTelescope),
    LobsterEye(LobsterEyeTelescope),
}

impl Telescope {
    pub fn create(desc: &SceneDescription) -> Result<Telescope, XrtError> {
        match desc.telescope_type.as_str() {
            "wolter" => Ok(Telescope::Wolter(WolterTelescope::create(desc)?)),
            "lobster_eye" => Ok(Telescope::LobsterEye(LobsterEyeTelescope::create(desc)?)),
            other => Err(XrtError::UnknownTelescope(String::from(other))),
        }
    }
    /// Walk the photon to a terminal state. The returned ray holds the
    /// final position, direction, and bounce history.
    pub fn trace(&self, ray: Ray, rng: &mut Rng) -> (TraceOutcome, Ray) {
        match self {
            Telescope::Wolter(telescope) => telescope.trace(ray, rng),
            Telescope::LobsterEye(telescope) => telescope.trace(ray, rng),
        }
    }
    /// Detections only; everything else is folded into `None`.
    pub fn ray_trace(&self, ray: Ray, rng: &mut Rng) -> Option<Ray> {
        let (outcome, ray) = self.trace(ray, rng);
        if outcome == TraceOutcome::SensorHit {
            Some(ray)
        } else {
            None
        }
    }
    /// Push new scattering parameters to every mirror surface.
    pub fn set_surface_parameters(
        &self,
        distribution: MicrofacetKind,
        shadowing: MicrofacetKind,
        roughness: Float,
        shadowing_roughness: Float,
    ) {
        match self {
            Telescope::Wolter(telescope) => telescope.set_surface_parameters(
                distribution,
                shadowing,
                roughness,
                shadowing_roughness,
            ),
            Telescope::LobsterEye(_) => {}
        }
    }
    pub fn focal_length(&self) -> Float {
        match self {
            Telescope::Wolter(telescope) => telescope.focal_length(),
            Telescope::LobsterEye(telescope) => telescope.focal_length(),
        }
    }
}

/// Specular bounce off the most recent hit. Fails when the normal does
/// not face the incoming ray; such a photon is trapped and dropped.
pub(crate) fn reflect_ray(ray: &mut Ray) -> bool {
    let angle: Float = nrm_angle_vec3(&ray.n, &ray.d);
    if angle - FRAC_PI_2 < 0.0 {
        return false;
    }
    ray.o = ray.position(ray.t_far);
    ray.d = vec3_reflect(&ray.d, &Vector3f::from(ray.n)).normalize();
    ray.reset_interval(RAY_EPSILON);
    true
}

/// Scattering model described by the optional `surface` section.
/// Unknown model names degrade to the perfectly smooth surface.
pub(crate) fn surface_from_params(params: Option<&ParamSet>) -> SurfaceModel {
    let params = match params {
        Some(params) => params,
        None => return SurfaceModel::Dummy,
    };
    match params.find_one_string("model", String::from("dummy")).as_str() {
        "gauss" => SurfaceModel::Gauss {
            factor: params.find_one_float("roughness", 0.0),
        },
        "microfacet" => SurfaceModel::Microfacet(MicrofacetSurface::new(
            params.find_one_float("roughness", 0.0),
            params.find_one_float("shadowing_alpha", 0.0),
            MicrofacetKind::from_name(&params.find_one_string("type", String::from("beckmann"))),
            MicrofacetKind::from_name(
                &params.find_one_string("shadowing", String::from("beckmann")),
            ),
        )),
        _ => SurfaceModel::Dummy,
    }
}

/// Load the PLY mesh a section points at and attach it.
pub(crate) fn attach_mesh_section(
    scene: &mut Scene,
    params: &ParamSet,
) -> Result<u32, XrtError> {
    let path = params.find_required_string("path")?;
    let position = Vector3f::new(
        params.find_one_float("position_x", 0.0),
        params.find_one_float("position_y", 0.0),
        params.find_one_float("position_z", 0.0),
    );
    let mesh = TriangleMesh::from_ply(Path::new(&path), position)?;
    Ok(scene.attach(Shape::TriangleMesh(mesh)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Normal3f, Point3f};

    #[test]
    fn reflect_rejects_back_facing_normal() {
        let mut ray = Ray::new(
            Point3f::new(0.0, 0.0, 5.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        ray.t_far = 5.0;
        // normal pointing along the ray: the surface faces away
        ray.n = Normal3f::new(0.0, 0.0, -1.0);
        assert!(!reflect_ray(&mut ray));
    }

    #[test]
    fn reflect_advances_and_renormalizes() {
        let mut ray = Ray::new(
            Point3f::new(0.0, 0.0, 5.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        ray.t_far = 5.0;
        // jittered, intentionally non-unit normal
        ray.n = Normal3f::new(0.02, 0.0, 1.1);
        assert!(reflect_ray(&mut ray));
        assert_eq!(ray.o, Point3f::new(0.0, 0.0, 0.0));
        assert!((ray.d.length() - 1.0).abs() < 1.0e-12);
        assert!(ray.hit_id.is_none());
        assert_eq!(ray.t_near, RAY_EPSILON);
    }

    #[test]
    fn unknown_surface_model_is_smooth() {
        let mut ps = ParamSet::new("surface");
        ps.add_string("model", "fresnel");
        match surface_from_params(Some(&ps)) {
            SurfaceModel::Dummy => {}
            _ => panic!("expected the smooth fallback"),
        }
    }

    #[test]
    fn unknown_telescope_type_errors() {
        let desc = SceneDescription::new("kirkpatrick_baez");
        let err = Telescope::create(&desc).unwrap_err();
        assert!(format!("{}", err).contains("kirkpatrick_baez"));
    }
}
