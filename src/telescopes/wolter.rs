//! Wolter type I assembly: nested paraboloid/hyperboloid shell pairs
//! ahead of a planar detector. Shell coefficients follow the
//! grazing-incidence closed forms in Pivovaroff et al. 2023,
//! "Geometries for Grazing Incidence Mirrors".

// others
use log::info;
// xrt
use crate::core::error::XrtError;
use crate::core::frame::Frame;
use crate::core::geometry::{Ray, Vector3f};
use crate::core::paramset::SceneDescription;
use crate::core::rng::Rng;
use crate::core::scene::Scene;
use crate::core::sensor::SensorSpec;
use crate::core::surface::{shared, MicrofacetKind, SharedSurface};
use crate::core::xrt::Float;
use crate::shapes::hyperboloid::Hyperboloid;
use crate::shapes::paraboloid::Paraboloid;
use crate::shapes::Shape;
use crate::telescopes::{
    attach_mesh_section, reflect_ray, surface_from_params, TraceOutcome,
};

const WOLTER_DEPTH: u32 = 4;

#[derive(Debug)]
pub struct WolterTelescope {
    scene: Scene,
    sensor_id: u32,
    spider_id: Option<u32>,
    /// geometry id -> scattering model; `None` for non-mirror geometry
    surfaces: Vec<Option<SharedSurface>>,
    focal_length: Float,
}

impl WolterTelescope {
    pub fn create(desc: &SceneDescription) -> Result<Self, XrtError> {
        let type_params = desc.section("type")?;
        let focal_length = type_params.find_required_float("focal_length")?;
        let mirror_height = type_params.find_required_float("mirror_height")?;
        let c: Float = focal_length / 2.0;

        // either explicit shell radii or a uniformly spaced stack
        let explicit: Vec<Float> = match desc.opt_section("mirror") {
            Some(mirror) => mirror.find_floats("positions"),
            None => Vec::new(),
        };
        let exact: bool = !explicit.is_empty();
        let radii: Vec<Float> = if exact {
            explicit
        } else {
            let outer = type_params.find_required_float("outer_diameter")? / 2.0;
            let inner = type_params.find_required_float("inner_diameter")? / 2.0;
            let shells = type_params.find_required_int("mirror_shells")?;
            if shells < 1 {
                return Err(XrtError::MalformedValue {
                    attribute: String::from("mirror_shells"),
                    reason: format!("expected a positive shell count, got {}", shells),
                });
            }
            let spacing: Float = if shells > 1 {
                (outer - inner) / (shells - 1) as Float
            } else {
                0.0
            };
            (0..shells).map(|i| outer - spacing * i as Float).collect()
        };
        for &radius in &radii {
            if !(0.0 < radius && radius < focal_length) {
                return Err(XrtError::MalformedValue {
                    attribute: String::from("positions"),
                    reason: format!(
                        "shell radius {} outside (0, focal_length)",
                        radius
                    ),
                });
            }
        }

        let surface_params = desc.opt_section("surface");
        let mut paraboloids: Vec<Paraboloid> = Vec::with_capacity(radii.len());
        let mut hyperboloids: Vec<Hyperboloid> = Vec::with_capacity(radii.len());
        let mut first_xp_max: Option<Float> = None;
        for &radius in &radii {
            let theta: Float = (radius / focal_length).asin() / 4.0;
            let xp_min: Float = focal_length * (4.0 * theta).cos() + 2.0 * c;
            let xp_max: Float = xp_min + mirror_height;
            let p: Float = radius * theta.tan();
            let yp_max: Float = (p * (2.0 * xp_max + p)).sqrt();
            let a: Float = focal_length * (2.0 * (2.0 * theta).cos() - 1.0) / 2.0;
            let b: Float = (c * c - a * a).sqrt();
            let xh_max: Float = xp_min;
            let xh_min: Float = xp_min - mirror_height;
            let yh_min: Float =
                b * ((xh_min - c) * (xh_min - c) / (a * a) - 1.0).sqrt();
            // explicit stacks align every shell top with the first
            let z_offset: Float = match first_xp_max {
                None => {
                    first_xp_max = Some(xp_max);
                    0.0
                }
                Some(first) if exact => first - xp_max,
                Some(_) => 0.0,
            };
            let frame = Frame::from_tilt(0.0, 0.0, Vector3f::new(0.0, 0.0, z_offset));
            paraboloids.push(Paraboloid::new(
                p, theta, xp_min, xp_max, radius, yp_max, frame,
            ));
            hyperboloids.push(Hyperboloid::new(
                a, b, c, theta, xh_min, xh_max, yh_min, radius, frame,
            ));
        }

        let mut scene = Scene::new();
        let mut surfaces: Vec<Option<SharedSurface>> = Vec::new();
        for paraboloid in paraboloids {
            scene.attach(Shape::Paraboloid(paraboloid));
            surfaces.push(Some(shared(surface_from_params(surface_params))));
        }
        for hyperboloid in hyperboloids {
            scene.attach(Shape::Hyperboloid(hyperboloid));
            surfaces.push(Some(shared(surface_from_params(surface_params))));
        }

        let sensor_params = desc.section("sensor")?;
        let sensor_spec = SensorSpec::Plane {
            d: -2.0 * c + sensor_params.find_one_float("offset", 0.0),
            extent_x: sensor_params.find_required_float("sensor_x")?,
            extent_y: sensor_params.find_required_float("sensor_y")?,
        };
        let sensor_id = sensor_spec.attach(&mut scene)?;
        surfaces.push(None);

        let spider_id = match desc.opt_section("spider") {
            Some(spider) => {
                let id = attach_mesh_section(&mut scene, spider)?;
                surfaces.push(None);
                Some(id)
            }
            None => None,
        };
        scene.commit();
        info!(
            "wolter assembly: {} shell pairs, focal length {} mm",
            radii.len(),
            focal_length
        );
        Ok(WolterTelescope {
            scene,
            sensor_id,
            spider_id,
            surfaces,
            focal_length,
        })
    }
    pub fn trace(&self, mut ray: Ray, rng: &mut Rng) -> (TraceOutcome, Ray) {
        let mut depth: u32 = WOLTER_DEPTH;
        while depth > 0 {
            if !self.scene.intersect(&mut ray) {
                return (TraceOutcome::Missed, ray);
            }
            let id = match ray.hit_id {
                Some(id) => id,
                None => return (TraceOutcome::Missed, ray),
            };
            ray.push_history(id);
            if id == self.sensor_id {
                // a photon that saw no mirror is no detection
                if depth == WOLTER_DEPTH {
                    return (TraceOutcome::Missed, ray);
                }
                ray.o = ray.position(ray.t_far);
                return (TraceOutcome::SensorHit, ray);
            }
            if Some(id) == self.spider_id {
                return (TraceOutcome::Obstructed, ray);
            }
            if let Some(Some(surface)) = self.surfaces.get(id as usize) {
                if !surface.read().unwrap().simulate(&mut ray, rng) {
                    return (TraceOutcome::Missed, ray);
                }
            }
            if !reflect_ray(&mut ray) {
                return (TraceOutcome::Missed, ray);
            }
            depth -= 1;
        }
        (TraceOutcome::DepthExhausted, ray)
    }
    pub fn set_surface_parameters(
        &self,
        distribution: MicrofacetKind,
        shadowing: MicrofacetKind,
        roughness: Float,
        shadowing_roughness: Float,
    ) {
        for surface in self.surfaces.iter().flatten() {
            surface.write().unwrap().set_parameters(
                distribution,
                shadowing,
                roughness,
                shadowing_roughness,
            );
        }
    }
    pub fn focal_length(&self) -> Float {
        self.focal_length
    }
    pub fn n_primitives(&self) -> usize {
        self.scene.n_primitives()
    }
}
