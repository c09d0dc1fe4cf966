//! Lobster-eye assembly: a curved micro-pore plate in front of a
//! detector. The plate mesh only locates the entry point; once a
//! photon enters a channel the square-pore sub-tracer takes over and
//! hands back the exit ray.

// others
use log::info;
// xrt
use crate::core::error::XrtError;
use crate::core::geometry::Ray;
use crate::core::paramset::SceneDescription;
use crate::core::pore::Pore;
use crate::core::rng::Rng;
use crate::core::scene::Scene;
use crate::core::sensor::SensorSpec;
use crate::core::xrt::Float;
use crate::telescopes::{attach_mesh_section, TraceOutcome};

const LOBSTER_DEPTH: u32 = 5;

#[derive(Debug)]
pub struct LobsterEyeTelescope {
    scene: Scene,
    sensor_id: u32,
    spider_id: Option<u32>,
    /// geometry id of the micro-pore plate mesh
    optic_id: u32,
    pore: Pore,
    focal_length: Float,
}

impl LobsterEyeTelescope {
    pub fn create(desc: &SceneDescription) -> Result<Self, XrtError> {
        let type_params = desc.section("type")?;
        let focal_length = type_params.find_required_float("focal_length")?;
        let pore = Pore::new(
            type_params.find_required_float("pore_width")?,
            type_params.find_required_float("pore_length")?,
        );

        let mut scene = Scene::new();
        let sensor_params = desc.section("sensor")?;
        let sensor_id = if sensor_params.find_one_bool("mesh", false) {
            attach_mesh_section(&mut scene, sensor_params)?
        } else {
            let spec = SensorSpec::Plane {
                d: sensor_params.find_one_float("offset", 0.0),
                extent_x: sensor_params.find_required_float("sensor_x")?,
                extent_y: sensor_params.find_required_float("sensor_y")?,
            };
            spec.attach(&mut scene)?
        };
        let spider_id = match desc.opt_section("spider") {
            Some(spider) => Some(attach_mesh_section(&mut scene, spider)?),
            None => None,
        };
        let optic_id = attach_mesh_section(&mut scene, desc.section("optical")?)?;
        scene.commit();
        info!(
            "lobster-eye assembly: plate of {} x {} channels, focal length {} mm",
            pore.width, pore.length, focal_length
        );
        Ok(LobsterEyeTelescope {
            scene,
            sensor_id,
            spider_id,
            optic_id,
            pore,
            focal_length,
        })
    }
    pub fn trace(&self, mut ray: Ray, rng: &mut Rng) -> (TraceOutcome, Ray) {
        let mut depth: u32 = LOBSTER_DEPTH;
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
                // a photon that skirted the plate is no detection
                if depth == LOBSTER_DEPTH {
                    return (TraceOutcome::Missed, ray);
                }
                ray.o = ray.position(ray.t_far);
                return (TraceOutcome::SensorHit, ray);
            }
            if Some(id) == self.spider_id {
                return (TraceOutcome::Obstructed, ray);
            }
            if id == self.optic_id {
                ray.o = ray.position(ray.t_far);
                if !self.pore.trace(&mut ray, rng) {
                    return (TraceOutcome::Missed, ray);
                }
            }
            depth -= 1;
        }
        (TraceOutcome::DepthExhausted, ray)
    }
    pub fn focal_length(&self) -> Float {
        self.focal_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Point3f, Vector3f};
    use crate::core::paramset::ParamSet;
    use std::io::Write;

    /// A single square facet at `z = plate_z`, facing +z.
    fn write_plate_ply(path: &std::path::Path, plate_z: Float, half: Float) {
        let mut f = std::fs::File::create(path).unwrap();
        writeln!(f, "ply").unwrap();
        writeln!(f, "format ascii 1.0").unwrap();
        writeln!(f, "element vertex 4").unwrap();
        writeln!(f, "property float x").unwrap();
        writeln!(f, "property float y").unwrap();
        writeln!(f, "property float z").unwrap();
        writeln!(f, "element face 2").unwrap();
        writeln!(f, "property list uchar int vertex_indices").unwrap();
        writeln!(f, "end_header").unwrap();
        writeln!(f, "{} {} {}", -half, -half, plate_z).unwrap();
        writeln!(f, "{} {} {}", half, -half, plate_z).unwrap();
        writeln!(f, "{} {} {}", half, half, plate_z).unwrap();
        writeln!(f, "{} {} {}", -half, half, plate_z).unwrap();
        writeln!(f, "3 0 1 2").unwrap();
        writeln!(f, "3 0 2 3").unwrap();
    }

    fn lobster_description(plate_path: &str) -> SceneDescription {
        let mut desc = SceneDescription::new("lobster_eye");
        let mut type_params = ParamSet::new("type");
        type_params.add_float("focal_length", 375.0);
        type_params.add_float("pore_width", 0.02);
        type_params.add_float("pore_length", 10.0);
        desc.insert(type_params);
        let mut sensor = ParamSet::new("sensor");
        sensor.add_float("offset", 50.0);
        sensor.add_float("sensor_x", 400.0);
        sensor.add_float("sensor_y", 400.0);
        desc.insert(sensor);
        let mut optical = ParamSet::new("optical");
        optical.add_string("path", plate_path);
        desc.insert(optical);
        desc
    }

    #[test]
    fn axial_photon_passes_the_plate_and_lands_on_the_sensor() {
        let dir = std::env::temp_dir().join("rs_xrt_lobster_axial");
        std::fs::create_dir_all(&dir).unwrap();
        let plate = dir.join("plate.ply");
        write_plate_ply(&plate, 100.0, 50.0);
        let telescope =
            LobsterEyeTelescope::create(&lobster_description(plate.to_str().unwrap())).unwrap();
        let mut rng = Rng::new();
        // aim along the channel axis: the photon runs straight down
        // the pore, exits unbent, and continues to z = -50
        let entry = Point3f::new(10.0, -10.0, 100.0);
        let radial = Vector3f::new(entry.x, entry.y, entry.z).normalize();
        let ray = Ray::new(entry + radial * 150.0, -radial, 1000.0);
        let (outcome, ray) = telescope.trace(ray, &mut rng);
        assert_eq!(outcome, TraceOutcome::SensorHit);
        assert!((ray.o.z + 50.0).abs() < 1.0e-9);
        // plate entry, channel floor, detector
        assert_eq!(ray.history.len(), 3);
        assert_eq!(ray.history[1].id, crate::core::pore::CHANNEL_ID_OFFSET + 5);
        assert!((ray.d - (-radial)).length() < 1.0e-9);
    }

    #[test]
    fn direct_sensor_hit_is_rejected() {
        let dir = std::env::temp_dir().join("rs_xrt_lobster_direct");
        std::fs::create_dir_all(&dir).unwrap();
        let plate = dir.join("plate.ply");
        write_plate_ply(&plate, 100.0, 50.0);
        let telescope =
            LobsterEyeTelescope::create(&lobster_description(plate.to_str().unwrap())).unwrap();
        let mut rng = Rng::new();
        // outside the plate footprint, straight onto the detector
        let ray = Ray::new(
            Point3f::new(120.0, 0.0, 250.0),
            Vector3f::new(0.0, 0.0, -1.0),
            1000.0,
        );
        let (outcome, ray) = telescope.trace(ray, &mut rng);
        assert_eq!(outcome, TraceOutcome::Missed);
        assert_eq!(ray.history.len(), 1);
    }

    #[test]
    fn missing_optical_section_is_an_error() {
        let mut desc = SceneDescription::new("lobster_eye");
        let mut type_params = ParamSet::new("type");
        type_params.add_float("focal_length", 375.0);
        type_params.add_float("pore_width", 0.02);
        type_params.add_float("pore_length", 10.0);
        desc.insert(type_params);
        let mut sensor = ParamSet::new("sensor");
        sensor.add_float("sensor_x", 400.0);
        sensor.add_float("sensor_y", 400.0);
        desc.insert(sensor);
        let err = LobsterEyeTelescope::create(&desc).unwrap_err();
        assert!(format!("{}", err).contains("optical"));
    }
}
