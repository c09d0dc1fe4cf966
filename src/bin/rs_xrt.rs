//! Parse a scene file (extension .xrt), build the telescope assembly,
//! and trace a photon batch onto the detector.

use pest_derive::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[grammar = "bin/rs_xrt.pest"]
struct XrtParser;

// parser
use pest::iterators::Pair;
use pest::Parser;

// command line options
use clap::Parser as ClapParser;
// others
use log::{info, warn};
use pbr::ProgressBar;
use rayon::prelude::*;
// xrt
use rs_xrt::core::error::XrtError;
use rs_xrt::core::geometry::{Point3f, Ray, Vector3f};
use rs_xrt::core::paramset::{ParamSet, SceneDescription};
use rs_xrt::core::rng::Rng;
use rs_xrt::core::xrt::{radians, Float};
use rs_xrt::telescopes::Telescope;
// std
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::str::FromStr;

/// Photons are launched this far beyond twice the focal length so
/// every assembly lies inside the ray interval.
const SOURCE_MARGIN: Float = 200.0;
/// Photons per progress-bar tick.
const CHUNK_SIZE: usize = 4096;

/// Trace photon batches through a grazing-incidence X-ray telescope.
#[derive(ClapParser)]
#[command(version, about)]
struct Cli {
    /// The path to the scene description file to read
    scene: PathBuf,
    /// Number of photons to fire
    #[arg(short = 'n', long = "nphotons", default_value = "100000")]
    nphotons: u64,
    /// Side length of the square source aperture in mm
    #[arg(short = 'a', long = "aperture", default_value = "1000.0")]
    aperture: Float,
    /// Off-axis source angle around the y axis in degrees
    #[arg(long = "theta-x", default_value = "0.0", allow_hyphen_values = true)]
    theta_x: Float,
    /// Off-axis source angle around the x axis in degrees
    #[arg(long = "theta-y", default_value = "0.0", allow_hyphen_values = true)]
    theta_y: Float,
    /// Photon energy in eV
    #[arg(short = 'e', long = "energy", default_value = "1000.0")]
    energy: Float,
    /// Base seed of the per-photon random sequences
    #[arg(short = 's', long = "seed", default_value = "0")]
    seed: u64,
    /// Use specified number of threads for tracing
    #[arg(short = 't', long = "nthreads", default_value = "0")]
    nthreads: u8,
    /// Re-fire photons from a CSV of id,ox,oy,oz,dx,dy,dz,energy rows
    /// instead of generating a batch
    #[arg(long = "retrace")]
    retrace: Option<PathBuf>,
    /// The path of the detection list to write
    #[arg(short = 'o', long = "output", default_value = "detections.txt")]
    output: PathBuf,
}

fn parse_values(pairs: Vec<Pair<Rule>>, name: &str) -> Result<Vec<String>, XrtError> {
    let mut values: Vec<String> = Vec::new();
    for value in pairs {
        let variant = value.into_inner().next().ok_or_else(|| XrtError::MalformedValue {
            attribute: String::from(name),
            reason: String::from("empty value"),
        })?;
        let string = match variant.as_rule() {
            Rule::quoted_string => match variant.into_inner().next() {
                Some(inner) => String::from(inner.as_str()),
                None => String::new(),
            },
            _ => String::from(variant.as_str()),
        };
        values.push(string);
    }
    Ok(values)
}

fn add_parameter(params: &mut ParamSet, pair: Pair<Rule>) -> Result<(), XrtError> {
    let mut inner = pair.into_inner();
    let mut typed = match inner.next() {
        Some(typed) => typed.into_inner(),
        None => return Ok(()),
    };
    let type_name = match typed.next() {
        Some(type_name) => String::from(type_name.as_str()),
        None => return Ok(()),
    };
    let name = match typed.next() {
        Some(name) => String::from(name.as_str()),
        None => return Ok(()),
    };
    let malformed = |reason: String| XrtError::MalformedValue {
        attribute: name.clone(),
        reason,
    };
    let values = parse_values(inner.collect(), &name)?;
    match type_name.as_str() {
        "float" => {
            let mut floats: Vec<Float> = Vec::new();
            for value in &values {
                floats.push(
                    Float::from_str(value)
                        .map_err(|_| malformed(format!("expected a float, got {:?}", value)))?,
                );
            }
            params.add_floats(&name, floats);
        }
        "integer" => {
            for value in &values {
                let int = i32::from_str(value)
                    .map_err(|_| malformed(format!("expected an integer, got {:?}", value)))?;
                params.add_int(&name, int);
            }
        }
        "bool" => {
            for value in &values {
                let b = bool::from_str(value)
                    .map_err(|_| malformed(format!("expected a bool, got {:?}", value)))?;
                params.add_bool(&name, b);
            }
        }
        "string" => {
            for value in &values {
                params.add_string(&name, value);
            }
        }
        _ => unreachable!(),
    }
    Ok(())
}

fn parse_scene(content: &str) -> Result<SceneDescription, XrtError> {
    let scene = XrtParser::parse(Rule::scene, content)
        .map_err(|e| XrtError::SceneBuild(format!("{}", e)))?
        .next()
        .ok_or_else(|| XrtError::SceneBuild(String::from("empty scene file")))?;
    let mut desc = SceneDescription::default();
    for pair in scene.into_inner() {
        match pair.as_rule() {
            Rule::raytracer => {
                if let Some(ident) = pair.into_inner().next().and_then(|q| q.into_inner().next()) {
                    desc.telescope_type = String::from(ident.as_str());
                }
            }
            Rule::section => {
                let mut inner = pair.into_inner();
                let name = match inner.next().and_then(|q| q.into_inner().next()) {
                    Some(ident) => String::from(ident.as_str()),
                    None => continue,
                };
                let mut params = ParamSet::new(&name);
                for parameter in inner {
                    add_parameter(&mut params, parameter)?;
                }
                desc.insert(params);
            }
            Rule::EOI => {}
            _ => unreachable!(),
        }
    }
    if desc.telescope_type.is_empty() {
        return Err(XrtError::SceneBuild(String::from(
            "scene file names no telescope",
        )));
    }
    Ok(desc)
}

/// One detection record: the original photon index plus its terminal
/// ray (detector position and bounce history).
struct Detection {
    index: u64,
    ray: Ray,
}

fn write_detections(
    detections: &[Detection],
    output: &PathBuf,
) -> Result<(), std::io::Error> {
    let mut writer = BufWriter::new(File::create(output)?);
    for detection in detections {
        let ray = &detection.ray;
        write!(writer, "{} {} {}", detection.index, ray.o.x, ray.o.y)?;
        for bounce in &ray.history {
            write!(
                writer,
                " {} {} {} {} {} {} {}",
                bounce.o.x, bounce.o.y, bounce.o.z, bounce.d.x, bounce.d.y, bounce.d.z, bounce.id
            )?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn read_retrace_csv(path: &PathBuf, energy: Float) -> Result<Vec<(u64, Ray)>, XrtError> {
    let malformed = |line: usize, reason: String| XrtError::MalformedValue {
        attribute: format!("retrace line {}", line + 1),
        reason,
    };
    let file = File::open(path).map_err(|source| XrtError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut photons: Vec<(u64, Ray)> = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| XrtError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 7 {
            return Err(malformed(
                number,
                format!("expected id,ox,oy,oz,dx,dy,dz[,energy], got {} fields", fields.len()),
            ));
        }
        let mut numbers: Vec<Float> = Vec::new();
        for field in &fields[1..] {
            numbers.push(
                Float::from_str(field)
                    .map_err(|_| malformed(number, format!("expected a float, got {:?}", field)))?,
            );
        }
        let index = u64::from_str(fields[0])
            .map_err(|_| malformed(number, format!("expected an id, got {:?}", fields[0])))?;
        let photon_energy = if numbers.len() > 6 { numbers[6] } else { energy };
        photons.push((
            index,
            Ray::new(
                Point3f::new(numbers[0], numbers[1], numbers[2]),
                Vector3f::new(numbers[3], numbers[4], numbers[5]),
                photon_energy,
            ),
        ));
    }
    Ok(photons)
}

fn trace_batch(telescope: &Telescope, photons: Vec<(u64, Ray)>, seed: u64) -> Vec<Detection> {
    let mut pb = ProgressBar::new(photons.len() as u64);
    let mut detections: Vec<Detection> = Vec::new();
    for chunk in photons.chunks(CHUNK_SIZE) {
        let mut chunk_detections: Vec<Detection> = chunk
            .par_iter()
            .filter_map(|(index, ray)| {
                let mut rng = Rng::new();
                rng.set_sequence(seed.wrapping_add(*index));
                telescope
                    .ray_trace(ray.clone(), &mut rng)
                    .map(|ray| Detection { index: *index, ray })
            })
            .collect();
        detections.append(&mut chunk_detections);
        pb.add(chunk.len() as u64);
    }
    pb.finish_println("");
    detections
}

fn run(args: &Cli) -> Result<(), XrtError> {
    let mut content = String::new();
    File::open(&args.scene)
        .and_then(|mut file| file.read_to_string(&mut content))
        .map_err(|source| XrtError::Io {
            path: args.scene.display().to_string(),
            source,
        })?;
    let desc = parse_scene(&content)?;
    let telescope = Telescope::create(&desc)?;

    let photons: Vec<(u64, Ray)> = match &args.retrace {
        Some(path) => {
            let photons = read_retrace_csv(path, args.energy)?;
            info!("retracing {} photons from {}", photons.len(), path.display());
            photons
        }
        None => {
            let z: Float = 2.0 * telescope.focal_length() + SOURCE_MARGIN;
            let d = Vector3f::new(
                radians(args.theta_x).tan(),
                radians(args.theta_y).tan(),
                -1.0,
            );
            let mut rng = Rng::new();
            rng.set_sequence(args.seed);
            let half: Float = args.aperture / 2.0;
            (0..args.nphotons)
                .map(|index| {
                    let o = Point3f::new(
                        rng.uniform_in_range(-half, half),
                        rng.uniform_in_range(-half, half),
                        z,
                    );
                    (index, Ray::new(o, d, args.energy))
                })
                .collect()
        }
    };
    let n_photons = photons.len();
    let detections = trace_batch(&telescope, photons, args.seed);
    info!(
        "{} of {} photons reached the detector",
        detections.len(),
        n_photons
    );
    if detections.is_empty() {
        warn!("no detections; check the source direction and sensor offset");
    }
    write_detections(&detections, &args.output).map_err(|source| XrtError::Io {
        path: args.output.display().to_string(),
        source,
    })?;
    println!(
        "{} detections written to {}",
        detections.len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WOLTER_SCENE: &str = r#"
# twelve-meter assembly
Raytracer "wolter"
Section "type"
  "float focal_length" [ 12000.0 ]
  "float mirror_height" [ 300.0 ]
  "integer mirror_shells" [ 10 ]
  "float outer_diameter" [ 700.0 ]
  "float inner_diameter" [ 350.0 ]
Section "sensor"
  "float offset" [ 12000.0 ]
  "float sensor_x" [ 100.0 ]
  "float sensor_y" [ 100.0 ]
Section "surface"
  "string model" [ "gauss" ]
  "float roughness" [ 1.0e-7 ]
"#;

    #[test]
    fn scene_file_round_trip() {
        let desc = parse_scene(WOLTER_SCENE).unwrap();
        assert_eq!(desc.telescope_type, "wolter");
        let type_params = desc.section("type").unwrap();
        assert_eq!(type_params.find_required_float("focal_length").unwrap(), 12000.0);
        assert_eq!(type_params.find_required_int("mirror_shells").unwrap(), 10);
        let surface = desc.section("surface").unwrap();
        assert_eq!(surface.find_one_string("model", String::new()), "gauss");
        assert_eq!(surface.find_one_float("roughness", 0.0), 1.0e-7);
    }

    #[test]
    fn float_list_parameter() {
        let scene = "Raytracer \"wolter\"\nSection \"mirror\"\n  \"float positions\" [ 350.0 310.0 270.0 ]\n";
        let desc = parse_scene(scene).unwrap();
        let positions = desc.section("mirror").unwrap().find_floats("positions");
        assert_eq!(positions, vec![350.0, 310.0, 270.0]);
    }

    #[test]
    fn scene_without_raytracer_statement_fails() {
        assert!(parse_scene("Section \"type\"\n").is_err());
    }

    #[test]
    fn malformed_integer_is_reported() {
        let scene = "Raytracer \"wolter\"\nSection \"type\"\n  \"integer mirror_shells\" [ 2.5 ]\n";
        let err = parse_scene(scene).unwrap_err();
        assert!(format!("{}", err).contains("mirror_shells"));
    }

    #[test]
    fn retrace_csv_round_trip() {
        let dir = std::env::temp_dir().join("rs_xrt_retrace");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("photons.csv");
        std::fs::write(
            &path,
            "# id,ox,oy,oz,dx,dy,dz,energy\n3, 1.0, 2.0, 3.0, 0.0, 0.0, -1.0, 500.0\n7,0,0,100,0,0,-1\n",
        )
        .unwrap();
        let photons = read_retrace_csv(&path, 1000.0).unwrap();
        assert_eq!(photons.len(), 2);
        assert_eq!(photons[0].0, 3);
        assert_eq!(photons[0].1.o, Point3f::new(1.0, 2.0, 3.0));
        assert_eq!(photons[0].1.energy, 500.0);
        // energy column is optional and falls back to the default
        assert_eq!(photons[1].1.energy, 1000.0);
    }
}

fn main() {
    env_logger::init();
    let args = Cli::parse();
    let num_cores = num_cpus::get();
    println!("rs_xrt version {} [Detected {} cores]", VERSION, num_cores);
    if args.nthreads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(args.nthreads as usize)
            .build_global()
        {
            warn!("could not limit the thread pool: {}", e);
        }
    }
    if let Err(e) = run(&args) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
