//! Bundle up parameters and their values in a generic way. A scene
//! description is a set of named sections, each carrying typed
//! attributes; required lookups fail with a missing-attribute error,
//! optional lookups fall back to a caller-supplied default.

// std
use std::collections::HashMap;
// xrt
use crate::core::error::XrtError;
use crate::core::geometry::Point3f;
use crate::core::xrt::Float;

#[derive(Debug)]
pub struct ParamSetItem<T> {
    pub name: String,
    pub values: Vec<T>,
}

#[derive(Debug, Default)]
pub struct ParamSet {
    pub name: String,
    pub bools: Vec<ParamSetItem<bool>>,
    pub ints: Vec<ParamSetItem<i32>>,
    pub floats: Vec<ParamSetItem<Float>>,
    pub point3fs: Vec<ParamSetItem<Point3f>>,
    pub strings: Vec<ParamSetItem<String>>,
}

impl ParamSet {
    pub fn new(name: &str) -> Self {
        ParamSet {
            name: String::from(name),
            ..Default::default()
        }
    }
    pub fn add_bool(&mut self, name: &str, value: bool) {
        self.bools.push(ParamSetItem {
            name: String::from(name),
            values: vec![value],
        });
    }
    pub fn add_int(&mut self, name: &str, value: i32) {
        self.ints.push(ParamSetItem {
            name: String::from(name),
            values: vec![value],
        });
    }
    pub fn add_float(&mut self, name: &str, value: Float) {
        self.floats.push(ParamSetItem {
            name: String::from(name),
            values: vec![value],
        });
    }
    pub fn add_floats(&mut self, name: &str, values: Vec<Float>) {
        self.floats.push(ParamSetItem {
            name: String::from(name),
            values,
        });
    }
    pub fn add_point3f(&mut self, name: &str, value: Point3f) {
        self.point3fs.push(ParamSetItem {
            name: String::from(name),
            values: vec![value],
        });
    }
    pub fn add_string(&mut self, name: &str, value: &str) {
        self.strings.push(ParamSetItem {
            name: String::from(name),
            values: vec![String::from(value)],
        });
    }
    pub fn find_one_bool(&self, name: &str, d: bool) -> bool {
        for item in &self.bools {
            if item.name == name && !item.values.is_empty() {
                return item.values[0];
            }
        }
        d
    }
    pub fn find_one_int(&self, name: &str, d: i32) -> i32 {
        for item in &self.ints {
            if item.name == name && !item.values.is_empty() {
                return item.values[0];
            }
        }
        d
    }
    pub fn find_one_float(&self, name: &str, d: Float) -> Float {
        for item in &self.floats {
            if item.name == name && !item.values.is_empty() {
                return item.values[0];
            }
        }
        d
    }
    pub fn find_floats(&self, name: &str) -> Vec<Float> {
        for item in &self.floats {
            if item.name == name {
                return item.values.clone();
            }
        }
        Vec::new()
    }
    pub fn find_one_point3f(&self, name: &str, d: Point3f) -> Point3f {
        for item in &self.point3fs {
            if item.name == name && !item.values.is_empty() {
                return item.values[0];
            }
        }
        d
    }
    pub fn find_one_string(&self, name: &str, d: String) -> String {
        for item in &self.strings {
            if item.name == name && !item.values.is_empty() {
                return item.values[0].clone();
            }
        }
        d
    }
    fn missing(&self, name: &str) -> XrtError {
        XrtError::MissingAttribute {
            section: self.name.clone(),
            attribute: String::from(name),
        }
    }
    pub fn find_required_int(&self, name: &str) -> Result<i32, XrtError> {
        for item in &self.ints {
            if item.name == name && !item.values.is_empty() {
                return Ok(item.values[0]);
            }
        }
        Err(self.missing(name))
    }
    pub fn find_required_float(&self, name: &str) -> Result<Float, XrtError> {
        for item in &self.floats {
            if item.name == name && !item.values.is_empty() {
                return Ok(item.values[0]);
            }
        }
        Err(self.missing(name))
    }
    pub fn find_required_string(&self, name: &str) -> Result<String, XrtError> {
        for item in &self.strings {
            if item.name == name && !item.values.is_empty() {
                return Ok(item.values[0].clone());
            }
        }
        Err(self.missing(name))
    }
}

/// Parsed scene description: the telescope variant plus one `ParamSet`
/// per configuration section (`type`, `sensor`, `mirror`, `surface`,
/// `spider`, `optical`).
#[derive(Debug, Default)]
pub struct SceneDescription {
    pub telescope_type: String,
    pub sections: HashMap<String, ParamSet>,
}

impl SceneDescription {
    pub fn new(telescope_type: &str) -> Self {
        SceneDescription {
            telescope_type: String::from(telescope_type),
            sections: HashMap::new(),
        }
    }
    pub fn insert(&mut self, params: ParamSet) {
        self.sections.insert(params.name.clone(), params);
    }
    pub fn section(&self, name: &str) -> Result<&ParamSet, XrtError> {
        self.sections
            .get(name)
            .ok_or_else(|| XrtError::MissingSection(String::from(name)))
    }
    pub fn opt_section(&self, name: &str) -> Option<&ParamSet> {
        self.sections.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_lookup_falls_back() {
        let mut ps = ParamSet::new("sensor");
        ps.add_float("offset", 120.0);
        assert_eq!(ps.find_one_float("offset", 0.0), 120.0);
        assert_eq!(ps.find_one_float("sensor_x", -1.0), -1.0);
    }

    #[test]
    fn required_lookup_fails_with_context() {
        let ps = ParamSet::new("type");
        let err = ps.find_required_float("focal_length").unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("focal_length"));
        assert!(msg.contains("type"));
    }
}
