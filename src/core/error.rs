//! Error taxonomy of the tracer. Construction-time problems (bad
//! configuration, unreadable meshes, scene build failures) are fatal
//! and propagate to the caller; per-ray outcomes are never errors.

// std
use std::io;
// others
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XrtError {
    #[error("missing section '{0}' in scene description")]
    MissingSection(String),
    #[error("missing required attribute '{attribute}' in section '{section}'")]
    MissingAttribute { section: String, attribute: String },
    #[error("malformed value for '{attribute}': {reason}")]
    MalformedValue { attribute: String, reason: String },
    #[error("unknown telescope type '{0}'")]
    UnknownTelescope(String),
    #[error("failed to load mesh '{path}': {source}")]
    MeshLoad {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("scene build failed: {0}")]
    SceneBuild(String),
    #[error("could not access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}
