//! Resource model for 3MF volumetric documents.
//!
//! The model owns every resource: implicit functions, mesh placeholders,
//! level sets and volumetric data blocks. It implements the
//! [`threemf_implicit::ResourceStore`] trait so the function validator can
//! resolve cross-resource references, and adds model-level validation of
//! the level-set / color / property channel bindings.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Example
//!
//! ```
//! use threemf_model::Model;
//! use threemf_implicit::PortType;
//!
//! let mut model = Model::new();
//! let mesh = model.add_mesh("pyramid");
//! let fid = model.add_implicit_function("sphere field");
//!
//! let f = model.function_mut(fid).unwrap();
//! f.add_input("pos", "position", PortType::Vector).unwrap();
//! f.add_output("shape", "shape", PortType::Scalar).unwrap();
//!
//! // A level set binds the function's scalar output against the mesh.
//! // (The binding below fails validation until "shape" has a source.)
//! let level_set = model.add_level_set(mesh, fid, "shape").unwrap();
//! assert!(model.resource(level_set).is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod model;
mod resources;

pub use error::{ModelError, ModelResult};
pub use model::Model;
pub use resources::{
    LevelSet, MeshResource, Resource, VolumeData, VolumetricColor, VolumetricProperty,
};
