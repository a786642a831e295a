//! Implicit function graphs for the 3MF volumetric extension.
//!
//! An implicit function defines density, color or level-set fields as a
//! directed acyclic graph of typed math nodes, evaluated at a 3D point.
//! This crate provides the in-memory graph model, the static node-type
//! catalog and the validator; numerical evaluation is out of scope.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used
//! in CLI tools, servers, WASM and bindings.
//!
//! # Example
//!
//! ```
//! use threemf_implicit::{ImplicitFunction, PortType};
//!
//! let mut f = ImplicitFunction::new(1, "lattice field");
//! let pos = f.add_input("pos", "position", PortType::Vector).unwrap();
//! let out = f.add_output("distance", "distance", PortType::Scalar).unwrap();
//!
//! let bl = f.add_beam_lattice_node("bl1", "beam lattice", "group_bl").unwrap();
//! f.node_mut(bl).unwrap().set_accurate_range(3.5).unwrap();
//!
//! let bl_pos = f.node(bl).unwrap().input_handle("pos").unwrap();
//! let bl_out = f.node(bl).unwrap().output_handle("distance").unwrap();
//! f.add_link(pos, bl_pos).unwrap();
//! f.add_link(bl_out, out).unwrap();
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod catalog;
mod error;
mod function;
mod node;
mod port;
mod types;
mod validate;

pub use error::{ImplicitError, ImplicitResult};
pub use function::{ImplicitFunction, FUNCTION_INPUTS_PREFIX};
pub use node::Node;
pub use port::{Port, PortHandle, PortLocation, PortSource};
pub use types::{GraphId, NodeConfiguration, NodeType, PortType, ResourceId};
pub use validate::{
    validate, validate_links, validate_ports, validate_references, Diagnostic, DiagnosticKind,
    EmptyStore, ResourceStore,
};
