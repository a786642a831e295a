//! XML codec for 3MF implicit functions and volumetric resources.
//!
//! Reads and writes the `<implicitfunction>` fragment of the volumetric
//! extension, plus the `<levelset>` and `<volumedata>` resources that
//! consume function outputs. The codec operates on `quick-xml` event
//! streams supplied by the surrounding model reader/writer; the OPC
//! package layer and mesh geometry are other subsystems' concerns.
//!
//! # Round-trip guarantees
//!
//! - `parse(serialize(f))` yields a structurally identical function:
//!   same ports, nodes, links and payloads in the same order.
//! - `serialize(parse(x))` reproduces `x` byte for byte when `x` was
//!   emitted by this writer.
//! - Attributes at their schema defaults are omitted on write and
//!   reported at their defaults after read-back.
//!
//! # Example
//!
//! ```
//! use threemf_implicit::{ImplicitFunction, PortType};
//! use threemf_xml::{parse_implicit_function_str, write_implicit_function_str, ReadOptions};
//!
//! let mut f = ImplicitFunction::new(3, "field");
//! f.add_input("pos", "position", PortType::Vector).unwrap();
//! f.add_output("shape", "shape", PortType::Scalar).unwrap();
//!
//! let xml = write_implicit_function_str(&f).unwrap();
//! let (read_back, warnings) = parse_implicit_function_str(&xml, ReadOptions::default()).unwrap();
//! assert!(warnings.is_empty());
//! assert_eq!(read_back.resource_id(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod cancel;
mod error;
mod read;
mod write;

pub use cancel::CancelFlag;
pub use error::{Warning, WarningKind, XmlError, XmlResult};
pub use read::{
    parse_implicit_function_str, parse_resources_str, read_implicit_function, read_level_set,
    read_resources, read_volume_data, ReadOptions,
};
pub use write::{
    write_implicit_function, write_implicit_function_str, write_level_set, write_resources,
    write_resources_str, write_volume_data,
};
