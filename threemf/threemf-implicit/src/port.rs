//! Ports, link sources and port handles.
//!
//! A port belongs to exactly one owner: a node side or the function-level
//! input/output lists. Links are stored on the consumer port as a
//! [`PortSource`] naming the producer by stable indices, never by
//! reference, so the ownership graph stays acyclic.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{GraphId, PortType, ResourceId};

/// Producer side of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PortSource {
    /// A function-level input, by position in the function's input list.
    FunctionInput(usize),
    /// An output port of a node.
    NodeOutput {
        /// Graph id of the producing node.
        node: GraphId,
        /// Position of the port in the node's output list.
        port: usize,
    },
}

/// A typed endpoint on a node or on the function boundary.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Port {
    identifier: String,
    display_name: String,
    port_type: PortType,
    default: Option<f64>,
    source: Option<PortSource>,
}

impl Port {
    pub(crate) fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        port_type: PortType,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            port_type,
            default: None,
            source: None,
        }
    }

    /// Identifier of the port, unique within its side of its owner.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Human-readable name of the port.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Semantic type of the port.
    #[must_use]
    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    /// Default value of an input port, if one was set.
    #[must_use]
    pub fn default_value(&self) -> Option<f64> {
        self.default
    }

    pub(crate) fn set_default_value(&mut self, value: f64) {
        self.default = Some(value);
    }

    /// The upstream producer this port is linked to, if any.
    ///
    /// Always `None` for producer-side ports (function inputs, node
    /// outputs).
    #[must_use]
    pub fn source(&self) -> Option<PortSource> {
        self.source
    }

    pub(crate) fn set_source(&mut self, source: PortSource) {
        self.source = Some(source);
    }
}

/// Location of a port within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PortLocation {
    /// A function-level input.
    FunctionInput(usize),
    /// A function-level output.
    FunctionOutput(usize),
    /// An input port of a node.
    NodeInput {
        /// Graph id of the node.
        node: GraphId,
        /// Position of the port in the node's input list.
        port: usize,
    },
    /// An output port of a node.
    NodeOutput {
        /// Graph id of the node.
        node: GraphId,
        /// Position of the port in the node's output list.
        port: usize,
    },
}

/// Stable, copyable reference to a port.
///
/// A handle carries the owning function's resource id so that link
/// operations can reject endpoints from different functions. Handles stay
/// valid for the lifetime of the function; nodes and ports are never
/// removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortHandle {
    pub(crate) function: ResourceId,
    pub(crate) location: PortLocation,
}

impl PortHandle {
    pub(crate) const fn new(function: ResourceId, location: PortLocation) -> Self {
        Self { function, location }
    }

    /// Resource id of the function owning the port.
    #[must_use]
    pub const fn function(&self) -> ResourceId {
        self.function
    }

    /// Location of the port within its function.
    #[must_use]
    pub const fn location(&self) -> PortLocation {
        self.location
    }
}
