//! Error types for implicit function graph construction and access.

use thiserror::Error;

use crate::types::{NodeConfiguration, NodeType, PortType, ResourceId};

/// Result type for implicit function graph operations.
pub type ImplicitResult<T> = Result<T, ImplicitError>;

/// Errors that can occur while building or accessing an implicit function.
#[derive(Debug, Error)]
pub enum ImplicitError {
    /// An identifier collides with an existing one at add time.
    #[error("duplicate identifier: {identifier} in {context}")]
    DuplicateIdentifier {
        /// The colliding identifier.
        identifier: String,
        /// Where the collision occurred (inputs, outputs or nodes).
        context: String,
    },

    /// An identifier is not usable in a graph.
    #[error("invalid identifier {identifier:?}: {reason}")]
    InvalidIdentifier {
        /// The rejected identifier.
        identifier: String,
        /// Why the identifier was rejected.
        reason: &'static str,
    },

    /// Port semantic types disagree.
    #[error("type mismatch: expected {expected}, got {actual} ({context})")]
    TypeMismatch {
        /// The required port type.
        expected: PortType,
        /// The port type that was found.
        actual: PortType,
        /// Where the mismatch occurred.
        context: String,
    },

    /// A payload accessor was called on an opcode that does not carry
    /// that payload field.
    #[error("{operation} is not available on {node_type} nodes")]
    DomainMismatch {
        /// The accessor that was called.
        operation: &'static str,
        /// The opcode of the node.
        node_type: NodeType,
    },

    /// A payload value was read before it was assigned.
    #[error("uninitialized {what} on node {identifier}")]
    Uninitialized {
        /// What kind of payload was read.
        what: &'static str,
        /// Identifier of the node.
        identifier: String,
    },

    /// A second link was added into an input port.
    #[error("input port already linked: {port} on {context}")]
    AlreadyLinked {
        /// Identifier of the already-linked port.
        port: String,
        /// The node (or function outputs) owning the port.
        context: String,
    },

    /// Link endpoints belong to different functions.
    #[error("cannot link across functions: producer in {producer}, consumer in {consumer}")]
    CrossFunction {
        /// Resource id of the producer's function.
        producer: ResourceId,
        /// Resource id of the consumer's function.
        consumer: ResourceId,
    },

    /// A link endpoint is not a legal producer or consumer.
    #[error("invalid link: {message}")]
    InvalidLink {
        /// Description of the defect.
        message: String,
    },

    /// The requested configuration is not allowed for the opcode.
    #[error("configuration {configuration:?} is not allowed for {node_type} nodes")]
    InvalidConfiguration {
        /// The opcode.
        node_type: NodeType,
        /// The rejected configuration.
        configuration: NodeConfiguration,
    },

    /// A port lookup failed.
    #[error("unknown port: {port} on {context}")]
    UnknownPort {
        /// The missing port identifier.
        port: String,
        /// The node (or function side) that was searched.
        context: String,
    },

    /// A node lookup failed.
    #[error("unknown node: {identifier}")]
    UnknownNode {
        /// The missing node identifier or graph id.
        identifier: String,
    },
}

impl ImplicitError {
    /// Create a `DuplicateIdentifier` error.
    pub fn duplicate_identifier(
        identifier: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::DuplicateIdentifier {
            identifier: identifier.into(),
            context: context.into(),
        }
    }

    /// Create a `TypeMismatch` error.
    pub fn type_mismatch(
        expected: PortType,
        actual: PortType,
        context: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected,
            actual,
            context: context.into(),
        }
    }

    /// Create an `InvalidLink` error.
    pub fn invalid_link(message: impl Into<String>) -> Self {
        Self::InvalidLink {
            message: message.into(),
        }
    }

    /// Create an `UnknownPort` error.
    pub fn unknown_port(port: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownPort {
            port: port.into(),
            context: context.into(),
        }
    }

    /// Create an `UnknownNode` error.
    pub fn unknown_node(identifier: impl Into<String>) -> Self {
        Self::UnknownNode {
            identifier: identifier.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_identifier_display() {
        let err = ImplicitError::duplicate_identifier("x", "nodes of function 7");
        assert!(err.to_string().contains('x'));
        assert!(err.to_string().contains("function 7"));
    }

    #[test]
    fn domain_mismatch_names_the_opcode() {
        let err = ImplicitError::DomainMismatch {
            operation: "set_constant",
            node_type: NodeType::BeamLattice,
        };
        assert!(err.to_string().contains("set_constant"));
        assert!(err.to_string().contains("beamlattice"));
    }

    #[test]
    fn type_mismatch_display() {
        let err = ImplicitError::type_mismatch(
            PortType::Vector,
            PortType::Scalar,
            "link bl1.pos",
        );
        assert!(err.to_string().contains("vector"));
        assert!(err.to_string().contains("scalar"));
    }
}
