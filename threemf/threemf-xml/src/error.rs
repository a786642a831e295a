//! Error and warning types for the XML codec.

use thiserror::Error;

use threemf_implicit::ImplicitError;
use threemf_model::ModelError;

/// Result type for codec operations.
pub type XmlResult<T> = Result<T, XmlError>;

/// Fatal codec errors.
///
/// Recoverable reader defects (unknown elements, unknown attributes) are
/// collected as [`Warning`]s instead; writer defects are always fatal.
#[derive(Debug, Error)]
pub enum XmlError {
    /// Structurally malformed XML.
    #[error("malformed XML: {0}")]
    Malformed(String),

    /// The document ended inside an open element.
    #[error("unexpected end of document in {context}")]
    UnexpectedEof {
        /// The element that was still open.
        context: String,
    },

    /// A required attribute is absent.
    #[error("missing required attribute: {attribute} on <{element}>")]
    MissingAttribute {
        /// The missing attribute name.
        attribute: &'static str,
        /// The element that should carry the attribute.
        element: String,
    },

    /// An attribute value does not parse or violates its constraints.
    #[error("invalid value for {attribute} on <{element}>: {message}")]
    InvalidAttribute {
        /// The attribute with the invalid value.
        attribute: &'static str,
        /// The element carrying the attribute.
        element: String,
        /// Why the value is invalid.
        message: String,
    },

    /// A port reference does not resolve after the second pass.
    #[error("unresolved port reference {reference:?} on node {node}")]
    DanglingReference {
        /// The qualified `node.port` reference string.
        reference: String,
        /// Identifier of the node carrying the reference.
        node: String,
    },

    /// A constraint of the written format is violated.
    #[error("schema violation: {message}")]
    SchemaViolation {
        /// Description of the violated constraint.
        message: String,
    },

    /// The caller aborted the operation through its cancel flag.
    #[error("operation cancelled")]
    Cancelled,

    /// Emitting an event to the output sink failed.
    #[error("XML write error: {0}")]
    Write(String),

    /// Graph construction failed while populating the function.
    #[error(transparent)]
    Graph(#[from] ImplicitError),

    /// Resource insertion failed while populating the model.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl XmlError {
    /// Create a `Malformed` error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Create a `MissingAttribute` error.
    pub fn missing_attribute(attribute: &'static str, element: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute,
            element: element.into(),
        }
    }

    /// Create an `InvalidAttribute` error.
    pub fn invalid_attribute(
        attribute: &'static str,
        element: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            attribute,
            element: element.into(),
            message: message.into(),
        }
    }
}

/// Kind of a recoverable reader defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// An element with an unrecognized name was skipped.
    UnknownElement,
    /// An attribute with an unrecognized name was ignored.
    UnknownAttribute,
    /// A value outside its schema range was clamped.
    ClampedValue,
}

/// A recoverable defect encountered while reading.
#[derive(Debug, Clone)]
pub struct Warning {
    /// Kind of the defect.
    pub kind: WarningKind,
    /// Human-readable description.
    pub message: String,
}

impl Warning {
    pub(crate) fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_attribute_display() {
        let err = XmlError::missing_attribute("identifier", "in");
        assert!(err.to_string().contains("identifier"));
        assert!(err.to_string().contains("<in>"));
    }

    #[test]
    fn dangling_reference_display() {
        let err = XmlError::DanglingReference {
            reference: "later.out".to_string(),
            node: "bl1".to_string(),
        };
        assert!(err.to_string().contains("later.out"));
        assert!(err.to_string().contains("bl1"));
    }
}
