//! Error types for model-level resource operations.

use thiserror::Error;

use threemf_implicit::{PortType, ResourceId};

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while editing the resource model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A resource with this id already exists.
    #[error("duplicate resource id: {id}")]
    DuplicateResourceId {
        /// The colliding resource id.
        id: ResourceId,
    },

    /// No resource with this id exists.
    #[error("unknown resource: {id}")]
    UnknownResource {
        /// The missing resource id.
        id: ResourceId,
    },

    /// The resource exists but is not an implicit function.
    #[error("resource {id} is not an implicit function")]
    NotAFunction {
        /// The offending resource id.
        id: ResourceId,
    },

    /// The function does not expose the named output channel.
    #[error("function {function} has no output channel {channel}")]
    UnknownChannel {
        /// The referenced function.
        function: ResourceId,
        /// The missing output identifier.
        channel: String,
    },

    /// The named output channel has the wrong type for its consumer.
    #[error("channel {channel} of function {function} must be {expected}, got {actual}")]
    ChannelTypeMismatch {
        /// The referenced function.
        function: ResourceId,
        /// The output identifier.
        channel: String,
        /// Type the consumer requires.
        expected: PortType,
        /// Type the channel actually has.
        actual: PortType,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn channel_mismatch_display() {
        let err = ModelError::ChannelTypeMismatch {
            function: 3,
            channel: "shape".to_string(),
            expected: PortType::Scalar,
            actual: PortType::Vector,
        };
        assert!(err.to_string().contains("shape"));
        assert!(err.to_string().contains("scalar"));
        assert!(err.to_string().contains("vector"));
    }
}
