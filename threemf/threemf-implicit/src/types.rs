//! Core identifier and enumeration types for implicit function graphs.
//!
//! These types mirror the 3MF volumetric extension schema: port types use
//! the schema's case-sensitive names, node types use the lowercase element
//! names that appear in the model XML.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of a resource within a 3MF model.
///
/// Resource ids are assigned by the model and are unique within it. The
/// value `0` never names a valid resource and is used as the "unset"
/// sentinel for resource-id payloads.
pub type ResourceId = u32;

/// Stable per-function id of a node in an implicit function graph.
///
/// Graph ids are assigned monotonically on insertion and are never reused
/// within a function. They carry no meaning across functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraphId(pub(crate) u32);

impl GraphId {
    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Semantic type of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PortType {
    /// A single double-precision value.
    Scalar,
    /// A 3-component vector.
    Vector,
    /// A 4x4 matrix.
    Matrix,
    /// A reference to another resource in the model.
    ResourceId,
}

impl PortType {
    /// Parse a port type from its schema name. Case-sensitive.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scalar" => Some(Self::Scalar),
            "vector" => Some(Self::Vector),
            "matrix" => Some(Self::Matrix),
            "resourceID" => Some(Self::ResourceId),
            _ => None,
        }
    }

    /// Schema name of this port type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Vector => "vector",
            Self::Matrix => "matrix",
            Self::ResourceId => "resourceID",
        }
    }
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opcode of a node in an implicit function graph.
///
/// Each variant corresponds to one XML element name in the volumetric
/// extension schema. The catalog module defines the port signature and
/// payload rules for every opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeType {
    /// Component-wise `A + B`.
    Addition,
    /// Component-wise `A - B`.
    Subtraction,
    /// Component-wise `A * B`.
    Multiplication,
    /// Component-wise `A / B`.
    Division,
    /// Component-wise minimum.
    Min,
    /// Component-wise maximum.
    Max,
    /// Floating-point remainder.
    Fmod,
    /// `A` raised to the power `B`.
    Pow,
    /// Two-argument arc tangent.
    Atan2,
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Arc sine.
    Asin,
    /// Arc cosine.
    Acos,
    /// Arc tangent.
    Atan,
    /// Hyperbolic sine.
    Sinh,
    /// Hyperbolic cosine.
    Cosh,
    /// Hyperbolic tangent.
    Tanh,
    /// Round to nearest integer.
    Round,
    /// Round towards positive infinity.
    Ceil,
    /// Round towards negative infinity.
    Floor,
    /// Sign of the argument (-1, 0 or 1).
    Sign,
    /// Fractional part.
    Fract,
    /// Absolute value.
    Abs,
    /// Natural exponential.
    Exp,
    /// Natural logarithm.
    Log,
    /// Base-2 logarithm.
    Log2,
    /// Base-10 logarithm.
    Log10,
    /// Square root.
    Sqrt,
    /// `if A <= B then C else D`.
    Select,
    /// Clamp `A` to the range `[min, max]`.
    Clamp,
    /// Scalar literal.
    Constant,
    /// Vector literal.
    ConstVec,
    /// 4x4 matrix literal.
    ConstMat,
    /// Resource-id literal.
    ConstResourceId,
    /// Build a vector from three scalars.
    ComposeVector,
    /// Broadcast one scalar to all vector components.
    VectorFromScalar,
    /// Split a vector into three scalars.
    DecomposeVector,
    /// Build a matrix from 16 scalars.
    ComposeMatrix,
    /// Build a matrix from four column vectors.
    MatrixFromColumns,
    /// Build a matrix from four row vectors.
    MatrixFromRows,
    /// Vector dot product.
    Dot,
    /// Vector cross product.
    Cross,
    /// Matrix-vector product.
    MatVecMultiplication,
    /// Matrix transpose.
    Transpose,
    /// Matrix inverse.
    Inverse,
    /// Euclidean vector length.
    Length,
    /// Call another implicit function. The signature is dynamic and
    /// resolved against the referenced function at validation time.
    FunctionCall,
    /// Signed distance to a mesh resource.
    Mesh,
    /// Unsigned distance to a mesh resource.
    UnsignedMesh,
    /// Signed distance to a beam lattice resource.
    BeamLattice,
    /// Numerical gradient of a referenced function.
    FunctionGradient,
    /// Distance normalization through a referenced function.
    NormalizeDistance,
}

impl NodeType {
    /// Parse a node type from its XML element name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "addition" => Some(Self::Addition),
            "subtraction" => Some(Self::Subtraction),
            "multiplication" => Some(Self::Multiplication),
            "division" => Some(Self::Division),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "fmod" => Some(Self::Fmod),
            "pow" => Some(Self::Pow),
            "atan2" => Some(Self::Atan2),
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "asin" => Some(Self::Asin),
            "acos" => Some(Self::Acos),
            "atan" => Some(Self::Atan),
            "sinh" => Some(Self::Sinh),
            "cosh" => Some(Self::Cosh),
            "tanh" => Some(Self::Tanh),
            "round" => Some(Self::Round),
            "ceil" => Some(Self::Ceil),
            "floor" => Some(Self::Floor),
            "sign" => Some(Self::Sign),
            "fract" => Some(Self::Fract),
            "abs" => Some(Self::Abs),
            "exp" => Some(Self::Exp),
            "log" => Some(Self::Log),
            "log2" => Some(Self::Log2),
            "log10" => Some(Self::Log10),
            "sqrt" => Some(Self::Sqrt),
            "select" => Some(Self::Select),
            "clamp" => Some(Self::Clamp),
            "constant" => Some(Self::Constant),
            "constvec" => Some(Self::ConstVec),
            "constmat" => Some(Self::ConstMat),
            "constresourceid" => Some(Self::ConstResourceId),
            "composevector" => Some(Self::ComposeVector),
            "vectorfromscalar" => Some(Self::VectorFromScalar),
            "decomposevector" => Some(Self::DecomposeVector),
            "composematrix" => Some(Self::ComposeMatrix),
            "matrixfromcolumns" => Some(Self::MatrixFromColumns),
            "matrixfromrows" => Some(Self::MatrixFromRows),
            "dot" => Some(Self::Dot),
            "cross" => Some(Self::Cross),
            "matvecmultiplication" => Some(Self::MatVecMultiplication),
            "transpose" => Some(Self::Transpose),
            "inverse" => Some(Self::Inverse),
            "length" => Some(Self::Length),
            "functioncall" => Some(Self::FunctionCall),
            "mesh" => Some(Self::Mesh),
            "unsignedmesh" => Some(Self::UnsignedMesh),
            "beamlattice" => Some(Self::BeamLattice),
            "functiongradient" => Some(Self::FunctionGradient),
            "normalizedistance" => Some(Self::NormalizeDistance),
            _ => None,
        }
    }

    /// XML element name of this node type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Subtraction => "subtraction",
            Self::Multiplication => "multiplication",
            Self::Division => "division",
            Self::Min => "min",
            Self::Max => "max",
            Self::Fmod => "fmod",
            Self::Pow => "pow",
            Self::Atan2 => "atan2",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Round => "round",
            Self::Ceil => "ceil",
            Self::Floor => "floor",
            Self::Sign => "sign",
            Self::Fract => "fract",
            Self::Abs => "abs",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Log2 => "log2",
            Self::Log10 => "log10",
            Self::Sqrt => "sqrt",
            Self::Select => "select",
            Self::Clamp => "clamp",
            Self::Constant => "constant",
            Self::ConstVec => "constvec",
            Self::ConstMat => "constmat",
            Self::ConstResourceId => "constresourceid",
            Self::ComposeVector => "composevector",
            Self::VectorFromScalar => "vectorfromscalar",
            Self::DecomposeVector => "decomposevector",
            Self::ComposeMatrix => "composematrix",
            Self::MatrixFromColumns => "matrixfromcolumns",
            Self::MatrixFromRows => "matrixfromrows",
            Self::Dot => "dot",
            Self::Cross => "cross",
            Self::MatVecMultiplication => "matvecmultiplication",
            Self::Transpose => "transpose",
            Self::Inverse => "inverse",
            Self::Length => "length",
            Self::FunctionCall => "functioncall",
            Self::Mesh => "mesh",
            Self::UnsignedMesh => "unsignedmesh",
            Self::BeamLattice => "beamlattice",
            Self::FunctionGradient => "functiongradient",
            Self::NormalizeDistance => "normalizedistance",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port-type configuration of a parameterized opcode.
///
/// Arithmetic and unary opcodes exist in scalar, vector and matrix
/// flavors; the configuration selects which flavor a node instance
/// materializes. Opcodes with a single fixed signature use [`Default`].
///
/// [`Default`]: NodeConfiguration::Default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeConfiguration {
    /// The opcode's single fixed signature.
    #[default]
    Default,
    /// All configured ports are scalars.
    ScalarToScalar,
    /// All configured ports are vectors.
    VectorToVector,
    /// All configured ports are matrices.
    MatrixToMatrix,
}

impl NodeConfiguration {
    /// The port type materialized by this configuration, if any.
    #[must_use]
    pub const fn port_type(self) -> Option<PortType> {
        match self {
            Self::Default => None,
            Self::ScalarToScalar => Some(PortType::Scalar),
            Self::VectorToVector => Some(PortType::Vector),
            Self::MatrixToMatrix => Some(PortType::Matrix),
        }
    }

    /// The configuration that materializes the given port type.
    #[must_use]
    pub const fn for_port_type(port_type: PortType) -> Option<Self> {
        match port_type {
            PortType::Scalar => Some(Self::ScalarToScalar),
            PortType::Vector => Some(Self::VectorToVector),
            PortType::Matrix => Some(Self::MatrixToMatrix),
            PortType::ResourceId => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_type_roundtrip() {
        for ty in [
            PortType::Scalar,
            PortType::Vector,
            PortType::Matrix,
            PortType::ResourceId,
        ] {
            assert_eq!(PortType::from_str(ty.as_str()), Some(ty));
        }
    }

    #[test]
    fn port_type_is_case_sensitive() {
        assert_eq!(PortType::from_str("resourceID"), Some(PortType::ResourceId));
        assert_eq!(PortType::from_str("resourceid"), None);
        assert_eq!(PortType::from_str("Scalar"), None);
    }

    #[test]
    fn node_type_roundtrip() {
        // Spot-check representative element names; from_str and as_str
        // must agree for every opcode.
        for name in [
            "addition",
            "constant",
            "constvec",
            "constresourceid",
            "matvecmultiplication",
            "functioncall",
            "beamlattice",
            "functiongradient",
            "normalizedistance",
        ] {
            let ty = NodeType::from_str(name);
            assert!(ty.is_some(), "unknown element name: {name}");
            assert_eq!(ty.map(NodeType::as_str), Some(name));
        }
    }

    #[test]
    fn node_type_unknown_element() {
        assert_eq!(NodeType::from_str("warp"), None);
        assert_eq!(NodeType::from_str(""), None);
    }

    #[test]
    fn configuration_port_type_mapping() {
        assert_eq!(
            NodeConfiguration::ScalarToScalar.port_type(),
            Some(PortType::Scalar)
        );
        assert_eq!(NodeConfiguration::Default.port_type(), None);
        assert_eq!(
            NodeConfiguration::for_port_type(PortType::Matrix),
            Some(NodeConfiguration::MatrixToMatrix)
        );
        assert_eq!(NodeConfiguration::for_port_type(PortType::ResourceId), None);
    }
}
