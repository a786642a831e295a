//! Static node-type catalog.
//!
//! One literal table mapping every opcode to its port signature templates,
//! allowed configurations and payload fields. The catalog is immutable and
//! may be read concurrently; nodes are constructed from it and validated
//! against it.

use crate::types::{NodeConfiguration, NodeType, PortType};

/// Template of a single expected port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortTemplate {
    /// Port identifier.
    pub identifier: &'static str,
    /// Semantic type of the port.
    pub port_type: PortType,
}

/// Port signature of one opcode configuration.
///
/// All template inputs are required: a conforming node must link them or
/// give them a default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Expected input ports, in order.
    pub inputs: &'static [PortTemplate],
    /// Expected output ports, in order.
    pub outputs: &'static [PortTemplate],
}

const fn port(identifier: &'static str, port_type: PortType) -> PortTemplate {
    PortTemplate {
        identifier,
        port_type,
    }
}

use PortType::{Matrix, ResourceId, Scalar, Vector};

const BINARY_SCALAR: Signature = Signature {
    inputs: &[port("A", Scalar), port("B", Scalar)],
    outputs: &[port("result", Scalar)],
};
const BINARY_VECTOR: Signature = Signature {
    inputs: &[port("A", Vector), port("B", Vector)],
    outputs: &[port("result", Vector)],
};
const BINARY_MATRIX: Signature = Signature {
    inputs: &[port("A", Matrix), port("B", Matrix)],
    outputs: &[port("result", Matrix)],
};

const UNARY_SCALAR: Signature = Signature {
    inputs: &[port("A", Scalar)],
    outputs: &[port("result", Scalar)],
};
const UNARY_VECTOR: Signature = Signature {
    inputs: &[port("A", Vector)],
    outputs: &[port("result", Vector)],
};

const SELECT_SCALAR: Signature = Signature {
    inputs: &[
        port("A", Scalar),
        port("B", Scalar),
        port("C", Scalar),
        port("D", Scalar),
    ],
    outputs: &[port("result", Scalar)],
};
const SELECT_VECTOR: Signature = Signature {
    inputs: &[
        port("A", Vector),
        port("B", Vector),
        port("C", Vector),
        port("D", Vector),
    ],
    outputs: &[port("result", Vector)],
};
const SELECT_MATRIX: Signature = Signature {
    inputs: &[
        port("A", Matrix),
        port("B", Matrix),
        port("C", Matrix),
        port("D", Matrix),
    ],
    outputs: &[port("result", Matrix)],
};

const CLAMP_SCALAR: Signature = Signature {
    inputs: &[port("A", Scalar), port("min", Scalar), port("max", Scalar)],
    outputs: &[port("result", Scalar)],
};
const CLAMP_VECTOR: Signature = Signature {
    inputs: &[port("A", Vector), port("min", Vector), port("max", Vector)],
    outputs: &[port("result", Vector)],
};

const CONSTANT: Signature = Signature {
    inputs: &[],
    outputs: &[port("value", Scalar)],
};
const CONST_VEC: Signature = Signature {
    inputs: &[],
    outputs: &[port("vector", Vector)],
};
const CONST_MAT: Signature = Signature {
    inputs: &[],
    outputs: &[port("matrix", Matrix)],
};
const CONST_RESOURCE_ID: Signature = Signature {
    inputs: &[],
    outputs: &[port("value", ResourceId)],
};

const COMPOSE_VECTOR: Signature = Signature {
    inputs: &[port("x", Scalar), port("y", Scalar), port("z", Scalar)],
    outputs: &[port("result", Vector)],
};
const VECTOR_FROM_SCALAR: Signature = Signature {
    inputs: &[port("A", Scalar)],
    outputs: &[port("result", Vector)],
};
const DECOMPOSE_VECTOR: Signature = Signature {
    inputs: &[port("A", Vector)],
    outputs: &[port("x", Scalar), port("y", Scalar), port("z", Scalar)],
};
const COMPOSE_MATRIX: Signature = Signature {
    inputs: &[
        port("m00", Scalar),
        port("m01", Scalar),
        port("m02", Scalar),
        port("m03", Scalar),
        port("m10", Scalar),
        port("m11", Scalar),
        port("m12", Scalar),
        port("m13", Scalar),
        port("m20", Scalar),
        port("m21", Scalar),
        port("m22", Scalar),
        port("m23", Scalar),
        port("m30", Scalar),
        port("m31", Scalar),
        port("m32", Scalar),
        port("m33", Scalar),
    ],
    outputs: &[port("result", Matrix)],
};
const MATRIX_FROM_VECTORS: Signature = Signature {
    inputs: &[
        port("A", Vector),
        port("B", Vector),
        port("C", Vector),
        port("D", Vector),
    ],
    outputs: &[port("result", Matrix)],
};

const DOT: Signature = Signature {
    inputs: &[port("A", Vector), port("B", Vector)],
    outputs: &[port("result", Scalar)],
};
const CROSS: Signature = Signature {
    inputs: &[port("A", Vector), port("B", Vector)],
    outputs: &[port("result", Vector)],
};
const MAT_VEC_MULTIPLICATION: Signature = Signature {
    inputs: &[port("A", Matrix), port("B", Vector)],
    outputs: &[port("result", Vector)],
};
const MATRIX_UNARY: Signature = Signature {
    inputs: &[port("A", Matrix)],
    outputs: &[port("result", Matrix)],
};
const LENGTH: Signature = Signature {
    inputs: &[port("A", Vector)],
    outputs: &[port("result", Scalar)],
};

const MESH_SAMPLE: Signature = Signature {
    inputs: &[port("pos", Vector), port("mesh", ResourceId)],
    outputs: &[port("distance", Scalar)],
};
const BEAM_LATTICE: Signature = Signature {
    inputs: &[port("pos", Vector), port("beamlattice", ResourceId)],
    outputs: &[port("distance", Scalar)],
};
const FUNCTION_CALL: Signature = Signature {
    inputs: &[port("functionID", ResourceId)],
    outputs: &[],
};
const FUNCTION_GRADIENT: Signature = Signature {
    inputs: &[
        port("functionID", ResourceId),
        port("pos", Vector),
        port("step", Scalar),
    ],
    outputs: &[
        port("normalizedgradient", Vector),
        port("gradient", Vector),
        port("magnitude", Scalar),
    ],
};
const NORMALIZE_DISTANCE: Signature = Signature {
    inputs: &[
        port("functionID", ResourceId),
        port("pos", Vector),
        port("step", Scalar),
    ],
    outputs: &[port("result", Scalar)],
};

const CONFIGURED_SVM: &[NodeConfiguration] = &[
    NodeConfiguration::ScalarToScalar,
    NodeConfiguration::VectorToVector,
    NodeConfiguration::MatrixToMatrix,
];
const CONFIGURED_SV: &[NodeConfiguration] = &[
    NodeConfiguration::ScalarToScalar,
    NodeConfiguration::VectorToVector,
];
const FIXED: &[NodeConfiguration] = &[NodeConfiguration::Default];

/// The configurations an opcode may be instantiated with.
///
/// The first entry is the opcode's default configuration.
#[must_use]
pub fn allowed_configurations(node_type: NodeType) -> &'static [NodeConfiguration] {
    use NodeType as N;
    match node_type {
        N::Addition
        | N::Subtraction
        | N::Multiplication
        | N::Division
        | N::Min
        | N::Max
        | N::Select => CONFIGURED_SVM,
        N::Fmod
        | N::Pow
        | N::Atan2
        | N::Sin
        | N::Cos
        | N::Tan
        | N::Asin
        | N::Acos
        | N::Atan
        | N::Sinh
        | N::Cosh
        | N::Tanh
        | N::Round
        | N::Ceil
        | N::Floor
        | N::Sign
        | N::Fract
        | N::Abs
        | N::Exp
        | N::Log
        | N::Log2
        | N::Log10
        | N::Sqrt
        | N::Clamp => CONFIGURED_SV,
        _ => FIXED,
    }
}

/// Default configuration of an opcode (the first allowed one).
#[must_use]
pub fn default_configuration(node_type: NodeType) -> NodeConfiguration {
    allowed_configurations(node_type)[0]
}

/// Port signature of an opcode under a configuration.
///
/// Returns `None` when the configuration is not allowed for the opcode.
#[must_use]
pub fn signature(
    node_type: NodeType,
    configuration: NodeConfiguration,
) -> Option<&'static Signature> {
    use NodeConfiguration as C;
    use NodeType as N;
    match node_type {
        N::Addition | N::Subtraction | N::Multiplication | N::Division | N::Min | N::Max => {
            match configuration {
                C::ScalarToScalar => Some(&BINARY_SCALAR),
                C::VectorToVector => Some(&BINARY_VECTOR),
                C::MatrixToMatrix => Some(&BINARY_MATRIX),
                C::Default => None,
            }
        }
        N::Fmod | N::Pow | N::Atan2 => match configuration {
            C::ScalarToScalar => Some(&BINARY_SCALAR),
            C::VectorToVector => Some(&BINARY_VECTOR),
            _ => None,
        },
        N::Sin
        | N::Cos
        | N::Tan
        | N::Asin
        | N::Acos
        | N::Atan
        | N::Sinh
        | N::Cosh
        | N::Tanh
        | N::Round
        | N::Ceil
        | N::Floor
        | N::Sign
        | N::Fract
        | N::Abs
        | N::Exp
        | N::Log
        | N::Log2
        | N::Log10
        | N::Sqrt => match configuration {
            C::ScalarToScalar => Some(&UNARY_SCALAR),
            C::VectorToVector => Some(&UNARY_VECTOR),
            _ => None,
        },
        N::Select => match configuration {
            C::ScalarToScalar => Some(&SELECT_SCALAR),
            C::VectorToVector => Some(&SELECT_VECTOR),
            C::MatrixToMatrix => Some(&SELECT_MATRIX),
            C::Default => None,
        },
        N::Clamp => match configuration {
            C::ScalarToScalar => Some(&CLAMP_SCALAR),
            C::VectorToVector => Some(&CLAMP_VECTOR),
            _ => None,
        },
        _ => {
            if configuration != C::Default {
                return None;
            }
            Some(match node_type {
                N::Constant => &CONSTANT,
                N::ConstVec => &CONST_VEC,
                N::ConstMat => &CONST_MAT,
                N::ConstResourceId => &CONST_RESOURCE_ID,
                N::ComposeVector => &COMPOSE_VECTOR,
                N::VectorFromScalar => &VECTOR_FROM_SCALAR,
                N::DecomposeVector => &DECOMPOSE_VECTOR,
                N::ComposeMatrix => &COMPOSE_MATRIX,
                N::MatrixFromColumns | N::MatrixFromRows => &MATRIX_FROM_VECTORS,
                N::Dot => &DOT,
                N::Cross => &CROSS,
                N::MatVecMultiplication => &MAT_VEC_MULTIPLICATION,
                N::Transpose | N::Inverse => &MATRIX_UNARY,
                N::Length => &LENGTH,
                N::FunctionCall => &FUNCTION_CALL,
                N::Mesh | N::UnsignedMesh => &MESH_SAMPLE,
                N::BeamLattice => &BEAM_LATTICE,
                N::FunctionGradient => &FUNCTION_GRADIENT,
                N::NormalizeDistance => &NORMALIZE_DISTANCE,
                // Configured opcodes are all handled above.
                _ => return None,
            })
        }
    }
}

/// Derive the configuration of a node element from its first declared
/// output type, as the reader sees it in the XML.
///
/// Fixed-signature opcodes ignore the output type. For configured opcodes
/// the declared type selects the flavor; `None` or a type with no flavor
/// yields `None`.
#[must_use]
pub fn infer_configuration(
    node_type: NodeType,
    output_type: Option<PortType>,
) -> Option<NodeConfiguration> {
    let allowed = allowed_configurations(node_type);
    if allowed == FIXED {
        return Some(NodeConfiguration::Default);
    }
    let configuration = NodeConfiguration::for_port_type(output_type?)?;
    allowed.contains(&configuration).then_some(configuration)
}

/// Payload fields an opcode may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadField {
    /// Scalar literal (`constant` nodes).
    Constant,
    /// Vector literal (`constvec` nodes).
    Vector,
    /// Matrix literal (`constmat` nodes).
    Matrix,
    /// Resource-id literal (`constresourceid` nodes).
    ResourceId,
    /// Lookup accuracy band (`beamlattice` nodes).
    AccurateRange,
    /// Name of the referenced function's scalar output (sampler nodes).
    ScalarOutputName,
    /// Name of the referenced function's vector input (sampler nodes).
    VectorInputName,
}

/// Whether an opcode is allowed to carry the given payload field.
#[must_use]
pub fn allows_payload(node_type: NodeType, field: PayloadField) -> bool {
    use NodeType as N;
    use PayloadField as F;
    matches!(
        (node_type, field),
        (N::Constant, F::Constant)
            | (N::ConstVec, F::Vector)
            | (N::ConstMat, F::Matrix)
            | (N::ConstResourceId, F::ResourceId)
            | (N::BeamLattice, F::AccurateRange)
            | (
                N::FunctionGradient | N::NormalizeDistance,
                F::ScalarOutputName | F::VectorInputName
            )
    )
}

/// Schema-default `(scalarOutputName, vectorInputName)` of a sampler
/// opcode, or `None` for opcodes without those attributes.
#[must_use]
pub fn sampler_defaults(node_type: NodeType) -> Option<(&'static str, &'static str)> {
    match node_type {
        NodeType::FunctionGradient => Some(("magnitude", "normalizedgradient")),
        NodeType::NormalizeDistance => Some(("result", "gradient")),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn addition_accepts_all_three_flavors() {
        for configuration in [
            NodeConfiguration::ScalarToScalar,
            NodeConfiguration::VectorToVector,
            NodeConfiguration::MatrixToMatrix,
        ] {
            assert!(signature(NodeType::Addition, configuration).is_some());
        }
        assert!(signature(NodeType::Addition, NodeConfiguration::Default).is_none());
    }

    #[test]
    fn unary_rejects_matrix_flavor() {
        assert!(signature(NodeType::Sin, NodeConfiguration::MatrixToMatrix).is_none());
        assert!(signature(NodeType::Sqrt, NodeConfiguration::VectorToVector).is_some());
    }

    #[test]
    fn beamlattice_signature() {
        let sig = signature(NodeType::BeamLattice, NodeConfiguration::Default)
            .expect("beamlattice has a fixed signature");
        assert_eq!(sig.inputs.len(), 2);
        assert_eq!(sig.inputs[0].identifier, "pos");
        assert_eq!(sig.inputs[0].port_type, PortType::Vector);
        assert_eq!(sig.inputs[1].identifier, "beamlattice");
        assert_eq!(sig.inputs[1].port_type, PortType::ResourceId);
        assert_eq!(sig.outputs[0].identifier, "distance");
        assert_eq!(sig.outputs[0].port_type, PortType::Scalar);
    }

    #[test]
    fn function_gradient_has_three_outputs() {
        let sig = signature(NodeType::FunctionGradient, NodeConfiguration::Default);
        assert!(sig.is_some_and(|s| s.outputs.len() == 3));
    }

    #[test]
    fn every_opcode_has_a_default_signature() {
        // default_configuration must always resolve to a signature, except
        // for opcodes whose default is itself parameterized.
        for name in [
            "addition", "sin", "select", "clamp", "constant", "constvec", "constmat",
            "constresourceid", "composevector", "vectorfromscalar", "decomposevector",
            "composematrix", "matrixfromcolumns", "matrixfromrows", "dot", "cross",
            "matvecmultiplication", "transpose", "inverse", "length", "functioncall",
            "mesh", "unsignedmesh", "beamlattice", "functiongradient",
            "normalizedistance",
        ] {
            let Some(node_type) = NodeType::from_str(name) else {
                panic!("unknown opcode {name}");
            };
            let configuration = default_configuration(node_type);
            assert!(
                signature(node_type, configuration).is_some(),
                "no default signature for {name}"
            );
        }
    }

    #[test]
    fn infer_configuration_from_output_type() {
        assert_eq!(
            infer_configuration(NodeType::Addition, Some(PortType::Vector)),
            Some(NodeConfiguration::VectorToVector)
        );
        assert_eq!(
            infer_configuration(NodeType::Addition, Some(PortType::ResourceId)),
            None
        );
        assert_eq!(infer_configuration(NodeType::Addition, None), None);
        // Fixed-signature opcodes ignore the declared type.
        assert_eq!(
            infer_configuration(NodeType::Dot, Some(PortType::Scalar)),
            Some(NodeConfiguration::Default)
        );
    }

    #[test]
    fn payload_gating() {
        assert!(allows_payload(NodeType::Constant, PayloadField::Constant));
        assert!(!allows_payload(NodeType::Constant, PayloadField::Vector));
        assert!(allows_payload(NodeType::BeamLattice, PayloadField::AccurateRange));
        assert!(!allows_payload(NodeType::Mesh, PayloadField::AccurateRange));
        assert!(allows_payload(
            NodeType::NormalizeDistance,
            PayloadField::ScalarOutputName
        ));
        assert!(!allows_payload(NodeType::FunctionCall, PayloadField::ScalarOutputName));
    }

    #[test]
    fn sampler_defaults_per_opcode() {
        assert_eq!(
            sampler_defaults(NodeType::FunctionGradient),
            Some(("magnitude", "normalizedgradient"))
        );
        assert_eq!(
            sampler_defaults(NodeType::NormalizeDistance),
            Some(("result", "gradient"))
        );
        assert_eq!(sampler_defaults(NodeType::BeamLattice), None);
    }
}
