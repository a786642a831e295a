//! Graph nodes.
//!
//! A node is one opcode instance. Its ports are materialized from the
//! catalog template at construction time; opcode-specific payload lives in
//! a single discriminated record and every payload accessor is gated on
//! the opcode, returning [`ImplicitError::DomainMismatch`] when the opcode
//! does not carry that field.

use nalgebra::{Matrix4, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::{ImplicitError, ImplicitResult};
use crate::port::{Port, PortHandle, PortLocation};
use crate::types::{GraphId, NodeConfiguration, NodeType, PortType, ResourceId};

/// Opcode-specific payload storage.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub(crate) enum Payload {
    None,
    Constant(f64),
    Vector(Option<Vector3<f64>>),
    Matrix(Option<Matrix4<f64>>),
    Resource(ResourceId),
    BeamLattice {
        accurate_range: f64,
    },
    FunctionSample {
        scalar_output_name: String,
        vector_input_name: String,
    },
}

impl Payload {
    fn for_node_type(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Constant => Self::Constant(0.0),
            NodeType::ConstVec => Self::Vector(None),
            NodeType::ConstMat => Self::Matrix(None),
            NodeType::ConstResourceId => Self::Resource(0),
            NodeType::BeamLattice => Self::BeamLattice {
                accurate_range: 0.0,
            },
            NodeType::FunctionGradient | NodeType::NormalizeDistance => {
                // sampler_defaults covers exactly these two opcodes
                let (scalar, vector) =
                    catalog::sampler_defaults(node_type).unwrap_or(("", ""));
                Self::FunctionSample {
                    scalar_output_name: scalar.to_string(),
                    vector_input_name: vector.to_string(),
                }
            }
            _ => Self::None,
        }
    }
}

/// One vertex of an implicit function graph.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    graph_id: GraphId,
    function: ResourceId,
    node_type: NodeType,
    configuration: NodeConfiguration,
    identifier: String,
    display_name: String,
    tag: String,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    payload: Payload,
}

impl Node {
    pub(crate) fn new(
        graph_id: GraphId,
        function: ResourceId,
        node_type: NodeType,
        configuration: NodeConfiguration,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<Self> {
        let signature = catalog::signature(node_type, configuration).ok_or(
            ImplicitError::InvalidConfiguration {
                node_type,
                configuration,
            },
        )?;

        let inputs = signature
            .inputs
            .iter()
            .map(|t| Port::new(t.identifier, t.identifier, t.port_type))
            .collect();
        let outputs = signature
            .outputs
            .iter()
            .map(|t| Port::new(t.identifier, t.identifier, t.port_type))
            .collect();

        Ok(Self {
            graph_id,
            function,
            node_type,
            configuration,
            identifier: identifier.into(),
            display_name: display_name.into(),
            tag: tag.into(),
            inputs,
            outputs,
            payload: Payload::for_node_type(node_type),
        })
    }

    /// Stable graph id of the node within its function.
    #[must_use]
    pub fn graph_id(&self) -> GraphId {
        self.graph_id
    }

    /// Opcode of the node.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Configuration the node was instantiated with.
    #[must_use]
    pub fn configuration(&self) -> NodeConfiguration {
        self.configuration
    }

    /// Identifier of the node, unique within its function.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Human-readable name of the node.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Set the human-readable name of the node.
    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    /// Grouping tag. Empty when the node belongs to no group.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Set the grouping tag.
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    /// Input ports in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    /// Output ports in declaration order.
    #[must_use]
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    /// Find an input port by identifier.
    #[must_use]
    pub fn find_input(&self, identifier: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.identifier() == identifier)
    }

    /// Find an output port by identifier.
    #[must_use]
    pub fn find_output(&self, identifier: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.identifier() == identifier)
    }

    /// Handle to an input port, for linking.
    #[must_use]
    pub fn input_handle(&self, identifier: &str) -> Option<PortHandle> {
        let port = self
            .inputs
            .iter()
            .position(|p| p.identifier() == identifier)?;
        Some(PortHandle::new(
            self.function,
            PortLocation::NodeInput {
                node: self.graph_id,
                port,
            },
        ))
    }

    /// Handle to an output port, for linking.
    #[must_use]
    pub fn output_handle(&self, identifier: &str) -> Option<PortHandle> {
        let port = self
            .outputs
            .iter()
            .position(|p| p.identifier() == identifier)?;
        Some(PortHandle::new(
            self.function,
            PortLocation::NodeOutput {
                node: self.graph_id,
                port,
            },
        ))
    }

    /// Set the default value of a scalar input port.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPort` if no input has the identifier and
    /// `TypeMismatch` if the input is not a scalar.
    pub fn set_input_default(&mut self, identifier: &str, value: f64) -> ImplicitResult<()> {
        let context = self.identifier.clone();
        let port = self
            .inputs
            .iter_mut()
            .find(|p| p.identifier() == identifier)
            .ok_or_else(|| ImplicitError::unknown_port(identifier, &context))?;
        if port.port_type() != PortType::Scalar {
            return Err(ImplicitError::type_mismatch(
                PortType::Scalar,
                port.port_type(),
                format!("default value of {context}.{identifier}"),
            ));
        }
        port.set_default_value(value);
        Ok(())
    }

    pub(crate) fn input_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.inputs.get_mut(index)
    }

    pub(crate) fn push_input(&mut self, port: Port) -> usize {
        self.inputs.push(port);
        self.inputs.len() - 1
    }

    pub(crate) fn push_output(&mut self, port: Port) -> usize {
        self.outputs.push(port);
        self.outputs.len() - 1
    }

    /// Set the scalar literal of a `constant` node.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` on any other opcode.
    pub fn set_constant(&mut self, value: f64) -> ImplicitResult<()> {
        match &mut self.payload {
            Payload::Constant(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(ImplicitError::DomainMismatch {
                operation: "set_constant",
                node_type: self.node_type,
            }),
        }
    }

    /// Scalar literal of a `constant` node. Defaults to `0.0`.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` on any other opcode.
    pub fn constant(&self) -> ImplicitResult<f64> {
        match &self.payload {
            Payload::Constant(v) => Ok(*v),
            _ => Err(ImplicitError::DomainMismatch {
                operation: "constant",
                node_type: self.node_type,
            }),
        }
    }

    /// Set the vector literal of a `constvec` node.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` on any other opcode.
    pub fn set_vector(&mut self, value: Vector3<f64>) -> ImplicitResult<()> {
        match &mut self.payload {
            Payload::Vector(v) => {
                *v = Some(value);
                Ok(())
            }
            _ => Err(ImplicitError::DomainMismatch {
                operation: "set_vector",
                node_type: self.node_type,
            }),
        }
    }

    /// Vector literal of a `constvec` node.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` on any other opcode and `Uninitialized`
    /// when no value has been assigned yet.
    pub fn vector(&self) -> ImplicitResult<Vector3<f64>> {
        match &self.payload {
            Payload::Vector(Some(v)) => Ok(*v),
            Payload::Vector(None) => Err(ImplicitError::Uninitialized {
                what: "vector",
                identifier: self.identifier.clone(),
            }),
            _ => Err(ImplicitError::DomainMismatch {
                operation: "vector",
                node_type: self.node_type,
            }),
        }
    }

    /// Set the matrix literal of a `constmat` node.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` on any other opcode.
    pub fn set_matrix(&mut self, value: Matrix4<f64>) -> ImplicitResult<()> {
        match &mut self.payload {
            Payload::Matrix(v) => {
                *v = Some(value);
                Ok(())
            }
            _ => Err(ImplicitError::DomainMismatch {
                operation: "set_matrix",
                node_type: self.node_type,
            }),
        }
    }

    /// Matrix literal of a `constmat` node.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` on any other opcode and `Uninitialized`
    /// when no value has been assigned yet.
    pub fn matrix(&self) -> ImplicitResult<Matrix4<f64>> {
        match &self.payload {
            Payload::Matrix(Some(v)) => Ok(*v),
            Payload::Matrix(None) => Err(ImplicitError::Uninitialized {
                what: "matrix",
                identifier: self.identifier.clone(),
            }),
            _ => Err(ImplicitError::DomainMismatch {
                operation: "matrix",
                node_type: self.node_type,
            }),
        }
    }

    /// Set the referenced resource of a `constresourceid` node.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` on any other opcode.
    pub fn set_resource_id(&mut self, resource: ResourceId) -> ImplicitResult<()> {
        match &mut self.payload {
            Payload::Resource(v) => {
                *v = resource;
                Ok(())
            }
            _ => Err(ImplicitError::DomainMismatch {
                operation: "set_resource_id",
                node_type: self.node_type,
            }),
        }
    }

    /// Referenced resource of a `constresourceid` node. `0` when unset.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` on any other opcode.
    pub fn resource_id(&self) -> ImplicitResult<ResourceId> {
        match &self.payload {
            Payload::Resource(v) => Ok(*v),
            _ => Err(ImplicitError::DomainMismatch {
                operation: "resource_id",
                node_type: self.node_type,
            }),
        }
    }

    /// Set the accuracy band of a `beamlattice` node.
    ///
    /// Negative values clamp to `0.0`, matching the schema's silent
    /// clamping behavior.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` on any other opcode.
    pub fn set_accurate_range(&mut self, value: f64) -> ImplicitResult<()> {
        match &mut self.payload {
            Payload::BeamLattice { accurate_range } => {
                *accurate_range = value.max(0.0);
                Ok(())
            }
            _ => Err(ImplicitError::DomainMismatch {
                operation: "set_accurate_range",
                node_type: self.node_type,
            }),
        }
    }

    /// Accuracy band of a `beamlattice` node. Defaults to `0.0`.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` on any other opcode.
    pub fn accurate_range(&self) -> ImplicitResult<f64> {
        match &self.payload {
            Payload::BeamLattice { accurate_range } => Ok(*accurate_range),
            _ => Err(ImplicitError::DomainMismatch {
                operation: "accurate_range",
                node_type: self.node_type,
            }),
        }
    }

    /// Set the referenced function's scalar output name on a sampler node.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` unless the opcode is `functiongradient`
    /// or `normalizedistance`.
    pub fn set_scalar_output_name(&mut self, name: impl Into<String>) -> ImplicitResult<()> {
        match &mut self.payload {
            Payload::FunctionSample {
                scalar_output_name, ..
            } => {
                *scalar_output_name = name.into();
                Ok(())
            }
            _ => Err(ImplicitError::DomainMismatch {
                operation: "set_scalar_output_name",
                node_type: self.node_type,
            }),
        }
    }

    /// Referenced function's scalar output name on a sampler node.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` unless the opcode is `functiongradient`
    /// or `normalizedistance`.
    pub fn scalar_output_name(&self) -> ImplicitResult<&str> {
        match &self.payload {
            Payload::FunctionSample {
                scalar_output_name, ..
            } => Ok(scalar_output_name),
            _ => Err(ImplicitError::DomainMismatch {
                operation: "scalar_output_name",
                node_type: self.node_type,
            }),
        }
    }

    /// Set the referenced function's vector input name on a sampler node.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` unless the opcode is `functiongradient`
    /// or `normalizedistance`.
    pub fn set_vector_input_name(&mut self, name: impl Into<String>) -> ImplicitResult<()> {
        match &mut self.payload {
            Payload::FunctionSample {
                vector_input_name, ..
            } => {
                *vector_input_name = name.into();
                Ok(())
            }
            _ => Err(ImplicitError::DomainMismatch {
                operation: "set_vector_input_name",
                node_type: self.node_type,
            }),
        }
    }

    /// Referenced function's vector input name on a sampler node.
    ///
    /// # Errors
    ///
    /// Returns `DomainMismatch` unless the opcode is `functiongradient`
    /// or `normalizedistance`.
    pub fn vector_input_name(&self) -> ImplicitResult<&str> {
        match &self.payload {
            Payload::FunctionSample {
                vector_input_name, ..
            } => Ok(vector_input_name),
            _ => Err(ImplicitError::DomainMismatch {
                operation: "vector_input_name",
                node_type: self.node_type,
            }),
        }
    }

    /// Whether the node's current ports match its catalog template.
    ///
    /// `functioncall` nodes only require their fixed `functionID` input
    /// here; the dynamic remainder of their signature is checked against
    /// the referenced function by the validator.
    #[must_use]
    pub fn ports_valid(&self) -> bool {
        if self.node_type == NodeType::FunctionCall {
            return self
                .find_input("functionID")
                .is_some_and(|p| p.port_type() == PortType::ResourceId);
        }

        let Some(signature) = catalog::signature(self.node_type, self.configuration) else {
            return false;
        };

        let side_matches = |templates: &[catalog::PortTemplate], ports: &[Port]| {
            templates.len() == ports.len()
                && templates.iter().all(|t| {
                    ports
                        .iter()
                        .any(|p| p.identifier() == t.identifier && p.port_type() == t.port_type)
                })
        };

        side_matches(signature.inputs, &self.inputs)
            && side_matches(signature.outputs, &self.outputs)
    }
}
