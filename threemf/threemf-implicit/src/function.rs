//! The implicit function resource: an ordered node graph with typed links.
//!
//! The function exclusively owns its nodes and ports; every cross-entity
//! reference is an index-based handle. Iteration order is insertion order
//! for inputs, outputs, nodes and ports, and the codec relies on that
//! order being stable across read/write cycles.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::{ImplicitError, ImplicitResult};
use crate::node::Node;
use crate::port::{Port, PortHandle, PortLocation, PortSource};
use crate::types::{GraphId, NodeConfiguration, NodeType, PortType, ResourceId};

/// Reserved producer prefix naming the function-level input list in
/// qualified port references (`inputs.<port>`).
pub const FUNCTION_INPUTS_PREFIX: &str = "inputs";

/// A named implicit function resource.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImplicitFunction {
    resource_id: ResourceId,
    display_name: String,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    nodes: Vec<Node>,
    next_graph_id: u32,
}

impl ImplicitFunction {
    /// Create an empty function with the given resource id.
    #[must_use]
    pub fn new(resource_id: ResourceId, display_name: impl Into<String>) -> Self {
        Self {
            resource_id,
            display_name: display_name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            nodes: Vec::new(),
            next_graph_id: 0,
        }
    }

    /// Resource id of the function within its model.
    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// Human-readable name of the function.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Set the human-readable name of the function.
    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    fn check_identifier(identifier: &str, reserved: bool) -> ImplicitResult<()> {
        if identifier.is_empty() {
            return Err(ImplicitError::InvalidIdentifier {
                identifier: identifier.to_string(),
                reason: "must not be empty",
            });
        }
        if identifier.contains('.') {
            return Err(ImplicitError::InvalidIdentifier {
                identifier: identifier.to_string(),
                reason: "must not contain '.'",
            });
        }
        if reserved && identifier == FUNCTION_INPUTS_PREFIX {
            return Err(ImplicitError::InvalidIdentifier {
                identifier: identifier.to_string(),
                reason: "is reserved for function-level inputs",
            });
        }
        Ok(())
    }

    /// Add a function-level input port.
    ///
    /// # Errors
    ///
    /// Fails with `DuplicateIdentifier` when an input of that identifier
    /// already exists, and `InvalidIdentifier` for empty or dotted names.
    pub fn add_input(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        port_type: PortType,
    ) -> ImplicitResult<PortHandle> {
        let identifier = identifier.into();
        Self::check_identifier(&identifier, false)?;
        if self.inputs.iter().any(|p| p.identifier() == identifier) {
            return Err(ImplicitError::duplicate_identifier(
                identifier,
                format!("inputs of function {}", self.resource_id),
            ));
        }
        self.inputs.push(Port::new(identifier, display_name, port_type));
        Ok(PortHandle::new(
            self.resource_id,
            PortLocation::FunctionInput(self.inputs.len() - 1),
        ))
    }

    /// Add a function-level output port.
    ///
    /// # Errors
    ///
    /// Fails with `DuplicateIdentifier` when an output of that identifier
    /// already exists, and `InvalidIdentifier` for empty or dotted names.
    pub fn add_output(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        port_type: PortType,
    ) -> ImplicitResult<PortHandle> {
        let identifier = identifier.into();
        Self::check_identifier(&identifier, false)?;
        if self.outputs.iter().any(|p| p.identifier() == identifier) {
            return Err(ImplicitError::duplicate_identifier(
                identifier,
                format!("outputs of function {}", self.resource_id),
            ));
        }
        self.outputs.push(Port::new(identifier, display_name, port_type));
        Ok(PortHandle::new(
            self.resource_id,
            PortLocation::FunctionOutput(self.outputs.len() - 1),
        ))
    }

    /// Function-level inputs in insertion order.
    #[must_use]
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    /// Function-level outputs in insertion order.
    #[must_use]
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    /// Find a function-level input by identifier.
    #[must_use]
    pub fn find_input(&self, identifier: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.identifier() == identifier)
    }

    /// Find a function-level output by identifier.
    #[must_use]
    pub fn find_output(&self, identifier: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.identifier() == identifier)
    }

    /// Function-level outputs of the given type, for consumers that bind
    /// a distance, color or property channel.
    pub fn outputs_of_type(&self, port_type: PortType) -> impl Iterator<Item = &Port> {
        self.outputs
            .iter()
            .filter(move |p| p.port_type() == port_type)
    }

    /// Handle to a function-level input.
    #[must_use]
    pub fn input_handle(&self, identifier: &str) -> Option<PortHandle> {
        let index = self
            .inputs
            .iter()
            .position(|p| p.identifier() == identifier)?;
        Some(PortHandle::new(
            self.resource_id,
            PortLocation::FunctionInput(index),
        ))
    }

    /// Handle to a function-level output.
    #[must_use]
    pub fn output_handle(&self, identifier: &str) -> Option<PortHandle> {
        let index = self
            .outputs
            .iter()
            .position(|p| p.identifier() == identifier)?;
        Some(PortHandle::new(
            self.resource_id,
            PortLocation::FunctionOutput(index),
        ))
    }

    /// Set the default value of a scalar function-level input.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPort` if no input has the identifier and
    /// `TypeMismatch` if the input is not a scalar.
    pub fn set_input_default(&mut self, identifier: &str, value: f64) -> ImplicitResult<()> {
        let resource_id = self.resource_id;
        let port = self
            .inputs
            .iter_mut()
            .find(|p| p.identifier() == identifier)
            .ok_or_else(|| {
                ImplicitError::unknown_port(identifier, format!("inputs of function {resource_id}"))
            })?;
        if port.port_type() != PortType::Scalar {
            return Err(ImplicitError::type_mismatch(
                PortType::Scalar,
                port.port_type(),
                format!("default value of input {identifier}"),
            ));
        }
        port.set_default_value(value);
        Ok(())
    }

    /// Add a node with the opcode's default configuration.
    ///
    /// All template ports are materialized with their catalog types. The
    /// returned graph id stays valid for the lifetime of the function.
    ///
    /// # Errors
    ///
    /// Fails with `DuplicateIdentifier` when a node of that identifier
    /// already exists and `InvalidIdentifier` for unusable names.
    pub fn add_node(
        &mut self,
        node_type: NodeType,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node_with_configuration(
            node_type,
            catalog::default_configuration(node_type),
            identifier,
            display_name,
            tag,
        )
    }

    /// Add a node, selecting one of the opcode's allowed configurations.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidConfiguration` when the opcode does not allow
    /// the configuration, plus the identifier errors of [`Self::add_node`].
    pub fn add_node_with_configuration(
        &mut self,
        node_type: NodeType,
        configuration: NodeConfiguration,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        let identifier = identifier.into();
        Self::check_identifier(&identifier, true)?;
        if self.nodes.iter().any(|n| n.identifier() == identifier) {
            return Err(ImplicitError::duplicate_identifier(
                identifier,
                format!("nodes of function {}", self.resource_id),
            ));
        }
        let graph_id = GraphId(self.next_graph_id);
        let node = Node::new(
            graph_id,
            self.resource_id,
            node_type,
            configuration,
            identifier,
            display_name,
            tag,
        )?;
        self.next_graph_id += 1;
        self.nodes.push(node);
        Ok(graph_id)
    }

    /// Add a `constant` node.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node`].
    pub fn add_constant_node(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node(NodeType::Constant, identifier, display_name, tag)
    }

    /// Add a `constvec` node.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node`].
    pub fn add_const_vec_node(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node(NodeType::ConstVec, identifier, display_name, tag)
    }

    /// Add a `constmat` node.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node`].
    pub fn add_const_mat_node(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node(NodeType::ConstMat, identifier, display_name, tag)
    }

    /// Add a `constresourceid` node.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node`].
    pub fn add_resource_id_node(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node(NodeType::ConstResourceId, identifier, display_name, tag)
    }

    /// Add an `addition` node in the given configuration.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node_with_configuration`].
    pub fn add_addition_node(
        &mut self,
        identifier: impl Into<String>,
        configuration: NodeConfiguration,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node_with_configuration(
            NodeType::Addition,
            configuration,
            identifier,
            display_name,
            tag,
        )
    }

    /// Add a `multiplication` node in the given configuration.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node_with_configuration`].
    pub fn add_multiplication_node(
        &mut self,
        identifier: impl Into<String>,
        configuration: NodeConfiguration,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node_with_configuration(
            NodeType::Multiplication,
            configuration,
            identifier,
            display_name,
            tag,
        )
    }

    /// Add a `beamlattice` distance sampler node.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node`].
    pub fn add_beam_lattice_node(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node(NodeType::BeamLattice, identifier, display_name, tag)
    }

    /// Add a `mesh` distance sampler node.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node`].
    pub fn add_mesh_node(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node(NodeType::Mesh, identifier, display_name, tag)
    }

    /// Add a `functioncall` node.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node`].
    pub fn add_function_call_node(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node(NodeType::FunctionCall, identifier, display_name, tag)
    }

    /// Add a `functiongradient` node.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node`].
    pub fn add_function_gradient_node(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node(NodeType::FunctionGradient, identifier, display_name, tag)
    }

    /// Add a `normalizedistance` node.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node`].
    pub fn add_normalize_distance_node(
        &mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> ImplicitResult<GraphId> {
        self.add_node(NodeType::NormalizeDistance, identifier, display_name, tag)
    }

    /// Nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node by graph id.
    #[must_use]
    pub fn node(&self, graph_id: GraphId) -> Option<&Node> {
        self.nodes.get(graph_id.0 as usize)
    }

    /// Look up a node by graph id, mutably.
    #[must_use]
    pub fn node_mut(&mut self, graph_id: GraphId) -> Option<&mut Node> {
        self.nodes.get_mut(graph_id.0 as usize)
    }

    /// Find a node by identifier.
    #[must_use]
    pub fn find_node(&self, identifier: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.identifier() == identifier)
    }

    /// Add a dynamic input port to a `functioncall` node.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownNode` when the graph id does not resolve,
    /// `DomainMismatch` on any opcode other than `functioncall` and
    /// `DuplicateIdentifier` when the node already has that input.
    pub fn add_node_input(
        &mut self,
        graph_id: GraphId,
        identifier: impl Into<String>,
        port_type: PortType,
    ) -> ImplicitResult<PortHandle> {
        let identifier = identifier.into();
        Self::check_identifier(&identifier, false)?;
        let resource_id = self.resource_id;
        let node = self
            .node_mut(graph_id)
            .ok_or_else(|| ImplicitError::unknown_node(graph_id.to_string()))?;
        if node.node_type() != NodeType::FunctionCall {
            return Err(ImplicitError::DomainMismatch {
                operation: "add_node_input",
                node_type: node.node_type(),
            });
        }
        if node.find_input(&identifier).is_some() {
            return Err(ImplicitError::duplicate_identifier(
                identifier,
                format!("inputs of node {}", node.identifier()),
            ));
        }
        let port = node.push_input(Port::new(identifier.clone(), identifier, port_type));
        Ok(PortHandle::new(
            resource_id,
            PortLocation::NodeInput {
                node: graph_id,
                port,
            },
        ))
    }

    /// Add a dynamic output port to a `functioncall` node.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::add_node_input`].
    pub fn add_node_output(
        &mut self,
        graph_id: GraphId,
        identifier: impl Into<String>,
        port_type: PortType,
    ) -> ImplicitResult<PortHandle> {
        let identifier = identifier.into();
        Self::check_identifier(&identifier, false)?;
        let resource_id = self.resource_id;
        let node = self
            .node_mut(graph_id)
            .ok_or_else(|| ImplicitError::unknown_node(graph_id.to_string()))?;
        if node.node_type() != NodeType::FunctionCall {
            return Err(ImplicitError::DomainMismatch {
                operation: "add_node_output",
                node_type: node.node_type(),
            });
        }
        if node.find_output(&identifier).is_some() {
            return Err(ImplicitError::duplicate_identifier(
                identifier,
                format!("outputs of node {}", node.identifier()),
            ));
        }
        let port = node.push_output(Port::new(identifier.clone(), identifier, port_type));
        Ok(PortHandle::new(
            resource_id,
            PortLocation::NodeOutput {
                node: graph_id,
                port,
            },
        ))
    }

    /// Resolve any port handle into the port it names.
    #[must_use]
    pub fn port(&self, handle: PortHandle) -> Option<&Port> {
        if handle.function != self.resource_id {
            return None;
        }
        match handle.location {
            PortLocation::FunctionInput(i) => self.inputs.get(i),
            PortLocation::FunctionOutput(i) => self.outputs.get(i),
            PortLocation::NodeInput { node, port } => {
                self.node(node).and_then(|n| n.inputs().get(port))
            }
            PortLocation::NodeOutput { node, port } => {
                self.node(node).and_then(|n| n.outputs().get(port))
            }
        }
    }

    /// Connect a producer port to a consumer port.
    ///
    /// The producer must be a function-level input or a node output; the
    /// consumer must be a node input or a function-level output. On any
    /// failure neither endpoint is modified.
    ///
    /// # Errors
    ///
    /// Fails with `CrossFunction` when an endpoint belongs to another
    /// function, `TypeMismatch` when the port types differ,
    /// `AlreadyLinked` when the consumer already has a source, and
    /// `InvalidLink`/`UnknownPort` for unusable endpoints.
    pub fn add_link(&mut self, producer: PortHandle, consumer: PortHandle) -> ImplicitResult<()> {
        if producer.function != self.resource_id || consumer.function != self.resource_id {
            return Err(ImplicitError::CrossFunction {
                producer: producer.function,
                consumer: consumer.function,
            });
        }

        let (source, producer_type) = match producer.location {
            PortLocation::FunctionInput(index) => {
                let port = self.inputs.get(index).ok_or_else(|| {
                    ImplicitError::unknown_port(format!("input #{index}"), "function inputs")
                })?;
                (PortSource::FunctionInput(index), port.port_type())
            }
            PortLocation::NodeOutput { node, port } => {
                let p = self
                    .node(node)
                    .and_then(|n| n.outputs().get(port))
                    .ok_or_else(|| {
                        ImplicitError::unknown_port(format!("output #{port}"), format!("node {node}"))
                    })?;
                (PortSource::NodeOutput { node, port }, p.port_type())
            }
            PortLocation::FunctionOutput(_) | PortLocation::NodeInput { .. } => {
                return Err(ImplicitError::invalid_link(
                    "producer must be a function input or a node output",
                ));
            }
        };

        match consumer.location {
            PortLocation::NodeInput { node, port } => {
                let (node_identifier, consumer_port) = {
                    let n = self
                        .node(node)
                        .ok_or_else(|| ImplicitError::unknown_node(node.to_string()))?;
                    let p = n.inputs().get(port).ok_or_else(|| {
                        ImplicitError::unknown_port(format!("input #{port}"), format!("node {node}"))
                    })?;
                    (n.identifier().to_string(), p.clone())
                };
                if consumer_port.source().is_some() {
                    return Err(ImplicitError::AlreadyLinked {
                        port: consumer_port.identifier().to_string(),
                        context: node_identifier,
                    });
                }
                if consumer_port.port_type() != producer_type {
                    return Err(ImplicitError::type_mismatch(
                        consumer_port.port_type(),
                        producer_type,
                        format!("link into {}.{}", node_identifier, consumer_port.identifier()),
                    ));
                }
                // Checked above, both lookups succeed.
                if let Some(p) = self.node_mut(node).and_then(|n| n.input_mut(port)) {
                    p.set_source(source);
                }
                Ok(())
            }
            PortLocation::FunctionOutput(index) => {
                let port = self.outputs.get(index).ok_or_else(|| {
                    ImplicitError::unknown_port(format!("output #{index}"), "function outputs")
                })?;
                if port.source().is_some() {
                    return Err(ImplicitError::AlreadyLinked {
                        port: port.identifier().to_string(),
                        context: "function outputs".to_string(),
                    });
                }
                if port.port_type() != producer_type {
                    return Err(ImplicitError::type_mismatch(
                        port.port_type(),
                        producer_type,
                        format!("link into function output {}", port.identifier()),
                    ));
                }
                self.outputs[index].set_source(source);
                Ok(())
            }
            PortLocation::FunctionInput(_) | PortLocation::NodeOutput { .. } => Err(
                ImplicitError::invalid_link("consumer must be a node input or a function output"),
            ),
        }
    }

    /// Qualified reference string of a producer (`inputs.<port>` or
    /// `<node>.<port>`), as written to the model XML.
    #[must_use]
    pub fn source_reference(&self, source: PortSource) -> Option<String> {
        match source {
            PortSource::FunctionInput(index) => self
                .inputs
                .get(index)
                .map(|p| format!("{FUNCTION_INPUTS_PREFIX}.{}", p.identifier())),
            PortSource::NodeOutput { node, port } => {
                let n = self.node(node)?;
                let p = n.outputs().get(port)?;
                Some(format!("{}.{}", n.identifier(), p.identifier()))
            }
        }
    }

    /// Resolve a qualified reference string against the current graph.
    #[must_use]
    pub fn resolve_reference(&self, reference: &str) -> Option<PortSource> {
        let (head, tail) = reference.split_once('.')?;
        if head == FUNCTION_INPUTS_PREFIX {
            let index = self.inputs.iter().position(|p| p.identifier() == tail)?;
            Some(PortSource::FunctionInput(index))
        } else {
            let node = self.find_node(head)?;
            let port = node
                .outputs()
                .iter()
                .position(|p| p.identifier() == tail)?;
            Some(PortSource::NodeOutput {
                node: node.graph_id(),
                port,
            })
        }
    }

    /// Port named by a producer source.
    #[must_use]
    pub fn source_port(&self, source: PortSource) -> Option<&Port> {
        match source {
            PortSource::FunctionInput(index) => self.inputs.get(index),
            PortSource::NodeOutput { node, port } => {
                self.node(node).and_then(|n| n.outputs().get(port))
            }
        }
    }

    /// Handle for a producer source, for use with [`Self::add_link`].
    #[must_use]
    pub fn producer_handle(&self, source: PortSource) -> PortHandle {
        let location = match source {
            PortSource::FunctionInput(index) => PortLocation::FunctionInput(index),
            PortSource::NodeOutput { node, port } => PortLocation::NodeOutput { node, port },
        };
        PortHandle::new(self.resource_id, location)
    }

    /// Resolve a qualified reference and link it into a consumer port.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownPort` when the reference does not resolve, plus
    /// the errors of [`Self::add_link`].
    pub fn link_reference(&mut self, reference: &str, consumer: PortHandle) -> ImplicitResult<()> {
        let source = self.resolve_reference(reference).ok_or_else(|| {
            ImplicitError::unknown_port(reference, format!("function {}", self.resource_id))
        })?;
        self.add_link(self.producer_handle(source), consumer)
    }
}
