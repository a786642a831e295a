//! Graph validation.
//!
//! Three checks, each collecting diagnostics instead of short-circuiting:
//! port conformance against the catalog, link conformance, and resource
//! reference resolution against a [`ResourceStore`]. Validation never
//! mutates the graph and is idempotent.

use tracing::debug;

use crate::function::ImplicitFunction;
use crate::node::Node;
use crate::port::{Port, PortSource};
use crate::types::{NodeType, PortType, ResourceId};

/// Resource lookup used for reference resolution.
///
/// The model crate implements this for its resource store; validation of
/// a standalone function can use [`EmptyStore`].
pub trait ResourceStore {
    /// Whether a resource with the given id exists.
    fn contains(&self, id: ResourceId) -> bool;

    /// The implicit function with the given id, if that resource is one.
    fn implicit_function(&self, id: ResourceId) -> Option<&ImplicitFunction>;
}

/// A store with no resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyStore;

impl ResourceStore for EmptyStore {
    fn contains(&self, _id: ResourceId) -> bool {
        false
    }

    fn implicit_function(&self, _id: ResourceId) -> Option<&ImplicitFunction> {
        None
    }
}

/// Kind of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A catalog-mandated port is absent.
    MissingPort,
    /// A port exists that the catalog does not allow.
    ExtraPort,
    /// A port exists but with the wrong semantic type.
    PortTypeMismatch,
    /// A required input is neither linked nor defaulted.
    UnlinkedInput,
    /// A recorded link no longer type-checks.
    LinkTypeMismatch,
    /// A resource id resolves to nothing.
    DanglingReference,
    /// A referenced function does not expose the required ports.
    InvalidSignature,
}

/// One validation finding.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Kind of the finding.
    pub kind: DiagnosticKind,
    /// Resource id of the function the finding is in.
    pub function: ResourceId,
    /// Identifier of the node involved, if any.
    pub node: Option<String>,
    /// Identifier of the port involved, if any.
    pub port: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    fn new(
        kind: DiagnosticKind,
        function: ResourceId,
        node: Option<&str>,
        port: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            function,
            node: node.map(str::to_string),
            port: port.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Check every node's ports against its catalog template.
#[must_use]
pub fn validate_ports(function: &ImplicitFunction) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let fid = function.resource_id();

    for node in function.nodes() {
        if node.node_type() == NodeType::FunctionCall {
            // Only the fixed functionID input is checked here; the
            // dynamic remainder is resolved against the referenced
            // function in validate_references.
            match node.find_input("functionID") {
                None => diagnostics.push(Diagnostic::new(
                    DiagnosticKind::MissingPort,
                    fid,
                    Some(node.identifier()),
                    Some("functionID"),
                    "functioncall node is missing its functionID input",
                )),
                Some(p) if p.port_type() != PortType::ResourceId => {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::PortTypeMismatch,
                        fid,
                        Some(node.identifier()),
                        Some("functionID"),
                        format!("functionID must be resourceID, got {}", p.port_type()),
                    ));
                }
                Some(_) => {}
            }
            continue;
        }

        let Some(signature) = crate::catalog::signature(node.node_type(), node.configuration())
        else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::PortTypeMismatch,
                fid,
                Some(node.identifier()),
                None,
                format!(
                    "no catalog signature for {} in configuration {:?}",
                    node.node_type(),
                    node.configuration()
                ),
            ));
            continue;
        };

        check_side(
            &mut diagnostics,
            fid,
            node.identifier(),
            "input",
            signature.inputs,
            node.inputs(),
        );
        check_side(
            &mut diagnostics,
            fid,
            node.identifier(),
            "output",
            signature.outputs,
            node.outputs(),
        );
    }

    diagnostics
}

fn check_side(
    diagnostics: &mut Vec<Diagnostic>,
    function: ResourceId,
    node: &str,
    side: &str,
    templates: &[crate::catalog::PortTemplate],
    ports: &[Port],
) {
    for template in templates {
        match ports.iter().find(|p| p.identifier() == template.identifier) {
            None => diagnostics.push(Diagnostic::new(
                DiagnosticKind::MissingPort,
                function,
                Some(node),
                Some(template.identifier),
                format!("missing {side} port {}", template.identifier),
            )),
            Some(p) if p.port_type() != template.port_type => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::PortTypeMismatch,
                    function,
                    Some(node),
                    Some(template.identifier),
                    format!(
                        "{side} port {} must be {}, got {}",
                        template.identifier,
                        template.port_type,
                        p.port_type()
                    ),
                ));
            }
            Some(_) => {}
        }
    }
    for port in ports {
        if !templates.iter().any(|t| t.identifier == port.identifier()) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::ExtraPort,
                function,
                Some(node),
                Some(port.identifier()),
                format!("unexpected {side} port {}", port.identifier()),
            ));
        }
    }
}

/// Check every recorded link and every required input.
#[must_use]
pub fn validate_links(function: &ImplicitFunction) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let fid = function.resource_id();

    let mut check_consumer = |node: Option<&str>, port: &Port| match port.source() {
        Some(source) => match function.source_port(source) {
            None => diagnostics.push(Diagnostic::new(
                DiagnosticKind::DanglingReference,
                fid,
                node,
                Some(port.identifier()),
                format!("link source of {} no longer resolves", port.identifier()),
            )),
            Some(producer) if producer.port_type() != port.port_type() => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::LinkTypeMismatch,
                    fid,
                    node,
                    Some(port.identifier()),
                    format!(
                        "link into {} expects {}, producer yields {}",
                        port.identifier(),
                        port.port_type(),
                        producer.port_type()
                    ),
                ));
            }
            Some(_) => {}
        },
        None if port.default_value().is_none() => diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnlinkedInput,
            fid,
            node,
            Some(port.identifier()),
            format!("{} is neither linked nor defaulted", port.identifier()),
        )),
        None => {}
    };

    for node in function.nodes() {
        for port in node.inputs() {
            check_consumer(Some(node.identifier()), port);
        }
    }
    for port in function.outputs() {
        check_consumer(None, port);
    }

    diagnostics
}

/// Resolve resource-id payloads and referenced-function signatures.
#[must_use]
pub fn validate_references(
    function: &ImplicitFunction,
    store: &dyn ResourceStore,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let fid = function.resource_id();

    for node in function.nodes() {
        match node.node_type() {
            NodeType::ConstResourceId => {
                // resource_id() cannot fail on this opcode
                let id = node.resource_id().unwrap_or(0);
                if id == 0 || !store.contains(id) {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::DanglingReference,
                        fid,
                        Some(node.identifier()),
                        None,
                        format!("resource {id} does not exist in the model"),
                    ));
                }
            }
            NodeType::FunctionCall => {
                if let Some(referenced) = referenced_function(function, node, store, &mut diagnostics)
                {
                    check_call_signature(&mut diagnostics, fid, node, referenced);
                }
            }
            NodeType::FunctionGradient | NodeType::NormalizeDistance => {
                if let Some(referenced) = referenced_function(function, node, store, &mut diagnostics)
                {
                    check_sampler_signature(&mut diagnostics, fid, node, referenced);
                }
            }
            _ => {}
        }
    }

    diagnostics
}

/// Follow a node's `functionID` input back to the resource it names.
///
/// Returns `None` without a diagnostic when the input is unlinked or the
/// id is unresolvable (those defects are reported elsewhere); reports
/// `InvalidSignature` when the id names a resource that is not a
/// function.
fn referenced_function<'a>(
    function: &ImplicitFunction,
    node: &Node,
    store: &'a dyn ResourceStore,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<&'a ImplicitFunction> {
    let source = node.find_input("functionID")?.source()?;
    let PortSource::NodeOutput { node: producer, .. } = source else {
        return None;
    };
    let producer = function.node(producer)?;
    let id = producer.resource_id().ok()?;
    if !store.contains(id) {
        // The producing constresourceid node already gets its
        // DanglingReference diagnostic.
        return None;
    }
    let referenced = store.implicit_function(id);
    if referenced.is_none() {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::InvalidSignature,
            function.resource_id(),
            Some(node.identifier()),
            Some("functionID"),
            format!("resource {id} is not an implicit function"),
        ));
    }
    referenced
}

fn check_call_signature(
    diagnostics: &mut Vec<Diagnostic>,
    fid: ResourceId,
    node: &Node,
    referenced: &ImplicitFunction,
) {
    for expected in referenced.inputs() {
        match node.find_input(expected.identifier()) {
            None => diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidSignature,
                fid,
                Some(node.identifier()),
                Some(expected.identifier()),
                format!(
                    "referenced function requires input {} ({})",
                    expected.identifier(),
                    expected.port_type()
                ),
            )),
            Some(p) if p.port_type() != expected.port_type() => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::InvalidSignature,
                    fid,
                    Some(node.identifier()),
                    Some(expected.identifier()),
                    format!(
                        "input {} must be {}, got {}",
                        expected.identifier(),
                        expected.port_type(),
                        p.port_type()
                    ),
                ));
            }
            Some(_) => {}
        }
    }
    for port in node.inputs() {
        if port.identifier() == "functionID" {
            continue;
        }
        if referenced.find_input(port.identifier()).is_none() {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidSignature,
                fid,
                Some(node.identifier()),
                Some(port.identifier()),
                format!(
                    "referenced function has no input {}",
                    port.identifier()
                ),
            ));
        }
    }
    for port in node.outputs() {
        match referenced.find_output(port.identifier()) {
            None => diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidSignature,
                fid,
                Some(node.identifier()),
                Some(port.identifier()),
                format!(
                    "referenced function has no output {}",
                    port.identifier()
                ),
            )),
            Some(p) if p.port_type() != port.port_type() => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::InvalidSignature,
                    fid,
                    Some(node.identifier()),
                    Some(port.identifier()),
                    format!(
                        "output {} must be {}, referenced function yields {}",
                        port.identifier(),
                        port.port_type(),
                        p.port_type()
                    ),
                ));
            }
            Some(_) => {}
        }
    }
}

fn check_sampler_signature(
    diagnostics: &mut Vec<Diagnostic>,
    fid: ResourceId,
    node: &Node,
    referenced: &ImplicitFunction,
) {
    let Some((default_scalar, default_vector)) = crate::catalog::sampler_defaults(node.node_type())
    else {
        return;
    };
    // Accessors cannot fail on sampler opcodes.
    let scalar_name = node.scalar_output_name().unwrap_or(default_scalar);
    let vector_name = node.vector_input_name().unwrap_or(default_vector);

    // At schema defaults the attributes do not pin a concrete port name,
    // so only the shape of the referenced function is required.
    if scalar_name == default_scalar {
        if referenced.outputs_of_type(PortType::Scalar).next().is_none() {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidSignature,
                fid,
                Some(node.identifier()),
                None,
                "referenced function exposes no scalar output",
            ));
        }
    } else {
        match referenced.find_output(scalar_name) {
            Some(p) if p.port_type() == PortType::Scalar => {}
            _ => diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidSignature,
                fid,
                Some(node.identifier()),
                None,
                format!("referenced function has no scalar output {scalar_name}"),
            )),
        }
    }

    if vector_name == default_vector {
        if referenced
            .inputs()
            .iter()
            .all(|p| p.port_type() != PortType::Vector)
        {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidSignature,
                fid,
                Some(node.identifier()),
                None,
                "referenced function exposes no vector input",
            ));
        }
    } else {
        match referenced.find_input(vector_name) {
            Some(p) if p.port_type() == PortType::Vector => {}
            _ => diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidSignature,
                fid,
                Some(node.identifier()),
                None,
                format!("referenced function has no vector input {vector_name}"),
            )),
        }
    }
}

/// Run all three validation passes.
#[must_use]
pub fn validate(function: &ImplicitFunction, store: &dyn ResourceStore) -> Vec<Diagnostic> {
    let mut diagnostics = validate_ports(function);
    diagnostics.extend(validate_links(function));
    diagnostics.extend(validate_references(function, store));
    debug!(
        function = function.resource_id(),
        diagnostics = diagnostics.len(),
        "validated implicit function"
    );
    diagnostics
}
