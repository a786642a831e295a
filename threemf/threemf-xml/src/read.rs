//! Reading implicit functions and volumetric resources from model XML.
//!
//! The reader consumes a `quick-xml` event stream positioned at the
//! element of interest and returns fully populated resources. Port
//! references (`ref="node.port"`) may point forward to nodes declared
//! later in the document, so links are collected during the element scan
//! and resolved in a second pass once every node exists.

use std::io::BufRead;

use nalgebra::{Matrix4, Vector3};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use threemf_implicit::{
    catalog, GraphId, ImplicitFunction, NodeType, PortType, ResourceId,
};
use threemf_model::{
    LevelSet, Model, Resource, VolumeData, VolumetricColor, VolumetricProperty,
};

use crate::cancel::{ensure_not_cancelled, CancelFlag};
use crate::error::{Warning, WarningKind, XmlError, XmlResult};

/// Reader behavior knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Fail with `SchemaViolation` on values outside their schema range
    /// instead of clamping them and recording a warning.
    pub strict: bool,
}

/// Matrix literal attribute names, row-major.
const MATRIX_ATTRIBUTES: [&str; 16] = [
    "m00", "m01", "m02", "m03", "m10", "m11", "m12", "m13", "m20", "m21", "m22", "m23", "m30",
    "m31", "m32", "m33",
];

enum PendingConsumer {
    NodeInput { node: GraphId, port: String },
    FunctionOutput { port: String },
}

struct PendingLink {
    reference: String,
    node: String,
    consumer: PendingConsumer,
}

/// Parse the first `<implicitfunction>` element of an XML string.
///
/// # Errors
///
/// Returns an error when the document contains no such element or the
/// element is malformed.
pub fn parse_implicit_function_str(
    xml: &str,
    options: ReadOptions,
) -> XmlResult<(ImplicitFunction, Vec<Warning>)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut warnings = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"implicitfunction" => {
                let start = e.to_owned();
                let function =
                    read_implicit_function(&mut reader, &start, options, &mut warnings, None)?;
                return Ok((function, warnings));
            }
            Ok(Event::Eof) => {
                return Err(XmlError::malformed(
                    "document contains no implicitfunction element",
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(XmlError::Malformed(e.to_string())),
        }
        buf.clear();
    }
}

/// Read one implicit function.
///
/// The reader must be positioned immediately after the given
/// `<implicitfunction>` start event; the matching end element is
/// consumed.
///
/// # Errors
///
/// Fatal defects are malformed structure, missing required attributes,
/// duplicate identifiers and unresolved port references. Unknown elements
/// and attributes are recovered from and recorded in `warnings`.
pub fn read_implicit_function<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    options: ReadOptions,
    warnings: &mut Vec<Warning>,
    cancel: Option<&CancelFlag>,
) -> XmlResult<ImplicitFunction> {
    let element = "implicitfunction";
    let id = parse_u32(&require_attribute(start, "id", element)?, "id", element)?;
    let display_name = get_attribute_opt(start, "displayname").unwrap_or_default();

    let mut function = ImplicitFunction::new(id, display_name);
    let mut pending: Vec<PendingLink> = Vec::new();
    let mut buf = Vec::new();

    loop {
        ensure_not_cancelled(cancel)?;
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) => {
                read_function_child(reader, e, true, options, &mut function, &mut pending, warnings)?;
            }
            Ok(Event::Start(ref e)) => {
                read_function_child(reader, e, false, options, &mut function, &mut pending, warnings)?;
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"implicitfunction" => break,
            Ok(Event::Eof) => {
                return Err(XmlError::UnexpectedEof {
                    context: element.to_string(),
                });
            }
            Ok(_) => {}
            Err(e) => return Err(XmlError::Malformed(e.to_string())),
        }
        buf.clear();
    }

    resolve_pending_links(&mut function, pending, warnings)?;

    debug!(
        function = function.resource_id(),
        nodes = function.nodes().len(),
        "read implicit function"
    );
    Ok(function)
}

fn read_function_child<R: BufRead>(
    reader: &mut Reader<R>,
    e: &BytesStart<'_>,
    is_empty: bool,
    options: ReadOptions,
    function: &mut ImplicitFunction,
    pending: &mut Vec<PendingLink>,
    warnings: &mut Vec<Warning>,
) -> XmlResult<()> {
    let name = e.name().as_ref().to_vec();
    match e.local_name().as_ref() {
        b"in" => {
            read_function_port(e, true, function, pending, warnings)?;
            if !is_empty {
                skip_element(reader, &name)?;
            }
        }
        b"out" => {
            read_function_port(e, false, function, pending, warnings)?;
            if !is_empty {
                skip_element(reader, &name)?;
            }
        }
        local => {
            let local = String::from_utf8_lossy(local).into_owned();
            if let Some(node_type) = NodeType::from_str(&local) {
                read_node(reader, e, node_type, is_empty, options, function, pending, warnings)?;
            } else {
                warnings.push(Warning::new(
                    WarningKind::UnknownElement,
                    format!("skipping unknown element <{local}>"),
                ));
                if !is_empty {
                    skip_element(reader, &name)?;
                }
            }
        }
    }
    Ok(())
}

fn read_function_port(
    e: &BytesStart<'_>,
    is_input: bool,
    function: &mut ImplicitFunction,
    pending: &mut Vec<PendingLink>,
    warnings: &mut Vec<Warning>,
) -> XmlResult<()> {
    let element = if is_input { "in" } else { "out" };
    let identifier = require_attribute(e, "identifier", element)?;
    let port_type_name = require_attribute(e, "type", element)?;
    let port_type = PortType::from_str(&port_type_name).ok_or_else(|| {
        XmlError::invalid_attribute("type", element, format!("unknown port type {port_type_name}"))
    })?;
    let display_name =
        get_attribute_opt(e, "displayname").unwrap_or_else(|| identifier.clone());
    let reference = get_attribute_opt(e, "ref");

    for attr in e.attributes().flatten() {
        if let Ok(key) = std::str::from_utf8(attr.key.local_name().as_ref()) {
            match key {
                "identifier" | "displayname" | "type" => {}
                "ref" if !is_input => {}
                other => warnings.push(Warning::new(
                    WarningKind::UnknownAttribute,
                    format!("ignoring attribute {other} on <{element}>"),
                )),
            }
        }
    }

    if is_input {
        function.add_input(identifier, display_name, port_type)?;
    } else {
        function.add_output(identifier.clone(), display_name, port_type)?;
        if let Some(reference) = reference {
            pending.push(PendingLink {
                reference,
                node: "outputs".to_string(),
                consumer: PendingConsumer::FunctionOutput { port: identifier },
            });
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn read_node<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    node_type: NodeType,
    is_empty: bool,
    options: ReadOptions,
    function: &mut ImplicitFunction,
    pending: &mut Vec<PendingLink>,
    warnings: &mut Vec<Warning>,
) -> XmlResult<()> {
    let element = node_type.as_str();
    let identifier = require_attribute(start, "identifier", element)?;
    let display_name =
        get_attribute_opt(start, "displayname").unwrap_or_else(|| identifier.clone());
    let tag = get_attribute_opt(start, "tag").unwrap_or_default();

    let allowed_extras = extra_attributes(node_type);
    let mut extras: Vec<(String, String)> = Vec::new();
    for attr in start.attributes().flatten() {
        let local_name = attr.key.local_name();
        let Ok(key) = std::str::from_utf8(local_name.as_ref()) else {
            continue;
        };
        match key {
            "identifier" | "displayname" | "tag" => {}
            key if allowed_extras.contains(&key) => {
                let value = String::from_utf8_lossy(&attr.value).into_owned();
                extras.push((key.to_string(), value));
            }
            other => warnings.push(Warning::new(
                WarningKind::UnknownAttribute,
                format!("ignoring attribute {other} on <{element}> node {identifier}"),
            )),
        }
    }

    let mut ins: Vec<(String, Option<String>)> = Vec::new();
    let mut outs: Vec<(String, PortType)> = Vec::new();
    if !is_empty {
        read_node_children(reader, element, &mut ins, &mut outs, warnings)?;
    }

    let configuration = catalog::infer_configuration(node_type, outs.first().map(|(_, t)| *t))
        .ok_or_else(|| {
            XmlError::malformed(format!(
                "cannot determine the configuration of <{element}> node {identifier}"
            ))
        })?;

    let graph_id = function.add_node_with_configuration(
        node_type,
        configuration,
        identifier.clone(),
        display_name,
        tag,
    )?;

    apply_payload_attributes(function, graph_id, node_type, &extras, options, warnings)?;

    if node_type == NodeType::FunctionCall {
        for (out_identifier, out_type) in outs {
            function.add_node_output(graph_id, out_identifier, out_type)?;
        }
    } else if let Some(node) = function.node(graph_id) {
        for (out_identifier, out_type) in &outs {
            let matches = node
                .find_output(out_identifier)
                .is_some_and(|p| p.port_type() == *out_type);
            if !matches {
                warnings.push(Warning::new(
                    WarningKind::UnknownElement,
                    format!(
                        "declared output {out_identifier} does not match the \
                         signature of <{element}> node {identifier}"
                    ),
                ));
            }
        }
    }

    for (in_identifier, reference) in ins {
        match reference {
            Some(reference) => pending.push(PendingLink {
                reference,
                node: identifier.clone(),
                consumer: PendingConsumer::NodeInput {
                    node: graph_id,
                    port: in_identifier,
                },
            }),
            None => {
                let known = function
                    .node(graph_id)
                    .is_some_and(|n| n.find_input(&in_identifier).is_some());
                if !known {
                    warnings.push(Warning::new(
                        WarningKind::UnknownElement,
                        format!(
                            "declared input {in_identifier} does not match the \
                             signature of <{element}> node {identifier}"
                        ),
                    ));
                }
            }
        }
    }

    Ok(())
}

fn read_node_children<R: BufRead>(
    reader: &mut Reader<R>,
    element: &str,
    ins: &mut Vec<(String, Option<String>)>,
    outs: &mut Vec<(String, PortType)>,
    warnings: &mut Vec<Warning>,
) -> XmlResult<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) => {
                read_node_port(e, ins, outs, warnings)?;
            }
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                read_node_port(e, ins, outs, warnings)?;
                skip_element(reader, &name)?;
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == element.as_bytes() => break,
            Ok(Event::Eof) => {
                return Err(XmlError::UnexpectedEof {
                    context: element.to_string(),
                });
            }
            Ok(_) => {}
            Err(e) => return Err(XmlError::Malformed(e.to_string())),
        }
        buf.clear();
    }
    Ok(())
}

fn read_node_port(
    e: &BytesStart<'_>,
    ins: &mut Vec<(String, Option<String>)>,
    outs: &mut Vec<(String, PortType)>,
    warnings: &mut Vec<Warning>,
) -> XmlResult<()> {
    match e.local_name().as_ref() {
        b"in" => {
            let identifier = require_attribute(e, "identifier", "in")?;
            let reference = get_attribute_opt(e, "ref");
            ins.push((identifier, reference));
        }
        b"out" => {
            let identifier = require_attribute(e, "identifier", "out")?;
            let type_name = require_attribute(e, "type", "out")?;
            let port_type = PortType::from_str(&type_name).ok_or_else(|| {
                XmlError::invalid_attribute("type", "out", format!("unknown port type {type_name}"))
            })?;
            outs.push((identifier, port_type));
        }
        other => warnings.push(Warning::new(
            WarningKind::UnknownElement,
            format!(
                "skipping unknown element <{}> inside a node",
                String::from_utf8_lossy(other)
            ),
        )),
    }
    Ok(())
}

/// Opcode-specific attributes recognized per node element.
fn extra_attributes(node_type: NodeType) -> &'static [&'static str] {
    match node_type {
        NodeType::Constant | NodeType::ConstResourceId => &["value"],
        NodeType::ConstVec => &["x", "y", "z"],
        NodeType::ConstMat => &MATRIX_ATTRIBUTES,
        NodeType::BeamLattice => &["accuraterange"],
        NodeType::FunctionGradient | NodeType::NormalizeDistance => {
            &["scalarOutputName", "vectorInputName"]
        }
        _ => &[],
    }
}

fn apply_payload_attributes(
    function: &mut ImplicitFunction,
    graph_id: GraphId,
    node_type: NodeType,
    extras: &[(String, String)],
    options: ReadOptions,
    warnings: &mut Vec<Warning>,
) -> XmlResult<()> {
    let element = node_type.as_str();
    let get = |name: &str| extras.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
    let Some(node) = function.node_mut(graph_id) else {
        return Ok(());
    };

    match node_type {
        NodeType::Constant => {
            if let Some(value) = get("value") {
                node.set_constant(parse_f64(value, "value", element)?)?;
            }
        }
        NodeType::ConstVec => {
            match (get("x"), get("y"), get("z")) {
                (Some(x), Some(y), Some(z)) => {
                    let vector = Vector3::new(
                        parse_f64(x, "x", element)?,
                        parse_f64(y, "y", element)?,
                        parse_f64(z, "z", element)?,
                    );
                    node.set_vector(vector)?;
                }
                (None, None, None) => {}
                _ => {
                    return Err(XmlError::invalid_attribute(
                        "x",
                        element,
                        "x, y and z must be given together",
                    ));
                }
            }
        }
        NodeType::ConstMat => {
            let mut components = [0.0_f64; 16];
            let mut present = 0;
            for (component, name) in components.iter_mut().zip(MATRIX_ATTRIBUTES) {
                if let Some(value) = get(name) {
                    *component = parse_f64(value, name, element)?;
                    present += 1;
                }
            }
            if present == 16 {
                node.set_matrix(Matrix4::from_row_slice(&components))?;
            } else if present != 0 {
                return Err(XmlError::invalid_attribute(
                    "m00",
                    element,
                    "all 16 matrix components must be given together",
                ));
            }
        }
        NodeType::ConstResourceId => {
            if let Some(value) = get("value") {
                node.set_resource_id(parse_u32(value, "value", element)?)?;
            }
        }
        NodeType::BeamLattice => {
            if let Some(value) = get("accuraterange") {
                let range = parse_f64(value, "accuraterange", element)?;
                if range < 0.0 {
                    if options.strict {
                        return Err(XmlError::SchemaViolation {
                            message: format!("accuraterange must be >= 0, got {range}"),
                        });
                    }
                    warnings.push(Warning::new(
                        WarningKind::ClampedValue,
                        format!("accuraterange {range} clamped to 0"),
                    ));
                }
                node.set_accurate_range(range)?;
            }
        }
        NodeType::FunctionGradient | NodeType::NormalizeDistance => {
            if let Some(name) = get("scalarOutputName") {
                node.set_scalar_output_name(name)?;
            }
            if let Some(name) = get("vectorInputName") {
                node.set_vector_input_name(name)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn resolve_pending_links(
    function: &mut ImplicitFunction,
    pending: Vec<PendingLink>,
    warnings: &mut Vec<Warning>,
) -> XmlResult<()> {
    for link in pending {
        let Some(source) = function.resolve_reference(&link.reference) else {
            return Err(XmlError::DanglingReference {
                reference: link.reference,
                node: link.node,
            });
        };
        let producer = function.producer_handle(source);

        match link.consumer {
            PendingConsumer::FunctionOutput { port } => {
                let Some(consumer) = function.output_handle(&port) else {
                    // The output was added by this reader, so it exists.
                    continue;
                };
                function.add_link(producer, consumer)?;
            }
            PendingConsumer::NodeInput { node, port } => {
                let Some(node_ref) = function.node(node) else {
                    continue;
                };
                if let Some(consumer) = node_ref.input_handle(&port) {
                    function.add_link(producer, consumer)?;
                } else if node_ref.node_type() == NodeType::FunctionCall {
                    // Dynamic input: its type comes from the producer.
                    let Some(port_type) =
                        function.source_port(source).map(|p| p.port_type())
                    else {
                        continue;
                    };
                    let consumer = function.add_node_input(node, port, port_type)?;
                    function.add_link(producer, consumer)?;
                } else {
                    warnings.push(Warning::new(
                        WarningKind::UnknownElement,
                        format!("node {} has no input {port}", link.node),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Read a `<levelset>` resource element.
///
/// # Errors
///
/// Returns an error on missing or unparsable attributes, and on a
/// negative `minfeature` in strict mode.
pub fn read_level_set(
    start: &BytesStart<'_>,
    options: ReadOptions,
    warnings: &mut Vec<Warning>,
) -> XmlResult<LevelSet> {
    let element = "levelset";
    let id = parse_u32(&require_attribute(start, "id", element)?, "id", element)?;
    let mesh = parse_u32(&require_attribute(start, "meshid", element)?, "meshid", element)?;
    let function = parse_u32(
        &require_attribute(start, "functionid", element)?,
        "functionid",
        element,
    )?;
    let channel = require_attribute(start, "channel", element)?;

    let mut level_set = LevelSet::new(id, mesh, function, channel);
    if let Some(value) = get_attribute_opt(start, "minfeature") {
        let min_feature = parse_f64(&value, "minfeature", element)?;
        if min_feature < 0.0 {
            if options.strict {
                return Err(XmlError::SchemaViolation {
                    message: format!("minfeature must be >= 0, got {min_feature}"),
                });
            }
            warnings.push(Warning::new(
                WarningKind::ClampedValue,
                format!("minfeature {min_feature} clamped to 0"),
            ));
        }
        level_set.min_feature = min_feature.max(0.0);
    }

    for attr in start.attributes().flatten() {
        if let Ok(key) = std::str::from_utf8(attr.key.local_name().as_ref()) {
            match key {
                "id" | "meshid" | "functionid" | "channel" | "minfeature" => {}
                other => warnings.push(Warning::new(
                    WarningKind::UnknownAttribute,
                    format!("ignoring attribute {other} on <{element}>"),
                )),
            }
        }
    }

    Ok(level_set)
}

/// Read a `<volumedata>` resource element and its color/property
/// children.
///
/// # Errors
///
/// Returns an error on malformed structure or missing attributes.
pub fn read_volume_data<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    is_empty: bool,
    warnings: &mut Vec<Warning>,
) -> XmlResult<VolumeData> {
    let element = "volumedata";
    let id = parse_u32(&require_attribute(start, "id", element)?, "id", element)?;
    let mut volume_data = VolumeData::new(id);
    if is_empty {
        return Ok(volume_data);
    }

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) => {
                read_volume_data_child(e, &mut volume_data, warnings)?;
            }
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                read_volume_data_child(e, &mut volume_data, warnings)?;
                skip_element(reader, &name)?;
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"volumedata" => break,
            Ok(Event::Eof) => {
                return Err(XmlError::UnexpectedEof {
                    context: element.to_string(),
                });
            }
            Ok(_) => {}
            Err(e) => return Err(XmlError::Malformed(e.to_string())),
        }
        buf.clear();
    }

    Ok(volume_data)
}

fn read_volume_data_child(
    e: &BytesStart<'_>,
    volume_data: &mut VolumeData,
    warnings: &mut Vec<Warning>,
) -> XmlResult<()> {
    match e.local_name().as_ref() {
        b"color" => {
            let function = parse_u32(
                &require_attribute(e, "functionid", "color")?,
                "functionid",
                "color",
            )?;
            let channel = require_attribute(e, "channel", "color")?;
            volume_data.set_color(VolumetricColor::new(function, channel));
        }
        b"property" => {
            let name = require_attribute(e, "name", "property")?;
            let function = parse_u32(
                &require_attribute(e, "functionid", "property")?,
                "functionid",
                "property",
            )?;
            let channel = require_attribute(e, "channel", "property")?;
            volume_data.add_property(VolumetricProperty::new(name, function, channel));
        }
        other => {
            warnings.push(Warning::new(
                WarningKind::UnknownElement,
                format!(
                    "skipping unknown element <{}> in <volumedata>",
                    String::from_utf8_lossy(other)
                ),
            ));
        }
    }
    Ok(())
}

/// Parse the first `<resources>` element of an XML string into a model.
///
/// # Errors
///
/// Returns an error when the document has no `<resources>` element or
/// any contained resource is malformed.
pub fn parse_resources_str(xml: &str, options: ReadOptions) -> XmlResult<(Model, Vec<Warning>)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut warnings = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"resources" => {
                let model = read_resources(&mut reader, options, &mut warnings, None)?;
                return Ok((model, warnings));
            }
            Ok(Event::Eof) => {
                return Err(XmlError::malformed("document contains no resources element"));
            }
            Ok(_) => {}
            Err(e) => return Err(XmlError::Malformed(e.to_string())),
        }
        buf.clear();
    }
}

/// Read the children of a `<resources>` element into a model.
///
/// The reader must be positioned immediately after the `<resources>`
/// start event. Elements other than `implicitfunction`, `levelset` and
/// `volumedata` (mesh objects, materials) belong to other subsystems and
/// are skipped with a warning.
///
/// # Errors
///
/// Returns an error on malformed structure or duplicate resource ids.
pub fn read_resources<R: BufRead>(
    reader: &mut Reader<R>,
    options: ReadOptions,
    warnings: &mut Vec<Warning>,
    cancel: Option<&CancelFlag>,
) -> XmlResult<Model> {
    let mut model = Model::new();
    let mut buf = Vec::new();

    loop {
        ensure_not_cancelled(cancel)?;
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                read_resource_child(reader, e, false, options, &mut model, warnings, cancel)?;
            }
            Ok(Event::Empty(ref e)) => {
                read_resource_child(reader, e, true, options, &mut model, warnings, cancel)?;
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"resources" => break,
            Ok(Event::Eof) => {
                return Err(XmlError::UnexpectedEof {
                    context: "resources".to_string(),
                });
            }
            Ok(_) => {}
            Err(e) => return Err(XmlError::Malformed(e.to_string())),
        }
        buf.clear();
    }

    debug!(resources = model.resources().len(), "read resources");
    Ok(model)
}

fn read_resource_child<R: BufRead>(
    reader: &mut Reader<R>,
    e: &BytesStart<'_>,
    is_empty: bool,
    options: ReadOptions,
    model: &mut Model,
    warnings: &mut Vec<Warning>,
    cancel: Option<&CancelFlag>,
) -> XmlResult<()> {
    let name = e.name().as_ref().to_vec();
    match e.local_name().as_ref() {
        b"implicitfunction" => {
            if is_empty {
                warnings.push(Warning::new(
                    WarningKind::UnknownElement,
                    "skipping empty implicitfunction element".to_string(),
                ));
            } else {
                let start = e.to_owned();
                let function = read_implicit_function(reader, &start, options, warnings, cancel)?;
                model.insert_resource(Resource::Function(function))?;
            }
        }
        b"levelset" => {
            let level_set = read_level_set(e, options, warnings)?;
            model.insert_resource(Resource::LevelSet(level_set))?;
            if !is_empty {
                skip_element(reader, &name)?;
            }
        }
        b"volumedata" => {
            let start = e.to_owned();
            let volume_data = read_volume_data(reader, &start, is_empty, warnings)?;
            model.insert_resource(Resource::VolumeData(volume_data))?;
        }
        other => {
            warnings.push(Warning::new(
                WarningKind::UnknownElement,
                format!(
                    "skipping element <{}> owned by another subsystem",
                    String::from_utf8_lossy(other)
                ),
            ));
            if !is_empty {
                skip_element(reader, &name)?;
            }
        }
    }
    Ok(())
}

/// Read an attribute by local name, returning `None` when absent.
fn get_attribute_opt(e: &BytesStart<'_>, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return String::from_utf8(attr.value.to_vec()).ok();
        }
    }
    None
}

fn require_attribute(
    e: &BytesStart<'_>,
    name: &'static str,
    element: &str,
) -> XmlResult<String> {
    get_attribute_opt(e, name).ok_or_else(|| XmlError::missing_attribute(name, element))
}

fn parse_f64(value: &str, attribute: &'static str, element: &str) -> XmlResult<f64> {
    value
        .parse()
        .map_err(|e| XmlError::invalid_attribute(attribute, element, format!("{e}: {value:?}")))
}

fn parse_u32(value: &str, attribute: &'static str, element: &str) -> XmlResult<ResourceId> {
    value
        .parse()
        .map_err(|e| XmlError::invalid_attribute(attribute, element, format!("{e}: {value:?}")))
}

/// Skip the current element and all of its children.
fn skip_element<R: BufRead>(reader: &mut Reader<R>, name: &[u8]) -> XmlResult<()> {
    let mut buf = Vec::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == name => {
                depth += 1;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == name => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(XmlError::Malformed(e.to_string())),
        }
        buf.clear();
    }

    Ok(())
}
