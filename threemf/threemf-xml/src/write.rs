//! Writing implicit functions and volumetric resources to model XML.
//!
//! Emission order is deterministic: function attributes, the `<in>` list,
//! the `<out>` list, then nodes in insertion order. Attributes equal to
//! their schema defaults are omitted (`accuraterange="0"`, sampler names
//! at their defaults, empty tags), so a write → read cycle reports the
//! same defaults the graph started with.

use std::io::{Cursor, Write};

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::debug;

use threemf_implicit::{catalog, ImplicitFunction, Node, NodeType};
use threemf_model::{LevelSet, Model, Resource, VolumeData};

use crate::cancel::{ensure_not_cancelled, CancelFlag};
use crate::error::{XmlError, XmlResult};

fn write_err<E: std::fmt::Display>(e: E) -> XmlError {
    XmlError::Write(e.to_string())
}

/// Shortest decimal form of a value that parses back to the same bits.
fn format_f64(value: f64) -> String {
    format!("{value}")
}

/// Serialize one implicit function to an indented XML string.
///
/// # Errors
///
/// Returns an error when the graph contains an unserializable link
/// source.
pub fn write_implicit_function_str(function: &ImplicitFunction) -> XmlResult<String> {
    let mut buffer = Vec::new();
    let mut writer = Writer::new_with_indent(Cursor::new(&mut buffer), b' ', 2);
    write_implicit_function(&mut writer, function, None)?;
    String::from_utf8(buffer).map_err(write_err)
}

/// Emit an `<implicitfunction>` element for the function.
///
/// # Errors
///
/// All write errors are fatal; on error the sink contents are
/// unspecified and must be discarded by the caller.
pub fn write_implicit_function<W: Write>(
    writer: &mut Writer<W>,
    function: &ImplicitFunction,
    cancel: Option<&CancelFlag>,
) -> XmlResult<()> {
    let mut root = BytesStart::new("implicitfunction");
    root.push_attribute(("id", function.resource_id().to_string().as_str()));
    root.push_attribute(("displayname", function.display_name()));
    writer.write_event(Event::Start(root)).map_err(write_err)?;

    for port in function.inputs() {
        let mut e = BytesStart::new("in");
        e.push_attribute(("identifier", port.identifier()));
        e.push_attribute(("displayname", port.display_name()));
        e.push_attribute(("type", port.port_type().as_str()));
        writer.write_event(Event::Empty(e)).map_err(write_err)?;
    }

    for port in function.outputs() {
        let mut e = BytesStart::new("out");
        e.push_attribute(("identifier", port.identifier()));
        e.push_attribute(("displayname", port.display_name()));
        e.push_attribute(("type", port.port_type().as_str()));
        if let Some(source) = port.source() {
            let reference = function.source_reference(source).ok_or_else(|| {
                XmlError::Write(format!(
                    "link source of function output {} does not resolve",
                    port.identifier()
                ))
            })?;
            e.push_attribute(("ref", reference.as_str()));
        }
        writer.write_event(Event::Empty(e)).map_err(write_err)?;
    }

    for node in function.nodes() {
        ensure_not_cancelled(cancel)?;
        write_node(writer, function, node)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("implicitfunction")))
        .map_err(write_err)?;

    debug!(
        function = function.resource_id(),
        nodes = function.nodes().len(),
        "wrote implicit function"
    );
    Ok(())
}

fn write_node<W: Write>(
    writer: &mut Writer<W>,
    function: &ImplicitFunction,
    node: &Node,
) -> XmlResult<()> {
    let element = node.node_type().as_str();
    let mut e = BytesStart::new(element);
    e.push_attribute(("identifier", node.identifier()));
    e.push_attribute(("displayname", node.display_name()));
    if !node.tag().is_empty() {
        e.push_attribute(("tag", node.tag()));
    }
    push_payload_attributes(&mut e, node);
    writer.write_event(Event::Start(e)).map_err(write_err)?;

    for port in node.inputs() {
        let mut i = BytesStart::new("in");
        i.push_attribute(("identifier", port.identifier()));
        if let Some(source) = port.source() {
            let reference = function.source_reference(source).ok_or_else(|| {
                XmlError::Write(format!(
                    "link source of {}.{} does not resolve",
                    node.identifier(),
                    port.identifier()
                ))
            })?;
            i.push_attribute(("ref", reference.as_str()));
        }
        writer.write_event(Event::Empty(i)).map_err(write_err)?;
    }

    for port in node.outputs() {
        let mut o = BytesStart::new("out");
        o.push_attribute(("identifier", port.identifier()));
        o.push_attribute(("type", port.port_type().as_str()));
        writer.write_event(Event::Empty(o)).map_err(write_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(element)))
        .map_err(write_err)?;
    Ok(())
}

/// Attach opcode-specific attributes, omitting schema defaults.
fn push_payload_attributes(e: &mut BytesStart<'_>, node: &Node) {
    match node.node_type() {
        NodeType::Constant => {
            if let Ok(value) = node.constant() {
                e.push_attribute(("value", format_f64(value).as_str()));
            }
        }
        NodeType::ConstVec => {
            // An uninitialized literal is written without components.
            if let Ok(vector) = node.vector() {
                e.push_attribute(("x", format_f64(vector.x).as_str()));
                e.push_attribute(("y", format_f64(vector.y).as_str()));
                e.push_attribute(("z", format_f64(vector.z).as_str()));
            }
        }
        NodeType::ConstMat => {
            if let Ok(matrix) = node.matrix() {
                for row in 0..4 {
                    for column in 0..4 {
                        let name = format!("m{row}{column}");
                        e.push_attribute((
                            name.as_str(),
                            format_f64(matrix[(row, column)]).as_str(),
                        ));
                    }
                }
            }
        }
        NodeType::ConstResourceId => {
            if let Ok(id) = node.resource_id() {
                e.push_attribute(("value", id.to_string().as_str()));
            }
        }
        NodeType::BeamLattice => {
            if let Ok(range) = node.accurate_range() {
                if range != 0.0 {
                    e.push_attribute(("accuraterange", format_f64(range).as_str()));
                }
            }
        }
        NodeType::FunctionGradient | NodeType::NormalizeDistance => {
            if let Some((default_scalar, default_vector)) =
                catalog::sampler_defaults(node.node_type())
            {
                if let Ok(name) = node.scalar_output_name() {
                    if name != default_scalar {
                        e.push_attribute(("scalarOutputName", name));
                    }
                }
                if let Ok(name) = node.vector_input_name() {
                    if name != default_vector {
                        e.push_attribute(("vectorInputName", name));
                    }
                }
            }
        }
        _ => {}
    }
}

/// Emit a `<levelset>` resource element.
///
/// # Errors
///
/// All write errors are fatal.
pub fn write_level_set<W: Write>(writer: &mut Writer<W>, level_set: &LevelSet) -> XmlResult<()> {
    let mut e = BytesStart::new("levelset");
    e.push_attribute(("id", level_set.resource_id().to_string().as_str()));
    e.push_attribute(("meshid", level_set.mesh.to_string().as_str()));
    e.push_attribute(("functionid", level_set.function.to_string().as_str()));
    e.push_attribute(("channel", level_set.channel.as_str()));
    if level_set.min_feature != 0.0 {
        e.push_attribute(("minfeature", format_f64(level_set.min_feature).as_str()));
    }
    writer.write_event(Event::Empty(e)).map_err(write_err)
}

/// Emit a `<volumedata>` resource element with its color and property
/// children.
///
/// # Errors
///
/// All write errors are fatal.
pub fn write_volume_data<W: Write>(
    writer: &mut Writer<W>,
    volume_data: &VolumeData,
) -> XmlResult<()> {
    let mut root = BytesStart::new("volumedata");
    root.push_attribute(("id", volume_data.resource_id().to_string().as_str()));

    if volume_data.color().is_none() && volume_data.properties().is_empty() {
        return writer.write_event(Event::Empty(root)).map_err(write_err);
    }

    writer.write_event(Event::Start(root)).map_err(write_err)?;

    if let Some(color) = volume_data.color() {
        let mut e = BytesStart::new("color");
        e.push_attribute(("functionid", color.function.to_string().as_str()));
        e.push_attribute(("channel", color.channel.as_str()));
        writer.write_event(Event::Empty(e)).map_err(write_err)?;
    }

    for property in volume_data.properties() {
        let mut e = BytesStart::new("property");
        e.push_attribute(("name", property.name.as_str()));
        e.push_attribute(("functionid", property.function.to_string().as_str()));
        e.push_attribute(("channel", property.channel.as_str()));
        writer.write_event(Event::Empty(e)).map_err(write_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("volumedata")))
        .map_err(write_err)
}

/// Serialize a model's volumetric resources to an indented XML string.
///
/// # Errors
///
/// All write errors are fatal.
pub fn write_resources_str(model: &Model) -> XmlResult<String> {
    let mut buffer = Vec::new();
    let mut writer = Writer::new_with_indent(Cursor::new(&mut buffer), b' ', 2);
    write_resources(&mut writer, model, None)?;
    String::from_utf8(buffer).map_err(write_err)
}

/// Emit a `<resources>` element for every volumetric resource of the
/// model, in insertion order.
///
/// Mesh resources are placeholders owned by the geometry core and are
/// not emitted here; the surrounding model writer interleaves its own
/// `<object>` elements.
///
/// # Errors
///
/// All write errors are fatal.
pub fn write_resources<W: Write>(
    writer: &mut Writer<W>,
    model: &Model,
    cancel: Option<&CancelFlag>,
) -> XmlResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new("resources")))
        .map_err(write_err)?;

    for resource in model.resources() {
        ensure_not_cancelled(cancel)?;
        match resource {
            Resource::Function(function) => write_implicit_function(writer, function, cancel)?,
            Resource::LevelSet(level_set) => write_level_set(writer, level_set)?,
            Resource::VolumeData(volume_data) => write_volume_data(writer, volume_data)?,
            Resource::Mesh(_) => {}
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("resources")))
        .map_err(write_err)
}
