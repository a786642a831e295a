//! End-to-end codec tests: structural and byte-level round trips, the
//! schema-default omission rules, forward references and cancellation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use approx::assert_relative_eq;
use nalgebra::{Matrix4, Vector3};
use quick_xml::events::Event;
use quick_xml::Reader;

use threemf_implicit::{
    validate, GraphId, ImplicitFunction, Node, NodeConfiguration, NodeType, PortType,
};
use threemf_model::{LevelSet, Model, Resource, VolumeData, VolumetricColor, VolumetricProperty};
use threemf_xml::{
    parse_implicit_function_str, parse_resources_str, read_implicit_function,
    write_implicit_function, write_implicit_function_str, write_resources_str, CancelFlag,
    ReadOptions, Warning, XmlError,
};

/// Assert two functions are structurally identical: same ports, nodes,
/// links and payloads in the same order.
fn assert_functions_equal(a: &ImplicitFunction, b: &ImplicitFunction) {
    assert_eq!(a.resource_id(), b.resource_id());
    assert_eq!(a.display_name(), b.display_name());

    assert_eq!(a.inputs().len(), b.inputs().len());
    for (pa, pb) in a.inputs().iter().zip(b.inputs()) {
        assert_eq!(pa.identifier(), pb.identifier());
        assert_eq!(pa.display_name(), pb.display_name());
        assert_eq!(pa.port_type(), pb.port_type());
    }

    assert_eq!(a.outputs().len(), b.outputs().len());
    for (pa, pb) in a.outputs().iter().zip(b.outputs()) {
        assert_eq!(pa.identifier(), pb.identifier());
        assert_eq!(pa.display_name(), pb.display_name());
        assert_eq!(pa.port_type(), pb.port_type());
        let ref_a = pa.source().and_then(|s| a.source_reference(s));
        let ref_b = pb.source().and_then(|s| b.source_reference(s));
        assert_eq!(ref_a, ref_b, "output {} source", pa.identifier());
    }

    assert_eq!(a.nodes().len(), b.nodes().len());
    for (na, nb) in a.nodes().iter().zip(b.nodes()) {
        assert_node_equal(a, na, b, nb);
    }
}

fn assert_node_equal(fa: &ImplicitFunction, na: &Node, fb: &ImplicitFunction, nb: &Node) {
    assert_eq!(na.node_type(), nb.node_type());
    assert_eq!(na.configuration(), nb.configuration());
    assert_eq!(na.identifier(), nb.identifier());
    assert_eq!(na.display_name(), nb.display_name());
    assert_eq!(na.tag(), nb.tag());

    assert_eq!(na.inputs().len(), nb.inputs().len(), "node {}", na.identifier());
    for (pa, pb) in na.inputs().iter().zip(nb.inputs()) {
        assert_eq!(pa.identifier(), pb.identifier());
        assert_eq!(pa.port_type(), pb.port_type());
        let ref_a = pa.source().and_then(|s| fa.source_reference(s));
        let ref_b = pb.source().and_then(|s| fb.source_reference(s));
        assert_eq!(ref_a, ref_b, "{}.{} source", na.identifier(), pa.identifier());
    }

    assert_eq!(na.outputs().len(), nb.outputs().len());
    for (pa, pb) in na.outputs().iter().zip(nb.outputs()) {
        assert_eq!(pa.identifier(), pb.identifier());
        assert_eq!(pa.port_type(), pb.port_type());
    }

    match na.node_type() {
        NodeType::Constant => {
            assert_relative_eq!(na.constant().unwrap(), nb.constant().unwrap());
        }
        NodeType::ConstVec => match (na.vector().ok(), nb.vector().ok()) {
            (Some(va), Some(vb)) => assert_relative_eq!(va, vb),
            (None, None) => {}
            _ => panic!("vector literal initialization differs on {}", na.identifier()),
        },
        NodeType::ConstMat => match (na.matrix().ok(), nb.matrix().ok()) {
            (Some(ma), Some(mb)) => assert_relative_eq!(ma, mb),
            (None, None) => {}
            _ => panic!("matrix literal initialization differs on {}", na.identifier()),
        },
        NodeType::ConstResourceId => {
            assert_eq!(na.resource_id().unwrap(), nb.resource_id().unwrap());
        }
        NodeType::BeamLattice => {
            assert_relative_eq!(na.accurate_range().unwrap(), nb.accurate_range().unwrap());
        }
        NodeType::FunctionGradient | NodeType::NormalizeDistance => {
            assert_eq!(
                na.scalar_output_name().unwrap(),
                nb.scalar_output_name().unwrap()
            );
            assert_eq!(
                na.vector_input_name().unwrap(),
                nb.vector_input_name().unwrap()
            );
        }
        _ => {}
    }
}

/// The beam-lattice level-set function: pos in, distance out, a resource
/// node feeding a lattice sampler.
fn beam_lattice_function(accurate_range: f64) -> ImplicitFunction {
    let mut f = ImplicitFunction::new(7, "lattice field");
    let pos = f.add_input("pos", "position", PortType::Vector).unwrap();
    let out = f
        .add_output("distance", "distance field", PortType::Scalar)
        .unwrap();

    let res = f
        .add_resource_id_node("beamres", "beam resource", "group_bl")
        .unwrap();
    f.node_mut(res).unwrap().set_resource_id(42).unwrap();

    let bl = f
        .add_beam_lattice_node("bl1", "beam lattice node", "group_bl")
        .unwrap();
    f.node_mut(bl).unwrap().set_accurate_range(accurate_range).unwrap();

    let res_out = f.node(res).unwrap().output_handle("value").unwrap();
    let bl_pos = f.node(bl).unwrap().input_handle("pos").unwrap();
    let bl_res = f.node(bl).unwrap().input_handle("beamlattice").unwrap();
    let bl_out = f.node(bl).unwrap().output_handle("distance").unwrap();
    f.add_link(pos, bl_pos).unwrap();
    f.add_link(res_out, bl_res).unwrap();
    f.add_link(bl_out, out).unwrap();
    f
}

fn parse(xml: &str) -> (ImplicitFunction, Vec<Warning>) {
    parse_implicit_function_str(xml, ReadOptions::default()).unwrap()
}

#[test]
fn beam_lattice_round_trip_preserves_accurate_range() {
    let original = beam_lattice_function(3.5);
    let xml = write_implicit_function_str(&original).unwrap();
    let (read_back, warnings) = parse(&xml);

    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    assert_functions_equal(&original, &read_back);

    let lattice_nodes: Vec<_> = read_back
        .nodes()
        .iter()
        .filter(|n| n.node_type() == NodeType::BeamLattice)
        .collect();
    assert_eq!(lattice_nodes.len(), 1);
    assert_relative_eq!(lattice_nodes[0].accurate_range().unwrap(), 3.5);
}

#[test]
fn zero_accurate_range_is_omitted_from_the_output() {
    let original = beam_lattice_function(0.0);
    let xml = write_implicit_function_str(&original).unwrap();

    assert!(
        !xml.contains("accuraterange"),
        "default accuraterange must be omitted:\n{xml}"
    );

    let (read_back, _) = parse(&xml);
    let node = read_back.find_node("bl1").unwrap();
    assert_relative_eq!(node.accurate_range().unwrap(), 0.0);
}

#[test]
fn serialize_parse_serialize_is_byte_stable() {
    let original = beam_lattice_function(3.5);
    let first = write_implicit_function_str(&original).unwrap();
    let (read_back, _) = parse(&first);
    let second = write_implicit_function_str(&read_back).unwrap();
    assert_eq!(first, second);
}

#[test]
fn function_gradient_round_trip_with_custom_names() {
    // The referenced function: pos (vector) in, distance (scalar) out.
    let mut model = Model::new();
    let ref_id = model.add_implicit_function("referenced function");
    {
        let r = model.function_mut(ref_id).unwrap();
        r.add_input("pos", "position", PortType::Vector).unwrap();
        r.add_output("distance", "distance", PortType::Scalar).unwrap();
    }

    let caller_id = model.add_implicit_function("gradient caller");
    {
        let f = model.function_mut(caller_id).unwrap();
        let pos = f.add_input("pos", "position", PortType::Vector).unwrap();
        let step = f.add_input("step", "step size", PortType::Scalar).unwrap();

        let res = f
            .add_resource_id_node("funcres", "function resource", "group_fg")
            .unwrap();
        f.node_mut(res).unwrap().set_resource_id(ref_id).unwrap();

        let fg = f
            .add_function_gradient_node("fg1", "gradient node", "group_fg")
            .unwrap();
        {
            let node = f.node_mut(fg).unwrap();
            node.set_scalar_output_name("distance").unwrap();
            node.set_vector_input_name("pos").unwrap();
        }

        let res_out = f.node(res).unwrap().output_handle("value").unwrap();
        let fg_fid = f.node(fg).unwrap().input_handle("functionID").unwrap();
        let fg_pos = f.node(fg).unwrap().input_handle("pos").unwrap();
        let fg_step = f.node(fg).unwrap().input_handle("step").unwrap();
        f.add_link(res_out, fg_fid).unwrap();
        f.add_link(pos, fg_pos).unwrap();
        f.add_link(step, fg_step).unwrap();

        let out = f
            .add_output("gradient", "gradient vector", PortType::Vector)
            .unwrap();
        let fg_grad = f.node(fg).unwrap().output_handle("gradient").unwrap();
        f.add_link(fg_grad, out).unwrap();
    }

    // Custom names name real ports of the referenced function.
    let caller = model.function(caller_id).unwrap();
    assert!(validate(caller, &model).is_empty());

    let xml = write_implicit_function_str(caller).unwrap();
    assert!(xml.contains("scalarOutputName=\"distance\""));
    assert!(xml.contains("vectorInputName=\"pos\""));

    let (read_back, warnings) = parse(&xml);
    assert!(warnings.is_empty());
    assert_functions_equal(caller, &read_back);

    // A name the referenced function does not expose fails validation.
    let f = model.function_mut(caller_id).unwrap();
    let fg = f.find_node("fg1").unwrap().graph_id();
    f.node_mut(fg)
        .unwrap()
        .set_scalar_output_name("missing")
        .unwrap();
    let caller = model.function(caller_id).unwrap();
    let diagnostics = validate(caller, &model);
    assert!(diagnostics
        .iter()
        .any(|d| d.kind == threemf_implicit::DiagnosticKind::InvalidSignature));
}

#[test]
fn sampler_default_names_are_omitted() {
    let mut f = ImplicitFunction::new(3, "defaults");
    f.add_normalize_distance_node("nd1", "normalize", "").unwrap();
    let xml = write_implicit_function_str(&f).unwrap();
    assert!(!xml.contains("scalarOutputName"));
    assert!(!xml.contains("vectorInputName"));

    let (read_back, _) = parse(&xml);
    let node = read_back.find_node("nd1").unwrap();
    assert_eq!(node.scalar_output_name().unwrap(), "result");
    assert_eq!(node.vector_input_name().unwrap(), "gradient");
}

#[test]
fn forward_references_resolve_on_the_second_pass() {
    let xml = r#"<implicitfunction id="8" displayname="forward">
  <in identifier="pos" displayname="position" type="vector"/>
  <out identifier="shape" displayname="shape" type="scalar" ref="second.result"/>
  <sin identifier="first" displayname="first">
    <in identifier="A" ref="second.result"/>
    <out identifier="result" type="scalar"/>
  </sin>
  <length identifier="second" displayname="second">
    <in identifier="A" ref="inputs.pos"/>
    <out identifier="result" type="scalar"/>
  </length>
</implicitfunction>"#;

    let (function, warnings) = parse(xml);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let first = function.find_node("first").unwrap();
    let source = first.find_input("A").unwrap().source().unwrap();
    assert_eq!(
        function.source_reference(source).unwrap(),
        "second.result"
    );
    assert_eq!(
        function.outputs()[0]
            .source()
            .and_then(|s| function.source_reference(s))
            .unwrap(),
        "second.result"
    );
}

#[test]
fn unresolved_reference_is_fatal() {
    let xml = r#"<implicitfunction id="8" displayname="broken">
  <in identifier="pos" displayname="position" type="vector"/>
  <length identifier="len" displayname="len">
    <in identifier="A" ref="ghost.result"/>
    <out identifier="result" type="scalar"/>
  </length>
</implicitfunction>"#;

    let err = parse_implicit_function_str(xml, ReadOptions::default());
    assert!(matches!(err, Err(XmlError::DanglingReference { .. })));
}

#[test]
fn unknown_elements_and_attributes_become_warnings() {
    let xml = r#"<implicitfunction id="9" displayname="noisy">
  <in identifier="pos" displayname="position" type="vector" flavor="spicy"/>
  <warp identifier="w1">
    <in identifier="A"/>
  </warp>
  <length identifier="len" displayname="len">
    <in identifier="A" ref="inputs.pos"/>
    <out identifier="result" type="scalar"/>
  </length>
</implicitfunction>"#;

    let (function, warnings) = parse(xml);
    assert_eq!(function.nodes().len(), 1, "unknown node element is skipped");
    assert!(warnings
        .iter()
        .any(|w| w.kind == threemf_xml::WarningKind::UnknownElement));
    assert!(warnings
        .iter()
        .any(|w| w.kind == threemf_xml::WarningKind::UnknownAttribute));
}

#[test]
fn negative_accurate_range_clamps_by_default() {
    let xml = r#"<implicitfunction id="4" displayname="clamp">
  <beamlattice identifier="bl1" displayname="bl" accuraterange="-2.5">
    <in identifier="pos"/>
    <in identifier="beamlattice"/>
    <out identifier="distance" type="scalar"/>
  </beamlattice>
</implicitfunction>"#;

    let (function, warnings) = parse(xml);
    let node = function.find_node("bl1").unwrap();
    assert_relative_eq!(node.accurate_range().unwrap(), 0.0);
    assert!(warnings
        .iter()
        .any(|w| w.kind == threemf_xml::WarningKind::ClampedValue));
}

#[test]
fn negative_accurate_range_fails_in_strict_mode() {
    let xml = r#"<implicitfunction id="4" displayname="clamp">
  <beamlattice identifier="bl1" displayname="bl" accuraterange="-2.5">
    <in identifier="pos"/>
    <in identifier="beamlattice"/>
    <out identifier="distance" type="scalar"/>
  </beamlattice>
</implicitfunction>"#;

    let err = parse_implicit_function_str(xml, ReadOptions { strict: true });
    assert!(matches!(err, Err(XmlError::SchemaViolation { .. })));
}

#[test]
fn literal_payloads_round_trip() {
    let mut f = ImplicitFunction::new(11, "literals");
    let c = f.add_constant_node("c", "constant", "").unwrap();
    f.node_mut(c).unwrap().set_constant(0.01).unwrap();

    let v = f.add_const_vec_node("v", "vector", "").unwrap();
    f.node_mut(v)
        .unwrap()
        .set_vector(Vector3::new(1.5, -2.25, 3.0))
        .unwrap();

    let m = f.add_const_mat_node("m", "matrix", "").unwrap();
    let mut matrix = Matrix4::identity();
    matrix[(0, 3)] = 4.5;
    matrix[(2, 1)] = -0.125;
    f.node_mut(m).unwrap().set_matrix(matrix).unwrap();

    // An uninitialized vector literal stays uninitialized.
    f.add_const_vec_node("empty", "empty vector", "").unwrap();

    let xml = write_implicit_function_str(&f).unwrap();
    let (read_back, warnings) = parse(&xml);
    assert!(warnings.is_empty());
    assert_functions_equal(&f, &read_back);
    assert!(read_back.find_node("empty").unwrap().vector().is_err());
}

#[test]
fn arithmetic_configuration_survives_the_round_trip() {
    let mut f = ImplicitFunction::new(12, "math");
    let a = f.add_input("a", "a", PortType::Vector).unwrap();
    let b = f.add_input("b", "b", PortType::Vector).unwrap();
    let out = f.add_output("sum", "sum", PortType::Vector).unwrap();

    let add = f
        .add_addition_node("add1", NodeConfiguration::VectorToVector, "vector add", "")
        .unwrap();
    let add_a = f.node(add).unwrap().input_handle("A").unwrap();
    let add_b = f.node(add).unwrap().input_handle("B").unwrap();
    let add_out = f.node(add).unwrap().output_handle("result").unwrap();
    f.add_link(a, add_a).unwrap();
    f.add_link(b, add_b).unwrap();
    f.add_link(add_out, out).unwrap();

    let xml = write_implicit_function_str(&f).unwrap();
    let (read_back, _) = parse(&xml);
    assert_eq!(
        read_back.find_node("add1").unwrap().configuration(),
        NodeConfiguration::VectorToVector
    );
    assert_functions_equal(&f, &read_back);
}

#[test]
fn function_call_round_trip_keeps_dynamic_ports() {
    let mut f = ImplicitFunction::new(13, "caller");
    let pos = f.add_input("pos", "position", PortType::Vector).unwrap();
    let out = f.add_output("distance", "distance", PortType::Scalar).unwrap();

    let res = f.add_resource_id_node("funcres", "resource", "").unwrap();
    f.node_mut(res).unwrap().set_resource_id(5).unwrap();

    let call = f.add_function_call_node("call1", "call", "").unwrap();
    let res_out = f.node(res).unwrap().output_handle("value").unwrap();
    let call_fid = f.node(call).unwrap().input_handle("functionID").unwrap();
    f.add_link(res_out, call_fid).unwrap();

    let call_pos = f.add_node_input(call, "pos", PortType::Vector).unwrap();
    f.add_link(pos, call_pos).unwrap();
    let call_out = f.add_node_output(call, "distance", PortType::Scalar).unwrap();
    f.add_link(call_out, out).unwrap();

    let xml = write_implicit_function_str(&f).unwrap();
    let (read_back, warnings) = parse(&xml);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    assert_functions_equal(&f, &read_back);

    let call = read_back.find_node("call1").unwrap();
    assert_eq!(call.inputs().len(), 2);
    assert_eq!(
        call.find_input("pos").map(|p| p.port_type()),
        Some(PortType::Vector)
    );
    assert_eq!(call.outputs().len(), 1);
}

#[test]
fn resources_round_trip_with_level_set_and_volume_data() {
    let mut model = Model::new();
    let fid = model.add_implicit_function("field");
    {
        let f = model.function_mut(fid).unwrap();
        let pos = f.add_input("pos", "position", PortType::Vector).unwrap();
        let shape = f.add_output("shape", "shape", PortType::Scalar).unwrap();
        let rgb = f.add_output("rgb", "color", PortType::Vector).unwrap();
        let len = f.add_node(NodeType::Length, "len", "length", "").unwrap();
        let len_in = f.node(len).unwrap().input_handle("A").unwrap();
        let len_out = f.node(len).unwrap().output_handle("result").unwrap();
        f.add_link(pos, len_in).unwrap();
        f.add_link(len_out, shape).unwrap();
        let vfs = f
            .add_node(NodeType::VectorFromScalar, "spread", "spread", "")
            .unwrap();
        let vfs_in = f.node(vfs).unwrap().input_handle("A").unwrap();
        let vfs_out = f.node(vfs).unwrap().output_handle("result").unwrap();
        f.link_reference("len.result", vfs_in).unwrap();
        f.add_link(vfs_out, rgb).unwrap();
    }

    let mut level_set = LevelSet::new(9, 2, fid, "shape");
    level_set.min_feature = 0.25;
    model.insert_resource(Resource::LevelSet(level_set)).unwrap();

    let mut volume_data = VolumeData::new(10);
    volume_data.set_color(VolumetricColor::new(fid, "rgb"));
    volume_data.add_property(VolumetricProperty::new("density", fid, "shape"));
    model
        .insert_resource(Resource::VolumeData(volume_data))
        .unwrap();

    let xml = write_resources_str(&model).unwrap();
    let (read_back, warnings) = parse_resources_str(&xml, ReadOptions::default()).unwrap();
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    assert_eq!(read_back.resources().len(), model.resources().len());
    assert_functions_equal(model.function(fid).unwrap(), read_back.function(fid).unwrap());

    let level_sets: Vec<_> = read_back.level_sets().collect();
    assert_eq!(level_sets.len(), 1);
    assert_eq!(level_sets[0].function, fid);
    assert_eq!(level_sets[0].channel, "shape");
    assert_relative_eq!(level_sets[0].min_feature, 0.25);

    let Some(Resource::VolumeData(vd)) = read_back.resource(10) else {
        panic!("volume data resource missing");
    };
    assert_eq!(vd.color().map(|c| c.channel.as_str()), Some("rgb"));
    assert_eq!(vd.properties().len(), 1);
    assert_eq!(vd.properties()[0].name, "density");

    // Byte stability holds at the resources level as well.
    let second = write_resources_str(&read_back).unwrap();
    assert_eq!(xml, second);
}

#[test]
fn cancelled_write_fails_fast() {
    let function = beam_lattice_function(1.0);
    let flag = CancelFlag::new();
    flag.cancel();

    let mut buffer = Vec::new();
    let mut writer = quick_xml::Writer::new(std::io::Cursor::new(&mut buffer));
    let err = write_implicit_function(&mut writer, &function, Some(&flag));
    assert!(matches!(err, Err(XmlError::Cancelled)));
}

#[test]
fn cancelled_read_fails_fast() {
    let xml = write_implicit_function_str(&beam_lattice_function(1.0)).unwrap();
    let flag = CancelFlag::new();
    flag.cancel();

    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"implicitfunction" => {
                let start = e.to_owned();
                let mut warnings = Vec::new();
                let err = read_implicit_function(
                    &mut reader,
                    &start,
                    ReadOptions::default(),
                    &mut warnings,
                    Some(&flag),
                );
                assert!(matches!(err, Err(XmlError::Cancelled)));
                return;
            }
            Ok(Event::Eof) => panic!("writer emitted no implicitfunction element"),
            _ => {}
        }
        buf.clear();
    }
}

#[test]
fn iteration_order_is_preserved_across_the_round_trip() {
    let mut f = ImplicitFunction::new(21, "ordered");
    for name in ["alpha", "beta", "gamma"] {
        f.add_input(name, name, PortType::Scalar).unwrap();
    }
    for name in ["one", "two", "three"] {
        f.add_constant_node(name, name, "").unwrap();
    }

    let xml = write_implicit_function_str(&f).unwrap();
    let (read_back, _) = parse(&xml);

    let input_names: Vec<_> = read_back.inputs().iter().map(|p| p.identifier()).collect();
    assert_eq!(input_names, ["alpha", "beta", "gamma"]);
    let node_names: Vec<_> = read_back.nodes().iter().map(Node::identifier).collect();
    assert_eq!(node_names, ["one", "two", "three"]);
    let graph_ids: Vec<GraphId> = read_back.nodes().iter().map(Node::graph_id).collect();
    let mut sorted = graph_ids.clone();
    sorted.sort();
    assert_eq!(graph_ids, sorted, "graph ids follow insertion order");
}
