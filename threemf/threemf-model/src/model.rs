//! The model: an ordered resource store with a monotonic id allocator.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use threemf_implicit::{
    validate as validate_function, Diagnostic, DiagnosticKind, ImplicitFunction, PortType,
    ResourceId, ResourceStore,
};

use crate::error::{ModelError, ModelResult};
use crate::resources::{LevelSet, MeshResource, Resource, VolumeData};

/// A 3MF model: the exclusive owner of all resources.
///
/// Resources are kept in insertion order; serialization depends on that
/// order being stable. Resource ids are allocated monotonically starting
/// at `1` and are never reused.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Model {
    resources: Vec<Resource>,
    next_resource_id: ResourceId,
}

impl Model {
    /// Create an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
            next_resource_id: 1,
        }
    }

    fn allocate_id(&mut self) -> ResourceId {
        let id = self.next_resource_id.max(1);
        self.next_resource_id = id + 1;
        id
    }

    /// Resources in insertion order.
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Look up a resource by id.
    #[must_use]
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.iter().find(|r| r.resource_id() == id)
    }

    /// Add an empty implicit function, returning its resource id.
    pub fn add_implicit_function(&mut self, display_name: impl Into<String>) -> ResourceId {
        let id = self.allocate_id();
        self.resources
            .push(Resource::Function(ImplicitFunction::new(id, display_name)));
        id
    }

    /// Add a mesh placeholder, returning its resource id.
    pub fn add_mesh(&mut self, name: impl Into<String>) -> ResourceId {
        let id = self.allocate_id();
        self.resources.push(Resource::Mesh(MeshResource::new(id, name)));
        id
    }

    /// Add an empty volume data block, returning its resource id.
    pub fn add_volume_data(&mut self) -> ResourceId {
        let id = self.allocate_id();
        self.resources.push(Resource::VolumeData(VolumeData::new(id)));
        id
    }

    /// Add a level set binding `function.channel` against a mesh.
    ///
    /// The binding is checked eagerly: the mesh and function must exist
    /// and the channel must be a scalar output of the function.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource`, `NotAFunction`, `UnknownChannel` or
    /// `ChannelTypeMismatch` when the binding does not resolve.
    pub fn add_level_set(
        &mut self,
        mesh: ResourceId,
        function: ResourceId,
        channel: impl Into<String>,
    ) -> ModelResult<ResourceId> {
        let channel = channel.into();
        if self.resource(mesh).is_none() {
            return Err(ModelError::UnknownResource { id: mesh });
        }
        self.check_channel(function, &channel, PortType::Scalar)?;
        let id = self.allocate_id();
        self.resources
            .push(Resource::LevelSet(LevelSet::new(id, mesh, function, channel)));
        Ok(id)
    }

    /// Insert a fully built resource, keeping its id.
    ///
    /// Used by the codec, which reads resource ids from the document. The
    /// id allocator is advanced past the inserted id.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateResourceId` when the id is already taken.
    pub fn insert_resource(&mut self, resource: Resource) -> ModelResult<()> {
        let id = resource.resource_id();
        if self.resource(id).is_some() {
            return Err(ModelError::DuplicateResourceId { id });
        }
        self.next_resource_id = self.next_resource_id.max(id + 1);
        self.resources.push(resource);
        Ok(())
    }

    /// Look up an implicit function by resource id.
    #[must_use]
    pub fn function(&self, id: ResourceId) -> Option<&ImplicitFunction> {
        match self.resource(id) {
            Some(Resource::Function(f)) => Some(f),
            _ => None,
        }
    }

    /// Look up an implicit function by resource id, mutably.
    #[must_use]
    pub fn function_mut(&mut self, id: ResourceId) -> Option<&mut ImplicitFunction> {
        self.resources.iter_mut().find_map(|r| match r {
            Resource::Function(f) if f.resource_id() == id => Some(f),
            _ => None,
        })
    }

    /// Look up a volume data block by resource id, mutably.
    #[must_use]
    pub fn volume_data_mut(&mut self, id: ResourceId) -> Option<&mut VolumeData> {
        self.resources.iter_mut().find_map(|r| match r {
            Resource::VolumeData(v) if v.resource_id() == id => Some(v),
            _ => None,
        })
    }

    /// Implicit functions in insertion order.
    pub fn functions(&self) -> impl Iterator<Item = &ImplicitFunction> {
        self.resources.iter().filter_map(|r| match r {
            Resource::Function(f) => Some(f),
            _ => None,
        })
    }

    /// Level sets in insertion order.
    pub fn level_sets(&self) -> impl Iterator<Item = &LevelSet> {
        self.resources.iter().filter_map(|r| match r {
            Resource::LevelSet(l) => Some(l),
            _ => None,
        })
    }

    fn check_channel(
        &self,
        function: ResourceId,
        channel: &str,
        expected: PortType,
    ) -> ModelResult<()> {
        let Some(resource) = self.resource(function) else {
            return Err(ModelError::UnknownResource { id: function });
        };
        let Resource::Function(f) = resource else {
            return Err(ModelError::NotAFunction { id: function });
        };
        let Some(port) = f.find_output(channel) else {
            return Err(ModelError::UnknownChannel {
                function,
                channel: channel.to_string(),
            });
        };
        if port.port_type() != expected {
            return Err(ModelError::ChannelTypeMismatch {
                function,
                channel: channel.to_string(),
                expected,
                actual: port.port_type(),
            });
        }
        Ok(())
    }

    fn channel_diagnostics(
        &self,
        owner: ResourceId,
        function: ResourceId,
        channel: &str,
        expected: PortType,
        context: &str,
    ) -> Option<Diagnostic> {
        match self.check_channel(function, channel, expected) {
            Ok(()) => None,
            Err(ModelError::UnknownResource { .. } | ModelError::NotAFunction { .. }) => {
                Some(Diagnostic {
                    kind: DiagnosticKind::DanglingReference,
                    function: owner,
                    node: None,
                    port: None,
                    message: format!("{context} references missing function {function}"),
                })
            }
            Err(err) => Some(Diagnostic {
                kind: DiagnosticKind::InvalidSignature,
                function: owner,
                node: None,
                port: None,
                message: format!("{context}: {err}"),
            }),
        }
    }

    /// Validate every resource in the model.
    ///
    /// Runs the function validator over each implicit function with this
    /// model as the resource store, then checks the level-set, color and
    /// property channel bindings.
    #[must_use]
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for function in self.functions() {
            diagnostics.extend(validate_function(function, self));
        }

        for resource in &self.resources {
            match resource {
                Resource::LevelSet(level_set) => {
                    let id = level_set.resource_id();
                    if self.resource(level_set.mesh).is_none() {
                        diagnostics.push(Diagnostic {
                            kind: DiagnosticKind::DanglingReference,
                            function: id,
                            node: None,
                            port: None,
                            message: format!(
                                "level set references missing mesh {}",
                                level_set.mesh
                            ),
                        });
                    }
                    diagnostics.extend(self.channel_diagnostics(
                        id,
                        level_set.function,
                        &level_set.channel,
                        PortType::Scalar,
                        "level set",
                    ));
                }
                Resource::VolumeData(volume_data) => {
                    let id = volume_data.resource_id();
                    if let Some(color) = volume_data.color() {
                        diagnostics.extend(self.channel_diagnostics(
                            id,
                            color.function,
                            &color.channel,
                            PortType::Vector,
                            "volumetric color",
                        ));
                    }
                    for property in volume_data.properties() {
                        diagnostics.extend(self.channel_diagnostics(
                            id,
                            property.function,
                            &property.channel,
                            PortType::Scalar,
                            &format!("volumetric property {}", property.name),
                        ));
                    }
                }
                Resource::Function(_) | Resource::Mesh(_) => {}
            }
        }

        debug!(
            resources = self.resources.len(),
            diagnostics = diagnostics.len(),
            "validated model"
        );
        diagnostics
    }
}

impl ResourceStore for Model {
    fn contains(&self, id: ResourceId) -> bool {
        self.resource(id).is_some()
    }

    fn implicit_function(&self, id: ResourceId) -> Option<&ImplicitFunction> {
        self.function(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::resources::{VolumetricColor, VolumetricProperty};

    fn model_with_lattice_function() -> (Model, ResourceId, ResourceId) {
        let mut model = Model::new();
        let mesh = model.add_mesh("pyramid");
        let fid = model.add_implicit_function("lattice field");
        {
            let f = model.function_mut(fid).unwrap();
            let pos = f.add_input("pos", "position", PortType::Vector).unwrap();
            let out = f.add_output("shape", "shape", PortType::Scalar).unwrap();
            let bl = f.add_beam_lattice_node("bl1", "lattice", "").unwrap();
            let res = f.add_resource_id_node("latres", "lattice resource", "").unwrap();
            f.node_mut(res).unwrap().set_resource_id(mesh).unwrap();
            let res_out = f.node(res).unwrap().output_handle("value").unwrap();
            let bl_res = f.node(bl).unwrap().input_handle("beamlattice").unwrap();
            let bl_pos = f.node(bl).unwrap().input_handle("pos").unwrap();
            let bl_out = f.node(bl).unwrap().output_handle("distance").unwrap();
            f.add_link(pos, bl_pos).unwrap();
            f.add_link(res_out, bl_res).unwrap();
            f.add_link(bl_out, out).unwrap();
        }
        (model, mesh, fid)
    }

    #[test]
    fn resource_ids_are_monotonic() {
        let mut model = Model::new();
        let a = model.add_mesh("a");
        let b = model.add_implicit_function("b");
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn insert_resource_rejects_duplicate_ids() {
        let mut model = Model::new();
        let id = model.add_mesh("a");
        let err = model.insert_resource(Resource::Function(ImplicitFunction::new(id, "f")));
        assert!(matches!(err, Err(ModelError::DuplicateResourceId { .. })));
    }

    #[test]
    fn insert_resource_advances_the_allocator() {
        let mut model = Model::new();
        model
            .insert_resource(Resource::Function(ImplicitFunction::new(17, "f")))
            .unwrap();
        let next = model.add_mesh("m");
        assert_eq!(next, 18);
    }

    #[test]
    fn level_set_binding_is_checked_eagerly() {
        let (mut model, mesh, fid) = model_with_lattice_function();

        let err = model.add_level_set(mesh, fid, "missing");
        assert!(matches!(err, Err(ModelError::UnknownChannel { .. })));

        let err = model.add_level_set(mesh, mesh, "shape");
        assert!(matches!(err, Err(ModelError::NotAFunction { .. })));

        let ls = model.add_level_set(mesh, fid, "shape").unwrap();
        assert!(model.resource(ls).is_some());
    }

    #[test]
    fn valid_model_produces_no_diagnostics() {
        let (mut model, mesh, fid) = model_with_lattice_function();
        model.add_level_set(mesh, fid, "shape").unwrap();
        let diagnostics = model.validate();
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    }

    #[test]
    fn color_channel_must_be_a_vector() {
        let (mut model, _, fid) = model_with_lattice_function();
        let vd = model.add_volume_data();
        model
            .volume_data_mut(vd)
            .unwrap()
            .set_color(VolumetricColor::new(fid, "shape"));
        let diagnostics = model.validate();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::InvalidSignature);
    }

    #[test]
    fn property_referencing_missing_function_is_dangling() {
        let (mut model, _, _) = model_with_lattice_function();
        let vd = model.add_volume_data();
        model
            .volume_data_mut(vd)
            .unwrap()
            .add_property(VolumetricProperty::new("density", 999, "rho"));
        let diagnostics = model.validate();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DanglingReference);
    }
}
