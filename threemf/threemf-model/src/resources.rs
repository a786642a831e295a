//! Resource types surrounding implicit functions.
//!
//! Level sets, volumetric color and volumetric properties all bind an
//! implicit function's output channel to a consumer. The mesh resource is
//! an opaque stand-in for the external geometry core; only its identity
//! matters for reference resolution.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use threemf_implicit::{ImplicitFunction, ResourceId};

/// Placeholder for a mesh object owned by the geometry core.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshResource {
    resource_id: ResourceId,
    name: String,
}

impl MeshResource {
    pub(crate) fn new(resource_id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            resource_id,
            name: name.into(),
        }
    }

    /// Resource id of the mesh.
    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// Name of the mesh object.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A level-set volume: the zero crossing of a function's scalar output,
/// evaluated against a bounding mesh.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelSet {
    resource_id: ResourceId,
    /// Function whose output defines the surface.
    pub function: ResourceId,
    /// Identifier of the scalar output carrying the distance.
    pub channel: String,
    /// Bounding mesh resource.
    pub mesh: ResourceId,
    /// Smallest feature size the consumer must resolve, in millimeters.
    /// `0.0` means unspecified and is omitted from the serialized form.
    pub min_feature: f64,
}

impl LevelSet {
    /// Create a level set binding `function.channel` against a mesh.
    #[must_use]
    pub fn new(
        resource_id: ResourceId,
        mesh: ResourceId,
        function: ResourceId,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            resource_id,
            function,
            channel: channel.into(),
            mesh,
            min_feature: 0.0,
        }
    }

    /// Resource id of the level set.
    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }
}

/// Volumetric color: a function's vector output interpreted as RGB.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumetricColor {
    /// Function whose output defines the color field.
    pub function: ResourceId,
    /// Identifier of the vector output carrying the color.
    pub channel: String,
}

impl VolumetricColor {
    /// Create a color binding for `function.channel`.
    #[must_use]
    pub fn new(function: ResourceId, channel: impl Into<String>) -> Self {
        Self {
            function,
            channel: channel.into(),
        }
    }
}

/// A named volumetric property: a function's scalar output sampled
/// throughout the volume.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumetricProperty {
    /// Name of the property.
    pub name: String,
    /// Function whose output defines the property field.
    pub function: ResourceId,
    /// Identifier of the scalar output carrying the value.
    pub channel: String,
}

impl VolumetricProperty {
    /// Create a property binding for `function.channel`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        function: ResourceId,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            function,
            channel: channel.into(),
        }
    }
}

/// Volumetric data attached to an object: at most one color field plus a
/// list of named property fields.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeData {
    resource_id: ResourceId,
    color: Option<VolumetricColor>,
    properties: Vec<VolumetricProperty>,
}

impl VolumeData {
    /// Create an empty volume data block with the given resource id.
    #[must_use]
    pub fn new(resource_id: ResourceId) -> Self {
        Self {
            resource_id,
            color: None,
            properties: Vec::new(),
        }
    }

    /// Resource id of the volume data block.
    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// The color field, if one is set.
    #[must_use]
    pub fn color(&self) -> Option<&VolumetricColor> {
        self.color.as_ref()
    }

    /// Set or replace the color field.
    pub fn set_color(&mut self, color: VolumetricColor) {
        self.color = Some(color);
    }

    /// Remove the color field.
    pub fn remove_color(&mut self) {
        self.color = None;
    }

    /// Property fields in insertion order.
    #[must_use]
    pub fn properties(&self) -> &[VolumetricProperty] {
        &self.properties
    }

    /// Append a property field.
    pub fn add_property(&mut self, property: VolumetricProperty) {
        self.properties.push(property);
    }

    /// Remove the property at the given index, if it exists.
    pub fn remove_property(&mut self, index: usize) {
        if index < self.properties.len() {
            self.properties.remove(index);
        }
    }
}

/// One resource in a 3MF model.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Resource {
    /// An implicit function graph.
    Function(ImplicitFunction),
    /// A mesh object (opaque placeholder).
    Mesh(MeshResource),
    /// A level-set volume.
    LevelSet(LevelSet),
    /// Volumetric color/property data.
    VolumeData(VolumeData),
}

impl Resource {
    /// Resource id of any resource kind.
    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        match self {
            Self::Function(f) => f.resource_id(),
            Self::Mesh(m) => m.resource_id(),
            Self::LevelSet(l) => l.resource_id(),
            Self::VolumeData(v) => v.resource_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn volume_data_color_lifecycle() {
        let mut vd = VolumeData::new(9);
        assert!(vd.color().is_none());
        vd.set_color(VolumetricColor::new(3, "rgb"));
        assert!(vd.color().is_some());
        vd.remove_color();
        assert!(vd.color().is_none());
    }

    #[test]
    fn volume_data_properties_keep_order() {
        let mut vd = VolumeData::new(9);
        vd.add_property(VolumetricProperty::new("density", 3, "rho"));
        vd.add_property(VolumetricProperty::new("stiffness", 3, "k"));
        assert_eq!(vd.properties().len(), 2);
        assert_eq!(vd.properties()[0].name, "density");
        vd.remove_property(0);
        assert_eq!(vd.properties()[0].name, "stiffness");
        vd.remove_property(5);
        assert_eq!(vd.properties().len(), 1);
    }

    #[test]
    fn level_set_defaults() {
        let ls = LevelSet::new(4, 1, 2, "shape");
        assert_eq!(ls.resource_id(), 4);
        assert_eq!(ls.mesh, 1);
        assert_eq!(ls.function, 2);
        assert_relative_eq!(ls.min_feature, 0.0);
    }
}
