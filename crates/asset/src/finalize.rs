//! Turns parsed geometries into the attribute set a renderer binds:
//! every channel present, either as a per-vertex stream or a constant.

use corelib::GeometryResult;

use crate::{
    mesh::{Channel, Geometry},
    tangent::generate_tangents,
};

pub const DEFAULT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
pub const DEFAULT_TANGENT: [f32; 3] = [1.0, 0.0, 0.0];
pub const DEFAULT_TEXCOORD: [f32; 2] = [0.0, 0.0];
pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// A vertex attribute as handed to the renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    /// Tightly packed per-vertex data.
    Stream { components: usize, data: Vec<f32> },
    /// One value shared by every vertex.
    Constant(Vec<f32>),
}

impl Attribute {
    fn stream(channel: Channel, data: Vec<f32>) -> Self {
        Attribute::Stream {
            components: channel.arity(),
            data,
        }
    }

    pub fn components(&self) -> usize {
        match self {
            Attribute::Stream { components, .. } => *components,
            Attribute::Constant(value) => value.len(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Attribute::Constant(_))
    }

    pub fn values(&self) -> &[f32] {
        match self {
            Attribute::Stream { data, .. } => data,
            Attribute::Constant(value) => value,
        }
    }

    /// Raw bytes for buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.values())
    }
}

/// Geometry with a complete attribute set, ready for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderGeometry {
    pub object: String,
    pub groups: Vec<String>,
    pub material: String,
    pub vertex_count: usize,
    pub position: Attribute,
    pub texcoord: Attribute,
    pub normal: Attribute,
    pub color: Attribute,
    pub tangent: Attribute,
}

/// Finalize one geometry. Channels whose length disagrees with the position
/// channel (color, or texcoord/normal from mixed face-vertex forms) are
/// replaced by their constant default.
pub fn finalize(mut geometry: Geometry) -> GeometryResult<RenderGeometry> {
    geometry.drop_empty_channels();
    let vertex_count = geometry.vertex_count();
    let position = geometry.data.remove(&Channel::Position).unwrap_or_default();
    let texcoord = take_complete(&mut geometry, Channel::Texcoord, vertex_count);
    let normal = take_complete(&mut geometry, Channel::Normal, vertex_count);

    let color = match geometry.data.remove(&Channel::Color) {
        Some(color) if color.len() == position.len() => Attribute::stream(Channel::Color, color),
        Some(color) => {
            log::debug!(
                "Geometry '{}': {} color values for {} position values, using default color",
                geometry.object,
                color.len(),
                position.len()
            );
            Attribute::Constant(DEFAULT_COLOR.to_vec())
        }
        None => Attribute::Constant(DEFAULT_COLOR.to_vec()),
    };

    let tangent = match (&texcoord, &normal) {
        (Some(uv), Some(_)) => Attribute::Stream {
            components: 3,
            data: generate_tangents(&position, uv, None)?,
        },
        _ => Attribute::Constant(DEFAULT_TANGENT.to_vec()),
    };

    Ok(RenderGeometry {
        object: geometry.object,
        groups: geometry.groups,
        material: geometry.material,
        vertex_count,
        position: Attribute::stream(Channel::Position, position),
        texcoord: texcoord.map_or_else(
            || Attribute::Constant(DEFAULT_TEXCOORD.to_vec()),
            |data| Attribute::stream(Channel::Texcoord, data),
        ),
        normal: normal.map_or_else(
            || Attribute::Constant(DEFAULT_NORMAL.to_vec()),
            |data| Attribute::stream(Channel::Normal, data),
        ),
        color,
        tangent,
    })
}

/// Remove `channel`, keeping it only when it covers every vertex.
fn take_complete(
    geometry: &mut Geometry,
    channel: Channel,
    vertex_count: usize,
) -> Option<Vec<f32>> {
    let data = geometry.data.remove(&channel)?;
    let found = data.len() / channel.arity();
    if found == vertex_count {
        return Some(data);
    }
    log::debug!(
        "Geometry '{}': {} of {} vertices carry {}, using default {}",
        geometry.object,
        found,
        vertex_count,
        channel.name(),
        channel.name()
    );
    None
}

/// Finalize every geometry, stopping at the first failure.
pub fn finalize_all(geometries: Vec<Geometry>) -> GeometryResult<Vec<RenderGeometry>> {
    geometries.into_iter().map(finalize).collect()
}
