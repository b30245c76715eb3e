//! CPU-side geometry produced by the OBJ parser.

use std::collections::BTreeMap;

use corelib::Vec3;

/// Named per-vertex attribute channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Position,
    Texcoord,
    Normal,
    Color,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Position,
        Channel::Texcoord,
        Channel::Normal,
        Channel::Color,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Position => "position",
            Channel::Texcoord => "texcoord",
            Channel::Normal => "normal",
            Channel::Color => "color",
        }
    }

    /// Components per vertex.
    pub fn arity(self) -> usize {
        match self {
            Channel::Texcoord => 2,
            Channel::Position | Channel::Normal | Channel::Color => 3,
        }
    }
}

/// One emission unit: flat, unindexed triangle data sharing an
/// object/groups/material label.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub object: String,
    pub groups: Vec<String>,
    pub material: String,
    pub data: BTreeMap<Channel, Vec<f32>>,
}

impl Geometry {
    /// Fresh geometry with every channel present and empty.
    pub fn new(object: String, groups: Vec<String>, material: String) -> Self {
        Self {
            object,
            groups,
            material,
            data: Channel::ALL.iter().map(|&c| (c, Vec::new())).collect(),
        }
    }

    pub fn channel(&self, channel: Channel) -> Option<&[f32]> {
        self.data.get(&channel).map(Vec::as_slice)
    }

    pub fn position(&self) -> &[f32] {
        self.channel(Channel::Position).unwrap_or(&[])
    }

    /// Number of vertices held by `channel` (0 when absent).
    pub fn channel_vertices(&self, channel: Channel) -> usize {
        self.channel(channel).map_or(0, |d| d.len() / channel.arity())
    }

    pub fn vertex_count(&self) -> usize {
        self.channel_vertices(Channel::Position)
    }

    pub fn has_vertices(&self) -> bool {
        self.vertex_count() > 0
    }

    pub(crate) fn push(&mut self, channel: Channel, values: &[f32]) {
        self.data.entry(channel).or_default().extend_from_slice(values);
    }

    /// Remove channels that never received data.
    pub(crate) fn drop_empty_channels(&mut self) {
        self.data.retain(|_, values| !values.is_empty());
    }

    pub fn extents(&self) -> Option<Extents> {
        Extents::from_positions(self.position())
    }
}

/// Axis-aligned bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extents {
    pub min: Vec3,
    pub max: Vec3,
}

impl Extents {
    pub fn from_positions(positions: &[f32]) -> Option<Self> {
        let mut points = positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]));
        let first = points.next()?;
        Some(points.fold(
            Self {
                min: first,
                max: first,
            },
            |acc, p| Self {
                min: acc.min.min(p),
                max: acc.max.max(p),
            },
        ))
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Bounds over every geometry that holds positions.
pub fn extents_of(geometries: &[Geometry]) -> Option<Extents> {
    geometries
        .iter()
        .filter_map(Geometry::extents)
        .reduce(Extents::union)
}
