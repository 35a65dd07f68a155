//! Scene tree types
//!
//! A scene is a small tree of [`SceneNode`]s. The same tree is evaluated on
//! the CPU (see [`crate::eval`]) and compiled once into WGSL by
//! [`crate::WgslGenerator`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::field::DistanceField;

/// Surface material tag carried alongside every distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    #[default]
    Background,
    Silver,
    Gold,
}

impl Material {
    /// Numeric id used on the GPU (`vec2(distance, id)`)
    pub fn id(self) -> f32 {
        match self {
            Self::Background => 0.0,
            Self::Silver => 1.0,
            Self::Gold => 2.0,
        }
    }

    /// Inverse of [`Material::id`], rounding to the nearest tag
    pub fn from_id(id: f32) -> Self {
        match id.round() as i32 {
            1 => Self::Silver,
            2 => Self::Gold,
            _ => Self::Background,
        }
    }
}

/// Result of evaluating a scene at a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub distance: f32,
    pub material: Material,
}

impl Sample {
    pub fn new(distance: f32, material: Material) -> Self {
        Self { distance, material }
    }
}

/// Coordinate axis, used to build swizzles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub(crate) fn letter(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
            Self::Z => 'z',
        }
    }
}

/// Component reordering applied to the evaluation point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle(pub [Axis; 3]);

impl Swizzle {
    pub const XZY: Self = Self([Axis::X, Axis::Z, Axis::Y]);
    pub const ZXY: Self = Self([Axis::Z, Axis::X, Axis::Y]);

    /// WGSL swizzle suffix, e.g. `"zxy"`
    pub fn suffix(self) -> String {
        self.0.iter().map(|a| a.letter()).collect()
    }
}

/// Node of the scene tree.
///
/// Children are `Arc`s so subtrees can be shared between the grid, the land
/// shell and the combined scene without deep copies.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SceneNode {
    // Primitives
    Sphere {
        radius: f32,
        material: Material,
    },
    /// Infinite cylinder around the z axis
    Cylinder {
        radius: f32,
        material: Material,
    },
    /// Land shell read from an equirectangular distance field
    FieldShell {
        field: Arc<DistanceField>,
        material: Material,
    },

    // Boolean operations
    Union {
        a: Arc<SceneNode>,
        b: Arc<SceneNode>,
    },
    /// `max(-a, b)`: carves `a` out of `b`
    Subtract {
        a: Arc<SceneNode>,
        b: Arc<SceneNode>,
    },
    /// Subtract with a 45 degree chamfer of width `chamfer` along the cut
    ChamferSubtract {
        chamfer: f32,
        a: Arc<SceneNode>,
        b: Arc<SceneNode>,
    },
    Negate {
        inner: Arc<SceneNode>,
    },

    // Domain operations
    /// `(x, y, z) -> (|xy|, 0, z)`
    Revolve {
        inner: Arc<SceneNode>,
    },
    /// Folds the azimuth around z into one sector of width `period`
    AngularRepeat {
        inner: Arc<SceneNode>,
        period: f32,
    },
    Translate {
        inner: Arc<SceneNode>,
        offset: [f32; 3],
    },
    Swizzle {
        inner: Arc<SceneNode>,
        axes: Swizzle,
    },
}

impl SceneNode {
    pub fn sphere(radius: f32, material: Material) -> Self {
        Self::Sphere { radius, material }
    }

    pub fn cylinder(radius: f32, material: Material) -> Self {
        Self::Cylinder { radius, material }
    }

    pub fn field_shell(field: Arc<DistanceField>, material: Material) -> Self {
        Self::FieldShell { field, material }
    }

    pub fn union(a: impl Into<Arc<Self>>, b: impl Into<Arc<Self>>) -> Self {
        Self::Union {
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn subtract(a: impl Into<Arc<Self>>, b: impl Into<Arc<Self>>) -> Self {
        Self::Subtract {
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn chamfer_subtract(chamfer: f32, a: impl Into<Arc<Self>>, b: impl Into<Arc<Self>>) -> Self {
        Self::ChamferSubtract {
            chamfer,
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn negate(inner: impl Into<Arc<Self>>) -> Self {
        Self::Negate {
            inner: inner.into(),
        }
    }

    pub fn revolve(self) -> Self {
        Self::Revolve {
            inner: Arc::new(self),
        }
    }

    pub fn angular_repeat(self, period: f32) -> Self {
        Self::AngularRepeat {
            inner: Arc::new(self),
            period,
        }
    }

    pub fn translate(self, offset: [f32; 3]) -> Self {
        Self::Translate {
            inner: Arc::new(self),
            offset,
        }
    }

    pub fn swizzle(self, axes: Swizzle) -> Self {
        Self::Swizzle {
            inner: Arc::new(self),
            axes,
        }
    }

    /// Number of nodes in the tree, counting shared subtrees once per use
    pub fn node_count(&self) -> usize {
        1 + match self {
            Self::Sphere { .. } | Self::Cylinder { .. } | Self::FieldShell { .. } => 0,
            Self::Union { a, b } | Self::Subtract { a, b } | Self::ChamferSubtract { a, b, .. } => {
                a.node_count() + b.node_count()
            }
            Self::Negate { inner }
            | Self::Revolve { inner }
            | Self::AngularRepeat { inner, .. }
            | Self::Translate { inner, .. }
            | Self::Swizzle { inner, .. } => inner.node_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_ids_round_trip() {
        for m in [Material::Background, Material::Silver, Material::Gold] {
            assert_eq!(Material::from_id(m.id()), m);
        }
        assert_eq!(Material::from_id(1.9), Material::Gold);
        assert_eq!(Material::from_id(-3.0), Material::Background);
    }

    #[test]
    fn swizzle_suffix() {
        assert_eq!(Swizzle::XZY.suffix(), "xzy");
        assert_eq!(Swizzle::ZXY.suffix(), "zxy");
    }

    #[test]
    fn builders_nest() {
        let node = SceneNode::union(
            SceneNode::sphere(1.0, Material::Silver),
            SceneNode::cylinder(0.5, Material::Gold)
                .translate([1.0, 0.0, 0.0])
                .angular_repeat(0.5),
        );
        assert_eq!(node.node_count(), 5);
    }
}
