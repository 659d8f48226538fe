use glam::{Mat4, Vec3};

use crate::{node::NodeAsset, scene::SceneAsset};

/// Minimal axis-aligned box enclosing a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(self, other: Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// A box collapsed to a single point has no usable extent.
    pub fn is_degenerate(&self) -> bool {
        self.min.cmpgt(self.max).any() || self.size() == Vec3::ZERO
    }
}

fn collect_node(node: &NodeAsset, parent: Mat4, bounds: &mut Option<Aabb>) {
    let local = node
        .transform
        .as_ref()
        .map(|transform| transform.matrix())
        .unwrap_or(Mat4::IDENTITY);
    let world = parent * local;

    if let Some(mesh) = &node.mesh {
        for primitive in &mesh.primitives {
            for position in &primitive.attributes.position {
                let point = world.transform_point3(Vec3::from_array(*position));
                match bounds {
                    Some(bounds) => bounds.expand(point),
                    None => *bounds = Some(Aabb::from_point(point)),
                }
            }
        }
    }

    for child in &node.children {
        collect_node(child, world, bounds);
    }
}

/// World-space bounds of every vertex in the scene, root transform
/// included. `None` when the scene has no renderable geometry.
pub fn scene_bounds(scene: &SceneAsset) -> Option<Aabb> {
    let root: Mat4 = scene.root_transform.clone().into();
    let mut bounds = None;
    for node in &scene.nodes {
        collect_node(node, root, &mut bounds);
    }
    bounds
}
