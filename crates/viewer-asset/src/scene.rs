use super::node::{DecomposedTransform, NodeAsset};

/// One decoded scene, ready to hand to the renderer.
///
/// The root transform sits above every node and is the only part of the
/// scene the normalization step touches.
#[derive(Debug, Clone, Default)]
pub struct SceneAsset {
    pub name: Option<String>,
    pub root_transform: DecomposedTransform,
    pub nodes: Vec<NodeAsset>,
}

impl SceneAsset {
    /// Total node count, the root excluded.
    pub fn node_count(&self) -> usize {
        fn count(node: &NodeAsset) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        self.nodes.iter().map(count).sum()
    }
}

#[cfg(test)]
mod test {
    use super::{NodeAsset, SceneAsset};

    #[test]
    fn node_count_includes_descendants() {
        let scene = SceneAsset {
            nodes: vec![NodeAsset {
                children: vec![NodeAsset::default(), NodeAsset::default()],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(scene.node_count(), 3);
        assert_eq!(SceneAsset::default().node_count(), 0);
    }
}
