//! Display-consistency normalization.
//!
//! Assets arrive with arbitrary authored pivots; re-centering the root
//! about the origin makes them display consistently. Geometry, scale
//! and orientation are never altered, only the root translation.

use log::debug;

use crate::{
    bounds::{scene_bounds, Aabb},
    scene::SceneAsset,
};

/// Translate the scene root so the geometry's bounding-box center lands
/// at the origin. Returns the bounds that were used, after the shift.
///
/// A scene with no renderable geometry has no bounding volume to center
/// on; it is passed through untouched.
pub fn normalize(scene: &mut SceneAsset) -> Option<Aabb> {
    let Some(bounds) = scene_bounds(scene) else {
        debug!("scene has no geometry, skipping centering");
        return None;
    };
    let center = bounds.center();
    scene.root_transform.translation -= center;
    debug!(
        "centered scene: bounds {:?} .. {:?}, shifted by {:?}",
        bounds.min, bounds.max, -center
    );
    Some(Aabb {
        min: bounds.min - center,
        max: bounds.max - center,
    })
}
