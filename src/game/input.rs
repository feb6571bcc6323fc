use bevy::prelude::*;
use terrain::{TerrainViewerWorldXz, TerrainWindowRes};
use ui::{TerrainCursorReadout, UiInputCapture};

use crate::game::camera::{OrbitCamera, OrbitCameraSettings, Viewer};

/// Publish the viewer's XZ so the terrain window can follow it.
pub fn update_terrain_viewer_world_xz(
    q_viewer: Query<&Transform, With<Viewer>>,
    mut viewer_xz: ResMut<TerrainViewerWorldXz>,
) {
    let Ok(t) = q_viewer.single() else {
        return;
    };
    let xz = Vec2::new(t.translation.x, t.translation.z);
    if viewer_xz.0 != xz {
        viewer_xz.0 = xz;
    }
}

/// Keep the viewer resting on the surface.
pub fn follow_terrain_height(
    window: Option<Res<TerrainWindowRes>>,
    settings: Res<OrbitCameraSettings>,
    mut q_viewer: Query<&mut Transform, With<Viewer>>,
) {
    let Some(window) = window else {
        return;
    };
    if window.0.is_disposed() {
        return;
    }
    let Ok(mut t) = q_viewer.single_mut() else {
        return;
    };
    let ground = window.0.height_at(t.translation.x, t.translation.z);
    t.translation.y = ground + settings.hover_height;
}

/// Update the terrain point under the mouse cursor.
pub fn update_cursor_hit(
    windows: Query<&Window>,
    camera_q: Query<(&Camera, &GlobalTransform), With<OrbitCamera>>,
    terrain: Option<Res<TerrainWindowRes>>,
    mut hit: ResMut<TerrainCursorReadout>,
    ui_capture: Res<UiInputCapture>,
) {
    hit.0 = None;
    if ui_capture.pointer {
        return;
    }
    let Some(terrain) = terrain else {
        return;
    };
    if terrain.0.is_disposed() {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_q.single() else {
        return;
    };
    let Some(cursor_pos) = window.cursor_position() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(camera_transform, cursor_pos) else {
        return;
    };

    let step = terrain.0.stride() as f32 * terrain.0.map().spacing();
    hit.0 = raycast_to_heightfield(ray, step, |x, z| terrain.0.height_at(x, z));
}

/// March along `ray` until it drops below the surface, then bisect.
fn raycast_to_heightfield(ray: Ray3d, step: f32, height_at: impl Fn(f32, f32) -> f32) -> Option<Vec3> {
    // Only handle rays pointing downwards.
    if ray.direction.y >= -1e-4 {
        return None;
    }

    let max_depth_y = -200.0;
    let t_max = ((ray.origin.y - max_depth_y) / (-ray.direction.y)).clamp(0.0, 10_000.0);
    if t_max <= 0.0 {
        return None;
    }

    let step_y = (step * 0.5).clamp(0.25, 2.0);
    let step_t = (step_y / (-ray.direction.y)).clamp(0.01, 5.0);

    let mut prev_t = 0.0;
    let mut t = step_t;
    while t <= t_max {
        let p = ray.get_point(t);
        if p.y <= height_at(p.x, p.z) {
            let mut lo = prev_t;
            let mut hi = t;
            for _ in 0..12 {
                let mid = 0.5 * (lo + hi);
                let mp = ray.get_point(mid);
                if mp.y <= height_at(mp.x, mp.z) {
                    hi = mid;
                } else {
                    lo = mid;
                }
            }
            let hit_p = ray.get_point(hi);
            return Some(Vec3::new(hit_p.x, height_at(hit_p.x, hit_p.z), hit_p.z));
        }
        prev_t = t;
        t += step_t;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray(origin: Vec3, dir: Vec3) -> Ray3d {
        Ray3d::new(origin, Dir3::new(dir).unwrap())
    }

    #[test]
    fn test_ray_hits_flat_ground() {
        let hit = raycast_to_heightfield(ray(Vec3::new(3.0, 50.0, -4.0), Vec3::NEG_Y), 2.0, |_, _| 5.0)
            .unwrap();
        assert!((hit.x - 3.0).abs() < 1e-3);
        assert_eq!(hit.y, 5.0);
        assert!((hit.z + 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_ray_hits_slope() {
        let hit = raycast_to_heightfield(
            ray(Vec3::new(0.0, 40.0, 0.0), Vec3::new(1.0, -1.0, 0.0)),
            2.0,
            |x, _| x * 0.5,
        )
        .unwrap();
        // 40 - x = x / 2
        assert!((hit.x - 80.0 / 3.0).abs() < 0.05);
    }

    #[test]
    fn test_upward_ray_misses() {
        assert!(raycast_to_heightfield(ray(Vec3::ZERO, Vec3::Y), 2.0, |_, _| 0.0).is_none());
    }
}
