use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use ui::UiInputCapture;

/// Point the camera orbits; its XZ drives the terrain window.
#[derive(Component)]
pub struct Viewer;

#[derive(Component)]
pub struct OrbitCamera;

#[derive(Resource, Clone)]
pub struct OrbitCameraSettings {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub move_speed: f32,
    pub move_speed_fast: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub mouse_rotate_sensitivity: f32,
    /// Viewer height above the terrain surface.
    pub hover_height: f32,
}

impl Default for OrbitCameraSettings {
    fn default() -> Self {
        Self {
            yaw: 0.8,
            pitch: 0.6,
            distance: 120.0,
            min_distance: 10.0,
            max_distance: 800.0,
            move_speed: 40.0,
            move_speed_fast: 200.0,
            rotate_speed: 1.8,
            zoom_speed: 0.12,
            mouse_rotate_sensitivity: 0.005,
            hover_height: 2.0,
        }
    }
}

pub fn setup_viewer(mut commands: Commands) {
    commands.spawn((Viewer, Transform::from_xyz(0.0, 0.0, 0.0)));
    commands.spawn((OrbitCamera, Camera3d::default(), Transform::default()));
}

pub fn orbit_camera_input(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut settings: ResMut<OrbitCameraSettings>,
    mut q_focus: Query<&mut Transform, With<Viewer>>,
    ui_capture: Res<UiInputCapture>,
) {
    let mut focus = match q_focus.single_mut() {
        Ok(t) => t,
        Err(_) => return,
    };
    let dt = time.delta_secs();

    if !ui_capture.keyboard {
        if keys.pressed(KeyCode::KeyQ) {
            settings.yaw += settings.rotate_speed * dt;
        }
        if keys.pressed(KeyCode::KeyE) {
            settings.yaw -= settings.rotate_speed * dt;
        }
    }

    if !ui_capture.pointer {
        let mut scroll: f32 = 0.0;
        for ev in mouse_wheel.read() {
            scroll += ev.y;
        }
        if scroll.abs() > 0.0 {
            let factor = (1.0 - scroll * settings.zoom_speed).clamp(0.2, 5.0);
            settings.distance =
                (settings.distance * factor).clamp(settings.min_distance, settings.max_distance);
        }

        // Right drag orbits.
        if mouse_buttons.pressed(MouseButton::Right) {
            let mut drag = Vec2::ZERO;
            for ev in mouse_motion.read() {
                drag += ev.delta;
            }
            settings.yaw -= drag.x * settings.mouse_rotate_sensitivity;
            settings.pitch = (settings.pitch + drag.y * settings.mouse_rotate_sensitivity)
                .clamp(0.05, 1.5);
        }
    }

    let mut input = Vec2::ZERO;
    if !ui_capture.keyboard {
        if keys.pressed(KeyCode::KeyW) {
            input.y += 1.0;
        }
        if keys.pressed(KeyCode::KeyS) {
            input.y -= 1.0;
        }
        if keys.pressed(KeyCode::KeyA) {
            input.x += 1.0;
        }
        if keys.pressed(KeyCode::KeyD) {
            input.x -= 1.0;
        }
    }

    if input.length_squared() > 0.0 {
        let speed = if keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight) {
            settings.move_speed_fast
        } else {
            settings.move_speed
        };
        let yaw_rot = Quat::from_rotation_y(settings.yaw);
        let right = yaw_rot * Vec3::X;
        let forward = yaw_rot * Vec3::Z;
        let delta = (right * input.x + forward * input.y) * speed * dt;
        focus.translation += Vec3::new(delta.x, 0.0, delta.z);
    }
}

pub fn update_orbit_camera(
    settings: Res<OrbitCameraSettings>,
    q_focus: Query<&Transform, (With<Viewer>, Without<OrbitCamera>)>,
    mut q_cam: Query<&mut Transform, (With<OrbitCamera>, Without<Viewer>)>,
) {
    let focus = match q_focus.single() {
        Ok(v) => v.translation,
        Err(_) => return,
    };
    let mut cam = match q_cam.single_mut() {
        Ok(c) => c,
        Err(_) => return,
    };

    let rot = Quat::from_euler(EulerRot::YXZ, settings.yaw, settings.pitch, 0.0);
    let offset = rot * Vec3::new(0.0, 0.0, -settings.distance);
    cam.translation = focus + offset;
    cam.look_at(focus, Vec3::Y);
}
