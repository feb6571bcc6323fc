use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use terrain::{RegenerateTerrain, TerrainDisplay, TerrainStatus, TerrainViewerWorldXz, TerrainWindowRes};

use crate::capture::UiInputCapture;

/// Point under the mouse cursor on the terrain, written by the game crate.
#[derive(Resource, Default, Clone, Copy, Debug)]
pub struct TerrainCursorReadout(pub Option<Vec3>);

/// Seed typed into the panel, applied by the "Regenerate" button.
#[derive(Resource, Debug, Clone, Copy)]
pub struct TerrainPanelState {
    pub seed: f64,
}

impl Default for TerrainPanelState {
    fn default() -> Self {
        Self { seed: 0.3 }
    }
}

pub fn update_display_hotkeys(
    keys: Res<ButtonInput<KeyCode>>,
    ui_capture: Res<UiInputCapture>,
    mut display: ResMut<TerrainDisplay>,
    mut regenerate: ResMut<RegenerateTerrain>,
) {
    if ui_capture.keyboard {
        return;
    }

    if keys.just_pressed(KeyCode::KeyF) {
        display.wireframe = !display.wireframe;
    }
    if keys.just_pressed(KeyCode::KeyR) {
        display.show_reference = !display.show_reference;
    }
    if keys.just_pressed(KeyCode::KeyG) {
        regenerate.request(Some(rand::random::<f64>()));
    }
}

/// Keep the seed field in step with whatever the last generation used.
pub fn sync_panel_seed(status: Res<TerrainStatus>, mut panel: ResMut<TerrainPanelState>) {
    if !status.is_changed() {
        return;
    }
    if let TerrainStatus::Generating { seed } | TerrainStatus::Ready { seed } = *status {
        panel.seed = seed;
    }
}

#[allow(clippy::too_many_arguments)]
pub fn terrain_panel_system(
    mut contexts: EguiContexts,
    status: Res<TerrainStatus>,
    window: Option<Res<TerrainWindowRes>>,
    viewer: Res<TerrainViewerWorldXz>,
    cursor: Res<TerrainCursorReadout>,
    mut panel: ResMut<TerrainPanelState>,
    mut display: ResMut<TerrainDisplay>,
    mut regenerate: ResMut<RegenerateTerrain>,
) {
    let ctx = match contexts.ctx_mut() {
        Ok(ctx) => ctx,
        Err(_) => return,
    };

    let margin = 10.0;
    let panel_width = 280.0;

    // Copies so the resources are only marked changed on a real edit.
    let mut wireframe = display.wireframe;
    let mut show_reference = display.show_reference;
    let mut seed = panel.seed;

    egui::Area::new("terrain_panel".into())
        .fixed_pos(egui::pos2(margin, margin))
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(egui::Color32::from_rgb(35, 35, 35))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(90, 90, 90)))
                .corner_radius(6)
                .inner_margin(8)
                .show(ui, |ui| {
                    ui.set_min_width(panel_width);

                    ui.label(status_text(&status));
                    ui.label(format!("Viewer: {:.1}, {:.1}", viewer.0.x, viewer.0.y));
                    match cursor.0 {
                        Some(p) => ui.label(format!("Cursor: {:.1}, {:.2}, {:.1}", p.x, p.y, p.z)),
                        None => ui.label("Cursor: -"),
                    };

                    if let Some(window) = window.as_ref().map(|w| &w.0) {
                        let map = window.map();
                        let origin = window.window_origin();
                        ui.label(format!("Map: {} x {}", map.sub_x(), map.sub_z()));
                        ui.label(format!(
                            "Window: {} sub, stride {}, origin ({}, {})",
                            window.terrain_sub(),
                            window.stride(),
                            origin.x,
                            origin.y
                        ));
                        ui.label(format!("Last refresh: {} vertices", window.last_refresh_writes()));
                    }

                    ui.separator();
                    ui.checkbox(&mut wireframe, "Wireframe (F)");
                    ui.checkbox(&mut show_reference, "Reference outline (R)");

                    ui.separator();
                    ui.horizontal(|ui| {
                        ui.label("Seed");
                        ui.add(egui::DragValue::new(&mut seed).speed(0.001).range(0.0..=1.0));
                    });
                    ui.horizontal(|ui| {
                        if ui.button("Regenerate").clicked() {
                            regenerate.request(Some(seed));
                        }
                        if ui.button("New seed (G)").clicked() {
                            regenerate.request(Some(rand::random::<f64>()));
                        }
                    });
                });
        });

    if wireframe != display.wireframe || show_reference != display.show_reference {
        display.wireframe = wireframe;
        display.show_reference = show_reference;
    }
    if seed != panel.seed {
        panel.seed = seed;
    }
}

fn status_text(status: &TerrainStatus) -> String {
    match status {
        TerrainStatus::Loading => "Loading config...".to_string(),
        TerrainStatus::Generating { seed } => format!("Generating (seed {seed:.4})..."),
        TerrainStatus::Ready { seed } => format!("Ready (seed {seed:.4})"),
        TerrainStatus::Failed(reason) => format!("Failed: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(&TerrainStatus::Loading), "Loading config...");
        assert_eq!(
            status_text(&TerrainStatus::Ready { seed: 0.3 }),
            "Ready (seed 0.3000)"
        );
        assert!(status_text(&TerrainStatus::Failed("bad".into())).ends_with("bad"));
    }

    #[test]
    fn test_hotkeys_toggle_display() {
        let mut app = App::new();
        app.init_resource::<ButtonInput<KeyCode>>()
            .init_resource::<UiInputCapture>()
            .init_resource::<TerrainDisplay>()
            .init_resource::<RegenerateTerrain>()
            .add_systems(Update, update_display_hotkeys);

        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyF);
        app.update();

        let display = app.world().resource::<TerrainDisplay>();
        assert!(display.wireframe);
        assert!(display.show_reference);
        assert!(!app.world().resource::<RegenerateTerrain>().requested);
    }

    #[test]
    fn test_hotkeys_ignored_while_typing() {
        let mut app = App::new();
        app.init_resource::<ButtonInput<KeyCode>>()
            .insert_resource(UiInputCapture {
                pointer: false,
                keyboard: true,
            })
            .init_resource::<TerrainDisplay>()
            .init_resource::<RegenerateTerrain>()
            .add_systems(Update, update_display_hotkeys);

        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyG);
        app.update();

        assert!(!app.world().resource::<RegenerateTerrain>().requested);
    }

    #[test]
    fn test_seed_follows_status() {
        let mut app = App::new();
        app.insert_resource(TerrainStatus::Ready { seed: 0.75 })
            .init_resource::<TerrainPanelState>()
            .add_systems(Update, sync_panel_seed);
        app.update();
        assert_eq!(app.world().resource::<TerrainPanelState>().seed, 0.75);
    }
}
