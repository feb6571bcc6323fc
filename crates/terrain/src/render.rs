use std::sync::Arc;

use bevy::asset::{LoadState, RenderAssetUsages};
use bevy::camera::visibility::NoFrustumCulling;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, block_on, futures_lite::future};

use crate::assets::TerrainConfigAsset;
use crate::error::GenerationError;
use crate::heightmap::{CancelToken, HeightmapGenerator};
use crate::ribbon::{ReferenceRibbon, RibbonMesh};
use crate::types::{
    PendingGeneration, RegenerateTerrain, TerrainConfig, TerrainDisplay, TerrainEntities,
    TerrainMaterials, TerrainStatus, TerrainViewerWorldXz, TerrainWindowRes,
};
use crate::window::TerrainWindow;

#[derive(Component)]
pub struct TerrainWindowMesh;

#[derive(Component)]
pub struct ReferenceRibbonMesh;

#[derive(Resource, Clone)]
pub struct TerrainConfigHandle(pub Handle<TerrainConfigAsset>);

#[derive(Resource, Clone)]
pub struct TerrainConfigPath(pub String);

pub fn setup_terrain_renderer(
    mut commands: Commands,
    path: Res<TerrainConfigPath>,
    asset_server: Res<AssetServer>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let handle: Handle<TerrainConfigAsset> = asset_server.load(path.0.clone());
    commands.insert_resource(TerrainConfigHandle(handle));

    let window = materials.add(StandardMaterial {
        base_color: Color::srgba(0.0, 1.0, 0.0, 0.5),
        alpha_mode: AlphaMode::Blend,
        perceptual_roughness: 1.0,
        double_sided: true,
        cull_mode: None,
        ..default()
    });
    let reference = materials.add(StandardMaterial {
        base_color: Color::srgba(1.0, 1.0, 1.0, 0.5),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    });

    commands.insert_resource(TerrainMaterials { window, reference });
}

pub fn finish_config_load(
    mut commands: Commands,
    handle: Option<Res<TerrainConfigHandle>>,
    assets: Res<Assets<TerrainConfigAsset>>,
    asset_server: Res<AssetServer>,
    mut request: ResMut<RegenerateTerrain>,
    mut status: ResMut<TerrainStatus>,
) {
    let Some(handle) = handle else {
        return;
    };

    if let LoadState::Failed(err) = asset_server.load_state(&handle.0) {
        error!("failed to load terrain config: {err}");
        *status = TerrainStatus::Failed(err.to_string());
        commands.remove_resource::<TerrainConfigHandle>();
        return;
    }

    let Some(asset) = assets.get(&handle.0) else {
        return;
    };
    let config = asset.0.clone();

    commands.remove_resource::<TerrainConfigHandle>();
    info!(
        "terrain config loaded: {}x{} map, {} window subdivisions, {:?} edges",
        config.map_sub_x, config.map_sub_z, config.terrain_sub, config.edge_policy
    );

    commands.insert_resource(TerrainDisplay {
        wireframe: config.wireframe,
        show_reference: config.show_reference,
    });
    request.request(config.seed);
    commands.insert_resource(config);
}

/// Kick off heightmap generation on the async compute pool when requested.
/// A generation already in flight is cancelled first.
pub fn start_generation(
    mut commands: Commands,
    config: Option<Res<TerrainConfig>>,
    mut request: ResMut<RegenerateTerrain>,
    pending: Option<Res<PendingGeneration>>,
    mut status: ResMut<TerrainStatus>,
) {
    let Some(config) = config else {
        return;
    };
    if !request.requested {
        return;
    }
    request.requested = false;

    if let Some(pending) = pending {
        pending.cancel.cancel();
        commands.remove_resource::<PendingGeneration>();
    }

    let seed = request.seed.unwrap_or_else(|| config.resolve_seed());
    let generator = match HeightmapGenerator::new(config.heightmap_settings(seed)) {
        Ok(generator) => generator,
        Err(e) => {
            error!("rejected terrain settings: {e}");
            *status = TerrainStatus::Failed(e.to_string());
            return;
        }
    };

    info!("generating terrain with seed {seed}");
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let task = AsyncComputeTaskPool::get()
        .spawn(async move { generator.generate_cancellable(&token) });

    commands.insert_resource(PendingGeneration { task, cancel, seed });
    *status = TerrainStatus::Generating { seed };
}

/// Poll the generation task; once the heightmap lands, replace the window
/// and the reference ribbon.
#[allow(clippy::too_many_arguments)]
pub fn collect_generation(
    mut commands: Commands,
    pending: Option<ResMut<PendingGeneration>>,
    config: Option<Res<TerrainConfig>>,
    display: Res<TerrainDisplay>,
    materials: Option<Res<TerrainMaterials>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut entities: ResMut<TerrainEntities>,
    window: Option<ResMut<TerrainWindowRes>>,
    mut status: ResMut<TerrainStatus>,
) {
    let (Some(mut pending), Some(config), Some(materials)) = (pending, config, materials) else {
        return;
    };
    let Some(result) = block_on(future::poll_once(&mut pending.task)) else {
        return;
    };
    let seed = pending.seed;
    commands.remove_resource::<PendingGeneration>();

    let map = match result {
        Ok(map) => Arc::new(map),
        Err(GenerationError::Aborted {
            completed_rows,
            total_rows,
        }) => {
            info!("terrain generation aborted ({completed_rows}/{total_rows} rows)");
            return;
        }
        Err(e) => {
            error!("terrain generation failed: {e}");
            *status = TerrainStatus::Failed(e.to_string());
            return;
        }
    };

    let new_window = match TerrainWindow::new(config.window_parameters(map.clone())) {
        Ok(w) => w,
        Err(e) => {
            error!("rejected terrain window: {e}");
            *status = TerrainStatus::Failed(e.to_string());
            return;
        }
    };

    if let Some(mut old) = window {
        old.0.dispose();
    }
    for entity in [entities.window.take(), entities.reference.take()]
        .into_iter()
        .flatten()
    {
        commands.entity(entity).despawn();
    }

    let window_mesh = meshes.add(mesh_from_window(&new_window, display.wireframe));
    let window_entity = commands
        .spawn((
            TerrainWindowMesh,
            Mesh3d(window_mesh),
            MeshMaterial3d(materials.window.clone()),
            Transform::IDENTITY,
            NoFrustumCulling,
        ))
        .id();

    let ribbon_mesh = meshes.add(mesh_from_ribbon(ReferenceRibbon::build(&map)));
    let ribbon_entity = commands
        .spawn((
            ReferenceRibbonMesh,
            Mesh3d(ribbon_mesh),
            MeshMaterial3d(materials.reference.clone()),
            Transform::from_xyz(0.0, ReferenceRibbon::VERTICAL_OFFSET, 0.0),
            reference_visibility(display.show_reference),
        ))
        .id();

    entities.window = Some(window_entity);
    entities.reference = Some(ribbon_entity);
    commands.insert_resource(TerrainWindowRes(new_window));
    *status = TerrainStatus::Ready { seed };
}

/// Track the viewer and re-upload vertex data when the window moved.
pub fn refresh_terrain_window(
    window: Option<ResMut<TerrainWindowRes>>,
    viewer: Res<TerrainViewerWorldXz>,
    mut meshes: ResMut<Assets<Mesh>>,
    q_mesh: Query<&Mesh3d, With<TerrainWindowMesh>>,
) {
    let Some(mut window) = window else {
        return;
    };
    let reference = Vec3::new(viewer.0.x, 0.0, viewer.0.y);

    match window.0.refresh(reference) {
        Ok(true) => {}
        Ok(false) => return,
        Err(e) => {
            error!("terrain refresh failed: {e}");
            return;
        }
    }

    let Ok(handle) = q_mesh.single() else {
        return;
    };
    let Some(mesh) = meshes.get_mut(&handle.0) else {
        return;
    };
    let data = window.0.mesh();
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, data.positions.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, data.normals.clone());
}

pub fn apply_display_settings(
    mut commands: Commands,
    display: Res<TerrainDisplay>,
    window: Option<Res<TerrainWindowRes>>,
    entities: Res<TerrainEntities>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    if !display.is_changed() {
        return;
    }

    if let Some(entity) = entities.reference {
        commands
            .entity(entity)
            .insert(reference_visibility(display.show_reference));
    }

    if let (Some(window), Some(entity)) = (window, entities.window) {
        if window.0.is_disposed() {
            return;
        }
        let mesh = meshes.add(mesh_from_window(&window.0, display.wireframe));
        commands.entity(entity).insert(Mesh3d(mesh));
    }
}

fn reference_visibility(show: bool) -> Visibility {
    if show {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

fn mesh_from_window(window: &TerrainWindow, wireframe: bool) -> Mesh {
    let data = window.mesh();
    let (topology, indices) = if wireframe {
        (PrimitiveTopology::LineList, data.line_indices.clone())
    } else {
        (PrimitiveTopology::TriangleList, data.indices.clone())
    };

    let mut mesh = Mesh::new(topology, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, data.positions.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, data.normals.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, data.uvs.clone());
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

fn mesh_from_ribbon(data: RibbonMesh) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, data.positions);
    mesh.insert_indices(Indices::U32(data.line_indices));
    mesh
}
