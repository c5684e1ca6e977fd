use engine::{ContentError, ResourceCache, Scene};
use glam::{Quat, Vec3};
use thiserror::Error;
use tracing::info;

use super::character::Character;

pub(crate) const SCENE_RESOURCE: &str = "scenes/map.scene.xml";
pub(crate) const WEAPON_RESOURCE: &str = "weapons/rifle.node.xml";
pub(crate) const ENEMY_RESOURCE: &str = "objects/enemy.node.xml";
const SPAWN_POINT_TAG: &str = "SpawnPoint";

const CAMERA_FOV_DEGREES: f32 = 80.0;
const WEAPON_LOCAL_POSITION: Vec3 = Vec3::new(0.104_308, -0.19, 0.227_534);
const WEAPON_LOCAL_ROTATION: Quat = Quat::from_xyzw(0.5, -0.5, 0.5, 0.5);

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("scene {path} has no nodes tagged {tag}")]
    NoSpawnPoints {
        path: &'static str,
        tag: &'static str,
    },
}

/// Loads the map and populates it: the player at the first spawn point with
/// camera and weapon, one enemy per remaining spawn point. Any resource-load
/// failure aborts the whole bootstrap; there is no partial-failure recovery.
pub(crate) fn create_scene(content: &ResourceCache) -> Result<(Scene, Character), BootstrapError> {
    let def = content.load_scene(SCENE_RESOURCE)?;
    let mut scene = Scene::from_def(&def);
    let character = populate(&mut scene, content)?;
    Ok((scene, character))
}

fn populate(scene: &mut Scene, content: &ResourceCache) -> Result<Character, BootstrapError> {
    // The spawn-point check runs before any actor node exists, so an empty
    // scene fails without side effects.
    let spawn_points = scene.nodes_with_tag(SPAWN_POINT_TAG);
    let Some((player_spawn, enemy_spawns)) = spawn_points.split_first() else {
        return Err(BootstrapError::NoSpawnPoints {
            path: SCENE_RESOURCE,
            tag: SPAWN_POINT_TAG,
        });
    };

    let player = scene.create_child(scene.root(), "player");
    let spawn_position = scene.world_position(*player_spawn);
    scene.set_world_position(player, spawn_position);
    let character = Character::attach(scene, player);
    if let Some(camera) = scene.node_mut(character.camera()).camera.as_mut() {
        camera.fov_degrees = CAMERA_FOV_DEGREES;
    }

    let weapon_def = content.load_node(WEAPON_RESOURCE)?;
    let weapon = scene.instantiate(character.camera(), &weapon_def);
    {
        let weapon_node = scene.node_mut(weapon);
        weapon_node.position = WEAPON_LOCAL_POSITION;
        weapon_node.rotation = WEAPON_LOCAL_ROTATION;
    }

    for spawn_point in enemy_spawns {
        let enemy_def = content.load_node(ENEMY_RESOURCE)?;
        let enemy = scene.instantiate(scene.root(), &enemy_def);
        let world = scene.world_position(*spawn_point);
        scene.set_world_position(enemy, world);
        if let Some(model) = scene.find_animated_model(enemy) {
            if let Some(animated) = scene.node_mut(model).animated_model.as_mut() {
                animated.play_first_looping();
            }
        }
    }

    info!(
        scene = SCENE_RESOURCE,
        spawn_points = spawn_points.len(),
        enemies = enemy_spawns.len(),
        "scene_populated"
    );
    Ok(character)
}
