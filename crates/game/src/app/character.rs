use engine::{Camera, NodeId, Scene};
use glam::{Quat, Vec3};

const CAMERA_EYE_HEIGHT: f32 = 1.7;
const PITCH_LIMIT_DEGREES: f32 = 90.0;

/// Control facade over the player node. Movement fields are written by the
/// application on key transitions and consumed by the locomotion simulation,
/// which lives outside this sample. Rotation is applied here: yaw turns the
/// body, pitch and roll turn the camera.
#[derive(Debug)]
pub(crate) struct Character {
    node: NodeId,
    camera: NodeId,
    pub(crate) forward: f32,
    pub(crate) backward: f32,
    pub(crate) left: f32,
    pub(crate) right: f32,
    pub(crate) jump: bool,
    yaw_degrees: f32,
    pitch_degrees: f32,
    roll_degrees: f32,
}

impl Character {
    /// Attaches the character capability to `node`, creating its camera as a
    /// child at eye height.
    pub(crate) fn attach(scene: &mut Scene, node: NodeId) -> Self {
        let camera = scene.create_child(node, "camera");
        {
            let camera_node = scene.node_mut(camera);
            camera_node.position = Vec3::new(0.0, CAMERA_EYE_HEIGHT, 0.0);
            camera_node.camera = Some(Camera::default());
        }
        Self {
            node,
            camera,
            forward: 0.0,
            backward: 0.0,
            left: 0.0,
            right: 0.0,
            jump: false,
            yaw_degrees: 0.0,
            pitch_degrees: 0.0,
            roll_degrees: 0.0,
        }
    }

    #[cfg(test)]
    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn camera(&self) -> NodeId {
        self.camera
    }

    pub(crate) fn rotate(
        &mut self,
        scene: &mut Scene,
        yaw_delta: f32,
        pitch_delta: f32,
        roll_delta: f32,
    ) {
        self.yaw_degrees += yaw_delta;
        self.pitch_degrees =
            (self.pitch_degrees + pitch_delta).clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES);
        self.roll_degrees += roll_delta;

        scene.node_mut(self.node).rotation =
            Quat::from_rotation_y(self.yaw_degrees.to_radians());
        scene.node_mut(self.camera).rotation =
            Quat::from_rotation_x(self.pitch_degrees.to_radians())
                * Quat::from_rotation_z(self.roll_degrees.to_radians());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character_in_scene() -> (Scene, Character) {
        let mut scene = Scene::new();
        let player = scene.create_child(scene.root(), "player");
        let character = Character::attach(&mut scene, player);
        (scene, character)
    }

    #[test]
    fn attach_creates_camera_child_at_eye_height() {
        let (scene, character) = character_in_scene();
        let camera_node = scene.node(character.camera());
        assert_eq!(camera_node.parent(), Some(character.node()));
        assert!(camera_node.camera.is_some());
        assert!(camera_node
            .position
            .abs_diff_eq(Vec3::new(0.0, CAMERA_EYE_HEIGHT, 0.0), 1e-6));
    }

    #[test]
    fn control_fields_start_inactive() {
        let (_scene, character) = character_in_scene();
        assert_eq!(character.forward, 0.0);
        assert_eq!(character.backward, 0.0);
        assert_eq!(character.left, 0.0);
        assert_eq!(character.right, 0.0);
        assert!(!character.jump);
    }

    #[test]
    fn rotate_applies_yaw_to_body_and_pitch_to_camera() {
        let (mut scene, mut character) = character_in_scene();
        character.rotate(&mut scene, 30.0, -10.0, 0.0);

        let body = scene.node(character.node()).rotation;
        assert!(body.abs_diff_eq(Quat::from_rotation_y(30f32.to_radians()), 1e-5));
        let camera = scene.node(character.camera()).rotation;
        assert!(camera.abs_diff_eq(Quat::from_rotation_x((-10f32).to_radians()), 1e-5));
    }

    #[test]
    fn rotate_accumulates_across_calls() {
        let (mut scene, mut character) = character_in_scene();
        character.rotate(&mut scene, 10.0, 0.0, 0.0);
        character.rotate(&mut scene, 15.0, 0.0, 0.0);

        let body = scene.node(character.node()).rotation;
        assert!(body.abs_diff_eq(Quat::from_rotation_y(25f32.to_radians()), 1e-5));
    }

    #[test]
    fn pitch_is_clamped_to_straight_up_and_down() {
        let (mut scene, mut character) = character_in_scene();
        character.rotate(&mut scene, 0.0, 400.0, 0.0);
        let camera = scene.node(character.camera()).rotation;
        assert!(camera.abs_diff_eq(Quat::from_rotation_x(90f32.to_radians()), 1e-5));

        character.rotate(&mut scene, 0.0, -1000.0, 0.0);
        let camera = scene.node(character.camera()).rotation;
        assert!(camera.abs_diff_eq(Quat::from_rotation_x((-90f32).to_radians()), 1e-5));
    }

    #[test]
    fn zero_rotation_leaves_orientation_unchanged() {
        let (mut scene, mut character) = character_in_scene();
        character.rotate(&mut scene, 20.0, 5.0, 0.0);
        let body_before = scene.node(character.node()).rotation;
        let camera_before = scene.node(character.camera()).rotation;

        character.rotate(&mut scene, 0.0, 0.0, 0.0);
        assert_eq!(scene.node(character.node()).rotation, body_before);
        assert_eq!(scene.node(character.camera()).rotation, camera_before);
    }
}
