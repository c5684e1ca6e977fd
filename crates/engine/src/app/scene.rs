use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Quat, Vec3};

use crate::content::{NodeDef, SceneDef};

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub fov_degrees: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self { fov_degrees: 45.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationPlayback {
    pub clip: String,
    pub looped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedModel {
    pub mesh: String,
    pub animations: Vec<String>,
    playing: Option<AnimationPlayback>,
}

impl AnimatedModel {
    pub fn new(mesh: impl Into<String>, animations: Vec<String>) -> Self {
        Self {
            mesh: mesh.into(),
            animations,
            playing: None,
        }
    }

    /// Starts the first clip looping. A model without clips stays idle.
    pub fn play_first_looping(&mut self) {
        if let Some(clip) = self.animations.first() {
            self.playing = Some(AnimationPlayback {
                clip: clip.clone(),
                looped: true,
            });
        }
    }

    pub fn playing(&self) -> Option<&AnimationPlayback> {
        self.playing.as_ref()
    }
}

#[derive(Debug)]
pub struct Node {
    name: String,
    tags: Vec<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub position: Vec3,
    pub rotation: Quat,
    pub camera: Option<Camera>,
    pub animated_model: Option<AnimatedModel>,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            tags: Vec::new(),
            parent,
            children: Vec::new(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            camera: None,
            animated_model: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Hierarchical node tree. Nodes are arena-allocated and live as long as the
/// scene; nothing removes them during a session.
#[derive(Debug)]
pub struct Scene {
    id: SceneId,
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new() -> Self {
        let id = SceneId(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            nodes: vec![Node::new("root", None)],
        }
    }

    /// Builds a scene from a parsed definition, instantiating every top-level
    /// node under the root.
    pub fn from_def(def: &SceneDef) -> Self {
        let mut scene = Self::new();
        for node_def in &def.nodes {
            scene.instantiate(scene.root(), node_def);
        }
        scene
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn create_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(name, Some(parent)));
        self.nodes[parent.0 as usize].children.push(id);
        id
    }

    /// Instantiates a definition subtree under `parent` and returns the new
    /// subtree's top node.
    pub fn instantiate(&mut self, parent: NodeId, def: &NodeDef) -> NodeId {
        let id = self.create_child(parent, &def.name);
        {
            let node = self.node_mut(id);
            node.tags = def.tags.clone();
            node.position = def.position;
            node.rotation = def.rotation;
            if let Some(model) = &def.model {
                node.animated_model =
                    Some(AnimatedModel::new(model.mesh.clone(), model.animations.clone()));
            }
        }
        for child in &def.children {
            self.instantiate(id, child);
        }
        id
    }

    pub fn world_position(&self, id: NodeId) -> Vec3 {
        let node = self.node(id);
        match node.parent {
            None => node.position,
            Some(parent) => {
                self.world_position(parent) + self.world_rotation(parent) * node.position
            }
        }
    }

    pub fn world_rotation(&self, id: NodeId) -> Quat {
        let node = self.node(id);
        match node.parent {
            None => node.rotation,
            Some(parent) => self.world_rotation(parent) * node.rotation,
        }
    }

    /// Sets the node's local position such that its world position becomes
    /// `world`.
    pub fn set_world_position(&mut self, id: NodeId, world: Vec3) {
        let local = match self.node(id).parent {
            None => world,
            Some(parent) => {
                self.world_rotation(parent).inverse() * (world - self.world_position(parent))
            }
        };
        self.node_mut(id).position = local;
    }

    /// Collects every node carrying `tag`, depth-first in child order. The
    /// returned sequence preserves discovery order.
    pub fn nodes_with_tag(&self, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_tagged(self.root(), tag, &mut found);
        found
    }

    fn collect_tagged(&self, id: NodeId, tag: &str, found: &mut Vec<NodeId>) {
        if self.node(id).has_tag(tag) {
            found.push(id);
        }
        for child in self.node(id).children() {
            self.collect_tagged(*child, tag, found);
        }
    }

    /// Finds the first node in `id`'s subtree (self included, preorder) that
    /// carries an animated model.
    pub fn find_animated_model(&self, id: NodeId) -> Option<NodeId> {
        if self.node(id).animated_model.is_some() {
            return Some(id);
        }
        for child in self.node(id).children() {
            if let Some(found) = self.find_animated_model(*child) {
                return Some(found);
            }
        }
        None
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
