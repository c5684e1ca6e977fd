use std::fs;
use std::path::{Path, PathBuf};

use glam::{EulerRot, Quat, Vec3};
use roxmltree::{Document, Node as XmlNode};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read resource {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML in {path} (line {line}, column {column}): {source}")]
    Xml {
        path: PathBuf,
        line: u32,
        column: u32,
        #[source]
        source: roxmltree::Error,
    },
    #[error("invalid resource {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// A parsed scene definition: a named collection of top-level node subtrees.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDef {
    pub name: String,
    pub nodes: Vec<NodeDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDef {
    pub name: String,
    pub tags: Vec<String>,
    pub position: Vec3,
    pub rotation: Quat,
    pub model: Option<ModelDef>,
    pub children: Vec<NodeDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    pub mesh: String,
    pub animations: Vec<String>,
}

/// Resolves opaque resource names against an on-disk asset root and parses
/// them. Names use forward slashes relative to the root, e.g.
/// `scenes/map.scene.xml`.
#[derive(Debug, Clone)]
pub struct ResourceCache {
    asset_root: PathBuf,
}

impl ResourceCache {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn load_scene(&self, name: &str) -> Result<SceneDef, ContentError> {
        let path = self.asset_root.join(name);
        let raw = read_resource(&path)?;
        let doc = parse_document(&path, &raw)?;
        let root = doc.root_element();
        if root.tag_name().name() != "scene" {
            return Err(ContentError::Invalid {
                path,
                message: format!(
                    "root element must be <scene>, found <{}>",
                    root.tag_name().name()
                ),
            });
        }

        let scene_name = root.attribute("name").unwrap_or(name).to_string();
        let nodes = parse_child_nodes(&path, root)?;
        debug!(resource = name, nodes = nodes.len(), "scene_def_loaded");
        Ok(SceneDef {
            name: scene_name,
            nodes,
        })
    }

    /// Loads a standalone node (prefab) definition whose root element is a
    /// single `<node>`.
    pub fn load_node(&self, name: &str) -> Result<NodeDef, ContentError> {
        let path = self.asset_root.join(name);
        let raw = read_resource(&path)?;
        let doc = parse_document(&path, &raw)?;
        let root = doc.root_element();
        if root.tag_name().name() != "node" {
            return Err(ContentError::Invalid {
                path,
                message: format!(
                    "root element must be <node>, found <{}>",
                    root.tag_name().name()
                ),
            });
        }
        parse_node(&path, root)
    }
}

fn read_resource(path: &Path) -> Result<String, ContentError> {
    fs::read_to_string(path).map_err(|source| ContentError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_document<'input>(
    path: &Path,
    raw: &'input str,
) -> Result<Document<'input>, ContentError> {
    Document::parse(raw).map_err(|source| ContentError::Xml {
        path: path.to_path_buf(),
        line: source.pos().row,
        column: source.pos().col,
        source,
    })
}

fn parse_child_nodes(path: &Path, parent: XmlNode<'_, '_>) -> Result<Vec<NodeDef>, ContentError> {
    let mut nodes = Vec::new();
    for child in parent.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "node" {
            continue;
        }
        nodes.push(parse_node(path, child)?);
    }
    Ok(nodes)
}

fn parse_node(path: &Path, element: XmlNode<'_, '_>) -> Result<NodeDef, ContentError> {
    let name = element.attribute("name").unwrap_or_default().to_string();
    let tags = element
        .attribute("tags")
        .map(|raw| {
            raw.split_whitespace()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let position = match element.attribute("position") {
        Some(raw) => parse_vec3(path, raw)?,
        None => Vec3::ZERO,
    };
    let rotation = match element.attribute("rotation") {
        Some(raw) => {
            let euler = parse_vec3(path, raw)?;
            Quat::from_euler(
                EulerRot::YXZ,
                euler.y.to_radians(),
                euler.x.to_radians(),
                euler.z.to_radians(),
            )
        }
        None => Quat::IDENTITY,
    };

    let mut model = None;
    for child in element.children().filter(|node| node.is_element()) {
        if child.tag_name().name() == "model" {
            model = Some(parse_model(path, child)?);
        }
    }

    Ok(NodeDef {
        name,
        tags,
        position,
        rotation,
        model,
        children: parse_child_nodes(path, element)?,
    })
}

fn parse_model(path: &Path, element: XmlNode<'_, '_>) -> Result<ModelDef, ContentError> {
    let mesh = element
        .attribute("mesh")
        .ok_or_else(|| ContentError::Invalid {
            path: path.to_path_buf(),
            message: "<model> requires a mesh attribute".to_string(),
        })?
        .to_string();

    let mut animations = Vec::new();
    for child in element.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "animation" {
            continue;
        }
        let clip = child
            .attribute("name")
            .ok_or_else(|| ContentError::Invalid {
                path: path.to_path_buf(),
                message: "<animation> requires a name attribute".to_string(),
            })?;
        animations.push(clip.to_string());
    }

    Ok(ModelDef { mesh, animations })
}

fn parse_vec3(path: &Path, raw: &str) -> Result<Vec3, ContentError> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(ContentError::Invalid {
            path: path.to_path_buf(),
            message: format!("expected three components in vector \"{raw}\""),
        });
    }
    let mut components = [0.0f32; 3];
    for (slot, part) in components.iter_mut().zip(&parts) {
        *slot = part.parse().map_err(|_| ContentError::Invalid {
            path: path.to_path_buf(),
            message: format!("expected a number in vector \"{raw}\", found \"{part}\""),
        })?;
    }
    Ok(Vec3::from_array(components))
}
