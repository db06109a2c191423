//! Arena-indexed scene graph

use meshlod_core::{bounds_of, Drawable, Error, Point3f, Result, Transform3D, TriangleMesh, Vector3f};
use serde::{Deserialize, Serialize};

/// Index of a node in [`Scene::nodes`]
pub type NodeId = usize;

/// Index of a mesh in [`Scene::geometries`]
pub type GeometryId = usize;

/// A node in the scene tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Transform relative to the parent
    #[serde(default)]
    pub transform: Transform3D,
    #[serde(default)]
    pub geometry: Option<GeometryId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: Transform3D::identity(),
            geometry: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform3D) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_geometry(mut self, geometry: GeometryId) -> Self {
        self.geometry = Some(geometry);
        self
    }
}

/// A geometry-bearing node reached by traversal, with its world transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryInstance {
    pub node: NodeId,
    pub geometry: GeometryId,
    pub world: Transform3D,
}

/// Tree of nodes sharing a pool of meshes.
///
/// Nodes refer to each other and to geometry by index, so several nodes may
/// instance the same mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub geometries: Vec<TriangleMesh>,
    pub roots: Vec<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene with a single root node showing `mesh`
    pub fn from_mesh(name: impl Into<String>, mesh: TriangleMesh) -> Self {
        let mut scene = Self::new();
        let geometry = scene.add_geometry(mesh);
        scene.nodes.push(SceneNode::new(name).with_geometry(geometry));
        scene.roots.push(0);
        scene
    }

    pub fn add_geometry(&mut self, mesh: TriangleMesh) -> GeometryId {
        self.geometries.push(mesh);
        self.geometries.len() - 1
    }

    /// Insert `node` under `parent`, or as a new root when `parent` is `None`.
    /// The node's own `parent` and `children` fields are overwritten.
    pub fn add_node(&mut self, mut node: SceneNode, parent: Option<NodeId>) -> Result<NodeId> {
        if let Some(p) = parent {
            if p >= self.nodes.len() {
                return Err(Error::InvalidParameter(format!("parent node {} does not exist", p)));
            }
        }
        if let Some(g) = node.geometry {
            if g >= self.geometries.len() {
                return Err(Error::InvalidParameter(format!("geometry {} does not exist", g)));
            }
        }

        let id = self.nodes.len();
        node.parent = parent;
        node.children.clear();
        self.nodes.push(node);
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&TriangleMesh> {
        self.geometries.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Check indices and tree shape of a scene built by hand or deserialized
    pub fn validate(&self) -> Result<()> {
        let n = self.nodes.len();
        let mut seen = vec![false; n];

        for &root in &self.roots {
            if root >= n {
                return Err(Error::InvalidParameter(format!("root {} out of range", root)));
            }
            if self.nodes[root].parent.is_some() {
                return Err(Error::InvalidParameter(format!("root {} has a parent", root)));
            }
        }

        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if seen[id] {
                return Err(Error::InvalidParameter(format!(
                    "node {} is reachable more than once",
                    id
                )));
            }
            seen[id] = true;

            let node = &self.nodes[id];
            if let Some(g) = node.geometry {
                if g >= self.geometries.len() {
                    return Err(Error::InvalidParameter(format!(
                        "node {} references missing geometry {}",
                        id, g
                    )));
                }
            }
            for &child in node.children.iter().rev() {
                if child >= n {
                    return Err(Error::InvalidParameter(format!(
                        "node {} has child {} out of range",
                        id, child
                    )));
                }
                if self.nodes[child].parent != Some(id) {
                    return Err(Error::InvalidParameter(format!(
                        "node {} does not name {} as its parent",
                        child, id
                    )));
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    /// All reachable nodes in pre-order with their world transforms.
    ///
    /// Uses an explicit stack, so hierarchy depth is bounded by memory and not
    /// by the call stack. Children are visited in insertion order. Nodes
    /// reachable twice are visited once.
    pub fn traverse(&self) -> Vec<(NodeId, Transform3D)> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, Transform3D)> = self
            .roots
            .iter()
            .rev()
            .filter(|&&r| r < self.nodes.len())
            .map(|&r| (r, self.nodes[r].transform))
            .collect();

        while let Some((id, world)) = stack.pop() {
            if std::mem::replace(&mut visited[id], true) {
                continue;
            }
            order.push((id, world));
            for &child in self.nodes[id].children.iter().rev() {
                if let Some(node) = self.nodes.get(child) {
                    stack.push((child, world.compose(node.transform)));
                }
            }
        }
        order
    }

    /// Geometry-bearing nodes in traversal order
    pub fn geometry_nodes(&self) -> Vec<GeometryInstance> {
        self.traverse()
            .into_iter()
            .filter_map(|(node, world)| {
                let geometry = self.nodes[node].geometry?;
                (geometry < self.geometries.len()).then_some(GeometryInstance {
                    node,
                    geometry,
                    world,
                })
            })
            .collect()
    }

    /// Nodes instancing `geometry`, in traversal order
    pub fn nodes_using(&self, geometry: GeometryId) -> Vec<NodeId> {
        self.geometry_nodes()
            .into_iter()
            .filter(|i| i.geometry == geometry)
            .map(|i| i.node)
            .collect()
    }

    /// Same tree with every geometry passed through `f` exactly once
    pub fn map_geometry<F>(&self, mut f: F) -> Result<Scene>
    where
        F: FnMut(GeometryId, &TriangleMesh) -> Result<TriangleMesh>,
    {
        let geometries = self
            .geometries
            .iter()
            .enumerate()
            .map(|(id, mesh)| f(id, mesh))
            .collect::<Result<Vec<_>>>()?;
        Ok(Scene {
            nodes: self.nodes.clone(),
            geometries,
            roots: self.roots.clone(),
        })
    }

    /// Move every root by `offset` in world space
    pub fn translate_roots(&mut self, offset: Vector3f) {
        for &root in &self.roots {
            if let Some(node) = self.nodes.get_mut(root) {
                node.transform = node.transform.translated(offset);
            }
        }
    }

    /// Total faces over all geometry instances
    pub fn instanced_face_count(&self) -> usize {
        self.geometry_nodes()
            .iter()
            .map(|i| self.geometries[i.geometry].face_count())
            .sum()
    }
}

impl Drawable for Scene {
    /// World-space bounds of every instanced vertex
    fn bounding_box(&self) -> (Point3f, Point3f) {
        let points: Vec<Point3f> = self
            .geometry_nodes()
            .iter()
            .flat_map(|instance| {
                self.geometries[instance.geometry]
                    .vertices
                    .iter()
                    .map(move |p| instance.world.transform_point(p))
            })
            .collect();
        bounds_of(&points)
    }
}
