use std::fmt;

use id_arena::Id;

use crate::scene_graph::mesh_data::MeshData;
use crate::scene_graph::modifier::Modifier;
use crate::scene_graph::transform::Transform;

pub type ObjectId = Id<Object3D>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Mesh,
    Armature,
    Empty,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Mesh => "MESH",
            ObjectKind::Armature => "ARMATURE",
            ObjectKind::Empty => "EMPTY",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Object3D {
    pub name: String,
    pub kind: ObjectKind,
    pub transform: Transform,
    pub mesh: Option<MeshData>,
    pub modifiers: Vec<Modifier>,
    pub parent_id: Option<ObjectId>,
    pub child_ids: Vec<ObjectId>,
    /// Linked from an external library; cannot be joined or deleted directly.
    pub library_linked: bool,
    pub(crate) removed: bool,
}

impl Object3D {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: MeshData) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::new(name, ObjectKind::Mesh)
        }
    }

    pub fn armature(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Armature)
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Empty)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn is_mesh(&self) -> bool {
        self.kind == ObjectKind::Mesh
    }
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ObjectKind::Empty,
            transform: Transform::IDENTITY,
            mesh: None,
            modifiers: Vec::new(),
            parent_id: None,
            child_ids: Vec::new(),
            library_linked: false,
            removed: false,
        }
    }
}
