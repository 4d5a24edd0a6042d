use crate::scene_graph::object3d::ObjectId;

#[derive(Debug, Clone, PartialEq)]
pub enum ModifierKind {
    Armature { object: Option<ObjectId> },
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    pub name: String,
    pub kind: ModifierKind,
}

impl Modifier {
    pub fn armature(name: impl Into<String>, object: Option<ObjectId>) -> Self {
        Self {
            name: name.into(),
            kind: ModifierKind::Armature { object },
        }
    }

    pub fn other(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModifierKind::Other(type_name.into()),
        }
    }

    /// Target of an armature modifier; `None` for other modifier kinds.
    pub fn armature_target(&self) -> Option<ObjectId> {
        match self.kind {
            ModifierKind::Armature { object } => object,
            ModifierKind::Other(_) => None,
        }
    }
}
