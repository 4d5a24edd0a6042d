//! Error types for the join-and-unwrap pipeline and the scene host.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Reasons the pipeline aborts. Each one is reported to the artist verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("No active object. Select your root and try again.")]
    NoActiveObject,

    #[error("No mesh children found under the active object.")]
    NoMeshChildren,

    /// More than one rig binding while a single rig is required.
    #[error(
        "Multiple armatures detected: [{}]. Turn OFF 'Require Same Armature' to keep only the dominant one.",
        .names.join(", ")
    )]
    MultipleArmatures { names: Vec<String> },

    #[error("No meshes share a common armature to join.")]
    NoCommonArmature,

    #[error("Join failed (check selection/library link/visibility).")]
    JoinFailed,

    #[error("Joined object not found.")]
    JoinedObjectNotFound,

    #[error("Duplicate failed: {0}")]
    DuplicateFailed(String),

    #[error("Could not bind the joined mesh to its armature: {0}")]
    RigBindingFailed(String),

    #[error("Could not prepare the lightmap UV layer: {0}")]
    UvChannelFailed(String),
}

/// Rejections reported by host operators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperatorError {
    #[error("{operator}: unsupported parameter '{parameter}'")]
    UnsupportedParameter {
        operator: &'static str,
        parameter: &'static str,
    },

    /// The operator cannot run in the current mode or selection.
    #[error("{operator}: {reason}")]
    InvalidContext {
        operator: &'static str,
        reason: String,
    },

    #[error("Object not found")]
    ObjectNotFound,

    /// Linked library data cannot be edited or removed.
    #[error("'{0}' is linked library data")]
    LinkedData(String),
}

impl OperatorError {
    pub fn invalid_context(operator: &'static str, reason: impl Into<String>) -> Self {
        OperatorError::InvalidContext {
            operator,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("glTF document has no scenes")]
    NoScene,

    #[error("Unsupported primitive mode {mode:?} in mesh '{mesh}'")]
    UnsupportedPrimitive {
        mesh: String,
        mode: gltf::mesh::Mode,
    },

    #[error("Mesh '{0}' has a primitive without positions")]
    MissingPositions(String),

    #[error("Mesh '{mesh}' indexes vertex {index} but has only {vertices}")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertices: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_armatures_lists_every_rig() {
        let error = PipelineError::MultipleArmatures {
            names: vec!["R1".to_string(), "R2".to_string(), "None".to_string()],
        };
        let message = error.to_string();

        assert!(message.contains("[R1, R2, None]"));
        assert!(message.starts_with("Multiple armatures detected"));
    }
}
