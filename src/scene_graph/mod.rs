pub mod gltf_import;
pub mod mesh_data;
pub mod modifier;
pub mod object3d;
pub mod scene;
pub mod transform;

// Re-export main types for convenience
pub use mesh_data::{MeshData, UvLayer};
pub use modifier::{Modifier, ModifierKind};
pub use object3d::{Object3D, ObjectId, ObjectKind};
pub use scene::{Collection, Scene};
pub use transform::Transform;
