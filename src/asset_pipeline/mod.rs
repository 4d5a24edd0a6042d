//! Native geometry operators of the in-memory host.

pub mod mesh_join;
pub mod uv_islands;
pub mod uv_pack;
pub mod uv_unwrap;
