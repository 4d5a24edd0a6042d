//! Joins every mesh under a root object into one and prepares a packed
//! `LightmapUV` channel on the result.
//!
//! The pipeline lives in [`combine`] and talks to the 3D application through
//! the [`host::Host`] trait. [`host::SceneHost`] is an in-memory host over a
//! [`scene_graph::Scene`], which can be loaded from glTF.

pub mod asset_pipeline;
pub mod combine;
pub mod config;
pub mod error;
pub mod host;
pub mod math;
pub mod scene_graph;

pub use combine::{join_children_with_lightmap, JoinKind, JoinReport};
pub use config::JoinOptions;
pub use error::{ImportError, OperatorError, PipelineError};
