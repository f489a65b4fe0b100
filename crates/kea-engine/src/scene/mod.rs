//! Scene graph.
//!
//! Responsibilities:
//! - own nodes, transforms and atlases behind slotmap handles
//! - mirror group membership in the transform hierarchy
//! - flatten the graph into a renderer-agnostic [`DrawList`] each frame

mod animation;
mod atlas;
mod camera;
mod graph;
mod list;
mod node;
mod tilemap;

pub use animation::{Animation, Sequence};
pub use atlas::{AtlasCell, AtlasId, AtlasImage, TextureAtlas};
pub use camera::Camera;
pub use graph::Scene;
pub use list::{DrawItem, DrawList};
pub use node::{Node, NodeId, NodeKind, Pixel, Sprite};
pub use tilemap::{Collisions, PlacedTile, TileLayer, TileType};
