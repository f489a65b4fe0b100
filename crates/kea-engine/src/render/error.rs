use thiserror::Error;

use crate::scene::NodeId;

/// Failures raised while drawing a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// More model-view pops than pushes.
    #[error("Invalid popMatrix!")]
    InvalidPopMatrix,

    /// Canvas `restore` without a matching `save`.
    #[error("canvas restore without matching save")]
    UnbalancedRestore,

    #[error("canvas target must be non-empty (got {width}x{height})")]
    EmptyCanvas { width: u32, height: u32 },
}

/// Failures raised by structural scene edits and asset setup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("node {0:?} is not a group")]
    NotAGroup(NodeId),

    /// The edit would place a group inside its own subtree.
    #[error("scene edit would create a cycle")]
    Cycle,

    #[error("unknown texture atlas")]
    UnknownAtlas,

    #[error("image buffer of {len} bytes does not match {width}x{height} RGBA8")]
    InvalidImage { width: u32, height: u32, len: usize },

    #[error("atlas cell {cell:?} lies outside its image or is empty")]
    CellOutOfBounds { cell: String },

    #[error("atlas cell {cell:?} is not aligned to whole pixels")]
    FractionalCell { cell: String },

    #[error("invalid spritesheet grid {cell_w}x{cell_h}")]
    InvalidGrid { cell_w: u32, cell_h: u32 },

    #[error("tile data has {actual} entries, layer needs {expected}")]
    TileDataSize { expected: usize, actual: usize },

    #[error("unknown tile type {0}")]
    UnknownTileType(usize),

    #[error("tile ({column}, {row}) is outside the layer")]
    TileOutOfBounds { column: usize, row: usize },
}
