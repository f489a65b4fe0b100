//! Gameplay-facing contracts.
//!
//! A [`State`] builds and mutates a [`Scene`](crate::scene::Scene); a
//! [`Game`] owns both and runs one update per tick before rendering.

mod game;
mod state;

pub use game::{Game, GameConfig};
pub use state::{AppControl, FrameCtx, State};
