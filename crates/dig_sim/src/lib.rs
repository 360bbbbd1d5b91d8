//! Destructible pixel-body simulation.
//!
//! A [`Grid`] holds the cells of one body and keeps track of which of them
//! are exposed. [`Agent`]s stand on exposed cells, walk the perimeter and dig
//! cells out. A [`Simulation`] owns both and advances them one tick at a
//! time; [`Universe`] exposes that to a browser host.

pub mod agent;
pub mod api;
pub mod cell;
pub mod config;
pub mod geometry;
pub mod grid;
pub mod persist;
pub mod render;
pub mod simulation;
pub mod universe;

pub use agent::{Agent, AgentId, AgentState, DeathCause, SimEvent};
pub use grid::{BodyKind, Grid};
pub use simulation::Simulation;
pub use universe::Universe;

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
#[must_use]
pub fn version() -> String {
    format!("dig_sim {}", env!("CARGO_PKG_VERSION"))
}
