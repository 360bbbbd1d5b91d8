//! JSON save and restore.
//!
//! Cells keep their serial, health, surface flag and darkness. Agents keep
//! every rolled outcome (saintly, explosive) so nothing is re-rolled on load.
//! The RNG is not stored; a restored simulation reseeds from its config.

use crate::agent::{Agent, AgentId};
use crate::cell::Cell;
use crate::config::{ConfigError, SimConfig};
use crate::geometry::Position;
use crate::grid::{BodyKind, Grid};
use crate::simulation::Simulation;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("malformed save data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("saved cell at {0} lies outside the grid")]
    CellOutOfBounds(Position),
    #[error("two saved cells share position {0}")]
    DuplicateCell(Position),
    #[error("two saved agents share id {0}")]
    DuplicateAgent(AgentId),
    #[error("saved grid size {width}x{height} is not addressable")]
    InvalidDimensions { width: usize, height: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Stored form of a [`Grid`]. The surface index is rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub(crate) width: usize,
    pub(crate) height: usize,
    #[serde(default)]
    pub(crate) kind: BodyKind,
    pub(crate) next_serial: u64,
    pub(crate) cells: Vec<Cell>,
}

impl From<Grid> for GridSnapshot {
    fn from(grid: Grid) -> Self {
        grid.snapshot()
    }
}

impl TryFrom<GridSnapshot> for Grid {
    type Error = PersistError;

    fn try_from(snapshot: GridSnapshot) -> Result<Self, Self::Error> {
        check_dimensions(snapshot.width, snapshot.height)?;
        let mut grid = Grid::with_kind(snapshot.width, snapshot.height, snapshot.kind);
        let stored = snapshot.cells;
        let mut dead = 0;
        for cell in &stored {
            if !grid.in_bounds(cell.position) {
                return Err(PersistError::CellOutOfBounds(cell.position));
            }
            if cell.health.is_nan() || cell.health <= 0.0 {
                dead += 1;
                continue;
            }
            if !grid.restore_cell(*cell) {
                return Err(PersistError::DuplicateCell(cell.position));
            }
        }
        if dead > 0 {
            warn!("dropped {dead} saved cells with no health left");
        }
        grid.bump_serial(snapshot.next_serial);
        grid.update_surface();

        let stale = stored
            .iter()
            .filter(|c| grid.get_cell(c.position).is_some_and(|now| now.is_surface() != c.is_surface()))
            .count();
        if stale > 0 {
            warn!("repaired {stale} stale surface flags while restoring a grid");
        }
        Ok(grid)
    }
}

/// Every position must fit an `i32` and the slot buffer must be allocatable.
fn check_dimensions(width: usize, height: usize) -> Result<(), PersistError> {
    let addressable = i32::try_from(width).is_ok()
        && i32::try_from(height).is_ok()
        && width
            .checked_mul(height)
            .and_then(|slots| slots.checked_mul(std::mem::size_of::<Option<Cell>>()))
            .is_some_and(|bytes| isize::try_from(bytes).is_ok());
    if addressable {
        Ok(())
    } else {
        Err(PersistError::InvalidDimensions { width, height })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SimulationSnapshot {
    grid: Grid,
    agents: Vec<Agent>,
    tick: u64,
    next_agent_id: u32,
}

impl Simulation {
    /// # Errors
    /// Returns [`PersistError::Json`] if serialization fails.
    pub fn save_json(&self) -> Result<String, PersistError> {
        let snapshot = SimulationSnapshot {
            grid: self.grid.clone(),
            agents: self.agents.clone(),
            tick: self.tick,
            next_agent_id: self.next_agent_id,
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Rebuilds a simulation saved with [`Simulation::save_json`] under
    /// `config`.
    ///
    /// # Errors
    /// Returns [`PersistError`] on malformed JSON, inconsistent cells or
    /// agents, or an invalid config.
    pub fn restore_json(json: &str, config: SimConfig) -> Result<Self, PersistError> {
        let snapshot: SimulationSnapshot = serde_json::from_str(json)?;
        let mut seen = HashSet::new();
        for agent in &snapshot.agents {
            if !seen.insert(agent.id()) {
                return Err(PersistError::DuplicateAgent(agent.id()));
            }
        }
        let highest = snapshot.agents.iter().map(|a| a.id().0).max().unwrap_or(0);
        let next_agent_id = if snapshot.next_agent_id > highest {
            snapshot.next_agent_id
        } else {
            warn!(
                "saved next agent id {} is not above {highest}, repairing",
                snapshot.next_agent_id
            );
            highest + 1
        };

        let mut agents = snapshot.agents;
        for agent in &mut agents {
            let dropped = agent.trim_history();
            if dropped > 0 {
                warn!("dropped {dropped} extra history entries of agent {}", agent.id());
            }
        }

        let mut sim = Simulation::new(snapshot.grid, config)?;
        sim.agents = agents;
        sim.tick = snapshot.tick;
        sim.next_agent_id = next_agent_id;
        Ok(sim)
    }
}
