//! Dying and the after-death variants that run until an agent goes inactive.

use super::{Agent, AgentState, DeathCause, SimEvent};
use crate::cell::PixelType;
use crate::config::AgentConfig;
use crate::geometry::Position;
use crate::Grid;
use log::info;

/// Ticks an egg death lingers before going inactive.
pub const EGG_FADE_FRAMES: u32 = 40;
/// Radius change per afterlife tick, in cells.
pub const AFTERLIFE_STEP: f32 = 0.1;
/// Afterlife ticks until the agent is gone for good.
pub const AFTERLIFE_TICKS: u32 = 100;
/// A sinking agent this close to the center is swallowed.
pub const COLLAPSE_RADIUS: f32 = 0.2;

impl Agent {
    pub(super) fn die(
        &mut self,
        grid: &mut Grid,
        config: &AgentConfig,
        cause: DeathCause,
        events: &mut Vec<SimEvent>,
    ) {
        if !self.is_alive() {
            return;
        }
        let mut cause = cause;
        if matches!(cause, DeathCause::Egg | DeathCause::Serpent) {
            self.explosive = false;
        } else if self.explosive {
            cause = DeathCause::Explosion;
        }
        self.digs_remaining = 0;

        if self.explosive {
            self.explode(grid, config, events);
        }

        self.state = match cause {
            DeathCause::Egg => AgentState::DeadEgg,
            _ if config.afterlife => AgentState::DeadAfterlife,
            _ => AgentState::DeadBuried,
        };
        self.death_cause = Some(cause);
        self.frames_since_death = 0;
        info!("agent {} died ({cause}) at {}", self.id, self.position);
        events.push(SimEvent::Died {
            agent: self.id,
            cause,
        });
    }

    /// Removes everything in the blast radius that is not blast-proof and
    /// reports it as dug.
    fn explode(&mut self, grid: &mut Grid, config: &AgentConfig, events: &mut Vec<SimEvent>) {
        let center = self.position;
        let doomed: Vec<Position> = grid
            .pixels_around(center.x as f32, center.y as f32, config.explosion_radius)
            .into_iter()
            .filter(|cell| !cell.kind.blast_proof(config.egg_handling))
            .map(|cell| cell.position)
            .collect();
        let cells = grid.remove_cells(doomed);
        if !cells.is_empty() {
            info!("agent {} blew up {} cells", self.id, cells.len());
            events.push(SimEvent::CellsRemoved {
                agent: self.id,
                cells,
            });
        }
    }

    pub(super) fn fade(&mut self, events: &mut Vec<SimEvent>) {
        if self.frames_since_death >= EGG_FADE_FRAMES {
            self.set_inactive(events);
        }
    }

    /// Saintly agents drift away from the center, the rest sink into it.
    pub(super) fn ascend(&mut self, grid: &Grid, events: &mut Vec<SimEvent>) {
        let (x, y) = self.ascension.unwrap_or_else(|| {
            let local = self.local_position(grid);
            (local.x as f32, local.y as f32)
        });
        let angle = y.atan2(x);
        let radius = x.hypot(y);
        let radius = if self.saintly {
            radius + AFTERLIFE_STEP
        } else {
            (radius - AFTERLIFE_STEP).max(0.0)
        };
        let (sin, cos) = angle.sin_cos();
        let next = (cos * radius, sin * radius);
        self.ascension = Some(next);
        self.position =
            grid.center() + Position::new(next.0.round() as i32, next.1.round() as i32);
        self.ascension_progress += 1;

        if self.ascension_progress >= AFTERLIFE_TICKS || radius <= COLLAPSE_RADIUS {
            self.set_inactive(events);
        }
    }

    /// Leaves a tombstone where the agent last worked, falling back to where
    /// it stands, then goes inactive.
    pub(super) fn bury(&mut self, grid: &mut Grid, events: &mut Vec<SimEvent>) {
        // An agent that never dug marks its own empty slot, not the cell beyond it.
        let spot = self.dig_target.map_or(self.position, |r| r.position);
        if grid.add_cell(spot, PixelType::Tombstone) {
            grid.update_surface();
            events.push(SimEvent::Buried {
                agent: self.id,
                position: spot,
            });
        }
        self.set_inactive(events);
    }
}
