//! Perimeter walk: stepping from edge to edge along the body surface.

use super::{Agent, AgentState, SimEvent, WalkDirection};
use crate::config::AgentConfig;
use crate::geometry::{to_canonical_frame, Orientation, Position};
use crate::Grid;
use log::debug;
use rand::Rng;

/// A free slot next to a surface cell, and the side of that cell it is on.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    position: Position,
    edge: Orientation,
}

impl Agent {
    /// Maybe takes a step, honoring the move cooldown and direction bias.
    pub(super) fn wander<R: Rng + ?Sized>(
        &mut self,
        grid: &Grid,
        config: &AgentConfig,
        rng: &mut R,
        events: &mut Vec<SimEvent>,
    ) {
        if self.state == AgentState::Digging {
            return;
        }
        if self.frames_since_last_move < config.min_frames_between_moves {
            return;
        }
        if rng.random::<f64>() >= config.move_probability {
            return;
        }
        let threshold = if self.previous_direction == Some(WalkDirection::Left) {
            config.direction_persistence
        } else {
            1.0 - config.direction_persistence
        };
        let direction = if rng.random::<f64>() > threshold {
            WalkDirection::Right
        } else {
            WalkDirection::Left
        };
        self.walk(grid, direction, events);
    }

    /// Steps to the nearest free edge that is not where we are and not
    /// somewhere we have just been. Equally near edges go to the one furthest
    /// along `direction`. Returns false if the agent had to fall back to the
    /// nearest surface instead.
    pub(super) fn walk(
        &mut self,
        grid: &Grid,
        direction: WalkDirection,
        events: &mut Vec<SimEvent>,
    ) -> bool {
        if self.previous_direction != Some(direction) {
            self.history.clear();
            self.previous_direction = Some(direction);
        }

        let here = self.position;
        let surrounding = grid.surrounding_cells(here, false);
        if surrounding.is_empty() {
            self.go_to_nearest_surface(grid);
            return false;
        }

        let candidates: Vec<Candidate> = surrounding
            .values()
            .filter(|cell| cell.is_surface())
            .flat_map(|cell| {
                grid.neighborhood(cell.position)
                    .open_edges()
                    .map(move |edge| Candidate {
                        position: cell.position.step(edge),
                        edge,
                    })
            })
            .filter(|c| c.position != here && !self.history.contains(&c.position))
            .collect();

        let Some(chosen) = self.pick(grid, here, direction, &candidates) else {
            debug!("agent {} has no walk candidates at {here}", self.id);
            self.go_to_nearest_surface(grid);
            return false;
        };

        self.orientation = chosen.edge;
        self.position = chosen.position;
        self.remember(chosen.position);
        self.standing = self.find_pixel_to_stand_on(grid);
        self.update_orientation(grid);
        if let Some(cell) = self.standing.and_then(|r| grid.cell(r)) {
            self.position = cell.position.step(self.orientation);
        }
        self.frames_since_last_move = 0;
        self.state = AgentState::Wandering;
        debug!(
            "agent {} stepped {here} -> {} ({})",
            self.id, self.position, self.orientation
        );
        events.push(SimEvent::Stepped { agent: self.id });
        true
    }

    fn pick(
        &self,
        grid: &Grid,
        here: Position,
        direction: WalkDirection,
        candidates: &[Candidate],
    ) -> Option<Candidate> {
        let (width, height) = (grid.width() as i32, grid.height() as i32);
        let ahead = |c: &Candidate| to_canonical_frame(c.position, self.orientation, width, height).x;

        let mut best = *candidates.first()?;
        let mut best_dist = f32::INFINITY;
        for candidate in candidates {
            let dist = candidate.position.distance(here);
            let further = match direction {
                WalkDirection::Left => ahead(candidate) < ahead(&best),
                WalkDirection::Right => ahead(candidate) > ahead(&best),
            };
            if dist < best_dist || ((dist - best_dist).abs() < f32::EPSILON && further) {
                best = *candidate;
                best_dist = dist;
            }
        }
        Some(best)
    }
}
