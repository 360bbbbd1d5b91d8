//! Digging: periodic damage to the standing cell until it breaks.

use super::{Agent, AgentState, DeathCause, SimEvent};
use crate::cell::{Cell, PixelType};
use crate::config::AgentConfig;
use crate::Grid;
use log::debug;
use rand::Rng;

/// Damage lands once per window of this many frames.
pub const DIG_WINDOW_FRAMES: u32 = 60;

impl Agent {
    /// Seekers always dig unlocked resources; otherwise a per-tick roll.
    pub(super) fn wants_to_dig<R: Rng + ?Sized>(
        &self,
        standing: &Cell,
        config: &AgentConfig,
        rng: &mut R,
    ) -> bool {
        let forced = config.gold_seeker
            && match standing.kind {
                PixelType::Gold => config.unlocks.gold,
                PixelType::Diamond => config.unlocks.diamonds,
                PixelType::Magic => true,
                _ => false,
            };
        forced || rng.random::<f64>() < config.dig_probability
    }

    pub(super) fn start_digging(&mut self, grid: &Grid) {
        if self.state == AgentState::Digging {
            return;
        }
        let Some(target) = self.find_pixel_to_stand_on(grid) else {
            return;
        };
        self.state = AgentState::Digging;
        self.dig_frames = 0;
        self.dig_target = Some(target);
    }

    pub(super) fn dig(&mut self, grid: &mut Grid, config: &AgentConfig, events: &mut Vec<SimEvent>) {
        if self.state != AgentState::Digging {
            return;
        }
        if !self.dig_target.is_some_and(|r| grid.has_cell(r)) {
            debug!("agent {} lost its dig target, shifting", self.id);
            if !self.go_to_nearest_surface(grid) {
                self.state = AgentState::Standing;
                return;
            }
            self.dig_target = self.standing;
        }
        let Some(target) = self.dig_target else {
            self.state = AgentState::Standing;
            return;
        };

        let mut did_damage = false;
        if self.dig_frames % DIG_WINDOW_FRAMES == 0 {
            grid.damage_cell(target, config.dig_speed * DIG_WINDOW_FRAMES as f32);
            did_damage = true;
        }
        self.dig_frames += 1;

        let remaining = grid.effective_health(target, config.unlocks).unwrap_or(0.0);
        if remaining <= 0.0 {
            self.finish_digging(grid, config, events);
        } else if did_damage {
            let kind = grid
                .slot(target)
                .map_or(PixelType::Dirt, |c| {
                    if c.acts_like_dirt(config.unlocks) {
                        PixelType::Dirt
                    } else {
                        c.kind
                    }
                });
            events.push(SimEvent::DigDamage {
                agent: self.id,
                kind,
            });
        }
    }

    /// Removes the dug cell, reports it and finds new ground. If nothing is
    /// left to stand on, the next update notices and the agent dies then.
    fn finish_digging(&mut self, grid: &mut Grid, config: &AgentConfig, events: &mut Vec<SimEvent>) {
        if self.state != AgentState::Digging {
            return;
        }
        self.state = AgentState::Standing;
        if let Some(removed) = self.dig_target.and_then(|r| grid.remove_cell_ref(r)) {
            events.push(SimEvent::CellsRemoved {
                agent: self.id,
                cells: vec![removed],
            });
        }
        self.go_to_nearest_surface(grid);

        self.digs_remaining = self.digs_remaining.saturating_sub(1);
        if self.digs_remaining == 0 {
            self.die(grid, config, DeathCause::Normal, events);
        }
    }
}
