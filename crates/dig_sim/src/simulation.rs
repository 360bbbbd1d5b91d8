//! Owns one body and its agents and advances them together.

use crate::agent::{Agent, AgentId, SimEvent};
use crate::config::{ConfigError, SimConfig};
use crate::geometry::Position;
use crate::grid::{BodyKind, Grid};
use log::{debug, info};
use rand::rngs::SmallRng;

/// A body plus every agent bound to it.
///
/// Agents update in spawn order each tick, and each one sees the grid as the
/// previous agent left it.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub(crate) grid: Grid,
    pub(crate) agents: Vec<Agent>,
    pub(crate) config: SimConfig,
    pub(crate) rng: SmallRng,
    pub(crate) tick: u64,
    pub(crate) next_agent_id: u32,
}

impl Simulation {
    /// # Errors
    /// Returns [`ConfigError`] if `config` does not validate.
    pub fn new(grid: Grid, config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(grid, config))
    }

    /// Skips validation; `config` must already be known good.
    pub(crate) fn from_parts(grid: Grid, config: SimConfig) -> Self {
        let rng = config.seeded_rng();
        info!(
            "simulation started on a {}x{} body with {} cells",
            grid.width(),
            grid.height(),
            grid.len()
        );
        Self {
            grid,
            agents: Vec::new(),
            config,
            rng,
            tick: 0,
            next_agent_id: 1,
        }
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Direct grid access for hosts that carve the body themselves. Agents
    /// notice vanished cells on their next update.
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id() == id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id() == id)
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_alive()).count()
    }

    /// Drops an agent near `(x, y)` onto the closest surface. Returns `None`
    /// if the body has no surface to land on.
    pub fn spawn(&mut self, x: i32, y: i32, immaculate: bool) -> Option<AgentId> {
        let landing = self
            .grid
            .closest_surface_pixel(x as f32, y as f32)?
            .position;
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        // Landing on a surface cell cannot fail, so spawning emits nothing.
        let mut events = Vec::new();
        let agent = Agent::spawn(
            id,
            &mut self.grid,
            landing,
            &self.config.agent,
            immaculate,
            &mut self.rng,
            &mut events,
        );
        debug!("spawned agent {id} at {}", agent.position());
        self.agents.push(agent);
        Some(id)
    }

    /// Advances every agent once, in spawn order, and returns what happened.
    pub fn tick(&mut self) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for agent in &mut self.agents {
            agent.update(&mut self.grid, &self.config.agent, &mut self.rng, &mut events);
        }
        self.tick += 1;
        events
    }

    /// Kills every living agent, e.g. when the level ends.
    pub fn kill_all(&mut self) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for agent in &mut self.agents {
            agent.kill(&mut self.grid, &self.config.agent, &mut events);
        }
        events
    }

    /// Forgets agents that have finished their after-death variant.
    pub fn remove_inactive(&mut self) -> usize {
        let before = self.agents.len();
        self.agents.retain(Agent::is_active);
        before - self.agents.len()
    }

    /// Toggles a serpent body's attack. No effect on other bodies.
    pub fn set_serpent_attacking(&mut self, attacking: bool) {
        if let BodyKind::Serpent { .. } = self.grid.kind() {
            self.grid.set_kind(BodyKind::Serpent { attacking });
        }
    }

    /// Stops disguising an egg body's egg. No effect on other bodies.
    pub fn reveal_egg(&mut self) {
        if self.grid.kind().has_egg_reveal() {
            self.grid.set_kind(BodyKind::EggPlanet { revealed: true });
        }
    }

    /// Body-space position of `id`, if it exists.
    #[must_use]
    pub fn agent_position(&self, id: AgentId) -> Option<Position> {
        self.agent(id).map(Agent::position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentState, DeathCause};
    use crate::cell::PixelType;
    use crate::config::AgentConfig;

    fn config(agent: AgentConfig) -> SimConfig {
        SimConfig {
            rng_seed: Some(99),
            agent,
            ..SimConfig::default()
        }
    }

    fn busy() -> AgentConfig {
        AgentConfig {
            move_probability: 1.0,
            min_frames_between_moves: 0,
            dig_probability: 0.05,
            dig_speed: 5.0,
            dig_count: 50,
            ..AgentConfig::default()
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = config(AgentConfig {
            dig_probability: -1.0,
            ..AgentConfig::default()
        });
        assert!(Simulation::new(Grid::new(4, 4), bad).is_err());
    }

    #[test]
    fn spawn_lands_on_nearest_surface() {
        let grid = Grid::disc(21, 21, 8.0, PixelType::Dirt);
        let mut sim = Simulation::new(grid, config(AgentConfig::default())).unwrap();
        let id = sim.spawn(10, 0, true).unwrap();
        assert_eq!(id, AgentId(1));
        assert_eq!(sim.agent_position(id), Some(Position::new(10, 1)));
        assert_eq!(sim.spawn(0, 0, true), Some(AgentId(2)));
        assert_eq!(sim.alive_count(), 2);

        let mut empty = Simulation::new(Grid::new(5, 5), config(AgentConfig::default())).unwrap();
        assert_eq!(empty.spawn(2, 2, true), None);
        assert!(empty.agents().is_empty());
    }

    #[test]
    fn same_seed_same_history() {
        let run = || {
            let grid = Grid::disc(31, 31, 10.0, PixelType::Dirt);
            let mut sim = Simulation::new(grid, config(busy())).unwrap();
            for x in [0, 15, 30] {
                sim.spawn(x, 0, false);
            }
            let mut all = Vec::new();
            for _ in 0..300 {
                all.extend(sim.tick());
            }
            (all, sim.grid().len())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn digging_removes_cells_and_keeps_agents_grounded() {
        let grid = Grid::disc(31, 31, 10.0, PixelType::Dirt);
        let start = grid.len();
        let mut sim = Simulation::new(grid, config(busy())).unwrap();
        for x in [0, 15, 30] {
            sim.spawn(x, 0, true);
        }
        let mut removed = 0;
        for _ in 0..400 {
            for event in sim.tick() {
                if let SimEvent::CellsRemoved { cells, .. } = event {
                    removed += cells.len();
                }
            }
            // A later agent may have dug out an earlier one's ground this
            // tick; that agent re-acquires on its next update.
            for agent in sim.agents().iter().filter(|a| a.is_alive()) {
                if let Some(standing) = agent.standing().and_then(|r| sim.grid().cell(r)) {
                    assert_eq!(agent.position(), standing.position.step(agent.orientation()));
                }
            }
        }
        assert!(removed > 0);
        assert_eq!(sim.grid().len(), start - removed);
        assert_eq!(sim.tick_count(), 400);
    }

    #[test]
    fn kill_all_then_sweep() {
        let grid = Grid::disc(21, 21, 8.0, PixelType::Dirt);
        let mut sim = Simulation::new(grid, config(AgentConfig::default())).unwrap();
        sim.spawn(10, 0, true);
        sim.spawn(10, 20, true);
        let events = sim.kill_all();
        assert_eq!(events.len(), 2);
        assert!(sim
            .agents()
            .iter()
            .all(|a| a.state() == AgentState::DeadBuried && a.death_cause() == Some(DeathCause::Normal)));
        assert_eq!(sim.remove_inactive(), 0);

        let buried = sim.tick();
        assert_eq!(
            buried.iter().filter(|e| matches!(e, SimEvent::Buried { .. })).count(),
            2
        );
        assert_eq!(sim.remove_inactive(), 2);
        assert!(sim.agents().is_empty());
    }

    #[test]
    fn shield_granted_by_the_host_blocks_the_serpent() {
        let mut grid = Grid::with_kind(5, 5, BodyKind::Serpent { attacking: false });
        grid.add_cell(Position::new(2, 2), PixelType::Serpent);
        let still = AgentConfig {
            move_probability: 0.0,
            dig_probability: 0.0,
            ..AgentConfig::default()
        };
        let mut sim = Simulation::new(grid, config(still)).unwrap();
        let guarded = sim.spawn(2, 0, true).unwrap();
        let victim = sim.spawn(2, 4, true).unwrap();
        sim.agent_mut(guarded).unwrap().set_shielded(true);
        assert_eq!(sim.agent_mut(AgentId(99)).map(|a| a.id()), None);

        sim.set_serpent_attacking(true);
        for _ in 0..3 {
            sim.tick();
        }
        assert!(sim.agent(guarded).unwrap().is_alive());
        assert_eq!(sim.agent(victim).unwrap().death_cause(), Some(DeathCause::Serpent));
    }

    #[test]
    fn body_toggles_only_apply_to_matching_bodies() {
        let mut sim = Simulation::new(
            Grid::with_kind(4, 4, BodyKind::Serpent { attacking: false }),
            config(AgentConfig::default()),
        )
        .unwrap();
        sim.set_serpent_attacking(true);
        assert!(sim.grid().kind().is_hostile());
        sim.reveal_egg();
        assert_eq!(sim.grid().kind(), BodyKind::Serpent { attacking: true });

        let mut planet = Simulation::new(Grid::new(4, 4), config(AgentConfig::default())).unwrap();
        planet.set_serpent_attacking(true);
        assert_eq!(planet.grid().kind(), BodyKind::Planet);
    }
}
