//! Surface-walking digger agents.
//!
//! Each tick an agent makes sure it still has ground under it, repairs its
//! orientation, then either digs the cell it stands on or walks the
//! perimeter. Dead agents play out their after-death variant until they go
//! inactive. Behaviors live in one submodule each and are dispatched from
//! [`Agent::update`].

mod death;
mod dig;
mod walk;

use crate::cell::{Cell, CellRef, PixelType};
use crate::config::AgentConfig;
use crate::geometry::{Orientation, Position};
use crate::Grid;
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Recent positions kept to stop the walk from bouncing back and forth.
pub const HISTORY_LEN: usize = 4;

/// Stable handle assigned by the owning [`crate::Simulation`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum AgentState {
    /// Alive, idle on its standing cell.
    #[default]
    Standing,
    /// Alive, has been stepping along the perimeter.
    Wandering,
    /// Alive, working on a cell.
    Digging,
    /// Killed by an egg; fades out after a fixed number of ticks.
    DeadEgg,
    /// Drifting away from (saintly) or into (not saintly) the body center.
    DeadAfterlife,
    /// Will leave a tombstone on its next update.
    DeadBuried,
    /// Terminal. Nothing happens any more.
    Inactive,
}

impl AgentState {
    #[must_use]
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Standing | Self::Wandering | Self::Digging)
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        self != Self::Inactive
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum DeathCause {
    Normal,
    Egg,
    Serpent,
    Explosion,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Egg => write!(f, "egg"),
            Self::Serpent => write!(f, "serpent"),
            Self::Explosion => write!(f, "explosion"),
        }
    }
}

/// Which way along the perimeter, as seen from the agent's own "up".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum WalkDirection {
    Left,
    Right,
}

/// Fire-and-forget notifications for feedback collaborators.
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    CellsRemoved { agent: AgentId, cells: Vec<Cell> },
    DigDamage { agent: AgentId, kind: PixelType },
    Stepped { agent: AgentId },
    Died { agent: AgentId, cause: DeathCause },
    ShieldBlocked { agent: AgentId },
    Buried { agent: AgentId, position: Position },
    Inactive { agent: AgentId },
}

/// One digger bound to a grid.
///
/// The agent does not hold its grid; the owner passes it in on every call.
/// While alive, `position` is always the standing cell's position plus one
/// step in `orientation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    /// Body-space position.
    position: Position,
    orientation: Orientation,
    state: AgentState,
    standing: Option<CellRef>,
    dig_target: Option<CellRef>,
    dig_frames: u32,
    digs_remaining: u32,
    history: VecDeque<Position>,
    previous_direction: Option<WalkDirection>,
    frames_since_last_move: u32,
    frames_since_death: u32,
    /// Unrounded local-space position while in the afterlife.
    ascension: Option<(f32, f32)>,
    ascension_progress: u32,
    immaculate: bool,
    saintly: bool,
    explosive: bool,
    shielded: bool,
    blocking_serpent_attack: bool,
    death_cause: Option<DeathCause>,
}

impl Agent {
    /// Creates an agent near `position` and settles it on the closest
    /// surface. Saintliness and explosiveness are rolled here, once.
    pub fn spawn<R: Rng + ?Sized>(
        id: AgentId,
        grid: &mut Grid,
        position: Position,
        config: &AgentConfig,
        immaculate: bool,
        rng: &mut R,
        events: &mut Vec<SimEvent>,
    ) -> Self {
        let saintly_chance = if immaculate {
            config.saintly_chance_immaculate
        } else {
            config.saintly_chance_maculate
        };
        let saintly = rng.random::<f64>() < saintly_chance;
        if !saintly {
            info!("agent {id} is not saintly");
        }
        let explosive = rng.random::<f64>() < config.explosion_chance;

        let mut agent = Self {
            id,
            position,
            orientation: facing_from_center(grid, position),
            state: AgentState::Standing,
            standing: None,
            dig_target: None,
            dig_frames: 0,
            digs_remaining: config.dig_count,
            history: VecDeque::with_capacity(HISTORY_LEN + 1),
            previous_direction: None,
            frames_since_last_move: 0,
            frames_since_death: 0,
            ascension: None,
            ascension_progress: 0,
            immaculate,
            saintly,
            explosive,
            shielded: false,
            blocking_serpent_attack: false,
            death_cause: None,
        };
        if !agent.go_to_nearest_surface(grid) {
            agent.die(grid, config, DeathCause::Normal, events);
        }
        agent
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Position relative to the body center.
    #[must_use]
    pub fn local_position(&self, grid: &Grid) -> Position {
        self.position - grid.center()
    }

    /// Distance from the body center, unrounded during the afterlife.
    #[must_use]
    pub fn local_radius(&self, grid: &Grid) -> f32 {
        match self.ascension {
            Some((x, y)) => x.hypot(y),
            None => {
                let local = self.local_position(grid);
                (local.x as f32).hypot(local.y as f32)
            }
        }
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn state(&self) -> AgentState {
        self.state
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state.is_alive()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    #[must_use]
    pub fn standing(&self) -> Option<CellRef> {
        self.standing
    }

    #[must_use]
    pub fn dig_target(&self) -> Option<CellRef> {
        self.dig_target
    }

    /// Frames spent on the current dig.
    #[must_use]
    pub fn dig_progress(&self) -> u32 {
        self.dig_frames
    }

    #[must_use]
    pub fn digs_remaining(&self) -> u32 {
        self.digs_remaining
    }

    pub fn history(&self) -> impl Iterator<Item = Position> + '_ {
        self.history.iter().copied()
    }

    #[must_use]
    pub fn immaculate(&self) -> bool {
        self.immaculate
    }

    #[must_use]
    pub fn saintly(&self) -> bool {
        self.saintly
    }

    #[must_use]
    pub fn explosive(&self) -> bool {
        self.explosive
    }

    #[must_use]
    pub fn shielded(&self) -> bool {
        self.shielded
    }

    pub fn set_shielded(&mut self, shielded: bool) {
        self.shielded = shielded;
    }

    #[must_use]
    pub fn death_cause(&self) -> Option<DeathCause> {
        self.death_cause
    }

    /// Advances this agent by one tick.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        config: &AgentConfig,
        rng: &mut R,
        events: &mut Vec<SimEvent>,
    ) {
        match self.state {
            AgentState::Inactive => return,
            AgentState::DeadEgg => {
                self.frames_since_death += 1;
                self.fade(events);
                return;
            }
            AgentState::DeadAfterlife => {
                self.frames_since_death += 1;
                self.ascend(grid, events);
                return;
            }
            AgentState::DeadBuried => {
                self.frames_since_death += 1;
                self.bury(grid, events);
                return;
            }
            AgentState::Standing | AgentState::Wandering | AgentState::Digging => {}
        }

        self.frames_since_last_move = self.frames_since_last_move.saturating_add(1);
        if !self.standing.is_some_and(|r| grid.has_cell(r)) {
            self.standing = self.find_pixel_to_stand_on(grid);
            if self.state == AgentState::Digging {
                self.dig_target = self.standing;
            }
        }

        let Some(standing) = self.standing.and_then(|r| grid.cell(r)).copied() else {
            debug!("agent {} has no ground left", self.id);
            self.die(grid, config, DeathCause::Normal, events);
            return;
        };
        if self.check_hazards(&standing, grid, config, events) {
            return;
        }

        self.update_orientation(grid);
        self.position = standing.position.step(self.orientation);

        if self.wants_to_dig(&standing, config, rng) {
            self.start_digging(grid);
        }
        if self.state == AgentState::Digging {
            self.dig(grid, config, events);
        } else {
            self.wander(grid, config, rng, events);
        }
    }

    /// Kills the agent outright, e.g. when the level ends.
    pub fn kill(&mut self, grid: &mut Grid, config: &AgentConfig, events: &mut Vec<SimEvent>) {
        self.die(grid, config, DeathCause::Normal, events);
    }

    /// Returns true if the agent died.
    fn check_hazards(
        &mut self,
        standing: &Cell,
        grid: &mut Grid,
        config: &AgentConfig,
        events: &mut Vec<SimEvent>,
    ) -> bool {
        if standing.kind == PixelType::Egg && !config.egg_handling {
            self.die(grid, config, DeathCause::Egg, events);
            return true;
        }
        if standing.kind == PixelType::Serpent && grid.kind().is_hostile() {
            if !self.shielded {
                self.die(grid, config, DeathCause::Serpent, events);
                return true;
            }
            // One block per attack, not one per tick.
            if !self.blocking_serpent_attack {
                self.blocking_serpent_attack = true;
                events.push(SimEvent::ShieldBlocked { agent: self.id });
            }
        } else {
            self.blocking_serpent_attack = false;
        }
        false
    }

    /// Best cell to stand on: under our feet, one step back, or the nearest
    /// surface anywhere. `None` only when the body has no surface left.
    fn find_pixel_to_stand_on(&self, grid: &Grid) -> Option<CellRef> {
        let back = self.position.step_back(self.orientation);
        for p in [self.position, back] {
            if let Some(cell) = grid.get_cell(p).filter(|c| c.is_surface()) {
                return Some(cell.cell_ref());
            }
        }
        grid.closest_surface_pixel(self.position.x as f32, self.position.y as f32)
            .map(Cell::cell_ref)
    }

    /// Jumps to the best standing cell and resets walk history. Returns
    /// false, leaving the agent without ground, if there is none.
    fn go_to_nearest_surface(&mut self, grid: &Grid) -> bool {
        let Some(found) = self.find_pixel_to_stand_on(grid) else {
            self.standing = None;
            return false;
        };
        self.standing = Some(found);
        // Prefer facing away from the center; repaired below if blocked.
        self.orientation = facing_from_center(grid, found.position);
        self.update_orientation(grid);
        self.position = found.position.step(self.orientation);
        self.frames_since_last_move = 0;
        self.history.clear();
        true
    }

    /// Makes the orientation point at an open side of the standing cell.
    fn update_orientation(&mut self, grid: &Grid) {
        let Some(cell) = self.standing.and_then(|r| grid.cell(r)) else {
            return;
        };
        let around = grid.neighborhood(cell.position);
        if around.is_open(self.orientation) {
            return;
        }
        match around.first_open() {
            Some(orientation) => {
                debug!(
                    "agent {} orientation {} -> {}",
                    self.id, self.orientation, orientation
                );
                self.orientation = orientation;
            }
            None => warn!(
                "agent {} stands on buried cell {}, keeping orientation {}",
                self.id, cell.position, self.orientation
            ),
        }
    }

    /// Drops the oldest history entries beyond [`HISTORY_LEN`], returning
    /// how many went.
    pub(crate) fn trim_history(&mut self) -> usize {
        let excess = self.history.len().saturating_sub(HISTORY_LEN);
        self.history.drain(..excess);
        excess
    }

    fn remember(&mut self, position: Position) {
        self.history.push_back(position);
        while self.history.len() > HISTORY_LEN {
            self.history.pop_front();
        }
    }

    fn set_inactive(&mut self, events: &mut Vec<SimEvent>) {
        if self.state == AgentState::Inactive {
            return;
        }
        self.state = AgentState::Inactive;
        events.push(SimEvent::Inactive { agent: self.id });
    }
}

fn facing_from_center(grid: &Grid, position: Position) -> Orientation {
    let local = position - grid.center();
    Orientation::from_angle((local.y as f32).atan2(local.x as f32))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// Config with every random roll pinned.
    pub(crate) fn quiet_config() -> AgentConfig {
        AgentConfig {
            dig_probability: 0.0,
            move_probability: 0.0,
            explosion_chance: 0.0,
            saintly_chance_immaculate: 1.0,
            saintly_chance_maculate: 1.0,
            dig_count: 100,
            ..AgentConfig::default()
        }
    }

    pub(crate) fn spawn_at(grid: &mut Grid, p: Position, config: &AgentConfig) -> (Agent, Vec<SimEvent>) {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut events = Vec::new();
        let agent = Agent::spawn(AgentId(1), grid, p, config, true, &mut rng, &mut events);
        (agent, events)
    }

    pub(crate) fn assert_standing_invariant(agent: &Agent, grid: &Grid) {
        let standing = agent.standing().and_then(|r| grid.cell(r)).expect("standing cell");
        assert_eq!(agent.position(), standing.position.step(agent.orientation()));
        assert!(grid.get_cell(agent.position()).is_none(), "agent inside a cell");
    }

    #[test]
    fn spawn_settles_on_surface() {
        let mut grid = Grid::disc(21, 21, 8.0, PixelType::Dirt);
        let config = quiet_config();
        let (agent, events) = spawn_at(&mut grid, Position::new(10, 0), &config);
        assert!(events.is_empty());
        assert!(agent.is_alive());
        assert_eq!(agent.state(), AgentState::Standing);
        assert_eq!(agent.orientation(), Orientation::Up);
        assert_eq!(agent.position(), Position::new(10, 1));
        assert_standing_invariant(&agent, &grid);
    }

    #[test]
    fn spawn_on_empty_grid_dies() {
        let mut grid = Grid::new(8, 8);
        let config = quiet_config();
        let (agent, events) = spawn_at(&mut grid, Position::new(2, 2), &config);
        assert!(!agent.is_alive());
        assert_eq!(agent.death_cause(), Some(DeathCause::Normal));
        assert!(events.contains(&SimEvent::Died {
            agent: AgentId(1),
            cause: DeathCause::Normal
        }));
    }

    #[test]
    fn rolls_are_made_once_at_spawn() {
        let mut grid = Grid::disc(11, 11, 3.0, PixelType::Dirt);
        let config = AgentConfig {
            explosion_chance: 1.0,
            saintly_chance_maculate: 0.0,
            ..quiet_config()
        };
        let mut rng = SmallRng::seed_from_u64(9);
        let mut events = Vec::new();
        let agent = Agent::spawn(AgentId(2), &mut grid, Position::new(5, 0), &config, false, &mut rng, &mut events);
        assert!(agent.explosive());
        assert!(!agent.saintly());
        assert!(!agent.immaculate());
    }

    #[test]
    fn orientation_is_repaired_when_blocked() {
        let mut grid = Grid::new(7, 7);
        for x in 0..7 {
            grid.add_cell(Position::new(x, 3), PixelType::Dirt);
        }
        let config = quiet_config();
        let (mut agent, _) = spawn_at(&mut grid, Position::new(3, 3), &config);
        assert_standing_invariant(&agent, &grid);
        // Block whatever side the agent faces; it must pick another open one.
        let blocked = agent.position();
        grid.add_cell(blocked, PixelType::Dirt);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut events = Vec::new();
        agent.update(&mut grid, &config, &mut rng, &mut events);
        assert!(agent.is_alive());
        assert_standing_invariant(&agent, &grid);
    }

    #[test]
    fn buried_standing_cell_keeps_orientation() {
        let mut grid = Grid::new(3, 3);
        grid.add_cell(Position::new(1, 1), PixelType::Dirt);
        let config = quiet_config();
        let (mut agent, _) = spawn_at(&mut grid, Position::new(1, 1), &config);
        let facing = agent.orientation();
        for p in Position::new(1, 1).orthogonal_neighbors() {
            grid.add_cell(p, PixelType::Dirt);
        }
        // The old standing cell is interior now; repair must not panic.
        agent.update_orientation(&grid);
        assert_eq!(agent.orientation(), facing);
    }

    #[test]
    fn history_is_bounded() {
        let mut grid = Grid::new(4, 4);
        grid.add_cell(Position::new(1, 1), PixelType::Dirt);
        let (mut agent, _) = spawn_at(&mut grid, Position::new(1, 1), &quiet_config());
        for i in 0..10 {
            agent.remember(Position::new(i, 0));
        }
        assert_eq!(agent.history().count(), HISTORY_LEN);
        assert_eq!(agent.history().next(), Some(Position::new(6, 0)));
    }

    #[test]
    fn egg_kills_without_handling() {
        let mut grid = Grid::new(5, 5);
        grid.add_cell(Position::new(2, 2), PixelType::Egg);
        let config = quiet_config();
        let (mut agent, _) = spawn_at(&mut grid, Position::new(2, 2), &config);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut events = Vec::new();
        agent.update(&mut grid, &config, &mut rng, &mut events);
        assert_eq!(agent.state(), AgentState::DeadEgg);
        assert_eq!(agent.death_cause(), Some(DeathCause::Egg));

        let handled = AgentConfig {
            egg_handling: true,
            ..quiet_config()
        };
        let (mut survivor, _) = spawn_at(&mut grid, Position::new(2, 2), &handled);
        survivor.update(&mut grid, &handled, &mut rng, &mut events);
        assert!(survivor.is_alive());
    }

    #[test]
    fn hostile_serpent_kills_unshielded_and_blocks_once_for_shielded() {
        let mut grid = Grid::with_kind(5, 5, crate::BodyKind::Serpent { attacking: false });
        grid.add_cell(Position::new(2, 2), PixelType::Serpent);
        let config = quiet_config();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut events = Vec::new();

        let (mut victim, _) = spawn_at(&mut grid, Position::new(2, 2), &config);
        let (mut guarded, _) = spawn_at(&mut grid, Position::new(2, 2), &config);
        guarded.set_shielded(true);

        victim.update(&mut grid, &config, &mut rng, &mut events);
        assert!(victim.is_alive());

        grid.set_kind(crate::BodyKind::Serpent { attacking: true });
        for _ in 0..3 {
            victim.update(&mut grid, &config, &mut rng, &mut events);
            guarded.update(&mut grid, &config, &mut rng, &mut events);
        }
        assert_eq!(victim.death_cause(), Some(DeathCause::Serpent));
        assert!(guarded.is_alive());
        let blocks = events
            .iter()
            .filter(|e| matches!(e, SimEvent::ShieldBlocked { .. }))
            .count();
        assert_eq!(blocks, 1);
    }
}
