//! Browser-facing handle. Thin wrapper over [`Simulation`]; all state lives
//! there.

use crate::cell::PixelType;
use crate::config::SimConfig;
use crate::grid::Grid;
use crate::simulation::Simulation;
use wasm_bindgen::prelude::*;

/// Fraction of the smaller grid side used as the starting body radius.
const BODY_RADIUS_FRACTION: f32 = 0.4;

#[wasm_bindgen]
#[derive(Debug)]
pub struct Universe {
    sim: Simulation,
    pixels: Vec<u8>,
}

fn js_error(err: impl std::fmt::Display) -> JsError {
    JsError::new(&err.to_string())
}

impl Universe {
    fn from_simulation(sim: Simulation) -> Self {
        let len = sim.grid().width() * sim.grid().height() * 4;
        Self {
            sim,
            pixels: vec![0; len],
        }
    }

    fn disc_body(width: usize, height: usize) -> Grid {
        let radius = width.min(height) as f32 * BODY_RADIUS_FRACTION;
        Grid::disc(width, height, radius, PixelType::Dirt)
    }

    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }
}

#[wasm_bindgen]
impl Universe {
    /// A round dirt body filling most of a `width` x `height` grid, with
    /// default tunables.
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new(width: usize, height: usize, seed: u64) -> Universe {
        let config = SimConfig {
            rng_seed: Some(seed),
            ..SimConfig::default()
        };
        Self::from_simulation(Simulation::from_parts(Self::disc_body(width, height), config))
    }

    /// Like [`Universe::new`] with tunables read from a TOML document.
    ///
    /// # Errors
    /// Fails if the TOML is malformed or out of range.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(width: usize, height: usize, toml: &str) -> Result<Universe, JsError> {
        let config = SimConfig::from_toml_str(toml).map_err(js_error)?;
        let sim = Simulation::new(Self::disc_body(width, height), config).map_err(js_error)?;
        Ok(Self::from_simulation(sim))
    }

    /// Restores a game saved with [`Universe::save`].
    ///
    /// # Errors
    /// Fails on malformed save data or config.
    pub fn load(json: &str, toml: &str) -> Result<Universe, JsError> {
        let config = SimConfig::from_toml_str(toml).map_err(js_error)?;
        let sim = Simulation::restore_json(json, config).map_err(js_error)?;
        Ok(Self::from_simulation(sim))
    }

    /// # Errors
    /// Fails only if serialization fails.
    pub fn save(&self) -> Result<String, JsError> {
        self.sim.save_json().map_err(js_error)
    }

    /// Advances one tick, drops finished agents and returns the number of
    /// events produced.
    pub fn tick(&mut self) -> u32 {
        let events = self.sim.tick();
        self.sim.remove_inactive();
        events.len() as u32
    }

    /// Drops an agent near `(x, y)`. False if there is no surface left.
    pub fn spawn(&mut self, x: i32, y: i32) -> bool {
        self.sim.spawn(x, y, true).is_some()
    }

    #[wasm_bindgen(js_name = killAll)]
    pub fn kill_all(&mut self) -> u32 {
        self.sim.kill_all().len() as u32
    }

    /// Re-renders the body and returns a pointer to the RGBA buffer.
    pub fn render(&mut self) -> *const u8 {
        self.sim.grid().render_rgba(
            &self.sim.config().render,
            self.sim.config().agent.unlocks,
            &mut self.pixels,
        );
        self.pixels.as_ptr()
    }

    pub fn width(&self) -> usize {
        self.sim.grid().width()
    }

    pub fn height(&self) -> usize {
        self.sim.grid().height()
    }

    #[wasm_bindgen(js_name = cellCount)]
    pub fn cell_count(&self) -> usize {
        self.sim.grid().len()
    }

    #[wasm_bindgen(js_name = agentCount)]
    pub fn agent_count(&self) -> usize {
        self.sim.agents().len()
    }

    #[wasm_bindgen(js_name = aliveCount)]
    pub fn alive_count(&self) -> usize {
        self.sim.alive_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_universe_has_a_body() {
        let universe = Universe::new(40, 30, 1);
        assert_eq!(universe.width(), 40);
        assert_eq!(universe.height(), 30);
        assert!(universe.cell_count() > 0);
        assert_eq!(universe.agent_count(), 0);
    }

    #[test]
    fn spawn_tick_render() {
        let mut universe = Universe::new(40, 40, 1);
        assert!(universe.spawn(20, 0));
        assert!(universe.spawn(0, 20));
        for _ in 0..50 {
            universe.tick();
        }
        assert_eq!(universe.alive_count(), 2);
        let ptr = universe.render();
        assert_eq!(ptr, universe.pixels.as_ptr());
        let center = (20 * 40 + 20) * 4;
        assert_eq!(universe.pixels[center + 3], 255);
        assert_eq!(&universe.pixels[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut universe = Universe::new(32, 32, 3);
        universe.spawn(16, 0);
        for _ in 0..20 {
            universe.tick();
        }
        let json = universe.simulation().save_json().unwrap();
        let Ok(loaded) = Universe::load(&json, "rng_seed = 3\n") else {
            panic!("save did not load back");
        };
        assert_eq!(loaded.cell_count(), universe.cell_count());
        assert_eq!(loaded.simulation().agents(), universe.simulation().agents());
    }

    #[test]
    fn kill_all_sweeps_after_burial() {
        let mut universe = Universe::new(32, 32, 3);
        universe.spawn(16, 0);
        assert_eq!(universe.kill_all(), 1);
        universe.tick();
        assert_eq!(universe.agent_count(), 0);
    }
}
