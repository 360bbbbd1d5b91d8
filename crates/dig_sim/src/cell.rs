//! Cell and pixel-type definitions for the destructible body.

use crate::geometry::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base health of a dirt cell. Locked resources are dug as if they had this
/// much health.
pub const DIRT_HEALTH: f32 = 50.0;

/// Discriminants match the host-side type codes. Do not reorder.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum PixelType {
    #[default]
    Dirt = 0,
    Gold = 1,
    Diamond = 2,
    Magic = 3,
    Egg = 4,
    Serpent = 5,
    Tombstone = 6,
}

impl PixelType {
    pub const ALL: [PixelType; 7] = [
        Self::Dirt,
        Self::Gold,
        Self::Diamond,
        Self::Magic,
        Self::Egg,
        Self::Serpent,
        Self::Tombstone,
    ];

    #[must_use]
    pub const fn base_health(self) -> f32 {
        match self {
            Self::Dirt => DIRT_HEALTH,
            Self::Gold => 150.0,
            Self::Diamond => 300.0,
            Self::Magic => 200.0,
            Self::Egg => 100.0,
            Self::Serpent => 350.0,
            Self::Tombstone => 125.0,
        }
    }

    /// Types never removed by an exploding agent.
    #[must_use]
    pub const fn blast_proof(self, egg_handling: bool) -> bool {
        match self {
            Self::Magic => true,
            Self::Egg => !egg_handling,
            _ => false,
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dirt => write!(f, "dirt"),
            Self::Gold => write!(f, "gold"),
            Self::Diamond => write!(f, "diamond"),
            Self::Magic => write!(f, "magic"),
            Self::Egg => write!(f, "egg"),
            Self::Serpent => write!(f, "serpent"),
            Self::Tombstone => write!(f, "tombstone"),
        }
    }
}

/// Which resource types have been researched. Locked resources act like dirt.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Unlocks {
    pub gold: bool,
    pub diamonds: bool,
}

impl Unlocks {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            gold: true,
            diamonds: true,
        }
    }
}

/// Identity of one inserted cell. A cell removed and re-inserted at the same
/// position gets a new serial, so stale references are detectable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct CellRef {
    pub position: Position,
    pub serial: u64,
}

/// One unit of the destructible body.
///
/// The surface flag is cached; keeping it correct is the grid's job.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Cell {
    pub position: Position,
    pub kind: PixelType,
    pub(crate) serial: u64,
    pub(crate) health: f32,
    pub(crate) initial_health: f32,
    pub(crate) health_modifier: f32,
    pub(crate) surface: bool,
    /// 0 leaves the color untouched, 1 is fully black.
    pub(crate) darkness: f32,
    pub(crate) color_override: Option<[u8; 4]>,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.position)
    }
}

impl Cell {
    #[must_use]
    pub fn new(position: Position, kind: PixelType) -> Self {
        Self::with_health(position, kind, kind.base_health(), 1.0)
    }

    /// `initial_health` is scaled by `health_modifier`.
    #[must_use]
    pub fn with_health(
        position: Position,
        kind: PixelType,
        initial_health: f32,
        health_modifier: f32,
    ) -> Self {
        let initial = (initial_health * health_modifier).max(0.0);
        Self {
            position,
            kind,
            serial: 0,
            health: initial,
            initial_health: initial,
            health_modifier,
            surface: false,
            darkness: 0.0,
            color_override: None,
        }
    }

    #[must_use]
    pub fn cell_ref(&self) -> CellRef {
        CellRef {
            position: self.position,
            serial: self.serial,
        }
    }

    /// Reduces health, floored at 0. Zero health does not remove the cell.
    pub fn damage(&mut self, amount: f32) {
        self.health = (self.health - amount.max(0.0)).max(0.0);
    }

    #[must_use]
    pub fn is_surface(&self) -> bool {
        self.surface
    }

    /// Raw remaining health.
    #[must_use]
    pub fn health(&self) -> f32 {
        self.health
    }

    #[must_use]
    pub fn initial_health(&self) -> f32 {
        self.initial_health
    }

    #[must_use]
    pub fn health_modifier(&self) -> f32 {
        self.health_modifier
    }

    #[must_use]
    pub fn darkness(&self) -> f32 {
        self.darkness
    }

    pub fn set_darkness(&mut self, darkness: f32) {
        self.darkness = darkness.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn color_override(&self) -> Option<[u8; 4]> {
        self.color_override
    }

    pub fn set_color_override(&mut self, color: Option<[u8; 4]>) {
        self.color_override = color;
    }

    #[must_use]
    pub fn acts_like_dirt(&self, unlocks: Unlocks) -> bool {
        match self.kind {
            PixelType::Gold => !unlocks.gold,
            PixelType::Diamond => !unlocks.diamonds,
            _ => false,
        }
    }

    /// Health above what a dirt cell would have, for cells acting like dirt.
    fn dirt_surplus(&self, unlocks: Unlocks) -> f32 {
        if self.acts_like_dirt(unlocks) {
            self.initial_health - DIRT_HEALTH * self.health_modifier
        } else {
            0.0
        }
    }

    /// Health as seen by a digger: locked resources only need dirt's worth
    /// of damage.
    #[must_use]
    pub fn effective_health(&self, unlocks: Unlocks) -> f32 {
        (self.health - self.dirt_surplus(unlocks)).max(0.0)
    }

    /// Remaining effective health as a percentage of effective initial health.
    #[must_use]
    pub fn health_pct(&self, unlocks: Unlocks) -> f32 {
        let surplus = self.dirt_surplus(unlocks);
        let full = self.initial_health - surplus;
        if full <= 0.0 {
            return 0.0;
        }
        (100.0 * (self.health - surplus) / full).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pixel_type_discriminant_values() {
        assert_eq!(PixelType::Dirt as u8, 0);
        assert_eq!(PixelType::Gold as u8, 1);
        assert_eq!(PixelType::Diamond as u8, 2);
        assert_eq!(PixelType::Magic as u8, 3);
        assert_eq!(PixelType::Egg as u8, 4);
        assert_eq!(PixelType::Serpent as u8, 5);
        assert_eq!(PixelType::Tombstone as u8, 6);
        for (code, kind) in PixelType::ALL.into_iter().enumerate() {
            assert_eq!(kind as usize, code);
            assert!(kind.base_health() > 0.0);
        }
    }

    #[test]
    fn cell_constructors() {
        let dirt = Cell::new(Position::new(1, 2), PixelType::Dirt);
        assert_eq!(dirt.health(), DIRT_HEALTH);
        assert_eq!(dirt.initial_health(), DIRT_HEALTH);
        assert!(!dirt.is_surface());
        assert_eq!(dirt.darkness(), 0.0);

        let tough = Cell::with_health(Position::new(0, 0), PixelType::Tombstone, 125.0, 2.0);
        assert_eq!(tough.health(), 250.0);
        assert_eq!(tough.health_modifier(), 2.0);
    }

    #[test]
    fn damage_floors_at_zero() {
        let mut cell = Cell::with_health(Position::default(), PixelType::Dirt, 10.0, 1.0);
        cell.damage(4.0);
        assert_eq!(cell.health(), 6.0);
        cell.damage(100.0);
        assert_eq!(cell.health(), 0.0);
        cell.damage(-5.0);
        assert_eq!(cell.health(), 0.0);
    }

    #[test]
    fn locked_gold_digs_like_dirt() {
        let mut gold = Cell::new(Position::default(), PixelType::Gold);
        let locked = Unlocks::default();
        assert!(gold.acts_like_dirt(locked));
        assert!(!gold.acts_like_dirt(Unlocks::all()));
        assert_eq!(gold.effective_health(locked), DIRT_HEALTH);

        gold.damage(DIRT_HEALTH);
        assert_eq!(gold.effective_health(locked), 0.0);
        assert_eq!(gold.effective_health(Unlocks::all()), 100.0);
        assert_eq!(gold.health_pct(locked), 0.0);
    }

    #[test]
    fn blast_proof_types() {
        assert!(PixelType::Magic.blast_proof(true));
        assert!(PixelType::Egg.blast_proof(false));
        assert!(!PixelType::Egg.blast_proof(true));
        assert!(!PixelType::Dirt.blast_proof(false));
    }

    #[test]
    fn darkness_is_clamped() {
        let mut cell = Cell::new(Position::default(), PixelType::Dirt);
        cell.set_darkness(3.0);
        assert_eq!(cell.darkness(), 1.0);
        cell.set_darkness(-1.0);
        assert_eq!(cell.darkness(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_damage_is_monotonic(amounts in proptest::collection::vec(-10.0f32..100.0, 1..20)) {
            let mut cell = Cell::new(Position::default(), PixelType::Diamond);
            let mut last = cell.health();
            for amount in amounts {
                cell.damage(amount);
                prop_assert!(cell.health() <= last);
                prop_assert!(cell.health() >= 0.0);
                last = cell.health();
            }
        }
    }
}
