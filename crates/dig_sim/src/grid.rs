//! The destructible pixel body: live cells, the surface set and spatial
//! queries.

use crate::api::Neighborhood;
use crate::cell::{Cell, CellRef, PixelType, Unlocks};
use crate::geometry::Position;
use crate::persist::GridSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which kind of body this grid is. Agent logic consults the capability
/// flags rather than the variant directly.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum BodyKind {
    #[default]
    Planet,
    /// Hides an egg that stays disguised as dirt until revealed.
    EggPlanet { revealed: bool },
    /// A creature that periodically lashes out at whoever stands on it.
    Serpent { attacking: bool },
}

impl BodyKind {
    #[must_use]
    pub fn has_egg_reveal(self) -> bool {
        matches!(self, Self::EggPlanet { .. })
    }

    #[must_use]
    pub fn egg_revealed(self) -> bool {
        matches!(self, Self::EggPlanet { revealed: true })
    }

    /// True while standing on this body's serpent cells is lethal.
    #[must_use]
    pub fn is_hostile(self) -> bool {
        matches!(self, Self::Serpent { attacking: true })
    }
}

/// Dense row-major cell storage plus an ordered index of surface cells.
///
/// A cell is surface iff at least one orthogonal neighbor slot is empty or
/// off-grid. Every mutation recomputes the four orthogonal neighbors of the
/// changed slot before returning, so the flag never goes stale.
///
/// Cells damaged down to zero health are hidden from every query until they
/// are removed, and their neighbors see an empty slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "GridSnapshot", try_from = "GridSnapshot")]
pub struct Grid {
    width: usize,
    height: usize,
    kind: BodyKind,
    cells: Vec<Option<Cell>>,
    surface: BTreeSet<usize>,
    len: usize,
    next_serial: u64,
}

impl Grid {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_kind(width, height, BodyKind::Planet)
    }

    #[must_use]
    pub fn with_kind(width: usize, height: usize, kind: BodyKind) -> Self {
        Self {
            width,
            height,
            kind,
            cells: vec![None; width * height],
            surface: BTreeSet::new(),
            len: 0,
            next_serial: 1,
        }
    }

    /// A round body of `kind` cells within `radius` of the grid center.
    #[must_use]
    pub fn disc(width: usize, height: usize, radius: f32, kind: PixelType) -> Self {
        let mut grid = Self::new(width, height);
        let center = grid.center();
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let p = Position::new(x, y);
                if p.distance(center) <= radius {
                    grid.add_cell(p, kind);
                }
            }
        }
        grid
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: BodyKind) {
        self.kind = kind;
    }

    /// Origin of the body's local space.
    #[must_use]
    pub fn center(&self) -> Position {
        Position::new(self.width as i32 / 2, self.height as i32 / 2)
    }

    /// Number of live cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn surface_len(&self) -> usize {
        self.surface.len()
    }

    #[must_use]
    pub fn in_bounds(&self, p: Position) -> bool {
        p.x >= 0 && (p.x as usize) < self.width && p.y >= 0 && (p.y as usize) < self.height
    }

    fn index(&self, p: Position) -> Option<usize> {
        self.in_bounds(p)
            .then(|| p.y as usize * self.width + p.x as usize)
    }

    fn occupied(&self, p: Position) -> bool {
        self.index(p).is_some_and(|i| self.live(i).is_some())
    }

    fn live(&self, index: usize) -> Option<&Cell> {
        self.cells[index].as_ref().filter(|c| c.health > 0.0)
    }

    /// The live cell at `p`, if any. Off-grid positions yield `None`.
    #[must_use]
    pub fn get_cell(&self, p: Position) -> Option<&Cell> {
        self.index(p).and_then(|i| self.live(i))
    }

    /// Resolves a reference only if that exact cell is still present.
    #[must_use]
    pub fn cell(&self, cell: CellRef) -> Option<&Cell> {
        self.get_cell(cell.position)
            .filter(|c| c.serial == cell.serial)
    }

    #[must_use]
    pub fn has_cell(&self, cell: CellRef) -> bool {
        self.cell(cell).is_some()
    }

    /// Relative-offset view centered on `p`.
    #[must_use]
    pub fn neighborhood(&self, p: Position) -> Neighborhood<'_> {
        Neighborhood::new(self, p)
    }

    /// All live cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().flatten().filter(|c| c.health > 0.0)
    }

    /// Live surface cells in row-major order.
    pub fn surface_cells(&self) -> impl Iterator<Item = &Cell> {
        self.surface.iter().filter_map(|&i| self.live(i))
    }

    /// Like [`Grid::cell`], but also sees cells already damaged to zero.
    pub(crate) fn slot(&self, cell: CellRef) -> Option<&Cell> {
        let index = self.index(cell.position)?;
        self.cells[index]
            .as_ref()
            .filter(|c| c.serial == cell.serial)
    }

    /// Effective health of the referenced cell, 0 once dug through.
    #[must_use]
    pub fn effective_health(&self, cell: CellRef, unlocks: Unlocks) -> Option<f32> {
        self.slot(cell).map(|c| c.effective_health(unlocks))
    }

    /// Applies damage to the referenced cell and returns its remaining
    /// health, or `None` if the cell is gone. Never removes the cell, but a
    /// cell reaching zero leaves the surface and exposes its neighbors.
    pub fn damage_cell(&mut self, cell: CellRef, amount: f32) -> Option<f32> {
        let index = self.index(cell.position)?;
        let target = self.cells[index]
            .as_mut()
            .filter(|c| c.serial == cell.serial)?;
        let was_live = target.health > 0.0;
        target.damage(amount);
        let health = target.health;
        if was_live && health <= 0.0 {
            self.refresh(cell.position);
            self.refresh_neighbors(cell.position);
        }
        Some(health)
    }

    pub fn set_darkness(&mut self, p: Position, darkness: f32) -> bool {
        match self.index(p).and_then(|i| self.cells[i].as_mut()) {
            Some(cell) => {
                cell.set_darkness(darkness);
                true
            }
            None => false,
        }
    }

    pub fn set_color_override(&mut self, p: Position, color: Option<[u8; 4]>) -> bool {
        match self.index(p).and_then(|i| self.cells[i].as_mut()) {
            Some(cell) => {
                cell.set_color_override(color);
                true
            }
            None => false,
        }
    }

    /// Inserts a fresh cell of `kind` with its base health.
    ///
    /// Returns false without touching anything if `p` is off-grid or taken.
    pub fn add_cell(&mut self, p: Position, kind: PixelType) -> bool {
        self.insert(Cell::new(p, kind))
    }

    pub fn add_cell_with_health(&mut self, p: Position, kind: PixelType, health: f32) -> bool {
        self.insert(Cell::with_health(p, kind, health, 1.0))
    }

    /// Inserts `cell` at its own position, assigning it a new serial.
    pub fn insert(&mut self, mut cell: Cell) -> bool {
        if cell.health <= 0.0 {
            return false;
        }
        let Some(index) = self.index(cell.position) else {
            return false;
        };
        if self.cells[index].is_some() {
            return false;
        }
        cell.serial = self.next_serial;
        self.next_serial += 1;
        let p = cell.position;
        self.cells[index] = Some(cell);
        self.len += 1;
        self.refresh(p);
        self.refresh_neighbors(p);
        true
    }

    /// Removes the cell at `p`, returning it. Absent cells are a no-op.
    pub fn remove_cell(&mut self, p: Position) -> Option<Cell> {
        let index = self.index(p)?;
        let removed = self.cells[index].take()?;
        self.len -= 1;
        self.surface.remove(&index);
        self.refresh_neighbors(p);
        Some(removed)
    }

    /// Removes the referenced cell only if it is still the same cell.
    pub fn remove_cell_ref(&mut self, cell: CellRef) -> Option<Cell> {
        self.slot(cell)?;
        self.remove_cell(cell.position)
    }

    /// Removes every listed position that holds a cell.
    pub fn remove_cells<I>(&mut self, positions: I) -> Vec<Cell>
    where
        I: IntoIterator<Item = Position>,
    {
        positions
            .into_iter()
            .filter_map(|p| self.remove_cell(p))
            .collect()
    }

    /// The up-to-8 (9 with `include_self`) live cells around `p`, keyed by
    /// position. Missing neighbors are simply absent.
    #[must_use]
    pub fn surrounding_cells(&self, p: Position, include_self: bool) -> BTreeMap<Position, &Cell> {
        let mut out = BTreeMap::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 && !include_self {
                    continue;
                }
                let q = Position::new(p.x + dx, p.y + dy);
                if let Some(cell) = self.get_cell(q) {
                    out.insert(q, cell);
                }
            }
        }
        out
    }

    /// The surface cell nearest to `(x, y)`. Ties go to the first in
    /// row-major order. `None` only when no surface is left.
    #[must_use]
    pub fn closest_surface_pixel(&self, x: f32, y: f32) -> Option<&Cell> {
        let mut best: Option<(&Cell, f32)> = None;
        for cell in self.surface_cells() {
            let d = cell.position.distance_to(x, y);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((cell, d));
            }
        }
        best.map(|(cell, _)| cell)
    }

    /// Live cells within `radius` (inclusive) of `(x, y)`, row-major.
    #[must_use]
    pub fn pixels_around(&self, x: f32, y: f32, radius: f32) -> Vec<&Cell> {
        if radius < 0.0 {
            return Vec::new();
        }
        let min_x = (x - radius).floor() as i32;
        let max_x = (x + radius).ceil() as i32;
        let min_y = (y - radius).floor() as i32;
        let max_y = (y + radius).ceil() as i32;
        let mut out = Vec::new();
        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let p = Position::new(px, py);
                if p.distance_to(x, y) > radius {
                    continue;
                }
                if let Some(cell) = self.get_cell(p) {
                    out.push(cell);
                }
            }
        }
        out
    }

    /// Full surface rebuild. Incremental maintenance makes this redundant
    /// except after bulk restores.
    pub fn update_surface(&mut self) {
        self.surface.clear();
        for index in 0..self.cells.len() {
            if self.cells[index].is_some() {
                let p = Position::new((index % self.width) as i32, (index / self.width) as i32);
                self.refresh(p);
            }
        }
    }

    fn refresh_neighbors(&mut self, p: Position) {
        for q in p.orthogonal_neighbors() {
            self.refresh(q);
        }
    }

    fn refresh(&mut self, p: Position) {
        let Some(index) = self.index(p) else {
            return;
        };
        if self.cells[index].is_none() {
            return;
        }
        let exposed =
            self.occupied(p) && p.orthogonal_neighbors().any(|q| !self.occupied(q));
        if let Some(cell) = self.cells[index].as_mut() {
            cell.surface = exposed;
        }
        if exposed {
            self.surface.insert(index);
        } else {
            self.surface.remove(&index);
        }
    }

    pub(crate) fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            width: self.width,
            height: self.height,
            kind: self.kind,
            next_serial: self.next_serial,
            cells: self.cells.iter().flatten().copied().collect(),
        }
    }

    pub(crate) fn bump_serial(&mut self, next_serial: u64) {
        self.next_serial = self.next_serial.max(next_serial);
    }

    /// Places a stored cell verbatim, keeping its serial and flags. The
    /// caller rejects dead cells first.
    pub(crate) fn restore_cell(&mut self, cell: Cell) -> bool {
        let Some(index) = self.index(cell.position) else {
            return false;
        };
        if self.cells[index].is_some() {
            return false;
        }
        self.next_serial = self.next_serial.max(cell.serial.saturating_add(1));
        self.cells[index] = Some(cell);
        self.len += 1;
        true
    }
}
