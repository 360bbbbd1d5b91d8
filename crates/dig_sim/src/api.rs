//! Relative-offset read API over a grid, used by agent behaviors.

use crate::cell::Cell;
use crate::geometry::{Orientation, Position};
use crate::Grid;

/// Off-grid reads return `None`, the same as an empty slot.
#[derive(Debug, Clone, Copy)]
pub struct Neighborhood<'a> {
    pub grid: &'a Grid,
    pub x: i32,
    pub y: i32,
}

impl<'a> Neighborhood<'a> {
    #[must_use]
    pub fn new(grid: &'a Grid, position: Position) -> Self {
        Self {
            grid,
            x: position.x,
            y: position.y,
        }
    }

    #[must_use]
    pub fn get(&self, dx: i32, dy: i32) -> Option<&'a Cell> {
        self.grid.get_cell(Position::new(self.x + dx, self.y + dy))
    }

    /// True when the slot one step in `orientation` has no live cell.
    #[must_use]
    pub fn is_open(&self, orientation: Orientation) -> bool {
        let (dx, dy) = orientation.vector();
        self.get(dx, dy).is_none()
    }

    /// Open sides of the origin, in [`Orientation::EDGES`] order.
    pub fn open_edges(self) -> impl Iterator<Item = Orientation> + 'a {
        Orientation::EDGES.into_iter().filter(move |&o| self.is_open(o))
    }

    /// First open side in repair order, if any.
    #[must_use]
    pub fn first_open(&self) -> Option<Orientation> {
        Orientation::REPAIR_ORDER
            .into_iter()
            .find(|&o| self.is_open(o))
    }
}
