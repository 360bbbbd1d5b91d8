//! Display color and alpha for cells. Nothing here mutates simulation state.

use crate::cell::{Cell, PixelType, Unlocks};
use crate::config::RenderConfig;
use crate::grid::{BodyKind, Grid};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[must_use]
    pub const fn from_array([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub fn darkened(self, darkness: f32) -> Self {
        let keep = 1.0 - darkness.clamp(0.0, 1.0);
        let scale = |c: u8| (f32::from(c) * keep).round() as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
            a: self.a,
        }
    }
}

/// Palette used for dirt (and anything acting like dirt) on the current body.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum DirtStyle {
    #[default]
    Dirt,
    Goop,
    Ice,
}

impl DirtStyle {
    /// (interior, surface)
    #[must_use]
    pub const fn colors(self) -> (Rgba, Rgba) {
        match self {
            Self::Dirt => (Rgba::rgb(99, 72, 52), Rgba::rgb(67, 140, 60)),
            Self::Goop => (Rgba::rgb(74, 102, 48), Rgba::rgb(120, 170, 62)),
            Self::Ice => (Rgba::rgb(150, 196, 222), Rgba::rgb(224, 240, 250)),
        }
    }
}

/// (interior, surface) for types with their own palette.
const fn type_colors(kind: PixelType) -> Option<(Rgba, Rgba)> {
    match kind {
        PixelType::Dirt => None,
        PixelType::Gold => Some((Rgba::rgb(212, 175, 55), Rgba::rgb(235, 200, 80))),
        PixelType::Diamond => Some((Rgba::rgb(103, 200, 220), Rgba::rgb(150, 230, 245))),
        PixelType::Magic => Some((Rgba::rgb(160, 70, 200), Rgba::rgb(190, 110, 230))),
        PixelType::Egg => Some((Rgba::rgb(240, 232, 205), Rgba::rgb(250, 245, 225))),
        PixelType::Serpent => Some((Rgba::rgb(58, 36, 66), Rgba::rgb(85, 51, 97))),
        PixelType::Tombstone => Some((Rgba::rgb(128, 128, 128), Rgba::rgb(128, 128, 128))),
    }
}

/// Rounds `value` up to the next multiple of `interval`.
#[must_use]
pub fn ceil_to_nearest(interval: f32, value: f32) -> f32 {
    if interval <= 0.0 {
        return value;
    }
    (value / interval).ceil() * interval
}

impl Cell {
    /// Color before darkness, honoring dirt disguises.
    #[must_use]
    pub fn base_color(&self, config: &RenderConfig, unlocks: Unlocks, body: BodyKind) -> Rgba {
        let disguised_egg =
            self.kind == PixelType::Egg && body.has_egg_reveal() && !body.egg_revealed();
        let palette = if self.acts_like_dirt(unlocks) || disguised_egg {
            None
        } else {
            type_colors(self.kind)
        };
        let (interior, surface) = palette.unwrap_or_else(|| config.dirt_style.colors());
        if self.surface {
            surface
        } else {
            interior
        }
    }

    /// Final display color: override if set, otherwise the base color, then
    /// darkened.
    #[must_use]
    pub fn render_color(&self, config: &RenderConfig, unlocks: Unlocks, body: BodyKind) -> Rgba {
        let color = self
            .color_override
            .map_or_else(|| self.base_color(config, unlocks, body), Rgba::from_array);
        color.darkened(self.darkness)
    }

    /// Alpha from remaining health, quantized to the configured interval.
    #[must_use]
    pub fn render_alpha(&self, config: &RenderConfig, unlocks: Unlocks) -> u8 {
        let pct = ceil_to_nearest(config.health_visual_pct_interval, self.health_pct(unlocks));
        (255.0 * pct.clamp(0.0, 100.0) / 100.0).round() as u8
    }
}

impl Grid {
    /// Writes every live cell into a `width * height * 4` RGBA buffer.
    /// Empty slots are left fully transparent.
    pub fn render_rgba(&self, config: &RenderConfig, unlocks: Unlocks, out: &mut [u8]) {
        let width = self.width();
        let len = (width * self.height() * 4).min(out.len());
        out[..len].fill(0);
        for cell in self.cells() {
            let i = (cell.position.y as usize * width + cell.position.x as usize) * 4;
            if i + 4 > len {
                continue;
            }
            let color = cell.render_color(config, unlocks, self.kind());
            out[i] = color.r;
            out[i + 1] = color.g;
            out[i + 2] = color.b;
            out[i + 3] = cell.render_alpha(config, unlocks);
        }
    }
}
