//! In-memory tile map implementing `TileSource`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::TileSource;
use crate::error::PhysicsError;
use crate::types::{ColliderTag, Obstacle, Rect};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Empty,
    Solid,
    /// Step rising toward the left.
    StairLeft,
    /// Step rising toward the right.
    StairRight,
}

impl TileKind {
    pub fn tag(self) -> Option<ColliderTag> {
        match self {
            TileKind::Empty => None,
            TileKind::Solid => Some(ColliderTag::Terrain),
            TileKind::StairLeft => Some(ColliderTag::StairLeft),
            TileKind::StairRight => Some(ColliderTag::StairRight),
        }
    }

    fn from_char(c: char) -> Self {
        match c {
            '#' => TileKind::Solid,
            '/' => TileKind::StairRight,
            '\\' => TileKind::StairLeft,
            _ => TileKind::Empty,
        }
    }
}

/// Uniform grid of square cells, row-major from `origin` (top-left).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    pub origin: Vec2,
    pub cell: f32,
    width: usize,
    height: usize,
    tiles: Vec<TileKind>,
}

impl TileGrid {
    pub fn new(
        origin: Vec2,
        cell: f32,
        width: usize,
        height: usize,
        tiles: Vec<TileKind>,
    ) -> Result<Self, PhysicsError> {
        if !(cell.is_finite() && cell > 0.0) {
            return Err(PhysicsError::InvalidConfig {
                field: "tiles.cell",
                reason: "must be positive",
            });
        }
        if tiles.len() != width * height {
            return Err(PhysicsError::InvalidTileGrid {
                expected: width * height,
                got: tiles.len(),
            });
        }
        Ok(Self {
            origin,
            cell,
            width,
            height,
            tiles,
        })
    }

    /// Parse an ASCII map: `#` solid, `/` stair up-right, `\` stair up-left.
    /// Short rows are padded with empty cells.
    pub fn from_rows(origin: Vec2, cell: f32, rows: &[&str]) -> Result<Self, PhysicsError> {
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let height = rows.len();
        let mut tiles = vec![TileKind::Empty; width * height];
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                tiles[y * width + x] = TileKind::from_char(c);
            }
        }
        Self::new(origin, cell, width, height, tiles)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> TileKind {
        if x >= self.width || y >= self.height {
            return TileKind::Empty;
        }
        self.tiles[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, kind: TileKind) {
        if x < self.width && y < self.height {
            self.tiles[y * self.width + x] = kind;
        }
    }

    pub fn cell_rect(&self, x: usize, y: usize) -> Rect {
        let min = self.origin + Vec2::new(x as f32, y as f32) * self.cell;
        Rect::new(min, Vec2::splat(self.cell))
    }

    /// Inclusive cell range covering `region`, clamped to the grid.
    fn cell_span(&self, lo: f32, hi: f32, origin: f32, count: usize) -> Option<(usize, usize)> {
        if count == 0 {
            return None;
        }
        let a = ((lo - origin) / self.cell).floor();
        let b = ((hi - origin) / self.cell).floor();
        if b < 0.0 || a >= count as f32 || a.is_nan() || b.is_nan() {
            return None;
        }
        let a = a.max(0.0) as usize;
        let b = (b as usize).min(count - 1);
        Some((a, b))
    }
}

impl TileSource for TileGrid {
    fn colliders_in_region(&self, region: Rect) -> Vec<Obstacle> {
        let columns = self.cell_span(region.left(), region.right(), self.origin.x, self.width);
        let rows = self.cell_span(region.top(), region.bottom(), self.origin.y, self.height);
        let (Some((x0, x1)), Some((y0, y1))) = (columns, rows) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                let Some(tag) = self.get(x, y).tag() else {
                    continue;
                };
                out.push(Obstacle {
                    rect: self.cell_rect(x, y),
                    tag,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_kinds() {
        let grid = TileGrid::from_rows(Vec2::ZERO, 16.0, &["#/\\", "..#"]).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(0, 0), TileKind::Solid);
        assert_eq!(grid.get(1, 0), TileKind::StairRight);
        assert_eq!(grid.get(2, 0), TileKind::StairLeft);
        assert_eq!(grid.get(0, 1), TileKind::Empty);
        assert_eq!(grid.get(9, 9), TileKind::Empty);
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = TileGrid::new(Vec2::ZERO, 8.0, 2, 2, vec![TileKind::Solid; 3]).unwrap_err();
        assert_eq!(err, PhysicsError::InvalidTileGrid { expected: 4, got: 3 });
        assert!(TileGrid::new(Vec2::ZERO, 0.0, 1, 1, vec![TileKind::Solid]).is_err());
    }

    #[test]
    fn test_region_query_returns_tagged_cells() {
        let grid = TileGrid::from_rows(Vec2::new(100.0, 0.0), 10.0, &["....", "#./#"]).unwrap();
        let all = grid.colliders_in_region(Rect::new(Vec2::new(90.0, -5.0), Vec2::splat(100.0)));
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].rect.min, Vec2::new(100.0, 10.0));
        assert_eq!(all[1].tag, ColliderTag::StairRight);

        // Only the first column
        let left = grid.colliders_in_region(Rect::new(Vec2::new(101.0, 12.0), Vec2::splat(2.0)));
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].tag, ColliderTag::Terrain);

        // Fully outside
        assert!(grid
            .colliders_in_region(Rect::new(Vec2::new(-50.0, 0.0), Vec2::splat(10.0)))
            .is_empty());
    }
}
