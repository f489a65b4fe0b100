use std::fmt;
use std::ops::BitOr;

use crate::coords::{Rect, Vec2};
use crate::render::SceneError;

use super::AtlasId;

/// Sides of a tile that other objects may collide with.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Collisions(u8);

impl Collisions {
    pub const NONE: Collisions = Collisions(0);
    pub const LEFT: Collisions = Collisions(0b0001);
    pub const RIGHT: Collisions = Collisions(0b0010);
    pub const UP: Collisions = Collisions(0b0100);
    pub const DOWN: Collisions = Collisions(0b1000);
    pub const ANY: Collisions = Collisions(0b1111);

    #[inline]
    pub fn contains(self, other: Collisions) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Collisions {
    type Output = Collisions;

    fn bitor(self, rhs: Collisions) -> Collisions {
        Collisions(self.0 | rhs.0)
    }
}

/// One kind of tile in a layer.
///
/// Size and collision fields are data only; no physics runs on them.
#[derive(Debug, Clone, PartialEq)]
pub struct TileType {
    pub index: usize,
    /// Atlas cell drawn for this type. `None` draws nothing.
    pub cell_index: Option<usize>,
    pub width: f32,
    pub height: f32,
    pub mass: f32,
    pub allow_collisions: Collisions,
    pub separate: bool,
    pub immovable: bool,
    pub name: Option<String>,
}

impl TileType {
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            cell_index: None,
            width,
            height,
            mass: 1.0,
            allow_collisions: Collisions::NONE,
            separate: false,
            immovable: true,
            name: None,
        }
    }
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TileType(index={} collisions={:#06b} width={} height={})",
            self.index,
            self.allow_collisions.bits(),
            self.width,
            self.height
        )
    }
}

/// A grid of tile-type indices drawn from one atlas.
///
/// Type `0` is the empty tile: it is created without a cell and never drawn.
#[derive(Debug, Clone)]
pub struct TileLayer {
    pub atlas: AtlasId,
    columns: usize,
    rows: usize,
    tile_width: f32,
    tile_height: f32,
    types: Vec<TileType>,
    data: Vec<usize>,
}

/// A drawable tile resolved from a layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlacedTile {
    /// Top-left of the tile in layer space.
    pub offset: Vec2,
    pub cell_index: usize,
}

impl TileLayer {
    /// Creates an empty `columns × rows` layer.
    pub fn new(atlas: AtlasId, columns: usize, rows: usize, tile_width: f32, tile_height: f32) -> Self {
        Self {
            atlas,
            columns,
            rows,
            tile_width,
            tile_height,
            types: vec![TileType::new(0, tile_width, tile_height)],
            data: vec![0; columns * rows],
        }
    }

    /// Registers a tile type drawn with `cell_index` and returns its index.
    pub fn add_tile_type(&mut self, cell_index: usize) -> usize {
        let index = self.types.len();
        let mut ty = TileType::new(index, self.tile_width, self.tile_height);
        ty.cell_index = Some(cell_index);
        self.types.push(ty);
        index
    }

    /// Replaces the whole grid. `data` is row-major.
    pub fn set_data(&mut self, data: Vec<usize>) -> Result<(), SceneError> {
        if data.len() != self.columns * self.rows {
            return Err(SceneError::TileDataSize {
                expected: self.columns * self.rows,
                actual: data.len(),
            });
        }
        if let Some(&bad) = data.iter().find(|&&t| t >= self.types.len()) {
            return Err(SceneError::UnknownTileType(bad));
        }
        self.data = data;
        Ok(())
    }

    pub fn set_tile(&mut self, column: usize, row: usize, tile_type: usize) -> Result<(), SceneError> {
        if tile_type >= self.types.len() {
            return Err(SceneError::UnknownTileType(tile_type));
        }
        let i = self.index_of(column, row).ok_or(SceneError::TileOutOfBounds { column, row })?;
        self.data[i] = tile_type;
        Ok(())
    }

    pub fn tile(&self, column: usize, row: usize) -> Option<usize> {
        self.index_of(column, row).map(|i| self.data[i])
    }

    pub fn tile_type(&self, index: usize) -> Option<&TileType> {
        self.types.get(index)
    }

    pub fn tile_type_mut(&mut self, index: usize) -> Option<&mut TileType> {
        self.types.get_mut(index)
    }

    /// Tile type under a layer-space point.
    pub fn tile_type_at(&self, point: Vec2) -> Option<&TileType> {
        if point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let column = (point.x / self.tile_width) as usize;
        let row = (point.y / self.tile_height) as usize;
        self.tile(column, row).and_then(|t| self.types.get(t))
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn tile_size(&self) -> (f32, f32) {
        (self.tile_width, self.tile_height)
    }

    /// Layer bounds in layer space.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.columns as f32 * self.tile_width,
            self.rows as f32 * self.tile_height,
        )
    }

    /// Drawable tiles in row-major order, skipping types without a cell.
    pub fn placed_tiles(&self) -> impl Iterator<Item = PlacedTile> + '_ {
        self.data.iter().enumerate().filter_map(move |(i, &t)| {
            let cell_index = self.types.get(t)?.cell_index?;
            let column = i % self.columns;
            let row = i / self.columns;
            Some(PlacedTile {
                offset: Vec2::new(column as f32 * self.tile_width, row as f32 * self.tile_height),
                cell_index,
            })
        })
    }

    #[inline]
    fn index_of(&self, column: usize, row: usize) -> Option<usize> {
        (column < self.columns && row < self.rows).then(|| row * self.columns + column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> TileLayer {
        let mut l = TileLayer::new(AtlasId::default(), 3, 2, 16.0, 16.0);
        l.add_tile_type(4);
        l.add_tile_type(5);
        l
    }

    #[test]
    fn tile_type_defaults() {
        let t = TileType::new(3, 8.0, 8.0);
        assert_eq!(t.mass, 1.0);
        assert!(t.immovable);
        assert!(!t.separate);
        assert_eq!(t.allow_collisions, Collisions::NONE);
    }

    #[test]
    fn empty_layer_places_nothing() {
        assert_eq!(layer().placed_tiles().count(), 0);
    }

    #[test]
    fn placed_tiles_skip_empty_and_offset_by_grid() {
        let mut l = layer();
        l.set_data(vec![1, 0, 2, 0, 0, 1]).unwrap();
        let tiles: Vec<_> = l.placed_tiles().collect();
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[1], PlacedTile { offset: Vec2::new(32.0, 0.0), cell_index: 5 });
        assert_eq!(tiles[2].offset, Vec2::new(32.0, 16.0));
    }

    #[test]
    fn set_data_validates() {
        let mut l = layer();
        assert!(matches!(l.set_data(vec![0; 5]), Err(SceneError::TileDataSize { .. })));
        assert!(matches!(l.set_data(vec![9; 6]), Err(SceneError::UnknownTileType(9))));
    }

    #[test]
    fn set_tile_out_of_bounds() {
        let mut l = layer();
        assert!(l.set_tile(3, 0, 1).is_err());
        l.set_tile(2, 1, 2).unwrap();
        assert_eq!(l.tile(2, 1), Some(2));
    }

    #[test]
    fn tile_type_at_point() {
        let mut l = layer();
        l.set_tile(1, 1, 2).unwrap();
        assert_eq!(l.tile_type_at(Vec2::new(20.0, 20.0)).map(|t| t.index), Some(2));
        assert!(l.tile_type_at(Vec2::new(-1.0, 0.0)).is_none());
    }

    #[test]
    fn collisions_combine() {
        let c = Collisions::LEFT | Collisions::UP;
        assert!(c.contains(Collisions::UP));
        assert!(!c.contains(Collisions::DOWN));
        assert!(Collisions::ANY.contains(c));
    }
}
