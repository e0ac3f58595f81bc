use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a simulated world area (a farm, a shed interior, ...).
    pub struct AreaId;

    /// Identifies a placed entity within an area.
    pub struct EntityId;
}

/// Identifies an item kind. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Quality tier of an item. Part of stack identity: stacks of different
/// quality never merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quality {
    #[default]
    Normal,
    Silver,
    Gold,
    Iridium,
}

/// A tile coordinate within an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four cardinal neighbours. Diagonals never connect.
    pub fn neighbours(self) -> [Tile; 4] {
        [
            Tile::new(self.x, self.y - 1),
            Tile::new(self.x - 1, self.y),
            Tile::new(self.x + 1, self.y),
            Tile::new(self.x, self.y + 1),
        ]
    }
}

/// An axis-aligned tile rectangle, used by the overlay query API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, tile: Tile) -> bool {
        tile.x >= self.x
            && tile.y >= self.y
            && tile.x < self.x + self.width
            && tile.y < self.y + self.height
    }
}
