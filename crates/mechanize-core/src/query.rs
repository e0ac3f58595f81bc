//! Read-only overlay queries.
//!
//! Hosts drawing a state overlay or exporting group legends call these; the
//! results are owned snapshots carrying no references into the world, so a
//! caller may hold them across mutations.

use crate::connectivity::FactoryGroup;
use crate::id::{AreaId, Rect, Tile};
use crate::machine::MachineState;
use crate::machines;
use crate::recipe::RuleSet;
use crate::world::World;

/// One machine tile and its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TileState {
    pub tile: Tile,
    pub state: MachineState,
}

/// States of every machine inside `rect`, sorted row-major. Chests are
/// storage, not machines, and do not appear.
pub fn machine_states(world: &World, rules: &RuleSet, area: AreaId, rect: Rect) -> Vec<TileState> {
    let Some(area) = world.areas.get(area) else {
        return Vec::new();
    };
    let flags = world.disposal();
    let mut states: Vec<TileState> = area
        .entities
        .values()
        .filter(|entity| rect.contains(entity.tile))
        .filter_map(|entity| {
            let machine = machines::for_entity(entity, rules, world.clock, &flags)?;
            Some(TileState {
                tile: entity.tile,
                state: machine.state(),
            })
        })
        .collect();
    states.sort_by_key(|s| (s.tile.y, s.tile.x));
    states
}

/// An exportable flattening of one factory group.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GroupSnapshot {
    pub area: AreaId,
    pub member_count: usize,
    pub tiles: Vec<Tile>,
}

/// Owned snapshots of the current groups, for the console-export surface.
pub fn group_snapshots(groups: &[FactoryGroup]) -> Vec<GroupSnapshot> {
    groups
        .iter()
        .map(|group| GroupSnapshot {
            area: group.area,
            member_count: group.members.len(),
            tiles: group.tiles.clone(),
        })
        .collect()
}
