//! Factory group discovery.
//!
//! A flood fill over tile adjacency, strictly 4-directional, starting from
//! every placed entity: all entities reachable through a chain of passable
//! or occupied tiles form one [`FactoryGroup`]. Entities carrying the same
//! user-assigned link name are merged into one group even without a spatial
//! path. Rebuilding is explicit and on demand, never per tick.

use crate::id::{AreaId, EntityId, Tile};
use crate::world::Area;
use std::collections::{HashMap, HashSet, VecDeque};

/// An immutable snapshot of one connected region's entities. Invalidated by
/// any topology change; the owner rebuilds rather than patching.
#[derive(Debug, Clone)]
pub struct FactoryGroup {
    pub area: AreaId,
    pub members: Vec<EntityId>,
    /// Tiles occupied by member entities, sorted row-major. Deduplicated:
    /// co-located entities contribute one tile.
    pub tiles: Vec<Tile>,
}

/// Discover the factory groups of one area.
pub fn build_groups(area_id: AreaId, area: &Area) -> Vec<FactoryGroup> {
    let mut by_tile: HashMap<Tile, Vec<EntityId>> = HashMap::new();
    for (id, entity) in &area.entities {
        by_tile.entry(entity.tile).or_default().push(id);
    }

    // Spatial pass: one region per flood fill seeded at an entity tile.
    let mut visited: HashSet<Tile> = HashSet::new();
    let mut regions: Vec<Vec<EntityId>> = Vec::new();
    for (_, entity) in &area.entities {
        if visited.contains(&entity.tile) {
            continue;
        }
        let mut members = Vec::new();
        let mut queue = VecDeque::from([entity.tile]);
        visited.insert(entity.tile);
        while let Some(tile) = queue.pop_front() {
            if let Some(ids) = by_tile.get(&tile) {
                members.extend(ids.iter().copied());
            }
            for next in tile.neighbours() {
                if visited.contains(&next) {
                    continue;
                }
                if area.passable(next) || by_tile.contains_key(&next) {
                    visited.insert(next);
                    queue.push_back(next);
                }
            }
        }
        regions.push(members);
    }

    // Link pass: regions sharing a user link name collapse into one group.
    let mut parent: Vec<usize> = (0..regions.len()).collect();
    fn find(parent: &mut Vec<usize>, i: usize) -> usize {
        if parent[i] != i {
            let root = find(parent, parent[i]);
            parent[i] = root;
        }
        parent[i]
    }
    let mut region_of: HashMap<EntityId, usize> = HashMap::new();
    for (index, members) in regions.iter().enumerate() {
        for id in members {
            region_of.insert(*id, index);
        }
    }
    let mut link_anchor: HashMap<&str, usize> = HashMap::new();
    for (id, entity) in &area.entities {
        let Some(link) = entity.link.as_deref() else {
            continue;
        };
        let region = region_of[&id];
        match link_anchor.get(link) {
            Some(&anchor) => {
                let a = find(&mut parent, anchor);
                let b = find(&mut parent, region);
                if a != b {
                    parent[b] = a;
                }
            }
            None => {
                link_anchor.insert(link, region);
            }
        }
    }

    let mut merged: HashMap<usize, Vec<EntityId>> = HashMap::new();
    for (index, members) in regions.into_iter().enumerate() {
        let root = find(&mut parent, index);
        merged.entry(root).or_default().extend(members);
    }

    let mut groups: Vec<FactoryGroup> = merged
        .into_values()
        .map(|members| {
            let mut tiles: Vec<Tile> = members
                .iter()
                .map(|id| area.entities[*id].tile)
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            tiles.sort_by_key(|t| (t.y, t.x));
            FactoryGroup {
                area: area_id,
                members,
                tiles,
            }
        })
        .collect();
    // Deterministic output order regardless of hash-map iteration.
    groups.sort_by_key(|g| g.tiles.first().copied().map(|t| (t.y, t.x)));
    groups
}

/// Convenience for tests and hosts placing a handful of entities.
pub fn entity_group<'a>(
    groups: &'a [FactoryGroup],
    id: EntityId,
) -> Option<&'a FactoryGroup> {
    groups.iter().find(|g| g.members.contains(&id))
}
