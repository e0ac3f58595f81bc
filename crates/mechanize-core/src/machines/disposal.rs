//! Disposal bin wrapper: deterministic daily loot.
//!
//! The draw is a pure function of the world clock, the can index, and the
//! lifetime check counter, reproduced bit-for-bit from the original game so
//! both simulations hand out the same loot on the same day. Every generator
//! call below is load-bearing, including the discarded ones: dropping a
//! draw shifts the whole downstream sequence.

use crate::error::EngineError;
use crate::id::{ItemTypeId, Tile};
use crate::item::{HeldSlot, ItemStack, held_slot};
use crate::machine::{Machine, MachineState};
use crate::rng::NetRandom;
use crate::storage::Storage;
use crate::tracked::{Backing, StackPart, TrackedStack};
use crate::world::{DisposalFlags, WorldClock};
use std::rc::Rc;

/// Host-side item ids for disposal loot. These live in the host's item
/// namespace, not the rule set's.
pub mod loot {
    use crate::id::ItemTypeId;

    pub const ALGAE: ItemTypeId = ItemTypeId(153);
    pub const DRIFTWOOD: ItemTypeId = ItemTypeId(167);
    pub const TRASH: ItemTypeId = ItemTypeId(168);
    pub const BROKEN_GLASSES: ItemTypeId = ItemTypeId(170);
    pub const BROKEN_CD: ItemTypeId = ItemTypeId(171);
    pub const SOGGY_NEWSPAPER: ItemTypeId = ItemTypeId(172);
    pub const STALE_BREAD: ItemTypeId = ItemTypeId(216);
    pub const RELIC: ItemTypeId = ItemTypeId(279);
    /// First of three tree seeds (309, 310, 311).
    pub const SEED_BASE: ItemTypeId = ItemTypeId(309);
    /// First of three ores (378, 380, 382).
    pub const ORE_BASE: ItemTypeId = ItemTypeId(378);
    pub const FIELD_SNACK: ItemTypeId = ItemTypeId(403);
    pub const GEODE: ItemTypeId = ItemTypeId(535);
    pub const OMNI_GEODE: ItemTypeId = ItemTypeId(749);
}

/// Today's loot for one can, or `None` when the can holds nothing.
///
/// `cans_checked` is the lifetime counter *before* this check; past 20
/// checks two extra rarity rolls enter the sequence, which changes every
/// draw after them.
pub fn disposal_draw(
    clock: &WorldClock,
    can_index: usize,
    cans_checked: u32,
) -> Option<ItemStack> {
    let seed = ((clock.game_id as i32) / 2)
        .wrapping_add(clock.days_played as i32)
        .wrapping_add(777)
        .wrapping_add((can_index as i32).wrapping_mul(77));
    let mut rng = NetRandom::new(seed);

    // Two warm-up passes, each discarding a random number of doubles.
    for _ in 0..2 {
        let discards = rng.next_range(0, 100);
        for _ in 0..discards {
            rng.next_f64();
        }
    }

    let luck_chance = 0.2 + clock.daily_luck;
    let mega = cans_checked > 20 && rng.next_f64() < 0.01;
    let double_mega = cans_checked > 20 && rng.next_f64() < 0.002;
    if double_mega {
        return Some(ItemStack::new(loot::RELIC, 1));
    }
    if !(mega || rng.next_f64() < luck_chance) {
        return None;
    }

    let mut item = match rng.next_max(10) {
        0 => loot::TRASH,
        1 => loot::DRIFTWOOD,
        2 => loot::BROKEN_GLASSES,
        3 => loot::BROKEN_CD,
        4 => loot::SOGGY_NEWSPAPER,
        5 | 6 => loot::STALE_BREAD,
        7 => loot::FIELD_SNACK,
        8 => ItemTypeId(loot::SEED_BASE.0 + rng.next_max(3) as u32),
        _ => loot::ALGAE,
    };

    // Per-can specialties. Can 3 upgrades to geodes with a nested 5% omni
    // roll; can 4 swaps in ore, then makes a discard draw that exists only
    // to keep the generator aligned with the original's stack-size path.
    if can_index == 3 && rng.next_f64() < luck_chance {
        item = loot::GEODE;
        if rng.next_f64() < 0.05 {
            item = loot::OMNI_GEODE;
        }
    }
    if can_index == 4 && rng.next_f64() < luck_chance {
        item = ItemTypeId(loot::ORE_BASE.0 + rng.next_max(3) as u32 * 2);
        let _ = rng.next_range(1, 5);
    }
    Some(ItemStack::new(item, 1))
}

pub struct DisposalMachine {
    index: usize,
    tile: Tile,
    clock: WorldClock,
    flags: DisposalFlags,
    held: HeldSlot,
}

impl DisposalMachine {
    pub fn new(index: usize, tile: Tile, clock: WorldClock, flags: DisposalFlags) -> Self {
        Self {
            index,
            tile,
            clock,
            flags,
            held: held_slot(),
        }
    }

    fn index_valid(&self) -> bool {
        self.index < self.flags.borrow().checked_today.len()
    }
}

impl Machine for DisposalMachine {
    fn id(&self) -> &str {
        "disposal-bin"
    }

    fn tile(&self) -> Tile {
        self.tile
    }

    fn state(&self) -> MachineState {
        if !self.index_valid() {
            // Surfaces as a fatal error when the feed pass reaches
            // `set_input`.
            return MachineState::Empty;
        }
        if self.flags.borrow().checked_today[self.index] {
            MachineState::Disabled
        } else {
            MachineState::Done
        }
    }

    fn output(&mut self) -> Option<TrackedStack> {
        if self.state() != MachineState::Done {
            return None;
        }
        if self.held.borrow().is_none() {
            let cans_checked = self.flags.borrow().cans_checked;
            match disposal_draw(&self.clock, self.index, cans_checked) {
                Some(stack) => *self.held.borrow_mut() = Some(stack),
                None => {
                    // An empty can still counts as checked.
                    let mut flags = self.flags.borrow_mut();
                    flags.checked_today[self.index] = true;
                    flags.cans_checked += 1;
                    return None;
                }
            }
        }
        let sample = self.held.borrow().as_ref()?.with_count(0);
        let flags = Rc::clone(&self.flags);
        let index = self.index;
        let part = StackPart::new(Backing::Held(Rc::clone(&self.held))).on_empty(Box::new(
            move |_collected| {
                let mut flags = flags.borrow_mut();
                flags.checked_today[index] = true;
                flags.cans_checked += 1;
            },
        ));
        Some(TrackedStack::single(&sample, part))
    }

    fn set_input(&mut self, _storage: &Storage) -> Result<bool, EngineError> {
        if !self.index_valid() {
            return Err(EngineError::BadBinIndex {
                index: self.index,
                len: self.flags.borrow().checked_today.len(),
            });
        }
        Ok(false)
    }
}
