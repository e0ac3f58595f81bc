use crate::id::{ItemTypeId, Quality};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// A stack of items with a shared identity: item type plus quality.
///
/// A stack is always owned by exactly one place -- a container slot, a
/// machine's held-output field, or transiently by the caller after a `take`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub quality: Quality,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, count: u32) -> Self {
        Self {
            item_type,
            quality: Quality::Normal,
            count,
        }
    }

    pub fn with_quality(item_type: ItemTypeId, quality: Quality, count: u32) -> Self {
        Self {
            item_type,
            quality,
            count,
        }
    }

    /// Whether two stacks share an identity and may merge.
    pub fn matches(&self, other: &ItemStack) -> bool {
        self.item_type == other.item_type && self.quality == other.quality
    }

    /// Identity clone with a different count. Usable for compatibility
    /// comparisons without granting ownership of the original items.
    pub fn with_count(&self, count: u32) -> ItemStack {
        ItemStack {
            item_type: self.item_type,
            quality: self.quality,
            count,
        }
    }
}

/// A shared handle to a container. The engine is single-threaded and
/// tick-driven, so shared ownership between world entities, pipes, and
/// tracked stacks uses `Rc<RefCell<_>>`.
pub type ContainerRef = Rc<RefCell<Container>>;

/// A machine's held-output field, shared between the entity and any tracked
/// stack currently draining it.
pub type HeldSlot = Rc<RefCell<Option<ItemStack>>>;

pub fn held_slot() -> HeldSlot {
    Rc::new(RefCell::new(None))
}

/// An ordered list of stack slots with a uniform per-slot stack limit, plus
/// automation preferences controlling whether the routing layer may deposit
/// into or draw from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    slots: Vec<Option<ItemStack>>,
    slot_limit: u32,
    /// Whether machines may deposit output here.
    pub allow_store: bool,
    /// Whether machines may draw ingredients from here.
    pub allow_take: bool,
}

impl Container {
    pub fn new(slot_count: usize, slot_limit: u32) -> Self {
        Self {
            slots: vec![None; slot_count],
            slot_limit,
            allow_store: true,
            allow_take: true,
        }
    }

    pub fn into_ref(self) -> ContainerRef {
        Rc::new(RefCell::new(self))
    }

    pub fn slot_limit(&self) -> u32 {
        self.slot_limit
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    /// Count of items matching `sample`'s identity across all slots.
    pub fn total_of(&self, sample: &ItemStack) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.matches(sample))
            .map(|s| s.count)
            .sum()
    }

    /// Total items across all slots regardless of identity.
    pub fn total(&self) -> u32 {
        self.slots.iter().flatten().map(|s| s.count).sum()
    }

    /// Free room in occupied slots that already hold `sample`'s identity.
    pub fn merge_space(&self, sample: &ItemStack) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.matches(sample))
            .map(|s| self.slot_limit.saturating_sub(s.count))
            .sum()
    }

    /// Free room in empty slots.
    pub fn empty_space(&self) -> u32 {
        let empty = self.slots.iter().filter(|s| s.is_none()).count() as u32;
        empty * self.slot_limit
    }

    /// Merge `stack` into occupied slots of the same identity, first-fit.
    /// Returns the amount that did not fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn merge(&mut self, stack: ItemStack) -> u32 {
        let mut remaining = stack.count;
        for slot in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if slot.matches(&stack) {
                let room = self.slot_limit.saturating_sub(slot.count);
                let moved = remaining.min(room);
                slot.count += moved;
                remaining -= moved;
            }
        }
        remaining
    }

    /// Place `stack` into empty slots, splitting by the slot limit, first-fit.
    /// Returns the amount that did not fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn place(&mut self, stack: ItemStack) -> u32 {
        let mut remaining = stack.count;
        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let moved = remaining.min(self.slot_limit);
                *slot = Some(stack.with_count(moved));
                remaining -= moved;
            }
        }
        remaining
    }

    /// Merge first, then empty slots. Returns the amount that did not fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn accept(&mut self, stack: ItemStack) -> u32 {
        let remaining = self.merge(stack.clone());
        if remaining == 0 {
            return 0;
        }
        self.place(stack.with_count(remaining))
    }

    /// Remove up to `count` items from the slot at `index`, clearing the slot
    /// when it reaches zero. Returns the amount actually removed.
    pub fn reduce_slot(&mut self, index: usize, count: u32) -> u32 {
        let Some(slot) = self.slots.get_mut(index) else {
            return 0;
        };
        let Some(stack) = slot else {
            return 0;
        };
        let removed = count.min(stack.count);
        stack.count -= removed;
        if stack.count == 0 {
            *slot = None;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheat() -> ItemTypeId {
        ItemTypeId(0)
    }
    fn flour() -> ItemTypeId {
        ItemTypeId(1)
    }

    #[test]
    fn identity_ignores_count_but_not_quality() {
        let a = ItemStack::new(wheat(), 5);
        let b = ItemStack::new(wheat(), 99);
        let c = ItemStack::with_quality(wheat(), Quality::Gold, 5);
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
        assert!(!a.matches(&ItemStack::new(flour(), 5)));
    }

    #[test]
    fn merge_fills_occupied_slots_first_fit() {
        let mut c = Container::new(3, 10);
        assert_eq!(c.place(ItemStack::new(wheat(), 6)), 0);
        assert_eq!(c.merge(ItemStack::new(wheat(), 7)), 3);
        assert_eq!(c.total_of(&ItemStack::new(wheat(), 1)), 10);
        // The overflow did not silently land in an empty slot.
        assert_eq!(c.slots().iter().flatten().count(), 1);
    }

    #[test]
    fn merge_skips_different_identity() {
        let mut c = Container::new(2, 10);
        assert_eq!(c.place(ItemStack::new(wheat(), 5)), 0);
        assert_eq!(c.merge(ItemStack::new(flour(), 5)), 5);
    }

    #[test]
    fn place_splits_across_empty_slots() {
        let mut c = Container::new(3, 9);
        assert_eq!(c.place(ItemStack::new(wheat(), 20)), 0);
        let counts: Vec<u32> = c.slots().iter().flatten().map(|s| s.count).collect();
        assert_eq!(counts, vec![9, 9, 2]);
    }

    #[test]
    fn accept_overflow_reported() {
        let mut c = Container::new(2, 9);
        assert_eq!(c.accept(ItemStack::new(wheat(), 20)), 2);
        assert_eq!(c.total(), 18);
    }

    #[test]
    fn reduce_slot_clamps_and_clears() {
        let mut c = Container::new(1, 10);
        assert_eq!(c.place(ItemStack::new(wheat(), 4)), 0);
        assert_eq!(c.reduce_slot(0, 10), 4);
        assert!(c.slots()[0].is_none());
        assert_eq!(c.reduce_slot(0, 1), 0);
        assert_eq!(c.reduce_slot(99, 1), 0);
    }

    #[test]
    fn space_accounting() {
        let mut c = Container::new(3, 9);
        assert_eq!(c.empty_space(), 27);
        assert_eq!(c.place(ItemStack::new(wheat(), 5)), 0);
        assert_eq!(c.merge_space(&ItemStack::new(wheat(), 1)), 4);
        assert_eq!(c.merge_space(&ItemStack::new(flour(), 1)), 0);
        assert_eq!(c.empty_space(), 18);
    }
}
