//! Aggregate read/write view over a factory group's containers.
//!
//! Built fresh per tick from the group's chest containers; never persisted.
//! Two rules shape this type:
//!
//! - the take/store role split: a machine iterates only the containers it
//!   may draw from versus deposit into, so a freshly produced item cannot be
//!   eaten back by its own producer;
//! - the visibility snapshot: lookups expose at most the per-slot counts
//!   captured at construction, so output deposited by a sibling machine
//!   during the collect pass stays invisible to the feed pass of the same
//!   tick (one-tick propagation delay).

use crate::id::ItemTypeId;
use crate::item::ItemStack;
use crate::pipe::Pipe;
use crate::tracked::{Backing, StackPart, TrackedStack};
use std::rc::Rc;

pub struct Storage {
    pipes: Vec<Pipe>,
    /// Per-pipe, per-slot contents at construction time. `None` slots were
    /// empty; deposits into them stay invisible this tick.
    snapshot: Option<Vec<Vec<Option<ItemStack>>>>,
}

impl Storage {
    /// A live view with no visibility snapshot.
    pub fn new(pipes: Vec<Pipe>) -> Self {
        Self {
            pipes,
            snapshot: None,
        }
    }

    /// Capture a visibility snapshot of the current container contents.
    /// Lookups through this storage never see more of a slot than it held
    /// at this moment.
    pub fn with_snapshot(pipes: Vec<Pipe>) -> Self {
        let snapshot = pipes
            .iter()
            .map(|p| p.container().borrow().slots().to_vec())
            .collect();
        Self {
            pipes,
            snapshot: Some(snapshot),
        }
    }

    /// Endpoints machines may draw ingredients from.
    pub fn sources(&self) -> impl Iterator<Item = &Pipe> {
        self.pipes.iter().filter(|p| p.allow_take())
    }

    /// Endpoints machines may deposit output into.
    pub fn sinks(&self) -> impl Iterator<Item = &Pipe> {
        self.pipes.iter().filter(|p| p.allow_store())
    }

    /// How much of pipe `pi` slot `si`, currently holding `live`, the
    /// snapshot allows this tick.
    fn visible_count(&self, pi: usize, si: usize, live: &ItemStack) -> u32 {
        match &self.snapshot {
            None => live.count,
            Some(snap) => match snap.get(pi).and_then(|s| s.get(si)) {
                Some(Some(at_capture)) if at_capture.matches(live) => {
                    live.count.min(at_capture.count)
                }
                _ => 0,
            },
        }
    }

    /// Collect up to `count` matching items across all source containers.
    /// The first matching slot fixes the identity. Fewer than `count` is not
    /// an error; the caller checks the returned view's count. `None` when
    /// nothing matched at all.
    pub fn find_matching(
        &self,
        predicate: &dyn Fn(&ItemStack) -> bool,
        count: u32,
    ) -> Option<TrackedStack> {
        let mut sample: Option<ItemStack> = None;
        let mut picked: Vec<(usize, usize, u32)> = Vec::new();
        let mut gathered = 0u32;

        'pipes: for (pi, pipe) in self.pipes.iter().enumerate() {
            if !pipe.allow_take() {
                continue;
            }
            let container = pipe.container().borrow();
            for (si, slot) in container.slots().iter().enumerate() {
                if gathered >= count {
                    break 'pipes;
                }
                let Some(stack) = slot else { continue };
                let visible = self.visible_count(pi, si, stack);
                if visible == 0 {
                    continue;
                }
                match &sample {
                    None if predicate(stack) => sample = Some(stack.with_count(0)),
                    Some(s) if stack.matches(s) => {}
                    _ => continue,
                }
                gathered += visible;
                picked.push((pi, si, visible));
            }
        }

        let sample = sample?;
        let parts = picked
            .into_iter()
            .map(|(pi, si, visible)| {
                StackPart::new(Backing::Slot {
                    container: Rc::clone(self.pipes[pi].container()),
                    index: si,
                })
                .limit(visible)
            })
            .collect();
        Some(TrackedStack::new(&sample, parts))
    }

    /// Targeted single-ingredient lookup (normal quality).
    pub fn find_item(&self, item_type: ItemTypeId, count: u32) -> Option<TrackedStack> {
        self.find_matching(
            &move |s: &ItemStack| {
                s.item_type == item_type && s.quality == crate::id::Quality::Normal
            },
            count,
        )
    }

    /// One tracked view per visible occupied slot across all sources, in
    /// enumeration order. The unguided scan used by machines with no
    /// targeted ingredient.
    pub fn tracked_stacks(&self) -> Vec<TrackedStack> {
        let mut views = Vec::new();
        for (pi, pipe) in self.pipes.iter().enumerate() {
            if !pipe.allow_take() {
                continue;
            }
            let visible: Vec<(usize, ItemStack, u32)> = {
                let container = pipe.container().borrow();
                container
                    .slots()
                    .iter()
                    .enumerate()
                    .filter_map(|(si, slot)| {
                        let stack = slot.as_ref()?;
                        let n = self.visible_count(pi, si, stack);
                        (n > 0).then(|| (si, stack.with_count(0), n))
                    })
                    .collect()
            };
            for (si, sample, n) in visible {
                let part = StackPart::new(Backing::Slot {
                    container: Rc::clone(pipe.container()),
                    index: si,
                })
                .limit(n);
                views.push(TrackedStack::single(&sample, part));
            }
        }
        views
    }

    /// Deposit from `stack` into sink containers: occupied compatible slots
    /// first across all containers in enumeration order, then empty slots.
    /// Any remainder stays on `stack` unreduced -- storage being full is not
    /// an error, the caller retries next tick.
    pub fn store(&self, stack: &mut TrackedStack) {
        for merge in [true, false] {
            for pipe in self.sinks() {
                if stack.count() == 0 {
                    return;
                }
                pipe.store_phase(stack, merge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ItemTypeId;
    use crate::item::Container;

    fn wheat() -> ItemTypeId {
        ItemTypeId(0)
    }
    fn flour() -> ItemTypeId {
        ItemTypeId(1)
    }

    fn chest(slots: usize, limit: u32, stacks: &[ItemStack]) -> Pipe {
        let c = Container::new(slots, limit).into_ref();
        for s in stacks {
            assert_eq!(c.borrow_mut().accept(s.clone()), 0);
        }
        Pipe::new(c)
    }

    #[test]
    fn find_matching_aggregates_across_containers() {
        let a = chest(2, 10, &[ItemStack::new(wheat(), 4)]);
        let b = chest(2, 10, &[ItemStack::new(wheat(), 9)]);
        let storage = Storage::new(vec![a, b]);

        let mut found = storage
            .find_matching(&|s| s.item_type == wheat(), 10)
            .unwrap();
        assert!(found.count() >= 10);
        assert_eq!(found.reduce(10), 10);
    }

    #[test]
    fn find_matching_returns_available_when_short() {
        let a = chest(2, 10, &[ItemStack::new(wheat(), 3)]);
        let storage = Storage::new(vec![a]);
        let found = storage
            .find_matching(&|s| s.item_type == wheat(), 50)
            .unwrap();
        assert_eq!(found.count(), 3);
        assert!(storage.find_matching(&|s| s.item_type == flour(), 1).is_none());
    }

    #[test]
    fn find_skips_containers_flagged_no_take() {
        let locked = chest(1, 10, &[ItemStack::new(wheat(), 5)]);
        locked.container().borrow_mut().allow_take = false;
        let storage = Storage::new(vec![locked]);
        assert!(storage.find_item(wheat(), 1).is_none());
    }

    #[test]
    fn store_fills_two_nine_slots_and_leaves_two() {
        // A container with 2 free slots of capacity 9;
        // storing a 20-count stack fills both and leaves 2 on the stack.
        let target = Container::new(3, 9).into_ref();
        let _ = target.borrow_mut().place(ItemStack::new(flour(), 9));
        let storage = Storage::new(vec![Pipe::new(Rc::clone(&target))]);

        let source = chest(1, 20, &[ItemStack::new(wheat(), 20)]);
        let mut stack = source.find(&|_| true, 20).unwrap();
        storage.store(&mut stack);

        assert_eq!(stack.count(), 2);
        assert_eq!(target.borrow().total_of(&ItemStack::new(wheat(), 0)), 18);
    }

    #[test]
    fn store_merges_across_all_containers_before_new_slots() {
        let a = chest(2, 10, &[ItemStack::new(wheat(), 9)]);
        let b = chest(2, 10, &[ItemStack::new(wheat(), 9)]);
        let storage = Storage::new(vec![a.clone(), b.clone()]);

        let source = chest(1, 20, &[ItemStack::new(wheat(), 2)]);
        let mut stack = source.find(&|_| true, 2).unwrap();
        storage.store(&mut stack);

        assert_eq!(stack.count(), 0);
        // Both partial slots topped up; no empty slot opened.
        assert_eq!(a.container().borrow().slots().iter().flatten().count(), 1);
        assert_eq!(b.container().borrow().slots().iter().flatten().count(), 1);
        assert_eq!(a.container().borrow().total(), 10);
        assert_eq!(b.container().borrow().total(), 10);
    }

    #[test]
    fn store_skips_containers_flagged_no_store() {
        let locked = chest(2, 10, &[]);
        locked.container().borrow_mut().allow_store = false;
        let open = chest(2, 10, &[]);
        let storage = Storage::new(vec![locked.clone(), open.clone()]);

        let source = chest(1, 10, &[ItemStack::new(wheat(), 6)]);
        let mut stack = source.find(&|_| true, 6).unwrap();
        storage.store(&mut stack);

        assert_eq!(locked.container().borrow().total(), 0);
        assert_eq!(open.container().borrow().total(), 6);
    }

    #[test]
    fn snapshot_hides_items_deposited_after_capture() {
        let a = chest(2, 10, &[ItemStack::new(wheat(), 3)]);
        let storage = Storage::with_snapshot(vec![a.clone()]);

        // Deposit after the snapshot: top up the slot and open a new one.
        assert_eq!(
            a.container().borrow_mut().accept(ItemStack::new(wheat(), 12)),
            0
        );
        assert_eq!(a.container().borrow().total(), 15);

        let found = storage.find_item(wheat(), 99).unwrap();
        assert_eq!(found.count(), 3);
        let views = storage.tracked_stacks();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].count(), 3);
    }

    #[test]
    fn snapshot_tracks_withdrawals_normally() {
        let a = chest(1, 10, &[ItemStack::new(wheat(), 8)]);
        let storage = Storage::with_snapshot(vec![a.clone()]);

        let mut first = storage.find_item(wheat(), 5).unwrap();
        assert_eq!(first.reduce(5), 5);
        // A later lookup through the same snapshot sees the live 3.
        let second = storage.find_item(wheat(), 99).unwrap();
        assert_eq!(second.count(), 3);
    }

    #[test]
    fn conservation_across_find_and_store() {
        let a = chest(3, 9, &[ItemStack::new(wheat(), 14)]);
        let b = chest(3, 9, &[ItemStack::new(wheat(), 5)]);
        let storage = Storage::new(vec![a.clone(), b.clone()]);
        let total_before = a.container().borrow().total() + b.container().borrow().total();

        let mut found = storage.find_item(wheat(), 12).unwrap();
        let taken = found.take(12).unwrap();
        let in_flight = taken.count;
        let total_mid = a.container().borrow().total() + b.container().borrow().total();
        assert_eq!(total_mid + in_flight, total_before);

        // Put it all back.
        let tmp = chest(2, 20, &[taken]);
        let mut stack = tmp.find(&|_| true, in_flight).unwrap();
        storage.store(&mut stack);
        let total_after = a.container().borrow().total() + b.container().borrow().total();
        assert_eq!(total_after + stack.count(), total_before);
    }
}
