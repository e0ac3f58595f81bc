//! Non-owning, mutation-forwarding views over item stacks.
//!
//! A [`TrackedStack`] never holds a second copy of the items it covers: every
//! mutation goes through it onto the real backing location (a container slot
//! or a machine's held-output field), so two views over the same slot always
//! agree on the live count. Views are created fresh on each query and
//! discarded within the same tick; none is retained across ticks.

use crate::item::{ContainerRef, HeldSlot, ItemStack};

/// Invoked when the backing quantity changes. `on_empty` receives the
/// identity sample of the vacated stack; callers use it as a "this slot was
/// vacated" signal rather than as live content.
pub type StackCallback = Box<dyn FnMut(&ItemStack)>;

/// Where one part of a tracked stack lives.
pub enum Backing {
    /// A slot inside a container.
    Slot { container: ContainerRef, index: usize },
    /// A machine's held-output field.
    Held(HeldSlot),
    /// The front entry of a machine's FIFO output queue.
    Queue(crate::machines::OutputQueue),
}

impl Backing {
    fn peek(&self) -> Option<ItemStack> {
        match self {
            Backing::Slot { container, index } => {
                container.borrow().slots().get(*index).cloned().flatten()
            }
            Backing::Held(cell) => cell.borrow().clone(),
            Backing::Queue(queue) => queue.borrow().front().cloned(),
        }
    }

    fn reduce(&self, count: u32) -> u32 {
        match self {
            Backing::Slot { container, index } => {
                container.borrow_mut().reduce_slot(*index, count)
            }
            Backing::Held(cell) => {
                let mut held = cell.borrow_mut();
                let Some(stack) = held.as_mut() else {
                    return 0;
                };
                let removed = count.min(stack.count);
                stack.count -= removed;
                if stack.count == 0 {
                    *held = None;
                }
                removed
            }
            Backing::Queue(queue) => {
                let mut q = queue.borrow_mut();
                let Some(front) = q.front_mut() else {
                    return 0;
                };
                let removed = count.min(front.count);
                front.count -= removed;
                if front.count == 0 {
                    q.pop_front();
                }
                removed
            }
        }
    }
}

/// One backing location plus its completion callbacks.
pub struct StackPart {
    backing: Backing,
    /// Cap on how much of the backing this view exposes. Used by per-tick
    /// storage snapshots: items deposited after the snapshot stay invisible
    /// until next tick.
    limit: Option<u32>,
    on_reduced: Option<StackCallback>,
    on_empty: Option<StackCallback>,
}

impl StackPart {
    pub fn new(backing: Backing) -> Self {
        Self {
            backing,
            limit: None,
            on_reduced: None,
            on_empty: None,
        }
    }

    pub fn limit(mut self, cap: u32) -> Self {
        self.limit = Some(cap);
        self
    }

    pub fn on_reduced(mut self, callback: StackCallback) -> Self {
        self.on_reduced = Some(callback);
        self
    }

    pub fn on_empty(mut self, callback: StackCallback) -> Self {
        self.on_empty = Some(callback);
        self
    }
}

/// A lightweight view over a quantity of items of one identity, possibly
/// composed from several backing locations (an aggregate returned by a
/// storage lookup spans container slots).
pub struct TrackedStack {
    sample: ItemStack,
    parts: Vec<StackPart>,
}

impl TrackedStack {
    /// Build a view. `sample`'s count is irrelevant; only its identity is
    /// kept.
    pub fn new(sample: &ItemStack, parts: Vec<StackPart>) -> Self {
        Self {
            sample: sample.with_count(0),
            parts,
        }
    }

    pub fn single(sample: &ItemStack, part: StackPart) -> Self {
        Self::new(sample, vec![part])
    }

    /// Identity-only clone, usable for compatibility comparisons.
    pub fn sample(&self) -> &ItemStack {
        &self.sample
    }

    /// Live count across all backing locations. Parts whose backing no
    /// longer holds this identity contribute zero.
    pub fn count(&self) -> u32 {
        self.parts
            .iter()
            .filter_map(|p| {
                let live = p.backing.peek()?;
                if !live.matches(&self.sample) {
                    return None;
                }
                Some(match p.limit {
                    Some(cap) => live.count.min(cap),
                    None => live.count,
                })
            })
            .sum()
    }

    /// Remove up to `count` items from the backing locations, clamped at
    /// zero. Fires each touched part's `on_empty` when its backing was
    /// drained, `on_reduced` otherwise. `reduce(0)` is a no-op and fires
    /// nothing. Returns the amount actually removed.
    pub fn reduce(&mut self, count: u32) -> u32 {
        if count == 0 {
            return 0;
        }
        let sample = self.sample.clone();
        let mut remaining = count;
        for part in &mut self.parts {
            if remaining == 0 {
                break;
            }
            let live = match part.backing.peek() {
                Some(s) if s.matches(&sample) => s.count,
                _ => continue,
            };
            let visible = match part.limit {
                Some(cap) => live.min(cap),
                None => live,
            };
            let removed = part.backing.reduce(remaining.min(visible));
            if removed == 0 {
                continue;
            }
            if let Some(cap) = part.limit.as_mut() {
                *cap -= removed;
            }
            remaining -= removed;
            if removed >= live {
                if let Some(cb) = part.on_empty.as_mut() {
                    cb(&sample);
                }
            } else if let Some(cb) = part.on_reduced.as_mut() {
                cb(&sample);
            }
        }
        count - remaining
    }

    /// Append the parts of another view over the same identity.
    pub(crate) fn extend_parts(&mut self, other: TrackedStack) {
        self.parts.extend(other.parts);
    }

    /// `reduce(count)` plus a brand-new owned stack of what was removed,
    /// severing the live link. `None` when nothing could be removed.
    pub fn take(&mut self, count: u32) -> Option<ItemStack> {
        let removed = self.reduce(count);
        if removed == 0 {
            return None;
        }
        Some(self.sample.with_count(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ItemTypeId;
    use crate::item::{Container, held_slot};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn wheat() -> ItemTypeId {
        ItemTypeId(0)
    }

    fn slot_part(container: &ContainerRef, index: usize) -> StackPart {
        StackPart::new(Backing::Slot {
            container: Rc::clone(container),
            index,
        })
    }

    #[test]
    fn view_mirrors_live_backing_count() {
        let c = Container::new(1, 10).into_ref();
        let _ = c.borrow_mut().place(ItemStack::new(wheat(), 7));
        let sample = ItemStack::new(wheat(), 0);

        let a = TrackedStack::single(&sample, slot_part(&c, 0));
        let mut b = TrackedStack::single(&sample, slot_part(&c, 0));
        assert_eq!(a.count(), 7);
        b.reduce(3);
        // Two views over the same slot always agree.
        assert_eq!(a.count(), 4);
        assert_eq!(b.count(), 4);
    }

    #[test]
    fn reduce_clamps_and_clears_slot() {
        let c = Container::new(1, 10).into_ref();
        let _ = c.borrow_mut().place(ItemStack::new(wheat(), 4));
        let mut view = TrackedStack::single(&ItemStack::new(wheat(), 0), slot_part(&c, 0));
        assert_eq!(view.reduce(10), 4);
        assert!(c.borrow().slots()[0].is_none());
        assert_eq!(view.count(), 0);
    }

    #[test]
    fn reduce_zero_is_noop_and_fires_nothing() {
        let c = Container::new(1, 10).into_ref();
        let _ = c.borrow_mut().place(ItemStack::new(wheat(), 4));
        let fired = Rc::new(RefCell::new(0u32));
        let f1 = Rc::clone(&fired);
        let f2 = Rc::clone(&fired);
        let part = slot_part(&c, 0)
            .on_reduced(Box::new(move |_| *f1.borrow_mut() += 1))
            .on_empty(Box::new(move |_| *f2.borrow_mut() += 1));
        let mut view = TrackedStack::single(&ItemStack::new(wheat(), 0), part);
        assert_eq!(view.reduce(0), 0);
        assert_eq!(*fired.borrow(), 0);
        assert_eq!(view.count(), 4);
    }

    #[test]
    fn callbacks_fire_once_per_mutation() {
        let c = Container::new(1, 10).into_ref();
        let _ = c.borrow_mut().place(ItemStack::new(wheat(), 5));
        let reduced = Rc::new(RefCell::new(0u32));
        let emptied = Rc::new(RefCell::new(0u32));
        let r = Rc::clone(&reduced);
        let e = Rc::clone(&emptied);
        let part = slot_part(&c, 0)
            .on_reduced(Box::new(move |_| *r.borrow_mut() += 1))
            .on_empty(Box::new(move |_| *e.borrow_mut() += 1));
        let mut view = TrackedStack::single(&ItemStack::new(wheat(), 0), part);

        view.reduce(2);
        assert_eq!((*reduced.borrow(), *emptied.borrow()), (1, 0));
        view.reduce(3);
        assert_eq!((*reduced.borrow(), *emptied.borrow()), (1, 1));
    }

    #[test]
    fn take_severs_the_live_link() {
        let c = Container::new(1, 10).into_ref();
        let _ = c.borrow_mut().place(ItemStack::new(wheat(), 8));
        let mut view = TrackedStack::single(&ItemStack::new(wheat(), 0), slot_part(&c, 0));

        let taken = view.take(5).unwrap();
        assert_eq!(taken.count, 5);
        assert_eq!(view.count(), 3);
        // Mutating the taken stack does not touch the backing.
        let mut taken = taken;
        taken.count = 0;
        assert_eq!(view.count(), 3);
    }

    #[test]
    fn take_returns_none_when_nothing_removed() {
        let c = Container::new(1, 10).into_ref();
        let mut view = TrackedStack::single(&ItemStack::new(wheat(), 0), slot_part(&c, 0));
        assert!(view.take(5).is_none());
    }

    #[test]
    fn aggregate_reduces_across_parts_in_order() {
        let a = Container::new(1, 10).into_ref();
        let b = Container::new(1, 10).into_ref();
        let _ = a.borrow_mut().place(ItemStack::new(wheat(), 3));
        let _ = b.borrow_mut().place(ItemStack::new(wheat(), 4));
        let mut view = TrackedStack::new(
            &ItemStack::new(wheat(), 0),
            vec![slot_part(&a, 0), slot_part(&b, 0)],
        );
        assert_eq!(view.count(), 7);
        assert_eq!(view.reduce(5), 5);
        assert!(a.borrow().slots()[0].is_none());
        assert_eq!(b.borrow().slots()[0].as_ref().unwrap().count, 2);
    }

    #[test]
    fn limited_part_hides_items_beyond_cap() {
        let c = Container::new(1, 20).into_ref();
        let _ = c.borrow_mut().place(ItemStack::new(wheat(), 10));
        let mut view =
            TrackedStack::single(&ItemStack::new(wheat(), 0), slot_part(&c, 0).limit(4));
        assert_eq!(view.count(), 4);
        assert_eq!(view.reduce(10), 4);
        // The slot kept the items beyond the cap.
        assert_eq!(c.borrow().slots()[0].as_ref().unwrap().count, 6);
        assert_eq!(view.count(), 0);
    }

    #[test]
    fn held_slot_backing_drains_and_clears() {
        let held = held_slot();
        *held.borrow_mut() = Some(ItemStack::new(wheat(), 5));
        let emptied = Rc::new(RefCell::new(false));
        let e = Rc::clone(&emptied);
        let part = StackPart::new(Backing::Held(Rc::clone(&held)))
            .on_empty(Box::new(move |_| *e.borrow_mut() = true));
        let mut view = TrackedStack::single(&ItemStack::new(wheat(), 0), part);
        assert_eq!(view.take(5).unwrap().count, 5);
        assert!(held.borrow().is_none());
        assert!(*emptied.borrow());
    }
}
