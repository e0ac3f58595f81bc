//! A single-container item-exchange endpoint.
//!
//! A [`Pipe`] mirrors the storage contract (`find` / `store`) over one
//! backing container, and additionally supports unguided enumeration for
//! machines that have no targeted ingredient ("ship anything shippable").

use crate::item::{ContainerRef, ItemStack};
use crate::tracked::{Backing, StackPart, TrackedStack};
use std::rc::Rc;

#[derive(Clone)]
pub struct Pipe {
    container: ContainerRef,
}

impl Pipe {
    pub fn new(container: ContainerRef) -> Self {
        Self { container }
    }

    pub fn container(&self) -> &ContainerRef {
        &self.container
    }

    pub fn allow_take(&self) -> bool {
        self.container.borrow().allow_take
    }

    pub fn allow_store(&self) -> bool {
        self.container.borrow().allow_store
    }

    fn slot_part(&self, index: usize) -> StackPart {
        StackPart::new(Backing::Slot {
            container: Rc::clone(&self.container),
            index,
        })
    }

    /// One tracked view per occupied slot, in slot order. The views are
    /// collected eagerly so the caller may mutate through them while
    /// iterating without holding a borrow on the container.
    pub fn tracked_stacks(&self) -> Vec<TrackedStack> {
        let samples: Vec<(usize, ItemStack)> = self
            .container
            .borrow()
            .slots()
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|stack| (i, stack.with_count(0))))
            .collect();
        samples
            .into_iter()
            .map(|(i, sample)| TrackedStack::single(&sample, self.slot_part(i)))
            .collect()
    }

    /// Collect up to `count` matching items from this container. The first
    /// matching slot fixes the identity; further slots join only if they
    /// share it. `None` when nothing matched.
    pub fn find(
        &self,
        predicate: &dyn Fn(&ItemStack) -> bool,
        count: u32,
    ) -> Option<TrackedStack> {
        let mut sample: Option<ItemStack> = None;
        let mut parts = Vec::new();
        let mut gathered = 0u32;
        {
            let container = self.container.borrow();
            for (i, slot) in container.slots().iter().enumerate() {
                if gathered >= count {
                    break;
                }
                let Some(stack) = slot else { continue };
                match &sample {
                    None if predicate(stack) => {
                        sample = Some(stack.with_count(0));
                    }
                    Some(s) if stack.matches(s) => {}
                    _ => continue,
                }
                gathered += stack.count;
                parts.push((i,));
            }
        }
        let sample = sample?;
        let parts = parts
            .into_iter()
            .map(|(i,)| self.slot_part(i))
            .collect();
        Some(TrackedStack::new(&sample, parts))
    }

    /// Deposit from `stack` into this container: occupied compatible slots
    /// first, then empty slots. The remainder stays on `stack` unreduced.
    pub fn store(&self, stack: &mut TrackedStack) {
        self.store_phase(stack, true);
        self.store_phase(stack, false);
    }

    pub(crate) fn store_phase(&self, stack: &mut TrackedStack, merge: bool) {
        loop {
            let available = stack.count();
            if available == 0 {
                return;
            }
            let space = {
                let container = self.container.borrow();
                if merge {
                    container.merge_space(stack.sample())
                } else {
                    container.empty_space()
                }
            };
            if space == 0 {
                return;
            }
            // take-then-accept keeps borrows sequential: the space was
            // measured above, so accept cannot overflow.
            let Some(taken) = stack.take(space.min(available)) else {
                return;
            };
            let overflow = if merge {
                self.container.borrow_mut().merge(taken)
            } else {
                self.container.borrow_mut().place(taken)
            };
            debug_assert_eq!(overflow, 0, "measured space disappeared mid-store");
        }
    }
}
