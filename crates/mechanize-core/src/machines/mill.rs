//! Batch mill wrapper: hopper in, FIFO queue out.

use crate::error::EngineError;
use crate::id::Tile;
use crate::item::ItemStack;
use crate::machine::{Machine, MachineState};
use crate::recipe::RuleSet;
use crate::storage::Storage;
use crate::tracked::{Backing, StackPart, TrackedStack};
use crate::world::MillState;
use std::cell::RefCell;
use std::rc::Rc;

pub struct MillMachine<'a> {
    state: Rc<RefCell<MillState>>,
    tile: Tile,
    rules: &'a RuleSet,
}

impl<'a> MillMachine<'a> {
    pub fn new(state: Rc<RefCell<MillState>>, tile: Tile, rules: &'a RuleSet) -> Self {
        Self { state, tile, rules }
    }
}

impl Machine for MillMachine<'_> {
    fn id(&self) -> &str {
        "mill"
    }

    fn tile(&self) -> Tile {
        self.tile
    }

    fn state(&self) -> MachineState {
        let state = self.state.borrow();
        if !state.output.borrow().is_empty() {
            MachineState::Done
        } else if state.hopper.borrow().total() > 0 {
            // Waiting for the overnight grind.
            MachineState::Processing
        } else {
            MachineState::Empty
        }
    }

    /// A view over the front queue entry only; FIFO order is part of the
    /// contract. Draining it pops the entry, possibly exposing the next one.
    fn output(&mut self) -> Option<TrackedStack> {
        let state = self.state.borrow();
        let front = state.output.borrow().front()?.clone();
        // Cap at the front entry so one collect drains at most one batch,
        // even when the next entry shares the identity.
        let part =
            StackPart::new(Backing::Queue(Rc::clone(&state.output))).limit(front.count);
        Some(TrackedStack::single(&front.with_count(0), part))
    }

    /// Pack as much accepted input as fits, topping up partial hopper slots
    /// before opening new ones. Deliberately not all-or-nothing.
    fn set_input(&mut self, storage: &Storage) -> Result<bool, EngineError> {
        let kind = self.state.borrow().kind.clone();
        let mut moved = false;
        for rule in self.rules.rules_for(&kind, self.tile)? {
            let input = rule.input;
            let Some(mut found) =
                storage.find_matching(&move |s: &ItemStack| s.item_type == input, u32::MAX)
            else {
                continue;
            };
            let hopper = Rc::clone(&self.state.borrow().hopper);
            let space = {
                let hopper = hopper.borrow();
                hopper.merge_space(found.sample()) + hopper.empty_space()
            };
            let amount = found.count().min(space);
            let Some(taken) = found.take(amount) else {
                continue;
            };
            let overflow = hopper.borrow_mut().accept(taken);
            debug_assert_eq!(overflow, 0, "measured hopper space disappeared");
            moved = true;
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Quality;
    use crate::item::Container;
    use crate::pipe::Pipe;
    use crate::recipe::{MachineRule, RuleSetBuilder};

    fn rules() -> RuleSet {
        let mut b = RuleSetBuilder::new();
        let wheat = b.register_item("wheat");
        let flour = b.register_item("flour");
        b.register_rule(
            "mill",
            MachineRule {
                name: "grind wheat".to_string(),
                input: wheat,
                input_count: 1,
                output: flour,
                output_quality: Quality::Normal,
                output_count: 1,
                minutes: 0,
                catalyst: None,
                auto_restart: false,
            },
        );
        b.build().unwrap()
    }

    #[test]
    fn packs_partial_hopper_slots_first() {
        let rules = rules();
        let wheat = rules.item_id("wheat").unwrap();
        let mill = MillState::new("mill", 2, 10);
        assert_eq!(mill.hopper.borrow_mut().accept(ItemStack::new(wheat, 7)), 0);
        let mill = mill.into_ref();

        let chest = Container::new(2, 99).into_ref();
        assert_eq!(chest.borrow_mut().accept(ItemStack::new(wheat, 9)), 0);
        let storage = Storage::new(vec![Pipe::new(Rc::clone(&chest))]);

        let mut machine = MillMachine::new(Rc::clone(&mill), Tile::new(0, 0), &rules);
        assert!(machine.set_input(&storage).unwrap());

        let mill = mill.borrow();
        let hopper = mill.hopper.borrow();
        let counts: Vec<u32> = hopper.slots().iter().flatten().map(|s| s.count).collect();
        assert_eq!(counts, vec![10, 6], "first slot topped up before the second opened");
        assert_eq!(chest.borrow().total(), 0);
    }

    #[test]
    fn full_hopper_takes_nothing() {
        let rules = rules();
        let wheat = rules.item_id("wheat").unwrap();
        let mill = MillState::new("mill", 1, 5);
        assert_eq!(mill.hopper.borrow_mut().accept(ItemStack::new(wheat, 5)), 0);
        let mill = mill.into_ref();

        let chest = Container::new(1, 99).into_ref();
        assert_eq!(chest.borrow_mut().accept(ItemStack::new(wheat, 4)), 0);
        let storage = Storage::new(vec![Pipe::new(Rc::clone(&chest))]);

        let mut machine = MillMachine::new(Rc::clone(&mill), Tile::new(0, 0), &rules);
        assert!(!machine.set_input(&storage).unwrap());
        assert_eq!(chest.borrow().total(), 4);
        assert_eq!(machine.state(), MachineState::Processing);
    }

    #[test]
    fn queue_drains_front_first() {
        let rules = rules();
        let flour = rules.item_id("flour").unwrap();
        let mill = MillState::new("mill", 1, 5).into_ref();
        mill.borrow()
            .output
            .borrow_mut()
            .push_back(ItemStack::new(flour, 4));
        mill.borrow()
            .output
            .borrow_mut()
            .push_back(ItemStack::with_quality(flour, Quality::Gold, 2));

        let mut machine = MillMachine::new(Rc::clone(&mill), Tile::new(0, 0), &rules);
        assert_eq!(machine.state(), MachineState::Done);

        let mut front = machine.output().unwrap();
        assert_eq!(front.sample().quality, Quality::Normal);
        assert_eq!(front.reduce(10), 4);

        // Next call exposes the second entry.
        let next = machine.output().unwrap();
        assert_eq!(next.sample().quality, Quality::Gold);
        assert_eq!(next.count(), 2);
    }

    #[test]
    fn empty_mill_reports_empty() {
        let rules = rules();
        let mill = MillState::new("mill", 1, 5).into_ref();
        let mut machine = MillMachine::new(mill, Tile::new(0, 0), &rules);
        assert_eq!(machine.state(), MachineState::Empty);
        assert!(machine.output().is_none());
    }
}
