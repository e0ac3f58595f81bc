//! Shipping bin wrapper: a pure consumer.

use crate::error::EngineError;
use crate::id::Tile;
use crate::machine::{Machine, MachineState};
use crate::recipe::RuleSet;
use crate::storage::Storage;
use crate::tracked::TrackedStack;
use crate::world::ShippingLedger;
use std::cell::RefCell;
use std::rc::Rc;

pub struct ShippingMachine<'a> {
    ledger: Rc<RefCell<ShippingLedger>>,
    tile: Tile,
    rules: &'a RuleSet,
}

impl<'a> ShippingMachine<'a> {
    pub fn new(ledger: Rc<RefCell<ShippingLedger>>, tile: Tile, rules: &'a RuleSet) -> Self {
        Self {
            ledger,
            tile,
            rules,
        }
    }
}

impl Machine for ShippingMachine<'_> {
    fn id(&self) -> &str {
        "shipping-bin"
    }

    fn tile(&self) -> Tile {
        self.tile
    }

    /// Never `Done`: the bin swallows instantly and produces nothing.
    fn state(&self) -> MachineState {
        MachineState::Empty
    }

    fn output(&mut self) -> Option<TrackedStack> {
        None
    }

    /// Consume every shippable stack the storage exposes, whole. No
    /// predicate: the unguided slot enumeration drives this.
    fn set_input(&mut self, storage: &Storage) -> Result<bool, EngineError> {
        let mut shipped = false;
        for mut view in storage.tracked_stacks() {
            if !self.rules.shippable(view.sample().item_type) {
                continue;
            }
            let available = view.count();
            if let Some(taken) = view.take(available) {
                self.ledger.borrow_mut().record(taken);
                shipped = true;
            }
        }
        Ok(shipped)
    }
}
