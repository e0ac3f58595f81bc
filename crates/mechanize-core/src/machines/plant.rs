//! Harvestable plant wrapper.
//!
//! Plants take no input; they only offer produce once grown. Collecting the
//! harvest either sets the growth stage back (regrowing crops) or spends the
//! plant for good.

use crate::error::EngineError;
use crate::id::Tile;
use crate::machine::{Machine, MachineState};
use crate::storage::Storage;
use crate::tracked::{Backing, StackPart, TrackedStack};
use crate::world::PlantState;
use std::cell::RefCell;
use std::rc::Rc;

pub struct PlantMachine {
    state: Rc<RefCell<PlantState>>,
    tile: Tile,
}

impl PlantMachine {
    pub fn new(state: Rc<RefCell<PlantState>>, tile: Tile) -> Self {
        Self { state, tile }
    }
}

impl Machine for PlantMachine {
    fn id(&self) -> &str {
        "plant"
    }

    fn tile(&self) -> Tile {
        self.tile
    }

    fn state(&self) -> MachineState {
        let state = self.state.borrow();
        if state.struck || state.spent || !state.grown() {
            return MachineState::Disabled;
        }
        if state.held.borrow().is_some() {
            MachineState::Done
        } else {
            // Grown but already picked; waiting on regrowth.
            MachineState::Disabled
        }
    }

    fn output(&mut self) -> Option<TrackedStack> {
        if self.state() != MachineState::Done {
            return None;
        }
        let state = self.state.borrow();
        let sample = state.held.borrow().as_ref()?.with_count(0);
        let plant = Rc::clone(&self.state);
        let part = StackPart::new(Backing::Held(Rc::clone(&state.held))).on_empty(Box::new(
            move |_collected| {
                let mut plant = plant.borrow_mut();
                match plant.regrow_setback {
                    Some(setback) => plant.stage = plant.stage.saturating_sub(setback),
                    None => plant.spent = true,
                }
            },
        ));
        Some(TrackedStack::single(&sample, part))
    }

    fn set_input(&mut self, _storage: &Storage) -> Result<bool, EngineError> {
        Ok(false)
    }
}
