//! Generic crafting station driven by a rule table.

use crate::error::EngineError;
use crate::id::Tile;
use crate::item::ItemStack;
use crate::machine::{Machine, MachineState};
use crate::recipe::RuleSet;
use crate::storage::Storage;
use crate::tracked::{Backing, StackPart, TrackedStack};
use crate::world::StationState;
use std::cell::RefCell;
use std::rc::Rc;

pub struct StationMachine<'a> {
    state: Rc<RefCell<StationState>>,
    tile: Tile,
    rules: &'a RuleSet,
}

impl<'a> StationMachine<'a> {
    pub fn new(state: Rc<RefCell<StationState>>, tile: Tile, rules: &'a RuleSet) -> Self {
        Self { state, tile, rules }
    }
}

impl Machine for StationMachine<'_> {
    fn id(&self) -> &str {
        "station"
    }

    fn tile(&self) -> Tile {
        self.tile
    }

    fn state(&self) -> MachineState {
        let state = self.state.borrow();
        if !state.enabled {
            return MachineState::Disabled;
        }
        let holding = state.held.borrow().is_some();
        match (holding, state.minutes_left) {
            (true, 0) => MachineState::Done,
            (true, _) => MachineState::Processing,
            (false, _) => MachineState::Empty,
        }
    }

    fn output(&mut self) -> Option<TrackedStack> {
        if self.state() != MachineState::Done {
            return None;
        }
        let state = self.state.borrow();
        let held = state.held.borrow().clone()?;
        let sample = held.with_count(0);
        let station = Rc::clone(&self.state);
        // Cap the view at what is held right now: an auto-restart refill
        // must not be drained again by the same collect pass.
        let part = StackPart::new(Backing::Held(Rc::clone(&state.held)))
            .limit(held.count)
            .on_empty(Box::new(
            move |_collected| {
                let mut station = station.borrow_mut();
                let restart = station
                    .current_rule
                    .as_ref()
                    .filter(|rule| rule.auto_restart)
                    .map(|rule| {
                        (
                            ItemStack::with_quality(
                                rule.output,
                                rule.output_quality,
                                rule.output_count,
                            ),
                            rule.minutes,
                        )
                    });
                match restart {
                    Some((next, minutes)) => {
                        *station.held.borrow_mut() = Some(next);
                        station.minutes_left = minutes;
                    }
                    None => station.current_rule = None,
                }
            },
        ));
        Some(TrackedStack::single(&sample, part))
    }

    fn set_input(&mut self, storage: &Storage) -> Result<bool, EngineError> {
        if self.state() != MachineState::Empty {
            return Ok(false);
        }
        let kind = self.state.borrow().kind.clone();
        for rule in self.rules.rules_for(&kind, self.tile)? {
            // All-or-nothing: the aggregate view may come back short, so the
            // count check precedes any reduction.
            let primary = if rule.input_count > 0 {
                let input = rule.input;
                let Some(found) =
                    storage.find_matching(&move |s: &ItemStack| s.item_type == input, rule.input_count)
                else {
                    continue;
                };
                if found.count() < rule.input_count {
                    continue;
                }
                Some(found)
            } else {
                None
            };
            if let Some(mut found) = primary {
                let taken = found.reduce(rule.input_count);
                debug_assert_eq!(taken, rule.input_count);
            }

            let mut minutes = rule.minutes;
            if let Some(catalyst) = &rule.catalyst {
                // Threshold is re-checked before every application: each
                // catalyst item shaves `minutes_off`, never dipping below
                // the floor.
                while minutes.saturating_sub(catalyst.minutes_off) >= catalyst.floor {
                    let item = catalyst.item;
                    let Some(mut unit) =
                        storage.find_matching(&move |s: &ItemStack| s.item_type == item, 1)
                    else {
                        break;
                    };
                    if unit.reduce(1) != 1 {
                        break;
                    }
                    minutes -= catalyst.minutes_off;
                }
            }

            let mut state = self.state.borrow_mut();
            *state.held.borrow_mut() = Some(ItemStack::with_quality(
                rule.output,
                rule.output_quality,
                rule.output_count,
            ));
            state.minutes_left = minutes;
            state.current_rule = Some(rule.clone());
            return Ok(true);
        }
        Ok(false)
    }
}
