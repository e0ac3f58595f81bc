//! Machine wrappers over world entities.
//!
//! One wrapper type per entity variant, all behind the [`Machine`] trait.
//! No inheritance hierarchy: [`for_entity`] is a tagged factory, and every
//! wrapper re-derives its state from the entity it wraps.

mod disposal;
mod mill;
mod plant;
mod shipping;
mod station;

pub use disposal::{DisposalMachine, disposal_draw, loot};
pub use mill::MillMachine;
pub use plant::PlantMachine;
pub use shipping::ShippingMachine;
pub use station::StationMachine;

use crate::item::ItemStack;
use crate::machine::Machine;
use crate::recipe::RuleSet;
use crate::world::{DisposalFlags, EntityKind, PlacedEntity, WorldClock};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A machine's FIFO output queue; the front entry drains first.
pub type OutputQueue = Rc<RefCell<VecDeque<ItemStack>>>;

pub fn output_queue() -> OutputQueue {
    Rc::new(RefCell::new(VecDeque::new()))
}

/// Wrap a placed entity in its machine adapter. `None` for entities that are
/// not machines (chests participate as pipes instead).
pub fn for_entity<'a>(
    entity: &PlacedEntity,
    rules: &'a RuleSet,
    clock: WorldClock,
    flags: &DisposalFlags,
) -> Option<Box<dyn Machine + 'a>> {
    match &entity.kind {
        EntityKind::Chest(_) => None,
        EntityKind::Station(state) => Some(Box::new(StationMachine::new(
            Rc::clone(state),
            entity.tile,
            rules,
        ))),
        EntityKind::Plant(state) => {
            Some(Box::new(PlantMachine::new(Rc::clone(state), entity.tile)))
        }
        EntityKind::ShippingBin(ledger) => Some(Box::new(ShippingMachine::new(
            Rc::clone(ledger),
            entity.tile,
            rules,
        ))),
        EntityKind::DisposalBin { index } => Some(Box::new(DisposalMachine::new(
            *index,
            entity.tile,
            clock,
            Rc::clone(flags),
        ))),
        EntityKind::Mill(state) => Some(Box::new(MillMachine::new(
            Rc::clone(state),
            entity.tile,
            rules,
        ))),
    }
}
